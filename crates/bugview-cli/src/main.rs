#![forbid(unsafe_code)]

fn main() {
    std::process::exit(bugview_cli::run());
}
