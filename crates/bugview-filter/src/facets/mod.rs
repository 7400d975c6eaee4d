//! Concrete filter facets.

mod enum_facet;
mod ranges;
mod runs;
mod text;
mod toggles;

pub use enum_facet::EnumFacet;
pub use ranges::{BugPathLengthFacet, DateFacet, DateKind};
pub use runs::{RunFacet, RunTagFacet, Side};
pub use text::{TextFacet, TextField};
pub use toggles::{DiffTypeFacet, UniqueFacet};
