//! Report filter panel state for Bugview
//!
//! This crate defines the filter subsystem of the report browser:
//! - [`FilterWidget`]: the facet capability set, and the concrete facets in [`facets`]
//! - [`FilterStateManager`]: aggregate query derivation, count refresh fan-out,
//!   history synchronization and the panel lifecycle
//! - [`HistoryState`]: the URL-hash key/value state
//! - [`ReportQueryGateway`]: the remote query surface, with [`InMemoryGateway`]
//!   as a local implementation
//! - [`FetchTracker`] / [`SearchDebouncer`]: stale-response rejection and
//!   typed-search debouncing

#![forbid(unsafe_code)]

pub mod error;
pub mod facets;
pub mod fetch;
pub mod gateway;
pub mod history;
pub mod manager;
pub mod memory;
pub mod panel;
pub mod query;
pub mod selection;
pub mod widget;

pub use error::{FilterError, FilterResult, GatewayError, GatewayResult};
pub use fetch::{FetchTicket, FetchTracker, SearchDebouncer};
pub use gateway::{ClientContext, NameCount, Page, ReportQueryGateway, RunReportCount, RunTagCount};
pub use history::{HistoryState, UrlEntry, keys};
pub use manager::{
    ActivationOrigin, FacetSnapshot, FilterStateManager, FilterToggle, NotifySummary,
    PanelSnapshot, PanelState, PendingFetch,
};
pub use memory::{ComponentRecord, InMemoryGateway, ReportRecord, ReportStore, RunRecord, TagRecord};
pub use panel::standard_panel;
pub use query::{QueryScope, ReportQuery, UNMATCHED_ID};
pub use selection::{ItemMeta, SelectMode, SelectedItem, Selection, SelectionView};
pub use widget::{Candidate, FacetState, FilterWidget, ItemSource, ItemsOptions, NotifyOutcome};
