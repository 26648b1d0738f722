//! Run discovery: time-windowed search over the remote run listing.

pub mod run_search;

pub use run_search::{RunSearchPaginator, RunSearchQuery};
