//! Per-workflow trigger metadata and per-run payload links, shared by every
//! task of a batch.

pub mod trigger_metadata;

pub use trigger_metadata::{CacheStats, TriggerMetadataCache};
