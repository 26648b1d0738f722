//! # Data Model
//!
//! Workflow identity, run records, trigger metadata and batch accounting
//! types shared by every layer of the engine.

pub mod batch;
pub mod trigger;
pub mod workflow;

pub use batch::{
    BatchOptions, BatchResult, ProgressEvent, ProgressStatus, RunError, RunOutcome,
    RunOutcomeStatus,
};
pub use trigger::{CallbackUrl, InputsLinkEntry, TriggerMetadata, TriggerType};
pub use workflow::{RunIdentifier, RunStatus, WorkflowReference, WorkflowRun};
