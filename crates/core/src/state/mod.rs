pub mod context_store;
pub mod workflow;

pub use context_store::{ContextStore, STAGE_KEY, TRANSCRIPT_KEY};
pub use workflow::{TranscriptEntry, TranscriptKind, WorkflowCoordinator};
