//! # Swarm Orchestration
//!
//! Pipeline vocabulary, events and the coordinator that drives a workflow.
//!
//! ## Pipeline Flow
//!
//! ```text
//! Idea → DesignAgent → MarketingAgent → SalesAgent ⇢ SupportAgent
//! ```

pub mod coordinator;
pub mod events;
pub mod pipeline;

pub use coordinator::{
    new_workflow_id, Coordinator, CoordinatorConfig, CoordinatorError, WorkflowReport,
};
pub use events::{SwarmEvent, SwarmEventKind};
pub use pipeline::{AgentRole, PipelineStage};
