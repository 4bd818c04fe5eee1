//! # Ideaforge Agents
//!
//! The pipeline stages. Every agent implements the same contract: receive a
//! [`Message`], optionally call the generation capability, optionally send one
//! follow-up message through the bus.
//!
//! ```text
//! DesignAgent ─▶ MarketingAgent ─▶ SalesAgent ─▶ SupportAgent
//!                                      ▲
//! ContentAgent ────────────────────────┘
//! ```
//!
//! Commands an agent does not recognize are ignored: no stage write, no
//! follow-up, [`AgentOutcome::Ignored`].

pub mod generation;
pub mod prompts;

pub mod content_agent;
pub mod design_agent;
pub mod marketing_agent;
pub mod sales_agent;
pub mod support_agent;

pub use content_agent::ContentAgent;
pub use design_agent::DesignAgent;
pub use generation::{
    EchoGenerator, FailurePolicy, Generation, GenerationError, GenerationRequest, Generator,
    LlmGenerator, StageArtifact,
};
pub use marketing_agent::MarketingAgent;
pub use sales_agent::SalesAgent;
pub use support_agent::SupportAgent;

use crate::bus::{Command, Delivery, Message, MessageBus};
use crate::state::{TranscriptKind, WorkflowCoordinator};
use crate::swarm::events::{SwarmEvent, SwarmEventKind};
use crate::swarm::pipeline::{AgentRole, PipelineStage};
use async_trait::async_trait;

/// A pipeline stage reachable through the bus
#[async_trait]
pub trait Agent: Send + Sync {
    /// Name the agent is registered under
    fn name(&self) -> &str;

    /// Handle one message. The bus is passed in so the agent can send its
    /// follow-up; the returned outcome nests that follow-up's delivery.
    async fn receive(&self, message: &Message, bus: &MessageBus) -> AgentOutcome;
}

/// What an agent did with a message
#[derive(Debug, Clone)]
pub enum AgentOutcome {
    /// Recognized and processed
    Handled {
        stage: PipelineStage,
        /// Generated text, if the stage generates
        artifact: Option<String>,
        /// Delivery of the follow-up message, if one was sent
        forwarded: Option<Box<Delivery>>,
    },
    /// Command not recognized by this agent
    Ignored { command: String },
    /// Generation failed under [`FailurePolicy::Halt`]
    Failed { stage: PipelineStage, error: String },
}

impl AgentOutcome {
    /// Stage recorded for this hop, if any
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            Self::Handled { stage, .. } | Self::Failed { stage, .. } => Some(*stage),
            Self::Ignored { .. } => None,
        }
    }

    pub fn forwarded(&self) -> Option<&Delivery> {
        match self {
            Self::Handled { forwarded, .. } => forwarded.as_deref(),
            _ => None,
        }
    }

    pub fn artifact(&self) -> Option<&str> {
        match self {
            Self::Handled { artifact, .. } => artifact.as_deref(),
            _ => None,
        }
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored { .. })
    }
}

/// State shared by all agent implementations
#[derive(Clone)]
pub struct AgentCore {
    role: AgentRole,
    workflows: WorkflowCoordinator,
    generation: Generation,
}

impl AgentCore {
    pub fn new(role: AgentRole, workflows: WorkflowCoordinator, generation: Generation) -> Self {
        Self {
            role,
            workflows,
            generation,
        }
    }

    pub fn name(&self) -> &'static str {
        self.role.agent_name()
    }

    pub fn workflows(&self) -> &WorkflowCoordinator {
        &self.workflows
    }

    /// Log and report a command this agent does not handle
    fn ignore(&self, message: &Message, bus: &MessageBus) -> AgentOutcome {
        tracing::debug!(
            agent = %self.name(),
            command = %message.command(),
            workflow_id = %message.workflow_id(),
            "Ignoring unrecognized command"
        );
        bus.emit(
            SwarmEvent::new(SwarmEventKind::CommandIgnored, self.name())
                .with_workflow(message.workflow_id())
                .with_data(serde_json::json!({ "command": message.command().as_str() })),
        );
        AgentOutcome::Ignored {
            command: message.command().to_string(),
        }
    }

    /// Record the stage marker and the `received` transcript line
    fn enter(&self, message: &Message, stage: PipelineStage, summary: &str, bus: &MessageBus) {
        tracing::info!(
            agent = %self.name(),
            command = %message.command(),
            sender = %message.sender(),
            "Received message"
        );
        self.workflows.update_stage(message.workflow_id(), stage);
        self.workflows.record(
            message.workflow_id(),
            self.name(),
            TranscriptKind::Received,
            summary,
        );
        bus.emit(
            SwarmEvent::new(SwarmEventKind::StageRecorded, self.name())
                .with_workflow(message.workflow_id())
                .with_data(serde_json::json!({ "stage": stage.as_str() })),
        );
    }

    /// Run the generation capability for this stage.
    ///
    /// Under [`FailurePolicy::Forward`] a failure comes back as error text in
    /// `Ok`; under [`FailurePolicy::Halt`] it is recorded (stage `failed`,
    /// key `error`) and returned as `Err` carrying the failed outcome.
    async fn generate(
        &self,
        message: &Message,
        system: &str,
        prompt: String,
        artifact_key: &str,
        bus: &MessageBus,
    ) -> Result<String, AgentOutcome> {
        let workflow_id = message.workflow_id();
        let request = GenerationRequest::new(self.name(), prompt).with_system(system);

        match self.generation.run(request).await {
            StageArtifact::Generated(text) => {
                self.store_artifact(workflow_id, artifact_key, &text, bus);
                Ok(text)
            }
            StageArtifact::Failed(error) => {
                tracing::warn!(
                    agent = %self.name(),
                    workflow_id = %workflow_id,
                    "Generation failed: {}",
                    error
                );
                bus.emit(
                    SwarmEvent::new(SwarmEventKind::GenerationFailed, self.name())
                        .with_workflow(workflow_id)
                        .with_data(serde_json::json!({ "error": error.to_string() })),
                );

                match self.generation.policy() {
                    FailurePolicy::Forward => {
                        let text = format!("{} Error: {}", self.name(), error);
                        self.store_artifact(workflow_id, artifact_key, &text, bus);
                        Ok(text)
                    }
                    FailurePolicy::Halt => {
                        let store = self.workflows.store();
                        store.set(workflow_id, "error", error.to_string());
                        self.workflows
                            .update_stage(workflow_id, PipelineStage::Failed);
                        Err(AgentOutcome::Failed {
                            stage: PipelineStage::Failed,
                            error: error.to_string(),
                        })
                    }
                }
            }
        }
    }

    fn store_artifact(&self, workflow_id: &str, key: &str, text: &str, bus: &MessageBus) {
        self.workflows.store().set(workflow_id, key, text);
        self.workflows
            .record(workflow_id, self.name(), TranscriptKind::Response, text);
        bus.emit(
            SwarmEvent::new(SwarmEventKind::ArtifactGenerated, self.name())
                .with_workflow(workflow_id)
                .with_data(serde_json::json!({ "key": key, "length": text.len() })),
        );
    }

    /// Message to the next role in the chain, same workflow. `None` for the
    /// last role.
    fn follow_up(&self, message: &Message, command: Command) -> Option<Message> {
        let next = self.role.next()?;
        Some(Message::new(
            self.name(),
            next.agent_name(),
            command,
            message.workflow_id(),
        ))
    }

    /// Send the follow-up, if any, and wrap its delivery
    async fn forward(
        &self,
        bus: &MessageBus,
        follow_up: Option<Message>,
    ) -> Option<Box<Delivery>> {
        Some(Box::new(bus.send(follow_up?).await))
    }
}
