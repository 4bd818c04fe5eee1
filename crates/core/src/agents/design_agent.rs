//! # Design Agent
//!
//! First stage of the pipeline: turns a product idea into design directions
//! and hands them to the MarketingAgent.

use super::{prompts, Agent, AgentCore, AgentOutcome};
use crate::bus::{Command, Message, MessageBus, Payload};
use crate::swarm::pipeline::PipelineStage;
use async_trait::async_trait;

/// Context key the design artifact is stored under
pub const DESIGN_KEY: &str = "design";

pub struct DesignAgent {
    core: AgentCore,
}

impl DesignAgent {
    pub fn new(core: AgentCore) -> Self {
        Self { core }
    }

    async fn start_design(&self, message: &Message, bus: &MessageBus) -> AgentOutcome {
        let idea = message.idea().unwrap_or(prompts::UNKNOWN_IDEA).to_string();
        tracing::info!(agent = %self.core.name(), idea = %idea, "Designing product");
        self.core
            .enter(message, PipelineStage::Designing, &idea, bus);

        let design = match self
            .core
            .generate(
                message,
                prompts::DESIGN,
                prompts::design_prompt(&idea),
                DESIGN_KEY,
                bus,
            )
            .await
        {
            Ok(text) => text,
            Err(failed) => return failed,
        };

        let follow_up = self
            .core
            .follow_up(message, Command::DesignReady)
            .map(|m| m.with_payload(Payload::default().with_idea(&idea).with_design(&design)));

        AgentOutcome::Handled {
            stage: PipelineStage::Designing,
            artifact: Some(design),
            forwarded: self.core.forward(bus, follow_up).await,
        }
    }
}

#[async_trait]
impl Agent for DesignAgent {
    fn name(&self) -> &str {
        self.core.name()
    }

    async fn receive(&self, message: &Message, bus: &MessageBus) -> AgentOutcome {
        match message.command() {
            Command::StartDesign => self.start_design(message, bus).await,
            _ => self.core.ignore(message, bus),
        }
    }
}
