//! # Content Agent
//!
//! Side entry into the pipeline: writes launch copy for an idea and passes
//! it to the SalesAgent as `FinalizeSalesMaterial`.

use super::{prompts, Agent, AgentCore, AgentOutcome};
use crate::bus::{Command, Message, MessageBus, Payload};
use crate::swarm::pipeline::PipelineStage;
use async_trait::async_trait;

pub const CONTENT_COPY_KEY: &str = "content_copy";

pub struct ContentAgent {
    core: AgentCore,
}

impl ContentAgent {
    pub fn new(core: AgentCore) -> Self {
        Self { core }
    }

    async fn write_copy(&self, message: &Message, bus: &MessageBus) -> AgentOutcome {
        let idea = message.idea().unwrap_or(prompts::UNKNOWN_IDEA).to_string();
        self.core
            .enter(message, PipelineStage::ContentCopyWritten, &idea, bus);

        let copy = match self
            .core
            .generate(
                message,
                prompts::CONTENT,
                format!("Write launch copy for the product idea: {}", idea),
                CONTENT_COPY_KEY,
                bus,
            )
            .await
        {
            Ok(text) => text,
            Err(failed) => return failed,
        };

        let follow_up = self
            .core
            .follow_up(message, Command::FinalizeSalesMaterial)
            .map(|m| {
                m.with_payload(Payload::default().with_idea(&idea))
                    .with_metadata("copy", copy.as_str())
            });

        AgentOutcome::Handled {
            stage: PipelineStage::ContentCopyWritten,
            artifact: Some(copy),
            forwarded: self.core.forward(bus, follow_up).await,
        }
    }
}

#[async_trait]
impl Agent for ContentAgent {
    fn name(&self) -> &str {
        self.core.name()
    }

    async fn receive(&self, message: &Message, bus: &MessageBus) -> AgentOutcome {
        match message.command() {
            Command::WriteContentCopy => self.write_copy(message, bus).await,
            _ => self.core.ignore(message, bus),
        }
    }
}
