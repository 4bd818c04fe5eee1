//! # Support Agent
//!
//! Terminal stage: answers a customer query, optionally informed by the
//! sales plan handed over by the SalesAgent. Never sends a follow-up.

use super::{prompts, Agent, AgentCore, AgentOutcome};
use crate::bus::{Command, Message, MessageBus};
use crate::swarm::pipeline::PipelineStage;
use async_trait::async_trait;

pub const SUPPORT_RESPONSE_KEY: &str = "support_response";

pub struct SupportAgent {
    core: AgentCore,
}

impl SupportAgent {
    pub fn new(core: AgentCore) -> Self {
        Self { core }
    }

    /// Query from the payload, then the `"query"` metadata entry
    fn query<'a>(message: &'a Message) -> &'a str {
        message
            .payload()
            .query
            .as_deref()
            .or_else(|| message.metadata_str("query"))
            .unwrap_or(prompts::DEFAULT_SUPPORT_QUERY)
    }

    async fn handle_support(&self, message: &Message, bus: &MessageBus) -> AgentOutcome {
        let query = Self::query(message);
        self.core
            .enter(message, PipelineStage::Supporting, query, bus);

        let prompt = prompts::support_prompt(query, message.payload().sales.as_deref());
        match self
            .core
            .generate(
                message,
                prompts::SUPPORT,
                prompt,
                SUPPORT_RESPONSE_KEY,
                bus,
            )
            .await
        {
            Ok(response) => AgentOutcome::Handled {
                stage: PipelineStage::Supporting,
                artifact: Some(response),
                forwarded: None,
            },
            Err(failed) => failed,
        }
    }
}

#[async_trait]
impl Agent for SupportAgent {
    fn name(&self) -> &str {
        self.core.name()
    }

    async fn receive(&self, message: &Message, bus: &MessageBus) -> AgentOutcome {
        match message.command() {
            Command::HandleSupport => self.handle_support(message, bus).await,
            _ => self.core.ignore(message, bus),
        }
    }
}
