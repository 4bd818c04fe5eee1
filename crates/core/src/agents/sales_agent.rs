//! # Sales Agent
//!
//! Turns a campaign into a sales strategy (`MarketingDone`) or a lead list
//! (`GenerateSalesLeads`). The pipeline normally ends here; the hand-off to
//! the SupportAgent is opt-in.

use super::{prompts, Agent, AgentCore, AgentOutcome};
use crate::bus::{Command, Message, MessageBus};
use crate::swarm::pipeline::PipelineStage;
use async_trait::async_trait;

pub const SALES_STRATEGY_KEY: &str = "sales_strategy";
pub const SALES_LEADS_KEY: &str = "sales_leads";

pub struct SalesAgent {
    core: AgentCore,
    support_handoff: bool,
}

impl SalesAgent {
    /// `support_handoff` makes a finished strategy continue to the
    /// SupportAgent with `HandleSupport`.
    pub fn new(core: AgentCore, support_handoff: bool) -> Self {
        Self {
            core,
            support_handoff,
        }
    }

    async fn strategy(&self, message: &Message, bus: &MessageBus) -> AgentOutcome {
        let idea = message.idea().unwrap_or(prompts::UNKNOWN_IDEA).to_string();
        let campaign = message.payload().campaign.as_deref();

        tracing::info!(agent = %self.core.name(), idea = %idea, "Building sales strategy");
        self.core
            .enter(message, PipelineStage::SalesStrategy, &idea, bus);

        let strategy = match self
            .core
            .generate(
                message,
                prompts::SALES,
                prompts::sales_strategy_prompt(&idea, campaign),
                SALES_STRATEGY_KEY,
                bus,
            )
            .await
        {
            Ok(text) => text,
            Err(failed) => return failed,
        };

        let forwarded = if self.support_handoff {
            let follow_up = self
                .core
                .follow_up(message, Command::HandleSupport)
                .map(|m| m.with_payload(message.payload().clone().with_sales(&strategy)));
            self.core.forward(bus, follow_up).await
        } else {
            None
        };

        AgentOutcome::Handled {
            stage: PipelineStage::SalesStrategy,
            artifact: Some(strategy),
            forwarded,
        }
    }

    async fn leads(&self, message: &Message, bus: &MessageBus) -> AgentOutcome {
        let idea = message.idea();
        self.core.enter(
            message,
            PipelineStage::SalesLeads,
            idea.unwrap_or(message.command().as_str()),
            bus,
        );

        match self
            .core
            .generate(
                message,
                prompts::SALES,
                prompts::sales_leads_prompt(idea),
                SALES_LEADS_KEY,
                bus,
            )
            .await
        {
            Ok(leads) => AgentOutcome::Handled {
                stage: PipelineStage::SalesLeads,
                artifact: Some(leads),
                forwarded: None,
            },
            Err(failed) => failed,
        }
    }
}

#[async_trait]
impl Agent for SalesAgent {
    fn name(&self) -> &str {
        self.core.name()
    }

    async fn receive(&self, message: &Message, bus: &MessageBus) -> AgentOutcome {
        match message.command() {
            Command::MarketingDone => self.strategy(message, bus).await,
            Command::GenerateSalesLeads => self.leads(message, bus).await,
            _ => self.core.ignore(message, bus),
        }
    }
}
