//! # Marketing Agent
//!
//! Builds a campaign either from a finished design (`DesignReady`) or from
//! scratch (`StartCampaign`), then hands off to the SalesAgent.

use super::{prompts, Agent, AgentCore, AgentOutcome};
use crate::bus::{Command, Message, MessageBus};
use crate::swarm::pipeline::PipelineStage;
use async_trait::async_trait;

/// Context key the campaign artifact is stored under
pub const CAMPAIGN_KEY: &str = "campaign";

pub struct MarketingAgent {
    core: AgentCore,
}

impl MarketingAgent {
    pub fn new(core: AgentCore) -> Self {
        Self { core }
    }

    async fn campaign_from_design(&self, message: &Message, bus: &MessageBus) -> AgentOutcome {
        let idea = message.idea().unwrap_or(prompts::UNKNOWN_IDEA).to_string();
        let design = message.payload().design.as_deref();

        tracing::info!(agent = %self.core.name(), idea = %idea, "Creating marketing plan");
        self.core
            .enter(message, PipelineStage::MarketingIdeaReceived, &idea, bus);

        let campaign = match self
            .core
            .generate(
                message,
                prompts::MARKETING,
                prompts::campaign_prompt(&idea, design),
                CAMPAIGN_KEY,
                bus,
            )
            .await
        {
            Ok(text) => text,
            Err(failed) => return failed,
        };

        let payload = message
            .payload()
            .clone()
            .with_idea(&idea)
            .with_campaign(&campaign);
        let follow_up = self
            .core
            .follow_up(message, Command::MarketingDone)
            .map(|m| m.with_payload(payload));

        AgentOutcome::Handled {
            stage: PipelineStage::MarketingIdeaReceived,
            artifact: Some(campaign),
            forwarded: self.core.forward(bus, follow_up).await,
        }
    }

    async fn launch_campaign(&self, message: &Message, bus: &MessageBus) -> AgentOutcome {
        self.core.enter(
            message,
            PipelineStage::MarketingStarted,
            message.command().as_str(),
            bus,
        );

        let campaign = match self
            .core
            .generate(
                message,
                prompts::MARKETING,
                prompts::launch_campaign_prompt(),
                CAMPAIGN_KEY,
                bus,
            )
            .await
        {
            Ok(text) => text,
            Err(failed) => return failed,
        };

        let follow_up = self
            .core
            .follow_up(message, Command::GenerateSalesLeads)
            .map(|m| m.with_payload(message.payload().clone().with_campaign(&campaign)));

        AgentOutcome::Handled {
            stage: PipelineStage::MarketingStarted,
            artifact: Some(campaign),
            forwarded: self.core.forward(bus, follow_up).await,
        }
    }
}

#[async_trait]
impl Agent for MarketingAgent {
    fn name(&self) -> &str {
        self.core.name()
    }

    async fn receive(&self, message: &Message, bus: &MessageBus) -> AgentOutcome {
        match message.command() {
            Command::DesignReady => self.campaign_from_design(message, bus).await,
            Command::StartCampaign => self.launch_campaign(message, bus).await,
            _ => self.core.ignore(message, bus),
        }
    }
}
