//! # Pipeline Stages
//!
//! Defines the agent roles, their fixed order, and the stage markers the
//! agents record into the context store.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of an agent in the pipeline, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Writes marketing copy ahead of sales
    Content,
    /// Turns an idea into design concepts
    Design,
    /// Builds the campaign
    Marketing,
    /// Builds the sales strategy
    Sales,
    /// Plans customer support
    Support,
}

impl AgentRole {
    /// Registered bus name for the role
    pub fn agent_name(&self) -> &'static str {
        match self {
            Self::Content => "ContentAgent",
            Self::Design => "DesignAgent",
            Self::Marketing => "MarketingAgent",
            Self::Sales => "SalesAgent",
            Self::Support => "SupportAgent",
        }
    }

    /// Next role in the main chain
    pub fn next(&self) -> Option<AgentRole> {
        match self {
            Self::Content => Some(Self::Sales),
            Self::Design => Some(Self::Marketing),
            Self::Marketing => Some(Self::Sales),
            Self::Sales => Some(Self::Support),
            Self::Support => None,
        }
    }

    /// All roles, as registered at startup
    pub fn all() -> [AgentRole; 5] {
        [
            Self::Design,
            Self::Marketing,
            Self::Sales,
            Self::Support,
            Self::Content,
        ]
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.agent_name())
    }
}

/// Stage marker stored under the `"stage"` key of a workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Accepted by the coordinator, nothing dispatched yet
    Received,
    /// DesignAgent is generating
    Designing,
    /// ContentAgent wrote copy
    ContentCopyWritten,
    /// MarketingAgent running a generic campaign
    MarketingStarted,
    /// MarketingAgent working from a design
    MarketingIdeaReceived,
    /// SalesAgent building a strategy
    SalesStrategy,
    /// SalesAgent generating leads
    SalesLeads,
    /// SupportAgent answering
    Supporting,
    /// A stage halted on a generation failure
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Designing => "designing",
            Self::ContentCopyWritten => "content_copy_written",
            Self::MarketingStarted => "marketing_started",
            Self::MarketingIdeaReceived => "marketing_idea_received",
            Self::SalesStrategy => "sales_strategy",
            Self::SalesLeads => "sales_leads",
            Self::Supporting => "supporting",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let stage = match s {
            "received" => Self::Received,
            "designing" => Self::Designing,
            "content_copy_written" => Self::ContentCopyWritten,
            "marketing_started" => Self::MarketingStarted,
            "marketing_idea_received" => Self::MarketingIdeaReceived,
            "sales_strategy" => Self::SalesStrategy,
            "sales_leads" => Self::SalesLeads,
            "supporting" => Self::Supporting,
            "failed" => Self::Failed,
            _ => return None,
        };
        Some(stage)
    }

    /// Position in the pipeline. Within one run the rank of the recorded
    /// stage never decreases.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Received => 0,
            Self::Designing | Self::ContentCopyWritten => 1,
            Self::MarketingStarted | Self::MarketingIdeaReceived => 2,
            Self::SalesStrategy | Self::SalesLeads => 3,
            Self::Supporting => 4,
            Self::Failed => u8::MAX,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_chain() {
        let mut role = AgentRole::Design;
        let mut names = vec![role.agent_name()];
        while let Some(next) = role.next() {
            names.push(next.agent_name());
            role = next;
        }
        assert_eq!(
            names,
            vec!["DesignAgent", "MarketingAgent", "SalesAgent", "SupportAgent"]
        );
    }

    #[test]
    fn test_stage_ranks_follow_pipeline_order() {
        let order = [
            PipelineStage::Received,
            PipelineStage::Designing,
            PipelineStage::MarketingIdeaReceived,
            PipelineStage::SalesStrategy,
            PipelineStage::Supporting,
        ];
        assert!(order.windows(2).all(|w| w[0].rank() < w[1].rank()));
        assert!(PipelineStage::Failed.rank() > PipelineStage::Supporting.rank());
    }

    #[test]
    fn test_stage_string_round_trip() {
        for stage in [
            PipelineStage::Designing,
            PipelineStage::MarketingStarted,
            PipelineStage::SalesLeads,
            PipelineStage::Failed,
        ] {
            assert_eq!(PipelineStage::parse(stage.as_str()), Some(stage));
        }
        assert_eq!(PipelineStage::parse("dancing"), None);
    }

    #[test]
    fn test_stage_serialization() {
        let json = serde_json::to_string(&PipelineStage::MarketingIdeaReceived).unwrap();
        assert_eq!(json, "\"marketing_idea_received\"");
    }
}
