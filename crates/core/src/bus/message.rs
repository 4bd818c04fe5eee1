//! # Messages
//!
//! One hop of the pipeline. A message carries a typed [`Command`], the typed
//! artifacts produced so far ([`Payload`]) and an open metadata map.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Sender name used by callers that are not agents
pub const CALLER: &str = "Caller";

/// Command carried by a message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Begin the design stage for an idea
    StartDesign,
    /// A design artifact is available for marketing
    DesignReady,
    /// Run a generic launch campaign without a design
    StartCampaign,
    /// Marketing finished; sales strategy may start
    MarketingDone,
    /// Produce a lead-generation plan
    GenerateSalesLeads,
    /// Answer a customer support query
    HandleSupport,
    /// Write marketing copy
    WriteContentCopy,
    /// Finalize sales collateral from written copy
    FinalizeSalesMaterial,
    /// Anything else; always ignored by agents
    Unknown(String),
}

impl Command {
    /// Wire name of the command
    pub fn as_str(&self) -> &str {
        match self {
            Self::StartDesign => "start_design",
            Self::DesignReady => "design_ready",
            Self::StartCampaign => "start_campaign",
            Self::MarketingDone => "marketing_done",
            Self::GenerateSalesLeads => "generate_sales_leads",
            Self::HandleSupport => "handle_support",
            Self::WriteContentCopy => "write_content_copy",
            Self::FinalizeSalesMaterial => "finalize_sales_material",
            Self::Unknown(raw) => raw,
        }
    }

    /// Parse a wire command. Names match exactly, except that the two
    /// legacy commands which glued a payload onto the name
    /// (`"design_ready: ..."`, `"marketing_done: ..."`) map to the bare
    /// command; that payload is dropped and must travel in [`Payload`].
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed {
            "start_design" => Self::StartDesign,
            "design_ready" => Self::DesignReady,
            "start_campaign" => Self::StartCampaign,
            "marketing_done" => Self::MarketingDone,
            "generate_sales_leads" => Self::GenerateSalesLeads,
            "handle_support" => Self::HandleSupport,
            "write_content_copy" => Self::WriteContentCopy,
            "finalize_sales_material" => Self::FinalizeSalesMaterial,
            _ => match trimmed.split_once(':') {
                Some((head, _)) if head.trim() == "design_ready" => Self::DesignReady,
                Some((head, _)) if head.trim() == "marketing_done" => Self::MarketingDone,
                _ => Self::Unknown(raw.to_string()),
            },
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// Artifacts accumulated along the pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// The original product idea
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idea: Option<String>,
    /// Design concept from DesignAgent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design: Option<String>,
    /// Campaign plan from MarketingAgent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign: Option<String>,
    /// Sales strategy from SalesAgent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales: Option<String>,
    /// Custom customer query for SupportAgent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl Payload {
    pub fn with_idea(mut self, idea: impl Into<String>) -> Self {
        self.idea = Some(idea.into());
        self
    }

    pub fn with_design(mut self, design: impl Into<String>) -> Self {
        self.design = Some(design.into());
        self
    }

    pub fn with_campaign(mut self, campaign: impl Into<String>) -> Self {
        self.campaign = Some(campaign.into());
        self
    }

    pub fn with_sales(mut self, sales: impl Into<String>) -> Self {
        self.sales = Some(sales.into());
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }
}

/// An immutable message between agents
///
/// Built with [`Message::new`] and the `with_*` builders; once handed to the
/// bus it is only ever read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    sender: String,
    receiver: String,
    command: Command,
    workflow_id: String,
    #[serde(default)]
    payload: Payload,
    #[serde(default)]
    metadata: BTreeMap<String, Value>,
}

impl Message {
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        command: Command,
        workflow_id: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            command,
            workflow_id: workflow_id.into(),
            payload: Payload::default(),
            metadata: BTreeMap::new(),
        }
    }

    /// Attach typed artifacts
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Attach one metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    /// String metadata value, if present and a string
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// The idea this message is about: typed payload first, then the
    /// `"idea"` metadata entry callers use when entering the pipeline.
    pub fn idea(&self) -> Option<&str> {
        self.payload
            .idea
            .as_deref()
            .or_else(|| self.metadata_str("idea"))
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Message(from={}, to={}, command={}, workflow_id={})",
            self.sender, self.receiver, self.command, self.workflow_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_commands() {
        assert_eq!(Command::parse("start_design"), Command::StartDesign);
        assert_eq!(Command::parse(" handle_support "), Command::HandleSupport);
        assert_eq!(
            "generate_sales_leads".parse::<Command>().unwrap(),
            Command::GenerateSalesLeads
        );
    }

    #[test]
    fn test_parse_legacy_payload_suffix() {
        assert_eq!(
            Command::parse("marketing_done: smart water bottle"),
            Command::MarketingDone
        );
        assert_eq!(Command::parse("design_ready:"), Command::DesignReady);
    }

    #[test]
    fn test_suffix_only_accepted_on_legacy_commands() {
        assert_eq!(
            Command::parse("start_design:anything"),
            Command::Unknown("start_design:anything".to_string())
        );
        assert_eq!(
            Command::parse("handle_support: refund"),
            Command::Unknown("handle_support: refund".to_string())
        );
    }

    #[test]
    fn test_parse_unknown_keeps_raw_text() {
        let cmd = Command::parse("dance");
        assert_eq!(cmd, Command::Unknown("dance".to_string()));
        assert_eq!(cmd.to_string(), "dance");
    }

    #[test]
    fn test_idea_prefers_payload_over_metadata() {
        let msg = Message::new(CALLER, "DesignAgent", Command::StartDesign, "wf1")
            .with_metadata("idea", "from metadata");
        assert_eq!(msg.idea(), Some("from metadata"));

        let msg = msg.with_payload(Payload::default().with_idea("from payload"));
        assert_eq!(msg.idea(), Some("from payload"));
    }

    #[test]
    fn test_message_serialization() {
        let msg = Message::new("DesignAgent", "MarketingAgent", Command::DesignReady, "wf1")
            .with_payload(Payload::default().with_idea("lamp").with_design("round"));
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"design_ready\""));
        assert!(!json.contains("campaign"));

        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.payload().design.as_deref(), Some("round"));
    }
}
