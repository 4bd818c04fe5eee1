//! # Swarm Events
//!
//! Observability events emitted by the bus and the agents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of swarm event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SwarmEventKind {
    /// Coordinator accepted an idea
    PipelineStarted,
    /// Bus handed a message to its receiver
    MessageDelivered,
    /// Receiver name not registered
    MessageUnroutable,
    /// Agent did not recognize the command
    CommandIgnored,
    /// Agent recorded a stage marker
    StageRecorded,
    /// Agent produced an artifact
    ArtifactGenerated,
    /// Generation capability failed or timed out
    GenerationFailed,
    /// Dispatch chain returned to the coordinator
    PipelineCompleted,
}

/// An event in the swarm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmEvent {
    /// Unique event ID
    pub id: String,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// Kind of event
    pub kind: SwarmEventKind,
    /// Agent (or bus/coordinator) that produced this event
    pub agent: String,
    /// Workflow the event belongs to
    #[serde(default)]
    pub workflow_id: Option<String>,
    /// Associated data (JSON)
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl SwarmEvent {
    /// Create a new event
    pub fn new(kind: SwarmEventKind, agent: &str) -> Self {
        Self {
            id: new_id("evt"),
            timestamp: Utc::now(),
            kind,
            agent: agent.to_string(),
            workflow_id: None,
            data: None,
        }
    }

    /// Add data to the event
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Tag the event with its workflow
    pub fn with_workflow(mut self, workflow_id: &str) -> Self {
        self.workflow_id = Some(workflow_id.to_string());
        self
    }
}

/// Generate a short unique id with a prefix (not cryptographic)
pub fn new_id(prefix: &str) -> String {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_nanos();
    format!("{}-{:x}-{:x}", prefix, nanos, rand_u32())
}

/// Simple random number (not cryptographic)
fn rand_u32() -> u32 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};
    RandomState::new().build_hasher().finish() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = SwarmEvent::new(SwarmEventKind::StageRecorded, "DesignAgent")
            .with_workflow("wf1")
            .with_data(serde_json::json!({"stage": "designing"}));

        assert_eq!(event.agent, "DesignAgent");
        assert_eq!(event.workflow_id.as_deref(), Some("wf1"));
        assert!(event.id.starts_with("evt-"));
    }

    #[test]
    fn test_event_kind_serialization() {
        let json = serde_json::to_string(&SwarmEventKind::MessageUnroutable).unwrap();
        assert_eq!(json, "\"message_unroutable\"");
    }

    #[test]
    fn test_new_id_is_unique() {
        assert_ne!(new_id("wf"), new_id("wf"));
    }
}
