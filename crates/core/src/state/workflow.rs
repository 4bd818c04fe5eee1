//! # Workflow Coordinator
//!
//! Thin façade over the [`ContextStore`] that records which stage a
//! workflow has reached, plus its transcript.

use super::context_store::{ContextStore, STAGE_KEY, TRANSCRIPT_KEY};
use crate::swarm::pipeline::PipelineStage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Kind of transcript line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptKind {
    Received,
    Response,
}

/// One line of a workflow transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub agent: String,
    pub kind: TranscriptKind,
    pub text: String,
}

impl fmt::Display for TranscriptEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.kind {
            TranscriptKind::Received => "received",
            TranscriptKind::Response => "response",
        };
        write!(f, "[{}] {}: {}", self.agent, verb, self.text)
    }
}

/// Records stage progress for workflows
#[derive(Debug, Clone)]
pub struct WorkflowCoordinator {
    store: Arc<ContextStore>,
}

impl WorkflowCoordinator {
    pub fn new(store: Arc<ContextStore>) -> Self {
        Self { store }
    }

    /// Write `"stage" = stage` for the workflow
    pub fn update_stage(&self, workflow_id: &str, stage: PipelineStage) {
        self.store.set(workflow_id, STAGE_KEY, stage.as_str());
        tracing::info!(workflow_id = %workflow_id, stage = %stage, "Stage updated");
    }

    pub fn current_stage(&self, workflow_id: &str) -> Option<PipelineStage> {
        self.store.stage(workflow_id)
    }

    pub fn record(&self, workflow_id: &str, agent: &str, kind: TranscriptKind, text: &str) {
        let entry = TranscriptEntry {
            agent: agent.to_string(),
            kind,
            text: text.to_string(),
        };
        match serde_json::to_value(&entry) {
            Ok(value) => self.store.append(workflow_id, TRANSCRIPT_KEY, value),
            Err(e) => tracing::warn!("Failed to record transcript entry: {}", e),
        }
    }

    /// Transcript recorded so far; malformed entries are skipped
    pub fn transcript(&self, workflow_id: &str) -> Vec<TranscriptEntry> {
        match self.store.get(workflow_id, TRANSCRIPT_KEY) {
            Some(serde_json::Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn store(&self) -> &Arc<ContextStore> {
        &self.store
    }
}
