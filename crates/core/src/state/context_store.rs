//! # Context Store
//!
//! Per-workflow key/value record of pipeline progress. Keys are only ever
//! overwritten, never removed; a workflow's map is created on its first write
//! and lives as long as the store.

use crate::swarm::pipeline::PipelineStage;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Key holding the current stage marker
pub const STAGE_KEY: &str = "stage";

/// Key holding the transcript array
pub const TRANSCRIPT_KEY: &str = "transcript";

type WorkflowContext = HashMap<String, Value>;

/// Shared store of workflow contexts
#[derive(Debug, Default)]
pub struct ContextStore {
    contexts: RwLock<HashMap<String, WorkflowContext>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert `value` under `(workflow_id, key)`
    pub fn set(&self, workflow_id: &str, key: &str, value: impl Into<Value>) {
        let mut contexts = self
            .contexts
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        contexts
            .entry(workflow_id.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
    }

    /// Last value set under `(workflow_id, key)`.
    ///
    /// `None` means the key was never set; a stored JSON `null` comes back as
    /// `Some(Value::Null)`.
    pub fn get(&self, workflow_id: &str, key: &str) -> Option<Value> {
        let contexts = self.contexts.read().unwrap_or_else(PoisonError::into_inner);
        contexts
            .get(workflow_id)
            .and_then(|ctx| ctx.get(key))
            .cloned()
    }

    /// Snapshot of every key recorded for a workflow
    pub fn get_context(&self, workflow_id: &str) -> HashMap<String, Value> {
        let contexts = self.contexts.read().unwrap_or_else(PoisonError::into_inner);
        contexts.get(workflow_id).cloned().unwrap_or_default()
    }

    /// Replace the array under `key` with itself plus `value`.
    ///
    /// A non-array value already stored under `key` becomes the first element.
    pub fn append(&self, workflow_id: &str, key: &str, value: impl Into<Value>) {
        let mut contexts = self
            .contexts
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let slot = contexts
            .entry(workflow_id.to_string())
            .or_default()
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));

        match slot {
            Value::Array(items) => items.push(value.into()),
            other => {
                let previous = other.take();
                *other = Value::Array(vec![previous, value.into()]);
            }
        }
    }

    /// Current stage marker, if one was recorded and is recognized
    pub fn stage(&self, workflow_id: &str) -> Option<PipelineStage> {
        self.get(workflow_id, STAGE_KEY)
            .as_ref()
            .and_then(Value::as_str)
            .and_then(PipelineStage::parse)
    }

    /// Whether anything was ever recorded for the workflow
    pub fn contains(&self, workflow_id: &str) -> bool {
        let contexts = self.contexts.read().unwrap_or_else(PoisonError::into_inner);
        contexts.contains_key(workflow_id)
    }

    /// All known workflow ids, sorted
    pub fn workflow_ids(&self) -> Vec<String> {
        let contexts = self.contexts.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<String> = contexts.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_get_absent_is_distinct_from_null() {
        let store = ContextStore::new();
        assert_eq!(store.get("wf1", "stage"), None);

        store.set("wf1", "note", Value::Null);
        assert_eq!(store.get("wf1", "note"), Some(Value::Null));
        assert_eq!(store.get("wf1", "other"), None);
    }

    #[test]
    fn test_last_write_wins() {
        let store = ContextStore::new();
        store.set("wf1", STAGE_KEY, "designing");
        store.set("wf1", STAGE_KEY, "sales_strategy");
        assert_eq!(store.get("wf1", STAGE_KEY), Some(json!("sales_strategy")));
        assert_eq!(store.stage("wf1"), Some(PipelineStage::SalesStrategy));
    }

    #[test]
    fn test_get_context_snapshot() {
        let store = ContextStore::new();
        assert!(store.get_context("missing").is_empty());
        assert!(!store.contains("missing"));

        store.set("wf1", "stage", "designing");
        store.set("wf1", "design", json!({"concept": "round"}));
        store.set("wf2", "stage", "supporting");

        let ctx = store.get_context("wf1");
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx["design"]["concept"], "round");
        assert_eq!(store.workflow_ids(), vec!["wf1", "wf2"]);
    }

    #[test]
    fn test_append_builds_array() {
        let store = ContextStore::new();
        store.append("wf1", TRANSCRIPT_KEY, "first");
        store.append("wf1", TRANSCRIPT_KEY, "second");
        assert_eq!(
            store.get("wf1", TRANSCRIPT_KEY),
            Some(json!(["first", "second"]))
        );

        store.set("wf1", "scalar", 1);
        store.append("wf1", "scalar", 2);
        assert_eq!(store.get("wf1", "scalar"), Some(json!([1, 2])));
    }

    #[test]
    fn test_unrecognized_stage_marker() {
        let store = ContextStore::new();
        store.set("wf1", STAGE_KEY, "custom");
        assert_eq!(store.stage("wf1"), None);
        assert_eq!(store.get("wf1", STAGE_KEY), Some(json!("custom")));
    }

    #[test]
    fn test_concurrent_writers_do_not_interfere() {
        let store = Arc::new(ContextStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let wf = format!("wf-{}", i);
                    for n in 0..50 {
                        store.set(&wf, "counter", n);
                        store.append(&wf, "log", n);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for i in 0..8 {
            let wf = format!("wf-{}", i);
            assert_eq!(store.get(&wf, "counter"), Some(json!(49)));
            let log = store.get(&wf, "log").unwrap();
            assert_eq!(log.as_array().unwrap().len(), 50);
        }
    }
}
