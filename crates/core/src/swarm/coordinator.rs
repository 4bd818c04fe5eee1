//! # Swarm Coordinator
//!
//! Owns the shared state of an Ideaforge swarm (the context store, the bus
//! and its agent registrations) and is the caller-facing entry point:
//! [`Coordinator::run`] turns an idea into a finished workflow.
//!
//! Runs for different workflow ids proceed concurrently. Runs for the same
//! workflow id take a per-workflow gate and execute one after the other.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;

use crate::agents::{
    Agent, AgentCore, ContentAgent, DesignAgent, FailurePolicy, Generation, Generator,
    LlmGenerator, MarketingAgent, SalesAgent, SupportAgent,
};
use crate::bus::{Command, Delivery, Message, MessageBus, CALLER};
use crate::models::{LlmProvider, ModelConfig};
use crate::state::{ContextStore, TranscriptEntry, WorkflowCoordinator};

use super::events::{new_id, SwarmEvent, SwarmEventKind};
use super::pipeline::{AgentRole, PipelineStage};

/// Configuration for the coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Model used by every agent without an override
    pub model: ModelConfig,
    /// Per-agent model overrides (agent name -> model)
    pub per_agent_models: HashMap<String, String>,
    /// Per-agent provider overrides (agent name -> provider)
    pub per_agent_providers: HashMap<String, LlmProvider>,
    /// Per-agent base URL overrides (agent name -> base_url, OpenAI only)
    pub per_agent_base_urls: HashMap<String, String>,
    /// Upper bound for one generation call
    pub generation_timeout_secs: u64,
    pub failure_policy: FailurePolicy,
    /// Let the SalesAgent continue to the SupportAgent
    pub support_handoff: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            per_agent_models: HashMap::new(),
            per_agent_providers: HashMap::new(),
            per_agent_base_urls: HashMap::new(),
            generation_timeout_secs: 120,
            failure_policy: FailurePolicy::Forward,
            support_handoff: false,
        }
    }
}

impl CoordinatorConfig {
    /// Model config for one agent: per-agent override, then global
    pub fn get_model_config(&self, agent: &str) -> ModelConfig {
        let provider = self
            .per_agent_providers
            .get(agent)
            .cloned()
            .unwrap_or_else(|| self.model.provider.clone());

        // The global model name only makes sense for the global provider
        let model = self
            .per_agent_models
            .get(agent)
            .cloned()
            .unwrap_or_else(|| {
                if provider == self.model.provider {
                    self.model.model.clone()
                } else {
                    default_model(&provider).to_string()
                }
            });

        let base_url = if provider.supports_base_url() {
            self.per_agent_base_urls
                .get(agent)
                .or(self.model.base_url.as_ref())
                .cloned()
        } else {
            None
        };

        ModelConfig {
            provider,
            model,
            base_url,
        }
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }
}

fn default_model(provider: &LlmProvider) -> &'static str {
    match provider {
        LlmProvider::Anthropic => "claude-sonnet-4-20250514",
        LlmProvider::OpenAI => "gpt-4o",
        LlmProvider::Gemini => "gemini-2.0-flash-exp",
        LlmProvider::OpenRouter => "anthropic/claude-3.5-sonnet",
        LlmProvider::Grok => "grok-2",
        LlmProvider::DeepSeek => "deepseek-chat",
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("Empty idea provided")]
    EmptyIdea,
    #[error("Empty workflow id")]
    EmptyWorkflowId,
}

/// What one run produced
#[derive(Debug, Clone)]
pub struct WorkflowReport {
    pub workflow_id: String,
    /// Stage recorded when the chain returned
    pub final_stage: Option<PipelineStage>,
    /// Lines this run appended; earlier runs of the same workflow stay in
    /// the store but are not repeated here
    pub transcript: Vec<TranscriptEntry>,
    /// Nested delivery chain starting at the DesignAgent
    pub delivery: Delivery,
    /// Snapshot of the workflow's context taken before the gate is released
    pub context: HashMap<String, serde_json::Value>,
}

impl WorkflowReport {
    /// Transcript rendered as `[Agent] received: ...` lines
    pub fn transcript_lines(&self) -> Vec<String> {
        self.transcript.iter().map(ToString::to_string).collect()
    }
}

/// Generate a workflow id for callers that did not bring one
pub fn new_workflow_id() -> String {
    new_id("wf")
}

type Gate = Arc<tokio::sync::Mutex<()>>;

/// The swarm coordinator
pub struct Coordinator {
    context: Arc<ContextStore>,
    workflows: WorkflowCoordinator,
    bus: MessageBus,
    gates: Mutex<HashMap<String, Gate>>,
}

impl Coordinator {
    /// Coordinator whose agents call the configured LLM providers
    pub fn new(config: CoordinatorConfig) -> Self {
        Self::build(config, |config, role| {
            Arc::new(LlmGenerator::new(config.get_model_config(role.agent_name())))
        })
    }

    /// Coordinator whose agents all share `generator`
    pub fn with_generator(config: CoordinatorConfig, generator: Arc<dyn Generator>) -> Self {
        Self::build(config, move |_, _| Arc::clone(&generator))
    }

    fn build(
        config: CoordinatorConfig,
        generator_for: impl Fn(&CoordinatorConfig, AgentRole) -> Arc<dyn Generator>,
    ) -> Self {
        let context = Arc::new(ContextStore::new());
        let workflows = WorkflowCoordinator::new(Arc::clone(&context));
        let bus = MessageBus::new();

        for role in AgentRole::all() {
            let generation = Generation::new(
                generator_for(&config, role),
                config.generation_timeout(),
                config.failure_policy,
            );
            let core = AgentCore::new(role, workflows.clone(), generation);
            let agent: Arc<dyn Agent> = match role {
                AgentRole::Content => Arc::new(ContentAgent::new(core)),
                AgentRole::Design => Arc::new(DesignAgent::new(core)),
                AgentRole::Marketing => Arc::new(MarketingAgent::new(core)),
                AgentRole::Sales => Arc::new(SalesAgent::new(core, config.support_handoff)),
                AgentRole::Support => Arc::new(SupportAgent::new(core)),
            };
            bus.register_agent(agent);
        }

        tracing::debug!(agents = ?bus.agent_names(), "Swarm assembled");

        Self {
            context,
            workflows,
            bus,
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Broadcast bus and agent events on `tx`
    pub fn with_event_channel(mut self, tx: broadcast::Sender<SwarmEvent>) -> Self {
        self.bus = std::mem::take(&mut self.bus).with_event_channel(tx);
        self
    }

    pub fn context(&self) -> &Arc<ContextStore> {
        &self.context
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    pub fn subscribe(&self) -> Option<broadcast::Receiver<SwarmEvent>> {
        self.bus.subscribe()
    }

    /// Run the pipeline for `idea` under `workflow_id`.
    ///
    /// Records stage `received`, sends `StartDesign` to the DesignAgent and
    /// returns once the whole dispatch chain has unwound.
    #[tracing::instrument(skip(self, idea), fields(idea_preview = %idea.chars().take(50).collect::<String>()))]
    pub async fn run(
        &self,
        idea: &str,
        workflow_id: &str,
    ) -> Result<WorkflowReport, CoordinatorError> {
        let idea = idea.trim();
        if idea.is_empty() {
            return Err(CoordinatorError::EmptyIdea);
        }
        if workflow_id.trim().is_empty() {
            return Err(CoordinatorError::EmptyWorkflowId);
        }

        let gate = self.gate(workflow_id);
        let (delivery, final_stage, transcript, context) = {
            let _guard = gate.lock().await;
            let seen = self.workflows.transcript(workflow_id).len();

            self.bus.emit(
                SwarmEvent::new(SwarmEventKind::PipelineStarted, "coordinator")
                    .with_workflow(workflow_id)
                    .with_data(serde_json::json!({ "idea": idea })),
            );
            self.workflows
                .update_stage(workflow_id, PipelineStage::Received);

            let message = Message::new(
                CALLER,
                AgentRole::Design.agent_name(),
                Command::StartDesign,
                workflow_id,
            )
            .with_metadata("idea", idea);
            let delivery = self.bus.send(message).await;

            // Read while the gate is held so a queued run cannot overwrite them
            let transcript = self
                .workflows
                .transcript(workflow_id)
                .into_iter()
                .skip(seen)
                .collect::<Vec<_>>();
            (
                delivery,
                self.workflows.current_stage(workflow_id),
                transcript,
                self.context.get_context(workflow_id),
            )
        };
        self.release_gate(workflow_id, gate);

        tracing::info!(
            workflow_id = %workflow_id,
            final_stage = ?final_stage,
            hops = delivery.hops().len(),
            "Pipeline finished"
        );
        self.bus.emit(
            SwarmEvent::new(SwarmEventKind::PipelineCompleted, "coordinator")
                .with_workflow(workflow_id)
                .with_data(serde_json::json!({
                    "stage": final_stage.map(|s| s.as_str()),
                    "completed_cleanly": delivery.completed_cleanly(),
                })),
        );

        Ok(WorkflowReport {
            workflow_id: workflow_id.to_string(),
            final_stage,
            transcript,
            delivery,
            context,
        })
    }

    /// Send an arbitrary message under its workflow's gate
    pub async fn dispatch(&self, message: Message) -> Delivery {
        let workflow_id = message.workflow_id().to_string();
        let gate = self.gate(&workflow_id);
        let delivery = {
            let _guard = gate.lock().await;
            self.bus.send(message).await
        };
        self.release_gate(&workflow_id, gate);
        delivery
    }

    fn gate(&self, workflow_id: &str) -> Gate {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(gates.entry(workflow_id.to_string()).or_default())
    }

    /// Drop the gate once no other run holds or waits on it
    fn release_gate(&self, workflow_id: &str, gate: Gate) {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one here
        if Arc::strong_count(&gate) == 2 {
            gates.remove(workflow_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::ScriptedGenerator;
    use crate::agents::{GenerationError, GenerationRequest};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Echoes the prompt after yielding, so concurrent runs interleave
    struct YieldingEcho;

    #[async_trait]
    impl Generator for YieldingEcho {
        async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            Ok(format!("{} <- {}", request.agent, request.prompt))
        }
    }

    /// Tracks how many generations run at the same time
    #[derive(Default)]
    struct InFlight {
        current: AtomicUsize,
        max: AtomicUsize,
    }

    #[async_trait]
    impl Generator for InFlight {
        async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.max.fetch_max(now, Ordering::SeqCst);
            for _ in 0..4 {
                tokio::task::yield_now().await;
            }
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(format!("{} output", request.agent))
        }
    }

    fn coordinator(generator: Arc<dyn Generator>) -> Coordinator {
        Coordinator::with_generator(CoordinatorConfig::default(), generator)
    }

    fn recorded_stages(rx: &mut broadcast::Receiver<SwarmEvent>, workflow_id: &str) -> Vec<String> {
        let mut stages = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if event.kind == SwarmEventKind::StageRecorded
                && event.workflow_id.as_deref() == Some(workflow_id)
            {
                let data = event.data.unwrap_or_default();
                stages.push(data["stage"].as_str().unwrap_or_default().to_string());
            }
        }
        stages
    }

    #[test]
    fn test_coordinator_config_default() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.generation_timeout_secs, 120);
        assert_eq!(config.failure_policy, FailurePolicy::Forward);
        assert!(!config.support_handoff);

        let parsed: CoordinatorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.model, ModelConfig::default());
    }

    #[test]
    fn test_per_agent_model_overrides() {
        let mut config = CoordinatorConfig::default();
        config
            .per_agent_providers
            .insert("SalesAgent".to_string(), LlmProvider::Anthropic);
        config
            .per_agent_models
            .insert("SupportAgent".to_string(), "llama-3.1-8b-instant".to_string());

        let sales = config.get_model_config("SalesAgent");
        assert_eq!(sales.provider, LlmProvider::Anthropic);
        assert_eq!(sales.model, "claude-sonnet-4-20250514");
        assert_eq!(sales.base_url, None);

        let support = config.get_model_config("SupportAgent");
        assert_eq!(support.model, "llama-3.1-8b-instant");
        assert_eq!(support.base_url, config.model.base_url);

        assert_eq!(config.get_model_config("DesignAgent"), config.model);
    }

    #[tokio::test]
    async fn test_smart_water_bottle_pipeline() {
        let (tx, mut rx) = broadcast::channel(256);
        let coordinator = coordinator(ScriptedGenerator::empty()).with_event_channel(tx);

        let report = coordinator.run("smart water bottle", "wf1").await.unwrap();

        assert_eq!(
            recorded_stages(&mut rx, "wf1"),
            vec!["designing", "marketing_idea_received", "sales_strategy"]
        );
        assert_eq!(report.final_stage, Some(PipelineStage::SalesStrategy));

        let receivers: Vec<String> = report
            .delivery
            .hops()
            .into_iter()
            .map(|hop| hop.receiver)
            .collect();
        assert_eq!(receivers, vec!["DesignAgent", "MarketingAgent", "SalesAgent"]);
        // SalesAgent sends nothing further
        assert_eq!(report.delivery.last().receiver(), "SalesAgent");
        assert!(report.delivery.completed_cleanly());

        let lines = report.transcript_lines();
        assert_eq!(lines[0], "[DesignAgent] received: smart water bottle");
        assert_eq!(lines.len(), 6);
        assert!(report.context.contains_key("design"));
        assert!(report.context.contains_key("campaign"));
        assert!(report.context.contains_key("sales_strategy"));
    }

    #[tokio::test]
    async fn test_stage_rank_never_decreases() {
        let (tx, mut rx) = broadcast::channel(256);
        let mut config = CoordinatorConfig::default();
        config.support_handoff = true;
        let coordinator =
            Coordinator::with_generator(config, ScriptedGenerator::empty()).with_event_channel(tx);

        coordinator.run("lamp", "wf1").await.unwrap();

        let ranks: Vec<u8> = recorded_stages(&mut rx, "wf1")
            .iter()
            .filter_map(|s| PipelineStage::parse(s))
            .map(|s| s.rank())
            .collect();
        assert_eq!(ranks.len(), 4);
        assert!(ranks.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_support_handoff_reaches_terminal_stage() {
        let mut config = CoordinatorConfig::default();
        config.support_handoff = true;
        let coordinator = Coordinator::with_generator(config, ScriptedGenerator::empty());

        let report = coordinator.run("lamp", "wf1").await.unwrap();

        assert_eq!(report.final_stage, Some(PipelineStage::Supporting));
        assert_eq!(report.delivery.hops().len(), 4);
        assert!(report.context.contains_key("support_response"));
    }

    #[tokio::test]
    async fn test_unknown_agent_is_silent() {
        let coordinator = coordinator(ScriptedGenerator::empty());
        let msg = Message::new(CALLER, "UnknownAgent", Command::StartDesign, "wf2");

        let delivery = coordinator.dispatch(msg).await;

        assert!(matches!(delivery, Delivery::Unroutable { .. }));
        assert!(!coordinator.context().contains("wf2"));
    }

    #[tokio::test]
    async fn test_unknown_command_has_no_effect() {
        let generator = ScriptedGenerator::empty();
        let coordinator = coordinator(generator.clone());
        let msg = Message::new(
            CALLER,
            "DesignAgent",
            Command::parse("design_everything"),
            "wf1",
        )
        .with_metadata("idea", "lamp");

        let delivery = coordinator.dispatch(msg).await;

        assert_eq!(delivery.hops().len(), 1);
        assert!(!delivery.completed_cleanly());
        assert!(!coordinator.context().contains("wf1"));
        assert!(generator.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_second_run_overwrites_first() {
        let generator = ScriptedGenerator::with_responses(
            ["d1", "m1", "s1", "d2", "m2", "s2"].map(|s| Ok(s.to_string())),
        );
        let coordinator = coordinator(generator);

        coordinator.run("first idea", "wf1").await.unwrap();
        let report = coordinator.run("second idea", "wf1").await.unwrap();

        assert_eq!(report.context["design"], "d2");
        assert_eq!(report.context["sales_strategy"], "s2");
        assert_eq!(report.final_stage, Some(PipelineStage::SalesStrategy));
        let lines = report.transcript_lines();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "[DesignAgent] received: second idea");
        assert!(lines.iter().all(|line| !line.contains("first idea")));
        // The store keeps both runs
        assert_eq!(coordinator.workflows.transcript("wf1").len(), 12);
    }

    #[tokio::test]
    async fn test_queued_run_does_not_leak_into_report() {
        let coordinator = coordinator(Arc::new(YieldingEcho));

        let (first, second) = tokio::join!(
            coordinator.run("solar backpack", "wf1"),
            coordinator.run("ceramic kettle", "wf1")
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        for (report, own, other) in [
            (&first, "solar backpack", "ceramic kettle"),
            (&second, "ceramic kettle", "solar backpack"),
        ] {
            assert_eq!(report.transcript.len(), 6);
            assert!(report
                .transcript_lines()
                .iter()
                .all(|line| !line.contains(other)));
            let design = report.context["design"].as_str().unwrap();
            assert!(design.contains(own) && !design.contains(other));
        }
    }

    #[tokio::test]
    async fn test_interleaved_workflows_do_not_mix() {
        let coordinator = coordinator(Arc::new(YieldingEcho));

        let (a, b) = tokio::join!(
            coordinator.run("solar backpack", "a"),
            coordinator.run("ceramic kettle", "b")
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        for key in ["design", "campaign", "sales_strategy"] {
            let in_a = a.context[key].as_str().unwrap();
            let in_b = b.context[key].as_str().unwrap();
            assert!(in_a.contains("solar backpack") && !in_a.contains("ceramic kettle"));
            assert!(in_b.contains("ceramic kettle") && !in_b.contains("solar backpack"));
        }
        assert_eq!(a.final_stage, Some(PipelineStage::SalesStrategy));
        assert_eq!(b.final_stage, Some(PipelineStage::SalesStrategy));
    }

    #[tokio::test]
    async fn test_same_workflow_runs_are_serialized() {
        let generator = Arc::new(InFlight::default());
        let coordinator = coordinator(generator.clone());

        let (first, second) = tokio::join!(
            coordinator.run("lamp", "wf1"),
            coordinator.run("chair", "wf1")
        );

        assert!(first.is_ok() && second.is_ok());
        assert_eq!(generator.max.load(Ordering::SeqCst), 1);
        assert!(coordinator.gates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_halt_policy_stops_at_design() {
        let mut config = CoordinatorConfig::default();
        config.failure_policy = FailurePolicy::Halt;
        let generator = ScriptedGenerator::with_responses([Err(GenerationError::Provider(
            "invalid api key".to_string(),
        ))]);
        let coordinator = Coordinator::with_generator(config, generator);

        let report = coordinator.run("lamp", "wf1").await.unwrap();

        assert_eq!(report.final_stage, Some(PipelineStage::Failed));
        assert_eq!(report.delivery.hops().len(), 1);
        assert_eq!(report.context["error"], "invalid api key");
        assert!(!report.delivery.completed_cleanly());
    }

    #[tokio::test]
    async fn test_forward_policy_carries_error_text() {
        let generator = ScriptedGenerator::with_responses([Err(GenerationError::Provider(
            "invalid api key".to_string(),
        ))]);
        let coordinator = coordinator(generator.clone());

        let report = coordinator.run("lamp", "wf1").await.unwrap();

        assert_eq!(report.final_stage, Some(PipelineStage::SalesStrategy));
        assert_eq!(report.context["design"], "DesignAgent Error: invalid api key");
        assert!(generator.prompts()[1].contains("DesignAgent Error: invalid api key"));
    }

    #[tokio::test]
    async fn test_empty_idea_is_rejected() {
        let coordinator = coordinator(ScriptedGenerator::empty());
        assert!(matches!(
            coordinator.run("   ", "wf1").await,
            Err(CoordinatorError::EmptyIdea)
        ));
        assert!(!coordinator.context().contains("wf1"));
    }

    #[test]
    fn test_new_workflow_id_prefix() {
        assert!(new_workflow_id().starts_with("wf-"));
    }
}
