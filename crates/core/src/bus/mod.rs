//! # Message Bus
//!
//! Name-addressed router between agents.
//!
//! ```text
//! Caller ──send──▶ DesignAgent ──send──▶ MarketingAgent ──send──▶ SalesAgent
//!                      │                      │                      │
//!                      └──────── one nested frame per hop ───────────┘
//! ```
//!
//! `send` awaits the receiver's `receive`, which may itself call `send`, so a
//! pipeline of N stages unwinds as N nested deliveries. Unknown receivers are
//! not errors: the hop is reported as [`Delivery::Unroutable`].

pub mod message;

pub use message::{Command, Message, Payload, CALLER};

use crate::agents::{Agent, AgentOutcome};
use crate::swarm::events::{SwarmEvent, SwarmEventKind};
use crate::swarm::pipeline::PipelineStage;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

/// Result of handing one message to the bus
#[derive(Debug, Clone)]
pub enum Delivery {
    /// The receiver ran; `outcome` says what it did
    Delivered {
        receiver: String,
        outcome: AgentOutcome,
    },
    /// No agent registered under `receiver`
    Unroutable { receiver: String },
}

/// One step of a dispatch chain, flattened
#[derive(Debug, Clone, PartialEq)]
pub struct Hop {
    pub receiver: String,
    pub routed: bool,
    pub stage: Option<PipelineStage>,
}

impl Delivery {
    pub fn receiver(&self) -> &str {
        match self {
            Self::Delivered { receiver, .. } | Self::Unroutable { receiver } => receiver,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    /// Every hop of the chain in dispatch order
    pub fn hops(&self) -> Vec<Hop> {
        let mut hops = Vec::new();
        let mut current = Some(self);
        while let Some(delivery) = current {
            match delivery {
                Self::Delivered { receiver, outcome } => {
                    hops.push(Hop {
                        receiver: receiver.clone(),
                        routed: true,
                        stage: outcome.stage(),
                    });
                    current = outcome.forwarded();
                }
                Self::Unroutable { receiver } => {
                    hops.push(Hop {
                        receiver: receiver.clone(),
                        routed: false,
                        stage: None,
                    });
                    current = None;
                }
            }
        }
        hops
    }

    /// The delivery that ended the chain
    pub fn last(&self) -> &Delivery {
        let mut current = self;
        while let Self::Delivered { outcome, .. } = current {
            match outcome.forwarded() {
                Some(next) => current = next,
                None => break,
            }
        }
        current
    }

    /// Whether the chain ended because an agent chose not to continue,
    /// rather than on an ignored command, a failure or an unknown receiver.
    pub fn completed_cleanly(&self) -> bool {
        matches!(
            self.last(),
            Self::Delivered {
                outcome: AgentOutcome::Handled { .. },
                ..
            }
        )
    }
}

/// Routes messages to registered agents
#[derive(Default)]
pub struct MessageBus {
    agents: RwLock<HashMap<String, Arc<dyn Agent>>>,
    event_tx: Option<broadcast::Sender<SwarmEvent>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish bus and agent events to a broadcast channel
    pub fn with_event_channel(mut self, tx: broadcast::Sender<SwarmEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Bind `name` to `agent`; an existing binding is replaced
    pub fn register(&self, name: impl Into<String>, agent: Arc<dyn Agent>) {
        let name = name.into();
        let mut agents = self.agents.write().unwrap_or_else(PoisonError::into_inner);
        if agents.insert(name.clone(), agent).is_some() {
            tracing::debug!(agent = %name, "Replaced existing agent registration");
        }
    }

    /// Bind an agent under its own name
    pub fn register_agent(&self, agent: Arc<dyn Agent>) {
        let name = agent.name().to_string();
        self.register(name, agent);
    }

    /// Registered agent names, sorted
    pub fn agent_names(&self) -> Vec<String> {
        let agents = self.agents.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = agents.keys().cloned().collect();
        names.sort();
        names
    }

    fn lookup(&self, name: &str) -> Option<Arc<dyn Agent>> {
        let agents = self.agents.read().unwrap_or_else(PoisonError::into_inner);
        agents.get(name).cloned()
    }

    /// Deliver `message` to its receiver and wait for the receiver (and any
    /// follow-up it sends) to finish.
    pub async fn send(&self, message: Message) -> Delivery {
        let receiver = message.receiver().to_string();

        let Some(agent) = self.lookup(&receiver) else {
            tracing::warn!(
                receiver = %receiver,
                workflow_id = %message.workflow_id(),
                "[MessageBus] Agent '{}' not found",
                receiver
            );
            self.emit(
                SwarmEvent::new(SwarmEventKind::MessageUnroutable, "bus")
                    .with_workflow(message.workflow_id())
                    .with_data(serde_json::json!({
                        "receiver": receiver,
                        "command": message.command().as_str(),
                    })),
            );
            return Delivery::Unroutable { receiver };
        };

        tracing::info!(
            sender = %message.sender(),
            receiver = %receiver,
            command = %message.command(),
            workflow_id = %message.workflow_id(),
            "Delivering message"
        );
        self.emit(
            SwarmEvent::new(SwarmEventKind::MessageDelivered, "bus")
                .with_workflow(message.workflow_id())
                .with_data(serde_json::json!({
                    "sender": message.sender(),
                    "receiver": receiver,
                    "command": message.command().as_str(),
                })),
        );

        let outcome = agent.receive(&message, self).await;
        Delivery::Delivered { receiver, outcome }
    }

    /// Publish an event; dropped when nobody listens
    pub fn emit(&self, event: SwarmEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }

    /// Subscribe to events, if an event channel is configured
    pub fn subscribe(&self) -> Option<broadcast::Receiver<SwarmEvent>> {
        self.event_tx.as_ref().map(broadcast::Sender::subscribe)
    }
}
