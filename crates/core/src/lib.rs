//! # Ideaforge Core
//!
//! Orchestration core of Ideaforge: a fixed pipeline of agents that turns a
//! product idea into a design, a campaign and a sales plan.
//!
//! ## Architecture
//!
//! - `bus/` - Typed messages and the name-addressed message bus
//! - `agents/` - Pipeline stages and the generation capability
//! - `models` - LLM provider configuration
//! - `state/` - Per-workflow context store and stage tracking
//! - `swarm/` - Pipeline vocabulary, events and the coordinator
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ideaforge_core::swarm::{Coordinator, CoordinatorConfig};
//!
//! let coordinator = Coordinator::new(CoordinatorConfig::default());
//! let report = coordinator.run("smart water bottle", "wf1").await?;
//! ```

pub mod agents;
pub mod bus;
pub mod models;
pub mod state;
pub mod swarm;
