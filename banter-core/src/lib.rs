//! Personality-driven dialogue selection for autonomous game agents.
//!
//! This crate provides:
//! - A validated, shared template bank of utterances
//! - Per-agent personality, rapport and memory with tiered decay
//! - Cooldown, session fatigue and callback budgets to keep speech fresh
//! - Deterministic scoring and selection with an injectable RNG
//! - Placeholder filling and personality rewrites
//! - Forgiving save/load of per-agent state
//!
//! # Quick Start
//!
//! ```ignore
//! use banter_core::{AgentState, EngineConfig, Event, PersonalityProfile, SelectionEngine, TemplateBank};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::default();
//!     let bank = TemplateBank::load_json("templates.json", &config).await?;
//!     let engine = SelectionEngine::new(Arc::new(bank), Arc::new(config));
//!
//!     let mut agent = AgentState::new("steve", PersonalityProfile::new(60, 85, 75, 60, 30)?);
//!     let event = Event::new("task_complete", chrono::Utc::now())
//!         .with_importance(4)
//!         .with_result("count", 27)
//!         .with_result("resource", "iron ore");
//!
//!     match engine.respond(&mut agent, &event) {
//!         Some(line) => println!("{}", line.text),
//!         None => println!("{}", engine.acknowledge(&mut agent, &event).text),
//!     }
//!     Ok(())
//! }
//! ```

pub mod composer;
pub mod config;
pub mod cooldown;
pub mod engine;
pub mod event;
pub mod memory;
pub mod persist;
pub mod personality;
pub mod relationship;
pub mod scoring;
pub mod selector;
pub mod templates;
pub mod testing;
pub mod variety;

// Primary public API
pub use config::{ConfigError, EngineConfig, TransformConfig, UsageCarryOver};
pub use cooldown::CooldownTracker;
pub use engine::{AgentState, SelectionEngine};
pub use event::{DialogueResult, Event, EventContext, EventStatus};
pub use memory::{MemoryEntry, MemoryId, MemoryStore, MemoryTier};
pub use persist::{AgentSnapshot, ImportReport, PersistError, SubStore};
pub use personality::{PersonalityError, PersonalityProfile, Trait, TraitLevel};
pub use relationship::{InteractionOutcome, RelationshipStage, RelationshipState};
pub use templates::{Specialization, Template, TemplateBank, TemplateId, Tier, Tone};
pub use testing::TestHarness;
pub use variety::VarietyPool;
