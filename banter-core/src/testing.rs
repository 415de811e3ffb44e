//! Testing utilities.
//!
//! This module provides tools for integration testing:
//! - `sample_bank` with a small but complete template bank
//! - `TestHarness` for scripted, deterministic dialogue scenarios

use crate::config::{ConfigError, EngineConfig};
use crate::engine::{AgentState, SelectionEngine};
use crate::event::{DialogueResult, Event};
use crate::memory::{MemoryEntry, MemoryId};
use crate::personality::PersonalityProfile;
use crate::templates::TemplateBank;
use crate::variety::VarietyPool;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

/// JSON source of the bundled sample bank.
pub const SAMPLE_BANK_JSON: &str = include_str!("../data/templates.json");

/// Seed used by harnesses unless told otherwise.
pub const DEFAULT_SEED: u64 = 42;

/// Parse the bundled sample bank.
pub fn sample_bank(config: &EngineConfig) -> Result<TemplateBank, ConfigError> {
    TemplateBank::from_json_str(SAMPLE_BANK_JSON, config)
}

/// One agent, one engine, a seeded RNG and a controllable clock.
pub struct TestHarness {
    pub engine: SelectionEngine,
    pub agent: AgentState,
    rng: StdRng,
    now: DateTime<Utc>,
    history: Vec<Option<DialogueResult>>,
}

impl TestHarness {
    /// Harness over the sample bank with default config and a balanced agent.
    ///
    /// # Panics
    ///
    /// Panics if the bundled sample bank fails validation.
    pub fn new() -> Self {
        let config = EngineConfig::default();
        let bank = sample_bank(&config).expect("bundled sample bank is valid");
        Self::with_bank(bank, config)
    }

    /// Harness over a specific bank and config.
    pub fn with_bank(bank: TemplateBank, config: EngineConfig) -> Self {
        Self {
            engine: SelectionEngine::new(Arc::new(bank), Arc::new(config)),
            agent: AgentState::new("test_agent", PersonalityProfile::balanced()),
            rng: StdRng::seed_from_u64(DEFAULT_SEED),
            now: Utc
                .with_ymd_and_hms(2024, 1, 1, 9, 0, 0)
                .single()
                .unwrap_or_default(),
            history: Vec::new(),
        }
    }

    pub fn with_rapport(mut self, rapport: u8) -> Self {
        self.agent = self.agent.with_rapport(rapport);
        self
    }

    pub fn with_personality(mut self, personality: PersonalityProfile) -> Self {
        self.agent.personality = personality;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_variety_pool(mut self, pool: VarietyPool) -> Self {
        self.engine = self.engine.with_variety_pool(pool);
        self
    }

    /// Current harness time.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Move the clock forward.
    pub fn advance(&mut self, by: Duration) -> &mut Self {
        self.now += by;
        self
    }

    /// A bare event of the given kind from the harness agent, stamped with
    /// the harness clock.
    pub fn event(&self, kind: &str) -> Event {
        Event::new(kind, self.now).with_agent(self.agent.agent_id.clone())
    }

    /// Give the agent a memory created `days_ago` days before now.
    pub fn remember(
        &mut self,
        event_type: &str,
        description: &str,
        importance: u8,
        emotional_weight: i8,
        days_ago: i64,
    ) -> MemoryId {
        let created = self.now - Duration::days(days_ago);
        let entry = MemoryEntry::new(event_type, description, importance, emotional_weight, created);
        self.agent.memory.insert(entry)
    }

    /// Insert a prepared memory.
    pub fn remember_entry(&mut self, entry: MemoryEntry) -> MemoryId {
        self.agent.memory.insert(entry)
    }

    /// Feed an event through the engine.
    pub fn respond(&mut self, event: Event) -> Option<DialogueResult> {
        let result = self
            .engine
            .respond_with_rng(&mut self.agent, &event, &mut self.rng);
        self.history.push(result.clone());
        result
    }

    /// Every response so far, in order.
    pub fn history(&self) -> &[Option<DialogueResult>] {
        &self.history
    }

    /// Text of the most recent line, if one was said.
    pub fn last_text(&self) -> Option<&str> {
        self.history
            .last()
            .and_then(|r| r.as_ref())
            .map(|r| r.text.as_str())
    }

    pub fn begin_session(&mut self) {
        self.agent.begin_session(self.now, self.engine.config());
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Assert the result is a callback to the given memory.
pub fn assert_callback(result: &Option<DialogueResult>, memory: MemoryId) {
    match result {
        Some(r) => assert_eq!(
            r.memory_id,
            Some(memory),
            "expected a callback, got `{}` ({})",
            r.text,
            r.template_id
        ),
        None => panic!("expected a callback, got no line"),
    }
}

/// Assert the result is not a memory callback.
pub fn assert_no_callback(result: &Option<DialogueResult>) {
    if let Some(r) = result {
        assert!(
            r.memory_id.is_none(),
            "expected no callback, got `{}` ({})",
            r.text,
            r.template_id
        );
    }
}
