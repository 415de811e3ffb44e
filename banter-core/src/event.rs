//! Inbound game events and outbound dialogue results.

use crate::memory::MemoryId;
use crate::relationship::InteractionOutcome;
use crate::templates::{TemplateId, Tier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// How the thing the event reports turned out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Success,
    Partial,
    Failure,
    #[default]
    Neutral,
}

impl EventStatus {
    /// Whether the task fully succeeded. Everything else counts as a setback.
    pub fn is_success(&self) -> bool {
        matches!(self, EventStatus::Success)
    }
}

/// Situational data attached to an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventContext {
    /// Kind of task being reported, e.g. `"mining"`.
    pub task_type: Option<String>,
    pub location: Option<String>,
    pub activity: Option<String>,
    pub player_name: Option<String>,
    /// Task completion in percent, `0..=100`.
    pub completion: Option<u8>,
    /// Things the player explicitly referenced.
    pub mentions: Vec<String>,
    /// Named result values (`count`, `resource`, ...) for placeholders.
    pub results: BTreeMap<String, Value>,
}

/// Something that happened to an agent and may deserve a line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event type; doubles as the template category to draw from.
    pub kind: String,
    #[serde(default)]
    pub agent_id: Option<String>,
    /// `0..=10`.
    #[serde(default)]
    pub importance: u8,
    /// `-10..=10`.
    #[serde(default)]
    pub emotional_weight: i8,
    #[serde(default)]
    pub status: EventStatus,
    /// Rapport-moving interaction, applied before selection.
    #[serde(default)]
    pub outcome: Option<InteractionOutcome>,
    /// Words to remember this event by; derived from `kind` when absent.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub context: EventContext,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(kind: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: kind.into(),
            agent_id: None,
            importance: 0,
            emotional_weight: 0,
            status: EventStatus::Neutral,
            outcome: None,
            description: None,
            context: EventContext::default(),
            timestamp,
        }
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_importance(mut self, importance: u8) -> Self {
        self.importance = importance;
        self
    }

    pub fn with_emotional_weight(mut self, weight: i8) -> Self {
        self.emotional_weight = weight;
        self
    }

    pub fn with_status(mut self, status: EventStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_outcome(mut self, outcome: InteractionOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_context(mut self, context: EventContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.context.location = Some(location.into());
        self
    }

    pub fn with_activity(mut self, activity: impl Into<String>) -> Self {
        self.context.activity = Some(activity.into());
        self
    }

    pub fn with_player(mut self, name: impl Into<String>) -> Self {
        self.context.player_name = Some(name.into());
        self
    }

    pub fn with_mention(mut self, mention: impl Into<String>) -> Self {
        self.context.mentions.push(mention.into());
        self
    }

    /// Attach a named result value.
    pub fn with_result(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.results.insert(key.into(), value.into());
        self
    }
}

/// The line an agent says, plus what produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueResult {
    pub text: String,
    pub template_id: TemplateId,
    pub category: String,
    pub tier: u8,
    pub suggested_follow_up: Option<String>,
    /// Set when the line calls back to a memory.
    pub memory_id: Option<MemoryId>,
    pub score: f64,
}

impl DialogueResult {
    pub fn is_callback(&self) -> bool {
        self.memory_id.is_some()
    }

    pub fn tier(&self) -> Option<Tier> {
        Tier::new(self.tier)
    }
}
