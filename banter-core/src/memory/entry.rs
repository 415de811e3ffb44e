//! Memory entries and their relevance math.

use crate::config::{BoostSpec, EngineConfig};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Highest memory importance.
pub const MAX_IMPORTANCE: u8 = 10;

/// Largest absolute emotional weight.
pub const MAX_EMOTIONAL_WEIGHT: i8 = 10;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Unique identifier for a memory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryId(Uuid);

impl MemoryId {
    /// Create a new unique memory ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MemoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MemoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Importance bucket of a memory. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MemoryTier {
    /// Importance 0.
    Ephemeral,
    /// Importance 1-2.
    Routine,
    /// Importance 3-4.
    Notable,
    /// Importance 5-7.
    Significant,
    /// Importance 8-10.
    Epic,
}

impl MemoryTier {
    pub fn from_importance(importance: u8) -> Self {
        match importance {
            0 => MemoryTier::Ephemeral,
            1..=2 => MemoryTier::Routine,
            3..=4 => MemoryTier::Notable,
            5..=7 => MemoryTier::Significant,
            _ => MemoryTier::Epic,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MemoryTier::Ephemeral => "Ephemeral",
            MemoryTier::Routine => "Routine",
            MemoryTier::Notable => "Notable",
            MemoryTier::Significant => "Significant",
            MemoryTier::Epic => "Epic",
        }
    }

    /// Template tier (`1..=5`) of callback lines suited to this memory.
    pub fn template_tier(&self) -> u8 {
        match self {
            MemoryTier::Ephemeral => 1,
            MemoryTier::Routine => 2,
            MemoryTier::Notable => 3,
            MemoryTier::Significant => 4,
            MemoryTier::Epic => 5,
        }
    }
}

/// What woke a memory up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoostTrigger {
    /// The agent is back where it happened.
    Location,
    /// The agent is doing the same kind of thing again.
    Activity,
    /// The player brought it up.
    PlayerReference,
}

impl BoostTrigger {
    pub fn spec(&self, config: &EngineConfig) -> BoostSpec {
        match self {
            BoostTrigger::Location => config.location_boost,
            BoostTrigger::Activity => config.activity_boost,
            BoostTrigger::PlayerReference => config.reference_boost,
        }
    }
}

/// A temporary additive relevance boost that fades linearly to zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryBoost {
    pub trigger: BoostTrigger,
    pub amount: f64,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl MemoryBoost {
    pub fn new(trigger: BoostTrigger, spec: BoostSpec, now: DateTime<Utc>) -> Self {
        let millis = (spec.duration_days * MILLIS_PER_DAY).round() as i64;
        let expires_at = Duration::try_milliseconds(millis.max(1))
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            trigger,
            amount: spec.amount,
            started_at: now,
            expires_at,
        }
    }

    /// Remaining boost at `now`.
    pub fn value_at(&self, now: DateTime<Utc>) -> f64 {
        if now >= self.expires_at {
            return 0.0;
        }
        if now <= self.started_at {
            return self.amount;
        }
        let total = (self.expires_at - self.started_at).num_milliseconds() as f64;
        let left = (self.expires_at - now).num_milliseconds() as f64;
        self.amount * (left / total)
    }
}

/// Situational tags stored with a memory, used for context triggers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryTags {
    pub location: Option<String>,
    pub activity: Option<String>,
}

/// Something the agent remembers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: MemoryId,
    /// Kind of event, e.g. `"near_death"` or `"first_diamond"`.
    pub event_type: String,
    /// What happened, in words usable inside a line.
    pub description: String,
    /// `0..=10`.
    pub importance: u8,
    /// `-10..=10`; negative is painful, positive is joyful.
    pub emotional_weight: i8,
    pub created_at: DateTime<Utc>,
    pub last_callback_at: Option<DateTime<Utc>>,
    /// How many times the agent has brought this up. Only grows.
    pub reference_count: u32,
    #[serde(default)]
    pub tags: MemoryTags,
    #[serde(default)]
    pub boost: Option<MemoryBoost>,
}

impl MemoryEntry {
    /// Create a memory; importance and weight are clamped to their ranges.
    pub fn new(
        event_type: impl Into<String>,
        description: impl Into<String>,
        importance: u8,
        emotional_weight: i8,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MemoryId::new(),
            event_type: event_type.into(),
            description: description.into(),
            importance: importance.min(MAX_IMPORTANCE),
            emotional_weight: emotional_weight.clamp(-MAX_EMOTIONAL_WEIGHT, MAX_EMOTIONAL_WEIGHT),
            created_at,
            last_callback_at: None,
            reference_count: 0,
            tags: MemoryTags::default(),
            boost: None,
        }
    }

    /// Attach a location tag.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.tags.location = Some(location.into());
        self
    }

    /// Attach an activity tag.
    pub fn with_activity(mut self, activity: impl Into<String>) -> Self {
        self.tags.activity = Some(activity.into());
        self
    }

    pub fn tier(&self) -> MemoryTier {
        MemoryTier::from_importance(self.importance)
    }

    /// Days since the memory was made (never negative).
    pub fn age_days(&self, now: DateTime<Utc>) -> f64 {
        let millis = (now - self.created_at).num_milliseconds().max(0);
        millis as f64 / MILLIS_PER_DAY
    }

    /// Decayed relevance without the temporary boost, never below the tier floor.
    ///
    /// `importance * exp(-lambda * days) * (1 + 0.1 * |emotional_weight|)`
    pub fn base_relevance(&self, now: DateTime<Utc>, config: &EngineConfig) -> f64 {
        let tier = self.tier();
        let lambda = config.decay_per_day.get(tier);
        let floor = config.tier_floors.get(tier);
        let intensity = 1.0 + 0.1 * f64::from(self.emotional_weight.unsigned_abs());
        let decayed = f64::from(self.importance) * (-lambda * self.age_days(now)).exp() * intensity;
        decayed.max(floor)
    }

    /// Current relevance including any active boost.
    pub fn relevance(&self, now: DateTime<Utc>, config: &EngineConfig) -> f64 {
        let boost = self.boost.map(|b| b.value_at(now)).unwrap_or(0.0);
        self.base_relevance(now, config) + boost
    }

    /// Apply a boost, keeping whichever of the old and new is stronger right now.
    pub fn apply_boost(&mut self, boost: MemoryBoost, now: DateTime<Utc>) {
        let current = self.boost.map(|b| b.value_at(now)).unwrap_or(0.0);
        if boost.value_at(now) >= current {
            self.boost = Some(boost);
        }
    }

    /// Record that the agent brought this memory up.
    pub fn mark_callback(&mut self, now: DateTime<Utc>) {
        self.last_callback_at = Some(now);
        self.reference_count = self.reference_count.saturating_add(1);
    }

    /// Whether the memory was recalled less than `cooldown` ago.
    pub fn recently_recalled(&self, now: DateTime<Utc>, cooldown: Duration) -> bool {
        self.last_callback_at
            .is_some_and(|at| now >= at && now - at < cooldown)
    }

    /// Whether the fields are within their documented ranges.
    pub fn is_well_formed(&self) -> bool {
        self.importance <= MAX_IMPORTANCE
            && self.emotional_weight.unsigned_abs() <= MAX_EMOTIONAL_WEIGHT as u8
            && self.boost.map_or(true, |b| {
                b.amount.is_finite() && b.amount >= 0.0 && b.expires_at > b.started_at
            })
    }

    /// Lowercase tags this memory is indexed under.
    pub(crate) fn index_keys(&self) -> Vec<String> {
        let mut keys = vec![self.event_type.to_lowercase()];
        for tag in [&self.tags.location, &self.tags.activity].into_iter().flatten() {
            let key = tag.to_lowercase();
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }
}
