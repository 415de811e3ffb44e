//! Engine tunables.
//!
//! Every number the engine uses to decay, gate or score lives here as a named
//! field. A config can be built in code, or loaded from JSON where omitted
//! fields keep their defaults.

use crate::memory::MemoryTier;
use crate::relationship::RelationshipStage;
use crate::templates::{Tier, MAX_TIER};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Longest duration any tunable may express, in days (about a century).
pub const MAX_DURATION_DAYS: f64 = 36_500.0;

/// [`MAX_DURATION_DAYS`] in seconds.
pub const MAX_DURATION_SECS: i64 = 36_500 * 86_400;

/// Errors from loading or validating configuration and template data.
///
/// These are the only fatal errors in the crate, and they only happen at
/// load time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid tunable `{field}`: {reason}")]
    InvalidTunable { field: &'static str, reason: String },

    #[error("Template `{id}` has tier {tier}, expected 1..={max}", max = MAX_TIER)]
    TierOutOfRange { id: String, tier: u8 },

    #[error("Duplicate template id `{0}`")]
    DuplicateTemplateId(String),

    #[error("Template `{0}` has empty text")]
    EmptyText(String),

    #[error("Template `{id}` has an unclosed or stray brace in: {text}")]
    UnbalancedBraces { id: String, text: String },

    #[error("Template `{id}` references unknown placeholder `{{{placeholder}}}`")]
    UnknownPlaceholder { id: String, placeholder: String },

    #[error("Template `{0}` has max_uses_per_session of 0")]
    ZeroSessionUses(String),

    #[error("Category `{category}` has {count} templates, limit is {limit}")]
    CategoryOverCap {
        category: String,
        count: usize,
        limit: usize,
    },
}

/// What happens to per-session usage counters when a new session begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageCarryOver {
    /// Every template starts the session fresh.
    #[default]
    Reset,
    /// Counters survive session boundaries, so a template exhausted in one
    /// session stays exhausted.
    Persist,
}

/// A value per memory tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryTierTable<T> {
    pub epic: T,
    pub significant: T,
    pub notable: T,
    pub routine: T,
    pub ephemeral: T,
}

impl<T: Copy> MemoryTierTable<T> {
    pub fn get(&self, tier: MemoryTier) -> T {
        match tier {
            MemoryTier::Epic => self.epic,
            MemoryTier::Significant => self.significant,
            MemoryTier::Notable => self.notable,
            MemoryTier::Routine => self.routine,
            MemoryTier::Ephemeral => self.ephemeral,
        }
    }

    fn values(&self) -> [T; 5] {
        [
            self.epic,
            self.significant,
            self.notable,
            self.routine,
            self.ephemeral,
        ]
    }
}

/// A temporary relevance boost: added in full at the trigger moment and
/// fading linearly to zero over `duration_days`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostSpec {
    pub amount: f64,
    pub duration_days: f64,
}

/// Thresholds and word lists for the composer's personality rewrites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Neuroticism above this prefixes lines for anything short of success with "I... ".
    pub neuroticism_threshold: u8,
    /// Extraversion above this turns periods into exclamation marks.
    pub extraversion_threshold: u8,
    /// Conscientiousness above this adds units to bare numbers.
    pub conscientiousness_threshold: u8,
    /// Words an extravert shouts.
    pub emphasis_words: Vec<String>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            neuroticism_threshold: 70,
            extraversion_threshold: 70,
            conscientiousness_threshold: 80,
            emphasis_words: ["done", "finished", "found", "complete", "amazing"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// All engine tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Exponential decay rate per day, by memory tier.
    pub decay_per_day: MemoryTierTable<f64>,
    /// Relevance never falls below these floors.
    pub tier_floors: MemoryTierTable<f64>,
    /// Events with importance below this are not remembered.
    pub memory_threshold: u8,
    /// Most memories a single query returns.
    pub memory_query_limit: usize,
    /// A memory recalled this recently is not offered as a callback again.
    pub memory_recall_cooldown_secs: i64,
    /// Callback templates paired with each queried memory.
    pub callback_templates_per_memory: usize,
    /// Added to a memory's score when the event matches its tags.
    pub context_trigger_bonus: f64,
    /// Boost for returning to a remembered location.
    pub location_boost: BoostSpec,
    /// Boost for repeating a remembered activity.
    pub activity_boost: BoostSpec,
    /// Boost for the player mentioning a memory.
    pub reference_boost: BoostSpec,
    /// Per-template cooldown in seconds, indexed by template tier - 1.
    pub template_cooldown_secs: [i64; 5],
    /// Default session usage cap, indexed by template tier - 1.
    pub max_uses_per_session: [u32; 5],
    /// Seconds after any line during which a different category stays quiet.
    pub category_gap_secs: i64,
    /// Callback utterances allowed per trailing hour, indexed by stage.
    pub callback_caps_per_hour: [u32; 5],
    /// Most templates a single category may hold.
    pub max_templates_per_category: usize,
    /// Session boundary rule for usage counters.
    pub usage_carry_over: UsageCarryOver,
    /// Personality rewrite thresholds.
    pub transforms: TransformConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            decay_per_day: MemoryTierTable {
                epic: 0.001,
                significant: 0.01,
                notable: 0.05,
                routine: 0.15,
                ephemeral: 0.15,
            },
            tier_floors: MemoryTierTable {
                epic: 5.0,
                significant: 3.0,
                notable: 1.0,
                routine: 0.0,
                ephemeral: 0.0,
            },
            memory_threshold: 3,
            memory_query_limit: 5,
            memory_recall_cooldown_secs: 6 * 60 * 60,
            callback_templates_per_memory: 2,
            context_trigger_bonus: 0.3,
            location_boost: BoostSpec {
                amount: 2.0,
                duration_days: 3.0,
            },
            activity_boost: BoostSpec {
                amount: 1.0,
                duration_days: 3.0,
            },
            reference_boost: BoostSpec {
                amount: 5.0,
                duration_days: 5.0,
            },
            template_cooldown_secs: [60, 180, 600, 1800, 3600],
            max_uses_per_session: [12, 8, 5, 3, 2],
            category_gap_secs: 5,
            callback_caps_per_hour: [0, 1, 2, 4, 8],
            max_templates_per_category: 12,
            usage_carry_over: UsageCarryOver::Reset,
            transforms: TransformConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a config from JSON and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a JSON file and validate it.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).await?;
        Self::from_json_str(&content)
    }

    /// Check every tunable is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for v in self.decay_per_day.values() {
            non_negative("decay_per_day", v)?;
        }
        for v in self.tier_floors.values() {
            non_negative("tier_floors", v)?;
        }
        if self.memory_query_limit == 0 {
            return Err(invalid("memory_query_limit", "must be at least 1"));
        }
        bounded_secs("memory_recall_cooldown_secs", self.memory_recall_cooldown_secs)?;
        if !(0.0..=1.0).contains(&self.context_trigger_bonus) {
            return Err(invalid("context_trigger_bonus", "must be within 0.0..=1.0"));
        }
        for (field, boost) in [
            ("location_boost", self.location_boost),
            ("activity_boost", self.activity_boost),
            ("reference_boost", self.reference_boost),
        ] {
            non_negative(field, boost.amount)?;
            if !(boost.duration_days > 0.0 && boost.duration_days <= MAX_DURATION_DAYS) {
                return Err(ConfigError::InvalidTunable {
                    field,
                    reason: format!(
                        "duration_days must be within (0, {MAX_DURATION_DAYS}], got {}",
                        boost.duration_days
                    ),
                });
            }
        }
        for &secs in &self.template_cooldown_secs {
            bounded_secs("template_cooldown_secs", secs)?;
        }
        if self.max_uses_per_session.contains(&0) {
            return Err(invalid("max_uses_per_session", "must be at least 1"));
        }
        bounded_secs("category_gap_secs", self.category_gap_secs)?;
        if self.max_templates_per_category == 0 {
            return Err(invalid("max_templates_per_category", "must be at least 1"));
        }
        let t = &self.transforms;
        for (field, v) in [
            ("transforms.neuroticism_threshold", t.neuroticism_threshold),
            ("transforms.extraversion_threshold", t.extraversion_threshold),
            ("transforms.conscientiousness_threshold", t.conscientiousness_threshold),
        ] {
            if v > 100 {
                return Err(invalid(field, "must be within 0..=100"));
            }
        }
        Ok(())
    }

    /// Cooldown for a template tier.
    pub fn cooldown(&self, tier: Tier) -> Duration {
        seconds(self.template_cooldown_secs[tier.index()])
    }

    /// Default session usage cap for a template tier.
    pub fn max_uses(&self, tier: Tier) -> u32 {
        self.max_uses_per_session[tier.index()]
    }

    /// Callback utterances per hour allowed at a stage.
    pub fn callback_cap(&self, stage: RelationshipStage) -> u32 {
        self.callback_caps_per_hour[stage.index()]
    }

    pub fn category_gap(&self) -> Duration {
        seconds(self.category_gap_secs)
    }

    pub fn memory_recall_cooldown(&self) -> Duration {
        seconds(self.memory_recall_cooldown_secs)
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidTunable {
        field,
        reason: reason.to_string(),
    }
}

/// Seconds as a `Duration`, saturating at the representable range.
fn seconds(secs: i64) -> Duration {
    Duration::try_seconds(secs).unwrap_or(if secs < 0 { Duration::MIN } else { Duration::MAX })
}

fn bounded_secs(field: &'static str, secs: i64) -> Result<(), ConfigError> {
    if (0..=MAX_DURATION_SECS).contains(&secs) {
        Ok(())
    } else {
        Err(ConfigError::InvalidTunable {
            field,
            reason: format!("must be within 0..={MAX_DURATION_SECS} seconds, got {secs}"),
        })
    }
}

fn non_negative(field: &'static str, v: f64) -> Result<(), ConfigError> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidTunable {
            field,
            reason: format!("must be a finite non-negative number, got {v}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(r#"{"context_trigger_bonus": 0.25}"#).unwrap();
        assert_eq!(config.context_trigger_bonus, 0.25);
        assert_eq!(config.memory_query_limit, 5);
        assert_eq!(config.transforms.extraversion_threshold, 70);
    }

    #[test]
    fn test_rejects_bad_tunables() {
        let err = EngineConfig::from_json_str(r#"{"context_trigger_bonus": 2.0}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidTunable {
                field: "context_trigger_bonus",
                ..
            }
        ));

        let err = EngineConfig::from_json_str(r#"{"max_uses_per_session": [1, 1, 0, 1, 1]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("max_uses_per_session"));

        let err = EngineConfig::from_json_str(r#"{"memory_query_limit": 0}"#).unwrap_err();
        assert!(err.to_string().contains("memory_query_limit"));
    }

    #[test]
    fn test_rejects_durations_out_of_range() {
        let cases = [
            (r#"{"template_cooldown_secs": [60, 180, 9223372036854775807, 1800, 3600]}"#, "template_cooldown_secs"),
            (r#"{"template_cooldown_secs": [60, -1, 600, 1800, 3600]}"#, "template_cooldown_secs"),
            (r#"{"category_gap_secs": 9223372036854775807}"#, "category_gap_secs"),
            (r#"{"memory_recall_cooldown_secs": 9223372036854775807}"#, "memory_recall_cooldown_secs"),
            (r#"{"location_boost": {"amount": 2.0, "duration_days": 1e300}}"#, "location_boost"),
            (r#"{"activity_boost": {"amount": 1.0, "duration_days": 36501}}"#, "activity_boost"),
            (r#"{"reference_boost": {"amount": 5.0, "duration_days": 0}}"#, "reference_boost"),
        ];
        for (json, expected) in cases {
            match EngineConfig::from_json_str(json) {
                Err(ConfigError::InvalidTunable { field, .. }) => assert_eq!(field, expected, "{json}"),
                other => panic!("expected {expected} to be rejected, got {other:?}"),
            }
        }

        let longest = format!(
            r#"{{"category_gap_secs": {MAX_DURATION_SECS}, "location_boost": {{"amount": 2.0, "duration_days": 36500}}}}"#
        );
        EngineConfig::from_json_str(&longest).unwrap();
    }

    #[test]
    fn test_unvalidated_durations_saturate() {
        let config = EngineConfig {
            template_cooldown_secs: [i64::MAX; 5],
            category_gap_secs: i64::MAX,
            ..EngineConfig::default()
        };
        assert_eq!(config.cooldown(Tier::ROUTINE), Duration::MAX);
        assert_eq!(config.category_gap(), Duration::MAX);
    }

    #[test]
    fn test_tier_lookups() {
        let config = EngineConfig::default();
        assert_eq!(config.cooldown(Tier::new(1).unwrap()), Duration::seconds(60));
        assert_eq!(config.max_uses(Tier::new(5).unwrap()), 2);
        assert_eq!(config.callback_cap(RelationshipStage::Stranger), 0);
        assert_eq!(config.callback_cap(RelationshipStage::Partner), 8);
        assert_eq!(config.tier_floors.get(MemoryTier::Epic), 5.0);
    }
}
