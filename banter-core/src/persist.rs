//! Agent state persistence for save/load.
//!
//! A snapshot carries the mutable per-agent state: rapport, memories,
//! cooldown records and the callback log. Personality and specialization are
//! host configuration and are not saved.
//!
//! Import is forgiving. Each sub-store is decoded on its own, and one that is
//! missing or corrupt is reset to its default with a warning instead of
//! failing the whole agent.

use crate::cooldown::{CategoryRecord, CooldownRecord, CooldownTracker};
use crate::engine::AgentState;
use crate::memory::{MemoryEntry, MemoryStore};
use crate::relationship::{RelationshipState, MAX_RAPPORT};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tokio::fs;
use tracing::warn;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable state of one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    /// Format version for compatibility checking.
    pub version: u32,
    pub agent_id: String,
    pub rapport: u8,
    pub memory_entries: Vec<MemoryEntry>,
    /// Ordered by template id.
    pub cooldown_records: Vec<CooldownRecord>,
    /// Ordered by category name.
    pub category_records: Vec<CategoryRecord>,
    /// Recent callback timestamps, oldest first.
    pub callback_log: Vec<DateTime<Utc>>,
    pub session_started_at: Option<DateTime<Utc>>,
}

impl AgentSnapshot {
    /// Save to a JSON file.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Load from a JSON file, rejecting other format versions.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let content = fs::read_to_string(path).await?;
        let snapshot: Self = serde_json::from_str(&content)?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SNAPSHOT_VERSION,
                found: snapshot.version,
            });
        }

        Ok(snapshot)
    }
}

/// A part of agent state that is restored independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubStore {
    Rapport,
    Memory,
    Cooldowns,
}

impl fmt::Display for SubStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubStore::Rapport => "rapport",
            SubStore::Memory => "memory",
            SubStore::Cooldowns => "cooldowns",
        };
        f.write_str(name)
    }
}

/// What an import had to throw away.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Sub-stores that were corrupt and reset to defaults.
    pub reset: Vec<SubStore>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.reset.is_empty()
    }
}

impl AgentState {
    /// Capture the agent's mutable state.
    pub fn export_state(&self) -> AgentSnapshot {
        AgentSnapshot {
            version: SNAPSHOT_VERSION,
            agent_id: self.agent_id.clone(),
            rapport: self.relationship.rapport(),
            memory_entries: self.memory.entries().to_vec(),
            cooldown_records: self.cooldowns.records().cloned().collect(),
            category_records: self.cooldowns.categories().cloned().collect(),
            callback_log: self.cooldowns.callback_log().copied().collect(),
            session_started_at: self.cooldowns.session_started_at(),
        }
    }

    /// Restore state from a snapshot value.
    ///
    /// Never fails: a corrupt sub-store is reset and listed in the report. A
    /// snapshot of another format version resets everything.
    pub fn import_state(&mut self, value: Value) -> ImportReport {
        let mut report = ImportReport::default();

        let version = value.get("version").and_then(Value::as_u64);
        if version != Some(u64::from(SNAPSHOT_VERSION)) {
            warn!(
                agent = %self.agent_id,
                ?version,
                expected = SNAPSHOT_VERSION,
                "snapshot version mismatch, resetting agent state"
            );
            self.relationship = RelationshipState::default();
            self.memory = MemoryStore::new();
            self.cooldowns = CooldownTracker::new();
            report.reset = vec![SubStore::Rapport, SubStore::Memory, SubStore::Cooldowns];
            return report;
        }

        let rapport = decode::<u8>(&value, "rapport").and_then(|r| {
            if r <= MAX_RAPPORT {
                Ok(r)
            } else {
                Err(format!("rapport {r} out of range"))
            }
        });
        match rapport {
            Ok(rapport) => self.relationship = RelationshipState::new(rapport),
            Err(reason) => {
                self.reset(SubStore::Rapport, &mut report, &reason);
                self.relationship = RelationshipState::default();
            }
        }

        let entries = decode::<Vec<MemoryEntry>>(&value, "memory_entries").and_then(|entries| {
            if entries.iter().all(MemoryEntry::is_well_formed) {
                Ok(entries)
            } else {
                Err("memory entry out of range".to_string())
            }
        });
        match entries {
            Ok(entries) => self.memory = MemoryStore::from_entries(entries),
            Err(reason) => {
                self.reset(SubStore::Memory, &mut report, &reason);
                self.memory = MemoryStore::new();
            }
        }

        match decode_cooldowns(&value) {
            Ok(tracker) => self.cooldowns = tracker,
            Err(reason) => {
                self.reset(SubStore::Cooldowns, &mut report, &reason);
                self.cooldowns = CooldownTracker::new();
            }
        }

        report
    }

    fn reset(&self, store: SubStore, report: &mut ImportReport, reason: &str) {
        warn!(agent = %self.agent_id, %store, %reason, "corrupt snapshot data, resetting");
        report.reset.push(store);
    }
}

fn decode<T: DeserializeOwned>(value: &Value, field: &str) -> Result<T, String> {
    let raw = value
        .get(field)
        .ok_or_else(|| format!("missing field `{field}`"))?;
    serde_json::from_value(raw.clone()).map_err(|e| format!("field `{field}`: {e}"))
}

fn decode_cooldowns(value: &Value) -> Result<CooldownTracker, String> {
    let records: Vec<CooldownRecord> = decode(value, "cooldown_records")?;
    let categories: Vec<CategoryRecord> = decode(value, "category_records")?;
    let callback_log: Vec<DateTime<Utc>> = decode(value, "callback_log")?;
    let session_started_at: Option<DateTime<Utc>> = match value.get("session_started_at") {
        Some(raw) => serde_json::from_value(raw.clone())
            .map_err(|e| format!("field `session_started_at`: {e}"))?,
        None => None,
    };

    if let Some(bad) = records.iter().find(|r| r.uses_this_session > r.total_uses) {
        return Err(format!(
            "template `{}` has more session uses than lifetime uses",
            bad.key
        ));
    }

    Ok(CooldownTracker::from_parts(
        records,
        categories,
        callback_log,
        session_started_at,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::personality::PersonalityProfile;
    use crate::relationship::RelationshipStage;
    use crate::templates::{Template, Tier, Tone};
    use chrono::TimeZone;
    use serde_json::json;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 18, 0, 0).unwrap()
    }

    fn agent() -> AgentState {
        let mut agent = AgentState::new("steve", PersonalityProfile::balanced()).with_rapport(64);
        agent
            .memory
            .insert(MemoryEntry::new("raid", "the night raid", 8, -7, t0()).with_location("Village"));
        let template = Template {
            id: "greet".into(),
            category: "greeting".into(),
            tier: Tier::ROUTINE,
            text: "Hi.".into(),
            required_stage: RelationshipStage::Stranger,
            specialization: None,
            tone: Tone::Neutral,
            max_uses_per_session: None,
            follow_up: None,
        };
        agent.cooldowns.record_use(&template, t0());
        agent.cooldowns.record_callback(t0());
        agent
    }

    #[test]
    fn test_export_import_export_is_identical() {
        let original = agent();
        let snapshot = original.export_state();

        let mut restored = AgentState::new("steve", PersonalityProfile::balanced());
        let report = restored.import_state(serde_json::to_value(&snapshot).unwrap());
        assert!(report.is_clean());
        assert_eq!(restored.export_state(), snapshot);
    }

    #[test]
    fn test_corrupt_memory_resets_only_memory() {
        let mut value = serde_json::to_value(agent().export_state()).unwrap();
        value["memory_entries"] = json!([{"id": "not-a-uuid"}]);

        let mut restored = AgentState::new("steve", PersonalityProfile::balanced());
        let report = restored.import_state(value);
        assert_eq!(report.reset, vec![SubStore::Memory]);
        assert!(restored.memory.is_empty());
        assert_eq!(restored.relationship.rapport(), 64);
        assert_eq!(restored.cooldowns.records().count(), 1);
    }

    #[test]
    fn test_out_of_range_rapport_resets() {
        let mut value = serde_json::to_value(agent().export_state()).unwrap();
        value["rapport"] = json!(250);

        let mut restored = AgentState::new("steve", PersonalityProfile::balanced());
        let report = restored.import_state(value);
        assert_eq!(report.reset, vec![SubStore::Rapport]);
        assert_eq!(restored.relationship, RelationshipState::default());
    }

    #[test]
    fn test_version_mismatch_resets_everything() {
        let mut value = serde_json::to_value(agent().export_state()).unwrap();
        value["version"] = json!(99);

        let mut restored = agent();
        let report = restored.import_state(value);
        assert_eq!(report.reset.len(), 3);
        assert!(restored.memory.is_empty());
        assert_eq!(restored.cooldowns.records().count(), 0);
    }
}
