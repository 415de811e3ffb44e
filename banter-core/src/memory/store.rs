//! Per-agent memory store.

use super::entry::{BoostTrigger, MemoryBoost, MemoryEntry, MemoryId};
use crate::config::EngineConfig;
use crate::event::Event;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

/// What the current moment looks like, for memory lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryQuery<'a> {
    pub event_type: &'a str,
    pub location: Option<&'a str>,
    pub activity: Option<&'a str>,
    /// Things the player explicitly brought up.
    pub mentions: &'a [String],
}

impl<'a> MemoryQuery<'a> {
    /// Build a query from an incoming event.
    pub fn for_event(event: &'a Event) -> Self {
        Self {
            event_type: &event.kind,
            location: event.context.location.as_deref(),
            activity: event.context.activity.as_deref(),
            mentions: &event.context.mentions,
        }
    }
}

/// A memory returned by a query, with its relevance at query time.
#[derive(Debug, Clone, Copy)]
pub struct RecalledMemory<'a> {
    pub entry: &'a MemoryEntry,
    pub relevance: f64,
    /// The event's type, location or activity matches the memory's tags.
    pub triggered: bool,
}

/// Everything one agent remembers.
///
/// Entries are never removed; old ones sink toward their tier floor and stop
/// winning selections. Lookups go through a lowercase tag index so a query
/// only touches memories that share a tag with the current moment.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Vec<MemoryEntry>,
    /// Lowercase tag -> indices into `entries`.
    tag_index: HashMap<String, Vec<usize>>,
    /// Id -> index into `entries`.
    by_id: HashMap<MemoryId, usize>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from persisted entries.
    pub fn from_entries(entries: Vec<MemoryEntry>) -> Self {
        let mut store = Self {
            entries,
            tag_index: HashMap::new(),
            by_id: HashMap::new(),
        };
        store.rebuild_index();
        store
    }

    fn rebuild_index(&mut self) {
        self.tag_index.clear();
        self.by_id.clear();
        for idx in 0..self.entries.len() {
            self.index_entry(idx);
        }
    }

    fn index_entry(&mut self, idx: usize) {
        self.by_id.entry(self.entries[idx].id).or_insert(idx);
        for key in self.entries[idx].index_keys() {
            self.tag_index.entry(key).or_default().push(idx);
        }
    }

    /// Add an entry directly.
    pub fn insert(&mut self, entry: MemoryEntry) -> MemoryId {
        let id = entry.id;
        self.entries.push(entry);
        self.index_entry(self.entries.len() - 1);
        id
    }

    /// Remember an event if it is important enough.
    ///
    /// Returns `None` (and stores nothing) when the event's importance is below
    /// the configured threshold.
    pub fn record(&mut self, event: &Event, config: &EngineConfig) -> Option<&MemoryEntry> {
        if event.importance < config.memory_threshold {
            return None;
        }

        let description = event
            .description
            .clone()
            .unwrap_or_else(|| event.kind.replace('_', " "));
        let mut entry = MemoryEntry::new(
            event.kind.clone(),
            description,
            event.importance,
            event.emotional_weight,
            event.timestamp,
        );
        entry.tags.location = event.context.location.clone();
        entry.tags.activity = event.context.activity.clone();

        debug!(
            event_type = %entry.event_type,
            tier = entry.tier().name(),
            "recorded memory"
        );
        let id = self.insert(entry);
        self.get(id)
    }

    pub fn get(&self, id: MemoryId) -> Option<&MemoryEntry> {
        self.by_id.get(&id).map(|&idx| &self.entries[idx])
    }

    pub fn get_mut(&mut self, id: MemoryId) -> Option<&mut MemoryEntry> {
        let idx = *self.by_id.get(&id)?;
        self.entries.get_mut(idx)
    }

    /// Indices of entries sharing at least one tag with the query.
    fn matching_indices(&self, query: &MemoryQuery<'_>) -> Vec<usize> {
        let mut keys = vec![query.event_type.to_lowercase()];
        keys.extend(query.location.map(str::to_lowercase));
        keys.extend(query.activity.map(str::to_lowercase));
        keys.extend(query.mentions.iter().map(|m| m.to_lowercase()));

        let mut found: Vec<usize> = keys
            .iter()
            .filter_map(|k| self.tag_index.get(k))
            .flatten()
            .copied()
            .collect();
        found.sort_unstable();
        found.dedup();
        found
    }

    /// Memories matching the query, most relevant first, capped at the
    /// configured query limit. Equal relevance keeps insertion order.
    pub fn query(
        &self,
        query: &MemoryQuery<'_>,
        now: DateTime<Utc>,
        config: &EngineConfig,
    ) -> Vec<RecalledMemory<'_>> {
        let mut ranked: Vec<(f64, usize)> = self
            .matching_indices(query)
            .into_iter()
            .map(|idx| (self.entries[idx].relevance(now, config), idx))
            .collect();

        let by_rank = |a: &(f64, usize), b: &(f64, usize)| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1));
        let limit = config.memory_query_limit;
        if ranked.len() > limit && limit > 0 {
            ranked.select_nth_unstable_by(limit - 1, by_rank);
        }
        ranked.truncate(limit);
        ranked.sort_unstable_by(by_rank);

        ranked
            .into_iter()
            .map(|(relevance, idx)| {
                let entry = &self.entries[idx];
                RecalledMemory {
                    entry,
                    relevance,
                    triggered: is_triggered(entry, query),
                }
            })
            .collect()
    }

    /// Boost memories the current moment revisits: same location, same
    /// activity, or an explicit player mention. Returns how many were boosted.
    pub fn apply_context_boosts(
        &mut self,
        query: &MemoryQuery<'_>,
        now: DateTime<Utc>,
        config: &EngineConfig,
    ) -> usize {
        let location = query.location.map(str::to_lowercase);
        let activity = query.activity.map(str::to_lowercase);
        let mentions: Vec<String> = query.mentions.iter().map(|m| m.to_lowercase()).collect();

        let mut boosted = 0;
        for idx in self.matching_indices(query) {
            let entry = &mut self.entries[idx];
            let mentioned = mentions.iter().any(|m| {
                lower_matches(&entry.event_type, m)
                    || lower_eq(&entry.tags.location, Some(m))
                    || lower_eq(&entry.tags.activity, Some(m))
            });
            let trigger = if mentioned {
                Some(BoostTrigger::PlayerReference)
            } else if lower_eq(&entry.tags.location, location.as_ref()) {
                Some(BoostTrigger::Location)
            } else if lower_eq(&entry.tags.activity, activity.as_ref()) {
                Some(BoostTrigger::Activity)
            } else {
                None
            };

            if let Some(trigger) = trigger {
                entry.apply_boost(MemoryBoost::new(trigger, trigger.spec(config), now), now);
                boosted += 1;
            }
        }
        boosted
    }

    /// Record that the agent brought a memory up. Returns `false` if unknown.
    pub fn mark_callback(&mut self, id: MemoryId, now: DateTime<Utc>) -> bool {
        match self.get_mut(id) {
            Some(entry) => {
                entry.mark_callback(now);
                true
            }
            None => false,
        }
    }

    pub fn entries(&self) -> &[MemoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Whether `text` lowercases to `lowered` without allocating.
fn lower_matches(text: &str, lowered: &str) -> bool {
    text.chars().flat_map(char::to_lowercase).eq(lowered.chars())
}

fn lower_eq(tag: &Option<String>, lowered: Option<&String>) -> bool {
    match (tag, lowered) {
        (Some(a), Some(b)) => lower_matches(a, b),
        _ => false,
    }
}

fn is_triggered(entry: &MemoryEntry, query: &MemoryQuery<'_>) -> bool {
    let eq = |tag: &Option<String>, value: Option<&str>| match (tag, value) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    };
    entry.event_type.eq_ignore_ascii_case(query.event_type)
        || eq(&entry.tags.location, query.location)
        || eq(&entry.tags.activity, query.activity)
}
