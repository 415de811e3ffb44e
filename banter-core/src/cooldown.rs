//! Per-agent cooldowns, session fatigue and the callback budget.

use crate::config::{EngineConfig, UsageCarryOver};
use crate::relationship::RelationshipStage;
use crate::templates::{Template, TemplateId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Usage history of one template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownRecord {
    pub key: TemplateId,
    pub last_used_at: DateTime<Utc>,
    pub uses_this_session: u32,
    /// Lifetime count; never reset.
    pub total_uses: u32,
}

/// When a category last produced a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub category: String,
    pub last_used_at: DateTime<Utc>,
}

/// Tracks what an agent has said and when.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CooldownTracker {
    records: BTreeMap<TemplateId, CooldownRecord>,
    categories: BTreeMap<String, CategoryRecord>,
    /// Timestamps of recent callback lines, oldest first.
    callback_log: VecDeque<DateTime<Utc>>,
    session_started_at: Option<DateTime<Utc>>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a tracker from persisted parts.
    pub fn from_parts(
        records: Vec<CooldownRecord>,
        categories: Vec<CategoryRecord>,
        mut callback_log: Vec<DateTime<Utc>>,
        session_started_at: Option<DateTime<Utc>>,
    ) -> Self {
        callback_log.sort();
        Self {
            records: records.into_iter().map(|r| (r.key.clone(), r)).collect(),
            categories: categories
                .into_iter()
                .map(|c| (c.category.clone(), c))
                .collect(),
            callback_log: callback_log.into(),
            session_started_at,
        }
    }

    /// Start a new session. Counters reset unless configured to persist.
    pub fn begin_session(&mut self, now: DateTime<Utc>, carry_over: UsageCarryOver) {
        self.session_started_at = Some(now);
        if carry_over == UsageCarryOver::Reset {
            for record in self.records.values_mut() {
                record.uses_this_session = 0;
            }
            self.categories.clear();
        }
    }

    /// Effective session cap of a template.
    pub fn max_uses(template: &Template, config: &EngineConfig) -> u32 {
        template
            .max_uses_per_session
            .unwrap_or_else(|| config.max_uses(template.tier))
    }

    /// Whether the template has hit its session cap.
    pub fn is_exhausted(&self, template: &Template, config: &EngineConfig) -> bool {
        self.records
            .get(&template.id)
            .is_some_and(|r| r.uses_this_session >= Self::max_uses(template, config))
    }

    /// Whether the template is off cooldown and not exhausted.
    pub fn can_use(&self, template: &Template, now: DateTime<Utc>, config: &EngineConfig) -> bool {
        let Some(record) = self.records.get(&template.id) else {
            return true;
        };
        if record.uses_this_session >= Self::max_uses(template, config) {
            return false;
        }
        // Cooldowns from an earlier session are dropped along with its counters.
        if config.usage_carry_over == UsageCarryOver::Reset
            && self
                .session_started_at
                .is_some_and(|start| record.last_used_at < start)
        {
            return true;
        }
        now - record.last_used_at >= config.cooldown(template.tier)
    }

    /// Whether a line from `category` may follow the last line said.
    ///
    /// Repeating the same category is always fine; switching to a different one
    /// waits out the category gap.
    pub fn can_use_category(&self, category: &str, now: DateTime<Utc>, config: &EngineConfig) -> bool {
        match self.last_line() {
            Some(last) if last.category != category => now - last.last_used_at >= config.category_gap(),
            _ => true,
        }
    }

    /// The most recent line said, by category.
    pub fn last_line(&self) -> Option<&CategoryRecord> {
        self.categories.values().max_by_key(|c| c.last_used_at)
    }

    /// Record that a template was said.
    pub fn record_use(&mut self, template: &Template, now: DateTime<Utc>) {
        let record = self
            .records
            .entry(template.id.clone())
            .or_insert_with(|| CooldownRecord {
                key: template.id.clone(),
                last_used_at: now,
                uses_this_session: 0,
                total_uses: 0,
            });
        record.last_used_at = now;
        record.uses_this_session = record.uses_this_session.saturating_add(1);
        record.total_uses = record.total_uses.saturating_add(1);

        self.categories.insert(
            template.category.clone(),
            CategoryRecord {
                category: template.category.clone(),
                last_used_at: now,
            },
        );
    }

    /// Callback lines said in the trailing hour before `now`.
    pub fn callbacks_in_window(&self, now: DateTime<Utc>) -> usize {
        let window = Duration::hours(1);
        self.callback_log
            .iter()
            .filter(|&&at| at <= now && now - at < window)
            .count()
    }

    /// Whether another callback fits the stage's hourly budget.
    pub fn callback_allowed(&self, stage: RelationshipStage, now: DateTime<Utc>, config: &EngineConfig) -> bool {
        let cap = config.callback_cap(stage) as usize;
        self.callbacks_in_window(now) < cap
    }

    /// Record a callback line, forgetting ones that left the window.
    pub fn record_callback(&mut self, now: DateTime<Utc>) {
        let window = Duration::hours(1);
        while self
            .callback_log
            .front()
            .is_some_and(|&at| now - at >= window)
        {
            self.callback_log.pop_front();
        }
        self.callback_log.push_back(now);
    }

    pub fn record(&self, id: &TemplateId) -> Option<&CooldownRecord> {
        self.records.get(id)
    }

    pub fn last_used(&self, id: &TemplateId) -> Option<DateTime<Utc>> {
        self.records.get(id).map(|r| r.last_used_at)
    }

    pub fn total_uses(&self, id: &TemplateId) -> u32 {
        self.records.get(id).map_or(0, |r| r.total_uses)
    }

    /// Template records in id order.
    pub fn records(&self) -> impl Iterator<Item = &CooldownRecord> {
        self.records.values()
    }

    /// Category records in name order.
    pub fn categories(&self) -> impl Iterator<Item = &CategoryRecord> {
        self.categories.values()
    }

    pub fn callback_log(&self) -> impl Iterator<Item = &DateTime<Utc>> {
        self.callback_log.iter()
    }

    pub fn session_started_at(&self) -> Option<DateTime<Utc>> {
        self.session_started_at
    }
}
