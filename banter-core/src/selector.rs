//! Picks one candidate line from a scored set.

use crate::config::EngineConfig;
use crate::cooldown::CooldownTracker;
use crate::memory::MemoryEntry;
use crate::relationship::RelationshipStage;
use crate::templates::{Specialization, Template};
use crate::variety::VarietyPool;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

/// Scores closer than this are a tie.
pub const SCORE_EPSILON: f64 = 1e-9;

/// Where a candidate came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CandidateKind<'a> {
    /// A category template for the event.
    Generic,
    /// A callback template paired with a memory.
    Callback(&'a MemoryEntry),
}

/// A scored line the agent could say.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub template: &'a Template,
    pub kind: CandidateKind<'a>,
    pub score: f64,
}

impl<'a> Candidate<'a> {
    pub fn memory(&self) -> Option<&'a MemoryEntry> {
        match self.kind {
            CandidateKind::Callback(entry) => Some(entry),
            CandidateKind::Generic => None,
        }
    }

    pub fn is_callback(&self) -> bool {
        matches!(self.kind, CandidateKind::Callback(_))
    }
}

/// Everything eligibility depends on at selection time.
#[derive(Debug, Clone, Copy)]
pub struct SelectionGates<'a> {
    pub stage: RelationshipStage,
    pub specialization: Option<Specialization>,
    pub now: DateTime<Utc>,
    pub cooldowns: &'a CooldownTracker,
    pub config: &'a EngineConfig,
    /// Cross-agent usage, consulted only to break ties.
    pub variety: Option<&'a VarietyPool>,
}

impl SelectionGates<'_> {
    /// Whether a candidate may be said right now.
    pub fn admits(&self, candidate: &Candidate<'_>) -> bool {
        let template = candidate.template;
        template.unlocked_at(self.stage)
            && template.fits(self.specialization)
            && self.cooldowns.can_use(template, self.now, self.config)
            && self
                .cooldowns
                .can_use_category(&template.category, self.now, self.config)
            && (!candidate.is_callback()
                || self
                    .cooldowns
                    .callback_allowed(self.stage, self.now, self.config))
    }
}

/// Pick the best eligible candidate, returning its index.
///
/// Highest score wins. Ties go to the least recently used template, then the
/// least used overall, then the one the variety pool has heard least, and
/// finally to `rng`.
pub fn select_with_rng<R: Rng + ?Sized>(
    candidates: &[Candidate<'_>],
    gates: &SelectionGates<'_>,
    rng: &mut R,
) -> Option<usize> {
    let eligible: Vec<usize> = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| gates.admits(c))
        .map(|(idx, _)| idx)
        .collect();

    let best = eligible
        .iter()
        .map(|&idx| candidates[idx].score)
        .fold(f64::NEG_INFINITY, f64::max);
    let mut tied: Vec<usize> = eligible
        .into_iter()
        .filter(|&idx| best - candidates[idx].score <= SCORE_EPSILON)
        .collect();

    let id_of = |idx: usize| &candidates[idx].template.id;
    // `None` sorts first, so never-used templates count as the oldest.
    retain_min(&mut tied, |idx| gates.cooldowns.last_used(id_of(idx)));
    retain_min(&mut tied, |idx| gates.cooldowns.total_uses(id_of(idx)));
    if let Some(pool) = gates.variety {
        retain_min(&mut tied, |idx| pool.uses(id_of(idx)));
    }

    tied.choose(rng).copied()
}

/// Pick the best eligible candidate using the thread RNG for final ties.
pub fn select(candidates: &[Candidate<'_>], gates: &SelectionGates<'_>) -> Option<usize> {
    select_with_rng(candidates, gates, &mut rand::thread_rng())
}

fn retain_min<K: Ord>(tied: &mut Vec<usize>, key: impl Fn(usize) -> K) {
    if tied.len() < 2 {
        return;
    }
    if let Some(min) = tied.iter().map(|&idx| key(idx)).min() {
        tied.retain(|&idx| key(idx) == min);
    }
}
