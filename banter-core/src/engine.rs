//! The selection engine: one call per incoming event.
//!
//! Each call runs the full pipeline for one agent:
//!
//! 1. apply the event's interaction outcome to rapport
//! 2. boost and query memories matching the moment
//! 3. gather category templates and memory callback pairings
//! 4. score, gate and select
//! 5. compose the line, then write back usage, callbacks and the new memory
//!
//! The engine itself holds only shared, read-only data. All per-agent state
//! lives in [`AgentState`] and is passed in by `&mut`, so many agents can run
//! on many threads against one engine without locking.

use crate::composer::{compose, ComposeContext};
use crate::config::EngineConfig;
use crate::cooldown::CooldownTracker;
use crate::event::{DialogueResult, Event, EventStatus};
use crate::memory::{MemoryQuery, MemoryStore, RecalledMemory, MAX_IMPORTANCE};
use crate::personality::PersonalityProfile;
use crate::relationship::{RelationshipStage, RelationshipState};
use crate::scoring::{generic_score, memory_score};
use crate::selector::{select_with_rng, Candidate, CandidateKind, SelectionGates};
use crate::templates::{
    Specialization, Template, TemplateBank, TemplateId, Tier, Tone, ACKNOWLEDGMENT_CATEGORY,
    CALLBACK_CATEGORY,
};
use crate::variety::VarietyPool;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::Arc;
use tracing::debug;

/// Id reported when no acknowledgment template exists.
pub const BUILTIN_ACKNOWLEDGMENT_ID: &str = "builtin_acknowledgment";

const BUILTIN_ACKNOWLEDGMENT_TEXT: &str = "Understood, {address}.";

/// Everything one agent carries between events.
#[derive(Debug, Clone)]
pub struct AgentState {
    pub agent_id: String,
    pub personality: PersonalityProfile,
    pub specialization: Option<Specialization>,
    pub relationship: RelationshipState,
    pub memory: MemoryStore,
    pub cooldowns: CooldownTracker,
}

impl AgentState {
    /// A fresh agent at starting rapport with no history.
    pub fn new(agent_id: impl Into<String>, personality: PersonalityProfile) -> Self {
        Self {
            agent_id: agent_id.into(),
            personality,
            specialization: None,
            relationship: RelationshipState::default(),
            memory: MemoryStore::new(),
            cooldowns: CooldownTracker::new(),
        }
    }

    pub fn with_specialization(mut self, specialization: Specialization) -> Self {
        self.specialization = Some(specialization);
        self
    }

    pub fn with_rapport(mut self, rapport: u8) -> Self {
        self.relationship = RelationshipState::new(rapport);
        self
    }

    pub fn stage(&self) -> RelationshipStage {
        self.relationship.stage()
    }

    /// Start a new play session.
    pub fn begin_session(&mut self, now: DateTime<Utc>, config: &EngineConfig) {
        self.cooldowns.begin_session(now, config.usage_carry_over);
        debug!(agent = %self.agent_id, "session started");
    }
}

/// Chooses and composes lines for agents.
#[derive(Debug, Clone)]
pub struct SelectionEngine {
    bank: Arc<TemplateBank>,
    config: Arc<EngineConfig>,
    variety: Option<VarietyPool>,
}

impl SelectionEngine {
    pub fn new(bank: Arc<TemplateBank>, config: Arc<EngineConfig>) -> Self {
        Self {
            bank,
            config,
            variety: None,
        }
    }

    /// Share phrase usage with other engines holding the same pool.
    pub fn with_variety_pool(mut self, pool: VarietyPool) -> Self {
        self.variety = Some(pool);
        self
    }

    pub fn bank(&self) -> &TemplateBank {
        &self.bank
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn variety_pool(&self) -> Option<&VarietyPool> {
        self.variety.as_ref()
    }

    /// Respond to an event, using the thread RNG for final tie-breaks.
    pub fn respond(&self, agent: &mut AgentState, event: &Event) -> Option<DialogueResult> {
        self.respond_with_rng(agent, event, &mut rand::thread_rng())
    }

    /// Respond to an event.
    ///
    /// Returns `None` when nothing is eligible; the event still moves rapport
    /// and is still remembered. Callers that must say something can follow up
    /// with [`SelectionEngine::acknowledge`].
    pub fn respond_with_rng<R: Rng + ?Sized>(
        &self,
        agent: &mut AgentState,
        event: &Event,
        rng: &mut R,
    ) -> Option<DialogueResult> {
        let config = &*self.config;
        let now = event.timestamp;

        if let Some(outcome) = event.outcome {
            let rapport = agent.relationship.apply(outcome);
            debug!(agent = %agent.agent_id, ?outcome, rapport, "rapport adjusted");
        }

        let query = MemoryQuery::for_event(event);
        agent.memory.apply_context_boosts(&query, now, config);

        let result = self.choose(agent, event, &query, rng);

        if let Some(said) = &result {
            if let Some(template) = self.bank.get(&said.template_id) {
                agent.cooldowns.record_use(template, now);
                if let Some(pool) = &self.variety {
                    pool.record(&template.id);
                }
            }
            if let Some(id) = said.memory_id {
                agent.cooldowns.record_callback(now);
                agent.memory.mark_callback(id, now);
            }
        }

        // Remembered after selection so a new memory can't call itself back.
        agent.memory.record(event, config);
        result
    }

    /// Gather, score, select and compose. Read-only over the agent.
    fn choose<R: Rng + ?Sized>(
        &self,
        agent: &AgentState,
        event: &Event,
        query: &MemoryQuery<'_>,
        rng: &mut R,
    ) -> Option<DialogueResult> {
        let config = &*self.config;
        let now = event.timestamp;
        let stage = agent.stage();
        let importance = event.importance.min(MAX_IMPORTANCE);

        let mut candidates: Vec<Candidate<'_>> = self
            .bank
            .category(&event.kind)
            .map(|template| Candidate {
                template,
                kind: CandidateKind::Generic,
                score: generic_score(template, importance, &agent.personality),
            })
            .collect();

        let recalled: Vec<RecalledMemory<'_>> = agent
            .memory
            .query(query, now, config)
            .into_iter()
            .filter(|r| !r.entry.recently_recalled(now, config.memory_recall_cooldown()))
            .collect();
        for memory in &recalled {
            let score = memory_score(memory, agent.relationship.rapport(), config);
            for template in self.callback_templates(memory, agent, now) {
                candidates.push(Candidate {
                    template,
                    kind: CandidateKind::Callback(memory.entry),
                    score,
                });
            }
        }

        let gates = SelectionGates {
            stage,
            specialization: agent.specialization,
            now,
            cooldowns: &agent.cooldowns,
            config,
            variety: self.variety.as_ref(),
        };
        let Some(idx) = select_with_rng(&candidates, &gates, rng) else {
            debug!(
                agent = %agent.agent_id,
                event = %event.kind,
                candidates = candidates.len(),
                "no eligible line"
            );
            return None;
        };

        let chosen = candidates[idx];
        let mut ctx = ComposeContext::new(event, stage);
        if let Some(memory) = chosen.memory() {
            ctx = ctx.with_memory(memory);
        }
        let text = compose(chosen.template, &ctx, &agent.personality, &config.transforms);

        debug!(
            agent = %agent.agent_id,
            template = %chosen.template.id,
            score = chosen.score,
            callback = chosen.is_callback(),
            candidates = candidates.len(),
            "selected line"
        );

        Some(DialogueResult {
            text,
            template_id: chosen.template.id.clone(),
            category: chosen.template.category.clone(),
            tier: chosen.template.tier.get(),
            suggested_follow_up: follow_up(chosen.template, event.status, agent.specialization),
            memory_id: chosen.memory().map(|m| m.id),
            score: chosen.score,
        })
    }

    /// Callback templates to pair with a memory: the usable ones matching the
    /// memory's tier, or any usable callback template when none match.
    ///
    /// Templates on cooldown or spent for the session are skipped before the
    /// per-memory cap applies.
    fn callback_templates<'a>(
        &'a self,
        memory: &RecalledMemory<'_>,
        agent: &AgentState,
        now: DateTime<Utc>,
    ) -> Vec<&'a Template> {
        let stage = agent.stage();
        let usable: Vec<&Template> = self
            .bank
            .category(CALLBACK_CATEGORY)
            .filter(|t| {
                t.unlocked_at(stage)
                    && t.fits(agent.specialization)
                    && agent.cooldowns.can_use(t, now, &self.config)
            })
            .collect();
        let wanted = memory.entry.tier().template_tier();

        let mut paired: Vec<&Template> = usable
            .iter()
            .copied()
            .filter(|t| t.tier.get() == wanted)
            .collect();
        if paired.is_empty() {
            paired = usable;
        }
        paired.truncate(self.config.callback_templates_per_memory);
        paired
    }

    /// Say something minimal and always available.
    ///
    /// Draws from the acknowledgment category, ignoring cooldowns and session
    /// caps, preferring the least recently used line. Falls back to a built-in
    /// line when the bank has none. Does not touch rapport or memory.
    pub fn acknowledge(&self, agent: &mut AgentState, event: &Event) -> DialogueResult {
        let stage = agent.stage();
        let now = event.timestamp;
        let ctx = ComposeContext::new(event, stage);
        let config = &*self.config;

        let pick = self
            .bank
            .category(ACKNOWLEDGMENT_CATEGORY)
            .filter(|t| t.unlocked_at(stage) && t.fits(agent.specialization))
            .min_by_key(|t| {
                (
                    agent.cooldowns.last_used(&t.id),
                    agent.cooldowns.total_uses(&t.id),
                )
            });

        match pick {
            Some(template) => {
                let text = compose(template, &ctx, &agent.personality, &config.transforms);
                agent.cooldowns.record_use(template, now);
                DialogueResult {
                    text,
                    template_id: template.id.clone(),
                    category: template.category.clone(),
                    tier: template.tier.get(),
                    suggested_follow_up: template.follow_up.clone(),
                    memory_id: None,
                    score: 0.0,
                }
            }
            None => {
                let template = builtin_acknowledgment();
                DialogueResult {
                    text: compose(&template, &ctx, &agent.personality, &config.transforms),
                    template_id: template.id,
                    category: template.category,
                    tier: template.tier.get(),
                    suggested_follow_up: None,
                    memory_id: None,
                    score: 0.0,
                }
            }
        }
    }
}

fn builtin_acknowledgment() -> Template {
    Template {
        id: TemplateId::new(BUILTIN_ACKNOWLEDGMENT_ID),
        category: ACKNOWLEDGMENT_CATEGORY.to_string(),
        tier: Tier::ROUTINE,
        text: BUILTIN_ACKNOWLEDGMENT_TEXT.to_string(),
        required_stage: RelationshipStage::Stranger,
        specialization: None,
        tone: Tone::Neutral,
        max_uses_per_session: None,
        follow_up: None,
    }
}

/// The template's own follow-up, or the specialization's after a real success.
fn follow_up(
    template: &Template,
    status: EventStatus,
    specialization: Option<Specialization>,
) -> Option<String> {
    if let Some(line) = &template.follow_up {
        return Some(line.clone());
    }
    match (status, specialization) {
        (EventStatus::Success, Some(spec)) if template.tier > Tier::ROUTINE => {
            Some(spec.follow_up().to_string())
        }
        _ => None,
    }
}
