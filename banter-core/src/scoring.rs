//! Candidate scoring. Pure functions; every score lands in `[0, 1]`.

use crate::config::EngineConfig;
use crate::memory::{RecalledMemory, MAX_IMPORTANCE};
use crate::personality::{PersonalityProfile, MAX_TRAIT};
use crate::relationship::MAX_RAPPORT;
use crate::templates::{Template, Tier, Tone};

/// Affinity of a neutral template.
pub const NEUTRAL_AFFINITY: f64 = 0.6;

/// Weight lost per tier of distance between a template and the event.
const TIER_MISMATCH_PENALTY: f64 = 0.25;

/// How well a template tier fits the tier an event calls for.
pub fn tier_match(template: Tier, desired: Tier) -> f64 {
    (1.0 - TIER_MISMATCH_PENALTY * f64::from(template.distance(desired))).max(0.0)
}

/// How much a personality likes a tone: `0.3..=0.9`.
pub fn affinity(tone: Tone, personality: &PersonalityProfile) -> f64 {
    let trait_score = match tone {
        Tone::Neutral => return NEUTRAL_AFFINITY,
        Tone::Enthusiastic => personality.extraversion(),
        Tone::Anxious | Tone::Apologetic => personality.neuroticism(),
        Tone::Stoic => MAX_TRAIT - personality.neuroticism(),
        Tone::Precise => personality.conscientiousness(),
        Tone::Warm => personality.agreeableness(),
        Tone::Playful => personality.openness(),
    };
    0.3 + 0.6 * f64::from(trait_score) / f64::from(MAX_TRAIT)
}

/// Score of a plain category template for an event of the given importance.
pub fn generic_score(template: &Template, importance: u8, personality: &PersonalityProfile) -> f64 {
    let desired = Tier::for_importance(importance);
    tier_match(template.tier, desired) * affinity(template.tone, personality)
}

/// Score of calling back to a recalled memory.
///
/// `(relevance/10) * (importance/10) * (rapport/100)`, plus the context
/// trigger bonus when the moment matches the memory's tags.
pub fn memory_score(recalled: &RecalledMemory<'_>, rapport: u8, config: &EngineConfig) -> f64 {
    let importance = f64::from(recalled.entry.importance) / f64::from(MAX_IMPORTANCE);
    let rapport = f64::from(rapport.min(MAX_RAPPORT)) / f64::from(MAX_RAPPORT);
    let bonus = if recalled.triggered {
        config.context_trigger_bonus
    } else {
        0.0
    };
    ((recalled.relevance / 10.0) * importance * rapport + bonus).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryEntry;
    use crate::relationship::RelationshipStage;
    use chrono::{Duration, TimeZone, Utc};

    fn template(tier: u8, tone: Tone) -> Template {
        Template {
            id: "t".into(),
            category: "task_complete".into(),
            tier: Tier::new(tier).unwrap(),
            text: "Done.".into(),
            required_stage: RelationshipStage::Stranger,
            specialization: None,
            tone,
            max_uses_per_session: None,
            follow_up: None,
        }
    }

    #[test]
    fn test_tier_match() {
        let t3 = Tier::new(3).unwrap();
        assert_eq!(tier_match(t3, t3), 1.0);
        assert_eq!(tier_match(Tier::new(1).unwrap(), t3), 0.5);
        assert_eq!(tier_match(Tier::ROUTINE, Tier::EPIC), 0.0);
    }

    #[test]
    fn test_affinity_follows_traits() {
        let loud = PersonalityProfile::new(50, 50, 100, 50, 0).unwrap();
        assert!((affinity(Tone::Enthusiastic, &loud) - 0.9).abs() < 1e-9);
        assert!((affinity(Tone::Anxious, &loud) - 0.3).abs() < 1e-9);
        assert!((affinity(Tone::Stoic, &loud) - 0.9).abs() < 1e-9);
        assert_eq!(affinity(Tone::Neutral, &loud), NEUTRAL_AFFINITY);
    }

    #[test]
    fn test_generic_score_bounds() {
        let p = PersonalityProfile::balanced();
        for tier in 1..=5 {
            for importance in 0..=10 {
                let s = generic_score(&template(tier, Tone::Warm), importance, &p);
                assert!((0.0..=1.0).contains(&s));
            }
        }
        assert!((generic_score(&template(2, Tone::Neutral), 3, &p) - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_memory_score() {
        let config = EngineConfig::default();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let now = t0 + Duration::days(40);
        let entry = MemoryEntry::new("near_death", "the lava fall", 9, -9, t0);

        let recalled = RecalledMemory {
            entry: &entry,
            relevance: entry.relevance(now, &config),
            triggered: true,
        };
        assert_eq!(memory_score(&recalled, 90, &config), 1.0);
        assert_eq!(memory_score(&recalled, 0, &config), 0.3);

        let untriggered = RecalledMemory {
            triggered: false,
            ..recalled
        };
        let s = memory_score(&untriggered, 10, &config);
        assert!(s > 0.0 && s < 0.3);
    }
}
