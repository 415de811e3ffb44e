//! Relationship state between an agent and the player.
//!
//! Rapport is the only stored value. The stage is always computed from it,
//! so the two can never drift apart.

use serde::{Deserialize, Serialize};

/// Rapport a brand new agent starts with.
pub const STARTING_RAPPORT: u8 = 10;

/// Highest rapport value.
pub const MAX_RAPPORT: u8 = 100;

/// Depth of the relationship, ordered from shallowest to deepest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipStage {
    /// Rapport 0-20.
    Stranger,
    /// Rapport 21-40.
    Acquaintance,
    /// Rapport 41-60.
    Colleague,
    /// Rapport 61-80.
    Friend,
    /// Rapport 81-100.
    Partner,
}

impl RelationshipStage {
    /// All stages, shallowest first.
    pub const ALL: [RelationshipStage; 5] = [
        RelationshipStage::Stranger,
        RelationshipStage::Acquaintance,
        RelationshipStage::Colleague,
        RelationshipStage::Friend,
        RelationshipStage::Partner,
    ];

    /// Derive the stage for a rapport value.
    pub fn from_rapport(rapport: u8) -> Self {
        match rapport {
            0..=20 => RelationshipStage::Stranger,
            21..=40 => RelationshipStage::Acquaintance,
            41..=60 => RelationshipStage::Colleague,
            61..=80 => RelationshipStage::Friend,
            _ => RelationshipStage::Partner,
        }
    }

    /// Position of this stage in [`RelationshipStage::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            RelationshipStage::Stranger => "Stranger",
            RelationshipStage::Acquaintance => "Acquaintance",
            RelationshipStage::Colleague => "Colleague",
            RelationshipStage::Friend => "Friend",
            RelationshipStage::Partner => "Partner",
        }
    }

    /// How the agent addresses the player at this stage.
    pub fn default_address(&self) -> &'static str {
        match self {
            RelationshipStage::Stranger => "sir",
            RelationshipStage::Acquaintance => "boss",
            RelationshipStage::Colleague => "chief",
            RelationshipStage::Friend => "friend",
            RelationshipStage::Partner => "partner",
        }
    }

    /// Whether the agent uses the player's own name when it knows it.
    pub fn uses_first_name(&self) -> bool {
        *self >= RelationshipStage::Friend
    }
}

/// An interaction that moves rapport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionOutcome {
    /// A task the agent and player finished together.
    SharedSuccess,
    /// A failure both sides owned. Rapport is unchanged.
    SharedFailure,
    /// A running joke was born.
    InsideJoke,
    /// The player forgave a mistake.
    Forgiveness,
    /// The agent apologized; quality in `0..=10`.
    Apology { quality: u8 },
    /// A relationship milestone (anniversary, first big build).
    Milestone,
    /// Disagreement or friction.
    Conflict,
}

impl InteractionOutcome {
    /// Signed rapport change for this outcome.
    pub fn rapport_delta(&self) -> i32 {
        match self {
            InteractionOutcome::SharedSuccess => 2,
            InteractionOutcome::SharedFailure => 0,
            InteractionOutcome::InsideJoke => 3,
            InteractionOutcome::Forgiveness => 2,
            InteractionOutcome::Apology { quality } => i32::from((*quality).min(10)) / 3,
            InteractionOutcome::Milestone => 5,
            InteractionOutcome::Conflict => -3,
        }
    }
}

/// Per-agent relationship with the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipState {
    rapport: u8,
}

impl RelationshipState {
    /// Create a relationship with the given rapport (clamped to 100).
    pub fn new(rapport: u8) -> Self {
        Self {
            rapport: rapport.min(MAX_RAPPORT),
        }
    }

    pub fn rapport(&self) -> u8 {
        self.rapport
    }

    /// Current stage, derived from rapport.
    pub fn stage(&self) -> RelationshipStage {
        RelationshipStage::from_rapport(self.rapport)
    }

    /// Move rapport by `delta`, clamped to `0..=100`. Returns the new rapport.
    pub fn adjust(&mut self, delta: i32) -> u8 {
        let next = (i32::from(self.rapport) + delta).clamp(0, i32::from(MAX_RAPPORT));
        self.rapport = next as u8;
        self.rapport
    }

    /// Apply an interaction outcome.
    pub fn apply(&mut self, outcome: InteractionOutcome) -> u8 {
        self.adjust(outcome.rapport_delta())
    }
}

impl Default for RelationshipState {
    fn default() -> Self {
        Self::new(STARTING_RAPPORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_thresholds() {
        assert_eq!(RelationshipStage::from_rapport(0), RelationshipStage::Stranger);
        assert_eq!(RelationshipStage::from_rapport(20), RelationshipStage::Stranger);
        assert_eq!(RelationshipStage::from_rapport(21), RelationshipStage::Acquaintance);
        assert_eq!(RelationshipStage::from_rapport(40), RelationshipStage::Acquaintance);
        assert_eq!(RelationshipStage::from_rapport(41), RelationshipStage::Colleague);
        assert_eq!(RelationshipStage::from_rapport(61), RelationshipStage::Friend);
        assert_eq!(RelationshipStage::from_rapport(81), RelationshipStage::Partner);
        assert_eq!(RelationshipStage::from_rapport(100), RelationshipStage::Partner);
    }

    #[test]
    fn test_stage_ordering() {
        assert!(RelationshipStage::Stranger < RelationshipStage::Acquaintance);
        assert!(RelationshipStage::Friend < RelationshipStage::Partner);
        assert_eq!(RelationshipStage::Colleague.index(), 2);
    }

    #[test]
    fn test_adjust_clamps() {
        let mut rel = RelationshipState::new(98);
        assert_eq!(rel.adjust(10), 100);
        assert_eq!(rel.adjust(-250), 0);
    }

    #[test]
    fn test_stage_tracks_rapport() {
        let mut rel = RelationshipState::default();
        for _ in 0..60 {
            rel.apply(InteractionOutcome::SharedSuccess);
            assert_eq!(rel.stage(), RelationshipStage::from_rapport(rel.rapport()));
        }
        assert_eq!(rel.stage(), RelationshipStage::Partner);
    }

    #[test]
    fn test_outcome_deltas() {
        assert_eq!(InteractionOutcome::Apology { quality: 9 }.rapport_delta(), 3);
        assert_eq!(InteractionOutcome::Apology { quality: 200 }.rapport_delta(), 3);
        assert_eq!(InteractionOutcome::SharedFailure.rapport_delta(), 0);
        assert!(InteractionOutcome::Conflict.rapport_delta() < 0);
    }

    #[test]
    fn test_outcome_serde() {
        let json = r#"{"type":"apology","quality":6}"#;
        let outcome: InteractionOutcome = serde_json::from_str(json).unwrap();
        assert_eq!(outcome, InteractionOutcome::Apology { quality: 6 });
    }
}
