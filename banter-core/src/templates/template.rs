//! Utterance templates.

use crate::relationship::RelationshipStage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest template tier.
pub const MAX_TIER: u8 = 5;

/// Placeholder names a template may reference.
pub const KNOWN_PLACEHOLDERS: &[&str] = &[
    "count",
    "resource",
    "structure",
    "discovery",
    "obstacle",
    "requirement",
    "percentage",
    "efficiency",
    "depth",
    "time",
    "item",
    "target",
    "distance",
    "player",
    "address",
    "memory",
    "location",
    "activity",
    "task",
];

/// Identifier of a template, unique within a bank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(String);

impl TemplateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TemplateId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Complexity/importance tier of a template, `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Tier(u8);

impl Tier {
    pub const ROUTINE: Tier = Tier(1);
    pub const EPIC: Tier = Tier(MAX_TIER);

    /// Build a tier, `None` unless `1..=5`.
    pub fn new(tier: u8) -> Option<Self> {
        (1..=MAX_TIER).contains(&tier).then_some(Self(tier))
    }

    /// Tier an event of the given importance (`0..=10`) calls for.
    pub fn for_importance(importance: u8) -> Self {
        match importance {
            0..=2 => Tier(1),
            3..=4 => Tier(2),
            5..=6 => Tier(3),
            7..=8 => Tier(4),
            _ => Tier(5),
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    /// Zero-based index for per-tier tables.
    pub fn index(&self) -> usize {
        usize::from(self.0 - 1)
    }

    /// Distance between two tiers.
    pub fn distance(&self, other: Tier) -> u8 {
        self.0.abs_diff(other.0)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Personality flavour of a template; decides which trait makes it attractive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Neutral,
    Enthusiastic,
    Anxious,
    Apologetic,
    Stoic,
    Precise,
    Warm,
    Playful,
}

/// Worker specialization a template is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specialization {
    Miner,
    Builder,
    Guard,
    Scout,
    Farmer,
    Artisan,
}

impl Specialization {
    pub fn title(&self) -> &'static str {
        match self {
            Specialization::Miner => "The Excavator",
            Specialization::Builder => "The Architect",
            Specialization::Guard => "The Protector",
            Specialization::Scout => "The Pathfinder",
            Specialization::Farmer => "The Cultivator",
            Specialization::Artisan => "The Crafter",
        }
    }

    /// Follow-up offered after a successful, non-trivial task.
    pub fn follow_up(&self) -> &'static str {
        match self {
            Specialization::Miner => "Shall I continue mining?",
            Specialization::Builder => "Ready for next construction phase.",
            Specialization::Guard => "Perimeter will remain secure.",
            Specialization::Scout => "Want to see what I found?",
            Specialization::Farmer => "The crops will need tending again soon.",
            Specialization::Artisan => "Ready for next crafting operation.",
        }
    }
}

/// Template as written in bank data, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSpec {
    pub id: String,
    pub category: String,
    pub tier: u8,
    pub text: String,
    #[serde(default = "default_stage")]
    pub required_stage: RelationshipStage,
    #[serde(default)]
    pub specialization: Option<Specialization>,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default)]
    pub max_uses_per_session: Option<u32>,
    #[serde(default)]
    pub follow_up: Option<String>,
}

fn default_stage() -> RelationshipStage {
    RelationshipStage::Stranger
}

/// A validated, immutable utterance template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    pub id: TemplateId,
    pub category: String,
    pub tier: Tier,
    pub text: String,
    pub required_stage: RelationshipStage,
    /// `None` means any specialization may use it.
    pub specialization: Option<Specialization>,
    pub tone: Tone,
    /// Explicit session cap; the per-tier default applies when absent.
    pub max_uses_per_session: Option<u32>,
    pub follow_up: Option<String>,
}

impl Template {
    /// Whether an agent with the given specialization may say this.
    pub fn fits(&self, specialization: Option<Specialization>) -> bool {
        match self.specialization {
            None => true,
            Some(required) => specialization == Some(required),
        }
    }

    /// Whether the relationship is deep enough for this line.
    pub fn unlocked_at(&self, stage: RelationshipStage) -> bool {
        stage >= self.required_stage
    }
}

/// A piece of template text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    Literal(&'a str),
    Placeholder(&'a str),
}

/// Split template text into literal runs and `{name}` placeholders.
///
/// Returns `None` for a stray `}`, an unclosed `{`, or a nested `{`.
pub(crate) fn parse_segments(text: &str) -> Option<Vec<Segment<'_>>> {
    let mut segments = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(|c: char| c == '{' || c == '}') {
        if rest.as_bytes()[open] == b'}' {
            return None;
        }
        if open > 0 {
            segments.push(Segment::Literal(&rest[..open]));
        }
        let after = &rest[open + 1..];
        let close = after.find(|c: char| c == '{' || c == '}')?;
        if after.as_bytes()[close] == b'{' {
            return None;
        }
        segments.push(Segment::Placeholder(after[..close].trim()));
        rest = &after[close + 1..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }
    Some(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_range() {
        assert!(Tier::new(0).is_none());
        assert!(Tier::new(6).is_none());
        assert_eq!(Tier::new(3).unwrap().index(), 2);
    }

    #[test]
    fn test_tier_for_importance() {
        assert_eq!(Tier::for_importance(0).get(), 1);
        assert_eq!(Tier::for_importance(3).get(), 2);
        assert_eq!(Tier::for_importance(6).get(), 3);
        assert_eq!(Tier::for_importance(8).get(), 4);
        assert_eq!(Tier::for_importance(10).get(), 5);
    }

    #[test]
    fn test_parse_segments() {
        let segs = parse_segments("Got {count} {resource}.").unwrap();
        assert_eq!(
            segs,
            vec![
                Segment::Literal("Got "),
                Segment::Placeholder("count"),
                Segment::Literal(" "),
                Segment::Placeholder("resource"),
                Segment::Literal("."),
            ]
        );
    }

    #[test]
    fn test_parse_segments_rejects_bad_braces() {
        assert!(parse_segments("Got {count").is_none());
        assert!(parse_segments("Got count}").is_none());
        assert!(parse_segments("Got {co{unt}").is_none());
        assert_eq!(parse_segments("").unwrap(), vec![]);
    }

    #[test]
    fn test_spec_defaults() {
        let spec: TemplateSpec = serde_json::from_str(
            r#"{"id":"a","category":"greeting","tier":1,"text":"Hello."}"#,
        )
        .unwrap();
        assert_eq!(spec.required_stage, RelationshipStage::Stranger);
        assert_eq!(spec.tone, Tone::Neutral);
        assert!(spec.specialization.is_none());
    }

    #[test]
    fn test_template_fits_specialization() {
        let template = Template {
            id: "mine_done".into(),
            category: "task_complete".into(),
            tier: Tier::ROUTINE,
            text: "Done.".into(),
            required_stage: RelationshipStage::Acquaintance,
            specialization: Some(Specialization::Miner),
            tone: Tone::Neutral,
            max_uses_per_session: None,
            follow_up: None,
        };
        assert!(template.fits(Some(Specialization::Miner)));
        assert!(!template.fits(Some(Specialization::Guard)));
        assert!(!template.fits(None));
        assert!(!template.unlocked_at(RelationshipStage::Stranger));
        assert!(template.unlocked_at(RelationshipStage::Partner));
    }
}
