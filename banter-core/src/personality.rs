//! Personality profiles (OCEAN model).
//!
//! A profile is fixed character identity: five trait scores in `0..=100`
//! that never change after the agent is created. Everything personality
//! does to dialogue is driven from these numbers through data tables in
//! the scorer and composer.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Highest legal trait score.
pub const MAX_TRAIT: u8 = 100;

/// Errors from building a personality profile.
#[derive(Debug, Error, PartialEq)]
pub enum PersonalityError {
    #[error("{name} must be between 0 and 100, got: {value}")]
    TraitOutOfRange { name: &'static str, value: u8 },

    #[error("blend weight must be between 0.0 and 1.0, got: {0}")]
    InvalidBlendWeight(f64),
}

/// The five personality traits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trait {
    Openness,
    Conscientiousness,
    Extraversion,
    Agreeableness,
    Neuroticism,
}

impl Trait {
    /// All traits in OCEAN order.
    pub const ALL: [Trait; 5] = [
        Trait::Openness,
        Trait::Conscientiousness,
        Trait::Extraversion,
        Trait::Agreeableness,
        Trait::Neuroticism,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Trait::Openness => "openness",
            Trait::Conscientiousness => "conscientiousness",
            Trait::Extraversion => "extraversion",
            Trait::Agreeableness => "agreeableness",
            Trait::Neuroticism => "neuroticism",
        }
    }
}

/// Coarse description of a trait score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TraitLevel {
    VeryLow,
    Low,
    Average,
    High,
    VeryHigh,
}

impl TraitLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=20 => TraitLevel::VeryLow,
            21..=40 => TraitLevel::Low,
            41..=60 => TraitLevel::Average,
            61..=80 => TraitLevel::High,
            _ => TraitLevel::VeryHigh,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TraitLevel::VeryLow => "Very Low",
            TraitLevel::Low => "Low",
            TraitLevel::Average => "Average",
            TraitLevel::High => "High",
            TraitLevel::VeryHigh => "Very High",
        }
    }
}

/// An agent's personality: five OCEAN scores in `0..=100`.
///
/// Fields are private so a profile can only be built through [`PersonalityProfile::new`],
/// which validates ranges. Deserialization goes through the same check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawProfile")]
pub struct PersonalityProfile {
    openness: u8,
    conscientiousness: u8,
    extraversion: u8,
    agreeableness: u8,
    neuroticism: u8,
}

#[derive(Deserialize)]
struct RawProfile {
    openness: u8,
    conscientiousness: u8,
    extraversion: u8,
    agreeableness: u8,
    neuroticism: u8,
}

impl TryFrom<RawProfile> for PersonalityProfile {
    type Error = PersonalityError;

    fn try_from(raw: RawProfile) -> Result<Self, Self::Error> {
        PersonalityProfile::new(
            raw.openness,
            raw.conscientiousness,
            raw.extraversion,
            raw.agreeableness,
            raw.neuroticism,
        )
    }
}

impl PersonalityProfile {
    /// Create a profile, rejecting any score above 100.
    pub fn new(
        openness: u8,
        conscientiousness: u8,
        extraversion: u8,
        agreeableness: u8,
        neuroticism: u8,
    ) -> Result<Self, PersonalityError> {
        check("openness", openness)?;
        check("conscientiousness", conscientiousness)?;
        check("extraversion", extraversion)?;
        check("agreeableness", agreeableness)?;
        check("neuroticism", neuroticism)?;

        Ok(Self {
            openness,
            conscientiousness,
            extraversion,
            agreeableness,
            neuroticism,
        })
    }

    /// A middle-of-the-road profile (all traits 50).
    pub fn balanced() -> Self {
        Self {
            openness: 50,
            conscientiousness: 50,
            extraversion: 50,
            agreeableness: 50,
            neuroticism: 50,
        }
    }

    pub fn openness(&self) -> u8 {
        self.openness
    }

    pub fn conscientiousness(&self) -> u8 {
        self.conscientiousness
    }

    pub fn extraversion(&self) -> u8 {
        self.extraversion
    }

    pub fn agreeableness(&self) -> u8 {
        self.agreeableness
    }

    pub fn neuroticism(&self) -> u8 {
        self.neuroticism
    }

    /// Score for a single trait.
    pub fn get(&self, t: Trait) -> u8 {
        match t {
            Trait::Openness => self.openness,
            Trait::Conscientiousness => self.conscientiousness,
            Trait::Extraversion => self.extraversion,
            Trait::Agreeableness => self.agreeableness,
            Trait::Neuroticism => self.neuroticism,
        }
    }

    /// Coarse level for a single trait.
    pub fn level(&self, t: Trait) -> TraitLevel {
        TraitLevel::from_score(self.get(t))
    }

    /// Blend this profile with another into a new profile.
    ///
    /// `weight` is the influence of `other`: 0.0 returns a copy of `self`,
    /// 1.0 returns a copy of `other`.
    pub fn blend(&self, other: &PersonalityProfile, weight: f64) -> Result<Self, PersonalityError> {
        if !(0.0..=1.0).contains(&weight) {
            return Err(PersonalityError::InvalidBlendWeight(weight));
        }

        let mix = |a: u8, b: u8| -> u8 {
            let v = f64::from(a) * (1.0 - weight) + f64::from(b) * weight;
            v.round().clamp(0.0, f64::from(MAX_TRAIT)) as u8
        };

        Ok(Self {
            openness: mix(self.openness, other.openness),
            conscientiousness: mix(self.conscientiousness, other.conscientiousness),
            extraversion: mix(self.extraversion, other.extraversion),
            agreeableness: mix(self.agreeableness, other.agreeableness),
            neuroticism: mix(self.neuroticism, other.neuroticism),
        })
    }
}

impl Default for PersonalityProfile {
    fn default() -> Self {
        Self::balanced()
    }
}

impl fmt::Display for PersonalityProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "O:{} C:{} E:{} A:{} N:{}",
            self.openness,
            self.conscientiousness,
            self.extraversion,
            self.agreeableness,
            self.neuroticism
        )
    }
}

fn check(name: &'static str, value: u8) -> Result<(), PersonalityError> {
    if value > MAX_TRAIT {
        return Err(PersonalityError::TraitOutOfRange { name, value });
    }
    Ok(())
}
