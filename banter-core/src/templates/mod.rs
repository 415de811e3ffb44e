//! Template bank: the static catalog of lines agents choose from.
//!
//! Templates are authored as data (JSON), validated once at load time, and
//! shared read-only by every agent. Validation is strict: an unknown
//! placeholder, stage or tier fails the load instead of surfacing mid-game.

mod bank;
mod template;

pub use bank::{BankFile, TemplateBank, ACKNOWLEDGMENT_CATEGORY, CALLBACK_CATEGORY};
pub(crate) use template::{parse_segments, Segment};
pub use template::{
    Specialization, Template, TemplateId, TemplateSpec, Tier, Tone, KNOWN_PLACEHOLDERS, MAX_TIER,
};
