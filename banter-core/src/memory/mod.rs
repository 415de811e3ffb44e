//! Per-agent memory of significant events.
//!
//! Memories never disappear. Their relevance decays exponentially per tier
//! toward a floor, so an epic moment stays callable for a very long time while
//! routine chatter fades within days. Revisiting a place, repeating an activity
//! or the player bringing something up adds a temporary, linearly fading boost.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    MemoryStore                       │
//! │                                                      │
//! │  ┌────────────────────┐  ┌────────────────────────┐  │
//! │  │ entries            │  │ tag_index              │  │
//! │  │ (MemoryEntry list) │  │ (lowercase tag → idx)  │  │
//! │  └────────────────────┘  └────────────────────────┘  │
//! │                                                      │
//! │  relevance(t) = max(floor, imp·e^(-λt)·intensity)    │
//! │                 + boost(t)                           │
//! └──────────────────────────────────────────────────────┘
//! ```

mod entry;
mod store;

pub use entry::{
    BoostTrigger, MemoryBoost, MemoryEntry, MemoryId, MemoryTags, MemoryTier,
    MAX_EMOTIONAL_WEIGHT, MAX_IMPORTANCE,
};
pub use store::{MemoryQuery, MemoryStore, RecalledMemory};
