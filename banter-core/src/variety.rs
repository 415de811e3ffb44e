//! Cross-agent phrase variety.

use crate::templates::TemplateId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared count of how often each template has been said by any agent.
///
/// Optional: agents that share a pool break selection ties toward lines the
/// group has said least, so a crowd of workers doesn't speak in unison.
/// Cloning shares the same underlying counts.
#[derive(Debug, Clone, Default)]
pub struct VarietyPool {
    uses: Arc<Mutex<HashMap<TemplateId, u32>>>,
}

impl VarietyPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses of a template across all agents.
    pub fn uses(&self, id: &TemplateId) -> u32 {
        self.uses.lock().get(id).copied().unwrap_or(0)
    }

    pub fn record(&self, id: &TemplateId) {
        let mut uses = self.uses.lock();
        let count = uses.entry(id.clone()).or_insert(0);
        *count = count.saturating_add(1);
    }

    pub fn clear(&self) {
        self.uses.lock().clear();
    }
}
