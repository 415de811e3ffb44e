//! The shared, read-only template bank.

use super::template::{
    parse_segments, Segment, Template, TemplateId, TemplateSpec, Tier, KNOWN_PLACEHOLDERS,
};
use crate::config::{ConfigError, EngineConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;

/// Category of memory callback templates.
pub const CALLBACK_CATEGORY: &str = "callback";

/// Category of the always-available fallback lines.
pub const ACKNOWLEDGMENT_CATEGORY: &str = "acknowledgment";

/// On-disk shape of a template bank.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BankFile {
    pub templates: Vec<TemplateSpec>,
}

/// Every template an agent may say, indexed by category and id.
///
/// Built once at startup and shared behind an `Arc`; nothing mutates it after
/// construction.
#[derive(Debug, Clone, Default)]
pub struct TemplateBank {
    templates: Vec<Template>,
    by_id: HashMap<TemplateId, usize>,
    by_category: HashMap<String, Vec<usize>>,
}

impl TemplateBank {
    /// Validate template specs and build the bank.
    pub fn from_specs(specs: Vec<TemplateSpec>, config: &EngineConfig) -> Result<Self, ConfigError> {
        let mut bank = Self::default();

        for spec in specs {
            let template = validate(spec)?;
            if bank.by_id.contains_key(&template.id) {
                return Err(ConfigError::DuplicateTemplateId(template.id.to_string()));
            }

            let idx = bank.templates.len();
            bank.by_id.insert(template.id.clone(), idx);
            bank.by_category
                .entry(template.category.clone())
                .or_default()
                .push(idx);
            bank.templates.push(template);
        }

        for (category, members) in &bank.by_category {
            if members.len() > config.max_templates_per_category {
                return Err(ConfigError::CategoryOverCap {
                    category: category.clone(),
                    count: members.len(),
                    limit: config.max_templates_per_category,
                });
            }
        }

        Ok(bank)
    }

    /// Parse and validate a bank from JSON.
    pub fn from_json_str(json: &str, config: &EngineConfig) -> Result<Self, ConfigError> {
        let file: BankFile = serde_json::from_str(json)?;
        Self::from_specs(file.templates, config)
    }

    /// Load and validate a bank from a JSON file.
    pub async fn load_json(path: impl AsRef<Path>, config: &EngineConfig) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).await?;
        Self::from_json_str(&content, config)
    }

    /// Look up a template by id.
    pub fn get(&self, id: &TemplateId) -> Option<&Template> {
        self.by_id.get(id).map(|&idx| &self.templates[idx])
    }

    /// Templates in a category, in bank order.
    pub fn category<'a>(&'a self, category: &str) -> impl Iterator<Item = &'a Template> + 'a {
        self.by_category
            .get(category)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.templates[idx])
    }

    /// Whether the bank has any template for a category.
    pub fn has_category(&self, category: &str) -> bool {
        self.by_category.contains_key(category)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.iter()
    }
}

fn validate(spec: TemplateSpec) -> Result<Template, ConfigError> {
    let id = spec.id.trim().to_string();
    let tier = Tier::new(spec.tier).ok_or_else(|| ConfigError::TierOutOfRange {
        id: id.clone(),
        tier: spec.tier,
    })?;

    if spec.text.trim().is_empty() {
        return Err(ConfigError::EmptyText(id));
    }

    let segments = parse_segments(&spec.text).ok_or_else(|| ConfigError::UnbalancedBraces {
        id: id.clone(),
        text: spec.text.clone(),
    })?;
    for segment in segments {
        if let Segment::Placeholder(name) = segment {
            if !KNOWN_PLACEHOLDERS.contains(&name) {
                return Err(ConfigError::UnknownPlaceholder {
                    id,
                    placeholder: name.to_string(),
                });
            }
        }
    }

    if spec.max_uses_per_session == Some(0) {
        return Err(ConfigError::ZeroSessionUses(id));
    }

    Ok(Template {
        id: TemplateId::new(id),
        category: spec.category.trim().to_string(),
        tier,
        text: spec.text,
        required_stage: spec.required_stage,
        specialization: spec.specialization,
        tone: spec.tone,
        max_uses_per_session: spec.max_uses_per_session,
        follow_up: spec.follow_up,
    })
}
