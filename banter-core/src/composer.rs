//! Turns a chosen template into the final line.
//!
//! Composition has two passes. Placeholders are filled first, from the event's
//! result values, then from the event context, then from fixed defaults. The
//! filled text then runs through the personality rules in a fixed order:
//!
//! | Order | Trait             | Rule                                               |
//! |-------|-------------------|----------------------------------------------------|
//! | 1     | Neuroticism       | Non-successes start with "I... " unless apologetic |
//! | 2     | Extraversion      | Periods become "!", key words are shouted          |
//! | 3     | Conscientiousness | The last bare number gains " units"                |
//!
//! Missing data never fails a line; it logs a warning and uses the default.

use crate::config::TransformConfig;
use crate::event::{Event, EventStatus};
use crate::memory::MemoryEntry;
use crate::personality::{PersonalityProfile, Trait};
use crate::relationship::RelationshipStage;
use crate::templates::{parse_segments, Segment, Template};
use serde_json::Value;
use tracing::warn;

/// What a template is being filled for.
#[derive(Debug, Clone, Copy)]
pub struct ComposeContext<'a> {
    pub event: &'a Event,
    pub stage: RelationshipStage,
    /// The memory a callback line refers to.
    pub memory: Option<&'a MemoryEntry>,
}

impl<'a> ComposeContext<'a> {
    pub fn new(event: &'a Event, stage: RelationshipStage) -> Self {
        Self {
            event,
            stage,
            memory: None,
        }
    }

    pub fn with_memory(mut self, memory: &'a MemoryEntry) -> Self {
        self.memory = Some(memory);
        self
    }
}

/// Fill a template and apply personality rules.
pub fn compose(
    template: &Template,
    ctx: &ComposeContext<'_>,
    personality: &PersonalityProfile,
    config: &TransformConfig,
) -> String {
    let filled = fill(template, ctx);
    apply_personality(&filled, ctx.event.status, personality, config)
}

/// Replace every placeholder in the template text.
pub fn fill(template: &Template, ctx: &ComposeContext<'_>) -> String {
    let Some(segments) = parse_segments(&template.text) else {
        // Banks are validated at load, so this only happens for hand-built templates.
        warn!(template = %template.id, "template text has unbalanced braces");
        return template.text.clone();
    };

    let mut out = String::with_capacity(template.text.len() + 16);
    for segment in segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Placeholder(name) => match resolve(name, ctx) {
                Some(value) => out.push_str(&value),
                None => {
                    warn!(
                        template = %template.id,
                        placeholder = name,
                        "no value for placeholder, using default"
                    );
                    out.push_str(default_value(name));
                }
            },
        }
    }
    out
}

fn resolve(name: &str, ctx: &ComposeContext<'_>) -> Option<String> {
    let context = &ctx.event.context;
    if let Some(value) = context.results.get(name) {
        return Some(render(value));
    }

    match name {
        "location" => context.location.clone(),
        "activity" => context.activity.clone(),
        "task" => context.task_type.clone(),
        "player" => context.player_name.clone(),
        "percentage" => context.completion.map(|p| p.to_string()),
        "memory" => ctx.memory.map(|m| m.description.clone()),
        "address" => Some(address(ctx)),
        _ => None,
    }
}

/// How the agent addresses the player at this stage.
pub fn address(ctx: &ComposeContext<'_>) -> String {
    match &ctx.event.context.player_name {
        Some(name) if ctx.stage.uses_first_name() => name.clone(),
        _ => ctx.stage.default_address().to_string(),
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "unknown".to_string(),
        other => other.to_string(),
    }
}

/// Default text for a placeholder with no data.
pub fn default_value(name: &str) -> &'static str {
    match name {
        "count" => "several",
        "resource" => "materials",
        "structure" => "structure",
        "discovery" => "something interesting",
        "obstacle" => "ran into a complication",
        "requirement" => "more materials",
        "efficiency" => "optimal",
        "depth" => "the target depth",
        "time" => "a while",
        "percentage" => "most of the way",
        "player" => "boss",
        "item" => "it",
        "target" => "the target",
        "distance" => "a fair way",
        "location" => "here",
        "activity" => "this",
        "task" => "the job",
        "memory" => "that time",
        _ => "something",
    }
}

/// One personality rewrite, run when its trait is above threshold.
struct TransformRule {
    trait_: Trait,
    apply: fn(&str, EventStatus, &TransformConfig) -> String,
}

const RULES: [TransformRule; 3] = [
    TransformRule {
        trait_: Trait::Neuroticism,
        apply: nervous,
    },
    TransformRule {
        trait_: Trait::Extraversion,
        apply: emphatic,
    },
    TransformRule {
        trait_: Trait::Conscientiousness,
        apply: precise,
    },
];

fn threshold(config: &TransformConfig, trait_: Trait) -> u8 {
    match trait_ {
        Trait::Neuroticism => config.neuroticism_threshold,
        Trait::Extraversion => config.extraversion_threshold,
        Trait::Conscientiousness => config.conscientiousness_threshold,
        Trait::Openness | Trait::Agreeableness => u8::MAX,
    }
}

/// Run every rule whose trait is above its threshold, in order.
pub fn apply_personality(
    text: &str,
    status: EventStatus,
    personality: &PersonalityProfile,
    config: &TransformConfig,
) -> String {
    let mut out = text.to_string();
    for rule in &RULES {
        if personality.get(rule.trait_) > threshold(config, rule.trait_) {
            out = (rule.apply)(&out, status, config);
        }
    }
    out
}

fn nervous(text: &str, status: EventStatus, _: &TransformConfig) -> String {
    let lower = text.to_lowercase();
    if status.is_success() || lower.contains("sorry") || lower.contains("apologi") {
        return text.to_string();
    }
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => format!("I... {}{}", first.to_lowercase(), chars.as_str()),
        None => text.to_string(),
    }
}

fn emphatic(text: &str, _: EventStatus, config: &TransformConfig) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 1);

    // Sentence-ending periods only: not ellipses, not decimal points.
    for (i, &c) in chars.iter().enumerate() {
        let prev = i.checked_sub(1).map(|p| chars[p]);
        let next = chars.get(i + 1).copied();
        let ends_sentence = c == '.'
            && prev != Some('.')
            && next != Some('.')
            && next.map_or(true, char::is_whitespace);
        if ends_sentence {
            out.push('!');
        } else {
            out.push(c);
        }
    }

    while out.contains("!!") {
        out = out.replace("!!", "!");
    }
    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);
    if !(out.ends_with('!') || out.ends_with('?')) {
        out.push('!');
    }

    shout_words(&out, &config.emphasis_words)
}

fn shout_words(text: &str, words: &[String]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word = String::new();
    let flush = |word: &mut String, out: &mut String| {
        if words.iter().any(|w| w.eq_ignore_ascii_case(word)) {
            out.push_str(&word.to_uppercase());
        } else {
            out.push_str(word);
        }
        word.clear();
    };

    for c in text.chars() {
        if c.is_alphanumeric() || c == '\'' {
            word.push(c);
        } else {
            flush(&mut word, &mut out);
            out.push(c);
        }
    }
    flush(&mut word, &mut out);
    out
}

fn precise(text: &str, _: EventStatus, _: &TransformConfig) -> String {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut insert_at = None;

    let mut i = 0;
    while i < chars.len() {
        let (_, c) = chars[i];
        let starts_number =
            c.is_ascii_digit() && (i == 0 || !chars[i - 1].1.is_alphanumeric());
        if !starts_number {
            i += 1;
            continue;
        }

        let mut end = i;
        while end < chars.len()
            && (chars[end].1.is_ascii_digit()
                || (chars[end].1 == '.'
                    && chars.get(end + 1).is_some_and(|(_, d)| d.is_ascii_digit())))
        {
            end += 1;
        }

        let bare = match chars.get(end) {
            None => true,
            Some(&(_, next)) => next.is_ascii_punctuation() && next != '%',
        };
        if bare {
            insert_at = Some(chars.get(end).map_or(text.len(), |&(pos, _)| pos));
        }
        i = end;
    }

    match insert_at {
        Some(pos) => format!("{} units{}", &text[..pos], &text[pos..]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::{Tier, Tone};
    use chrono::{TimeZone, Utc};

    fn template(text: &str) -> Template {
        Template {
            id: "t".into(),
            category: "task_complete".into(),
            tier: Tier::ROUTINE,
            text: text.into(),
            required_stage: RelationshipStage::Stranger,
            specialization: None,
            tone: Tone::Neutral,
            max_uses_per_session: None,
            follow_up: None,
        }
    }

    fn event() -> Event {
        Event::new("task_complete", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    fn plain() -> PersonalityProfile {
        PersonalityProfile::balanced()
    }

    #[test]
    fn test_fill_from_results() {
        let ev = event()
            .with_result("count", 27)
            .with_result("resource", "iron ore");
        let ctx = ComposeContext::new(&ev, RelationshipStage::Stranger);
        let text = compose(
            &template("Got {count} {resource}."),
            &ctx,
            &plain(),
            &TransformConfig::default(),
        );
        assert_eq!(text, "Got 27 iron ore.");
    }

    #[test]
    fn test_fill_defaults() {
        let ev = event();
        let ctx = ComposeContext::new(&ev, RelationshipStage::Stranger);
        let text = compose(
            &template("Got {count} {resource}."),
            &ctx,
            &plain(),
            &TransformConfig::default(),
        );
        assert_eq!(text, "Got several materials.");
    }

    #[test]
    fn test_fill_null_and_context() {
        let ev = event()
            .with_result("depth", Value::Null)
            .with_location("the Deep Mine");
        let ctx = ComposeContext::new(&ev, RelationshipStage::Stranger);
        assert_eq!(
            fill(&template("Reached {depth} in {location}."), &ctx),
            "Reached unknown in the Deep Mine."
        );
    }

    #[test]
    fn test_address_by_stage() {
        let ev = event().with_player("Alex");
        let stranger = ComposeContext::new(&ev, RelationshipStage::Stranger);
        let friend = ComposeContext::new(&ev, RelationshipStage::Friend);
        assert_eq!(fill(&template("Yes, {address}."), &stranger), "Yes, sir.");
        assert_eq!(fill(&template("Yes, {address}."), &friend), "Yes, Alex.");

        let anon = event();
        let partner = ComposeContext::new(&anon, RelationshipStage::Partner);
        assert_eq!(fill(&template("Yes, {address}."), &partner), "Yes, partner.");
    }

    #[test]
    fn test_memory_placeholder() {
        let ev = event();
        let memory = MemoryEntry::new("near_death", "the lava fall", 9, -9, ev.timestamp);
        let ctx = ComposeContext::new(&ev, RelationshipStage::Partner).with_memory(&memory);
        assert_eq!(
            fill(&template("Remember {memory}?"), &ctx),
            "Remember the lava fall?"
        );
    }

    #[test]
    fn test_nervous_unless_success() {
        let config = TransformConfig::default();
        let anxious = PersonalityProfile::new(50, 50, 50, 50, 90).unwrap();
        assert_eq!(
            apply_personality("Couldn't finish.", EventStatus::Failure, &anxious, &config),
            "I... couldn't finish."
        );
        assert_eq!(
            apply_personality("Finished.", EventStatus::Success, &anxious, &config),
            "Finished."
        );
        assert_eq!(
            apply_personality("Sorry, it broke.", EventStatus::Failure, &anxious, &config),
            "Sorry, it broke."
        );
        assert_eq!(
            apply_personality("Still waiting on stone.", EventStatus::Neutral, &anxious, &config),
            "I... still waiting on stone."
        );
    }

    #[test]
    fn test_emphatic() {
        let config = TransformConfig::default();
        let loud = PersonalityProfile::new(50, 50, 90, 50, 10).unwrap();
        assert_eq!(
            apply_personality("Task done. Found 2.5 blocks.", EventStatus::Success, &loud, &config),
            "Task DONE! FOUND 2.5 blocks!"
        );
        assert_eq!(
            apply_personality("Really?!!", EventStatus::Success, &loud, &config),
            "Really?!"
        );
    }

    #[test]
    fn test_precise_units() {
        let config = TransformConfig::default();
        let careful = PersonalityProfile::new(50, 95, 50, 50, 10).unwrap();
        assert_eq!(
            apply_personality("Mined 27.", EventStatus::Success, &careful, &config),
            "Mined 27 units."
        );
        assert_eq!(
            apply_personality("Got 27 iron ore.", EventStatus::Success, &careful, &config),
            "Got 27 iron ore."
        );
        assert_eq!(
            apply_personality("At 80%. Placed 12, then 40", EventStatus::Success, &careful, &config),
            "At 80%. Placed 12, then 40 units"
        );
    }

    #[test]
    fn test_rules_run_in_order() {
        let config = TransformConfig::default();
        let intense = PersonalityProfile::new(50, 95, 90, 50, 90).unwrap();
        assert_eq!(
            apply_personality("Only got 12.", EventStatus::Partial, &intense, &config),
            "I... only got 12 units!"
        );
    }
}
