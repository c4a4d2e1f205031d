//! Content classifier: decides whether a line of upstream text describes a
//! birth, a death, or a generic event, and pulls out the structured fields.
//!
//! Classification is an ordered rule table; the first rule whose predicate
//! holds decides the kind. This is best-effort text matching with known false
//! positives, not a guarantee.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::EventKind;
use crate::text::{self, MAX_NAME_CHARS, MAX_TEXT_CHARS};

/// Section of the on-this-day feed an item came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FeedSection {
    Events,
    Births,
    Deaths,
}

static RE_DIED_PAREN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(died \d{4}\)").unwrap());
static RE_BORN_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(born (\d{4})\)|\bborn (\d{4})").unwrap());
static RE_NAME_PROFESSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([^,]+),\s*([^(]+?)$").unwrap());
static RE_PROFESSION_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(actor|actress|singer|musician|writer|artist|politician|scientist|player|athlete|footballer|swimmer|runner|tennis|basketball|baseball|rugby|cricket|hockey)").unwrap()
});
static RE_PERSON: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([^,]+)").unwrap());
static RE_PROFESSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*([^(]+?)(?:\s*\(|$)").unwrap());
static RE_PROFESSION_BEFORE_BORN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*(.+?)\s+born\s+\d{4}").unwrap());

/// What a rule sees.
#[derive(Debug, Clone)]
pub struct RuleInput<'a> {
    pub text: &'a str,
    pub lower: String,
    pub section: Option<FeedSection>,
}

impl<'a> RuleInput<'a> {
    pub fn new(text: &'a str, section: Option<FeedSection>) -> Self {
        Self {
            text,
            lower: text.to_lowercase(),
            section,
        }
    }
}

pub struct Rule {
    pub name: &'static str,
    pub applies: fn(&RuleInput) -> bool,
    pub kind: EventKind,
}

impl Rule {
    pub fn matches(&self, input: &RuleInput) -> bool {
        (self.applies)(input)
    }
}

pub static RULES: &[Rule] = &[
    Rule {
        name: "section_birth",
        applies: |i| i.section == Some(FeedSection::Births),
        kind: EventKind::Birth,
    },
    Rule {
        name: "section_death",
        applies: |i| i.section == Some(FeedSection::Deaths),
        kind: EventKind::Death,
    },
    // Birth entries mention the later death year.
    Rule {
        name: "died_year_paren",
        applies: |i| RE_DIED_PAREN.is_match(&i.lower),
        kind: EventKind::Birth,
    },
    // Death entries mention the birth year.
    Rule {
        name: "born_year",
        applies: |i| RE_BORN_YEAR.is_match(&i.lower),
        kind: EventKind::Death,
    },
    Rule {
        name: "born_and_died",
        applies: |i| i.lower.contains("born") && i.lower.contains("died"),
        kind: EventKind::Death,
    },
    Rule {
        name: "name_with_profession",
        applies: |i| {
            RE_NAME_PROFESSION
                .captures(&i.lower)
                .and_then(|c| c.get(2))
                .is_some_and(|p| RE_PROFESSION_WORD.is_match(p.as_str()))
        },
        kind: EventKind::Birth,
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub kind: EventKind,
    /// Name of the rule that decided; `"default"` when none matched.
    pub rule: &'static str,
    pub name: String,
    pub description: String,
    pub person: Option<String>,
    pub profession: Option<String>,
    pub birth_year: Option<i32>,
    pub date: Option<String>,
}

/// First matching rule wins; no match means a generic event.
pub fn classify_kind(input: &RuleInput) -> (EventKind, &'static str) {
    RULES
        .iter()
        .find(|r| r.matches(input))
        .map(|r| (r.kind, r.name))
        .unwrap_or((EventKind::Event, "default"))
}

pub fn classify(raw_text: &str, section: Option<FeedSection>) -> Classification {
    let text = text::normalize_text(raw_text);
    let input = RuleInput::new(&text, section);
    let (kind, rule) = classify_kind(&input);
    let date = text::extract_month_day(&text);

    match kind {
        EventKind::Birth | EventKind::Death => {
            let person = extract_person_name(&text);
            let name = match kind {
                EventKind::Birth => format!("{person} is born"),
                _ => format!("{person} dies"),
            };
            Classification {
                kind,
                rule,
                name: text::truncate_chars(&name, MAX_NAME_CHARS),
                description: clean_description(&text),
                person: Some(person),
                profession: extract_profession(&text),
                birth_year: extract_birth_year(&text),
                date,
            }
        }
        EventKind::Event => {
            let (name, description) = split_headline(&text);
            Classification {
                kind,
                rule,
                name,
                description: clean_description(&description),
                person: None,
                profession: None,
                birth_year: None,
                date,
            }
        }
    }
}

/// Headline + body for generic events.
fn split_headline(text: &str) -> (String, String) {
    let first = text::first_sentence(text);
    if !first.is_empty() && first.chars().count() < MAX_NAME_CHARS {
        let rest = text
            .get(first.len()..)
            .unwrap_or_default()
            .trim_start_matches('.')
            .trim();
        let body = if rest.chars().count() > 20 { rest } else { text };
        return (first.to_string(), body.to_string());
    }
    let words: Vec<&str> = text.split_whitespace().take(8).collect();
    let short = words.join(" ");
    let name = if !short.is_empty() && short.chars().count() < 60 {
        format!("{short}...")
    } else {
        "Historical Event".to_string()
    };
    (name, text.to_string())
}

fn clean_description(text: &str) -> String {
    text::truncate_at_sentence(&text::strip_wiki_markup(text), MAX_TEXT_CHARS)
}

pub fn extract_person_name(text: &str) -> String {
    RE_PERSON
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Person".to_string())
}

pub fn extract_profession(text: &str) -> Option<String> {
    RE_PROFESSION
        .captures(text)
        .or_else(|| RE_PROFESSION_BEFORE_BORN.captures(text))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn extract_birth_year(text: &str) -> Option<i32> {
    let caps = RE_BORN_YEAR.captures(text)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .and_then(|m| m.as_str().parse().ok())
}

const NOTABLE_KEYWORDS: &[&str] = &[
    "president",
    "prime minister",
    "king",
    "queen",
    "emperor",
    "nobel",
    "academy award",
    "oscar",
    "grammy",
    "pulitzer",
    "famous",
    "renowned",
    "legendary",
    "influential",
    "bestselling",
    "world champion",
    "olympic",
    "founder",
    "inventor",
    "pioneer",
    "revolutionary",
    "international",
    "world-famous",
    "acclaimed",
];

/// Births/deaths are kept only for people with a notable description or a
/// linked page.
pub fn is_notable_person(text: &str, has_pages: bool) -> bool {
    if text.trim().is_empty() {
        return false;
    }
    let lower = text.to_lowercase();
    has_pages || NOTABLE_KEYWORDS.iter().any(|k| lower.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str) -> &'static Rule {
        RULES.iter().find(|r| r.name == name).unwrap()
    }

    #[test]
    fn section_tags_win() {
        let i = RuleInput::new("Moon landing happens", Some(FeedSection::Births));
        assert!(rule("section_birth").matches(&i));
        assert_eq!(classify_kind(&i).0, EventKind::Birth);

        let i = RuleInput::new("Someone (died 1990)", Some(FeedSection::Deaths));
        assert_eq!(classify_kind(&i), (EventKind::Death, "section_death"));
    }

    #[test]
    fn died_paren_marks_birth() {
        let i = RuleInput::new("Jane Doe, English writer (died 1990)", None);
        assert!(rule("died_year_paren").matches(&i));
        assert_eq!(classify_kind(&i), (EventKind::Birth, "died_year_paren"));
    }

    #[test]
    fn born_year_marks_death() {
        let i = RuleInput::new("John Roe, American painter (born 1901)", None);
        assert_eq!(classify_kind(&i), (EventKind::Death, "born_year"));
        let i = RuleInput::new("John Roe, painter born 1901", None);
        assert_eq!(classify_kind(&i), (EventKind::Death, "born_year"));
    }

    #[test]
    fn born_and_died_tokens_mark_death() {
        let i = RuleInput::new("He was born poor and died rich", None);
        assert!(rule("born_and_died").matches(&i));
        assert_eq!(classify_kind(&i).0, EventKind::Death);
    }

    #[test]
    fn profession_pattern_marks_birth() {
        let i = RuleInput::new("Pelé, Brazilian footballer", None);
        assert_eq!(classify_kind(&i), (EventKind::Birth, "name_with_profession"));
        let i = RuleInput::new("Paris, capital of France", None);
        assert_eq!(classify_kind(&i), (EventKind::Event, "default"));
    }

    #[test]
    fn classify_death_extracts_fields() {
        let c = classify("John Roe, American painter (born 1901)", None);
        assert_eq!(c.kind, EventKind::Death);
        assert_eq!(c.name, "John Roe dies");
        assert_eq!(c.person.as_deref(), Some("John Roe"));
        assert_eq!(c.profession.as_deref(), Some("American painter"));
        assert_eq!(c.birth_year, Some(1901));
        assert_eq!(c.description, "John Roe, American painter");
    }

    #[test]
    fn classify_event_splits_headline() {
        let c = classify(
            "Apollo 11 lands on the Moon. Neil Armstrong and Buzz Aldrin walk on the lunar surface on July 20.",
            Some(FeedSection::Events),
        );
        assert_eq!(c.kind, EventKind::Event);
        assert_eq!(c.name, "Apollo 11 lands on the Moon");
        assert!(c.description.starts_with("Neil Armstrong"));
        assert_eq!(c.date.as_deref(), Some("July 20"));
    }

    #[test]
    fn short_remainder_keeps_full_text() {
        let c = classify("The treaty is signed. Done.", None);
        assert_eq!(c.name, "The treaty is signed");
        assert_eq!(c.description, "The treaty is signed. Done.");
    }

    #[test]
    fn notable_filter() {
        assert!(is_notable_person("A renowned architect", false));
        assert!(is_notable_person("Someone", true));
        assert!(!is_notable_person("Someone ordinary", false));
        assert!(!is_notable_person("  ", true));
    }
}
