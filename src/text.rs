// src/text.rs
//! Text munging shared by strategies, the classifier and the media resolver:
//! HTML/wiki cleanup, sentence-aware truncation, date extraction, and the
//! title filters applied before anything is fetched.

use once_cell::sync::Lazy;
use regex::Regex;

pub const MAX_NAME_CHARS: usize = 120;
pub const MAX_TEXT_CHARS: usize = 300;

pub const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_WIKILINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[(?:[^\]|]*\|)?([^\]]+)\]\]").unwrap());
static RE_PARENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^)]*\)").unwrap());
static RE_MONTH_DAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(January|February|March|April|May|June|July|August|September|October|November|December)\s+(\d{1,2})\b").unwrap()
});
static RE_YEAR_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}\s*[-–—]\s*").unwrap());
static RE_DATE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2}\s*[-–—]\s*").unwrap()
});
static RE_YEAR_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{3,4})\b").unwrap());
static RE_KEY_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(war|treaty|battle|revolution|discovery|invention|founding|establishment)\b")
        .unwrap()
});

static INVALID_TITLES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^\d{4}[-–]\d{2,4}.*playoffs?$",
        r"(?i)^\d{4}[-–]\d{2,4}.*season$",
        r"(?i)^\d{4}[-–]\d{2,4}.*realignment$",
        r"(?i)^\d{4}[-–]\d{2,4}.*crisis$",
        r"^\d{4}[-–]\d{2,4}$",
        r"^[\d\s\-–]+$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static LOW_QUALITY_TERMS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^\d{4}[-–]\d{4}",
        r"(?i)playoffs?$",
        r"(?i)season$",
        r"(?i)\bnfl\b|\bnhl\b|\bnba\b",
        r"(?i)realignment",
        r"(?i)crisis$",
        r"^[\d\s\-–]+$",
        r"^\d{4}$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Decode entities, strip tags, normalize quotes and collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();
    out = RE_TAGS.replace_all(&out, "").to_string();
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    RE_WS.replace_all(&out, " ").trim().to_string()
}

/// `[[link|label]]` → `label`, drop parentheticals, collapse whitespace.
pub fn strip_wiki_markup(s: &str) -> String {
    let out = RE_WIKILINK.replace_all(s, "$1");
    let out = RE_PARENS.replace_all(&out, "");
    let out = RE_WS.replace_all(&out, " ");
    // Parenthetical removal leaves " ," and " ." behind.
    out.replace(" ,", ",").replace(" .", ".").trim().to_string()
}

/// Truncate to `max` chars, ending at a sentence boundary when the last
/// period lies past 70% of the limit, otherwise appending `...`.
pub fn truncate_at_sentence(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let head: String = s.chars().take(max).collect();
    if let Some(idx) = head.rfind('.') {
        let chars_before = head[..idx].chars().count();
        if chars_before as f32 > max as f32 * 0.7 {
            return head[..=idx].to_string();
        }
    }
    format!("{}...", head.trim_end())
}

/// Hard cut to `max` chars with a trailing ellipsis.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let head: String = s.chars().take(max).collect();
    format!("{}...", head.trim_end())
}

/// Text up to (not including) the first period.
pub fn first_sentence(s: &str) -> &str {
    s.split('.').next().unwrap_or(s).trim()
}

pub fn month_name(month: u32) -> Option<&'static str> {
    MONTHS.get((month as usize).checked_sub(1)?).copied()
}

pub fn format_month_day(month: u32, day: u32) -> Option<String> {
    month_name(month).map(|m| format!("{m} {day}"))
}

/// First "Month Day" mention in the text.
pub fn extract_month_day(s: &str) -> Option<String> {
    RE_MONTH_DAY.find(s).map(|m| m.as_str().to_string())
}

/// Every plausible year (3–4 digits) mentioned in the text.
pub fn years_mentioned(s: &str) -> Vec<i32> {
    RE_YEAR_TOKEN
        .captures_iter(s)
        .filter_map(|c| c.get(1)?.as_str().parse::<i32>().ok())
        .collect()
}

/// True when the text mentions `year` or a year within `spread` of it.
pub fn mentions_year_near(s: &str, year: i32, spread: i32) -> bool {
    years_mentioned(s)
        .into_iter()
        .any(|y| (y - year).abs() <= spread)
}

/// Headline for free-form descriptions: short first sentence, else a window
/// around a key phrase, else a generic label.
pub fn extract_event_name(description: &str) -> String {
    let first = first_sentence(description);
    if !first.is_empty() && first.chars().count() < 100 {
        return first.to_string();
    }
    if let Some(m) = RE_KEY_PHRASE.find(first) {
        let key = m.as_str().to_ascii_lowercase();
        let words: Vec<&str> = first.split_whitespace().collect();
        if let Some(i) = words
            .iter()
            .position(|w| w.to_ascii_lowercase().contains(&key))
        {
            if i > 0 {
                let lo = i.saturating_sub(3);
                let hi = (i + 4).min(words.len());
                return words[lo..hi].join(" ");
            }
        }
    }
    "Historical Event".to_string()
}

/// Clean an upstream page title before a summary/media fetch.
/// Returns `None` for titles that are not worth a request.
pub fn clean_page_title(title: &str) -> Option<String> {
    let t = title.trim();
    if t.is_empty() || INVALID_TITLES.iter().any(|re| re.is_match(t)) {
        return None;
    }
    let stripped = RE_YEAR_PREFIX.replace(t, "");
    let stripped = RE_DATE_PREFIX.replace(&stripped, "");
    let cleaned = RE_WS
        .replace_all(&stripped.replace('–', "-"), " ")
        .trim()
        .to_string();
    let cleaned = if cleaned.is_empty() {
        t.to_string()
    } else {
        cleaned
    };
    let n = cleaned.chars().count();
    if !(3..=100).contains(&n) {
        return None;
    }
    Some(cleaned)
}

pub fn is_low_quality_term(term: &str) -> bool {
    let t = term.trim();
    t.chars().count() < 3 || LOW_QUALITY_TERMS.iter().any(|re| re.is_match(t))
}

const ENTERTAINMENT_TERMS: &[&str] = &[
    "film", "movie", "television", "tv series", "sitcom", "album", "single", "video game",
    "rapper", "pop star", "reality show", "episode", "soundtrack", "box office",
];
const MODERN_TECH_TERMS: &[&str] = &[
    "computer", "internet", "smartphone", "television", "radio", "airplane", "aircraft",
    "automobile", "satellite", "nuclear", "software", "website", "telephone",
];
const EARLY_TECH_TERMS: &[&str] = &["railway", "locomotive", "steamship", "telegraph", "photograph"];

/// Rejects titles that cannot plausibly describe an event of `year`.
/// The error string is the rejection reason.
pub fn check_historical_plausibility(title: &str, year: i32) -> Result<(), String> {
    let lower = title.to_ascii_lowercase();
    if lower.contains("disambiguation") || lower.contains("may refer to") {
        return Err(format!("'{title}' is a disambiguation page"));
    }
    if lower.contains("list of") && lower.contains("episodes") {
        return Err(format!("'{title}' is an episode list"));
    }
    if year < 1900 {
        if let Some(t) = ENTERTAINMENT_TERMS.iter().find(|t| lower.contains(*t)) {
            return Err(format!("'{title}' mentions '{t}' before 1900"));
        }
        if let Some(t) = MODERN_TECH_TERMS.iter().find(|t| lower.contains(*t)) {
            return Err(format!("'{title}' mentions anachronistic '{t}'"));
        }
    }
    if year < 1800 {
        if let Some(t) = EARLY_TECH_TERMS.iter().find(|t| lower.contains(*t)) {
            return Err(format!("'{title}' mentions anachronistic '{t}'"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_tags_and_entities() {
        let s = "  <b>Apollo&nbsp;11</b>  lands \u{201C}safely\u{201D} ";
        assert_eq!(normalize_text(s), "Apollo 11 lands \"safely\"");
    }

    #[test]
    fn wiki_markup_and_parentheticals_removed() {
        let s = "[[Neil Armstrong|Armstrong]] (astronaut) walks on the [[Moon]] .";
        assert_eq!(strip_wiki_markup(s), "Armstrong walks on the Moon.");
    }

    #[test]
    fn truncate_prefers_late_sentence_boundary() {
        let s = format!("{}. {}", "a".repeat(250), "b".repeat(100));
        let out = truncate_at_sentence(&s, 300);
        assert!(out.ends_with('.'));
        assert_eq!(out.chars().count(), 251);
    }

    #[test]
    fn truncate_appends_ellipsis_when_boundary_too_early() {
        let s = format!("Short. {}", "x".repeat(400));
        let out = truncate_at_sentence(&s, 300);
        assert!(out.ends_with("..."));
        assert!(out.chars().count() <= 303);
    }

    #[test]
    fn month_day_extraction() {
        assert_eq!(
            extract_month_day("On July 20 the crew landed").as_deref(),
            Some("July 20")
        );
        assert_eq!(extract_month_day("no date here"), None);
        assert_eq!(format_month_day(12, 25).as_deref(), Some("December 25"));
        assert_eq!(format_month_day(13, 1), None);
    }

    #[test]
    fn year_mentions_respect_spread() {
        assert!(mentions_year_near("Events of 1968 and after", 1969, 1));
        assert!(!mentions_year_near("Events of 1950", 1969, 1));
    }

    #[test]
    fn event_name_from_long_description() {
        let d = format!(
            "In a long and winding prelude spanning {} the Treaty of Versailles was finally signed by the powers",
            "many words ".repeat(10)
        );
        let n = extract_event_name(&d);
        assert!(n.contains("Treaty"), "{n}");
        assert_eq!(extract_event_name("Moon landing. Later."), "Moon landing");
    }

    #[test]
    fn page_titles_cleaned_or_rejected() {
        assert_eq!(
            clean_page_title("1969 – Apollo 11").as_deref(),
            Some("Apollo 11")
        );
        assert_eq!(
            clean_page_title("July 20 - Moon landing").as_deref(),
            Some("Moon landing")
        );
        assert_eq!(clean_page_title("1994–95 NHL season"), None);
        assert_eq!(clean_page_title("1994-1996"), None);
        assert_eq!(clean_page_title("ab"), None);
    }

    #[test]
    fn low_quality_terms() {
        assert!(is_low_quality_term("1969"));
        assert!(is_low_quality_term("NBA playoffs"));
        assert!(!is_low_quality_term("Neil Armstrong"));
    }

    #[test]
    fn plausibility_filters_anachronisms() {
        assert!(check_historical_plausibility("Silent film industry", 1850).is_err());
        assert!(check_historical_plausibility("Transatlantic telegraph", 1750).is_err());
        assert!(check_historical_plausibility("Transatlantic telegraph", 1858).is_ok());
        assert!(check_historical_plausibility("Mercury (disambiguation)", 1950).is_err());
        assert!(check_historical_plausibility("Apollo 11", 1969).is_ok());
    }
}
