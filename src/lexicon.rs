//! Keyword lexicon used to read teacher notes.
//!
//! Every phrase is matched as a whole word (or whole phrase), case-insensitively.
//! Word boundaries are ASCII: a non-ASCII letter next to a phrase ends the word.
//! Results follow declaration order, so a phrase listed under two categories is
//! reported once per category.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LexiconCategory {
    Academic,
    Behavioral,
    Attendance,
    Social,
    Health,
}

#[derive(Debug, Serialize)]
pub struct KeywordGroup {
    pub category: LexiconCategory,
    pub name: &'static str,
    pub keywords: &'static [&'static str],
}

const fn group(
    category: LexiconCategory,
    name: &'static str,
    keywords: &'static [&'static str],
) -> KeywordGroup {
    KeywordGroup {
        category,
        name,
        keywords,
    }
}

pub static KEYWORD_GROUPS: &[KeywordGroup] = &[
    group(
        LexiconCategory::Academic,
        "comprehension",
        &["understand", "comprehend", "struggle", "difficult", "hard time", "confused"],
    ),
    group(
        LexiconCategory::Academic,
        "writing",
        &["writing", "composition", "essay", "paragraph", "grammar", "spelling"],
    ),
    group(
        LexiconCategory::Academic,
        "math",
        &["math", "arithmetic", "calculation", "number", "algebra", "geometry"],
    ),
    group(
        LexiconCategory::Academic,
        "reading",
        &["reading", "read", "literacy", "decode", "fluency", "phonics"],
    ),
    group(
        LexiconCategory::Academic,
        "science",
        &["science", "experiment", "lab", "hypothesis", "observation"],
    ),
    group(
        LexiconCategory::Academic,
        "performance",
        &["low grade", "failing", "score", "grade", "performance", "achievement"],
    ),
    group(
        LexiconCategory::Behavioral,
        "disruptive",
        &["disrupt", "interrupt", "talk", "noise", "loud", "chaos", "attention seeking"],
    ),
    group(
        LexiconCategory::Behavioral,
        "aggressive",
        &["hit", "push", "fight", "aggressive", "violent", "assault", "threat"],
    ),
    group(
        LexiconCategory::Behavioral,
        "defiant",
        &["refuse", "defiant", "won't", "stubborn", "argumentative", "talk back"],
    ),
    group(
        LexiconCategory::Behavioral,
        "dishonest",
        &["lie", "cheat", "copy", "dishonest", "plagiarism", "fake"],
    ),
    group(
        LexiconCategory::Behavioral,
        "bullying",
        &["bully", "tease", "mock", "exclude", "laugh at", "mean", "harassment"],
    ),
    group(
        LexiconCategory::Attendance,
        "absent",
        &["absent", "missing", "cut class", "skip", "truant", "no-show"],
    ),
    group(
        LexiconCategory::Attendance,
        "late",
        &["late", "tardy", "arrive late", "delayed", "not on time"],
    ),
    group(
        LexiconCategory::Social,
        "shy",
        &["shy", "quiet", "withdrawn", "isolated", "social", "interaction", "participate"],
    ),
    group(
        LexiconCategory::Social,
        "sad",
        &["sad", "cry", "upset", "emotional", "depressed", "down"],
    ),
    group(
        LexiconCategory::Social,
        "anxious",
        &["anxiety", "anxious", "worry", "stress", "nervous", "panic"],
    ),
    group(
        LexiconCategory::Social,
        "conflict",
        &["conflict", "argue", "disagree", "dispute", "peer issue", "friend"],
    ),
    group(
        LexiconCategory::Health,
        "illness",
        &["sick", "ill", "cold", "fever", "unwell", "health", "medical"],
    ),
    group(
        LexiconCategory::Health,
        "fatigue",
        &["tired", "fatigue", "sleepy", "sleep", "exhausted", "energy"],
    ),
    group(
        LexiconCategory::Health,
        "physical",
        &["injury", "hurt", "pain", "physical", "accident", "hospital"],
    ),
];

struct KeywordMatcher {
    keyword: &'static str,
    pattern: Regex,
}

static MATCHERS: Lazy<Vec<KeywordMatcher>> = Lazy::new(|| {
    KEYWORD_GROUPS
        .iter()
        .flat_map(|group| group.keywords.iter().copied())
        .map(|keyword| KeywordMatcher {
            keyword,
            pattern: Regex::new(&format!(r"(?-u:\b){}(?-u:\b)", regex::escape(keyword)))
                .expect("lexicon phrases are valid patterns"),
        })
        .collect()
});

/// Scan free text for lexicon phrases.
///
/// Each phrase contributes at most one entry per group it belongs to, however
/// many times it occurs in the text.
pub fn extract_keywords(text: Option<&str>) -> Vec<&'static str> {
    let normalized = match text {
        Some(text) if !text.trim().is_empty() => text.trim().to_lowercase(),
        _ => return Vec::new(),
    };

    MATCHERS
        .iter()
        .filter(|matcher| matcher.pattern.is_match(&normalized))
        .map(|matcher| matcher.keyword)
        .collect()
}

/// Every phrase declared under `category`, in declaration order.
pub fn keywords_in(category: LexiconCategory) -> impl Iterator<Item = &'static str> {
    KEYWORD_GROUPS
        .iter()
        .filter(move |group| group.category == category)
        .flat_map(|group| group.keywords.iter().copied())
}

pub fn is_in_category(keyword: &str, category: LexiconCategory) -> bool {
    keywords_in(category).any(|candidate| candidate == keyword)
}

/// Keep only the matched keywords that belong to `category`.
pub fn filter_category(keywords: &[&'static str], category: LexiconCategory) -> Vec<&'static str> {
    keywords
        .iter()
        .copied()
        .filter(|keyword| is_in_category(keyword, category))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_whole_words_case_insensitively() {
        let found = extract_keywords(Some("The student is ABSENT again"));
        assert!(found.contains(&"absent"));

        let found = extract_keywords(Some("bsentia"));
        assert!(!found.contains(&"absent"));

        let found = extract_keywords(Some("she is absently staring"));
        assert!(!found.contains(&"absent"));
    }

    #[test]
    fn non_ascii_letters_end_a_word() {
        let found = extract_keywords(Some("Lateé and absentñ"));
        assert_eq!(found, vec!["absent", "late"]);
    }

    #[test]
    fn empty_or_missing_text_has_no_keywords() {
        assert!(extract_keywords(None).is_empty());
        assert!(extract_keywords(Some("")).is_empty());
        assert!(extract_keywords(Some("   ")).is_empty());
    }

    #[test]
    fn results_follow_lexicon_order_not_text_order() {
        let found = extract_keywords(Some("Often late and always confused"));
        assert_eq!(found, vec!["confused", "late"]);
    }

    #[test]
    fn repeated_phrase_is_reported_once() {
        let found = extract_keywords(Some("late, late and late again"));
        assert_eq!(found.iter().filter(|k| **k == "late").count(), 1);
    }

    #[test]
    fn multi_word_and_punctuated_phrases_match() {
        let found = extract_keywords(Some("He won't stop and had a hard time. Another no-show."));
        assert!(found.contains(&"won't"));
        assert!(found.contains(&"hard time"));
        assert!(found.contains(&"no-show"));
    }

    #[test]
    fn category_membership_lookups() {
        assert!(is_in_category("tardy", LexiconCategory::Attendance));
        assert!(!is_in_category("tardy", LexiconCategory::Academic));
        assert_eq!(keywords_in(LexiconCategory::Attendance).count(), 11);

        let filtered = filter_category(&["math", "fight", "sad"], LexiconCategory::Behavioral);
        assert_eq!(filtered, vec!["fight"]);
    }
}
