//! Filler word detection

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

/// Filler lexicon; multi-word entries match consecutive tokens
pub const FILLER_WORDS: &[&str] = &[
    "um", "uh", "er", "ah", "like", "you know", "i mean", "sort of", "kind of", "actually",
    "basically", "literally", "right", "okay", "so", "well", "hmm",
];

static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));

/// Lowercase, strip punctuation, split on whitespace
pub fn tokenize(text: &str) -> Vec<String> {
    PUNCTUATION
        .replace_all(&text.to_lowercase(), "")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Filler occurrences found in a token sequence
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FillerCount {
    pub total: usize,
    pub breakdown: BTreeMap<String, usize>,
}

/// Count fillers, preferring two-word entries over their first token
pub fn count_fillers(tokens: &[String]) -> FillerCount {
    let mut result = FillerCount::default();
    let mut i = 0;

    while i < tokens.len() {
        if let Some(next) = tokens.get(i + 1) {
            let phrase = format!("{} {}", tokens[i], next);
            if FILLER_WORDS.contains(&phrase.as_str()) {
                *result.breakdown.entry(phrase).or_insert(0) += 1;
                result.total += 1;
                i += 2;
                continue;
            }
        }

        if FILLER_WORDS.contains(&tokens[i].as_str()) {
            *result.breakdown.entry(tokens[i].clone()).or_insert(0) += 1;
            result.total += 1;
        }
        i += 1;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_strips_punctuation() {
        let tokens = tokenize("Hello, WORLD... I'm here!");
        assert_eq!(tokens, vec!["hello", "world", "im", "here"]);
    }

    #[test]
    fn test_counts_single_and_phrase_fillers() {
        let tokens = tokenize("Um, you know, it was, like, kind of great. Uh huh.");
        let fillers = count_fillers(&tokens);
        assert_eq!(fillers.total, 5);
        assert_eq!(fillers.breakdown.get("you know"), Some(&1));
        assert_eq!(fillers.breakdown.get("kind of"), Some(&1));
        assert_eq!(fillers.breakdown.get("um"), Some(&1));
        assert_eq!(fillers.breakdown.get("like"), Some(&1));
        assert_eq!(fillers.breakdown.get("uh"), Some(&1));
    }

    #[test]
    fn test_no_fillers() {
        let fillers = count_fillers(&tokenize("Thank you all for coming today"));
        assert_eq!(fillers.total, 0);
        assert!(fillers.breakdown.is_empty());
    }

    #[test]
    fn test_case_insensitive() {
        let fillers = count_fillers(&tokenize("LIKE Like like"));
        assert_eq!(fillers.breakdown.get("like"), Some(&3));
    }
}
