//! Text matching for paths, keys and values.
//!
//! [`matches`] is the per-call contract; [`Matcher`] is the same logic with
//! the pattern prepared once per search, which is what the workers use.

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};

use super::query::MatchMode;

/// Similarity a fuzzy match must reach unless configured otherwise.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.8;

/// Decide whether `text` matches `pattern`.
///
/// An empty pattern never matches, and a regex that fails to compile matches
/// nothing rather than erroring.
pub fn matches(text: Option<&str>, pattern: &str, mode: MatchMode, case_insensitive: bool) -> bool {
    Matcher::new(pattern, mode, case_insensitive).is_match(text)
}

/// Dice coefficient over the character bigram sets of `a` and `b`.
///
/// Returns 0.0 when neither string has a bigram.
pub fn similarity(a: &str, b: &str) -> f64 {
    let left = bigrams(a);
    let right = bigrams(b);
    let total = left.len() + right.len();
    if total == 0 {
        return 0.0;
    }
    let shared = left.intersection(&right).count();
    (2 * shared) as f64 / total as f64
}

fn bigrams(s: &str) -> HashSet<(char, char)> {
    let chars: Vec<char> = s.chars().collect();
    chars.windows(2).map(|pair| (pair[0], pair[1])).collect()
}

/// A pattern prepared for repeated matching.
#[derive(Debug, Clone)]
pub struct Matcher {
    pattern: String,
    mode: MatchMode,
    case_insensitive: bool,
    regex: Option<Regex>,
    fuzzy_threshold: f64,
}

impl Matcher {
    pub fn new(pattern: &str, mode: MatchMode, case_insensitive: bool) -> Self {
        let regex = match mode {
            MatchMode::Regex if !pattern.is_empty() => {
                RegexBuilder::new(pattern).case_insensitive(case_insensitive).build().ok()
            }
            _ => None,
        };
        let pattern = if case_insensitive { pattern.to_lowercase() } else { pattern.to_string() };

        Self { pattern, mode, case_insensitive, regex, fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD }
    }

    pub fn with_fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    /// `false` for a regex pattern that did not compile.
    pub fn is_usable(&self) -> bool {
        !self.pattern.is_empty() && (self.mode != MatchMode::Regex || self.regex.is_some())
    }

    pub fn is_match(&self, text: Option<&str>) -> bool {
        let Some(text) = text else {
            return false;
        };
        if self.pattern.is_empty() {
            return false;
        }

        if self.mode == MatchMode::Regex {
            return self.regex.as_ref().is_some_and(|re| re.is_match(text));
        }

        let lowered;
        let text = if self.case_insensitive {
            lowered = text.to_lowercase();
            lowered.as_str()
        } else {
            text
        };

        match self.mode {
            MatchMode::Exact => text == self.pattern,
            MatchMode::Contains => text.contains(self.pattern.as_str()),
            MatchMode::Fuzzy => similarity(text, &self.pattern) >= self.fuzzy_threshold,
            MatchMode::Regex => false,
        }
    }
}
