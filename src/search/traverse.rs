//! Depth-bounded walk over a secret's JSON value collecting key and value hits.
//!
//! Keys of the root object sit at depth 0; each nested object or array adds
//! one. Anything nested deeper than `max_depth` is skipped silently.

use serde_json::Value;

use super::matcher::Matcher;
use super::types::{MatchEntry, MatchKind};

/// Default cap on the characters kept from a matched value.
pub const DEFAULT_MAX_VALUE_CHARS: usize = 256;

/// Matches collected from one secret, in traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraversalMatches {
    pub key_matches: Vec<MatchEntry>,
    pub value_matches: Vec<MatchEntry>,
}

impl TraversalMatches {
    pub fn is_empty(&self) -> bool {
        self.key_matches.is_empty() && self.value_matches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.key_matches.len() + self.value_matches.len()
    }
}

/// Collect key and value matches inside `value`, down to `max_depth`.
pub fn collect_matches(value: &Value, matcher: &Matcher, max_depth: usize) -> TraversalMatches {
    collect_matches_truncated(value, matcher, max_depth, DEFAULT_MAX_VALUE_CHARS)
}

/// [`collect_matches`] with an explicit display limit for matched values.
pub fn collect_matches_truncated(
    value: &Value,
    matcher: &Matcher,
    max_depth: usize,
    max_value_chars: usize,
) -> TraversalMatches {
    let walker = Walker { matcher, max_depth, max_value_chars };
    let mut out = TraversalMatches::default();

    if is_terminal(value) {
        walker.match_terminal(value, String::new(), &mut out);
    } else {
        walker.walk(value, "", 0, &mut out);
    }
    out
}

struct Walker<'a> {
    matcher: &'a Matcher,
    max_depth: usize,
    max_value_chars: usize,
}

impl Walker<'_> {
    fn walk(&self, node: &Value, path: &str, depth: usize, out: &mut TraversalMatches) {
        if depth > self.max_depth {
            return;
        }

        match node {
            Value::Object(map) => {
                for (key, child) in map {
                    let child_path =
                        if path.is_empty() { key.clone() } else { format!("{}.{}", path, key) };
                    if self.matcher.is_match(Some(key)) {
                        out.key_matches.push(self.entry(&child_path, child, MatchKind::KeyMatch));
                    }
                    self.visit(child, child_path, depth, out);
                }
            }
            Value::Array(items) => {
                for (index, child) in items.iter().enumerate() {
                    self.visit(child, format!("{}[{}]", path, index), depth, out);
                }
            }
            _ => {}
        }
    }

    fn visit(&self, child: &Value, child_path: String, depth: usize, out: &mut TraversalMatches) {
        if is_terminal(child) {
            self.match_terminal(child, child_path, out);
        } else {
            self.walk(child, &child_path, depth + 1, out);
        }
    }

    fn match_terminal(&self, value: &Value, path: String, out: &mut TraversalMatches) {
        let text = terminal_text(value);
        if self.matcher.is_match(Some(&text)) {
            out.value_matches.push(MatchEntry {
                field_path: path,
                value: truncate_chars(&text, self.max_value_chars),
                kind: MatchKind::ValueMatch,
            });
        }
    }

    fn entry(&self, path: &str, value: &Value, kind: MatchKind) -> MatchEntry {
        let text = if is_terminal(value) { terminal_text(value) } else { value.to_string() };
        MatchEntry {
            field_path: path.to_string(),
            value: truncate_chars(&text, self.max_value_chars),
            kind,
        }
    }
}

fn is_terminal(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

/// String form used for matching: strings as-is, everything else as JSON.
fn terminal_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}
