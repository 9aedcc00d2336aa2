//! Keyword reply normalizer.
//!
//! Turns whatever the model produced in keyword mode into a single
//! slash-separated, lower-case line with no repeated tokens. The canned
//! refusal sentence is passed through untouched.

use std::collections::HashSet;

/// Lower-cased marker of the refusal sentence the keyword persona is told to emit.
pub const REFUSAL_MARKER: &str = "пожалуйста отправьте";

/// Returned verbatim whenever the reply contains [`REFUSAL_MARKER`].
pub const REFUSAL_REPLY: &str = "Пожалуйста отправьте название категории, я подберу ключевые слова";

/// Prepositions tracked in their own seen-set.
pub const PREPOSITIONS: [&str; 6] = ["для", "под", "в", "на", "с", "к"];

const SEPARATOR: char = '/';

/// Canonicalize a keyword reply.
///
/// Every token, preposition or not, is kept only at its first occurrence.
/// Prepositions are tracked separately so the two classes stay auditable even
/// though they currently share one policy.
///
/// Output never contains `//` and never starts or ends with `/`, and
/// `format_keywords(&format_keywords(x)) == format_keywords(x)`.
pub fn format_keywords(text: &str) -> String {
    if text.to_lowercase().contains(REFUSAL_MARKER) {
        return REFUSAL_REPLY.to_string();
    }

    let slashed = text.trim().to_lowercase().replace(' ', "/");
    let collapsed = collapse_separators(&slashed);

    let mut seen: HashSet<&str> = HashSet::new();
    let mut seen_preps: HashSet<&str> = HashSet::new();
    let mut kept: Vec<&str> = Vec::new();

    // Tokens are compared without surrounding tabs or newlines.
    for token in collapsed.split(SEPARATOR).map(str::trim) {
        if token.is_empty() {
            continue;
        }
        let first = if is_preposition(token) {
            seen_preps.insert(token)
        } else {
            seen.insert(token)
        };
        if first {
            kept.push(token);
        }
    }

    // No empty tokens survive, so the join has no `//` and no edge `/`.
    kept.join("/")
}

pub fn is_preposition(token: &str) -> bool {
    PREPOSITIONS.contains(&token)
}

/// Replace every run of `/` with a single `/`.
fn collapse_separators(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_sep = false;
    for ch in text.chars() {
        let is_sep = ch == SEPARATOR;
        if !(is_sep && prev_sep) {
            out.push(ch);
        }
        prev_sep = is_sep;
    }
    out
}
