//! Word-level emphasis for usage examples.
//!
//! Matching is deliberately loose: after stripping punctuation and
//! lower-casing, a word is emphasized when it contains the target term
//! anywhere, so "cat" also lights up "category".

use super::font::FontRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    Emphasis,
    Plain,
}

impl Emphasis {
    pub fn font_role(self) -> FontRole {
        match self {
            Emphasis::Emphasis => FontRole::BodyEmphasis,
            Emphasis::Plain => FontRole::Body,
        }
    }
}

pub fn classify(word: &str, term: &str) -> Emphasis {
    let term = normalize(term);
    if term.is_empty() {
        return Emphasis::Plain;
    }
    if normalize(word).contains(&term) {
        Emphasis::Emphasis
    } else {
        Emphasis::Plain
    }
}

fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|ch| ch.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
