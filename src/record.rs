use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const PLACEHOLDER_TERM: &str = "Error";
pub const PLACEHOLDER_POS: &str = "noun";
pub const DEGRADED_POS: &str = "word";
pub const DEGRADED_MEANING: &str = "Definition unavailable.";

/// One lexical entry driving a single card render.
///
/// Every field has a defined default so the layout code only ever branches on
/// empty strings or empty lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WordRecord {
    pub term: String,
    #[serde(alias = "pos")]
    pub part_of_speech: String,
    pub meaning: String,
    #[serde(deserialize_with = "derivatives_from_value")]
    pub derivatives: Vec<Derivative>,
    #[serde(deserialize_with = "terms_from_value")]
    pub synonyms: Vec<String>,
    #[serde(deserialize_with = "strings_from_value")]
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Derivative {
    pub word: String,
    #[serde(alias = "pos")]
    pub part_of_speech: String,
}

impl Default for WordRecord {
    fn default() -> Self {
        Self {
            term: PLACEHOLDER_TERM.to_string(),
            part_of_speech: PLACEHOLDER_POS.to_string(),
            meaning: String::new(),
            derivatives: Vec::new(),
            synonyms: Vec::new(),
            examples: Vec::new(),
        }
    }
}

impl Default for Derivative {
    fn default() -> Self {
        Self {
            word: String::new(),
            part_of_speech: PLACEHOLDER_POS.to_string(),
        }
    }
}

/// Raw word as returned by the word-source endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SourceWord {
    pub term: String,
    pub meaning: String,
    #[serde(deserialize_with = "strings_from_value")]
    pub example: Vec<String>,
    #[serde(deserialize_with = "terms_from_value")]
    pub synonyms: Vec<String>,
}

impl WordRecord {
    /// Trims every field, collapses inner whitespace, drops empty list entries
    /// and restores placeholders for blank scalar fields.
    pub fn normalized(self) -> Self {
        let term = collapse_whitespace(&self.term);
        let part_of_speech = collapse_whitespace(&self.part_of_speech);
        Self {
            term: if term.is_empty() {
                PLACEHOLDER_TERM.to_string()
            } else {
                term
            },
            part_of_speech: if part_of_speech.is_empty() {
                PLACEHOLDER_POS.to_string()
            } else {
                part_of_speech
            },
            meaning: collapse_whitespace(&self.meaning),
            derivatives: self
                .derivatives
                .into_iter()
                .filter_map(|derivative| {
                    let word = collapse_whitespace(&derivative.word);
                    if word.is_empty() {
                        return None;
                    }
                    let pos = collapse_whitespace(&derivative.part_of_speech);
                    Some(Derivative {
                        word,
                        part_of_speech: if pos.is_empty() {
                            PLACEHOLDER_POS.to_string()
                        } else {
                            pos
                        },
                    })
                })
                .collect(),
            synonyms: clean_list(self.synonyms),
            examples: clean_list(self.examples),
        }
    }

    /// Builds a card-ready record straight from the source word, used whenever
    /// enrichment is unavailable.
    pub fn degraded(source: &SourceWord) -> Self {
        let meaning = collapse_whitespace(&source.meaning);
        Self {
            term: source.term.clone(),
            part_of_speech: DEGRADED_POS.to_string(),
            meaning: if meaning.is_empty() {
                DEGRADED_MEANING.to_string()
            } else {
                meaning
            },
            derivatives: Vec::new(),
            synonyms: source.synonyms.clone(),
            examples: source.example.clone(),
        }
        .normalized()
    }

    /// Headword as printed on the card: first letter upper-cased, rest lower.
    pub fn display_term(&self) -> String {
        let lower = self.term.to_lowercase();
        let mut chars = lower.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

pub(crate) fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    values
        .iter()
        .map(|value| collapse_whitespace(value))
        .filter(|value| !value.is_empty())
        .collect()
}

/// Accepts a list of strings, a single string, or null.
fn strings_from_value<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(text),
                Value::Number(number) => Some(number.to_string()),
                _ => None,
            })
            .collect(),
        Value::String(text) => vec![text],
        _ => Vec::new(),
    })
}

/// Like `strings_from_value`, but a single string is split on commas.
fn terms_from_value<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let terms = strings_from_value(deserializer)?;
    if terms.len() != 1 {
        return Ok(terms);
    }
    Ok(terms[0]
        .split(',')
        .map(|part| part.trim().to_string())
        .collect())
}

/// Accepts `[{word, pos}]`, plain strings, or null.
fn derivatives_from_value<'de, D>(deserializer: D) -> Result<Vec<Derivative>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(word) => Some(Derivative {
                word,
                ..Derivative::default()
            }),
            Value::Object(_) => serde_json::from_value::<Derivative>(item).ok(),
            _ => None,
        })
        .collect())
}
