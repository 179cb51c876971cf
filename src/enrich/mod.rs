use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use std::time::Duration;
use tera::{Context as TeraContext, Tera};
use tracing::{debug, warn};

use crate::providers::{OpenAICompatible, Provider};
use crate::record::{PLACEHOLDER_TERM, SourceWord, WordRecord};
use crate::settings::Settings;

const PROMPT_TEMPLATE: &str = include_str!("prompts/enrich_prompt.tera");
const SYSTEM_PROMPT: &str = "You are a concise lexicographer. You answer with a single JSON object.";
pub const SYNONYM_COUNT: usize = 4;
pub const EXAMPLE_COUNT: usize = 2;

pub fn render_prompt(source: &SourceWord) -> Result<String> {
    let mut context = TeraContext::new();
    context.insert("term", source.term.trim());
    context.insert("meaning", source.meaning.trim());
    context.insert("synonym_count", &SYNONYM_COUNT);
    context.insert("example_count", &EXAMPLE_COUNT);
    Tera::one_off(PROMPT_TEMPLATE, &context, false)
        .with_context(|| "failed to render enrichment prompt")
}

/// Turns a source word into a full card record through a chat model. Any
/// failure degrades to a record built from the source word alone.
#[derive(Debug, Clone)]
pub struct Enricher<P: Provider> {
    provider: Option<P>,
}

impl Enricher<OpenAICompatible> {
    /// `key` is the already-resolved API key; without one every call degrades.
    pub fn from_settings(settings: &Settings, key: Option<String>) -> Self {
        let provider = key
            .filter(|key| !key.trim().is_empty())
            .map(|key| {
                OpenAICompatible::new(key)
                    .with_base_url(settings.enrichment_base_url.clone())
                    .with_model(settings.enrichment_model.clone())
                    .with_temperature(settings.enrichment_temperature)
                    .with_timeout(Duration::from_secs(settings.enrichment_timeout_secs))
            });
        Self { provider }
    }
}

impl<P: Provider> Enricher<P> {
    pub fn new(provider: Option<P>) -> Self {
        Self { provider }
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub async fn enrich(&self, source: &SourceWord) -> WordRecord {
        let Some(provider) = self.provider.clone() else {
            warn!(
                "no enrichment API key; rendering '{}' from the source word",
                source.term
            );
            return WordRecord::degraded(source);
        };
        match request_record(provider, source).await {
            Ok(record) => record,
            Err(err) => {
                warn!("enrichment of '{}' failed: {:#}", source.term, err);
                WordRecord::degraded(source)
            }
        }
    }
}

async fn request_record<P: Provider>(provider: P, source: &SourceWord) -> Result<WordRecord> {
    let prompt = render_prompt(source)?;
    let response = provider
        .append_system_input(SYSTEM_PROMPT.to_string())
        .append_user_input(prompt)
        .complete()
        .await?;
    debug!(
        "enrichment answered by {}",
        response.model.as_deref().unwrap_or("unknown model")
    );
    parse_enrichment(&response.content, source)
}

/// Parses the model's reply. Blank fields are filled from the source word.
pub fn parse_enrichment(content: &str, source: &SourceWord) -> Result<WordRecord> {
    let cleaned = strip_code_fences(content);
    let value: Value = serde_json::from_str(&cleaned)
        .with_context(|| "enrichment reply is not valid JSON")?;
    if !value.is_object() {
        return Err(anyhow!("enrichment reply is not a JSON object"));
    }
    let mut record = serde_json::from_value::<WordRecord>(value)
        .with_context(|| "enrichment reply has an unexpected shape")?
        .normalized();

    if record.term == PLACEHOLDER_TERM && !source.term.trim().is_empty() {
        record.term = source.term.trim().to_string();
    }
    if record.meaning.is_empty() {
        let fallback = WordRecord::degraded(source);
        record.meaning = fallback.meaning;
    }
    if record.synonyms.is_empty() {
        record.synonyms = source.synonyms.clone();
    }
    if record.examples.is_empty() {
        record.examples = source.example.clone();
    }
    Ok(record.normalized())
}

fn strip_code_fences(content: &str) -> String {
    content
        .replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
        .trim()
        .to_string()
}
