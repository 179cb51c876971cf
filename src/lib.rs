use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub mod bot;
pub mod card;
pub mod enrich;
pub mod logging;
pub mod pipeline;
pub mod providers;
pub mod record;
pub mod server;
pub mod settings;
pub mod source;
#[cfg(test)]
mod test_util;

pub use card::{CardResources, CardTheme, FontSet, render_card};
pub use enrich::Enricher;
pub use pipeline::{CardPipeline, GeneratedCard};
pub use providers::{OpenAICompatible, Provider, ProviderUsage};
pub use record::{Derivative, SourceWord, WordRecord};
pub use source::SourceClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Render one card to `output`, from a local record file or a fresh fetch.
    Render {
        input: Option<PathBuf>,
        output: PathBuf,
    },
    Server {
        addr: Option<String>,
    },
    Bot,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub key: Option<String>,
    pub settings_path: Option<String>,
}

pub async fn run(config: Config) -> Result<String> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;
    let resources = card_resources(&settings)?;

    match config.mode {
        Mode::Render {
            input: Some(input),
            output,
        } => {
            let record = read_record(&input)?;
            let png = pipeline::render_blocking(resources, record).await?;
            write_card(&output, &png)
        }
        Mode::Render {
            input: None,
            output,
        } => {
            let pipeline = build_pipeline(&settings, config.key, resources);
            let card = pipeline.generate().await?;
            write_card(&output, &card.png)
        }
        Mode::Server { addr } => {
            let addr = addr.unwrap_or_else(|| {
                format!("{}:{}", settings.server_host, settings.server_port)
            });
            let pipeline = build_pipeline(&settings, config.key, resources);
            server::run_server(pipeline, addr).await?;
            Ok(String::new())
        }
        Mode::Bot => {
            let pipeline = build_pipeline(&settings, config.key, resources);
            let publisher = bot::RedditPublisher::from_settings(&settings);
            let bot = bot::Bot::new(pipeline, publisher, bot::BotConfig::from_settings(&settings));
            bot.run().await?;
            Ok(String::new())
        }
    }
}

pub fn card_resources(settings: &settings::Settings) -> Result<CardResources> {
    Ok(CardResources {
        theme: settings.card_theme()?,
        fonts: settings.font_sources(),
        logo_path: settings.logo(),
    })
}

/// The explicit `--key` wins over the environment variable named in settings.
pub fn resolve_key(override_key: Option<String>, env_name: &str) -> Option<String> {
    override_key
        .filter(|key| !key.trim().is_empty())
        .or_else(|| {
            std::env::var(env_name)
                .ok()
                .filter(|value| !value.trim().is_empty())
        })
}

fn build_pipeline(
    settings: &settings::Settings,
    key: Option<String>,
    resources: CardResources,
) -> CardPipeline<OpenAICompatible> {
    let key = resolve_key(key, &settings.enrichment_api_key_env);
    if key.is_none() {
        info!(
            "no {} set; cards will use the source word without enrichment",
            settings.enrichment_api_key_env
        );
    }
    let source = SourceClient::new(settings.source_url.clone())
        .with_timeout(Duration::from_secs(settings.source_timeout_secs));
    let enricher = Enricher::from_settings(settings, key);
    CardPipeline::new(source, enricher, resources)
}

fn read_record(path: &Path) -> Result<WordRecord> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read record: {}", path.display()))?;
    let record: WordRecord = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse record: {}", path.display()))?;
    Ok(record.normalized())
}

fn write_card(output: &Path, png: &[u8]) -> Result<String> {
    if png.is_empty() {
        return Err(anyhow!("rendered card is empty"));
    }
    if let Some(parent) = output.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(output, png)
        .with_context(|| format!("failed to write card: {}", output.display()))?;
    Ok(output.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_key_wins_over_environment() {
        assert_eq!(
            resolve_key(Some("cli".to_string()), "VOCAB_CARD_TEST_UNSET_KEY"),
            Some("cli".to_string())
        );
        assert_eq!(resolve_key(Some(" ".to_string()), "VOCAB_CARD_TEST_UNSET_KEY"), None);
        assert_eq!(resolve_key(None, "VOCAB_CARD_TEST_UNSET_KEY"), None);
    }

    #[test]
    fn record_file_is_normalized() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("record.json");
        std::fs::write(&path, r#"{"term":"  resilient ","pos":"","synonyms":"tough, hardy"}"#)
            .expect("write");
        let record = read_record(&path).expect("record");
        assert_eq!(record.term, "resilient");
        assert_eq!(record.part_of_speech, "noun");
        assert_eq!(record.synonyms, vec!["tough", "hardy"]);
    }

    #[test]
    fn write_card_creates_parent_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = dir.path().join("out/cards/card.png");
        write_card(&output, b"png").expect("write");
        assert_eq!(std::fs::read(&output).expect("read"), b"png");
    }
}
