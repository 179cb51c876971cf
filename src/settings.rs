use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::card::{CardTheme, FontRole, FontSources, Rgb};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub card_scale: u32,
    pub card_width: Option<u32>,
    pub card_height: Option<u32>,
    pub call_to_action: Option<String>,
    pub footer_label: Option<String>,
    pub logo_path: Option<String>,
    pub definition_wrap_chars: Option<usize>,
    pub colors: HashMap<String, String>,
    pub font_dir: Option<String>,
    pub fonts: HashMap<String, String>,
    pub source_url: String,
    pub source_timeout_secs: u64,
    pub enrichment_base_url: String,
    pub enrichment_model: String,
    pub enrichment_temperature: f32,
    pub enrichment_timeout_secs: u64,
    pub enrichment_api_key_env: String,
    pub server_host: String,
    pub server_port: u16,
    pub bot_interval_secs: u64,
    pub bot_run_on_start: bool,
    pub bot_subreddit: String,
    pub bot_user_agent: String,
    pub bot_client_id_env: String,
    pub bot_client_secret_env: String,
    pub bot_username_env: String,
    pub bot_password_env: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            card_scale: 1,
            card_width: None,
            card_height: None,
            call_to_action: None,
            footer_label: None,
            logo_path: None,
            definition_wrap_chars: None,
            colors: HashMap::new(),
            font_dir: None,
            fonts: HashMap::new(),
            source_url: "https://vocabdaily.vercel.app/get".to_string(),
            source_timeout_secs: 5,
            enrichment_base_url: "https://api.groq.com/openai/v1".to_string(),
            enrichment_model: "llama-3.1-8b-instant".to_string(),
            enrichment_temperature: 0.3,
            enrichment_timeout_secs: 10,
            enrichment_api_key_env: "GROQ_API_KEY".to_string(),
            server_host: "0.0.0.0".to_string(),
            server_port: 8080,
            bot_interval_secs: 3600,
            bot_run_on_start: false,
            bot_subreddit: "Vocabdaily".to_string(),
            bot_user_agent: "vocab-card-rust/0.1".to_string(),
            bot_client_id_env: "REDDIT_CLIENT_ID".to_string(),
            bot_client_secret_env: "REDDIT_CLIENT_SECRET".to_string(),
            bot_username_env: "REDDIT_USERNAME".to_string(),
            bot_password_env: "REDDIT_PASSWORD".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    card: Option<CardSettings>,
    colors: Option<HashMap<String, String>>,
    fonts: Option<FontSettings>,
    source: Option<SourceSettings>,
    enrichment: Option<EnrichmentSettings>,
    server: Option<ServerSettings>,
    bot: Option<BotSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct CardSettings {
    scale: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    call_to_action: Option<String>,
    footer_label: Option<String>,
    logo: Option<String>,
    definition_wrap_chars: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct FontSettings {
    dir: Option<String>,
    #[serde(flatten)]
    roles: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct SourceSettings {
    url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct EnrichmentSettings {
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    timeout_secs: Option<u64>,
    api_key_env: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct BotSettings {
    interval_secs: Option<u64>,
    run_on_start: Option<bool>,
    subreddit: Option<String>,
    user_agent: Option<String>,
    client_id_env: Option<String>,
    client_secret_env: Option<String>,
    username_env: Option<String>,
    password_env: Option<String>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    ensure_home_settings_file()?;

    let embedded: SettingsFile =
        toml::from_str(DEFAULT_SETTINGS_TOML).with_context(|| "failed to parse default settings")?;
    settings.merge(embedded);

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            settings
                .merge_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
        }
    }

    Ok(settings)
}

impl Settings {
    pub(crate) fn merge_str(&mut self, content: &str) -> Result<()> {
        let parsed: SettingsFile = toml::from_str(content)?;
        self.merge(parsed);
        Ok(())
    }

    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(card) = incoming.card {
            if let Some(scale) = card.scale {
                if scale > 0 {
                    self.card_scale = scale;
                }
            }
            if let Some(width) = card.width.filter(|value| *value > 0) {
                self.card_width = Some(width);
            }
            if let Some(height) = card.height.filter(|value| *value > 0) {
                self.card_height = Some(height);
            }
            merge_text(&mut self.call_to_action, card.call_to_action);
            merge_text(&mut self.footer_label, card.footer_label);
            merge_text(&mut self.logo_path, card.logo);
            if let Some(chars) = card.definition_wrap_chars.filter(|value| *value > 0) {
                self.definition_wrap_chars = Some(chars);
            }
        }
        if let Some(colors) = incoming.colors {
            for (key, value) in colors {
                if !value.trim().is_empty() {
                    self.colors.insert(key, value);
                }
            }
        }
        if let Some(fonts) = incoming.fonts {
            merge_text(&mut self.font_dir, fonts.dir);
            for (key, value) in fonts.roles {
                if !value.trim().is_empty() {
                    self.fonts.insert(key, value);
                }
            }
        }
        if let Some(source) = incoming.source {
            merge_required(&mut self.source_url, source.url);
            if let Some(timeout) = source.timeout_secs.filter(|value| *value > 0) {
                self.source_timeout_secs = timeout;
            }
        }
        if let Some(enrichment) = incoming.enrichment {
            merge_required(&mut self.enrichment_base_url, enrichment.base_url);
            merge_required(&mut self.enrichment_model, enrichment.model);
            if let Some(temperature) = enrichment.temperature {
                if (0.0..=2.0).contains(&temperature) {
                    self.enrichment_temperature = temperature;
                }
            }
            if let Some(timeout) = enrichment.timeout_secs.filter(|value| *value > 0) {
                self.enrichment_timeout_secs = timeout;
            }
            merge_required(&mut self.enrichment_api_key_env, enrichment.api_key_env);
        }
        if let Some(server) = incoming.server {
            merge_required(&mut self.server_host, server.host);
            if let Some(port) = server.port {
                self.server_port = port;
            }
        }
        if let Some(bot) = incoming.bot {
            if let Some(interval) = bot.interval_secs.filter(|value| *value > 0) {
                self.bot_interval_secs = interval;
            }
            if let Some(run_on_start) = bot.run_on_start {
                self.bot_run_on_start = run_on_start;
            }
            merge_required(&mut self.bot_subreddit, bot.subreddit);
            merge_required(&mut self.bot_user_agent, bot.user_agent);
            merge_required(&mut self.bot_client_id_env, bot.client_id_env);
            merge_required(&mut self.bot_client_secret_env, bot.client_secret_env);
            merge_required(&mut self.bot_username_env, bot.username_env);
            merge_required(&mut self.bot_password_env, bot.password_env);
        }
    }

    /// Card geometry, palette and texts after applying the `[card]` and
    /// `[colors]` sections on top of the scaled base design.
    pub fn card_theme(&self) -> Result<CardTheme> {
        let mut theme = CardTheme::scaled(self.card_scale);
        if let Some(width) = self.card_width {
            theme.width = width;
        }
        if let Some(height) = self.card_height {
            theme.height = height;
        }
        if let Some(chars) = self.definition_wrap_chars {
            theme.definition_wrap_chars = chars;
        }
        if let Some(text) = &self.call_to_action {
            theme.texts.call_to_action = text.clone();
        }
        if let Some(label) = &self.footer_label {
            theme.texts.footer_label = label.clone();
        }
        for (name, value) in &self.colors {
            let color = Rgb::parse(value).with_context(|| format!("colors.{}", name))?;
            let palette = &mut theme.colors;
            let slot = match name.as_str() {
                "background" => &mut palette.background,
                "primary" => &mut palette.primary,
                "text" => &mut palette.text,
                "muted" => &mut palette.muted,
                "accent" => &mut palette.accent,
                "divider" => &mut palette.divider,
                "box_fill" => &mut palette.box_fill,
                "emphasis" => &mut palette.emphasis,
                _ => {
                    warn!("unknown color '{}' in settings; ignored", name);
                    continue;
                }
            };
            *slot = color;
        }
        Ok(theme)
    }

    pub fn font_sources(&self) -> FontSources {
        let mut roles = HashMap::new();
        for (name, value) in &self.fonts {
            match FontRole::from_name(name) {
                Some(role) => {
                    roles.insert(role, value.clone());
                }
                None => warn!("unknown font role '{}' in settings; ignored", name),
            }
        }
        FontSources {
            dir: self.font_dir.as_ref().map(PathBuf::from),
            roles,
        }
    }

    pub fn logo(&self) -> Option<PathBuf> {
        self.logo_path.as_ref().map(PathBuf::from)
    }
}

fn merge_text(slot: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value {
        if !value.trim().is_empty() {
            *slot = Some(value);
        }
    }
}

fn merge_required(slot: &mut String, value: Option<String>) {
    if let Some(value) = value {
        let value = value.trim();
        if !value.is_empty() {
            *slot = value.to_string();
        }
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".vocab-card-rust"))
        }
    })
}
