use anyhow::{Context, Result, anyhow};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{ImagePost, PublishFuture, SocialPublisher};
use crate::settings::Settings;

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_BASE_URL: &str = "https://oauth.reddit.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

impl RedditCredentials {
    /// Reads the four variables named in `[bot]`. Any missing one yields `None`.
    pub fn from_env(settings: &Settings) -> Option<Self> {
        Some(Self {
            client_id: get_env(&settings.bot_client_id_env)?,
            client_secret: get_env(&settings.bot_client_secret_env)?,
            username: get_env(&settings.bot_username_env)?,
            password: get_env(&settings.bot_password_env)?,
        })
    }
}

/// Image posts through Reddit's script-app OAuth flow: password grant, media
/// lease, direct upload, then submit.
#[derive(Debug, Clone)]
pub struct RedditPublisher {
    credentials: RedditCredentials,
    subreddit: String,
    user_agent: String,
}

impl RedditPublisher {
    pub fn new(
        credentials: RedditCredentials,
        subreddit: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            subreddit: subreddit.into().trim_start_matches("r/").to_string(),
            user_agent: user_agent.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Option<Self> {
        let credentials = RedditCredentials::from_env(settings)?;
        Some(Self::new(
            credentials,
            settings.bot_subreddit.clone(),
            settings.bot_user_agent.clone(),
        ))
    }

    fn client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .timeout(REQUEST_TIMEOUT)
            .build()
            .with_context(|| "failed to build HTTP client")
    }

    async fn access_token(&self, client: &reqwest::Client) -> Result<String> {
        let response = client
            .post(TOKEN_URL)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", self.credentials.username.as_str()),
                ("password", self.credentials.password.as_str()),
            ])
            .send()
            .await
            .with_context(|| "reddit token request failed")?;
        let text = checked_text(response, "token").await?;
        parse_token(&text)
    }

    async fn submit(&self, client: &reqwest::Client, token: &str, post: &ImagePost) -> Result<()> {
        let file_name = post
            .image_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("card.png")
            .to_string();
        let bytes = std::fs::read(&post.image_path)
            .with_context(|| format!("failed to read card: {}", post.image_path.display()))?;

        let lease_response = client
            .post(format!("{}/api/media/asset.json", API_BASE_URL))
            .bearer_auth(token)
            .form(&[("filepath", file_name.as_str()), ("mimetype", "image/png")])
            .send()
            .await
            .with_context(|| "reddit media lease request failed")?;
        let lease = parse_lease(&checked_text(lease_response, "media lease").await?)?;
        debug!("media lease granted: {}", lease.upload_url);

        let mut form = Form::new();
        for (name, value) in &lease.fields {
            form = form.text(name.clone(), value.clone());
        }
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("image/png")
            .with_context(|| "invalid upload mime type")?;
        form = form.part("file", part);
        let upload = client
            .post(&lease.upload_url)
            .multipart(form)
            .send()
            .await
            .with_context(|| "reddit media upload failed")?;
        if !upload.status().is_success() {
            return Err(anyhow!("reddit media upload returned {}", upload.status()));
        }

        let submit_response = client
            .post(format!("{}/api/submit", API_BASE_URL))
            .bearer_auth(token)
            .form(&[
                ("sr", self.subreddit.as_str()),
                ("kind", "image"),
                ("title", post.title.as_str()),
                ("url", lease.asset_url.as_str()),
                ("resubmit", "true"),
                ("api_type", "json"),
            ])
            .send()
            .await
            .with_context(|| "reddit submit request failed")?;
        parse_submit(&checked_text(submit_response, "submit").await?)
    }
}

impl SocialPublisher for RedditPublisher {
    fn destination(&self) -> String {
        format!("r/{}", self.subreddit)
    }

    fn publish<'a>(&'a self, post: &'a ImagePost) -> PublishFuture<'a> {
        Box::pin(async move {
            let client = self.client()?;
            let token = self.access_token(&client).await?;
            self.submit(&client, &token, post).await
        })
    }
}

async fn checked_text(response: reqwest::Response, step: &str) -> Result<String> {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(anyhow!("reddit {} error ({}): {}", step, status, text.trim()));
    }
    Ok(text)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MediaLease {
    upload_url: String,
    fields: Vec<(String, String)>,
    asset_url: String,
}

fn parse_token(text: &str) -> Result<String> {
    #[derive(Deserialize)]
    struct TokenBody {
        access_token: Option<String>,
        error: Option<String>,
    }

    let body: TokenBody =
        serde_json::from_str(text).with_context(|| "failed to parse reddit token response")?;
    if let Some(error) = body.error {
        return Err(anyhow!("reddit token error: {}", error));
    }
    body.access_token
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| anyhow!("reddit token response has no access_token"))
}

fn parse_lease(text: &str) -> Result<MediaLease> {
    #[derive(Deserialize)]
    struct LeaseBody {
        args: LeaseArgs,
    }

    #[derive(Deserialize)]
    struct LeaseArgs {
        action: String,
        #[serde(default)]
        fields: Vec<LeaseField>,
    }

    #[derive(Deserialize)]
    struct LeaseField {
        name: String,
        value: String,
    }

    let body: LeaseBody =
        serde_json::from_str(text).with_context(|| "failed to parse reddit media lease")?;
    let upload_url = if body.args.action.starts_with("//") {
        format!("https:{}", body.args.action)
    } else {
        body.args.action
    };
    let key = body
        .args
        .fields
        .iter()
        .find(|field| field.name == "key")
        .map(|field| field.value.clone())
        .ok_or_else(|| anyhow!("reddit media lease has no upload key"))?;
    let asset_url = format!("{}/{}", upload_url.trim_end_matches('/'), key);
    let fields = body
        .args
        .fields
        .into_iter()
        .map(|field| (field.name, field.value))
        .collect();
    Ok(MediaLease {
        upload_url,
        fields,
        asset_url,
    })
}

fn parse_submit(text: &str) -> Result<()> {
    let value: serde_json::Value =
        serde_json::from_str(text).with_context(|| "failed to parse reddit submit response")?;
    let errors = value
        .pointer("/json/errors")
        .and_then(|errors| errors.as_array())
        .cloned()
        .unwrap_or_default();
    if errors.is_empty() {
        return Ok(());
    }
    let messages = errors
        .iter()
        .map(|error| match error.as_array() {
            Some(parts) => parts
                .iter()
                .filter_map(|part| part.as_str())
                .collect::<Vec<_>>()
                .join(": "),
            None => error.to_string(),
        })
        .collect::<Vec<_>>();
    Err(anyhow!("reddit rejected the post: {}", messages.join("; ")))
}

fn get_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lease_resolves_protocol_relative_upload_url() {
        let text = r#"{
            "args": {
                "action": "//reddit-uploaded-media.s3-accelerate.amazonaws.com",
                "fields": [
                    {"name": "acl", "value": "private"},
                    {"name": "key", "value": "rte_images/abc123/card.png"}
                ]
            },
            "asset": {"asset_id": "abc123"}
        }"#;
        let lease = parse_lease(text).expect("lease");
        assert_eq!(lease.upload_url, "https://reddit-uploaded-media.s3-accelerate.amazonaws.com");
        assert_eq!(
            lease.asset_url,
            "https://reddit-uploaded-media.s3-accelerate.amazonaws.com/rte_images/abc123/card.png"
        );
        assert_eq!(lease.fields.len(), 2);
        assert_eq!(lease.fields[0], ("acl".to_string(), "private".to_string()));
    }

    #[test]
    fn lease_without_key_is_rejected() {
        let text = r#"{"args":{"action":"https://upload.test","fields":[{"name":"acl","value":"x"}]}}"#;
        assert!(parse_lease(text).is_err());
    }

    #[test]
    fn token_errors_are_reported() {
        let token = parse_token(r#"{"access_token":"abc","token_type":"bearer"}"#).expect("token");
        assert_eq!(token, "abc");
        let err = parse_token(r#"{"error":"invalid_grant"}"#).expect_err("error");
        assert!(err.to_string().contains("invalid_grant"));
    }

    #[test]
    fn submit_errors_are_collected() {
        assert!(parse_submit(r#"{"json":{"errors":[]}}"#).is_ok());
        let body = r#"{"json":{"errors":[["RATELIMIT","you are doing that too much","ratelimit"]]}}"#;
        let err = parse_submit(body).expect_err("rejected");
        assert!(err.to_string().contains("RATELIMIT: you are doing that too much"));
    }

    #[test]
    fn subreddit_prefix_is_normalized() {
        let credentials = RedditCredentials {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            username: "user".to_string(),
            password: "pass".to_string(),
        };
        let publisher = RedditPublisher::new(credentials, "r/Vocabdaily", "agent");
        assert_eq!(publisher.destination(), "r/Vocabdaily");
    }
}
