//! Scheduled poster: renders a card every interval and submits it as an image
//! post.

mod reddit;

use anyhow::{Context, Result};
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info};

pub use reddit::{RedditCredentials, RedditPublisher};

use crate::pipeline::CardPipeline;
use crate::providers::Provider;
use crate::record::WordRecord;
use crate::settings::Settings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePost {
    pub title: String,
    pub image_path: PathBuf,
}

pub type PublishFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

pub trait SocialPublisher: Send + Sync {
    fn destination(&self) -> String;
    fn publish<'a>(&'a self, post: &'a ImagePost) -> PublishFuture<'a>;
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub interval: Duration,
    pub run_on_start: bool,
}

impl BotConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            interval: Duration::from_secs(settings.bot_interval_secs.max(1)),
            run_on_start: settings.bot_run_on_start,
        }
    }
}

/// `Word of the Hour: Resilient (adjective)`
pub fn post_title(record: &WordRecord) -> String {
    format!(
        "Word of the Hour: {} ({})",
        record.display_term(),
        record.part_of_speech
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Posted,
    MissingCredentials,
    GenerationFailed,
    PublishFailed,
}

pub struct Bot<P: Provider, S: SocialPublisher> {
    pipeline: CardPipeline<P>,
    publisher: Option<S>,
    config: BotConfig,
}

impl<P: Provider + 'static, S: SocialPublisher> Bot<P, S> {
    /// `publisher` is `None` when credentials are missing; every job is then
    /// logged and skipped.
    pub fn new(pipeline: CardPipeline<P>, publisher: Option<S>, config: BotConfig) -> Self {
        Self {
            pipeline,
            publisher,
            config,
        }
    }

    pub async fn run(&self) -> Result<()> {
        let destination = self
            .publisher
            .as_ref()
            .map(|publisher| publisher.destination())
            .unwrap_or_else(|| "<no credentials>".to_string());
        info!(
            "bot started for {}; posting every {}s",
            destination,
            self.config.interval.as_secs()
        );
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        if !self.config.run_on_start {
            ticker.tick().await;
            info!("waiting for next scheduled run");
        }
        loop {
            ticker.tick().await;
            self.run_job().await;
        }
    }

    pub async fn run_job(&self) -> JobOutcome {
        let started = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown time".to_string());
        info!("starting scheduled job: {}", started);

        let Some(publisher) = self.publisher.as_ref() else {
            error!("posting credentials missing; check environment variables");
            return JobOutcome::MissingCredentials;
        };

        let card = match self.pipeline.generate().await {
            Ok(card) => card,
            Err(err) => {
                error!("failed to generate card, skipping this cycle: {:#}", err);
                return JobOutcome::GenerationFailed;
            }
        };

        match publish_card(publisher, &card.record, &card.png).await {
            Ok(title) => {
                info!("posted successfully: {}", title);
                JobOutcome::Posted
            }
            Err(err) => {
                error!("failed to post card: {:#}", err);
                JobOutcome::PublishFailed
            }
        }
    }
}

/// Writes the PNG to a temporary file, submits it, and removes the file.
async fn publish_card<S: SocialPublisher>(
    publisher: &S,
    record: &WordRecord,
    png: &[u8],
) -> Result<String> {
    let mut file = tempfile::Builder::new()
        .prefix("vocab-card-")
        .suffix(".png")
        .tempfile()
        .with_context(|| "failed to create temp file for card")?;
    file.write_all(png)
        .with_context(|| "failed to write card to temp file")?;
    file.flush()?;

    let post = ImagePost {
        title: post_title(record),
        image_path: file.path().to_path_buf(),
    };
    info!("uploading to {}", publisher.destination());
    let result = publisher.publish(&post).await;
    file.close()
        .with_context(|| "failed to remove temp card file")?;
    info!("cleaned up local image file");
    result.map(|()| post.title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{CardResources, CardTheme};
    use crate::enrich::Enricher;
    use crate::providers::OpenAICompatible;
    use crate::source::SourceClient;
    use crate::test_util::sample_record;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    struct RecordingPublisher {
        posts: Mutex<Vec<(String, PathBuf, Vec<u8>)>>,
        fail: bool,
    }

    impl SocialPublisher for RecordingPublisher {
        fn destination(&self) -> String {
            "r/test".to_string()
        }

        fn publish<'a>(&'a self, post: &'a ImagePost) -> PublishFuture<'a> {
            Box::pin(async move {
                let bytes = std::fs::read(&post.image_path)?;
                self.posts.lock().expect("posts").push((
                    post.title.clone(),
                    post.image_path.clone(),
                    bytes,
                ));
                if self.fail {
                    anyhow::bail!("upload rejected");
                }
                Ok(())
            })
        }
    }

    fn recorder() -> RecordingPublisher {
        RecordingPublisher {
            posts: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// Word source on a local port; `/get` answers, `/down` is in maintenance.
    async fn spawn_source(hits: Arc<AtomicUsize>) -> String {
        let ok_hits = hits.clone();
        let router = Router::new()
            .route(
                "/get",
                get(move || {
                    ok_hits.fetch_add(1, Ordering::SeqCst);
                    async {
                        axum::Json(serde_json::json!({
                            "data": {
                                "term": "resilient",
                                "meaning": "able to recover quickly",
                                "example": "The resilient team recovered fast.",
                                "synonyms": "tough, hardy"
                            }
                        }))
                    }
                }),
            )
            .route(
                "/down",
                get(move || {
                    hits.fetch_add(1, Ordering::SeqCst);
                    async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }
                }),
            );
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{}", addr)
    }

    fn bot(
        source_url: String,
        publisher: Option<RecordingPublisher>,
    ) -> Bot<OpenAICompatible, RecordingPublisher> {
        let pipeline = CardPipeline::new(
            SourceClient::new(source_url),
            Enricher::<OpenAICompatible>::new(None),
            CardResources::builtin(CardTheme::default()),
        );
        let config = BotConfig {
            interval: Duration::from_secs(3600),
            run_on_start: true,
        };
        Bot::new(pipeline, publisher, config)
    }

    #[tokio::test]
    async fn job_without_credentials_skips_before_fetching() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = spawn_source(hits.clone()).await;
        let bot = bot(format!("{}/get", base), None);

        assert_eq!(bot.run_job().await, JobOutcome::MissingCredentials);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_generation_skips_the_tick_without_posting() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = spawn_source(hits.clone()).await;
        let bot = bot(format!("{}/down", base), Some(recorder()));

        assert_eq!(bot.run_job().await, JobOutcome::GenerationFailed);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        let publisher = bot.publisher.as_ref().expect("publisher");
        assert!(publisher.posts.lock().expect("posts").is_empty());
    }

    #[tokio::test]
    async fn successful_job_posts_rendered_card() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = spawn_source(hits.clone()).await;
        let bot = bot(format!("{}/get", base), Some(recorder()));

        assert_eq!(bot.run_job().await, JobOutcome::Posted);
        let publisher = bot.publisher.as_ref().expect("publisher");
        let posts = publisher.posts.lock().expect("posts");
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0, "Word of the Hour: Resilient (word)");
        assert!(!posts[0].1.exists());
        assert!(image::load_from_memory(&posts[0].2).is_ok());
    }

    #[tokio::test]
    async fn rejected_upload_reports_publish_failure() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = spawn_source(hits.clone()).await;
        let publisher = RecordingPublisher {
            posts: Mutex::new(Vec::new()),
            fail: true,
        };
        let bot = bot(format!("{}/get", base), Some(publisher));

        assert_eq!(bot.run_job().await, JobOutcome::PublishFailed);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn title_capitalizes_term() {
        let mut record = sample_record();
        record.term = "RESILIENT".to_string();
        assert_eq!(post_title(&record), "Word of the Hour: Resilient (adjective)");
    }

    #[tokio::test]
    async fn publish_writes_then_removes_temp_file() {
        let publisher = RecordingPublisher {
            posts: Mutex::new(Vec::new()),
            fail: false,
        };
        let title = publish_card(&publisher, &sample_record(), b"png-bytes")
            .await
            .expect("publish");
        assert_eq!(title, "Word of the Hour: Resilient (adjective)");

        let posts = publisher.posts.lock().expect("posts");
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].2, b"png-bytes");
        assert!(!posts[0].1.exists());
    }

    #[tokio::test]
    async fn failed_publish_still_cleans_up() {
        let publisher = RecordingPublisher {
            posts: Mutex::new(Vec::new()),
            fail: true,
        };
        let result = publish_card(&publisher, &sample_record(), b"png").await;
        assert!(result.is_err());
        let posts = publisher.posts.lock().expect("posts");
        assert!(!posts[0].1.exists());
    }
}
