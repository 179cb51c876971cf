use anyhow::{Result, anyhow};
use tracing::info;

use crate::card::CardResources;
use crate::enrich::Enricher;
use crate::providers::Provider;
use crate::record::WordRecord;
use crate::source::SourceClient;

#[derive(Debug, Clone)]
pub struct GeneratedCard {
    pub record: WordRecord,
    pub png: Vec<u8>,
}

/// Fetch, enrich and render one card. Shared by the HTTP service and the bot.
#[derive(Debug, Clone)]
pub struct CardPipeline<P: Provider> {
    source: SourceClient,
    enricher: Enricher<P>,
    resources: CardResources,
}

impl<P: Provider + 'static> CardPipeline<P> {
    pub fn new(source: SourceClient, enricher: Enricher<P>, resources: CardResources) -> Self {
        Self {
            source,
            enricher,
            resources,
        }
    }

    pub fn resources(&self) -> &CardResources {
        &self.resources
    }

    pub async fn generate(&self) -> Result<GeneratedCard> {
        let word = self.source.fetch().await?;
        let record = self.enricher.enrich(&word).await;
        let png = render_blocking(self.resources.clone(), record.clone()).await?;
        info!("rendered card for '{}' ({} bytes)", record.term, png.len());
        Ok(GeneratedCard { record, png })
    }
}

/// Runs the synchronous renderer off the async workers.
pub async fn render_blocking(resources: CardResources, record: WordRecord) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || resources.render(&record))
        .await
        .map_err(|err| anyhow!("render task failed: {}", err))?
}
