//! The feed processing cycle.
//!
//! ```text
//! fetch → extract → match filters → dedupe → download → record
//! ```
//!
//! Every failure below the cycle is logged and absorbed here: a broken feed
//! or download never stops the remaining work.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;

use crate::app::{Result, Session};
use crate::domain::{match_url, Feed, FeedItem};
use crate::extractor::Extractor;
use crate::fetcher::filename::target_path;
use crate::fetcher::Fetcher;
use crate::notifier::{self, Category, Notifier};

/// Totals for one pass over all feeds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub feeds: usize,
    pub items: usize,
    pub downloads: usize,
}

pub struct Pipeline {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    notifier: Option<Arc<dyn Notifier + Send + Sync>>,
    extractor: Extractor,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        notifier: Option<Arc<dyn Notifier + Send + Sync>>,
    ) -> Self {
        Self {
            fetcher,
            notifier,
            extractor: Extractor::new(),
        }
    }

    /// Process every feed once, in order. `shutdown` is checked between
    /// feeds.
    pub async fn run_cycle(
        &self,
        session: &mut Session,
        first_run: bool,
        shutdown: &AtomicBool,
    ) -> CycleSummary {
        let start = Utc::now();
        let mut summary = CycleSummary::default();
        let mut feeds = std::mem::take(&mut session.feeds);

        for feed in feeds.iter_mut() {
            if shutdown.load(Ordering::SeqCst) {
                tracing::info!("Shutdown requested, skipping remaining feeds");
                break;
            }
            tracing::debug!("Checking feed {} ...", feed.id);
            let (items, downloads) = self.check_feed(session, feed, first_run).await;
            summary.feeds += 1;
            summary.items += items;
            summary.downloads += downloads;
        }

        session.feeds = feeds;

        if first_run {
            tracing::debug!("New bucket size: {}", session.max_bucket_items);
        }

        let elapsed = Utc::now().signed_duration_since(start);
        tracing::info!(
            "Check complete: {} feeds, {} items, {} downloads ({:.1}s)",
            summary.feeds,
            summary.items,
            summary.downloads,
            elapsed.num_milliseconds() as f64 / 1000.0
        );

        summary
    }

    /// Fetch one feed and download whatever is new in it. Returns the
    /// number of `item` elements the feed contained.
    pub async fn process_feed(&self, session: &mut Session, feed: &mut Feed, first_run: bool) -> usize {
        self.check_feed(session, feed, first_run).await.0
    }

    /// Item count and number of downloads for one feed.
    async fn check_feed(&self, session: &mut Session, feed: &mut Feed, first_run: bool) -> (usize, usize) {
        let response = match self
            .fetcher
            .fetch(&feed.url, feed.cookies.as_deref())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("[{}] Failed to fetch {}: {}", feed.id, feed.url, e);
                return (0, 0);
            }
        };

        if response.status != 200 || response.body.is_empty() {
            tracing::warn!(
                "[{}] {} answered HTTP {} with {} bytes",
                feed.id,
                feed.url,
                response.status,
                response.body.len()
            );
            return (0, 0);
        }

        let extraction = self.extractor.extract(&response.body);
        if extraction.ttl.is_some() {
            feed.ttl = extraction.ttl;
        }

        if first_run {
            session.grow_capacity(extraction.item_count);
        }

        let downloads = self.process_items(session, feed.id, &extraction.items).await;
        (extraction.item_count, downloads)
    }

    /// Read a feed from a local file instead of the network. Capacity growth
    /// always applies.
    pub async fn process_file(&self, session: &mut Session, path: &Path) -> Result<usize> {
        tracing::info!("Reading RSS feed file: {}", path.display());
        let data = tokio::fs::read(path).await?;

        let extraction = self.extractor.extract(&data);
        session.grow_capacity(extraction.item_count);
        self.process_items(session, 0, &extraction.items).await;

        Ok(extraction.item_count)
    }

    /// Download every matching, not yet downloaded URL of `items`. Returns
    /// the number of successful downloads.
    pub async fn process_items(&self, session: &mut Session, feed_id: usize, items: &[FeedItem]) -> usize {
        let mut downloaded = 0;

        for item in items {
            for url in &item.urls {
                let Some(agent) = match_url(&session.filters, url).map(|f| f.agent.clone()) else {
                    continue;
                };

                let path = target_path(&session.download_folder, url, None);
                if session.bucket.has_been_downloaded(url) || path.exists() {
                    tracing::info!(
                        "File downloaded previously: {}",
                        path.file_name().unwrap_or_default().to_string_lossy()
                    );
                    continue;
                }

                tracing::info!("[{}] Found new download: {} ({})", feed_id, item.name, url);

                match self.fetcher.download(url, &path, agent.as_deref()).await {
                    Ok(outcome) if outcome.already_present => {
                        tracing::info!(
                            "File downloaded previously: {}",
                            outcome.path.file_name().unwrap_or_default().to_string_lossy()
                        );
                        session.record_download(url);
                    }
                    Ok(outcome) if outcome.is_success() => {
                        tracing::info!(
                            "  Download complete ({}MB) ({:.2}kB/s) -> {}",
                            outcome.bytes_written / 1024 / 1024,
                            outcome.bytes_per_sec() / 1024.0,
                            outcome.path.display()
                        );
                        self.notify(Category::NewItem, &item.name).await;
                        session.record_download(url);
                        downloaded += 1;
                    }
                    Ok(outcome) => {
                        tracing::error!("  Error: Download failed (Error Code {})", outcome.status);
                        self.notify(Category::DownloadFailed, &item.name).await;
                    }
                    Err(e) => {
                        tracing::error!("  Error: Download of {} failed: {}", url, e);
                        self.notify(Category::DownloadFailed, &item.name).await;
                    }
                }
            }
        }

        downloaded
    }

    async fn notify(&self, category: Category, message: &str) {
        notifier::send(self.notifier.as_deref(), category, message).await;
    }
}
