//! Posting-cycle orchestration
//!
//! A cycle takes one turn from the source rotator, queries that provider
//! with an over-fetched count, filters the candidates (portrait shape,
//! content exclusions, duplicates), downloads and hash-checks the accepted
//! ones, and posts them with a pacing delay. Provider failure falls back to
//! exactly one alternate source; if that fails too the cycle is recorded as
//! failed. The runner is owned by an `Arc<Mutex<_>>` whose `try_lock`
//! doubles as the single-flight guard.

use crate::bot::Poster;
use crate::config::Config;
use crate::downloader::{sha256_hex, ImageDownloader};
use crate::error::{DownloadError, ErrorClass, ProviderError, SendError};
use crate::models::{
    CycleOutcome, CycleResult, WallpaperCandidate, WallpaperCategory, WallpaperSource,
};
use crate::providers::WallpaperProvider;
use crate::scheduler::SourceRotator;
use crate::storage::{JsonStore, SeenRegistry, SentRecord, StatsTracker};
use crate::utils::{with_retry_if, RetryConfig};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Knobs the cycle needs, extracted from [`Config`]
#[derive(Debug, Clone)]
pub struct BatchSettings {
    /// Images per batch
    pub quota: usize,
    /// Minimum pixel height for the portrait check
    pub min_height: u32,
    /// Candidates requested per quota slot
    pub overfetch_factor: usize,
    /// Pause between consecutive sends
    pub send_delay: Duration,
    /// Whether metadata exclusions apply
    pub content_filter: bool,
    /// Channel recorded on sent entries
    pub channel_id: String,
}

impl BatchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            quota: config.batch.wallpapers_per_batch,
            min_height: config.batch.min_height,
            overfetch_factor: config.batch.overfetch_factor,
            send_delay: config.send_delay(),
            content_filter: config.batch.content_filter,
            channel_id: config.telegram.channel_id.clone(),
        }
    }
}

/// Executes posting cycles; one instance behind an `Arc<Mutex<_>>`
pub struct CycleRunner {
    providers: HashMap<WallpaperSource, Box<dyn WallpaperProvider>>,
    rotator: SourceRotator,
    registry: SeenRegistry,
    downloader: ImageDownloader,
    poster: Arc<dyn Poster>,
    store: JsonStore,
    stats: Arc<Mutex<StatsTracker>>,
    retry: RetryConfig,
    settings: BatchSettings,
}

impl CycleRunner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        providers: HashMap<WallpaperSource, Box<dyn WallpaperProvider>>,
        rotator: SourceRotator,
        registry: SeenRegistry,
        downloader: ImageDownloader,
        poster: Arc<dyn Poster>,
        store: JsonStore,
        stats: Arc<Mutex<StatsTracker>>,
        retry: RetryConfig,
        settings: BatchSettings,
    ) -> Self {
        Self {
            providers,
            rotator,
            registry,
            downloader,
            poster,
            store,
            stats,
            retry,
            settings,
        }
    }

    /// Run one cycle with a randomly chosen category
    pub async fn run_cycle(&mut self) -> CycleResult {
        self.run_cycle_with(WallpaperCategory::random()).await
    }

    /// Run one cycle with a fixed category
    pub async fn run_cycle_with(&mut self, category: WallpaperCategory) -> CycleResult {
        let fetch_count = self.settings.quota * self.settings.overfetch_factor;
        let mut exhaustions: u64 = 0;

        info!(category = %category, fetch_count, "starting posting cycle");

        let primary = self.rotator.next();
        self.persist_rotation();

        let fetched = match self
            .query_source(primary, category, fetch_count, &mut exhaustions)
            .await
        {
            Ok(candidates) => Some((primary, candidates)),
            Err(e) => {
                warn!(source = %primary, error = %e, "primary source failed, trying fallback");
                self.try_fallback(primary, category, fetch_count, &mut exhaustions)
                    .await
            }
        };

        let Some((source, candidates)) = fetched else {
            let result = CycleResult::failed(primary);
            warn!(source = %primary, "cycle failed: no source could be queried");
            self.record(&result, 0, exhaustions).await;
            return result;
        };

        let (result, filtered) = self
            .assemble_and_send(source, category, candidates, &mut exhaustions)
            .await;
        info!(
            source = %result.source,
            sent = result.sent,
            attempted = result.attempted,
            failed = result.failed,
            filtered,
            "posting cycle finished"
        );
        self.record(&result, filtered, exhaustions).await;
        result
    }

    /// One alternate source for the same cycle; never more
    async fn try_fallback(
        &mut self,
        primary: WallpaperSource,
        category: WallpaperCategory,
        fetch_count: usize,
        exhaustions: &mut u64,
    ) -> Option<(WallpaperSource, Vec<WallpaperCandidate>)> {
        let fallback = self.rotator.next();
        self.persist_rotation();
        if fallback == primary {
            // single-source configuration, nothing else to try
            return None;
        }

        match self
            .query_source(fallback, category, fetch_count, exhaustions)
            .await
        {
            Ok(candidates) => Some((fallback, candidates)),
            Err(e) => {
                warn!(source = %fallback, error = %e, "fallback source failed too");
                None
            }
        }
    }

    async fn query_source(
        &self,
        source: WallpaperSource,
        category: WallpaperCategory,
        count: usize,
        exhaustions: &mut u64,
    ) -> Result<Vec<WallpaperCandidate>, ProviderError> {
        let Some(provider) = self.providers.get(&source) else {
            return Err(ProviderError::Auth(format!(
                "no client configured for {source}"
            )));
        };

        let result = with_retry_if(
            &self.retry,
            "provider_query",
            || provider.fetch(category, count),
            |e: &ProviderError| e.is_transient(),
        )
        .await;

        if let Err(e) = &result {
            if e.is_transient() {
                *exhaustions += 1;
            }
        }
        result
    }

    /// Filter, download, hash-check and post candidates up to the quota
    ///
    /// Returns the cycle result plus the number of filtered candidates.
    async fn assemble_and_send(
        &mut self,
        source: WallpaperSource,
        category: WallpaperCategory,
        candidates: Vec<WallpaperCandidate>,
        exhaustions: &mut u64,
    ) -> (CycleResult, u64) {
        let attempted = candidates.len();
        let mut sent = 0usize;
        let mut failed = 0usize;
        let mut accepted = 0usize;
        let mut filtered = 0u64;

        for candidate in &candidates {
            if accepted >= self.settings.quota {
                break;
            }

            if !candidate.is_portrait(self.settings.min_height) {
                debug!(id = %candidate.dedup_key(), "rejected: not mobile portrait");
                filtered += 1;
                continue;
            }
            if self.settings.content_filter && candidate.contains_excluded_content() {
                debug!(id = %candidate.dedup_key(), "rejected: excluded content");
                filtered += 1;
                continue;
            }
            if !candidate.has_valid_url() {
                debug!(id = %candidate.dedup_key(), "rejected: invalid image url");
                filtered += 1;
                continue;
            }
            if self.registry.is_duplicate(candidate) {
                debug!(id = %candidate.dedup_key(), "rejected: already posted");
                filtered += 1;
                continue;
            }
            accepted += 1;

            let bytes = match self.download_with_retry(candidate, exhaustions).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(id = %candidate.dedup_key(), error = %e, "download failed, skipping image");
                    failed += 1;
                    continue;
                }
            };

            let hash = sha256_hex(&bytes);
            if self.registry.contains_hash(&hash) {
                debug!(id = %candidate.dedup_key(), "rejected: identical bytes already posted");
                // the slot goes back to the pool so a later candidate can fill it
                accepted -= 1;
                filtered += 1;
                continue;
            }

            if sent > 0 {
                tokio::time::sleep(self.settings.send_delay).await;
            }

            let caption = build_caption(candidate, category);
            match self.send_with_retry(bytes, &caption, exhaustions).await {
                Ok(()) => {
                    sent += 1;
                    self.registry.record(SentRecord::new(
                        candidate,
                        hash,
                        category.query(),
                        &self.settings.channel_id,
                    ));
                    self.persist_seen();
                }
                Err(e) => {
                    warn!(id = %candidate.dedup_key(), error = %e, "send failed, skipping image");
                    failed += 1;
                }
            }
        }

        let result = CycleResult {
            attempted,
            sent,
            failed,
            source,
            timestamp: Utc::now(),
            outcome: CycleOutcome::Success,
        };
        (result, filtered)
    }

    async fn download_with_retry(
        &self,
        candidate: &WallpaperCandidate,
        exhaustions: &mut u64,
    ) -> Result<bytes::Bytes, DownloadError> {
        let result = with_retry_if(
            &self.retry,
            "download_image",
            || self.downloader.fetch(&candidate.image_url),
            |e: &DownloadError| e.is_transient(),
        )
        .await;

        if let Err(e) = &result {
            if e.is_transient() {
                *exhaustions += 1;
            }
        }
        result
    }

    async fn send_with_retry(
        &self,
        bytes: bytes::Bytes,
        caption: &str,
        exhaustions: &mut u64,
    ) -> Result<(), SendError> {
        let result = with_retry_if(
            &self.retry,
            "send_photo",
            || self.poster.send_photo(bytes.clone(), caption),
            |e: &SendError| e.is_transient(),
        )
        .await;

        if let Err(e) = &result {
            if e.is_transient() {
                *exhaustions += 1;
            }
        }
        result
    }

    /// Advance the rotation by one turn on admin request
    ///
    /// Returns the source rotated away from and the one now current.
    pub fn rotate_source(&mut self) -> (WallpaperSource, WallpaperSource) {
        let old = self.rotator.next();
        self.persist_rotation();
        (old, self.rotator.current())
    }

    /// Notify the admin about a completed scheduled batch
    pub async fn send_completion_notice(&self, result: &CycleResult) {
        let text = if result.is_success() {
            format!(
                "✅ Scheduled batch complete: {}/{} wallpapers sent from {}",
                result.sent,
                self.settings.quota,
                result.source.display_name()
            )
        } else {
            format!(
                "⚠️ Scheduled batch failed: no source could be queried (last tried {})",
                result.source.display_name()
            )
        };
        if let Err(e) = self.poster.notify_admin(&text).await {
            warn!(error = %e, "could not deliver batch notification");
        }
    }

    pub fn current_source(&self) -> WallpaperSource {
        self.rotator.current()
    }

    pub fn next_source(&self) -> WallpaperSource {
        self.rotator.peek_next()
    }

    pub fn seen_count(&self) -> usize {
        self.registry.len()
    }

    async fn record(&self, result: &CycleResult, filtered: u64, exhaustions: u64) {
        let mut stats = self.stats.lock().await;
        stats.record_cycle(result, filtered, exhaustions);
    }

    fn persist_rotation(&self) {
        if let Err(e) = self.store.save_rotation(&self.rotator.state()) {
            warn!(error = %e, "failed to persist rotation state");
        }
    }

    fn persist_seen(&self) {
        if let Err(e) = self.store.save_seen(self.registry.records()) {
            warn!(error = %e, "failed to persist seen registry");
        }
    }
}

/// Build the channel caption for a posted wallpaper
fn build_caption(candidate: &WallpaperCandidate, category: WallpaperCategory) -> String {
    let mut caption = String::from("📱 <b>Premium HD Mobile Wallpaper</b>\n");

    if let Some(description) = category.description() {
        caption.push('\n');
        caption.push_str(description);
        caption.push('\n');
    }

    caption.push('\n');
    caption.push_str(&format!(
        "#{} #{} #MobileWallpaper #HDWallpaper #WallpaperDaily",
        capitalize(&category.hashtag()),
        candidate.source.display_name()
    ));
    caption
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
