//! Shared test fixtures: scripted providers, an in-memory poster and a
//! cycle-runner builder wired to a mock image server.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tapet::batch::{BatchSettings, CycleRunner};
use tapet::bot::Poster;
use tapet::downloader::ImageDownloader;
use tapet::error::{ProviderError, SendError};
use tapet::models::{WallpaperCandidate, WallpaperCategory, WallpaperSource};
use tapet::providers::WallpaperProvider;
use tapet::scheduler::SourceRotator;
use tapet::storage::{JsonStore, SeenRegistry, StatsTracker};
use tapet::utils::RetryConfig;
use tempfile::TempDir;
use tokio::sync::Mutex;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

// ============================================================================
// Mock provider
// ============================================================================

pub enum MockBehavior {
    /// Always return these candidates
    Return(Vec<WallpaperCandidate>),
    /// Always fail with a transient error (HTTP 503)
    FailTransient,
    /// Always fail with a permanent error (auth)
    FailPermanent,
}

pub struct MockProvider {
    source: WallpaperSource,
    behavior: MockBehavior,
    pub calls: AtomicU32,
}

impl MockProvider {
    pub fn new(source: WallpaperSource, behavior: MockBehavior) -> Self {
        Self {
            source,
            behavior,
            calls: AtomicU32::new(0),
        }
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WallpaperProvider for MockProvider {
    fn source(&self) -> WallpaperSource {
        self.source
    }

    async fn fetch(
        &self,
        _category: WallpaperCategory,
        _count: usize,
    ) -> Result<Vec<WallpaperCandidate>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            MockBehavior::Return(candidates) => Ok(candidates.clone()),
            MockBehavior::FailTransient => Err(ProviderError::Server(503)),
            MockBehavior::FailPermanent => Err(ProviderError::Auth("mock key rejected".into())),
        }
    }
}

// ============================================================================
// Mock poster
// ============================================================================

#[derive(Debug, Clone)]
pub struct SentPhoto {
    pub size: usize,
    pub caption: String,
}

pub struct MockPoster {
    pub photos: StdMutex<Vec<SentPhoto>>,
    pub notices: StdMutex<Vec<String>>,
    /// Fail this many sends (transient) before succeeding
    fail_next: AtomicU32,
    /// Artificial per-send latency, for in-flight tests
    send_delay: Duration,
}

impl MockPoster {
    pub fn new() -> Self {
        Self {
            photos: StdMutex::new(Vec::new()),
            notices: StdMutex::new(Vec::new()),
            fail_next: AtomicU32::new(0),
            send_delay: Duration::ZERO,
        }
    }

    pub fn failing_first(n: u32) -> Self {
        let poster = Self::new();
        poster.fail_next.store(n, Ordering::SeqCst);
        poster
    }

    pub fn slow(delay: Duration) -> Self {
        let mut poster = Self::new();
        poster.send_delay = delay;
        poster
    }

    pub fn sent_count(&self) -> usize {
        self.photos.lock().expect("poster lock").len()
    }

    pub fn captions(&self) -> Vec<String> {
        self.photos
            .lock()
            .expect("poster lock")
            .iter()
            .map(|p| p.caption.clone())
            .collect()
    }
}

#[async_trait]
impl Poster for MockPoster {
    async fn send_photo(&self, image: Bytes, caption: &str) -> Result<(), SendError> {
        if !self.send_delay.is_zero() {
            tokio::time::sleep(self.send_delay).await;
        }
        if self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(SendError::Network("mock outage".into()));
        }
        self.photos.lock().expect("poster lock").push(SentPhoto {
            size: image.len(),
            caption: caption.to_string(),
        });
        Ok(())
    }

    async fn notify_admin(&self, text: &str) -> Result<(), SendError> {
        self.notices
            .lock()
            .expect("poster lock")
            .push(text.to_string());
        Ok(())
    }
}

// ============================================================================
// Mock image host
// ============================================================================

/// Responds to any GET with image bytes derived from the request path, so
/// distinct paths hash differently and identical paths hash the same.
struct EchoImage;

impl Respond for EchoImage {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .set_body_raw(request.url.path().as_bytes().to_vec(), "image/jpeg")
    }
}

pub async fn image_server() -> MockServer {
    use wiremock::matchers::{method, path};

    let server = MockServer::start().await;
    // specific failure paths first, catch-all last
    Mock::given(method("GET"))
        .and(path("/missing.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/empty.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(Vec::new(), "image/jpeg"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky.jpg"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(EchoImage)
        .mount(&server)
        .await;
    server
}

/// A portrait candidate whose image lives on the mock host
pub fn portrait(server: &MockServer, source: WallpaperSource, id: &str) -> WallpaperCandidate {
    candidate_with_path(server, source, id, &format!("/img/{id}.jpg"), 1080, 2340)
}

/// A landscape candidate that the portrait filter must reject
pub fn landscape(server: &MockServer, source: WallpaperSource, id: &str) -> WallpaperCandidate {
    candidate_with_path(server, source, id, &format!("/img/{id}.jpg"), 2340, 1080)
}

pub fn candidate_with_path(
    server: &MockServer,
    source: WallpaperSource,
    id: &str,
    path: &str,
    width: u32,
    height: u32,
) -> WallpaperCandidate {
    WallpaperCandidate {
        source,
        external_id: id.to_string(),
        image_url: format!("{}{path}", server.uri()),
        width,
        height,
        description: String::new(),
        author: String::new(),
        tags: vec![],
    }
}

// ============================================================================
// Runner builder
// ============================================================================

pub struct TestContext {
    pub dir: TempDir,
    pub store: JsonStore,
    pub stats: Arc<Mutex<StatsTracker>>,
    pub poster: Arc<MockPoster>,
}

pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_retries: 1,
        base_delay_ms: 1,
        max_delay_ms: 5,
        backoff_multiplier: 2.0,
    }
}

pub fn settings(quota: usize) -> BatchSettings {
    BatchSettings {
        quota,
        min_height: 800,
        overfetch_factor: 3,
        send_delay: Duration::from_millis(1),
        content_filter: true,
        channel_id: "@test-channel".to_string(),
    }
}

/// Assemble a runner from scripted providers on a fresh temp data dir
pub fn build_runner(
    providers: Vec<(WallpaperSource, Arc<MockProvider>)>,
    poster: Arc<MockPoster>,
    settings: BatchSettings,
) -> (Arc<Mutex<CycleRunner>>, TestContext) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonStore::new(dir.path()).expect("store");
    build_runner_with_store(providers, poster, settings, store, dir)
}

/// Same, but reusing an existing store (for persistence tests)
pub fn build_runner_with_store(
    providers: Vec<(WallpaperSource, Arc<MockProvider>)>,
    poster: Arc<MockPoster>,
    settings: BatchSettings,
    store: JsonStore,
    dir: TempDir,
) -> (Arc<Mutex<CycleRunner>>, TestContext) {
    let sources: Vec<WallpaperSource> = providers.iter().map(|(s, _)| *s).collect();

    let mut provider_map: HashMap<WallpaperSource, Box<dyn WallpaperProvider>> = HashMap::new();
    for (source, provider) in providers {
        provider_map.insert(source, Box::new(SharedProvider(provider)));
    }

    let rotator = match store.load_rotation() {
        Ok(state) => SourceRotator::with_state(sources, state).expect("rotator"),
        Err(_) => SourceRotator::new(sources).expect("rotator"),
    };
    let registry = SeenRegistry::from_records(store.load_seen().expect("seen"));
    let stats = Arc::new(Mutex::new(StatsTracker::load(store.clone())));
    let downloader = ImageDownloader::new(reqwest::Client::new(), 1000);

    let runner = CycleRunner::new(
        provider_map,
        rotator,
        registry,
        downloader,
        poster.clone(),
        store.clone(),
        stats.clone(),
        fast_retry(),
        settings,
    );

    (
        Arc::new(Mutex::new(runner)),
        TestContext {
            dir,
            store,
            stats,
            poster,
        },
    )
}

/// Adapter so tests keep an `Arc` handle to a provider the runner owns
struct SharedProvider(Arc<MockProvider>);

#[async_trait]
impl WallpaperProvider for SharedProvider {
    fn source(&self) -> WallpaperSource {
        self.0.source()
    }

    async fn fetch(
        &self,
        category: WallpaperCategory,
        count: usize,
    ) -> Result<Vec<WallpaperCandidate>, ProviderError> {
        self.0.fetch(category, count).await
    }
}
