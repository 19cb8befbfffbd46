//! Wallpaper provider clients
//!
//! One client per upstream photo API, all behind the [`WallpaperProvider`]
//! trait so the batch assembler can treat them uniformly. Each client takes
//! a base-URL override so tests can point it at a mock server.

pub mod pexels;
pub mod unsplash;
pub mod wallhaven;

pub use pexels::PexelsProvider;
pub use unsplash::UnsplashProvider;
pub use wallhaven::WallhavenProvider;

use crate::config::Config;
use crate::error::ProviderError;
use crate::models::{WallpaperCandidate, WallpaperCategory, WallpaperSource};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::HashMap;

/// A queryable wallpaper source
#[async_trait]
pub trait WallpaperProvider: Send + Sync {
    /// Which source this client serves
    fn source(&self) -> WallpaperSource;

    /// Search for up to `count` candidates matching the category
    ///
    /// An empty result set is an error (`ProviderError::EmptyResult`), not
    /// an empty vector.
    async fn fetch(
        &self,
        category: WallpaperCategory,
        count: usize,
    ) -> Result<Vec<WallpaperCandidate>, ProviderError>;
}

/// Map a non-success HTTP status to a provider error
///
/// 401/403 are treated as auth failures by default; providers with
/// different conventions (Unsplash signals rate limiting with 403)
/// override before calling this.
pub(crate) fn classify_status(status: StatusCode) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::Auth(format!("HTTP {}", status.as_u16())),
        429 => ProviderError::RateLimit,
        code => ProviderError::Server(code),
    }
}

/// Build a client for every source that has an API key configured
pub fn build_providers(
    config: &Config,
    client: &reqwest::Client,
) -> HashMap<WallpaperSource, Box<dyn WallpaperProvider>> {
    let mut providers: HashMap<WallpaperSource, Box<dyn WallpaperProvider>> = HashMap::new();

    for source in config.configured_sources() {
        let Some(key) = config.api_key(source) else {
            continue;
        };
        let provider: Box<dyn WallpaperProvider> = match source {
            WallpaperSource::Pexels => {
                Box::new(PexelsProvider::new(client.clone(), key.to_string()))
            }
            WallpaperSource::Unsplash => {
                Box::new(UnsplashProvider::new(client.clone(), key.to_string()))
            }
            WallpaperSource::Wallhaven => {
                Box::new(WallhavenProvider::new(client.clone(), Some(key.to_string())))
            }
        };
        providers.insert(source, provider);
    }

    providers
}
