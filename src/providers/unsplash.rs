//! Unsplash search client
//!
//! Uses `/search/photos` with `client_id` authentication. Unsplash signals
//! demo-tier rate limiting with 403, so status mapping differs from the
//! shared classification. An empty result for the enriched query is retried
//! once with the bare category term before giving up.

use super::WallpaperProvider;
use crate::error::ProviderError;
use crate::models::{WallpaperCandidate, WallpaperCategory, WallpaperSource};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.unsplash.com";

pub struct UnsplashProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl UnsplashProvider {
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the API base URL (used by mock-server tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn search(
        &self,
        query: &str,
        count: usize,
    ) -> Result<Vec<WallpaperCandidate>, ProviderError> {
        debug!(query = %query, count, "querying unsplash");

        let per_page = count.to_string();
        let response = self
            .client
            .get(format!("{}/search/photos", self.base_url))
            .query(&[
                ("query", query),
                ("per_page", per_page.as_str()),
                ("orientation", "portrait"),
                ("content_filter", "high"),
                ("client_id", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_unsplash_status(status));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        Ok(candidates_from(body))
    }
}

#[async_trait]
impl WallpaperProvider for UnsplashProvider {
    fn source(&self) -> WallpaperSource {
        WallpaperSource::Unsplash
    }

    async fn fetch(
        &self,
        category: WallpaperCategory,
        count: usize,
    ) -> Result<Vec<WallpaperCandidate>, ProviderError> {
        let enriched = format!("{} wallpaper phone", category.query());
        let candidates = self.search(&enriched, count).await?;
        if !candidates.is_empty() {
            return Ok(candidates);
        }

        // Enriched query sometimes over-constrains; fall back to the bare term
        debug!(category = %category, "enriched query empty, retrying with bare term");
        let candidates = self.search(category.query(), count).await?;
        if candidates.is_empty() {
            return Err(ProviderError::EmptyResult);
        }
        Ok(candidates)
    }
}

/// Unsplash uses 403 for exhausted demo-tier quotas
fn classify_unsplash_status(status: StatusCode) -> ProviderError {
    match status.as_u16() {
        401 => ProviderError::Auth("HTTP 401".to_string()),
        403 | 429 => ProviderError::RateLimit,
        code => ProviderError::Server(code),
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    id: String,
    width: u32,
    height: u32,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    alt_description: Option<String>,
    urls: PhotoUrls,
    #[serde(default)]
    user: Option<User>,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    #[serde(default)]
    full: Option<String>,
    regular: String,
}

#[derive(Debug, Deserialize)]
struct User {
    #[serde(default)]
    name: String,
}

fn candidates_from(body: SearchResponse) -> Vec<WallpaperCandidate> {
    body.results
        .into_iter()
        .map(|p| {
            let description = p
                .description
                .or(p.alt_description)
                .unwrap_or_default();
            WallpaperCandidate {
                source: WallpaperSource::Unsplash,
                external_id: p.id,
                image_url: p.urls.full.unwrap_or(p.urls.regular),
                width: p.width,
                height: p.height,
                description,
                author: p.user.map(|u| u.name).unwrap_or_default(),
                tags: vec![],
            }
        })
        .collect()
}
