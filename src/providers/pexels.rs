//! Pexels search client
//!
//! Uses the `/v1/search` endpoint with an `Authorization` header and
//! portrait orientation. The query term is enriched with mobile-wallpaper
//! keywords so results skew toward phone-sized imagery.

use super::{classify_status, WallpaperProvider};
use crate::error::ProviderError;
use crate::models::{WallpaperCandidate, WallpaperCategory, WallpaperSource};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.pexels.com";

pub struct PexelsProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl PexelsProvider {
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
}

#[async_trait]
impl WallpaperProvider for PexelsProvider {
    fn source(&self) -> WallpaperSource {
        WallpaperSource::Pexels
    }

    async fn fetch(
        &self,
        category: WallpaperCategory,
        count: usize,
    ) -> Result<Vec<WallpaperCandidate>, ProviderError> {
        let query = format!("{} mobile wallpaper portrait", category.query());
        debug!(query = %query, count, "querying pexels");

        let per_page = count.to_string();
        let response = self
            .client
            .get(format!("{}/v1/search", self.base_url))
            .header(AUTHORIZATION, &self.api_key)
            .query(&[
                ("query", query.as_str()),
                ("per_page", per_page.as_str()),
                ("orientation", "portrait"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        let candidates = candidates_from(body);
        if candidates.is_empty() {
            return Err(ProviderError::EmptyResult);
        }
        Ok(candidates)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    photos: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    id: u64,
    width: u32,
    height: u32,
    src: PhotoSrc,
    #[serde(default)]
    alt: Option<String>,
    #[serde(default)]
    photographer: String,
}

#[derive(Debug, Deserialize)]
struct PhotoSrc {
    original: String,
}

fn candidates_from(body: SearchResponse) -> Vec<WallpaperCandidate> {
    body.photos
        .into_iter()
        .map(|p| WallpaperCandidate {
            source: WallpaperSource::Pexels,
            external_id: p.id.to_string(),
            image_url: p.src.original,
            width: p.width,
            height: p.height,
            description: p.alt.unwrap_or_default(),
            author: p.photographer,
            tags: vec![],
        })
        .collect()
}
