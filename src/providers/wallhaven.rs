//! Wallhaven search client
//!
//! Uses `/api/v1/search` restricted to the SFW "general" category with
//! phone aspect ratios. The API works without a key; when one is set it is
//! passed as the `apikey` query parameter. Dimensions come back as a
//! `WIDTHxHEIGHT` resolution string; entries that fail to parse are skipped
//! rather than failing the whole query.

use super::{classify_status, WallpaperProvider};
use crate::error::ProviderError;
use crate::models::{WallpaperCandidate, WallpaperCategory, WallpaperSource};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://wallhaven.cc";

/// Portrait ratios common on phones
const MOBILE_RATIOS: &str = "9x16,10x16,9x18,9x19.5,9x20,9x21";

pub struct WallhavenProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl WallhavenProvider {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
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
impl WallpaperProvider for WallhavenProvider {
    fn source(&self) -> WallpaperSource {
        WallpaperSource::Wallhaven
    }

    async fn fetch(
        &self,
        category: WallpaperCategory,
        count: usize,
    ) -> Result<Vec<WallpaperCandidate>, ProviderError> {
        debug!(category = %category, count, "querying wallhaven");

        let mut request = self
            .client
            .get(format!("{}/api/v1/search", self.base_url))
            .query(&[
                ("q", category.query()),
                // general only, SFW only
                ("categories", "100"),
                ("purity", "100"),
                ("ratios", MOBILE_RATIOS),
                ("atleast", "1080x1920"),
                ("sorting", "favorites"),
                ("order", "desc"),
            ]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("apikey", key.as_str())]);
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        let candidates = candidates_from(body, count);
        if candidates.is_empty() {
            return Err(ProviderError::EmptyResult);
        }
        Ok(candidates)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Listing>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    id: String,
    path: String,
    #[serde(default)]
    resolution: String,
}

fn parse_resolution(resolution: &str) -> Option<(u32, u32)> {
    let (w, h) = resolution.split_once('x')?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}

fn candidates_from(body: SearchResponse, count: usize) -> Vec<WallpaperCandidate> {
    body.data
        .into_iter()
        .filter_map(|listing| {
            let Some((width, height)) = parse_resolution(&listing.resolution) else {
                debug!(id = %listing.id, resolution = %listing.resolution,
                       "skipping listing with unparseable resolution");
                return None;
            };
            Some(WallpaperCandidate {
                source: WallpaperSource::Wallhaven,
                external_id: listing.id,
                image_url: listing.path,
                width,
                height,
                description: String::new(),
                author: String::new(),
                tags: vec![],
            })
        })
        .take(count)
        .collect()
}
