//! Rate-limited image downloader
//!
//! Fetches image bytes into memory (images are posted straight from
//! memory, never written to disk) and hashes them for duplicate detection.
//! A direct governor limiter paces downloads so image hosts are not
//! hammered when a batch is assembled.

use crate::error::DownloadError;
use bytes::Bytes;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::header::CONTENT_TYPE;
use sha2::{Digest, Sha256};
use std::num::NonZeroU32;
use tracing::debug;

pub struct ImageDownloader {
    client: reqwest::Client,
    limiter: DefaultDirectRateLimiter,
}

impl ImageDownloader {
    pub fn new(client: reqwest::Client, downloads_per_second: u32) -> Self {
        let rate = NonZeroU32::new(downloads_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            client,
            limiter: RateLimiter::direct(Quota::per_second(rate)),
        }
    }

    /// Download image bytes from `url`
    ///
    /// Validates the HTTP status, that the response claims an `image/*`
    /// content type, and that the body is non-empty. No decoding is done.
    pub async fn fetch(&self, url: &str) -> Result<Bytes, DownloadError> {
        self.limiter.until_ready().await;

        debug!(url, "downloading image");
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.starts_with("image/") {
            return Err(DownloadError::InvalidContentType(content_type));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(DownloadError::Empty);
        }

        debug!(url, size = bytes.len(), "image downloaded");
        Ok(bytes)
    }
}

/// SHA-256 of the image bytes as lowercase hex
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex_known_vector() {
        // sha256("abc")
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_sha256_hex_distinguishes_content() {
        assert_ne!(sha256_hex(b"image-a"), sha256_hex(b"image-b"));
        assert_eq!(sha256_hex(b"image-a"), sha256_hex(b"image-a"));
    }

    #[test]
    fn test_zero_rate_clamps_to_one() {
        // must not panic on a degenerate rate
        let client = reqwest::Client::new();
        let _ = ImageDownloader::new(client, 0);
    }
}
