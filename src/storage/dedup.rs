//! Duplicate filter
//!
//! The registry rejects candidates in two stages: a cheap
//! `source:external_id` key check before the image is downloaded, and a
//! SHA-256 content-hash check afterwards so identical bytes re-hosted
//! under a different id are still caught. Entries are never evicted; once
//! recorded, an image stays a duplicate for the lifetime of the data
//! directory.

use crate::models::{WallpaperCandidate, WallpaperSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One posted image, as persisted in `seen_images.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentRecord {
    /// `source:external_id`
    pub key: String,

    /// Image URL at posting time
    pub url: String,

    /// SHA-256 of the posted bytes, lowercase hex
    pub content_hash: String,

    /// Provider the image came from
    pub source: WallpaperSource,

    /// When it was posted
    pub sent_at: DateTime<Utc>,

    /// Category query that surfaced it
    pub query: String,

    /// Channel it was posted to
    pub channel_id: String,
}

impl SentRecord {
    pub fn new(
        candidate: &WallpaperCandidate,
        content_hash: String,
        query: &str,
        channel_id: &str,
    ) -> Self {
        Self {
            key: candidate.dedup_key(),
            url: candidate.image_url.clone(),
            content_hash,
            source: candidate.source,
            sent_at: Utc::now(),
            query: query.to_string(),
            channel_id: channel_id.to_string(),
        }
    }
}

/// In-memory view of everything ever posted
#[derive(Debug, Default)]
pub struct SeenRegistry {
    records: Vec<SentRecord>,
    keys: HashSet<String>,
    hashes: HashSet<String>,
}

impl SeenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the registry from persisted records
    pub fn from_records(records: Vec<SentRecord>) -> Self {
        let keys = records.iter().map(|r| r.key.clone()).collect();
        let hashes = records.iter().map(|r| r.content_hash.clone()).collect();
        Self {
            records,
            keys,
            hashes,
        }
    }

    /// Pre-download check against the `source:external_id` key
    pub fn is_duplicate(&self, candidate: &WallpaperCandidate) -> bool {
        self.keys.contains(&candidate.dedup_key())
    }

    /// Post-download check against the content hash
    pub fn contains_hash(&self, hash: &str) -> bool {
        self.hashes.contains(hash)
    }

    /// Record a posted image; both key and hash become duplicates
    pub fn record(&mut self, record: SentRecord) {
        self.keys.insert(record.key.clone());
        self.hashes.insert(record.content_hash.clone());
        self.records.push(record);
    }

    /// Full record list for persistence
    pub fn records(&self) -> &[SentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
