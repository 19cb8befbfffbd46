//! Persistent state
//!
//! All bot state lives in three small JSON files under the data directory:
//! `stats.json`, `seen_images.json` and `rotation.json`. Writes go through
//! a temp file followed by a rename so a crash mid-write never leaves a
//! truncated record behind.

pub mod dedup;
pub mod stats;

pub use dedup::{SeenRegistry, SentRecord};
pub use stats::{BotStats, StatsTracker};

use crate::error::{Error, Result};
use crate::scheduler::RotationState;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const STATS_FILE: &str = "stats.json";
const SEEN_FILE: &str = "seen_images.json";
const ROTATION_FILE: &str = "rotation.json";

/// File-backed JSON store for bot state
#[derive(Debug, Clone)]
pub struct JsonStore {
    data_dir: PathBuf,
}

impl JsonStore {
    /// Open a store rooted at `data_dir`, creating the directory if needed
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir).map_err(|e| {
            Error::persistence(format!(
                "cannot create data directory {}: {e}",
                data_dir.display()
            ))
        })?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn load_stats(&self) -> Result<BotStats> {
        self.read_or_default(STATS_FILE)
    }

    pub fn save_stats(&self, stats: &BotStats) -> Result<()> {
        self.write(STATS_FILE, stats)
    }

    pub fn load_seen(&self) -> Result<Vec<SentRecord>> {
        self.read_or_default(SEEN_FILE)
    }

    pub fn save_seen(&self, records: &[SentRecord]) -> Result<()> {
        self.write(SEEN_FILE, &records)
    }

    pub fn load_rotation(&self) -> Result<RotationState> {
        self.read_or_default(ROTATION_FILE)
    }

    pub fn save_rotation(&self, state: &RotationState) -> Result<()> {
        self.write(ROTATION_FILE, state)
    }

    /// Read a JSON file, returning the default value when it does not exist
    fn read_or_default<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T> {
        let path = self.data_dir.join(name);
        if !path.exists() {
            debug!(file = name, "state file absent, starting fresh");
            return Ok(T::default());
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| Error::persistence(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::persistence(format!("corrupt state file {}: {e}", path.display())))
    }

    /// Write a JSON file atomically (temp file + rename)
    fn write<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.data_dir.join(name);
        let tmp = self.data_dir.join(format!("{name}.tmp"));

        let content = serde_json::to_string_pretty(value)?;
        fs::write(&tmp, content)
            .map_err(|e| Error::persistence(format!("cannot write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &path)
            .map_err(|e| Error::persistence(format!("cannot replace {}: {e}", path.display())))?;

        debug!(file = name, "state file written");
        Ok(())
    }
}
