//! tapet: scheduled mobile-wallpaper posting bot for Telegram
//!
//! Periodically fetches portrait wallpapers from rotating photo providers
//! (Pexels, Unsplash, Wallhaven), filters duplicates and unsuitable
//! images, and posts batches to a channel on a timer under admin command
//! control.

pub mod batch;
pub mod bot;
pub mod config;
pub mod downloader;
pub mod error;
pub mod models;
pub mod providers;
pub mod scheduler;
pub mod storage;
pub mod utils;

pub use error::{Error, Result};

/// Commonly used types
pub mod prelude {
    pub use crate::batch::{BatchSettings, CycleRunner};
    pub use crate::bot::{BotState, Poster, TelegramPoster};
    pub use crate::config::Config;
    pub use crate::downloader::ImageDownloader;
    pub use crate::error::{Error, ErrorClass, Result};
    pub use crate::models::{
        CycleOutcome, CycleResult, WallpaperCandidate, WallpaperCategory, WallpaperSource,
    };
    pub use crate::providers::WallpaperProvider;
    pub use crate::scheduler::{RunState, SchedulerHandle, SourceRotator};
    pub use crate::storage::{BotStats, JsonStore, SeenRegistry, SentRecord, StatsTracker};
    pub use crate::utils::RetryConfig;
}
