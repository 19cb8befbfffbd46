//! Core data structures and types
//!
//! This module defines the domain model shared across the crate:
//! wallpaper sources and categories, fetched candidates, and the
//! per-cycle result record.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

// ============================================================================
// Wallpaper Source
// ============================================================================

/// Supported wallpaper providers, in rotation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WallpaperSource {
    /// Pexels photo API
    Pexels,
    /// Unsplash photo API
    Unsplash,
    /// Wallhaven wallpaper API
    Wallhaven,
}

impl WallpaperSource {
    /// Get all sources in rotation order
    pub fn all() -> Vec<Self> {
        vec![Self::Pexels, Self::Unsplash, Self::Wallhaven]
    }

    /// Get source ID as string
    pub fn id(&self) -> &'static str {
        match self {
            Self::Pexels => "pexels",
            Self::Unsplash => "unsplash",
            Self::Wallhaven => "wallhaven",
        }
    }

    /// Get display name for status reports
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pexels => "Pexels",
            Self::Unsplash => "Unsplash",
            Self::Wallhaven => "Wallhaven",
        }
    }

    /// Try to parse from string
    pub fn from_id(id: &str) -> Option<Self> {
        match id.to_lowercase().as_str() {
            "pexels" => Some(Self::Pexels),
            "unsplash" => Some(Self::Unsplash),
            "wallhaven" => Some(Self::Wallhaven),
            _ => None,
        }
    }
}

impl fmt::Display for WallpaperSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for WallpaperSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_id(s).ok_or_else(|| format!("unknown wallpaper source: {s}"))
    }
}

// ============================================================================
// Wallpaper Category
// ============================================================================

/// Curated wallpaper categories used as provider search queries
///
/// The list is restricted to subjects unlikely to trip the content filter
/// (no people, animals, or text-heavy imagery).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WallpaperCategory {
    Nature,
    Landscape,
    Mountains,
    Forest,
    Ocean,
    Water,
    Sky,
    Clouds,
    Sunset,
    Beach,
    Abstract,
    Minimal,
    Geometric,
    Gradient,
    Patterns,
    Textures,
    Space,
    Galaxy,
    Winter,
    Autumn,
    Crystals,
    Glass,
    Metal,
    Wood,
    Stone,
    Dark,
    Night,
    Fire,
    Lightning,
    Architecture,
    Technology,
    Futuristic,
    Neon,
    DigitalArt,
}

impl WallpaperCategory {
    /// Get all categories
    pub fn all() -> Vec<Self> {
        vec![
            Self::Nature,
            Self::Landscape,
            Self::Mountains,
            Self::Forest,
            Self::Ocean,
            Self::Water,
            Self::Sky,
            Self::Clouds,
            Self::Sunset,
            Self::Beach,
            Self::Abstract,
            Self::Minimal,
            Self::Geometric,
            Self::Gradient,
            Self::Patterns,
            Self::Textures,
            Self::Space,
            Self::Galaxy,
            Self::Winter,
            Self::Autumn,
            Self::Crystals,
            Self::Glass,
            Self::Metal,
            Self::Wood,
            Self::Stone,
            Self::Dark,
            Self::Night,
            Self::Fire,
            Self::Lightning,
            Self::Architecture,
            Self::Technology,
            Self::Futuristic,
            Self::Neon,
            Self::DigitalArt,
        ]
    }

    /// Get the search query term for this category
    pub fn query(&self) -> &'static str {
        match self {
            Self::Nature => "nature",
            Self::Landscape => "landscape",
            Self::Mountains => "mountains",
            Self::Forest => "forest",
            Self::Ocean => "ocean",
            Self::Water => "water",
            Self::Sky => "sky",
            Self::Clouds => "clouds",
            Self::Sunset => "sunset",
            Self::Beach => "beach",
            Self::Abstract => "abstract",
            Self::Minimal => "minimal",
            Self::Geometric => "geometric",
            Self::Gradient => "gradient",
            Self::Patterns => "patterns",
            Self::Textures => "textures",
            Self::Space => "space",
            Self::Galaxy => "galaxy",
            Self::Winter => "winter",
            Self::Autumn => "autumn",
            Self::Crystals => "crystals",
            Self::Glass => "glass",
            Self::Metal => "metal",
            Self::Wood => "wood",
            Self::Stone => "stone",
            Self::Dark => "dark",
            Self::Night => "night",
            Self::Fire => "fire",
            Self::Lightning => "lightning",
            Self::Architecture => "architecture",
            Self::Technology => "technology",
            Self::Futuristic => "futuristic",
            Self::Neon => "neon",
            Self::DigitalArt => "digital art",
        }
    }

    /// Get a descriptive caption line for the category, if one exists
    pub fn description(&self) -> Option<&'static str> {
        match self {
            Self::Nature => Some("Beautiful nature photography"),
            Self::Abstract => Some("Modern abstract art design"),
            Self::Space => Some("Stunning cosmic imagery"),
            Self::Minimal => Some("Clean minimalist design"),
            Self::Sunset => Some("Breathtaking sunset views"),
            Self::Mountains => Some("Majestic mountain landscapes"),
            Self::Ocean => Some("Serene ocean scenes"),
            Self::Landscape => Some("Stunning landscape photography"),
            Self::Forest => Some("Peaceful forest scenes"),
            Self::Galaxy => Some("Amazing galaxy and nebula views"),
            Self::Geometric => Some("Clean geometric patterns"),
            Self::Gradient => Some("Smooth gradient backgrounds"),
            _ => None,
        }
    }

    /// Get a hashtag-safe tag for the category
    pub fn hashtag(&self) -> String {
        self.query().replace([' ', '-', '_'], "")
    }

    /// Pick a random category
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        Self::all().choose(&mut rng).copied().unwrap_or(Self::Nature)
    }
}

impl fmt::Display for WallpaperCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.query())
    }
}

// ============================================================================
// Wallpaper Candidate
// ============================================================================

/// Keywords that disqualify a candidate when they appear in its metadata
const EXCLUDED_KEYWORDS: &[&str] = &[
    // Human subjects
    "person", "people", "human", "man", "woman", "girl", "boy", "face",
    "portrait", "model", "selfie", "crowd", "children",
    // Body parts
    "hand", "hands", "eye", "eyes", "body", "finger", "fingers",
    // Common animals
    "dog", "cat", "bird", "horse", "cow", "pig", "sheep",
    // Religious content
    "church", "temple", "mosque", "cross", "jesus", "buddha",
    // Text-heavy imagery
    "text", "writing", "letter", "letters", "sign", "signage", "billboard",
    "poster", "graffiti",
    // Adult content
    "nude", "naked", "sexy", "bikini", "lingerie",
    // Violence
    "violence", "blood", "weapon", "gun", "knife", "fight",
];

fn excluded_keyword_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let joined = EXCLUDED_KEYWORDS
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(r"(?i)\b(?:{joined})\b")).expect("keyword regex is valid")
    })
}

fn non_latin_script_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Hiragana, Katakana, CJK, Hebrew, Arabic ranges
        Regex::new(
            "[\u{3040}-\u{309F}\u{30A0}-\u{30FF}\u{4E00}-\u{9FFF}\u{0590}-\u{05FF}\u{0600}-\u{06FF}]",
        )
        .expect("script regex is valid")
    })
}

/// An image returned by a provider query, not yet accepted into a batch
///
/// Immutable once fetched. The content hash is computed after download and
/// lives in the seen registry, not on the candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallpaperCandidate {
    /// Which provider returned this candidate
    pub source: WallpaperSource,

    /// Provider-assigned identifier
    pub external_id: String,

    /// Direct URL to the image bytes
    pub image_url: String,

    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Provider description or alt text
    #[serde(default)]
    pub description: String,

    /// Photographer or community attribution
    #[serde(default)]
    pub author: String,

    /// Provider tags, when available
    #[serde(default)]
    pub tags: Vec<String>,
}

impl WallpaperCandidate {
    /// Deduplication key combining source and provider id
    pub fn dedup_key(&self) -> String {
        format!("{}:{}", self.source.id(), self.external_id)
    }

    /// Height-to-width ratio (0.0 for degenerate widths)
    pub fn aspect_ratio(&self) -> f64 {
        if self.width == 0 {
            return 0.0;
        }
        f64::from(self.height) / f64::from(self.width)
    }

    /// Check the portrait constraint: strictly taller than wide and at
    /// least `min_height` pixels tall
    pub fn is_portrait(&self, min_height: u32) -> bool {
        self.height > self.width && self.height >= min_height
    }

    /// Check that the image URL parses as an http(s) URL
    pub fn has_valid_url(&self) -> bool {
        match url::Url::parse(&self.image_url) {
            Ok(u) => matches!(u.scheme(), "http" | "https"),
            Err(_) => false,
        }
    }

    /// Check the candidate's metadata against the exclusion keyword list
    /// and non-Latin script ranges
    pub fn contains_excluded_content(&self) -> bool {
        let mut text = String::new();
        text.push_str(&self.description);
        text.push(' ');
        text.push_str(&self.author);
        for tag in &self.tags {
            text.push(' ');
            text.push_str(tag);
        }

        excluded_keyword_regex().is_match(&text) || non_latin_script_regex().is_match(&text)
    }
}

// ============================================================================
// Cycle Result
// ============================================================================

/// Whether a posting cycle ran to completion or failed outright
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleOutcome {
    /// The provider query succeeded; a short or even empty batch still
    /// counts as success
    Success,
    /// The provider query and the single fallback source both failed
    Failed,
}

/// Record of one posting cycle, fed into stats
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleResult {
    /// Number of candidates the provider returned
    pub attempted: usize,

    /// Number of images actually posted
    pub sent: usize,

    /// Number of accepted images that failed to download or send
    pub failed: usize,

    /// Source used for this cycle
    pub source: WallpaperSource,

    /// When the cycle finished
    pub timestamp: DateTime<Utc>,

    /// Success or failure classification
    pub outcome: CycleOutcome,
}

impl CycleResult {
    /// Create a failed-cycle record with zero sent images
    pub fn failed(source: WallpaperSource) -> Self {
        Self {
            attempted: 0,
            sent: 0,
            failed: 0,
            source,
            timestamp: Utc::now(),
            outcome: CycleOutcome::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == CycleOutcome::Success
    }
}

// ============================================================================
// Tests
// ============================================================================
