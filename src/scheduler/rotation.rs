//! Source rotation
//!
//! Cycles through the configured providers in a fixed order so no single
//! upstream carries every batch. The index is persisted so a restart picks
//! up where the previous process left off.

use crate::error::{Error, Result};
use crate::models::WallpaperSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted rotation position (`rotation.json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationState {
    pub current_index: usize,
    pub last_rotation: DateTime<Utc>,
}

impl Default for RotationState {
    fn default() -> Self {
        Self {
            current_index: 0,
            last_rotation: Utc::now(),
        }
    }
}

/// Round-robin iterator over the configured sources
#[derive(Debug)]
pub struct SourceRotator {
    sources: Vec<WallpaperSource>,
    index: usize,
    last_rotation: DateTime<Utc>,
}

impl SourceRotator {
    /// Build a rotator; an empty source list is a configuration error
    pub fn new(sources: Vec<WallpaperSource>) -> Result<Self> {
        if sources.is_empty() {
            return Err(Error::config("source rotation requires at least one source"));
        }
        Ok(Self {
            sources,
            index: 0,
            last_rotation: Utc::now(),
        })
    }

    /// Build a rotator resuming from a persisted state
    ///
    /// An out-of-range persisted index (the source list shrank) wraps back
    /// into range instead of failing.
    pub fn with_state(sources: Vec<WallpaperSource>, state: RotationState) -> Result<Self> {
        let mut rotator = Self::new(sources)?;
        rotator.index = state.current_index % rotator.sources.len();
        rotator.last_rotation = state.last_rotation;
        Ok(rotator)
    }

    /// The source the next call to [`next`](Self::next) will yield
    pub fn current(&self) -> WallpaperSource {
        self.sources[self.index]
    }

    /// The source after the current one, for status reports
    pub fn peek_next(&self) -> WallpaperSource {
        self.sources[(self.index + 1) % self.sources.len()]
    }

    /// Consume the current turn: return its source and advance
    pub fn next(&mut self) -> WallpaperSource {
        let source = self.sources[self.index];
        self.index = (self.index + 1) % self.sources.len();
        self.last_rotation = Utc::now();
        source
    }

    /// Snapshot for persistence
    pub fn state(&self) -> RotationState {
        RotationState {
            current_index: self.index,
            last_rotation: self.last_rotation,
        }
    }

    pub fn sources(&self) -> &[WallpaperSource] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use WallpaperSource::{Pexels, Unsplash, Wallhaven};

    #[test]
    fn test_empty_list_is_config_error() {
        assert!(SourceRotator::new(vec![]).is_err());
    }

    #[test]
    fn test_next_yields_then_advances() {
        let mut rotator = SourceRotator::new(vec![Pexels, Unsplash, Wallhaven]).expect("rotator");
        assert_eq!(rotator.next(), Pexels);
        assert_eq!(rotator.next(), Unsplash);
        assert_eq!(rotator.next(), Wallhaven);
        // wraps back to the start
        assert_eq!(rotator.next(), Pexels);
    }

    #[test]
    fn test_current_is_idempotent() {
        let mut rotator = SourceRotator::new(vec![Pexels, Unsplash]).expect("rotator");
        assert_eq!(rotator.current(), Pexels);
        assert_eq!(rotator.current(), Pexels);
        rotator.next();
        assert_eq!(rotator.current(), Unsplash);
        assert_eq!(rotator.peek_next(), Pexels);
    }

    #[test]
    fn test_single_source_always_yields_it() {
        let mut rotator = SourceRotator::new(vec![Unsplash]).expect("rotator");
        assert_eq!(rotator.next(), Unsplash);
        assert_eq!(rotator.next(), Unsplash);
        assert_eq!(rotator.current(), Unsplash);
    }

    #[test]
    fn test_state_roundtrip() {
        let mut rotator = SourceRotator::new(vec![Pexels, Unsplash, Wallhaven]).expect("rotator");
        rotator.next();
        rotator.next();

        let state = rotator.state();
        let resumed =
            SourceRotator::with_state(vec![Pexels, Unsplash, Wallhaven], state).expect("resume");
        assert_eq!(resumed.current(), Wallhaven);
    }

    #[test]
    fn test_stale_index_wraps_into_range() {
        let state = RotationState {
            current_index: 2,
            last_rotation: Utc::now(),
        };
        // source list shrank since the state was persisted
        let resumed = SourceRotator::with_state(vec![Pexels, Unsplash], state).expect("resume");
        assert_eq!(resumed.current(), Pexels);
    }

    proptest! {
        #[test]
        fn prop_rotation_cycles_with_list_period(advance in 0usize..100) {
            let sources = vec![Pexels, Unsplash, Wallhaven];
            let mut rotator = SourceRotator::new(sources.clone()).unwrap();

            for _ in 0..advance {
                rotator.next();
            }

            // after N advances the current source is sources[N mod len]
            prop_assert_eq!(rotator.current(), sources[advance % sources.len()]);
        }
    }
}
