//! High Score Persistence
//!
//! The session only needs two operations: read the best score and offer a
//! new one. Stores keep the maximum ever offered.

use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, info};

/// High score store errors.
#[derive(Debug, Error)]
pub enum HighScoreError {
    /// File could not be read or written.
    #[error("high score file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// File exists but is not a high score document.
    #[error("high score file is malformed: {0}")]
    Format(#[from] serde_json::Error),
}

/// Persists the single best score.
pub trait HighScoreStore: Send {
    /// Best score recorded so far (0 if none).
    fn best(&self) -> u64;

    /// Offer a finished run's score. Keeps the maximum.
    ///
    /// Returns true if `score` is a new best.
    fn update_high_score(&mut self, score: u64) -> Result<bool, HighScoreError>;
}

/// In-memory store; forgets everything on drop.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryHighScore {
    best: u64,
}

impl MemoryHighScore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store starting from a known best.
    pub fn with_best(best: u64) -> Self {
        Self { best }
    }
}

impl HighScoreStore for MemoryHighScore {
    fn best(&self) -> u64 {
        self.best
    }

    fn update_high_score(&mut self, score: u64) -> Result<bool, HighScoreError> {
        if score > self.best {
            self.best = score;
            return Ok(true);
        }
        Ok(false)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HighScoreFile {
    high_score: u64,
}

/// Store backed by a small JSON file: `{ "high_score": n }`.
#[derive(Clone, Debug)]
pub struct FileHighScore {
    path: PathBuf,
    best: u64,
}

impl FileHighScore {
    /// Open a store at `path`. A missing file counts as a best of 0.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, HighScoreError> {
        let path = path.as_ref().to_path_buf();
        let best = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str::<HighScoreFile>(&text)?.high_score,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No high score file at {}, starting from 0", path.display());
                0
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, best })
    }

    /// File location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, high_score: u64) -> Result<(), HighScoreError> {
        let json = serde_json::to_string_pretty(&HighScoreFile { high_score })?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl HighScoreStore for FileHighScore {
    fn best(&self) -> u64 {
        self.best
    }

    fn update_high_score(&mut self, score: u64) -> Result<bool, HighScoreError> {
        if score <= self.best {
            return Ok(false);
        }
        // Only a saved score becomes the best
        self.save(score)?;
        self.best = score;
        info!("New high score {} saved to {}", score, self.path.display());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "lane-runner-{}-{}.json",
            name,
            uuid::Uuid::new_v4()
        ))
    }

    #[test]
    fn test_memory_store_is_monotone_max() {
        let mut store = MemoryHighScore::new();
        assert_eq!(store.best(), 0);
        assert!(store.update_high_score(10).unwrap());
        assert!(!store.update_high_score(4).unwrap());
        assert!(!store.update_high_score(10).unwrap());
        assert_eq!(store.best(), 10);
        assert!(MemoryHighScore::with_best(7).update_high_score(8).unwrap());
    }

    #[test]
    fn test_file_store_missing_file_is_zero() {
        let path = temp_path("missing");
        let store = FileHighScore::open(&path).unwrap();
        assert_eq!(store.best(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn test_file_store_persists() {
        let path = temp_path("persist");
        {
            let mut store = FileHighScore::open(&path).unwrap();
            assert!(store.update_high_score(42).unwrap());
            assert!(!store.update_high_score(41).unwrap());
        }

        let reopened = FileHighScore::open(&path).unwrap();
        assert_eq!(reopened.best(), 42);

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["high_score"], 42);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_failed_save_keeps_previous_best() {
        let dir = std::env::temp_dir().join(format!("lane-runner-gone-{}", uuid::Uuid::new_v4()));
        let path = dir.join("scores.json");
        let mut store = FileHighScore::open(&path).unwrap();
        assert_eq!(store.path(), path.as_path());

        assert!(matches!(store.update_high_score(10), Err(HighScoreError::Io(_))));
        assert_eq!(store.best(), 0);

        // Retried once the directory exists
        std::fs::create_dir_all(&dir).unwrap();
        assert!(store.update_high_score(10).unwrap());
        assert_eq!(FileHighScore::open(&path).unwrap().best(), 10);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_file_store_rejects_garbage() {
        let path = temp_path("garbage");
        std::fs::write(&path, "not a score").unwrap();
        assert!(matches!(FileHighScore::open(&path), Err(HighScoreError::Format(_))));
        std::fs::remove_file(&path).unwrap();
    }
}
