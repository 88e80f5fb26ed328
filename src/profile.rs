//! Local Profile Persistence
//!
//! Best score, lifetime coins, guest identity and settings. Called from
//! game-over handling, never from inside a tick.

use std::path::{Path, PathBuf};
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Generate a fresh guest id (`guest_<uuid>`).
pub fn new_guest_id() -> String {
    format!("guest_{}", Uuid::new_v4())
}

/// Audio and input settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Background music on
    pub music_enabled: bool,
    /// Sound effects on
    pub sfx_enabled: bool,
    /// Swipe sensitivity multiplier
    pub sensitivity: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            music_enabled: true,
            sfx_enabled: true,
            sensitivity: 1.0,
        }
    }
}

/// Everything stored on the local device.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalData {
    /// Best score ever reached
    pub high_score: u32,
    /// Coins collected over all runs
    pub total_coins: u64,
    /// Identity used for leaderboard submissions without an account
    pub guest_id: String,
    /// Display name chosen by a guest
    pub guest_username: Option<String>,
    /// Settings
    pub settings: Settings,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            high_score: 0,
            total_coins: 0,
            guest_id: new_guest_id(),
            guest_username: None,
            settings: Settings::default(),
        }
    }
}

impl LocalData {
    /// Raise the high score. Returns `true` if `score` is a new best.
    pub fn update_high_score(&mut self, score: u32) -> bool {
        if score > self.high_score {
            self.high_score = score;
            true
        } else {
            false
        }
    }

    /// Add to the lifetime coin total.
    pub fn add_coins(&mut self, coins: u32) -> u64 {
        self.total_coins = self.total_coins.saturating_add(coins as u64);
        self.total_coins
    }
}

/// Persistence errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Writing the profile failed.
    #[error("failed to write profile: {0}")]
    Io(#[from] std::io::Error),
    /// Profile could not be encoded.
    #[error("failed to encode profile: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Persistence collaborator for game-over handling.
pub trait ScoreStore: Send {
    /// Best score stored so far.
    fn load_best_score(&self) -> u32;

    /// Store `score` if it beats the best. Returns `true` on a new best.
    fn save_best_score(&mut self, score: u32) -> Result<bool, StoreError>;

    /// Add coins to the lifetime total and return the new total.
    fn add_coins(&mut self, coins: u32) -> Result<u64, StoreError>;

    /// Full profile.
    fn local_data(&self) -> &LocalData;

    /// Replace the settings.
    fn save_settings(&mut self, settings: Settings) -> Result<(), StoreError>;
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

/// Profile that lives only as long as the process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    data: LocalData,
}

impl MemoryStore {
    /// Create a store around existing data.
    pub fn new(data: LocalData) -> Self {
        Self { data }
    }
}

impl ScoreStore for MemoryStore {
    fn load_best_score(&self) -> u32 {
        self.data.high_score
    }

    fn save_best_score(&mut self, score: u32) -> Result<bool, StoreError> {
        Ok(self.data.update_high_score(score))
    }

    fn add_coins(&mut self, coins: u32) -> Result<u64, StoreError> {
        Ok(self.data.add_coins(coins))
    }

    fn local_data(&self) -> &LocalData {
        &self.data
    }

    fn save_settings(&mut self, settings: Settings) -> Result<(), StoreError> {
        self.data.settings = settings;
        Ok(())
    }
}

// =============================================================================
// JSON FILE STORE
// =============================================================================

/// Profile kept in a JSON file, rewritten on every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    data: LocalData,
}

impl JsonFileStore {
    /// Open the profile at `path`.
    ///
    /// A missing file starts a fresh profile. An unreadable or corrupt file
    /// is logged and also replaced by a fresh profile on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match std::fs::read_to_string(&path) {
            Ok(json) => match serde_json::from_str::<LocalData>(&json) {
                Ok(data) => data,
                Err(e) => {
                    warn!("Corrupt profile at {}, using defaults: {}", path.display(), e);
                    LocalData::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No profile at {}, starting fresh", path.display());
                LocalData::default()
            }
            Err(e) => {
                warn!("Failed to read profile at {}, using defaults: {}", path.display(), e);
                LocalData::default()
            }
        };

        Self { path, data }
    }

    /// File backing this store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.data)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl ScoreStore for JsonFileStore {
    fn load_best_score(&self) -> u32 {
        self.data.high_score
    }

    fn save_best_score(&mut self, score: u32) -> Result<bool, StoreError> {
        let improved = self.data.update_high_score(score);
        if improved {
            self.persist()?;
        }
        Ok(improved)
    }

    fn add_coins(&mut self, coins: u32) -> Result<u64, StoreError> {
        let total = self.data.add_coins(coins);
        if coins > 0 {
            self.persist()?;
        }
        Ok(total)
    }

    fn local_data(&self) -> &LocalData {
        &self.data
    }

    fn save_settings(&mut self, settings: Settings) -> Result<(), StoreError> {
        self.data.settings = settings;
        self.persist()
    }
}
