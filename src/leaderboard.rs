//! Leaderboard Collaborator
//!
//! Score submission after game over and top-N queries. One best entry is
//! kept per identity; a submission only replaces it when the score is
//! higher.

use std::collections::BTreeMap;
use std::future::Future;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::game::run::RunProgress;

/// Version stamped on every submission.
pub const RUN_VERSION: &str = "1.0.0";

/// Platform stamped on every submission.
pub const PLATFORM: &str = "native";

/// Default number of entries returned by a top fetch.
pub const DEFAULT_TOP_LIMIT: usize = 50;

/// Who a score belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlayerIdentity {
    /// Signed-in account
    User {
        /// Account id
        user_id: String,
        /// Display name
        username: Option<String>,
    },
    /// Local guest profile
    Guest {
        /// `guest_<uuid>` from the local profile
        guest_id: String,
        /// Display name
        username: Option<String>,
    },
}

impl PlayerIdentity {
    /// Key the leaderboard stores the best entry under.
    pub fn key(&self) -> &str {
        match self {
            PlayerIdentity::User { user_id, .. } => user_id,
            PlayerIdentity::Guest { guest_id, .. } => guest_id,
        }
    }

    /// Display name, if any.
    pub fn username(&self) -> Option<&str> {
        match self {
            PlayerIdentity::User { username, .. } | PlayerIdentity::Guest { username, .. } => {
                username.as_deref()
            }
        }
    }
}

/// Payload sent once a run is over.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreSubmission {
    /// Owner of the score
    pub identity: PlayerIdentity,
    /// Final score
    pub score: u32,
    /// Final distance
    pub distance: f32,
    /// Coins collected in the run
    pub coins: u32,
    /// Client run version
    pub run_version: String,
    /// Client platform
    pub platform: String,
}

impl ScoreSubmission {
    /// Build a submission from the final progress of a run.
    pub fn from_progress(identity: PlayerIdentity, progress: &RunProgress) -> Self {
        Self {
            identity,
            score: progress.score,
            distance: progress.distance,
            coins: progress.coins,
            run_version: RUN_VERSION.to_string(),
            platform: PLATFORM.to_string(),
        }
    }

    fn validate(&self) -> Result<(), LeaderboardError> {
        if self.identity.key().is_empty() {
            return Err(LeaderboardError::InvalidSubmission("empty identity".into()));
        }
        if !(self.distance.is_finite() && self.distance >= 0.0) {
            return Err(LeaderboardError::InvalidSubmission(format!(
                "distance {} out of range",
                self.distance
            )));
        }
        Ok(())
    }
}

/// A player's best run on the board.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Identity key (user id or guest id)
    pub player_key: String,
    /// Display name
    pub username: Option<String>,
    /// Best score
    pub best_score: u32,
    /// Distance of the best run
    pub best_distance: f32,
    /// Coins of the best run
    pub coins: u32,
    /// Version of the best run
    pub run_version: String,
    /// Platform of the best run
    pub platform: String,
    /// First submission
    pub created_at: DateTime<Utc>,
    /// Last time the best was replaced
    pub updated_at: DateTime<Utc>,
}

/// Result of a submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// First entry for this identity
    Created,
    /// Replaced a lower best
    Improved,
    /// Existing best was at least as high; nothing changed
    Kept,
}

/// Leaderboard errors.
#[derive(Debug, Error)]
pub enum LeaderboardError {
    /// Submission failed validation.
    #[error("invalid submission: {0}")]
    InvalidSubmission(String),
    /// Submissions are only accepted once the run is over.
    #[error("run is not over")]
    RunNotOver,
    /// Backend could not be reached.
    #[error("leaderboard unavailable: {0}")]
    Unavailable(String),
}

/// Network collaborator. Only called after a run ended.
pub trait Leaderboard: Send + Sync {
    /// Submit a run; kept only if it beats the identity's best.
    fn submit_best_score(
        &self,
        submission: ScoreSubmission,
    ) -> impl Future<Output = Result<SubmitOutcome, LeaderboardError>> + Send;

    /// Best entries, highest score first.
    fn fetch_top(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<LeaderboardEntry>, LeaderboardError>> + Send;

    /// Best entry of one identity.
    fn player_best(
        &self,
        player_key: &str,
    ) -> impl Future<Output = Result<Option<LeaderboardEntry>, LeaderboardError>> + Send;
}

// =============================================================================
// IN-PROCESS LEADERBOARD
// =============================================================================

/// Leaderboard held in memory.
#[derive(Debug, Default)]
pub struct InMemoryLeaderboard {
    entries: RwLock<BTreeMap<String, LeaderboardEntry>>,
}

impl InMemoryLeaderboard {
    /// Create an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of identities on the board.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Check if the board is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Leaderboard for InMemoryLeaderboard {
    async fn submit_best_score(
        &self,
        submission: ScoreSubmission,
    ) -> Result<SubmitOutcome, LeaderboardError> {
        submission.validate()?;

        let now = Utc::now();
        let key = submission.identity.key().to_string();
        let mut entries = self.entries.write().await;

        let outcome = match entries.get_mut(&key) {
            Some(entry) if submission.score <= entry.best_score => SubmitOutcome::Kept,
            Some(entry) => {
                entry.username = submission.identity.username().map(str::to_string);
                entry.best_score = submission.score;
                entry.best_distance = submission.distance;
                entry.coins = submission.coins;
                entry.run_version = submission.run_version;
                entry.platform = submission.platform;
                entry.updated_at = now;
                SubmitOutcome::Improved
            }
            None => {
                entries.insert(
                    key.clone(),
                    LeaderboardEntry {
                        player_key: key.clone(),
                        username: submission.identity.username().map(str::to_string),
                        best_score: submission.score,
                        best_distance: submission.distance,
                        coins: submission.coins,
                        run_version: submission.run_version,
                        platform: submission.platform,
                        created_at: now,
                        updated_at: now,
                    },
                );
                SubmitOutcome::Created
            }
        };

        match outcome {
            SubmitOutcome::Kept => debug!("Submission for {} below best, kept", key),
            _ => info!("Leaderboard {:?} for {}", outcome, key),
        }
        Ok(outcome)
    }

    async fn fetch_top(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        let entries = self.entries.read().await;
        let mut top: Vec<_> = entries.values().cloned().collect();
        // ties: earlier best first
        top.sort_by(|a, b| {
            b.best_score
                .cmp(&a.best_score)
                .then(a.updated_at.cmp(&b.updated_at))
        });
        top.truncate(limit);
        Ok(top)
    }

    async fn player_best(
        &self,
        player_key: &str,
    ) -> Result<Option<LeaderboardEntry>, LeaderboardError> {
        Ok(self.entries.read().await.get(player_key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guest(id: &str) -> PlayerIdentity {
        PlayerIdentity::Guest {
            guest_id: id.to_string(),
            username: Some(format!("{}-name", id)),
        }
    }

    fn submission(id: &str, score: u32) -> ScoreSubmission {
        let progress = RunProgress {
            distance: score as f32,
            speed: 12.0,
            score,
            coins: score / 10,
        };
        ScoreSubmission::from_progress(guest(id), &progress)
    }

    #[test]
    fn test_submission_stamps_version() {
        let sub = submission("guest_a", 100);
        assert_eq!(sub.run_version, "1.0.0");
        assert_eq!(sub.platform, PLATFORM);
        assert_eq!(sub.coins, 10);
    }

    #[test]
    fn test_identity_serializes_tagged() {
        let json = serde_json::to_value(guest("guest_a")).unwrap();
        assert_eq!(json["kind"], "guest");
        assert_eq!(json["guest_id"], "guest_a");
    }

    #[tokio::test]
    async fn test_upsert_keeps_best() {
        let board = InMemoryLeaderboard::new();

        assert_eq!(board.submit_best_score(submission("guest_a", 100)).await.unwrap(), SubmitOutcome::Created);
        assert_eq!(board.submit_best_score(submission("guest_a", 50)).await.unwrap(), SubmitOutcome::Kept);
        assert_eq!(board.submit_best_score(submission("guest_a", 100)).await.unwrap(), SubmitOutcome::Kept);
        assert_eq!(board.submit_best_score(submission("guest_a", 150)).await.unwrap(), SubmitOutcome::Improved);

        let best = board.player_best("guest_a").await.unwrap().unwrap();
        assert_eq!(best.best_score, 150);
        assert!(best.updated_at >= best.created_at);
        assert_eq!(board.len().await, 1);
    }

    #[tokio::test]
    async fn test_fetch_top_orders_and_limits() {
        let board = InMemoryLeaderboard::new();
        for (id, score) in [("a", 30), ("b", 90), ("c", 60), ("d", 10)] {
            board.submit_best_score(submission(id, score)).await.unwrap();
        }

        let top = board.fetch_top(3).await.unwrap();
        let scores: Vec<_> = top.iter().map(|e| e.best_score).collect();
        assert_eq!(scores, vec![90, 60, 30]);

        let all = board.fetch_top(DEFAULT_TOP_LIMIT).await.unwrap();
        assert_eq!(all.len(), 4);
    }

    #[tokio::test]
    async fn test_unknown_player_has_no_best() {
        let board = InMemoryLeaderboard::new();
        assert!(board.player_best("nobody").await.unwrap().is_none());
        assert!(board.is_empty().await);
    }

    #[tokio::test]
    async fn test_rejects_invalid_submission() {
        let board = InMemoryLeaderboard::new();

        let empty = submission("", 10);
        assert!(matches!(
            board.submit_best_score(empty).await,
            Err(LeaderboardError::InvalidSubmission(_))
        ));

        let mut bad_distance = submission("guest_a", 10);
        bad_distance.distance = f32::NAN;
        assert!(board.submit_best_score(bad_distance).await.is_err());
        assert!(board.is_empty().await);
    }
}
