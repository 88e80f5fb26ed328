//! Run Session
//!
//! Wraps a [`RunLoop`] with its game-over handling: recording the best
//! score, accruing lifetime coins and building the leaderboard submission.
//! The simulation never calls out; the session reacts to the run ending.

use serde::{Serialize, Deserialize};
use tracing::{info, warn};

use crate::game::events::RunEvent;
use crate::game::input::Command;
use crate::game::run::{RunLoop, RunPhase, TickResult};
use crate::leaderboard::{Leaderboard, LeaderboardError, PlayerIdentity, ScoreSubmission, SubmitOutcome};
use crate::profile::ScoreStore;

/// What happened when a run ended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameOverSummary {
    /// Final score
    pub score: u32,
    /// Final distance
    pub distance: f32,
    /// Coins collected in the run
    pub coins: u32,
    /// Stored best after this run
    pub best_score: u32,
    /// This run set a new best
    pub new_best: bool,
    /// Lifetime coins after this run
    pub total_coins: u64,
    /// Persistence failure, if any
    pub store_error: Option<String>,
}

/// A run loop plus its persistence collaborator.
pub struct RunSession<S: ScoreStore> {
    run: RunLoop,
    store: S,
    user: Option<PlayerIdentity>,
    game_over_handled: bool,
    last_game_over: Option<GameOverSummary>,
}

impl<S: ScoreStore> RunSession<S> {
    /// Create a session.
    pub fn new(run: RunLoop, store: S) -> Self {
        Self {
            run,
            store,
            user: None,
            game_over_handled: false,
            last_game_over: None,
        }
    }

    /// The run loop.
    pub fn run(&self) -> &RunLoop {
        &self.run
    }

    /// Give up the session, keeping the run loop.
    pub fn into_run(self) -> RunLoop {
        self.run
    }

    /// The profile store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Summary of the most recent game over.
    pub fn last_game_over(&self) -> Option<&GameOverSummary> {
        self.last_game_over.as_ref()
    }

    /// Submit future scores under a signed-in account.
    pub fn sign_in(&mut self, user_id: impl Into<String>, username: Option<String>) {
        self.user = Some(PlayerIdentity::User {
            user_id: user_id.into(),
            username,
        });
    }

    /// Go back to submitting as the local guest.
    pub fn sign_out(&mut self) {
        self.user = None;
    }

    /// Identity scores are submitted under.
    pub fn identity(&self) -> PlayerIdentity {
        match &self.user {
            Some(user) => user.clone(),
            None => {
                let data = self.store.local_data();
                PlayerIdentity::Guest {
                    guest_id: data.guest_id.clone(),
                    username: data.guest_username.clone(),
                }
            }
        }
    }

    // =========================================================================
    // Triggers
    // =========================================================================

    /// Start a run. See [`RunLoop::start_run`].
    pub fn start_run(&mut self) -> bool {
        let started = self.run.start_run();
        if started {
            self.game_over_handled = false;
            self.last_game_over = None;
        }
        started
    }

    /// Pause the run.
    pub fn pause_run(&mut self) -> bool {
        self.run.pause_run()
    }

    /// Resume the run.
    pub fn resume_run(&mut self) -> bool {
        self.run.resume_run()
    }

    /// End the run and handle game over.
    pub fn end_run(&mut self) -> bool {
        let ended = self.run.end_run();
        if ended {
            self.handle_game_over();
        }
        ended
    }

    /// Back to the menu.
    pub fn return_to_menu(&mut self) -> bool {
        self.run.return_to_menu()
    }

    /// Queue a command. See [`RunLoop::queue_command`].
    pub fn queue_command(&mut self, command: Command) -> bool {
        self.run.queue_command(command)
    }

    /// Tick the run, handling game over if it ended.
    pub fn tick(&mut self, dt: f32) -> TickResult {
        let result = self.run.tick(dt);
        if result.run_ended {
            self.handle_game_over();
        }
        result
    }

    /// Events generated outside a tick (phase changes from triggers).
    pub fn take_events(&mut self) -> Vec<RunEvent> {
        self.run.take_events()
    }

    // =========================================================================
    // Game over
    // =========================================================================

    // Runs at most once per run.
    fn handle_game_over(&mut self) {
        if self.game_over_handled || self.run.phase() != RunPhase::GameOver {
            return;
        }
        self.game_over_handled = true;

        let progress = self.run.progress().clone();
        let mut store_error = None;

        let new_best = match self.store.save_best_score(progress.score) {
            Ok(new_best) => new_best,
            Err(e) => {
                warn!("Failed to save best score: {}", e);
                store_error = Some(e.to_string());
                false
            }
        };

        if let Err(e) = self.store.add_coins(progress.coins) {
            warn!("Failed to store coins: {}", e);
            store_error.get_or_insert_with(|| e.to_string());
        }

        let data = self.store.local_data();
        let summary = GameOverSummary {
            score: progress.score,
            distance: progress.distance,
            coins: progress.coins,
            best_score: data.high_score.max(progress.score),
            new_best,
            total_coins: data.total_coins,
            store_error,
        };

        info!(
            "Game over: score {} distance {:.1} coins {}{}",
            summary.score,
            summary.distance,
            summary.coins,
            if summary.new_best { " (new best)" } else { "" }
        );
        self.last_game_over = Some(summary);
    }

    /// Submission for the finished run. `None` until the run is over.
    pub fn submission(&self) -> Option<ScoreSubmission> {
        if self.run.phase() != RunPhase::GameOver {
            return None;
        }
        Some(ScoreSubmission::from_progress(self.identity(), self.run.progress()))
    }

    /// Submit the finished run.
    ///
    /// Failures are logged and returned; the run is left untouched.
    pub async fn submit_score<L: Leaderboard>(
        &self,
        leaderboard: &L,
    ) -> Result<SubmitOutcome, LeaderboardError> {
        let submission = self.submission().ok_or(LeaderboardError::RunNotOver)?;
        let result = leaderboard.submit_best_score(submission).await;
        if let Err(e) = &result {
            warn!("Score submission failed: {}", e);
        }
        result
    }
}
