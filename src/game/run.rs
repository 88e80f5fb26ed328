//! Run Loop
//!
//! Owns the player and the spawner and advances them once per frame:
//!
//! ```text
//! distance/speed -> spawner.advance -> player.advance -> collision -> effects
//! ```
//!
//! Nothing suspends mid-tick. Commands received between ticks are applied
//! in arrival order at the start of the player step.

use std::path::Path;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::hash::{StateHash, compute_state_hash};
use crate::game::collision::{self, CollisionConfig};
use crate::game::events::RunEvent;
use crate::game::input::{Command, CommandQueue, InputRecording};
use crate::game::player::{Player, PlayerConfig, PlayerPose};
use crate::game::spawner::{Coin, Obstacle, SpawnConfig, Spawner};

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV_VAR: &str = "RUNNER_CONFIG";

/// Smallest accepted distance between spawn rolls.
pub const MIN_SPAWN_INTERVAL: f32 = 0.5;

// =============================================================================
// CONFIG
// =============================================================================

/// Configuration for a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Speed at the start of a run (units per second)
    pub initial_speed: f32,
    /// Speed cap
    pub max_speed: f32,
    /// Speed gained per second
    pub acceleration: f32,
    /// Score bonus per coin
    pub coin_value: u32,
    /// Player movement
    pub player: PlayerConfig,
    /// Spawning
    pub spawn: SpawnConfig,
    /// Collision thresholds
    pub collision: CollisionConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            initial_speed: 10.0,
            max_speed: 30.0,
            acceleration: 0.1,
            coin_value: 10,
            player: PlayerConfig::default(),
            spawn: SpawnConfig::default(),
            collision: CollisionConfig::default(),
        }
    }
}

/// Config loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// Config file is not valid JSON for `RunConfig`.
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    /// Values parse but make no sense together.
    #[error("invalid value: {0}")]
    Invalid(String),
}

impl RunConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Load from the file named by `RUNNER_CONFIG`, or use defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.is_empty() => {
                info!("Loading run config from {}", path);
                Self::from_json_file(path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.initial_speed >= 0.0 && self.max_speed >= self.initial_speed) {
            return Err(ConfigError::Invalid(format!(
                "speed range {}..{} is empty",
                self.initial_speed, self.max_speed
            )));
        }

        let durations = [
            ("lane_switch_duration", self.player.lane_switch_duration),
            ("jump_duration", self.player.jump_duration),
            ("slide_duration", self.player.slide_duration),
        ];
        for (name, value) in durations {
            if !(value > 0.0) {
                return Err(ConfigError::Invalid(format!("{} must be positive", name)));
            }
        }

        let spawn = &self.spawn;
        if !(spawn.spawn_interval >= MIN_SPAWN_INTERVAL)
            || spawn.initial_frontier - spawn.spawn_interval == spawn.initial_frontier
        {
            return Err(ConfigError::Invalid(format!(
                "spawn_interval must be at least {}",
                MIN_SPAWN_INTERVAL
            )));
        }
        if !(spawn.segment_length > 0.0) || spawn.lookahead_segments == 0 {
            return Err(ConfigError::Invalid("look-ahead window is empty".into()));
        }
        if !(spawn.coin_spacing >= 0.0) || !(spawn.despawn_margin >= 0.0) {
            return Err(ConfigError::Invalid(
                "coin_spacing and despawn_margin must not be negative".into(),
            ));
        }

        let chances = [
            ("obstacle_chance", spawn.obstacle_chance),
            ("coin_chance", spawn.coin_chance),
            ("escort_coin_chance", spawn.escort_coin_chance),
        ];
        for (name, value) in chances {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!("{} must be within 0..=1", name)));
            }
        }
        if spawn.obstacle_chance + spawn.coin_chance > 1.0 {
            return Err(ConfigError::Invalid(
                "obstacle_chance + coin_chance must not exceed 1".into(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// RUN STATE
// =============================================================================

/// Phase of the run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RunPhase {
    /// Main menu, nothing simulated
    #[default]
    Menu = 0,
    /// Ticking
    Playing = 1,
    /// Frozen mid-run
    Paused = 2,
    /// Player hit an obstacle or quit
    GameOver = 3,
}

/// Distance, speed and score of the current run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunProgress {
    /// Distance traveled
    pub distance: f32,
    /// Current speed
    pub speed: f32,
    /// Distance score plus coin bonuses
    pub score: u32,
    /// Coins picked up
    pub coins: u32,
}

impl RunProgress {
    /// Fresh progress at `initial_speed`.
    pub fn new(initial_speed: f32) -> Self {
        Self {
            distance: 0.0,
            speed: initial_speed,
            score: 0,
            coins: 0,
        }
    }
}

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick
    pub events: Vec<RunEvent>,
    /// Whether the run ended this tick
    pub run_ended: bool,
}

/// Everything the view layer needs to draw one frame.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSnapshot {
    /// Tick the snapshot was taken after
    pub tick: u32,
    /// Run phase
    pub phase: RunPhase,
    /// Distance, speed, score and coins
    pub progress: RunProgress,
    /// Player pose
    pub pose: PlayerPose,
    /// Player's forward offset (`-distance`)
    pub player_offset: f32,
    /// Live obstacles
    pub obstacles: Vec<Obstacle>,
    /// Live coins
    pub coins: Vec<Coin>,
}

// =============================================================================
// RUN LOOP
// =============================================================================

/// The per-frame orchestrator.
pub struct RunLoop {
    config: RunConfig,
    phase: RunPhase,
    progress: RunProgress,
    tick: u32,
    player: Player,
    spawner: Spawner,
    commands: CommandQueue,
    recording: Option<InputRecording>,
    runs_started: u32,
    events: Vec<RunEvent>,
}

impl RunLoop {
    /// Create a run loop with an unpredictable spawn source.
    pub fn new(config: RunConfig) -> Self {
        let spawner = Spawner::new(config.spawn.clone());
        Self::with_spawner(config, spawner)
    }

    /// Create a run loop whose track is fixed by `seed`.
    pub fn with_seed(config: RunConfig, seed: u64) -> Self {
        let spawner = Spawner::with_seed(config.spawn.clone(), seed);
        Self::with_spawner(config, spawner)
    }

    fn with_spawner(config: RunConfig, spawner: Spawner) -> Self {
        Self {
            progress: RunProgress::new(config.initial_speed),
            player: Player::new(config.player.clone()),
            config,
            phase: RunPhase::Menu,
            tick: 0,
            spawner,
            commands: CommandQueue::new(),
            recording: None,
            runs_started: 0,
            events: Vec::new(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Run config.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Current phase.
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Current progress.
    pub fn progress(&self) -> &RunProgress {
        &self.progress
    }

    /// Ticks simulated in this run.
    pub fn tick_count(&self) -> u32 {
        self.tick
    }

    /// The player.
    pub fn player(&self) -> &Player {
        &self.player
    }

    /// The spawner.
    pub fn spawner(&self) -> &Spawner {
        &self.spawner
    }

    /// Player's forward offset.
    #[inline]
    pub fn player_offset(&self) -> f32 {
        -self.progress.distance
    }

    // =========================================================================
    // Phase transitions
    // =========================================================================

    /// Start a fresh run from the menu or after game over.
    ///
    /// Returns `false` (and changes nothing) from any other phase.
    pub fn start_run(&mut self) -> bool {
        if !matches!(self.phase, RunPhase::Menu | RunPhase::GameOver) {
            debug!("start_run ignored in {:?}", self.phase);
            return false;
        }

        self.progress = RunProgress::new(self.config.initial_speed);
        self.tick = 0;
        self.player.reset();
        self.commands.clear();

        // A recording covers one run, so every later run gets its own seed.
        if let Some(tick_dt) = self.recording.as_ref().map(|r| r.tick_dt) {
            if self.runs_started > 0 {
                let seed = self.spawner.next_seed();
                self.spawner.reseed(seed);
            } else {
                self.spawner.reset();
            }
            self.recording = Some(InputRecording::new(self.spawner.seed(), tick_dt));
        } else {
            self.spawner.reset();
        }
        self.runs_started += 1;

        info!("Run started (seed {})", self.spawner.seed());
        self.set_phase(RunPhase::Playing);
        true
    }

    /// Freeze a playing run.
    pub fn pause_run(&mut self) -> bool {
        self.transition(RunPhase::Playing, RunPhase::Paused)
    }

    /// Continue a paused run exactly where it stopped.
    pub fn resume_run(&mut self) -> bool {
        self.transition(RunPhase::Paused, RunPhase::Playing)
    }

    /// End a playing or paused run without a collision.
    pub fn end_run(&mut self) -> bool {
        if !matches!(self.phase, RunPhase::Playing | RunPhase::Paused) {
            debug!("end_run ignored in {:?}", self.phase);
            return false;
        }

        info!(
            "Run ended by request at distance {:.1}, score {}",
            self.progress.distance, self.progress.score
        );
        self.set_phase(RunPhase::GameOver);
        true
    }

    /// Leave the game-over screen for the menu, clearing the track.
    pub fn return_to_menu(&mut self) -> bool {
        if !self.transition(RunPhase::GameOver, RunPhase::Menu) {
            return false;
        }
        self.progress = RunProgress::new(self.config.initial_speed);
        self.player.reset();
        self.spawner.reset();
        self.commands.clear();
        true
    }

    fn transition(&mut self, from: RunPhase, to: RunPhase) -> bool {
        if self.phase != from {
            debug!("{:?} -> {:?} ignored in {:?}", from, to, self.phase);
            return false;
        }
        self.set_phase(to);
        true
    }

    fn set_phase(&mut self, to: RunPhase) {
        let from = self.phase;
        self.phase = to;
        self.events.push(RunEvent::phase_changed(self.tick, from, to));
    }

    // =========================================================================
    // Input
    // =========================================================================

    /// Queue a command for the next tick.
    ///
    /// Input only counts while playing; returns `false` when dropped.
    pub fn queue_command(&mut self, command: Command) -> bool {
        if self.phase != RunPhase::Playing {
            return false;
        }
        self.commands.push(command);
        true
    }

    /// Record every applied command from now on.
    ///
    /// A recording holds the current run only. Each `start_run` restarts it,
    /// and runs after the first are reseeded so the recorded seed reproduces
    /// them. Enable it before `start_run`.
    pub fn enable_recording(&mut self, tick_dt: f32) {
        self.recording = Some(InputRecording::new(self.spawner.seed(), tick_dt));
    }

    /// Stop recording and hand the recording over.
    pub fn take_recording(&mut self) -> Option<InputRecording> {
        let mut recording = self.recording.take()?;
        recording.finalize(self.tick);
        Some(recording)
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Advance the run by `dt` seconds.
    ///
    /// Does nothing unless playing. `dt` must be finite and non-negative.
    pub fn tick(&mut self, dt: f32) -> TickResult {
        let mut result = TickResult::default();

        if self.phase != RunPhase::Playing {
            result.events = self.take_events();
            return result;
        }

        self.tick += 1;

        // 1. Distance and distance score
        let before = self.progress.distance;
        self.progress.distance += self.progress.speed * dt;
        let crossed = self.progress.distance.floor() - before.floor();
        self.progress.score = self.progress.score.saturating_add(crossed as u32);

        // 2. Speed up
        if self.progress.speed < self.config.max_speed {
            self.progress.speed =
                (self.progress.speed + self.config.acceleration * dt).min(self.config.max_speed);
            if self.progress.speed >= self.config.max_speed {
                self.events.push(RunEvent::max_speed_reached(self.tick, self.progress.speed));
            }
        }

        // 3. Spawn ahead, despawn behind
        let player_offset = self.player_offset();
        self.spawner.advance(player_offset);

        // 4. Player commands and animation
        for command in self.commands.drain() {
            if let Some(recording) = self.recording.as_mut() {
                recording.record(self.tick, command);
            }
            self.player.apply(command);
        }
        self.player.advance(dt);

        #[cfg(feature = "debug-tracing")]
        tracing::trace!(
            tick = self.tick,
            distance = self.progress.distance,
            speed = self.progress.speed,
            "tick"
        );

        // 5. Collision
        let pose = self.player.pose();
        let outcome = collision::resolve(
            self.spawner.obstacles(),
            self.spawner.coins(),
            &pose,
            player_offset,
            self.config.player.radius,
            &self.config.collision,
        );

        if let Some(obstacle) = outcome.hit {
            // 6. Game over
            info!(
                "Hit {:?} obstacle in {:?} lane at distance {:.1}, score {}",
                obstacle.kind, obstacle.lane, self.progress.distance, self.progress.score
            );
            self.events.push(RunEvent::obstacle_hit(
                self.tick,
                obstacle.id,
                obstacle.kind,
                obstacle.lane,
                self.progress.distance,
            ));
            self.set_phase(RunPhase::GameOver);
            result.run_ended = true;
        } else {
            // 7. Coins
            for coin_id in outcome.collected {
                if self.spawner.remove_coin(coin_id).is_some() {
                    self.progress.coins += 1;
                    self.progress.score = self.progress.score.saturating_add(self.config.coin_value);
                    self.events.push(RunEvent::coin_collected(
                        self.tick,
                        coin_id,
                        self.progress.coins,
                        self.progress.score,
                    ));
                }
            }
        }

        result.events = self.take_events();
        result
    }

    /// Take events generated since the last tick.
    pub fn take_events(&mut self) -> Vec<RunEvent> {
        std::mem::take(&mut self.events)
    }

    // =========================================================================
    // Publishing
    // =========================================================================

    /// Snapshot for rendering.
    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            tick: self.tick,
            phase: self.phase,
            progress: self.progress.clone(),
            pose: self.player.pose(),
            player_offset: self.player_offset(),
            obstacles: self.spawner.obstacles().to_vec(),
            coins: self.spawner.coins().to_vec(),
        }
    }

    /// Hash of the simulation state, for replay verification.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.tick, self.spawner.seed(), |h| {
            h.update_u8(self.phase as u8);
            h.update_f32(self.progress.distance);
            h.update_f32(self.progress.speed);
            h.update_u32(self.progress.score);
            h.update_u32(self.progress.coins);

            let pose = self.player.pose();
            h.update_u8(pose.lane as u8);
            h.update_f32(pose.lateral_position);
            h.update_f32(pose.elevation);
            h.update_bool(pose.is_jumping);
            h.update_bool(pose.is_sliding);

            h.update_f32(self.spawner.frontier());
            h.update_u32(self.spawner.obstacles().len() as u32);
            for o in self.spawner.obstacles() {
                h.update_u32(o.id.0);
                h.update_u8(o.lane as u8);
                h.update_u8(o.kind as u8);
                h.update_f32(o.forward_offset);
            }
            h.update_u32(self.spawner.coins().len() as u32);
            for c in self.spawner.coins() {
                h.update_u32(c.id.0);
                h.update_u8(c.lane as u8);
                h.update_f32(c.forward_offset);
            }
        })
    }
}

/// Replay a recorded run from its seed.
///
/// Returns the final loop and every event produced.
pub fn replay_run(config: RunConfig, recording: &InputRecording) -> (RunLoop, Vec<RunEvent>) {
    let mut run = RunLoop::with_seed(config, recording.rng_seed);
    run.start_run();
    let mut all_events = run.take_events();

    for (_, commands) in recording.replay_iter() {
        for timed in commands {
            run.queue_command(timed.command);
        }

        let result = run.tick(recording.tick_dt);
        all_events.extend(result.events);

        if result.run_ended {
            break;
        }
    }

    (run, all_events)
}
