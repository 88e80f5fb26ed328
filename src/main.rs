//! Subway Runner Simulation
//!
//! Headless driver: plays a seeded run with a simple autopilot, handles
//! game over against a local profile and an in-process leaderboard, then
//! verifies the run by replaying its recording.

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use subway_runner::{
    TICK_RATE, VERSION,
    game::{
        events::RunEventData,
        input::Command,
        run::{replay_run, RunConfig, RunLoop},
        spawner::ObstacleKind,
    },
    leaderboard::{Leaderboard, DEFAULT_TOP_LIMIT},
    InMemoryLeaderboard, JsonFileStore, Lane, RunSession, ScoreStore,
};

/// Ten minutes of play at most.
const MAX_TICKS: u32 = TICK_RATE * 600;

/// How far ahead the autopilot looks.
const LOOKAHEAD: f32 = 6.0;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("Subway Runner Sim v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);

    let config = RunConfig::from_env().context("failed to load run config")?;
    let seed = match std::env::var("RUNNER_SEED") {
        Ok(s) => s.parse::<u64>().context("RUNNER_SEED must be an integer")?,
        Err(_) => 12345,
    };

    let profile_path = std::env::var("RUNNER_PROFILE")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir().join("subway-runner-sim").join("profile.json"));
    let store = JsonFileStore::open(&profile_path);
    info!("Profile: {} (best {})", profile_path.display(), store.local_data().high_score);

    demo_run(config, seed, store).await
}

/// Play one autopiloted run and verify it.
async fn demo_run(config: RunConfig, seed: u64, store: JsonFileStore) -> anyhow::Result<()> {
    info!("=== Starting Demo Run ===");
    info!("RNG Seed: {}", seed);

    let dt = 1.0 / TICK_RATE as f32;
    let mut run = RunLoop::with_seed(config.clone(), seed);
    run.enable_recording(dt);
    let mut session = RunSession::new(run, store);
    session.start_run();

    let mut last_report = 0;
    for t in 0..MAX_TICKS {
        if let Some(command) = autopilot(session.run()) {
            session.queue_command(command);
        }

        let result = session.tick(dt);

        for event in &result.events {
            match &event.data {
                RunEventData::MaxSpeedReached { speed } => {
                    info!("Max speed {:.1} reached at tick {}", speed, event.tick);
                }
                RunEventData::ObstacleHit { kind, lane, distance, .. } => {
                    info!("Hit {:?} in {:?} lane at {:.1}", kind, lane, distance);
                }
                _ => {}
            }
        }

        if t - last_report >= TICK_RATE * 10 {
            let progress = session.run().progress();
            info!(
                "Tick {}: distance {:.0}, speed {:.1}, score {}, coins {}",
                t, progress.distance, progress.speed, progress.score, progress.coins
            );
            last_report = t;
        }

        if result.run_ended {
            break;
        }
    }

    // Bot survived the whole budget
    session.end_run();

    info!("=== Run Results ===");
    if let Some(summary) = session.last_game_over() {
        info!(
            "Score {} | distance {:.1} | coins {} | best {}{}",
            summary.score,
            summary.distance,
            summary.coins,
            summary.best_score,
            if summary.new_best { " (new best)" } else { "" }
        );
    }

    let leaderboard = InMemoryLeaderboard::new();
    match session.submit_score(&leaderboard).await {
        Ok(outcome) => info!("Submitted: {:?}", outcome),
        Err(e) => warn!("Submission failed: {}", e),
    }
    for (rank, entry) in leaderboard.fetch_top(DEFAULT_TOP_LIMIT).await?.iter().enumerate() {
        info!("#{}: {} - {}", rank + 1, entry.player_key, entry.best_score);
    }

    // Verify determinism by replaying
    info!("=== Verifying Replay ===");
    let hash = session.run().compute_hash();
    info!("Final State Hash: {}", hex::encode(hash));

    let mut run = session.into_run();
    let recording = run.take_recording().context("recording was not enabled")?;
    info!("Recorded {} commands over {} ticks", recording.commands().len(), recording.end_tick);

    let (replayed, _) = replay_run(config, &recording);
    let replay_hash = replayed.compute_hash();
    info!("Replay State Hash: {}", hex::encode(replay_hash));

    if hash == replay_hash {
        info!("REPLAY VERIFIED: Hashes match!");
    } else {
        warn!("REPLAY MISMATCH: Hashes differ!");
    }

    Ok(())
}

/// Pick a command for the nearest obstacle ahead in the current lane.
fn autopilot(run: &RunLoop) -> Option<Command> {
    let player = run.player();
    let offset = run.player_offset();
    let lane = player.lane();

    let threat = run
        .spawner()
        .obstacles()
        .iter()
        .filter(|o| o.lane == lane && o.forward_offset < offset && o.forward_offset > offset - LOOKAHEAD)
        .max_by(|a, b| a.forward_offset.total_cmp(&b.forward_offset))?;

    match threat.kind {
        ObstacleKind::Jump if !player.is_jumping() => Some(Command::Jump),
        ObstacleKind::Slide if !player.is_sliding() => Some(Command::Slide),
        ObstacleKind::Block => {
            let blocked = |candidate: Lane| {
                run.spawner().obstacles().iter().any(|o| {
                    o.lane == candidate
                        && (o.forward_offset - threat.forward_offset).abs() < LOOKAHEAD
                })
            };
            match (lane.left(), lane.right()) {
                (Some(left), _) if !blocked(left) => Some(Command::MoveLeft),
                (_, Some(right)) if !blocked(right) => Some(Command::MoveRight),
                _ => None,
            }
        }
        _ => None,
    }
}
