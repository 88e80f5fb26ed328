//! Player State Machine
//!
//! Two independent axes:
//!
//! - **Lane**: idle or transitioning toward a target lane
//! - **Vertical**: grounded, jumping or sliding
//!
//! The vertical axis is a single enum, so jumping and sliding can never be
//! active together. A jump requested mid-slide (or a slide mid-jump) goes
//! into a one-slot buffer and fires when the current action ends.

use std::f32::consts::PI;
use serde::{Serialize, Deserialize};
use tracing::trace;

use crate::core::lane::Lane;
use crate::game::input::{BufferedAction, Command};

/// Movement tuning for the player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Time to finish a lane change (seconds)
    pub lane_switch_duration: f32,
    /// Time a jump lasts (seconds)
    pub jump_duration: f32,
    /// Peak height of the jump arc
    pub jump_height: f32,
    /// Time a slide lasts (seconds)
    pub slide_duration: f32,
    /// Standing body height
    pub height: f32,
    /// Body radius
    pub radius: f32,
    /// Body height while sliding
    pub slide_height: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            lane_switch_duration: 0.15,
            jump_duration: 0.6,
            jump_height: 1.5,
            slide_duration: 0.6,
            height: 1.8,
            radius: 0.4,
            slide_height: 0.6,
        }
    }
}

/// Vertical axis state.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[derive(Default)]
pub enum VerticalState {
    /// On the ground at standing height
    #[default]
    Grounded,
    /// In the air; progress in [0, 1)
    Jumping { progress: f32 },
    /// Compressed to slide height; progress in [0, 1)
    Sliding { progress: f32 },
}

/// Read-only snapshot of the player, rebuilt every tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerPose {
    /// Target lane
    pub lane: Lane,
    /// 1.0 once the lane change has finished
    pub lane_progress: f32,
    /// Interpolated lateral position
    pub lateral_position: f32,
    /// Currently jumping
    pub is_jumping: bool,
    /// Jump progress (0 when not jumping)
    pub jump_progress: f32,
    /// Currently sliding
    pub is_sliding: bool,
    /// Slide progress (0 when not sliding)
    pub slide_progress: f32,
    /// Height of the feet above the track
    pub elevation: f32,
    /// Height of the body center above the track
    pub vertical_position: f32,
    /// Effective body height (standing or slide-compressed)
    pub body_height: f32,
    /// Pending vertical action, if any
    pub buffered: Option<BufferedAction>,
}

impl PlayerPose {
    /// Vertical extent of the body as `(bottom, top)`.
    ///
    /// Grounded `[0, height]`, jumping `[elevation, elevation + height]`,
    /// sliding `[0, slide_height]`.
    #[inline]
    pub fn body_span(&self) -> (f32, f32) {
        (self.elevation, self.elevation + self.body_height)
    }
}

/// The player: lane, jump and slide state plus the input buffer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    config: PlayerConfig,
    lane: Lane,
    /// Lateral position the current lane change started from
    lane_start: f32,
    lane_progress: f32,
    vertical: VerticalState,
    elevation: f32,
    buffered: Option<BufferedAction>,
}

impl Player {
    /// Create a player in the center lane, grounded.
    pub fn new(config: PlayerConfig) -> Self {
        Self {
            config,
            lane: Lane::Center,
            lane_start: Lane::Center.offset(),
            lane_progress: 1.0,
            vertical: VerticalState::Grounded,
            elevation: 0.0,
            buffered: None,
        }
    }

    /// Return to the initial state, keeping the config.
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    /// Movement config.
    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Target lane.
    pub fn lane(&self) -> Lane {
        self.lane
    }

    /// Vertical axis state.
    pub fn vertical(&self) -> VerticalState {
        self.vertical
    }

    /// Pending vertical action.
    pub fn buffered(&self) -> Option<BufferedAction> {
        self.buffered
    }

    /// Check if jumping.
    #[inline]
    pub fn is_jumping(&self) -> bool {
        matches!(self.vertical, VerticalState::Jumping { .. })
    }

    /// Check if sliding.
    #[inline]
    pub fn is_sliding(&self) -> bool {
        matches!(self.vertical, VerticalState::Sliding { .. })
    }

    /// Current lateral position, eased between start and target lane.
    pub fn lateral_position(&self) -> f32 {
        let end = self.lane.offset();
        self.lane_start + (end - self.lane_start) * ease_out_quad(self.lane_progress)
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Apply one command.
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::MoveLeft => self.move_left(),
            Command::MoveRight => self.move_right(),
            Command::Jump => self.jump(),
            Command::Slide => self.slide(),
        }
    }

    /// Step one lane left. No-op in the leftmost lane.
    pub fn move_left(&mut self) {
        if let Some(next) = self.lane.left() {
            self.begin_lane_change(next);
        }
    }

    /// Step one lane right. No-op in the rightmost lane.
    pub fn move_right(&mut self) {
        if let Some(next) = self.lane.right() {
            self.begin_lane_change(next);
        }
    }

    /// Start a jump, or buffer it while sliding.
    pub fn jump(&mut self) {
        match self.vertical {
            VerticalState::Sliding { .. } => self.buffered = Some(BufferedAction::Jump),
            VerticalState::Jumping { .. } => {}
            VerticalState::Grounded => self.start_jump(),
        }
    }

    /// Start a slide, or buffer it while jumping.
    pub fn slide(&mut self) {
        match self.vertical {
            VerticalState::Jumping { .. } => self.buffered = Some(BufferedAction::Slide),
            VerticalState::Sliding { .. } => {}
            VerticalState::Grounded => self.start_slide(),
        }
    }

    // A new change starts from wherever the body currently is, so
    // reversing mid-transition never snaps.
    fn begin_lane_change(&mut self, target: Lane) {
        self.lane_start = self.lateral_position();
        self.lane = target;
        self.lane_progress = 0.0;
    }

    fn start_jump(&mut self) {
        self.vertical = VerticalState::Jumping { progress: 0.0 };
        self.elevation = 0.0;
    }

    fn start_slide(&mut self) {
        self.vertical = VerticalState::Sliding { progress: 0.0 };
        self.elevation = 0.0;
    }

    // =========================================================================
    // Animation
    // =========================================================================

    /// Advance lane, jump and slide animation by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        if self.lane_progress < 1.0 {
            self.lane_progress = (self.lane_progress + dt / self.config.lane_switch_duration).min(1.0);
        }

        match self.vertical {
            VerticalState::Grounded => {}
            VerticalState::Jumping { progress } => {
                let progress = progress + dt / self.config.jump_duration;
                if progress >= 1.0 {
                    self.vertical = VerticalState::Grounded;
                    self.elevation = 0.0;

                    if self.buffered == Some(BufferedAction::Slide) {
                        trace!("replaying buffered slide");
                        self.buffered = None;
                        self.start_slide();
                    }
                } else {
                    self.vertical = VerticalState::Jumping { progress };
                    self.elevation = (progress * PI).sin() * self.config.jump_height;
                }
            }
            VerticalState::Sliding { progress } => {
                let progress = progress + dt / self.config.slide_duration;
                if progress >= 1.0 {
                    self.vertical = VerticalState::Grounded;

                    if self.buffered == Some(BufferedAction::Jump) {
                        trace!("replaying buffered jump");
                        self.buffered = None;
                        self.start_jump();
                    }
                } else {
                    self.vertical = VerticalState::Sliding { progress };
                }
            }
        }
    }

    /// Snapshot of the current pose.
    pub fn pose(&self) -> PlayerPose {
        let (jump_progress, slide_progress) = match self.vertical {
            VerticalState::Grounded => (0.0, 0.0),
            VerticalState::Jumping { progress } => (progress, 0.0),
            VerticalState::Sliding { progress } => (0.0, progress),
        };

        let body_height = if self.is_sliding() {
            self.config.slide_height
        } else {
            self.config.height
        };

        PlayerPose {
            lane: self.lane,
            lane_progress: self.lane_progress,
            lateral_position: self.lateral_position(),
            is_jumping: self.is_jumping(),
            jump_progress,
            is_sliding: self.is_sliding(),
            slide_progress,
            elevation: self.elevation,
            vertical_position: self.elevation + body_height / 2.0,
            body_height,
            buffered: self.buffered,
        }
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new(PlayerConfig::default())
    }
}

/// Quadratic ease-out.
#[inline]
fn ease_out_quad(t: f32) -> f32 {
    t * (2.0 - t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DT: f32 = 1.0 / 60.0;

    fn run_for(player: &mut Player, seconds: f32) {
        let steps = (seconds / DT).ceil() as u32;
        for _ in 0..steps {
            player.advance(DT);
        }
    }

    #[test]
    fn test_initial_state() {
        let pose = Player::default().pose();
        assert_eq!(pose.lane, Lane::Center);
        assert_eq!(pose.lane_progress, 1.0);
        assert!(!pose.is_jumping && !pose.is_sliding);
        assert_eq!(pose.vertical_position, 0.9);
        assert!(pose.buffered.is_none());
    }

    #[test]
    fn test_move_at_boundary_is_noop() {
        let mut player = Player::default();
        player.move_left();
        run_for(&mut player, 0.2);
        let before = player.pose();

        player.move_left();
        assert_eq!(player.pose(), before);

        let mut player = Player::default();
        player.move_right();
        run_for(&mut player, 0.2);
        let before = player.pose();

        player.move_right();
        assert_eq!(player.pose(), before);
    }

    #[test]
    fn test_lane_change_eases_to_target() {
        let mut player = Player::default();
        player.move_right();
        assert_eq!(player.pose().lane_progress, 0.0);
        assert_eq!(player.lateral_position(), 0.0);

        player.advance(0.075);
        // halfway in time, ease-out puts us at 75% of the distance
        assert!((player.lateral_position() - 1.5).abs() < 1e-4);

        player.advance(0.1);
        assert_eq!(player.pose().lane_progress, 1.0);
        assert_eq!(player.lateral_position(), 2.0);
    }

    #[test]
    fn test_lane_change_restarts_from_current_position() {
        let mut player = Player::default();
        player.move_right();
        player.advance(0.075);
        let mid = player.lateral_position();

        player.move_left();
        assert_eq!(player.lane(), Lane::Center);
        assert_eq!(player.lateral_position(), mid);

        run_for(&mut player, 0.2);
        assert_eq!(player.lateral_position(), 0.0);
    }

    #[test]
    fn test_lane_change_ignores_vertical_state() {
        let mut player = Player::default();
        player.jump();
        player.advance(DT);
        player.move_left();
        assert_eq!(player.lane(), Lane::Left);
        assert!(player.is_jumping());
        assert!(player.buffered().is_none());
    }

    #[test]
    fn test_jump_arc() {
        let mut player = Player::default();
        player.jump();
        assert!(player.is_jumping());

        player.advance(0.3);
        let pose = player.pose();
        assert!((pose.elevation - 1.5).abs() < 1e-4, "peak at midpoint");
        assert!((pose.vertical_position - (0.9 + 1.5)).abs() < 1e-4);

        player.advance(0.3);
        let pose = player.pose();
        assert!(!pose.is_jumping);
        assert_eq!(pose.elevation, 0.0);
        assert_eq!(pose.vertical_position, 0.9);
    }

    #[test]
    fn test_jump_while_jumping_is_noop() {
        let mut player = Player::default();
        player.jump();
        player.advance(0.2);
        let before = player.pose();
        player.jump();
        assert_eq!(player.pose(), before);
    }

    #[test]
    fn test_slide_compresses_body() {
        let mut player = Player::default();
        player.slide();
        player.advance(DT);
        let pose = player.pose();
        assert!(pose.is_sliding);
        assert_eq!(pose.body_height, 0.6);
        assert!((pose.vertical_position - 0.3).abs() < 1e-6);
        assert_eq!(pose.body_span(), (0.0, 0.6));

        run_for(&mut player, 0.6);
        let pose = player.pose();
        assert!(!pose.is_sliding);
        assert_eq!(pose.body_height, 1.8);
    }

    #[test]
    fn test_jump_during_slide_is_buffered_once() {
        let mut player = Player::default();
        player.slide();
        player.advance(0.1);

        player.jump();
        assert!(player.is_sliding());
        assert_eq!(player.buffered(), Some(BufferedAction::Jump));

        // slide ends on this step and the buffered jump starts
        player.advance(0.6);
        assert!(player.is_jumping());
        assert!(player.buffered().is_none());

        // after the replayed jump, nothing else fires
        run_for(&mut player, 0.7);
        assert_eq!(player.vertical(), VerticalState::Grounded);
    }

    #[test]
    fn test_slide_during_jump_is_buffered() {
        let mut player = Player::default();
        player.jump();
        player.advance(0.1);
        player.slide();
        assert_eq!(player.buffered(), Some(BufferedAction::Slide));

        player.advance(0.6);
        assert!(player.is_sliding());
        assert_eq!(player.pose().slide_progress, 0.0);
        assert!(player.buffered().is_none());
    }

    #[test]
    fn test_repeated_buffering_overwrites() {
        let mut player = Player::default();
        player.slide();
        player.jump();
        player.jump();
        assert_eq!(player.buffered(), Some(BufferedAction::Jump));

        player.advance(0.6);
        assert!(player.is_jumping());
        run_for(&mut player, 0.7);
        assert!(!player.is_jumping() && !player.is_sliding());
    }

    #[test]
    fn test_reset() {
        let mut player = Player::default();
        player.move_left();
        player.slide();
        player.jump();
        player.advance(0.1);
        player.reset();
        assert_eq!(player.pose(), Player::default().pose());
    }

    fn command_strategy() -> impl Strategy<Value = Command> {
        (0u8..4).prop_map(|i| Command::from_index(i).unwrap())
    }

    proptest! {
        #[test]
        fn prop_never_jumping_and_sliding(
            steps in prop::collection::vec((prop::option::of(command_strategy()), 0.0f32..0.2), 0..200)
        ) {
            let mut player = Player::default();
            for (command, dt) in steps {
                if let Some(command) = command {
                    player.apply(command);
                }
                let pose = player.pose();
                prop_assert!(!(pose.is_jumping && pose.is_sliding));
                player.advance(dt);
                let pose = player.pose();
                prop_assert!(!(pose.is_jumping && pose.is_sliding));
                prop_assert!((0.0..=1.0).contains(&pose.lane_progress));
                prop_assert!(pose.jump_progress < 1.0 && pose.slide_progress < 1.0);
            }
        }

        #[test]
        fn prop_buffered_jump_fires_exactly_once(dt in 0.005f32..0.1) {
            let mut player = Player::default();
            player.slide();
            player.jump();

            let mut jumps_started = 0;
            let mut was_jumping = false;
            for _ in 0..400 {
                player.advance(dt);
                let jumping = player.is_jumping();
                if jumping && !was_jumping {
                    jumps_started += 1;
                }
                was_jumping = jumping;
            }
            prop_assert_eq!(jumps_started, 1);
        }
    }
}
