//! Lane Geometry
//!
//! The corridor has three discrete lateral slots. Everything that lives on
//! the track (player, obstacles, coins) occupies exactly one of them.

use serde::{Serialize, Deserialize};

/// Distance between adjacent lane centers.
pub const LANE_WIDTH: f32 = 2.0;

/// Number of lanes on the track.
pub const LANE_COUNT: usize = 3;

/// One of the three lateral slots, left to right.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
#[derive(Default)]
pub enum Lane {
    /// Leftmost lane (index 0)
    Left = 0,
    /// Center lane (index 1), where every run starts
    #[default]
    Center = 1,
    /// Rightmost lane (index 2)
    Right = 2,
}

impl Lane {
    /// All lanes, left to right.
    pub const ALL: [Lane; LANE_COUNT] = [Lane::Left, Lane::Center, Lane::Right];

    /// Lane index (0, 1 or 2).
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Get lane from index (0-2).
    pub fn from_index(index: usize) -> Option<Lane> {
        match index {
            0 => Some(Lane::Left),
            1 => Some(Lane::Center),
            2 => Some(Lane::Right),
            _ => None,
        }
    }

    /// Lateral offset of the lane center.
    #[inline]
    pub fn offset(self) -> f32 {
        match self {
            Lane::Left => -LANE_WIDTH,
            Lane::Center => 0.0,
            Lane::Right => LANE_WIDTH,
        }
    }

    /// Lane one step to the left, or `None` at the boundary.
    pub fn left(self) -> Option<Lane> {
        match self {
            Lane::Left => None,
            Lane::Center => Some(Lane::Left),
            Lane::Right => Some(Lane::Center),
        }
    }

    /// Lane one step to the right, or `None` at the boundary.
    pub fn right(self) -> Option<Lane> {
        match self {
            Lane::Left => Some(Lane::Center),
            Lane::Center => Some(Lane::Right),
            Lane::Right => None,
        }
    }

    /// Every lane except `self`, left to right.
    pub fn others(self) -> [Lane; LANE_COUNT - 1] {
        match self {
            Lane::Left => [Lane::Center, Lane::Right],
            Lane::Center => [Lane::Left, Lane::Right],
            Lane::Right => [Lane::Left, Lane::Center],
        }
    }
}
