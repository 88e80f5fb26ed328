//! Player Commands
//!
//! Keyboard keys and swipe gestures are translated elsewhere into four
//! discrete commands. Commands issued between two ticks wait in a
//! [`CommandQueue`] and are applied, in arrival order, at the start of the
//! next player advance.

use std::collections::VecDeque;
use serde::{Serialize, Deserialize};

// =============================================================================
// COMMANDS
// =============================================================================

/// A discrete player command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Command {
    /// Step one lane to the left
    MoveLeft = 0,
    /// Step one lane to the right
    MoveRight = 1,
    /// Start a jump (or buffer it while sliding)
    Jump = 2,
    /// Start a slide (or buffer it while jumping)
    Slide = 3,
}

impl Command {
    /// Get from index.
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Command::MoveLeft),
            1 => Some(Command::MoveRight),
            2 => Some(Command::Jump),
            3 => Some(Command::Slide),
            _ => None,
        }
    }
}

/// Vertical action waiting in the single-slot input buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BufferedAction {
    /// Jump as soon as the current slide ends
    Jump,
    /// Slide as soon as the current jump ends
    Slide,
}

// =============================================================================
// COMMAND QUEUE
// =============================================================================

/// FIFO of commands received since the last tick.
#[derive(Clone, Debug, Default)]
pub struct CommandQueue {
    pending: VecDeque<Command>,
}

impl CommandQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a command for the next tick.
    pub fn push(&mut self, command: Command) {
        self.pending.push_back(command);
    }

    /// Take every pending command in arrival order.
    pub fn drain(&mut self) -> impl Iterator<Item = Command> + '_ {
        self.pending.drain(..)
    }

    /// Drop everything pending.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Number of pending commands.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

// =============================================================================
// INPUT RECORDING
// =============================================================================

/// A command stamped with the tick it was applied on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedCommand {
    /// Tick the command was applied on
    pub tick: u32,
    /// The command
    pub command: Command,
}

/// Commands of one seeded run, for replay.
///
/// Replays step with a fixed `tick_dt`, so recordings are only meaningful
/// for runs driven with that same step.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputRecording {
    /// Spawn RNG seed of the recorded run
    pub rng_seed: u64,

    /// Fixed step the run was driven with (seconds)
    pub tick_dt: f32,

    /// Last tick covered by the recording
    pub end_tick: u32,

    /// Commands, ordered by tick then arrival
    commands: Vec<TimedCommand>,
}

impl InputRecording {
    /// Create an empty recording.
    pub fn new(rng_seed: u64, tick_dt: f32) -> Self {
        Self {
            rng_seed,
            tick_dt,
            end_tick: 0,
            commands: Vec::with_capacity(256),
        }
    }

    /// Record a command applied on `tick`.
    pub fn record(&mut self, tick: u32, command: Command) {
        self.end_tick = self.end_tick.max(tick);
        self.commands.push(TimedCommand { tick, command });
    }

    /// Mark the last tick of the run.
    pub fn finalize(&mut self, end_tick: u32) {
        self.end_tick = end_tick;
    }

    /// All recorded commands.
    pub fn commands(&self) -> &[TimedCommand] {
        &self.commands
    }

    /// Commands applied on exactly `tick`, in arrival order.
    ///
    /// Binary search relies on `record` being called with non-decreasing ticks.
    pub fn commands_at(&self, tick: u32) -> &[TimedCommand] {
        let start = self.commands.partition_point(|c| c.tick < tick);
        let end = self.commands.partition_point(|c| c.tick <= tick);
        &self.commands[start..end]
    }

    /// Iterate tick by tick over the recording.
    pub fn replay_iter(&self) -> ReplayIterator<'_> {
        ReplayIterator {
            recording: self,
            current_tick: 1,
        }
    }
}

/// Yields `(tick, commands)` for every tick from 1 through `end_tick`.
pub struct ReplayIterator<'a> {
    recording: &'a InputRecording,
    current_tick: u32,
}

impl<'a> Iterator for ReplayIterator<'a> {
    type Item = (u32, &'a [TimedCommand]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_tick > self.recording.end_tick {
            return None;
        }

        let tick = self.current_tick;
        self.current_tick += 1;
        Some((tick, self.recording.commands_at(tick)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_preserves_arrival_order() {
        let mut queue = CommandQueue::new();
        queue.push(Command::Jump);
        queue.push(Command::MoveLeft);
        queue.push(Command::Slide);

        let drained: Vec<_> = queue.drain().collect();
        assert_eq!(drained, vec![Command::Jump, Command::MoveLeft, Command::Slide]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_command_index_roundtrip() {
        for i in 0..4 {
            assert_eq!(Command::from_index(i).map(|c| c as u8), Some(i));
        }
        assert!(Command::from_index(4).is_none());
    }

    #[test]
    fn test_commands_at() {
        let mut rec = InputRecording::new(1, 1.0 / 60.0);
        rec.record(3, Command::Jump);
        rec.record(3, Command::MoveLeft);
        rec.record(7, Command::Slide);

        assert!(rec.commands_at(2).is_empty());
        let at3: Vec<_> = rec.commands_at(3).iter().map(|c| c.command).collect();
        assert_eq!(at3, vec![Command::Jump, Command::MoveLeft]);
        assert_eq!(rec.commands_at(7).len(), 1);
        assert_eq!(rec.end_tick, 7);
    }

    #[test]
    fn test_replay_iterator_covers_every_tick() {
        let mut rec = InputRecording::new(1, 1.0 / 60.0);
        rec.record(2, Command::MoveRight);
        rec.finalize(4);

        let ticks: Vec<_> = rec.replay_iter().map(|(t, cmds)| (t, cmds.len())).collect();
        assert_eq!(ticks, vec![(1, 0), (2, 1), (3, 0), (4, 0)]);
    }
}
