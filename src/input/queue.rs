use bevy::prelude::*;
use std::collections::VecDeque;

use super::provider::{InputKey, InputMouseButton, InputProvider};

/// Commands held before the oldest is dropped
pub const INPUT_QUEUE_CAP: usize = 64;

/// A discrete game action produced from one frame of input
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputCommand {
    Move { dx: i32, dy: i32 },
    Zoom { wheel: f32 },
    ToggleDebug,
    /// Window-space cursor position of a left click
    PlaceTile { cursor: Vec2 },
    TogglePopup,
    ToggleManualObserver,
    SaveMap,
    LoadMap,
}

/// Fixed-size ring buffer of commands. A push into a full queue drops the oldest entry.
#[derive(Debug, Clone)]
pub struct CommandQueue {
    buf: VecDeque<InputCommand>,
    capacity: usize,
    dropped: u64,
}

impl CommandQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    pub fn push(&mut self, command: InputCommand) {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
            self.dropped += 1;
        }
        self.buf.push_back(command);
    }

    pub fn pop(&mut self) -> Option<InputCommand> {
        self.buf.pop_front()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Commands lost to overflow since creation
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::with_capacity(INPUT_QUEUE_CAP)
    }
}

/// Input state for a single frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputSnapshot {
    pub seq: u64,
    /// -1, 0 or 1
    pub move_x: i32,
    /// -1, 0 or 1, positive is down
    pub move_y: i32,
    pub wheel: f32,
    pub toggle_debug: bool,
    /// Cursor position when the left button went down this frame
    pub click: Option<Vec2>,
    pub toggle_popup: bool,
    pub toggle_observer: bool,
    pub save: bool,
    pub load: bool,
}

impl InputSnapshot {
    /// Read one frame of input. Up wins over down and left over right.
    pub fn read(provider: &mut impl InputProvider, seq: u64) -> Self {
        let pressed = |key| provider.is_key_pressed(key);

        let move_y = if pressed(InputKey::W) || pressed(InputKey::Up) {
            -1
        } else if pressed(InputKey::S) || pressed(InputKey::Down) {
            1
        } else {
            0
        };
        let move_x = if pressed(InputKey::A) || pressed(InputKey::Left) {
            -1
        } else if pressed(InputKey::D) || pressed(InputKey::Right) {
            1
        } else {
            0
        };

        let toggle_debug = pressed(InputKey::F3);
        let toggle_popup = pressed(InputKey::F1);
        let toggle_observer = pressed(InputKey::O);
        let save = pressed(InputKey::F5);
        let load = pressed(InputKey::F9);

        let click = if provider.is_mouse_button_pressed(InputMouseButton::Left) {
            provider.mouse_position()
        } else {
            None
        };

        Self {
            seq,
            move_x,
            move_y,
            wheel: provider.mouse_wheel_move(),
            toggle_debug,
            click,
            toggle_popup,
            toggle_observer,
            save,
            load,
        }
    }
}

/// Latest input snapshot plus the queue of commands derived from it
#[derive(Resource, Debug, Default)]
pub struct InputSystem {
    latest: InputSnapshot,
    next_seq: u64,
    last_processed: Option<u64>,
    queue: CommandQueue,
}

impl InputSystem {
    /// Capture this frame's input under a fresh sequence number
    pub fn poll(&mut self, provider: &mut impl InputProvider) -> &InputSnapshot {
        self.next_seq += 1;
        self.latest = InputSnapshot::read(provider, self.next_seq);
        &self.latest
    }

    /// Turn the latest snapshot into commands. A snapshot is only processed once.
    /// Returns the number of commands queued.
    pub fn process_snapshot(&mut self) -> usize {
        if self.last_processed == Some(self.latest.seq) {
            return 0;
        }
        self.last_processed = Some(self.latest.seq);

        let snap = self.latest;
        let before = self.queue.dropped() + self.queue.len() as u64;

        if snap.toggle_debug {
            self.queue.push(InputCommand::ToggleDebug);
        }
        if snap.wheel != 0.0 {
            self.queue.push(InputCommand::Zoom { wheel: snap.wheel });
        }
        if snap.move_x != 0 || snap.move_y != 0 {
            self.queue.push(InputCommand::Move {
                dx: snap.move_x,
                dy: snap.move_y,
            });
        }
        if let Some(cursor) = snap.click {
            self.queue.push(InputCommand::PlaceTile { cursor });
        }
        if snap.toggle_popup {
            self.queue.push(InputCommand::TogglePopup);
        }
        if snap.toggle_observer {
            self.queue.push(InputCommand::ToggleManualObserver);
        }
        if snap.save {
            self.queue.push(InputCommand::SaveMap);
        }
        if snap.load {
            self.queue.push(InputCommand::LoadMap);
        }

        (self.queue.dropped() + self.queue.len() as u64 - before) as usize
    }

    pub fn pop(&mut self) -> Option<InputCommand> {
        self.queue.pop()
    }

    pub fn latest(&self) -> &InputSnapshot {
        &self.latest
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    #[cfg(test)]
    pub fn push(&mut self, command: InputCommand) {
        self.queue.push(command);
    }
}
