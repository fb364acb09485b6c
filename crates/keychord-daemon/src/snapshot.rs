//! Key state as the engine sees it
//!
//! Device tasks feed transitions in between ticks; the tick loop then
//! stamps a new tick number and timestamp so every query within one tick
//! observes the same instant.

use std::collections::HashSet;

use keychord_core::{map_key, InputSource, KeyCode};

/// One key transition from a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub code: u16,
    pub pressed: bool,
}

#[derive(Debug, Default)]
pub struct KeySnapshot {
    held: HashSet<u16>,
    /// Keys that went down since the last tick began
    pressed_since_tick: Vec<u16>,
    tick: u64,
    now: f64,
}

impl KeySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, input: KeyInput) {
        if input.pressed {
            if self.held.insert(input.code) {
                self.pressed_since_tick.push(input.code);
            }
        } else {
            self.held.remove(&input.code);
        }
    }

    /// Start a new tick at `now` seconds. Returns the keys that went down
    /// since the previous tick.
    pub fn begin_tick(&mut self, now: f64) -> Vec<u16> {
        self.tick += 1;
        self.now = now;
        std::mem::take(&mut self.pressed_since_tick)
    }
}

impl InputSource for KeySnapshot {
    /// Extended codes share folded slots, so a slot is down when any held
    /// code folds onto it.
    fn is_key_down(&self, key: KeyCode) -> bool {
        let slot = map_key(key.code());
        self.held.iter().any(|&code| map_key(code) == slot)
    }

    fn now(&self) -> f64 {
        self.now
    }

    fn tick(&self) -> u64 {
        self.tick
    }
}
