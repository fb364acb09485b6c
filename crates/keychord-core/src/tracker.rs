//! Frame-synchronized press tracking
//!
//! # Per-tick passes
//!
//! ```text
//!   tick N                                   tick N+1
//!   ──────────────────────────────────────   ─────────────────────────────
//!   advance()                                advance()
//!     reset pending ─► resolve reading          reset pending (old current
//!     old current != new? ─► unpress,           from tick N is now settled)
//!                             queue reset     ...
//!   advance_singles()
//!     drop fallback combos whose keys are
//!     gone ─► unpress, queue reset
//!     pick up combos whose single keys are
//!     held and not ignored
//! ```
//!
//! Both passes are gated on the host tick counter, so any number of queries
//! within one tick see the same state.
//!
//! # Staggered release
//!
//! Releasing `Ctrl+Shift+Q` rarely lifts all three keys in the same frame.
//! When a multi-key chord resolves, each of its keys is stamped in the
//! [`TimeoutTable`]. For the next `cooldown` seconds a reading made only of
//! stamped keys is *ambiguous*: it may only confirm the combination that is
//! already current, never switch to another one. So the `Ctrl+Shift` left
//! behind after `Q` goes up cannot fire a `Ctrl+Shift` combination.

use std::collections::{HashMap, HashSet};

use crate::chord::{decompose, hash_from_input, is_single};
use crate::combination::ComboId;
use crate::input::InputSource;
use crate::keymap::{KeyCode, MAX_KEY};
use crate::registry::Registry;

/// Last time each key slot was consumed by a resolved multi-key chord.
#[derive(Debug, Clone)]
pub struct TimeoutTable {
    stamps: Vec<f64>,
}

impl Default for TimeoutTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeoutTable {
    pub fn new() -> Self {
        Self {
            stamps: vec![f64::NEG_INFINITY; MAX_KEY as usize],
        }
    }

    pub fn get(&self, slot: usize) -> f64 {
        self.stamps.get(slot).copied().unwrap_or(f64::NEG_INFINITY)
    }

    pub fn stamp(&mut self, slot: usize, now: f64) {
        if let Some(stamp) = self.stamps.get_mut(slot) {
            *stamp = now;
        }
    }

    /// Whether `slot` was stamped less than `cooldown` seconds before `now`.
    pub fn is_recent(&self, slot: usize, now: f64, cooldown: f64) -> bool {
        now - self.get(slot) < cooldown
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Edge {
    pressed: bool,
    changed_tick: Option<u64>,
    pressed_at: f64,
    last_duration: f64,
}

/// Press state of one combination.
///
/// Only the tracker writes it. Flipping back within the tick that made a
/// change restores the state from before that change, so a combination
/// handed over from exact to fallback matching in one tick shows no edge.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PressState {
    edge: Edge,
    before: Option<Edge>,
}

impl PressState {
    pub fn is_pressed(&self) -> bool {
        self.edge.pressed
    }

    /// Whether the pressed state changed during `tick`.
    pub fn is_first(&self, tick: u64) -> bool {
        self.edge.changed_tick == Some(tick)
    }

    /// Seconds held so far, or the length of the last hold once released.
    pub fn press_duration(&self, now: f64) -> f64 {
        if self.edge.pressed {
            now - self.edge.pressed_at
        } else {
            self.edge.last_duration
        }
    }

    fn set_pressed(&mut self, pressed: bool, now: f64, tick: u64) {
        if pressed == self.edge.pressed {
            return;
        }
        if self.edge.changed_tick == Some(tick) {
            if let Some(before) = self.before.take() {
                self.edge = before;
                return;
            }
        }

        self.before = Some(self.edge);
        self.edge.pressed = pressed;
        self.edge.changed_tick = Some(tick);
        if pressed {
            self.edge.pressed_at = now;
        } else {
            self.edge.last_duration = now - self.edge.pressed_at;
        }
    }
}

#[derive(Debug, Default)]
pub struct Tracker {
    current: Option<ComboId>,
    pending_reset: HashSet<ComboId>,
    singles_pressed: HashSet<ComboId>,
    states: HashMap<ComboId, PressState>,
    timeouts: TimeoutTable,
    last_combination_tick: Option<u64>,
    last_singles_tick: Option<u64>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The combination whose chord is held exactly, as of the last `advance`.
    pub fn current(&self) -> Option<ComboId> {
        self.current
    }

    pub fn state(&self, id: ComboId) -> Option<&PressState> {
        self.states.get(&id)
    }

    pub fn is_fallback_pressed(&self, id: ComboId) -> bool {
        self.singles_pressed.contains(&id)
    }

    pub fn timeouts(&self) -> &TimeoutTable {
        &self.timeouts
    }

    pub(crate) fn track(&mut self, id: ComboId) {
        self.states.entry(id).or_default();
    }

    pub(crate) fn forget(&mut self, id: ComboId) {
        self.states.remove(&id);
        self.pending_reset.remove(&id);
        self.singles_pressed.remove(&id);
        if self.current == Some(id) {
            self.current = None;
        }
    }

    fn set_pressed(&mut self, id: ComboId, pressed: bool, now: f64, tick: u64) {
        if let Some(state) = self.states.get_mut(&id) {
            state.set_pressed(pressed, now, tick);
        }
    }

    /// Resolve the exact combination for this tick.
    pub fn advance<S: InputSource + ?Sized>(&mut self, registry: &Registry, input: &S, cooldown: f64) {
        let tick = input.tick();
        if self.last_combination_tick == Some(tick) {
            return;
        }
        self.last_combination_tick = Some(tick);
        let now = input.now();

        for id in std::mem::take(&mut self.pending_reset) {
            if !self.singles_pressed.contains(&id) {
                self.set_pressed(id, false, now, tick);
            }
        }

        let resolved = self.resolve(registry, input, now, cooldown);

        if let Some(old) = self.current.filter(|&old| Some(old) != resolved) {
            tracing::trace!("{} no longer held", old);
            self.set_pressed(old, false, now, tick);
            self.pending_reset.insert(old);
        }

        self.current = resolved;
        if let Some(id) = resolved {
            self.set_pressed(id, true, now, tick);
        }
    }

    fn resolve<S: InputSource + ?Sized>(
        &mut self,
        registry: &Registry,
        input: &S,
        now: f64,
        cooldown: f64,
    ) -> Option<ComboId> {
        let reading = hash_from_input(input, &self.timeouts, now, cooldown)?;
        let id = registry.lookup_id(reading.hash)?;

        if reading.ambiguous && Some(id) != self.current {
            tracing::trace!("Ignoring ambiguous reading {} for {}", reading.hash, id);
            return None;
        }

        if !is_single(reading.hash) {
            for slot in decompose(reading.hash) {
                self.timeouts.stamp(slot, now);
            }
        }
        Some(id)
    }

    /// Update the set of combinations held through a single-key fallback.
    ///
    /// Runs [`advance`](Self::advance) first when it has not run this tick.
    pub fn advance_singles<S: InputSource + ?Sized>(
        &mut self,
        registry: &Registry,
        input: &S,
        cooldown: f64,
    ) {
        self.advance(registry, input, cooldown);

        let tick = input.tick();
        if self.last_singles_tick == Some(tick) {
            return;
        }
        self.last_singles_tick = Some(tick);
        let now = input.now();

        let released: Vec<ComboId> = self
            .singles_pressed
            .iter()
            .copied()
            .filter(|&id| {
                self.current != Some(id) && !self.single_held(registry, id, input, now, cooldown)
            })
            .collect();
        for id in released {
            self.singles_pressed.remove(&id);
            self.set_pressed(id, false, now, tick);
            self.pending_reset.insert(id);
        }

        let picked: Vec<ComboId> = registry
            .ids()
            .filter(|&id| self.current != Some(id) && !self.singles_pressed.contains(&id))
            .filter(|&id| self.single_held(registry, id, input, now, cooldown))
            .collect();
        for id in picked {
            tracing::trace!("{} held through a single key", id);
            self.singles_pressed.insert(id);
            self.set_pressed(id, true, now, tick);
        }
    }

    fn single_held<S: InputSource + ?Sized>(
        &self,
        registry: &Registry,
        id: ComboId,
        input: &S,
        now: f64,
        cooldown: f64,
    ) -> bool {
        // Only singles this combination actually claimed count.
        registry.get(id).is_some_and(|combo| {
            combo.singles().iter().any(|&key| {
                registry.lookup_id(key.slot() as i64) == Some(id)
                    && input.is_key_down(key)
                    && !self.is_key_ignored(key, input, now, cooldown)
            })
        })
    }

    /// Whether `key` is held but was just consumed by the current chord.
    pub fn is_key_ignored<S: InputSource + ?Sized>(
        &self,
        key: KeyCode,
        input: &S,
        now: f64,
        cooldown: f64,
    ) -> bool {
        input.is_key_down(key)
            && self.current.is_some()
            && self.timeouts.is_recent(key.slot(), now, cooldown)
    }
}
