//! Host input source

use crate::keymap::KeyCode;

/// Snapshot access to the host's keyboard and gamepad state.
///
/// The engine samples this once per tick. It never assumes keys change
/// atomically between samples.
pub trait InputSource {
    /// Whether `key` is held in the current snapshot.
    fn is_key_down(&self, key: KeyCode) -> bool;

    /// Monotonic time in seconds.
    fn now(&self) -> f64;

    /// Frame counter, advanced once per host frame.
    fn tick(&self) -> u64;
}

impl<T: InputSource + ?Sized> InputSource for &T {
    fn is_key_down(&self, key: KeyCode) -> bool {
        (**self).is_key_down(key)
    }

    fn now(&self) -> f64 {
        (**self).now()
    }

    fn tick(&self) -> u64 {
        (**self).tick()
    }
}

/// Scripted input for tests: keys, clock and tick are all set by hand.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct FakeInput {
    held: std::collections::HashSet<u16>,
    now: f64,
    tick: u64,
}

#[cfg(test)]
impl FakeInput {
    pub(crate) fn new() -> Self {
        Self {
            held: Default::default(),
            now: 1.0,
            tick: 1,
        }
    }

    pub(crate) fn press(&mut self, codes: &[u16]) {
        self.held.extend(codes.iter().copied());
    }

    pub(crate) fn release(&mut self, codes: &[u16]) {
        for code in codes {
            self.held.remove(code);
        }
    }

    /// Move to the next frame, `dt` seconds later.
    pub(crate) fn step(&mut self, dt: f64) {
        self.now += dt;
        self.tick += 1;
    }
}

#[cfg(test)]
impl InputSource for FakeInput {
    fn is_key_down(&self, key: KeyCode) -> bool {
        self.held.contains(&key.code())
    }

    fn now(&self) -> f64 {
        self.now
    }

    fn tick(&self) -> u64 {
        self.tick
    }
}
