//! The engine facade
//!
//! [`ChordEngine`] wires the registry, native bindings and tracker to one
//! input source and one diagnostic sink. Owners register combinations
//! through it and query press state once per tick.
//!
//! # Example
//!
//! ```ignore
//! let mut engine = ChordEngine::new(input);
//! let menu = engine
//!     .register("my-owner", "menu", vec![vec![KeyCode(29), KeyCode(50)]])
//!     .ok();
//!
//! // every frame
//! if engine.is_newly_pressed(menu) {
//!     open_menu();
//! }
//! ```

use crate::combination::{ComboId, Combination};
use crate::error::{Collision, RegistrationError};
use crate::input::InputSource;
use crate::keymap::KeyCode;
use crate::native::NativeBinding;
use crate::registry::{Registry, RegistrationPolicy};
use crate::sink::{DiagnosticSink, Severity, TracingSink};
use crate::tracker::{PressState, Tracker};

/// Seconds a key stays ignored after a chord consumed it.
pub const COOLDOWN: f64 = 0.05;
/// Holds shorter than this count as taps.
pub const TAP_DURATION: f64 = 0.1;

/// Tunables for a [`ChordEngine`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub cooldown: f64,
    pub tap_duration: f64,
    pub policy: RegistrationPolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            cooldown: COOLDOWN,
            tap_duration: TAP_DURATION,
            policy: RegistrationPolicy::Compatible,
        }
    }
}

pub struct ChordEngine<S> {
    input: S,
    registry: Registry,
    tracker: Tracker,
    settings: EngineSettings,
    sink: Box<dyn DiagnosticSink>,
}

impl<S: InputSource> ChordEngine<S> {
    pub fn new(input: S) -> Self {
        Self::with_settings(input, EngineSettings::default())
    }

    pub fn with_settings(input: S, settings: EngineSettings) -> Self {
        Self {
            input,
            registry: Registry::new(),
            tracker: Tracker::new(),
            settings,
            sink: Box::new(TracingSink),
        }
    }

    /// Replace the diagnostic sink (defaults to [`TracingSink`]).
    pub fn with_sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn input(&self) -> &S {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut S {
        &mut self.input
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn combination(&self, id: ComboId) -> Option<&Combination> {
        self.registry.get(id)
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register `chords` for `owner` under `name`.
    ///
    /// Any chord triggers the combination. The outcome is also written to
    /// the diagnostic sink, including who holds the keys on `Taken`.
    pub fn register(
        &mut self,
        owner: &str,
        name: &str,
        chords: Vec<Vec<KeyCode>>,
    ) -> Result<ComboId, RegistrationError> {
        self.register_combination(Combination::new(owner, name, chords))
    }

    pub fn register_combination(
        &mut self,
        combination: Combination,
    ) -> Result<ComboId, RegistrationError> {
        let label = combination.label();
        let id = self.registry.store(combination);

        match self.registry.claim(id, self.settings.policy) {
            Ok(()) => {
                self.tracker.track(id);
                self.sink
                    .write(&format!("Registered \"{}\"", label), Severity::Debug);
                Ok(id)
            }
            Err(err) => {
                self.report_failure(&label, &err);
                if let RegistrationError::Taken { kept: Some(_), .. } = err {
                    tracing::debug!("\"{}\" keeps its free chords after a collision", label);
                    self.tracker.track(id);
                } else {
                    self.registry.discard(id);
                }
                Err(err)
            }
        }
    }

    fn report_failure(&self, label: &str, err: &RegistrationError) {
        match err {
            RegistrationError::InvalidCombination => self.sink.write(
                &format!("Failed to register \"{}\": invalid combination!", label),
                Severity::Error,
            ),
            RegistrationError::TooLong => self.sink.write(
                &format!("Failed to register \"{}\": too long!", label),
                Severity::Error,
            ),
            RegistrationError::Taken { collisions, .. } => {
                self.sink.write(
                    &format!(
                        "Failed to register \"{}\": already in use by the following:",
                        label
                    ),
                    Severity::Error,
                );
                for collision in collisions {
                    self.sink.write(&format!("\"{}\"", collision), Severity::Error);
                }
            }
        }
    }

    /// Remove a combination and every chord it holds.
    ///
    /// Returns whether anything was removed. `None` and unknown ids are
    /// reported as warnings.
    pub fn unregister(&mut self, combo: Option<ComboId>) -> bool {
        let Some(id) = combo else {
            self.sink
                .write("Failed to unregister: no combination given", Severity::Warning);
            return false;
        };

        match self.registry.discard(id) {
            Some(combination) => {
                self.tracker.forget(id);
                self.sink.write(
                    &format!("Unregistered \"{}\"", combination.label()),
                    Severity::Info,
                );
                true
            }
            None => {
                self.sink.write(
                    &format!("Failed to unregister {}: not registered", id),
                    Severity::Warning,
                );
                false
            }
        }
    }

    /// What stands in the way of registering `combination` right now.
    pub fn collisions_for(&self, combination: &Combination) -> Vec<Collision> {
        match combination.hashes() {
            Ok(hashes) => self.registry.collisions_for(hashes),
            Err(_) => Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Native bindings
    // ------------------------------------------------------------------

    pub fn register_native_binding(&mut self, binding: &NativeBinding) -> bool {
        self.registry.native_mut().add(binding)
    }

    pub fn unregister_native_binding(&mut self, label: &str) -> bool {
        self.registry.native_mut().remove(label)
    }

    /// Rebuild native usage counters from the host's full binding catalog.
    pub fn refresh_native_bindings<I>(&mut self, catalog: I)
    where
        I: IntoIterator<Item = NativeBinding>,
    {
        self.registry.native_mut().refresh(catalog);
    }

    // ------------------------------------------------------------------
    // Per-tick state
    // ------------------------------------------------------------------

    fn sync(&mut self) {
        self.tracker
            .advance_singles(&self.registry, &self.input, self.settings.cooldown);
    }

    /// The combination whose chord is held exactly this tick.
    pub fn current(&mut self) -> Option<ComboId> {
        self.sync();
        self.tracker.current()
    }

    /// Suppression hook for native input: `key` is held, a chord is active
    /// and it consumed `key` within the cooldown window.
    pub fn is_key_ignored(&mut self, key: KeyCode) -> bool {
        self.tracker
            .advance(&self.registry, &self.input, self.settings.cooldown);
        self.tracker.is_key_ignored(
            key,
            &self.input,
            self.input.now(),
            self.settings.cooldown,
        )
    }

    fn state(&self, id: ComboId) -> Option<PressState> {
        self.tracker.state(id).copied()
    }

    fn is_first(&self, id: ComboId) -> bool {
        self.state(id)
            .is_some_and(|state| state.is_first(self.input.tick()))
    }

    fn was_short(&self, id: ComboId) -> bool {
        self.state(id).is_some_and(|state| {
            state.press_duration(self.input.now()) < self.settings.tap_duration
        })
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Exactly this combination's chord is held.
    pub fn is_pressed_exact(&mut self, combo: Option<ComboId>) -> bool {
        let Some(id) = combo else {
            return false;
        };
        self.sync();
        self.tracker.current() == Some(id)
    }

    pub fn is_newly_pressed_exact(&mut self, combo: Option<ComboId>) -> bool {
        let Some(id) = combo else {
            return false;
        };
        self.is_pressed_exact(combo) && self.is_first(id)
    }

    pub fn was_tapped_exact(&mut self, combo: Option<ComboId>) -> bool {
        let Some(id) = combo else {
            return false;
        };
        !self.is_pressed_exact(combo) && self.was_short(id) && self.is_first(id)
    }

    pub fn was_newly_released_exact(&mut self, combo: Option<ComboId>) -> bool {
        let Some(id) = combo else {
            return false;
        };
        !self.is_pressed_exact(combo) && self.is_first(id)
    }

    /// The chord is held exactly, or one of its single keys is held.
    pub fn is_pressed(&mut self, combo: Option<ComboId>) -> bool {
        let Some(id) = combo else {
            return false;
        };
        self.is_pressed_exact(combo) || self.tracker.is_fallback_pressed(id)
    }

    pub fn is_newly_pressed(&mut self, combo: Option<ComboId>) -> bool {
        let Some(id) = combo else {
            return false;
        };
        self.is_pressed(combo) && self.is_first(id)
    }

    pub fn was_tapped(&mut self, combo: Option<ComboId>) -> bool {
        let Some(id) = combo else {
            return false;
        };
        !self.is_pressed(combo) && self.was_short(id) && self.is_first(id)
    }

    pub fn was_newly_released(&mut self, combo: Option<ComboId>) -> bool {
        let Some(id) = combo else {
            return false;
        };
        !self.is_pressed(combo) && self.is_first(id)
    }
}
