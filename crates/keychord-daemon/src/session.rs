//! The daemon's engine session
//!
//! Owns one [`ChordEngine`] over the live [`KeySnapshot`], keeps it in sync
//! with the configuration and turns each tick into a list of edges worth
//! logging.

use std::fmt;

use keychord_config::Config;
use keychord_core::{ChordEngine, ComboId, KeyCode, RegistrationError};

use crate::snapshot::{KeyInput, KeySnapshot};

/// Something observable that happened during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChordEvent {
    Pressed(String),
    Tapped(String),
    Released(String),
    /// A native binding key went down while a chord had just consumed it
    Suppressed { key: u16, bindings: Vec<String> },
    /// A native binding key went down on its own
    Passed { key: u16, bindings: Vec<String> },
}

impl fmt::Display for ChordEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pressed(label) => write!(f, "\"{}\" pressed", label),
            Self::Tapped(label) => write!(f, "\"{}\" tapped", label),
            Self::Released(label) => write!(f, "\"{}\" released", label),
            Self::Suppressed { key, bindings } => {
                write!(f, "key {} suppressed for {}", key, bindings.join(", "))
            }
            Self::Passed { key, bindings } => {
                write!(f, "key {} passed to {}", key, bindings.join(", "))
            }
        }
    }
}

/// Outcome of loading the configured combinations.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub registered: usize,
    pub failed: usize,
}

pub struct Session {
    engine: ChordEngine<KeySnapshot>,
    combos: Vec<(String, ComboId)>,
}

impl Session {
    pub fn new(config: &Config) -> (Self, LoadSummary) {
        let engine =
            ChordEngine::with_settings(KeySnapshot::new(), config.global.engine_settings());
        let mut session = Self {
            engine,
            combos: Vec::new(),
        };
        let summary = session.load(config);
        (session, summary)
    }

    /// Swap in a new configuration, keeping the held keys.
    ///
    /// Engine settings are fixed for the session's lifetime; a changed
    /// `global` block only takes effect after a restart.
    pub fn reload(&mut self, config: &Config) -> LoadSummary {
        if config.global.engine_settings() != *self.engine.settings() {
            tracing::warn!("Global settings changed, restart the daemon to apply them");
        }
        self.load(config)
    }

    fn load(&mut self, config: &Config) -> LoadSummary {
        for (_, id) in std::mem::take(&mut self.combos) {
            self.engine.unregister(Some(id));
        }

        self.engine.refresh_native_bindings(config.native_catalog());
        tracing::debug!(
            "Tracking {} native binding(s)",
            self.engine.registry().native().len()
        );

        let mut summary = LoadSummary::default();
        for combo in &config.combinations {
            match self.engine.register_combination(combo.combination()) {
                Ok(id) => {
                    summary.registered += 1;
                    self.combos.push((combo.label(), id));
                }
                Err(RegistrationError::Taken {
                    kept: Some(id), ..
                }) => {
                    // Still watched through its free chords.
                    summary.failed += 1;
                    self.combos.push((combo.label(), id));
                }
                Err(_) => {
                    // Failure details already went to the diagnostic sink.
                    summary.failed += 1;
                }
            }
        }

        summary
    }

    pub fn combos(&self) -> &[(String, ComboId)] {
        &self.combos
    }

    pub fn apply(&mut self, input: KeyInput) {
        self.engine.input_mut().apply(input);
    }

    /// Advance to a new tick at `now` seconds and collect its edges.
    pub fn tick(&mut self, now: f64) -> Vec<ChordEvent> {
        let went_down = self.engine.input_mut().begin_tick(now);
        let mut events = Vec::new();

        for (label, id) in &self.combos {
            let id = Some(*id);
            if self.engine.is_newly_pressed(id) {
                events.push(ChordEvent::Pressed(label.clone()));
            } else if self.engine.was_tapped(id) {
                events.push(ChordEvent::Tapped(label.clone()));
            } else if self.engine.was_newly_released(id) {
                events.push(ChordEvent::Released(label.clone()));
            }
        }

        for code in went_down {
            let key = KeyCode(code);
            let bindings = self.engine.registry().native().labels_for(key.slot());
            if bindings.is_empty() {
                continue;
            }
            if self.engine.is_key_ignored(key) {
                events.push(ChordEvent::Suppressed { key: code, bindings });
            } else {
                events.push(ChordEvent::Passed { key: code, bindings });
            }
        }

        events
    }
}
