//! Chord detection and combination registry for keychord
//!
//! Independent owners register named key combinations against one keyboard
//! or gamepad and query their press state once per tick. The engine makes
//! sure no two owners (or a native host binding) claim the same chord and
//! copes with chords whose keys are not released in the same frame.
//!
//! # Architecture
//!
//! - **`keymap`:** folds key codes into a fixed slot space
//! - **`chord`:** hashes key sets and live readings
//! - **`registry`:** hash to combination mapping with uniqueness checks
//! - **`native`:** usage counters for the host's own bindings
//! - **`tracker`:** once-per-tick exact and single-key fallback resolution
//! - **`engine`:** the [`ChordEngine`] facade and its query API

pub mod chord;
pub mod combination;
pub mod engine;
pub mod error;
pub mod input;
pub mod keymap;
pub mod native;
pub mod registry;
pub mod sink;
pub mod tracker;

pub use combination::{ComboId, Combination};
pub use engine::{ChordEngine, EngineSettings, COOLDOWN, TAP_DURATION};
pub use error::{Collision, RegistrationError};
pub use input::InputSource;
pub use keymap::{map_key, KeyCode, BUCKET, MAX_COMBO_LEN, MAX_KEY, MIN_KEY};
pub use native::{NativeBinding, NativeBindings};
pub use registry::RegistrationPolicy;
pub use sink::{DiagnosticSink, RecordingSink, Severity, TracingSink};
