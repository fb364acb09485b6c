use std::fmt;

use thiserror::Error;

use crate::combination::ComboId;
use crate::keymap::KeyCode;

/// Why a combination could not be registered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The key list is empty, contains a key below `MIN_KEY`, or repeats a key.
    #[error("invalid combination")]
    InvalidCombination,

    /// A chord has more than `MAX_COMBO_LEN` keys.
    #[error("combination too long")]
    TooLong,

    /// At least one chord is already claimed by another owner or a native binding.
    ///
    /// `kept` is set when the combination still holds its free chords
    /// (compatible policy); unregister it to give them back.
    #[error("combination already in use by {}", format_collisions(.collisions))]
    Taken {
        collisions: Vec<Collision>,
        kept: Option<ComboId>,
    },
}

/// The current holder of a hash that a new registration wanted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collision {
    /// Another registered combination, identified by its full label.
    Combination { label: String },
    /// A native host binding using the key slot.
    Native { key: KeyCode, bindings: Vec<String> },
}

impl fmt::Display for Collision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collision::Combination { label } => write!(f, "{}", label),
            Collision::Native { key, bindings } if bindings.is_empty() => {
                write!(f, "native.{}", key)
            }
            Collision::Native { bindings, .. } => write!(f, "native.{}", bindings.join("|")),
        }
    }
}

fn format_collisions(collisions: &[Collision]) -> String {
    collisions
        .iter()
        .map(|c| format!("\"{}\"", c))
        .collect::<Vec<_>>()
        .join(", ")
}
