//! Registered combinations
//!
//! A [`Combination`] is the immutable half of a registration: who owns it,
//! which chords trigger it and the hashes they produce. Press state lives
//! in the tracker (see [`PressState`](crate::tracker::PressState)).

use std::fmt;

use crate::chord::{hash_keys, is_single};
use crate::error::RegistrationError;
use crate::keymap::KeyCode;

/// Handle to a combination owned by a [`ChordEngine`](crate::ChordEngine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComboId(pub(crate) u64);

impl fmt::Display for ComboId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "combo#{}", self.0)
    }
}

/// A named set of alternative chords registered by one owner.
///
/// Any one of the chords triggers the combination. Chords made of a single
/// key additionally act as fallback keys: they keep the combination pressed
/// while other, unrelated keys are held at the same time.
#[derive(Debug, Clone)]
pub struct Combination {
    owner: String,
    name: String,
    chords: Vec<Vec<KeyCode>>,
    hashes: Result<Vec<i64>, RegistrationError>,
    singles: Vec<KeyCode>,
}

impl Combination {
    /// Build a combination, hashing every chord.
    ///
    /// Construction never fails; a malformed chord is recorded and reported
    /// when the combination is registered.
    pub fn new(owner: impl Into<String>, name: impl Into<String>, chords: Vec<Vec<KeyCode>>) -> Self {
        let hashes = if chords.is_empty() {
            Err(RegistrationError::InvalidCombination)
        } else {
            chords.iter().map(|chord| hash_keys(chord)).collect()
        };

        let singles = chords
            .iter()
            .filter(|chord| chord.len() == 1)
            .map(|chord| chord[0])
            .collect();

        Self {
            owner: owner.into(),
            name: name.into(),
            chords,
            hashes,
            singles,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `owner.name`, used in diagnostics and collision reports.
    pub fn label(&self) -> String {
        format!("{}.{}", self.owner, self.name)
    }

    pub fn chords(&self) -> &[Vec<KeyCode>] {
        &self.chords
    }

    /// One hash per chord, or the reason the chords are unusable.
    pub fn hashes(&self) -> Result<&[i64], RegistrationError> {
        self.hashes.as_deref().map_err(Clone::clone)
    }

    /// Keys that press this combination on their own.
    pub fn singles(&self) -> &[KeyCode] {
        &self.singles
    }

    /// Whether any chord is a multi-key chord.
    pub fn has_chord(&self) -> bool {
        self.hashes
            .as_deref()
            .map(|hashes| hashes.iter().any(|&h| !is_single(h)))
            .unwrap_or(false)
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_collects_hashes_and_singles() {
        let combo = Combination::new(
            "owner",
            "menu",
            vec![vec![KeyCode(29), KeyCode(50)], vec![KeyCode(63)]],
        );
        assert_eq!(combo.hashes().unwrap(), &[29 * 350 + 50, 63]);
        assert_eq!(combo.singles(), &[KeyCode(63)]);
        assert_eq!(combo.label(), "owner.menu");
        assert!(combo.has_chord());
    }

    #[test]
    fn test_new_records_first_defect() {
        let combo = Combination::new("owner", "bad", vec![vec![KeyCode(30)], vec![]]);
        assert_eq!(combo.hashes(), Err(RegistrationError::InvalidCombination));

        let combo = Combination::new("owner", "empty", Vec::new());
        assert_eq!(combo.hashes(), Err(RegistrationError::InvalidCombination));

        let long: Vec<KeyCode> = (10..18).map(KeyCode).collect();
        let combo = Combination::new("owner", "long", vec![long]);
        assert_eq!(combo.hashes(), Err(RegistrationError::TooLong));
    }
}
