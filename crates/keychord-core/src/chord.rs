//! Chord hashing
//!
//! A chord is identified by a single `i64`: the ascending, folded key codes
//! read as digits in base [`MAX_KEY`]. With at most [`MAX_COMBO_LEN`] keys the
//! value stays far below `i64::MAX` (`350^7 < 2^60`).
//!
//! The same encoding is produced from two directions:
//! - [`hash_keys`] for the key list of a combination being registered
//! - [`hash_from_input`] for whatever is held on the keyboard right now
//!
//! so a registry lookup of the live reading finds the combination whose keys
//! are exactly the held set.

use crate::error::RegistrationError;
use crate::input::InputSource;
use crate::keymap::{map_key, KeyCode, MAX_COMBO_LEN, MAX_KEY, MIN_KEY};
use crate::tracker::TimeoutTable;

/// A live keyboard reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    /// Hash of the held key set.
    pub hash: i64,
    /// Every held key was consumed by a chord within the cooldown window, so
    /// this reading may just be the tail of a chord being released.
    pub ambiguous: bool,
}

/// Whether `hash` encodes a single key.
pub fn is_single(hash: i64) -> bool {
    hash < i64::from(MAX_KEY)
}

/// Hash a combination's key list.
///
/// Keys are folded and sorted first, so the result does not depend on the
/// order they were given in.
pub fn hash_keys(keys: &[KeyCode]) -> Result<i64, RegistrationError> {
    if keys.is_empty() {
        return Err(RegistrationError::InvalidCombination);
    }
    if keys.len() > MAX_COMBO_LEN {
        return Err(RegistrationError::TooLong);
    }

    let mut codes: Vec<u16> = keys.iter().map(|k| map_key(k.code())).collect();
    codes.sort_unstable();

    if codes.iter().any(|&c| c < MIN_KEY) || codes.windows(2).any(|w| w[0] == w[1]) {
        return Err(RegistrationError::InvalidCombination);
    }

    Ok(codes
        .iter()
        .fold(0i64, |hash, &code| hash * i64::from(MAX_KEY) + i64::from(code)))
}

/// Split a hash back into its key slots, least significant first.
pub fn decompose(hash: i64) -> impl Iterator<Item = usize> {
    let base = i64::from(MAX_KEY);
    std::iter::successors(Some(hash).filter(|&h| h > 0), move |&h| {
        Some(h / base).filter(|&h| h > 0)
    })
    .map(move |h| (h % base) as usize)
}

/// Hash the keys currently held on `input`.
///
/// Returns `None` when nothing is held or when more keys are held than any
/// chord can contain.
pub fn hash_from_input<S: InputSource + ?Sized>(
    input: &S,
    timeouts: &TimeoutTable,
    now: f64,
    cooldown: f64,
) -> Option<Reading> {
    let mut hash = 0i64;
    let mut count = 0usize;
    let mut ambiguous = true;

    for code in MIN_KEY..MAX_KEY {
        if !input.is_key_down(KeyCode(code)) {
            continue;
        }
        count += 1;
        if count > MAX_COMBO_LEN {
            return None;
        }
        hash = hash * i64::from(MAX_KEY) + i64::from(code);
        if now - timeouts.get(code as usize) > cooldown {
            ambiguous = false;
        }
    }

    if hash == 0 {
        return None;
    }
    Some(Reading { hash, ambiguous })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::FakeInput;

    fn keys(codes: &[u16]) -> Vec<KeyCode> {
        codes.iter().copied().map(KeyCode).collect()
    }

    #[test]
    fn test_hash_keys_order_independent() {
        let a = hash_keys(&keys(&[29, 42, 30])).unwrap();
        let b = hash_keys(&keys(&[30, 29, 42])).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, (29 * 350 + 30) * 350 + 42);
    }

    #[test]
    fn test_hash_keys_single_key_is_code() {
        assert_eq!(hash_keys(&keys(&[30])).unwrap(), 30);
        assert!(is_single(30));
        assert!(!is_single(hash_keys(&keys(&[29, 30])).unwrap()));
    }

    #[test]
    fn test_hash_keys_folds_extended_codes() {
        assert_eq!(hash_keys(&keys(&[352])).unwrap(), 332);
    }

    #[test]
    fn test_hash_keys_rejects_bad_input() {
        assert_eq!(hash_keys(&[]), Err(RegistrationError::InvalidCombination));
        assert_eq!(hash_keys(&keys(&[0])), Err(RegistrationError::InvalidCombination));
        assert_eq!(
            hash_keys(&keys(&[30, 30])),
            Err(RegistrationError::InvalidCombination)
        );
        // 352 and 372 land in the same slot
        assert_eq!(
            hash_keys(&keys(&[352, 372])),
            Err(RegistrationError::InvalidCombination)
        );
        assert_eq!(
            hash_keys(&keys(&[10, 11, 12, 13, 14, 15, 16, 17])),
            Err(RegistrationError::TooLong)
        );
        assert!(hash_keys(&keys(&[10, 11, 12, 13, 14, 15, 16])).is_ok());
    }

    #[test]
    fn test_max_length_hash_fits() {
        let hash = hash_keys(&keys(&[343, 344, 345, 346, 347, 348, 349])).unwrap();
        assert!(hash > 0);
        let mut slots: Vec<usize> = decompose(hash).collect();
        slots.sort_unstable();
        assert_eq!(slots, vec![343, 344, 345, 346, 347, 348, 349]);
    }

    #[test]
    fn test_decompose_roundtrips_components() {
        let hash = hash_keys(&keys(&[56, 29, 111])).unwrap();
        let slots: Vec<usize> = decompose(hash).collect();
        assert_eq!(slots, vec![111, 56, 29]);
        assert_eq!(decompose(0).count(), 0);
    }

    #[test]
    fn test_hash_from_input_matches_hash_keys() {
        let mut input = FakeInput::new();
        input.press(&[42, 29]);
        let timeouts = TimeoutTable::new();

        let reading = hash_from_input(&input, &timeouts, 1.0, 0.05).unwrap();
        assert_eq!(reading.hash, hash_keys(&keys(&[29, 42])).unwrap());
        assert!(!reading.ambiguous);
    }

    #[test]
    fn test_hash_from_input_nothing_held() {
        let input = FakeInput::new();
        let timeouts = TimeoutTable::new();
        assert_eq!(hash_from_input(&input, &timeouts, 1.0, 0.05), None);
    }

    #[test]
    fn test_hash_from_input_too_many_keys() {
        let mut input = FakeInput::new();
        input.press(&[10, 11, 12, 13, 14, 15, 16, 17]);
        let timeouts = TimeoutTable::new();
        assert_eq!(hash_from_input(&input, &timeouts, 1.0, 0.05), None);
    }

    #[test]
    fn test_hash_from_input_ignores_keys_outside_scan_range() {
        let mut input = FakeInput::new();
        input.press(&[3, 30, 400]);
        let timeouts = TimeoutTable::new();
        let reading = hash_from_input(&input, &timeouts, 1.0, 0.05).unwrap();
        assert_eq!(reading.hash, 30);
    }

    #[test]
    fn test_hash_from_input_ambiguous_only_when_all_keys_recent() {
        let mut input = FakeInput::new();
        input.press(&[29, 30]);
        let mut timeouts = TimeoutTable::new();
        timeouts.stamp(29, 1.0);

        let reading = hash_from_input(&input, &timeouts, 1.01, 0.05).unwrap();
        assert!(!reading.ambiguous, "key 30 was never stamped");

        timeouts.stamp(30, 1.0);
        let reading = hash_from_input(&input, &timeouts, 1.01, 0.05).unwrap();
        assert!(reading.ambiguous);

        let reading = hash_from_input(&input, &timeouts, 1.2, 0.05).unwrap();
        assert!(!reading.ambiguous, "cooldown elapsed");
    }
}
