//! Key space mapping
//!
//! Key codes are folded into a fixed index space `[0, MAX_KEY)` so every
//! per-key table in the engine can be a plain array. Codes at or above
//! [`MAX_KEY`] (extended device buttons) are aliased onto the last
//! [`BUCKET`] slots below it.

use std::fmt;

/// Lowest key code considered when scanning the keyboard.
pub const MIN_KEY: u16 = 8;
/// Exclusive upper bound of ordinary key codes; also the hash base.
pub const MAX_KEY: u16 = 350;
/// Width of the alias bucket extended codes are folded into.
pub const BUCKET: u16 = 20;
/// Maximum number of keys in one chord.
pub const MAX_COMBO_LEN: usize = 7;

/// A physical key identifier as reported by the host input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyCode(pub u16);

impl KeyCode {
    /// Raw code value.
    pub fn code(self) -> u16 {
        self.0
    }

    /// Index of this key in the fixed-size key tables.
    pub fn slot(self) -> usize {
        map_key(self.0) as usize
    }

    /// Whether this key lies in the scanned `[MIN_KEY, MAX_KEY)` range.
    pub fn is_ordinary(self) -> bool {
        (MIN_KEY..MAX_KEY).contains(&self.0)
    }
}

impl From<u16> for KeyCode {
    fn from(code: u16) -> Self {
        KeyCode(code)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Fold a key code into `[0, MAX_KEY)`.
///
/// Codes below [`MAX_KEY`] map to themselves. Anything above loses the
/// largest multiple of [`BUCKET`] that keeps it inside
/// `[MAX_KEY - BUCKET, MAX_KEY)`, so e.g. `350`, `370` and `390` all share
/// slot `330`.
pub fn map_key(code: u16) -> u16 {
    if code < MAX_KEY {
        return code;
    }
    let code = u32::from(code);
    let (max, bucket) = (u32::from(MAX_KEY), u32::from(BUCKET));
    (code - ((code - max + bucket) / bucket) * bucket) as u16
}
