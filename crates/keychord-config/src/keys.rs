//! Key name resolution
//!
//! Config files name keys the way evdev does (`KEY_A`, `BTN_SOUTH`), by bare
//! name (`A`, `F5`), through a few common aliases, or as raw codes.

use std::str::FromStr;

use evdev::Key;

/// Resolve a key name to its evdev code.
pub fn resolve_key(name: &str) -> Option<u16> {
    let name = name.trim();
    if let Ok(code) = name.parse::<u16>() {
        return Some(code);
    }

    let upper = name.to_uppercase();

    let alias = match upper.as_str() {
        "CTRL" | "LCTRL" | "CONTROL" => Some(Key::KEY_LEFTCTRL),
        "RCTRL" => Some(Key::KEY_RIGHTCTRL),
        "SHIFT" | "LSHIFT" => Some(Key::KEY_LEFTSHIFT),
        "RSHIFT" => Some(Key::KEY_RIGHTSHIFT),
        "ALT" | "LALT" => Some(Key::KEY_LEFTALT),
        "RALT" | "ALTGR" => Some(Key::KEY_RIGHTALT),
        "SUPER" | "META" | "WIN" | "LMETA" => Some(Key::KEY_LEFTMETA),
        "RMETA" => Some(Key::KEY_RIGHTMETA),
        "ESCAPE" | "ESC" => Some(Key::KEY_ESC),
        "RETURN" | "ENTER" => Some(Key::KEY_ENTER),
        "CAPS" | "CAPS_LOCK" => Some(Key::KEY_CAPSLOCK),
        "DEL" => Some(Key::KEY_DELETE),
        "INS" => Some(Key::KEY_INSERT),
        "PGUP" => Some(Key::KEY_PAGEUP),
        "PGDN" | "PGDOWN" => Some(Key::KEY_PAGEDOWN),
        "-" => Some(Key::KEY_MINUS),
        "=" => Some(Key::KEY_EQUAL),
        "," => Some(Key::KEY_COMMA),
        "." | "PERIOD" => Some(Key::KEY_DOT),
        "/" => Some(Key::KEY_SLASH),
        ";" => Some(Key::KEY_SEMICOLON),
        "'" => Some(Key::KEY_APOSTROPHE),
        "`" => Some(Key::KEY_GRAVE),
        "\\" => Some(Key::KEY_BACKSLASH),
        "[" => Some(Key::KEY_LEFTBRACE),
        "]" => Some(Key::KEY_RIGHTBRACE),
        _ => None,
    };
    if let Some(key) = alias {
        return Some(key.code());
    }

    if upper.starts_with("KEY_") || upper.starts_with("BTN_") {
        return Key::from_str(&upper).ok().map(|key| key.code());
    }

    Key::from_str(&format!("KEY_{}", upper))
        .or_else(|_| Key::from_str(&format!("BTN_{}", upper)))
        .ok()
        .map(|key| key.code())
}

/// Human-readable name for a key code, e.g. `KEY_A`.
pub fn key_name(code: u16) -> String {
    format!("{:?}", Key::new(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_evdev_names() {
        assert_eq!(resolve_key("KEY_A"), Some(Key::KEY_A.code()));
        assert_eq!(resolve_key("key_leftctrl"), Some(Key::KEY_LEFTCTRL.code()));
        assert_eq!(resolve_key("BTN_SOUTH"), Some(Key::BTN_SOUTH.code()));
    }

    #[test]
    fn test_resolve_bare_names() {
        assert_eq!(resolve_key("a"), Some(Key::KEY_A.code()));
        assert_eq!(resolve_key("F5"), Some(Key::KEY_F5.code()));
        assert_eq!(resolve_key("space"), Some(Key::KEY_SPACE.code()));
        assert_eq!(resolve_key("south"), Some(Key::BTN_SOUTH.code()));
    }

    #[test]
    fn test_resolve_aliases() {
        assert_eq!(resolve_key("Ctrl"), Some(Key::KEY_LEFTCTRL.code()));
        assert_eq!(resolve_key("esc"), Some(Key::KEY_ESC.code()));
        assert_eq!(resolve_key("Super"), Some(Key::KEY_LEFTMETA.code()));
        assert_eq!(resolve_key("/"), Some(Key::KEY_SLASH.code()));
    }

    #[test]
    fn test_resolve_raw_codes() {
        assert_eq!(resolve_key("30"), Some(30));
        assert_eq!(resolve_key(" 304 "), Some(304));
    }

    #[test]
    fn test_resolve_unknown() {
        assert_eq!(resolve_key("KEY_NOTAKEY"), None);
        assert_eq!(resolve_key("banana"), None);
        assert_eq!(resolve_key(""), None);
    }

    #[test]
    fn test_key_name() {
        assert_eq!(key_name(Key::KEY_A.code()), "KEY_A");
    }
}
