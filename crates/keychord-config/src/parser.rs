//! KDL configuration parser

use std::collections::HashSet;
use std::path::Path;

use crate::error::ConfigError;
use crate::keys::resolve_key;
use crate::model::*;

/// Parse a configuration file from the given path
pub fn parse_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Parse configuration from a string
pub fn parse_config_str(content: &str) -> Result<Config, ConfigError> {
    let doc: kdl::KdlDocument = content.parse().map_err(|e: kdl::KdlError| {
        // kdl pulls in an older miette, so rebuild the span for ours
        let offset = e.span.offset();
        let len = e.span.len();
        let span = miette::SourceSpan::from((offset, len));
        ConfigError::ParseError {
            src: content.to_string(),
            span,
            source: e,
        }
    })?;

    let mut config = Config::default();

    for node in doc.nodes() {
        match node.name().value() {
            "global" => {
                config.global = parse_global(node)?;
            }
            "native-binding" => {
                config.native_bindings.push(parse_native_binding(node)?);
            }
            "combination" => {
                config.combinations.push(parse_combination(node)?);
            }
            "device" => {
                config.devices.push(parse_device(node)?);
            }
            name => {
                tracing::warn!("Unknown top-level node: {}", name);
            }
        }
    }

    validate(&config)?;

    Ok(config)
}

fn first_string(node: &kdl::KdlNode) -> Option<String> {
    node.entries()
        .first()
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn first_f64(node: &kdl::KdlNode) -> Option<f64> {
    node.entries().first().and_then(|e| {
        let value = e.value();
        value.as_f64().or_else(|| value.as_i64().map(|i| i as f64))
    })
}

fn option_value<T>(node: &kdl::KdlNode, value: Option<T>, expected: &str) -> Result<T, ConfigError> {
    value.ok_or_else(|| ConfigError::Invalid {
        message: format!("`{}` expects {}", node.name().value(), expected),
    })
}

fn parse_global(node: &kdl::KdlNode) -> Result<GlobalConfig, ConfigError> {
    let mut global = GlobalConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "log-level" => {
                    if let Some(val) = first_string(child) {
                        global.log_level = val.parse().map_err(|e| ConfigError::Invalid {
                            message: e,
                        })?;
                    }
                }
                "cooldown" => {
                    global.cooldown = option_value(child, first_f64(child), "a number of seconds")?;
                }
                "tap-duration" => {
                    global.tap_duration =
                        option_value(child, first_f64(child), "a number of seconds")?;
                }
                "tick-rate" => {
                    let rate = child.entries().first().and_then(|e| e.value().as_i64());
                    let rate = option_value(child, rate, "an integer")?;
                    global.tick_rate = u32::try_from(rate).map_err(|_| ConfigError::Invalid {
                        message: format!("tick-rate {} is out of range", rate),
                    })?;
                }
                "atomic-registration" => {
                    let flag = child.entries().first().and_then(|e| e.value().as_bool());
                    global.atomic_registration = option_value(child, flag, "true or false")?;
                }
                name => {
                    tracing::warn!("Unknown global config option: {}", name);
                }
            }
        }
    }

    Ok(global)
}

/// Resolve every string or integer argument of `node` to a key code.
fn parse_keys(node: &kdl::KdlNode) -> Result<Vec<u16>, ConfigError> {
    let mut keys = Vec::new();
    for entry in node.entries() {
        if entry.name().is_some() {
            continue;
        }
        let value = entry.value();
        let code = if let Some(name) = value.as_string() {
            resolve_key(name).ok_or_else(|| ConfigError::UnknownKey {
                key: name.to_string(),
            })?
        } else if let Some(raw) = value.as_i64() {
            u16::try_from(raw).map_err(|_| ConfigError::UnknownKey {
                key: raw.to_string(),
            })?
        } else {
            return Err(ConfigError::UnknownKey {
                key: value.to_string(),
            });
        };
        keys.push(code);
    }
    Ok(keys)
}

fn parse_native_binding(node: &kdl::KdlNode) -> Result<NativeBindingConfig, ConfigError> {
    let label = first_string(node).ok_or_else(|| ConfigError::MissingField {
        field: "native binding label (e.g., `native-binding \"jump\" { ... }`)".to_string(),
    })?;

    let mut keys = Vec::new();
    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "key" => keys.extend(parse_keys(child)?),
                name => {
                    tracing::warn!("Unknown native-binding option: {}", name);
                }
            }
        }
    }

    Ok(NativeBindingConfig { label, keys })
}

fn parse_combination(node: &kdl::KdlNode) -> Result<CombinationConfig, ConfigError> {
    let mut args = node
        .entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string());

    let owner = args.next().ok_or_else(|| ConfigError::MissingField {
        field: "combination owner (e.g., `combination \"my-owner\" \"action\" { ... }`)"
            .to_string(),
    })?;
    let name = args.next().ok_or_else(|| ConfigError::MissingField {
        field: format!("name of a combination owned by '{}'", owner),
    })?;

    let mut chords = Vec::new();
    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "chord" => chords.push(parse_keys(child)?),
                other => {
                    tracing::warn!("Unknown combination option: {}", other);
                }
            }
        }
    }

    Ok(CombinationConfig {
        owner: owner.to_string(),
        name: name.to_string(),
        chords,
    })
}

fn parse_device(node: &kdl::KdlNode) -> Result<DeviceConfig, ConfigError> {
    let mut device = DeviceConfig {
        name: first_string(node),
        vendor_product: None,
    };

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "vendor-product" => {
                    device.vendor_product = first_string(child);
                }
                name => {
                    tracing::warn!("Unknown device config option: {}", name);
                }
            }
        }
    }

    if device.name.is_none() && device.vendor_product.is_none() {
        return Err(ConfigError::MissingField {
            field: "device name or vendor-product (e.g., `device \"My Keyboard\"`)".to_string(),
        });
    }

    Ok(device)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    let global = &config.global;
    if !(global.cooldown > 0.0) {
        return Err(ConfigError::Invalid {
            message: format!("cooldown must be positive, got {}", global.cooldown),
        });
    }
    if !(global.tap_duration > 0.0) {
        return Err(ConfigError::Invalid {
            message: format!("tap-duration must be positive, got {}", global.tap_duration),
        });
    }
    if !(1..=1000).contains(&global.tick_rate) {
        return Err(ConfigError::Invalid {
            message: format!("tick-rate must be between 1 and 1000, got {}", global.tick_rate),
        });
    }

    let mut labels = HashSet::new();
    for binding in &config.native_bindings {
        if !labels.insert(binding.label.as_str()) {
            return Err(ConfigError::Invalid {
                message: format!("native binding '{}' is declared twice", binding.label),
            });
        }
    }

    let mut combos = HashSet::new();
    for combo in &config.combinations {
        if !combos.insert((combo.owner.as_str(), combo.name.as_str())) {
            return Err(ConfigError::Invalid {
                message: format!("combination '{}' is declared twice", combo.label()),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let config = r#"
            global {
                log-level "debug"
                cooldown 0.08
                tap-duration 0.2
                tick-rate 120
                atomic-registration true
            }

            native-binding "jump" {
                key "KEY_SPACE"
                key "BTN_SOUTH"
            }

            combination "my-owner" "toggle-menu" {
                chord "ctrl" "m"
                chord "F5"
            }

            device "Test Keyboard" {
                vendor-product "3434:0361"
            }
        "#;

        let config = parse_config_str(config).unwrap();
        assert_eq!(config.global.log_level, LogLevel::Debug);
        assert_eq!(config.global.cooldown, 0.08);
        assert_eq!(config.global.tap_duration, 0.2);
        assert_eq!(config.global.tick_rate, 120);
        assert!(config.global.atomic_registration);

        assert_eq!(config.native_bindings.len(), 1);
        assert_eq!(config.native_bindings[0].label, "jump");
        assert_eq!(config.native_bindings[0].keys, vec![57, 304]);

        assert_eq!(config.combinations.len(), 1);
        let combo = &config.combinations[0];
        assert_eq!(combo.label(), "my-owner.toggle-menu");
        assert_eq!(combo.chords, vec![vec![29, 50], vec![63]]);

        assert_eq!(config.devices.len(), 1);
        assert!(config.devices[0].matches("Test Keyboard", "3434:0361"));
        assert!(!config.devices[0].matches("Other", "3434:0361"));
    }

    #[test]
    fn test_defaults_when_global_missing() {
        let config = parse_config_str("").unwrap();
        assert_eq!(config.global, GlobalConfig::default());
        assert!(config.combinations.is_empty());
    }

    #[test]
    fn test_integer_cooldown_accepted() {
        let config = parse_config_str("global { cooldown 1 }").unwrap();
        assert_eq!(config.global.cooldown, 1.0);
    }

    #[test]
    fn test_raw_key_codes() {
        let config = r#"
            combination "o" "n" {
                chord 29 "KEY_A"
            }
        "#;
        let config = parse_config_str(config).unwrap();
        assert_eq!(config.combinations[0].chords, vec![vec![29, 30]]);
    }

    #[test]
    fn test_unknown_key_error() {
        let config = r#"
            combination "o" "n" {
                chord "ctrl" "NotAKey"
            }
        "#;
        match parse_config_str(config) {
            Err(ConfigError::UnknownKey { key }) => assert_eq!(key, "NotAKey"),
            other => panic!("expected UnknownKey, got {:?}", other),
        }
    }

    #[test]
    fn test_combination_missing_name() {
        let result = parse_config_str(r#"combination "owner-only""#);
        assert!(matches!(result, Err(ConfigError::MissingField { .. })));
    }

    #[test]
    fn test_native_binding_missing_label() {
        let result = parse_config_str(r#"native-binding { key "A" }"#);
        assert!(matches!(result, Err(ConfigError::MissingField { .. })));
    }

    #[test]
    fn test_device_missing_name_error() {
        let result = parse_config_str("device");
        assert!(matches!(result, Err(ConfigError::MissingField { .. })));
    }

    #[test]
    fn test_duplicate_combination_rejected() {
        let config = r#"
            combination "o" "n" { chord "A"; }
            combination "o" "n" { chord "B"; }
        "#;
        assert!(matches!(
            parse_config_str(config),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        for config in [
            "global { cooldown 0 }",
            "global { tap-duration -1.0 }",
            "global { tick-rate 0 }",
            "global { tick-rate 5000 }",
            "global { tick-rate \"fast\" }",
            "global { atomic-registration \"yes\" }",
            "global { log-level \"loud\" }",
        ] {
            assert!(
                matches!(parse_config_str(config), Err(ConfigError::Invalid { .. })),
                "{} should be rejected",
                config
            );
        }
    }

    #[test]
    fn test_parse_error_has_span() {
        let result = parse_config_str("global {");
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_parse_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"combination "o" "n" {{ chord "KEY_F5"; }}"#).unwrap();

        let config = parse_config(file.path()).unwrap();
        assert_eq!(config.combinations[0].chords, vec![vec![63]]);
    }

    #[test]
    fn test_parse_config_missing_file() {
        let result = parse_config(Path::new("/nonexistent/keychord.kdl"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
