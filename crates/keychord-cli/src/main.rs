//! keychord CLI
//!
//! Configuration checking and key inspection for keychord.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use clap::{Parser, Subcommand};
use keychord_config::{key_name, resolve_key, Config};
use keychord_core::{
    ChordEngine, InputSource, KeyCode, RecordingSink, RegistrationError, Severity,
};
use miette::IntoDiagnostic;
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "keychord")]
#[command(about = "Chord registry tool for keychord")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/keychord/config.kdl")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the configuration file and dry-run every registration
    Validate,

    /// Report which combinations collide with each other or with native bindings
    Collisions {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List available input devices
    Devices,

    /// Resolve key names to codes and registry slots
    Keys {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

/// Input source with nothing held, for dry runs.
struct Idle;

impl InputSource for Idle {
    fn is_key_down(&self, _key: KeyCode) -> bool {
        false
    }

    fn now(&self) -> f64 {
        0.0
    }

    fn tick(&self) -> u64 {
        0
    }
}

fn main() -> miette::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    // Expand tilde in config path
    let config_path: PathBuf = shellexpand::tilde(&cli.config).into_owned().into();

    match cli.command {
        Commands::Validate => cmd_validate(&config_path),
        Commands::Collisions { json } => cmd_collisions(&config_path, json),
        Commands::Devices => cmd_devices(),
        Commands::Keys { names } => cmd_keys(&names),
    }
}

fn load(config_path: &Path) -> miette::Result<Config> {
    tracing::debug!("Loading configuration from {}", config_path.display());
    Ok(keychord_config::parse_config(config_path)?)
}

/// Outcome of registering one configured combination.
#[derive(Debug, Serialize, PartialEq)]
struct RegistrationReport {
    label: String,
    registered: bool,
    /// Some chords stayed claimed after a failed registration
    partial: bool,
    error: Option<String>,
    collisions: Vec<String>,
}

/// Register every combination, in file order, into a fresh engine holding
/// the configured native bindings.
fn dry_run(config: &Config) -> (Vec<RegistrationReport>, Vec<(Severity, String)>) {
    let sink = Rc::new(RecordingSink::new());
    let mut engine =
        ChordEngine::with_settings(Idle, config.global.engine_settings()).with_sink(sink.clone());
    engine.refresh_native_bindings(config.native_catalog());

    let mut reports = Vec::new();
    for combo in &config.combinations {
        let combination = combo.combination();
        let collisions = engine
            .collisions_for(&combination)
            .iter()
            .map(ToString::to_string)
            .collect();
        let result = engine.register_combination(combination);
        reports.push(RegistrationReport {
            label: combo.label(),
            registered: result.is_ok(),
            partial: matches!(result, Err(RegistrationError::Taken { kept: Some(_), .. })),
            error: result.err().map(|e| e.to_string()),
            collisions,
        });
    }

    (reports, sink.drain())
}

fn cmd_validate(config_path: &Path) -> miette::Result<()> {
    println!("Validating configuration: {}", config_path.display());

    let config = load(config_path)?;
    println!("Configuration is valid!");
    println!("  Native bindings: {}", config.native_bindings.len());
    println!("  Devices: {}", config.devices.len());
    println!("  Combinations: {}", config.combinations.len());

    let (reports, messages) = dry_run(&config);
    for report in &reports {
        let status = match (report.registered, report.partial) {
            (true, _) => "ok",
            (false, true) => "partial",
            (false, false) => "failed",
        };
        println!("    - {} [{}]", report.label, status);
    }

    let problems: Vec<_> = messages
        .iter()
        .filter(|(severity, _)| *severity >= Severity::Warning)
        .collect();
    if !problems.is_empty() {
        println!();
        for (severity, message) in problems {
            println!("  {}: {}", severity, message);
        }
    }

    let failed = reports.iter().filter(|r| !r.registered).count();
    if failed > 0 {
        return Err(miette::miette!("{} combination(s) could not be registered", failed));
    }
    Ok(())
}

fn cmd_collisions(config_path: &Path, json: bool) -> miette::Result<()> {
    let config = load(config_path)?;
    let (reports, _) = dry_run(&config);

    if json {
        let out = serde_json::to_string_pretty(&reports).into_diagnostic()?;
        println!("{}", out);
        return Ok(());
    }

    let mut clean = true;
    for report in &reports {
        if report.collisions.is_empty() {
            continue;
        }
        clean = false;
        println!("{} collides with:", report.label);
        for collision in &report.collisions {
            println!("    - {}", collision);
        }
    }
    if clean {
        println!("No collisions.");
    }
    Ok(())
}

fn cmd_devices() -> miette::Result<()> {
    println!("Available input devices:\n");

    for entry in std::fs::read_dir("/dev/input").into_diagnostic()? {
        let entry = entry.into_diagnostic()?;
        let path = entry.path();

        if !path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("event"))
            .unwrap_or(false)
        {
            continue;
        }

        match evdev::Device::open(&path) {
            Ok(device) => {
                let name = device.name().unwrap_or("Unknown");
                let id = device.input_id();
                let vendor_product = format!("{:04x}:{:04x}", id.vendor(), id.product());

                let has_key = |key: evdev::Key| {
                    device.supported_events().contains(evdev::EventType::KEY)
                        && device
                            .supported_keys()
                            .map(|keys| keys.contains(key))
                            .unwrap_or(false)
                };

                let device_type = if has_key(evdev::Key::KEY_A) {
                    "keyboard"
                } else if has_key(evdev::Key::BTN_SOUTH) {
                    "gamepad"
                } else {
                    "other"
                };

                println!("  {} [{}]", name, device_type);
                println!("    Path: {}", path.display());
                println!("    ID: {}", vendor_product);
                println!();
            }
            Err(_) => {
                // Skip devices we can't open
            }
        }
    }

    Ok(())
}

fn describe_key(name: &str) -> Option<String> {
    let code = resolve_key(name)?;
    let key = KeyCode(code);
    let folded = if key.slot() == usize::from(code) {
        String::new()
    } else {
        format!(", folded from {}", code)
    };
    Some(format!(
        "{} -> {} (code {}, slot {}{})",
        name,
        key_name(code),
        code,
        key.slot(),
        folded
    ))
}

fn cmd_keys(names: &[String]) -> miette::Result<()> {
    let mut unknown = Vec::new();
    for name in names {
        match describe_key(name) {
            Some(line) => println!("{}", line),
            None => {
                println!("{} -> unknown key", name);
                unknown.push(name.as_str());
            }
        }
    }

    if !unknown.is_empty() {
        return Err(keychord_config::ConfigError::UnknownKey {
            key: unknown.join(", "),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(src: &str) -> Config {
        keychord_config::parse_config_str(src).unwrap()
    }

    #[test]
    fn test_dry_run_clean() {
        let (reports, _) = dry_run(&config(
            r#"
            combination "a" "one" { chord "KEY_LEFTCTRL" "KEY_A"; }
            combination "b" "two" { chord "KEY_B"; }
            "#,
        ));

        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.registered && r.collisions.is_empty()));
    }

    #[test]
    fn test_dry_run_reports_collisions() {
        let (reports, messages) = dry_run(&config(
            r#"
            native-binding "jump" { key "KEY_SPACE"; }
            combination "a" "one" { chord "KEY_LEFTCTRL" "KEY_A"; }
            combination "b" "two" {
                chord "KEY_A" "KEY_LEFTCTRL"
                chord "KEY_SPACE"
            }
            "#,
        ));

        let two = &reports[1];
        assert!(!two.registered);
        assert!(!two.partial);
        assert_eq!(two.collisions, vec!["a.one", "native.jump"]);
        assert!(messages
            .iter()
            .any(|(s, m)| *s == Severity::Error && m.contains("already in use")));
    }

    #[test]
    fn test_dry_run_partial_registration() {
        let (reports, _) = dry_run(&config(
            r#"
            combination "a" "one" { chord "KEY_F5"; }
            combination "b" "two" {
                chord "KEY_F5"
                chord "KEY_F6"
            }
            "#,
        ));

        assert!(reports[1].partial);
        assert_eq!(reports[1].collisions, vec!["a.one"]);
    }

    #[test]
    fn test_dry_run_atomic_policy() {
        let (reports, _) = dry_run(&config(
            r#"
            global { atomic-registration true; }
            combination "a" "one" { chord "KEY_F5"; }
            combination "b" "two" {
                chord "KEY_F5"
                chord "KEY_F6"
            }
            "#,
        ));

        assert!(!reports[1].registered);
        assert!(!reports[1].partial);
    }

    #[test]
    fn test_dry_run_invalid_chord() {
        let (reports, _) = dry_run(&config(
            r#"
            combination "a" "dup" { chord "KEY_A" "KEY_A"; }
            "#,
        ));

        assert!(!reports[0].registered);
        assert_eq!(reports[0].error.as_deref(), Some("invalid combination"));
    }

    #[test]
    fn test_report_json_shape() {
        let report = RegistrationReport {
            label: "a.one".to_string(),
            registered: true,
            partial: false,
            error: None,
            collisions: vec![],
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["label"], "a.one");
        assert_eq!(value["registered"], true);
        assert!(value["error"].is_null());
    }

    #[test]
    fn test_describe_key() {
        assert_eq!(
            describe_key("a").as_deref(),
            Some("a -> KEY_A (code 30, slot 30)")
        );
        assert!(describe_key("BTN_TRIGGER_HAPPY1")
            .unwrap()
            .ends_with("(code 704, slot 344, folded from 704)"));
        assert_eq!(describe_key("banana"), None);
    }
}
