//! Configuration data model

use keychord_core::{Combination, EngineSettings, KeyCode, NativeBinding, RegistrationPolicy};

/// Root configuration structure
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub global: GlobalConfig,
    pub native_bindings: Vec<NativeBindingConfig>,
    pub combinations: Vec<CombinationConfig>,
    pub devices: Vec<DeviceConfig>,
}

impl Config {
    /// The host binding catalog in engine form.
    pub fn native_catalog(&self) -> Vec<NativeBinding> {
        self.native_bindings
            .iter()
            .map(|b| NativeBinding::new(b.label.clone(), b.keys.iter().copied().map(KeyCode)))
            .collect()
    }
}

/// Global settings
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalConfig {
    pub log_level: LogLevel,
    /// Seconds a key stays ignored after a chord consumed it
    pub cooldown: f64,
    /// Holds shorter than this (seconds) count as taps
    pub tap_duration: f64,
    /// Engine ticks per second in the daemon
    pub tick_rate: u32,
    /// Roll back every chord of a registration that collides on any of them
    pub atomic_registration: bool,
}

impl GlobalConfig {
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            cooldown: self.cooldown,
            tap_duration: self.tap_duration,
            policy: if self.atomic_registration {
                RegistrationPolicy::Atomic
            } else {
                RegistrationPolicy::Compatible
            },
        }
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            cooldown: 0.05,
            tap_duration: 0.1,
            tick_rate: 60,
            atomic_registration: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive for `tracing_subscriber::EnvFilter`.
    pub fn as_filter(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

/// One of the host's own bindings, which owners may not shadow with a
/// single-key combination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeBindingConfig {
    pub label: String,
    /// Key codes (resolved from names)
    pub keys: Vec<u16>,
}

/// A combination declared by an owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinationConfig {
    pub owner: String,
    pub name: String,
    /// Alternative chords, each a list of key codes
    pub chords: Vec<Vec<u16>>,
}

impl CombinationConfig {
    /// `owner.name`
    pub fn label(&self) -> String {
        format!("{}.{}", self.owner, self.name)
    }

    pub fn combination(&self) -> Combination {
        let chords = self
            .chords
            .iter()
            .map(|chord| chord.iter().copied().map(KeyCode).collect())
            .collect();
        Combination::new(self.owner.clone(), self.name.clone(), chords)
    }
}

/// Input device to watch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Device name to match (from evdev)
    pub name: Option<String>,
    /// Vendor:Product ID to match (e.g., "3434:0361")
    pub vendor_product: Option<String>,
}

impl DeviceConfig {
    /// Whether a device with this name and id matches the entry.
    pub fn matches(&self, name: &str, vendor_product: &str) -> bool {
        let name_ok = self.name.as_deref().map_or(true, |n| n == name);
        let id_ok = self
            .vendor_product
            .as_deref()
            .map_or(true, |vp| vp.eq_ignore_ascii_case(vendor_product));
        name_ok && id_ok
    }
}
