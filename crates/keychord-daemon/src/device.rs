//! Device enumeration and event forwarding

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use evdev::{Device, EventType, InputEventKind};
use keychord_config::DeviceConfig;
use tokio::sync::mpsc;

use crate::snapshot::KeyInput;

/// Information about an input device
#[derive(Debug)]
pub struct DeviceInfo {
    pub path: PathBuf,
    pub name: String,
    pub vendor: u16,
    pub product: u16,
}

impl DeviceInfo {
    fn from_device(path: &Path, device: &Device) -> Self {
        let id = device.input_id();
        Self {
            path: path.to_path_buf(),
            name: device.name().unwrap_or("Unknown").to_string(),
            vendor: id.vendor(),
            product: id.product(),
        }
    }

    /// Get vendor:product string (e.g., "3434:0361")
    pub fn vendor_product(&self) -> String {
        format!("{:04x}:{:04x}", self.vendor, self.product)
    }

    /// Whether the `device` entries of the config admit this device.
    /// No entries means every device is watched.
    pub fn is_selected(&self, filters: &[DeviceConfig]) -> bool {
        filters.is_empty()
            || filters
                .iter()
                .any(|f| f.matches(&self.name, &self.vendor_product()))
    }
}

/// Check if a device is a keyboard
pub fn is_keyboard(device: &Device) -> bool {
    device.supported_events().contains(EventType::KEY)
        && device
            .supported_keys()
            .map(|keys| keys.contains(evdev::Key::KEY_A))
            .unwrap_or(false)
}

/// Check if a device is a gamepad
pub fn is_gamepad(device: &Device) -> bool {
    device.supported_events().contains(EventType::KEY)
        && device
            .supported_keys()
            .map(|keys| keys.contains(evdev::Key::BTN_SOUTH))
            .unwrap_or(false)
}

/// Open every keyboard or gamepad under /dev/input admitted by `filters`.
pub fn open_devices(filters: &[DeviceConfig]) -> Result<Vec<(DeviceInfo, Device)>> {
    let mut devices = Vec::new();

    for entry in std::fs::read_dir("/dev/input").context("Failed to read /dev/input")? {
        let entry = entry?;
        let path = entry.path();

        // Only look at event* devices
        if !path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("event"))
            .unwrap_or(false)
        {
            continue;
        }

        let device = match Device::open(&path) {
            Ok(device) => device,
            Err(e) => {
                tracing::debug!("Could not open {}: {}", path.display(), e);
                continue;
            }
        };

        if !is_keyboard(&device) && !is_gamepad(&device) {
            continue;
        }

        let info = DeviceInfo::from_device(&path, &device);
        if !info.is_selected(filters) {
            tracing::debug!(
                "Device '{}' ({}) is not in the configuration, skipping",
                info.name,
                info.vendor_product()
            );
            continue;
        }

        devices.push((info, device));
    }

    devices.sort_by(|a, b| a.0.path.cmp(&b.0.path));
    Ok(devices)
}

/// Translate a raw event into a key transition. Autorepeat is dropped.
pub fn key_input(event: &evdev::InputEvent) -> Option<KeyInput> {
    match event.kind() {
        InputEventKind::Key(key) => match event.value() {
            0 => Some(KeyInput {
                code: key.code(),
                pressed: false,
            }),
            1 => Some(KeyInput {
                code: key.code(),
                pressed: true,
            }),
            _ => None,
        },
        _ => None,
    }
}

/// Spawn a task forwarding key transitions of `device` into `tx`.
///
/// The task ends when the device goes away or the receiver is dropped.
pub fn spawn_reader(
    info: DeviceInfo,
    device: Device,
    tx: mpsc::Sender<KeyInput>,
) -> Result<tokio::task::JoinHandle<()>> {
    let mut stream = device.into_event_stream().with_context(|| {
        format!(
            "Failed to create event stream for device '{}' at {}",
            info.name,
            info.path.display()
        )
    })?;

    Ok(tokio::spawn(async move {
        loop {
            match stream.next_event().await {
                Ok(event) => {
                    if let Some(input) = key_input(&event) {
                        if tx.send(input).await.is_err() {
                            break;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Device '{}' stopped: {}", info.name, e);
                    break;
                }
            }
        }
        tracing::debug!("Reader for {} finished", info.path.display());
    }))
}
