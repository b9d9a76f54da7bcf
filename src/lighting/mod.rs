//! Lighting Module
//!
//! This module contains the RGB lighting plugin. One [`LightingPlugin`]
//! serves a single vendor through a [`LightingBackend`]:
//! - zone: zone-addressed SDKs with percentage channels (Logitech)
//! - led: per-LED SDKs with session callbacks and byte channels (Corsair)
//! - simulated: an in-memory SDK implementing both, for the binaries and tests
//!
//! The plugin keeps the last color and brightness of every device so that
//! `bright_up` and `bright_down` are relative to what the device shows.

pub mod backend;
pub mod color;
pub mod led;
pub mod simulated;
pub mod zone;


use crate::config::LightingConfig;
use crate::server::command_registry::{CommandRegistry, Invocation, Plugin, command};
use crate::server::reporter::Reporter;
use crate::utils::error::PluginError;
use backend::{LightingBackend, Pattern};
use color::{ColorCommand, LightState};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::{info, warn};

/// Key of the color parameter
pub const COLOR_PARAMETER: &str = "color";

/// Device families the plugins can light
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    #[serde(alias = "headphone")]
    Headset,
    Keyboard,
    Mouse,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 3] = [DeviceKind::Headset, DeviceKind::Keyboard, DeviceKind::Mouse];

    /// Word used for the device in command names
    pub fn command_segment(self) -> &'static str {
        match self {
            DeviceKind::Headset => "headphone",
            DeviceKind::Keyboard => "keyboard",
            DeviceKind::Mouse => "mouse",
        }
    }

    /// Word used for the device in replies
    pub fn label(self) -> &'static str {
        match self {
            DeviceKind::Headset => "headset",
            DeviceKind::Keyboard => "keyboard",
            DeviceKind::Mouse => "mouse",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Name of the command changing a device's lights, e.g. `logi_change_mouse_lights`
pub fn change_lights_command(prefix: &str, device: DeviceKind) -> String {
    format!("{}_change_{}_lights", prefix, device.command_segment())
}

/// Name of the device listing command, e.g. `corsair_list_devices`
pub fn list_devices_command(prefix: &str) -> String {
    format!("{}_list_devices", prefix)
}

/// Lighting plugin for one vendor
pub struct LightingPlugin<B: LightingBackend> {
    name: String,
    backend: B,
    states: HashMap<DeviceKind, LightState>,
    brightness_step: u8,
    initialized: bool,
    remediation_shown: bool,
}

impl<B: LightingBackend> LightingPlugin<B> {
    /// Create a plugin; no SDK session is opened until a command needs one
    ///
    /// # Arguments
    /// * `name` - Plugin name used in logs
    /// * `backend` - The vendor backend
    /// * `config` - The `[lighting]` configuration section
    pub fn new(name: &str, backend: B, config: &LightingConfig) -> Self {
        Self {
            name: name.to_string(),
            backend,
            states: HashMap::new(),
            brightness_step: config.brightness_step,
            initialized: false,
            remediation_shown: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Last state applied to a device, or black at full brightness
    pub fn state(&self, device: DeviceKind) -> LightState {
        self.states
            .get(&device)
            .copied()
            .unwrap_or_else(|| LightState::off(self.backend.scale()))
    }

    /// Open the SDK session if needed, reporting a failure when it cannot be
    ///
    /// # Returns
    /// * `bool` - `true` if a session is open
    fn ensure_session(&mut self, out: &mut Reporter<'_>) -> bool {
        if self.initialized {
            return true;
        }

        match self.backend.connect() {
            Ok(()) => {
                info!("{} SDK session opened", self.backend.vendor());
                self.initialized = true;
                true
            }
            Err(e) => {
                warn!("Failed to connect to {} SDK: {}", self.backend.vendor(), e);
                out.failure(&self.unavailable_text());
                false
            }
        }
    }

    /// The remediation steps the first time, a short notice afterwards
    fn unavailable_text(&mut self) -> String {
        if self.remediation_shown {
            PluginError::Unavailable(self.backend.vendor().to_string()).to_string()
        } else {
            self.remediation_shown = true;
            self.backend.remediation().to_string()
        }
    }

    fn change_lights(&mut self, device: DeviceKind, params: &Value, out: &mut Reporter<'_>) {
        if !self.ensure_session(out) {
            return;
        }

        let vendor = self.backend.vendor().to_string();
        let failed = format!("Failed to update lighting for the {} {}.", vendor, device);

        let Some(color) = params
            .get(COLOR_PARAMETER)
            .and_then(Value::as_str)
            .and_then(ColorCommand::parse)
        else {
            warn!("Unknown or missing color for {}: {}", device, params);
            out.failure(&format!("{} Unknown or missing color.", failed));
            return;
        };

        let scale = self.backend.scale();
        let next = self.state(device).apply(color, self.brightness_step, scale);
        let pattern = match color {
            ColorCommand::Rainbow => Pattern::Rainbow {
                brightness: next.brightness,
            },
            _ => Pattern::Solid {
                color: next.color,
                brightness: next.brightness,
            },
        };

        match self.backend.apply(device, pattern) {
            Ok(()) => {
                info!("{} {} set to {:?}", vendor, device, next);
                self.states.insert(device, next);
                out.success(&format!("{} {} lighting updated.", vendor, device));
            }
            Err(e) => {
                warn!("Failed to update {} {}: {}", vendor, device, e);
                if matches!(e, PluginError::Unavailable(_)) {
                    self.initialized = false;
                }
                out.failure(&format!("{} {}", failed, e));
            }
        }
    }

    fn list_devices(&mut self, out: &mut Reporter<'_>) {
        if !self.ensure_session(out) {
            return;
        }

        let vendor = self.backend.vendor().to_string();
        match self.backend.devices() {
            Ok(devices) if devices.is_empty() => out.success(&format!("No {} devices found.", vendor)),
            Ok(devices) => {
                let lines: Vec<String> = devices
                    .iter()
                    .map(|d| format!("- {}: {} ({} lights)", d.kind, d.model, d.lights))
                    .collect();
                out.success(&format!("{} devices:\n{}", vendor, lines.join("\n")));
            }
            Err(e) => {
                warn!("Failed to list {} devices: {}", vendor, e);
                if matches!(e, PluginError::Unavailable(_)) {
                    self.initialized = false;
                }
                out.failure(&format!("Failed to list {} devices. {}", vendor, e));
            }
        }
    }
}

impl<B: LightingBackend> Plugin for LightingPlugin<B> {
    fn name(&self) -> &str {
        &self.name
    }

    fn register_commands(&self, registry: &mut CommandRegistry<Self>) {
        let prefix = self.backend.command_prefix();
        let vendor = self.backend.vendor();

        for device in DeviceKind::ALL {
            registry.register(
                change_lights_command(prefix, device),
                command::<Self, _>(
                    &format!("Change the color or brightness of the {} {}", vendor, device),
                    move |plugin, call: &Invocation<'_>, out| plugin.change_lights(device, call.params, out),
                ),
            );
        }

        registry.register(
            list_devices_command(prefix),
            command::<Self, _>(
                &format!("List the {} devices that can be lit", vendor),
                |plugin, _call: &Invocation<'_>, out| plugin.list_devices(out),
            ),
        );
    }

    fn initialize(&mut self, out: &mut Reporter<'_>) {
        if self.ensure_session(out) {
            out.success("");
        }
    }

    fn shutdown(&mut self, out: &mut Reporter<'_>) {
        self.backend.disconnect();
        self.initialized = false;
        info!("{} SDK session closed", self.backend.vendor());
        out.success("");
    }
}
