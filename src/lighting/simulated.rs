//! In-memory lighting SDK
//!
//! Implements both [`ZoneSdk`] and [`LedSdk`] without any vendor library.
//! Every write is recorded and can be read back through a [`SimMonitor`],
//! which stays valid after the SDK has been moved into a backend.

use super::DeviceKind;
use super::color::Rgb;
use super::led::{LedColor, LedDevice, LedSdk, SessionCallback, SessionState};
use super::zone::ZoneSdk;
use crate::config::SimulationConfig;
use crate::utils::error::{PluginError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

const VENDOR: &str = "Simulated";

/// Everything the simulated SDK has been asked to do
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimState {
    pub connected: bool,
    pub connect_attempts: usize,
    pub zone_colors: HashMap<(DeviceKind, usize), Rgb>,
    pub led_colors: HashMap<DeviceKind, Vec<LedColor>>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<SimState>,
    callback: Mutex<Option<SessionCallback>>,
}

/// Read access to a [`SimulatedSdk`] from outside the backend that owns it
#[derive(Clone)]
pub struct SimMonitor {
    shared: Arc<Shared>,
}

impl SimMonitor {
    /// Copy of the recorded state
    pub fn state(&self) -> SimState {
        lock(&self.shared.state).clone()
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.shared.state).connected
    }

    pub fn connect_attempts(&self) -> usize {
        lock(&self.shared.state).connect_attempts
    }

    /// Last color written to a zone
    pub fn zone(&self, device: DeviceKind, zone: usize) -> Option<Rgb> {
        lock(&self.shared.state).zone_colors.get(&(device, zone)).copied()
    }

    /// Last colors written to a device's LEDs
    pub fn leds(&self, device: DeviceKind) -> Vec<LedColor> {
        lock(&self.shared.state)
            .led_colors
            .get(&device)
            .cloned()
            .unwrap_or_default()
    }

    /// Deliver a session event as if it came from the SDK's own thread
    pub fn emit(&self, state: SessionState) {
        if let Some(callback) = lock(&self.shared.callback).as_ref() {
            callback(state);
        }
    }
}

/// Simulated SDK with a fixed set of attached devices
pub struct SimulatedSdk {
    devices: Vec<DeviceKind>,
    zones: usize,
    leds: usize,
    unreachable: bool,
    timeouts_on_connect: u32,
    shared: Arc<Shared>,
}

impl SimulatedSdk {
    /// Create an SDK with the given devices attached
    pub fn new(devices: Vec<DeviceKind>) -> Self {
        let defaults = SimulationConfig::default();
        Self {
            devices,
            zones: defaults.zones,
            leds: defaults.leds,
            unreachable: false,
            timeouts_on_connect: 0,
            shared: Arc::new(Shared::default()),
        }
    }

    /// Create an SDK from the `[simulation]` configuration section
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(config.devices.clone())
            .with_zones(config.zones)
            .with_leds(config.leds)
            .unreachable(config.unreachable)
    }

    /// Zones each device exposes
    pub fn with_zones(mut self, zones: usize) -> Self {
        self.zones = zones;
        self
    }

    /// LEDs each device exposes
    pub fn with_leds(mut self, leds: usize) -> Self {
        self.leds = leds;
        self
    }

    /// Refuse every connection attempt
    pub fn unreachable(mut self, unreachable: bool) -> Self {
        self.unreachable = unreachable;
        self
    }

    /// Report this many session timeouts right after connecting
    pub fn with_timeouts_on_connect(mut self, timeouts: u32) -> Self {
        self.timeouts_on_connect = timeouts;
        self
    }

    pub fn monitor(&self) -> SimMonitor {
        SimMonitor {
            shared: Arc::clone(&self.shared),
        }
    }

    fn open(&mut self) -> Result<()> {
        let mut state = lock(&self.shared.state);
        state.connect_attempts += 1;
        if self.unreachable {
            return Err(PluginError::Unavailable(VENDOR.to_string()));
        }
        state.connected = true;
        Ok(())
    }

    fn close(&mut self) {
        lock(&self.shared.state).connected = false;
    }

    fn ensure_connected(&self) -> Result<()> {
        if lock(&self.shared.state).connected {
            Ok(())
        } else {
            Err(PluginError::backend(VENDOR, "not connected"))
        }
    }

    fn kind_of(&self, device_id: &str) -> Result<DeviceKind> {
        self.devices
            .iter()
            .copied()
            .find(|kind| device_id_for(*kind) == device_id)
            .ok_or_else(|| PluginError::NotFound(format!("device {}", device_id)))
    }
}

impl ZoneSdk for SimulatedSdk {
    fn init(&mut self) -> Result<()> {
        self.open()
    }

    fn shutdown(&mut self) {
        self.close();
    }

    fn attached(&self) -> Vec<DeviceKind> {
        self.devices.clone()
    }

    fn set_zone_color(&mut self, device: DeviceKind, zone: usize, color: Rgb) -> Result<()> {
        self.ensure_connected()?;
        if !self.devices.contains(&device) || zone >= self.zones {
            return Err(PluginError::backend(VENDOR, format!("{} has no zone {}", device, zone)));
        }

        debug!("Zone {} of {} set to {:?}", zone, device, color);
        lock(&self.shared.state).zone_colors.insert((device, zone), color);
        Ok(())
    }
}

impl LedSdk for SimulatedSdk {
    fn connect(&mut self, on_state: SessionCallback) -> Result<()> {
        self.open()?;

        let mut slot = lock(&self.shared.callback);
        let callback = slot.insert(on_state);
        callback(SessionState::Connecting);
        callback(SessionState::Connected);
        for _ in 0..self.timeouts_on_connect {
            callback(SessionState::Timeout);
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        self.close();
        if let Some(callback) = lock(&self.shared.callback).take() {
            callback(SessionState::Closed);
        }
    }

    fn devices(&self) -> Result<Vec<LedDevice>> {
        self.ensure_connected()?;
        Ok(self
            .devices
            .iter()
            .map(|&kind| LedDevice {
                id: device_id_for(kind),
                kind,
                model: format!("{} {}", VENDOR, kind),
            })
            .collect())
    }

    fn led_ids(&self, device_id: &str) -> Result<Vec<u32>> {
        self.ensure_connected()?;
        self.kind_of(device_id)?;
        Ok((0..self.leds as u32).collect())
    }

    fn set_led_colors(&mut self, device_id: &str, colors: &[LedColor]) -> Result<()> {
        self.ensure_connected()?;
        let kind = self.kind_of(device_id)?;

        debug!("{} LEDs of {} updated", colors.len(), kind);
        lock(&self.shared.state).led_colors.insert(kind, colors.to_vec());
        Ok(())
    }
}

fn device_id_for(kind: DeviceKind) -> String {
    format!("sim-{}", kind)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
