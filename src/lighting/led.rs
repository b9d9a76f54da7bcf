//! Per-LED SDKs with session callbacks
//!
//! The SDK reports session state changes through a callback that may run on
//! one of its own threads. The callback only records what happened in a
//! [`SessionSnapshot`]; the dispatch thread reads the snapshot before each
//! SDK call and does the actual work (device refresh, teardown).

use super::DeviceKind;
use super::backend::{DeviceInfo, LightingBackend, Pattern};
use super::color::{ChannelScale, Rgb};
use crate::utils::error::{PluginError, Result};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

const VENDOR: &str = "Corsair";
const COMMAND_PREFIX: &str = "corsair";
const REMEDIATION: &str = "Oops! The Corsair lighting plugin couldn't update your lighting. To fix this:\n\
    1. Verify the Corsair devices are connected.\n\
    2. Ensure iCUE is installed and running.\n\
    3. In iCUE, give permission to the plugin.\n\
    4. In Windows, go to Settings > Personalization > Dynamic Lighting and disable 'Use Dynamic Lighting on my devices.'\n\
    5. Restart the host application.\n";

/// Session states reported by the SDK
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Connected,
    Timeout,
    Closed,
}

/// Session events recorded since the last check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub connected: bool,
    /// Timeouts since the session was opened
    pub timeouts: u32,
    /// A `Connected` event has not been followed by a device refresh yet
    pub refresh_pending: bool,
}

impl SessionSnapshot {
    fn record(&mut self, state: SessionState) {
        match state {
            SessionState::Connected => {
                self.connected = true;
                self.refresh_pending = true;
            }
            SessionState::Timeout => self.timeouts += 1,
            SessionState::Closed => self.connected = false,
            SessionState::Connecting => {}
        }
    }
}

/// Callback handed to [`LedSdk::connect`]
pub type SessionCallback = Box<dyn Fn(SessionState) + Send + Sync>;

/// A device as enumerated by the SDK
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedDevice {
    pub id: String,
    pub kind: DeviceKind,
    pub model: String,
}

/// Color of one LED; `alpha` carries brightness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedColor {
    pub id: u32,
    pub color: Rgb,
    pub alpha: u8,
}

/// Calls an LED SDK must provide
pub trait LedSdk {
    /// Request a session; state changes arrive through `on_state`
    fn connect(&mut self, on_state: SessionCallback) -> Result<()>;

    fn disconnect(&mut self);

    /// Keyboards, mice and headsets currently known to the SDK
    fn devices(&self) -> Result<Vec<LedDevice>>;

    fn led_ids(&self, device_id: &str) -> Result<Vec<u32>>;

    fn set_led_colors(&mut self, device_id: &str, colors: &[LedColor]) -> Result<()>;
}

/// [`LightingBackend`] over an [`LedSdk`]
pub struct LedBackend<S: LedSdk> {
    sdk: S,
    snapshot: Arc<Mutex<SessionSnapshot>>,
    devices: Vec<LedDevice>,
    attempt_limit: u32,
}

impl<S: LedSdk> LedBackend<S> {
    /// Create a backend that drops its session after `attempt_limit` timeouts
    pub fn new(sdk: S, attempt_limit: u32) -> Self {
        Self {
            sdk,
            snapshot: Arc::new(Mutex::new(SessionSnapshot::default())),
            devices: Vec::new(),
            attempt_limit,
        }
    }

    pub fn sdk(&self) -> &S {
        &self.sdk
    }

    /// Copy of the session state as last reported by the SDK
    pub fn snapshot(&self) -> SessionSnapshot {
        lock(&self.snapshot).clone()
    }

    /// Act on session events recorded by the callback
    fn sync_session(&mut self) -> Result<()> {
        let snapshot = {
            let mut guard = lock(&self.snapshot);
            let current = guard.clone();
            guard.refresh_pending = false;
            current
        };

        if snapshot.timeouts >= self.attempt_limit {
            warn!(
                "{} session timed out {} times, disconnecting",
                VENDOR, snapshot.timeouts
            );
            self.close_session();
            return Err(PluginError::Unavailable(VENDOR.to_string()));
        }

        if snapshot.refresh_pending {
            self.devices = self.sdk.devices()?;
            info!("{} session connected with {} devices", VENDOR, self.devices.len());
        }

        Ok(())
    }

    fn close_session(&mut self) {
        self.sdk.disconnect();
        self.devices.clear();
        *lock(&self.snapshot) = SessionSnapshot::default();
        info!("{} session closed", VENDOR);
    }

    fn find_device(&self, kind: DeviceKind) -> Result<&LedDevice> {
        self.devices
            .iter()
            .find(|device| device.kind == kind)
            .ok_or_else(|| PluginError::NotFound(format!("no {} {} is connected", VENDOR, kind)))
    }
}

impl<S: LedSdk + 'static> LightingBackend for LedBackend<S> {
    fn vendor(&self) -> &str {
        VENDOR
    }

    fn command_prefix(&self) -> &str {
        COMMAND_PREFIX
    }

    fn scale(&self) -> ChannelScale {
        ChannelScale::Byte
    }

    fn remediation(&self) -> &str {
        REMEDIATION
    }

    fn connect(&mut self) -> Result<()> {
        *lock(&self.snapshot) = SessionSnapshot::default();

        let snapshot = Arc::clone(&self.snapshot);
        self.sdk.connect(Box::new(move |state| {
            lock(&snapshot).record(state);
        }))?;

        if let Err(e) = self.sync_session() {
            // A timeout storm already closed the session
            if self.snapshot().connected {
                self.close_session();
            }
            return Err(e);
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        self.close_session();
    }

    fn devices(&mut self) -> Result<Vec<DeviceInfo>> {
        self.sync_session()?;

        self.devices
            .iter()
            .map(|device| {
                Ok(DeviceInfo {
                    kind: device.kind,
                    model: device.model.clone(),
                    lights: self.sdk.led_ids(&device.id)?.len(),
                })
            })
            .collect()
    }

    fn apply(&mut self, device: DeviceKind, pattern: Pattern) -> Result<()> {
        self.sync_session()?;

        let target = self.find_device(device)?;
        let ids = self.sdk.led_ids(&target.id)?;
        let colors: Vec<LedColor> = ids
            .iter()
            .enumerate()
            .map(|(index, &id)| LedColor {
                id,
                color: pattern.color_at(index, ids.len()),
                alpha: pattern.brightness(),
            })
            .collect();

        debug!("Setting {} LEDs on {}", colors.len(), target.model);
        let target_id = target.id.clone();
        self.sdk.set_led_colors(&target_id, &colors)
    }
}

fn lock(snapshot: &Mutex<SessionSnapshot>) -> MutexGuard<'_, SessionSnapshot> {
    snapshot.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// SDK that connects but cannot enumerate devices
    #[derive(Default)]
    struct NoEnumerationSdk {
        connects: usize,
        disconnects: usize,
        callback: Option<SessionCallback>,
    }

    impl LedSdk for NoEnumerationSdk {
        fn connect(&mut self, on_state: SessionCallback) -> Result<()> {
            self.connects += 1;
            on_state(SessionState::Connected);
            self.callback = Some(on_state);
            Ok(())
        }

        fn disconnect(&mut self) {
            self.disconnects += 1;
            if let Some(callback) = self.callback.take() {
                callback(SessionState::Closed);
            }
        }

        fn devices(&self) -> Result<Vec<LedDevice>> {
            Err(PluginError::backend("Test", "enumeration failed"))
        }

        fn led_ids(&self, _device_id: &str) -> Result<Vec<u32>> {
            Ok(Vec::new())
        }

        fn set_led_colors(&mut self, _device_id: &str, _colors: &[LedColor]) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_snapshot_records_events() {
        let mut snapshot = SessionSnapshot::default();
        snapshot.record(SessionState::Connecting);
        snapshot.record(SessionState::Connected);
        snapshot.record(SessionState::Timeout);
        assert_eq!(
            snapshot,
            SessionSnapshot {
                connected: true,
                timeouts: 1,
                refresh_pending: true
            }
        );

        snapshot.record(SessionState::Closed);
        assert!(!snapshot.connected);
    }

    /// A failed device refresh after connecting closes the session again
    #[test]
    fn test_failed_refresh_closes_session() {
        let mut backend = LedBackend::new(NoEnumerationSdk::default(), 5);

        assert!(matches!(backend.connect(), Err(PluginError::Backend { .. })));
        assert_eq!(backend.sdk().disconnects, 1);
        assert_eq!(backend.snapshot(), SessionSnapshot::default());

        assert!(backend.connect().is_err());
        assert_eq!(backend.sdk().connects, 2);
        assert_eq!(backend.sdk().disconnects, 2);
    }

    /// A timeout storm closes the session exactly once
    #[test]
    fn test_timeout_storm_closes_once() {
        let mut backend = LedBackend::new(NoEnumerationSdk::default(), 0);

        assert!(matches!(backend.connect(), Err(PluginError::Unavailable(_))));
        assert_eq!(backend.sdk().disconnects, 1);
    }
}
