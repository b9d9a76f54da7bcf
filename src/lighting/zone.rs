//! Zone-addressed SDKs
//!
//! These SDKs take one color per (device, zone) pair with channels given as
//! percentages and have no device enumeration of their own. Writing to a zone
//! a device does not have fails, which is how the sweep finds the end of a
//! device.

use super::DeviceKind;
use super::backend::{DeviceInfo, LightingBackend, Pattern};
use super::color::{ChannelScale, Rgb};
use crate::utils::error::Result;
use tracing::{debug, info};

const VENDOR: &str = "Logitech";
const COMMAND_PREFIX: &str = "logi";
const REMEDIATION: &str = "Oops! The Logitech lighting plugin couldn't update your lighting. To fix this:\n\
    1. Ensure Logitech G Hub is installed and running.\n\
    2. In G Hub, enable 'Allow programs to control lighting' (Settings > Allow Games and Applications to Control Illumination).\n\
    3. In Windows, go to Settings > Personalization > Dynamic Lighting and disable 'Use Dynamic Lighting on my devices.'\n\
    4. Restart the host application.\n";

/// Calls a zone-addressed SDK must provide
pub trait ZoneSdk {
    /// Start the SDK
    fn init(&mut self) -> Result<()>;

    /// Stop the SDK
    fn shutdown(&mut self);

    /// Device kinds currently attached
    fn attached(&self) -> Vec<DeviceKind>;

    /// Set one zone; channels are percentages
    fn set_zone_color(&mut self, device: DeviceKind, zone: usize, color: Rgb) -> Result<()>;
}

/// [`LightingBackend`] over a [`ZoneSdk`]
pub struct ZoneBackend<S: ZoneSdk> {
    sdk: S,
    max_zones: usize,
}

impl<S: ZoneSdk> ZoneBackend<S> {
    /// Create a backend writing zones `0..max_zones`
    pub fn new(sdk: S, max_zones: usize) -> Self {
        Self { sdk, max_zones }
    }

    pub fn sdk(&self) -> &S {
        &self.sdk
    }
}

impl<S: ZoneSdk + 'static> LightingBackend for ZoneBackend<S> {
    fn vendor(&self) -> &str {
        VENDOR
    }

    fn command_prefix(&self) -> &str {
        COMMAND_PREFIX
    }

    fn scale(&self) -> ChannelScale {
        ChannelScale::Percent
    }

    fn remediation(&self) -> &str {
        REMEDIATION
    }

    fn connect(&mut self) -> Result<()> {
        self.sdk.init()?;
        info!("{} SDK initialized", VENDOR);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.sdk.shutdown();
        info!("{} SDK shut down", VENDOR);
    }

    fn devices(&mut self) -> Result<Vec<DeviceInfo>> {
        Ok(self
            .sdk
            .attached()
            .into_iter()
            .map(|kind| DeviceInfo {
                kind,
                model: format!("{} {}", VENDOR, kind),
                lights: self.max_zones,
            })
            .collect())
    }

    /// Zone 0 failing means the device could not be reached. A later zone
    /// failing means the device has fewer zones, and ends the sweep.
    fn apply(&mut self, device: DeviceKind, pattern: Pattern) -> Result<()> {
        let brightness = pattern.brightness();
        let max = ChannelScale::Percent.max();

        for zone in 0..self.max_zones {
            let color = pattern
                .color_at(zone, self.max_zones)
                .dimmed(brightness, max)
                .to_percent();

            if let Err(e) = self.sdk.set_zone_color(device, zone, color) {
                if zone == 0 {
                    return Err(e);
                }
                debug!("{} has {} zones", device, zone);
                break;
            }
        }

        Ok(())
    }
}
