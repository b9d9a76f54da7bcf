use super::DeviceKind;
use super::color::{ChannelScale, Rgb};
use crate::utils::error::Result;

/// What to render on a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// One color on every light
    Solid { color: Rgb, brightness: u8 },
    /// A hue sweep across the device's lights
    Rainbow { brightness: u8 },
}

impl Pattern {
    /// Brightness in the backend's scale
    pub fn brightness(&self) -> u8 {
        match self {
            Pattern::Solid { brightness, .. } | Pattern::Rainbow { brightness } => *brightness,
        }
    }

    /// Undimmed color of light `index` out of `count`
    pub fn color_at(&self, index: usize, count: usize) -> Rgb {
        match self {
            Pattern::Solid { color, .. } => *color,
            Pattern::Rainbow { .. } => Rgb::from_hsv(index as f64 * 360.0 / count.max(1) as f64, 1.0, 1.0),
        }
    }
}

/// A device reported by a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub kind: DeviceKind,
    pub model: String,
    /// Addressable zones or LEDs
    pub lights: usize,
}

/// A vendor lighting SDK as seen by [`LightingPlugin`](super::LightingPlugin)
pub trait LightingBackend: 'static {
    /// Vendor name used in replies, e.g. `Logitech`
    fn vendor(&self) -> &str;

    /// Prefix of the plugin's command names, e.g. `logi`
    fn command_prefix(&self) -> &str;

    /// Range of channel and brightness values
    fn scale(&self) -> ChannelScale;

    /// Instructions sent the first time the SDK cannot be reached
    fn remediation(&self) -> &str;

    /// Open an SDK session
    fn connect(&mut self) -> Result<()>;

    /// Close the SDK session; harmless when none is open
    fn disconnect(&mut self);

    /// Devices the SDK can currently address
    fn devices(&mut self) -> Result<Vec<DeviceInfo>>;

    /// Render a pattern on every light of one device
    fn apply(&mut self, device: DeviceKind, pattern: Pattern) -> Result<()>;
}
