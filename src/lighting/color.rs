//! Color model shared by every lighting backend
//!
//! Colors are kept as 8-bit RGB. Backends with a percentage scale convert at
//! the edge with [`Rgb::to_percent`]. Brightness lives next to the color in
//! [`LightState`] and is measured in the backend's own scale.

/// An 8-bit RGB color
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Convert each channel from 0..=255 to 0..=100
    pub fn to_percent(self) -> Self {
        Self::new(percent(self.red), percent(self.green), percent(self.blue))
    }

    /// Scale each channel by `level / max`, rounding to nearest
    pub fn dimmed(self, level: u8, max: u8) -> Self {
        if max == 0 || level >= max {
            return self;
        }
        let scale = |channel: u8| (f64::from(channel) * f64::from(level) / f64::from(max)).round() as u8;
        Self::new(scale(self.red), scale(self.green), scale(self.blue))
    }

    /// Create a color from HSV. `h` in degrees, `s` and `v` in [0, 1].
    pub fn from_hsv(h: f64, s: f64, v: f64) -> Self {
        let h = h.rem_euclid(360.0);
        let c = v * s;
        let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
        let m = v - c;

        let (r1, g1, b1) = match h as u16 {
            0..60 => (c, x, 0.0),
            60..120 => (x, c, 0.0),
            120..180 => (0.0, c, x),
            180..240 => (0.0, x, c),
            240..300 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };

        Self::new(
            ((r1 + m) * 255.0).round() as u8,
            ((g1 + m) * 255.0).round() as u8,
            ((b1 + m) * 255.0).round() as u8,
        )
    }
}

/// Convert one 8-bit channel to a percentage: `round(value * 100 / 255)`
pub fn percent(value: u8) -> u8 {
    (f64::from(value) * 100.0 / 255.0).round() as u8
}

const NAMED_COLORS: &[(&str, Rgb)] = &[
    ("red", Rgb::new(255, 0, 0)),
    ("green", Rgb::new(0, 255, 0)),
    ("blue", Rgb::new(0, 0, 255)),
    ("cyan", Rgb::new(0, 255, 255)),
    ("magenta", Rgb::new(255, 0, 255)),
    ("yellow", Rgb::new(255, 255, 0)),
    ("black", Rgb::BLACK),
    ("white", Rgb::WHITE),
    ("grey", Rgb::new(128, 128, 128)),
    ("gray", Rgb::new(128, 128, 128)),
    ("orange", Rgb::new(255, 165, 0)),
    ("purple", Rgb::new(128, 0, 128)),
    ("violet", Rgb::new(128, 0, 128)),
    ("pink", Rgb::new(255, 192, 203)),
    ("teal", Rgb::new(0, 128, 128)),
    ("brown", Rgb::new(165, 42, 42)),
    ("ice_blue", Rgb::new(173, 216, 230)),
    ("crimson", Rgb::new(220, 20, 60)),
    ("gold", Rgb::new(255, 215, 0)),
    ("neon_green", Rgb::new(57, 255, 20)),
];

/// Look up a named color, ignoring case
pub fn named_color(name: &str) -> Option<Rgb> {
    let name = name.to_lowercase();
    NAMED_COLORS
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, rgb)| *rgb)
}

/// Names accepted by [`named_color`], in table order
pub fn color_names() -> impl Iterator<Item = &'static str> {
    NAMED_COLORS.iter().map(|(name, _)| *name)
}

/// The value range a backend uses for channels and brightness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelScale {
    /// 0..=255
    Byte,
    /// 0..=100
    Percent,
}

impl ChannelScale {
    /// Full brightness in this scale
    pub fn max(self) -> u8 {
        match self {
            ChannelScale::Byte => u8::MAX,
            ChannelScale::Percent => 100,
        }
    }
}

/// What the `color` parameter asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorCommand {
    /// A named color; `off` is black
    Set(Rgb),
    BrightUp,
    BrightDown,
    Rainbow,
}

impl ColorCommand {
    /// Parse the `color` parameter, ignoring case
    ///
    /// # Returns
    /// * `Option<ColorCommand>` - `None` for an unknown color
    pub fn parse(text: &str) -> Option<Self> {
        match text.to_lowercase().as_str() {
            "off" => Some(ColorCommand::Set(Rgb::BLACK)),
            "bright_up" => Some(ColorCommand::BrightUp),
            "bright_down" => Some(ColorCommand::BrightDown),
            "rainbow" => Some(ColorCommand::Rainbow),
            other => named_color(other).map(ColorCommand::Set),
        }
    }
}

/// Last color and brightness applied to one device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightState {
    pub color: Rgb,
    /// In the backend's [`ChannelScale`]
    pub brightness: u8,
}

impl LightState {
    /// Black at full brightness
    pub fn off(scale: ChannelScale) -> Self {
        Self {
            color: Rgb::BLACK,
            brightness: scale.max(),
        }
    }

    /// State after applying a color command
    ///
    /// Setting a color restores full brightness. Brightness steps saturate at
    /// the ends of the scale. `Rainbow` leaves the state as it is.
    pub fn apply(self, command: ColorCommand, step: u8, scale: ChannelScale) -> Self {
        match command {
            ColorCommand::Set(color) => Self {
                color,
                brightness: scale.max(),
            },
            ColorCommand::BrightUp => Self {
                brightness: self.brightness.saturating_add(step).min(scale.max()),
                ..self
            },
            ColorCommand::BrightDown => Self {
                brightness: self.brightness.saturating_sub(step).min(scale.max()),
                ..self
            },
            ColorCommand::Rainbow => self,
        }
    }
}
