use std::fmt;

/// Which textual format a color was parsed from, so adjustments can be
/// written back in the same notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorFormat {
    Rgba,
    Hex,
}

/// Straight (non-premultiplied) color with alpha in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0.0);

    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parses `rgba(r, g, b, a)` or `#rrggbb` / `#rgb`.
    pub fn parse(text: &str) -> Option<(Self, ColorFormat)> {
        let text = text.trim();
        if let Some(hex) = text.strip_prefix('#') {
            return Self::parse_hex(hex).map(|c| (c, ColorFormat::Hex));
        }
        Self::parse_rgba(text).map(|c| (c, ColorFormat::Rgba))
    }

    fn parse_hex(hex: &str) -> Option<Self> {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => return None,
        };
        let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?, 1.0))
    }

    fn parse_rgba(text: &str) -> Option<Self> {
        let prefix = text.get(..5)?;
        if !prefix.eq_ignore_ascii_case("rgba(") {
            return None;
        }
        let body = text[5..].strip_suffix(')')?;

        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        let [r, g, b, a] = parts.as_slice() else {
            return None;
        };
        let channel = |s: &str| s.parse::<u16>().ok().map(|v| v.min(255) as u8);
        let alpha: f32 = a.parse().ok()?;
        if !alpha.is_finite() {
            return None;
        }

        Some(Self::new(channel(*r)?, channel(*g)?, channel(*b)?, alpha.clamp(0.0, 1.0)))
    }

    /// Adds `amount` to each of r, g and b, rounding and clamping to 0-255.
    /// Alpha is kept.
    pub fn adjusted(self, amount: f32) -> Self {
        let shift = |c: u8| (c as f32 + amount).round().clamp(0.0, 255.0) as u8;
        Self::new(shift(self.r), shift(self.g), shift(self.b), self.a)
    }

    pub fn lerp(self, other: Rgba, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Self::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            self.a + (other.a - self.a) * t,
        )
    }

    pub fn to_css(self, format: ColorFormat) -> String {
        match format {
            ColorFormat::Rgba => format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a),
            ColorFormat::Hex => format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b),
        }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css(ColorFormat::Rgba))
    }
}

/// Lightens (positive `amount`) or darkens a color string, keeping its
/// notation. Unrecognized strings come back unchanged.
pub fn adjust_color(color: &str, amount: f32) -> String {
    match Rgba::parse(color) {
        Some((rgba, format)) => rgba.adjusted(amount).to_css(format),
        None => color.to_string(),
    }
}
