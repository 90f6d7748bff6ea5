//! Colors for attributes.
//!
//! Grounded on `wezterm-term`'s `color.rs`: a plain `RgbColor`, a
//! `ColorAttribute` sum type (default-fg / default-bg / palette index /
//! direct rgb), and a `ColorPalette` that resolves either into concrete
//! bytes. We add an 8-bit alpha channel (spec §3 "RGBA, 8 bits per
//! channel") and the 6x6x6 + grayscale xterm-256 cube the spec's palette
//! requires, which the legacy `color.rs` this is modeled on did not have.

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl Color {
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha: 0xff,
        }
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 {
            return None;
        }
        let red = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let green = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let blue = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self::rgb(red, green, blue))
    }

    /// Parses xterm's `rgb:RR/GG/BB` OSC 4 payload form.
    pub fn from_xterm_rgb_spec(spec: &str) -> Option<Self> {
        let rest = spec.strip_prefix("rgb:")?;
        let mut parts = rest.split('/');
        let r = parts.next()?;
        let g = parts.next()?;
        let b = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        let component = |s: &str| -> Option<u8> {
            // xterm allows 1, 2, or 4 hex digits per component; we keep
            // only the most significant byte.
            let v = u32::from_str_radix(s, 16).ok()?;
            let bits = s.len() * 4;
            let shift = bits.saturating_sub(8);
            Some(((v >> shift) & 0xff) as u8)
        };
        Some(Self::rgb(component(r)?, component(g)?, component(b)?))
    }
}

/// Indirection for a color used in a cell's attributes: either one of the
/// terminal's two logical defaults, a palette slot, or a direct 24-bit
/// value (SGR 38/48;2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorAttribute {
    Default,
    PaletteIndex(u8),
    Rgb(Color),
}

impl Default for ColorAttribute {
    fn default() -> Self {
        ColorAttribute::Default
    }
}

const XTERM_CUBE_STEPS: [u8; 6] = [0x00, 0x5f, 0x87, 0xaf, 0xd7, 0xff];

fn build_xterm_colors() -> [Color; 256] {
    let mut colors = [Color::default(); 256];
    // 0-15: classic ANSI, normal then bright.
    const BASE: [(u8, u8, u8); 8] = [
        (0x00, 0x00, 0x00),
        (0xaa, 0x00, 0x00),
        (0x00, 0xaa, 0x00),
        (0xaa, 0x55, 0x00),
        (0x00, 0x00, 0xaa),
        (0xaa, 0x00, 0xaa),
        (0x00, 0xaa, 0xaa),
        (0xaa, 0xaa, 0xaa),
    ];
    const BRIGHT: [(u8, u8, u8); 8] = [
        (0x55, 0x55, 0x55),
        (0xff, 0x55, 0x55),
        (0x55, 0xff, 0x55),
        (0xff, 0xff, 0x55),
        (0x55, 0x55, 0xff),
        (0xff, 0x55, 0xff),
        (0x55, 0xff, 0xff),
        (0xff, 0xff, 0xff),
    ];
    for (i, (r, g, b)) in BASE.iter().enumerate() {
        colors[i] = Color::rgb(*r, *g, *b);
    }
    for (i, (r, g, b)) in BRIGHT.iter().enumerate() {
        colors[8 + i] = Color::rgb(*r, *g, *b);
    }
    // 16-231: 6x6x6 color cube.
    let mut idx = 16usize;
    for r in 0..6 {
        for g in 0..6 {
            for b in 0..6 {
                colors[idx] = Color::rgb(
                    XTERM_CUBE_STEPS[r],
                    XTERM_CUBE_STEPS[g],
                    XTERM_CUBE_STEPS[b],
                );
                idx += 1;
            }
        }
    }
    // 232-255: grayscale ramp.
    for i in 0..24 {
        let level = 8 + i * 10;
        colors[232 + i as usize] = Color::rgb(level as u8, level as u8, level as u8);
    }
    colors
}

lazy_static::lazy_static! {
    static ref XTERM_DEFAULTS: [Color; 256] = build_xterm_colors();
}

/// 16 ANSI + 240 derived xterm colors, plus the three named defaults
/// (spec §3 "Color palette"). Loaded once from a color-scheme file at
/// construction and mutable afterwards via OSC 4.
#[derive(Debug, Clone)]
pub struct ColorPalette {
    colors: [Color; 256],
    pub default_fg: Color,
    pub default_bg: Color,
    pub cursor_color: Color,
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self {
            colors: *XTERM_DEFAULTS,
            default_fg: Color::rgb(0xe0, 0xe0, 0xe0),
            default_bg: Color::rgb(0x00, 0x00, 0x00),
            cursor_color: Color::rgb(0xff, 0xff, 0xff),
        }
    }
}

impl ColorPalette {
    pub fn resolve(&self, attr: ColorAttribute, is_foreground: bool) -> Color {
        match attr {
            ColorAttribute::Default => {
                if is_foreground {
                    self.default_fg
                } else {
                    self.default_bg
                }
            }
            ColorAttribute::PaletteIndex(idx) => self.colors[idx as usize],
            ColorAttribute::Rgb(c) => c,
        }
    }

    pub fn palette_color(&self, idx: u8) -> Color {
        self.colors[idx as usize]
    }

    /// OSC 4 ; N ; spec — only indices 0..=15 are reassignable per spec §4.B.
    pub fn set_palette_index(&mut self, idx: u8, color: Color) {
        if (idx as usize) < self.colors.len() {
            self.colors[idx as usize] = color;
        }
    }

    /// Loads overrides from a `name=#RRGGBB` color-scheme file (spec §6).
    /// `#` starts a comment; missing keys keep built-in defaults. Unknown
    /// keys and unparsable values are logged and skipped, never fatal.
    pub fn load_theme_str(&mut self, contents: &str) {
        for (lineno, raw_line) in contents.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                log::debug!("theme line {}: missing '=': {:?}", lineno + 1, raw_line);
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            let Some(color) = Color::from_hex(value) else {
                log::debug!("theme line {}: bad color {:?}", lineno + 1, value);
                continue;
            };
            match key {
                "foreground" => self.default_fg = color,
                "background" => self.default_bg = color,
                "cursor" => self.cursor_color = color,
                _ => {
                    if let Some(n) = key.strip_prefix("color") {
                        if let Ok(idx) = n.parse::<u8>() {
                            if idx < 16 {
                                self.set_palette_index(idx, color);
                                continue;
                            }
                        }
                    }
                    log::debug!("theme line {}: unknown key {:?}", lineno + 1, key);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_ansi_and_cube() {
        let pal = ColorPalette::default();
        assert_eq!(pal.palette_color(1), Color::rgb(0xaa, 0x00, 0x00));
        assert_eq!(pal.palette_color(16), Color::rgb(0x00, 0x00, 0x00));
        assert_eq!(pal.palette_color(231), Color::rgb(0xff, 0xff, 0xff));
        assert_eq!(pal.palette_color(255), Color::rgb(0xee, 0xee, 0xee));
    }

    #[test]
    fn theme_overrides_named_and_indexed_colors() {
        let mut pal = ColorPalette::default();
        pal.load_theme_str(
            "# comment\nforeground=#112233\ncolor1=#ff00ff\nbogus line\nunknown=#000000\n",
        );
        assert_eq!(pal.default_fg, Color::rgb(0x11, 0x22, 0x33));
        assert_eq!(pal.palette_color(1), Color::rgb(0xff, 0x00, 0xff));
    }

    #[test]
    fn osc4_rgb_spec_parses() {
        assert_eq!(
            Color::from_xterm_rgb_spec("rgb:11/22/33"),
            Some(Color::rgb(0x11, 0x22, 0x33))
        );
        assert_eq!(
            Color::from_xterm_rgb_spec("rgb:1111/2222/3333"),
            Some(Color::rgb(0x11, 0x22, 0x33))
        );
        assert_eq!(Color::from_xterm_rgb_spec("bogus"), None);
    }
}
