//! SGR (Select Graphic Rendition, CSI final `m`) attribute application
//! (spec §4.B "SGR (`m`)").

use crate::cell::{GlyphAttributes, Pen};
use crate::color::{Color, ColorAttribute};

pub fn apply_sgr(pen: &mut Pen, params: &[i64]) {
    if params.is_empty() {
        pen.reset();
        return;
    }

    let mut i = 0;
    while i < params.len() {
        let code = params[i];
        match code {
            0 => pen.reset(),
            1 => pen.attrs.insert(GlyphAttributes::BOLD),
            3 => pen.attrs.insert(GlyphAttributes::ITALIC),
            4 => pen.attrs.insert(GlyphAttributes::UNDERLINE),
            5 => pen.attrs.insert(GlyphAttributes::BLINK),
            7 => pen.attrs.insert(GlyphAttributes::INVERSE),
            22 => pen.attrs.remove(GlyphAttributes::BOLD),
            23 => pen.attrs.remove(GlyphAttributes::ITALIC),
            24 => pen.attrs.remove(GlyphAttributes::UNDERLINE),
            25 => pen.attrs.remove(GlyphAttributes::BLINK),
            27 => pen.attrs.remove(GlyphAttributes::INVERSE),
            30..=37 => pen.fg = ColorAttribute::PaletteIndex((code - 30) as u8),
            40..=47 => pen.bg = ColorAttribute::PaletteIndex((code - 40) as u8),
            90..=97 => pen.fg = ColorAttribute::PaletteIndex((code - 90 + 8) as u8),
            100..=107 => pen.bg = ColorAttribute::PaletteIndex((code - 100 + 8) as u8),
            38 | 48 => {
                let is_fg = code == 38;
                let (color, consumed) = parse_extended_color(&params[i + 1..]);
                if let Some(color) = color {
                    if is_fg {
                        pen.fg = color;
                    } else {
                        pen.bg = color;
                    }
                }
                i += consumed;
            }
            39 => pen.fg = ColorAttribute::Default,
            49 => pen.bg = ColorAttribute::Default,
            _ => log::debug!("unhandled SGR code {}", code),
        }
        i += 1;
    }
}

/// Parses the parameter run following a `38`/`48` introducer: `5;N` for a
/// palette index or `2;R;G;B` for a direct color. Returns the resolved
/// attribute (if any) and how many *additional* parameters were consumed.
fn parse_extended_color(rest: &[i64]) -> (Option<ColorAttribute>, usize) {
    match rest.first() {
        Some(5) => {
            if let Some(&idx) = rest.get(1) {
                (Some(ColorAttribute::PaletteIndex(idx as u8)), 2)
            } else {
                (None, 1)
            }
        }
        Some(2) => {
            if rest.len() >= 4 {
                let r = rest[1] as u8;
                let g = rest[2] as u8;
                let b = rest[3] as u8;
                (Some(ColorAttribute::Rgb(Color::rgb(r, g, b))), 4)
            } else {
                (None, rest.len())
            }
        }
        _ => (None, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_everything() {
        let mut pen = Pen::default();
        pen.attrs.insert(GlyphAttributes::BOLD);
        pen.fg = ColorAttribute::PaletteIndex(1);
        apply_sgr(&mut pen, &[0]);
        assert_eq!(pen, Pen::default());
    }

    #[test]
    fn basic_and_bright_colors() {
        let mut pen = Pen::default();
        apply_sgr(&mut pen, &[31]);
        assert_eq!(pen.fg, ColorAttribute::PaletteIndex(1));
        apply_sgr(&mut pen, &[92]);
        assert_eq!(pen.fg, ColorAttribute::PaletteIndex(10));
        apply_sgr(&mut pen, &[39]);
        assert_eq!(pen.fg, ColorAttribute::Default);
    }

    #[test]
    fn extended_256_and_direct_color() {
        let mut pen = Pen::default();
        apply_sgr(&mut pen, &[38, 5, 200]);
        assert_eq!(pen.fg, ColorAttribute::PaletteIndex(200));
        apply_sgr(&mut pen, &[48, 2, 10, 20, 30]);
        assert_eq!(pen.bg, ColorAttribute::Rgb(Color::rgb(10, 20, 30)));
    }

    #[test]
    fn ansi_scenario_from_spec() {
        // spec §8 scenario 1: \x1b[31mR\x1b[32mG\x1b[0mX
        let mut pen = Pen::default();
        apply_sgr(&mut pen, &[31]);
        assert_eq!(pen.fg, ColorAttribute::PaletteIndex(1));
        apply_sgr(&mut pen, &[32]);
        assert_eq!(pen.fg, ColorAttribute::PaletteIndex(2));
        apply_sgr(&mut pen, &[0]);
        assert_eq!(pen.fg, ColorAttribute::Default);
    }
}
