//! A single terminal cell.
//!
//! `wezterm-term`'s `cell.rs` packs attributes into a hand-rolled bitfield
//! with a macro-generated getter/setter pair per field. The spec's
//! attribute set is five independent booleans (§3 "Glyph"), so a
//! `bitflags!` set — the same crate the rest of the reference stack uses
//! for `KeyModifiers` — is the more idiomatic fit; we drop the bitfield
//! macro rather than force it onto a simpler shape.

use crate::color::ColorAttribute;

bitflags::bitflags! {
    #[derive(Default)]
    pub struct GlyphAttributes: u8 {
        const BOLD      = 1 << 0;
        const ITALIC    = 1 << 1;
        const UNDERLINE = 1 << 2;
        const INVERSE   = 1 << 3;
        const BLINK     = 1 << 4;
    }
}

/// Width of a glyph cell is always 1; wide characters are out of scope
/// for this core (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    pub codepoint: char,
    pub fg: ColorAttribute,
    pub bg: ColorAttribute,
    pub attrs: GlyphAttributes,
}

impl Default for Glyph {
    fn default() -> Self {
        Self {
            codepoint: ' ',
            fg: ColorAttribute::Default,
            bg: ColorAttribute::Default,
            attrs: GlyphAttributes::empty(),
        }
    }
}

impl Glyph {
    pub fn blank_with_attrs(fg: ColorAttribute, bg: ColorAttribute, attrs: GlyphAttributes) -> Self {
        Self {
            codepoint: ' ',
            fg,
            bg,
            attrs,
        }
    }
}

/// The "current pen": the fg/bg/attrs that `put_char` and friends stamp
/// onto new glyphs, mutated by SGR (CSI `m`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pen {
    pub fg: ColorAttribute,
    pub bg: ColorAttribute,
    pub attrs: GlyphAttributes,
}

impl Default for Pen {
    fn default() -> Self {
        Self {
            fg: ColorAttribute::Default,
            bg: ColorAttribute::Default,
            attrs: GlyphAttributes::empty(),
        }
    }
}

impl Pen {
    pub fn blank_glyph(&self) -> Glyph {
        Glyph::blank_with_attrs(self.fg, self.bg, self.attrs)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
