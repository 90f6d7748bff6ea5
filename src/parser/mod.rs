//! The VT/ANSI stream decoder (spec §4.B): a six-state machine — `Normal`,
//! `Escape`, `Csi`, `Osc`, `Dcs`, plus an implicit UTF-8-continuation
//! sub-state folded into `Normal` — that turns PTY bytes directly into
//! mutations of the [`Terminal`] it is fed. Grounded on the `State`/byte
//! dispatch split of `vtparse`'s `enums.rs`, trimmed from its fuller
//! table-driven model to the handful of states this spec actually names.

pub mod csi;
pub mod sgr;

use crate::charset::{map_dec_special_graphics, CharSet};
use crate::color::Color;
use crate::parser::csi::MAX_CSI_PARAMS;
use crate::Terminal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    Escape,
    /// After ESC `(` or `)`: the next byte designates G0 or G1.
    EscapeSelectCharset(u8),
    /// After ESC `#`: only `8` (DECALN) is recognized.
    EscapeHash,
    Csi,
    Osc,
    /// Inside OSC, just saw an ESC; `\` terminates (ST), anything else
    /// aborts the OSC and is reprocessed as a fresh escape byte.
    OscEscape,
    Dcs,
}

/// Parser state (spec §3 "Parser state"). Lives separately from
/// [`Terminal`] so the byte-level decoder can be unit-tested without a
/// full grid, but every dispatch immediately borrows the `Terminal` it is
/// driving.
pub struct Parser {
    state: State,

    csi_params: Vec<i64>,
    csi_current: Option<i64>,
    csi_overflow: bool,
    csi_private_marker: Option<u8>,
    csi_intermediates: Vec<u8>,

    osc_buffer: Vec<u8>,
    osc_overflow: bool,

    utf8_codepoint: u32,
    utf8_bytes_remaining: u8,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self {
            state: State::Normal,
            csi_params: Vec::with_capacity(MAX_CSI_PARAMS),
            csi_current: None,
            csi_overflow: false,
            csi_private_marker: None,
            csi_intermediates: Vec::with_capacity(3),
            osc_buffer: Vec::with_capacity(256),
            osc_overflow: false,
            utf8_codepoint: 0,
            utf8_bytes_remaining: 0,
        }
    }

    fn reset_csi(&mut self) {
        self.csi_params.clear();
        self.csi_current = None;
        self.csi_overflow = false;
        self.csi_private_marker = None;
        self.csi_intermediates.clear();
    }

    fn reset_osc(&mut self) {
        self.osc_buffer.clear();
        self.osc_overflow = false;
    }

    /// Feeds an entire read window through the state machine, driving
    /// `term` as a side effect. The parser never panics regardless of
    /// input (spec invariant 6).
    pub fn feed(&mut self, bytes: &[u8], term: &mut Terminal) {
        for &byte in bytes {
            self.feed_byte(byte, term);
        }
    }

    fn feed_byte(&mut self, byte: u8, term: &mut Terminal) {
        match self.state {
            State::Normal => self.feed_normal(byte, term),
            State::Escape => self.feed_escape(byte, term),
            State::EscapeSelectCharset(slot) => self.feed_select_charset(slot, byte, term),
            State::EscapeHash => self.feed_hash(byte, term),
            State::Csi => self.feed_csi(byte, term),
            State::Osc => self.feed_osc(byte, term),
            State::OscEscape => self.feed_osc_escape(byte, term),
            State::Dcs => self.feed_dcs(byte),
        }
    }

    // ---- Normal + UTF-8 continuation -----------------------------------

    fn feed_normal(&mut self, byte: u8, term: &mut Terminal) {
        if self.utf8_bytes_remaining > 0 {
            if byte & 0xC0 == 0x80 {
                self.utf8_codepoint = (self.utf8_codepoint << 6) | (byte & 0x3F) as u32;
                self.utf8_bytes_remaining -= 1;
                if self.utf8_bytes_remaining == 0 {
                    let cp = char::from_u32(self.utf8_codepoint).unwrap_or('\u{fffd}');
                    term.grid.put_char(cp);
                }
                return;
            }
            // Non-continuation byte mid-sequence: abort and reprocess.
            self.utf8_bytes_remaining = 0;
        }

        match byte {
            0x08 => term.grid.cursor_back(1),
            0x09 => {
                let width = term.config.tab_width;
                term.grid.tab(width);
            }
            0x0A => term.grid.newline(),
            0x0D => term.grid.cursor_to_col(0),
            0x0E => term.grid.active_g = 1,
            0x0F => term.grid.active_g = 0,
            0x1B => self.state = State::Escape,
            0x00..=0x1F | 0x7F => { /* other C0/DEL: ignored per spec */ }
            0x20..=0x7E => self.print_ascii(byte, term),
            0xC0..=0xDF => {
                self.utf8_bytes_remaining = 1;
                self.utf8_codepoint = (byte & 0x1F) as u32;
            }
            0xE0..=0xEF => {
                self.utf8_bytes_remaining = 2;
                self.utf8_codepoint = (byte & 0x0F) as u32;
            }
            0xF0..=0xF7 => {
                self.utf8_bytes_remaining = 3;
                self.utf8_codepoint = (byte & 0x07) as u32;
            }
            _ => log::debug!("invalid UTF-8 start byte 0x{:02x}", byte),
        }
    }

    fn print_ascii(&mut self, byte: u8, term: &mut Terminal) {
        let active = if term.grid.active_g == 0 {
            term.grid.g0
        } else {
            term.grid.g1
        };
        let cp = if active == CharSet::DecSpecialGraphics
            && term.config.honor_dec_special_graphics
            && (0x60..=0x7E).contains(&byte)
        {
            map_dec_special_graphics(byte)
        } else {
            byte as char
        };
        term.grid.put_char(cp);
    }

    // ---- Escape ----------------------------------------------------------

    fn feed_escape(&mut self, byte: u8, term: &mut Terminal) {
        self.state = State::Normal;
        match byte {
            b'[' => {
                self.reset_csi();
                self.state = State::Csi;
            }
            b']' => {
                self.reset_osc();
                self.state = State::Osc;
            }
            b'P' => self.state = State::Dcs,
            b'(' => self.state = State::EscapeSelectCharset(0),
            b')' => self.state = State::EscapeSelectCharset(1),
            b'7' => term.grid.save_cursor(),
            b'8' => term.grid.restore_saved_cursor(),
            b'=' => term.grid.modes.application_keypad = true,
            b'>' => term.grid.modes.application_keypad = false,
            b'D' => term.grid.newline(),
            b'M' => term.grid.reverse_index(),
            b'c' => term.grid.full_reset(),
            b'#' => self.state = State::EscapeHash,
            b'\\' => {}
            other => log::debug!("unhandled escape byte 0x{:02x}", other),
        }
    }

    fn feed_select_charset(&mut self, slot: u8, byte: u8, term: &mut Terminal) {
        self.state = State::Normal;
        let charset = match byte {
            b'B' => Some(CharSet::Ascii),
            b'0' => Some(CharSet::DecSpecialGraphics),
            _ => None,
        };
        if let Some(charset) = charset {
            if slot == 0 {
                term.grid.g0 = charset;
            } else {
                term.grid.g1 = charset;
            }
        }
    }

    fn feed_hash(&mut self, byte: u8, term: &mut Terminal) {
        self.state = State::Normal;
        if byte == b'8' {
            term.grid.fill_screen_with_e();
        } else {
            log::debug!("unhandled ESC # {:?}", byte as char);
        }
    }

    // ---- CSI ----------------------------------------------------------

    fn feed_csi(&mut self, byte: u8, term: &mut Terminal) {
        match byte {
            b'0'..=b'9' => {
                let digit = (byte - b'0') as i64;
                self.csi_current = Some(self.csi_current.unwrap_or(0) * 10 + digit);
            }
            b';' => self.push_csi_param(),
            b'<' | b'=' | b'>' | b'?'
                if self.csi_params.is_empty()
                    && self.csi_current.is_none()
                    && self.csi_intermediates.is_empty()
                    && self.csi_private_marker.is_none() =>
            {
                self.csi_private_marker = Some(byte);
            }
            0x20..=0x2F => {
                if self.csi_intermediates.len() < 3 {
                    self.csi_intermediates.push(byte);
                }
            }
            0x40..=0x7E => {
                self.push_csi_param();
                self.state = State::Normal;
                if self.csi_overflow {
                    log::debug!("CSI sequence exceeded {} parameters, discarding", MAX_CSI_PARAMS);
                } else {
                    let params = std::mem::take(&mut self.csi_params);
                    let intermediates = std::mem::take(&mut self.csi_intermediates);
                    csi::dispatch(term, &params, self.csi_private_marker, &intermediates, byte);
                }
                self.reset_csi();
            }
            other => log::debug!("unexpected byte 0x{:02x} in CSI", other),
        }
    }

    fn push_csi_param(&mut self) {
        if self.csi_params.len() >= MAX_CSI_PARAMS {
            self.csi_overflow = true;
            self.csi_current = None;
            return;
        }
        self.csi_params.push(self.csi_current.take().unwrap_or(0));
    }

    // ---- OSC ------------------------------------------------------------

    fn feed_osc(&mut self, byte: u8, term: &mut Terminal) {
        match byte {
            0x07 => {
                self.state = State::Normal;
                self.finish_osc(term);
            }
            0x1B => self.state = State::OscEscape,
            _ => {
                if self.osc_buffer.len() < 256 {
                    self.osc_buffer.push(byte);
                } else {
                    self.osc_overflow = true;
                }
            }
        }
    }

    fn feed_osc_escape(&mut self, byte: u8, term: &mut Terminal) {
        if byte == b'\\' {
            self.state = State::Normal;
            self.finish_osc(term);
        } else {
            // Not a valid ST: abandon the OSC and reprocess as a fresh escape.
            self.state = State::Escape;
            self.reset_osc();
            self.feed_escape(byte, term);
        }
    }

    fn finish_osc(&mut self, term: &mut Terminal) {
        if self.osc_overflow {
            log::debug!("OSC payload exceeded 256 bytes, discarding");
            self.reset_osc();
            return;
        }
        let payload = String::from_utf8_lossy(&self.osc_buffer).into_owned();
        handle_osc(term, &payload);
        self.reset_osc();
    }

    // ---- DCS ------------------------------------------------------------

    fn feed_dcs(&mut self, byte: u8) {
        if byte == 0x1B {
            // Mirrors `feed_osc_escape`: the DCS payload is discarded, but
            // the terminator itself still has to go through `Escape` so
            // its `\` (ST) is consumed there rather than printed as a
            // literal backslash in `Normal`.
            self.state = State::Escape;
        }
    }
}

/// `4;N;spec` — set palette index `N` from an `rgb:` or `#RRGGBB` spec
/// (spec §4.B "OSC state"). Any other payload is discarded safely.
fn handle_osc(term: &mut Terminal, payload: &str) {
    let mut parts = payload.splitn(3, ';');
    let (Some(kind), Some(idx_str), Some(spec)) = (parts.next(), parts.next(), parts.next()) else {
        log::debug!("unhandled OSC payload: {:?}", payload);
        return;
    };
    if kind != "4" {
        log::debug!("unhandled OSC command {:?}", kind);
        return;
    }
    let Ok(idx) = idx_str.parse::<u8>() else {
        log::debug!("bad OSC 4 index {:?}", idx_str);
        return;
    };
    if idx > 15 {
        log::debug!("OSC 4 index {} outside the reassignable 0..=15 range", idx);
        return;
    }
    let color = if spec.starts_with('#') {
        Color::from_hex(spec)
    } else {
        Color::from_xterm_rgb_spec(spec)
    };
    match color {
        Some(color) => term.palette.set_palette_index(idx, color),
        None => log::debug!("bad OSC 4 color spec {:?}", spec),
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::Terminal;

    fn terminal() -> Terminal {
        Terminal::new(Config::new(10, 2, 0), Box::new(|_| {})).unwrap()
    }

    #[test]
    fn dcs_terminator_is_consumed_not_printed() {
        // `\x1bP...\x1b\\` (DECRQSS replies, tmux/screen passthrough):
        // the payload is discarded, and the ST's trailing `\` must not
        // land in the grid as a literal backslash.
        let mut term = terminal();
        term.feed_pty(b"\x1bPq1$r0\"q\x1b\\");
        let line = term.viewport_line(0);
        assert!(line.iter().all(|g| g.codepoint == ' '));
    }

    #[test]
    fn dcs_then_normal_text_round_trips() {
        let mut term = terminal();
        term.feed_pty(b"\x1bP+q\x1b\\hi");
        let line = term.viewport_line(0);
        assert_eq!(line[0].codepoint, 'h');
        assert_eq!(line[1].codepoint, 'i');
    }
}
