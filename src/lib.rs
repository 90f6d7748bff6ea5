//! A VT/ANSI terminal core: grid and scrollback (§4.A), a byte-level
//! parser (§4.B), a keyboard encoder (§4.C), an on-screen-keyboard model
//! (§4.D) and the dispatcher gluing user actions to the two encoders
//! (§4.E). Grounded on the module split of `wezterm-term`'s `lib.rs`: a
//! single `Terminal` type composing independently testable pieces, fed
//! bytes from one side and driven by input events from the other.

pub mod cell;
pub mod charset;
pub mod color;
pub mod config;
pub mod dirty;
pub mod dispatcher;
pub mod error;
pub mod input;
pub mod line;
pub mod modes;
pub mod osk;
pub mod parser;
pub mod screen;
pub mod theme;

pub use color::{Color, ColorAttribute, ColorPalette};
pub use config::{Config, TerminalConfig};
pub use error::{CoreError, Result};
pub use input::{KeyCode, KeyCodeEncodeModes, Modifiers};
pub use osk::{OskModel, OskView};
pub use screen::{CursorPosition, Grid};

use crate::cell::Glyph;
use crate::modes::CursorStyle;
use crate::osk::kb_file::Layout;
use crate::osk::PtySink;
use crate::parser::Parser;

/// A PTY write sink. The core never owns a file descriptor; it only ever
/// hands bytes to whatever the embedder wired up (spec §6 "PTY byte
/// stream in/out").
pub type PtyWriter = Box<dyn FnMut(&[u8]) + Send>;

/// Render-facing cursor presentation (spec §3 "Cursor style/visibility").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorView {
    pub x: usize,
    pub y: usize,
    pub style: CursorStyle,
    pub visible: bool,
    pub blink_enabled: bool,
}

/// Ties the grid, the byte-level parser, the color palette and the OSK
/// model together behind one construction/feed/read surface (spec §3
/// "Terminal core").
pub struct Terminal {
    pub grid: Grid,
    pub palette: ColorPalette,
    pub osk: OskModel,
    pub(crate) config: Config,

    parser: Parser,
    /// Device status reports accumulate here during [`Terminal::feed_pty`]
    /// and are flushed to the PTY once the whole read window has been
    /// processed (spec §5 "Ordering guarantees").
    pub(crate) response_buffer: Vec<u8>,
    write_pty: PtyWriter,
}

impl Terminal {
    pub fn new(config: Config, write_pty: PtyWriter) -> Result<Self> {
        let grid = Grid::new(config.cols, config.rows, config.scrollback_lines)?;
        Ok(Self {
            grid,
            palette: ColorPalette::default(),
            osk: OskModel::new(Layout::default()),
            config,
            parser: Parser::new(),
            response_buffer: Vec::with_capacity(64),
            write_pty,
        })
    }

    /// Feeds one PTY read window through the byte-level parser, then
    /// flushes any accumulated device-status responses (spec §5).
    pub fn feed_pty(&mut self, bytes: &[u8]) {
        // `Parser::feed` takes `&mut Terminal`, so the parser has to be
        // moved out of `self` for the duration of the call rather than
        // borrowed alongside it.
        let mut parser = std::mem::take(&mut self.parser);
        parser.feed(bytes, self);
        self.parser = parser;
        self.flush_responses();
    }

    fn flush_responses(&mut self) {
        if self.response_buffer.is_empty() {
            return;
        }
        let bytes = std::mem::take(&mut self.response_buffer);
        (self.write_pty)(&bytes);
    }

    /// Writes bytes straight to the PTY, bypassing the response buffer.
    /// Used for anything generated outside the parser's read loop: key
    /// encoding, OSK emission, pasted text.
    pub fn write_pty_bytes(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        (self.write_pty)(bytes);
    }

    pub fn key_encode_modes(&self) -> KeyCodeEncodeModes {
        KeyCodeEncodeModes {
            application_cursor: self.grid.modes.application_cursor,
        }
    }

    /// Splits `self` into the three disjoint pieces [`OskModel`] emission
    /// needs, so its methods can take a plain write sink and mode
    /// snapshot instead of `&mut Terminal` — which would otherwise alias
    /// against the `osk` field living inside `self`.
    pub(crate) fn split_for_osk(&mut self) -> (&mut OskModel, PtySink<'_>, KeyCodeEncodeModes) {
        let modes = KeyCodeEncodeModes {
            application_cursor: self.grid.modes.application_cursor,
        };
        (&mut self.osk, &mut *self.write_pty, modes)
    }

    /// Reassigns dimensions, discarding scrollback (spec §4.A `resize`).
    pub fn resize(&mut self, cols: usize, rows: usize) -> Result<()> {
        self.grid.resize(cols, rows)
    }

    /// Loads `name=#RRGGBB` overrides from an in-memory color-scheme
    /// (spec §6 "Optional color scheme").
    pub fn load_theme_str(&mut self, contents: &str) {
        self.palette.load_theme_str(contents);
    }

    /// Parses and installs a `.kb` layout (spec §6 "Optional OSK layout").
    pub fn load_osk_layout_str(&mut self, contents: &str) {
        self.osk.replace_layout(osk::kb_file::parse(contents));
    }

    // ---- render-sink accessors -----------------------------------------

    pub fn viewport_line(&self, y: usize) -> &[Glyph] {
        self.grid.get_viewport_line(y)
    }

    pub fn cursor(&self) -> CursorView {
        let pos = self.grid.cursor_pos();
        CursorView {
            x: pos.x,
            y: pos.y,
            style: self.grid.cursor_style,
            visible: self.grid.modes.cursor_visible,
            blink_enabled: self.grid.modes.cursor_blink_enabled,
        }
    }

    pub fn dirty_lines(&self) -> Vec<usize> {
        if self.grid.full_redraw_needed() {
            return (0..self.grid.rows()).collect();
        }
        (0..self.grid.rows()).filter(|&y| self.grid.is_line_dirty(y)).collect()
    }

    pub fn clear_dirty(&mut self) {
        self.grid.clear_dirty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terminal() -> Terminal {
        Terminal::new(Config::new(10, 4, 50), Box::new(|_| {})).unwrap()
    }

    #[test]
    fn ansi_colors_scenario_end_to_end() {
        // spec §8 scenario 1: \x1b[31mR\x1b[32mG\x1b[0mX
        let mut term = terminal();
        term.feed_pty(b"\x1b[31mR\x1b[32mG\x1b[0mX");
        let line = term.viewport_line(0);
        assert_eq!(line[0].codepoint, 'R');
        assert_eq!(line[0].fg, ColorAttribute::PaletteIndex(1));
        assert_eq!(line[1].codepoint, 'G');
        assert_eq!(line[1].fg, ColorAttribute::PaletteIndex(2));
        assert_eq!(line[2].codepoint, 'X');
        assert_eq!(line[2].fg, ColorAttribute::Default);
    }

    #[test]
    fn application_cursor_mode_switches_pty_written_arrow_bytes() {
        // spec §8 scenario 3
        let sent = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sent_clone = sent.clone();
        let mut term = Terminal::new(
            Config::new(10, 4, 0),
            Box::new(move |bytes: &[u8]| sent_clone.lock().unwrap().push(bytes.to_vec())),
        )
        .unwrap();
        term.feed_pty(b"\x1b[?1h");
        assert!(term.grid.modes.application_cursor);
        let modes = term.key_encode_modes();
        let bytes = input::encode::encode_key_event(KeyCode::Up, Modifiers::empty(), modes);
        assert_eq!(bytes, b"\x1bOA");
    }

    #[test]
    fn device_status_report_is_flushed_after_the_read_window() {
        let sent = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sent_clone = sent.clone();
        let mut term = Terminal::new(
            Config::new(10, 4, 0),
            Box::new(move |bytes: &[u8]| sent_clone.lock().unwrap().push(bytes.to_vec())),
        )
        .unwrap();
        term.feed_pty(b"hi\x1b[6n");
        let flushed = sent.lock().unwrap();
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0], b"\x1b[1;3R");
    }

    #[test]
    fn osc4_palette_override_round_trips_through_feed_pty() {
        let mut term = terminal();
        term.feed_pty(b"\x1b]4;1;#112233\x1b\\");
        assert_eq!(term.palette.palette_color(1), Color::rgb(0x11, 0x22, 0x33));
    }
}
