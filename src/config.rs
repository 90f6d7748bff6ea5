//! Construction-time configuration surface (spec §6 "Configuration
//! surface"). Modeled on `wezterm-term`'s `TerminalConfiguration` trait —
//! a small set of policy knobs the core consults repeatedly, injected once
//! at construction rather than threaded through every call as an
//! out-parameter (spec §9's "pointer-to-pointer out-parameters" note).

pub trait TerminalConfig: std::fmt::Debug {
    fn scrollback_lines(&self) -> usize {
        3500
    }

    fn tab_width(&self) -> usize {
        8
    }

    /// Whether bytes below 0x80 are remapped through the DEC Special
    /// Graphics table while G-slot `'0'` is active.
    fn honor_dec_special_graphics(&self) -> bool {
        true
    }
}

/// The populated structure handed to the core at construction (spec §6).
#[derive(Debug, Clone)]
pub struct Config {
    pub cols: usize,
    pub rows: usize,
    pub scrollback_lines: usize,
    pub tab_width: usize,
    pub honor_dec_special_graphics: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cols: 80,
            rows: 24,
            scrollback_lines: 3500,
            tab_width: 8,
            honor_dec_special_graphics: true,
        }
    }
}

impl Config {
    pub fn new(cols: usize, rows: usize, scrollback_lines: usize) -> Self {
        Self {
            cols: cols.max(1),
            rows: rows.max(1),
            scrollback_lines: scrollback_lines.min(100_000),
            ..Default::default()
        }
    }
}

impl TerminalConfig for Config {
    fn scrollback_lines(&self) -> usize {
        self.scrollback_lines
    }

    fn tab_width(&self) -> usize {
        self.tab_width
    }

    fn honor_dec_special_graphics(&self) -> bool {
        self.honor_dec_special_graphics
    }
}
