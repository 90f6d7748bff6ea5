//! Key identities and modifier sets shared between the encoder
//! (spec §4.C), the OSK model (spec §4.D) and the dispatcher (spec
//! §4.E). Modeled on `termwiz::input::KeyCode`/`Modifiers`, trimmed to
//! the symbols the precedence table in §4.C actually names — numpad,
//! media and mouse variants are out of scope here.

pub mod encode;

bitflags::bitflags! {
    #[derive(Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const CTRL  = 1 << 1;
        const ALT   = 1 << 2;
        const GUI   = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Char(char),
    Enter,
    Backspace,
    Tab,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    Function(u8),
    PrintScreen,
    ScrollLock,
    Pause,
}

/// The slice of terminal modes the encoder needs to pick a wire form for
/// a key (spec §4.C input: "`(sym, mod, term-mode snapshot)`").
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyCodeEncodeModes {
    pub application_cursor: bool,
}
