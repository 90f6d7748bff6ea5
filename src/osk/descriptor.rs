//! The tagged key-descriptor variants the OSK model selects and emits
//! (spec §3 "Key descriptor", §4.D "Key emission table").

use crate::input::{KeyCode, Modifiers};

pub type Mask = u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierKey {
    Shift,
    Ctrl,
    Alt,
    Gui,
}

impl ModifierKey {
    pub fn bit(self) -> Modifiers {
        match self {
            ModifierKey::Shift => Modifiers::SHIFT,
            ModifierKey::Ctrl => Modifiers::CTRL,
            ModifierKey::Alt => Modifiers::ALT,
            ModifierKey::Gui => Modifiers::GUI,
        }
    }
}

/// Commands the embedding application executes; the core never acts on
/// these itself (spec §3 "drives the embedding application").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalCommand {
    FontInc,
    FontDec,
    CursorToggleVisibility,
    CursorToggleBlink,
    CursorCycleStyle,
    TerminalReset,
    TerminalClear,
    OskTogglePosition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyDescriptor {
    Literal(String),
    Sequence(KeyCode, Modifiers),
    Macro(String),
    ModToggle(ModifierKey),
    InternalCommand(InternalCommand),
    LoadSet(String),
    UnloadSet(String),
    /// Single-key fallback sentinel (`{N/A}` in a `.kb` file): inherit
    /// this slot from the base (mask 0) layer.
    NotApplicable,
}

/// A row within a layer: either real keys, or the whole-row `{DEFAULT}`
/// sentinel meaning "inherit this row from the base layer".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    Default,
    Keys(Vec<KeyDescriptor>),
}

/// A composable, named collection of keys (spec §3 "Special-key set").
#[derive(Debug, Clone)]
pub struct SpecialKeySet {
    pub name: String,
    pub file_path: Option<String>,
    pub keys: Vec<KeyDescriptor>,
    /// Modifier mask the set's keys carry when emitted.
    pub active_mod_mask: Modifiers,
}
