//! The `(sym, mod, term-mode)` → byte-sequence encoder (spec §4.C). A
//! straight-line precedence table, first match wins; grounded on the
//! shape of `termwiz::input::KeyCode::encode()` but trimmed down to
//! exactly the rules spec.md names rather than that crate's fuller
//! xterm/CSI-u negotiation.

use super::{KeyCode, KeyCodeEncodeModes, Modifiers};

fn ctrl_arrow_sequence(code: KeyCode) -> Option<&'static [u8]> {
    Some(match code {
        KeyCode::Up => b"\x1b[1;5A",
        KeyCode::Down => b"\x1b[1;5B",
        KeyCode::Right => b"\x1b[1;5C",
        KeyCode::Left => b"\x1b[1;5D",
        _ => return None,
    })
}

fn app_cursor_sequence(code: KeyCode, app_mode: bool) -> Option<Vec<u8>> {
    let (normal, app): (&[u8], &[u8]) = match code {
        KeyCode::Up => (b"\x1b[A", b"\x1bOA"),
        KeyCode::Down => (b"\x1b[B", b"\x1bOB"),
        KeyCode::Right => (b"\x1b[C", b"\x1bOC"),
        KeyCode::Left => (b"\x1b[D", b"\x1bOD"),
        KeyCode::Home => (b"\x1b[H", b"\x1bOH"),
        KeyCode::End => (b"\x1b[F", b"\x1bOF"),
        _ => return None,
    };
    Some(if app_mode { app.to_vec() } else { normal.to_vec() })
}

fn standard_special_sequence(code: KeyCode) -> Option<Vec<u8>> {
    let bytes: &[u8] = match code {
        KeyCode::Enter => b"\r",
        KeyCode::Backspace => b"\x7f",
        KeyCode::Tab => b"\t",
        KeyCode::Escape => b"\x1b",
        KeyCode::PageUp => b"\x1b[5~",
        KeyCode::PageDown => b"\x1b[6~",
        KeyCode::Insert => b"\x1b[2~",
        KeyCode::Delete => b"\x1b[3~",
        KeyCode::Function(1) => b"\x1bOP",
        KeyCode::Function(2) => b"\x1bOQ",
        KeyCode::Function(3) => b"\x1bOR",
        KeyCode::Function(4) => b"\x1bOS",
        KeyCode::Function(5) => b"\x1b[15~",
        KeyCode::Function(6) => b"\x1b[17~",
        KeyCode::Function(7) => b"\x1b[18~",
        KeyCode::Function(8) => b"\x1b[19~",
        KeyCode::Function(9) => b"\x1b[20~",
        KeyCode::Function(10) => b"\x1b[21~",
        KeyCode::Function(11) => b"\x1b[23~",
        KeyCode::Function(12) => b"\x1b[24~",
        // Not standardized across terminals; follows xterm's Sun-keyboard
        // compatibility range (DESIGN.md records this as a resolved open
        // question — spec names the keys but not their bytes).
        KeyCode::PrintScreen => b"\x1b[32~",
        KeyCode::Pause => b"\x1b[33~",
        KeyCode::ScrollLock => b"\x1b[34~",
        _ => return None,
    };
    Some(bytes.to_vec())
}

/// Encodes one key event per the precedence table in spec §4.C. Returns
/// the bytes to write to the PTY.
pub fn encode_key_event(code: KeyCode, mods: Modifiers, modes: KeyCodeEncodeModes) -> Vec<u8> {
    let ctrl = mods.contains(Modifiers::CTRL);
    let alt = mods.contains(Modifiers::ALT);
    let shift = mods.contains(Modifiers::SHIFT);

    // 1. Ctrl + letter.
    if ctrl {
        if let KeyCode::Char(c) = code {
            if c.is_ascii_alphabetic() {
                let lower = c.to_ascii_lowercase() as u8;
                return vec![lower - b'a' + 1];
            }
            // 2. Ctrl + Space.
            if c == ' ' {
                return vec![0x00];
            }
        }
        // 3. Ctrl + arrow.
        if let Some(seq) = ctrl_arrow_sequence(code) {
            return seq.to_vec();
        }
    }

    // 4. Alt + printable / digit.
    if alt && !ctrl {
        if let KeyCode::Char(c) = code {
            if c.is_ascii_graphic() || c == ' ' {
                let c = if shift { c.to_ascii_uppercase() } else { c };
                let mut out = vec![0x1b];
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                return out;
            }
        }
        // 5. Alt + Backspace/f/b.
        match code {
            KeyCode::Backspace => return vec![0x1b, 0x7f],
            KeyCode::Char('f') => return vec![0x1b, b'f'],
            KeyCode::Char('b') => return vec![0x1b, b'b'],
            _ => {}
        }
    }

    // 6. Arrow/Home/End, app-cursor aware.
    if let Some(seq) = app_cursor_sequence(code, modes.application_cursor) {
        return seq;
    }

    // 7. Standard special keys.
    if let Some(seq) = standard_special_sequence(code) {
        return seq;
    }

    // 8. Printable ASCII.
    if let KeyCode::Char(c) = code {
        if (' '..='~').contains(&c) {
            let c = if shift { c.to_ascii_uppercase() } else { c };
            let mut buf = [0u8; 4];
            return c.encode_utf8(&mut buf).as_bytes().to_vec();
        }
    }

    log::debug!("no encoding for key {:?} with modifiers {:?}", code, mods);
    Vec::new()
}

/// The OS-composed-text bypass path: written verbatim, skipping the
/// key-down precedence table entirely (spec §4.C "Printable-from-OS event
/// path").
pub fn encode_text_event(text: &str) -> Vec<u8> {
    text.as_bytes().to_vec()
}

/// True when a key-down event for `code`/`mods` would be redundant with a
/// text-input event the host already delivered, and should be dropped
/// rather than encoded a second time.
pub fn is_redundant_with_text_event(code: KeyCode, mods: Modifiers) -> bool {
    matches!(code, KeyCode::Char(c) if (' '..='~').contains(&c))
        && (mods - Modifiers::SHIFT).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctrl_letter_yields_c0_control() {
        let out = encode_key_event(KeyCode::Char('c'), Modifiers::CTRL, KeyCodeEncodeModes::default());
        assert_eq!(out, vec![0x03]);
    }

    #[test]
    fn ctrl_space_yields_nul() {
        let out = encode_key_event(KeyCode::Char(' '), Modifiers::CTRL, KeyCodeEncodeModes::default());
        assert_eq!(out, vec![0x00]);
    }

    #[test]
    fn application_cursor_mode_switches_arrow_encoding() {
        let plain = encode_key_event(KeyCode::Up, Modifiers::empty(), KeyCodeEncodeModes::default());
        assert_eq!(plain, b"\x1b[A");
        let app = encode_key_event(
            KeyCode::Up,
            Modifiers::empty(),
            KeyCodeEncodeModes {
                application_cursor: true,
            },
        );
        assert_eq!(app, b"\x1bOA");
    }

    #[test]
    fn alt_printable_prefixes_escape_and_honors_shift() {
        let out = encode_key_event(KeyCode::Char('a'), Modifiers::ALT | Modifiers::SHIFT, KeyCodeEncodeModes::default());
        assert_eq!(out, b"\x1bA");
    }

    #[test]
    fn plain_printable_is_single_byte() {
        let out = encode_key_event(KeyCode::Char('x'), Modifiers::empty(), KeyCodeEncodeModes::default());
        assert_eq!(out, b"x");
    }

    #[test]
    fn text_event_bypass_drops_unmodified_printable_keydown() {
        assert!(is_redundant_with_text_event(KeyCode::Char('a'), Modifiers::empty()));
        assert!(!is_redundant_with_text_event(KeyCode::Char('a'), Modifiers::CTRL));
    }
}
