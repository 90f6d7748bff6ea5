//! `.keys` special-key-set file parser (spec §4.D "File format: key set").
//! One key per line: `display:value[:extra]`.

use crate::input::{KeyCode, Modifiers};
use crate::osk::descriptor::{InternalCommand, KeyDescriptor};

pub struct KeyEntry {
    pub display: String,
    pub descriptor: KeyDescriptor,
}

/// Splits on `:`, honoring `\:` as a literal colon.
fn split_escaped(line: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                if next == ':' {
                    current.push(':');
                } else {
                    current.push('\\');
                    current.push(next);
                }
            }
        } else if c == ':' {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    parts.push(current);
    parts
}

fn contains_unescaped_token(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if bytes[i] == b'{' {
            if let Some(end) = s[i..].find('}') {
                if end > 0 {
                    return true;
                }
            }
        }
        i += 1;
    }
    false
}

fn resolve_keycode(name: &str) -> Option<KeyCode> {
    Some(match name.to_ascii_uppercase().as_str() {
        "ESC" | "ESCAPE" => KeyCode::Escape,
        "ENTER" | "RETURN" => KeyCode::Enter,
        "BS" | "BACKSPACE" => KeyCode::Backspace,
        "DEL" | "DELETE" => KeyCode::Delete,
        "TAB" => KeyCode::Tab,
        "PGUP" | "PAGEUP" => KeyCode::PageUp,
        "PGDN" | "PAGEDOWN" => KeyCode::PageDown,
        "HOME" => KeyCode::Home,
        "END" => KeyCode::End,
        "INS" | "INSERT" => KeyCode::Insert,
        "UP" => KeyCode::Up,
        "DOWN" => KeyCode::Down,
        "LEFT" => KeyCode::Left,
        "RIGHT" => KeyCode::Right,
        "PRINTSCREEN" => KeyCode::PrintScreen,
        "SCROLLLOCK" => KeyCode::ScrollLock,
        "PAUSE" => KeyCode::Pause,
        other => {
            if let Some(n) = other.strip_prefix('F') {
                if let Ok(n) = n.parse::<u8>() {
                    if (1..=12).contains(&n) {
                        return Some(KeyCode::Function(n));
                    }
                }
            }
            if other.chars().count() == 1 {
                return other.chars().next().map(KeyCode::Char);
            }
            return None;
        }
    })
}

fn resolve_internal_command(name: &str) -> Option<InternalCommand> {
    Some(match name {
        "CMD_FONT_INC" => InternalCommand::FontInc,
        "CMD_FONT_DEC" => InternalCommand::FontDec,
        "CMD_CURSOR_TOGGLE_VISIBILITY" => InternalCommand::CursorToggleVisibility,
        "CMD_CURSOR_TOGGLE_BLINK" => InternalCommand::CursorToggleBlink,
        "CMD_CURSOR_CYCLE_STYLE" => InternalCommand::CursorCycleStyle,
        "CMD_TERMINAL_RESET" => InternalCommand::TerminalReset,
        "CMD_TERMINAL_CLEAR" => InternalCommand::TerminalClear,
        "CMD_OSK_TOGGLE_POSITION" => InternalCommand::OskTogglePosition,
        _ => return None,
    })
}

fn parse_modifier_list(extra: &str) -> Modifiers {
    let mut mods = Modifiers::empty();
    for word in extra.split(',') {
        match word.trim().to_ascii_lowercase().as_str() {
            "ctrl" => mods.insert(Modifiers::CTRL),
            "alt" => mods.insert(Modifiers::ALT),
            "shift" => mods.insert(Modifiers::SHIFT),
            "gui" | "win" | "super" => mods.insert(Modifiers::GUI),
            "" => {}
            other => log::debug!("unknown modifier alias in .keys extra field: {:?}", other),
        }
    }
    mods
}

fn parse_line(line: &str) -> Option<KeyEntry> {
    let parts = split_escaped(line);
    let display = parts.first()?.clone();
    let value = parts.get(1)?.trim();
    let extra = parts.get(2).map(|s| s.as_str()).unwrap_or("");

    let descriptor = if let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        if contains_unescaped_token(inner) {
            KeyDescriptor::Macro(inner.to_string())
        } else {
            KeyDescriptor::Literal(inner.to_string())
        }
    } else if value == "LOAD_FILE" {
        KeyDescriptor::LoadSet(extra.to_string())
    } else if value == "UNLOAD_FILE" {
        KeyDescriptor::UnloadSet(extra.to_string())
    } else if let Some(cmd) = resolve_internal_command(value) {
        KeyDescriptor::InternalCommand(cmd)
    } else if let Some(code) = resolve_keycode(value) {
        KeyDescriptor::Sequence(code, parse_modifier_list(extra))
    } else {
        log::debug!("unresolvable .keys value {:?}", value);
        return None;
    };

    Some(KeyEntry {
        display,
        descriptor,
    })
}

/// Parses a complete `.keys` file into an ordered key list. Blank lines
/// and `#` comments are ignored; unparsable lines are skipped with a
/// debug log (spec §7 "Malformed input").
pub fn parse(contents: &str) -> Vec<KeyEntry> {
    let mut entries = Vec::new();
    for (lineno, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_line(line) {
            Some(entry) => entries.push(entry),
            None => log::debug!("line {}: could not parse .keys entry: {:?}", lineno + 1, raw_line),
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_literal_macro_and_command() {
        let entries = parse(
            "Hi:\"hi{ENTER}\"\nPlain:\"just text\"\nReset:CMD_TERMINAL_RESET\nCtrlC:c:ctrl\n",
        );
        assert!(matches!(entries[0].descriptor, KeyDescriptor::Macro(_)));
        assert!(matches!(entries[1].descriptor, KeyDescriptor::Literal(_)));
        assert_eq!(entries[2].descriptor, KeyDescriptor::InternalCommand(InternalCommand::TerminalReset));
        assert_eq!(
            entries[3].descriptor,
            KeyDescriptor::Sequence(KeyCode::Char('c'), Modifiers::CTRL)
        );
    }

    #[test]
    fn load_and_unload_descriptors() {
        let entries = parse("+git:LOAD_FILE:/path/git.keys\n-git:UNLOAD_FILE:git\n");
        assert_eq!(entries[0].descriptor, KeyDescriptor::LoadSet("/path/git.keys".to_string()));
        assert_eq!(entries[1].descriptor, KeyDescriptor::UnloadSet("git".to_string()));
    }

    #[test]
    fn escaped_colon_in_display_name() {
        let entries = parse("a\\:b:\"x\"\n");
        assert_eq!(entries[0].display, "a:b");
    }
}
