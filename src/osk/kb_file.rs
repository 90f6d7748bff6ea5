//! `.kb` on-screen-keyboard layout file parser (spec §4.D "File format:
//! OSK layout"). Section headers select a modifier-mask layer; the lines
//! inside become that layer's rows.

use crate::input::{KeyCode, Modifiers};
use crate::osk::descriptor::{KeyDescriptor, ModifierKey, Row};

#[derive(Debug, Clone)]
pub struct Layer {
    pub rows: Vec<Row>,
    /// The modifier mask keys of this layer carry when emitted, which may
    /// differ from the mask used to select the layer (the `:mask` header
    /// suffix).
    pub active_mod_mask: Modifiers,
}

#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub layers: [Option<Layer>; 16],
}

fn parse_mask_words(spec: &str) -> Modifiers {
    let mut mask = Modifiers::empty();
    for word in spec.split(|c| c == '+' || c == ',') {
        let word = word.trim().to_ascii_lowercase();
        match word.as_str() {
            "shift" => mask.insert(Modifiers::SHIFT),
            "ctrl" => mask.insert(Modifiers::CTRL),
            "alt" => mask.insert(Modifiers::ALT),
            "gui" => mask.insert(Modifiers::GUI),
            "default" | "normal" | "" => {}
            other => log::debug!("unknown modifier word in .kb header: {:?}", other),
        }
    }
    mask
}

fn parse_header(header: &str) -> (Modifiers, Modifiers) {
    match header.split_once(':') {
        Some((mask_part, active_part)) => {
            let mask = parse_mask_words(mask_part);
            let active = parse_mask_words(active_part);
            (mask, active)
        }
        None => {
            let mask = parse_mask_words(header);
            (mask, mask)
        }
    }
}

pub(crate) fn parse_brace_token(token: &str) -> KeyDescriptor {
    match token.to_ascii_uppercase().as_str() {
        "ENTER" => KeyDescriptor::Sequence(KeyCode::Enter, Modifiers::empty()),
        "SPACE" => KeyDescriptor::Sequence(KeyCode::Char(' '), Modifiers::empty()),
        "TAB" => KeyDescriptor::Sequence(KeyCode::Tab, Modifiers::empty()),
        "BS" => KeyDescriptor::Sequence(KeyCode::Backspace, Modifiers::empty()),
        "DEL" => KeyDescriptor::Sequence(KeyCode::Delete, Modifiers::empty()),
        "ESC" => KeyDescriptor::Sequence(KeyCode::Escape, Modifiers::empty()),
        "UP" => KeyDescriptor::Sequence(KeyCode::Up, Modifiers::empty()),
        "DOWN" => KeyDescriptor::Sequence(KeyCode::Down, Modifiers::empty()),
        "LEFT" => KeyDescriptor::Sequence(KeyCode::Left, Modifiers::empty()),
        "RIGHT" => KeyDescriptor::Sequence(KeyCode::Right, Modifiers::empty()),
        "HOME" => KeyDescriptor::Sequence(KeyCode::Home, Modifiers::empty()),
        "END" => KeyDescriptor::Sequence(KeyCode::End, Modifiers::empty()),
        "PGUP" => KeyDescriptor::Sequence(KeyCode::PageUp, Modifiers::empty()),
        "PGDN" => KeyDescriptor::Sequence(KeyCode::PageDown, Modifiers::empty()),
        "INS" => KeyDescriptor::Sequence(KeyCode::Insert, Modifiers::empty()),
        "SHIFT" => KeyDescriptor::ModToggle(ModifierKey::Shift),
        "CTRL" => KeyDescriptor::ModToggle(ModifierKey::Ctrl),
        "ALT" => KeyDescriptor::ModToggle(ModifierKey::Alt),
        "GUI" => KeyDescriptor::ModToggle(ModifierKey::Gui),
        "N/A" => KeyDescriptor::NotApplicable,
        other => {
            if let Some(n) = other.strip_prefix('F') {
                if let Ok(n) = n.parse::<u8>() {
                    if (1..=12).contains(&n) {
                        return KeyDescriptor::Sequence(KeyCode::Function(n), Modifiers::empty());
                    }
                }
            }
            log::debug!("unknown .kb token {{{}}}, treating as N/A", other);
            KeyDescriptor::NotApplicable
        }
    }
}

fn parse_row(line: &str) -> Row {
    if line == "{DEFAULT}" {
        return Row::Default;
    }
    let mut keys = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                keys.push(KeyDescriptor::Literal(escaped.to_string()));
            }
        } else if c == '{' {
            let mut token = String::new();
            for inner in chars.by_ref() {
                if inner == '}' {
                    break;
                }
                token.push(inner);
            }
            keys.push(parse_brace_token(&token));
        } else {
            keys.push(KeyDescriptor::Sequence(KeyCode::Char(c), Modifiers::empty()));
        }
    }
    Row::Keys(keys)
}

/// Parses a complete `.kb` file. Malformed lines are skipped with a debug
/// log, never fatal (spec §7 "Malformed input").
pub fn parse(contents: &str) -> Layout {
    let mut layout = Layout::default();
    let mut current_mask: Option<usize> = None;

    for (lineno, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim_end();
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        if let Some(header) = line.trim().strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            let (mask, active) = parse_header(header);
            let idx = mask.bits() as usize;
            layout.layers[idx] = Some(Layer {
                rows: Vec::new(),
                active_mod_mask: active,
            });
            current_mask = Some(idx);
            continue;
        }
        match current_mask.and_then(|idx| layout.layers[idx].as_mut()) {
            Some(layer) => layer.rows.push(parse_row(line)),
            None => log::debug!("line {}: row outside any [section]: {:?}", lineno + 1, raw_line),
        }
    }
    layout
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_default_and_shift_layers_with_na_fallback() {
        let layout = parse("[default]\nabc\n\n[shift]\nA{N/A}C\n");
        let base = layout.layers[0].as_ref().unwrap();
        assert_eq!(base.rows.len(), 1);
        let shift = layout.layers[Modifiers::SHIFT.bits() as usize].as_ref().unwrap();
        match &shift.rows[0] {
            Row::Keys(keys) => {
                assert_eq!(keys.len(), 3);
                assert_eq!(keys[1], KeyDescriptor::NotApplicable);
            }
            Row::Default => panic!("expected a keyed row"),
        }
    }

    #[test]
    fn whole_row_default_marker() {
        let layout = parse("[default]\nabc\n[ctrl]\n{DEFAULT}\n");
        let ctrl = layout.layers[Modifiers::CTRL.bits() as usize].as_ref().unwrap();
        assert_eq!(ctrl.rows[0], Row::Default);
    }

    #[test]
    fn active_mask_suffix_overrides_emitted_modifiers() {
        let layout = parse("[shift+ctrl:ctrl]\nx\n");
        let idx = (Modifiers::SHIFT | Modifiers::CTRL).bits() as usize;
        let layer = layout.layers[idx].as_ref().unwrap();
        assert_eq!(layer.active_mod_mask, Modifiers::CTRL);
    }
}
