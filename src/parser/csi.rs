//! CSI parameter collection support and the final-byte dispatch table
//! (spec §4.B "CSI state"). The state machine in `parser/mod.rs` hands a
//! fully collected `(params, private_marker, intermediates, final_byte)`
//! tuple here once the terminator is seen.

use crate::modes::CursorStyle;
use crate::parser::sgr::apply_sgr;
use crate::Terminal;

pub const MAX_CSI_PARAMS: usize = 16;

/// `params[idx]`, defaulting to 0 (xterm's "unspecified") when absent.
fn raw(params: &[i64], idx: usize) -> i64 {
    params.get(idx).copied().unwrap_or(0)
}

/// `params[idx] ∨ 1`: the common "count" default used by cursor motion,
/// insert/delete, and scroll-by-n commands.
fn count(params: &[i64], idx: usize) -> usize {
    let v = raw(params, idx);
    if v <= 0 {
        1
    } else {
        v as usize
    }
}

/// `params[idx] ∨ 1`, converted from 1-based wire coordinates to a 0-based
/// offset, for `G`/`d`/`H`/`f`.
fn coord0(params: &[i64], idx: usize) -> usize {
    count(params, idx).saturating_sub(1)
}

fn push_response(term: &mut Terminal, bytes: &[u8]) {
    if term.response_buffer.len() + bytes.len() > 64 {
        log::debug!("response buffer would overflow 64 bytes, dropping report");
        return;
    }
    term.response_buffer.extend_from_slice(bytes);
}

fn erase_display(term: &mut Terminal, mode: i64) {
    let rows = term.grid.rows();
    let y = term.grid.cursor_pos().y;
    let x = term.grid.cursor_pos().x;
    match mode {
        0 => {
            term.grid.clear_line(y, x);
            for row in y + 1..rows {
                term.grid.clear_line(row, 0);
            }
        }
        1 => {
            for row in 0..y {
                term.grid.clear_line(row, 0);
            }
            term.grid.clear_line_to_cursor(y, x);
        }
        _ => term.grid.clear_visible_screen(),
    }
}

fn erase_line(term: &mut Terminal, mode: i64) {
    let y = term.grid.cursor_pos().y;
    let x = term.grid.cursor_pos().x;
    match mode {
        0 => term.grid.clear_line(y, x),
        1 => term.grid.clear_line_to_cursor(y, x),
        _ => term.grid.clear_line(y, 0),
    }
}

fn set_ansi_mode(term: &mut Terminal, params: &[i64], enable: bool) {
    for &p in params {
        if p == 4 {
            term.grid.modes.insert = enable;
        }
    }
}

fn set_dec_private_mode(term: &mut Terminal, params: &[i64], enable: bool) {
    for &p in params {
        match p {
            1 => term.grid.modes.application_cursor = enable,
            6 => {
                term.grid.modes.origin = enable;
                term.grid.home_cursor();
            }
            7 => term.grid.modes.autowrap = enable,
            25 => term.grid.modes.cursor_visible = enable,
            66 => term.grid.modes.application_keypad = enable,
            1049 => {
                if enable {
                    term.grid.enter_alt_screen();
                } else {
                    term.grid.leave_alt_screen();
                }
            }
            _ => log::debug!("unhandled DEC private mode {}", p),
        }
    }
}

fn decscusr(term: &mut Terminal, params: &[i64]) {
    let (style, blink) = match raw(params, 0) {
        0 | 1 => (CursorStyle::Block, true),
        2 => (CursorStyle::Block, false),
        3 => (CursorStyle::Underline, true),
        4 => (CursorStyle::Underline, false),
        5 => (CursorStyle::Bar, true),
        6 => (CursorStyle::Bar, false),
        other => {
            log::debug!("unhandled DECSCUSR parameter {}", other);
            return;
        }
    };
    term.grid.cursor_style = style;
    term.grid.modes.cursor_blink_enabled = blink;
}

pub fn dispatch(
    term: &mut Terminal,
    params: &[i64],
    private: Option<u8>,
    intermediates: &[u8],
    final_byte: u8,
) {
    match (final_byte, private) {
        (b'A', None) => term.grid.cursor_up(count(params, 0)),
        (b'B', None) => term.grid.cursor_down(count(params, 0)),
        (b'C', None) => term.grid.cursor_forward(count(params, 0)),
        (b'D', None) => term.grid.cursor_back(count(params, 0)),
        (b'G', None) => term.grid.cursor_to_col(coord0(params, 0)),
        (b'd', None) => term.grid.cursor_to_row(coord0(params, 0)),
        (b'H', None) | (b'f', None) => {
            let row = coord0(params, 0);
            let col = coord0(params, 1);
            term.grid.cursor_to(col, row);
        }
        (b'J', None) => erase_display(term, raw(params, 0)),
        (b'K', None) => erase_line(term, raw(params, 0)),
        (b'@', None) => term.grid.insert_chars(count(params, 0)),
        (b'L', None) => term.grid.insert_lines(count(params, 0)),
        (b'M', None) => term.grid.delete_lines(count(params, 0)),
        (b'P', None) => term.grid.delete_chars(count(params, 0)),
        (b'S', None) => {
            let (top, bottom) = term.grid.scroll_region();
            term.grid.scroll_region_by(top, bottom, count(params, 0) as isize);
        }
        (b'T', None) => {
            let (top, bottom) = term.grid.scroll_region();
            term.grid.scroll_region_by(top, bottom, -(count(params, 0) as isize));
        }
        (b'X', None) => term.grid.erase_chars(count(params, 0)),
        (b'c', None) => push_response(term, b"\x1b[?1;2c"),
        (b'n', None) if raw(params, 0) == 6 => {
            let pos = term.grid.cursor_pos();
            push_response(term, format!("\x1b[{};{}R", pos.y + 1, pos.x + 1).as_bytes());
        }
        (b'm', None) => apply_sgr(&mut term.grid.pen, params),
        (b'h', None) => set_ansi_mode(term, params, true),
        (b'l', None) => set_ansi_mode(term, params, false),
        (b'h', Some(b'?')) => set_dec_private_mode(term, params, true),
        (b'l', Some(b'?')) => set_dec_private_mode(term, params, false),
        (b'q', None) if intermediates.contains(&b' ') => decscusr(term, params),
        (b's', None) => term.grid.save_cursor(),
        (b'u', None) => term.grid.restore_saved_cursor(),
        (b'r', None) => {
            let rows = term.grid.rows();
            let top = count(params, 0);
            let bottom = if raw(params, 1) <= 0 {
                rows
            } else {
                raw(params, 1) as usize
            };
            term.grid.set_scroll_margins(top, bottom);
        }
        (b't', None) if raw(params, 0) == 18 => {
            let (cols, rows) = (term.grid.cols(), term.grid.rows());
            push_response(term, format!("\x1b[8;{};{}t", rows, cols).as_bytes());
        }
        _ => log::debug!(
            "unhandled CSI: final={:?} private={:?} params={:?} intermediates={:?}",
            final_byte as char,
            private.map(|b| b as char),
            params,
            intermediates
        ),
    }
}
