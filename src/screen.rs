//! The grid and scrollback model (spec §4.A), grounded on the shape of
//! `wezterm-term`'s `Screen` (a `VecDeque<Line>` holding scrollback plus
//! visible rows) but generalized to own both the normal screen's
//! line-ring *and* the alternate screen's separate, history-less buffer,
//! plus the cursor/attribute/mode state the spec keeps alongside them.

use crate::cell::{Glyph, Pen};
use crate::charset::CharSet;
use crate::dirty::DirtySet;
use crate::error::{CoreError, Result};
use crate::line::Line;
use crate::modes::{CursorStyle, SavedCursor, TerminalModes};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorPosition {
    pub x: usize,
    pub y: usize,
}

pub struct Grid {
    cols: usize,
    rows: usize,
    scrollback_cap: usize,

    /// Capacity `rows + scrollback_cap`; the last `rows` entries are the
    /// live viewport.
    normal_lines: std::collections::VecDeque<Line>,
    /// Always exactly `rows` lines; no history (spec §3 "Grid").
    alt_lines: Vec<Line>,

    pub modes: TerminalModes,
    pub pen: Pen,

    cursor_x: usize,
    cursor_y: usize,
    /// Deferred-wrap flag: set when a glyph was written to the last
    /// column; the actual wrap happens lazily on the next `put_char`
    /// (spec §8 boundary behavior: autowrap-disabled cursor motion parks
    /// at `cols - 1` indefinitely).
    wrap_next: bool,

    /// 1-based inclusive scroll region, matching the wire protocol (spec
    /// §3 "1 ≤ scroll_top ≤ scroll_bottom ≤ rows").
    scroll_top: usize,
    scroll_bottom: usize,

    pub g0: CharSet,
    pub g1: CharSet,
    pub active_g: usize,

    view_offset: usize,

    saved_normal: Option<SavedCursor>,
    saved_alt: Option<SavedCursor>,

    pub cursor_style: CursorStyle,

    dirty: DirtySet,
}

impl Grid {
    pub fn new(cols: usize, rows: usize, scrollback_cap: usize) -> Result<Self> {
        if cols == 0 || rows == 0 {
            return Err(CoreError::Alloc("cols and rows must be nonzero".into()));
        }
        let mut normal_lines = std::collections::VecDeque::with_capacity(rows + scrollback_cap);
        for _ in 0..rows {
            normal_lines.push_back(Line::blank(cols));
        }
        let alt_lines = (0..rows).map(|_| Line::blank(cols)).collect();
        Ok(Self {
            cols,
            rows,
            scrollback_cap,
            normal_lines,
            alt_lines,
            modes: TerminalModes::default(),
            pen: Pen::default(),
            cursor_x: 0,
            cursor_y: 0,
            wrap_next: false,
            scroll_top: 1,
            scroll_bottom: rows,
            g0: CharSet::Ascii,
            g1: CharSet::Ascii,
            active_g: 0,
            view_offset: 0,
            saved_normal: None,
            saved_alt: None,
            cursor_style: CursorStyle::default(),
            dirty: DirtySet::new(rows),
        })
    }

    // ---- accessors -----------------------------------------------------

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cursor_pos(&self) -> CursorPosition {
        CursorPosition {
            x: self.cursor_x,
            y: self.cursor_y,
        }
    }

    pub fn scroll_region(&self) -> (usize, usize) {
        (self.scroll_top, self.scroll_bottom)
    }

    pub fn history_size(&self) -> usize {
        self.normal_lines.len().saturating_sub(self.rows)
    }

    pub fn scrollback_cap(&self) -> usize {
        self.scrollback_cap
    }

    pub fn view_offset(&self) -> usize {
        self.view_offset
    }

    pub fn full_redraw_needed(&self) -> bool {
        self.dirty.full_redraw_needed
    }

    pub fn dirty_bounds(&self) -> Option<(usize, usize)> {
        self.dirty.bounds()
    }

    pub fn is_line_dirty(&self, y: usize) -> bool {
        self.dirty.is_dirty(y)
    }

    pub fn clear_dirty(&mut self) {
        self.dirty.clear_dirty();
    }

    pub fn mark_line_dirty(&mut self, y: usize) {
        self.dirty.mark_line_dirty(y);
    }

    /// Returns the glyph row to be shown at screen row `y`, honoring
    /// `view_offset` when the normal screen is active (spec §4.A
    /// `get_viewport_line`).
    pub fn get_viewport_line(&self, y: usize) -> &[Glyph] {
        if y >= self.rows {
            return &[];
        }
        if self.modes.alt_screen_active {
            self.alt_lines[y].as_slice()
        } else {
            let total = self.normal_lines.len();
            let visible_start = total - self.rows;
            let idx = visible_start
                .saturating_sub(self.view_offset)
                .saturating_add(y)
                .min(total - 1);
            self.normal_lines[idx].as_slice()
        }
    }

    /// Scrolls the viewport of the normal screen back into history by
    /// `delta` lines (positive = further back), clamped to
    /// `[0, history_size]`; a no-op while the alternate screen is active
    /// (spec invariant 1).
    pub fn scroll_viewport(&mut self, delta: isize) {
        if self.modes.alt_screen_active {
            self.view_offset = 0;
            return;
        }
        let history = self.history_size();
        let new_offset = (self.view_offset as isize + delta).clamp(0, history as isize);
        self.view_offset = new_offset as usize;
        self.dirty.mark_full_redraw();
    }

    fn reset_view_offset(&mut self) {
        if self.view_offset != 0 {
            self.view_offset = 0;
            self.dirty.mark_full_redraw();
        }
    }

    // ---- internal line access (ignores view_offset; always the live row) ----

    fn visible_slice_mut(&mut self) -> &mut [Line] {
        if self.modes.alt_screen_active {
            &mut self.alt_lines
        } else {
            let total = self.normal_lines.len();
            let start = total - self.rows;
            &mut self.normal_lines.make_contiguous()[start..]
        }
    }

    fn live_line_mut(&mut self, y: usize) -> &mut Line {
        &mut self.visible_slice_mut()[y]
    }

    // ---- cursor motion ---------------------------------------------------

    fn vertical_bounds(&self) -> (usize, usize) {
        if self.modes.origin {
            (self.scroll_top - 1, self.scroll_bottom - 1)
        } else {
            (0, self.rows - 1)
        }
    }

    pub fn cursor_up(&mut self, n: usize) {
        let (lo, _hi) = self.vertical_bounds();
        self.cursor_y = self.cursor_y.saturating_sub(n.max(1)).max(lo);
        self.wrap_next = false;
    }

    pub fn cursor_down(&mut self, n: usize) {
        let (_lo, hi) = self.vertical_bounds();
        self.cursor_y = (self.cursor_y + n.max(1)).min(hi);
        self.wrap_next = false;
    }

    pub fn cursor_forward(&mut self, n: usize) {
        self.cursor_x = (self.cursor_x + n.max(1)).min(self.cols - 1);
        self.wrap_next = false;
    }

    pub fn cursor_back(&mut self, n: usize) {
        self.cursor_x = self.cursor_x.saturating_sub(n.max(1));
        self.wrap_next = false;
    }

    pub fn cursor_to_col(&mut self, col0: usize) {
        self.cursor_x = col0.min(self.cols - 1);
        self.wrap_next = false;
    }

    pub fn cursor_to_row(&mut self, row0: usize) {
        let (lo, hi) = self.vertical_bounds();
        let base = if self.modes.origin { lo } else { 0 };
        self.cursor_y = (base + row0).clamp(lo, hi);
        self.wrap_next = false;
    }

    /// CSI `H`/`f`: absolute cursor position, honoring origin mode.
    pub fn cursor_to(&mut self, col0: usize, row0: usize) {
        self.cursor_to_row(row0);
        self.cursor_to_col(col0);
    }

    pub fn home_cursor(&mut self) {
        self.cursor_to(0, 0);
    }

    /// C0 TAB: advances to the next multiple of `width`, wrapping to the
    /// next line if that lands past the right margin (spec §4.B C0 table).
    pub fn tab(&mut self, width: usize) {
        let width = width.max(1);
        let next = (self.cursor_x / width + 1) * width;
        if next >= self.cols {
            self.cursor_x = 0;
            self.newline();
        } else {
            self.cursor_to_col(next);
        }
    }

    // ---- writing ----------------------------------------------------------

    /// Writes a glyph at the cursor and advances (spec §4.A `put_char`).
    pub fn put_char(&mut self, cp: char) {
        if self.wrap_next {
            self.wrap_next = false;
            if self.modes.autowrap {
                self.cursor_x = 0;
                self.newline();
            }
        }
        if self.modes.insert {
            let fill = self.pen.blank_glyph();
            let x = self.cursor_x;
            self.live_line_mut(self.cursor_y).insert_cells(x, 1, fill);
        }
        let glyph = Glyph {
            codepoint: cp,
            fg: self.pen.fg,
            bg: self.pen.bg,
            attrs: self.pen.attrs,
        };
        let y = self.cursor_y;
        let x = self.cursor_x;
        self.live_line_mut(y).set(x, glyph);
        self.reset_view_offset();
        self.dirty.mark_line_dirty(y);
        if self.cursor_x + 1 >= self.cols {
            self.wrap_next = true;
        } else {
            self.cursor_x += 1;
        }
    }

    /// Increments `cursor_y`, scrolling the region if needed (spec §4.A
    /// `newline`).
    pub fn newline(&mut self) {
        if self.cursor_y + 2 > self.scroll_bottom {
            self.scroll_up();
        } else {
            self.cursor_y = (self.cursor_y + 1).min(self.rows - 1);
        }
    }

    /// ESC `M`: reverse index. Cursor up one; if already at the top
    /// margin, scroll the region down by one.
    pub fn reverse_index(&mut self) {
        if self.cursor_y + 1 <= self.scroll_top {
            self.scroll_down();
        } else {
            self.cursor_y = self.cursor_y.saturating_sub(1);
        }
    }

    // ---- scrolling ----------------------------------------------------

    pub fn scroll_up(&mut self) {
        self.scroll_region_by(self.scroll_top, self.scroll_bottom, 1);
    }

    pub fn scroll_down(&mut self) {
        self.scroll_region_by(self.scroll_top, self.scroll_bottom, -1);
    }

    /// Scrolls the 1-based inclusive `[top, bottom]` range by `n` lines
    /// (positive = up, negative = down); lines lost off the top are
    /// appended to history when the region is the full screen and the
    /// normal screen is active, otherwise they are discarded. Vacated
    /// lines are cleared with the current pen (spec §4.A `scroll_region`).
    pub fn scroll_region_by(&mut self, top: usize, bottom: usize, n: isize) {
        if n == 0 || top >= bottom {
            return;
        }
        let top0 = top.saturating_sub(1);
        let bottom0 = bottom.saturating_sub(1).min(self.rows - 1);
        let full_screen = top == 1 && bottom == self.rows;
        let fill = self.pen.blank_glyph();

        if full_screen && !self.modes.alt_screen_active {
            if n > 0 {
                for _ in 0..n {
                    self.history_append(fill);
                }
            } else {
                for _ in 0..(-n) {
                    self.full_scroll_down_normal(fill);
                }
            }
        } else if n > 0 {
            for _ in 0..(n as usize).min(bottom0 - top0 + 1) {
                self.region_scroll_up_one(top0, bottom0, fill);
            }
        } else {
            for _ in 0..((-n) as usize).min(bottom0 - top0 + 1) {
                self.region_scroll_down_one(top0, bottom0, fill);
            }
        }
        self.reset_view_offset();
        self.dirty.mark_full_redraw();
    }

    fn history_append(&mut self, fill: Glyph) {
        self.normal_lines.push_back(Line::filled(self.cols, fill));
        if self.normal_lines.len() > self.rows + self.scrollback_cap {
            self.normal_lines.pop_front();
        }
    }

    fn full_scroll_down_normal(&mut self, fill: Glyph) {
        let total = self.normal_lines.len();
        let top_idx = total - self.rows;
        self.normal_lines.pop_back();
        self.normal_lines.insert(top_idx, Line::filled(self.cols, fill));
    }

    fn region_scroll_up_one(&mut self, top0: usize, bottom0: usize, fill: Glyph) {
        let cols = self.cols;
        let slice = self.visible_slice_mut();
        for i in top0..bottom0 {
            slice[i] = slice[i + 1].clone();
        }
        slice[bottom0] = Line::filled(cols, fill);
    }

    fn region_scroll_down_one(&mut self, top0: usize, bottom0: usize, fill: Glyph) {
        let cols = self.cols;
        let slice = self.visible_slice_mut();
        for i in (top0 + 1..=bottom0).rev() {
            slice[i] = slice[i - 1].clone();
        }
        slice[top0] = Line::filled(cols, fill);
    }

    /// DECSTBM: sets the scroll region and homes the cursor (spec §4.B
    /// CSI `r`).
    pub fn set_scroll_margins(&mut self, top: usize, bottom: usize) {
        let top = top.max(1).min(self.rows);
        let bottom = bottom.min(self.rows).max(top);
        self.scroll_top = top;
        self.scroll_bottom = bottom;
        self.home_cursor();
    }

    // ---- clearing / editing --------------------------------------------

    pub fn clear_line(&mut self, y: usize, from_x: usize) {
        let fill = self.pen.blank_glyph();
        self.live_line_mut(y).clear_from(from_x, fill);
        self.dirty.mark_line_dirty(y);
    }

    pub fn clear_line_to_cursor(&mut self, y: usize, to_x: usize) {
        let fill = self.pen.blank_glyph();
        self.live_line_mut(y).clear_to_inclusive(to_x, fill);
        self.dirty.mark_line_dirty(y);
    }

    pub fn clear_visible_screen(&mut self) {
        let fill = self.pen.blank_glyph();
        let rows = self.rows;
        let slice = self.visible_slice_mut();
        for line in slice.iter_mut() {
            line.clear_all(fill);
        }
        self.dirty.mark_range_dirty(0, rows.saturating_sub(1));
    }

    pub fn insert_chars(&mut self, n: usize) {
        let fill = self.pen.blank_glyph();
        let (x, y) = (self.cursor_x, self.cursor_y);
        self.live_line_mut(y).insert_cells(x, n, fill);
        self.dirty.mark_line_dirty(y);
    }

    pub fn delete_chars(&mut self, n: usize) {
        let fill = self.pen.blank_glyph();
        let (x, y) = (self.cursor_x, self.cursor_y);
        self.live_line_mut(y).delete_cells(x, n, fill);
        self.dirty.mark_line_dirty(y);
    }

    pub fn erase_chars(&mut self, n: usize) {
        let fill = self.pen.blank_glyph();
        let (x, y) = (self.cursor_x, self.cursor_y);
        self.live_line_mut(y).erase_cells(x, n, fill);
        self.dirty.mark_line_dirty(y);
    }

    /// CSI `L`/`M` (not `@`/`P`, which are column-local): insert/delete
    /// whole lines within the scroll region at the cursor row.
    pub fn insert_lines(&mut self, n: usize) {
        let bottom = self.scroll_bottom;
        let row1 = self.cursor_y + 1;
        if row1 < self.scroll_top || row1 > bottom {
            return;
        }
        self.scroll_region_by(row1, bottom, -(n as isize));
    }

    pub fn delete_lines(&mut self, n: usize) {
        let bottom = self.scroll_bottom;
        let row1 = self.cursor_y + 1;
        if row1 < self.scroll_top || row1 > bottom {
            return;
        }
        self.scroll_region_by(row1, bottom, n as isize);
    }

    // ---- alt screen -----------------------------------------------------

    pub fn enter_alt_screen(&mut self) {
        if self.modes.alt_screen_active {
            return;
        }
        self.saved_normal = Some(self.capture_cursor());
        self.modes.alt_screen_active = true;
        let fill = Glyph::default();
        for line in &mut self.alt_lines {
            line.clear_all(fill);
        }
        self.home_cursor();
        self.view_offset = 0;
        self.dirty.mark_full_redraw();
    }

    pub fn leave_alt_screen(&mut self) {
        if !self.modes.alt_screen_active {
            return;
        }
        self.modes.alt_screen_active = false;
        if let Some(saved) = self.saved_normal.take() {
            self.restore_cursor(saved);
        }
        self.dirty.mark_full_redraw();
    }

    // ---- save/restore cursor --------------------------------------------

    fn capture_cursor(&self) -> SavedCursor {
        SavedCursor {
            x: self.cursor_x,
            y: self.cursor_y,
            pen: self.pen,
            origin: self.modes.origin,
        }
    }

    fn restore_cursor(&mut self, saved: SavedCursor) {
        self.cursor_x = saved.x.min(self.cols - 1);
        self.cursor_y = saved.y.min(self.rows - 1);
        self.pen = saved.pen;
        self.modes.origin = saved.origin;
        self.wrap_next = false;
    }

    /// ESC `7`/CSI `s`: save cursor for whichever screen is current.
    pub fn save_cursor(&mut self) {
        let saved = self.capture_cursor();
        if self.modes.alt_screen_active {
            self.saved_alt = Some(saved);
        } else {
            self.saved_normal = Some(saved);
        }
    }

    /// ESC `8`/CSI `u`: restore cursor for whichever screen is current.
    pub fn restore_saved_cursor(&mut self) {
        let saved = if self.modes.alt_screen_active {
            self.saved_alt
        } else {
            self.saved_normal
        };
        if let Some(saved) = saved {
            self.restore_cursor(saved);
        }
    }

    // ---- full reset / resize --------------------------------------------

    /// ESC `c` (DECREST): re-initializes the grid, attributes and modes
    /// to their construction-time values, preserving dimensions.
    pub fn full_reset(&mut self) {
        let (cols, rows, scrollback_cap) = (self.cols, self.rows, self.scrollback_cap);
        *self = Grid::new(cols, rows, scrollback_cap)
            .expect("full_reset cannot fail: dimensions were already valid");
    }

    /// Reallocates and fully resets; scrollback is discarded (spec §4.A
    /// `resize`, acknowledged as destructive in SPEC_FULL.md / DESIGN.md).
    pub fn resize(&mut self, new_cols: usize, new_rows: usize) -> Result<()> {
        if new_cols == 0 || new_rows == 0 {
            return Err(CoreError::Alloc("cols and rows must be nonzero".into()));
        }
        let scrollback_cap = self.scrollback_cap;
        *self = Grid::new(new_cols, new_rows, scrollback_cap)?;
        Ok(())
    }

    /// CSI `#8` (DECALN): fills the visible screen with `'E'`.
    pub fn fill_screen_with_e(&mut self) {
        let rows = self.rows;
        let cols = self.cols;
        let slice = self.visible_slice_mut();
        for line in slice.iter_mut() {
            for x in 0..cols {
                line.set(
                    x,
                    Glyph {
                        codepoint: 'E',
                        ..Glyph::default()
                    },
                );
            }
        }
        self.dirty.mark_range_dirty(0, rows.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_text(grid: &Grid, y: usize) -> String {
        grid.get_viewport_line(y).iter().map(|g| g.codepoint).collect()
    }

    #[test]
    fn autowrap_and_scrollback_scenario() {
        // spec §8 scenario 2
        let mut g = Grid::new(5, 2, 10).unwrap();
        for c in "abcdef".chars() {
            g.put_char(c);
        }
        assert_eq!(line_text(&g, 0), "abcde");
        assert_eq!(line_text(&g, 1), "f    ");
        assert_eq!(g.cursor_pos(), CursorPosition { x: 1, y: 1 });
        assert_eq!(g.history_size(), 0);
    }

    #[test]
    fn newline_at_bottom_margin_scrolls_oldest_row_into_history() {
        let mut g = Grid::new(5, 2, 10).unwrap();
        for c in "abcdef".chars() {
            g.put_char(c);
        }
        assert_eq!(g.history_size(), 0);
        g.newline();
        assert_eq!(g.history_size(), 1);
        assert_eq!(line_text(&g, 0), "f    ");
        assert_eq!(line_text(&g, 1), "     ");
    }

    #[test]
    fn autowrap_disabled_parks_cursor() {
        let mut g = Grid::new(5, 1, 0).unwrap();
        g.modes.autowrap = false;
        for c in "abcdefgh".chars() {
            g.put_char(c);
        }
        assert_eq!(g.cursor_pos(), CursorPosition { x: 4, y: 0 });
        assert_eq!(line_text(&g, 0), "abcdh");
    }

    #[test]
    fn alt_screen_round_trip_restores_cursor() {
        let mut g = Grid::new(10, 4, 5).unwrap();
        g.put_char('x');
        g.put_char('y');
        let before = g.cursor_pos();
        g.enter_alt_screen();
        assert_eq!(g.cursor_pos(), CursorPosition { x: 0, y: 0 });
        g.put_char('z');
        g.leave_alt_screen();
        assert_eq!(g.cursor_pos(), before);
        assert_eq!(line_text(&g, 0).chars().next().unwrap(), 'x');
    }

    #[test]
    fn scroll_region_of_one_row_is_a_noop() {
        let mut g = Grid::new(10, 5, 0).unwrap();
        g.set_scroll_margins(3, 3);
        g.scroll_region_by(3, 3, 1);
        assert_eq!(g.scroll_region(), (3, 3));
    }

    #[test]
    fn scroll_margins_clamp_top_to_rows() {
        // CSI `100;200r` on a 4-row grid: both bounds must land within
        // [1, rows], preserving the §3 invariant `scroll_top ≤ rows`.
        let mut g = Grid::new(10, 4, 0).unwrap();
        g.set_scroll_margins(100, 200);
        assert_eq!(g.scroll_region(), (4, 4));
    }

    #[test]
    fn insert_mode_shifts_existing_cells() {
        let mut g = Grid::new(5, 1, 0).unwrap();
        for c in "abcd".chars() {
            g.put_char(c);
        }
        g.cursor_to_col(1);
        g.modes.insert = true;
        g.put_char('X');
        assert_eq!(line_text(&g, 0), "aXbcd");
    }
}
