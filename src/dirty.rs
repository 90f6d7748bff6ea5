//! Line-granularity damage tracking (spec §4.A "Dirty tracking"). A plain
//! `Vec<bool>` with incrementally maintained min/max bounds — the spec
//! calls for exactly this ("Dirty-line set ⊆ {0,…,rows-1}; its min/max
//! bounds are maintained incrementally"), so there's no reason to reach
//! for a bitset crate here.

#[derive(Debug, Clone)]
pub struct DirtySet {
    rows: usize,
    dirty: Vec<bool>,
    min_y: Option<usize>,
    max_y: Option<usize>,
    pub full_redraw_needed: bool,
}

impl DirtySet {
    pub fn new(rows: usize) -> Self {
        Self {
            rows,
            dirty: vec![false; rows],
            min_y: None,
            max_y: None,
            full_redraw_needed: true,
        }
    }

    pub fn resize(&mut self, rows: usize) {
        self.rows = rows;
        self.dirty = vec![false; rows];
        self.min_y = None;
        self.max_y = None;
        self.full_redraw_needed = true;
    }

    pub fn mark_line_dirty(&mut self, y: usize) {
        if y >= self.rows {
            return;
        }
        self.dirty[y] = true;
        self.min_y = Some(self.min_y.map_or(y, |m| m.min(y)));
        self.max_y = Some(self.max_y.map_or(y, |m| m.max(y)));
    }

    pub fn mark_range_dirty(&mut self, from: usize, to_inclusive: usize) {
        for y in from..=to_inclusive.min(self.rows.saturating_sub(1)) {
            self.mark_line_dirty(y);
        }
    }

    pub fn mark_full_redraw(&mut self) {
        self.full_redraw_needed = true;
    }

    pub fn is_dirty(&self, y: usize) -> bool {
        self.full_redraw_needed || self.dirty.get(y).copied().unwrap_or(false)
    }

    pub fn bounds(&self) -> Option<(usize, usize)> {
        match (self.min_y, self.max_y) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        }
    }

    pub fn clear_dirty(&mut self) {
        for d in &mut self.dirty {
            *d = false;
        }
        self.min_y = None;
        self.max_y = None;
        self.full_redraw_needed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_min_max_incrementally() {
        let mut d = DirtySet::new(10);
        d.clear_dirty();
        d.mark_line_dirty(5);
        d.mark_line_dirty(2);
        d.mark_line_dirty(7);
        assert_eq!(d.bounds(), Some((2, 7)));
    }

    #[test]
    fn clear_resets_everything() {
        let mut d = DirtySet::new(4);
        d.clear_dirty();
        d.mark_line_dirty(1);
        d.clear_dirty();
        assert_eq!(d.bounds(), None);
        assert!(!d.is_dirty(1));
    }
}
