//! Geometry of the thumbnail grid.

use std::ops::Range;

use crate::processing::layout::Rect;

/// Pixels scrolled per wheel line.
pub const LINE_SCROLL_PX: f32 = 48.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    columns: u32,
    spacing: f32,
    viewport_w: f32,
    viewport_h: f32,
    items: usize,
}

impl GridLayout {
    pub fn new(columns: u32, spacing: u32, viewport_w: u32, viewport_h: u32, items: usize) -> Self {
        Self {
            columns: columns.max(1),
            spacing: spacing as f32,
            viewport_w: viewport_w.max(1) as f32,
            viewport_h: viewport_h.max(1) as f32,
            items,
        }
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    /// Cells share the viewport width evenly, with `spacing` around every cell.
    pub fn cell_size(&self) -> f32 {
        let cols = self.columns as f32;
        ((self.viewport_w - self.spacing * (cols + 1.0)) / cols).max(1.0)
    }

    fn pitch(&self) -> f32 {
        self.cell_size() + self.spacing
    }

    pub fn rows(&self) -> usize {
        self.items.div_ceil(self.columns as usize)
    }

    pub fn content_height(&self) -> f32 {
        if self.items == 0 {
            return 0.0;
        }
        self.rows() as f32 * self.pitch() + self.spacing
    }

    pub fn max_scroll(&self) -> f32 {
        (self.content_height() - self.viewport_h).max(0.0)
    }

    pub fn clamp_scroll(&self, offset: f32) -> f32 {
        if offset.is_finite() {
            offset.clamp(0.0, self.max_scroll())
        } else {
            0.0
        }
    }

    /// Rectangle of cell `index` in viewport coordinates for the given scroll offset.
    pub fn cell_rect(&self, index: usize, scroll: f32) -> Rect {
        let cols = self.columns as usize;
        let row = (index / cols) as f32;
        let col = (index % cols) as f32;
        let size = self.cell_size();
        Rect {
            x: self.spacing + col * self.pitch(),
            y: self.spacing + row * self.pitch() - scroll,
            w: size,
            h: size,
        }
    }

    /// Items whose cells intersect the viewport, widened by `lookahead_rows` on each side.
    pub fn visible_range(&self, scroll: f32, lookahead_rows: usize) -> Range<usize> {
        if self.items == 0 {
            return 0..0;
        }
        let pitch = self.pitch();
        let scroll = self.clamp_scroll(scroll);
        let first_row = (scroll / pitch).floor() as usize;
        let last_row = ((scroll + self.viewport_h) / pitch).ceil() as usize;
        let first_row = first_row.saturating_sub(lookahead_rows);
        let last_row = (last_row + lookahead_rows).min(self.rows());
        let cols = self.columns as usize;
        let start = (first_row * cols).min(self.items);
        let end = (last_row * cols).min(self.items);
        start..end
    }

    /// Upper bound of `visible_range(_, lookahead_rows).len()` over every scroll offset.
    pub fn max_bound_items(&self, lookahead_rows: usize) -> usize {
        let rows = (self.viewport_h / self.pitch()).ceil() as usize + 1 + 2 * lookahead_rows;
        rows.saturating_mul(self.columns as usize).min(self.items)
    }

    pub fn page_height(&self) -> f32 {
        self.viewport_h
    }
}
