// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::window::{RowWindow, visible_range};

/// Column geometry for a wrapped card grid at one container width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub width: u32,
    pub gap: u32,
    pub min_column_width: u32,
    pub column_count: usize,
    pub column_width: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    pub index: usize,
    pub row: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl GridLayout {
    pub fn compute(width: u32, gap: u32, min_column_width: u32) -> Self {
        let pitch = u64::from(min_column_width) + u64::from(gap);
        let fitted = if pitch == 0 {
            1
        } else {
            (u64::from(width) + u64::from(gap)) / pitch
        };
        let column_count = usize::try_from(fitted.max(1)).unwrap_or(1);

        let columns = i64::try_from(column_count).unwrap_or(1);
        let free = i64::from(width) - i64::from(gap) * (columns + 1);
        let stretched = free.div_euclid(columns);
        let column_width = u32::try_from(stretched.max(i64::from(min_column_width)))
            .unwrap_or(min_column_width);

        Self {
            width,
            gap,
            min_column_width,
            column_count,
            column_width,
        }
    }

    /// Whether a new container width needs a fresh layout.
    pub fn needs_reflow(&self, width: u32) -> bool {
        self.width != width
    }

    pub fn row_count(&self, item_count: usize) -> usize {
        item_count.div_ceil(self.column_count)
    }

    /// Flat index for `(row, column)`; positions past the last item hold
    /// nothing.
    pub fn cell_index(&self, row: usize, column: usize, item_count: usize) -> Option<usize> {
        if column >= self.column_count {
            return None;
        }
        let index = row.checked_mul(self.column_count)?.checked_add(column)?;
        (index < item_count).then_some(index)
    }

    pub fn cell_position(&self, index: usize) -> (usize, usize) {
        (index / self.column_count, index % self.column_count)
    }

    pub fn cell_rect(&self, index: usize, card_height: u32) -> CellRect {
        let (row, column) = self.cell_position(index);
        let column = u32::try_from(column).unwrap_or(u32::MAX);
        let row = u32::try_from(row).unwrap_or(u32::MAX);
        CellRect {
            x: self.gap + column.saturating_mul(self.column_width + self.gap),
            y: row.saturating_mul(card_height + self.gap),
            width: self.column_width,
            height: card_height,
        }
    }

    /// Grid rows to materialize; each grid row is one card plus its gap.
    pub fn visible_rows(
        &self,
        scroll_offset: u32,
        viewport_height: u32,
        card_height: u32,
        item_count: usize,
        overscan: usize,
    ) -> Option<RowWindow> {
        visible_range(
            scroll_offset,
            viewport_height,
            card_height + self.gap,
            self.row_count(item_count),
            overscan,
        )
    }

    /// Cells whose row falls inside `window`, skipping empty trailing slots.
    pub fn visible_cells(&self, window: RowWindow, item_count: usize) -> Vec<GridCell> {
        window
            .indices()
            .flat_map(|row| (0..self.column_count).map(move |column| (row, column)))
            .filter_map(|(row, column)| {
                self.cell_index(row, column, item_count)
                    .map(|index| GridCell { index, row, column })
            })
            .collect()
    }
}
