// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;

use crate::ViewState;

impl ViewState {
    pub fn move_row(&mut self, delta: isize) {
        self.cursor.row = clamp_offset(self.cursor.row, delta, self.num_rows());
    }

    pub fn move_col(&mut self, delta: isize) {
        self.cursor.col = clamp_offset(self.cursor.col, delta, self.num_cols());
    }

    pub fn jump_row_to_last(&mut self) {
        self.cursor.row = self.num_rows().saturating_sub(1);
    }

    pub fn jump_row_to_first(&mut self) {
        self.cursor.row = 0;
    }

    /// Pointer hover puts the cursor on the hovered cell.
    pub fn hover_cell(&mut self, row: usize, col: usize) {
        self.cursor.row = row;
        self.cursor.col = col;
        self.clamp_cursor();
    }

    /// Moves the cursor to the visible column nearest to it, preferring the
    /// right-hand neighbour on ties. Leaves it alone if every column is hidden.
    pub fn relocate_column_after_hide(&mut self) {
        if let Some(col) =
            nearest_visible_column(self.num_cols(), &self.hidden_columns, self.cursor.col)
        {
            self.cursor.col = col;
        }
    }

    pub(crate) fn clamp_cursor(&mut self) {
        self.cursor.row = self.cursor.row.min(self.num_rows().saturating_sub(1));
        self.cursor.col = self.cursor.col.min(self.num_cols().saturating_sub(1));
    }
}

/// Visible column minimizing `|i - col - 0.5|`. Distances are doubled so the
/// comparison stays in integers; the first minimum wins.
pub fn nearest_visible_column(
    num_cols: usize,
    hidden: &BTreeSet<usize>,
    col: usize,
) -> Option<usize> {
    let target = 2 * col as i64 + 1;
    (0..num_cols)
        .filter(|index| !hidden.contains(index))
        .min_by_key(|index| (2 * *index as i64 - target).abs())
}

fn clamp_offset(current: usize, delta: isize, len: usize) -> usize {
    let max = len.saturating_sub(1);
    current.saturating_add_signed(delta).min(max)
}
