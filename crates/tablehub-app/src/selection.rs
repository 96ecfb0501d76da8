// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;

use crate::{CellValue, ColumnDisplayMode, GridSource, ViewState};

/// Outcome of toggling the cursor cell's value in the filter map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterToggle {
    Added { col: usize, value: CellValue },
    Removed { col: usize, value: CellValue },
}

impl ViewState {
    pub fn toggle_key_column(&mut self, col: usize) {
        if let Some(index) = self.key_columns.iter().position(|key| *key == col) {
            self.key_columns.remove(index);
        } else {
            self.key_columns.push(col);
        }
    }

    pub fn toggle_aggregate_column(&mut self, col: usize) {
        if self.aggregate_column == Some(col) {
            self.aggregate_column = None;
        } else {
            self.aggregate_column = Some(col);
        }
    }

    /// Toggles the value under the cursor in its column's filter set. A
    /// column whose last value is removed leaves the map entirely.
    pub fn toggle_filter_value(&mut self, grid: &impl GridSource) -> Option<FilterToggle> {
        let col = self.cursor.col;
        let value = grid.cell_value(self.cursor.row, col)?.clone();

        if let Some(values) = self.filters.get_mut(&col) {
            if values.remove(&value) {
                if values.is_empty() {
                    self.filters.remove(&col);
                }
                return Some(FilterToggle::Removed { col, value });
            }
            values.insert(value.clone());
        } else {
            self.filters.insert(col, BTreeSet::from([value.clone()]));
        }
        Some(FilterToggle::Added { col, value })
    }

    pub fn is_filter_value(&self, col: usize, value: &CellValue) -> bool {
        self.filters
            .get(&col)
            .is_some_and(|values| values.contains(value))
    }

    /// Match-any: with no filters nothing is hidden; otherwise a row stays
    /// visible only if some filtered column holds one of its accepted values.
    pub fn is_row_filtered(&self, grid: &impl GridSource, row: usize) -> bool {
        if self.filters.is_empty() {
            return false;
        }
        for (col, values) in &self.filters {
            if let Some(value) = grid.cell_value(row, *col)
                && values.contains(value)
            {
                return false;
            }
        }
        true
    }

    /// Returns the new hidden state of the cursor column.
    pub fn toggle_hidden_column(&mut self) -> bool {
        let col = self.cursor.col;
        let hidden = if self.hidden_columns.remove(&col) {
            false
        } else {
            self.hidden_columns.insert(col);
            true
        };
        self.relocate_column_after_hide();
        hidden
    }

    pub fn toggle_column_display_mode(&mut self) -> ColumnDisplayMode {
        let col = self.cursor.col;
        let next = self.display_mode(col).next();
        self.display_modes.insert(col, next);
        next
    }

    pub fn visible_columns(&self) -> Vec<usize> {
        (0..self.num_cols())
            .filter(|col| !self.hidden_columns.contains(col))
            .collect()
    }

    pub fn visible_column_names(&self, grid: &impl GridSource) -> Vec<String> {
        self.visible_columns()
            .into_iter()
            .filter_map(|col| grid.column_name(col).map(str::to_owned))
            .collect()
    }
}
