// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::{BTreeMap, BTreeSet};

use crate::search::SearchState;
use crate::{CellValue, ColumnDisplayMode, Cursor, ViewSnapshot};

/// Interaction mode. Searching is exclusive: it owns the keyboard until it
/// is cancelled or an operation is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Searching,
}

/// Everything the user has built up on the currently loaded view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    num_rows: usize,
    num_cols: usize,
    pub cursor: Cursor,
    pub key_columns: Vec<usize>,
    pub aggregate_column: Option<usize>,
    pub hidden_columns: BTreeSet<usize>,
    pub display_modes: BTreeMap<usize, ColumnDisplayMode>,
    pub filters: BTreeMap<usize, BTreeSet<CellValue>>,
    pub search: SearchState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    MoveRow(isize),
    MoveColumn(isize),
    JumpFirstRow,
    JumpLastRow,
    ToggleKeyColumn,
    ToggleAggregateColumn,
    ToggleFilterValue,
    ToggleHiddenColumn,
    ToggleDisplayMode,
    SortAscending,
    SortDescending,
    RunFilter,
    RunFrequency,
    RunMultiFrequency,
    RunPivot,
    EnterSearch,
    ExitSearch,
    SearchInsert(char),
    SearchBackspace,
    Confirm,
    NavigateBack,
    NavigateForward,
}

impl ViewState {
    pub fn new(num_rows: usize, num_cols: usize, wrapped_columns: &BTreeSet<usize>) -> Self {
        Self {
            num_rows,
            num_cols,
            cursor: Cursor::default(),
            key_columns: Vec::new(),
            aggregate_column: None,
            hidden_columns: BTreeSet::new(),
            display_modes: wrapped_columns
                .iter()
                .filter(|col| **col < num_cols)
                .map(|col| (*col, ColumnDisplayMode::Wrap))
                .collect(),
            filters: BTreeMap::new(),
            search: SearchState::default(),
        }
    }

    pub const fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub const fn num_cols(&self) -> usize {
        self.num_cols
    }

    pub const fn mode(&self) -> Mode {
        if self.search.is_active() {
            Mode::Searching
        } else {
            Mode::Normal
        }
    }

    pub fn display_mode(&self, col: usize) -> ColumnDisplayMode {
        self.display_modes.get(&col).copied().unwrap_or_default()
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            row: self.cursor.row,
            col: self.cursor.col,
            hidden_columns: self.hidden_columns.clone(),
            column_display_mode: self.display_modes.clone(),
        }
    }

    /// Applies a persisted snapshot. Entries that fall outside this view's
    /// bounds are dropped and the cursor is clamped.
    pub fn apply_snapshot(&mut self, snapshot: &ViewSnapshot) {
        self.hidden_columns = snapshot
            .hidden_columns
            .iter()
            .copied()
            .filter(|col| *col < self.num_cols)
            .collect();
        self.display_modes = snapshot
            .column_display_mode
            .iter()
            .filter(|(col, _)| **col < self.num_cols)
            .map(|(col, mode)| (*col, *mode))
            .collect();
        self.cursor = Cursor {
            row: snapshot.row,
            col: snapshot.col,
        };
        self.clamp_cursor();
    }
}
