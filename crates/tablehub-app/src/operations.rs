// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::Serialize;
use thiserror::Error;

use crate::{CellValue, GridSource, ViewId, ViewState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterCriterion {
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Request body posted to the current view's operation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "operation_type")]
pub enum OperationRequest {
    #[serde(rename = "sa")]
    SortAscending { params: String },
    #[serde(rename = "sd")]
    SortDescending { params: String },
    #[serde(rename = "fil")]
    Filter {
        filters: Vec<(String, CellValue)>,
        columns_to_return: Vec<String>,
        criterion: FilterCriterion,
    },
    #[serde(rename = "f")]
    Frequency { cols: Vec<String> },
    #[serde(rename = "pivot")]
    Pivot {
        key_cols: Vec<String>,
        pivot_col: String,
        agg_col: String,
    },
    #[serde(rename = "fac")]
    Facet { facets: Vec<(String, CellValue)> },
    #[serde(rename = "search")]
    Search {
        col: String,
        regex: String,
        columns_to_return: Vec<String>,
    },
    #[serde(rename = "open")]
    Open { rowid: usize },
}

impl OperationRequest {
    pub const fn opcode(&self) -> &'static str {
        match self {
            Self::SortAscending { .. } => "sa",
            Self::SortDescending { .. } => "sd",
            Self::Filter { .. } => "fil",
            Self::Frequency { .. } => "f",
            Self::Pivot { .. } => "pivot",
            Self::Facet { .. } => "fac",
            Self::Search { .. } => "search",
            Self::Open { .. } => "open",
        }
    }

    /// Sorts move to a new location without being a new logical view, so
    /// the cursor state travels with them through the handoff slot.
    pub const fn carries_view_state(&self) -> bool {
        matches!(
            self,
            Self::SortAscending { .. } | Self::SortDescending { .. }
        )
    }
}

/// Server answer to a successful operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationResponse {
    pub new_view: Option<ViewId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    /// HTTP 400; `detail` is shown to the user verbatim.
    #[error("{detail}")]
    Rejected { detail: String },
    #[error("cannot reach the view server: {0}")]
    Transport(String),
    /// Any other non-success status.
    #[error("view server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("unexpected response from the view server: {0}")]
    MalformedResponse(String),
}

/// Local checks that abort an operation before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    #[error("pick some values or columns to filter on")]
    NothingToFilter,
    #[error("pick key columns to count")]
    NoKeyColumns,
    #[error("pick a column to aggregate on")]
    NoAggregateColumn,
    #[error("this view has no key columns to facet on")]
    NoFacetKeys,
    #[error("this view has no rows")]
    NoRows,
    #[error("column {0} is not part of this view")]
    UnknownColumn(usize),
}

pub fn sort(
    state: &ViewState,
    grid: &impl GridSource,
    direction: SortDirection,
) -> Result<OperationRequest, PreconditionError> {
    let params = column_name(grid, state.cursor.col)?;
    Ok(match direction {
        SortDirection::Ascending => OperationRequest::SortAscending { params },
        SortDirection::Descending => OperationRequest::SortDescending { params },
    })
}

pub fn filter(
    state: &ViewState,
    grid: &impl GridSource,
) -> Result<OperationRequest, PreconditionError> {
    let mut filters = Vec::new();
    for (col, values) in &state.filters {
        let name = column_name(grid, *col)?;
        filters.extend(values.iter().map(|value| (name.clone(), value.clone())));
    }
    if filters.is_empty() && state.hidden_columns.is_empty() {
        return Err(PreconditionError::NothingToFilter);
    }
    Ok(OperationRequest::Filter {
        filters,
        columns_to_return: state.visible_column_names(grid),
        criterion: FilterCriterion::Any,
    })
}

pub fn frequency(
    state: &ViewState,
    grid: &impl GridSource,
) -> Result<OperationRequest, PreconditionError> {
    Ok(OperationRequest::Frequency {
        cols: vec![column_name(grid, state.cursor.col)?],
    })
}

pub fn multi_frequency(
    state: &ViewState,
    grid: &impl GridSource,
) -> Result<OperationRequest, PreconditionError> {
    if state.key_columns.is_empty() {
        return Err(PreconditionError::NoKeyColumns);
    }
    Ok(OperationRequest::Frequency {
        cols: column_names(grid, &state.key_columns)?,
    })
}

pub fn pivot(
    state: &ViewState,
    grid: &impl GridSource,
) -> Result<OperationRequest, PreconditionError> {
    let agg_col = state
        .aggregate_column
        .ok_or(PreconditionError::NoAggregateColumn)?;
    Ok(OperationRequest::Pivot {
        key_cols: column_names(grid, &state.key_columns)?,
        pivot_col: column_name(grid, state.cursor.col)?,
        agg_col: column_name(grid, agg_col)?,
    })
}

/// Drill down from a grouped view: one `[name, value]` pair per key column,
/// taken from the cursor row.
pub fn facet(
    state: &ViewState,
    grid: &impl GridSource,
    key_columns: &[usize],
) -> Result<OperationRequest, PreconditionError> {
    if key_columns.is_empty() {
        return Err(PreconditionError::NoFacetKeys);
    }
    if grid.num_rows() == 0 {
        return Err(PreconditionError::NoRows);
    }
    let row = state.cursor.row;
    let facets = key_columns
        .iter()
        .map(|col| {
            let name = column_name(grid, *col)?;
            let value = grid
                .cell_value(row, *col)
                .cloned()
                .unwrap_or(CellValue::Null);
            Ok((name, value))
        })
        .collect::<Result<Vec<_>, PreconditionError>>()?;
    Ok(OperationRequest::Facet { facets })
}

pub fn search(
    state: &ViewState,
    grid: &impl GridSource,
) -> Result<OperationRequest, PreconditionError> {
    Ok(OperationRequest::Search {
        col: column_name(grid, state.cursor.col)?,
        regex: state.search.pattern().to_owned(),
        columns_to_return: state.visible_column_names(grid),
    })
}

pub fn open(
    state: &ViewState,
    grid: &impl GridSource,
) -> Result<OperationRequest, PreconditionError> {
    if grid.num_rows() == 0 {
        return Err(PreconditionError::NoRows);
    }
    Ok(OperationRequest::Open {
        rowid: state.cursor.row,
    })
}

fn column_name(grid: &impl GridSource, col: usize) -> Result<String, PreconditionError> {
    grid.column_name(col)
        .map(str::to_owned)
        .ok_or(PreconditionError::UnknownColumn(col))
}

fn column_names(
    grid: &impl GridSource,
    cols: &[usize],
) -> Result<Vec<String>, PreconditionError> {
    cols.iter().map(|col| column_name(grid, *col)).collect()
}
