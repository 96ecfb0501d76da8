// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::ids::ViewId;

/// A single cell as the client sees it. `Null` is distinct from an empty
/// string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum CellValue {
    Null,
    Text(String),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Null => None,
            Self::Text(text) => Some(text),
        }
    }
}

impl From<Option<String>> for CellValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Null, Self::Text)
    }
}

impl From<CellValue> for Option<String> {
    fn from(value: CellValue) -> Self {
        match value {
            CellValue::Null => None,
            CellValue::Text(text) => Some(text),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NaN"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub row: usize,
    pub col: usize,
}

/// How a column renders multi-line content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnDisplayMode {
    #[default]
    Default,
    Wrap,
    Clip,
}

impl ColumnDisplayMode {
    /// Clip, then wrap, then default, then clip again.
    pub const fn next(self) -> Self {
        match self {
            Self::Clip => Self::Wrap,
            Self::Wrap => Self::Default,
            Self::Default => Self::Clip,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Wrap => "wrap",
            Self::Clip => "clip",
        }
    }
}

/// What kind of view the server handed back; decides what confirm does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ViewKind {
    #[default]
    Base,
    /// Grouped view. Facets are built from these server-chosen key columns.
    Frequency { key_columns: Vec<usize> },
    /// A listing of tables; confirm opens the row under the cursor.
    Catalog,
}

impl ViewKind {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Frequency { .. } => "frequency",
            Self::Catalog => "catalog",
        }
    }
}

/// Narrow read-only accessor over the rendered grid.
pub trait GridSource {
    fn num_rows(&self) -> usize;
    fn num_cols(&self) -> usize;
    fn column_name(&self, col: usize) -> Option<&str>;
    /// `None` when the row has no cell at `col`.
    fn cell_value(&self, row: usize, col: usize) -> Option<&CellValue>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridData {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl GridData {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { columns, rows }
    }
}

impl GridSource for GridData {
    fn num_rows(&self) -> usize {
        self.rows.len()
    }

    fn num_cols(&self) -> usize {
        self.columns.len()
    }

    fn column_name(&self, col: usize) -> Option<&str> {
        self.columns.get(col).map(String::as_str)
    }

    fn cell_value(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|cells| cells.get(col))
    }
}

/// Everything the client receives when a view is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedView {
    pub id: ViewId,
    pub kind: ViewKind,
    pub grid: GridData,
    /// Columns that start out wrapped.
    pub wrapped_columns: BTreeSet<usize>,
}

/// Cursor and visibility state persisted across navigations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSnapshot {
    pub row: usize,
    pub col: usize,
    #[serde(default)]
    pub hidden_columns: BTreeSet<usize>,
    #[serde(default)]
    pub column_display_mode: BTreeMap<usize, ColumnDisplayMode>,
}

impl ViewSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::{CellValue, ColumnDisplayMode, GridData, GridSource, ViewSnapshot};
    use std::collections::{BTreeMap, BTreeSet};

    #[test]
    fn display_mode_cycles_clip_wrap_default() {
        let mut mode = ColumnDisplayMode::Clip;
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(mode);
            mode = mode.next();
        }
        assert_eq!(
            seen,
            vec![
                ColumnDisplayMode::Clip,
                ColumnDisplayMode::Wrap,
                ColumnDisplayMode::Default,
                ColumnDisplayMode::Clip,
            ]
        );
    }

    #[test]
    fn cell_value_serializes_null_as_json_null() -> serde_json::Result<()> {
        let pair = ("city".to_owned(), CellValue::Null);
        assert_eq!(serde_json::to_string(&pair)?, r#"["city",null]"#);
        let parsed: Vec<CellValue> = serde_json::from_str(r#"[null,"x"]"#)?;
        assert_eq!(parsed, vec![CellValue::Null, CellValue::text("x")]);
        Ok(())
    }

    #[test]
    fn snapshot_uses_camel_case_keys() -> serde_json::Result<()> {
        let snapshot = ViewSnapshot {
            row: 3,
            col: 1,
            hidden_columns: BTreeSet::from([2]),
            column_display_mode: BTreeMap::from([(0, ColumnDisplayMode::Wrap)]),
        };
        let raw = snapshot.to_json()?;
        assert!(raw.contains("\"hiddenColumns\":[2]"));
        assert!(raw.contains("\"columnDisplayMode\":{\"0\":\"wrap\"}"));
        assert_eq!(ViewSnapshot::from_json(&raw)?, snapshot);
        Ok(())
    }

    #[test]
    fn snapshot_tolerates_missing_optional_fields() -> serde_json::Result<()> {
        let snapshot = ViewSnapshot::from_json(r#"{"row":1,"col":0}"#)?;
        assert!(snapshot.hidden_columns.is_empty());
        assert!(snapshot.column_display_mode.is_empty());
        Ok(())
    }

    #[test]
    fn grid_reports_absent_cells() {
        let grid = GridData::new(
            vec!["a".to_owned(), "b".to_owned()],
            vec![vec![CellValue::text("1")]],
        );
        assert_eq!(grid.cell_value(0, 0), Some(&CellValue::text("1")));
        assert_eq!(grid.cell_value(0, 1), None);
        assert_eq!(grid.column_name(2), None);
    }
}
