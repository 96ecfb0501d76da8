// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a server-side view, as handed out in `new_sheet` /
/// `new_table` response fields.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewId(String);

impl ViewId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Logical location of the view relative to the server origin.
    pub fn path(&self) -> ViewPath {
        ViewPath(format!("/{}", self.0))
    }
}

impl From<&str> for ViewId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path-shaped key under which a view's snapshot is persisted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewPath(String);

impl ViewPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn view_id(&self) -> ViewId {
        ViewId(self.0.trim_start_matches('/').to_owned())
    }
}

impl fmt::Display for ViewPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server route family. The sheet-oriented server answers under `/sheets/`
/// with `new_sheet`, the table-oriented one under `/tables/` with `new_table`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    #[default]
    Sheets,
    Tables,
}

impl Endpoint {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sheets => "sheets",
            Self::Tables => "tables",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sheets" => Some(Self::Sheets),
            "tables" => Some(Self::Tables),
            _ => None,
        }
    }

    pub fn route(self, view: &ViewId) -> String {
        format!("/{}/{}", self.as_str(), view.as_str())
    }
}
