// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tablehub_app::{CellValue, GridData, LoadedView, ViewId, ViewKind};

const FIRST_NAMES: [&str; 16] = [
    "Avery", "Jordan", "Taylor", "Riley", "Morgan", "Casey", "Alex", "Quinn", "Parker", "Drew",
    "Kai", "Elliot", "Robin", "Cameron", "Hayden", "Rowan",
];

const CITIES: [&str; 8] = [
    "Austin", "Seattle", "Denver", "Madison", "Portland", "Raleigh", "Tucson", "Boise",
];

const TEAMS: [&str; 5] = ["Platform", "Billing", "Search", "Support", "Growth"];

const TABLE_NAMES: [&str; 6] = [
    "people",
    "orders",
    "invoices",
    "shipments",
    "tickets",
    "inventory",
];

pub const PEOPLE_COLUMNS: [&str; 5] = ["name", "age", "city", "team", "notes"];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Seeded generator for grids that look like something a view server
/// would return. Same seed, same rows.
#[derive(Debug, Clone)]
pub struct GridFaker {
    rng: DeterministicRng,
}

impl GridFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    /// `rows` people with a nullable city and a multi-line notes column.
    pub fn people(&mut self, rows: usize) -> GridData {
        let rows = (0..rows)
            .map(|index| {
                let city = if self.int_n(6) == 0 {
                    CellValue::Null
                } else {
                    CellValue::text(self.pick(&CITIES))
                };
                vec![
                    CellValue::text(format!("{} {index}", self.pick(&FIRST_NAMES))),
                    CellValue::text((21 + self.int_n(45)).to_string()),
                    city,
                    CellValue::text(self.pick(&TEAMS)),
                    CellValue::text(format!("line one\nline {}", self.int_n(100))),
                ]
            })
            .collect();
        GridData::new(owned(&PEOPLE_COLUMNS), rows)
    }

    /// Count table grouped by `key_columns`, the shape an `f` operation yields.
    pub fn frequency(&mut self, key_columns: &[&str], groups: usize) -> GridData {
        let mut columns = owned(key_columns);
        columns.push("count".to_owned());
        let rows = (0..groups)
            .map(|group| {
                let mut cells: Vec<CellValue> = key_columns
                    .iter()
                    .map(|name| CellValue::text(format!("{name}-{group}")))
                    .collect();
                cells.push(CellValue::text((1 + self.int_n(50)).to_string()));
                cells
            })
            .collect();
        GridData::new(columns, rows)
    }

    pub fn catalog(&mut self) -> GridData {
        let rows = TABLE_NAMES
            .iter()
            .map(|name| {
                vec![
                    CellValue::text(*name),
                    CellValue::text((10 + self.int_n(5000)).to_string()),
                ]
            })
            .collect();
        GridData::new(owned(&["table", "rows"]), rows)
    }

    fn pick<'a>(&mut self, values: &'a [&'a str]) -> &'a str {
        values[self.int_n(values.len())]
    }
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| (*name).to_owned()).collect()
}

/// A small fixed grid every test can reason about by hand:
///
/// | name | dept | city  |
/// |------|------|-------|
/// | ann  | X    | Oslo  |
/// | bo   | Y    | null  |
/// | cy   | X    | Lima  |
pub fn sample_grid() -> GridData {
    let text = CellValue::text;
    GridData::new(
        owned(&["name", "dept", "city"]),
        vec![
            vec![text("ann"), text("X"), text("Oslo")],
            vec![text("bo"), text("Y"), CellValue::Null],
            vec![text("cy"), text("X"), text("Lima")],
        ],
    )
}

pub fn base_view(id: &str, grid: GridData) -> LoadedView {
    LoadedView {
        id: ViewId::new(id),
        kind: ViewKind::Base,
        grid,
        wrapped_columns: BTreeSet::new(),
    }
}

pub fn frequency_view(id: &str, grid: GridData, key_columns: Vec<usize>) -> LoadedView {
    LoadedView {
        id: ViewId::new(id),
        kind: ViewKind::Frequency { key_columns },
        grid,
        wrapped_columns: BTreeSet::new(),
    }
}

pub fn catalog_view(id: &str, grid: GridData) -> LoadedView {
    LoadedView {
        id: ViewId::new(id),
        kind: ViewKind::Catalog,
        grid,
        wrapped_columns: BTreeSet::new(),
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("session.db");
    Ok((dir, path))
}
