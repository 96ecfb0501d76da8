// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use regex::Regex;

use crate::{GridSource, ViewState};

/// Live regex search. All per-column inputs share this one pattern.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    active: bool,
    pattern: String,
    matcher: Option<Regex>,
}

impl PartialEq for SearchState {
    fn eq(&self, other: &Self) -> bool {
        self.active == other.active && self.pattern == other.pattern
    }
}

impl Eq for SearchState {}

impl SearchState {
    pub const fn is_active(&self) -> bool {
        self.active
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns `true` when this call switched the mode on. The activation
    /// character is never inserted into the pattern.
    pub fn enter(&mut self) -> bool {
        if self.active {
            return false;
        }
        self.active = true;
        self.set_pattern(String::new());
        true
    }

    /// Leaves search mode and clears the pattern.
    pub fn exit(&mut self) -> bool {
        let was_active = self.active;
        self.active = false;
        self.set_pattern(String::new());
        was_active
    }

    pub fn insert(&mut self, ch: char) {
        if !self.active {
            return;
        }
        let mut pattern = std::mem::take(&mut self.pattern);
        pattern.push(ch);
        self.set_pattern(pattern);
    }

    pub fn backspace(&mut self) {
        if !self.active {
            return;
        }
        let mut pattern = std::mem::take(&mut self.pattern);
        pattern.pop();
        self.set_pattern(pattern);
    }

    /// Whether the pattern currently compiles; drives the input's error
    /// indicator.
    pub fn pattern_is_valid(&self) -> bool {
        self.matcher.is_some()
    }

    /// Fail-closed: an invalid pattern matches nothing.
    pub fn matches(&self, text: &str) -> bool {
        self.matcher
            .as_ref()
            .is_some_and(|matcher| matcher.is_match(text))
    }

    fn set_pattern(&mut self, pattern: String) {
        self.matcher = Regex::new(&pattern).ok();
        self.pattern = pattern;
    }
}

impl ViewState {
    /// Whether the cursor column's cell in `row` matches the live pattern.
    /// Null and absent cells never match.
    pub fn is_search_match(&self, grid: &impl GridSource, row: usize) -> bool {
        grid.cell_value(row, self.cursor.col)
            .and_then(|value| value.as_text())
            .is_some_and(|text| self.search.matches(text))
    }
}
