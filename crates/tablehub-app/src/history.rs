// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::ViewId;

/// Back/forward stack of visited views.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    entries: Vec<ViewId>,
    position: usize,
}

impl History {
    pub fn new(start: ViewId) -> Self {
        Self {
            entries: vec![start],
            position: 0,
        }
    }

    pub fn current(&self) -> Option<&ViewId> {
        self.entries.get(self.position)
    }

    /// Records a navigation; anything ahead of the current entry is dropped.
    pub fn visit(&mut self, view: ViewId) {
        if self.entries.is_empty() {
            self.entries.push(view);
            self.position = 0;
            return;
        }
        self.entries.truncate(self.position + 1);
        self.entries.push(view);
        self.position = self.entries.len() - 1;
    }

    pub fn back(&mut self) -> Option<&ViewId> {
        if self.position == 0 {
            return None;
        }
        self.position -= 1;
        self.entries.get(self.position)
    }

    pub fn forward(&mut self) -> Option<&ViewId> {
        if self.position + 1 >= self.entries.len() {
            return None;
        }
        self.position += 1;
        self.entries.get(self.position)
    }
}
