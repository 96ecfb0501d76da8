// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::{ViewPath, ViewSnapshot};

pub const DEFAULT_PERSIST_DEBOUNCE: Duration = Duration::from_millis(250);

/// Trailing-edge debounce: a burst of `touch` calls yields one `poll` hit
/// once the window has passed without further touches.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last_touch: Option<Instant>,
}

impl Debouncer {
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            last_touch: None,
        }
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_touch = Some(now);
    }

    pub fn poll(&mut self, now: Instant) -> bool {
        match self.last_touch {
            Some(last) if now.saturating_duration_since(last) >= self.window => {
                self.last_touch = None;
                true
            }
            _ => false,
        }
    }

    /// Fires immediately if anything is pending.
    pub fn flush(&mut self) -> bool {
        self.last_touch.take().is_some()
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_PERSIST_DEBOUNCE)
    }
}

/// One-shot slot: whatever is put is taken at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandoffSlot {
    slot: Option<ViewSnapshot>,
}

impl HandoffSlot {
    pub fn put(&mut self, snapshot: ViewSnapshot) {
        self.slot = Some(snapshot);
    }

    pub fn take_if_present(&mut self) -> Option<ViewSnapshot> {
        self.slot.take()
    }

    pub const fn is_occupied(&self) -> bool {
        self.slot.is_some()
    }
}

/// Client-local snapshot storage keyed by view path, plus the handoff slot.
pub trait SnapshotStore {
    fn load_snapshot(&self, path: &ViewPath) -> Result<Option<ViewSnapshot>>;
    fn save_snapshot(&mut self, path: &ViewPath, snapshot: &ViewSnapshot) -> Result<()>;
    fn put_handoff(&mut self, snapshot: &ViewSnapshot) -> Result<()>;
    fn take_handoff(&mut self) -> Result<Option<ViewSnapshot>>;
}

/// Which saved state a freshly loaded view starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restore {
    /// State carried over by the operation that produced the view, else the
    /// path-keyed snapshot.
    Handoff,
    /// Path-keyed snapshot only.
    Saved,
}

/// Snapshot for a freshly loaded view. A pending handoff is consumed on
/// every load, before anything else is read, and only `Restore::Handoff`
/// applies it.
pub fn restore_snapshot(
    store: &mut impl SnapshotStore,
    path: &ViewPath,
    restore: Restore,
) -> Result<Option<ViewSnapshot>> {
    match (restore, store.take_handoff()?) {
        (Restore::Handoff, Some(handoff)) => {
            tracing::debug!(%path, "restoring view state from handoff");
            return Ok(Some(handoff));
        }
        (Restore::Saved, Some(_)) => {
            tracing::debug!(%path, "discarding view state handoff");
        }
        (_, None) => {}
    }
    store.load_snapshot(path)
}

#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    snapshots: BTreeMap<ViewPath, ViewSnapshot>,
    handoff: HandoffSlot,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn has_handoff(&self) -> bool {
        self.handoff.is_occupied()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load_snapshot(&self, path: &ViewPath) -> Result<Option<ViewSnapshot>> {
        Ok(self.snapshots.get(path).cloned())
    }

    fn save_snapshot(&mut self, path: &ViewPath, snapshot: &ViewSnapshot) -> Result<()> {
        self.snapshots.insert(path.clone(), snapshot.clone());
        Ok(())
    }

    fn put_handoff(&mut self, snapshot: &ViewSnapshot) -> Result<()> {
        self.handoff.put(snapshot.clone());
        Ok(())
    }

    fn take_handoff(&mut self) -> Result<Option<ViewSnapshot>> {
        Ok(self.handoff.take_if_present())
    }
}
