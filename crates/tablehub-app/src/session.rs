// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use std::time::{Duration, Instant};

use crate::keymap::{KeyInput, KeyResolution, resolve_key};
use crate::operations::{
    self, OperationError, OperationRequest, OperationResponse, PreconditionError, SortDirection,
};
use crate::persistence::{Debouncer, Restore, SnapshotStore, restore_snapshot};
use crate::{
    Command, GridData, LoadedView, Mode, ViewId, ViewKind, ViewPath, ViewSnapshot, ViewState,
};

pub const BUSY_NOTICE: &str = "an operation is already in progress";

/// Side effects the runtime must carry out, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    /// Store the snapshot in the one-shot handoff slot.
    WriteHandoff(ViewSnapshot),
    /// Drop whatever the handoff slot holds.
    ClearHandoff,
    SendOperation(OperationRequest),
    /// Blocking notice for the user.
    Notice(String),
    /// Load another view (a full transition, not a state merge).
    Navigate { view: ViewId, restore: Restore },
    HistoryBack,
    HistoryForward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    SearchInput,
    Elsewhere,
}

/// Controller for one loaded view. Owns the view state and the in-flight
/// flag; rebuilt from scratch whenever a new view loads.
#[derive(Debug, Clone)]
pub struct ViewSession {
    view: LoadedView,
    state: ViewState,
    loading: bool,
    /// The in-flight request wrote a handoff.
    carrying_state: bool,
    persistence: Debouncer,
}

impl ViewSession {
    pub fn new(view: LoadedView, persist_debounce: Duration) -> Self {
        let state = ViewState::new(
            view.grid.rows.len(),
            view.grid.columns.len(),
            &view.wrapped_columns,
        );
        Self {
            view,
            state,
            loading: false,
            carrying_state: false,
            persistence: Debouncer::new(persist_debounce),
        }
    }

    /// Builds a session and restores whatever the store holds for it.
    pub fn load(
        view: LoadedView,
        persist_debounce: Duration,
        store: &mut impl SnapshotStore,
        restore: Restore,
    ) -> Result<Self> {
        let mut session = Self::new(view, persist_debounce);
        if let Some(snapshot) = restore_snapshot(store, &session.path(), restore)? {
            session.state.apply_snapshot(&snapshot);
        }
        tracing::info!(view = %session.view.id, kind = session.view.kind.label(), "view loaded");
        Ok(session)
    }

    pub fn view_id(&self) -> &ViewId {
        &self.view.id
    }

    pub fn path(&self) -> ViewPath {
        self.view.id.path()
    }

    pub fn kind(&self) -> &ViewKind {
        &self.view.kind
    }

    pub fn grid(&self) -> &GridData {
        &self.view.grid
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        self.state.snapshot()
    }

    /// Row highlighting: search matches while searching, filters otherwise.
    pub fn is_row_dimmed(&self, row: usize) -> bool {
        match self.state.mode() {
            Mode::Searching => !self.state.is_search_match(&self.view.grid, row),
            Mode::Normal => self.state.is_row_filtered(&self.view.grid, row),
        }
    }

    pub fn handle_key(&mut self, input: KeyInput, now: Instant) -> Vec<SessionEffect> {
        self.persistence.touch(now);
        match resolve_key(self.state.mode(), input) {
            KeyResolution::Command(command) => self.dispatch(command),
            KeyResolution::Swallowed | KeyResolution::Unbound => Vec::new(),
        }
    }

    pub fn handle_click(&mut self, target: ClickTarget, now: Instant) {
        self.persistence.touch(now);
        if target == ClickTarget::Elsewhere && self.state.search.exit() {
            tracing::debug!("search dismissed by outside click");
        }
    }

    pub fn handle_hover(&mut self, row: usize, col: usize, now: Instant) {
        self.persistence.touch(now);
        self.state.hover_cell(row, col);
    }

    pub fn dispatch(&mut self, command: Command) -> Vec<SessionEffect> {
        tracing::debug!(?command, "dispatch");
        match command {
            Command::MoveRow(delta) => self.state.move_row(delta),
            Command::MoveColumn(delta) => self.state.move_col(delta),
            Command::JumpFirstRow => self.state.jump_row_to_first(),
            Command::JumpLastRow => self.state.jump_row_to_last(),
            Command::ToggleKeyColumn => {
                let col = self.state.cursor.col;
                self.state.toggle_key_column(col);
            }
            Command::ToggleAggregateColumn => {
                let col = self.state.cursor.col;
                self.state.toggle_aggregate_column(col);
            }
            Command::ToggleFilterValue => {
                self.state.toggle_filter_value(&self.view.grid);
            }
            Command::ToggleHiddenColumn => {
                self.state.toggle_hidden_column();
            }
            Command::ToggleDisplayMode => {
                self.state.toggle_column_display_mode();
            }
            Command::SortAscending => {
                return self.run(|state, grid| {
                    operations::sort(state, grid, SortDirection::Ascending)
                });
            }
            Command::SortDescending => {
                return self.run(|state, grid| {
                    operations::sort(state, grid, SortDirection::Descending)
                });
            }
            Command::RunFilter => {
                return self.run(|state, grid| operations::filter(state, grid));
            }
            Command::RunFrequency => {
                return self.run(|state, grid| operations::frequency(state, grid));
            }
            Command::RunMultiFrequency => {
                return self.run(|state, grid| operations::multi_frequency(state, grid));
            }
            Command::RunPivot => {
                return self.run(|state, grid| operations::pivot(state, grid));
            }
            Command::EnterSearch => {
                if !self.loading {
                    self.state.search.enter();
                }
            }
            Command::ExitSearch => {
                self.state.search.exit();
            }
            Command::SearchInsert(ch) => self.state.search.insert(ch),
            Command::SearchBackspace => self.state.search.backspace(),
            Command::Confirm => return self.confirm(),
            Command::NavigateBack | Command::NavigateForward if self.loading => {
                tracing::debug!(?command, "history move ignored while loading");
            }
            Command::NavigateBack => return vec![SessionEffect::HistoryBack],
            Command::NavigateForward => return vec![SessionEffect::HistoryForward],
        }
        Vec::new()
    }

    /// Enter: regex search while searching, facet in a grouped view, open
    /// the row otherwise.
    fn confirm(&mut self) -> Vec<SessionEffect> {
        if self.loading {
            return Vec::new();
        }
        if self.state.mode() == Mode::Searching {
            return self.run(|state, grid| operations::search(state, grid));
        }
        match &self.view.kind {
            ViewKind::Frequency { key_columns } => {
                let key_columns = key_columns.clone();
                self.run(|state, grid| operations::facet(state, grid, &key_columns))
            }
            ViewKind::Base | ViewKind::Catalog => {
                self.run(|state, grid| operations::open(state, grid))
            }
        }
    }

    fn run<F>(&mut self, build: F) -> Vec<SessionEffect>
    where
        F: FnOnce(&ViewState, &GridData) -> Result<OperationRequest, PreconditionError>,
    {
        if self.loading {
            return vec![SessionEffect::Notice(BUSY_NOTICE.to_owned())];
        }
        match build(&self.state, &self.view.grid) {
            Ok(request) => self.perform_operation(request),
            Err(error) => {
                tracing::debug!(%error, "operation precondition failed");
                vec![SessionEffect::Notice(error.to_string())]
            }
        }
    }

    /// Starts a round-trip. Refused while another one is outstanding.
    pub fn perform_operation(&mut self, request: OperationRequest) -> Vec<SessionEffect> {
        if self.loading {
            tracing::warn!(opcode = request.opcode(), "dispatch refused while loading");
            return vec![SessionEffect::Notice(BUSY_NOTICE.to_owned())];
        }
        self.loading = true;
        self.carrying_state = request.carries_view_state();
        self.state.search.exit();

        let mut effects = Vec::with_capacity(2);
        if request.carries_view_state() {
            effects.push(SessionEffect::WriteHandoff(self.state.snapshot()));
        }
        tracing::debug!(view = %self.view.id, opcode = request.opcode(), "sending operation");
        effects.push(SessionEffect::SendOperation(request));
        effects
    }

    /// Resumes after the round-trip. Always clears the in-flight flag.
    pub fn complete_operation(
        &mut self,
        result: Result<OperationResponse, OperationError>,
    ) -> Vec<SessionEffect> {
        if !self.loading {
            tracing::warn!("operation result arrived with nothing in flight");
        }
        self.loading = false;
        let carried = std::mem::take(&mut self.carrying_state);
        let mut effects = Vec::with_capacity(2);
        match result {
            Ok(OperationResponse {
                new_view: Some(view),
            }) => {
                tracing::info!(from = %self.view.id, to = %view, "operation produced a new view");
                let restore = if carried {
                    Restore::Handoff
                } else {
                    Restore::Saved
                };
                return vec![SessionEffect::Navigate { view, restore }];
            }
            Ok(OperationResponse { new_view: None }) => {}
            Err(error) => {
                tracing::warn!(%error, "operation failed");
                effects.push(SessionEffect::Notice(error.to_string()));
            }
        }
        // Nothing will load the carried state; it must not leak into the
        // next unrelated view.
        if carried {
            effects.insert(0, SessionEffect::ClearHandoff);
        }
        effects
    }

    /// Snapshot to persist once input has settled.
    pub fn poll_persistence(&mut self, now: Instant) -> Option<ViewSnapshot> {
        self.persistence.poll(now).then(|| self.state.snapshot())
    }

    /// Pending snapshot, written right away (used before leaving the view).
    pub fn flush_persistence(&mut self) -> Option<ViewSnapshot> {
        self.persistence.flush().then(|| self.state.snapshot())
    }
}
