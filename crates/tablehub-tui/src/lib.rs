// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tablehub_app::{
    CellValue, ClickTarget, ColumnDisplayMode, GridSource, HELP_BINDINGS, History, Key, KeyInput,
    LoadedView, Mode, Modifiers, OperationError, OperationRequest, OperationResponse, Restore,
    SessionEffect, SnapshotStore, ViewId, ViewKind, ViewSession,
};

const DEFAULT_MAX_WIDTH: usize = 32;
const CLIP_WIDTH: usize = 8;
const WRAP_WIDTH: usize = 24;
const MAX_WRAP_LINES: usize = 4;
const MIN_COLUMN_WIDTH: usize = 3;
const ELLIPSIS: char = '…';
const FILTER_MARK: &str = "▼";
const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);

/// Everything the terminal front end needs from the outside world. The
/// runtime doubles as the snapshot store so a freshly loaded view can be
/// restored from it directly.
pub trait AppRuntime: SnapshotStore {
    fn load_view(&mut self, view: &ViewId) -> Result<LoadedView>;

    fn perform_operation(
        &mut self,
        view: &ViewId,
        request: &OperationRequest,
    ) -> Result<OperationResponse, OperationError>;

    /// Starts a round-trip and reports back through `tx`. Runtimes that own a
    /// thread-safe client should override this to run off the UI thread.
    fn spawn_operation(
        &mut self,
        request_id: u64,
        view: ViewId,
        request: OperationRequest,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let result = self.perform_operation(&view, &request);
        tx.send(InternalEvent::OperationFinished { request_id, result })
            .map_err(|_| anyhow::anyhow!("operation event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    OperationFinished {
        request_id: u64,
        result: Result<OperationResponse, OperationError>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ColumnSpan {
    col: usize,
    x: u16,
    width: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RowSpan {
    row: usize,
    y: u16,
    height: u16,
}

/// Where things landed on the last frame; mouse events are resolved against
/// it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ScreenGeometry {
    search: Option<Rect>,
    columns: Vec<ColumnSpan>,
    rows: Vec<RowSpan>,
}

/// Front-end state around the current view session.
#[derive(Debug)]
pub struct App {
    session: Option<ViewSession>,
    history: History,
    persist_debounce: Duration,
    status_line: Option<String>,
    status_token: u64,
    notice: Option<String>,
    help_visible: bool,
    in_flight: Option<u64>,
    next_request_id: u64,
    first_row: usize,
    first_column: usize,
    /// Widest rendering of each column in the loaded grid, measured once.
    natural_widths: Vec<usize>,
    geometry: ScreenGeometry,
}

impl App {
    pub fn new(start: ViewId, persist_debounce: Duration) -> Self {
        Self {
            session: None,
            history: History::new(start),
            persist_debounce,
            status_line: None,
            status_token: 0,
            notice: None,
            help_visible: false,
            in_flight: None,
            next_request_id: 0,
            first_row: 0,
            first_column: 0,
            natural_widths: Vec::new(),
            geometry: ScreenGeometry::default(),
        }
    }

    pub fn session(&self) -> Option<&ViewSession> {
        self.session.as_ref()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn status_line(&self) -> Option<&str> {
        self.status_line.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub const fn help_visible(&self) -> bool {
        self.help_visible
    }
}

pub fn run_app<R: AppRuntime>(app: &mut App, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen, EnableMouseCapture)
        .context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    let (internal_tx, internal_rx) = mpsc::channel();

    if let Some(start) = app.history.current().cloned() {
        open_view(app, runtime, &internal_tx, &start, Restore::Saved);
    }

    let mut result = Ok(());
    loop {
        process_internal_events(app, runtime, &internal_tx, &internal_rx);
        persist_settled_state(app, runtime, &internal_tx, Instant::now());

        if let Err(error) = terminal.draw(|frame| render(frame, app)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(app, runtime, &internal_tx, key) {
                        break;
                    }
                }
                Event::Mouse(mouse) => handle_mouse_event(app, mouse),
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    flush_view_state(app, runtime);
    disable_raw_mode().context("disable raw mode")?;
    execute!(
        io::stdout(),
        DisableMouseCapture,
        terminal::LeaveAlternateScreen
    )
    .context("leave alternate screen")?;
    result
}

/// Maps a terminal key event onto the router's input. An uppercase letter
/// counts as shifted even when the terminal drops the modifier.
pub fn translate_key(key: KeyEvent) -> KeyInput {
    let translated = match key.code {
        KeyCode::Char(ch) => Key::Char(ch),
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Esc,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        _ => Key::Other,
    };
    let uppercase = matches!(translated, Key::Char(ch) if ch.is_uppercase());
    KeyInput {
        key: translated,
        modifiers: Modifiers {
            shift: key.modifiers.contains(KeyModifiers::SHIFT) || uppercase,
            control: key.modifiers.contains(KeyModifiers::CONTROL),
            alt: key.modifiers.contains(KeyModifiers::ALT),
        },
    }
}

fn process_internal_events<R: AppRuntime>(
    app: &mut App,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == app.status_token => {
                app.status_line = None;
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::OperationFinished { request_id, result } => {
                if app.in_flight != Some(request_id) {
                    tracing::debug!(request_id, "dropping result for a view that was left");
                    continue;
                }
                app.in_flight = None;
                let Some(session) = app.session.as_mut() else {
                    continue;
                };
                let effects = session.complete_operation(result);
                apply_effects(app, runtime, tx, effects);
            }
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(app: &mut App, internal_tx: &Sender<InternalEvent>, message: impl Into<String>) {
    app.status_line = Some(message.into());
    app.status_token = app.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, app.status_token);
}

fn handle_key_event<R: AppRuntime>(
    app: &mut App,
    runtime: &mut R,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.kind == KeyEventKind::Release {
        return false;
    }

    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if app.notice.take().is_some() {
        return false;
    }

    let mode = app
        .session
        .as_ref()
        .map_or(Mode::Normal, |session| session.state().mode());

    if app.help_visible {
        if key.code == KeyCode::Esc || key.code == KeyCode::Char('?') {
            app.help_visible = false;
        }
        return false;
    }

    if mode == Mode::Normal && key.code == KeyCode::Char('?') {
        app.help_visible = true;
        return false;
    }

    let Some(session) = app.session.as_mut() else {
        if key.code == KeyCode::Char('r') {
            if let Some(current) = app.history.current().cloned() {
                open_view(app, runtime, internal_tx, &current, Restore::Saved);
            }
        } else {
            emit_status(app, internal_tx, "no view loaded; press r to retry");
        }
        return false;
    };

    let effects = session.handle_key(translate_key(key), Instant::now());
    apply_effects(app, runtime, internal_tx, effects);
    false
}

fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
    let Some(session) = app.session.as_mut() else {
        return;
    };
    let now = Instant::now();
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            let on_search = app
                .geometry
                .search
                .is_some_and(|area| rect_contains(area, mouse.column, mouse.row));
            let target = if on_search {
                ClickTarget::SearchInput
            } else {
                ClickTarget::Elsewhere
            };
            session.handle_click(target, now);
            if let Some((row, col)) = cell_at(&app.geometry, mouse.column, mouse.row) {
                session.handle_hover(row, col, now);
            }
        }
        MouseEventKind::Moved => {
            if let Some((row, col)) = cell_at(&app.geometry, mouse.column, mouse.row) {
                session.handle_hover(row, col, now);
            }
        }
        _ => {}
    }
}

fn apply_effects<R: AppRuntime>(
    app: &mut App,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
    effects: Vec<SessionEffect>,
) {
    for effect in effects {
        match effect {
            SessionEffect::WriteHandoff(snapshot) => {
                if let Err(error) = runtime.put_handoff(&snapshot) {
                    tracing::warn!(error = %error, "write handoff failed");
                    emit_status(app, tx, format!("could not carry view state: {error}"));
                }
            }
            SessionEffect::ClearHandoff => discard_handoff(runtime),
            SessionEffect::SendOperation(request) => send_operation(app, runtime, tx, request),
            SessionEffect::Notice(message) => {
                app.notice = Some(message);
            }
            SessionEffect::Navigate { view, restore } => {
                app.history.visit(view.clone());
                open_view(app, runtime, tx, &view, restore);
            }
            SessionEffect::HistoryBack => match app.history.back().cloned() {
                Some(view) => open_view(app, runtime, tx, &view, Restore::Saved),
                None => emit_status(app, tx, "no earlier view"),
            },
            SessionEffect::HistoryForward => match app.history.forward().cloned() {
                Some(view) => open_view(app, runtime, tx, &view, Restore::Saved),
                None => emit_status(app, tx, "no later view"),
            },
        }
    }
}

fn send_operation<R: AppRuntime>(
    app: &mut App,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
    request: OperationRequest,
) {
    let Some(view) = app.session.as_ref().map(|session| session.view_id().clone()) else {
        return;
    };
    app.next_request_id = app.next_request_id.saturating_add(1);
    let request_id = app.next_request_id;
    app.in_flight = Some(request_id);

    if let Err(error) = runtime.spawn_operation(request_id, view, request, tx.clone()) {
        app.in_flight = None;
        if let Some(session) = app.session.as_mut() {
            let effects =
                session.complete_operation(Err(OperationError::Transport(error.to_string())));
            apply_effects(app, runtime, tx, effects);
        }
    }
}

fn discard_handoff<R: AppRuntime>(runtime: &mut R) {
    if let Err(error) = runtime.take_handoff() {
        tracing::warn!(error = %error, "clearing view state handoff failed");
    }
}

/// Replaces the current session with `view`. Pending state for the view
/// being left is written first so back navigation can restore it.
fn open_view<R: AppRuntime>(
    app: &mut App,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
    view: &ViewId,
    restore: Restore,
) {
    flush_view_state(app, runtime);
    let loaded = match runtime.load_view(view) {
        Ok(loaded) => ViewSession::load(loaded, app.persist_debounce, runtime, restore),
        Err(error) => {
            discard_handoff(runtime);
            Err(error)
        }
    };
    match loaded {
        Ok(session) => {
            app.natural_widths = natural_widths(session.grid());
            app.session = Some(session);
            app.in_flight = None;
            app.first_row = 0;
            app.first_column = 0;
            app.geometry = ScreenGeometry::default();
        }
        Err(error) => {
            tracing::warn!(view = %view, error = %error, "view load failed");
            app.session = None;
            app.in_flight = None;
            app.natural_widths.clear();
            emit_status(app, tx, format!("load failed: {error:#}"));
        }
    }
}

fn persist_settled_state<R: AppRuntime>(
    app: &mut App,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
    now: Instant,
) {
    let Some(session) = app.session.as_mut() else {
        return;
    };
    let Some(snapshot) = session.poll_persistence(now) else {
        return;
    };
    let path = session.path();
    if let Err(error) = runtime.save_snapshot(&path, &snapshot) {
        tracing::warn!(path = %path, error = %error, "saving view state failed");
        emit_status(app, tx, format!("could not save view state: {error}"));
    }
}

fn flush_view_state<R: AppRuntime>(app: &mut App, runtime: &mut R) {
    let Some(session) = app.session.as_mut() else {
        return;
    };
    let Some(snapshot) = session.flush_persistence() else {
        return;
    };
    let path = session.path();
    if let Err(error) = runtime.save_snapshot(&path, &snapshot) {
        tracing::warn!(path = %path, error = %error, "saving view state failed");
    }
}

fn rect_contains(area: Rect, column: u16, row: u16) -> bool {
    column >= area.x
        && column < area.x.saturating_add(area.width)
        && row >= area.y
        && row < area.y.saturating_add(area.height)
}

fn cell_at(geometry: &ScreenGeometry, column: u16, row: u16) -> Option<(usize, usize)> {
    let col = geometry
        .columns
        .iter()
        .find(|span| column >= span.x && column < span.x.saturating_add(span.width))?
        .col;
    let row = geometry
        .rows
        .iter()
        .find(|span| row >= span.y && row < span.y.saturating_add(span.height))?
        .row;
    Some((row, col))
}

fn render(frame: &mut ratatui::Frame<'_>, app: &mut App) {
    let searching = app
        .session
        .as_ref()
        .is_some_and(|session| session.state().mode() == Mode::Searching);
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(if searching { 3 } else { 0 }),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let header = Paragraph::new(header_text(app))
        .block(Block::default().title("tablehub").borders(Borders::ALL));
    frame.render_widget(header, layout[0]);

    render_grid(frame, layout[1], app);

    app.geometry.search = None;
    if searching && let Some(session) = app.session.as_ref() {
        let valid = session.state().search.pattern_is_valid();
        let column = session
            .grid()
            .column_name(session.state().cursor.col)
            .unwrap_or_default();
        let title = if valid {
            format!("search {column}")
        } else {
            format!("search {column} (invalid pattern)")
        };
        let border = if valid { Color::Cyan } else { Color::Red };
        let input = Paragraph::new(format!("{}_", session.state().search.pattern())).block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border)),
        );
        frame.render_widget(input, layout[2]);
        app.geometry.search = Some(layout[2]);
    }

    let status = Paragraph::new(status_text(app))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[3]);

    if app.help_visible {
        let area = centered_rect(60, 70, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }

    if let Some(notice) = &app.notice {
        let area = centered_rect(50, 20, frame.area());
        frame.render_widget(Clear, area);
        let popup = Paragraph::new(notice.as_str())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title("notice (any key)")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Magenta)),
            );
        frame.render_widget(popup, area);
    }
}

fn header_text(app: &App) -> String {
    let Some(session) = app.session.as_ref() else {
        return app
            .history
            .current()
            .map_or_else(String::new, |view| format!("{view} (not loaded)"));
    };
    let mut text = format!("{} [{}]", session.view_id(), session.kind().label());
    if let ViewKind::Frequency { key_columns } = session.kind() {
        let names: Vec<&str> = key_columns
            .iter()
            .filter_map(|col| session.grid().column_name(*col))
            .collect();
        text.push_str(&format!(" by {}", names.join(", ")));
    }
    if session.is_loading() {
        text.push_str(" | working…");
    }
    text
}

fn status_text(app: &App) -> String {
    let searching = app
        .session
        .as_ref()
        .is_some_and(|session| session.state().mode() == Mode::Searching);
    let (mode, hints) = if searching {
        ("SEARCH", "enter run | esc cancel")
    } else {
        (
            "NAV",
            "[ ] sort | \" filter | F/f freq | W pivot | | search | q/p back/fwd | ? help | ctrl+q quit",
        )
    };
    match &app.status_line {
        Some(status) => format!("{mode} | {status} | {hints}"),
        None => format!("{mode} | {hints}"),
    }
}

fn help_overlay_text() -> String {
    let mut lines: Vec<String> = HELP_BINDINGS
        .iter()
        .map(|binding| format!("{:<10} {}", binding.keys, binding.description))
        .collect();
    lines.push(format!("{:<10} {}", "?", "toggle this help"));
    lines.push(format!("{:<10} {}", "ctrl+q", "quit"));
    lines.join("\n")
}

fn render_grid(frame: &mut ratatui::Frame<'_>, area: Rect, app: &mut App) {
    app.geometry.columns.clear();
    app.geometry.rows.clear();
    let Some(session) = app.session.as_ref() else {
        let empty = Paragraph::new("no view loaded; press r to retry")
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(empty, area);
        return;
    };
    let state = session.state();
    let grid = session.grid();

    let inner_width = usize::from(area.width.saturating_sub(2));
    let inner_height = area.height.saturating_sub(3);

    let visible = state.visible_columns();
    let natural = |col: usize| {
        app.natural_widths
            .get(col)
            .copied()
            .unwrap_or(MIN_COLUMN_WIDTH)
    };
    let widths: Vec<usize> = visible
        .iter()
        .map(|col| column_width(natural(*col), state.display_mode(*col)))
        .collect();
    let cursor_index = visible.iter().position(|col| *col == state.cursor.col);
    let first_column = scroll_columns(app.first_column, cursor_index, &widths, inner_width);
    let shown = columns_that_fit(first_column, &widths, inner_width);

    let wrapped: Vec<(usize, usize)> = visible
        .iter()
        .filter(|col| state.display_mode(**col) == ColumnDisplayMode::Wrap)
        .map(|col| (*col, column_width(natural(*col), ColumnDisplayMode::Wrap)))
        .collect();
    let height_of = |row: usize| row_height(grid, row, &wrapped);
    let first_row = scroll_rows(
        app.first_row,
        state.cursor.row,
        grid.num_rows(),
        inner_height,
        &height_of,
    );

    let mut spans = Vec::with_capacity(shown);
    let mut x = area.x.saturating_add(1);
    for offset in 0..shown {
        let width = widths[first_column + offset];
        let width_u16 = u16::try_from(width).unwrap_or(u16::MAX);
        spans.push(ColumnSpan {
            col: visible[first_column + offset],
            x,
            width: width_u16,
        });
        x = x.saturating_add(width_u16).saturating_add(1);
    }

    let header = Row::new(spans.iter().map(|span| {
        Cell::from(header_label(session, span.col)).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));

    let mut rows = Vec::new();
    let mut row_spans = Vec::new();
    let mut y = area.y.saturating_add(2);
    let mut used = 0_u16;
    for row in first_row..grid.num_rows() {
        let height = height_of(row);
        if used.saturating_add(height) > inner_height && !rows.is_empty() {
            break;
        }
        row_spans.push(RowSpan { row, y, height });
        y = y.saturating_add(height);
        used = used.saturating_add(height);

        let dimmed = session.is_row_dimmed(row);
        let cursor_row = row == state.cursor.row;
        let cells = spans
            .iter()
            .map(|span| {
                let value = grid.cell_value(row, span.col);
                let text = value
                    .map(|value| {
                        cell_lines(value, state.display_mode(span.col), usize::from(span.width))
                            .join("\n")
                    })
                    .unwrap_or_default();
                Cell::from(text).style(cell_style(session, span.col, value, dimmed, cursor_row))
            })
            .collect::<Vec<_>>();
        rows.push(Row::new(cells).height(height));
    }

    let constraints: Vec<Constraint> = spans
        .iter()
        .map(|span| Constraint::Length(span.width))
        .collect();
    let table = Table::new(rows, constraints)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .title(grid_title(session))
                .borders(Borders::ALL),
        );
    frame.render_widget(table, area);

    app.first_row = first_row;
    app.first_column = first_column;
    app.geometry.columns = spans;
    app.geometry.rows = row_spans;
}

fn grid_title(session: &ViewSession) -> String {
    let state = session.state();
    let grid = session.grid();
    let mut parts = vec![format!(
        "r:{}/{} c:{}/{}",
        state.cursor.row.saturating_add(1).min(grid.num_rows()),
        grid.num_rows(),
        state.visible_columns().len(),
        grid.num_cols(),
    )];
    let filtered: usize = state.filters.values().map(|values| values.len()).sum();
    if filtered > 0 {
        parts.push(format!("{FILTER_MARK}{filtered}"));
    }
    parts.join(" ")
}

fn header_label(session: &ViewSession, col: usize) -> String {
    let state = session.state();
    let mut label = session
        .grid()
        .column_name(col)
        .unwrap_or_default()
        .to_owned();
    if let Some(position) = state.key_columns.iter().position(|key| *key == col) {
        label = format!("!{} {label}", position + 1);
    }
    if state.aggregate_column == Some(col) {
        label = format!("+ {label}");
    }
    if let Some(values) = state.filters.get(&col) {
        label.push_str(&format!(" {FILTER_MARK}{}", values.len()));
    }
    match state.display_mode(col) {
        ColumnDisplayMode::Default => {}
        ColumnDisplayMode::Wrap => label.push_str(" ↵"),
        ColumnDisplayMode::Clip => {
            label.push(' ');
            label.push(ELLIPSIS);
        }
    }
    label
}

fn cell_style(
    session: &ViewSession,
    col: usize,
    value: Option<&CellValue>,
    dimmed: bool,
    cursor_row: bool,
) -> Style {
    let state = session.state();
    let mut style = Style::default();
    if value.is_some_and(CellValue::is_null) {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if value.is_some_and(|value| state.is_filter_value(col, value)) {
        style = style.fg(Color::Yellow);
    }
    if dimmed {
        style = style.fg(Color::DarkGray);
    }
    if cursor_row {
        style = style.bg(Color::DarkGray);
    }
    if cursor_row && col == state.cursor.col {
        style = Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
    }
    style
}

fn natural_widths(grid: &impl GridSource) -> Vec<usize> {
    (0..grid.num_cols()).map(|col| natural_width(grid, col)).collect()
}

fn natural_width(grid: &impl GridSource, col: usize) -> usize {
    let header = grid.column_name(col).map_or(0, |name| name.chars().count() + 4);
    let widest = (0..grid.num_rows())
        .filter_map(|row| grid.cell_value(row, col))
        .map(|value| {
            value
                .to_string()
                .lines()
                .map(|line| line.chars().count())
                .max()
                .unwrap_or(0)
        })
        .max()
        .unwrap_or(0);
    header.max(widest).max(MIN_COLUMN_WIDTH)
}

fn column_width(natural: usize, mode: ColumnDisplayMode) -> usize {
    match mode {
        ColumnDisplayMode::Default => natural.min(DEFAULT_MAX_WIDTH),
        ColumnDisplayMode::Clip => natural.min(CLIP_WIDTH),
        ColumnDisplayMode::Wrap => natural.min(WRAP_WIDTH),
    }
}

fn truncate(line: &str, width: usize) -> String {
    if line.chars().count() <= width {
        return line.to_owned();
    }
    let mut out: String = line.chars().take(width.saturating_sub(1)).collect();
    out.push(ELLIPSIS);
    out
}

/// Lines a cell occupies under its column's display mode.
fn cell_lines(value: &CellValue, mode: ColumnDisplayMode, width: usize) -> Vec<String> {
    let text = value.to_string();
    match mode {
        ColumnDisplayMode::Default | ColumnDisplayMode::Clip => {
            let mut lines = text.lines();
            let first = lines.next().unwrap_or_default();
            if lines.next().is_some() {
                let mut clipped = truncate(first, width.saturating_sub(1));
                clipped.push(ELLIPSIS);
                vec![clipped]
            } else {
                vec![truncate(first, width)]
            }
        }
        ColumnDisplayMode::Wrap => {
            let width = width.max(1);
            let mut out = Vec::new();
            for line in text.lines() {
                let chars: Vec<char> = line.chars().collect();
                if chars.is_empty() {
                    out.push(String::new());
                }
                for chunk in chars.chunks(width) {
                    out.push(chunk.iter().collect());
                }
            }
            if out.is_empty() {
                out.push(String::new());
            }
            if out.len() > MAX_WRAP_LINES {
                out.truncate(MAX_WRAP_LINES);
                if let Some(last) = out.last_mut() {
                    *last = truncate(&format!("{last}{ELLIPSIS}{ELLIPSIS}"), width);
                }
            }
            out
        }
    }
}

/// `wrapped` pairs each visible wrapped column with its width.
fn row_height(grid: &impl GridSource, row: usize, wrapped: &[(usize, usize)]) -> u16 {
    let lines = wrapped
        .iter()
        .filter_map(|(col, width)| {
            let value = grid.cell_value(row, *col)?;
            Some(cell_lines(value, ColumnDisplayMode::Wrap, *width).len())
        })
        .max()
        .unwrap_or(1)
        .max(1);
    u16::try_from(lines).unwrap_or(1)
}

/// First row to draw so the cursor stays on screen, moving as little as
/// possible from `previous`. Only rows between the answer and the cursor are
/// measured.
fn scroll_rows(
    previous: usize,
    cursor: usize,
    num_rows: usize,
    available: u16,
    height_of: &dyn Fn(usize) -> u16,
) -> usize {
    if num_rows == 0 {
        return 0;
    }
    let previous = previous.min(num_rows - 1);
    let cursor = cursor.min(num_rows - 1);
    if cursor <= previous {
        return cursor;
    }
    let mut first = cursor;
    let mut used = height_of(cursor);
    while first > previous {
        let used_with_above = used.saturating_add(height_of(first - 1));
        if used_with_above > available {
            break;
        }
        used = used_with_above;
        first -= 1;
    }
    first
}

fn columns_that_fit(first: usize, widths: &[usize], available: usize) -> usize {
    let mut used = 0;
    let mut count = 0;
    for width in widths.iter().skip(first) {
        let needed = if count == 0 { *width } else { width + 1 };
        if used + needed > available && count > 0 {
            break;
        }
        used += needed;
        count += 1;
    }
    count
}

fn scroll_columns(
    previous: usize,
    cursor_index: Option<usize>,
    widths: &[usize],
    available: usize,
) -> usize {
    if widths.is_empty() {
        return 0;
    }
    let mut first = previous.min(widths.len() - 1);
    let Some(cursor) = cursor_index else {
        return first;
    };
    if cursor < first {
        return cursor;
    }
    while first < cursor && first + columns_that_fit(first, widths, available) <= cursor {
        first += 1;
    }
    first
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        App, AppRuntime, InternalEvent, apply_effects, cell_lines, columns_that_fit,
        handle_key_event, handle_mouse_event, help_overlay_text, open_view,
        persist_settled_state, process_internal_events, render, scroll_columns, scroll_rows,
        status_text, translate_key,
    };
    use anyhow::{Result, anyhow};
    use crossterm::event::{
        KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    };
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::cell::Cell;
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::mpsc;
    use std::time::{Duration, Instant};
    use tablehub_app::{
        CellValue, ColumnDisplayMode, GridData, Key, LoadedView, MemorySnapshotStore, Mode,
        OperationError, OperationRequest, OperationResponse, Restore, SessionEffect,
        SnapshotStore, ViewId, ViewKind, ViewPath, ViewSnapshot,
    };

    #[derive(Debug, Default)]
    struct TestRuntime {
        views: BTreeMap<ViewId, LoadedView>,
        responses: VecDeque<Result<OperationResponse, OperationError>>,
        performed: Vec<(ViewId, OperationRequest)>,
        store: MemorySnapshotStore,
        /// Leave spawned operations unanswered; tests deliver results by hand.
        hold_operations: bool,
    }

    impl TestRuntime {
        fn with_view(mut self, view: LoadedView) -> Self {
            self.views.insert(view.id.clone(), view);
            self
        }

        fn respond(mut self, result: Result<OperationResponse, OperationError>) -> Self {
            self.responses.push_back(result);
            self
        }
    }

    impl SnapshotStore for TestRuntime {
        fn load_snapshot(&self, path: &ViewPath) -> Result<Option<ViewSnapshot>> {
            self.store.load_snapshot(path)
        }

        fn save_snapshot(&mut self, path: &ViewPath, snapshot: &ViewSnapshot) -> Result<()> {
            self.store.save_snapshot(path, snapshot)
        }

        fn put_handoff(&mut self, snapshot: &ViewSnapshot) -> Result<()> {
            self.store.put_handoff(snapshot)
        }

        fn take_handoff(&mut self) -> Result<Option<ViewSnapshot>> {
            self.store.take_handoff()
        }
    }

    impl AppRuntime for TestRuntime {
        fn load_view(&mut self, view: &ViewId) -> Result<LoadedView> {
            self.views
                .get(view)
                .cloned()
                .ok_or_else(|| anyhow!("no such view {view}"))
        }

        fn perform_operation(
            &mut self,
            view: &ViewId,
            request: &OperationRequest,
        ) -> Result<OperationResponse, OperationError> {
            self.performed.push((view.clone(), request.clone()));
            self.responses
                .pop_front()
                .unwrap_or_else(|| Ok(OperationResponse::default()))
        }

        fn spawn_operation(
            &mut self,
            request_id: u64,
            view: ViewId,
            request: OperationRequest,
            tx: mpsc::Sender<InternalEvent>,
        ) -> Result<()> {
            if self.hold_operations {
                self.performed.push((view, request));
                return Ok(());
            }
            let result = self.perform_operation(&view, &request);
            tx.send(InternalEvent::OperationFinished { request_id, result })
                .map_err(|_| anyhow!("operation event channel closed"))?;
            Ok(())
        }
    }

    fn people(id: &str) -> LoadedView {
        let text = CellValue::text;
        LoadedView {
            id: ViewId::new(id),
            kind: ViewKind::Base,
            grid: GridData::new(
                vec!["name".to_owned(), "age".to_owned(), "notes".to_owned()],
                vec![
                    vec![text("ann"), text("31"), text("first\nsecond")],
                    vec![text("bo"), text("42"), CellValue::Null],
                    vec![text("cy"), text("27"), text("x")],
                ],
            ),
            wrapped_columns: [2].into_iter().collect(),
        }
    }

    fn key(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::NONE)
    }

    fn code(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    /// App with `start` loaded from `runtime`.
    fn loaded(
        runtime: &mut TestRuntime,
        start: &str,
    ) -> (App, mpsc::Sender<InternalEvent>, mpsc::Receiver<InternalEvent>) {
        let (tx, rx) = mpsc::channel();
        let mut app = App::new(ViewId::new(start), Duration::from_millis(250));
        open_view(&mut app, runtime, &tx, &ViewId::new(start), Restore::Saved);
        (app, tx, rx)
    }

    fn press(
        app: &mut App,
        runtime: &mut TestRuntime,
        tx: &mpsc::Sender<InternalEvent>,
        rx: &mpsc::Receiver<InternalEvent>,
        event: KeyEvent,
    ) -> bool {
        let quit = handle_key_event(app, runtime, tx, event);
        process_internal_events(app, runtime, tx, rx);
        quit
    }

    fn cursor(app: &App) -> (usize, usize) {
        let state = app.session().map(|session| session.state().cursor);
        state.map(|cursor| (cursor.row, cursor.col)).unwrap_or_default()
    }

    #[test]
    fn translate_key_treats_uppercase_as_shifted() {
        let input = translate_key(key('G'));
        assert_eq!(input.key, Key::Char('G'));
        assert!(input.modifiers.shift);

        let input = translate_key(key('g'));
        assert!(!input.modifiers.shift);

        let input = translate_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(input.modifiers.control);
        assert_eq!(translate_key(code(KeyCode::Tab)).key, Key::Other);
        assert_eq!(translate_key(code(KeyCode::Left)).key, Key::Left);
    }

    #[test]
    fn vim_keys_move_the_cursor() {
        let mut runtime = TestRuntime::default().with_view(people("start"));
        let (mut app, tx, rx) = loaded(&mut runtime, "start");

        press(&mut app, &mut runtime, &tx, &rx, key('j'));
        press(&mut app, &mut runtime, &tx, &rx, key('l'));
        assert_eq!(cursor(&app), (1, 1));
        press(&mut app, &mut runtime, &tx, &rx, key('G'));
        assert_eq!(cursor(&app), (2, 1));
        press(&mut app, &mut runtime, &tx, &rx, key('g'));
        assert_eq!(cursor(&app), (0, 1));
    }

    #[test]
    fn control_q_quits() {
        let mut runtime = TestRuntime::default().with_view(people("start"));
        let (mut app, tx, rx) = loaded(&mut runtime, "start");
        assert!(press(
            &mut app,
            &mut runtime,
            &tx,
            &rx,
            KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL)
        ));
        assert!(!press(&mut app, &mut runtime, &tx, &rx, key('q')));
    }

    #[test]
    fn help_overlay_absorbs_keys_until_closed() {
        let mut runtime = TestRuntime::default().with_view(people("start"));
        let (mut app, tx, rx) = loaded(&mut runtime, "start");

        press(&mut app, &mut runtime, &tx, &rx, key('?'));
        assert!(app.help_visible());
        press(&mut app, &mut runtime, &tx, &rx, key('j'));
        assert_eq!(cursor(&app), (0, 0));
        press(&mut app, &mut runtime, &tx, &rx, code(KeyCode::Esc));
        assert!(!app.help_visible());
    }

    #[test]
    fn question_mark_is_text_while_searching() {
        let mut runtime = TestRuntime::default().with_view(people("start"));
        let (mut app, tx, rx) = loaded(&mut runtime, "start");

        press(&mut app, &mut runtime, &tx, &rx, key('|'));
        press(&mut app, &mut runtime, &tx, &rx, key('?'));
        let session = app.session().expect("view should be loaded");
        assert_eq!(session.state().mode(), Mode::Searching);
        assert_eq!(session.state().search.pattern(), "?");
        assert!(!app.help_visible());
        assert!(status_text(&app).starts_with("SEARCH"));
    }

    #[test]
    fn sort_navigates_and_carries_the_cursor() {
        let mut runtime = TestRuntime::default()
            .with_view(people("start"))
            .with_view(people("abc123"))
            .respond(Ok(OperationResponse {
                new_view: Some(ViewId::new("abc123")),
            }));
        let (mut app, tx, rx) = loaded(&mut runtime, "start");

        press(&mut app, &mut runtime, &tx, &rx, key('j'));
        press(&mut app, &mut runtime, &tx, &rx, key('l'));
        press(&mut app, &mut runtime, &tx, &rx, key('['));

        assert_eq!(
            runtime.performed,
            vec![(
                ViewId::new("start"),
                OperationRequest::SortAscending {
                    params: "age".to_owned()
                }
            )]
        );
        let session = app.session().expect("sorted view should be loaded");
        assert_eq!(session.view_id(), &ViewId::new("abc123"));
        assert!(!session.is_loading());
        assert_eq!(cursor(&app), (1, 1));
        assert_eq!(app.history().current(), Some(&ViewId::new("abc123")));
    }

    #[test]
    fn back_restores_the_view_that_was_left() {
        let mut runtime = TestRuntime::default()
            .with_view(people("start"))
            .with_view(people("freq"))
            .respond(Ok(OperationResponse {
                new_view: Some(ViewId::new("freq")),
            }));
        let (mut app, tx, rx) = loaded(&mut runtime, "start");

        press(&mut app, &mut runtime, &tx, &rx, key('j'));
        press(&mut app, &mut runtime, &tx, &rx, key('j'));
        press(&mut app, &mut runtime, &tx, &rx, key('F'));
        assert_eq!(app.session().map(|s| s.view_id().clone()), Some(ViewId::new("freq")));
        assert_eq!(cursor(&app), (0, 0));

        press(&mut app, &mut runtime, &tx, &rx, key('q'));
        assert_eq!(app.session().map(|s| s.view_id().clone()), Some(ViewId::new("start")));
        assert_eq!(cursor(&app), (2, 0));

        press(&mut app, &mut runtime, &tx, &rx, key('p'));
        assert_eq!(app.session().map(|s| s.view_id().clone()), Some(ViewId::new("freq")));
    }

    #[test]
    fn rejected_sort_does_not_move_the_next_view() {
        let mut runtime = TestRuntime::default()
            .with_view(people("start"))
            .with_view(people("freq"))
            .respond(Err(OperationError::Rejected {
                detail: "cannot sort notes".to_owned(),
            }))
            .respond(Ok(OperationResponse {
                new_view: Some(ViewId::new("freq")),
            }));
        let (mut app, tx, rx) = loaded(&mut runtime, "start");

        press(&mut app, &mut runtime, &tx, &rx, key('j'));
        press(&mut app, &mut runtime, &tx, &rx, key('l'));
        press(&mut app, &mut runtime, &tx, &rx, key('['));
        assert_eq!(app.notice(), Some("cannot sort notes"));
        assert!(!runtime.store.has_handoff());

        press(&mut app, &mut runtime, &tx, &rx, code(KeyCode::Esc));
        press(&mut app, &mut runtime, &tx, &rx, key('F'));
        assert_eq!(app.session().map(|s| s.view_id().clone()), Some(ViewId::new("freq")));
        assert_eq!(cursor(&app), (0, 0));
    }

    #[test]
    fn leftover_handoff_is_dropped_by_history_loads() -> Result<()> {
        let mut runtime = TestRuntime::default().with_view(people("start"));
        let (mut app, tx, _rx) = loaded(&mut runtime, "start");

        runtime.put_handoff(&ViewSnapshot {
            row: 2,
            col: 2,
            ..ViewSnapshot::default()
        })?;
        open_view(&mut app, &mut runtime, &tx, &ViewId::new("start"), Restore::Saved);
        assert_eq!(cursor(&app), (0, 0));
        assert!(!runtime.store.has_handoff());
        Ok(())
    }

    #[test]
    fn failed_sort_target_load_drops_the_handoff() {
        let mut runtime = TestRuntime::default()
            .with_view(people("start"))
            .respond(Ok(OperationResponse {
                new_view: Some(ViewId::new("gone")),
            }));
        let (mut app, tx, rx) = loaded(&mut runtime, "start");

        press(&mut app, &mut runtime, &tx, &rx, key('j'));
        press(&mut app, &mut runtime, &tx, &rx, key(']'));
        assert!(app.session().is_none());
        assert!(!runtime.store.has_handoff());
    }

    #[test]
    fn history_keys_wait_for_the_running_sort() {
        let mut runtime = TestRuntime::default()
            .with_view(people("start"))
            .with_view(people("freq"))
            .with_view(people("sorted"))
            .respond(Ok(OperationResponse {
                new_view: Some(ViewId::new("freq")),
            }));
        let (mut app, tx, rx) = loaded(&mut runtime, "start");
        press(&mut app, &mut runtime, &tx, &rx, key('F'));
        assert_eq!(app.history().current(), Some(&ViewId::new("freq")));

        runtime.hold_operations = true;
        press(&mut app, &mut runtime, &tx, &rx, key('j'));
        press(&mut app, &mut runtime, &tx, &rx, key('['));
        let request_id = app.in_flight.expect("sort should be in flight");

        press(&mut app, &mut runtime, &tx, &rx, key('q'));
        assert_eq!(app.session().map(|s| s.view_id().clone()), Some(ViewId::new("freq")));
        assert!(app.session().is_some_and(|session| session.is_loading()));
        assert!(runtime.store.has_handoff());

        tx.send(InternalEvent::OperationFinished {
            request_id,
            result: Ok(OperationResponse {
                new_view: Some(ViewId::new("sorted")),
            }),
        })
        .expect("channel open");
        process_internal_events(&mut app, &mut runtime, &tx, &rx);
        assert_eq!(app.history().current(), Some(&ViewId::new("sorted")));
        assert_eq!(cursor(&app), (1, 0));
        assert!(!runtime.store.has_handoff());
    }

    #[test]
    fn rejection_shows_a_notice_that_any_key_dismisses() {
        let mut runtime = TestRuntime::default()
            .with_view(people("start"))
            .respond(Err(OperationError::Rejected {
                detail: "no matching rows".to_owned(),
            }));
        let (mut app, tx, rx) = loaded(&mut runtime, "start");

        press(&mut app, &mut runtime, &tx, &rx, key(','));
        press(&mut app, &mut runtime, &tx, &rx, key('"'));
        assert_eq!(app.notice(), Some("no matching rows"));
        assert!(app.session().is_some_and(|session| !session.is_loading()));

        press(&mut app, &mut runtime, &tx, &rx, key('j'));
        assert_eq!(app.notice(), None);
        assert_eq!(cursor(&app), (0, 0));
    }

    #[test]
    fn precondition_notice_sends_nothing() {
        let mut runtime = TestRuntime::default().with_view(people("start"));
        let (mut app, tx, rx) = loaded(&mut runtime, "start");

        press(&mut app, &mut runtime, &tx, &rx, key('f'));
        assert_eq!(app.notice(), Some("pick key columns to count"));
        assert!(runtime.performed.is_empty());
    }

    #[test]
    fn stale_operation_results_are_dropped() {
        let mut runtime = TestRuntime::default().with_view(people("start"));
        let (mut app, tx, rx) = loaded(&mut runtime, "start");

        tx.send(InternalEvent::OperationFinished {
            request_id: 99,
            result: Ok(OperationResponse {
                new_view: Some(ViewId::new("elsewhere")),
            }),
        })
        .expect("channel open");
        process_internal_events(&mut app, &mut runtime, &tx, &rx);
        assert_eq!(app.session().map(|s| s.view_id().clone()), Some(ViewId::new("start")));
    }

    #[test]
    fn failed_load_reports_status_and_retries() {
        let mut runtime = TestRuntime::default();
        let (mut app, tx, rx) = loaded(&mut runtime, "missing");
        assert!(app.session().is_none());
        assert!(
            app.status_line()
                .is_some_and(|status| status.starts_with("load failed")),
            "got {:?}",
            app.status_line()
        );

        runtime = runtime.with_view(people("missing"));
        press(&mut app, &mut runtime, &tx, &rx, key('r'));
        assert!(app.session().is_some());
    }

    #[test]
    fn navigation_without_history_reports_status() {
        let mut runtime = TestRuntime::default().with_view(people("start"));
        let (mut app, tx, _rx) = loaded(&mut runtime, "start");
        apply_effects(&mut app, &mut runtime, &tx, vec![SessionEffect::HistoryBack]);
        assert_eq!(app.status_line(), Some("no earlier view"));
    }

    #[test]
    fn settled_input_is_persisted_by_path() -> Result<()> {
        let mut runtime = TestRuntime::default().with_view(people("start"));
        let (mut app, tx, rx) = loaded(&mut runtime, "start");

        press(&mut app, &mut runtime, &tx, &rx, key('j'));
        persist_settled_state(
            &mut app,
            &mut runtime,
            &tx,
            Instant::now() + Duration::from_secs(1),
        );
        let saved = runtime.load_snapshot(&ViewId::new("start").path())?;
        assert_eq!(saved.map(|snapshot| snapshot.row), Some(1));
        Ok(())
    }

    #[test]
    fn render_draws_grid_and_records_geometry() -> Result<()> {
        let mut runtime = TestRuntime::default().with_view(people("start"));
        let (mut app, _tx, _rx) = loaded(&mut runtime, "start");

        let mut terminal = Terminal::new(TestBackend::new(80, 20))?;
        terminal.draw(|frame| render(frame, &mut app))?;
        let screen: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(screen.contains("name"));
        assert!(screen.contains("start [base]"));
        assert!(screen.contains("NaN"));
        assert_eq!(app.geometry.columns.len(), 3);
        assert_eq!(app.geometry.rows.first().map(|span| span.height), Some(2));
        Ok(())
    }

    #[test]
    fn clicking_a_cell_moves_the_cursor_and_leaves_search() -> Result<()> {
        let mut runtime = TestRuntime::default().with_view(people("start"));
        let (mut app, tx, rx) = loaded(&mut runtime, "start");
        press(&mut app, &mut runtime, &tx, &rx, key('|'));

        let mut terminal = Terminal::new(TestBackend::new(80, 20))?;
        terminal.draw(|frame| render(frame, &mut app))?;
        let target = app.geometry.rows[2];
        let column = app.geometry.columns[1];
        handle_mouse_event(
            &mut app,
            MouseEvent {
                kind: MouseEventKind::Down(MouseButton::Left),
                column: column.x,
                row: target.y,
                modifiers: KeyModifiers::NONE,
            },
        );
        let session = app.session().expect("view should be loaded");
        assert_eq!(session.state().mode(), Mode::Normal);
        assert_eq!(cursor(&app), (2, 1));
        Ok(())
    }

    #[test]
    fn hovering_while_searching_moves_the_cursor() -> Result<()> {
        let mut runtime = TestRuntime::default().with_view(people("start"));
        let (mut app, tx, rx) = loaded(&mut runtime, "start");
        press(&mut app, &mut runtime, &tx, &rx, key('|'));

        let mut terminal = Terminal::new(TestBackend::new(80, 20))?;
        terminal.draw(|frame| render(frame, &mut app))?;
        let target = app.geometry.rows[1];
        let column = app.geometry.columns[1];
        handle_mouse_event(
            &mut app,
            MouseEvent {
                kind: MouseEventKind::Moved,
                column: column.x,
                row: target.y,
                modifiers: KeyModifiers::NONE,
            },
        );
        let session = app.session().expect("view should be loaded");
        assert_eq!(session.state().mode(), Mode::Searching);
        assert_eq!(cursor(&app), (1, 1));
        Ok(())
    }

    #[test]
    fn tall_wrapped_grid_renders_the_last_row() -> Result<()> {
        let rows = (0..1500)
            .map(|row| {
                vec![
                    CellValue::text(format!("row {row}")),
                    CellValue::text("a note long enough to wrap across two lines"),
                ]
            })
            .collect();
        let view = LoadedView {
            id: ViewId::new("tall"),
            kind: ViewKind::Base,
            grid: GridData::new(vec!["id".to_owned(), "note".to_owned()], rows),
            wrapped_columns: [1].into_iter().collect(),
        };
        let mut runtime = TestRuntime::default().with_view(view);
        let (mut app, tx, rx) = loaded(&mut runtime, "tall");
        press(&mut app, &mut runtime, &tx, &rx, key('G'));

        let mut terminal = Terminal::new(TestBackend::new(80, 30))?;
        terminal.draw(|frame| render(frame, &mut app))?;
        assert_eq!(app.geometry.rows.last().map(|span| span.row), Some(1499));
        assert!(app.first_row > 1400);
        assert!(app.geometry.rows.iter().all(|span| span.height == 2));
        Ok(())
    }

    #[test]
    fn cell_lines_follow_display_mode() {
        let value = CellValue::text("abcdefghij\nsecond");
        assert_eq!(
            cell_lines(&value, ColumnDisplayMode::Default, 20),
            vec!["abcdefghij…"]
        );
        assert_eq!(
            cell_lines(&value, ColumnDisplayMode::Clip, 6),
            vec!["abcd……"]
        );
        assert_eq!(
            cell_lines(&value, ColumnDisplayMode::Wrap, 5),
            vec!["abcde", "fghij", "secon", "d"]
        );
        assert_eq!(
            cell_lines(&value, ColumnDisplayMode::Wrap, 4),
            vec!["abcd", "efgh", "ij", "sec…"]
        );
        assert_eq!(
            cell_lines(&CellValue::Null, ColumnDisplayMode::Wrap, 8),
            vec!["NaN"]
        );
    }

    #[test]
    fn scrolling_keeps_the_cursor_visible() {
        let one = |_row: usize| 1_u16;
        assert_eq!(scroll_rows(0, 3, 10, 5, &one), 0);
        assert_eq!(scroll_rows(0, 7, 10, 5, &one), 3);
        assert_eq!(scroll_rows(5, 2, 10, 5, &one), 2);
        assert_eq!(scroll_rows(0, 0, 0, 5, &one), 0);

        let two = |_row: usize| 2_u16;
        assert_eq!(scroll_rows(0, 9, 10, 5, &two), 8);
        assert_eq!(scroll_rows(0, 9, 10, 1, &two), 9);

        let widths = [10, 10, 10, 10];
        assert_eq!(columns_that_fit(0, &widths, 21), 2);
        assert_eq!(scroll_columns(0, Some(3), &widths, 21), 2);
        assert_eq!(scroll_columns(2, Some(0), &widths, 21), 0);
    }

    #[test]
    fn scrolling_far_down_measures_only_nearby_rows() {
        let measured = Cell::new(0_usize);
        let counted = |_row: usize| {
            measured.set(measured.get() + 1);
            1_u16
        };
        assert_eq!(scroll_rows(0, 9_999, 10_000, 20, &counted), 9_980);
        assert!(measured.get() <= 21, "measured {} rows", measured.get());
    }

    #[test]
    fn help_lists_every_binding() {
        let help = help_overlay_text();
        for needle in ["sort ascending", "pivot", "regex search", "ctrl+q"] {
            assert!(help.contains(needle), "missing {needle}");
        }
    }
}
