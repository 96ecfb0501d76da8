// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{Command, Mode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Esc,
    Backspace,
    Up,
    Down,
    Left,
    Right,
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub control: bool,
    pub alt: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyInput {
    pub const fn plain(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers {
                shift: false,
                control: false,
                alt: false,
            },
        }
    }

    pub const fn shifted(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers {
                shift: true,
                control: false,
                alt: false,
            },
        }
    }

    pub const fn control(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers {
                shift: false,
                control: true,
                alt: false,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyResolution {
    Command(Command),
    /// Consumed by search text entry without producing a command.
    Swallowed,
    Unbound,
}

pub const SEARCH_ACTIVATOR: char = '|';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelpBinding {
    pub keys: &'static str,
    pub description: &'static str,
}

impl HelpBinding {
    const fn new(keys: &'static str, description: &'static str) -> Self {
        Self { keys, description }
    }
}

pub const HELP_BINDINGS: &[HelpBinding] = &[
    HelpBinding::new("j/k ↓/↑", "row down / up"),
    HelpBinding::new("h/l ←/→", "column left / right"),
    HelpBinding::new("g / G", "first / last row"),
    HelpBinding::new("!", "toggle key column"),
    HelpBinding::new("+", "toggle aggregate column"),
    HelpBinding::new(",", "toggle filter value"),
    HelpBinding::new("-", "hide / show column"),
    HelpBinding::new("v", "cycle column display mode"),
    HelpBinding::new("[ / ]", "sort ascending / descending"),
    HelpBinding::new("\"", "filter on selected values"),
    HelpBinding::new("F", "frequency of current column"),
    HelpBinding::new("f", "frequency of key columns"),
    HelpBinding::new("W", "pivot"),
    HelpBinding::new("|", "regex search in current column"),
    HelpBinding::new("Enter", "open row / facet / run search"),
    HelpBinding::new("Esc", "leave search"),
    HelpBinding::new("q / p", "back / forward"),
];

/// Resolves a key press. Control chords are never handled here; search mode
/// owns the keyboard while active.
pub fn resolve_key(mode: Mode, input: KeyInput) -> KeyResolution {
    if input.modifiers.control {
        return KeyResolution::Unbound;
    }

    match mode {
        Mode::Searching => resolve_search_key(input.key),
        Mode::Normal => {
            if input.modifiers.shift
                && let Some(command) = shifted_command(input.key)
            {
                return KeyResolution::Command(command);
            }
            normal_command(input.key).map_or(KeyResolution::Unbound, KeyResolution::Command)
        }
    }
}

fn resolve_search_key(key: Key) -> KeyResolution {
    match key {
        Key::Esc => KeyResolution::Command(Command::ExitSearch),
        Key::Enter => KeyResolution::Command(Command::Confirm),
        Key::Backspace => KeyResolution::Command(Command::SearchBackspace),
        Key::Char(ch) => KeyResolution::Command(Command::SearchInsert(ch)),
        _ => KeyResolution::Swallowed,
    }
}

fn shifted_command(key: Key) -> Option<Command> {
    match key {
        Key::Char('G') => Some(Command::JumpLastRow),
        Key::Char('F') => Some(Command::RunFrequency),
        Key::Char('W') => Some(Command::RunPivot),
        _ => None,
    }
}

fn normal_command(key: Key) -> Option<Command> {
    match key {
        Key::Char('j') | Key::Down => Some(Command::MoveRow(1)),
        Key::Char('k') | Key::Up => Some(Command::MoveRow(-1)),
        Key::Char('l') | Key::Right => Some(Command::MoveColumn(1)),
        Key::Char('h') | Key::Left => Some(Command::MoveColumn(-1)),
        Key::Char('g') => Some(Command::JumpFirstRow),
        Key::Char('f') => Some(Command::RunMultiFrequency),
        Key::Char('!') => Some(Command::ToggleKeyColumn),
        Key::Char('+') => Some(Command::ToggleAggregateColumn),
        Key::Char(',') => Some(Command::ToggleFilterValue),
        Key::Char('-') => Some(Command::ToggleHiddenColumn),
        Key::Char('v') => Some(Command::ToggleDisplayMode),
        Key::Char('"') => Some(Command::RunFilter),
        Key::Char('[') => Some(Command::SortAscending),
        Key::Char(']') => Some(Command::SortDescending),
        Key::Char(SEARCH_ACTIVATOR) => Some(Command::EnterSearch),
        Key::Char('q') => Some(Command::NavigateBack),
        Key::Char('p') => Some(Command::NavigateForward),
        Key::Enter => Some(Command::Confirm),
        _ => None,
    }
}
