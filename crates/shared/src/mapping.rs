//! UI vocabulary for status/priority and the mapping onto the server's.
//!
//! The UI speaks a three-valued status ("To Do" / "In Progress" / "Done")
//! while the server stores two ("pending" / "done"). UI -> server is total;
//! server -> UI is the lossy direction: "pending" always comes back as
//! "In Progress" because the server cannot distinguish the two non-done
//! states.

use crate::models::{ParseVocabError, TodoPriority, TodoStatus};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiStatus {
    ToDo,
    InProgress,
    Done,
}

pub const UI_STATUS_OPTIONS: [UiStatus; 3] = [UiStatus::ToDo, UiStatus::InProgress, UiStatus::Done];

impl fmt::Display for UiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UiStatus::ToDo => write!(f, "To Do"),
            UiStatus::InProgress => write!(f, "In Progress"),
            UiStatus::Done => write!(f, "Done"),
        }
    }
}

impl FromStr for UiStatus {
    type Err = ParseVocabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "to do" | "to-do" | "todo" => Ok(UiStatus::ToDo),
            "in progress" | "in-progress" => Ok(UiStatus::InProgress),
            "done" => Ok(UiStatus::Done),
            other => Err(ParseVocabError {
                kind: "status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiPriority {
    Low,
    Normal,
    High,
}

pub const UI_PRIORITY_OPTIONS: [UiPriority; 3] =
    [UiPriority::Low, UiPriority::Normal, UiPriority::High];

impl fmt::Display for UiPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UiPriority::Low => write!(f, "Low"),
            UiPriority::Normal => write!(f, "Normal"),
            UiPriority::High => write!(f, "High"),
        }
    }
}

impl FromStr for UiPriority {
    type Err = ParseVocabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(UiPriority::Low),
            "normal" => Ok(UiPriority::Normal),
            "high" => Ok(UiPriority::High),
            other => Err(ParseVocabError {
                kind: "priority",
                value: other.to_string(),
            }),
        }
    }
}

/// UI -> server status. Total: everything short of "Done" is "pending".
pub fn api_status_from_ui(status: UiStatus) -> TodoStatus {
    match status {
        UiStatus::Done => TodoStatus::Done,
        UiStatus::ToDo | UiStatus::InProgress => TodoStatus::Pending,
    }
}

/// Server -> UI status. Lossy: "pending" maps to "In Progress" since the
/// server conflates "To Do" and "In Progress".
pub fn ui_status_from_api(status: TodoStatus) -> UiStatus {
    match status {
        TodoStatus::Done => UiStatus::Done,
        TodoStatus::Pending => UiStatus::InProgress,
    }
}

pub fn api_priority_from_ui(priority: UiPriority) -> TodoPriority {
    match priority {
        UiPriority::Low => TodoPriority::Low,
        UiPriority::Normal => TodoPriority::Normal,
        UiPriority::High => TodoPriority::High,
    }
}

pub fn ui_priority_from_api(priority: TodoPriority) -> UiPriority {
    match priority {
        TodoPriority::Low => UiPriority::Low,
        TodoPriority::Normal => UiPriority::Normal,
        TodoPriority::High => UiPriority::High,
    }
}
