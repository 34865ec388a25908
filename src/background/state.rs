//! Task lifecycle states and the shared status cell.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

/// Lifecycle state of a [`BackgroundTask`](super::BackgroundTask).
///
/// # Examples
///
/// ```
/// use mailtask::background::TaskState;
///
/// assert!(!TaskState::Running.is_terminal());
/// assert!(TaskState::Interrupted.is_terminal());
/// assert_eq!(TaskState::Completed.to_string(), "completed");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TaskState {
    /// Constructed, not yet started.
    Created = 0,
    /// Inside `run()`, waiting out the delay.
    Running = 1,
    /// The delay elapsed and the work finished.
    Completed = 2,
    /// Cancellation was observed during the delay.
    Interrupted = 3,
}

impl TaskState {
    /// Returns the lowercase name of the state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
        }
    }

    /// Returns `true` for `Completed` and `Interrupted`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Interrupted)
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Created,
            1 => Self::Running,
            2 => Self::Completed,
            3 => Self::Interrupted,
            // StatusCell only ever stores discriminants of this enum.
            _ => unreachable!("invalid task state {v}"),
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-writer status flag shared between a task and its handle.
///
/// Only the running task writes; everyone else reads. Release/Acquire
/// ordering is all the visibility this needs.
#[derive(Debug)]
pub(crate) struct StatusCell(AtomicU8);

impl StatusCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(TaskState::Created as u8))
    }

    pub(crate) fn get(&self) -> TaskState {
        TaskState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves `Created` to `Running`. Returns `false` if the task already ran.
    pub(crate) fn begin(&self) -> bool {
        self.0
            .compare_exchange(
                TaskState::Created as u8,
                TaskState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Writes a terminal state.
    pub(crate) fn finish(&self, state: TaskState) {
        debug_assert!(state.is_terminal());
        self.0.store(state as u8, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_created() {
        let cell = StatusCell::new();
        assert_eq!(cell.get(), TaskState::Created);
    }

    #[test]
    fn begin_only_once() {
        let cell = StatusCell::new();
        assert!(cell.begin());
        assert_eq!(cell.get(), TaskState::Running);
        assert!(!cell.begin());

        cell.finish(TaskState::Completed);
        assert!(!cell.begin()); // terminal states stay put
        assert_eq!(cell.get(), TaskState::Completed);
    }

    #[test]
    fn terminal_states() {
        assert!(!TaskState::Created.is_terminal());
        assert!(!TaskState::Running.is_terminal());
        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::Interrupted.is_terminal());
    }

    #[test]
    fn decodes_every_discriminant() {
        for state in [
            TaskState::Created,
            TaskState::Running,
            TaskState::Completed,
            TaskState::Interrupted,
        ] {
            assert_eq!(TaskState::from_u8(state as u8), state);
        }
    }

    #[test]
    #[should_panic(expected = "invalid task state 9")]
    fn rejects_unknown_discriminant() {
        let _ = TaskState::from_u8(9);
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&TaskState::Interrupted).unwrap();
        assert_eq!(json, "\"interrupted\"");
        let state: TaskState = serde_json::from_str("\"running\"").unwrap();
        assert_eq!(state, TaskState::Running);
    }
}
