//! Handle to a started [`BackgroundTask`](super::BackgroundTask).

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::TaskError;
use super::state::{StatusCell, TaskState};

/// Join, cancel and inspect a task started with
/// [`BackgroundTask::start_async`](super::BackgroundTask::start_async).
///
/// Dropping the handle detaches the task; it keeps running to completion.
#[derive(Debug)]
pub struct TaskHandle {
    name: String,
    target: String,
    status: Arc<StatusCell>,
    cancel: CancellationToken,
    // `None` once joined.
    join: Option<JoinHandle<TaskState>>,
}

impl TaskHandle {
    pub(crate) fn new(
        name: String,
        target: String,
        status: Arc<StatusCell>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            name,
            target,
            status,
            cancel,
            join: None,
        }
    }

    pub(crate) fn attach(mut self, join: JoinHandle<TaskState>) -> Self {
        self.join = Some(join);
        self
    }

    /// The identifying name the task was started with.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Current lifecycle state; readable from anywhere at any time.
    pub fn state(&self) -> TaskState {
        self.status.get()
    }

    /// Returns `true` while the spawned work has not finished.
    ///
    /// Always `false` once [`join`](Self::join) has returned.
    pub fn is_alive(&self) -> bool {
        self.join.as_ref().is_some_and(|join| !join.is_finished())
    }

    /// Signals cooperative cancellation; the task observes it at its delay.
    pub fn request_cancel(&self) {
        debug!(task = %self.name, "cancel requested");
        self.cancel.cancel();
    }

    /// Waits until the task reaches a terminal state and returns it.
    ///
    /// Joining an already-joined handle returns the stored state immediately.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Join`] if the spawned Tokio task panicked or was
    /// aborted by runtime shutdown. Joining again after that returns
    /// [`TaskError::Lost`].
    pub async fn join(&mut self) -> Result<TaskState, TaskError> {
        let Some(join) = self.join.as_mut() else {
            let state = self.status.get();
            if state.is_terminal() {
                return Ok(state);
            }
            return Err(TaskError::Lost {
                name: self.name.clone(),
                state,
            });
        };

        let result = join.await;
        self.join = None;
        Ok(result?)
    }

    /// [`join`](Self::join) bounded by `bound`.
    ///
    /// An elapsed bound is the caller's failure, not the task's: the task
    /// keeps running and the handle stays joinable.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::JoinTimeout`] if `bound` elapses first, or the
    /// errors of [`join`](Self::join).
    pub async fn join_timeout(&mut self, bound: Duration) -> Result<TaskState, TaskError> {
        match tokio::time::timeout(bound, self.join()).await {
            Ok(result) => result,
            Err(_) => {
                debug!(task = %self.name, ?bound, "join bound elapsed");
                Err(TaskError::JoinTimeout { bound })
            }
        }
    }
}
