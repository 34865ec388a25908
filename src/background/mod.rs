//! Background tasks: a cancellable email sender run on its own Tokio task.
//!
//! A [`BackgroundTask`] wraps a single send to one `target`. Running it waits
//! out a bounded delay (the simulated cost of the send) and completes; no
//! network I/O happens. The delay is the only suspension point, and the only
//! place a cancellation request is observed.
//!
//! ## Core types
//!
//! - [`BackgroundTask`]: the unit of work; run it inline or start it.
//! - [`TaskHandle`]: returned by [`BackgroundTask::start_async`]; join,
//!   cancel and inspect a started task.
//! - [`TaskState`]: `Created → Running → Completed | Interrupted`.
//! - [`TaskError`]: failures seen by the joining caller.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use mailtask::background::{BackgroundTask, TaskState};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut handle = BackgroundTask::new("ops@example.com")
//!         .with_name("mailer-1")
//!         .start_async();
//!
//!     let state = handle.join_timeout(Duration::from_secs(5)).await?;
//!     assert_eq!(state, TaskState::Completed);
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::config::TaskConfig;

pub mod handle;
pub mod state;

pub use handle::TaskHandle;
pub use state::TaskState;

use state::StatusCell;

/// Errors produced by background tasks.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Cancellation arrived while the task was waiting out its delay.
    ///
    /// `run()` absorbs this by marking the task [`TaskState::Interrupted`];
    /// it never reaches a joining caller.
    #[error("interrupted during wait")]
    InterruptedDuringWait,

    /// The caller's bound on `join` elapsed before the task finished.
    #[error("task did not finish within {bound:?}")]
    JoinTimeout { bound: Duration },

    /// The spawned Tokio task panicked or was aborted by runtime shutdown.
    #[error("task failed to join: {0}")]
    Join(#[from] JoinError),

    /// The task was already joined with an error and never reached a
    /// terminal state.
    #[error("task {name} ended while {state}")]
    Lost { name: String, state: TaskState },
}

/// Source of generated names for tasks that were not named explicitly.
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(0);

fn generated_name(prefix: &str) -> String {
    let id = NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{id}")
}

/// A cancellable email-sender task.
///
/// The task is owned by whoever constructs it. [`run`](Self::run) executes it
/// inline; [`start_async`](Self::start_async) moves it onto its own Tokio
/// task and hands back a [`TaskHandle`]. Either way a task runs at most once.
#[derive(Debug)]
pub struct BackgroundTask {
    target: String,
    name: String,
    delay: Duration,
    status: Arc<StatusCell>,
    cancel: CancellationToken,
}

impl BackgroundTask {
    /// Creates an idle task for `target` using [`TaskConfig::default`].
    ///
    /// `target` is not validated; any string, including an empty one, is
    /// accepted.
    pub fn new(target: impl Into<String>) -> Self {
        Self::with_config(target, &TaskConfig::default())
    }

    /// Creates an idle task for `target` with an explicit config.
    pub fn with_config(target: impl Into<String>, config: &TaskConfig) -> Self {
        Self {
            target: target.into(),
            name: generated_name(&config.name_prefix),
            delay: config.delay_duration(),
            status: Arc::new(StatusCell::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Gives the task an identifying name, replacing the generated one.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Overrides the delay taken from the config.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn state(&self) -> TaskState {
        self.status.get()
    }

    /// Signals cooperative cancellation.
    ///
    /// Observed at the delay inside [`run`](Self::run), including when the
    /// request arrives before the task has started.
    pub fn request_cancel(&self) {
        self.cancel.cancel();
    }

    /// Runs the task on the current Tokio task and returns its terminal state.
    ///
    /// Never fails: an interruption during the delay is recorded as
    /// [`TaskState::Interrupted`]. Calling `run` on a task that has already
    /// left [`TaskState::Created`] returns the current state without sending
    /// again.
    pub async fn run(&self) -> TaskState {
        if !self.status.begin() {
            debug!(task = %self.name, state = %self.state(), "task already ran, skipping");
            return self.state();
        }

        info!(task = %self.name, target = %self.target, "sending email");

        let state = match self.wait().await {
            Ok(()) => {
                info!(task = %self.name, target = %self.target, "email sent");
                TaskState::Completed
            }
            Err(e) => {
                warn!(task = %self.name, target = %self.target, error = %e, "email send interrupted");
                TaskState::Interrupted
            }
        };

        self.status.finish(state);
        debug!(task = %self.name, state = %state, "task finished");
        state
    }

    /// Spawns [`run`](Self::run) onto its own Tokio task.
    ///
    /// # Panics
    ///
    /// Panics if called outside the context of a Tokio runtime.
    pub fn start_async(self) -> TaskHandle {
        let handle = TaskHandle::new(
            self.name.clone(),
            self.target.clone(),
            Arc::clone(&self.status),
            self.cancel.clone(),
        );

        let span = info_span!("background_task", name = %self.name);
        let join = tokio::spawn(async move { self.run().await }.instrument(span));

        handle.attach(join)
    }

    /// The suspension point: waits out the delay unless cancelled first.
    async fn wait(&self) -> Result<(), TaskError> {
        tokio::select! {
            // Cancellation wins ties, even against a zero-length delay.
            biased;
            () = self.cancel.cancelled() => Err(TaskError::InterruptedDuringWait),
            () = tokio::time::sleep(self.delay) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicUsize;

    #[tokio::test(start_paused = true)]
    async fn run_completes_for_any_target() {
        for target in ["test@example.com", "", "not an address", "  \u{1F4E7}  "] {
            let task = BackgroundTask::new(target);
            assert_eq!(task.state(), TaskState::Created);
            assert_eq!(task.run().await, TaskState::Completed);
            assert_eq!(task.state(), TaskState::Completed);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn run_twice_does_not_resend() {
        let task = BackgroundTask::new("again@example.com");
        assert_eq!(task.run().await, TaskState::Completed);
        assert_eq!(task.run().await, TaskState::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_before_direct_run() {
        let task = BackgroundTask::new("early@example.com");
        task.request_cancel();
        assert_eq!(task.run().await, TaskState::Interrupted);
    }

    #[test]
    fn explicit_name_is_reported() {
        let task = BackgroundTask::new("name@example.com").with_name("CustomEmailThread");
        assert_eq!(task.name(), "CustomEmailThread");
        assert_eq!(task.target(), "name@example.com");
    }

    #[test]
    fn generated_names_are_distinct() {
        let a = BackgroundTask::new("a@example.com");
        let b = BackgroundTask::new("b@example.com");
        assert!(a.name().starts_with("background-task-"));
        assert!(b.name().starts_with("background-task-"));
        assert_ne!(a.name(), b.name());
    }

    #[test]
    fn config_prefix_and_delay() {
        let config = TaskConfig {
            delay_ms: 25,
            name_prefix: "mailer".to_owned(),
        };
        let task = BackgroundTask::with_config("cfg@example.com", &config);
        assert!(task.name().starts_with("mailer-"));
        assert_eq!(task.delay(), Duration::from_millis(25));
    }

    #[tokio::test]
    async fn started_task_reports_name() {
        let mut handle = BackgroundTask::new("name@example.com")
            .with_name("CustomEmailThread")
            .with_delay(Duration::from_millis(10))
            .start_async();
        assert_eq!(handle.name(), "CustomEmailThread");
        handle.join().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn alive_until_joined() {
        let mut handle = BackgroundTask::new("alive@example.com").start_async();
        assert!(handle.is_alive());
        assert_eq!(handle.join().await.unwrap(), TaskState::Completed);
        assert!(!handle.is_alive());
    }

    #[tokio::test(start_paused = true)]
    async fn completes_within_bound() {
        let mut handle = BackgroundTask::new("timeout@example.com").start_async();
        let state = handle.join_timeout(Duration::from_secs(5)).await.unwrap();
        assert_eq!(state, TaskState::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn independent_tasks_each_finish_once() {
        let counter = Arc::new(AtomicUsize::new(0));

        let joiners: Vec<_> = ["one@example.com", "two@example.com"]
            .into_iter()
            .map(|target| {
                let mut handle = BackgroundTask::new(target)
                    .with_delay(Duration::from_millis(500))
                    .start_async();
                let counter = Arc::clone(&counter);
                tokio::spawn(async move {
                    if handle.join().await.unwrap() == TaskState::Completed {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for joiner in joiners {
            joiner.await.unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cancel_right_after_start() {
        let mut handle = BackgroundTask::new("interrupt@example.com")
            .with_delay(Duration::from_secs(60))
            .start_async();
        handle.request_cancel();

        let state = handle.join_timeout(Duration::from_secs(5)).await.unwrap();
        assert_eq!(state, TaskState::Interrupted);
        assert_eq!(handle.state(), TaskState::Interrupted);
        assert!(!handle.is_alive());
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            TaskError::InterruptedDuringWait.to_string(),
            "interrupted during wait"
        );
        let e = TaskError::JoinTimeout {
            bound: Duration::from_millis(100),
        };
        assert_eq!(e.to_string(), "task did not finish within 100ms");
        let e = TaskError::Lost {
            name: "mailer-7".to_owned(),
            state: TaskState::Running,
        };
        assert_eq!(e.to_string(), "task mailer-7 ended while running");
    }
}
