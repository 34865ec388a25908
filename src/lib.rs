//! # mailtask
//!
//! Cancellable background email-sender tasks on Tokio.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use mailtask::{BackgroundTask, TaskState};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut handle = BackgroundTask::new("ops@example.com").start_async();
//!     let state = handle.join_timeout(Duration::from_secs(5)).await?;
//!     println!("send finished: {state}");
//!     Ok(())
//! }
//! ```

pub mod background;
pub mod config;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use background::{BackgroundTask, TaskError, TaskHandle, TaskState};
pub use config::{ConfigError, TaskConfig};
