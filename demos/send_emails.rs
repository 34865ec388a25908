//! Starts a few email-sender tasks, cancels one, and joins them all.
//!
//! ```text
//! RUST_LOG=debug cargo run --example send_emails
//! ```

use std::time::Duration;

use mailtask::{BackgroundTask, TaskConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = TaskConfig::from_json(r#"{ "delay_ms": 300, "name_prefix": "mailer" }"#)?;

    let mut handles: Vec<_> = ["alice@example.com", "bob@example.com", "carol@example.com"]
        .into_iter()
        .map(|target| BackgroundTask::with_config(target, &config).start_async())
        .collect();

    // Change of heart about the last one.
    if let Some(last) = handles.last() {
        last.request_cancel();
    }

    for handle in &mut handles {
        let state = handle.join_timeout(Duration::from_secs(5)).await?;
        println!("{} -> {}: {state}", handle.name(), handle.target());
    }

    Ok(())
}
