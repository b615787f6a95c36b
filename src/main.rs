//! Tickerboard console.
//!
//! Reads commands from stdin and prints results to stdout. Logs go to
//! stderr and, if configured, a rolling log file.

use anyhow::Context;
use futures::StreamExt;
use tickerboard::{App, Config, logging};
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load_or_default().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard = logging::init(&config.logging).context("failed to initialize logging")?;

    let mut app = App::new(config);

    // Report store writes as they happen
    if let Some(mut changes) = app.take_changes() {
        tokio::spawn(async move {
            while let Some(change) = changes.next().await {
                tracing::info!(key = %change.key, value = ?change.value, "state changed");
            }
        });
    }

    // Run the console
    app.run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
        .context("console failed")?;

    Ok(())
}
