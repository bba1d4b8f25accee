//! Data source health command.

use anyhow::{bail, Result};
use std::sync::Arc;
use trading_config::AppConfig;
use trading_core::CancelToken;
use trading_monitor::TracingEventSink;

use crate::cli::context::build_data_manager;

pub async fn run(config: AppConfig) -> Result<()> {
    let shutdown = CancelToken::new();
    let data = build_data_manager(&config, Arc::new(TracingEventSink::new()), &shutdown).await?;

    let report = data.health_check_all(&shutdown).await;
    let mut failures = 0;
    for (name, result) in &report {
        match result {
            Ok(()) => println!("{:<16} OK", name),
            Err(e) => {
                failures += 1;
                println!("{:<16} FAILED  {}", name, e);
            }
        }
    }
    data.close_all().await?;

    if failures > 0 {
        bail!("{} of {} data sources failed the health check", failures, report.len());
    }
    Ok(())
}
