//! Scan command implementation.

use anyhow::{Context, Result};
use std::sync::Arc;
use trading_config::AppConfig;
use trading_core::types::{Side, Timeframe};
use trading_core::CancelToken;
use trading_indicators::IndicatorRegistry;
use trading_monitor::TracingEventSink;
use trading_scanner::ScanWindow;

use crate::cli::context::{build_data_manager, build_scanner};
use crate::cli::ScanArgs;

pub async fn run(args: ScanArgs, config: AppConfig) -> Result<()> {
    let timeframe = args
        .timeframe
        .as_deref()
        .map(str::parse::<Timeframe>)
        .transpose()
        .context("Invalid --timeframe")?;
    let days = args.days.unwrap_or(config.scanner.lookback_days);
    let window = ScanWindow::lookback(days).context("Invalid --days")?;
    let side = Side::from(args.side);

    let shutdown = CancelToken::new();
    let data = build_data_manager(&config, Arc::new(TracingEventSink::new()), &shutdown).await?;
    let scanner =
        build_scanner(&config, Arc::new(IndicatorRegistry::with_defaults()), data.clone()).await?;

    let batch = scanner
        .scan_many(&args.symbols, &args.strategy, window, timeframe)
        .await;
    let ranking = batch.rank(side);

    if args.output == "json" {
        let output = serde_json::json!({
            "strategy": args.strategy,
            "side": side,
            "ranking": ranking
                .iter()
                .map(|(symbol, score)| serde_json::json!({ "symbol": symbol, "score": score }))
                .collect::<Vec<_>>(),
            "results": batch.results,
            "errors": batch
                .errors
                .iter()
                .map(|(symbol, e)| serde_json::json!({ "symbol": symbol, "error": e.to_string() }))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("=== {} candidates for {} ===", side, args.strategy);
        if ranking.is_empty() {
            println!("No signals");
        }
        for (rank, (symbol, score)) in ranking.iter().enumerate() {
            println!("{:>3}. {:<8} {:.3}", rank + 1, symbol, score);
            for result in batch.results.get(symbol).into_iter().flatten() {
                if result.side == side {
                    println!(
                        "       {:<16} {:?} value={:.4} threshold={:.4} score={:.3}",
                        result.indicator_name,
                        result.condition,
                        result.value,
                        result.threshold,
                        result.score
                    );
                }
            }
        }
        if batch.has_errors() {
            println!();
            println!("Errors:");
            for (symbol, e) in &batch.errors {
                println!("  {:<8} {}", symbol, e);
            }
        }
    }

    data.close_all().await?;
    Ok(())
}
