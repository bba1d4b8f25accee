//! Watchlist monitor command.

use anyhow::{bail, Result};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use trading_config::AppConfig;
use trading_core::traits::Broker;
use trading_core::types::Side;
use trading_core::{CancelToken, EventSink};
use trading_engine::TradingEngine;
use trading_indicators::IndicatorRegistry;
use trading_monitor::TracingEventSink;
use trading_scanner::ScanWindow;
use trading_watchlist::{Watchlist, WatchlistItem};

use crate::cli::context::{build_data_manager, build_scanner};
use crate::cli::WatchArgs;

pub async fn run(args: WatchArgs, config: AppConfig) -> Result<()> {
    if args.quantity <= Decimal::ZERO {
        bail!("--quantity must be positive");
    }
    let interval = Duration::from_secs(
        args.interval
            .unwrap_or(config.watchlist.scan_interval_secs)
            .max(1),
    );

    let shutdown = CancelToken::new();
    let events: Arc<dyn EventSink> = Arc::new(TracingEventSink::new());
    let data = build_data_manager(&config, events.clone(), &shutdown).await?;

    let engine = Arc::new(
        TradingEngine::new(data.clone(), config.engine.clone()).with_events(events.clone()),
    );
    let watchlist = Watchlist::new(engine.clone(), data.clone()).with_events(events);

    for item in config.watchlist.items.iter().cloned() {
        watchlist.add_item(item).await?;
    }

    if let Some(strategy) = &args.strategy {
        let scanner =
            build_scanner(&config, Arc::new(IndicatorRegistry::with_defaults()), data.clone())
                .await?;
        let batch = scanner
            .scan_many(
                &args.symbols,
                strategy,
                ScanWindow::lookback(config.scanner.lookback_days)?,
                None,
            )
            .await;

        for (symbol, score) in batch.rank(Side::Buy) {
            if score < args.min_score {
                continue;
            }
            let Some(results) = batch.results.get(&symbol) else {
                continue;
            };
            let Some(target) = results.first().and_then(|r| Decimal::from_f64(r.value)) else {
                warn!(symbol = %symbol, "No usable close for candidate");
                continue;
            };
            let item = WatchlistItem::buy(&symbol, args.quantity, target.round_dp(2))
                .with_strategy(strategy.clone(), results.clone());
            let id = watchlist.add_item(item).await?;
            info!(symbol = %symbol, score, target = %target.round_dp(2), id = %id, "Candidate added");
        }
    }

    let active = watchlist.list_active().await;
    if active.is_empty() {
        bail!("Watchlist is empty; configure [[watchlist.items]] or pass --strategy and --symbols");
    }
    println!("Watching {} items every {}s (Ctrl-C to stop)", active.len(), interval.as_secs());

    let stop = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            stop.cancel();
        }
    });

    let cycles = watchlist.run_monitor(interval, &shutdown).await;

    let account = engine.get_account().await?;
    println!();
    println!("=== Session Summary ===");
    println!("Cycles: {}", cycles);
    println!("Cash: ${:.2}", account.cash);
    println!("Equity: ${:.2}", account.equity);
    println!("Realized P&L: ${:.2}", account.realized_pnl);
    println!("Unrealized P&L: ${:.2}", account.unrealized_pnl);
    for position in engine.get_positions().await? {
        println!(
            "  {:<8} {} @ {:.2} (P&L {:.2})",
            position.symbol, position.quantity, position.entry_price, position.unrealized_pnl
        );
    }
    for item in watchlist.list_all().await {
        println!("  {:<8} {:?} {}", item.symbol, item.status, item.id);
    }

    data.close_all().await?;
    Ok(())
}
