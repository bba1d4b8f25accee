//! Validate configuration command.

use anyhow::Result;
use trading_config::AppConfig;
use trading_indicators::IndicatorRegistry;

pub fn run(source: &str, config: AppConfig) -> Result<()> {
    println!("Validating configuration: {}", source);

    if let Err(e) = config.validate(&IndicatorRegistry::with_defaults()) {
        println!("Configuration error: {}", e);
        return Err(e.into());
    }

    println!("Configuration is valid!");
    println!();
    println!("App: {}", config.app.name);
    println!("Environment: {}", config.app.environment);
    println!("Log level: {}", config.logging.level);
    for source in &config.data_sources {
        println!(
            "Data source: {} ({:?}{})",
            source.name,
            source.kind,
            if source.enabled { "" } else { ", disabled" }
        );
    }
    if let Some(primary) = &config.primary_source {
        println!("Primary source: {}", primary);
    }
    println!("Initial cash: ${}", config.engine.initial_cash);
    println!("Max positions: {}", config.engine.limits.max_positions);
    println!("Max position size: {}%", config.engine.limits.max_position_size_percent);
    println!("Max daily trades: {}", config.engine.limits.max_daily_trades);
    println!("Strategies: {}", config.strategies.len());
    println!("Watchlist items: {}", config.watchlist.items.len());
    println!("Scan interval: {}s", config.watchlist.scan_interval_secs);

    Ok(())
}
