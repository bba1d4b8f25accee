//! List indicators command.

use anyhow::Result;
use trading_indicators::IndicatorRegistry;

pub fn run() -> Result<()> {
    let registry = IndicatorRegistry::with_defaults();
    let mut names = registry.names();
    names.sort_unstable();

    println!("Registered indicators:");
    for name in names {
        println!("  {}", name);
    }

    Ok(())
}
