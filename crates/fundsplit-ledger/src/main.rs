//! fundsplit binary
//!
//! Usage: `fundsplit <amount> [config-file]`
//!
//! Seeds the registry from configuration, funds an in-memory treasury with
//! `amount`, distributes it, and prints the receipt as JSON.

use std::sync::Arc;

use anyhow::{Context, Result};
use fundsplit_common::{Address, AddressKind, Amount, InMemoryBank, ValueTransfer};
use fundsplit_ledger::{FundManager, LedgerConfig, LedgerMetrics};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut args = std::env::args().skip(1);
    let amount: Amount = args
        .next()
        .context("usage: fundsplit <amount> [config-file]")?
        .parse()
        .context("amount must be a non-negative integer")?;
    let config_path = args.next();

    let config = LedgerConfig::load(config_path.as_deref())?;
    info!(
        "Starting {} v{} (policy={}, categories={})",
        config.service_name,
        fundsplit_common::VERSION,
        config.failure_policy,
        config.categories.len()
    );

    let treasury = Address::derive(AddressKind::Contract, config.service_name.as_bytes());
    let bank = Arc::new(InMemoryBank::with_balance(treasury, amount));

    let mut manager = FundManager::from_config(&config, bank.clone())?;
    let registry = prometheus::Registry::new();
    if config.metrics_enabled {
        let metrics = Arc::new(LedgerMetrics::new()?);
        metrics.register(&registry)?;
        manager = manager.with_metrics(metrics);
    }

    for (id, pct) in manager.category_percentages() {
        info!(category = %id, percentage = %pct, "Registered category");
    }

    let receipt = manager.distribute(amount).await?;
    println!("{}", serde_json::to_string_pretty(&receipt)?);

    info!(
        remaining = bank.balance(bank.treasury()),
        "Treasury balance after distribution"
    );
    Ok(())
}
