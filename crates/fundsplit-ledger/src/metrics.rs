//! Prometheus metrics for the fund manager

use fundsplit_common::{DistributionReceipt, FundError, Result};

/// Distribution counters
pub struct LedgerMetrics {
    pub distributions_total: prometheus::IntCounter,
    pub distribution_errors_total: prometheus::IntCounter,
    pub payouts_total: prometheus::IntCounter,
    pub transfer_failures_total: prometheus::IntCounter,
    /// Settled value; f64, so only approximate for very large pools
    pub distributed_amount_total: prometheus::Counter,
    pub registry_categories: prometheus::IntGauge,
}

impl LedgerMetrics {
    pub fn new() -> Result<Self> {
        Ok(Self {
            distributions_total: prometheus::IntCounter::new(
                "fundsplit_distributions_total",
                "Distributions executed",
            )
            .map_err(metrics_error)?,
            distribution_errors_total: prometheus::IntCounter::new(
                "fundsplit_distribution_errors_total",
                "Distributions rejected or aborted",
            )
            .map_err(metrics_error)?,
            payouts_total: prometheus::IntCounter::new(
                "fundsplit_payouts_total",
                "Payouts settled",
            )
            .map_err(metrics_error)?,
            transfer_failures_total: prometheus::IntCounter::new(
                "fundsplit_transfer_failures_total",
                "Payout transfers that failed",
            )
            .map_err(metrics_error)?,
            distributed_amount_total: prometheus::Counter::new(
                "fundsplit_distributed_amount_total",
                "Value settled to category destinations",
            )
            .map_err(metrics_error)?,
            registry_categories: prometheus::IntGauge::new(
                "fundsplit_registry_categories",
                "Categories currently registered",
            )
            .map_err(metrics_error)?,
        })
    }

    pub fn register(&self, registry: &prometheus::Registry) -> Result<()> {
        registry
            .register(Box::new(self.distributions_total.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(self.distribution_errors_total.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(self.payouts_total.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(self.transfer_failures_total.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(self.distributed_amount_total.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(self.registry_categories.clone()))
            .map_err(metrics_error)?;
        Ok(())
    }

    /// Record a finished (possibly partial) distribution
    pub fn observe_receipt(&self, receipt: &DistributionReceipt) {
        self.distributions_total.inc();
        self.payouts_total.inc_by(receipt.settled.len() as u64);
        self.transfer_failures_total.inc_by(receipt.failed.len() as u64);
        self.distributed_amount_total
            .inc_by(receipt.settled_amount() as f64);
    }
}

fn metrics_error(err: prometheus::Error) -> FundError {
    FundError::Internal(format!("metrics: {}", err))
}
