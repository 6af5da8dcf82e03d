//! Fund manager service
//!
//! Wraps the registry and the distributor with the pieces a deployment
//! needs around them:
//! - Owner gate on registry mutations
//! - One lock per registry so a distribution never sees a torn registry
//! - Transfer execution through [`ValueTransfer`] under a [`FailurePolicy`]
//! - One `FundTransferred` event per settled payout

use std::sync::Arc;

use fundsplit_common::{
    Address, Amount, Category, DistributionReceipt, EventLog, FailedPayout, FailurePolicy,
    FundError, LedgerEvent, Result, ValueTransfer, Weight,
};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::config::LedgerConfig;
use crate::distributor::ProportionalDistributor;
use crate::metrics::LedgerMetrics;
use crate::registry::CategoryRegistry;

/// Owner-gated fund distribution service
pub struct FundManager {
    name: String,
    owner: Address,
    registry: RwLock<CategoryRegistry>,
    bank: Arc<dyn ValueTransfer>,
    events: EventLog,
    policy: FailurePolicy,
    metrics: Option<Arc<LedgerMetrics>>,
}

impl FundManager {
    /// Create a manager with an empty registry
    pub fn new(owner: Address, bank: Arc<dyn ValueTransfer>) -> Self {
        Self {
            name: crate::DEFAULT_SERVICE_NAME.to_string(),
            owner,
            registry: RwLock::new(CategoryRegistry::new()),
            bank,
            events: EventLog::new(crate::DEFAULT_SERVICE_NAME),
            policy: FailurePolicy::default(),
            metrics: None,
        }
    }

    /// Build a manager from configuration, seeding its categories
    pub fn from_config(config: &LedgerConfig, bank: Arc<dyn ValueTransfer>) -> Result<Self> {
        config.validate()?;

        let mut registry = CategoryRegistry::new();
        for (id, destination, weight) in config.category_addresses()? {
            registry.upsert(id, destination, weight);
        }

        Ok(Self::new(config.owner_address()?, bank)
            .with_name(&config.service_name)
            .with_policy(config.failure_policy)
            .with_registry(registry))
    }

    /// Set the display name; also the event source
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self.events.set_source(name);
        self
    }

    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = events;
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<LedgerMetrics>) -> Self {
        metrics.registry_categories.set(self.registry.read().len() as i64);
        self.metrics = Some(metrics);
        self
    }

    /// Replace the registry wholesale (e.g., restored from storage)
    pub fn with_registry(self, registry: CategoryRegistry) -> Self {
        *self.registry.write() = registry;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    fn ensure_owner(&self, caller: &Address) -> Result<()> {
        if caller != &self.owner {
            warn!(%caller, "Rejected registry change from non-owner");
            return Err(FundError::Unauthorized {
                caller: caller.clone(),
            });
        }
        Ok(())
    }

    fn update_gauge(&self, len: usize) {
        if let Some(metrics) = &self.metrics {
            metrics.registry_categories.set(len as i64);
        }
    }

    /// Add a category, or update destination and weight of an existing one
    #[instrument(skip(self, destination), fields(service = %self.name))]
    pub fn add_category(
        &self,
        caller: &Address,
        id: &str,
        destination: Address,
        weight: Weight,
    ) -> Result<()> {
        self.ensure_owner(caller)?;

        let len = {
            let mut registry = self.registry.write();
            registry.upsert(id, destination.clone(), weight);
            registry.len()
        };
        self.update_gauge(len);

        self.events.emit(LedgerEvent::CategoryUpserted {
            category: id.to_string(),
            destination,
            weight,
        });
        Ok(())
    }

    /// Remove a category
    #[instrument(skip(self), fields(service = %self.name))]
    pub fn remove_category(&self, caller: &Address, id: &str) -> Result<Category> {
        self.ensure_owner(caller)?;

        let (removed, len) = {
            let mut registry = self.registry.write();
            let removed = registry.remove(id)?;
            (removed, registry.len())
        };
        self.update_gauge(len);

        self.events.emit(LedgerEvent::CategoryRemoved {
            category: id.to_string(),
        });
        Ok(removed)
    }

    /// Split `amount` across the registered categories and pay it out
    ///
    /// The pool must already sit in the bank's treasury. Payouts are
    /// computed from a snapshot taken under the registry lock; transfers
    /// happen after the lock is released.
    ///
    /// Under an aborting policy a failed transfer ends the call with
    /// [`FundError::PartialDistribution`], whose receipt lists what already
    /// settled.
    #[instrument(skip(self), fields(service = %self.name))]
    pub async fn distribute(&self, amount: Amount) -> Result<DistributionReceipt> {
        let snapshot = self.registry.read().snapshot();

        let payouts = match ProportionalDistributor::distribute(amount, snapshot.categories()) {
            Ok(payouts) => payouts,
            Err(err) => {
                if let Some(metrics) = &self.metrics {
                    metrics.distribution_errors_total.inc();
                }
                warn!(error = %err, "Distribution rejected");
                return Err(err);
            }
        };

        let mut receipt = DistributionReceipt::new(snapshot.digest(), amount);

        for payout in payouts {
            match self.bank.transfer(&payout.destination, payout.amount).await {
                Ok(()) => {
                    self.events.emit(LedgerEvent::FundTransferred {
                        category: payout.category_id.clone(),
                        amount: payout.amount,
                    });
                    receipt.settled.push(payout);
                }
                Err(err) => {
                    self.events.emit(LedgerEvent::TransferFailed {
                        destination: payout.destination.clone(),
                        amount: payout.amount,
                        reason: err.to_string(),
                    });

                    let abort = self.policy.aborts_on(&payout.destination);
                    receipt.failed.push(FailedPayout {
                        payout,
                        reason: err.to_string(),
                    });

                    if abort {
                        if let Some(metrics) = &self.metrics {
                            metrics.observe_receipt(&receipt);
                            metrics.distribution_errors_total.inc();
                        }
                        warn!(
                            settled = receipt.settled.len(),
                            policy = %self.policy,
                            error = %err,
                            "Distribution aborted"
                        );
                        return Err(FundError::PartialDistribution {
                            receipt: Box::new(receipt),
                            source: err,
                        });
                    }
                }
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.observe_receipt(&receipt);
        }
        info!(
            receipt = %receipt.id,
            settled = receipt.settled.len(),
            failed = receipt.failed.len(),
            amount,
            "Distribution complete"
        );
        Ok(receipt)
    }

    /// Ordered copy of the registry
    pub fn snapshot(&self) -> fundsplit_common::RegistrySnapshot {
        self.registry.read().snapshot()
    }

    /// Category id to destination
    pub fn category_destinations(&self) -> Vec<(String, Address)> {
        self.registry.read().destinations()
    }

    /// Category id to percentage of total weight
    pub fn category_percentages(&self) -> Vec<(String, Decimal)> {
        self.registry.read().percentages()
    }

    /// Category id to raw weight
    pub fn category_weights(&self) -> Vec<(String, Weight)> {
        self.registry.read().weights()
    }

    pub fn total_weight(&self) -> u128 {
        self.registry.read().total_weight()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundsplit_common::{AddressKind, InMemoryBank, MemoryEventSink, TransferError};
    use rust_decimal_macros::dec;

    fn account(label: &str) -> Address {
        Address::derive(AddressKind::Account, label.as_bytes())
    }

    struct Fixture {
        owner: Address,
        bank: Arc<InMemoryBank>,
        sink: Arc<MemoryEventSink>,
        manager: FundManager,
    }

    fn fixture(pool: Amount, policy: FailurePolicy) -> Fixture {
        let owner = account("owner");
        let treasury = Address::derive(AddressKind::Contract, b"fund-manager");
        let bank = Arc::new(InMemoryBank::with_balance(treasury, pool));
        let sink = Arc::new(MemoryEventSink::new());
        let manager = FundManager::new(owner.clone(), bank.clone())
            .with_events(EventLog::silent("test").with_sink(sink.clone()))
            .with_policy(policy);

        Fixture {
            owner,
            bank,
            sink,
            manager,
        }
    }

    #[test]
    fn test_only_owner_mutates() {
        let f = fixture(0, FailurePolicy::Abort);
        let intruder = account("intruder");

        let result = f.manager.add_category(&intruder, "dev", account("dev"), 10);
        assert!(matches!(result, Err(FundError::Unauthorized { .. })));
        assert_eq!(f.manager.total_weight(), 0);

        f.manager
            .add_category(&f.owner, "dev", account("dev"), 10)
            .unwrap();
        let result = f.manager.remove_category(&intruder, "dev");
        assert!(matches!(result, Err(FundError::Unauthorized { .. })));
        assert_eq!(f.manager.category_weights().len(), 1);
    }

    #[test]
    fn test_reporting_views() {
        let f = fixture(0, FailurePolicy::Abort);
        f.manager.add_category(&f.owner, "a", account("a"), 1).unwrap();
        f.manager.add_category(&f.owner, "b", account("b"), 3).unwrap();

        assert_eq!(f.manager.total_weight(), 4);
        assert_eq!(
            f.manager.category_percentages(),
            vec![("a".to_string(), dec!(25)), ("b".to_string(), dec!(75))]
        );
        assert_eq!(f.manager.category_destinations()[0].1, account("a"));
    }

    #[test]
    fn test_remove_unknown_category() {
        let f = fixture(0, FailurePolicy::Abort);
        let result = f.manager.remove_category(&f.owner, "ghost");

        assert!(matches!(result, Err(FundError::NotFound(_))));
        assert!(f.sink.is_empty());
    }

    #[tokio::test]
    async fn test_distribute_pays_and_emits() {
        let f = fixture(101, FailurePolicy::Abort);
        f.manager.add_category(&f.owner, "A", account("A"), 30).unwrap();
        f.manager.add_category(&f.owner, "B", account("B"), 20).unwrap();
        f.manager.add_category(&f.owner, "C", account("C"), 50).unwrap();
        f.sink.clear();

        let receipt = f.manager.distribute(101).await.unwrap();

        assert_eq!(receipt.settled_amount(), 101);
        assert_eq!(f.bank.balance(&account("C")), 51);
        assert_eq!(f.bank.balance(f.bank.treasury()), 0);
        assert_eq!(
            f.sink.events(),
            vec![
                LedgerEvent::FundTransferred { category: "A".into(), amount: 30 },
                LedgerEvent::FundTransferred { category: "B".into(), amount: 20 },
                LedgerEvent::FundTransferred { category: "C".into(), amount: 51 },
            ]
        );
        assert_eq!(receipt.snapshot_digest, f.manager.snapshot().digest());
    }

    #[tokio::test]
    async fn test_distribute_empty_registry() {
        let f = fixture(10, FailurePolicy::Abort);
        let result = f.manager.distribute(10).await;

        assert!(matches!(result, Err(FundError::EmptyRegistry)));
        assert_eq!(f.bank.balance(f.bank.treasury()), 10);
    }

    #[tokio::test]
    async fn test_distribute_zero_weight() {
        let f = fixture(10, FailurePolicy::Abort);
        f.manager.add_category(&f.owner, "a", account("a"), 0).unwrap();

        assert!(matches!(f.manager.distribute(10).await, Err(FundError::ZeroWeight)));
    }

    #[tokio::test]
    async fn test_abort_policy_reports_settled() {
        let f = fixture(9, FailurePolicy::Abort);
        f.manager.add_category(&f.owner, "a", account("a"), 1).unwrap();
        f.manager.add_category(&f.owner, "b", account("b"), 1).unwrap();
        f.manager.add_category(&f.owner, "c", account("c"), 1).unwrap();
        f.bank.reject_deposits(&account("b"));

        let err = f.manager.distribute(9).await.unwrap_err();
        let FundError::PartialDistribution { receipt, source } = err else {
            panic!("expected partial distribution");
        };

        assert!(matches!(source, TransferError::Rejected(_)));
        assert_eq!(receipt.settled.len(), 1);
        assert_eq!(receipt.failed[0].payout.category_id, "b");
        assert_eq!(f.bank.balance(&account("c")), 0);
        assert_eq!(f.bank.balance(f.bank.treasury()), 6);
    }

    #[tokio::test]
    async fn test_continue_policy_pays_the_rest() {
        let f = fixture(9, FailurePolicy::Continue);
        f.manager.add_category(&f.owner, "a", account("a"), 1).unwrap();
        f.manager.add_category(&f.owner, "b", account("b"), 1).unwrap();
        f.manager.add_category(&f.owner, "c", account("c"), 1).unwrap();
        f.bank.reject_deposits(&account("b"));

        let receipt = f.manager.distribute(9).await.unwrap();

        assert_eq!(receipt.settled_amount(), 6);
        assert_eq!(receipt.failed_amount(), 3);
        assert_eq!(f.bank.balance(&account("c")), 3);
        assert!(f.sink.events().iter().any(|e| e.is_failure()));
    }

    #[tokio::test]
    async fn test_metrics_track_distributions() {
        let metrics = Arc::new(LedgerMetrics::new().unwrap());
        let f = fixture(10, FailurePolicy::Abort);
        let manager = f.manager.with_metrics(metrics.clone());
        manager.add_category(&f.owner, "a", account("a"), 1).unwrap();

        manager.distribute(10).await.unwrap();
        let _ = manager.distribute(1).await;

        assert_eq!(metrics.registry_categories.get(), 1);
        assert_eq!(metrics.payouts_total.get(), 1);
        assert_eq!(metrics.distribution_errors_total.get(), 1);
    }
}
