//! Value transfer seam
//!
//! The services compute who gets what, then hand each payout to a
//! [`ValueTransfer`] implementation. Whether a failed transfer stops the
//! remaining payouts is decided by an explicit [`FailurePolicy`].

use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TransferError;
use crate::types::{address::Address, Amount};

/// Moves native value out of a service's treasury
#[async_trait]
pub trait ValueTransfer: Send + Sync {
    /// Address whose balance funds outgoing transfers
    fn treasury(&self) -> &Address;

    /// Send `amount` from the treasury to `to`
    async fn transfer(&self, to: &Address, amount: Amount) -> Result<(), TransferError>;

    /// Return `amount` previously sent to `from` back to the treasury
    ///
    /// Undoes a transfer whose follow-up call failed, as a reverted call
    /// would.
    async fn refund(&self, from: &Address, amount: Amount) -> Result<(), TransferError>;

    /// Current balance of `who`
    async fn balance_of(&self, who: &Address) -> Amount;
}

/// What to do when one transfer in a batch fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failure and report what already settled
    #[default]
    Abort,
    /// Record the failure and keep going
    Continue,
    /// Abort when the destination is a plain account, continue when it is a
    /// contract (a contract may legitimately refuse deposits)
    AbortForAccounts,
}

impl FailurePolicy {
    /// Whether a failed transfer to `destination` ends the batch
    pub fn aborts_on(&self, destination: &Address) -> bool {
        match self {
            FailurePolicy::Abort => true,
            FailurePolicy::Continue => false,
            FailurePolicy::AbortForAccounts => !destination.is_contract(),
        }
    }
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailurePolicy::Abort => write!(f, "abort"),
            FailurePolicy::Continue => write!(f, "continue"),
            FailurePolicy::AbortForAccounts => write!(f, "abort_for_accounts"),
        }
    }
}

/// In-memory balances keyed by address
///
/// Transfers debit the treasury. Addresses registered with
/// [`InMemoryBank::reject_deposits`] refuse incoming value, which lets tests
/// and demos exercise failure policies.
pub struct InMemoryBank {
    treasury: Address,
    balances: DashMap<Address, Amount>,
    rejecting: RwLock<HashSet<Address>>,
}

impl InMemoryBank {
    pub fn new(treasury: Address) -> Self {
        Self {
            treasury,
            balances: DashMap::new(),
            rejecting: RwLock::new(HashSet::new()),
        }
    }

    /// Create a bank whose treasury starts with `balance`
    pub fn with_balance(treasury: Address, balance: Amount) -> Self {
        let bank = Self::new(treasury.clone());
        bank.deposit(&treasury, balance);
        bank
    }

    /// Credit `amount` to `who` from outside the system, saturating at
    /// `Amount::MAX`
    pub fn deposit(&self, who: &Address, amount: Amount) {
        let mut balance = self.balances.entry(who.clone()).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    fn credit(&self, who: &Address, amount: Amount) -> Result<(), TransferError> {
        let mut balance = self.balances.entry(who.clone()).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| TransferError::BalanceOverflow(who.clone()))?;
        Ok(())
    }

    fn debit(&self, who: &Address, amount: Amount) -> Result<(), TransferError> {
        let mut balance = self.balances.entry(who.clone()).or_insert(0);
        if *balance < amount {
            return Err(TransferError::InsufficientFunds {
                required: amount,
                available: *balance,
            });
        }
        *balance -= amount;
        Ok(())
    }

    /// Move `amount` from `from` to `to`, restoring `from` if `to` cannot
    /// take it
    fn move_value(&self, from: &Address, to: &Address, amount: Amount) -> Result<(), TransferError> {
        self.debit(from, amount)?;
        if let Err(err) = self.credit(to, amount) {
            self.deposit(from, amount);
            return Err(err);
        }
        Ok(())
    }

    /// Make `who` refuse incoming transfers
    pub fn reject_deposits(&self, who: &Address) {
        self.rejecting.write().insert(who.clone());
    }

    pub fn accept_deposits(&self, who: &Address) {
        self.rejecting.write().remove(who);
    }

    /// Balance lookup without going through the async trait
    pub fn balance(&self, who: &Address) -> Amount {
        self.balances.get(who).map(|b| *b).unwrap_or(0)
    }

    /// Sum of every balance, treasury included
    pub fn total_supply(&self) -> Amount {
        self.balances.iter().map(|entry| *entry.value()).sum()
    }
}

#[async_trait]
impl ValueTransfer for InMemoryBank {
    fn treasury(&self) -> &Address {
        &self.treasury
    }

    async fn transfer(&self, to: &Address, amount: Amount) -> Result<(), TransferError> {
        if self.rejecting.read().contains(to) {
            return Err(TransferError::Rejected(format!("{to} does not accept deposits")));
        }

        self.move_value(&self.treasury, to, amount)?;
        debug!(to = %to, amount, "Transferred from treasury");
        Ok(())
    }

    async fn refund(&self, from: &Address, amount: Amount) -> Result<(), TransferError> {
        self.move_value(from, &self.treasury, amount)?;
        debug!(from = %from, amount, "Refunded to treasury");
        Ok(())
    }

    async fn balance_of(&self, who: &Address) -> Amount {
        self.balance(who)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::address::AddressKind;

    fn account(label: &str) -> Address {
        Address::derive(AddressKind::Account, label.as_bytes())
    }

    fn contract(label: &str) -> Address {
        Address::derive(AddressKind::Contract, label.as_bytes())
    }

    #[test]
    fn test_policy_decisions() {
        assert!(FailurePolicy::Abort.aborts_on(&contract("c")));
        assert!(!FailurePolicy::Continue.aborts_on(&account("a")));
        assert!(FailurePolicy::AbortForAccounts.aborts_on(&account("a")));
        assert!(!FailurePolicy::AbortForAccounts.aborts_on(&contract("c")));
    }

    #[test]
    fn test_policy_serde() {
        let policy: FailurePolicy = serde_json::from_str("\"abort_for_accounts\"").unwrap();
        assert_eq!(policy, FailurePolicy::AbortForAccounts);
        assert_eq!(FailurePolicy::default(), FailurePolicy::Abort);
    }

    #[tokio::test]
    async fn test_transfer_moves_value() {
        let treasury = contract("treasury");
        let bank = InMemoryBank::with_balance(treasury.clone(), 100);
        let alice = account("alice");

        bank.transfer(&alice, 40).await.unwrap();

        assert_eq!(bank.balance_of(&alice).await, 40);
        assert_eq!(bank.balance_of(&treasury).await, 60);
        assert_eq!(bank.total_supply(), 100);
    }

    #[tokio::test]
    async fn test_transfer_insufficient_funds() {
        let bank = InMemoryBank::with_balance(contract("treasury"), 5);
        let result = bank.transfer(&account("alice"), 6).await;

        assert_eq!(
            result,
            Err(TransferError::InsufficientFunds {
                required: 6,
                available: 5
            })
        );
    }

    #[tokio::test]
    async fn test_rejecting_destination() {
        let bank = InMemoryBank::with_balance(contract("treasury"), 10);
        let vault = contract("vault");
        bank.reject_deposits(&vault);

        assert!(matches!(
            bank.transfer(&vault, 1).await,
            Err(TransferError::Rejected(_))
        ));
        assert_eq!(bank.balance(bank.treasury()), 10);

        bank.accept_deposits(&vault);
        bank.transfer(&vault, 1).await.unwrap();
        assert_eq!(bank.balance(&vault), 1);
    }

    #[tokio::test]
    async fn test_refund_returns_value_to_treasury() {
        let bank = InMemoryBank::with_balance(contract("treasury"), 10);
        let token = contract("token");

        bank.transfer(&token, 4).await.unwrap();
        bank.refund(&token, 4).await.unwrap();

        assert_eq!(bank.balance(&token), 0);
        assert_eq!(bank.balance(bank.treasury()), 10);
        assert!(matches!(
            bank.refund(&token, 1).await,
            Err(TransferError::InsufficientFunds { .. })
        ));
    }

    #[tokio::test]
    async fn test_transfer_overflowing_recipient_keeps_treasury() {
        let bank = InMemoryBank::with_balance(contract("treasury"), 10);
        let whale = account("whale");
        bank.deposit(&whale, Amount::MAX);
        bank.deposit(&whale, 1);
        assert_eq!(bank.balance(&whale), Amount::MAX);

        assert_eq!(
            bank.transfer(&whale, 3).await,
            Err(TransferError::BalanceOverflow(whale.clone()))
        );
        assert_eq!(bank.balance(bank.treasury()), 10);
    }
}
