//! Token contract seams
//!
//! The sender never touches token balances directly. It resolves a token
//! address through a [`TokenDirectory`] and calls the returned
//! [`TokenLedger`].

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use fundsplit_common::{Address, Amount, TransferError};
use parking_lot::RwLock;
use tracing::debug;

/// A fungible token contract
#[async_trait]
pub trait TokenLedger: Send + Sync {
    /// Contract address of the token
    fn address(&self) -> &Address;

    async fn name(&self) -> String;

    async fn balance_of(&self, owner: &Address) -> Amount;

    /// Move `value` from `from` to `to`, tagging the transfer with `memo`
    async fn transfer(
        &self,
        from: &Address,
        to: &Address,
        value: Amount,
        memo: &str,
    ) -> Result<(), TransferError>;

    /// Create `value` new tokens for `to`; `native_attached` is the native
    /// value paid to the token contract for the mint
    async fn mint(
        &self,
        to: &Address,
        value: Amount,
        native_attached: Amount,
    ) -> Result<(), TransferError>;
}

/// Resolves token addresses to ledgers
pub trait TokenDirectory: Send + Sync {
    fn resolve(&self, token: &Address) -> Option<Arc<dyn TokenLedger>>;
}

/// Record of a transfer seen by an [`InMemoryToken`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub from: Address,
    pub to: Address,
    pub value: Amount,
    pub memo: String,
}

/// In-process token with a balance map
pub struct InMemoryToken {
    address: Address,
    name: String,
    balances: DashMap<Address, Amount>,
    rejecting: RwLock<HashSet<Address>>,
    transfers: RwLock<Vec<TransferRecord>>,
    native_received: RwLock<Amount>,
}

impl InMemoryToken {
    pub fn new(address: Address, name: impl Into<String>) -> Self {
        Self {
            address,
            name: name.into(),
            balances: DashMap::new(),
            rejecting: RwLock::new(HashSet::new()),
            transfers: RwLock::new(Vec::new()),
            native_received: RwLock::new(0),
        }
    }

    /// Credit `value` to `who` outside of any transfer, saturating at
    /// `Amount::MAX`
    pub fn credit(&self, who: &Address, value: Amount) {
        let mut balance = self.balances.entry(who.clone()).or_insert(0);
        *balance = balance.saturating_add(value);
    }

    fn checked_credit(&self, who: &Address, value: Amount) -> Result<(), TransferError> {
        let mut balance = self.balances.entry(who.clone()).or_insert(0);
        *balance = balance
            .checked_add(value)
            .ok_or_else(|| TransferError::BalanceOverflow(who.clone()))?;
        Ok(())
    }

    pub fn balance(&self, who: &Address) -> Amount {
        self.balances.get(who).map(|b| *b).unwrap_or(0)
    }

    /// Make `who` refuse incoming tokens
    pub fn reject_deposits(&self, who: &Address) {
        self.rejecting.write().insert(who.clone());
    }

    pub fn transfers(&self) -> Vec<TransferRecord> {
        self.transfers.read().clone()
    }

    /// Native value attached to mints so far
    pub fn native_received(&self) -> Amount {
        *self.native_received.read()
    }

    pub fn total_supply(&self) -> Amount {
        self.balances.iter().map(|entry| *entry.value()).sum()
    }

    fn check_recipient(&self, to: &Address) -> Result<(), TransferError> {
        if self.rejecting.read().contains(to) {
            return Err(TransferError::Rejected(format!(
                "{to} does not accept {}",
                self.name
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TokenLedger for InMemoryToken {
    fn address(&self) -> &Address {
        &self.address
    }

    async fn name(&self) -> String {
        self.name.clone()
    }

    async fn balance_of(&self, owner: &Address) -> Amount {
        self.balance(owner)
    }

    async fn transfer(
        &self,
        from: &Address,
        to: &Address,
        value: Amount,
        memo: &str,
    ) -> Result<(), TransferError> {
        self.check_recipient(to)?;

        {
            let mut source = self.balances.entry(from.clone()).or_insert(0);
            if *source < value {
                return Err(TransferError::InsufficientFunds {
                    required: value,
                    available: *source,
                });
            }
            *source -= value;
        }
        if let Err(err) = self.checked_credit(to, value) {
            self.credit(from, value);
            return Err(err);
        }

        self.transfers.write().push(TransferRecord {
            from: from.clone(),
            to: to.clone(),
            value,
            memo: memo.to_string(),
        });
        debug!(token = %self.address, %from, %to, value, "Token transfer");
        Ok(())
    }

    async fn mint(
        &self,
        to: &Address,
        value: Amount,
        native_attached: Amount,
    ) -> Result<(), TransferError> {
        self.check_recipient(to)?;

        self.checked_credit(to, value)?;
        {
            let mut received = self.native_received.write();
            *received = received.saturating_add(native_attached);
        }
        debug!(token = %self.address, %to, value, native_attached, "Token mint");
        Ok(())
    }
}

/// Directory backed by a concurrent map
#[derive(Default)]
pub struct InMemoryTokenDirectory {
    tokens: DashMap<Address, Arc<dyn TokenLedger>>,
}

impl InMemoryTokenDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token under its own address
    pub fn register(&self, token: Arc<dyn TokenLedger>) {
        self.tokens.insert(token.address().clone(), token);
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl TokenDirectory for InMemoryTokenDirectory {
    fn resolve(&self, token: &Address) -> Option<Arc<dyn TokenLedger>> {
        self.tokens.get(token).map(|entry| entry.value().clone())
    }
}
