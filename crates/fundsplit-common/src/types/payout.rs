//! Payout records and distribution receipts

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{address::Address, Amount};

/// One category's share of a distribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub category_id: String,
    pub destination: Address,
    pub amount: Amount,
}

impl Payout {
    pub fn new(category_id: impl Into<String>, destination: Address, amount: Amount) -> Self {
        Self {
            category_id: category_id.into(),
            destination,
            amount,
        }
    }
}

/// Payout whose transfer failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedPayout {
    pub payout: Payout,
    pub reason: String,
}

/// Outcome of executing a distribution
///
/// `settled` holds the payouts whose transfers went through, in the order
/// they were applied. `settled + failed` always equals the computed payout
/// list when the distribution ran to completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionReceipt {
    /// Receipt ID (UUIDv7)
    pub id: Uuid,
    /// Digest of the registry snapshot the payouts were computed from
    pub snapshot_digest: String,
    /// Pool that was split
    pub total_amount: Amount,
    pub settled: Vec<Payout>,
    pub failed: Vec<FailedPayout>,
    /// Creation timestamp (Unix millis)
    pub created_at: i64,
}

impl DistributionReceipt {
    pub fn new(snapshot_digest: String, total_amount: Amount) -> Self {
        Self {
            id: Uuid::now_v7(),
            snapshot_digest,
            total_amount,
            settled: Vec::new(),
            failed: Vec::new(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Sum of settled payouts
    pub fn settled_amount(&self) -> Amount {
        self.settled.iter().map(|p| p.amount).sum()
    }

    /// Sum of payouts that failed to transfer
    pub fn failed_amount(&self) -> Amount {
        self.failed.iter().map(|f| f.payout.amount).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}
