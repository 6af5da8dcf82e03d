//! Batch inputs and results

use fundsplit_common::{Address, Amount};
use serde::{Deserialize, Serialize};

/// One recipient in a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub address: Address,
    pub value: Amount,
}

impl Distribution {
    pub fn new(address: Address, value: Amount) -> Self {
        Self { address, value }
    }
}

/// Entry whose transfer or mint failed without ending the batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedDistribution {
    pub distribution: Distribution,
    pub reason: String,
}

/// Outcome of a batch, entries in input order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub delivered: Vec<Distribution>,
    /// Entries not attempted (below the mint threshold)
    pub skipped: Vec<Distribution>,
    pub failed: Vec<FailedDistribution>,
}

impl BatchReport {
    pub fn delivered_value(&self) -> Amount {
        self.delivered.iter().map(|d| d.value).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Holding of one accepted token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub address: Address,
    pub name: String,
    pub balance: Amount,
}
