//! Error types for fundsplit
//!
//! Provides a unified error type and the transfer failure variants reported
//! by value and token collaborators.

use thiserror::Error;

use crate::types::{address::Address, payout::DistributionReceipt, Amount};

/// Result type alias using FundError
pub type Result<T> = std::result::Result<T, FundError>;

/// Unified error type for fundsplit operations
#[derive(Debug, Error)]
pub enum FundError {
    // Registry and set errors
    #[error("{0} not found. Can't be removed")]
    NotFound(String),

    // Distribution preconditions
    #[error("No fund categories have been set")]
    EmptyRegistry,

    #[error("No share has been set for the available fund categories")]
    ZeroWeight,

    // Authorization
    #[error("Only the owner can call this method (caller: {caller})")]
    Unauthorized { caller: Address },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    // Token sender errors
    #[error("{0} is not an accepted token")]
    TokenNotAccepted(String),

    #[error("{0} is not a valid contract address")]
    NotAContract(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    // Transfer errors
    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error(
        "Distribution aborted after {} settled payout(s): {source}",
        .receipt.settled.len()
    )]
    PartialDistribution {
        receipt: Box<DistributionReceipt>,
        source: TransferError,
    },

    #[error("Batch aborted after {delivered} delivery(ies) at {to}: {source}")]
    BatchAborted {
        delivered: usize,
        to: Address,
        source: TransferError,
    },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure reported by a value or token transfer collaborator
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("Transfer rejected: {0}")]
    Rejected(String),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Amount, available: Amount },

    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("Balance overflow for {0}")]
    BalanceOverflow(Address),
}

impl From<serde_json::Error> for FundError {
    fn from(err: serde_json::Error) -> Self {
        FundError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for FundError {
    fn from(err: anyhow::Error) -> Self {
        FundError::Internal(err.to_string())
    }
}
