//! # fundsplit sender
//!
//! Owner-operated token distribution on top of the fundsplit primitives.
//!
//! - [`TokenSender`]: accepted-token list, batch transfers, minting, claims
//! - [`TokenLedger`]/[`TokenDirectory`]: seams to the token contracts
//! - [`InMemoryToken`]/[`InMemoryTokenDirectory`]: in-process implementations

pub mod report;
pub mod sender;
pub mod token;

pub use report::{BatchReport, Distribution, FailedDistribution, TokenBalance};
pub use sender::TokenSender;
pub use token::{InMemoryToken, InMemoryTokenDirectory, TokenDirectory, TokenLedger, TransferRecord};

/// Name reported by [`TokenSender::name`]
pub const SENDER_NAME: &str = "TokenSender";

/// Native units attached per minted token unit
pub const NATIVE_TO_TOKEN_RATE: u128 = 20;

/// Entries at or below this value are skipped when minting
pub const MINT_THRESHOLD: u128 = NATIVE_TO_TOKEN_RATE * 100;

/// Memo attached to batch token transfers
pub const DISTRIBUTION_MEMO: &str = "Token distribution from TokenSender";

/// Memo attached to owner token claims
pub const CLAIM_MEMO: &str = "Token claimed back from token sender contract";
