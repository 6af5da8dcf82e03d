//! # fundsplit common
//!
//! Shared types, errors, and collaborator seams for the fundsplit ledger.
//!
//! ## Core Types
//!
//! - [`Address`]: destination identity (plain account or contract)
//! - [`Category`]: weighted recipient bucket
//! - [`RegistrySnapshot`]: ordered copy of registry state for one distribution
//! - [`Payout`]/[`DistributionReceipt`]: distribution results
//!
//! ## Primitives
//!
//! - [`collections::ordered_set`]: ordered set with swap-remove
//! - [`transfer`]: value transfer trait, failure policy, in-memory bank
//! - [`events`]: ledger events and sinks

pub mod collections;
pub mod error;
pub mod events;
pub mod transfer;
pub mod types;

// Re-export commonly used types at crate root
pub use collections::OrderedRemovableSet;
pub use error::{FundError, Result, TransferError};
pub use events::{EventLog, EventRecord, EventSink, LedgerEvent, MemoryEventSink, TracingEventSink};
pub use transfer::{FailurePolicy, InMemoryBank, ValueTransfer};
pub use types::{
    address::{Address, AddressKind},
    category::{Category, RegistrySnapshot},
    payout::{DistributionReceipt, FailedPayout, Payout},
    Amount, Weight,
};

/// fundsplit version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Scale used when reporting a category's share as a percentage
pub const PERCENT_SCALE: u64 = 100;
