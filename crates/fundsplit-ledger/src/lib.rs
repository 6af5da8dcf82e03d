//! # fundsplit ledger
//!
//! Proportional-share fund distribution.
//!
//! ## Split Rule
//!
//! ```text
//! share_i = floor(w_i * remaining_amount / remaining_weight)
//! ```
//!
//! Shares are computed in registry order against what is still left of the
//! pool, so the last weighted category absorbs the rounding dust and the
//! payouts always sum to the pool.
//!
//! ## Components
//!
//! - [`CategoryRegistry`]: ordered, lockstep id/destination/weight store
//! - [`ProportionalDistributor`]: the pure split
//! - [`FundManager`]: owner gate, locking, transfers, events
//! - [`LedgerConfig`]: file and environment configuration
//! - [`LedgerMetrics`]: Prometheus counters

pub mod config;
pub mod distributor;
pub mod manager;
pub mod metrics;
pub mod registry;

pub use config::{CategorySeed, LedgerConfig};
pub use distributor::{proportional_share, ProportionalDistributor};
pub use manager::FundManager;
pub use metrics::LedgerMetrics;
pub use registry::CategoryRegistry;

/// Default service name, also used as the event source
pub const DEFAULT_SERVICE_NAME: &str = "fund-management";
