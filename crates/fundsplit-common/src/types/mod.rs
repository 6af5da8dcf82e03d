//! Core data types for fundsplit

pub mod address;
pub mod category;
pub mod payout;

/// Indivisible unit of value (e.g., loop, wei)
pub type Amount = u128;

/// Relative category weight
pub type Weight = u64;
