//! Address - destination identity for payouts and tokens
//!
//! Addresses are 42-character strings: a two letter kind prefix followed by
//! 40 lowercase hex characters.
//! - `hx...`: plain account, owned by a key holder
//! - `cx...`: contract, backed by code (token ledgers, treasuries)
//!
//! The kind matters to the token sender's failure policy, which may treat
//! failed deliveries to contracts as recoverable.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FundError;

/// Number of hex characters after the kind prefix
pub const ADDRESS_BODY_LEN: usize = 40;

/// Address kind classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressKind {
    /// Plain account
    Account,
    /// Contract
    Contract,
}

impl AddressKind {
    /// Two letter prefix used in the textual form
    pub fn prefix(&self) -> &'static str {
        match self {
            AddressKind::Account => "hx",
            AddressKind::Contract => "cx",
        }
    }
}

impl fmt::Display for AddressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressKind::Account => write!(f, "account"),
            AddressKind::Contract => write!(f, "contract"),
        }
    }
}

/// Destination identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Parse and validate a textual address
    pub fn parse(value: &str) -> Result<Self, FundError> {
        let value = value.trim();
        let body = value
            .strip_prefix(AddressKind::Account.prefix())
            .or_else(|| value.strip_prefix(AddressKind::Contract.prefix()))
            .ok_or_else(|| FundError::InvalidAddress(format!("{value}: unknown prefix")))?;

        if body.len() != ADDRESS_BODY_LEN {
            return Err(FundError::InvalidAddress(format!(
                "{value}: expected {ADDRESS_BODY_LEN} hex characters, got {}",
                body.len()
            )));
        }

        if !body.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)) {
            return Err(FundError::InvalidAddress(format!(
                "{value}: body must be lowercase hex"
            )));
        }

        Ok(Self(value.to_string()))
    }

    /// Derive a deterministic address from a label
    ///
    /// Uses the first 20 bytes of the blake3 hash of `label`. Handy for
    /// configuration seeds and tests where a stable address is needed.
    ///
    /// # Example
    /// ```
    /// use fundsplit_common::types::address::{Address, AddressKind};
    ///
    /// let treasury = Address::derive(AddressKind::Contract, b"treasury");
    /// assert!(treasury.is_contract());
    /// assert_eq!(treasury, Address::derive(AddressKind::Contract, b"treasury"));
    /// ```
    pub fn derive(kind: AddressKind, label: &[u8]) -> Self {
        let hash = blake3::hash(label);
        let hex = hash.to_hex();
        Self(format!("{}{}", kind.prefix(), &hex.as_str()[..ADDRESS_BODY_LEN]))
    }

    /// Kind encoded in the prefix
    pub fn kind(&self) -> AddressKind {
        if self.0.starts_with(AddressKind::Contract.prefix()) {
            AddressKind::Contract
        } else {
            AddressKind::Account
        }
    }

    #[inline]
    pub fn is_contract(&self) -> bool {
        self.kind() == AddressKind::Contract
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = FundError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = FundError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}
