//! Category - weighted recipient bucket
//!
//! A category pairs a unique id with a destination and an integer weight.
//! Weights only mean something relative to the other weights of the same
//! registry. A snapshot is the ordered, immutable copy of every category
//! taken at the start of a distribution.

use serde::{Deserialize, Serialize};

use super::{address::Address, Weight};

/// Recipient category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Unique category id (e.g., "development", "marketing")
    pub id: String,
    /// Where this category's share is sent
    pub destination: Address,
    /// Relative weight; 0 is valid and receives nothing
    pub weight: Weight,
}

impl Category {
    pub fn new(id: impl Into<String>, destination: Address, weight: Weight) -> Self {
        Self {
            id: id.into(),
            destination,
            weight,
        }
    }
}

/// Ordered, immutable copy of registry state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    categories: Vec<Category>,
}

impl RegistrySnapshot {
    /// Build a snapshot from categories already in registry order
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Sum of all weights
    pub fn total_weight(&self) -> u128 {
        self.categories.iter().map(|c| c.weight as u128).sum()
    }

    /// Hex blake3 digest over ids, destinations, and weights in order
    ///
    /// Ties a distribution receipt to the exact registry state it was
    /// computed from.
    pub fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for category in &self.categories {
            hasher.update(&(category.id.len() as u64).to_le_bytes());
            hasher.update(category.id.as_bytes());
            hasher.update(category.destination.as_str().as_bytes());
            hasher.update(&category.weight.to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }

    pub fn into_categories(self) -> Vec<Category> {
        self.categories
    }
}

impl From<Vec<Category>> for RegistrySnapshot {
    fn from(categories: Vec<Category>) -> Self {
        Self::new(categories)
    }
}
