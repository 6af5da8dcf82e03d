//! Category registry
//!
//! Ordered set of recipient categories. The id order, destinations, and
//! weights live behind one structure so they can only change together:
//! every id in the order has exactly one entry, and every entry has an id.

use std::collections::HashMap;

use fundsplit_common::{
    Address, Category, FundError, OrderedRemovableSet, RegistrySnapshot, Result, Weight,
    PERCENT_SCALE,
};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    destination: Address,
    weight: Weight,
}

/// Weighted recipient categories in deterministic order
#[derive(Debug, Clone, Default)]
pub struct CategoryRegistry {
    order: OrderedRemovableSet<String>,
    entries: HashMap<String, Entry>,
}

impl CategoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from a snapshot, keeping its order
    ///
    /// A repeated id keeps its first position and its last destination and
    /// weight, exactly as replaying the upserts would.
    pub fn from_snapshot(snapshot: RegistrySnapshot) -> Self {
        let mut registry = Self::new();
        for category in snapshot.into_categories() {
            registry.upsert(category.id, category.destination, category.weight);
        }
        registry
    }

    /// Insert a category, or overwrite destination and weight in place
    ///
    /// Returns `true` if `id` was new.
    pub fn upsert(&mut self, id: impl Into<String>, destination: Address, weight: Weight) -> bool {
        let id = id.into();
        let inserted = self.order.add(id.clone());
        debug!(category = %id, %destination, weight, inserted, "Upserted category");
        self.entries.insert(
            id,
            Entry {
                destination,
                weight,
            },
        );
        inserted
    }

    /// Remove a category and everything recorded for it
    pub fn remove(&mut self, id: &str) -> Result<Category> {
        let Some(entry) = self.entries.get(id) else {
            return Err(FundError::NotFound(id.to_string()));
        };
        let entry = entry.clone();

        self.order.remove(&id.to_string())?;
        self.entries.remove(id);
        debug!(category = %id, "Removed category");

        Ok(Category::new(id, entry.destination, entry.weight))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn destination(&self, id: &str) -> Option<&Address> {
        self.entries.get(id).map(|e| &e.destination)
    }

    pub fn weight(&self, id: &str) -> Option<Weight> {
        self.entries.get(id).map(|e| e.weight)
    }

    pub fn get(&self, id: &str) -> Option<Category> {
        self.entries
            .get(id)
            .map(|e| Category::new(id, e.destination.clone(), e.weight))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Category ids in iteration order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Iterate categories in order without copying the registry
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Address, Weight)> {
        self.order.iter().filter_map(move |id| {
            self.entries
                .get(id)
                .map(|e| (id.as_str(), &e.destination, e.weight))
        })
    }

    /// Ordered copy of every category
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot::new(
            self.iter()
                .map(|(id, destination, weight)| Category::new(id, destination.clone(), weight))
                .collect(),
        )
    }

    /// Sum of all weights
    pub fn total_weight(&self) -> u128 {
        self.entries.values().map(|e| e.weight as u128).sum()
    }

    /// Share of `id` in percent of the total weight
    ///
    /// Returns `None` for unknown ids and zero for every id while the total
    /// weight is zero.
    pub fn percentage_of(&self, id: &str) -> Option<Decimal> {
        let weight = self.weight(id)?;
        Some(percentage(weight, self.total_weight()))
    }

    /// Category id to destination, in order
    pub fn destinations(&self) -> Vec<(String, Address)> {
        self.iter()
            .map(|(id, destination, _)| (id.to_string(), destination.clone()))
            .collect()
    }

    /// Category id to percentage of total weight, in order
    pub fn percentages(&self) -> Vec<(String, Decimal)> {
        let total = self.total_weight();
        self.iter()
            .map(|(id, _, weight)| (id.to_string(), percentage(weight, total)))
            .collect()
    }

    /// Category id to raw weight, in order
    pub fn weights(&self) -> Vec<(String, Weight)> {
        self.iter()
            .map(|(id, _, weight)| (id.to_string(), weight))
            .collect()
    }
}

impl Serialize for CategoryRegistry {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.snapshot().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CategoryRegistry {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        RegistrySnapshot::deserialize(deserializer).map(Self::from_snapshot)
    }
}

/// `weight * 100 / total`, zero when `total` is zero
///
/// Totals beyond `Decimal` range fall back to integer division.
fn percentage(weight: Weight, total: u128) -> Decimal {
    if total == 0 {
        return Decimal::ZERO;
    }
    match Decimal::from_u128(total) {
        Some(total) => Decimal::from(weight) * Decimal::from(PERCENT_SCALE) / total,
        None => Decimal::from_u128(weight as u128 * PERCENT_SCALE as u128 / total)
            .unwrap_or(Decimal::ZERO),
    }
}
