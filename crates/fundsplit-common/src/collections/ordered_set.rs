//! Ordered set with swap-remove
//!
//! Keeps unique values in insertion order. Removal moves the last element
//! into the freed slot, so the relative order of the remaining elements is
//! only preserved up to that one move. Iteration order is deterministic for
//! a given history of adds and removes, which is all distribution needs.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{FundError, Result};

/// Ordered collection of unique values with swap-remove
#[derive(Debug, Clone)]
pub struct OrderedRemovableSet<T> {
    items: Vec<T>,
    /// Position of every value in `items`
    positions: HashMap<T, usize>,
}

impl<T> OrderedRemovableSet<T>
where
    T: Eq + Hash + Clone + fmt::Display,
{
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Append `value` unless it is already present
    ///
    /// Returns `true` if the value was inserted.
    pub fn add(&mut self, value: T) -> bool {
        if self.positions.contains_key(&value) {
            return false;
        }
        self.positions.insert(value.clone(), self.items.len());
        self.items.push(value);
        true
    }

    /// Remove `value`, filling its slot with the last element
    pub fn remove(&mut self, value: &T) -> Result<()> {
        let position = self
            .positions
            .remove(value)
            .ok_or_else(|| FundError::NotFound(value.to_string()))?;

        // Present in `positions` implies non-empty
        let Some(out) = self.items.pop() else {
            return Err(FundError::Internal("ordered set index out of sync".into()));
        };

        if &out != value {
            self.positions.insert(out.clone(), position);
            self.items[position] = out;
        }
        Ok(())
    }

    pub fn contains(&self, value: &T) -> bool {
        self.positions.contains_key(value)
    }

    /// Current position of `value`
    pub fn position(&self, value: &T) -> Option<usize> {
        self.positions.get(value).copied()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.positions.clear();
    }
}

impl<T> Default for OrderedRemovableSet<T>
where
    T: Eq + Hash + Clone + fmt::Display,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for OrderedRemovableSet<T>
where
    T: Eq + Hash + Clone + fmt::Display,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        for value in iter {
            set.add(value);
        }
        set
    }
}

impl<'a, T> IntoIterator for &'a OrderedRemovableSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: PartialEq> PartialEq for OrderedRemovableSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Eq> Eq for OrderedRemovableSet<T> {}

impl<T: Serialize> Serialize for OrderedRemovableSet<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for OrderedRemovableSet<T>
where
    T: Deserialize<'de> + Eq + Hash + Clone + fmt::Display,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let items = Vec::<T>::deserialize(deserializer)?;
        Ok(items.into_iter().collect())
    }
}
