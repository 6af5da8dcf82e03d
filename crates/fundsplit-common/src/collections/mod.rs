//! Collection primitives shared by the registry and the token sender

pub mod ordered_set;

pub use ordered_set::OrderedRemovableSet;
