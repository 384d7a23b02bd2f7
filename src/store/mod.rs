//! Data stores and change records.
//!
//! - [`DataStore`] - path-addressed value tree, synchronous listeners
//! - [`ChangeRecord`] - immutable description of one mutation
//! - [`DataTypes`] - development-time schema for top-level keys

mod change;
mod data;
mod data_types;

pub use change::{Change, ChangeKind, ChangeOrigin, ChangeRecord};
pub use data::{DataStore, ListenerId};
pub use data_types::{DataType, DataTypes};
