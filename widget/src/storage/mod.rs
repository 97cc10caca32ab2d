//! Durable key/value storage for the widget
//!
//! This module mirrors the browser's local storage: a flat namespace of string
//! keys holding string values. The `KeyValueStorage` trait can be implemented by
//! different backends; an in-memory and a file-backed adapter are provided.

pub mod adapters;
pub mod store;

pub use adapters::{FileStorage, InMemoryStorage};
pub use store::{KeyValueStorage, StorageError, StorageRef};
