//! # Store Boundary
//!
//! The remote key-value store is consumed through the [`Store`] trait. The
//! mapper never talks to a wire protocol itself; it only needs table lookup
//! and creation, single-item get/put/delete, and batch writes.
//!
//! Implementations must report the signals the mapper reacts to through
//! [`StoreError`]: a missing table triggers creation, a missing key becomes
//! [`Error::DataNotFound`](crate::Error::DataNotFound) on fetch, and
//! [`StoreError::ThroughputExceeded`] is the one transient condition the batch
//! path recognizes.
//!
//! Two implementations ship with the crate: [`MemoryStore`](crate::memory::MemoryStore)
//! for running whole flows in-process and [`MockStore`](crate::mock::MockStore) for
//! scripting exact responses.

use crate::value::{Item, Value};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Signals raised by a store implementation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Table not found: {0}")]
    TableNotFound(String),
    #[error("Key {key} not found in table {table}")]
    KeyNotFound { table: String, key: String },
    #[error("Provisioned throughput exceeded: {0}")]
    ThroughputExceeded(String),
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Primitive type of the hash key attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyType {
    String,
    Number,
}

/// The primary key a table is created with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySchema {
    pub hash_key_name: String,
    pub hash_key_type: KeyType,
}

impl KeySchema {
    /// A string-typed hash key, which is what generated keys use.
    pub fn string(hash_key_name: impl Into<String>) -> Self {
        Self {
            hash_key_name: hash_key_name.into(),
            hash_key_type: KeyType::String,
        }
    }
}

/// Handle to an existing remote table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub key_schema: KeySchema,
    pub read_units: u64,
    pub write_units: u64,
}

/// Operations the mapper needs from the remote store.
///
/// Every call is one request/response round trip. Implementations must not
/// retry on the caller's behalf.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Returns the table or [`StoreError::TableNotFound`].
    async fn lookup_table(&self, name: &str) -> Result<Table, StoreError>;

    async fn create_table(
        &self,
        name: &str,
        key_schema: &KeySchema,
        read_units: u64,
        write_units: u64,
    ) -> Result<Table, StoreError>;

    /// Fetches one item. `attributes` restricts the returned attributes; the
    /// hash key is always included. Missing keys are [`StoreError::KeyNotFound`].
    async fn get_item(
        &self,
        table: &Table,
        key: &Value,
        attributes: Option<&[String]>,
    ) -> Result<Item, StoreError>;

    /// Writes the whole item, replacing any stored version.
    async fn put_item(&self, table: &Table, key: &Value, attrs: &Item) -> Result<(), StoreError>;

    async fn delete_item(&self, table: &Table, key: &Value) -> Result<(), StoreError>;

    /// Writes every item in one request. Items carry their hash key attribute.
    async fn batch_write(&self, table: &Table, items: &[Item]) -> Result<(), StoreError>;
}

/// Renders a key for log fields and error messages.
pub fn display_key(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
