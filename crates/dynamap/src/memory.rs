//! # In-Process Store
//!
//! [`MemoryStore`] keeps every table in a `HashMap` behind a `tokio` mutex.
//! It behaves like the remote service for the signals the mapper depends on:
//!
//! * looking up an unknown table is [`StoreError::TableNotFound`]
//! * reading or deleting an unknown key is [`StoreError::KeyNotFound`]
//! * a batch larger than the table's write capacity, or one issued after
//!   [`MemoryStore::throttle_next_batch`], is [`StoreError::ThroughputExceeded`]
//!
//! Each call is handled atomically under the lock, one at a time, so flows
//! run against it are deterministic.

use crate::store::{display_key, KeySchema, Store, StoreError, Table};
use crate::value::{Item, Value};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

struct MemoryTable {
    table: Table,
    items: HashMap<String, Item>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, MemoryTable>>,
    throttle_next: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `batch_write` fail with [`StoreError::ThroughputExceeded`].
    pub fn throttle_next_batch(&self) {
        self.throttle_next.store(true, Ordering::SeqCst);
    }

    pub async fn table_count(&self) -> usize {
        self.tables.lock().await.len()
    }

    /// Items stored in `table`; zero if the table does not exist.
    pub async fn item_count(&self, table: &str) -> usize {
        self.tables
            .lock()
            .await
            .get(table)
            .map_or(0, |t| t.items.len())
    }

    /// Every item stored in `table`, in no particular order.
    pub async fn items(&self, table: &str) -> Vec<Item> {
        self.tables
            .lock()
            .await
            .get(table)
            .map(|t| t.items.values().cloned().collect())
            .unwrap_or_default()
    }

    /// The stored item as written, bypassing attribute projection.
    pub async fn raw_item(&self, table: &str, key: &Value) -> Option<Item> {
        self.tables
            .lock()
            .await
            .get(table)
            .and_then(|t| t.items.get(&display_key(key)).cloned())
    }
}

fn not_found(table: &Table, key: &Value) -> StoreError {
    StoreError::KeyNotFound {
        table: table.name.clone(),
        key: display_key(key),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn lookup_table(&self, name: &str) -> Result<Table, StoreError> {
        let tables = self.tables.lock().await;
        let found = tables.get(name).map(|t| t.table.clone());
        debug!(table = name, found = found.is_some(), "Lookup");
        found.ok_or_else(|| StoreError::TableNotFound(name.to_string()))
    }

    async fn create_table(
        &self,
        name: &str,
        key_schema: &KeySchema,
        read_units: u64,
        write_units: u64,
    ) -> Result<Table, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.contains_key(name) {
            warn!(table = name, "Table already exists");
            return Err(StoreError::Backend(format!("Table already exists: {name}")));
        }
        let table = Table {
            name: name.to_string(),
            key_schema: key_schema.clone(),
            read_units,
            write_units,
        };
        tables.insert(
            name.to_string(),
            MemoryTable {
                table: table.clone(),
                items: HashMap::new(),
            },
        );
        info!(table = name, size = tables.len(), "Table created");
        Ok(table)
    }

    async fn get_item(
        &self,
        table: &Table,
        key: &Value,
        attributes: Option<&[String]>,
    ) -> Result<Item, StoreError> {
        let tables = self.tables.lock().await;
        let stored = tables
            .get(&table.name)
            .ok_or_else(|| StoreError::TableNotFound(table.name.clone()))?;
        let item = stored
            .items
            .get(&display_key(key))
            .ok_or_else(|| not_found(table, key))?;
        debug!(table = %table.name, key = %display_key(key), "Get");

        Ok(match attributes {
            None => item.clone(),
            Some(attributes) => item
                .iter()
                .filter(|(name, _)| {
                    *name == &table.key_schema.hash_key_name || attributes.contains(name)
                })
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        })
    }

    async fn put_item(&self, table: &Table, key: &Value, attrs: &Item) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        let stored = tables
            .get_mut(&table.name)
            .ok_or_else(|| StoreError::TableNotFound(table.name.clone()))?;
        let mut item = attrs.clone();
        item.insert(table.key_schema.hash_key_name.clone(), key.clone());
        stored.items.insert(display_key(key), item);
        info!(table = %table.name, key = %display_key(key), size = stored.items.len(), "Put");
        Ok(())
    }

    async fn delete_item(&self, table: &Table, key: &Value) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        let stored = tables
            .get_mut(&table.name)
            .ok_or_else(|| StoreError::TableNotFound(table.name.clone()))?;
        if stored.items.remove(&display_key(key)).is_none() {
            warn!(table = %table.name, key = %display_key(key), "Not found");
            return Err(not_found(table, key));
        }
        info!(table = %table.name, key = %display_key(key), size = stored.items.len(), "Deleted");
        Ok(())
    }

    async fn batch_write(&self, table: &Table, items: &[Item]) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        let stored = tables
            .get_mut(&table.name)
            .ok_or_else(|| StoreError::TableNotFound(table.name.clone()))?;

        let throttled = self.throttle_next.swap(false, Ordering::SeqCst);
        if throttled || items.len() as u64 > stored.table.write_units {
            warn!(table = %table.name, count = items.len(), write_units = stored.table.write_units, "Throttled");
            return Err(StoreError::ThroughputExceeded(format!(
                "The level of configured provisioned throughput for table {} was exceeded",
                table.name
            )));
        }

        let hash_key_name = &table.key_schema.hash_key_name;
        let mut keyed = Vec::with_capacity(items.len());
        for item in items {
            let key = item.get(hash_key_name).ok_or_else(|| {
                StoreError::Backend(format!("Item is missing hash key attribute {hash_key_name}"))
            })?;
            keyed.push((display_key(key), item.clone()));
        }
        stored.items.extend(keyed);
        info!(table = %table.name, count = items.len(), size = stored.items.len(), "Batch written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(value: Value) -> Item {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("items are objects"),
        }
    }

    async fn table(store: &MemoryStore, write_units: u64) -> Table {
        store
            .create_table("Invoice", &KeySchema::string("id"), 5, write_units)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn unknown_table_is_reported() {
        let store = MemoryStore::new();
        let err = store.lookup_table("Invoice").await.unwrap_err();
        assert_eq!(err, StoreError::TableNotFound("Invoice".into()));

        let created = table(&store, 5).await;
        assert_eq!(store.lookup_table("Invoice").await.unwrap(), created);
        assert!(store
            .create_table("Invoice", &KeySchema::string("id"), 5, 5)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn put_get_delete() {
        let store = MemoryStore::new();
        let table = table(&store, 5).await;
        let key = json!("k1");

        store
            .put_item(&table, &key, &item(json!({"amount": 3, "tax": 1})))
            .await
            .unwrap();
        let fetched = store.get_item(&table, &key, None).await.unwrap();
        assert_eq!(fetched, item(json!({"id": "k1", "amount": 3, "tax": 1})));

        let projected = store
            .get_item(&table, &key, Some(&["tax".to_string()]))
            .await
            .unwrap();
        assert_eq!(projected, item(json!({"id": "k1", "tax": 1})));

        store.delete_item(&table, &key).await.unwrap();
        assert!(matches!(
            store.get_item(&table, &key, None).await,
            Err(StoreError::KeyNotFound { .. })
        ));
        assert!(matches!(
            store.delete_item(&table, &key).await,
            Err(StoreError::KeyNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn batch_beyond_capacity_is_throttled() {
        let store = MemoryStore::new();
        let table = table(&store, 2).await;
        let items = vec![
            item(json!({"id": "a"})),
            item(json!({"id": "b"})),
            item(json!({"id": "c"})),
        ];
        let err = store.batch_write(&table, &items).await.unwrap_err();
        assert!(matches!(err, StoreError::ThroughputExceeded(_)));
        assert_eq!(store.item_count("Invoice").await, 0);

        store.batch_write(&table, &items[..2]).await.unwrap();
        assert_eq!(store.item_count("Invoice").await, 2);
        assert_eq!(store.items("Invoice").await.len(), 2);
    }

    #[tokio::test]
    async fn throttle_applies_to_one_batch() {
        let store = MemoryStore::new();
        let table = table(&store, 5).await;
        let items = vec![item(json!({"id": "a"}))];

        store.throttle_next_batch();
        assert!(store.batch_write(&table, &items).await.is_err());
        store.batch_write(&table, &items).await.unwrap();
        assert!(store.raw_item("Invoice", &json!("a")).await.is_some());
    }
}
