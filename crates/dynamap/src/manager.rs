//! # Table Manager
//!
//! The per-type façade over the remote store. One [`TableManager`] is bound to
//! each registered, non-abstract type; it ensures the backing table exists and
//! translates between [`Record`]s and raw [`Item`]s.
//!
//! ## Operations
//!
//! * **ensure_table**: looks the table up and creates it on
//!   [`StoreError::TableNotFound`]. Concurrent creators are not coordinated;
//!   whichever create the store accepts first wins.
//! * **create_item**: validates each payload through a transient record,
//!   generates a hash key when none is supplied, fills defaults, and writes
//!   each item unless the call is preparing a batch.
//! * **get_item**: fetches by key and rebuilds a record. The returned
//!   [`ItemSession`] carries the raw item for a later `update_item`.
//! * **update_item**: applies changes to the session's item and writes it
//!   back. An empty session is an [`Error::StaleUpdate`].
//! * **delete_item**: fetches, then deletes. A missing key surfaces as the
//!   store's own [`StoreError::KeyNotFound`].
//! * **bulk_insert**: prepares every payload and submits one batch write.
//!   Throughput exhaustion is reported as [`BatchOutcome::Throttled`] instead
//!   of an error; nothing is retried.
//! * **save**: the record lifecycle. See [`TableManager::save`].

use crate::changeset::ChangeSet;
use crate::error::{Error, Result};
use crate::options::Options;
use crate::record::Record;
use crate::store::{display_key, Store, StoreError, Table};
use crate::value::{is_truthy, Item, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Raw item fetched by [`TableManager::get_item`], kept for a later update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemSession {
    fetched: Option<FetchedItem>,
}

#[derive(Debug, Clone, PartialEq)]
struct FetchedItem {
    key: Value,
    item: Item,
}

impl ItemSession {
    /// A session with nothing fetched; updating through it fails.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fetched.is_none()
    }

    pub fn key(&self) -> Option<&Value> {
        self.fetched.as_ref().map(|f| &f.key)
    }

    /// The raw item as last fetched or written.
    pub fn item(&self) -> Option<&Item> {
        self.fetched.as_ref().map(|f| &f.item)
    }
}

/// Result of [`TableManager::get_item`].
#[derive(Debug, Clone)]
pub struct Fetched {
    pub record: Record,
    pub session: ItemSession,
}

/// Result of a batch insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Written { count: usize },
    /// The store refused the batch for lack of throughput; carries its message.
    Throttled { message: String },
}

/// Result of [`TableManager::save`].
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Created { key: Value },
    Updated { changed: Vec<String> },
    /// The stored version already matched; nothing was written.
    Unchanged,
}

pub struct TableManager<S: Store> {
    options: Arc<Options>,
    store: Arc<S>,
    read_units: u64,
    write_units: u64,
}

impl<S: Store> Clone for TableManager<S> {
    fn clone(&self) -> Self {
        Self {
            options: Arc::clone(&self.options),
            store: Arc::clone(&self.store),
            read_units: self.read_units,
            write_units: self.write_units,
        }
    }
}

impl<S: Store> TableManager<S> {
    /// Binds a manager to a type. `read_units`/`write_units` are the
    /// process-wide defaults; the type's own capacity overrides them.
    pub fn new(options: Arc<Options>, store: Arc<S>, read_units: u64, write_units: u64) -> Self {
        Self {
            options,
            store,
            read_units,
            write_units,
        }
    }

    pub fn options(&self) -> &Arc<Options> {
        &self.options
    }

    pub fn table_name(&self) -> &str {
        self.options.table_name()
    }

    /// Capacity the table is created with.
    pub fn capacity(&self) -> (u64, u64) {
        (
            self.options.read_units().unwrap_or(self.read_units),
            self.options.write_units().unwrap_or(self.write_units),
        )
    }

    /// A fresh random hash key.
    pub fn generate_hash_key() -> Value {
        Value::String(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Returns the backing table, creating it if the store does not know it.
    #[instrument(skip(self), fields(table = %self.options.table_name()))]
    pub async fn ensure_table(&self) -> Result<Table> {
        let key_schema = self.options.key_schema()?;
        match self.store.lookup_table(self.options.table_name()).await {
            Ok(table) => Ok(table),
            Err(StoreError::TableNotFound(_)) => {
                let (read_units, write_units) = self.capacity();
                let table = self
                    .store
                    .create_table(self.options.table_name(), &key_schema, read_units, write_units)
                    .await?;
                info!(read_units, write_units, "Created table");
                Ok(table)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Validates and prepares each payload, writing it unless `batch` is set.
    ///
    /// Every payload is validated before anything is written. The prepared
    /// items (hash key included) are returned either way; with `batch` set
    /// nothing touches the store.
    #[instrument(skip(self, data), fields(table = %self.options.table_name(), count = data.len()))]
    pub async fn create_item(&self, data: Vec<Item>, batch: bool) -> Result<Vec<Item>> {
        let hash_key_name = self.options.require_hash_key()?;

        let mut prepared = Vec::with_capacity(data.len());
        for mut payload in data {
            let key = match payload.get(hash_key_name).filter(|k| is_truthy(k)) {
                Some(key) => key.clone(),
                None => Self::generate_hash_key(),
            };
            payload.insert(hash_key_name.to_string(), key);

            let mut record = Record::from_fields(Arc::clone(&self.options), payload)?;
            if let Err(e) = record.clean_fields(&[]) {
                warn!(error = %e, "Validation failed");
                return Err(e);
            }
            let item: Item = record
                .to_item()
                .into_iter()
                .filter(|(_, value)| !value.is_null())
                .collect();
            debug!(?item, "Prepared");
            prepared.push(item);
        }

        if !batch {
            let table = self.ensure_table().await?;
            for item in &prepared {
                let (key, attrs) = split_key(hash_key_name, item);
                self.store.put_item(&table, &key, &attrs).await?;
                info!(key = %display_key(&key), "Created");
            }
        }
        Ok(prepared)
    }

    /// Fetches one item by key and rebuilds a record from it.
    ///
    /// `attributes` limits what is fetched; fields outside it are rebuilt from
    /// their defaults. A missing key is [`Error::DataNotFound`].
    #[instrument(skip(self, key), fields(table = %self.options.table_name(), key = %display_key(key)))]
    pub async fn get_item(&self, key: &Value, attributes: Option<&[String]>) -> Result<Fetched> {
        let hash_key_name = self.options.require_hash_key()?;
        let table = self.ensure_table().await?;

        let item = match self.store.get_item(&table, key, attributes).await {
            Ok(item) => item,
            Err(StoreError::KeyNotFound { .. }) => {
                warn!("Not found");
                return Err(Error::DataNotFound(format!(
                    "Hash key {} is invalid",
                    display_key(key)
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let kwargs: Item = self
            .options
            .attnames()
            .map(|attname| {
                let value = item.get(attname).cloned().unwrap_or(Value::Null);
                (attname.to_string(), value)
            })
            .collect();
        let mut record = Record::from_fields(Arc::clone(&self.options), kwargs)?;
        let stored_key = item.get(hash_key_name).cloned().unwrap_or_else(|| key.clone());
        record.set(hash_key_name, stored_key)?;
        debug!(?item, "Fetched");

        Ok(Fetched {
            record,
            session: ItemSession {
                fetched: Some(FetchedItem {
                    key: key.clone(),
                    item,
                }),
            },
        })
    }

    /// Applies `updates` to the session's fetched item and writes it back.
    #[instrument(skip(self, session, updates), fields(table = %self.options.table_name()))]
    pub async fn update_item(&self, session: &mut ItemSession, updates: Item) -> Result<()> {
        let hash_key_name = self.options.require_hash_key()?;
        let Some(fetched) = session.fetched.as_mut() else {
            warn!("Update without a fetched item");
            return Err(Error::StaleUpdate);
        };

        let changed: Vec<&str> = updates.keys().map(String::as_str).collect();
        debug!(?changed, "Applying updates");
        for (attname, value) in &updates {
            fetched.item.insert(attname.clone(), value.clone());
        }

        let table = self.ensure_table().await?;
        let (_, attrs) = split_key(hash_key_name, &fetched.item);
        self.store.put_item(&table, &fetched.key, &attrs).await?;
        info!(key = %display_key(&fetched.key), fields = updates.len(), "Updated");
        Ok(())
    }

    /// Deletes the item stored under `key`.
    #[instrument(skip(self, key), fields(table = %self.options.table_name(), key = %display_key(key)))]
    pub async fn delete_item(&self, key: &Value) -> Result<()> {
        self.options.require_hash_key()?;
        let table = self.ensure_table().await?;
        self.store.get_item(&table, key, None).await?;
        self.store.delete_item(&table, key).await?;
        info!("Deleted");
        Ok(())
    }

    /// Prepares every payload and writes them in one batch.
    #[instrument(skip(self, items), fields(table = %self.options.table_name(), count = items.len()))]
    pub async fn bulk_insert(&self, items: Vec<Item>) -> Result<BatchOutcome> {
        let prepared = self.create_item(items, true).await?;
        let table = self.ensure_table().await?;
        match self.store.batch_write(&table, &prepared).await {
            Ok(()) => {
                info!(count = prepared.len(), "Batch written");
                Ok(BatchOutcome::Written {
                    count: prepared.len(),
                })
            }
            Err(StoreError::ThroughputExceeded(message)) => {
                warn!(%message, "Batch throttled");
                Ok(BatchOutcome::Throttled { message })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Creates or updates `record`.
    ///
    /// A record with a bound hash key is updated: the stored version is
    /// fetched, compared field by field, and only the changed attributes are
    /// written. Nothing is written when nothing changed.
    ///
    /// Any other record is created from its truthy fields. The stored
    /// attributes, cleaned values and generated hash key included, are then
    /// bound back onto it.
    #[instrument(skip(self, record), fields(table = %self.options.table_name()))]
    pub async fn save(&self, record: &mut Record) -> Result<SaveOutcome> {
        let hash_key_name = self.options.require_hash_key()?;

        if let Some(key) = record.hash_key() {
            let Fetched {
                record: stored,
                mut session,
            } = self.get_item(&key, None).await?;
            let changes = ChangeSet::between(&stored, record);
            if changes.is_empty() {
                debug!(key = %display_key(&key), "Unchanged");
                return Ok(SaveOutcome::Unchanged);
            }
            let changed = changes.keys();
            self.update_item(&mut session, changes.into_item()).await?;
            Ok(SaveOutcome::Updated { changed })
        } else {
            let payload = record.to_create_payload();
            let prepared = self.create_item(vec![payload], false).await?;
            let item = prepared.into_iter().next().ok_or_else(|| {
                Error::Store(StoreError::Backend("create returned no item".to_string()))
            })?;
            let key = item.get(hash_key_name).cloned().unwrap_or(Value::Null);
            for (attname, value) in item {
                record.set(&attname, value)?;
            }
            Ok(SaveOutcome::Created { key })
        }
    }
}

/// Splits an item into its hash key and the remaining attributes.
fn split_key(hash_key_name: &str, item: &Item) -> (Value, Item) {
    let mut attrs = item.clone();
    let key = attrs.remove(hash_key_name).unwrap_or(Value::Null);
    (key, attrs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldDescriptor;
    use crate::memory::MemoryStore;
    use crate::options::Meta;
    use crate::registry::{ModelDefinition, ModelType, Registry};
    use crate::Settings;
    use serde_json::json;

    fn invoice() -> (Arc<MemoryStore>, ModelType<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let mut registry = Registry::new(Settings::new("a", "b"), Arc::clone(&store));
        let model = registry
            .register(
                ModelDefinition::new("Invoice")
                    .field(FieldDescriptor::char("id").blank())
                    .field(FieldDescriptor::integer("amount").blank())
                    .field(FieldDescriptor::char("note").blank())
                    .meta(Meta::new().hash_key_name("id").read_units(3)),
            )
            .unwrap();
        (store, model)
    }

    fn item(value: Value) -> Item {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("items are objects"),
        }
    }

    #[tokio::test]
    async fn ensure_table_creates_once_with_type_capacity() {
        let (store, model) = invoice();
        let objects = model.objects().unwrap();

        let first = objects.ensure_table().await.unwrap();
        let second = objects.ensure_table().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.read_units, 3);
        assert_eq!(first.write_units, crate::config::DEFAULT_WRITE_UNITS);
        assert_eq!(store.table_count().await, 1);
    }

    #[tokio::test]
    async fn create_generates_distinct_keys() {
        let (_, model) = invoice();
        let objects = model.objects().unwrap();
        let prepared = objects
            .create_item(vec![item(json!({"amount": 1})), item(json!({"amount": "2"}))], false)
            .await
            .unwrap();
        assert_eq!(prepared.len(), 2);
        assert_ne!(prepared[0]["id"], prepared[1]["id"]);
        assert_eq!(prepared[1]["amount"], json!(2));
    }

    #[tokio::test]
    async fn create_validates_every_payload_before_writing() {
        let (store, model) = invoice();
        let objects = model.objects().unwrap();
        let err = objects
            .create_item(
                vec![item(json!({"id": "ok", "amount": 1})), item(json!({"amount": "lots"}))],
                false,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(store.item_count("Invoice").await, 0);
    }

    #[tokio::test]
    async fn created_record_holds_cleaned_values() {
        let (store, model) = invoice();
        let objects = model.objects().unwrap();
        let mut record = model.from_fields(item(json!({"amount": "40"}))).unwrap();

        let SaveOutcome::Created { key } = objects.save(&mut record).await.unwrap() else {
            panic!("expected a create");
        };
        assert_eq!(record.get("amount"), Some(json!(40)));
        assert_eq!(record.hash_key(), Some(key.clone()));

        assert_eq!(objects.save(&mut record).await.unwrap(), SaveOutcome::Unchanged);
        let stored = store.raw_item("Invoice", &key).await.unwrap();
        assert_eq!(stored["amount"], json!(40));
    }

    #[tokio::test]
    async fn update_requires_a_fetch() {
        let (_, model) = invoice();
        let objects = model.objects().unwrap();
        let err = objects
            .update_item(&mut ItemSession::new(), item(json!({"amount": 5})))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::StaleUpdate));
    }

    #[tokio::test]
    async fn missing_hash_key_is_a_configuration_error() {
        let store = Arc::new(MemoryStore::new());
        let mut registry = Registry::new(Settings::new("a", "b"), store);
        let model = registry
            .register(ModelDefinition::new("Loose").field(FieldDescriptor::char("name")))
            .unwrap();
        let err = model.objects().unwrap().ensure_table().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Configuration(crate::ConfigurationError::MissingHashKey { .. })
        ));
    }

    #[tokio::test]
    async fn delete_propagates_store_not_found() {
        let (_, model) = invoice();
        let err = model
            .objects()
            .unwrap()
            .delete_item(&json!("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::KeyNotFound { .. })));
    }
}
