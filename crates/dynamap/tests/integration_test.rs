use dynamap::field::FieldDescriptor;
use dynamap::memory::MemoryStore;
use dynamap::mock::MockStore;
use dynamap::{
    BatchOutcome, ConfigurationError, Error, Item, Meta, ModelDefinition, ModelType, Registry,
    SaveOutcome, Settings, StoreError, Value,
};
use serde_json::json;
use std::sync::Arc;

fn item(value: Value) -> Item {
    match value {
        Value::Object(map) => map,
        _ => unreachable!("items are objects"),
    }
}

fn widget() -> ModelDefinition {
    ModelDefinition::new("Widget")
        .field(FieldDescriptor::char("id").blank())
        .field(FieldDescriptor::integer("a").blank())
        .field(FieldDescriptor::char("b").blank())
        .meta(Meta::new().hash_key_name("id"))
}

fn register<S: dynamap::Store>(store: Arc<S>, definition: ModelDefinition) -> ModelType<S> {
    Registry::new(Settings::new("AKIA", "secret"), store)
        .register(definition)
        .expect("registration failed")
}

/// Create, fetch, update through save, and delete against one table.
#[tokio::test]
async fn test_full_record_lifecycle() {
    let store = Arc::new(MemoryStore::new());
    let widget = register(Arc::clone(&store), widget());
    let objects = widget.objects().unwrap();

    // Round trip with a caller-chosen key
    let prepared = objects
        .create_item(vec![item(json!({"id": "k1", "a": 1, "b": "x"}))], false)
        .await
        .expect("Failed to create item");
    assert_eq!(prepared[0]["id"], json!("k1"));

    let fetched = objects
        .get_item(&json!("k1"), None)
        .await
        .expect("Failed to get item");
    assert_eq!(fetched.record.get("a"), Some(json!(1)));
    assert_eq!(fetched.record.get("b"), Some(json!("x")));
    assert_eq!(fetched.record.hash_key(), Some(json!("k1")));
    assert!(fetched.record.is_persisted());

    // Saving an untouched copy writes nothing
    let mut record = fetched.record;
    assert_eq!(record.save(objects).await.unwrap(), SaveOutcome::Unchanged);

    // One changed field is one changed attname
    record.set("b", "y").unwrap();
    assert_eq!(
        record.save(objects).await.unwrap(),
        SaveOutcome::Updated {
            changed: vec!["b".to_string()]
        }
    );
    let stored = store.raw_item("Widget", &json!("k1")).await.unwrap();
    assert_eq!(stored["b"], json!("y"));
    assert_eq!(stored["a"], json!(1));

    objects.delete_item(&json!("k1")).await.expect("Failed to delete");
    assert_eq!(store.item_count("Widget").await, 0);
}

#[tokio::test]
async fn test_save_creates_transient_record() {
    let store = Arc::new(MemoryStore::new());
    let widget = register(Arc::clone(&store), widget());
    let objects = widget.objects().unwrap();

    let mut record = widget
        .from_fields(item(json!({"a": 0, "b": ""})))
        .unwrap();
    assert!(!record.is_persisted());
    assert!(record.to_create_payload().is_empty());

    let SaveOutcome::Created { key } = record.save(objects).await.unwrap() else {
        panic!("expected a create");
    };
    assert!(record.is_persisted());
    assert_eq!(record.hash_key(), Some(key.clone()));

    let stored = store.raw_item("Widget", &key).await.unwrap();
    assert!(!stored.contains_key("b"));
}

#[tokio::test]
async fn test_missing_key_is_data_not_found() {
    let widget = register(Arc::new(MemoryStore::new()), widget());
    let result = widget.objects().unwrap().get_item(&json!("ghost"), None).await;
    assert!(matches!(result, Err(Error::DataNotFound(_))));
}

#[tokio::test]
async fn test_bulk_insert_generates_distinct_keys() {
    let store = Arc::new(MemoryStore::new());
    let widget = register(Arc::clone(&store), widget());
    let objects = widget.objects().unwrap();

    let outcome = objects
        .bulk_insert(vec![item(json!({"a": 1})), item(json!({"a": 2}))])
        .await
        .unwrap();
    assert_eq!(outcome, BatchOutcome::Written { count: 2 });
    assert_eq!(store.item_count("Widget").await, 2);

    let mut stored = store.items("Widget").await;
    stored.sort_by_key(|item| item["a"].as_i64());
    assert_eq!(stored[0]["a"], json!(1));
    assert_eq!(stored[1]["a"], json!(2));
    assert!(stored.iter().all(|item| item["id"].is_string()));
    assert_ne!(stored[0]["id"], stored[1]["id"]);
}

#[tokio::test]
async fn test_bulk_insert_beyond_capacity_reports_message() {
    let store = Arc::new(MemoryStore::new());
    let widget = register(
        Arc::clone(&store),
        widget().meta(Meta::new().hash_key_name("id").write_units(1)),
    );
    let outcome = widget
        .objects()
        .unwrap()
        .bulk_insert(vec![item(json!({"a": 1})), item(json!({"a": 2}))])
        .await
        .unwrap();
    assert!(matches!(outcome, BatchOutcome::Throttled { message } if message.contains("Widget")));
    assert_eq!(store.item_count("Widget").await, 0);
}

/// Scripted store: the throughput signal comes back as a value, not an error.
#[tokio::test]
async fn test_bulk_insert_throttled_by_store() {
    let mock = Arc::new(MockStore::new());
    mock.expect_lookup_table("Widget")
        .return_ok(MockStore::table("Widget", "id"));
    mock.expect_batch_write()
        .return_err(StoreError::ThroughputExceeded("slow down".into()));

    let widget = register(Arc::clone(&mock), widget());
    let outcome = widget
        .objects()
        .unwrap()
        .bulk_insert(vec![item(json!({"a": 1}))])
        .await
        .unwrap();

    assert_eq!(
        outcome,
        BatchOutcome::Throttled {
            message: "slow down".into()
        }
    );
    assert_eq!(mock.batches().len(), 1);
    mock.verify();
}

/// Scripted store: the table is created on first use with the type's capacity.
#[tokio::test]
async fn test_table_created_on_first_write() {
    let mock = Arc::new(MockStore::new());
    mock.expect_lookup_table("Widget_test")
        .return_err(StoreError::TableNotFound("Widget_test".into()));
    mock.expect_create_table("Widget_test")
        .return_ok(MockStore::table("Widget_test", "id"));
    mock.expect_put_item("k9").return_ok(());

    let widget = Registry::new(
        Settings::new("AKIA", "secret").with_table_prefix("test"),
        Arc::clone(&mock),
    )
    .register(widget())
    .unwrap();
    widget
        .objects()
        .unwrap()
        .create_item(vec![item(json!({"id": "k9", "a": "3"}))], false)
        .await
        .unwrap();

    let puts = mock.puts();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].0, json!("k9"));
    assert_eq!(puts[0].1["a"], json!(3));
    assert!(!puts[0].1.contains_key("id"));
    mock.verify();
}

#[tokio::test]
async fn test_store_failures_propagate() {
    let mock = Arc::new(MockStore::new());
    mock.expect_lookup_table("Widget")
        .return_ok(MockStore::table("Widget", "id"));
    mock.expect_get_item("k1")
        .return_err(StoreError::Backend("connection reset".into()));

    let widget = register(Arc::clone(&mock), widget());
    let result = widget.objects().unwrap().get_item(&json!("k1"), None).await;
    assert!(matches!(result, Err(Error::Store(StoreError::Backend(_)))));
    mock.verify();
}

#[test]
fn test_construction_errors() {
    let widget = register(Arc::new(MemoryStore::new()), widget());

    let result = widget.from_positional(vec![json!("k1"), json!(1), json!("x"), json!(4)]);
    assert!(matches!(result, Err(Error::Argument { given: 4, declared: 3 })));

    let result = widget.from_fields(item(json!({"c": 1})));
    assert!(matches!(result, Err(Error::InvalidKeyword(name)) if name == "c"));
}

#[test]
fn test_keyword_defaults() {
    let counter = register(
        Arc::new(MemoryStore::new()),
        ModelDefinition::new("Counter")
            .field(FieldDescriptor::char("id").blank())
            .field(FieldDescriptor::integer("step").default(5))
            .meta(Meta::new().hash_key_name("id")),
    );
    let record = counter.from_fields(Item::new()).unwrap();
    assert_eq!(record.get("step"), Some(json!(5)));
}

#[tokio::test]
async fn test_persistence_without_hash_key_fails() {
    let loose = register(
        Arc::new(MemoryStore::new()),
        ModelDefinition::new("Loose").field(FieldDescriptor::char("name")),
    );
    let mut record = loose.from_fields(item(json!({"name": "n"}))).unwrap();
    let result = record.save(loose.objects().unwrap()).await;
    assert!(matches!(
        result,
        Err(Error::Configuration(ConfigurationError::MissingHashKey { .. }))
    ));
}
