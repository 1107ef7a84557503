//! # Scripted Store
//!
//! [`MockStore`] implements [`Store`] from a FIFO queue of expectations. Each
//! call pops the next expectation, checks that it is the same operation on the
//! same table or key, and returns the scripted response. Use it to inject the
//! failures that are awkward to provoke against a real table, such as
//! throughput exhaustion in the middle of a flow.
//!
//! ```rust
//! use dynamap::mock::MockStore;
//! use dynamap::{Store, StoreError};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mock = MockStore::new();
//!     let table = MockStore::table("Invoice", "id");
//!     mock.expect_lookup_table("Invoice").return_ok(table.clone());
//!     mock.expect_batch_write()
//!         .return_err(StoreError::ThroughputExceeded("slow down".into()));
//!
//!     assert_eq!(mock.lookup_table("Invoice").await.unwrap(), table);
//!     assert!(mock.batch_write(&table, &[]).await.is_err());
//!     mock.verify();
//! }
//! ```
//!
//! Writes are recorded whether they succeed or not; inspect them with
//! [`MockStore::puts`], [`MockStore::deletes`] and [`MockStore::batches`].
//! A call with no matching expectation panics.

use crate::store::{display_key, KeySchema, Store, StoreError, Table};
use crate::value::{Item, Value};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

enum Expectation {
    LookupTable {
        name: String,
        response: Result<Table, StoreError>,
    },
    CreateTable {
        name: String,
        response: Result<Table, StoreError>,
    },
    GetItem {
        key: Value,
        response: Result<Item, StoreError>,
    },
    PutItem {
        key: Value,
        response: Result<(), StoreError>,
    },
    DeleteItem {
        key: Value,
        response: Result<(), StoreError>,
    },
    BatchWrite {
        response: Result<(), StoreError>,
    },
}

impl Expectation {
    fn describe(&self) -> String {
        match self {
            Expectation::LookupTable { name, .. } => format!("lookup_table({name})"),
            Expectation::CreateTable { name, .. } => format!("create_table({name})"),
            Expectation::GetItem { key, .. } => format!("get_item({})", display_key(key)),
            Expectation::PutItem { key, .. } => format!("put_item({})", display_key(key)),
            Expectation::DeleteItem { key, .. } => format!("delete_item({})", display_key(key)),
            Expectation::BatchWrite { .. } => "batch_write".to_string(),
        }
    }
}

type Queue = Arc<Mutex<VecDeque<Expectation>>>;

#[derive(Default)]
struct Recorded {
    puts: Vec<(Value, Item)>,
    deletes: Vec<Value>,
    batches: Vec<Vec<Item>>,
}

#[derive(Default)]
pub struct MockStore {
    expectations: Queue,
    recorded: Mutex<Recorded>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table handle with default capacity, for scripting responses.
    pub fn table(name: &str, hash_key_name: &str) -> Table {
        Table {
            name: name.to_string(),
            key_schema: KeySchema::string(hash_key_name),
            read_units: crate::config::DEFAULT_READ_UNITS,
            write_units: crate::config::DEFAULT_WRITE_UNITS,
        }
    }

    pub fn expect_lookup_table(&self, name: &str) -> ExpectationBuilder<Table> {
        let name = name.to_string();
        self.builder(move |response| Expectation::LookupTable { name, response })
    }

    pub fn expect_create_table(&self, name: &str) -> ExpectationBuilder<Table> {
        let name = name.to_string();
        self.builder(move |response| Expectation::CreateTable { name, response })
    }

    pub fn expect_get_item(&self, key: impl Into<Value>) -> ExpectationBuilder<Item> {
        let key = key.into();
        self.builder(move |response| Expectation::GetItem { key, response })
    }

    pub fn expect_put_item(&self, key: impl Into<Value>) -> ExpectationBuilder<()> {
        let key = key.into();
        self.builder(move |response| Expectation::PutItem { key, response })
    }

    pub fn expect_delete_item(&self, key: impl Into<Value>) -> ExpectationBuilder<()> {
        let key = key.into();
        self.builder(move |response| Expectation::DeleteItem { key, response })
    }

    pub fn expect_batch_write(&self) -> ExpectationBuilder<()> {
        self.builder(|response| Expectation::BatchWrite { response })
    }

    fn builder<T>(
        &self,
        make: impl FnOnce(Result<T, StoreError>) -> Expectation + Send + 'static,
    ) -> ExpectationBuilder<T> {
        ExpectationBuilder {
            make: Box::new(make),
            expectations: Arc::clone(&self.expectations),
        }
    }

    /// Every `put_item` received, as `(key, attrs)`.
    pub fn puts(&self) -> Vec<(Value, Item)> {
        self.recorded.lock().unwrap().puts.clone()
    }

    pub fn deletes(&self) -> Vec<Value> {
        self.recorded.lock().unwrap().deletes.clone()
    }

    pub fn batches(&self) -> Vec<Vec<Item>> {
        self.recorded.lock().unwrap().batches.clone()
    }

    /// Panics if any expectation was not consumed.
    pub fn verify(&self) {
        let exps = self.expectations.lock().unwrap();
        if !exps.is_empty() {
            let pending: Vec<_> = exps.iter().map(Expectation::describe).collect();
            panic!(
                "Not all expectations were met. {} remaining: {:?}",
                exps.len(),
                pending
            );
        }
    }

    fn next(&self, call: &str) -> Expectation {
        self.expectations
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("Unexpected call {call}: no expectations left"))
    }
}

fn mismatch(call: String, expected: &Expectation) -> ! {
    panic!(
        "Unexpected call {call}, expected {}",
        expected.describe()
    )
}

/// Completes an expectation with its scripted response.
pub struct ExpectationBuilder<T> {
    make: Box<dyn FnOnce(Result<T, StoreError>) -> Expectation + Send>,
    expectations: Queue,
}

impl<T> ExpectationBuilder<T> {
    pub fn return_ok(self, value: T) {
        self.push(Ok(value));
    }

    pub fn return_err(self, error: StoreError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<T, StoreError>) {
        let expectation = (self.make)(response);
        self.expectations.lock().unwrap().push_back(expectation);
    }
}

#[async_trait]
impl Store for MockStore {
    async fn lookup_table(&self, name: &str) -> Result<Table, StoreError> {
        let call = format!("lookup_table({name})");
        match self.next(&call) {
            Expectation::LookupTable {
                name: expected,
                response,
            } if expected == name => response,
            other => mismatch(call, &other),
        }
    }

    async fn create_table(
        &self,
        name: &str,
        _key_schema: &KeySchema,
        _read_units: u64,
        _write_units: u64,
    ) -> Result<Table, StoreError> {
        let call = format!("create_table({name})");
        match self.next(&call) {
            Expectation::CreateTable {
                name: expected,
                response,
            } if expected == name => response,
            other => mismatch(call, &other),
        }
    }

    async fn get_item(
        &self,
        _table: &Table,
        key: &Value,
        _attributes: Option<&[String]>,
    ) -> Result<Item, StoreError> {
        let call = format!("get_item({})", display_key(key));
        match self.next(&call) {
            Expectation::GetItem {
                key: expected,
                response,
            } if &expected == key => response,
            other => mismatch(call, &other),
        }
    }

    async fn put_item(&self, _table: &Table, key: &Value, attrs: &Item) -> Result<(), StoreError> {
        self.recorded
            .lock()
            .unwrap()
            .puts
            .push((key.clone(), attrs.clone()));
        let call = format!("put_item({})", display_key(key));
        match self.next(&call) {
            Expectation::PutItem {
                key: expected,
                response,
            } if &expected == key => response,
            other => mismatch(call, &other),
        }
    }

    async fn delete_item(&self, _table: &Table, key: &Value) -> Result<(), StoreError> {
        self.recorded.lock().unwrap().deletes.push(key.clone());
        let call = format!("delete_item({})", display_key(key));
        match self.next(&call) {
            Expectation::DeleteItem {
                key: expected,
                response,
            } if &expected == key => response,
            other => mismatch(call, &other),
        }
    }

    async fn batch_write(&self, _table: &Table, items: &[Item]) -> Result<(), StoreError> {
        self.recorded.lock().unwrap().batches.push(items.to_vec());
        match self.next("batch_write") {
            Expectation::BatchWrite { response } => response,
            other => mismatch("batch_write".to_string(), &other),
        }
    }
}
