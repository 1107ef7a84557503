//! # dynamap
//!
//! An object-to-key-value mapper for DynamoDB-style stores. Record types are
//! declared once, as a list of typed fields plus an optional metadata block,
//! and registered at start-up. Each registered type gets immutable metadata
//! ([`Options`]) and a [`TableManager`] that creates the backing table on
//! first use and moves records in and out of it.
//!
//! ## Architecture Overview
//!
//! ```text
//!  ModelDefinition ──register──► Registry ──► ModelType { Options, TableManager }
//!                                                   │              │
//!                                   from_positional / from_fields  │ create / get / update
//!                                                   ▼              ▼ delete / bulk_insert / save
//!                                                 Record ◄──────► Store (MemoryStore, MockStore, ...)
//! ```
//!
//! - [`field`]: field descriptors and their value coercion
//! - [`registry`]: declarations, one-time registration and table naming
//! - [`record`]: record construction, defaults and validation
//! - [`manager`]: the persistence protocol over a [`Store`]
//! - [`changeset`]: which attributes differ between two records
//! - [`config`]: process settings from the environment
//!
//! ## Quick Start
//!
//! ```rust
//! use dynamap::field::FieldDescriptor;
//! use dynamap::memory::MemoryStore;
//! use dynamap::{Meta, ModelDefinition, Registry, SaveOutcome, Settings};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> dynamap::Result<()> {
//!     let mut registry = Registry::new(Settings::new("AKIA", "secret"), Arc::new(MemoryStore::new()));
//!     let invoice = registry.register(
//!         ModelDefinition::new("Invoice")
//!             .field(FieldDescriptor::char("id").blank())
//!             .field(FieldDescriptor::integer("amount").default(1))
//!             .meta(Meta::new().hash_key_name("id")),
//!     )?;
//!
//!     let mut record = invoice.from_fields(json!({"amount": 40}).as_object().cloned().unwrap_or_default())?;
//!     let objects = invoice.objects()?;
//!     assert!(matches!(record.save(objects).await?, SaveOutcome::Created { .. }));
//!
//!     record.set("amount", 41)?;
//!     assert!(matches!(record.save(objects).await?, SaveOutcome::Updated { .. }));
//!     Ok(())
//! }
//! ```
//!
//! ## Concurrency
//!
//! The mapper spawns nothing. Every operation is a sequence of awaited store
//! calls, and the only shared state is the per-type [`Options`], which is
//! immutable after registration.

pub mod changeset;
pub mod config;
pub mod error;
pub mod field;
pub mod manager;
pub mod memory;
pub mod mock;
pub mod options;
pub mod record;
pub mod registry;
pub mod store;
pub mod tracing;
pub mod value;

pub use changeset::ChangeSet;
pub use config::Settings;
pub use error::{ConfigurationError, Error, Result, ValidationErrors};
pub use field::{Coerce, FieldDescriptor};
pub use manager::{BatchOutcome, Fetched, ItemSession, SaveOutcome, TableManager};
pub use options::{Meta, Options};
pub use record::{Binding, PropertySetter, Record};
pub use registry::{ModelDefinition, ModelType, Registry};
pub use store::{KeySchema, KeyType, Store, StoreError, Table};
pub use value::{Item, Value};
