//! # Schema Registry
//!
//! Turns a declarative [`ModelDefinition`] into immutable [`Options`] and a
//! bound [`TableManager`]. Registration runs once per type, at start-up:
//!
//! ```rust
//! use dynamap::field::FieldDescriptor;
//! use dynamap::memory::MemoryStore;
//! use dynamap::{Meta, ModelDefinition, Registry, Settings};
//! use std::sync::Arc;
//!
//! let mut registry = Registry::new(Settings::new("AKIA", "secret"), Arc::new(MemoryStore::new()));
//! let invoice = registry
//!     .register(
//!         ModelDefinition::new("Invoice")
//!             .field(FieldDescriptor::char("id").blank())
//!             .field(FieldDescriptor::integer("amount"))
//!             .meta(Meta::new().hash_key_name("id").write_units(10)),
//!     )
//!     .unwrap();
//!
//! assert_eq!(invoice.options().table_name(), "Invoice");
//! assert_eq!(invoice.options().model_name(), "invoice");
//! assert!(invoice.objects().is_ok());
//! ```

use crate::config::Settings;
use crate::error::{ConfigurationError, Result};
use crate::field::FieldDescriptor;
use crate::manager::TableManager;
use crate::options::{Meta, Options};
use crate::record::{PropertySetter, Record};
use crate::store::Store;
use crate::value::{Item, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

/// Declarative description of a record type.
#[derive(Debug, Clone)]
pub struct ModelDefinition {
    name: String,
    fields: Vec<FieldDescriptor>,
    meta: Option<Meta>,
    properties: Vec<(String, PropertySetter)>,
    is_abstract: bool,
}

impl ModelDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            meta: None,
            properties: Vec::new(),
            is_abstract: false,
        }
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = FieldDescriptor>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn meta(mut self, meta: Meta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Declares a setter that consumes keyword `name` during construction.
    pub fn property<F>(mut self, name: impl Into<String>, setter: F) -> Self
    where
        F: Fn(&mut Record, Value) -> Result<()> + Send + Sync + 'static,
    {
        self.properties.push((name.into(), PropertySetter::new(setter)));
        self
    }

    /// Base types get metadata but no table manager.
    pub fn abstract_marker(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Builds the type metadata. `default_prefix` is the process-wide table
    /// prefix, overridden by the type's own `dynamo_table_prefix`.
    pub(crate) fn into_options(
        self,
        default_prefix: Option<&str>,
    ) -> std::result::Result<Arc<Options>, ConfigurationError> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.attname()) {
                return Err(ConfigurationError::DuplicateField {
                    model: self.name.clone(),
                    attname: field.attname().to_string(),
                });
            }
        }

        let meta = self.meta.unwrap_or_default();
        if let Some(hash_key) = &meta.hash_key_name {
            if !seen.contains(hash_key.as_str()) {
                return Err(ConfigurationError::UnknownHashKey {
                    model: self.name.clone(),
                    hash_key: hash_key.clone(),
                });
            }
        }

        let table_name = match meta.dynamo_table_prefix.as_deref().or(default_prefix) {
            Some(prefix) => format!("{}_{}", self.name, prefix),
            None => self.name.clone(),
        };

        Ok(Arc::new(Options {
            model_name: self.name.to_lowercase(),
            object_name: self.name,
            table_name,
            hash_key_name: meta.hash_key_name,
            read_units: meta.read_units,
            write_units: meta.write_units,
            ordering: meta.ordering,
            index_fields: meta.index_fields,
            permissions: meta.permissions,
            fields: self.fields,
            properties: self.properties,
            is_abstract: self.is_abstract,
        }))
    }
}

/// A registered record type: its metadata plus its table manager.
pub struct ModelType<S: Store> {
    options: Arc<Options>,
    objects: Option<TableManager<S>>,
}

impl<S: Store> Clone for ModelType<S> {
    fn clone(&self) -> Self {
        Self {
            options: Arc::clone(&self.options),
            objects: self.objects.clone(),
        }
    }
}

impl<S: Store> ModelType<S> {
    pub fn options(&self) -> &Arc<Options> {
        &self.options
    }

    /// The type-level persistence operations.
    pub fn objects(&self) -> std::result::Result<&TableManager<S>, ConfigurationError> {
        self.objects
            .as_ref()
            .ok_or_else(|| ConfigurationError::NoTableManager(self.options.object_name().to_string()))
    }

    pub fn from_positional(&self, args: Vec<Value>) -> Result<Record> {
        Record::from_positional(Arc::clone(&self.options), args)
    }

    pub fn from_fields(&self, kwargs: Item) -> Result<Record> {
        Record::from_fields(Arc::clone(&self.options), kwargs)
    }
}

/// Owns the process settings and the shared store, and registers each
/// record type exactly once.
pub struct Registry<S: Store> {
    settings: Settings,
    store: Arc<S>,
    registered: HashSet<String>,
}

impl<S: Store> Registry<S> {
    pub fn new(settings: Settings, store: Arc<S>) -> Self {
        Self {
            settings,
            store,
            registered: HashSet::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registered.contains(name)
    }

    /// Registers a type. A second registration under the same name fails.
    pub fn register(
        &mut self,
        definition: ModelDefinition,
    ) -> std::result::Result<ModelType<S>, ConfigurationError> {
        let name = definition.name().to_string();
        if self.registered.contains(&name) {
            return Err(ConfigurationError::AlreadyRegistered(name));
        }

        let options = definition.into_options(self.settings.table_prefix.as_deref())?;
        let objects = (!options.is_abstract()).then(|| {
            TableManager::new(
                Arc::clone(&options),
                Arc::clone(&self.store),
                self.settings.read_units,
                self.settings.write_units,
            )
        });

        info!(
            model = %name,
            table = options.table_name(),
            fields = options.fields().len(),
            hash_key = options.hash_key_name().unwrap_or("-"),
            is_abstract = options.is_abstract(),
            "Registered"
        );
        self.registered.insert(name);
        Ok(ModelType { options, objects })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn registry(settings: Settings) -> Registry<MemoryStore> {
        Registry::new(settings, Arc::new(MemoryStore::new()))
    }

    fn invoice() -> ModelDefinition {
        ModelDefinition::new("Invoice")
            .field(FieldDescriptor::char("id").blank())
            .field(FieldDescriptor::integer("amount"))
            .field(FieldDescriptor::integer("tax"))
            .meta(Meta::new().hash_key_name("id"))
    }

    #[test]
    fn fields_keep_declaration_order() {
        let model = registry(Settings::new("a", "b")).register(invoice()).unwrap();
        let names: Vec<_> = model.options().attnames().collect();
        assert_eq!(names, vec!["id", "amount", "tax"]);
    }

    #[test]
    fn prefix_suffixes_table_name() {
        let model = registry(Settings::new("a", "b").with_table_prefix("staging"))
            .register(invoice())
            .unwrap();
        assert_eq!(model.options().table_name(), "Invoice_staging");

        let model = registry(Settings::new("a", "b").with_table_prefix("staging"))
            .register(invoice().meta(Meta::new().hash_key_name("id").table_prefix("prod")))
            .unwrap();
        assert_eq!(model.options().table_name(), "Invoice_prod");
    }

    #[test]
    fn second_registration_fails() {
        let mut registry = registry(Settings::new("a", "b"));
        registry.register(invoice()).unwrap();
        let err = registry.register(invoice()).err().unwrap();
        assert_eq!(err, ConfigurationError::AlreadyRegistered("Invoice".into()));
    }

    #[test]
    fn hash_key_must_name_a_field() {
        let err = registry(Settings::new("a", "b"))
            .register(invoice().meta(Meta::new().hash_key_name("pk")))
            .err()
            .unwrap();
        assert!(matches!(err, ConfigurationError::UnknownHashKey { hash_key, .. } if hash_key == "pk"));
    }

    #[test]
    fn duplicate_fields_are_rejected() {
        let err = registry(Settings::new("a", "b"))
            .register(invoice().field(FieldDescriptor::integer("tax")))
            .err()
            .unwrap();
        assert!(matches!(err, ConfigurationError::DuplicateField { attname, .. } if attname == "tax"));
    }

    #[test]
    fn abstract_types_have_no_manager() {
        let model = registry(Settings::new("a", "b"))
            .register(ModelDefinition::new("Base").abstract_marker())
            .unwrap();
        assert!(matches!(
            model.objects(),
            Err(ConfigurationError::NoTableManager(name)) if name == "Base"
        ));
    }
}
