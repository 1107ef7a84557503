//! # Record Instances
//!
//! A [`Record`] is a live value of a registered type. It holds one
//! [`Binding`] per declared field, in declaration order.
//!
//! Records are built through one of two named constructors:
//!
//! - [`Record::from_positional`] binds values to fields in declaration order.
//!   Trailing fields stay [`Binding::Deferred`] and resolve to their default
//!   only when read.
//! - [`Record::from_fields`] binds by attname and then runs a default pass.
//!
//! ## The missing-or-falsy rule
//!
//! The keyword constructor treats a field that was supplied with a falsy value
//! (`null`, `false`, `0`, `""`, `[]`, `{}`) exactly like a field that was not
//! supplied: both are candidates for default substitution. Supplying
//! `"amount": 0` to a field declared with `default(1)` therefore yields `1`.
//! The rule lives entirely in the default pass of [`Record::from_fields`]. A
//! field without a declared default has `null` as its default, so a supplied
//! `0` or `false` becomes `null`; date/time fields fall back to the current
//! date instead.

use crate::error::{Error, Result, ValidationErrors};
use crate::field::today;
use crate::manager::{SaveOutcome, TableManager};
use crate::options::Options;
use crate::store::Store;
use crate::value::{is_empty_value, is_truthy, Item, Value};
use std::fmt;
use std::sync::Arc;

/// State of one field on a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Set(Value),
    /// Not bound at construction; reads resolve to the field default.
    Deferred,
}

type SetterFn = dyn Fn(&mut Record, Value) -> Result<()> + Send + Sync;

/// A named setter that consumes a leftover keyword during construction.
#[derive(Clone)]
pub struct PropertySetter(Arc<SetterFn>);

impl PropertySetter {
    pub fn new<F>(setter: F) -> Self
    where
        F: Fn(&mut Record, Value) -> Result<()> + Send + Sync + 'static,
    {
        Self(Arc::new(setter))
    }

    pub(crate) fn apply(&self, record: &mut Record, value: Value) -> Result<()> {
        (self.0)(record, value)
    }
}

impl fmt::Debug for PropertySetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PropertySetter")
    }
}

#[derive(Debug, Clone)]
pub struct Record {
    options: Arc<Options>,
    values: Vec<Binding>,
}

impl Record {
    /// Binds `args` to the declared fields in order.
    ///
    /// More arguments than fields is an [`Error::Argument`].
    pub fn from_positional(options: Arc<Options>, args: Vec<Value>) -> Result<Self> {
        let declared = options.fields().len();
        if args.len() > declared {
            return Err(Error::Argument {
                given: args.len(),
                declared,
            });
        }
        let values = args
            .into_iter()
            .map(Binding::Set)
            .chain(std::iter::repeat(Binding::Deferred))
            .take(declared)
            .collect();
        Ok(Self { options, values })
    }

    /// Binds keyword values by attname, then fills defaults.
    ///
    /// Keywords that are not fields are offered to the type's property
    /// setters; anything left after that is an [`Error::InvalidKeyword`].
    pub fn from_fields(options: Arc<Options>, mut kwargs: Item) -> Result<Self> {
        let mut values = Vec::with_capacity(options.fields().len());
        let mut missing = Vec::new();
        for (position, field) in options.fields().iter().enumerate() {
            match kwargs.remove(field.attname()) {
                Some(value) => {
                    if !is_truthy(&value) {
                        missing.push(position);
                    }
                    values.push(Binding::Set(value));
                }
                None => {
                    missing.push(position);
                    values.push(Binding::Set(Value::Null));
                }
            }
        }

        if let Some(name) = kwargs.keys().find(|name| options.property(name).is_none()) {
            return Err(Error::InvalidKeyword(name.clone()));
        }

        let mut record = Self { options, values };
        record.resolve_missing(&missing);

        let options = Arc::clone(&record.options);
        for (name, value) in kwargs {
            if let Some(setter) = options.property(&name) {
                setter.apply(&mut record, value)?;
            }
        }
        Ok(record)
    }

    /// Default pass for fields that were absent or falsy.
    fn resolve_missing(&mut self, missing: &[usize]) {
        for &position in missing {
            let field = &self.options.fields()[position];
            let default = field.get_default();
            let resolved = if !is_truthy(&default) && field.is_datetime() {
                today()
            } else {
                default
            };
            self.values[position] = Binding::Set(resolved);
        }
    }

    pub fn options(&self) -> &Arc<Options> {
        &self.options
    }

    pub fn binding(&self, attname: &str) -> Option<&Binding> {
        self.options.position(attname).map(|i| &self.values[i])
    }

    /// Current value of a field; deferred fields read as their default.
    pub fn get(&self, attname: &str) -> Option<Value> {
        self.options.position(attname).map(|i| self.value_at(i))
    }

    fn value_at(&self, position: usize) -> Value {
        match &self.values[position] {
            Binding::Set(value) => value.clone(),
            Binding::Deferred => self.options.fields()[position].get_default(),
        }
    }

    pub fn set(&mut self, attname: &str, value: impl Into<Value>) -> Result<()> {
        let position = self
            .options
            .position(attname)
            .ok_or_else(|| Error::InvalidKeyword(attname.to_string()))?;
        self.values[position] = Binding::Set(value.into());
        Ok(())
    }

    /// Replaces every deferred binding with its default.
    pub fn resolve_deferred(&mut self) {
        for position in 0..self.values.len() {
            if self.values[position] == Binding::Deferred {
                self.values[position] = Binding::Set(self.value_at(position));
            }
        }
    }

    /// Validates every field not in `exclude`, storing the native values.
    ///
    /// Blank-able fields holding an empty value are skipped. All failures are
    /// collected before returning.
    pub fn clean_fields(&mut self, exclude: &[&str]) -> Result<()> {
        let mut errors = ValidationErrors::new();
        let options = Arc::clone(&self.options);
        for (position, field) in options.fields().iter().enumerate() {
            if exclude.contains(&field.attname()) {
                continue;
            }
            let raw = self.value_at(position);
            if field.allows_blank() && is_empty_value(&raw) {
                continue;
            }
            match field.clean(&raw) {
                Ok(native) => self.values[position] = Binding::Set(native),
                Err(message) => errors.add(field.attname(), message),
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.into())
        }
    }

    /// The bound primary key, if the type has one and it is set.
    pub fn hash_key(&self) -> Option<Value> {
        let name = self.options.hash_key_name()?;
        self.get(name).filter(is_truthy)
    }

    /// Persisted records carry a primary key value.
    pub fn is_persisted(&self) -> bool {
        self.hash_key().is_some()
    }

    /// Every declared field with its resolved value.
    pub fn to_item(&self) -> Item {
        self.fields_with_values().collect()
    }

    /// Only the truthy fields; the payload a create sends.
    pub fn to_create_payload(&self) -> Item {
        self.fields_with_values()
            .filter(|(_, value)| is_truthy(value))
            .collect()
    }

    fn fields_with_values(&self) -> impl Iterator<Item = (String, Value)> + '_ {
        self.options
            .fields()
            .iter()
            .enumerate()
            .map(|(i, field)| (field.attname().to_string(), self.value_at(i)))
    }

    /// Creates or updates this record through the type's table manager.
    pub async fn save<S: Store>(&mut self, objects: &TableManager<S>) -> Result<SaveOutcome> {
        objects.save(self).await
    }
}
