//! # Type Metadata
//!
//! [`Meta`] is the optional metadata block a record type declares; [`Options`]
//! is the immutable per-type metadata the [`Registry`](crate::Registry)
//! derives from it at registration time.

use crate::error::ConfigurationError;
use crate::field::FieldDescriptor;
use crate::record::PropertySetter;
use crate::store::KeySchema;
use crate::value::Value;
use serde::de::DeserializeOwned;

/// Option names a metadata block may set.
pub const META_OPTIONS: &[&str] = &[
    "ordering",
    "index_fields",
    "permissions",
    "hash_key_name",
    "read_units",
    "write_units",
    "dynamo_table_prefix",
];

/// Declared metadata block of a record type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Meta {
    pub ordering: Vec<String>,
    pub index_fields: Vec<String>,
    pub permissions: Vec<String>,
    pub hash_key_name: Option<String>,
    pub read_units: Option<u64>,
    pub write_units: Option<u64>,
    pub dynamo_table_prefix: Option<String>,
}

impl Meta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hash_key_name(mut self, name: impl Into<String>) -> Self {
        self.hash_key_name = Some(name.into());
        self
    }

    pub fn read_units(mut self, units: u64) -> Self {
        self.read_units = Some(units);
        self
    }

    pub fn write_units(mut self, units: u64) -> Self {
        self.write_units = Some(units);
        self
    }

    pub fn table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.dynamo_table_prefix = Some(prefix.into());
        self
    }

    pub fn ordering<I, S>(mut self, ordering: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ordering = ordering.into_iter().map(Into::into).collect();
        self
    }

    pub fn index_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.index_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    /// Builds a metadata block from raw `(name, value)` pairs.
    ///
    /// Names starting with `_` are private and skipped. Any other name outside
    /// [`META_OPTIONS`] is rejected, as is a value of the wrong shape.
    pub fn from_attrs<I, K>(attrs: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut meta = Meta::default();
        for (name, value) in attrs {
            let name = name.into();
            if name.starts_with('_') {
                continue;
            }
            match name.as_str() {
                "ordering" => meta.ordering = parse_option(&name, value)?,
                "index_fields" => meta.index_fields = parse_option(&name, value)?,
                "permissions" => meta.permissions = parse_option(&name, value)?,
                "hash_key_name" => meta.hash_key_name = parse_option(&name, value)?,
                "read_units" => meta.read_units = positive(&name, parse_option(&name, value)?)?,
                "write_units" => meta.write_units = positive(&name, parse_option(&name, value)?)?,
                "dynamo_table_prefix" => meta.dynamo_table_prefix = parse_option(&name, value)?,
                _ => return Err(ConfigurationError::UnknownMetaOption(name)),
            }
        }
        Ok(meta)
    }
}

fn parse_option<T: DeserializeOwned>(name: &str, value: Value) -> Result<T, ConfigurationError> {
    serde_json::from_value(value).map_err(|e| ConfigurationError::InvalidMetaOption {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

fn positive(name: &str, units: Option<u64>) -> Result<Option<u64>, ConfigurationError> {
    match units {
        Some(0) => Err(ConfigurationError::InvalidMetaOption {
            name: name.to_string(),
            reason: "capacity units must be positive".to_string(),
        }),
        other => Ok(other),
    }
}

/// Immutable metadata of one registered record type.
///
/// Created exactly once per type by [`Registry::register`](crate::Registry::register)
/// and shared by every record of that type.
#[derive(Debug)]
pub struct Options {
    pub(crate) object_name: String,
    pub(crate) model_name: String,
    pub(crate) table_name: String,
    pub(crate) hash_key_name: Option<String>,
    pub(crate) read_units: Option<u64>,
    pub(crate) write_units: Option<u64>,
    pub(crate) ordering: Vec<String>,
    pub(crate) index_fields: Vec<String>,
    pub(crate) permissions: Vec<String>,
    pub(crate) fields: Vec<FieldDescriptor>,
    pub(crate) properties: Vec<(String, PropertySetter)>,
    pub(crate) is_abstract: bool,
}

impl Options {
    /// Declared type name, original casing.
    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    /// Lower-cased type name.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Remote table name, including any prefix suffix.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn hash_key_name(&self) -> Option<&str> {
        self.hash_key_name.as_deref()
    }

    /// Type-level read capacity override.
    pub fn read_units(&self) -> Option<u64> {
        self.read_units
    }

    /// Type-level write capacity override.
    pub fn write_units(&self) -> Option<u64> {
        self.write_units
    }

    pub fn ordering(&self) -> &[String] {
        &self.ordering
    }

    pub fn index_fields(&self) -> &[String] {
        &self.index_fields
    }

    pub fn permissions(&self) -> &[String] {
        &self.permissions
    }

    /// Declared fields, in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, attname: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.attname() == attname)
    }

    pub(crate) fn position(&self, attname: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.attname() == attname)
    }

    pub fn attnames(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(FieldDescriptor::attname)
    }

    pub(crate) fn property(&self, name: &str) -> Option<&PropertySetter> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, setter)| setter)
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// The hash key name, required by every persistence operation.
    pub fn require_hash_key(&self) -> Result<&str, ConfigurationError> {
        self.hash_key_name
            .as_deref()
            .ok_or_else(|| ConfigurationError::MissingHashKey {
                model: self.object_name.clone(),
            })
    }

    pub fn key_schema(&self) -> Result<KeySchema, ConfigurationError> {
        self.require_hash_key().map(KeySchema::string)
    }
}
