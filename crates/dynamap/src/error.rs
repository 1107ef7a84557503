//! # Mapper Errors
//!
//! This module defines the error taxonomy shared by every layer of the mapper.
//! Configuration problems, validation failures, missing data and store signals
//! each get their own variant so callers can match on exactly the condition
//! they care about.

use crate::store::StoreError;
use std::collections::BTreeMap;
use std::fmt;

/// Result type for mapper operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by registration, record construction and persistence.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("Data not found: {0}")]
    DataNotFound(String),
    #[error("Number of args exceeds number of fields: got {given}, {declared} declared")]
    Argument { given: usize, declared: usize },
    #[error("'{0}' is an invalid keyword argument for this function")]
    InvalidKeyword(String),
    #[error("No fetched item in session; call get_item before update_item")]
    StaleUpdate,
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Fatal setup problems. These are never retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Hash key is not configured for {model}")]
    MissingHashKey { model: String },
    #[error("Hash key '{hash_key}' does not name a declared field of {model}")]
    UnknownHashKey { model: String, hash_key: String },
    #[error("Field '{attname}' is declared twice on {model}")]
    DuplicateField { model: String, attname: String },
    #[error("Model {0} is already registered")]
    AlreadyRegistered(String),
    #[error("Model {0} is abstract and has no table manager")]
    NoTableManager(String),
    #[error("Unknown meta option '{0}'")]
    UnknownMetaOption(String),
    #[error("Invalid meta option '{name}': {reason}")]
    InvalidMetaOption { name: String, reason: String },
    #[error("Missing required setting {0}")]
    MissingSetting(String),
    #[error("Invalid setting {name}={value}")]
    InvalidSetting { name: String, value: String },
}

/// Per-field validation messages collected by a clean pass.
///
/// The map holds every failing field, not just the first one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, attname: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(attname.into())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Messages recorded for one field.
    pub fn get(&self, attname: &str) -> Option<&[String]> {
        self.errors.get(attname).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    pub fn into_map(self) -> BTreeMap<String, Vec<String>> {
        self.errors
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (attname, messages) in &self.errors {
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            write!(f, "{}: {}", attname, messages.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_keep_every_field() {
        let mut errors = ValidationErrors::new();
        errors.add("amount", "Enter a whole number.");
        errors.add("tax", "Enter a whole number.");
        errors.add("tax", "Ensure this value is positive.");

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("tax").unwrap().len(), 2);
        assert_eq!(
            errors.to_string(),
            "amount: Enter a whole number.; tax: Enter a whole number., Ensure this value is positive."
        );
    }

    #[test]
    fn store_errors_convert() {
        let err: Error = StoreError::ThroughputExceeded("slow down".into()).into();
        assert!(matches!(err, Error::Store(StoreError::ThroughputExceeded(_))));
    }
}
