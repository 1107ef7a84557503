//! # Process Configuration
//!
//! [`Settings`] are resolved once at start-up and handed to the
//! [`Registry`](crate::Registry). Missing credentials are fatal.
//!
//! | Variable | Required | Default |
//! |----------|----------|---------|
//! | `DYNAMO_ACCESS_KEY` | yes | |
//! | `DYNAMO_SECRET_KEY` | yes | |
//! | `DYNAMO_REGION` | no | `us-east-1` |
//! | `DYNAMO_READ_UNITS` | no | `5` |
//! | `DYNAMO_WRITE_UNITS` | no | `5` |
//! | `DYNAMO_TABLE_PREFIX` | no | none |

use crate::error::ConfigurationError;
use serde::Deserialize;
use std::collections::HashMap;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_READ_UNITS: u64 = 5;
pub const DEFAULT_WRITE_UNITS: u64 = 5;

#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub access_key: String,
    pub secret_key: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_read_units")]
    pub read_units: u64,
    #[serde(default = "default_write_units")]
    pub write_units: u64,
    #[serde(default)]
    pub table_prefix: Option<String>,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_read_units() -> u64 {
    DEFAULT_READ_UNITS
}

fn default_write_units() -> u64 {
    DEFAULT_WRITE_UNITS
}

impl Settings {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            region: default_region(),
            read_units: DEFAULT_READ_UNITS,
            write_units: DEFAULT_WRITE_UNITS,
            table_prefix: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_capacity(mut self, read_units: u64, write_units: u64) -> Self {
        self.read_units = read_units;
        self.write_units = write_units;
        self
    }

    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = Some(prefix.into());
        self
    }

    /// Reads the `DYNAMO_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_vars(std::env::vars())
    }

    /// Resolves settings from any set of `DYNAMO_*` key/value pairs.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| k.starts_with("DYNAMO_"))
            .collect();

        let required = |name: &str| {
            vars.get(name)
                .filter(|v| !v.is_empty())
                .cloned()
                .ok_or_else(|| ConfigurationError::MissingSetting(name.to_string()))
        };
        let units = |name: &str, default: u64| match vars.get(name) {
            None => Ok(default),
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(n) if n > 0 => Ok(n),
                _ => Err(ConfigurationError::InvalidSetting {
                    name: name.to_string(),
                    value: raw.clone(),
                }),
            },
        };

        let settings = Self {
            access_key: required("DYNAMO_ACCESS_KEY")?,
            secret_key: required("DYNAMO_SECRET_KEY")?,
            region: vars
                .get("DYNAMO_REGION")
                .cloned()
                .unwrap_or_else(default_region),
            read_units: units("DYNAMO_READ_UNITS", DEFAULT_READ_UNITS)?,
            write_units: units("DYNAMO_WRITE_UNITS", DEFAULT_WRITE_UNITS)?,
            table_prefix: vars
                .get("DYNAMO_TABLE_PREFIX")
                .filter(|p| !p.is_empty())
                .cloned(),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Checks invariants that deserialization alone cannot express.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.access_key.is_empty() {
            return Err(ConfigurationError::MissingSetting("DYNAMO_ACCESS_KEY".into()));
        }
        if self.secret_key.is_empty() {
            return Err(ConfigurationError::MissingSetting("DYNAMO_SECRET_KEY".into()));
        }
        for (name, units) in [
            ("DYNAMO_READ_UNITS", self.read_units),
            ("DYNAMO_WRITE_UNITS", self.write_units),
        ] {
            if units == 0 {
                return Err(ConfigurationError::InvalidSetting {
                    name: name.to_string(),
                    value: units.to_string(),
                });
            }
        }
        Ok(())
    }
}

// Keeps the secret out of logs.
impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .field("region", &self.region)
            .field("read_units", &self.read_units)
            .field("write_units", &self.write_units)
            .field("table_prefix", &self.table_prefix)
            .finish()
    }
}
