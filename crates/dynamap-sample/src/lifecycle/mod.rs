//! # Start-up & Registration
//!
//! Every record type is registered exactly once, before any record of it is
//! built. [`Catalog`] does that in one place: it owns the
//! [`Registry`](dynamap::Registry), registers the abstract base first and the
//! concrete types after it, and hands out the resulting types and clients.
//!
//! ```rust
//! use dynamap::memory::MemoryStore;
//! use dynamap::Settings;
//! use dynamap_sample::lifecycle::Catalog;
//! use std::sync::Arc;
//!
//! let catalog = Catalog::new(Settings::new("AKIA", "secret"), Arc::new(MemoryStore::new())).unwrap();
//! assert_eq!(catalog.invoices.model().options().table_name(), "Invoice");
//! assert!(catalog.timestamped.objects().is_err());
//! ```
//!
//! Tables are not touched here. Each one is created the first time its type
//! is written to.

use crate::clients::InvoiceClient;
use crate::model::{customer, invoice, timestamped};
use dynamap::{ConfigurationError, ModelType, Registry, Settings, Store};
use std::sync::Arc;
use tracing::info;

pub struct Catalog<S: Store> {
    pub timestamped: ModelType<S>,
    pub customers: ModelType<S>,
    pub invoices: InvoiceClient<S>,
    registry: Registry<S>,
}

impl<S: Store> Catalog<S> {
    pub fn new(settings: Settings, store: Arc<S>) -> Result<Self, ConfigurationError> {
        settings.validate()?;
        let mut registry = Registry::new(settings, store);

        let timestamped = registry.register(timestamped::definition())?;
        let customers = registry.register(customer::definition()?)?;
        let invoices = InvoiceClient::new(registry.register(invoice::definition())?);

        info!(
            region = %registry.settings().region,
            prefix = registry.settings().table_prefix.as_deref().unwrap_or("-"),
            "Catalog ready"
        );
        Ok(Self {
            timestamped,
            customers,
            invoices,
            registry,
        })
    }

    pub fn store(&self) -> &Arc<S> {
        self.registry.store()
    }

    pub fn settings(&self) -> &Settings {
        self.registry.settings()
    }
}
