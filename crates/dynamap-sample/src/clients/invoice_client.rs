//! # Invoice Client
//!
//! Billing-level operations on top of the `Invoice` type's table manager.
//! It maps mapper errors into [`BillingError`] and turns a throttled batch
//! into an error the caller has to handle.

use dynamap::store::{display_key, StoreError};
use dynamap::{BatchOutcome, Error, Item, ModelType, Record, SaveOutcome, Store, TableManager, Value};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("Invoice not found: {0}")]
    NotFound(String),
    #[error("Invoice was not created: {0:?}")]
    NotCreated(SaveOutcome),
    #[error("Import of {prepared} invoices throttled: {message}")]
    ImportThrottled { prepared: usize, message: String },
    #[error(transparent)]
    Mapper(#[from] Error),
}

pub struct InvoiceClient<S: Store> {
    model: ModelType<S>,
}

impl<S: Store> InvoiceClient<S> {
    pub fn new(model: ModelType<S>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &ModelType<S> {
        &self.model
    }

    fn objects(&self) -> Result<&TableManager<S>, BillingError> {
        self.model.objects().map_err(|e| Error::from(e).into())
    }

    /// Issues a new invoice and returns its generated key.
    #[instrument(skip(self))]
    pub async fn issue(&self, customer_id: &str, amount: i64) -> Result<Value, BillingError> {
        let mut kwargs = Item::new();
        kwargs.insert("customer_id".into(), json!(customer_id));
        kwargs.insert("amount".into(), json!(amount));
        let mut invoice = self.model.from_fields(kwargs)?;

        match invoice.save(self.objects()?).await? {
            SaveOutcome::Created { key } => {
                info!(key = %display_key(&key), "Invoice issued");
                Ok(key)
            }
            other => Err(BillingError::NotCreated(other)),
        }
    }

    pub async fn find(&self, key: &Value) -> Result<Record, BillingError> {
        match self.objects()?.get_item(key, None).await {
            Ok(fetched) => Ok(fetched.record),
            Err(Error::DataNotFound(_)) => Err(BillingError::NotFound(display_key(key))),
            Err(e) => Err(e.into()),
        }
    }

    /// Sets the tax on an existing invoice. Returns whether anything changed.
    #[instrument(skip(self))]
    pub async fn apply_tax(&self, key: &Value, tax: i64) -> Result<bool, BillingError> {
        let mut invoice = self.find(key).await?;
        invoice.set("tax", tax)?;
        let outcome = invoice.save(self.objects()?).await?;
        debug!(?outcome, "Tax applied");
        Ok(matches!(outcome, SaveOutcome::Updated { .. }))
    }

    /// Writes all invoices in one batch and returns how many were written.
    #[instrument(skip(self, invoices), fields(count = invoices.len()))]
    pub async fn import(&self, invoices: Vec<Item>) -> Result<usize, BillingError> {
        let prepared = invoices.len();
        match self.objects()?.bulk_insert(invoices).await? {
            BatchOutcome::Written { count } => Ok(count),
            BatchOutcome::Throttled { message } => {
                warn!(%message, "Import throttled");
                Err(BillingError::ImportThrottled { prepared, message })
            }
        }
    }

    pub async fn void(&self, key: &Value) -> Result<(), BillingError> {
        self.objects()?.delete_item(key).await.map_err(|e| match e {
            Error::Store(StoreError::KeyNotFound { .. }) => BillingError::NotFound(display_key(key)),
            other => other.into(),
        })
    }
}
