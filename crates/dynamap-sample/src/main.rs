//! Runs the billing flow against an in-process store.
//!
//! Credentials are still required: `DYNAMO_ACCESS_KEY` and
//! `DYNAMO_SECRET_KEY` must be set, as they would be for a real table.

use dynamap::memory::MemoryStore;
use dynamap::tracing::setup_tracing;
use dynamap::Settings;
use dynamap_sample::lifecycle::Catalog;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let settings = Settings::from_env().map_err(|e| e.to_string())?;
    info!(?settings, "Starting billing sample");

    let catalog = Catalog::new(settings, Arc::new(MemoryStore::new())).map_err(|e| e.to_string())?;
    let invoices = &catalog.invoices;

    let span = tracing::info_span!("issue");
    let key = async { invoices.issue("cust_1", 120).await }
        .instrument(span)
        .await
        .map_err(|e| e.to_string())?;

    let span = tracing::info_span!("tax");
    let changed = async { invoices.apply_tax(&key, 24).await }
        .instrument(span)
        .await
        .map_err(|e| e.to_string())?;
    info!(changed, "Tax applied");

    let batch = (1..=3)
        .map(|n| {
            let mut item = dynamap::Item::new();
            item.insert("customer_id".into(), json!("cust_2"));
            item.insert("amount".into(), json!(n * 50));
            item
        })
        .collect();
    match invoices.import(batch).await {
        Ok(count) => info!(count, "Imported invoices"),
        Err(e) => error!(error = %e, "Import failed"),
    }

    invoices.void(&key).await.map_err(|e| e.to_string())?;
    info!("Billing sample completed");
    Ok(())
}
