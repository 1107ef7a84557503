//! # Logging
//!
//! Every store round trip and every Table Manager operation emits `tracing`
//! events with structured fields (`table`, `key`, `size`, `count`). Manager
//! operations also open a span named after the operation, so a save shows up
//! as `save:get_item` followed by `save:update_item`.
//!
//! Levels:
//!
//! - `info` for tables created, items created/updated/deleted and batch results
//! - `debug` for full payloads and fetched items
//! - `warn` for missing keys, validation failures and throttled batches
//!
//! ```bash
//! RUST_LOG=info cargo run -p dynamap-sample
//! RUST_LOG=dynamap=debug cargo run -p dynamap-sample
//! ```
//!
//! With `RUST_LOG=info` a create-then-save flow reads:
//!
//! ```text
//! INFO Registered model="Invoice" table="Invoice" fields=4 hash_key="id" is_abstract=false
//! INFO create_item: Created table read_units=5 write_units=5
//! INFO create_item: Put table="Invoice" key="6f1c..." size=1
//! INFO save:update_item: Updated key="6f1c..." fields=1
//! ```

/// Installs a compact `fmt` subscriber filtered by `RUST_LOG`.
///
/// Call once, at process start-up.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false) // fields carry the table name
        .compact()
        .init();
}
