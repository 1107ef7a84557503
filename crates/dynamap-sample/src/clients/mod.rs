pub mod invoice_client;

pub use invoice_client::*;
