//! # Billing Sample
//!
//! A small billing domain built on `dynamap`: customers and invoices sharing
//! an abstract timestamped base.
//!
//! - **[model]**: the record type declarations
//! - **[clients]**: [`InvoiceClient`](clients::InvoiceClient), billing operations over the invoice table
//! - **[lifecycle]**: [`Catalog`](lifecycle::Catalog), which registers every type at start-up

pub mod clients;
pub mod lifecycle;
pub mod model;
