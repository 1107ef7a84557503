//! Record type declarations for the billing sample.
//!
//! Each module exposes a `definition()` returning the [`ModelDefinition`](dynamap::ModelDefinition)
//! that [`Catalog`](crate::lifecycle::Catalog) registers at start-up.

pub mod customer;
pub mod invoice;
pub mod timestamped;

pub use customer::CUSTOMER;
pub use invoice::INVOICE;
pub use timestamped::TIMESTAMPED;
