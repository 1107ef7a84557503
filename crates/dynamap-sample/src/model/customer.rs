use super::timestamped;
use dynamap::field::{CharField, FieldDescriptor};
use dynamap::{ConfigurationError, Meta, ModelDefinition};
use serde_json::json;

pub const CUSTOMER: &str = "Customer";

/// A billed party.
///
/// The metadata block is declared as raw attributes, the way it arrives from
/// a declarative source; `_app_label` is private and ignored.
pub fn definition() -> Result<ModelDefinition, ConfigurationError> {
    let meta = Meta::from_attrs([
        ("hash_key_name", json!("id")),
        ("ordering", json!(["name"])),
        ("index_fields", json!(["email"])),
        ("_app_label", json!("billing")),
    ])?;

    Ok(ModelDefinition::new(CUSTOMER)
        .field(FieldDescriptor::char("id").blank())
        .field(FieldDescriptor::new("name", CharField { max_length: Some(64) }))
        .field(FieldDescriptor::char("email"))
        .field(FieldDescriptor::boolean("vip").blank().default(false))
        .fields(timestamped::fields())
        .meta(meta))
}
