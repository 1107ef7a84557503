use super::timestamped;
use dynamap::field::FieldDescriptor;
use dynamap::{Meta, ModelDefinition, Record, Value};

pub const INVOICE: &str = "Invoice";

/// An amount owed by a customer, in whole currency units.
///
/// `total_cents` is accepted as a construction keyword and folded into
/// `amount`.
pub fn definition() -> ModelDefinition {
    ModelDefinition::new(INVOICE)
        .field(FieldDescriptor::char("id").blank())
        .field(FieldDescriptor::char("customer_id").blank())
        .field(FieldDescriptor::integer("amount").default(1))
        .field(FieldDescriptor::integer("tax").blank())
        .fields(timestamped::fields())
        .property("total_cents", set_total_cents)
        .meta(
            Meta::new()
                .hash_key_name("id")
                .ordering(["-created"])
                .permissions(["billing.view_invoice"])
                .write_units(10),
        )
}

fn set_total_cents(record: &mut Record, value: Value) -> dynamap::Result<()> {
    let cents = value.as_i64().unwrap_or_default();
    record.set("amount", cents / 100)
}
