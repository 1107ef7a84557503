use dynamap::field::FieldDescriptor;
use dynamap::ModelDefinition;

pub const TIMESTAMPED: &str = "Timestamped";

/// Fields shared by every billing record.
pub fn fields() -> Vec<FieldDescriptor> {
    vec![FieldDescriptor::datetime("created").blank()]
}

/// Abstract base: registered for its metadata, never given a table.
pub fn definition() -> ModelDefinition {
    ModelDefinition::new(TIMESTAMPED)
        .fields(fields())
        .abstract_marker()
}
