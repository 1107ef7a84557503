//! Change sets: the attributes that differ between two snapshots of a record.

use crate::record::Record;
use crate::value::{Item, Value};

/// Attname -> new value for every declared field whose value changed.
///
/// Entries keep the declaration order of the fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    changes: Vec<(String, Value)>,
}

impl ChangeSet {
    /// Compares `old` and `new` field by field across the declared fields of
    /// `new`'s type. Both records must be of the same type.
    pub fn between(old: &Record, new: &Record) -> Self {
        debug_assert_eq!(
            old.options().object_name(),
            new.options().object_name(),
            "change sets compare records of one type"
        );
        let changes = new
            .options()
            .attnames()
            .filter_map(|attname| {
                let after = new.get(attname).unwrap_or(Value::Null);
                let before = old.get(attname).unwrap_or(Value::Null);
                (before != after).then(|| (attname.to_string(), after))
            })
            .collect();
        Self { changes }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Changed attnames, in declaration order.
    pub fn keys(&self) -> Vec<String> {
        self.changes.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn get(&self, attname: &str) -> Option<&Value> {
        self.changes
            .iter()
            .find(|(k, _)| k == attname)
            .map(|(_, v)| v)
    }

    pub fn into_item(self) -> Item {
        self.changes.into_iter().collect()
    }
}
