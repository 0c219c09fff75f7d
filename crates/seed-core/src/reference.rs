//! Reference values for foreign key columns of one table pass.

use crate::values::SeedValue;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Sampled keys for each foreign key column of the table being seeded.
///
/// A pool is built at the start of a table pass and dropped at its end.
/// Columns whose target table has no rows are recorded as unresolved and
/// carry no values.
#[derive(Debug, Clone, Default)]
pub struct ReferencePool {
    samples: HashMap<String, Vec<SeedValue>>,
    keys: HashMap<String, HashSet<String>>,
    unresolved: BTreeSet<String>,
}

impl ReferencePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the sample for `column`. An empty sample marks it unresolved.
    pub fn insert(&mut self, column: impl Into<String>, values: Vec<SeedValue>) {
        let column = column.into();
        if values.is_empty() {
            self.samples.remove(&column);
            self.keys.remove(&column);
            self.unresolved.insert(column);
            return;
        }
        self.unresolved.remove(&column);
        self.keys.insert(
            column.clone(),
            values.iter().filter_map(SeedValue::key_text).collect(),
        );
        self.samples.insert(column, values);
    }

    /// Sampled values for `column`, ascending by key.
    pub fn values(&self, column: &str) -> Option<&[SeedValue]> {
        self.samples.get(column).map(Vec::as_slice)
    }

    pub fn is_unresolved(&self, column: &str) -> bool {
        self.unresolved.contains(column)
    }

    /// FK columns that could not be resolved, sorted.
    pub fn unresolved_columns(&self) -> impl Iterator<Item = &str> {
        self.unresolved.iter().map(String::as_str)
    }

    /// Whether `value` was drawn from the sample for `column`.
    pub fn contains_value(&self, column: &str, value: &SeedValue) -> bool {
        match (self.keys.get(column), value.key_text()) {
            (Some(keys), Some(key)) => keys.contains(&key),
            _ => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty() && self.unresolved.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sample_is_unresolved() {
        let mut pool = ReferencePool::new();
        pool.insert("organization_id", vec![]);
        assert!(pool.is_unresolved("organization_id"));
        assert!(pool.values("organization_id").is_none());
        assert_eq!(
            pool.unresolved_columns().collect::<Vec<_>>(),
            vec!["organization_id"]
        );
    }

    #[test]
    fn test_membership_is_type_agnostic() {
        let mut pool = ReferencePool::new();
        pool.insert("user_id", vec![SeedValue::Integer(1), SeedValue::Integer(2)]);
        assert!(pool.contains_value("user_id", &SeedValue::Integer(2)));
        assert!(pool.contains_value("user_id", &SeedValue::Text("2".into())));
        assert!(!pool.contains_value("user_id", &SeedValue::Integer(3)));
        assert!(!pool.contains_value("user_id", &SeedValue::Null));
        assert!(!pool.contains_value("other", &SeedValue::Integer(1)));
    }
}
