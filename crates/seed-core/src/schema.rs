//! Table and column descriptors built from live database metadata.
//!
//! A [`TableDescriptor`] is produced by a [`SeedTarget`](crate::SeedTarget)
//! at the start of each table pass and dropped when the pass ends. It is
//! never persisted and never modified after construction.

use crate::types::ColumnType;
use serde::{Deserialize, Serialize};

/// Target of a foreign key column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    /// Schema of the referenced table; `None` is the schema being seeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Referenced table
    pub table: String,
    /// Referenced column
    pub column: String,
}

impl ForeignKeyRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: table.into(),
            column: column.into(),
        }
    }

    /// Reference into another schema.
    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// `schema.table` for foreign schemas, the bare table name otherwise.
    pub fn qualified_table(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}", self.table),
            None => self.table.clone(),
        }
    }
}

/// Column metadata as reported by the live catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name
    pub name: String,

    /// Type category
    #[serde(rename = "type")]
    pub column_type: ColumnType,

    /// Database type name (`int4`, `uuid`, `varchar`, an enum's type name, ...)
    pub native_type: String,

    /// Schema of `native_type` when it lives outside the seeded schema and
    /// the system catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_schema: Option<String>,

    /// Whether NULL is accepted
    pub nullable: bool,

    /// Part of the primary key
    #[serde(default)]
    pub is_primary_key: bool,

    /// Covered on its own by a UNIQUE constraint or a single-column primary key
    #[serde(default)]
    pub is_unique: bool,

    /// Has a column default, serial sequence or identity
    #[serde(default)]
    pub has_default: bool,

    /// Generated column; never written
    #[serde(default)]
    pub is_generated: bool,

    /// Foreign key target, if the column references another table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKeyRef>,
}

impl ColumnDescriptor {
    /// A NOT NULL column with no default and no key role.
    pub fn new(
        name: impl Into<String>,
        column_type: ColumnType,
        native_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            column_type,
            native_type: native_type.into(),
            native_schema: None,
            nullable: false,
            is_primary_key: false,
            is_unique: false,
            has_default: false,
            is_generated: false,
            foreign_key: None,
        }
    }

    /// Auto-assigned integer primary key (`serial` / identity).
    pub fn serial_key(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Integer, "int4")
            .primary_key()
            .with_default()
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    pub fn generated(mut self) -> Self {
        self.is_generated = true;
        self
    }

    pub fn references(self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.with_foreign_key(ForeignKeyRef::new(table, column))
    }

    pub fn with_foreign_key(mut self, foreign_key: ForeignKeyRef) -> Self {
        self.foreign_key = Some(foreign_key);
        self
    }

    pub fn is_foreign_key(&self) -> bool {
        self.foreign_key.is_some()
    }

    /// Whether the column may appear in an INSERT column list.
    pub fn is_insertable(&self) -> bool {
        !self.is_generated
    }

    /// Primary key the database assigns by itself.
    pub fn is_auto_key(&self) -> bool {
        self.is_primary_key && self.has_default
    }
}

/// Live description of one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Table name
    pub name: String,

    /// Columns in ordinal position order
    pub columns: Vec<ColumnDescriptor>,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn primary_key_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.is_primary_key)
    }

    /// Whether `column` must hold a distinct value in every row.
    ///
    /// True for UNIQUE columns and for the sole column of a primary key.
    pub fn requires_distinct(&self, column: &ColumnDescriptor) -> bool {
        column.is_unique || (column.is_primary_key && self.primary_key_columns().count() == 1)
    }

    pub fn foreign_key_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.is_foreign_key())
    }

    /// Columns a synthesizer is expected to fill.
    pub fn writable_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns
            .iter()
            .filter(|c| c.is_insertable() && !c.is_auto_key())
    }

    /// Estimated bytes per row over the writable columns.
    pub fn estimated_row_width(&self) -> usize {
        self.writable_columns()
            .map(|c| c.column_type.estimated_width())
            .sum::<usize>()
            .max(1)
    }
}

/// A foreign key relationship between two tables, one column at a time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeyEdge {
    /// Referencing table
    pub table: String,
    /// Referencing column
    pub column: String,
    /// Schema of the referenced table when it differs from the referencing one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_schema: Option<String>,
    /// Referenced table
    pub referenced_table: String,
    /// Referenced column
    pub referenced_column: String,
}

impl ForeignKeyEdge {
    pub fn new(
        table: impl Into<String>,
        column: impl Into<String>,
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            referenced_schema: None,
            referenced_table: referenced_table.into(),
            referenced_column: referenced_column.into(),
        }
    }

    pub fn with_referenced_schema(mut self, schema: impl Into<String>) -> Self {
        self.referenced_schema = Some(schema.into());
        self
    }

    /// The referenced table lives in another schema.
    pub fn is_cross_schema(&self) -> bool {
        self.referenced_schema.is_some()
    }

    pub fn is_self_reference(&self) -> bool {
        !self.is_cross_schema() && self.table == self.referenced_table
    }

    /// Target of this edge as seen from the referencing column.
    pub fn target(&self) -> ForeignKeyRef {
        let target = ForeignKeyRef::new(&self.referenced_table, &self.referenced_column);
        match &self.referenced_schema {
            Some(schema) => target.in_schema(schema),
            None => target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn students() -> TableDescriptor {
        TableDescriptor::new(
            "students",
            vec![
                ColumnDescriptor::serial_key("id"),
                ColumnDescriptor::new("user_id", ColumnType::Integer, "int4")
                    .references("users", "id"),
                ColumnDescriptor::new("mentor_id", ColumnType::Integer, "int4")
                    .nullable()
                    .references("users", "id"),
                ColumnDescriptor::new(
                    "nickname",
                    ColumnType::Text { max_length: Some(40) },
                    "varchar",
                ),
                ColumnDescriptor::new("search", ColumnType::text(), "tsvector").generated(),
            ],
        )
    }

    #[test]
    fn test_key_queries() {
        let table = students();
        assert_eq!(table.primary_key_columns().count(), 1);
        assert_eq!(
            table.foreign_key_columns().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            vec!["user_id", "mentor_id"]
        );
        assert!(table.column("id").unwrap().is_auto_key());
        assert!(table.column("missing").is_none());
    }

    #[test]
    fn test_writable_columns_skip_auto_and_generated() {
        let table = students();
        let names: Vec<_> = table.writable_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["user_id", "mentor_id", "nickname"]);
        // 8 + 8 + 40
        assert_eq!(table.estimated_row_width(), 56);
    }

    #[test]
    fn test_self_reference() {
        let edge = ForeignKeyEdge::new("employees", "manager_id", "employees", "id");
        assert!(edge.is_self_reference());

        let other_schema = edge.with_referenced_schema("hr");
        assert!(!other_schema.is_self_reference());
        assert_eq!(other_schema.target().qualified_table(), "hr.employees");
    }

    #[test]
    fn test_requires_distinct() {
        let profiles = TableDescriptor::new(
            "profiles",
            vec![
                ColumnDescriptor::new("user_id", ColumnType::Integer, "int4")
                    .primary_key()
                    .references("users", "id"),
                ColumnDescriptor::new("badge_id", ColumnType::Integer, "int4")
                    .unique()
                    .references("badges", "id"),
                ColumnDescriptor::new("team_id", ColumnType::Integer, "int4")
                    .references("teams", "id"),
            ],
        );
        let distinct: Vec<_> = profiles
            .columns
            .iter()
            .filter(|c| profiles.requires_distinct(c))
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(distinct, vec!["user_id", "badge_id"]);

        // a composite key only constrains the tuple
        let memberships = TableDescriptor::new(
            "memberships",
            vec![
                ColumnDescriptor::new("user_id", ColumnType::Integer, "int4").primary_key(),
                ColumnDescriptor::new("team_id", ColumnType::Integer, "int4").primary_key(),
            ],
        );
        assert!(memberships.columns.iter().all(|c| !memberships.requires_distinct(c)));
    }
}
