//! Batched INSERT logic.

use crate::error::PostgreSQLSeedError;
use crate::value::{bind_value, placeholder, quote_ident, BoxedParam};
use seed_core::{ColumnDescriptor, SeedRow, SeedValue, TableDescriptor};
use std::time::Duration;
use tokio_postgres::types::ToSql;
use tokio_postgres::Transaction;
use tracing::debug;

/// Schema-qualified, quoted table name.
pub fn qualified_name(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

/// `SET LOCAL` statements applied at the start of each table transaction.
///
/// A zero duration disables the corresponding timeout.
pub fn transaction_settings(
    schema: &str,
    statement_timeout: Duration,
    lock_timeout: Duration,
) -> String {
    format!(
        "SET LOCAL search_path TO {}, public; SET LOCAL statement_timeout = {}; SET LOCAL lock_timeout = {}",
        quote_ident(schema),
        statement_timeout.as_millis(),
        lock_timeout.as_millis()
    )
}

/// Multi-row INSERT for `row_count` rows over `columns`.
pub fn build_insert_sql(
    schema: &str,
    table: &str,
    columns: &[&ColumnDescriptor],
    row_count: usize,
) -> String {
    if columns.is_empty() {
        return format!("INSERT INTO {} DEFAULT VALUES", qualified_name(schema, table));
    }

    let mut param_idx = 1;
    let placeholders: Vec<String> = (0..row_count)
        .map(|_| {
            let row: Vec<String> = columns
                .iter()
                .map(|column| {
                    let p = placeholder(param_idx, column);
                    param_idx += 1;
                    p
                })
                .collect();
            format!("({})", row.join(", "))
        })
        .collect();

    format!(
        "INSERT INTO {} ({}) VALUES {}",
        qualified_name(schema, table),
        columns
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", "),
        placeholders.join(", ")
    )
}

/// Resolve `names` against the descriptor, preserving order.
pub fn resolve_columns<'a>(
    table: &'a TableDescriptor,
    names: &[String],
) -> Result<Vec<&'a ColumnDescriptor>, PostgreSQLSeedError> {
    names
        .iter()
        .map(|name| {
            table.column(name).ok_or_else(|| PostgreSQLSeedError::Bind {
                column: name.clone(),
                message: format!("no such column on '{}'", table.name),
            })
        })
        .collect()
}

/// Insert one batch of rows inside `tx`.
///
/// Columns a row does not carry are bound as NULL.
pub async fn insert_batch(
    tx: &Transaction<'_>,
    schema: &str,
    table: &TableDescriptor,
    columns: &[&ColumnDescriptor],
    rows: &[SeedRow],
) -> Result<u64, PostgreSQLSeedError> {
    if rows.is_empty() {
        return Ok(0);
    }

    if columns.is_empty() {
        let sql = build_insert_sql(schema, &table.name, columns, 1);
        for _ in rows {
            tx.execute(&sql, &[]).await?;
        }
        return Ok(rows.len() as u64);
    }

    let sql = build_insert_sql(schema, &table.name, columns, rows.len());

    let mut params: Vec<BoxedParam> = Vec::with_capacity(rows.len() * columns.len());
    for row in rows {
        for column in columns {
            let value = row.get(&column.name).unwrap_or(&SeedValue::Null);
            params.push(bind_value(column, value)?);
        }
    }

    let param_refs: Vec<&(dyn ToSql + Sync)> = params
        .iter()
        .map(|p| p.as_ref() as &(dyn ToSql + Sync))
        .collect();

    let inserted = tx.execute(&sql, &param_refs).await?;
    debug!(table = %table.name, rows = inserted, "Inserted batch");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use seed_core::ColumnType;

    #[test]
    fn test_build_insert_sql() {
        let name = ColumnDescriptor::new("name", ColumnType::text(), "varchar");
        let user_id = ColumnDescriptor::new("user_id", ColumnType::Integer, "int4");
        let sql = build_insert_sql("public", "students", &[&name, &user_id], 2);
        assert_eq!(
            sql,
            "INSERT INTO \"public\".\"students\" (\"name\", \"user_id\") VALUES \
             ($1::text::\"varchar\", $2::int8::\"int4\"), ($3::text::\"varchar\", $4::int8::\"int4\")"
        );
    }

    #[test]
    fn test_build_insert_sql_default_values() {
        assert_eq!(
            build_insert_sql("app", "ticks", &[], 10),
            "INSERT INTO \"app\".\"ticks\" DEFAULT VALUES"
        );
    }

    #[test]
    fn test_transaction_settings() {
        assert_eq!(
            transaction_settings("public", Duration::from_secs(30), Duration::ZERO),
            "SET LOCAL search_path TO \"public\", public; SET LOCAL statement_timeout = 30000; SET LOCAL lock_timeout = 0"
        );
    }

    #[test]
    fn test_resolve_unknown_column() {
        let table = TableDescriptor::new(
            "users",
            vec![ColumnDescriptor::new("email", ColumnType::text(), "text")],
        );
        assert!(resolve_columns(&table, &["email".to_string()]).is_ok());
        assert!(resolve_columns(&table, &["nickname".to_string()]).is_err());
    }
}
