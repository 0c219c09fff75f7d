//! Live schema introspection.
//!
//! Column shapes are read from `information_schema.columns`; keys come from
//! `pg_constraint` and enum labels from `pg_enum`. Every query is read-only
//! and scoped to one schema.

use crate::error::PostgreSQLSeedError;
use seed_core::{ColumnDescriptor, ColumnType, ForeignKeyEdge, TableDescriptor};
use std::collections::{HashMap, HashSet};
use tokio_postgres::Client;
use tracing::debug;

const COLUMNS_QUERY: &str = "
    SELECT column_name::text,
           data_type::text,
           udt_name::text,
           is_nullable::text,
           column_default::text,
           is_identity::text,
           identity_generation::text,
           character_maximum_length::int4,
           is_generated::text,
           udt_schema::text
    FROM information_schema.columns
    WHERE table_schema::text = $1 AND table_name::text = $2
    ORDER BY ordinal_position";

const PRIMARY_KEY_QUERY: &str = "
    SELECT a.attname::text
    FROM pg_constraint c
    JOIN pg_class t ON t.oid = c.conrelid
    JOIN pg_namespace n ON n.oid = t.relnamespace
    JOIN pg_attribute a ON a.attrelid = c.conrelid AND a.attnum = ANY(c.conkey)
    WHERE c.contype = 'p' AND n.nspname::text = $1 AND t.relname::text = $2
    ORDER BY array_position(c.conkey, a.attnum)";

// Single-column unique indexes, which includes UNIQUE and PRIMARY KEY
// constraints. Partial and expression indexes do not make a column unique.
const UNIQUE_COLUMNS_QUERY: &str = "
    SELECT a.attname::text
    FROM pg_index i
    JOIN pg_class t ON t.oid = i.indrelid
    JOIN pg_namespace n ON n.oid = t.relnamespace
    JOIN pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = i.indkey[0]
    WHERE i.indisunique AND i.indnkeyatts = 1
      AND i.indpred IS NULL AND i.indexprs IS NULL
      AND n.nspname::text = $1 AND t.relname::text = $2";

const FOREIGN_KEYS_QUERY: &str = "
    SELECT src.relname::text, sa.attname::text,
           dn.nspname::text, dst.relname::text, da.attname::text
    FROM pg_constraint c
    JOIN pg_class src ON src.oid = c.conrelid
    JOIN pg_namespace n ON n.oid = src.relnamespace
    JOIN pg_class dst ON dst.oid = c.confrelid
    JOIN pg_namespace dn ON dn.oid = dst.relnamespace
    CROSS JOIN LATERAL unnest(c.conkey, c.confkey)
        WITH ORDINALITY AS k(src_attnum, dst_attnum, position)
    JOIN pg_attribute sa ON sa.attrelid = c.conrelid AND sa.attnum = k.src_attnum
    JOIN pg_attribute da ON da.attrelid = c.confrelid AND da.attnum = k.dst_attnum
    WHERE c.contype = 'f' AND n.nspname::text = $1 AND src.relname::text = ANY($2::text[])
    ORDER BY src.relname, c.conname, k.position";

const ENUM_LABELS_QUERY: &str = "
    SELECT e.enumlabel::text
    FROM pg_enum e
    JOIN pg_type t ON t.oid = e.enumtypid
    JOIN pg_namespace n ON n.oid = t.typnamespace
    WHERE n.nspname::text = $1 AND t.typname::text = $2
    ORDER BY e.enumsortorder";

/// Map PostgreSQL column metadata to a [`ColumnType`].
///
/// `data_type` is the `information_schema` spelling, `udt_name` the
/// `pg_type` name. Enum labels are only consulted for `USER-DEFINED` types.
///
/// # Example
///
/// ```
/// use seed_core::ColumnType;
/// use seed_postgresql::catalog::postgresql_column_to_column_type;
///
/// assert_eq!(
///     postgresql_column_to_column_type("integer", "int4", None, &[]),
///     ColumnType::Integer
/// );
/// assert_eq!(
///     postgresql_column_to_column_type("character varying", "varchar", Some(40), &[]),
///     ColumnType::Text { max_length: Some(40) }
/// );
/// ```
pub fn postgresql_column_to_column_type(
    data_type: &str,
    udt_name: &str,
    max_length: Option<u32>,
    enum_labels: &[String],
) -> ColumnType {
    match data_type.to_lowercase().as_str() {
        "smallint" | "integer" | "bigint" | "int2" | "int4" | "int8" | "smallserial"
        | "serial" | "bigserial" => ColumnType::Integer,

        "real" | "double precision" | "numeric" | "decimal" | "float4" | "float8" => {
            ColumnType::Float
        }

        "boolean" | "bool" => ColumnType::Bool,

        "timestamp" | "timestamp without time zone" | "timestamptz"
        | "timestamp with time zone" | "date" | "time" | "time without time zone"
        | "timetz" | "time with time zone" => ColumnType::Timestamp,

        "json" | "jsonb" => ColumnType::Json,

        "user-defined" if !enum_labels.is_empty() => ColumnType::Enum {
            labels: enum_labels.to_vec(),
        },

        // udt_name is authoritative when data_type is something generic
        "user-defined" | "array" => match udt_name {
            "int2" | "int4" | "int8" | "float4" | "float8" | "numeric" | "bool" | "json"
            | "jsonb" => postgresql_column_to_column_type(udt_name, udt_name, max_length, &[]),
            _ => ColumnType::Text { max_length },
        },

        _ => ColumnType::Text { max_length },
    }
}

/// Describe `table` in `schema`.
///
/// Foreign keys into other schemas keep that schema on their
/// [`ForeignKeyRef`](seed_core::ForeignKeyRef).
pub async fn describe_table(
    client: &Client,
    schema: &str,
    table: &str,
) -> Result<TableDescriptor, PostgreSQLSeedError> {
    let rows = client.query(COLUMNS_QUERY, &[&schema, &table]).await?;
    if rows.is_empty() {
        return Err(PostgreSQLSeedError::TableNotFound(table.to_string()));
    }

    let primary_keys: HashSet<String> = client
        .query(PRIMARY_KEY_QUERY, &[&schema, &table])
        .await?
        .iter()
        .map(|row| row.get::<_, String>(0))
        .collect();

    let unique_columns: HashSet<String> = client
        .query(UNIQUE_COLUMNS_QUERY, &[&schema, &table])
        .await?
        .iter()
        .map(|row| row.get::<_, String>(0))
        .collect();

    let foreign_keys: HashMap<String, ForeignKeyEdge> =
        foreign_keys(client, schema, &[table.to_string()])
            .await?
            .into_iter()
            .map(|edge| (edge.column.clone(), edge))
            .collect();

    let mut columns = Vec::with_capacity(rows.len());
    for row in rows {
        let name: String = row.get(0);
        let data_type: String = row.get(1);
        let udt_name: String = row.get(2);
        let is_nullable: String = row.get(3);
        let column_default: Option<String> = row.get(4);
        let is_identity: Option<String> = row.get(5);
        let identity_generation: Option<String> = row.get(6);
        let max_length: Option<i32> = row.get(7);
        let is_generated: Option<String> = row.get(8);
        let udt_schema: String = row.get(9);

        let labels = if data_type == "USER-DEFINED" {
            enum_labels(client, &udt_schema, &udt_name).await?
        } else {
            Vec::new()
        };
        let column_type = postgresql_column_to_column_type(
            &data_type,
            &udt_name,
            max_length.map(|len| len as u32),
            &labels,
        );

        let mut column = ColumnDescriptor::new(name, column_type, udt_name);
        if udt_schema != schema && udt_schema != "pg_catalog" {
            column.native_schema = Some(udt_schema);
        }
        column.nullable = is_nullable == "YES";
        column.is_primary_key = primary_keys.contains(&column.name);
        column.is_unique = unique_columns.contains(&column.name);
        column.has_default = column_default.is_some() || is_identity.as_deref() == Some("YES");
        // GENERATED ALWAYS rejects explicit values just like a generated column
        column.is_generated = is_generated.as_deref() == Some("ALWAYS")
            || identity_generation.as_deref() == Some("ALWAYS");
        if let Some(edge) = foreign_keys.get(&column.name) {
            column = column.with_foreign_key(edge.target());
        }
        columns.push(column);
    }

    debug!(
        table,
        columns = columns.len(),
        primary_keys = primary_keys.len(),
        foreign_keys = foreign_keys.len(),
        "Described table"
    );
    Ok(TableDescriptor::new(table, columns))
}

/// Foreign key edges whose referencing table is one of `tables`.
///
/// Composite keys yield one edge per column pair in key order. Edges into
/// another schema carry it as `referenced_schema`.
pub async fn foreign_keys(
    client: &Client,
    schema: &str,
    tables: &[String],
) -> Result<Vec<ForeignKeyEdge>, PostgreSQLSeedError> {
    let rows = client.query(FOREIGN_KEYS_QUERY, &[&schema, &tables]).await?;
    Ok(rows
        .iter()
        .map(|row| {
            let edge = ForeignKeyEdge::new(
                row.get::<_, String>(0),
                row.get::<_, String>(1),
                row.get::<_, String>(3),
                row.get::<_, String>(4),
            );
            let referenced_schema: String = row.get(2);
            if referenced_schema == schema {
                edge
            } else {
                edge.with_referenced_schema(referenced_schema)
            }
        })
        .collect())
}

/// Labels of enum type `schema.type_name` in sort order; empty if the type
/// is not an enum.
pub async fn enum_labels(
    client: &Client,
    schema: &str,
    type_name: &str,
) -> Result<Vec<String>, PostgreSQLSeedError> {
    let rows = client.query(ENUM_LABELS_QUERY, &[&schema, &type_name]).await?;
    Ok(rows.iter().map(|row| row.get(0)).collect())
}
