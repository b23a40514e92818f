use thiserror::Error;

use super::schema::{ColumnInfo, Row, TableInfo};
use super::session::{QueryError, SqlSession};
use crate::security::validation::{validate_identifier, InvalidIdentifier};

/// Failure of a table-description request: either the caller handed us an
/// unsafe name (rejected before any catalog query runs), or the engine
/// failed the query itself.
#[derive(Debug, Error)]
pub enum IntrospectError {
    #[error(transparent)]
    InvalidIdentifier(#[from] InvalidIdentifier),
    #[error(transparent)]
    Query(#[from] QueryError),
}

const LIST_TABLES_SQL: &str = "SELECT t.name AS name, SCHEMA_NAME(t.schema_id) AS schemaName \
     FROM sys.tables t \
     WHERE t.is_ms_shipped = 0 \
     ORDER BY t.name";

/// Enumerate user tables, ordered by name. Engine-internal tables are
/// excluded. Descriptors are read fresh from the catalog on every call.
pub async fn list_tables(session: &mut dyn SqlSession) -> Result<Vec<TableInfo>, QueryError> {
    let rows = session.query(LIST_TABLES_SQL).await?;
    Ok(rows
        .iter()
        .map(|row| TableInfo {
            name: str_field(row, "name"),
            schema_name: str_field(row, "schemaName"),
        })
        .collect())
}

/// Describe one table's columns in physical order, with primary-key and
/// foreign-key membership resolved from the catalog.
///
/// A syntactically valid name that resolves to no table yields an empty
/// vector, not an error.
pub async fn describe_table(
    session: &mut dyn SqlSession,
    table_name: &str,
) -> Result<Vec<ColumnInfo>, IntrospectError> {
    validate_identifier(table_name)?;

    let sql = format!(
        "SELECT c.name AS name, t.name AS dataType, c.max_length AS maxLength, \
                c.[precision] AS [precision], c.scale AS scale, c.is_nullable AS isNullable, \
                CASE WHEN pk.column_id IS NOT NULL THEN 1 ELSE 0 END AS isPrimaryKey, \
                OBJECT_NAME(fk.referenced_object_id) AS foreignTable, \
                COL_NAME(fk.referenced_object_id, fk.referenced_column_id) AS foreignColumn, \
                c.column_id AS ordinalPosition \
         FROM sys.columns c \
         INNER JOIN sys.types t ON c.user_type_id = t.user_type_id \
         LEFT JOIN (SELECT i.object_id, ic.column_id \
                    FROM sys.indexes i \
                    INNER JOIN sys.index_columns ic \
                      ON i.object_id = ic.object_id AND i.index_id = ic.index_id \
                    WHERE i.is_primary_key = 1) pk \
           ON c.object_id = pk.object_id AND c.column_id = pk.column_id \
         LEFT JOIN sys.foreign_key_columns fk \
           ON c.object_id = fk.parent_object_id AND c.column_id = fk.parent_column_id \
         WHERE c.object_id = OBJECT_ID(N'{}') \
         ORDER BY c.column_id",
        table_name
    );

    let rows = session.query(&sql).await.map_err(IntrospectError::Query)?;
    Ok(rows.iter().map(column_from_row).collect())
}

fn column_from_row(row: &Row) -> ColumnInfo {
    // The foreign-key flag only holds when both sides of the reference are
    // known; a half-resolved reference is reported as no reference at all.
    let (foreign_table, foreign_column) =
        match (opt_str_field(row, "foreignTable"), opt_str_field(row, "foreignColumn")) {
            (Some(table), Some(column)) => (Some(table), Some(column)),
            _ => (None, None),
        };

    ColumnInfo {
        name: str_field(row, "name"),
        data_type: str_field(row, "dataType"),
        max_length: int_field(row, "maxLength"),
        precision: int_field(row, "precision"),
        scale: int_field(row, "scale"),
        is_nullable: bool_field(row, "isNullable"),
        is_primary_key: bool_field(row, "isPrimaryKey"),
        is_foreign_key: foreign_table.is_some(),
        foreign_table,
        foreign_column,
        ordinal_position: int_field(row, "ordinalPosition").unwrap_or(0),
    }
}

fn str_field(row: &Row, key: &str) -> String {
    opt_str_field(row, key).unwrap_or_default()
}

fn opt_str_field(row: &Row, key: &str) -> Option<String> {
    match row.get(key) {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

fn int_field(row: &Row, key: &str) -> Option<i32> {
    match row.get(key) {
        Some(serde_json::Value::Number(n)) => n.as_i64().map(|v| v as i32),
        _ => None,
    }
}

fn bool_field(row: &Row, key: &str) -> bool {
    match row.get(key) {
        Some(serde_json::Value::Bool(b)) => *b,
        Some(serde_json::Value::Number(n)) => n.as_i64().unwrap_or(0) != 0,
        _ => false,
    }
}
