use super::schema::Row;

/// Quote an identifier for SQL Server.
pub fn quote_ident(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Escape a string for use inside an N'...' literal.
pub fn escape_literal(text: &str) -> String {
    text.replace('\'', "''")
}

/// Convert a serde_json::Value to an SQL literal.
pub fn value_to_sql(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::Bool(b) => {
            if *b {
                "1".to_string()
            } else {
                "0".to_string()
            }
        }
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => format!("N'{}'", escape_literal(s)),
        other => format!("N'{}'", escape_literal(&other.to_string())),
    }
}

/// Generate an INSERT statement, keeping the row's column order.
pub fn insert_sql(table: &str, row: &Row) -> String {
    let col_list = row
        .keys()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let val_list = row
        .values()
        .map(value_to_sql)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        col_list,
        val_list
    )
}

/// Generate an UPDATE statement using `key_columns` for the WHERE clause;
/// key columns are excluded from the SET list.
pub fn update_sql(table: &str, row: &Row, key_columns: &[&str]) -> String {
    let set_clause = row
        .iter()
        .filter(|(col, _)| !key_columns.contains(&col.as_str()))
        .map(|(col, val)| format!("{} = {}", quote_ident(col), value_to_sql(val)))
        .collect::<Vec<_>>()
        .join(", ");
    let where_clause = key_columns
        .iter()
        .map(|key| {
            let val = row.get(*key).cloned().unwrap_or(serde_json::Value::Null);
            format!("{} = {}", quote_ident(key), value_to_sql(&val))
        })
        .collect::<Vec<_>>()
        .join(" AND ");
    format!(
        "UPDATE {} SET {} WHERE {}",
        quote_ident(table),
        set_clause,
        where_clause
    )
}

/// Generate a DELETE statement keyed on a single column.
pub fn delete_sql(table: &str, key_column: &str, key_value: &serde_json::Value) -> String {
    format!(
        "DELETE FROM {} WHERE {} = {}",
        quote_ident(table),
        quote_ident(key_column),
        value_to_sql(key_value)
    )
}
