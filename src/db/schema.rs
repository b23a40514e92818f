use serde::{Deserialize, Serialize};

/// A database row as an ordered map of column names to JSON values.
///
/// `serde_json`'s preserve_order feature keeps the columns in the order the
/// engine returned them.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// A user table visible to the database viewer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    pub name: String,
    pub schema_name: String,
}

/// One column of a table, with key metadata resolved from the catalog.
///
/// `is_foreign_key` is true exactly when both `foreign_table` and
/// `foreign_column` are known.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub max_length: Option<i32>,
    pub precision: Option<i32>,
    pub scale: Option<i32>,
    pub is_nullable: bool,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
    pub foreign_table: Option<String>,
    pub foreign_column: Option<String>,
    pub ordinal_position: i32,
}
