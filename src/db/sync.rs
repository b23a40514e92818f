use super::session::{QueryError, SqlSession};

/// Declarative column of an entity table.
#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub nullable: bool,
    pub primary_key: bool,
    pub default: Option<&'static str>,
}

/// Declarative entity table, owned by the application schema.
#[derive(Debug, Clone, Copy)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
}

const fn col(name: &'static str, sql_type: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        sql_type,
        nullable: true,
        primary_key: false,
        default: None,
    }
}

const fn required(name: &'static str, sql_type: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        sql_type,
        nullable: false,
        primary_key: false,
        default: None,
    }
}

const fn pk(name: &'static str, sql_type: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        sql_type,
        nullable: false,
        primary_key: true,
        default: None,
    }
}

const fn defaulted(
    name: &'static str,
    sql_type: &'static str,
    default: &'static str,
) -> ColumnDef {
    ColumnDef {
        name,
        sql_type,
        nullable: true,
        primary_key: false,
        default: Some(default),
    }
}

pub const USERS_TABLE: TableDef = TableDef {
    name: "Users",
    columns: &[
        pk("username", "NVARCHAR(50)"),
        required("password", "NVARCHAR(100)"),
        required("fullName", "NVARCHAR(100)"),
        defaulted("createdAt", "DATETIME2", "SYSUTCDATETIME()"),
    ],
};

pub const PRODUCTS_TABLE: TableDef = TableDef {
    name: "Products",
    columns: &[
        pk("id", "NVARCHAR(50)"),
        required("name", "NVARCHAR(255)"),
        col("code", "NVARCHAR(50)"),
        col("autoCode", "NVARCHAR(50)"),
        col("importPrice", "FLOAT"),
        col("salePrice", "FLOAT"),
        col("discountPercent", "FLOAT"),
        col("discountAmount", "FLOAT"),
        col("thumbnail", "NVARCHAR(MAX)"),
        col("productImages", "NVARCHAR(MAX)"),
        col("description", "NVARCHAR(MAX)"),
        defaulted("importedQuantity", "INT", "0"),
        defaulted("soldQuantity", "INT", "0"),
        defaulted("remainingQuantity", "INT", "0"),
    ],
};

/// Every table the application owns.
pub const ENTITY_TABLES: &[TableDef] = &[USERS_TABLE, PRODUCTS_TABLE];

fn column_clause(column: &ColumnDef) -> String {
    let mut clause = format!("[{}] {}", column.name, column.sql_type);
    if column.primary_key {
        clause.push_str(" PRIMARY KEY");
    } else if !column.nullable {
        clause.push_str(" NOT NULL");
    }
    if let Some(default) = column.default {
        clause.push_str(" DEFAULT ");
        clause.push_str(default);
    }
    clause
}

/// DDL that creates the table when it is missing and is a no-op otherwise.
pub fn create_table_sql(table: &TableDef) -> String {
    let columns = table
        .columns
        .iter()
        .map(column_clause)
        .collect::<Vec<_>>()
        .join(",\n        ");
    format!(
        "IF OBJECT_ID(N'dbo.{0}', N'U') IS NULL\nBEGIN\n    CREATE TABLE dbo.{0} (\n        {1}\n    )\nEND",
        table.name, columns
    )
}

/// DDL that back-fills one column onto an existing table, guarded so it only
/// runs when the column is missing. Returns `None` for columns that cannot
/// be added after the fact (NOT NULL without a default, primary keys).
pub fn add_missing_column_sql(table: &TableDef, column: &ColumnDef) -> Option<String> {
    if column.primary_key || (!column.nullable && column.default.is_none()) {
        return None;
    }
    Some(format!(
        "IF COL_LENGTH('dbo.{0}', '{1}') IS NULL\nBEGIN\n    ALTER TABLE dbo.{0} ADD {2}\nEND",
        table.name,
        column.name,
        column_clause(column)
    ))
}

/// Bring the entity tables up to date: create what is missing, add columns
/// introduced since the table was created. Columns are never dropped or
/// narrowed.
pub async fn apply_entity_schema(session: &mut dyn SqlSession) -> Result<(), QueryError> {
    for table in ENTITY_TABLES {
        session.execute(&create_table_sql(table)).await?;
        for column in table.columns {
            if let Some(sql) = add_missing_column_sql(table, column) {
                session.execute(&sql).await?;
            }
        }
        log::debug!("schema for table {} is up to date", table.name);
    }
    Ok(())
}
