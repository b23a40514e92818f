pub mod connection;
pub mod gateway;
pub mod introspect;
pub mod schema;
pub mod session;
pub mod sql;
pub mod sync;

pub use connection::{ConnectionConfig, ConnectionError, ConnectionManager};
pub use gateway::{execute_statement, QueryResult};
pub use introspect::{describe_table, list_tables, IntrospectError};
pub use schema::{ColumnInfo, Row, TableInfo};
pub use session::{QueryError, SqlSession, TiberiusSession};
