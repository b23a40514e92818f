use serde::{Deserialize, Serialize};
use thiserror::Error;
use tiberius::{AuthMethod, Client, Config, EncryptionLevel};
use tokio::net::TcpStream;
use tokio_util::compat::TokioAsyncWriteCompatExt;

use super::session::{QueryError, SqlSession, TiberiusSession};
use super::sql::{escape_literal, quote_ident};
use super::sync;

const ADMIN_DATABASE: &str = "master";
const DEFAULT_PORT: u16 = 1433;

/// Connection settings supplied by the hosting application. The core
/// substitutes no defaults for these fields; `server` may carry an explicit
/// port as ADO-style `host,port`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    pub server: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

/// Failure of the connect sequence. Fatal to the calling operation; the
/// manager never retries on its own.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("cannot reach SQL Server at {addr}: {source}")]
    Unreachable {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("authentication against {database} failed: {source}")]
    Authentication {
        database: String,
        #[source]
        source: tiberius::error::Error,
    },
    #[error("could not create database {database}: {source}")]
    DatabaseCreate {
        database: String,
        #[source]
        source: QueryError,
    },
    #[error("schema sync on {database} failed: {source}")]
    SchemaSync {
        database: String,
        #[source]
        source: QueryError,
    },
}

/// Sole owner of the application's relational connection. Components borrow
/// the live session from here; nothing else opens connections.
#[derive(Default)]
pub struct ConnectionManager {
    session: Option<TiberiusSession>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self { session: None }
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Borrow the live session, if any.
    pub fn session(&mut self) -> Option<&mut TiberiusSession> {
        self.session.as_mut()
    }

    /// Connect to the configured database, creating it first when absent.
    ///
    /// The database-existence check runs over a separate session bound to the
    /// administrative database, because the engine refuses CREATE DATABASE
    /// from a connection already bound to the target. After the target
    /// session is up the entity schema is applied additively. On any failure
    /// the manager holds no session at all.
    pub async fn connect(&mut self, config: &ConnectionConfig) -> Result<(), ConnectionError> {
        self.session = None;

        let mut admin = open_session(config, ADMIN_DATABASE).await?;
        ensure_database(&mut admin, &config.database).await?;
        drop(admin);

        let mut session = open_session(config, &config.database).await?;
        sync::apply_entity_schema(&mut session)
            .await
            .map_err(|source| ConnectionError::SchemaSync {
                database: config.database.clone(),
                source,
            })?;

        log::info!("connected to database {}", config.database);
        self.session = Some(session);
        Ok(())
    }

    /// Release the connection. Safe to call when already disconnected.
    pub fn disconnect(&mut self) {
        if self.session.take().is_some() {
            log::info!("database connection released");
        }
    }
}

/// Split a `server` value into host and port. `host,port` is the ADO
/// convention for SQL Server; a bare host uses the standard TDS port.
fn split_server(server: &str) -> (String, u16) {
    match server.split_once(',') {
        Some((host, port)) => (
            host.trim().to_string(),
            port.trim().parse().unwrap_or(DEFAULT_PORT),
        ),
        None => (server.trim().to_string(), DEFAULT_PORT),
    }
}

async fn open_session(
    config: &ConnectionConfig,
    database: &str,
) -> Result<TiberiusSession, ConnectionError> {
    let (host, port) = split_server(&config.server);
    let addr = format!("{}:{}", host, port);

    let mut tib_config = Config::new();
    tib_config.host(&host);
    tib_config.port(port);
    tib_config.database(database);
    tib_config.authentication(AuthMethod::sql_server(&config.username, &config.password));
    tib_config.trust_cert();
    tib_config.encryption(EncryptionLevel::Required);

    let tcp = TcpStream::connect(&addr)
        .await
        .map_err(|source| ConnectionError::Unreachable {
            addr: addr.clone(),
            source,
        })?;
    tcp.set_nodelay(true)
        .map_err(|source| ConnectionError::Unreachable {
            addr: addr.clone(),
            source,
        })?;

    let client = Client::connect(tib_config, tcp.compat_write())
        .await
        .map_err(|source| ConnectionError::Authentication {
            database: database.to_string(),
            source,
        })?;

    Ok(TiberiusSession::from_client(client))
}

/// Create the target database when the catalog does not know it yet.
async fn ensure_database(
    admin: &mut TiberiusSession,
    database: &str,
) -> Result<(), ConnectionError> {
    let check = format!(
        "SELECT name FROM sys.databases WHERE name = N'{}'",
        escape_literal(database)
    );
    let rows = admin
        .query(&check)
        .await
        .map_err(|source| ConnectionError::DatabaseCreate {
            database: database.to_string(),
            source,
        })?;

    if rows.is_empty() {
        log::info!("database {} does not exist yet, creating it", database);
        let create = format!("CREATE DATABASE {}", quote_ident(database));
        admin
            .execute(&create)
            .await
            .map_err(|source| ConnectionError::DatabaseCreate {
                database: database.to_string(),
                source,
            })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_server_bare_host() {
        assert_eq!(split_server("localhost"), ("localhost".to_string(), 1433));
        assert_eq!(split_server(" db.internal "), ("db.internal".to_string(), 1433));
    }

    #[test]
    fn test_split_server_with_port() {
        assert_eq!(
            split_server("localhost,1434"),
            ("localhost".to_string(), 1434)
        );
        assert_eq!(split_server("host, 1500"), ("host".to_string(), 1500));
    }

    #[test]
    fn test_split_server_bad_port_falls_back() {
        assert_eq!(split_server("host,abc"), ("host".to_string(), 1433));
    }

    #[test]
    fn test_manager_starts_disconnected() {
        let mut manager = ConnectionManager::new();
        assert!(!manager.is_connected());
        assert!(manager.session().is_none());
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let mut manager = ConnectionManager::new();
        manager.disconnect();
        manager.disconnect();
        assert!(!manager.is_connected());
    }
}
