use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::db::schema::Row;
use crate::db::session::{QueryError, SqlSession};
use crate::db::sql::{self, escape_literal};
use crate::db::sync::USERS_TABLE;

const TABLE: &str = USERS_TABLE.name;

/// A stored account. `password_hash` is produced by the authentication
/// collaborator before it reaches this layer; the store never sees a
/// plaintext credential and never returns the hash in listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub username: String,
    pub password_hash: String,
    pub full_name: String,
}

/// Hash-free projection used by account listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSummary {
    pub username: String,
    pub full_name: String,
    pub created_at: Option<String>,
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error("username '{username}' already exists")]
    Duplicate { username: String },
    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Create an account, refusing a username that is already taken. The
/// `createdAt` column fills itself from its default.
pub async fn create(session: &mut dyn SqlSession, account: &UserAccount) -> Result<(), UserError> {
    let check = format!(
        "SELECT username FROM Users WHERE username = N'{}'",
        escape_literal(&account.username)
    );
    if !session.query(&check).await?.is_empty() {
        return Err(UserError::Duplicate {
            username: account.username.clone(),
        });
    }

    let mut row = Row::new();
    row.insert("username".to_string(), json!(account.username));
    row.insert("password".to_string(), json!(account.password_hash));
    row.insert("fullName".to_string(), json!(account.full_name));
    session.execute(&sql::insert_sql(TABLE, &row)).await?;
    log::info!("created user account {}", account.username);
    Ok(())
}

/// List accounts by username, without credential material.
pub async fn list(session: &mut dyn SqlSession) -> Result<Vec<UserSummary>, UserError> {
    let rows = session
        .query("SELECT username, fullName, createdAt FROM Users ORDER BY username")
        .await?;
    Ok(rows
        .into_iter()
        .filter_map(|row| serde_json::from_value(serde_json::Value::Object(row)).ok())
        .collect())
}
