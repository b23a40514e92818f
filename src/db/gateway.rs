use serde::{Deserialize, Serialize};

use super::schema::Row;
use super::session::{QueryError, SqlSession};

/// Outcome of one statement, shaped by its kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum QueryResult {
    /// Rows of a read, in the order the engine returned them.
    #[serde(rename_all = "camelCase")]
    Select { rows: Vec<Row> },
    /// Engine-reported row-change count of a mutation; 0 when nothing
    /// matched.
    #[serde(rename_all = "camelCase")]
    Mutation { affected_rows: u64 },
}

/// Classify a statement by its leading keyword. This is a heuristic, not a
/// parser: anything that does not start with SELECT runs down the mutation
/// path (a read executed there comes back as `Mutation { affected_rows: 0 }`).
/// It is not a security control; callers reach this gateway pre-authorized.
pub fn is_read_statement(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed
        .as_bytes()
        .get(..6)
        .map_or(false, |prefix| prefix.eq_ignore_ascii_case(b"SELECT"))
}

/// Run one raw statement and report its outcome in a uniform shape. Any
/// engine failure comes back as a [`QueryError`] carrying the engine's
/// message; a failed mutation has no partial effect beyond what the engine
/// itself guarantees for a single statement.
pub async fn execute_statement(
    session: &mut dyn SqlSession,
    text: &str,
) -> Result<QueryResult, QueryError> {
    if is_read_statement(text) {
        let rows = session.query(text).await?;
        Ok(QueryResult::Select { rows })
    } else {
        let affected_rows = session.execute(text).await?;
        Ok(QueryResult::Mutation { affected_rows })
    }
}
