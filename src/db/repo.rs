//! Repository for persisted engine events.

use crate::domain::{Address, EngineEvent};
use serde::Serialize;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

/// An event as stored, with its decoded JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEvent {
    pub event_key: String,
    pub op_seq: i64,
    pub position: i64,
    pub kind: String,
    pub owner: String,
    pub payload: serde_json::Value,
    pub created_at: i64,
}

/// Repository for database operations.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    /// Store the events of operation `op_seq` in one transaction.
    ///
    /// Re-inserting a batch is a no-op thanks to the unique event key. Returns the number of
    /// newly stored rows.
    ///
    /// # Errors
    /// Returns an error if encoding or the insert fails.
    pub async fn insert_events(
        &self,
        op_seq: u64,
        events: &[EngineEvent],
    ) -> Result<u64, sqlx::Error> {
        if events.is_empty() {
            return Ok(0);
        }

        let created_at = chrono::Utc::now().timestamp_millis();
        let mut inserted = 0;
        let mut tx = self.pool.begin().await?;

        for (position, event) in events.iter().enumerate() {
            let payload = serde_json::to_string(event)
                .map_err(|e| sqlx::Error::Protocol(format!("event payload encoding: {e}")))?;
            let result = sqlx::query(
                r#"
                INSERT INTO engine_events (event_key, op_seq, position, kind, owner, payload, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(event_key) DO NOTHING
                "#,
            )
            .bind(event.event_key(op_seq, position))
            .bind(op_seq as i64)
            .bind(position as i64)
            .bind(event.kind())
            .bind(event.owner().as_str())
            .bind(payload)
            .bind(created_at)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Stored events, oldest first, optionally restricted to one owner.
    ///
    /// # Errors
    /// Returns an error if the query fails or a payload is not valid JSON.
    pub async fn query_events(
        &self,
        owner: Option<&Address>,
        limit: i64,
    ) -> Result<Vec<StoredEvent>, sqlx::Error> {
        let rows = match owner {
            Some(owner) => {
                sqlx::query(
                    r#"
                    SELECT event_key, op_seq, position, kind, owner, payload, created_at
                    FROM engine_events
                    WHERE owner = ?
                    ORDER BY op_seq ASC, position ASC
                    LIMIT ?
                    "#,
                )
                .bind(owner.as_str())
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT event_key, op_seq, position, kind, owner, payload, created_at
                    FROM engine_events
                    ORDER BY op_seq ASC, position ASC
                    LIMIT ?
                    "#,
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(decode_event).collect()
    }

    /// Highest operation sequence stored so far.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn max_op_seq(&self) -> Result<Option<u64>, sqlx::Error> {
        let row = sqlx::query("SELECT MAX(op_seq) AS max_seq FROM engine_events")
            .fetch_one(&self.pool)
            .await?;
        let max_seq: Option<i64> = row.get("max_seq");
        Ok(max_seq.map(|seq| seq as u64))
    }
}

fn decode_event(row: &SqliteRow) -> Result<StoredEvent, sqlx::Error> {
    let payload: String = row.get("payload");
    Ok(StoredEvent {
        event_key: row.get("event_key"),
        op_seq: row.get("op_seq"),
        position: row.get("position"),
        kind: row.get("kind"),
        owner: row.get("owner"),
        payload: serde_json::from_str(&payload).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        created_at: row.get("created_at"),
    })
}
