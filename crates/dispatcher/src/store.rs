//! Notification queue store — the durable, ordered collection of
//! notification records.
//!
//! The dispatcher only sees the [`NotificationStore`] seam;
//! [`PgNotificationStore`] is the PostgreSQL implementation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use herald_common::error::AppError;
use herald_common::types::NotificationRecord;

/// Durable queue operations consumed by the dispatcher.
///
/// `record_outcome` must be a single atomic unit: set the response code,
/// increment the retry count, and stamp the attempt time together.
#[allow(async_fn_in_trait)]
pub trait NotificationStore {
    /// Load the candidate set: every record that was never attempted or
    /// whose last attempt failed, with retry budget remaining, in insertion
    /// order. Not every candidate is necessarily due yet.
    async fn load_candidates(&self, max_retry: i32)
    -> Result<Vec<NotificationRecord>, AppError>;

    /// Persist the result of one delivery attempt.
    async fn record_outcome(
        &self,
        id: Uuid,
        status_code: u16,
        attempted_at: DateTime<Utc>,
    ) -> Result<(), AppError>;
}

/// PostgreSQL-backed notification queue.
#[derive(Clone)]
pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl NotificationStore for PgNotificationStore {
    async fn load_candidates(
        &self,
        max_retry: i32,
    ) -> Result<Vec<NotificationRecord>, AppError> {
        let records: Vec<NotificationRecord> = sqlx::query_as(
            r#"
            SELECT id, subscriber_id, show_title, show_alias,
                   season_number, episode_number, episode_title,
                   response_code, retry_count, last_attempt_at, created_at
            FROM notifications_queue
            WHERE (response_code IS NULL OR response_code BETWEEN 400 AND 599)
              AND retry_count < $1
            ORDER BY created_at, id
            "#,
        )
        .bind(max_retry)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn record_outcome(
        &self,
        id: Uuid,
        status_code: u16,
        attempted_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE notifications_queue
            SET response_code = $2,
                retry_count = retry_count + 1,
                last_attempt_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status_code as i32)
        .bind(attempted_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(record_id = %id, "Outcome write matched no queue row");
        }
        Ok(())
    }
}
