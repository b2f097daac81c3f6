use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;
use willcall_core::{WillCallError, WillCallResult};
use willcall_domain::{
    JobStatus, NewNotificationJob, NotificationJob, NotificationJobRepository, NotificationPayload,
};

pub struct SqliteNotificationJobRepository {
    pool: SqlitePool,
}

impl SqliteNotificationJobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_job(row: &sqlx::sqlite::SqliteRow) -> WillCallResult<NotificationJob> {
        let payload_json: String = row.try_get("payload")?;
        let payload: NotificationPayload = serde_json::from_str(&payload_json)?;

        Ok(NotificationJob {
            id: row.try_get("id")?,
            appointment_id: row.try_get("appointment_id")?,
            kind: row.try_get("kind")?,
            channel: row.try_get("channel")?,
            scheduled_at: row.try_get("scheduled_at")?,
            status: row.try_get("status")?,
            idempotency_key: row.try_get("idempotency_key")?,
            payload,
            attempt_count: row.try_get("attempt_count")?,
            last_attempt_at: row.try_get("last_attempt_at")?,
            sent_at: row.try_get("sent_at")?,
            created_at: row.try_get("created_at")?,
        })
    }

    async fn get_by_key(&self, key: &str) -> WillCallResult<Option<NotificationJob>> {
        let row = sqlx::query("SELECT * FROM notification_jobs WHERE idempotency_key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_job).transpose()
    }
}

#[async_trait]
impl NotificationJobRepository for SqliteNotificationJobRepository {
    async fn enqueue(&self, request: &NewNotificationJob) -> WillCallResult<NotificationJob> {
        let key = NotificationJob::idempotency_key(
            &request.appointment_id,
            request.kind,
            request.scheduled_at,
        );

        // Conflict on the unique key is a no-op; the follow-up select returns
        // whichever row won, in whatever status it has since reached.
        let result = sqlx::query(
            r#"
            INSERT INTO notification_jobs (
                appointment_id, kind, channel, scheduled_at, status,
                idempotency_key, payload, attempt_count, created_at
            )
            VALUES (?1, ?2, ?3, ?4, 'PENDING', ?5, ?6, 0, ?7)
            ON CONFLICT(idempotency_key) DO NOTHING
            "#,
        )
        .bind(&request.appointment_id)
        .bind(request.kind)
        .bind(request.channel)
        .bind(request.scheduled_at)
        .bind(&key)
        .bind(serde_json::to_string(&request.payload)?)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            debug!(idempotency_key = %key, "enqueue hit existing job");
        }

        self.get_by_key(&key).await?.ok_or_else(|| {
            WillCallError::database_error(format!("enqueued job vanished for key {key}"))
        })
    }

    async fn get_by_id(&self, id: i64) -> WillCallResult<Option<NotificationJob>> {
        let row = sqlx::query("SELECT * FROM notification_jobs WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_job).transpose()
    }

    async fn get_due(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> WillCallResult<Vec<NotificationJob>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM notification_jobs
            WHERE status = 'PENDING' AND scheduled_at <= ?1
            ORDER BY scheduled_at, id
            LIMIT ?2
            "#,
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_job).collect()
    }

    async fn get_by_appointment(
        &self,
        appointment_id: &str,
    ) -> WillCallResult<Vec<NotificationJob>> {
        let rows =
            sqlx::query("SELECT * FROM notification_jobs WHERE appointment_id = ?1 ORDER BY id")
                .bind(appointment_id)
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(Self::row_to_job).collect()
    }

    async fn count_sent_for_appointment(&self, appointment_id: &str) -> WillCallResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM notification_jobs
             WHERE appointment_id = ?1 AND status = 'SENT'",
        )
        .bind(appointment_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("n")?)
    }

    async fn cancel_pending_for_appointment(&self, appointment_id: &str) -> WillCallResult<u64> {
        let result = sqlx::query(
            "UPDATE notification_jobs SET status = 'CANCELLED'
             WHERE appointment_id = ?1 AND status = 'PENDING'",
        )
        .bind(appointment_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn mark_sent(&self, id: i64, now: DateTime<Utc>) -> WillCallResult<()> {
        self.finish(id, JobStatus::Sent, Some(now), true, true).await
    }

    async fn mark_skipped(&self, id: i64, now: DateTime<Utc>) -> WillCallResult<()> {
        // A skip is an eligibility decision, not a delivery attempt: it
        // stamps last_attempt_at but leaves attempt_count alone.
        self.finish(id, JobStatus::Skipped, Some(now), false, false)
            .await
    }

    async fn mark_cancelled(&self, id: i64) -> WillCallResult<()> {
        self.finish(id, JobStatus::Cancelled, None, false, false)
            .await
    }

    async fn mark_failed(&self, id: i64, now: DateTime<Utc>) -> WillCallResult<()> {
        self.finish(id, JobStatus::Failed, Some(now), true, false)
            .await
    }
}

impl SqliteNotificationJobRepository {
    async fn finish(
        &self,
        id: i64,
        status: JobStatus,
        stamped_at: Option<DateTime<Utc>>,
        attempted: bool,
        sent: bool,
    ) -> WillCallResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE notification_jobs SET
                status = ?2,
                attempt_count = attempt_count + (CASE WHEN ?4 THEN 1 ELSE 0 END),
                last_attempt_at = COALESCE(?3, last_attempt_at),
                sent_at = CASE WHEN ?5 THEN ?3 ELSE sent_at END
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(stamped_at)
        .bind(attempted)
        .bind(sent)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(WillCallError::job_not_found(id));
        }
        Ok(())
    }
}
