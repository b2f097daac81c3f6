use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use willcall_core::WillCallResult;
use willcall_domain::{JobState, JobStateRepository};

pub struct SqliteJobStateRepository {
    pool: SqlitePool,
}

impl SqliteJobStateRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStateRepository for SqliteJobStateRepository {
    async fn get(&self, name: &str) -> WillCallResult<Option<JobState>> {
        let row = sqlx::query("SELECT name, last_run_at FROM job_state WHERE name = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row
            .map(|r| {
                Ok::<JobState, sqlx::Error>(JobState {
                    name: r.try_get("name")?,
                    last_run_at: r.try_get("last_run_at")?,
                })
            })
            .transpose()?)
    }

    async fn try_claim(
        &self,
        name: &str,
        business_day_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> WillCallResult<bool> {
        // One conditional upsert: the insert arm claims a never-run job, the
        // update arm only fires when the recorded run predates today. Zero
        // rows affected means another runner already holds today's claim.
        let result = sqlx::query(
            r#"
            INSERT INTO job_state (name, last_run_at)
            VALUES (?1, ?2)
            ON CONFLICT(name) DO UPDATE SET last_run_at = excluded.last_run_at
            WHERE job_state.last_run_at < ?3
            "#,
        )
        .bind(name)
        .bind(now)
        .bind(business_day_start)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
