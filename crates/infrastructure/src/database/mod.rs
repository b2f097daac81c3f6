//! Connection pool construction and idempotent schema bootstrap.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::debug;
use willcall_core::config::DatabaseConfig;
use willcall_core::WillCallResult;

mod sqlite_access_token_repository;
mod sqlite_appointment_repository;
mod sqlite_job_state_repository;
mod sqlite_notification_job_repository;
mod sqlite_order_repository;

pub use sqlite_access_token_repository::SqliteAccessTokenRepository;
pub use sqlite_appointment_repository::SqliteAppointmentRepository;
pub use sqlite_job_state_repository::SqliteJobStateRepository;
pub use sqlite_notification_job_repository::SqliteNotificationJobRepository;
pub use sqlite_order_repository::SqliteOrderRepository;

/// Open the pool with WAL and foreign keys on, creating the database file
/// when absent, and bring the schema up to date.
pub async fn connect_pool(config: &DatabaseConfig) -> WillCallResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

/// `CREATE TABLE IF NOT EXISTS` for every table, safe to run on every start.
pub async fn run_migrations(pool: &SqlitePool) -> WillCallResult<()> {
    debug!("running schema bootstrap");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            order_nbr TEXT PRIMARY KEY,
            status TEXT NOT NULL,
            location_id TEXT,
            requested_on DATETIME NOT NULL,
            ship_via TEXT,
            job_name TEXT,
            customer_name TEXT,
            buyer_group TEXT,
            note_id TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS appointments (
            id TEXT PRIMARY KEY,
            start_at DATETIME NOT NULL,
            end_at DATETIME NOT NULL,
            location_id TEXT,
            status TEXT NOT NULL DEFAULT 'SCHEDULED',
            customer_email TEXT,
            customer_phone TEXT,
            email_opt_in INTEGER NOT NULL DEFAULT 0,
            sms_opt_in INTEGER NOT NULL DEFAULT 0,
            email_override TEXT,
            phone_override TEXT,
            opted_out_at DATETIME,
            opt_out_reason TEXT,
            order_nbrs TEXT NOT NULL DEFAULT '[]',
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notification_jobs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            appointment_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            channel TEXT NOT NULL,
            scheduled_at DATETIME NOT NULL,
            status TEXT NOT NULL DEFAULT 'PENDING',
            idempotency_key TEXT NOT NULL UNIQUE,
            payload TEXT NOT NULL DEFAULT '{}',
            attempt_count INTEGER NOT NULL DEFAULT 0,
            last_attempt_at DATETIME,
            sent_at DATETIME,
            created_at DATETIME NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS job_state (
            name TEXT PRIMARY KEY,
            last_run_at DATETIME NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS access_tokens (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            token TEXT NOT NULL UNIQUE,
            revoked_at DATETIME,
            expires_at DATETIME NOT NULL,
            created_at DATETIME NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_orders_requested_on ON orders(requested_on)",
        "CREATE INDEX IF NOT EXISTS idx_appointments_status ON appointments(status)",
        "CREATE INDEX IF NOT EXISTS idx_appointments_end_at ON appointments(end_at)",
        "CREATE INDEX IF NOT EXISTS idx_jobs_status_scheduled ON notification_jobs(status, scheduled_at)",
        "CREATE INDEX IF NOT EXISTS idx_jobs_appointment ON notification_jobs(appointment_id)",
        "CREATE INDEX IF NOT EXISTS idx_tokens_owner ON access_tokens(kind, owner_id)",
    ];
    for index_sql in indexes {
        sqlx::query(index_sql).execute(pool).await?;
    }

    debug!("schema bootstrap complete");
    Ok(())
}
