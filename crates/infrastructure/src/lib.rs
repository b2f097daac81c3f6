//! SQLite-backed implementations of the repository traits, plus pool setup
//! and schema bootstrap for the embedded deployment.

pub mod database;
pub mod outbound;

pub use outbound::{FileDropRowSource, LoggingEmailSender, LoggingSmsSender};

pub use database::{
    connect_pool, run_migrations, SqliteAccessTokenRepository, SqliteAppointmentRepository,
    SqliteJobStateRepository, SqliteNotificationJobRepository, SqliteOrderRepository,
};
