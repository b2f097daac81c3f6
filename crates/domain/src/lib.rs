pub mod models;
pub mod ports;
pub mod repositories;

pub use models::{
    AccessToken, Appointment, AppointmentStatus, JobState, JobStatus, NewNotificationJob,
    NotificationChannel, NotificationJob, NotificationPayload, NotificationType, OrderRecord,
    TokenKind, NO_SHOW_SWEEP_JOB,
};
pub use ports::{
    BaseUrlLinkBuilder, EmailSender, ErpRowSource, LinkBuilder, SendOutcome, SmsSender,
};
pub use repositories::{
    AccessTokenRepository, AppointmentRepository, JobStateRepository, NotificationJobRepository,
    OrderRepository,
};
