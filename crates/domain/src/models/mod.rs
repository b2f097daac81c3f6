pub mod access_token;
pub mod appointment;
pub mod job_state;
pub mod notification_job;
pub mod order;

pub use access_token::{AccessToken, TokenKind};
pub use appointment::{Appointment, AppointmentStatus};
pub use job_state::{JobState, NO_SHOW_SWEEP_JOB};
pub use notification_job::{
    JobStatus, NewNotificationJob, NotificationChannel, NotificationJob, NotificationPayload,
    NotificationType,
};
pub use order::OrderRecord;
