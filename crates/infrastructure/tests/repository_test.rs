use chrono::{DateTime, Duration, Utc};
use willcall_core::config::DatabaseConfig;
use willcall_domain::{
    AccessTokenRepository, AppointmentRepository, AppointmentStatus, JobStateRepository, JobStatus,
    NewNotificationJob, NotificationChannel, NotificationJobRepository, NotificationPayload,
    NotificationType, OrderRepository, TokenKind,
};
use willcall_infrastructure::{
    connect_pool, SqliteAccessTokenRepository, SqliteAppointmentRepository,
    SqliteJobStateRepository, SqliteNotificationJobRepository, SqliteOrderRepository,
};
use willcall_testing_utils::builders::{AppointmentBuilder, OrderRecordBuilder};

fn utc(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

// A single connection keeps all repositories on the same in-memory database.
async fn pool() -> sqlx::SqlitePool {
    connect_pool(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        connection_timeout_seconds: 5,
    })
    .await
    .unwrap()
}

fn enqueue_request(appointment_id: &str, scheduled_at: DateTime<Utc>) -> NewNotificationJob {
    NewNotificationJob {
        appointment_id: appointment_id.to_string(),
        kind: NotificationType::Reminder1Day,
        channel: NotificationChannel::Both,
        scheduled_at,
        payload: NotificationPayload {
            link: Some("https://pickup.example.com/appointments/a?token=t".to_string()),
            ..Default::default()
        },
    }
}

#[tokio::test]
async fn enqueue_is_idempotent_and_preserves_reached_status() {
    let repo = SqliteNotificationJobRepository::new(pool().await);
    let at = utc("2024-05-13T15:00:00Z");

    let first = repo.enqueue(&enqueue_request("appt-1", at)).await.unwrap();
    let second = repo.enqueue(&enqueue_request("appt-1", at)).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.status, JobStatus::Pending);

    repo.mark_sent(first.id, Utc::now()).await.unwrap();
    let third = repo.enqueue(&enqueue_request("appt-1", at)).await.unwrap();
    assert_eq!(third.id, first.id);
    assert_eq!(third.status, JobStatus::Sent);
}

#[tokio::test]
async fn get_due_orders_oldest_first_and_honors_limit() {
    let repo = SqliteNotificationJobRepository::new(pool().await);
    let now = utc("2024-05-13T18:00:00Z");

    let late = repo
        .enqueue(&enqueue_request("appt-late", now - Duration::minutes(1)))
        .await
        .unwrap();
    let early = repo
        .enqueue(&enqueue_request("appt-early", now - Duration::hours(2)))
        .await
        .unwrap();
    repo.enqueue(&enqueue_request("appt-future", now + Duration::hours(1)))
        .await
        .unwrap();

    let due = repo.get_due(now, 10).await.unwrap();
    assert_eq!(due.len(), 2);
    assert_eq!(due[0].id, early.id);
    assert_eq!(due[1].id, late.id);

    let capped = repo.get_due(now, 1).await.unwrap();
    assert_eq!(capped.len(), 1);
    assert_eq!(capped[0].id, early.id);
}

#[tokio::test]
async fn cancel_pending_leaves_terminal_jobs_alone() {
    let repo = SqliteNotificationJobRepository::new(pool().await);
    let at = utc("2024-05-13T15:00:00Z");

    let sent = repo.enqueue(&enqueue_request("appt-1", at)).await.unwrap();
    repo.mark_sent(sent.id, Utc::now()).await.unwrap();
    let pending = repo
        .enqueue(&enqueue_request("appt-1", at + Duration::hours(1)))
        .await
        .unwrap();

    let cancelled = repo.cancel_pending_for_appointment("appt-1").await.unwrap();
    assert_eq!(cancelled, 1);
    assert_eq!(
        repo.get_by_id(pending.id).await.unwrap().unwrap().status,
        JobStatus::Cancelled
    );
    assert_eq!(
        repo.get_by_id(sent.id).await.unwrap().unwrap().status,
        JobStatus::Sent
    );
    assert_eq!(repo.count_sent_for_appointment("appt-1").await.unwrap(), 1);
}

#[tokio::test]
async fn mark_transitions_record_attempts_and_timestamps() {
    let repo = SqliteNotificationJobRepository::new(pool().await);
    let at = utc("2024-05-13T15:00:00Z");
    let now = utc("2024-05-13T16:00:00Z");

    let job = repo.enqueue(&enqueue_request("appt-1", at)).await.unwrap();
    repo.mark_sent(job.id, now).await.unwrap();

    let stored = repo.get_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Sent);
    assert_eq!(stored.attempt_count, 1);
    assert_eq!(stored.last_attempt_at, Some(now));
    assert_eq!(stored.sent_at, Some(now));

    // A failure is an attempt that never got a sent_at.
    let failed = repo.enqueue(&enqueue_request("appt-2", at)).await.unwrap();
    repo.mark_failed(failed.id, now).await.unwrap();
    let stored = repo.get_by_id(failed.id).await.unwrap().unwrap();
    assert_eq!(stored.attempt_count, 1);
    assert_eq!(stored.last_attempt_at, Some(now));
    assert_eq!(stored.sent_at, None);

    // A skip stamps when the runner looked at the job but is not an attempt.
    let skipped = repo.enqueue(&enqueue_request("appt-3", at)).await.unwrap();
    repo.mark_skipped(skipped.id, now).await.unwrap();
    let stored = repo.get_by_id(skipped.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Skipped);
    assert_eq!(stored.attempt_count, 0);
    assert_eq!(stored.last_attempt_at, Some(now));
    assert_eq!(stored.sent_at, None);

    // Cancellation records nothing at all.
    let other = repo.enqueue(&enqueue_request("appt-4", at)).await.unwrap();
    repo.mark_cancelled(other.id).await.unwrap();
    let stored = repo.get_by_id(other.id).await.unwrap().unwrap();
    assert_eq!(stored.attempt_count, 0);
    assert_eq!(stored.last_attempt_at, None);
    assert_eq!(stored.sent_at, None);
}

#[tokio::test]
async fn payload_round_trips_through_storage() {
    let repo = SqliteNotificationJobRepository::new(pool().await);
    let mut request = enqueue_request("appt-1", utc("2024-05-13T15:00:00Z"));
    request.payload.order_nbrs = vec!["SO-1".to_string()];
    request.payload.cancel_reason = Some("weather".to_string());
    request.payload.ignore_cap = true;

    let job = repo.enqueue(&request).await.unwrap();
    let stored = repo.get_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(stored.payload, request.payload);
}

#[tokio::test]
async fn order_upsert_replaces_existing_row() {
    let repo = SqliteOrderRepository::new(pool().await);
    let order = OrderRecordBuilder::new("SO-1001").with_status("Open").build();
    repo.upsert(&order).await.unwrap();

    let updated = OrderRecordBuilder::new("SO-1001")
        .with_status("Shipped")
        .requested_on(order.requested_on)
        .build();
    repo.upsert(&updated).await.unwrap();

    let stored = repo.get_by_order_nbr("SO-1001").await.unwrap().unwrap();
    assert_eq!(stored.status, "Shipped");
}

#[tokio::test]
async fn get_many_silently_drops_missing_orders() {
    let repo = SqliteOrderRepository::new(pool().await);
    repo.upsert(&OrderRecordBuilder::new("SO-1").build())
        .await
        .unwrap();

    let found = repo
        .get_many(&["SO-1".to_string(), "SO-404".to_string()])
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].order_nbr, "SO-1");
}

#[tokio::test]
async fn appointment_round_trip_and_status_update() {
    let repo = SqliteAppointmentRepository::new(pool().await);
    let appt = AppointmentBuilder::new("appt-1")
        .with_orders(&["SO-1", "SO-2"])
        .build();
    repo.create(&appt).await.unwrap();

    let stored = repo.get_by_id("appt-1").await.unwrap().unwrap();
    assert_eq!(stored.order_nbrs, vec!["SO-1", "SO-2"]);
    assert_eq!(stored.status, AppointmentStatus::Scheduled);

    repo.update_status("appt-1", AppointmentStatus::NoShow)
        .await
        .unwrap();
    let stored = repo.get_by_id("appt-1").await.unwrap().unwrap();
    assert_eq!(stored.status, AppointmentStatus::NoShow);
}

#[tokio::test]
async fn find_ending_between_filters_status_and_half_open_range() {
    let repo = SqliteAppointmentRepository::new(pool().await);
    let from = utc("2024-05-10T06:00:00Z");
    let to = utc("2024-05-10T23:20:00Z");

    let in_range = AppointmentBuilder::new("in-range")
        .starting_at(utc("2024-05-10T20:00:00Z"))
        .ending_at(utc("2024-05-10T21:00:00Z"))
        .build();
    let at_upper_bound = AppointmentBuilder::new("at-upper")
        .starting_at(utc("2024-05-10T22:00:00Z"))
        .ending_at(to)
        .build();
    let completed = AppointmentBuilder::new("completed")
        .starting_at(utc("2024-05-10T20:00:00Z"))
        .ending_at(utc("2024-05-10T21:00:00Z"))
        .with_status(AppointmentStatus::Completed)
        .build();
    for appt in [&in_range, &at_upper_bound, &completed] {
        repo.create(appt).await.unwrap();
    }

    let found = repo
        .find_ending_between(
            &[AppointmentStatus::Scheduled, AppointmentStatus::Confirmed],
            from,
            to,
        )
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "in-range");
}

#[tokio::test]
async fn try_claim_is_once_per_business_day() {
    let repo = SqliteJobStateRepository::new(pool().await);
    let day_start = utc("2024-05-10T06:00:00Z");
    let now = utc("2024-05-10T23:20:00Z");

    assert!(repo.try_claim("no_show_sweep", day_start, now).await.unwrap());
    assert!(!repo
        .try_claim("no_show_sweep", day_start, now + Duration::minutes(5))
        .await
        .unwrap());

    let state = repo.get("no_show_sweep").await.unwrap().unwrap();
    assert_eq!(state.last_run_at, now);

    // A new business day claims again.
    let next_day_start = day_start + Duration::days(1);
    assert!(repo
        .try_claim("no_show_sweep", next_day_start, now + Duration::days(1))
        .await
        .unwrap());
}

#[tokio::test]
async fn rotate_revokes_prior_tokens_atomically() {
    let repo = SqliteAccessTokenRepository::new(pool().await);
    let now = Utc::now();
    let expires = now + Duration::days(30);

    let first = repo
        .rotate(TokenKind::Appointment, "appt-1", "tok-a", expires)
        .await
        .unwrap();
    let second = repo
        .rotate(TokenKind::Appointment, "appt-1", "tok-b", expires)
        .await
        .unwrap();
    assert_ne!(first.id, second.id);

    let active = repo
        .get_active(TokenKind::Appointment, "appt-1", now)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(active.token, "tok-b");

    // Another owner's tokens are untouched.
    repo.rotate(TokenKind::Appointment, "appt-2", "tok-c", expires)
        .await
        .unwrap();
    let active = repo
        .get_active(TokenKind::Appointment, "appt-1", now)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(active.token, "tok-b");
}

#[tokio::test]
async fn expired_tokens_are_not_active() {
    let repo = SqliteAccessTokenRepository::new(pool().await);
    let now = Utc::now();

    repo.rotate(
        TokenKind::OrderReady,
        "SO-1",
        "tok-old",
        now - Duration::days(1),
    )
    .await
    .unwrap();

    assert!(repo
        .get_active(TokenKind::OrderReady, "SO-1", now)
        .await
        .unwrap()
        .is_none());
}
