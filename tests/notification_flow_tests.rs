//! Full scheduling-to-delivery flow over the in-memory mocks: one SMS-only
//! appointment, three jobs out of the lifecycle event, three dispatch ticks
//! each sending exactly one message.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use willcall_domain::{BaseUrlLinkBuilder, JobStatus, NotificationType};
use willcall_notifier::{EventContext, JobRunner, NotificationOrchestrator};
use willcall_testing_utils::{
    AppointmentBuilder, MockAccessTokenRepository, MockAppointmentRepository,
    MockNotificationJobRepository, MockOrderRepository, RecordingEmailSender, RecordingSmsSender,
};

fn utc(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

#[tokio::test]
async fn sms_only_appointment_flows_from_scheduling_to_three_deliveries() {
    // 18:00 Denver on 2024-03-10 (the DST spring-forward day) is midnight UTC.
    let start_at = utc("2024-03-11T00:00:00Z");
    // Booked two days earlier, noon Denver (MST).
    let created_at = utc("2024-03-08T19:00:00Z");

    let appointment = AppointmentBuilder::new("APT-E2E")
        .sms_only()
        .starting_at(start_at)
        .build();

    let jobs = MockNotificationJobRepository::new();
    let appointments = MockAppointmentRepository::with_appointments(vec![appointment.clone()]);
    let tokens = MockAccessTokenRepository::new();
    let email = RecordingEmailSender::new();
    let sms = RecordingSmsSender::new();

    let orchestrator = NotificationOrchestrator::new(
        Arc::new(jobs.clone()),
        Arc::new(tokens),
        Arc::new(BaseUrlLinkBuilder::new(
            "https://pickup.example.com/appointments".to_string(),
        )),
        Arc::new(email.clone()),
        Arc::new(sms.clone()),
    );

    let outcome = orchestrator
        .appointment_scheduled(&appointment, EventContext::customer(), created_at)
        .await
        .unwrap();

    // Confirmation at booking time, day-before reminder at 18:00 local the
    // previous day (a 23-hour gap across the DST change), hour-before
    // reminder at 17:00 local.
    assert_eq!(outcome.enqueued.len(), 3);
    let kinds: Vec<NotificationType> = outcome.enqueued.iter().map(|j| j.kind).collect();
    assert_eq!(
        kinds,
        vec![
            NotificationType::ScheduledConfirm,
            NotificationType::Reminder1Day,
            NotificationType::Reminder1Hour,
        ]
    );
    assert_eq!(outcome.enqueued[0].scheduled_at, created_at);
    assert_eq!(outcome.enqueued[1].scheduled_at, utc("2024-03-10T01:00:00Z"));
    assert_eq!(outcome.enqueued[2].scheduled_at, utc("2024-03-10T23:00:00Z"));

    let runner = JobRunner::new(
        Arc::new(jobs.clone()),
        Arc::new(appointments),
        Arc::new(MockOrderRepository::new()),
        Arc::new(email.clone()),
        Arc::new(sms.clone()),
        10,
        50,
    );

    // One tick shortly after each slot; every tick delivers exactly the one
    // job that just came due.
    let ticks = [
        utc("2024-03-08T19:00:30Z"),
        utc("2024-03-10T01:05:00Z"),
        utc("2024-03-10T23:05:00Z"),
    ];
    for (i, now) in ticks.iter().enumerate() {
        let summary = runner.run_tick(*now).await.unwrap();
        assert_eq!(summary.fetched, 1, "tick {i} should pick up one job");
        assert_eq!(summary.sent, 1, "tick {i} should send one job");
        assert_eq!(sms.count(), i + 1);
    }

    // SMS only, every job Sent, stamped in dispatch order.
    assert_eq!(email.count(), 0);
    assert_eq!(sms.count(), 3);
    let all = jobs.get_all();
    assert_eq!(all.len(), 3);
    for job in &all {
        assert_eq!(job.status, JobStatus::Sent, "job {} not sent", job.id);
        assert_eq!(job.attempt_count, 1);
    }
    let sent_order: Vec<DateTime<Utc>> = all.iter().filter_map(|j| j.sent_at).collect();
    assert_eq!(sent_order, ticks);
}

#[tokio::test]
async fn rebooking_the_same_slot_does_not_duplicate_deliveries() {
    let start_at = utc("2024-03-11T00:00:00Z");
    let created_at = utc("2024-03-08T19:00:00Z");
    let appointment = AppointmentBuilder::new("APT-E2E-2")
        .sms_only()
        .starting_at(start_at)
        .build();

    let jobs = MockNotificationJobRepository::new();
    let appointments = MockAppointmentRepository::with_appointments(vec![appointment.clone()]);
    let email = RecordingEmailSender::new();
    let sms = RecordingSmsSender::new();

    let orchestrator = NotificationOrchestrator::new(
        Arc::new(jobs.clone()),
        Arc::new(MockAccessTokenRepository::new()),
        Arc::new(BaseUrlLinkBuilder::new(
            "https://pickup.example.com/appointments".to_string(),
        )),
        Arc::new(email.clone()),
        Arc::new(sms.clone()),
    );

    // The lifecycle event fires twice, e.g. a replayed upstream webhook.
    for _ in 0..2 {
        orchestrator
            .appointment_scheduled(&appointment, EventContext::customer(), created_at)
            .await
            .unwrap();
    }
    assert_eq!(jobs.count(), 3);

    let runner = JobRunner::new(
        Arc::new(jobs.clone()),
        Arc::new(appointments),
        Arc::new(MockOrderRepository::new()),
        Arc::new(email),
        Arc::new(sms.clone()),
        10,
        50,
    );
    let summary = runner.run_tick(utc("2024-03-10T23:30:00Z")).await.unwrap();

    assert_eq!(summary.fetched, 3);
    assert_eq!(summary.sent, 3);
    assert_eq!(sms.count(), 3);
}
