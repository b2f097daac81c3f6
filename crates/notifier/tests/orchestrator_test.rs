use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use willcall_domain::{BaseUrlLinkBuilder, JobStatus, NotificationType, TokenKind};
use willcall_notifier::{EventContext, NotificationOrchestrator};
use willcall_testing_utils::builders::AppointmentBuilder;
use willcall_testing_utils::mocks::{
    MockAccessTokenRepository, MockNotificationJobRepository, RecordingEmailSender,
    RecordingSmsSender,
};

fn utc(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

fn orchestrator(
    jobs: &MockNotificationJobRepository,
    tokens: &MockAccessTokenRepository,
) -> NotificationOrchestrator {
    NotificationOrchestrator::new(
        Arc::new(jobs.clone()),
        Arc::new(tokens.clone()),
        Arc::new(BaseUrlLinkBuilder::new("https://pickup.example.com/appointments")),
        Arc::new(RecordingEmailSender::new()),
        Arc::new(RecordingSmsSender::new()),
    )
}

#[tokio::test]
async fn scheduling_enqueues_confirm_and_both_reminders() {
    let now = utc("2024-05-10T18:00:00Z");
    let start = utc("2024-05-13T16:00:00Z");
    let appt = AppointmentBuilder::new("appt-1").starting_at(start).build();
    let jobs = MockNotificationJobRepository::new();
    let tokens = MockAccessTokenRepository::new();

    let outcome = orchestrator(&jobs, &tokens)
        .appointment_scheduled(&appt, EventContext::customer(), now)
        .await
        .unwrap();

    assert_eq!(outcome.enqueued.len(), 3);
    let kinds: Vec<NotificationType> = outcome.enqueued.iter().map(|j| j.kind).collect();
    assert!(kinds.contains(&NotificationType::ScheduledConfirm));
    assert!(kinds.contains(&NotificationType::Reminder1Day));
    assert!(kinds.contains(&NotificationType::Reminder1Hour));

    let day = outcome
        .enqueued
        .iter()
        .find(|j| j.kind == NotificationType::Reminder1Day)
        .unwrap();
    assert_eq!(day.scheduled_at, start - Duration::hours(24));
    let hour = outcome
        .enqueued
        .iter()
        .find(|j| j.kind == NotificationType::Reminder1Hour)
        .unwrap();
    assert_eq!(hour.scheduled_at, start - Duration::hours(1));

    // Every enqueued job carries a pickup link.
    assert!(outcome.enqueued.iter().all(|j| j.payload.link.is_some()));
}

#[tokio::test]
async fn scheduling_close_to_start_drops_past_reminder_slots() {
    let now = utc("2024-05-10T18:00:00Z");
    // Starts in 30 minutes: both reminder slots are already in the past.
    let appt = AppointmentBuilder::new("appt-1")
        .starting_at(now + Duration::minutes(30))
        .build();
    let jobs = MockNotificationJobRepository::new();
    let tokens = MockAccessTokenRepository::new();

    let outcome = orchestrator(&jobs, &tokens)
        .appointment_scheduled(&appt, EventContext::customer(), now)
        .await
        .unwrap();

    assert_eq!(outcome.enqueued.len(), 1);
    assert_eq!(outcome.enqueued[0].kind, NotificationType::ScheduledConfirm);
}

#[tokio::test]
async fn repeated_scheduling_is_idempotent() {
    let now = utc("2024-05-10T18:00:00Z");
    let appt = AppointmentBuilder::new("appt-1")
        .starting_at(utc("2024-05-13T16:00:00Z"))
        .build();
    let jobs = MockNotificationJobRepository::new();
    let tokens = MockAccessTokenRepository::new();
    let orch = orchestrator(&jobs, &tokens);

    orch.appointment_scheduled(&appt, EventContext::customer(), now)
        .await
        .unwrap();
    orch.appointment_scheduled(&appt, EventContext::customer(), now)
        .await
        .unwrap();

    assert_eq!(jobs.count(), 3);
}

#[tokio::test]
async fn reschedule_cancels_pending_and_enqueues_fresh_jobs() {
    let now = utc("2024-05-10T18:00:00Z");
    let old_start = utc("2024-05-13T16:00:00Z");
    let appt = AppointmentBuilder::new("appt-1").starting_at(old_start).build();
    let jobs = MockNotificationJobRepository::new();
    let tokens = MockAccessTokenRepository::new();
    let orch = orchestrator(&jobs, &tokens);

    orch.appointment_scheduled(&appt, EventContext::customer(), now)
        .await
        .unwrap();

    let new_start = utc("2024-05-15T20:00:00Z");
    let moved = AppointmentBuilder::new("appt-1").starting_at(new_start).build();
    let outcome = orch
        .appointment_rescheduled(&moved, old_start, appt.end_at, EventContext::customer(), now)
        .await
        .unwrap();

    // Confirm + two reminders were pending; all three cancelled.
    assert_eq!(outcome.cancelled_pending, 3);
    // Reschedule notice plus fresh reminders against the new slot.
    assert_eq!(outcome.enqueued.len(), 3);
    let notice = outcome
        .enqueued
        .iter()
        .find(|j| j.kind == NotificationType::Rescheduled)
        .unwrap();
    assert_eq!(notice.payload.old_start_at, Some(old_start));
    assert_eq!(notice.payload.new_start_at, Some(new_start));
    let day = outcome
        .enqueued
        .iter()
        .find(|j| j.kind == NotificationType::Reminder1Day)
        .unwrap();
    assert_eq!(day.scheduled_at, new_start - Duration::hours(24));
}

#[tokio::test]
async fn cancellation_with_notice_carries_reason() {
    let now = utc("2024-05-10T18:00:00Z");
    let appt = AppointmentBuilder::new("appt-1")
        .starting_at(utc("2024-05-13T16:00:00Z"))
        .build();
    let jobs = MockNotificationJobRepository::new();
    let tokens = MockAccessTokenRepository::new();
    let orch = orchestrator(&jobs, &tokens);

    orch.appointment_scheduled(&appt, EventContext::customer(), now)
        .await
        .unwrap();
    let outcome = orch
        .appointment_cancelled(&appt, Some("customer request"), EventContext::customer(), now)
        .await
        .unwrap();

    assert_eq!(outcome.cancelled_pending, 3);
    assert_eq!(outcome.enqueued.len(), 1);
    assert_eq!(outcome.enqueued[0].kind, NotificationType::Cancelled);
    assert_eq!(
        outcome.enqueued[0].payload.cancel_reason.as_deref(),
        Some("customer request")
    );
}

#[tokio::test]
async fn silent_cancel_drops_pending_without_a_notice() {
    let now = utc("2024-05-10T18:00:00Z");
    let appt = AppointmentBuilder::new("appt-1")
        .starting_at(utc("2024-05-13T16:00:00Z"))
        .build();
    let jobs = MockNotificationJobRepository::new();
    let tokens = MockAccessTokenRepository::new();
    let orch = orchestrator(&jobs, &tokens);

    orch.appointment_scheduled(&appt, EventContext::customer(), now)
        .await
        .unwrap();
    let cancelled = orch.silent_cancel("appt-1").await.unwrap();

    assert_eq!(cancelled, 3);
    assert!(jobs
        .get_all()
        .iter()
        .all(|j| j.status == JobStatus::Cancelled));
}

#[tokio::test]
async fn no_notice_events_are_noops_when_customer_should_not_be_notified() {
    let now = utc("2024-05-10T18:00:00Z");
    let appt = AppointmentBuilder::new("appt-1").build();
    let jobs = MockNotificationJobRepository::new();
    let tokens = MockAccessTokenRepository::new();
    let orch = orchestrator(&jobs, &tokens);

    let ctx = EventContext {
        notify_customer: false,
        ignore_cap: false,
        staff_initiated: false,
    };
    let outcome = orch.appointment_scheduled(&appt, ctx, now).await.unwrap();
    assert!(outcome.enqueued.is_empty());
    assert_eq!(jobs.count(), 0);
    assert!(tokens.get_all().is_empty());
}

#[tokio::test]
async fn staff_context_marks_payload_cap_exempt() {
    let now = utc("2024-05-10T18:00:00Z");
    let appt = AppointmentBuilder::new("appt-1").build();
    let jobs = MockNotificationJobRepository::new();
    let tokens = MockAccessTokenRepository::new();

    let outcome = orchestrator(&jobs, &tokens)
        .order_list_changed(&appt, EventContext::staff(), now)
        .await
        .unwrap();

    assert!(outcome.enqueued[0].payload.ignore_cap);
    assert!(outcome.enqueued[0].payload.staff_initiated);
}

#[tokio::test]
async fn active_token_is_reused_across_events() {
    let now = utc("2024-05-10T18:00:00Z");
    let appt = AppointmentBuilder::new("appt-1")
        .starting_at(utc("2024-05-13T16:00:00Z"))
        .build();
    let jobs = MockNotificationJobRepository::new();
    let tokens = MockAccessTokenRepository::new();
    let orch = orchestrator(&jobs, &tokens);

    orch.appointment_scheduled(&appt, EventContext::customer(), now)
        .await
        .unwrap();
    orch.appointment_ready(&appt, EventContext::customer(), now)
        .await
        .unwrap();

    // One token issued; the second event reused it.
    let all = tokens.get_all();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].kind, TokenKind::Appointment);
    assert!(all[0].is_active(now));

    let links: Vec<String> = jobs
        .get_all()
        .iter()
        .filter_map(|j| j.payload.link.clone())
        .collect();
    assert!(links.iter().all(|l| l == &links[0]));
    assert!(links[0].starts_with("https://pickup.example.com/appointments/appt-1?token="));
}
