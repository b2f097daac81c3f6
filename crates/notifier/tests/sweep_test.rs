use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use willcall_core::config::SweepConfig;
use willcall_domain::{
    AppointmentRepository, AppointmentStatus, BaseUrlLinkBuilder, JobStateRepository, JobStatus,
};
use willcall_notifier::{NoShowSweep, NotificationOrchestrator};
use willcall_testing_utils::builders::{AppointmentBuilder, NotificationJobBuilder};
use willcall_testing_utils::mocks::{
    MockAccessTokenRepository, MockAppointmentRepository, MockJobStateRepository,
    MockNotificationJobRepository, RecordingEmailSender, RecordingSmsSender,
};

fn utc(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

/// 17:20 Denver on Friday 2024-05-10, inside the default 17:15-17:45 window.
fn in_window_now() -> DateTime<Utc> {
    utc("2024-05-10T23:20:00Z")
}

fn sweep_config() -> SweepConfig {
    SweepConfig {
        enabled: true,
        window_hour: 17,
        window_minute: 15,
        window_duration_minutes: 30,
    }
}

struct Fixture {
    appointments: MockAppointmentRepository,
    jobs: MockNotificationJobRepository,
    states: MockJobStateRepository,
    email: RecordingEmailSender,
    sms: RecordingSmsSender,
    sweep: NoShowSweep,
}

fn fixture() -> Fixture {
    let appointments = MockAppointmentRepository::new();
    let jobs = MockNotificationJobRepository::new();
    let states = MockJobStateRepository::new();
    let email = RecordingEmailSender::new();
    let sms = RecordingSmsSender::new();
    let orchestrator = NotificationOrchestrator::new(
        Arc::new(jobs.clone()),
        Arc::new(MockAccessTokenRepository::new()),
        Arc::new(BaseUrlLinkBuilder::new("https://pickup.example.com/appointments")),
        Arc::new(email.clone()),
        Arc::new(sms.clone()),
    );
    let sweep = NoShowSweep::new(
        Arc::new(appointments.clone()),
        Arc::new(jobs.clone()),
        Arc::new(states.clone()),
        Arc::new(orchestrator),
        sweep_config(),
    );
    Fixture {
        appointments,
        jobs,
        states,
        email,
        sms,
        sweep,
    }
}

/// An appointment that ended at 15:00 Denver today, still in `status`.
async fn seed_candidate(f: &Fixture, id: &str, status: AppointmentStatus) {
    let appt = AppointmentBuilder::new(id)
        .starting_at(utc("2024-05-10T20:00:00Z"))
        .ending_at(utc("2024-05-10T21:00:00Z"))
        .with_status(status)
        .build();
    f.appointments.create(&appt).await.unwrap();
}

#[tokio::test]
async fn sweep_marks_no_show_cancels_pending_and_notifies() {
    let f = fixture();
    seed_candidate(&f, "appt-1", AppointmentStatus::Confirmed).await;
    // A leftover pending reminder from before the appointment.
    let stale = NotificationJobBuilder::new(1, "appt-1")
        .scheduled_at(utc("2024-05-10T19:00:00Z"))
        .build();
    f.jobs.insert(stale);

    let outcome = f.sweep.run_if_due(in_window_now()).await.unwrap().unwrap();

    assert_eq!(outcome.candidates, 1);
    assert_eq!(outcome.transitioned, 1);
    assert_eq!(outcome.cancelled_pending, 1);
    assert_eq!(outcome.notices_sent, 1);
    assert_eq!(outcome.failures, 0);
    assert_eq!(
        f.appointments.status_of("appt-1"),
        Some(AppointmentStatus::NoShow)
    );
    assert_eq!(f.jobs.status_of(1), Some(JobStatus::Cancelled));
    assert_eq!(f.email.count(), 1);
    assert_eq!(f.sms.count(), 1);
    assert!(f.sms.sent()[0].body.contains("missed you"));
}

#[tokio::test]
async fn sweep_outside_window_does_nothing() {
    let f = fixture();
    seed_candidate(&f, "appt-1", AppointmentStatus::Scheduled).await;

    // 12:00 Denver, hours before the window opens.
    let outcome = f.sweep.run_if_due(utc("2024-05-10T18:00:00Z")).await.unwrap();

    assert!(outcome.is_none());
    assert_eq!(
        f.appointments.status_of("appt-1"),
        Some(AppointmentStatus::Scheduled)
    );
    assert_eq!(f.sms.count(), 0);
}

#[tokio::test]
async fn sweep_runs_at_most_once_per_business_day() {
    let f = fixture();
    seed_candidate(&f, "appt-1", AppointmentStatus::Scheduled).await;

    let first = f.sweep.run_if_due(in_window_now()).await.unwrap();
    let second = f
        .sweep
        .run_if_due(in_window_now() + Duration::minutes(5))
        .await
        .unwrap();

    assert!(first.is_some());
    assert!(second.is_none());
    assert_eq!(f.sms.count(), 1);
    assert!(f.states.get("no_show_sweep").await.unwrap().is_some());
}

#[tokio::test]
async fn completed_and_cancelled_appointments_are_not_candidates() {
    let f = fixture();
    seed_candidate(&f, "done", AppointmentStatus::Completed).await;
    seed_candidate(&f, "gone", AppointmentStatus::Cancelled).await;
    seed_candidate(&f, "missed", AppointmentStatus::Ready).await;

    let outcome = f.sweep.run_if_due(in_window_now()).await.unwrap().unwrap();

    assert_eq!(outcome.candidates, 1);
    assert_eq!(f.appointments.status_of("done"), Some(AppointmentStatus::Completed));
    assert_eq!(f.appointments.status_of("gone"), Some(AppointmentStatus::Cancelled));
    assert_eq!(f.appointments.status_of("missed"), Some(AppointmentStatus::NoShow));
}

#[tokio::test]
async fn appointment_already_no_show_is_renotified_without_transition() {
    let f = fixture();
    seed_candidate(&f, "appt-1", AppointmentStatus::NoShow).await;

    let outcome = f.sweep.run_if_due(in_window_now()).await.unwrap().unwrap();

    assert_eq!(outcome.candidates, 1);
    assert_eq!(outcome.transitioned, 0);
    assert_eq!(outcome.notices_sent, 1);
}

#[tokio::test]
async fn appointments_ending_before_today_are_out_of_scope() {
    let f = fixture();
    let appt = AppointmentBuilder::new("appt-old")
        .starting_at(utc("2024-05-09T20:00:00Z"))
        .ending_at(utc("2024-05-09T21:00:00Z"))
        .build();
    f.appointments.create(&appt).await.unwrap();

    let outcome = f.sweep.run_if_due(in_window_now()).await.unwrap().unwrap();

    assert_eq!(outcome.candidates, 0);
    assert_eq!(
        f.appointments.status_of("appt-old"),
        Some(AppointmentStatus::Scheduled)
    );
}

#[tokio::test]
async fn disabled_sweep_never_runs() {
    let appointments = MockAppointmentRepository::new();
    let jobs = MockNotificationJobRepository::new();
    let orchestrator = NotificationOrchestrator::new(
        Arc::new(jobs.clone()),
        Arc::new(MockAccessTokenRepository::new()),
        Arc::new(BaseUrlLinkBuilder::new("https://pickup.example.com/appointments")),
        Arc::new(RecordingEmailSender::new()),
        Arc::new(RecordingSmsSender::new()),
    );
    let sweep = NoShowSweep::new(
        Arc::new(appointments),
        Arc::new(jobs),
        Arc::new(MockJobStateRepository::new()),
        Arc::new(orchestrator),
        SweepConfig {
            enabled: false,
            ..sweep_config()
        },
    );

    assert!(sweep.run_if_due(in_window_now()).await.unwrap().is_none());
}
