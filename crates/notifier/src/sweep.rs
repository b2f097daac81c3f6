//! Daily no-show sweep.
//!
//! Once per business day, inside a narrow late-afternoon window, appointments
//! whose slot ended earlier today without reaching Completed or Cancelled are
//! transitioned to NoShow, their pending jobs are cancelled, and a terminal
//! no-show notice goes out directly. A claim row in the store guards against
//! double runs across restarts and replicas.

use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use tracing::{debug, error, info};
use willcall_core::business_time::{start_of_business_day, BUSINESS_TZ};
use willcall_core::config::SweepConfig;
use willcall_core::WillCallResult;
use willcall_domain::{
    Appointment, AppointmentRepository, AppointmentStatus, JobStateRepository,
    NotificationJobRepository, NO_SHOW_SWEEP_JOB,
};

use crate::orchestrator::NotificationOrchestrator;

/// Statuses that make an ended appointment a no-show candidate. NoShow is
/// included so a crash between the status write and the notice on a prior
/// run gets picked up again.
const CANDIDATE_STATUSES: [AppointmentStatus; 5] = [
    AppointmentStatus::Scheduled,
    AppointmentStatus::Confirmed,
    AppointmentStatus::InProgress,
    AppointmentStatus::Ready,
    AppointmentStatus::NoShow,
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    pub candidates: usize,
    pub transitioned: usize,
    pub notices_sent: usize,
    pub cancelled_pending: u64,
    pub failures: usize,
}

pub struct NoShowSweep {
    appointment_repo: Arc<dyn AppointmentRepository>,
    job_repo: Arc<dyn NotificationJobRepository>,
    job_state_repo: Arc<dyn JobStateRepository>,
    orchestrator: Arc<NotificationOrchestrator>,
    config: SweepConfig,
}

impl NoShowSweep {
    pub fn new(
        appointment_repo: Arc<dyn AppointmentRepository>,
        job_repo: Arc<dyn NotificationJobRepository>,
        job_state_repo: Arc<dyn JobStateRepository>,
        orchestrator: Arc<NotificationOrchestrator>,
        config: SweepConfig,
    ) -> Self {
        Self {
            appointment_repo,
            job_repo,
            job_state_repo,
            orchestrator,
            config,
        }
    }

    /// True when `now` sits inside the configured business-local run window.
    pub fn in_window(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&BUSINESS_TZ);
        let minutes = i64::from(local.hour() * 60 + local.minute());
        let open = i64::from(self.config.window_hour * 60 + self.config.window_minute);
        minutes >= open && minutes < open + self.config.window_duration_minutes
    }

    /// Runs the sweep when the window is open and today's run has not been
    /// claimed yet. Returns `None` when nothing ran.
    pub async fn run_if_due(&self, now: DateTime<Utc>) -> WillCallResult<Option<SweepOutcome>> {
        if !self.config.enabled || !self.in_window(now) {
            return Ok(None);
        }

        let day_start = start_of_business_day(now);
        // Single atomic claim; a second worker in the same window loses the
        // compare-and-set and does nothing.
        if !self.job_state_repo.try_claim(NO_SHOW_SWEEP_JOB, day_start, now).await? {
            debug!("no-show sweep already claimed for today");
            return Ok(None);
        }

        info!(day_start = %day_start, "no-show sweep starting");
        let outcome = self.run(day_start, now).await?;
        info!(
            candidates = outcome.candidates,
            transitioned = outcome.transitioned,
            notices_sent = outcome.notices_sent,
            cancelled_pending = outcome.cancelled_pending,
            failures = outcome.failures,
            "no-show sweep complete"
        );
        Ok(Some(outcome))
    }

    async fn run(&self, day_start: DateTime<Utc>, now: DateTime<Utc>) -> WillCallResult<SweepOutcome> {
        let candidates = self
            .appointment_repo
            .find_ending_between(&CANDIDATE_STATUSES, day_start, now)
            .await?;

        let mut outcome = SweepOutcome {
            candidates: candidates.len(),
            ..Default::default()
        };

        for appointment in &candidates {
            match self.process_candidate(appointment).await {
                Ok((transitioned, cancelled)) => {
                    if transitioned {
                        outcome.transitioned += 1;
                    }
                    outcome.cancelled_pending += cancelled;
                    outcome.notices_sent += 1;
                }
                Err(e) => {
                    // One bad appointment never aborts the sweep.
                    outcome.failures += 1;
                    error!(
                        appointment_id = %appointment.id,
                        error = %e,
                        "no-show processing failed"
                    );
                }
            }
        }
        Ok(outcome)
    }

    async fn process_candidate(&self, appointment: &Appointment) -> WillCallResult<(bool, u64)> {
        let transitioned = if appointment.status != AppointmentStatus::NoShow {
            self.appointment_repo
                .update_status(&appointment.id, AppointmentStatus::NoShow)
                .await?;
            true
        } else {
            false
        };

        let cancelled = self
            .job_repo
            .cancel_pending_for_appointment(&appointment.id)
            .await?;

        self.orchestrator.notify_no_show(appointment).await?;
        Ok((transitioned, cancelled))
    }
}
