//! In-memory mock implementations of the repository and port traits, usable
//! across every crate in the workspace without a database connection.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use willcall_core::{WillCallError, WillCallResult};
use willcall_domain::{
    AccessToken, AccessTokenRepository, Appointment, AppointmentRepository, AppointmentStatus,
    EmailSender, ErpRowSource, JobState, JobStateRepository, JobStatus, NewNotificationJob,
    NotificationJob, NotificationJobRepository, OrderRecord, OrderRepository, SendOutcome,
    SmsSender, TokenKind,
};

#[derive(Debug, Clone, Default)]
pub struct MockOrderRepository {
    orders: Arc<Mutex<HashMap<String, OrderRecord>>>,
}

impl MockOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orders(orders: Vec<OrderRecord>) -> Self {
        let map = orders
            .into_iter()
            .map(|o| (o.order_nbr.clone(), o))
            .collect();
        Self {
            orders: Arc::new(Mutex::new(map)),
        }
    }

    pub fn count(&self) -> usize {
        self.orders.lock().unwrap().len()
    }

    pub fn get_all(&self) -> Vec<OrderRecord> {
        self.orders.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl OrderRepository for MockOrderRepository {
    async fn upsert(&self, order: &OrderRecord) -> WillCallResult<()> {
        self.orders
            .lock()
            .unwrap()
            .insert(order.order_nbr.clone(), order.clone());
        Ok(())
    }

    async fn get_by_order_nbr(&self, order_nbr: &str) -> WillCallResult<Option<OrderRecord>> {
        Ok(self.orders.lock().unwrap().get(order_nbr).cloned())
    }

    async fn get_many(&self, order_nbrs: &[String]) -> WillCallResult<Vec<OrderRecord>> {
        let orders = self.orders.lock().unwrap();
        Ok(order_nbrs
            .iter()
            .filter_map(|nbr| orders.get(nbr).cloned())
            .collect())
    }
}

/// Order repository whose `upsert` always fails, for partial-failure tests.
#[derive(Debug, Clone, Default)]
pub struct FailingOrderRepository;

#[async_trait]
impl OrderRepository for FailingOrderRepository {
    async fn upsert(&self, order: &OrderRecord) -> WillCallResult<()> {
        Err(WillCallError::DatabaseOperation(format!(
            "mock upsert failure for {}",
            order.order_nbr
        )))
    }

    async fn get_by_order_nbr(&self, _order_nbr: &str) -> WillCallResult<Option<OrderRecord>> {
        Ok(None)
    }

    async fn get_many(&self, _order_nbrs: &[String]) -> WillCallResult<Vec<OrderRecord>> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockAppointmentRepository {
    appointments: Arc<Mutex<HashMap<String, Appointment>>>,
}

impl MockAppointmentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_appointments(appointments: Vec<Appointment>) -> Self {
        let map = appointments
            .into_iter()
            .map(|a| (a.id.clone(), a))
            .collect();
        Self {
            appointments: Arc::new(Mutex::new(map)),
        }
    }

    pub fn status_of(&self, id: &str) -> Option<AppointmentStatus> {
        self.appointments
            .lock()
            .unwrap()
            .get(id)
            .map(|a| a.status)
    }
}

#[async_trait]
impl AppointmentRepository for MockAppointmentRepository {
    async fn create(&self, appointment: &Appointment) -> WillCallResult<()> {
        self.appointments
            .lock()
            .unwrap()
            .insert(appointment.id.clone(), appointment.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> WillCallResult<Option<Appointment>> {
        Ok(self.appointments.lock().unwrap().get(id).cloned())
    }

    async fn update(&self, appointment: &Appointment) -> WillCallResult<()> {
        self.appointments
            .lock()
            .unwrap()
            .insert(appointment.id.clone(), appointment.clone());
        Ok(())
    }

    async fn update_status(&self, id: &str, status: AppointmentStatus) -> WillCallResult<()> {
        let mut appointments = self.appointments.lock().unwrap();
        let appointment = appointments
            .get_mut(id)
            .ok_or_else(|| WillCallError::appointment_not_found(id))?;
        appointment.status = status;
        appointment.updated_at = Utc::now();
        Ok(())
    }

    async fn find_ending_between(
        &self,
        statuses: &[AppointmentStatus],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> WillCallResult<Vec<Appointment>> {
        let appointments = self.appointments.lock().unwrap();
        let mut found: Vec<Appointment> = appointments
            .values()
            .filter(|a| statuses.contains(&a.status) && a.end_at >= from && a.end_at < to)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.end_at.cmp(&b.end_at));
        Ok(found)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockNotificationJobRepository {
    jobs: Arc<Mutex<HashMap<i64, NotificationJob>>>,
    next_id: Arc<Mutex<i64>>,
}

impl MockNotificationJobRepository {
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    pub fn with_jobs(jobs: Vec<NotificationJob>) -> Self {
        let mut map = HashMap::new();
        let mut max_id = 0;
        for job in jobs {
            if job.id > max_id {
                max_id = job.id;
            }
            map.insert(job.id, job);
        }
        Self {
            jobs: Arc::new(Mutex::new(map)),
            next_id: Arc::new(Mutex::new(max_id + 1)),
        }
    }

    pub fn count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    /// Seed a job directly, bypassing the idempotent enqueue path.
    pub fn insert(&self, job: NotificationJob) {
        let mut next_id = self.next_id.lock().unwrap();
        if job.id >= *next_id {
            *next_id = job.id + 1;
        }
        self.jobs.lock().unwrap().insert(job.id, job);
    }

    pub fn get_all(&self) -> Vec<NotificationJob> {
        let mut all: Vec<NotificationJob> = self.jobs.lock().unwrap().values().cloned().collect();
        all.sort_by_key(|j| j.id);
        all
    }

    pub fn status_of(&self, id: i64) -> Option<JobStatus> {
        self.jobs.lock().unwrap().get(&id).map(|j| j.status)
    }
}

#[async_trait]
impl NotificationJobRepository for MockNotificationJobRepository {
    async fn enqueue(&self, request: &NewNotificationJob) -> WillCallResult<NotificationJob> {
        let key = NotificationJob::idempotency_key(
            &request.appointment_id,
            request.kind,
            request.scheduled_at,
        );
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(existing) = jobs.values().find(|j| j.idempotency_key == key) {
            return Ok(existing.clone());
        }

        let mut next_id = self.next_id.lock().unwrap();
        let job = NotificationJob {
            id: *next_id,
            appointment_id: request.appointment_id.clone(),
            kind: request.kind,
            channel: request.channel,
            scheduled_at: request.scheduled_at,
            status: JobStatus::Pending,
            idempotency_key: key,
            payload: request.payload.clone(),
            attempt_count: 0,
            last_attempt_at: None,
            sent_at: None,
            created_at: Utc::now(),
        };
        *next_id += 1;
        jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn get_by_id(&self, id: i64) -> WillCallResult<Option<NotificationJob>> {
        Ok(self.jobs.lock().unwrap().get(&id).cloned())
    }

    async fn get_due(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> WillCallResult<Vec<NotificationJob>> {
        let jobs = self.jobs.lock().unwrap();
        let mut due: Vec<NotificationJob> = jobs
            .values()
            .filter(|j| j.status == JobStatus::Pending && j.scheduled_at <= now)
            .cloned()
            .collect();
        due.sort_by(|a, b| a.scheduled_at.cmp(&b.scheduled_at).then(a.id.cmp(&b.id)));
        due.truncate(limit as usize);
        Ok(due)
    }

    async fn get_by_appointment(
        &self,
        appointment_id: &str,
    ) -> WillCallResult<Vec<NotificationJob>> {
        let jobs = self.jobs.lock().unwrap();
        let mut found: Vec<NotificationJob> = jobs
            .values()
            .filter(|j| j.appointment_id == appointment_id)
            .cloned()
            .collect();
        found.sort_by_key(|j| j.id);
        Ok(found)
    }

    async fn count_sent_for_appointment(&self, appointment_id: &str) -> WillCallResult<i64> {
        let jobs = self.jobs.lock().unwrap();
        Ok(jobs
            .values()
            .filter(|j| j.appointment_id == appointment_id && j.status == JobStatus::Sent)
            .count() as i64)
    }

    async fn cancel_pending_for_appointment(&self, appointment_id: &str) -> WillCallResult<u64> {
        let mut jobs = self.jobs.lock().unwrap();
        let mut cancelled = 0;
        for job in jobs.values_mut() {
            if job.appointment_id == appointment_id && job.status == JobStatus::Pending {
                job.status = JobStatus::Cancelled;
                cancelled += 1;
            }
        }
        Ok(cancelled)
    }

    async fn mark_sent(&self, id: i64, now: DateTime<Utc>) -> WillCallResult<()> {
        self.transition(id, JobStatus::Sent, Some(now), true, true)
    }

    async fn mark_skipped(&self, id: i64, now: DateTime<Utc>) -> WillCallResult<()> {
        // Skips stamp last_attempt_at without counting as an attempt.
        self.transition(id, JobStatus::Skipped, Some(now), false, false)
    }

    async fn mark_cancelled(&self, id: i64) -> WillCallResult<()> {
        self.transition(id, JobStatus::Cancelled, None, false, false)
    }

    async fn mark_failed(&self, id: i64, now: DateTime<Utc>) -> WillCallResult<()> {
        self.transition(id, JobStatus::Failed, Some(now), true, false)
    }
}

impl MockNotificationJobRepository {
    fn transition(
        &self,
        id: i64,
        status: JobStatus,
        stamped_at: Option<DateTime<Utc>>,
        attempted: bool,
        sent: bool,
    ) -> WillCallResult<()> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get_mut(&id)
            .ok_or(WillCallError::JobNotFound { id })?;
        job.status = status;
        if attempted {
            job.attempt_count += 1;
        }
        if let Some(at) = stamped_at {
            job.last_attempt_at = Some(at);
            if sent {
                job.sent_at = Some(at);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockJobStateRepository {
    states: Arc<Mutex<HashMap<String, JobState>>>,
}

impl MockJobStateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_last_run(name: &str, last_run_at: DateTime<Utc>) -> Self {
        let repo = Self::default();
        repo.states.lock().unwrap().insert(
            name.to_string(),
            JobState {
                name: name.to_string(),
                last_run_at,
            },
        );
        repo
    }
}

#[async_trait]
impl JobStateRepository for MockJobStateRepository {
    async fn get(&self, name: &str) -> WillCallResult<Option<JobState>> {
        Ok(self.states.lock().unwrap().get(name).cloned())
    }

    async fn try_claim(
        &self,
        name: &str,
        business_day_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> WillCallResult<bool> {
        let mut states = self.states.lock().unwrap();
        if let Some(state) = states.get(name) {
            if state.last_run_at >= business_day_start {
                return Ok(false);
            }
        }
        states.insert(
            name.to_string(),
            JobState {
                name: name.to_string(),
                last_run_at: now,
            },
        );
        Ok(true)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockAccessTokenRepository {
    tokens: Arc<Mutex<Vec<AccessToken>>>,
    next_id: Arc<Mutex<i64>>,
}

impl MockAccessTokenRepository {
    pub fn new() -> Self {
        Self {
            tokens: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    pub fn get_all(&self) -> Vec<AccessToken> {
        self.tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl AccessTokenRepository for MockAccessTokenRepository {
    async fn rotate(
        &self,
        kind: TokenKind,
        owner_id: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> WillCallResult<AccessToken> {
        let now = Utc::now();
        let mut tokens = self.tokens.lock().unwrap();
        for existing in tokens.iter_mut() {
            if existing.kind == kind && existing.owner_id == owner_id && existing.revoked_at.is_none() {
                existing.revoked_at = Some(now);
            }
        }

        let mut next_id = self.next_id.lock().unwrap();
        let fresh = AccessToken {
            id: *next_id,
            kind,
            owner_id: owner_id.to_string(),
            token: token.to_string(),
            revoked_at: None,
            expires_at,
            created_at: now,
        };
        *next_id += 1;
        tokens.push(fresh.clone());
        Ok(fresh)
    }

    async fn get_active(
        &self,
        kind: TokenKind,
        owner_id: &str,
        now: DateTime<Utc>,
    ) -> WillCallResult<Option<AccessToken>> {
        let tokens = self.tokens.lock().unwrap();
        Ok(tokens
            .iter()
            .filter(|t| t.kind == kind && t.owner_id == owner_id && t.is_active(now))
            .max_by_key(|t| t.id)
            .cloned())
    }
}

/// Recorded outbound email.
#[derive(Debug, Clone, PartialEq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Email sender that records every delivery instead of sending.
#[derive(Debug, Clone, Default)]
pub struct RecordingEmailSender {
    sent: Arc<Mutex<Vec<SentEmail>>>,
}

impl RecordingEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
    ) -> WillCallResult<SendOutcome> {
        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html_body: html_body.to_string(),
        });
        Ok(SendOutcome::sent())
    }
}

/// Recorded outbound SMS.
#[derive(Debug, Clone, PartialEq)]
pub struct SentSms {
    pub to: String,
    pub body: String,
}

/// SMS sender that records every delivery instead of sending.
#[derive(Debug, Clone, Default)]
pub struct RecordingSmsSender {
    sent: Arc<Mutex<Vec<SentSms>>>,
}

impl RecordingSmsSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentSms> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl SmsSender for RecordingSmsSender {
    async fn send_sms(&self, to: &str, body: &str) -> WillCallResult<SendOutcome> {
        self.sent.lock().unwrap().push(SentSms {
            to: to.to_string(),
            body: body.to_string(),
        });
        Ok(SendOutcome::sent())
    }
}

/// Email sender that always fails, for dispatch-failure tests.
#[derive(Debug, Clone, Default)]
pub struct FailingEmailSender;

#[async_trait]
impl EmailSender for FailingEmailSender {
    async fn send_email(
        &self,
        _to: &str,
        _subject: &str,
        _html_body: &str,
    ) -> WillCallResult<SendOutcome> {
        Err(WillCallError::channel_send("mock email failure"))
    }
}

/// SMS sender that always fails, for dispatch-failure tests.
#[derive(Debug, Clone, Default)]
pub struct FailingSmsSender;

#[async_trait]
impl SmsSender for FailingSmsSender {
    async fn send_sms(&self, _to: &str, _body: &str) -> WillCallResult<SendOutcome> {
        Err(WillCallError::channel_send("mock sms failure"))
    }
}

/// ERP row source returning a canned batch of raw rows, recording the
/// watermark each fetch was called with.
#[derive(Debug, Clone, Default)]
pub struct MockErpRowSource {
    rows: Arc<Mutex<Vec<serde_json::Value>>>,
    fetches: Arc<Mutex<Vec<DateTime<Utc>>>>,
}

impl MockErpRowSource {
    pub fn with_rows(rows: Vec<serde_json::Value>) -> Self {
        Self {
            rows: Arc::new(Mutex::new(rows)),
            fetches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn fetch_watermarks(&self) -> Vec<DateTime<Utc>> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ErpRowSource for MockErpRowSource {
    async fn fetch_orders(
        &self,
        _account: &str,
        since: DateTime<Utc>,
    ) -> WillCallResult<Vec<serde_json::Value>> {
        self.fetches.lock().unwrap().push(since);
        Ok(self.rows.lock().unwrap().clone())
    }
}
