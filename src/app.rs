use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{error, info};
use willcall_core::AppConfig;
use willcall_domain::BaseUrlLinkBuilder;
use willcall_infrastructure::{
    connect_pool, FileDropRowSource, LoggingEmailSender, LoggingSmsSender,
    SqliteAccessTokenRepository, SqliteAppointmentRepository, SqliteJobStateRepository,
    SqliteNotificationJobRepository, SqliteOrderRepository,
};
use willcall_notifier::{JobRunner, NoShowSweep, NotificationOrchestrator};
use willcall_sync::OrderSyncService;

/// Which components this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// Only the ERP order delta sync.
    Sync,
    /// Only the dispatch loop and no-show sweep.
    Notifier,
    /// Everything.
    All,
}

pub struct Application {
    config: AppConfig,
    mode: AppMode,
    runner: Arc<JobRunner>,
    sweep: Arc<NoShowSweep>,
    sync: Arc<OrderSyncService>,
}

impl Application {
    pub async fn new(config: AppConfig, mode: AppMode) -> Result<Self> {
        info!(?mode, "initializing application");

        let pool = connect_pool(&config.database)
            .await
            .with_context(|| format!("opening database {}", config.database.url))?;

        let order_repo = Arc::new(SqliteOrderRepository::new(pool.clone()));
        let appointment_repo = Arc::new(SqliteAppointmentRepository::new(pool.clone()));
        let job_repo = Arc::new(SqliteNotificationJobRepository::new(pool.clone()));
        let job_state_repo = Arc::new(SqliteJobStateRepository::new(pool.clone()));
        let token_repo = Arc::new(SqliteAccessTokenRepository::new(pool));

        let email_sender = Arc::new(LoggingEmailSender);
        let sms_sender = Arc::new(LoggingSmsSender);
        let link_builder = Arc::new(BaseUrlLinkBuilder::new(config.erp.link_base_url.clone()));

        let runner = Arc::new(JobRunner::new(
            job_repo.clone(),
            appointment_repo.clone(),
            order_repo.clone(),
            email_sender.clone(),
            sms_sender.clone(),
            config.notifier.notification_cap,
            config.notifier.batch_size,
        ));

        let orchestrator = Arc::new(NotificationOrchestrator::new(
            job_repo.clone(),
            token_repo,
            link_builder,
            email_sender,
            sms_sender,
        ));
        let sweep = Arc::new(NoShowSweep::new(
            appointment_repo,
            job_repo,
            job_state_repo,
            orchestrator,
            config.sweep.clone(),
        ));

        let row_source = Arc::new(FileDropRowSource::new(config.erp.drop_file.clone()));
        let sync = Arc::new(OrderSyncService::new(
            row_source,
            order_repo,
            config.erp.account.clone(),
            config.erp.window_start_hour,
        ));

        Ok(Self {
            config,
            mode,
            runner,
            sweep,
            sync,
        })
    }

    pub async fn run(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        info!(mode = ?self.mode, "starting application");

        let mut handles = Vec::new();

        if matches!(self.mode, AppMode::Notifier | AppMode::All) && self.config.notifier.enabled {
            let runner = Arc::clone(&self.runner);
            let sweep = Arc::clone(&self.sweep);
            let interval = Duration::from_millis(self.config.notifier.poll_interval_ms);
            let rx = shutdown_rx.resubscribe();
            handles.push(tokio::spawn(async move {
                run_notifier_loop(runner, sweep, interval, rx).await;
            }));
        }

        if matches!(self.mode, AppMode::Sync | AppMode::All) && self.config.erp.enabled {
            let sync = Arc::clone(&self.sync);
            let rx = shutdown_rx.resubscribe();
            handles.push(tokio::spawn(async move {
                run_sync_loop(sync, rx).await;
            }));
        }

        if handles.is_empty() {
            anyhow::bail!("no components enabled for mode {:?}", self.mode);
        }

        for handle in handles {
            handle.await.context("component task panicked")?;
        }
        info!("all components stopped");
        Ok(())
    }
}

/// Dispatch tick plus the daily sweep gate, every poll interval.
async fn run_notifier_loop(
    runner: Arc<JobRunner>,
    sweep: Arc<NoShowSweep>,
    poll_interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    info!(interval_ms = poll_interval.as_millis() as u64, "notifier loop started");
    let mut ticker = tokio::time::interval(poll_interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Utc::now();
                if let Err(e) = sweep.run_if_due(now).await {
                    error!(error = %e, "no-show sweep failed");
                }
                if let Err(e) = runner.run_tick(now).await {
                    error!(error = %e, "dispatch tick failed");
                }
            }
            _ = shutdown_rx.recv() => {
                info!("notifier loop stopping");
                break;
            }
        }
    }
}

/// Hourly order delta sync; the watermark makes overlapping windows safe.
async fn run_sync_loop(sync: Arc<OrderSyncService>, mut shutdown_rx: broadcast::Receiver<()>) {
    info!("order sync loop started");
    let mut ticker = tokio::time::interval(Duration::from_secs(3600));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = sync.sync_once(Utc::now()).await {
                    error!(error = %e, "order delta sync failed");
                }
            }
            _ = shutdown_rx.recv() => {
                info!("order sync loop stopping");
                break;
            }
        }
    }
}
