use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};
use willcall_core::business_time;
use willcall_core::WillCallResult;
use willcall_domain::{ErpRowSource, OrderRepository};

use crate::delta_filter::{self, FilterCounts};

/// Per-run outcome for one account's delta sync. Upsert failures are
/// collected per record rather than aborting the run.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub counts: FilterCounts,
    pub upserted: usize,
    pub failed: usize,
}

/// Pulls order rows for one customer account from the ERP, runs the delta
/// filter, and upserts the survivors.
pub struct OrderSyncService {
    row_source: Arc<dyn ErpRowSource>,
    order_repo: Arc<dyn OrderRepository>,
    account: String,
    window_start_hour: u32,
}

impl OrderSyncService {
    pub fn new(
        row_source: Arc<dyn ErpRowSource>,
        order_repo: Arc<dyn OrderRepository>,
        account: String,
        window_start_hour: u32,
    ) -> Self {
        Self {
            row_source,
            order_repo,
            account,
            window_start_hour,
        }
    }

    pub async fn sync_once(&self, now: DateTime<Utc>) -> WillCallResult<SyncReport> {
        let since = business_time::business_day_window_start(now, self.window_start_hour);
        info!(account = %self.account, since = %since, "starting order delta sync");

        let rows = self.row_source.fetch_orders(&self.account, since).await?;
        let outcome = delta_filter::filter_order_rows(&rows, now);

        let mut report = SyncReport {
            counts: outcome.counts,
            ..Default::default()
        };

        for record in &outcome.kept {
            match self.order_repo.upsert(record).await {
                Ok(()) => report.upserted += 1,
                Err(e) => {
                    report.failed += 1;
                    error!(order_nbr = %record.order_nbr, error = %e, "order upsert failed");
                }
            }
        }

        if report.failed > 0 {
            warn!(
                account = %self.account,
                failed = report.failed,
                "order delta sync finished with per-record failures"
            );
        }
        info!(
            account = %self.account,
            total = report.counts.total_from_erp,
            kept = report.counts.kept,
            dropped_missing = report.counts.dropped_missing,
            dropped_excluded = report.counts.dropped_excluded,
            dropped_old = report.counts.dropped_old,
            upserted = report.upserted,
            "order delta sync complete"
        );
        Ok(report)
    }
}
