//! Normalizes raw ERP rows into canonical order records.
//!
//! Pure and non-throwing: malformed rows are dropped and counted, never
//! surfaced as errors.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;
use willcall_core::business_time;
use willcall_domain::OrderRecord;

use crate::erp_row;

/// Order number prefixes that are not will-call orders (quotes and RMAs).
const EXCLUDED_PREFIXES: &[&str] = &["QT", "RMA"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterCounts {
    pub total_from_erp: usize,
    pub dropped_missing: usize,
    pub dropped_excluded: usize,
    pub dropped_old: usize,
    /// Post-dedup count. The drop counters are tallied before dedup, so the
    /// counters do not partition `total_from_erp`; downstream reporting
    /// depends on exactly this accounting.
    pub kept: usize,
}

#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub kept: Vec<OrderRecord>,
    pub counts: FilterCounts,
    pub cutoff: DateTime<Utc>,
}

/// Apply exclusion, staleness and dedup rules to one account's raw rows.
pub fn filter_order_rows(rows: &[Value], now: DateTime<Utc>) -> FilterOutcome {
    let cutoff = business_time::one_business_year_ago(now);
    let mut counts = FilterCounts {
        total_from_erp: rows.len(),
        ..Default::default()
    };

    let mut kept: Vec<OrderRecord> = Vec::new();
    // order_nbr -> index into `kept`, for last-writer-wins dedup.
    let mut seen: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

    for row in rows {
        let Some(order_nbr) = erp_row::field_str(row, erp_row::ORDER_NBR_ALIASES) else {
            counts.dropped_missing += 1;
            continue;
        };

        // Quotes and RMAs are excluded regardless of other field validity.
        if EXCLUDED_PREFIXES
            .iter()
            .any(|prefix| order_nbr.starts_with(prefix))
        {
            counts.dropped_excluded += 1;
            continue;
        }

        let Some(status) = erp_row::field_str(row, erp_row::STATUS_ALIASES) else {
            counts.dropped_missing += 1;
            continue;
        };
        let Some(requested_on) = erp_row::field_str(row, erp_row::REQUESTED_ON_ALIASES)
            .and_then(|raw| erp_row::parse_erp_timestamp(&raw))
        else {
            counts.dropped_missing += 1;
            continue;
        };

        if requested_on < cutoff {
            counts.dropped_old += 1;
            continue;
        }

        let record = OrderRecord {
            order_nbr: order_nbr.clone(),
            status,
            location_id: erp_row::field_str(row, erp_row::LOCATION_ID_ALIASES),
            requested_on,
            ship_via: erp_row::field_str(row, erp_row::SHIP_VIA_ALIASES),
            job_name: erp_row::field_str(row, erp_row::JOB_NAME_ALIASES),
            customer_name: erp_row::field_str(row, erp_row::CUSTOMER_NAME_ALIASES),
            buyer_group: erp_row::field_str(row, erp_row::BUYER_GROUP_ALIASES),
            note_id: erp_row::field_str(row, erp_row::NOTE_ID_ALIASES),
        };

        match seen.get(&order_nbr) {
            // Strictly greater wins; ties keep the first-seen row.
            Some(&idx) if record.requested_on > kept[idx].requested_on => {
                kept[idx] = record;
            }
            Some(_) => {}
            None => {
                seen.insert(order_nbr, kept.len());
                kept.push(record);
            }
        }
    }

    counts.kept = kept.len();
    debug!(
        total = counts.total_from_erp,
        missing = counts.dropped_missing,
        excluded = counts.dropped_excluded,
        old = counts.dropped_old,
        kept = counts.kept,
        "filtered ERP order rows"
    );

    FilterOutcome {
        kept,
        counts,
        cutoff,
    }
}
