pub mod delta_filter;
pub mod erp_row;
pub mod service;
pub mod session;

pub use delta_filter::{filter_order_rows, FilterCounts, FilterOutcome};
pub use service::{OrderSyncService, SyncReport};
pub use session::{ErpSession, SessionRefresher};
