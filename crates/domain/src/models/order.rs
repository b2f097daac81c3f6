use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A canonical will-call order after the ERP delta filter. `order_nbr` is the
/// unique business key; quotes (`QT*`) and RMAs never reach this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_nbr: String,
    pub status: String,
    pub location_id: Option<String>,
    pub requested_on: DateTime<Utc>,
    pub ship_via: Option<String>,
    pub job_name: Option<String>,
    pub customer_name: Option<String>,
    pub buyer_group: Option<String>,
    pub note_id: Option<String>,
}
