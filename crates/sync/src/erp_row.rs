//! Field extraction for raw ERP order rows.
//!
//! Rows arrive in two shapes depending on the upstream endpoint generation:
//! flat fields (`{"OrderNbr": "SO-1"}`) or OData-style wrapped fields
//! (`{"OrderNbr": {"value": "SO-1"}}`). Several fields also carry historical
//! name aliases. Each field is read through an ordered fallback list so the
//! precedence is documented here and testable in isolation.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

pub const ORDER_NBR_ALIASES: &[&str] = &["OrderNbr", "orderNbr", "OrderNumber"];
pub const STATUS_ALIASES: &[&str] = &["Status", "status", "OrderStatus"];
pub const REQUESTED_ON_ALIASES: &[&str] = &["RequestedOn", "requestedOn", "RequestDate"];
pub const LOCATION_ID_ALIASES: &[&str] = &["LocationID", "locationId", "Location"];
pub const SHIP_VIA_ALIASES: &[&str] = &["ShipVia", "shipVia"];
pub const JOB_NAME_ALIASES: &[&str] = &["JobName", "jobName", "Project"];
pub const CUSTOMER_NAME_ALIASES: &[&str] = &["CustomerName", "customerName", "Customer"];
pub const BUYER_GROUP_ALIASES: &[&str] = &["BuyerGroup", "buyerGroup"];
pub const NOTE_ID_ALIASES: &[&str] = &["NoteID", "noteId"];

/// Unwrap a possibly `{"value": ...}`-wrapped field.
fn unwrap_value(field: &Value) -> &Value {
    match field {
        Value::Object(map) => map.get("value").unwrap_or(field),
        _ => field,
    }
}

/// Read the first present alias as a trimmed non-empty string. Numbers are
/// stringified; null, empty and non-scalar values read as absent.
pub fn field_str(row: &Value, aliases: &[&str]) -> Option<String> {
    for alias in aliases {
        let Some(field) = row.get(alias) else {
            continue;
        };
        let text = match unwrap_value(field) {
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    continue;
                }
                trimmed.to_string()
            }
            Value::Number(n) => n.to_string(),
            _ => continue,
        };
        return Some(text);
    }
    None
}

/// Parse an ERP timestamp. The feed emits RFC 3339 with offset on newer
/// endpoints and bare naive timestamps (implicitly UTC) on older ones.
pub fn parse_erp_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
