//! Channel message rendering from a job's payload snapshot, falling back to
//! live appointment data where snapshot fields are absent.

use chrono::{DateTime, Utc};
use willcall_core::business_time::BUSINESS_TZ;
use willcall_core::{WillCallError, WillCallResult};
use willcall_domain::{Appointment, NotificationPayload, NotificationType};

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMessage {
    pub subject: String,
    pub html_body: String,
    pub sms_body: String,
}

/// Types whose message embeds the customer pickup link; absence of the link
/// is fatal for the job before any send is attempted.
pub fn link_required(kind: NotificationType) -> bool {
    matches!(
        kind,
        NotificationType::ScheduledConfirm
            | NotificationType::Reminder1Day
            | NotificationType::Reminder1Hour
            | NotificationType::Rescheduled
            | NotificationType::ReadyForPickup
    )
}

fn format_local(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&BUSINESS_TZ)
        .format("%a %b %-d, %Y at %-I:%M %p")
        .to_string()
}

fn order_list(payload: &NotificationPayload, appointment: &Appointment) -> Vec<String> {
    if payload.order_nbrs.is_empty() {
        appointment.order_nbrs.clone()
    } else {
        payload.order_nbrs.clone()
    }
}

fn orders_line(orders: &[String]) -> String {
    if orders.is_empty() {
        "your order".to_string()
    } else {
        orders.join(", ")
    }
}

/// Build both channel bodies for one job. The runner decides which channels
/// actually deliver.
pub fn render(
    job_id: i64,
    kind: NotificationType,
    payload: &NotificationPayload,
    appointment: &Appointment,
) -> WillCallResult<RenderedMessage> {
    let link = payload.link.as_deref();
    if link_required(kind) && link.is_none() {
        return Err(WillCallError::MissingLink { job_id });
    }
    let link = link.unwrap_or_default();

    let start = payload.new_start_at.unwrap_or(appointment.start_at);
    let when = format_local(start);
    let orders = orders_line(&order_list(payload, appointment));

    let message = match kind {
        NotificationType::ScheduledConfirm => RenderedMessage {
            subject: "Your will-call pickup is scheduled".into(),
            html_body: format!(
                "<p>Your pickup for {orders} is scheduled for <b>{when}</b>.</p>\
                 <p><a href=\"{link}\">View or manage your appointment</a></p>"
            ),
            sms_body: format!("Pickup scheduled for {when} ({orders}). Manage: {link}"),
        },
        NotificationType::Reminder1Day => RenderedMessage {
            subject: "Pickup reminder: tomorrow".into(),
            html_body: format!(
                "<p>Reminder: your pickup for {orders} is tomorrow, <b>{when}</b>.</p>\
                 <p><a href=\"{link}\">View your appointment</a></p>"
            ),
            sms_body: format!("Reminder: pickup tomorrow, {when}. Details: {link}"),
        },
        NotificationType::Reminder1Hour => RenderedMessage {
            subject: "Pickup reminder: one hour".into(),
            html_body: format!(
                "<p>Your pickup for {orders} starts in about an hour, at <b>{when}</b>.</p>\
                 <p><a href=\"{link}\">View your appointment</a></p>"
            ),
            sms_body: format!("Reminder: pickup at {when} (about an hour away). {link}"),
        },
        NotificationType::Rescheduled => {
            let old = payload
                .old_start_at
                .map(format_local)
                .unwrap_or_else(|| "the previous time".to_string());
            RenderedMessage {
                subject: "Your pickup has been rescheduled".into(),
                html_body: format!(
                    "<p>Your pickup for {orders} moved from {old} to <b>{when}</b>.</p>\
                     <p><a href=\"{link}\">View your appointment</a></p>"
                ),
                sms_body: format!("Pickup rescheduled: {old} -> {when}. Details: {link}"),
            }
        }
        NotificationType::Cancelled => {
            let reason = payload
                .cancel_reason
                .as_deref()
                .unwrap_or("no reason given");
            RenderedMessage {
                subject: "Your pickup has been cancelled".into(),
                html_body: format!(
                    "<p>Your pickup for {orders} scheduled for {when} was cancelled ({reason}).</p>"
                ),
                sms_body: format!("Pickup for {when} cancelled ({reason})."),
            }
        }
        NotificationType::Completed => RenderedMessage {
            subject: "Pickup complete".into(),
            html_body: format!("<p>Your pickup for {orders} is complete. Thank you!</p>"),
            sms_body: format!("Pickup complete for {orders}. Thank you!"),
        },
        NotificationType::OrderListChanged => RenderedMessage {
            subject: "Your pickup order list changed".into(),
            html_body: format!(
                "<p>The orders on your pickup for <b>{when}</b> changed. Now included: {orders}.</p>"
            ),
            sms_body: format!("Pickup update: orders now {orders} for {when}."),
        },
        NotificationType::ReadyForPickup => RenderedMessage {
            subject: "Your order is ready for pickup".into(),
            html_body: format!(
                "<p>{orders} is ready for pickup.</p>\
                 <p><a href=\"{link}\">Schedule or view your appointment</a></p>"
            ),
            sms_body: format!("{orders} is ready for pickup. {link}"),
        },
    };

    Ok(message)
}

/// Terminal no-show notice, sent directly by the sweep rather than through
/// the job queue.
pub fn render_no_show(appointment: &Appointment) -> RenderedMessage {
    let when = format_local(appointment.start_at);
    let orders = orders_line(&appointment.order_nbrs);
    RenderedMessage {
        subject: "Missed pickup".into(),
        html_body: format!(
            "<p>We missed you at your pickup for {orders} scheduled for {when}.</p>\
             <p>Please contact us to reschedule.</p>"
        ),
        sms_body: format!("We missed you at your {when} pickup ({orders}). Contact us to reschedule."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn appointment() -> Appointment {
        let mut appt = Appointment::new(
            "appt-1".into(),
            "2024-03-11T00:00:00Z".parse().unwrap(),
            "2024-03-11T01:00:00Z".parse().unwrap(),
        );
        appt.order_nbrs = vec!["SO-1".into(), "SO-2".into()];
        appt
    }

    #[test]
    fn missing_link_is_fatal_for_link_bearing_types() {
        let payload = NotificationPayload::default();
        let err = render(7, NotificationType::Reminder1Day, &payload, &appointment()).unwrap_err();
        assert!(matches!(err, WillCallError::MissingLink { job_id: 7 }));
    }

    #[test]
    fn cancelled_renders_without_link() {
        let payload = NotificationPayload {
            cancel_reason: Some("weather".into()),
            ..Default::default()
        };
        let msg = render(1, NotificationType::Cancelled, &payload, &appointment()).unwrap();
        assert!(msg.sms_body.contains("weather"));
    }

    #[test]
    fn snapshot_orders_win_over_live_orders() {
        let payload = NotificationPayload {
            order_nbrs: vec!["SO-9".into()],
            link: Some("https://x/1".into()),
            ..Default::default()
        };
        let msg = render(1, NotificationType::ScheduledConfirm, &payload, &appointment()).unwrap();
        assert!(msg.sms_body.contains("SO-9"));
        assert!(!msg.sms_body.contains("SO-1"));
    }

    #[test]
    fn empty_snapshot_falls_back_to_live_orders() {
        let payload = NotificationPayload {
            link: Some("https://x/1".into()),
            ..Default::default()
        };
        let msg = render(1, NotificationType::ScheduledConfirm, &payload, &appointment()).unwrap();
        assert!(msg.sms_body.contains("SO-1, SO-2"));
    }

    #[test]
    fn times_render_in_business_local_time() {
        // 2024-03-11T00:00Z is 18:00 on March 10 in Denver (MDT).
        let payload = NotificationPayload {
            link: Some("https://x/1".into()),
            ..Default::default()
        };
        let msg = render(1, NotificationType::ScheduledConfirm, &payload, &appointment()).unwrap();
        assert!(msg.sms_body.contains("Mar 10, 2024 at 6:00 PM"), "{}", msg.sms_body);
    }

    #[test]
    fn rescheduled_shows_old_and_new_times() {
        let payload = NotificationPayload {
            old_start_at: Some("2024-03-10T20:00:00Z".parse().unwrap()),
            new_start_at: Some("2024-03-11T00:00:00Z".parse().unwrap()),
            link: Some("https://x/1".into()),
            ..Default::default()
        };
        let msg = render(1, NotificationType::Rescheduled, &payload, &appointment()).unwrap();
        assert!(msg.sms_body.contains("->"));
    }
}
