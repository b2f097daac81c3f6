use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use willcall_core::WillCallResult;
use willcall_domain::{Appointment, AppointmentRepository, AppointmentStatus};

pub struct SqliteAppointmentRepository {
    pool: SqlitePool,
}

impl SqliteAppointmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_appointment(row: &sqlx::sqlite::SqliteRow) -> WillCallResult<Appointment> {
        let order_nbrs_json: String = row.try_get("order_nbrs")?;
        let order_nbrs: Vec<String> = serde_json::from_str(&order_nbrs_json)?;

        Ok(Appointment {
            id: row.try_get("id")?,
            start_at: row.try_get("start_at")?,
            end_at: row.try_get("end_at")?,
            location_id: row.try_get("location_id")?,
            status: row.try_get("status")?,
            customer_email: row.try_get("customer_email")?,
            customer_phone: row.try_get("customer_phone")?,
            email_opt_in: row.try_get("email_opt_in")?,
            sms_opt_in: row.try_get("sms_opt_in")?,
            email_override: row.try_get("email_override")?,
            phone_override: row.try_get("phone_override")?,
            opted_out_at: row.try_get("opted_out_at")?,
            opt_out_reason: row.try_get("opt_out_reason")?,
            order_nbrs,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl AppointmentRepository for SqliteAppointmentRepository {
    async fn create(&self, appointment: &Appointment) -> WillCallResult<()> {
        sqlx::query(
            r#"
            INSERT INTO appointments (
                id, start_at, end_at, location_id, status,
                customer_email, customer_phone, email_opt_in, sms_opt_in,
                email_override, phone_override, opted_out_at, opt_out_reason,
                order_nbrs, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
        )
        .bind(&appointment.id)
        .bind(appointment.start_at)
        .bind(appointment.end_at)
        .bind(&appointment.location_id)
        .bind(appointment.status)
        .bind(&appointment.customer_email)
        .bind(&appointment.customer_phone)
        .bind(appointment.email_opt_in)
        .bind(appointment.sms_opt_in)
        .bind(&appointment.email_override)
        .bind(&appointment.phone_override)
        .bind(appointment.opted_out_at)
        .bind(&appointment.opt_out_reason)
        .bind(serde_json::to_string(&appointment.order_nbrs)?)
        .bind(appointment.created_at)
        .bind(appointment.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> WillCallResult<Option<Appointment>> {
        let row = sqlx::query("SELECT * FROM appointments WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_appointment).transpose()
    }

    async fn update(&self, appointment: &Appointment) -> WillCallResult<()> {
        sqlx::query(
            r#"
            UPDATE appointments SET
                start_at = ?2, end_at = ?3, location_id = ?4, status = ?5,
                customer_email = ?6, customer_phone = ?7,
                email_opt_in = ?8, sms_opt_in = ?9,
                email_override = ?10, phone_override = ?11,
                opted_out_at = ?12, opt_out_reason = ?13,
                order_nbrs = ?14, updated_at = ?15
            WHERE id = ?1
            "#,
        )
        .bind(&appointment.id)
        .bind(appointment.start_at)
        .bind(appointment.end_at)
        .bind(&appointment.location_id)
        .bind(appointment.status)
        .bind(&appointment.customer_email)
        .bind(&appointment.customer_phone)
        .bind(appointment.email_opt_in)
        .bind(appointment.sms_opt_in)
        .bind(&appointment.email_override)
        .bind(&appointment.phone_override)
        .bind(appointment.opted_out_at)
        .bind(&appointment.opt_out_reason)
        .bind(serde_json::to_string(&appointment.order_nbrs)?)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_status(&self, id: &str, status: AppointmentStatus) -> WillCallResult<()> {
        sqlx::query("UPDATE appointments SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_ending_between(
        &self,
        statuses: &[AppointmentStatus],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> WillCallResult<Vec<Appointment>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders: Vec<String> = (3..=statuses.len() + 2).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "SELECT * FROM appointments
             WHERE end_at >= ?1 AND end_at < ?2 AND status IN ({})
             ORDER BY end_at",
            placeholders.join(", ")
        );
        let mut query = sqlx::query(&sql).bind(from).bind(to);
        for status in statuses {
            query = query.bind(*status);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_appointment).collect()
    }
}
