use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use willcall_core::WillCallResult;
use willcall_domain::{OrderRecord, OrderRepository};

pub struct SqliteOrderRepository {
    pool: SqlitePool,
}

impl SqliteOrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_order(row: &sqlx::sqlite::SqliteRow) -> WillCallResult<OrderRecord> {
        Ok(OrderRecord {
            order_nbr: row.try_get("order_nbr")?,
            status: row.try_get("status")?,
            location_id: row.try_get("location_id")?,
            requested_on: row.try_get("requested_on")?,
            ship_via: row.try_get("ship_via")?,
            job_name: row.try_get("job_name")?,
            customer_name: row.try_get("customer_name")?,
            buyer_group: row.try_get("buyer_group")?,
            note_id: row.try_get("note_id")?,
        })
    }
}

#[async_trait]
impl OrderRepository for SqliteOrderRepository {
    async fn upsert(&self, order: &OrderRecord) -> WillCallResult<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                order_nbr, status, location_id, requested_on, ship_via,
                job_name, customer_name, buyer_group, note_id
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(order_nbr) DO UPDATE SET
                status = excluded.status,
                location_id = excluded.location_id,
                requested_on = excluded.requested_on,
                ship_via = excluded.ship_via,
                job_name = excluded.job_name,
                customer_name = excluded.customer_name,
                buyer_group = excluded.buyer_group,
                note_id = excluded.note_id
            "#,
        )
        .bind(&order.order_nbr)
        .bind(&order.status)
        .bind(&order.location_id)
        .bind(order.requested_on)
        .bind(&order.ship_via)
        .bind(&order.job_name)
        .bind(&order.customer_name)
        .bind(&order.buyer_group)
        .bind(&order.note_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_by_order_nbr(&self, order_nbr: &str) -> WillCallResult<Option<OrderRecord>> {
        let row = sqlx::query("SELECT * FROM orders WHERE order_nbr = ?1")
            .bind(order_nbr)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_order).transpose()
    }

    async fn get_many(&self, order_nbrs: &[String]) -> WillCallResult<Vec<OrderRecord>> {
        if order_nbrs.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders: Vec<String> = (1..=order_nbrs.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "SELECT * FROM orders WHERE order_nbr IN ({}) ORDER BY order_nbr",
            placeholders.join(", ")
        );
        let mut query = sqlx::query(&sql);
        for nbr in order_nbrs {
            query = query.bind(nbr);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_order).collect()
    }
}
