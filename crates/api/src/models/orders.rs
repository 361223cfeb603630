//! Order queries.

use std::sync::Arc;

use storefront_infra::{Database, RowMap};

use crate::dispatch::Failure;

pub struct OrderModel {
    db: Arc<dyn Database>,
}

impl OrderModel {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Paged listing; offset/limit are integer-sanitized by the caller
    /// before interpolation.
    pub async fn read_all(&self, offset: i64, limit: i64) -> Result<Vec<RowMap>, Failure> {
        let rows = self
            .db
            .query(&format!("SELECT * FROM orders LIMIT {offset}, {limit}"), &[])
            .await?;
        Ok(rows)
    }

    /// An order with its line items, one row per item.
    pub async fn read(&self, id: i64) -> Result<Vec<RowMap>, Failure> {
        let rows = self
            .db
            .query(
                "SELECT o.id AS order_id, u.name AS customer, o.total, o.status, \
                 p.name AS product, oi.quantity, oi.price \
                 FROM orders o \
                 JOIN users u ON o.user_id = u.id \
                 JOIN order_items oi ON o.id = oi.order_id \
                 JOIN products p ON oi.product_id = p.id \
                 WHERE o.id = ?",
                &[id.into()],
            )
            .await?;
        Ok(rows)
    }

    pub async fn read_statuses(&self) -> Result<Vec<RowMap>, Failure> {
        let rows = self
            .db
            .query(
                "SELECT id, status FROM orders GROUP BY status ORDER BY status",
                &[],
            )
            .await?;
        Ok(rows)
    }

    pub async fn read_status(&self, name: &str) -> Result<Vec<RowMap>, Failure> {
        let rows = self
            .db
            .query(
                "SELECT * FROM orders WHERE LOWER(status) = ?",
                &[name.to_lowercase().into()],
            )
            .await?;
        Ok(rows)
    }
}
