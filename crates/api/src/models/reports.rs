//! Aggregate report queries, scoped to one user.

use std::sync::Arc;

use storefront_infra::{Database, RowMap};

use crate::dispatch::Failure;

pub struct ReportModel {
    db: Arc<dyn Database>,
}

impl ReportModel {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    pub async fn order_stats(&self, user_id: i64) -> Result<Vec<RowMap>, Failure> {
        let rows = self
            .db
            .query(
                "SELECT COUNT(id) AS totalOrders, IFNULL(SUM(total), 0) AS totalSpent, \
                 IFNULL(AVG(total), 0) AS averageOrder, \
                 IFNULL(SUM((SELECT COUNT(id) FROM order_items WHERE order_id = o.id)), 0) AS numItems \
                 FROM orders o WHERE user_id = ?",
                &[user_id.into()],
            )
            .await?;
        Ok(rows)
    }

    pub async fn top_products(&self, user_id: i64) -> Result<Vec<RowMap>, Failure> {
        let rows = self
            .db
            .query(
                "SELECT p.name, MAX(oi.quantity) AS quantity, oi.price \
                 FROM orders o \
                 INNER JOIN order_items oi ON o.id = oi.order_id \
                 INNER JOIN products p ON oi.product_id = p.id \
                 WHERE o.user_id = ? \
                 GROUP BY p.name ORDER BY oi.quantity DESC LIMIT 5",
                &[user_id.into()],
            )
            .await?;
        Ok(rows)
    }

    pub async fn recent_orders(&self, user_id: i64) -> Result<Vec<RowMap>, Failure> {
        let rows = self
            .db
            .query(
                "SELECT o.id, DATE_FORMAT(o.created_at, '%b %D, %Y') AS date, \
                 COUNT(oi.quantity) AS numItems, o.total, o.status \
                 FROM orders o \
                 INNER JOIN order_items oi ON o.id = oi.order_id \
                 WHERE user_id = ? GROUP BY o.id LIMIT 5",
                &[user_id.into()],
            )
            .await?;
        Ok(rows)
    }
}
