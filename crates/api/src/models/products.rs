//! Product queries.

use std::sync::Arc;

use storefront_infra::{Database, RowMap, SqlValue};

use crate::dispatch::Failure;

pub struct ProductModel {
    db: Arc<dyn Database>,
}

impl ProductModel {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Paged listing. `offset` and `limit` are interpolated directly — the
    /// single sanctioned interpolation, acceptable only because both values
    /// are forced through integer sanitization first.
    pub async fn read_all(&self, offset: i64, limit: i64) -> Result<Vec<RowMap>, Failure> {
        let rows = self
            .db
            .query(&format!("SELECT * FROM products LIMIT {offset}, {limit}"), &[])
            .await?;
        Ok(rows)
    }

    pub async fn read(&self, id: i64) -> Result<Option<RowMap>, Failure> {
        let row = self
            .db
            .fetch_first("SELECT * FROM products WHERE id = ?", &[id.into()])
            .await?;
        Ok(row)
    }

    pub async fn read_categories(&self) -> Result<Vec<RowMap>, Failure> {
        let rows = self
            .db
            .query(
                "SELECT id, category FROM products GROUP BY category ORDER BY category",
                &[],
            )
            .await?;
        Ok(rows)
    }

    pub async fn read_category(&self, name: &str) -> Result<Vec<RowMap>, Failure> {
        let rows = self
            .db
            .query(
                "SELECT * FROM products WHERE LOWER(category) = ?",
                &[name.to_lowercase().into()],
            )
            .await?;
        Ok(rows)
    }

    /// Dynamic update over the provided columns. Column names come from the
    /// handler's fixed field set, never from input. `false` when nothing was
    /// provided or no row changed.
    pub async fn update(&self, id: i64, fields: &[(&str, SqlValue)]) -> Result<bool, Failure> {
        if fields.is_empty() {
            return Ok(false);
        }

        let assignments = fields
            .iter()
            .map(|(column, _)| format!("{column} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE products SET {assignments} WHERE id = ?");

        let mut params: Vec<SqlValue> = fields.iter().map(|(_, value)| value.clone()).collect();
        params.push(id.into());

        let exec = self.db.execute(&sql, &params).await?;
        Ok(exec.rows_affected > 0)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, Failure> {
        let exec = self
            .db
            .execute("DELETE FROM products WHERE id = ?", &[id.into()])
            .await?;
        Ok(exec.rows_affected > 0)
    }
}
