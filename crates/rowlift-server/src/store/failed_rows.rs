//! Postgres failed row store

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;

use super::FailedRowStore;
use crate::db::DbResult;
use crate::models::{FieldMap, ImportRecordFailedRow};

/// Postgres-backed implementation of [`FailedRowStore`].
#[derive(Clone)]
pub struct PgFailedRowStore {
    pool: PgPool,
}

impl PgFailedRowStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FailedRowStore for PgFailedRowStore {
    async fn append(
        &self,
        import_record_id: i64,
        row_data: &FieldMap,
        fail_reasons: &[String],
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO import_record_failed_rows (import_record_id, row_data, fail_reasons)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(import_record_id)
        .bind(Json(row_data))
        .bind(Json(fail_reasons))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn all_for(&self, import_record_id: i64) -> DbResult<Vec<ImportRecordFailedRow>> {
        let rows = sqlx::query_as::<_, ImportRecordFailedRow>(
            r#"
            SELECT * FROM import_record_failed_rows
            WHERE import_record_id = $1
            ORDER BY id
            "#,
        )
        .bind(import_record_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn delete_all_for(&self, import_record_id: i64) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM import_record_failed_rows WHERE import_record_id = $1")
            .bind(import_record_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
