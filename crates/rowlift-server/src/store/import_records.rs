//! Postgres import record store

use async_trait::async_trait;
use rowlift_common::types::Pagination;
use sqlx::types::Json;
use sqlx::PgPool;

use super::ImportRecordStore;
use crate::db::{DbError, DbResult};
use crate::models::{ImportRecord, ImportStatus};

/// Postgres-backed implementation of [`ImportRecordStore`].
#[derive(Clone)]
pub struct PgImportRecordStore {
    pool: PgPool,
}

impl PgImportRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImportRecordStore for PgImportRecordStore {
    async fn create(&self, type_id: i16, created_by_id: i64) -> DbResult<ImportRecord> {
        let record = sqlx::query_as::<_, ImportRecord>(
            r#"
            INSERT INTO import_records (type_id, created_by_id)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(type_id)
        .bind(created_by_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn by_id(&self, id: i64) -> DbResult<ImportRecord> {
        sqlx::query_as::<_, ImportRecord>("SELECT * FROM import_records WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("import record", &id.to_string()))
    }

    async fn list(&self, page: Pagination) -> DbResult<Vec<ImportRecord>> {
        let records = sqlx::query_as::<_, ImportRecord>(
            r#"
            SELECT * FROM import_records
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn save_header_columns(&self, id: i64, columns: &[String]) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE import_records
            SET columns = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(Json(columns))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_in_progress(&self, id: i64, total_records: i32) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE import_records
            SET status = $2, total_records = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(ImportStatus::InProgress)
        .bind(total_records)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn increment_imported(&self, id: i64) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE import_records
            SET records_imported = records_imported + 1, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn increment_failed(&self, id: i64) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE import_records
            SET records_failed = records_failed + 1, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_completed(&self, id: i64) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE import_records
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(ImportStatus::Completed)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
