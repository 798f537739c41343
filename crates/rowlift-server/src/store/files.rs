//! Postgres import file attachment store

use async_trait::async_trait;
use sqlx::PgPool;

use super::ImportFileStore;
use crate::db::{DbError, DbResult};
use crate::models::{FileCollection, ImportRecordFile};

/// Postgres-backed implementation of [`ImportFileStore`].
#[derive(Clone)]
pub struct PgImportFileStore {
    pool: PgPool,
}

impl PgImportFileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImportFileStore for PgImportFileStore {
    async fn attach(
        &self,
        import_record_id: i64,
        collection: FileCollection,
        storage_key: &str,
        file_name: &str,
    ) -> DbResult<ImportRecordFile> {
        sqlx::query_as::<_, ImportRecordFile>(
            r#"
            INSERT INTO import_record_files (import_record_id, collection, storage_key, file_name)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(import_record_id)
        .bind(collection.as_str())
        .bind(storage_key)
        .bind(file_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.is_unique_violation() {
                    return DbError::duplicate(
                        "import record file",
                        &format!("{}/{}", import_record_id, collection),
                    );
                }
            }
            DbError::from(e)
        })
    }

    async fn first_for(
        &self,
        import_record_id: i64,
        collection: FileCollection,
    ) -> DbResult<Option<ImportRecordFile>> {
        let file = sqlx::query_as::<_, ImportRecordFile>(
            r#"
            SELECT * FROM import_record_files
            WHERE import_record_id = $1 AND collection = $2
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(import_record_id)
        .bind(collection.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(file)
    }
}
