use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Collection, ContentPayload, ContentRecord, SortOrder},
    error::{AppError, Result},
    repository::ContentRepository,
};

// Both collection tables share this layout
#[derive(FromRow)]
struct ContentRow {
    id: String,
    title: String,
    content: String,
    start_date: NaiveDateTime,
    end_date: NaiveDateTime,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

const COLUMNS: &str = "id, title, content, start_date, end_date, created_at, updated_at";

pub struct SqliteContentRepository {
    pool: SqlitePool,
}

impl SqliteContentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_record(collection: Collection, row: ContentRow) -> Result<ContentRecord> {
        Ok(ContentRecord {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            collection,
            title: row.title,
            content: row.content,
            start_date: DateTime::from_naive_utc_and_offset(row.start_date, Utc),
            end_date: DateTime::from_naive_utc_and_offset(row.end_date, Utc),
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn rows_to_records(collection: Collection, rows: Vec<ContentRow>) -> Result<Vec<ContentRecord>> {
        rows.into_iter()
            .map(|row| Self::row_to_record(collection, row))
            .collect()
    }
}

#[async_trait]
impl ContentRepository for SqliteContentRepository {
    async fn create(&self, collection: Collection, payload: ContentPayload) -> Result<ContentRecord> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let written_at = payload.updated_at.naive_utc();

        let sql = format!(
            "INSERT INTO {} ({}) VALUES (?, ?, ?, ?, ?, ?, ?)",
            collection.table_name(),
            COLUMNS
        );

        sqlx::query(&sql)
            .bind(&id_str)
            .bind(&payload.title)
            .bind(&payload.content)
            .bind(payload.start_date.naive_utc())
            .bind(payload.end_date.naive_utc())
            .bind(written_at)
            .bind(written_at)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(collection = %collection, %id, "created content");

        self.find_by_id(collection, id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created content".to_string())
        })
    }

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<ContentRecord>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ?",
            COLUMNS,
            collection.table_name()
        );

        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_record(collection, r)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, collection: Collection, order: SortOrder) -> Result<Vec<ContentRecord>> {
        let sql = format!(
            "SELECT {} FROM {} {}",
            COLUMNS,
            collection.table_name(),
            order.sql()
        );

        let rows = sqlx::query_as::<_, ContentRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Self::rows_to_records(collection, rows)
    }

    async fn list_started(
        &self,
        collection: Collection,
        at: DateTime<Utc>,
        order: SortOrder,
    ) -> Result<Vec<ContentRecord>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE start_date <= ? {}",
            COLUMNS,
            collection.table_name(),
            order.sql()
        );

        let rows = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(at.naive_utc())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Self::rows_to_records(collection, rows)
    }

    async fn update(&self, collection: Collection, id: Uuid, payload: ContentPayload) -> Result<ContentRecord> {
        let sql = format!(
            r#"
            UPDATE {}
            SET title = ?, content = ?, start_date = ?, end_date = ?, updated_at = ?
            WHERE id = ?
            "#,
            collection.table_name()
        );

        let result = sqlx::query(&sql)
            .bind(&payload.title)
            .bind(&payload.content)
            .bind(payload.start_date.naive_utc())
            .bind(payload.end_date.naive_utc())
            .bind(payload.updated_at.naive_utc())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "No {} with id {}",
                collection.singular(),
                id
            )));
        }

        tracing::debug!(collection = %collection, %id, "updated content");

        self.find_by_id(collection, id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated content".to_string())
        })
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?", collection.table_name());

        let result = sqlx::query(&sql)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
