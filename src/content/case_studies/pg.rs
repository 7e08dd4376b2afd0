use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use std::sync::Arc;
use uuid::Uuid;

use super::store::{CaseStudyStore, StoreError};
use crate::db::{
    is_unique_violation,
    models::{CaseStudy, NewCaseStudy},
};

const COLUMNS: &str = "id, title, slug, category, image, year, description, link, \
                       sort_order, translations, created_at, updated_at";

/// PostgreSQL-backed store. Slug uniqueness comes from `idx_case_studies_slug`.
pub struct PgCaseStudyStore {
    pool: Arc<PgPool>,
}

impl PgCaseStudyStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

fn map_write_error(err: sqlx::Error, slug: &str) -> StoreError {
    if is_unique_violation(&err) {
        StoreError::SlugTaken(slug.to_string())
    } else {
        StoreError::Database(err)
    }
}

#[async_trait]
impl CaseStudyStore for PgCaseStudyStore {
    async fn list(&self) -> Result<Vec<CaseStudy>, StoreError> {
        let rows = sqlx::query_as::<_, CaseStudy>(&format!(
            "SELECT {} FROM case_studies ORDER BY sort_order ASC, created_at ASC",
            COLUMNS
        ))
        .fetch_all(self.pool.as_ref())
        .await?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CaseStudy>, StoreError> {
        let row = sqlx::query_as::<_, CaseStudy>(&format!(
            "SELECT {} FROM case_studies WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;
        Ok(row)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<CaseStudy>, StoreError> {
        let row = sqlx::query_as::<_, CaseStudy>(&format!(
            "SELECT {} FROM case_studies WHERE slug = $1",
            COLUMNS
        ))
        .bind(slug)
        .fetch_optional(self.pool.as_ref())
        .await?;
        Ok(row)
    }

    async fn slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool, StoreError> {
        let (taken,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM case_studies WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(exclude)
        .fetch_one(self.pool.as_ref())
        .await?;
        Ok(taken)
    }

    async fn next_order(&self) -> Result<i32, StoreError> {
        let (next,): (i32,) =
            sqlx::query_as("SELECT COALESCE(MAX(sort_order) + 1, 0) FROM case_studies")
                .fetch_one(self.pool.as_ref())
                .await?;
        Ok(next)
    }

    async fn insert(&self, new: NewCaseStudy) -> Result<CaseStudy, StoreError> {
        sqlx::query_as::<_, CaseStudy>(&format!(
            r#"
            INSERT INTO case_studies
                (title, slug, category, image, year, description, link, sort_order, translations, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now(), now())
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(&new.title)
        .bind(&new.slug)
        .bind(&new.category)
        .bind(&new.image)
        .bind(&new.year)
        .bind(&new.description)
        .bind(&new.link)
        .bind(new.order)
        .bind(Json(&new.translations))
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(|e| map_write_error(e, &new.slug))
    }

    async fn update(&self, record: &CaseStudy) -> Result<CaseStudy, StoreError> {
        let row = sqlx::query_as::<_, CaseStudy>(&format!(
            r#"
            UPDATE case_studies
            SET title = $1, slug = $2, category = $3, image = $4, year = $5, description = $6,
                link = $7, sort_order = $8, translations = $9, updated_at = now()
            WHERE id = $10
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(&record.title)
        .bind(&record.slug)
        .bind(&record.category)
        .bind(&record.image)
        .bind(&record.year)
        .bind(&record.description)
        .bind(&record.link)
        .bind(record.order)
        .bind(Json(&record.translations))
        .bind(record.id)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(|e| map_write_error(e, &record.slug))?;

        row.ok_or(StoreError::Missing(record.id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM case_studies WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
