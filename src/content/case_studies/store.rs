//! Storage seam for case studies.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::db::models::{CaseStudy, NewCaseStudy};

#[derive(Debug, Error)]
pub enum StoreError {
    /// The slug's unique index rejected the write.
    #[error("slug `{0}` is already taken")]
    SlugTaken(String),

    /// The row was deleted between read and write.
    #[error("case study {0} no longer exists")]
    Missing(Uuid),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Persistence for case-study rows. Implementations must enforce slug
/// uniqueness on `insert` and `update` and report clashes as
/// [`StoreError::SlugTaken`].
#[async_trait]
pub trait CaseStudyStore: Send + Sync {
    /// All rows ordered by `order`, then creation time.
    async fn list(&self) -> Result<Vec<CaseStudy>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CaseStudy>, StoreError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<CaseStudy>, StoreError>;

    /// Whether `slug` belongs to a row other than `exclude`.
    async fn slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool, StoreError>;

    /// One past the highest `order` in use.
    async fn next_order(&self) -> Result<i32, StoreError>;

    async fn insert(&self, new: NewCaseStudy) -> Result<CaseStudy, StoreError>;

    /// Writes every column of `record` and returns the stored row.
    async fn update(&self, record: &CaseStudy) -> Result<CaseStudy, StoreError>;

    /// Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}
