use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{CaseStudyStore, StoreError};
use crate::db::models::{CaseStudy, NewCaseStudy};

/// In-process store used when no database is configured, and by tests.
/// Contents are lost on restart.
#[derive(Default)]
pub struct MemoryCaseStudyStore {
    rows: RwLock<Vec<CaseStudy>>,
}

impl MemoryCaseStudyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CaseStudyStore for MemoryCaseStudyStore {
    async fn list(&self) -> Result<Vec<CaseStudy>, StoreError> {
        let mut rows = self.rows.read().await.clone();
        rows.sort_by(|a, b| {
            a.order
                .cmp(&b.order)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CaseStudy>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<CaseStudy>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().find(|r| r.slug == slug).cloned())
    }

    async fn slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .any(|r| r.slug == slug && Some(r.id) != exclude))
    }

    async fn next_order(&self) -> Result<i32, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().map(|r| r.order + 1).max().unwrap_or(0))
    }

    async fn insert(&self, new: NewCaseStudy) -> Result<CaseStudy, StoreError> {
        let mut rows = self.rows.write().await;
        if rows.iter().any(|r| r.slug == new.slug) {
            return Err(StoreError::SlugTaken(new.slug));
        }
        let now = Utc::now();
        let row = CaseStudy {
            id: Uuid::new_v4(),
            title: new.title,
            slug: new.slug,
            category: new.category,
            image: new.image,
            year: new.year,
            description: new.description,
            link: new.link,
            order: new.order,
            translations: new.translations,
            created_at: now,
            updated_at: now,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, record: &CaseStudy) -> Result<CaseStudy, StoreError> {
        let mut rows = self.rows.write().await;
        if rows
            .iter()
            .any(|r| r.slug == record.slug && r.id != record.id)
        {
            return Err(StoreError::SlugTaken(record.slug.clone()));
        }
        let slot = rows
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or(StoreError::Missing(record.id))?;
        *slot = CaseStudy {
            created_at: slot.created_at,
            updated_at: Utc::now(),
            ..record.clone()
        };
        Ok(slot.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|r| r.id != id);
        Ok(rows.len() != before)
    }
}
