//! Case-study content service.
//!
//! Base columns hold the default locale. Other locales live in the
//! `translations` overlay, and the slug is the cross-locale identity: it is
//! derived once from the default-locale title (or an explicit `slug`) and
//! never regenerated from a translated title.

mod memory;
mod pg;
mod store;

pub use memory::MemoryCaseStudyStore;
pub use pg::PgCaseStudyStore;
pub use store::{CaseStudyStore, StoreError};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use super::{
    is_placeholder_identifier, missing_fields, non_empty, sanitize_html, slug, string_or_number,
    ContentError,
};
use crate::db::models::{CaseStudy, NewCaseStudy};
use crate::i18n::{
    localize, translations_after_edit, upsert_translations, Localizable, Locale, Translations,
};

/// Attempts at inserting a row before giving up on concurrent slug clashes.
const MAX_SLUG_ATTEMPTS: usize = 5;

/// Create/update payload. Every field is optional so the same shape serves
/// partial updates; `create` enforces the required subset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseStudyInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub year: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub order: Option<i32>,
}

impl CaseStudyInput {
    pub fn missing_required(&self) -> Vec<String> {
        missing_fields(&[
            ("title", &self.title),
            ("category", &self.category),
            ("image", &self.image),
            ("year", &self.year),
            ("description", &self.description),
        ])
    }

    fn explicit_slug(&self) -> Option<&str> {
        non_empty(&self.slug)
    }

    fn clean_description(&self) -> Option<String> {
        self.description.as_deref().map(sanitize_html)
    }

    /// Provided localizable fields, HTML sanitized.
    pub fn localized_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        let mut put = |name: &str, value: Option<String>| {
            if let Some(v) = value {
                fields.insert(name.to_string(), json!(v));
            }
        };
        put("title", self.title.clone());
        put("category", self.category.clone());
        put("image", self.image.clone());
        put("year", self.year.clone());
        put("description", self.clean_description());
        put("link", self.link.clone());
        fields
    }

    /// Overwrites the base columns this input provides.
    fn apply_to(&self, record: &mut CaseStudy) {
        if let Some(title) = &self.title {
            record.title = title.clone();
        }
        if let Some(category) = &self.category {
            record.category = category.clone();
        }
        if let Some(image) = &self.image {
            record.image = image.clone();
        }
        if let Some(year) = &self.year {
            record.year = year.clone();
        }
        if let Some(description) = self.clean_description() {
            record.description = description;
        }
        if let Some(link) = &self.link {
            record.link = Some(link.clone()).filter(|l| !l.trim().is_empty());
        }
        if let Some(order) = self.order {
            record.order = order;
        }
    }
}

/// Result of a delete. `deleted` is false when nothing matched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub success: bool,
    pub deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
}

impl DeleteOutcome {
    pub fn already_gone() -> Self {
        Self {
            success: true,
            deleted: false,
            id: None,
        }
    }

    pub fn removed(id: Uuid, deleted: bool) -> Self {
        Self {
            success: true,
            deleted,
            id: Some(id),
        }
    }
}

#[derive(Clone)]
pub struct CaseStudyService {
    store: Arc<dyn CaseStudyStore>,
}

impl CaseStudyService {
    pub fn new(store: Arc<dyn CaseStudyStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCaseStudyStore::new()))
    }

    /// All case studies in display order, localized.
    pub async fn get_all(&self, locale: Locale) -> Result<Vec<CaseStudy>, ContentError> {
        let rows = self.store.list().await.map_err(store_error)?;
        Ok(rows.iter().map(|row| localize(row, locale)).collect())
    }

    pub async fn get_by_id(&self, id: Uuid, locale: Locale) -> Result<Option<CaseStudy>, ContentError> {
        let row = self.store.find_by_id(id).await.map_err(store_error)?;
        Ok(row.map(|r| localize(&r, locale)))
    }

    pub async fn get_by_slug_or_id(
        &self,
        identifier: &str,
        locale: Locale,
    ) -> Result<Option<CaseStudy>, ContentError> {
        let row = self.resolve(identifier).await?;
        Ok(row.map(|r| localize(&r, locale)))
    }

    /// Raw row (no overlay) for an id or slug.
    pub async fn resolve(&self, identifier: &str) -> Result<Option<CaseStudy>, ContentError> {
        if is_placeholder_identifier(identifier) {
            return Ok(None);
        }
        let identifier = identifier.trim();

        if let Ok(id) = Uuid::parse_str(identifier) {
            if let Some(row) = self.store.find_by_id(id).await.map_err(store_error)? {
                return Ok(Some(row));
            }
        }
        self.store.find_by_slug(identifier).await.map_err(store_error)
    }

    pub async fn create(&self, input: CaseStudyInput, locale: Locale) -> Result<CaseStudy, ContentError> {
        let missing = input.missing_required();
        if !missing.is_empty() {
            return Err(ContentError::Validation(missing));
        }

        let derived = match input.explicit_slug() {
            Some(explicit) => slug::slugify(explicit),
            None => slug::slugify(input.title.as_deref().unwrap_or_default()),
        };
        // A fallback slug names no record, so it never joins locales.
        let identifies_record = !derived.is_empty();
        let base_slug = if identifies_record {
            derived
        } else {
            slug::FALLBACK_SLUG.to_string()
        };

        if !locale.is_default() && identifies_record {
            // The slug is the cross-locale join key: a translated create for an
            // existing record becomes a translation on it.
            if let Some(existing) = self.store.find_by_slug(&base_slug).await.map_err(store_error)? {
                let mut record = existing;
                record.translations = upsert_translations(
                    &record.translations,
                    locale,
                    &input.localized_fields(),
                    CaseStudy::LOCALIZED_FIELDS,
                );
                let saved = self.store.update(&record).await.map_err(store_error)?;
                tracing::info!(
                    slug = %saved.slug,
                    locale = %locale,
                    "attached translation to existing case study"
                );
                return Ok(saved);
            }
        }

        let order = match input.order {
            Some(order) => order,
            None => self.store.next_order().await.map_err(store_error)?,
        };

        let new = if locale.is_default() {
            NewCaseStudy {
                title: input.title.clone().unwrap_or_default(),
                slug: base_slug.clone(),
                category: input.category.clone().unwrap_or_default(),
                image: input.image.clone().unwrap_or_default(),
                year: input.year.clone().unwrap_or_default(),
                description: input.clean_description().unwrap_or_default(),
                link: input.link.clone().filter(|l| !l.trim().is_empty()),
                order,
                translations: Translations::new(),
            }
        } else {
            // No default-locale row yet: leave the base columns empty so the
            // default view does not show foreign-language copy as its own.
            NewCaseStudy {
                slug: base_slug.clone(),
                order,
                translations: Translations::new().with(locale, input.localized_fields()),
                ..NewCaseStudy::default()
            }
        };

        let saved = self.insert_with_unique_slug(&base_slug, new).await?;
        tracing::info!(id = %saved.id, slug = %saved.slug, locale = %locale, "case study created");
        Ok(saved)
    }

    pub async fn update(
        &self,
        identifier: &str,
        input: CaseStudyInput,
        locale: Locale,
    ) -> Result<CaseStudy, ContentError> {
        let mut record = self
            .resolve(identifier)
            .await?
            .ok_or_else(|| ContentError::NotFound(format!("Case study `{}`", identifier.trim())))?;

        let wanted_slug = match input.explicit_slug() {
            Some(explicit) => Some(slug::slug_or_fallback(explicit)),
            None if locale.is_default() && record.slug.trim().is_empty() => Some(
                slug::slug_or_fallback(input.title.as_deref().unwrap_or(&record.title)),
            ),
            None => None,
        };

        if locale.is_default() {
            input.apply_to(&mut record);
        }
        record.translations = translations_after_edit(
            &record.translations,
            locale,
            &input.localized_fields(),
            &record.base_fields(),
            CaseStudy::LOCALIZED_FIELDS,
        );

        let saved = match wanted_slug {
            Some(base) if base != record.slug => self.update_with_unique_slug(&base, record).await?,
            _ => self.store.update(&record).await.map_err(store_error)?,
        };
        tracing::info!(id = %saved.id, slug = %saved.slug, locale = %locale, "case study updated");
        Ok(saved)
    }

    /// Idempotent: an unknown identifier, or a row that disappears before
    /// the delete runs, still reports success.
    pub async fn delete(&self, identifier: &str) -> Result<DeleteOutcome, ContentError> {
        let Some(record) = self.resolve(identifier).await? else {
            tracing::debug!(identifier = %identifier, "delete of unknown case study treated as done");
            return Ok(DeleteOutcome::already_gone());
        };

        match self.store.delete(record.id).await {
            Ok(deleted) => {
                tracing::info!(id = %record.id, slug = %record.slug, deleted, "case study deleted");
                Ok(DeleteOutcome::removed(record.id, deleted))
            }
            Err(StoreError::Missing(_)) => Ok(DeleteOutcome::already_gone()),
            Err(e) => Err(store_error(e)),
        }
    }

    /// Raw translations map for an id or slug.
    pub async fn translations(&self, identifier: &str) -> Result<Translations, ContentError> {
        self.resolve(identifier)
            .await?
            .map(|r| r.translations)
            .ok_or_else(|| ContentError::NotFound(format!("Case study `{}`", identifier.trim())))
    }

    /// Replaces one locale's overlay entry.
    pub async fn set_translation(
        &self,
        identifier: &str,
        locale: Locale,
        data: &Map<String, Value>,
    ) -> Result<CaseStudy, ContentError> {
        let mut record = self
            .resolve(identifier)
            .await?
            .ok_or_else(|| ContentError::NotFound(format!("Case study `{}`", identifier.trim())))?;
        let mut data = data.clone();
        if let Some(Value::String(html)) = data.get("description") {
            let cleaned = sanitize_html(html);
            data.insert("description".into(), json!(cleaned));
        }
        record.translations = upsert_translations(
            &record.translations,
            locale,
            &data,
            CaseStudy::LOCALIZED_FIELDS,
        );
        self.store.update(&record).await.map_err(store_error)
    }

    /// First free slug derived from `base`, ignoring the row `exclude`.
    async fn unique_slug(&self, base: &str, exclude: Option<Uuid>, from: u32) -> Result<(String, u32), ContentError> {
        let mut attempt = from;
        loop {
            let candidate = slug::candidate(base, attempt);
            if !self.store.slug_taken(&candidate, exclude).await.map_err(store_error)? {
                return Ok((candidate, attempt));
            }
            attempt += 1;
        }
    }

    async fn insert_with_unique_slug(&self, base: &str, mut new: NewCaseStudy) -> Result<CaseStudy, ContentError> {
        let mut from = 0;
        for _ in 0..MAX_SLUG_ATTEMPTS {
            let (candidate, attempt) = self.unique_slug(base, None, from).await?;
            new.slug = candidate;
            match self.store.insert(new.clone()).await {
                Ok(row) => return Ok(row),
                Err(StoreError::SlugTaken(taken)) => {
                    tracing::warn!(slug = %taken, "slug claimed by a concurrent write, retrying");
                    from = attempt + 1;
                }
                Err(e) => return Err(store_error(e)),
            }
        }
        Err(ContentError::SlugExhausted(base.to_string()))
    }

    async fn update_with_unique_slug(&self, base: &str, mut record: CaseStudy) -> Result<CaseStudy, ContentError> {
        let mut from = 0;
        for _ in 0..MAX_SLUG_ATTEMPTS {
            let (candidate, attempt) = self.unique_slug(base, Some(record.id), from).await?;
            record.slug = candidate;
            match self.store.update(&record).await {
                Ok(row) => return Ok(row),
                Err(StoreError::SlugTaken(taken)) => {
                    tracing::warn!(slug = %taken, "slug claimed by a concurrent write, retrying");
                    from = attempt + 1;
                }
                Err(e) => return Err(store_error(e)),
            }
        }
        Err(ContentError::SlugExhausted(base.to_string()))
    }
}

fn store_error(err: StoreError) -> ContentError {
    match err {
        StoreError::Database(e) => ContentError::Database(e),
        StoreError::Missing(id) => ContentError::NotFound(format!("Case study {}", id)),
        StoreError::SlugTaken(slug) => ContentError::SlugExhausted(slug),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lumina() -> CaseStudyInput {
        CaseStudyInput {
            title: Some("Lumina Fashion".into()),
            category: Some("E-Commerce".into()),
            image: Some("/uploads/lumina.jpg".into()),
            year: Some("2024".into()),
            description: Some("<p>Rebrand and storefront.</p>".into()),
            ..Default::default()
        }
    }

    fn arabic_lumina() -> CaseStudyInput {
        CaseStudyInput {
            title: Some("لومينا للأزياء".into()),
            slug: Some("lumina-fashion".into()),
            category: Some("تجارة إلكترونية".into()),
            image: Some("/uploads/lumina.jpg".into()),
            year: Some("2024".into()),
            description: Some("<p>إعادة تصميم</p>".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_in_default_locale_derives_slug() {
        let service = CaseStudyService::in_memory();
        let created = service.create(lumina(), Locale::En).await.unwrap();
        assert_eq!(created.slug, "lumina-fashion");
        assert_eq!(created.title, "Lumina Fashion");
        assert!(created.translations.is_empty());
    }

    #[tokio::test]
    async fn create_reports_every_missing_field() {
        let service = CaseStudyService::in_memory();
        let input = CaseStudyInput {
            title: Some("Only a title".into()),
            image: Some("   ".into()),
            ..Default::default()
        };
        match service.create(input, Locale::En).await {
            Err(ContentError::Validation(fields)) => {
                assert_eq!(fields, vec!["category", "image", "year", "description"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn duplicate_titles_get_suffixed_slugs() {
        let service = CaseStudyService::in_memory();
        let first = service.create(lumina(), Locale::En).await.unwrap();
        let second = service.create(lumina(), Locale::En).await.unwrap();
        let third = service.create(lumina(), Locale::En).await.unwrap();
        assert_eq!(first.slug, "lumina-fashion");
        assert_eq!(second.slug, "lumina-fashion-1");
        assert_eq!(third.slug, "lumina-fashion-2");
        assert_eq!(service.get_all(Locale::En).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn translated_create_attaches_to_existing_slug() {
        let service = CaseStudyService::in_memory();
        service.create(lumina(), Locale::En).await.unwrap();
        let saved = service.create(arabic_lumina(), Locale::Ar).await.unwrap();

        let all = service.get_all(Locale::En).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(saved.title, "Lumina Fashion");
        assert_eq!(
            saved.translations.field(Locale::Ar, "title"),
            Some(&json!("لومينا للأزياء"))
        );

        let ar = service
            .get_by_slug_or_id("lumina-fashion", Locale::Ar)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ar.title, "لومينا للأزياء");
        assert_eq!(ar.slug, "lumina-fashion");
    }

    #[tokio::test]
    async fn translated_create_without_base_row_keeps_base_empty() {
        let service = CaseStudyService::in_memory();
        let saved = service.create(arabic_lumina(), Locale::Ar).await.unwrap();
        assert_eq!(saved.slug, "lumina-fashion");
        assert_eq!(saved.title, "");
        assert_eq!(saved.description, "");
        assert_eq!(
            saved.translations.field(Locale::Ar, "category"),
            Some(&json!("تجارة إلكترونية"))
        );
    }

    fn arabic_only(title: &str) -> CaseStudyInput {
        CaseStudyInput {
            title: Some(title.into()),
            category: Some("هوية بصرية".into()),
            image: Some("/uploads/x.jpg".into()),
            year: Some("2025".into()),
            description: Some("<p>وصف</p>".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn arabic_only_creates_stay_separate_records() {
        let service = CaseStudyService::in_memory();
        let first = service.create(arabic_only("مشروع أ"), Locale::Ar).await.unwrap();
        let second = service.create(arabic_only("مشروع ب"), Locale::Ar).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.slug, "case-study");
        assert_eq!(second.slug, "case-study-1");

        let titles: Vec<String> = service
            .get_all(Locale::Ar)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles.len(), 2);
        assert!(titles.contains(&"مشروع أ".to_string()));
        assert!(titles.contains(&"مشروع ب".to_string()));
    }

    #[tokio::test]
    async fn arabic_only_create_never_joins_a_case_study_titled_row() {
        let service = CaseStudyService::in_memory();
        let english = CaseStudyInput {
            title: Some("Case Study".into()),
            ..lumina()
        };
        let existing = service.create(english, Locale::En).await.unwrap();
        assert_eq!(existing.slug, "case-study");

        let created = service.create(arabic_only("مشروع أ"), Locale::Ar).await.unwrap();
        assert_ne!(created.id, existing.id);
        assert_eq!(created.slug, "case-study-1");

        let untouched = service.resolve("case-study").await.unwrap().unwrap();
        assert!(untouched.translations.get(Locale::Ar).is_none());
        assert_eq!(service.get_all(Locale::En).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn mistyped_translation_value_keeps_other_overrides() {
        let service = CaseStudyService::in_memory();
        service.create(lumina(), Locale::En).await.unwrap();
        let data = json!({ "title": "لومينا", "year": 2025 });
        service
            .set_translation("lumina-fashion", Locale::Ar, data.as_object().unwrap())
            .await
            .unwrap();

        let ar = service
            .get_by_slug_or_id("lumina-fashion", Locale::Ar)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ar.title, "لومينا");
        assert_eq!(ar.year, "2025");
    }

    #[tokio::test]
    async fn default_locale_title_edit_keeps_slug() {
        let service = CaseStudyService::in_memory();
        service.create(lumina(), Locale::En).await.unwrap();
        let input = CaseStudyInput {
            title: Some("Lumina Fashion Reboot".into()),
            ..Default::default()
        };
        let updated = service.update("lumina-fashion", input, Locale::En).await.unwrap();
        assert_eq!(updated.slug, "lumina-fashion");
        assert_eq!(updated.title, "Lumina Fashion Reboot");
        assert_eq!(
            updated.translations.field(Locale::En, "title"),
            Some(&json!("Lumina Fashion Reboot"))
        );
    }

    #[tokio::test]
    async fn translated_edit_never_touches_slug_or_base() {
        let service = CaseStudyService::in_memory();
        let created = service.create(lumina(), Locale::En).await.unwrap();
        let input = CaseStudyInput {
            title: Some("عنوان جديد".into()),
            order: Some(42),
            ..Default::default()
        };
        let updated = service
            .update(&created.id.to_string(), input, Locale::Ar)
            .await
            .unwrap();
        assert_eq!(updated.slug, created.slug);
        assert_eq!(updated.title, created.title);
        assert_eq!(updated.order, created.order);
        assert_eq!(updated.description, created.description);
        assert_eq!(
            updated.translations.field(Locale::Ar, "title"),
            Some(&json!("عنوان جديد"))
        );
    }

    #[tokio::test]
    async fn explicit_slug_is_regenerated_and_kept_unique() {
        let service = CaseStudyService::in_memory();
        service.create(lumina(), Locale::En).await.unwrap();
        let other = CaseStudyInput {
            title: Some("Nova Bank".into()),
            ..lumina()
        };
        service.create(other, Locale::En).await.unwrap();

        let input = CaseStudyInput {
            slug: Some("Lumina Fashion".into()),
            ..Default::default()
        };
        let updated = service.update("nova-bank", input, Locale::En).await.unwrap();
        assert_eq!(updated.slug, "lumina-fashion-1");
    }

    #[tokio::test]
    async fn update_unknown_is_not_found() {
        let service = CaseStudyService::in_memory();
        let err = service
            .update("nope", CaseStudyInput::default(), Locale::En)
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::NotFound(_)));
    }

    #[tokio::test]
    async fn placeholder_identifiers_resolve_to_nothing() {
        let service = CaseStudyService::in_memory();
        service.create(lumina(), Locale::En).await.unwrap();
        for identifier in ["", "undefined", "null"] {
            assert!(service.get_by_slug_or_id(identifier, Locale::En).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let service = CaseStudyService::in_memory();
        let created = service.create(lumina(), Locale::En).await.unwrap();

        let first = service.delete("lumina-fashion").await.unwrap();
        assert!(first.success && first.deleted);
        assert_eq!(first.id, Some(created.id));

        let second = service.delete("lumina-fashion").await.unwrap();
        assert!(second.success);
        assert!(!second.deleted);

        let unknown = service.delete(&Uuid::new_v4().to_string()).await.unwrap();
        assert!(unknown.success && !unknown.deleted);
    }

    #[tokio::test]
    async fn list_is_ordered_and_localized() {
        let service = CaseStudyService::in_memory();
        let late = CaseStudyInput {
            title: Some("Late".into()),
            order: Some(5),
            ..lumina()
        };
        let early = CaseStudyInput {
            title: Some("Early".into()),
            order: Some(1),
            ..lumina()
        };
        service.create(late, Locale::En).await.unwrap();
        service.create(early, Locale::En).await.unwrap();
        let all = service.get_all(Locale::Ar).await.unwrap();
        let titles: Vec<_> = all.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Early", "Late"]);
    }

    #[tokio::test]
    async fn description_html_is_sanitized() {
        let service = CaseStudyService::in_memory();
        let input = CaseStudyInput {
            description: Some("<p>ok</p><script>x()</script>".into()),
            ..lumina()
        };
        let created = service.create(input, Locale::En).await.unwrap();
        assert_eq!(created.description, "<p>ok</p>");
    }

    #[tokio::test]
    async fn set_translation_replaces_only_that_locale() {
        let service = CaseStudyService::in_memory();
        service.create(lumina(), Locale::En).await.unwrap();
        service.create(arabic_lumina(), Locale::Ar).await.unwrap();

        let mut data = Map::new();
        data.insert("title".into(), json!("لومينا"));
        let saved = service
            .set_translation("lumina-fashion", Locale::Ar, &data)
            .await
            .unwrap();
        let ar = saved.translations.get(Locale::Ar).unwrap();
        assert_eq!(ar.len(), 1);
        assert_eq!(saved.title, "Lumina Fashion");
    }
}
