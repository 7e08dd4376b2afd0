/**
 * Section Routes
 * Singleton page sections (hero, services, footer, ...) stored by key
 */
use axum::{
    extract::{MatchedPath, Path},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sqlx::types::Json as SqlJson;

use crate::db::{self, models::ContentSection};
use crate::error::ApiError;
use crate::i18n::{apply_translations, translations_after_edit, Locale, RequestLocale, Translations};
use crate::routes::{auth::AdminSession, require_pool};

// ============================================================================
// Section keys
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKey {
    Hero,
    Philosophy,
    Services,
    Contact,
    Header,
    Footer,
    Legal,
    Visual,
}

impl SectionKey {
    pub const ALL: &'static [SectionKey] = &[
        SectionKey::Hero,
        SectionKey::Philosophy,
        SectionKey::Services,
        SectionKey::Contact,
        SectionKey::Header,
        SectionKey::Footer,
        SectionKey::Legal,
        SectionKey::Visual,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            SectionKey::Hero => "hero",
            SectionKey::Philosophy => "philosophy",
            SectionKey::Services => "services",
            SectionKey::Contact => "contact",
            SectionKey::Header => "header",
            SectionKey::Footer => "footer",
            SectionKey::Legal => "legal",
            SectionKey::Visual => "visual",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        Self::ALL.iter().copied().find(|key| key.as_str() == value)
    }

    /// Key for a matched route such as `/api/hero`.
    fn from_route(path: &str) -> Option<Self> {
        path.rsplit('/').next().and_then(Self::parse)
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionResponse {
    pub section: SectionKey,
    pub locale: Locale,
    pub dir: String,
    pub data: Value,
    /// True when the built-in content was served instead of a stored row.
    pub fallback: bool,
}

impl SectionResponse {
    fn new(section: SectionKey, locale: Locale, data: Value, fallback: bool) -> Self {
        Self {
            section,
            locale,
            dir: locale.direction().to_string(),
            data,
            fallback,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateSectionRequest {
    pub data: Value,
}

// ============================================================================
// Static/Fallback Data
// ============================================================================

/// Built-in content served when a section has not been saved yet.
pub fn default_content(key: SectionKey) -> Value {
    match key {
        SectionKey::Hero => json!({
            "eyebrow": "Creative growth agency",
            "title": "We build brands people remember",
            "subtitle": "Strategy, design and performance marketing under one roof.",
            "primaryCta": { "label": "Book a call", "href": "#contact" },
            "secondaryCta": { "label": "See our work", "href": "#work" }
        }),
        SectionKey::Philosophy => json!({
            "title": "Our philosophy",
            "body": "<p>Every project starts with listening. We pair research with craft so each decision earns its place.</p>",
            "pillars": ["Clarity over noise", "Measured creativity", "Long-term partnerships"]
        }),
        SectionKey::Services => json!({
            "title": "What we do",
            "items": [
                {
                    "slug": "brand-identity",
                    "title": "Brand Identity",
                    "summary": "Naming, visual systems and guidelines.",
                    "description": "<p>From positioning workshops to complete identity systems.</p>"
                },
                {
                    "slug": "web-design",
                    "title": "Web Design & Development",
                    "summary": "Fast, accessible sites that convert.",
                    "description": "<p>Design systems, headless CMS builds and performance tuning.</p>"
                },
                {
                    "slug": "performance-marketing",
                    "title": "Performance Marketing",
                    "summary": "Paid social, search and analytics.",
                    "description": "<p>Campaigns planned around measurable outcomes.</p>"
                }
            ]
        }),
        SectionKey::Contact => json!({
            "title": "Let's talk",
            "subtitle": "Pick a slot and tell us about your project.",
            "email": "hello@agency.example",
            "phone": "+971 4 000 0000",
            "address": "Dubai Design District, Dubai"
        }),
        SectionKey::Header => json!({
            "logo": "/logo.svg",
            "links": [
                { "label": "Work", "href": "#work" },
                { "label": "Services", "href": "#services" },
                { "label": "Contact", "href": "#contact" }
            ],
            "cta": { "label": "Start a project", "href": "#contact" }
        }),
        SectionKey::Footer => json!({
            "tagline": "Brands with a point of view.",
            "copyright": "All rights reserved.",
            "social": [
                { "label": "Instagram", "href": "https://instagram.com" },
                { "label": "LinkedIn", "href": "https://linkedin.com" }
            ]
        }),
        SectionKey::Legal => json!({
            "privacy": { "title": "Privacy Policy", "body": "<p>We only collect what we need to reply to you.</p>" },
            "terms": { "title": "Terms of Service", "body": "<p>Use of this site is subject to these terms.</p>" }
        }),
        SectionKey::Visual => json!({
            "title": "Selected work",
            "items": [
                {
                    "image": "/uploads/visual/lumina.jpg",
                    "link": "/work/lumina-fashion",
                    "title": "Lumina Fashion",
                    "description": "E-commerce rebrand"
                },
                {
                    "image": "/uploads/visual/atlas.jpg",
                    "link": "/work/atlas-logistics",
                    "title": "Atlas Logistics",
                    "description": "B2B platform"
                },
                {
                    "image": "/uploads/visual/noor.jpg",
                    "link": "/work/noor-cafe",
                    "title": "Noor Café",
                    "description": "Hospitality identity"
                }
            ]
        }),
    }
}

/// Field list for a section overlay: every top-level key of the base
/// content plus any key the overlay adds.
fn overlay_fields<'a>(content: &'a Value, translations: &'a Translations, locale: Locale) -> Vec<&'a str> {
    let mut fields: Vec<&str> = content
        .as_object()
        .map(|o| o.keys().map(String::as_str).collect())
        .unwrap_or_default();
    if let Some(entry) = translations.get(locale) {
        for key in entry.keys() {
            if !fields.contains(&key.as_str()) {
                fields.push(key.as_str());
            }
        }
    }
    fields
}

/// Section content with the locale's overlay applied.
pub fn localize_section(content: &Value, translations: &Translations, locale: Locale) -> Value {
    let Some(base) = content.as_object() else {
        return content.clone();
    };
    let mut record = base.clone();
    record.insert("translations".into(), translations.to_value());

    let fields = overlay_fields(content, translations, locale);
    let mut localized = apply_translations(&Value::Object(record), locale, &fields);
    if let Some(obj) = localized.as_object_mut() {
        obj.remove("translations");
    }
    localized
}

async fn load_section(key: SectionKey) -> Option<ContentSection> {
    let pool = db::get_pool()?;
    match sqlx::query_as::<_, ContentSection>(
        "SELECT key, content, translations, updated_at FROM content_sections WHERE key = $1",
    )
    .bind(key.as_str())
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(row) => {
            if row.is_none() {
                tracing::debug!(section = key.as_str(), "section not saved yet, using defaults");
            }
            row
        }
        Err(e) => {
            tracing::error!(section = key.as_str(), error = %e, "failed to load section, using defaults");
            None
        }
    }
}

async fn section_view(key: SectionKey, locale: Locale) -> SectionResponse {
    match load_section(key).await {
        Some(row) => SectionResponse::new(
            key,
            locale,
            localize_section(&row.content, &row.translations, locale),
            false,
        ),
        None => SectionResponse::new(key, locale, default_content(key), true),
    }
}

// ============================================================================
// Handlers
// ============================================================================

fn section_for(path: &MatchedPath) -> Result<SectionKey, ApiError> {
    SectionKey::from_route(path.as_str())
        .ok_or_else(|| ApiError::NotFound(format!("Section `{}`", path.as_str())))
}

/// GET /api/{section}?lang=
pub async fn get_section(
    path: MatchedPath,
    RequestLocale(locale): RequestLocale,
) -> Result<Json<SectionResponse>, ApiError> {
    let key = section_for(&path)?;
    Ok(Json(section_view(key, locale).await))
}

/// PUT /api/{section}?lang=
///
/// Default locale replaces the base content; other locales merge into
/// their overlay entry.
pub async fn update_section(
    session: AdminSession,
    path: MatchedPath,
    RequestLocale(locale): RequestLocale,
    Json(payload): Json<UpdateSectionRequest>,
) -> Result<Json<SectionResponse>, ApiError> {
    let key = section_for(&path)?;
    let Value::Object(data) = payload.data else {
        return Err(ApiError::BadRequest("`data` must be a JSON object".to_string()));
    };
    let pool = require_pool()?;

    let existing = sqlx::query_as::<_, ContentSection>(
        "SELECT key, content, translations, updated_at FROM content_sections WHERE key = $1",
    )
    .bind(key.as_str())
    .fetch_optional(pool.as_ref())
    .await?;

    let (mut content, translations) = match existing {
        Some(row) => (row.content, row.translations),
        None => (default_content(key), Translations::new()),
    };

    if locale.is_default() {
        content = Value::Object(data.clone());
    }
    let base: Map<String, Value> = content.as_object().cloned().unwrap_or_default();
    let mut fields: Vec<&str> = base.keys().map(String::as_str).collect();
    for k in data.keys() {
        if !fields.contains(&k.as_str()) {
            fields.push(k.as_str());
        }
    }
    let translations = translations_after_edit(&translations, locale, &data, &base, &fields);

    let saved = sqlx::query_as::<_, ContentSection>(
        r#"
        INSERT INTO content_sections (key, content, translations, updated_at)
        VALUES ($1, $2, $3, now())
        ON CONFLICT (key) DO UPDATE SET
            content = EXCLUDED.content,
            translations = EXCLUDED.translations,
            updated_at = now()
        RETURNING key, content, translations, updated_at
        "#,
    )
    .bind(key.as_str())
    .bind(&content)
    .bind(SqlJson(&translations))
    .fetch_one(pool.as_ref())
    .await?;

    tracing::info!(
        section = key.as_str(),
        locale = %locale,
        by = %session.claims.email,
        "section updated"
    );

    Ok(Json(SectionResponse::new(
        key,
        locale,
        localize_section(&saved.content, &saved.translations, locale),
        false,
    )))
}

/// GET /api/services/{slug}?lang=
pub async fn get_service(
    RequestLocale(locale): RequestLocale,
    Path(slug): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let view = section_view(SectionKey::Services, locale).await;
    view.data
        .get("items")
        .and_then(Value::as_array)
        .and_then(|items| {
            items
                .iter()
                .find(|item| item.get("slug").and_then(Value::as_str) == Some(slug.as_str()))
        })
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Service `{}`", slug)))
}

/// Every section route, one GET/PUT pair per key plus the service lookup.
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    SectionKey::ALL
        .iter()
        .fold(Router::new(), |router, key| {
            router.route(
                &format!("/api/{}", key.as_str()),
                get(get_section).put(update_section),
            )
        })
        .route("/api/services/{slug}", get(get_service))
}
