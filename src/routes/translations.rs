/**
 * Translation Routes
 * Dashboard view and editing of a record's per-locale overlay
 */
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sqlx::types::Json as SqlJson;

use crate::content::{sanitize_html, CaseStudyService};
use crate::db::models::{ContactBooking, Stat, Testimonial};
use crate::error::ApiError;
use crate::i18n::{upsert_translations, Localizable, Locale, Translations};
use crate::routes::sections::{default_content, SectionKey};
use crate::routes::{auth::AdminSession, parse_id, require_pool};

/// Record kinds that carry a `translations` overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resource {
    #[serde(alias = "caseStudies")]
    CaseStudies,
    Testimonials,
    Stats,
    #[serde(alias = "contactBookings")]
    ContactBookings,
    Sections,
}

impl Resource {
    /// Table for resources edited through plain SQL.
    fn table(self) -> &'static str {
        match self {
            Resource::CaseStudies => "case_studies",
            Resource::Testimonials => "testimonials",
            Resource::Stats => "stats",
            Resource::ContactBookings => "contact_bookings",
            Resource::Sections => "content_sections",
        }
    }

    fn fields(self) -> &'static [&'static str] {
        match self {
            Resource::Testimonials => Testimonial::LOCALIZED_FIELDS,
            Resource::Stats => Stat::LOCALIZED_FIELDS,
            Resource::ContactBookings => ContactBooking::LOCALIZED_FIELDS,
            Resource::CaseStudies | Resource::Sections => &[],
        }
    }

    /// HTML fields cleaned before storage.
    fn html_fields(self) -> &'static [&'static str] {
        match self {
            Resource::CaseStudies => &["description"],
            Resource::Testimonials => &["quote"],
            _ => &[],
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TranslationsQuery {
    pub resource: Resource,
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTranslationRequest {
    pub resource: Resource,
    pub id: String,
    pub locale: String,
    pub data: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranslationsResponse {
    pub resource: Resource,
    pub id: String,
    pub translations: Translations,
}

fn not_found(resource: Resource, id: &str) -> ApiError {
    ApiError::NotFound(format!("{} `{}`", resource.table(), id.trim()))
}

async fn load_row_translations(resource: Resource, id: &str) -> Result<Translations, ApiError> {
    let pool = require_pool()?;
    let row: Option<(SqlJson<Translations>,)> = match resource {
        Resource::Sections => {
            let key = SectionKey::parse(id).ok_or_else(|| not_found(resource, id))?;
            sqlx::query_as("SELECT translations FROM content_sections WHERE key = $1")
                .bind(key.as_str())
                .fetch_optional(pool.as_ref())
                .await?
        }
        _ => {
            let uuid = parse_id(id).ok_or_else(|| not_found(resource, id))?;
            sqlx::query_as(&format!(
                "SELECT translations FROM {} WHERE id = $1",
                resource.table()
            ))
            .bind(uuid)
            .fetch_optional(pool.as_ref())
            .await?
        }
    };

    match (row, resource) {
        (Some((SqlJson(translations),)), _) => Ok(translations),
        // Unsaved sections have an empty overlay
        (None, Resource::Sections) => Ok(Translations::new()),
        (None, _) => Err(not_found(resource, id)),
    }
}

/// Cleans HTML fields in an overlay entry.
fn clean_entry(resource: Resource, data: &Map<String, Value>) -> Map<String, Value> {
    let mut data = data.clone();
    for field in resource.html_fields() {
        if let Some(Value::String(html)) = data.get(*field) {
            let cleaned = sanitize_html(html);
            data.insert((*field).to_string(), json!(cleaned));
        }
    }
    data
}

/// GET /api/translations?resource=&id=
pub async fn get_translations(
    _session: AdminSession,
    State(case_studies): State<CaseStudyService>,
    Query(query): Query<TranslationsQuery>,
) -> Result<Json<TranslationsResponse>, ApiError> {
    let translations = match query.resource {
        Resource::CaseStudies => case_studies.translations(&query.id).await?,
        other => load_row_translations(other, &query.id).await?,
    };

    Ok(Json(TranslationsResponse {
        resource: query.resource,
        id: query.id,
        translations,
    }))
}

/// PUT /api/translations
///
/// Replaces one non-default locale's overlay entry. Default-locale content
/// is edited through the resource's own route.
pub async fn update_translation(
    session: AdminSession,
    State(case_studies): State<CaseStudyService>,
    Json(payload): Json<UpdateTranslationRequest>,
) -> Result<Json<TranslationsResponse>, ApiError> {
    let locale = Locale::parse(&payload.locale)
        .ok_or_else(|| ApiError::BadRequest(format!("Unsupported locale `{}`", payload.locale)))?;
    if locale.is_default() {
        return Err(ApiError::BadRequest(
            "Default-locale content is edited on the record itself".to_string(),
        ));
    }
    let Value::Object(data) = &payload.data else {
        return Err(ApiError::BadRequest("`data` must be a JSON object".to_string()));
    };
    let resource = payload.resource;
    let data = clean_entry(resource, data);

    let translations = match resource {
        Resource::CaseStudies => {
            case_studies
                .set_translation(&payload.id, locale, &data)
                .await?
                .translations
        }
        Resource::Sections => {
            let key = SectionKey::parse(&payload.id).ok_or_else(|| not_found(resource, &payload.id))?;
            let existing = load_row_translations(resource, &payload.id).await?;
            let fields: Vec<&str> = data.keys().map(String::as_str).collect();
            let updated = upsert_translations(&existing, locale, &data, &fields);

            let pool = require_pool()?;
            sqlx::query(
                r#"
                INSERT INTO content_sections (key, content, translations, updated_at)
                VALUES ($1, $2, $3, now())
                ON CONFLICT (key) DO UPDATE SET
                    translations = EXCLUDED.translations,
                    updated_at = now()
                "#,
            )
            .bind(key.as_str())
            .bind(default_content(key))
            .bind(SqlJson(&updated))
            .execute(pool.as_ref())
            .await?;
            updated
        }
        _ => {
            let existing = load_row_translations(resource, &payload.id).await?;
            let updated = upsert_translations(&existing, locale, &data, resource.fields());
            let uuid = parse_id(&payload.id).ok_or_else(|| not_found(resource, &payload.id))?;

            let pool = require_pool()?;
            let result = sqlx::query(&format!(
                "UPDATE {} SET translations = $1, updated_at = now() WHERE id = $2",
                resource.table()
            ))
            .bind(SqlJson(&updated))
            .bind(uuid)
            .execute(pool.as_ref())
            .await?;
            if result.rows_affected() == 0 {
                return Err(not_found(resource, &payload.id));
            }
            updated
        }
    };

    tracing::info!(
        resource = resource.table(),
        id = %payload.id,
        locale = %locale,
        by = %session.claims.email,
        "translation saved"
    );

    Ok(Json(TranslationsResponse {
        resource,
        id: payload.id,
        translations,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::CaseStudyInput;
    use crate::routes::test_support::send;
    use axum::{
        http::{Method, StatusCode},
        routing::get,
        Router,
    };

    fn app(service: CaseStudyService) -> Router {
        Router::new()
            .route(
                "/api/translations",
                get(get_translations).put(update_translation),
            )
            .with_state(service)
    }

    async fn seeded() -> (CaseStudyService, String) {
        let service = CaseStudyService::in_memory();
        let created = service
            .create(
                CaseStudyInput {
                    title: Some("Lumina Fashion".into()),
                    category: Some("E-Commerce".into()),
                    image: Some("/uploads/lumina.jpg".into()),
                    year: Some("2024".into()),
                    description: Some("<p>Rebrand</p>".into()),
                    ..Default::default()
                },
                Locale::En,
            )
            .await
            .unwrap();
        (service, created.id.to_string())
    }

    #[test]
    fn test_resource_names() {
        let r: Resource = serde_json::from_value(json!("case-studies")).unwrap();
        assert_eq!(r, Resource::CaseStudies);
        let r: Resource = serde_json::from_value(json!("contactBookings")).unwrap();
        assert_eq!(r, Resource::ContactBookings);
        assert!(serde_json::from_value::<Resource>(json!("users")).is_err());
    }

    #[test]
    fn test_clean_entry_sanitizes_html_fields() {
        let data = json!({ "quote": "<i>ok</i><script>x</script>", "author": "<b>kept</b>" });
        let cleaned = clean_entry(Resource::Testimonials, data.as_object().unwrap());
        assert_eq!(cleaned["quote"], "<i>ok</i>");
        assert_eq!(cleaned["author"], "<b>kept</b>");
    }

    #[tokio::test]
    async fn test_case_study_translation_round_trip() {
        let (service, id) = seeded().await;

        let (status, body) = send(
            app(service.clone()),
            Method::PUT,
            "/api/translations",
            Some(json!({
                "resource": "case-studies",
                "id": id,
                "locale": "ar",
                "data": { "title": "لومينا للأزياء", "slug": "ignored" }
            })),
            true,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["translations"]["ar"]["title"], "لومينا للأزياء");
        assert!(body["translations"]["ar"].get("slug").is_none());

        let (status, body) = send(
            app(service),
            Method::GET,
            &format!("/api/translations?resource=case-studies&id={}", id),
            None,
            true,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["translations"]["ar"]["title"], "لومينا للأزياء");
    }

    #[tokio::test]
    async fn test_default_locale_is_rejected() {
        let (service, id) = seeded().await;
        let (status, _) = send(
            app(service),
            Method::PUT,
            "/api/translations",
            Some(json!({ "resource": "case-studies", "id": id, "locale": "en", "data": {} })),
            true,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_requires_auth() {
        let (service, id) = seeded().await;
        let (status, _) = send(
            app(service),
            Method::GET,
            &format!("/api/translations?resource=case-studies&id={}", id),
            None,
            false,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_case_study_is_404() {
        let (status, _) = send(
            app(CaseStudyService::in_memory()),
            Method::GET,
            "/api/translations?resource=case-studies&id=missing",
            None,
            true,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
