/**
 * Testimonial Routes
 * Client quotes with their headline metrics
 */
use axum::{extract::Path, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sqlx::types::Json as SqlJson;

use crate::content::{missing_fields, sanitize_html, DeleteOutcome};
use crate::db::{self, models::Testimonial};
use crate::error::ApiError;
use crate::i18n::{localize, translations_after_edit, Localizable, Locale, RequestLocale, Translations};
use crate::routes::{auth::AdminSession, parse_id, require_pool};

const COLUMNS: &str =
    "id, quote, author, role, city, metrics, sort_order, translations, created_at, updated_at";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestimonialInput {
    pub quote: Option<String>,
    pub author: Option<String>,
    pub role: Option<String>,
    pub city: Option<String>,
    pub metrics: Option<Vec<String>>,
    pub order: Option<i32>,
}

impl TestimonialInput {
    fn clean_quote(&self) -> Option<String> {
        self.quote.as_deref().map(sanitize_html)
    }

    fn localized_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        if let Some(quote) = self.clean_quote() {
            fields.insert("quote".into(), json!(quote));
        }
        if let Some(author) = &self.author {
            fields.insert("author".into(), json!(author));
        }
        if let Some(role) = &self.role {
            fields.insert("role".into(), json!(role));
        }
        if let Some(city) = &self.city {
            fields.insert("city".into(), json!(city));
        }
        if let Some(metrics) = &self.metrics {
            fields.insert("metrics".into(), json!(metrics));
        }
        fields
    }

    fn apply_to(&self, row: &mut Testimonial) {
        if let Some(quote) = self.clean_quote() {
            row.quote = quote;
        }
        if let Some(author) = &self.author {
            row.author = author.clone();
        }
        if let Some(role) = &self.role {
            row.role = role.clone();
        }
        if let Some(city) = &self.city {
            row.city = city.clone();
        }
        if let Some(metrics) = &self.metrics {
            row.metrics = metrics.clone();
        }
        if let Some(order) = self.order {
            row.order = order;
        }
    }

    /// Row a create writes. Outside the default locale the base columns stay
    /// empty and the content lives only in that locale's overlay.
    fn draft(&self, locale: Locale) -> Testimonial {
        let now = Utc::now();
        let mut row = Testimonial {
            id: uuid::Uuid::new_v4(),
            quote: String::new(),
            author: String::new(),
            role: String::new(),
            city: String::new(),
            metrics: Vec::new(),
            order: self.order.unwrap_or_default(),
            translations: Translations::new(),
            created_at: now,
            updated_at: now,
        };
        if locale.is_default() {
            self.apply_to(&mut row);
        } else {
            row.translations = Translations::new().with(locale, self.localized_fields());
        }
        row
    }

    /// Default locale writes the base columns; other locales only merge
    /// into their overlay entry.
    fn edit(&self, row: &mut Testimonial, locale: Locale) {
        if locale.is_default() {
            self.apply_to(row);
        }
        row.translations = translations_after_edit(
            &row.translations,
            locale,
            &self.localized_fields(),
            &row.base_fields(),
            Testimonial::LOCALIZED_FIELDS,
        );
    }
}

async fn find(pool: &sqlx::PgPool, id: uuid::Uuid) -> Result<Option<Testimonial>, sqlx::Error> {
    sqlx::query_as::<_, Testimonial>(&format!(
        "SELECT {} FROM testimonials WHERE id = $1",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// GET /api/testimonials?lang=
pub async fn list_testimonials(
    RequestLocale(locale): RequestLocale,
) -> Result<Json<Vec<Testimonial>>, ApiError> {
    let Some(pool) = db::get_pool() else {
        tracing::debug!("no database configured, serving no testimonials");
        return Ok(Json(Vec::new()));
    };

    let rows = sqlx::query_as::<_, Testimonial>(&format!(
        "SELECT {} FROM testimonials ORDER BY sort_order ASC, created_at ASC",
        COLUMNS
    ))
    .fetch_all(pool.as_ref())
    .await?;

    Ok(Json(rows.iter().map(|r| localize(r, locale)).collect()))
}

/// POST /api/testimonials?lang=
pub async fn create_testimonial(
    _session: AdminSession,
    RequestLocale(locale): RequestLocale,
    Json(input): Json<TestimonialInput>,
) -> Result<(StatusCode, Json<Testimonial>), ApiError> {
    let missing = missing_fields(&[("quote", &input.quote), ("author", &input.author)]);
    if !missing.is_empty() {
        return Err(ApiError::Validation(missing));
    }
    let pool = require_pool()?;

    let draft = input.draft(locale);

    let row = sqlx::query_as::<_, Testimonial>(&format!(
        r#"
        INSERT INTO testimonials (quote, author, role, city, metrics, sort_order, translations)
        VALUES ($1, $2, $3, $4, $5,
                COALESCE($6, (SELECT COALESCE(MAX(sort_order) + 1, 0) FROM testimonials)), $7)
        RETURNING {}
        "#,
        COLUMNS
    ))
    .bind(&draft.quote)
    .bind(&draft.author)
    .bind(&draft.role)
    .bind(&draft.city)
    .bind(SqlJson(&draft.metrics))
    .bind(input.order)
    .bind(SqlJson(&draft.translations))
    .fetch_one(pool.as_ref())
    .await?;

    tracing::info!(id = %row.id, locale = %locale, "testimonial created");
    Ok((StatusCode::CREATED, Json(row)))
}

/// PUT /api/testimonials/{id}?lang=
pub async fn update_testimonial(
    _session: AdminSession,
    RequestLocale(locale): RequestLocale,
    Path(id): Path<String>,
    Json(input): Json<TestimonialInput>,
) -> Result<Json<Testimonial>, ApiError> {
    let not_found = || ApiError::NotFound("Testimonial".to_string());
    let id = parse_id(&id).ok_or_else(not_found)?;
    let pool = require_pool()?;
    let mut row = find(&pool, id).await?.ok_or_else(not_found)?;

    input.edit(&mut row, locale);

    let saved = sqlx::query_as::<_, Testimonial>(&format!(
        r#"
        UPDATE testimonials
        SET quote = $1, author = $2, role = $3, city = $4, metrics = $5,
            sort_order = $6, translations = $7, updated_at = now()
        WHERE id = $8
        RETURNING {}
        "#,
        COLUMNS
    ))
    .bind(&row.quote)
    .bind(&row.author)
    .bind(&row.role)
    .bind(&row.city)
    .bind(SqlJson(&row.metrics))
    .bind(row.order)
    .bind(SqlJson(&row.translations))
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await?
    .ok_or_else(not_found)?;

    Ok(Json(saved))
}

/// DELETE /api/testimonials/{id}
pub async fn delete_testimonial(
    _session: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<DeleteOutcome>, ApiError> {
    let Some(id) = parse_id(&id) else {
        return Ok(Json(DeleteOutcome::already_gone()));
    };
    let pool = require_pool()?;

    let result = sqlx::query("DELETE FROM testimonials WHERE id = $1")
        .bind(id)
        .execute(pool.as_ref())
        .await?;

    Ok(Json(DeleteOutcome::removed(id, result.rows_affected() > 0)))
}
