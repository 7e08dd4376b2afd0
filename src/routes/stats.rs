/**
 * Stat Routes
 * Headline numbers shown on the landing page
 */
use axum::{extract::Path, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sqlx::types::Json as SqlJson;

use crate::content::{missing_fields, string_or_number, DeleteOutcome};
use crate::db::{self, models::Stat};
use crate::error::ApiError;
use crate::i18n::{localize, translations_after_edit, Localizable, Locale, RequestLocale, Translations};
use crate::routes::{auth::AdminSession, parse_id, require_pool};

const COLUMNS: &str = "id, label, value, sort_order, translations, created_at, updated_at";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatInput {
    pub label: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub value: Option<String>,
    pub order: Option<i32>,
}

impl StatInput {
    fn localized_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        if let Some(label) = &self.label {
            fields.insert("label".into(), json!(label));
        }
        if let Some(value) = &self.value {
            fields.insert("value".into(), json!(value));
        }
        fields
    }

    fn apply_to(&self, row: &mut Stat) {
        if let Some(label) = &self.label {
            row.label = label.clone();
        }
        if let Some(value) = &self.value {
            row.value = value.clone();
        }
        if let Some(order) = self.order {
            row.order = order;
        }
    }

    /// Row a create writes; base columns stay empty outside the default locale.
    fn draft(&self, locale: Locale) -> Stat {
        let now = Utc::now();
        let mut row = Stat {
            id: uuid::Uuid::new_v4(),
            label: String::new(),
            value: String::new(),
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

    fn edit(&self, row: &mut Stat, locale: Locale) {
        if locale.is_default() {
            self.apply_to(row);
        }
        row.translations = translations_after_edit(
            &row.translations,
            locale,
            &self.localized_fields(),
            &row.base_fields(),
            Stat::LOCALIZED_FIELDS,
        );
    }
}

/// GET /api/stats?lang=
pub async fn list_stats(RequestLocale(locale): RequestLocale) -> Result<Json<Vec<Stat>>, ApiError> {
    let Some(pool) = db::get_pool() else {
        tracing::debug!("no database configured, serving no stats");
        return Ok(Json(Vec::new()));
    };

    let rows = sqlx::query_as::<_, Stat>(&format!(
        "SELECT {} FROM stats ORDER BY sort_order ASC, created_at ASC",
        COLUMNS
    ))
    .fetch_all(pool.as_ref())
    .await?;

    Ok(Json(rows.iter().map(|r| localize(r, locale)).collect()))
}

/// POST /api/stats?lang=
pub async fn create_stat(
    _session: AdminSession,
    RequestLocale(locale): RequestLocale,
    Json(input): Json<StatInput>,
) -> Result<(StatusCode, Json<Stat>), ApiError> {
    let missing = missing_fields(&[("label", &input.label), ("value", &input.value)]);
    if !missing.is_empty() {
        return Err(ApiError::Validation(missing));
    }
    let pool = require_pool()?;

    let draft = input.draft(locale);

    let row = sqlx::query_as::<_, Stat>(&format!(
        r#"
        INSERT INTO stats (label, value, sort_order, translations)
        VALUES ($1, $2, COALESCE($3, (SELECT COALESCE(MAX(sort_order) + 1, 0) FROM stats)), $4)
        RETURNING {}
        "#,
        COLUMNS
    ))
    .bind(&draft.label)
    .bind(&draft.value)
    .bind(input.order)
    .bind(SqlJson(&draft.translations))
    .fetch_one(pool.as_ref())
    .await?;

    tracing::info!(id = %row.id, locale = %locale, "stat created");
    Ok((StatusCode::CREATED, Json(row)))
}

/// PUT /api/stats/{id}?lang=
pub async fn update_stat(
    _session: AdminSession,
    RequestLocale(locale): RequestLocale,
    Path(id): Path<String>,
    Json(input): Json<StatInput>,
) -> Result<Json<Stat>, ApiError> {
    let not_found = || ApiError::NotFound("Stat".to_string());
    let id = parse_id(&id).ok_or_else(not_found)?;
    let pool = require_pool()?;

    let mut row = sqlx::query_as::<_, Stat>(&format!("SELECT {} FROM stats WHERE id = $1", COLUMNS))
        .bind(id)
        .fetch_optional(pool.as_ref())
        .await?
        .ok_or_else(not_found)?;

    input.edit(&mut row, locale);

    let saved = sqlx::query_as::<_, Stat>(&format!(
        r#"
        UPDATE stats
        SET label = $1, value = $2, sort_order = $3, translations = $4, updated_at = now()
        WHERE id = $5
        RETURNING {}
        "#,
        COLUMNS
    ))
    .bind(&row.label)
    .bind(&row.value)
    .bind(row.order)
    .bind(SqlJson(&row.translations))
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await?
    .ok_or_else(not_found)?;

    Ok(Json(saved))
}

/// DELETE /api/stats/{id}
pub async fn delete_stat(
    _session: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<DeleteOutcome>, ApiError> {
    let Some(id) = parse_id(&id) else {
        return Ok(Json(DeleteOutcome::already_gone()));
    };
    let pool = require_pool()?;

    let result = sqlx::query("DELETE FROM stats WHERE id = $1")
        .bind(id)
        .execute(pool.as_ref())
        .await?;

    Ok(Json(DeleteOutcome::removed(id, result.rows_affected() > 0)))
}
