/**
 * Contact Booking Routes
 * Bookable days and their free call slots
 */
use axum::{extract::Path, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sqlx::types::Json as SqlJson;

use crate::content::{missing_fields, DeleteOutcome};
use crate::db::{self, models::ContactBooking};
use crate::error::ApiError;
use crate::i18n::{localize, translations_after_edit, Localizable, Locale, RequestLocale, Translations};
use crate::routes::{auth::AdminSession, parse_id, require_pool};

const COLUMNS: &str = "id, day, date, slots, sort_order, translations, created_at, updated_at";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactBookingInput {
    pub day: Option<String>,
    pub date: Option<String>,
    pub slots: Option<Vec<String>>,
    pub order: Option<i32>,
}

impl ContactBookingInput {
    /// Slots trimmed, blanks dropped.
    fn clean_slots(&self) -> Option<Vec<String>> {
        self.slots.as_ref().map(|slots| {
            slots
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
    }

    fn localized_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        if let Some(day) = &self.day {
            fields.insert("day".into(), json!(day));
        }
        if let Some(date) = &self.date {
            fields.insert("date".into(), json!(date));
        }
        if let Some(slots) = self.clean_slots() {
            fields.insert("slots".into(), json!(slots));
        }
        fields
    }

    fn apply_to(&self, row: &mut ContactBooking) {
        if let Some(day) = &self.day {
            row.day = day.clone();
        }
        if let Some(date) = &self.date {
            row.date = date.clone();
        }
        if let Some(slots) = self.clean_slots() {
            row.slots = slots;
        }
        if let Some(order) = self.order {
            row.order = order;
        }
    }

    /// Row a create writes; base columns stay empty outside the default locale.
    fn draft(&self, locale: Locale) -> ContactBooking {
        let now = Utc::now();
        let mut row = ContactBooking {
            id: uuid::Uuid::new_v4(),
            day: String::new(),
            date: String::new(),
            slots: Vec::new(),
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

    fn edit(&self, row: &mut ContactBooking, locale: Locale) {
        if locale.is_default() {
            self.apply_to(row);
        }
        row.translations = translations_after_edit(
            &row.translations,
            locale,
            &self.localized_fields(),
            &row.base_fields(),
            ContactBooking::LOCALIZED_FIELDS,
        );
    }
}

/// GET /api/contact-bookings?lang=
pub async fn list_contact_bookings(
    RequestLocale(locale): RequestLocale,
) -> Result<Json<Vec<ContactBooking>>, ApiError> {
    let Some(pool) = db::get_pool() else {
        tracing::debug!("no database configured, serving no booking days");
        return Ok(Json(Vec::new()));
    };

    let rows = sqlx::query_as::<_, ContactBooking>(&format!(
        "SELECT {} FROM contact_bookings ORDER BY sort_order ASC, created_at ASC",
        COLUMNS
    ))
    .fetch_all(pool.as_ref())
    .await?;

    Ok(Json(rows.iter().map(|r| localize(r, locale)).collect()))
}

/// POST /api/contact-bookings?lang=
pub async fn create_contact_booking(
    _session: AdminSession,
    RequestLocale(locale): RequestLocale,
    Json(input): Json<ContactBookingInput>,
) -> Result<(StatusCode, Json<ContactBooking>), ApiError> {
    let missing = missing_fields(&[("day", &input.day), ("date", &input.date)]);
    if !missing.is_empty() {
        return Err(ApiError::Validation(missing));
    }
    let pool = require_pool()?;

    let draft = input.draft(locale);

    let row = sqlx::query_as::<_, ContactBooking>(&format!(
        r#"
        INSERT INTO contact_bookings (day, date, slots, sort_order, translations)
        VALUES ($1, $2, $3,
                COALESCE($4, (SELECT COALESCE(MAX(sort_order) + 1, 0) FROM contact_bookings)), $5)
        RETURNING {}
        "#,
        COLUMNS
    ))
    .bind(&draft.day)
    .bind(&draft.date)
    .bind(SqlJson(&draft.slots))
    .bind(input.order)
    .bind(SqlJson(&draft.translations))
    .fetch_one(pool.as_ref())
    .await?;

    tracing::info!(id = %row.id, locale = %locale, "booking day created");
    Ok((StatusCode::CREATED, Json(row)))
}

/// PUT /api/contact-bookings/{id}?lang=
pub async fn update_contact_booking(
    _session: AdminSession,
    RequestLocale(locale): RequestLocale,
    Path(id): Path<String>,
    Json(input): Json<ContactBookingInput>,
) -> Result<Json<ContactBooking>, ApiError> {
    let not_found = || ApiError::NotFound("Contact booking".to_string());
    let id = parse_id(&id).ok_or_else(not_found)?;
    let pool = require_pool()?;

    let mut row = sqlx::query_as::<_, ContactBooking>(&format!(
        "SELECT {} FROM contact_bookings WHERE id = $1",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await?
    .ok_or_else(not_found)?;

    input.edit(&mut row, locale);

    let saved = sqlx::query_as::<_, ContactBooking>(&format!(
        r#"
        UPDATE contact_bookings
        SET day = $1, date = $2, slots = $3, sort_order = $4, translations = $5, updated_at = now()
        WHERE id = $6
        RETURNING {}
        "#,
        COLUMNS
    ))
    .bind(&row.day)
    .bind(&row.date)
    .bind(SqlJson(&row.slots))
    .bind(row.order)
    .bind(SqlJson(&row.translations))
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await?
    .ok_or_else(not_found)?;

    Ok(Json(saved))
}

/// DELETE /api/contact-bookings/{id}
pub async fn delete_contact_booking(
    _session: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<DeleteOutcome>, ApiError> {
    let Some(id) = parse_id(&id) else {
        return Ok(Json(DeleteOutcome::already_gone()));
    };
    let pool = require_pool()?;

    let result = sqlx::query("DELETE FROM contact_bookings WHERE id = $1")
        .bind(id)
        .execute(pool.as_ref())
        .await?;

    Ok(Json(DeleteOutcome::removed(id, result.rows_affected() > 0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::send;
    use axum::{
        http::Method,
        routing::{get, put},
        Router,
    };

    fn app() -> Router {
        Router::new()
            .route(
                "/api/contact-bookings",
                get(list_contact_bookings).post(create_contact_booking),
            )
            .route(
                "/api/contact-bookings/{id}",
                put(update_contact_booking).delete(delete_contact_booking),
            )
    }

    #[test]
    fn test_blank_slots_are_dropped() {
        let input = ContactBookingInput {
            slots: Some(vec![" 10:00 ".into(), "".into(), "14:30".into()]),
            ..Default::default()
        };
        assert_eq!(input.localized_fields()["slots"], json!(["10:00", "14:30"]));
    }

    #[test]
    fn test_translated_draft_keeps_base_empty() {
        let input = ContactBookingInput {
            day: Some("الاثنين".into()),
            date: Some("٢ نوفمبر".into()),
            slots: Some(vec![" 10:00 ".into()]),
            order: None,
        };
        let row = input.draft(Locale::Ar);
        assert_eq!(row.day, "");
        assert!(row.slots.is_empty());

        let ar = localize(&row, Locale::Ar);
        assert_eq!(ar.day, "الاثنين");
        assert_eq!(ar.slots, vec!["10:00".to_string()]);
    }

    #[test]
    fn test_translated_edit_merges_into_overlay_only() {
        let mut row = ContactBookingInput {
            day: Some("Monday".into()),
            date: Some("Nov 2".into()),
            slots: Some(vec!["10:00".into(), "15:00".into()]),
            order: None,
        }
        .draft(Locale::En);

        ContactBookingInput {
            day: Some("الاثنين".into()),
            ..Default::default()
        }
        .edit(&mut row, Locale::Ar);

        assert_eq!(row.day, "Monday");
        let ar = localize(&row, Locale::Ar);
        assert_eq!(ar.day, "الاثنين");
        assert_eq!(ar.date, "Nov 2");
        assert_eq!(ar.slots.len(), 2);
    }

    #[tokio::test]
    async fn test_list_without_database_is_empty() {
        let (status, body) =
            send(app(), Method::GET, "/api/contact-bookings?lang=ar", None, false).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_create_lists_missing_day_and_date() {
        let (status, body) = send(
            app(),
            Method::POST,
            "/api/contact-bookings",
            Some(json!({ "slots": ["10:00"] })),
            true,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["fields"], json!(["day", "date"]));
    }
}
