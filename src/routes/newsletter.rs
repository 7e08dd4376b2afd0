/**
 * Newsletter Routes
 * Public subscribe/unsubscribe, dashboard subscriber list
 */
use axum::{extract::Query, http::StatusCode, Json};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::db::models::NewsletterSubscription;
use crate::error::ApiError;
use crate::routes::{auth::AdminSession, require_pool};

lazy_static::lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex");
}

const MAX_EMAIL_LEN: usize = 254;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Unsubscribed,
}

impl SubscriptionStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Unsubscribed => "unsubscribed",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubscribeResponse {
    pub success: bool,
    pub email: String,
    pub status: SubscriptionStatus,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<SubscriptionStatus>,
}

/// Lowercased, trimmed email, or a validation error on `email`.
fn normalize_email(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(ApiError::Validation(vec!["email".to_string()]));
    }
    if email.len() > MAX_EMAIL_LEN || !EMAIL_REGEX.is_match(&email) {
        return Err(ApiError::BadRequest("Invalid email format".to_string()));
    }
    Ok(email)
}

/// POST /api/newsletter
///
/// Re-subscribing an address reactivates it.
pub async fn subscribe(
    Json(payload): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<SubscribeResponse>), ApiError> {
    let email = normalize_email(&payload.email)?;
    let pool = require_pool()?;

    sqlx::query(
        r#"
        INSERT INTO newsletter_subscriptions (email, status)
        VALUES ($1, 'active')
        ON CONFLICT (email) DO UPDATE SET status = 'active', updated_at = now()
        "#,
    )
    .bind(&email)
    .execute(pool.as_ref())
    .await?;

    tracing::info!(email = %email, "newsletter subscription");

    Ok((
        StatusCode::CREATED,
        Json(SubscribeResponse {
            success: true,
            email,
            status: SubscriptionStatus::Active,
        }),
    ))
}

/// POST /api/newsletter/unsubscribe
///
/// Succeeds for unknown addresses too.
pub async fn unsubscribe(
    Json(payload): Json<SubscribeRequest>,
) -> Result<Json<SubscribeResponse>, ApiError> {
    let email = normalize_email(&payload.email)?;
    let pool = require_pool()?;

    let result = sqlx::query(
        "UPDATE newsletter_subscriptions SET status = 'unsubscribed', updated_at = now() WHERE email = $1",
    )
    .bind(&email)
    .execute(pool.as_ref())
    .await?;

    tracing::info!(email = %email, matched = result.rows_affected(), "newsletter unsubscribe");

    Ok(Json(SubscribeResponse {
        success: true,
        email,
        status: SubscriptionStatus::Unsubscribed,
    }))
}

/// GET /api/newsletter?status=
pub async fn list_subscriptions(
    _session: AdminSession,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<NewsletterSubscription>>, ApiError> {
    let pool = require_pool()?;

    let rows = sqlx::query_as::<_, NewsletterSubscription>(
        r#"
        SELECT id, email, status, created_at, updated_at
        FROM newsletter_subscriptions
        WHERE ($1::text IS NULL OR status = $1)
        ORDER BY created_at DESC
        "#,
    )
    .bind(query.status.map(SubscriptionStatus::as_str))
    .fetch_all(pool.as_ref())
    .await?;

    Ok(Json(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::send;
    use axum::{http::Method, routing::post, Router};
    use serde_json::json;

    fn app() -> Router {
        Router::new()
            .route("/api/newsletter", post(subscribe).get(list_subscriptions))
            .route("/api/newsletter/unsubscribe", post(unsubscribe))
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Hello@Agency.Example ").unwrap(), "hello@agency.example");
        assert!(matches!(normalize_email(""), Err(ApiError::Validation(_))));
        assert!(matches!(normalize_email("no-at-sign"), Err(ApiError::BadRequest(_))));
        assert!(matches!(normalize_email("a@b"), Err(ApiError::BadRequest(_))));
        assert!(matches!(normalize_email("a b@c.d"), Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_subscribe_rejects_bad_email() {
        let (status, body) = send(
            app(),
            Method::POST,
            "/api/newsletter",
            Some(json!({ "email": "nope" })),
            false,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid email format");
    }

    #[tokio::test]
    async fn test_subscribe_without_database_is_503() {
        let (status, _) = send(
            app(),
            Method::POST,
            "/api/newsletter",
            Some(json!({ "email": "reader@agency.example" })),
            false,
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_list_requires_auth() {
        let (status, _) = send(app(), Method::GET, "/api/newsletter", None, false).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_status_filter_parses() {
        let q: ListQuery = serde_json::from_value(json!({ "status": "unsubscribed" })).unwrap();
        assert_eq!(q.status, Some(SubscriptionStatus::Unsubscribed));
    }
}
