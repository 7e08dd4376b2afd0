/**
 * Routes Module
 * API route handlers
 */
pub mod auth;
pub mod case_studies;
pub mod contact_bookings;
pub mod health;
pub mod logs;
pub mod newsletter;
pub mod sections;
pub mod stats;
pub mod testimonials;
pub mod translations;
pub mod upload;

use serde::{Deserialize, Serialize};

use crate::db;
use crate::error::ApiError;

/// Error response body shared by every route
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: None,
            fields: None,
        }
    }
}

/// Shared pool or a 503.
pub(crate) fn require_pool() -> Result<std::sync::Arc<sqlx::PgPool>, ApiError> {
    db::get_pool().ok_or(ApiError::DatabaseUnavailable)
}

/// UUID for a path identifier; placeholders and malformed ids give `None`.
pub(crate) fn parse_id(identifier: &str) -> Option<uuid::Uuid> {
    if crate::content::is_placeholder_identifier(identifier) {
        return None;
    }
    uuid::Uuid::parse_str(identifier.trim()).ok()
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::routes::auth::create_access_token;

    pub fn bearer() -> String {
        format!(
            "Bearer {}",
            create_access_token("u-1", "ops@agency.test", "admin").unwrap()
        )
    }

    /// Sends one request and returns the status with the JSON body (or null).
    pub async fn send(
        app: Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
        auth: bool,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if auth {
            builder = builder.header("authorization", bearer());
        }
        let req = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }
}
