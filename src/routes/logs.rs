/**
 * Error Log Routes
 * Client error reports: always traced, persisted when a database is configured
 */
use axum::{
    extract::{ConnectInfo, FromRequestParts, Query},
    http::{request::Parts, StatusCode},
    Extension, Json,
};
use serde::Deserialize;
use std::{convert::Infallible, net::SocketAddr};
use tower_http::request_id::RequestId;

use crate::db::{self, models::ErrorLog};
use crate::error::ApiError;
use crate::logging::config::{ErrorReport, LogLevel, ReportResponse};
use crate::routes::{auth::AdminSession, require_pool};

const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 200;
const MAX_MESSAGE_LEN: usize = 4_000;

/// Caller address: first `X-Forwarded-For` hop, else the socket peer.
#[derive(Debug, Clone)]
pub struct ClientIp(pub Option<String>);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let peer = || {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        };

        Ok(ClientIp(forwarded.or_else(peer)))
    }
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}

fn trace_report(report: &ErrorReport, request_id: &str, ip: Option<&str>) {
    let span = tracing::info_span!(
        "client_error",
        request_id = %request_id,
        ip = ip.unwrap_or("unknown"),
        user_id = report.user_id.as_deref().unwrap_or("anonymous"),
        source = "client",
    );
    let _enter = span.enter();

    match report.level {
        LogLevel::Debug => tracing::debug!(
            message = %report.message,
            context = ?report.context,
            "client report"
        ),
        LogLevel::Info => tracing::info!(
            message = %report.message,
            context = ?report.context,
            "client report"
        ),
        LogLevel::Warn => tracing::warn!(
            message = %report.message,
            context = ?report.context,
            "client report"
        ),
        LogLevel::Error => tracing::error!(
            message = %report.message,
            stack = ?report.stack,
            context = ?report.context,
            "client error"
        ),
    }
}

/// POST /api/logs/errors
pub async fn report_error(
    request_id: Option<Extension<RequestId>>,
    ClientIp(ip): ClientIp,
    Json(report): Json<ErrorReport>,
) -> Result<(StatusCode, Json<ReportResponse>), ApiError> {
    if report.message.trim().is_empty() {
        return Err(ApiError::Validation(vec!["message".to_string()]));
    }

    let req_id = request_id
        .as_ref()
        .and_then(|ext| ext.0.header_value().to_str().ok())
        .unwrap_or("unknown");

    trace_report(&report, req_id, ip.as_deref());

    let Some(pool) = db::get_pool() else {
        return Ok((
            StatusCode::ACCEPTED,
            Json(ReportResponse {
                success: true,
                stored: false,
            }),
        ));
    };

    sqlx::query(
        "INSERT INTO error_logs (message, stack, context, user_id, ip_address) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(truncate(&report.message, MAX_MESSAGE_LEN))
    .bind(&report.stack)
    .bind(&report.context)
    .bind(&report.user_id)
    .bind(&ip)
    .execute(pool.as_ref())
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ReportResponse {
            success: true,
            stored: true,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

/// GET /api/logs/errors?limit=
pub async fn list_errors(
    _session: AdminSession,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ErrorLog>>, ApiError> {
    let pool = require_pool()?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);

    let rows = sqlx::query_as::<_, ErrorLog>(
        r#"SELECT id, message, stack, context, user_id, ip_address, created_at
           FROM error_logs
           ORDER BY created_at DESC
           LIMIT $1"#,
    )
    .bind(limit)
    .fetch_all(pool.as_ref())
    .await?;

    Ok(Json(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::auth::create_access_token;
    use axum::{body::Body, http::Request, routing::post, Router};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new().route("/api/logs/errors", post(report_error).get(list_errors))
    }

    #[test]
    fn test_unknown_level_counts_as_error() {
        let report: ErrorReport =
            serde_json::from_str(r#"{"message":"boom","level":"fatal"}"#).unwrap();
        assert_eq!(report.level, LogLevel::Error);
        let report: ErrorReport = serde_json::from_str(r#"{"message":"boom"}"#).unwrap();
        assert_eq!(report.level, LogLevel::Error);
        let report: ErrorReport =
            serde_json::from_str(r#"{"message":"slow","level":"warn"}"#).unwrap();
        assert_eq!(report.level, LogLevel::Warn);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
    }

    #[tokio::test]
    async fn test_report_is_accepted_without_database() {
        let req = Request::post("/api/logs/errors")
            .header("content-type", "application/json")
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(Body::from(
                r#"{"message":"TypeError: x is undefined","stack":"at main.js:1","context":{"page":"/work"}}"#,
            ))
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::ACCEPTED);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: ReportResponse = serde_json::from_slice(&bytes).unwrap();
        assert!(body.success);
        assert!(!body.stored);
    }

    #[tokio::test]
    async fn test_report_without_message_is_rejected() {
        let req = Request::post("/api/logs/errors")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"message":"  "}"#))
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_listing_requires_auth_then_database() {
        let req = Request::get("/api/logs/errors").body(Body::empty()).unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let token = create_access_token("u-1", "ops@agency.test", "admin").unwrap();
        let req = Request::get("/api/logs/errors?limit=5000")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
