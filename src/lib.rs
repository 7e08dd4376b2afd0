//! Agency CMS Backend - library for app logic and testing

pub mod carousel;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod i18n;
pub mod logging;
pub mod routes;

use axum::{
    extract::{DefaultBodyLimit, FromRef},
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use thiserror::Error;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    services::ServeDir, trace::TraceLayer,
};

use crate::config::{ConfigError, ServerConfig};
use crate::content::{case_studies::PgCaseStudyStore, CaseStudyService};
use crate::routes::upload::UploadSettings;

/// Global request body cap.
const BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Body cap on the upload route: the image limit plus multipart framing.
const UPLOAD_BODY_LIMIT: usize = routes::upload::MAX_FILE_SIZE + 512 * 1024;

/// Shared handler state.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub case_studies: CaseStudyService,
    pub uploads: UploadSettings,
}

impl AppState {
    /// PostgreSQL-backed when a pool is up, in-memory otherwise.
    pub fn from_env() -> Self {
        let case_studies = match db::get_pool() {
            Some(pool) => CaseStudyService::new(Arc::new(PgCaseStudyStore::new(pool))),
            None => {
                tracing::warn!("no database pool: case studies are kept in memory and lost on restart");
                CaseStudyService::in_memory()
            }
        };
        Self {
            case_studies,
            uploads: UploadSettings::from_env(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configure CORS from environment variables.
/// Uses ALLOWED_ORIGINS (comma-separated) or FRONTEND_ORIGIN.
pub fn configure_cors() -> CorsLayer {
    let allowed_origins = std::env::var("ALLOWED_ORIGINS")
        .ok()
        .and_then(|s| {
            let origins: Vec<HeaderValue> = s
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                None
            } else {
                Some(origins)
            }
        })
        .or_else(|| {
            std::env::var("FRONTEND_ORIGIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|origin| vec![origin])
        })
        .unwrap_or_else(|| {
            vec![
                HeaderValue::from_static("http://localhost:3000"),
                HeaderValue::from_static("http://127.0.0.1:3000"),
            ]
        });

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Create the application router with state derived from the environment.
pub fn create_app() -> Router {
    create_app_with_state(AppState::from_env())
}

pub fn create_app_with_state(state: AppState) -> Router {
    let cors = configure_cors();

    let api = Router::new()
        .route(
            "/api/case-studies",
            get(routes::case_studies::list_case_studies).post(routes::case_studies::create_case_study),
        )
        .route(
            "/api/case-studies/{identifier}",
            get(routes::case_studies::get_case_study)
                .put(routes::case_studies::update_case_study)
                .delete(routes::case_studies::delete_case_study),
        )
        .route(
            "/api/testimonials",
            get(routes::testimonials::list_testimonials).post(routes::testimonials::create_testimonial),
        )
        .route(
            "/api/testimonials/{id}",
            put(routes::testimonials::update_testimonial)
                .delete(routes::testimonials::delete_testimonial),
        )
        .route(
            "/api/stats",
            get(routes::stats::list_stats).post(routes::stats::create_stat),
        )
        .route(
            "/api/stats/{id}",
            put(routes::stats::update_stat).delete(routes::stats::delete_stat),
        )
        .route(
            "/api/contact-bookings",
            get(routes::contact_bookings::list_contact_bookings)
                .post(routes::contact_bookings::create_contact_booking),
        )
        .route(
            "/api/contact-bookings/{id}",
            put(routes::contact_bookings::update_contact_booking)
                .delete(routes::contact_bookings::delete_contact_booking),
        )
        .merge(routes::sections::router())
        .route(
            "/api/newsletter",
            post(routes::newsletter::subscribe).get(routes::newsletter::list_subscriptions),
        )
        .route("/api/newsletter/unsubscribe", post(routes::newsletter::unsubscribe))
        .route(
            "/api/translations",
            get(routes::translations::get_translations).put(routes::translations::update_translation),
        )
        .route(
            "/api/logs/errors",
            post(routes::logs::report_error).get(routes::logs::list_errors),
        )
        .route("/api/auth/register", post(routes::auth::register))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/verify", post(routes::auth::verify_token))
        .route("/api/auth/refresh", post(routes::auth::refresh))
        .route("/api/auth/logout", post(routes::auth::logout))
        .route("/health", get(routes::health::health_ping))
        .route("/health/detailed", get(routes::health::health_detailed))
        .route("/health/database", get(routes::health::health_database))
        .route("/health/ready", get(routes::health::health_ready))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT));

    let upload = Router::new()
        .route("/api/upload", post(routes::upload::upload_image))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .layer(RequestBodyLimitLayer::new(UPLOAD_BODY_LIMIT));

    let public_path = state.uploads.public_path.clone();
    let uploads_dir = ServeDir::new(&state.uploads.dir);

    api.merge(upload)
        .nest_service(&public_path, uploads_dir)
        .with_state(state)
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        // gzip/br/zstd
        .layer(CompressionLayer::new())
        .layer(cors)
}

/// Run the server (used by main).
pub async fn run() -> Result<(), StartupError> {
    dotenvy::dotenv().ok();

    // Held until shutdown so buffered log lines are flushed.
    let _log_guards = logging::init();

    routes::health::init_start_time();

    let config = ServerConfig::from_env();
    config.check_secrets(&routes::auth::JWT_SECRET)?;

    if std::env::var("DATABASE_URL").is_ok() {
        match db::init_pool(None).await {
            Ok(pool) => {
                if let Err(e) = db::run_migrations(&pool).await {
                    tracing::error!(error = %e, "failed to run database migrations");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to initialize database pool, continuing without database");
            }
        }
    } else {
        tracing::info!("DATABASE_URL not set. Running without database connection.");
    }

    let app = create_app();

    let addr = config.socket_addr()?;
    tracing::info!(%addr, environment = ?config.environment, "starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::send;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    fn test_app(dir: &tempfile::TempDir) -> Router {
        create_app_with_state(AppState {
            case_studies: CaseStudyService::in_memory(),
            uploads: UploadSettings {
                dir: dir.path().to_path_buf(),
                public_path: "/uploads".to_string(),
                max_bytes: routes::upload::MAX_FILE_SIZE,
            },
        })
    }

    #[tokio::test]
    async fn test_full_stack_serves_health_sections_and_case_studies() {
        let dir = tempfile::TempDir::new().unwrap();

        let (status, body) = send(test_app(&dir), Method::GET, "/health", None, false).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = send(test_app(&dir), Method::GET, "/api/visual", None, false).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["items"].is_array());

        let (status, body) =
            send(test_app(&dir), Method::GET, "/api/case-studies?lang=ar", None, false).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_uploaded_files_are_served() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("logo.png"), [0x89, 0x50, 0x4E, 0x47]).unwrap();

        let (status, _) = send(test_app(&dir), Method::GET, "/uploads/logo.png", None, false).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let dir = tempfile::TempDir::new().unwrap();
        let (status, _) = send(test_app(&dir), Method::GET, "/api/blog", None, false).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
