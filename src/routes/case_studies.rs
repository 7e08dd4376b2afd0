/**
 * Case Study Routes
 * Thin HTTP layer over `CaseStudyService`
 */
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::content::{CaseStudyInput, CaseStudyService, ContentError, DeleteOutcome};
use crate::db::models::CaseStudy;
use crate::error::ApiError;
use crate::i18n::RequestLocale;
use crate::routes::auth::AdminSession;

/// GET /api/case-studies?lang=
pub async fn list_case_studies(
    State(service): State<CaseStudyService>,
    RequestLocale(locale): RequestLocale,
) -> Result<Json<Vec<CaseStudy>>, ApiError> {
    Ok(Json(service.get_all(locale).await?))
}

/// GET /api/case-studies/{identifier}?lang=
pub async fn get_case_study(
    State(service): State<CaseStudyService>,
    RequestLocale(locale): RequestLocale,
    Path(identifier): Path<String>,
) -> Result<Json<CaseStudy>, ApiError> {
    service
        .get_by_slug_or_id(&identifier, locale)
        .await?
        .map(Json)
        .ok_or_else(|| ContentError::NotFound("Case study".to_string()).into())
}

/// POST /api/case-studies?lang=
pub async fn create_case_study(
    session: AdminSession,
    State(service): State<CaseStudyService>,
    RequestLocale(locale): RequestLocale,
    Json(input): Json<CaseStudyInput>,
) -> Result<(StatusCode, Json<CaseStudy>), ApiError> {
    let created = service.create(input, locale).await?;
    tracing::debug!(by = %session.claims.email, id = %created.id, "case study saved");
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/case-studies/{identifier}?lang=
pub async fn update_case_study(
    _session: AdminSession,
    State(service): State<CaseStudyService>,
    RequestLocale(locale): RequestLocale,
    Path(identifier): Path<String>,
    Json(input): Json<CaseStudyInput>,
) -> Result<Json<CaseStudy>, ApiError> {
    Ok(Json(service.update(&identifier, input, locale).await?))
}

/// DELETE /api/case-studies/{identifier}
pub async fn delete_case_study(
    _session: AdminSession,
    State(service): State<CaseStudyService>,
    Path(identifier): Path<String>,
) -> Result<Json<DeleteOutcome>, ApiError> {
    Ok(Json(service.delete(&identifier).await?))
}
