//! Admin endpoints
//!
//! Direct status changes, restricted to the admin role. The role is
//! re-read from storage on every call.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use serde::Deserialize;

use super::dto::{ReportResponse, TransitionResponse, report_to_response};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::{ReportStatus, Role, VoteKind};
use crate::error::AppError;
use crate::service::ModerationService;

/// Status change request
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub estado: String,
    pub comentario: Option<String>,
}

/// Create admin router
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/reportes/:id", get(get_report_audit))
        .route("/reportes/:id/estado", put(set_report_status))
}

/// GET /admin/reportes/:id
///
/// Audit read: returns the report by id even after soft deletion,
/// with `eliminado_en` set when applicable.
pub async fn get_report_audit(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ReportResponse>, AppError> {
    let profile = user.load_profile(&state).await?;
    if !Role::parse(&profile.role)?.is_admin() {
        return Err(AppError::Forbidden);
    }

    let report = state.db.get_report(&id).await?.ok_or(AppError::NotFound)?;
    let photos = state.db.get_report_photos(&id).await?;
    let votes_no_existe = state.db.count_votes(&id, VoteKind::NoExiste).await?;
    let votes_reparado = state.db.count_votes(&id, VoteKind::Reparado).await?;
    let author_username = state
        .db
        .get_user(&report.author_id)
        .await?
        .map(|u| u.username)
        .unwrap_or_else(|| "desconocido".to_string());

    Ok(Json(report_to_response(
        &report,
        &author_username,
        &photos,
        Some((votes_no_existe, votes_reparado)),
    )))
}

/// PUT /admin/reportes/:id/estado
///
/// Applies the requested status and appends the history row.
pub async fn set_report_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<SetStatusRequest>,
) -> Result<Json<TransitionResponse>, AppError> {
    let profile = user.load_profile(&state).await?;

    let new_status = ReportStatus::parse(req.estado.trim()).ok_or_else(|| {
        AppError::Validation("estado debe ser pendiente, reparado o rechazado".to_string())
    })?;
    let comment = req
        .comentario
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    let transition = ModerationService::new(state.db.clone(), state.mailer.clone())
        .admin_set_status(&profile, &id, new_status, comment)
        .await?;

    Ok(Json(TransitionResponse {
        estado_anterior: transition.previous_status,
        estado_nuevo: transition.new_status,
    }))
}
