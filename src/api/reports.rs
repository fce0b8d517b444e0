//! Report endpoints
//!
//! Creation (multipart, optional photo), the paginated filtered
//! feed, detail, soft delete, votes, comments, and status history.

use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use serde::Deserialize;

use super::dto::{
    CommentResponse, CreateReportResponse, HistoryResponse, ReportListResponse, ReportResponse,
    VoteResponse, comment_to_response, report_to_response,
};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::{Priority, ReportFilter, ReportPhoto, ReportStatus, VoteKind};
use crate::error::AppError;
use crate::metrics::{HTTP_REQUEST_DURATION_SECONDS, HTTP_REQUESTS_TOTAL};
use crate::service::{CommentService, ModerationService, NewReport, PhotoUpload, ReportService};

const DEFAULT_PAGE_SIZE: i64 = 12;
const MAX_PAGE_SIZE: i64 = 50;
const UNKNOWN_AUTHOR: &str = "desconocido";

/// Feed query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub offset: Option<i64>,
    pub limite: Option<i64>,
    pub search: Option<String>,
    pub categoria: Option<String>,
    pub estado: Option<String>,
    pub prioridad: Option<String>,
    pub con_ubicacion: Option<bool>,
}

/// Comment creation request
#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub texto: String,
}

/// Create report router
pub fn reports_router() -> Router<AppState> {
    Router::new()
        .route("/reportes", post(create_report).get(list_reports))
        .route("/reportes/:id", get(get_report).delete(delete_report))
        .route("/reportes/:id/votos/no-existe", post(vote_no_existe))
        .route("/reportes/:id/votos/reparado", post(vote_reparado))
        .route(
            "/reportes/:id/comentarios",
            post(create_comment).get(list_comments),
        )
        .route("/comentarios/:id", delete(delete_comment))
        .route("/reportes/:id/historial", get(get_report_history))
}

fn build_report_service(state: &AppState) -> ReportService {
    ReportService::new(state.db.clone(), state.storage.clone())
}

fn build_moderation_service(state: &AppState) -> ModerationService {
    ModerationService::new(state.db.clone(), state.mailer.clone())
}

fn build_comment_service(state: &AppState) -> CommentService {
    CommentService::new(state.db.clone(), state.mailer.clone())
}

fn parse_optional_float(raw: &str, field: &str) -> Result<f64, AppError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| AppError::Validation(format!("{field} no es un número válido")))
}

async fn read_multipart_report(mut multipart: Multipart) -> Result<NewReport, AppError> {
    let mut new = NewReport {
        title: String::new(),
        description: String::new(),
        category: String::new(),
        priority: String::new(),
        latitude: None,
        longitude: None,
        photo: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("formulario inválido: {e}")))?
    {
        let Some(name) = field.name().map(ToOwned::to_owned) else {
            continue;
        };

        match name.as_str() {
            "titulo" => new.title = field.text().await.unwrap_or_default(),
            "descripcion" => new.description = field.text().await.unwrap_or_default(),
            "categoria" => new.category = field.text().await.unwrap_or_default(),
            "prioridad" => new.priority = field.text().await.unwrap_or_default(),
            "latitud" => {
                let raw = field.text().await.unwrap_or_default();
                if !raw.trim().is_empty() {
                    new.latitude = Some(parse_optional_float(&raw, "latitud")?);
                }
            }
            "longitud" => {
                let raw = field.text().await.unwrap_or_default();
                if !raw.trim().is_empty() {
                    new.longitude = Some(parse_optional_float(&raw, "longitud")?);
                }
            }
            "foto" => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("foto inválida: {e}")))?;
                if !data.is_empty() {
                    new.photo = Some(PhotoUpload {
                        data: data.to_vec(),
                        content_type,
                    });
                }
            }
            other => {
                tracing::debug!(field = other, "Ignoring unknown multipart field");
            }
        }
    }

    Ok(new)
}

async fn username_for(state: &AppState, user_id: &str) -> Result<String, AppError> {
    Ok(state
        .db
        .get_user(user_id)
        .await?
        .map(|u| u.username)
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()))
}

async fn usernames_for(
    state: &AppState,
    user_ids: Vec<String>,
) -> Result<HashMap<String, String>, AppError> {
    let mut unique = user_ids;
    unique.sort();
    unique.dedup();
    Ok(state
        .db
        .get_usernames(&unique)
        .await?
        .into_iter()
        .collect())
}

// =============================================================================
// Reports
// =============================================================================

/// POST /reportes
///
/// Multipart form: titulo, descripcion, categoria, prioridad,
/// optional latitud/longitud and one foto file.
pub async fn create_report(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<CreateReportResponse>), AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/reportes"])
        .start_timer();

    let profile = user.load_profile(&state).await?;
    let new = read_multipart_report(multipart).await?;

    let created = build_report_service(&state).create(&profile, new).await?;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/reportes", "201"])
        .inc();

    Ok((
        StatusCode::CREATED,
        Json(CreateReportResponse {
            reporte: report_to_response(
                &created.report,
                &profile.username,
                &created.photos,
                Some((0, 0)),
            ),
            advertencia: created.warning,
        }),
    ))
}

/// GET /reportes
///
/// Paginated filtered feed, newest first, soft-deleted excluded.
pub async fn list_reports(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ReportListResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/reportes"])
        .start_timer();

    let offset = params.offset.unwrap_or(0).max(0);
    let limite = params
        .limite
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let estado = match params.estado.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            ReportStatus::parse(raw)
                .ok_or_else(|| {
                    AppError::Validation(
                        "estado debe ser pendiente, reparado o rechazado".to_string(),
                    )
                })?
                .as_str()
                .to_string(),
        ),
    };
    let prioridad = match params.prioridad.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            Priority::parse(raw)
                .ok_or_else(|| {
                    AppError::Validation("prioridad debe ser baja, media o alta".to_string())
                })?
                .as_str()
                .to_string(),
        ),
    };

    let filter = ReportFilter {
        search: params
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        category: params
            .categoria
            .map(|c| c.trim().to_ascii_lowercase())
            .filter(|c| !c.is_empty()),
        status: estado,
        priority: prioridad,
        has_location: params.con_ubicacion,
        offset,
        limit: limite,
    };

    let (reports, count, photos) = build_report_service(&state).list(&filter).await?;

    let usernames = usernames_for(
        &state,
        reports.iter().map(|r| r.author_id.clone()).collect(),
    )
    .await?;

    let mut photos_by_report: HashMap<String, Vec<ReportPhoto>> = HashMap::new();
    for photo in photos {
        photos_by_report
            .entry(photo.report_id.clone())
            .or_default()
            .push(photo);
    }

    let data: Vec<ReportResponse> = reports
        .iter()
        .map(|report| {
            let username = usernames
                .get(&report.author_id)
                .map(String::as_str)
                .unwrap_or(UNKNOWN_AUTHOR);
            let report_photos = photos_by_report
                .get(&report.id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            report_to_response(report, username, report_photos, None)
        })
        .collect();

    let has_more = offset + (data.len() as i64) < count;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/reportes", "200"])
        .inc();

    Ok(Json(ReportListResponse {
        data,
        has_more,
        count,
        offset,
        limite,
    }))
}

/// GET /reportes/:id
pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ReportResponse>, AppError> {
    let detail = build_report_service(&state).get_detail(&id).await?;
    let username = username_for(&state, &detail.report.author_id).await?;

    Ok(Json(report_to_response(
        &detail.report,
        &username,
        &detail.photos,
        Some((detail.votes_no_existe, detail.votes_reparado)),
    )))
}

/// DELETE /reportes/:id
///
/// Soft delete by the report's author or an admin.
pub async fn delete_report(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let profile = user.load_profile(&state).await?;
    build_report_service(&state).delete(&profile, &id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

// =============================================================================
// Votes
// =============================================================================

async fn cast_vote(
    state: AppState,
    user: CurrentUser,
    report_id: String,
    kind: VoteKind,
) -> Result<Json<VoteResponse>, AppError> {
    let profile = user.load_profile(&state).await?;
    let outcome = build_moderation_service(&state)
        .cast_vote(&profile, &report_id, kind)
        .await?;

    Ok(Json(VoteResponse {
        votos: outcome.tally,
        estado: outcome.status,
    }))
}

/// POST /reportes/:id/votos/no-existe
pub async fn vote_no_existe(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<VoteResponse>, AppError> {
    cast_vote(state, user, id, VoteKind::NoExiste).await
}

/// POST /reportes/:id/votos/reparado
pub async fn vote_reparado(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<VoteResponse>, AppError> {
    cast_vote(state, user, id, VoteKind::Reparado).await
}

// =============================================================================
// Comments
// =============================================================================

/// POST /reportes/:id/comentarios
pub async fn create_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>), AppError> {
    let profile = user.load_profile(&state).await?;
    let comment = build_comment_service(&state)
        .create(&profile, &id, req.texto)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(comment_to_response(&comment, &profile.username)),
    ))
}

/// GET /reportes/:id/comentarios
pub async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<CommentResponse>>, AppError> {
    let comments = build_comment_service(&state).list(&id).await?;
    let usernames = usernames_for(
        &state,
        comments.iter().map(|c| c.author_id.clone()).collect(),
    )
    .await?;

    let data = comments
        .iter()
        .map(|comment| {
            let username = usernames
                .get(&comment.author_id)
                .map(String::as_str)
                .unwrap_or(UNKNOWN_AUTHOR);
            comment_to_response(comment, username)
        })
        .collect();

    Ok(Json(data))
}

/// DELETE /comentarios/:id
///
/// Soft delete by the comment's author or an admin.
pub async fn delete_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let profile = user.load_profile(&state).await?;
    build_comment_service(&state).delete(&profile, &id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

// =============================================================================
// History
// =============================================================================

/// GET /reportes/:id/historial
///
/// Status transition audit log, oldest first. Readable even for
/// soft-deleted reports.
pub async fn get_report_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<HistoryResponse>>, AppError> {
    let history = build_moderation_service(&state).list_history(&id).await?;
    Ok(Json(history.iter().map(HistoryResponse::from).collect()))
}
