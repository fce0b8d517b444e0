//! API response DTOs
//!
//! Wire shapes for the JSON API. Field names follow the public API
//! contract (Spanish domain vocabulary, `hasMore`/`count` pagination
//! envelope).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{Comment, Report, ReportPhoto, StateHistory, UserProfile};

/// User profile response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub rol: String,
    pub puntos: i64,
    pub creado_en: DateTime<Utc>,
}

impl From<&UserProfile> for ProfileResponse {
    fn from(user: &UserProfile) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            rol: user.role.clone(),
            puntos: user.points,
            creado_en: user.created_at,
        }
    }
}

/// Session response (signup/login)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub token: String,
    pub perfil: ProfileResponse,
}

/// Minimal author reference embedded in reports and comments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorRef {
    pub id: String,
    pub username: String,
}

/// Geolocation pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UbicacionResponse {
    pub latitud: f64,
    pub longitud: f64,
}

/// Report response
///
/// Vote tallies are present on detail responses only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportResponse {
    pub id: String,
    pub titulo: String,
    pub descripcion: String,
    pub autor: AuthorRef,
    pub categoria: String,
    pub prioridad: String,
    pub estado: String,
    pub ubicacion: Option<UbicacionResponse>,
    pub fotos: Vec<String>,
    pub creado_en: DateTime<Utc>,
    /// Present only on admin audit reads of soft-deleted reports
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eliminado_en: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub votos_no_existe: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub votos_reparado: Option<i64>,
}

/// Build a report response from the entity plus resolved context.
pub fn report_to_response(
    report: &Report,
    author_username: &str,
    photos: &[ReportPhoto],
    votes: Option<(i64, i64)>,
) -> ReportResponse {
    let ubicacion = match (report.latitude, report.longitude) {
        (Some(latitud), Some(longitud)) => Some(UbicacionResponse { latitud, longitud }),
        _ => None,
    };

    ReportResponse {
        id: report.id.clone(),
        titulo: report.title.clone(),
        descripcion: report.description.clone(),
        autor: AuthorRef {
            id: report.author_id.clone(),
            username: author_username.to_string(),
        },
        categoria: report.category.clone(),
        prioridad: report.priority.clone(),
        estado: report.status.clone(),
        ubicacion,
        fotos: photos.iter().map(|p| p.url.clone()).collect(),
        creado_en: report.created_at,
        eliminado_en: report.deleted_at,
        votos_no_existe: votes.map(|(no_existe, _)| no_existe),
        votos_reparado: votes.map(|(_, reparado)| reparado),
    }
}

/// Creation response; `advertencia` marks a partial success
/// (report persisted, photo upload failed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReportResponse {
    pub reporte: ReportResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advertencia: Option<String>,
}

/// Paginated list envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportListResponse {
    pub data: Vec<ReportResponse>,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
    pub count: i64,
    pub offset: i64,
    pub limite: i64,
}

/// Comment response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: String,
    pub reporte_id: String,
    pub autor: AuthorRef,
    pub texto: String,
    pub creado_en: DateTime<Utc>,
}

/// Build a comment response with its resolved author.
pub fn comment_to_response(comment: &Comment, author_username: &str) -> CommentResponse {
    CommentResponse {
        id: comment.id.clone(),
        reporte_id: comment.report_id.clone(),
        autor: AuthorRef {
            id: comment.author_id.clone(),
            username: author_username.to_string(),
        },
        texto: comment.body.clone(),
        creado_en: comment.created_at,
    }
}

/// Vote response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteResponse {
    pub votos: i64,
    pub estado: String,
}

/// Status transition response (admin path)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionResponse {
    pub estado_anterior: String,
    pub estado_nuevo: String,
}

/// State history entry response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub id: String,
    pub estado_anterior: String,
    pub estado_nuevo: String,
    pub actor_id: Option<String>,
    pub comentario: Option<String>,
    pub creado_en: DateTime<Utc>,
}

impl From<&StateHistory> for HistoryResponse {
    fn from(entry: &StateHistory) -> Self {
        Self {
            id: entry.id.clone(),
            estado_anterior: entry.previous_status.clone(),
            estado_nuevo: entry.new_status.clone(),
            actor_id: entry.actor_id.clone(),
            comentario: entry.comment.clone(),
            creado_en: entry.created_at,
        }
    }
}

/// Aggregated statistics response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total_reportes: i64,
    pub total_usuarios: i64,
    pub por_estado: BTreeMap<String, i64>,
    pub por_categoria: BTreeMap<String, i64>,
}
