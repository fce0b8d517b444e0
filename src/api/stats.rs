//! Aggregated statistics endpoint
//!
//! Read-only dashboard counts over visible reports. Open to every
//! visitor, including the interested role.

use std::collections::BTreeMap;

use axum::{Json, Router, extract::State, routing::get};

use super::dto::StatsResponse;
use crate::AppState;
use crate::error::AppError;

/// Create stats router
pub fn stats_router() -> Router<AppState> {
    Router::new().route("/estadisticas", get(get_stats))
}

/// GET /estadisticas
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let total_reportes = state.db.count_visible_reports().await?;
    let total_usuarios = state.db.count_users().await?;
    let por_estado: BTreeMap<String, i64> = state
        .db
        .count_reports_by_status()
        .await?
        .into_iter()
        .collect();
    let por_categoria: BTreeMap<String, i64> = state
        .db
        .count_reports_by_category()
        .await?
        .into_iter()
        .collect();

    Ok(Json(StatsResponse {
        total_reportes,
        total_usuarios,
        por_estado,
        por_categoria,
    }))
}
