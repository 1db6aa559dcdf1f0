//! # routes::export
//!
//! Spreadsheet downloads.  The response carries the final export status;
//! `/ws/monitor` sees the `running` → `succeeded | failed` transitions too.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::{
    dashboard::Intent,
    error::AppError,
    export::{ExportPeriod, ExportStatus},
    state::SharedState,
};

fn respond(status: ExportStatus) -> (StatusCode, Json<serde_json::Value>) {
    let code = match status {
        ExportStatus::Failed { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::OK,
    };
    let ok = code.is_success();
    (code, Json(json!({ "ok": ok, "export": status })))
}

/// POST /api/export/:period
pub async fn export_market(
    State(state): State<SharedState>,
    Path(period): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let period: ExportPeriod = period.parse().map_err(AppError::BadRequest)?;
    let view = state.dispatch(Intent::Export { period }).await?;
    Ok(respond(view.export))
}

/// POST /api/export/portfolio/:period
pub async fn export_portfolio(
    State(state): State<SharedState>,
    Path(period): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let period: ExportPeriod = period.parse().map_err(AppError::BadRequest)?;
    let view = state.dispatch(Intent::ExportPortfolio { period }).await?;
    Ok(respond(view.export))
}
