//! # routes::portfolio
//!
//! Thin wrappers that turn portfolio calls into dashboard intents, so every
//! change goes through the same transition function and event outbox.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::{dashboard::Intent, error::AppError, state::SharedState};

/// GET /api/portfolio: entries in insertion order
pub async fn list(State(state): State<SharedState>) -> impl IntoResponse {
    let entries = state.dashboard.read().await.portfolio().list().to_vec();

    Json(json!({
        "ok":      true,
        "count":   entries.len(),
        "entries": entries,
    }))
}

/// POST /api/portfolio/:symbol/toggle
///
/// A symbol outside the Working Set is resolved through the analytics API
/// first; if that fails nothing changes and `held` stays `false`.
pub async fn toggle(
    State(state): State<SharedState>,
    Path(symbol): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let view = state.dispatch(Intent::TogglePortfolio { symbol: symbol.clone() }).await?;
    let held = view.portfolio.iter().any(|e| e.record.symbol == symbol);

    Ok(Json(json!({
        "ok":        true,
        "symbol":    symbol,
        "held":      held,
        "portfolio": view.portfolio,
    })))
}

/// DELETE /api/portfolio/:symbol
pub async fn remove(
    State(state): State<SharedState>,
    Path(symbol): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let held_before = state.dashboard.read().await.portfolio().contains(&symbol);
    let view = state.dispatch(Intent::RemoveFromPortfolio { symbol: symbol.clone() }).await?;

    Ok(Json(json!({
        "ok":        true,
        "symbol":    symbol,
        "removed":   held_before,
        "portfolio": view.portfolio,
    })))
}
