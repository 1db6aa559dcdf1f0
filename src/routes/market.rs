//! # routes::market
//!
//! Read side of the dashboard: the current view, stateless filter/search
//! over the Working Set, the cached extras and per-symbol detail.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::{
    dashboard::Intent,
    engine::{
        filter::{filter, FilterRanges},
        search::search,
    },
    error::AppError,
    models::{ChartRange, IndicatorKind, Record, Region},
    state::SharedState,
};

/// `region` query parameter; absent means domestic.
fn region_param(params: &HashMap<String, String>) -> Result<Region, AppError> {
    match params.get("region").filter(|r| !r.trim().is_empty()) {
        Some(raw) => raw.parse().map_err(AppError::BadRequest),
        None => Ok(Region::default()),
    }
}

// ─── GET /health ──────────────────────────────────────────────────────────────

pub async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    let epoch = state.dashboard.read().await.epoch();
    Json(json!({
        "ok":      true,
        "status":  "ok",
        "session": state.session_id,
        "epoch":   epoch,
    }))
}

// ─── View / Intents ───────────────────────────────────────────────────────────

/// GET /api/view
pub async fn get_view(State(state): State<SharedState>) -> impl IntoResponse {
    let view = state.view().await;
    Json(json!({ "ok": true, "view": view }))
}

/// POST /api/intents: body is one tagged [`Intent`]
pub async fn post_intent(
    State(state): State<SharedState>,
    Json(intent): Json<Intent>,
) -> Result<impl IntoResponse, AppError> {
    let view = state.dispatch(intent).await?;
    Ok(Json(json!({ "ok": true, "view": view })))
}

/// POST /api/refresh
pub async fn refresh(State(state): State<SharedState>) -> Result<impl IntoResponse, AppError> {
    let view = state.dispatch(Intent::Refresh).await?;
    Ok(Json(json!({ "ok": true, "view": view })))
}

/// POST /api/retry: re-run the pipeline after a failed quick stage
pub async fn retry(State(state): State<SharedState>) -> Result<impl IntoResponse, AppError> {
    let view = state.dispatch(Intent::Retry).await?;
    Ok(Json(json!({ "ok": true, "view": view })))
}

// ─── Stateless Projections ────────────────────────────────────────────────────

/// GET /api/records?region=global&priceMin=10&priceMax=20
///
/// Does not touch the dashboard's own filter state.
pub async fn get_records(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let region = region_param(&params)?;
    let ranges = FilterRanges::from_params(&params);

    let dashboard = state.dashboard.read().await;
    let records = filter(dashboard.working_set().records(), region, &ranges);

    Ok(Json(json!({
        "ok":      true,
        "region":  region,
        "ranges":  ranges,
        "count":   records.len(),
        "records": records,
    })))
}

/// GET /api/search?q=bank&region=domestic
pub async fn get_search(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let region = region_param(&params)?;
    let query = params.get("q").map(String::as_str).unwrap_or_default();

    let dashboard = state.dashboard.read().await;
    let outcome = search(dashboard.working_set().records(), region, query);

    Ok(Json(json!({
        "ok":     true,
        "query":  query,
        "region": region,
        "search": outcome,
    })))
}

// ─── Extras ───────────────────────────────────────────────────────────────────

/// GET /api/insight
pub async fn get_insight(State(state): State<SharedState>) -> Result<impl IntoResponse, AppError> {
    let insight = state.insight().await?;
    Ok(Json(json!({ "ok": true, "insight": insight })))
}

/// GET /api/opportunities
pub async fn get_opportunities(
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, AppError> {
    let opportunities = state.opportunities().await?;
    Ok(Json(json!({ "ok": true, "opportunities": opportunities })))
}

/// Card text for the detail panel; absent indicators show the placeholder.
fn display(record: &Record) -> serde_json::Value {
    let ind = &record.indicators;
    json!({
        "region":         record.region(),
        "price":          record.price_label(),
        "change_pct":     format!("{:+.2}%", record.change_pct),
        "rsi":            ind.label(IndicatorKind::Rsi),
        "moving_average": ind.label(IndicatorKind::MovingAverage),
        "volatility":     ind.label(IndicatorKind::Volatility),
        "volume":         ind.label(IndicatorKind::Volume),
    })
}

/// GET /api/analyze/:symbol
pub async fn analyze(
    State(state): State<SharedState>,
    Path(symbol): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let record = state.analyze(&symbol).await?;
    Ok(Json(json!({
        "ok":      true,
        "display": display(&record),
        "record":  record,
    })))
}

/// GET /api/chart/:symbol/:range
pub async fn chart(
    State(state): State<SharedState>,
    Path((symbol, range)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let range: ChartRange = range.parse().map_err(AppError::BadRequest)?;
    let history = state.history(&symbol, range).await?;
    if history.is_empty() {
        return Err(AppError::NotFound(format!("no {range} history for {symbol}")));
    }

    Ok(Json(json!({
        "ok":      true,
        "symbol":  symbol,
        "range":   range,
        "history": history,
    })))
}
