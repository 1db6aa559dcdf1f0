//! # routes
//!
//! The local dashboard surface.  The browser renders [`View`](crate::dashboard::View)
//! and listens on `/ws/monitor` for incremental updates.
//!
//! | Method | Path                                  | Handler                         |
//! |--------|---------------------------------------|---------------------------------|
//! | GET    | `/health`                             | [`market::health`]              |
//! | GET    | `/api/view`                           | [`market::get_view`]            |
//! | POST   | `/api/intents`                        | [`market::post_intent`]         |
//! | GET    | `/api/records`                        | [`market::get_records`]         |
//! | GET    | `/api/search`                         | [`market::get_search`]          |
//! | POST   | `/api/refresh`                        | [`market::refresh`]             |
//! | POST   | `/api/retry`                          | [`market::retry`]               |
//! | GET    | `/api/insight`                        | [`market::get_insight`]         |
//! | GET    | `/api/opportunities`                  | [`market::get_opportunities`]   |
//! | GET    | `/api/analyze/:symbol`                | [`market::analyze`]             |
//! | GET    | `/api/chart/:symbol/:range`           | [`market::chart`]               |
//! | GET    | `/api/portfolio`                      | [`portfolio::list`]             |
//! | POST   | `/api/portfolio/:symbol/toggle`       | [`portfolio::toggle`]           |
//! | DELETE | `/api/portfolio/:symbol`              | [`portfolio::remove`]           |
//! | POST   | `/api/export/:period`                 | [`export::export_market`]       |
//! | POST   | `/api/export/portfolio/:period`       | [`export::export_portfolio`]    |
//! | GET WS | `/ws/monitor`                         | [`monitor::ws_monitor`]         |

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::state::SharedState;

pub mod export;
pub mod market;
pub mod monitor;
pub mod portfolio;

pub fn router(state: SharedState) -> Router {
    Router::new()
        // ── Market ────────────────────────────────────────────────────────────
        .route("/health",                         get(market::health))
        .route("/api/view",                       get(market::get_view))
        .route("/api/intents",                    post(market::post_intent))
        .route("/api/records",                    get(market::get_records))
        .route("/api/search",                     get(market::get_search))
        .route("/api/refresh",                    post(market::refresh))
        .route("/api/retry",                      post(market::retry))
        .route("/api/insight",                    get(market::get_insight))
        .route("/api/opportunities",              get(market::get_opportunities))
        .route("/api/analyze/:symbol",            get(market::analyze))
        .route("/api/chart/:symbol/:range",       get(market::chart))
        // ── Portfolio ─────────────────────────────────────────────────────────
        .route("/api/portfolio",                  get(portfolio::list))
        .route("/api/portfolio/:symbol/toggle",   post(portfolio::toggle))
        .route("/api/portfolio/:symbol",          delete(portfolio::remove))
        // ── Export ────────────────────────────────────────────────────────────
        .route("/api/export/portfolio/:period",   post(export::export_portfolio))
        .route("/api/export/:period",             post(export::export_market))
        // ── Monitor ───────────────────────────────────────────────────────────
        .route("/ws/monitor",                     get(monitor::ws_monitor))
        .with_state(state)
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::api::fake::{record, FakeApi, Reply};
    use crate::engine::pipeline;
    use crate::state::tests::make_state;

    async fn loaded_state() -> SharedState {
        let api = Arc::new(FakeApi::new());
        api.push_quick(Reply::ok(vec![
            record("THYAO.IS", 285.0),
            record("AKBNK.IS", 15.0),
            record("MSFT", 410.0),
            record("AAPL", 18.0),
        ]));
        let state = make_state(api, PathBuf::from("."));
        pipeline::load(&state).await;
        state
    }

    async fn call(state: &SharedState, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = router(state.clone())
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn symbols(list: &Value) -> Vec<&str> {
        list.as_array()
            .unwrap()
            .iter()
            .map(|r| r["symbol"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_records_filter_by_query() {
        let state = loaded_state().await;

        let (status, body) = call(&state, Method::GET, "/api/records?region=global&priceMin=10&priceMax=20", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(symbols(&body["records"]), ["AAPL"]);

        let (_, body) = call(&state, Method::GET, "/api/records", None).await;
        assert_eq!(symbols(&body["records"]), ["THYAO.IS", "AKBNK.IS"]);
    }

    #[tokio::test]
    async fn test_bad_region_is_bad_request() {
        let state = loaded_state().await;
        let (status, body) = call(&state, Method::GET, "/api/records?region=mars", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
    }

    #[tokio::test]
    async fn test_search_route() {
        let state = loaded_state().await;

        let (_, body) = call(&state, Method::GET, "/api/search?q=akb", None).await;
        assert_eq!(body["search"]["kind"], "matches");
        assert_eq!(symbols(&body["search"]["records"]), ["AKBNK.IS"]);

        let (_, body) = call(&state, Method::GET, "/api/search?q=akb&region=global", None).await;
        assert_eq!(body["search"]["kind"], "no_results");
    }

    #[tokio::test]
    async fn test_intent_roundtrip_updates_view() {
        let state = loaded_state().await;

        let intent = json!({ "type": "select_region", "region": "global" });
        let (status, body) = call(&state, Method::POST, "/api/intents", Some(intent)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(symbols(&body["view"]["records"]), ["AAPL", "MSFT"]);

        let (_, body) = call(&state, Method::GET, "/api/view", None).await;
        assert_eq!(body["view"]["region"], "global");
        assert_eq!(body["view"]["total"], 4);
    }

    #[tokio::test]
    async fn test_portfolio_toggle_and_remove() {
        let state = loaded_state().await;

        let (_, body) = call(&state, Method::POST, "/api/portfolio/MSFT/toggle", None).await;
        assert_eq!(body["held"], true);

        let (_, body) = call(&state, Method::GET, "/api/portfolio", None).await;
        assert_eq!(body["count"], 1);

        let (_, body) = call(&state, Method::DELETE, "/api/portfolio/MSFT", None).await;
        assert_eq!(body["removed"], true);
        let (_, body) = call(&state, Method::DELETE, "/api/portfolio/MSFT", None).await;
        assert_eq!(body["removed"], false);
    }

    #[tokio::test]
    async fn test_empty_portfolio_export_rejected() {
        let state = loaded_state().await;
        let (status, _) = call(&state, Method::POST, "/api/export/portfolio/daily", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&state, Method::POST, "/api/export/yearly", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_chart_and_extras() {
        let state = loaded_state().await;

        let (status, body) = call(&state, Method::GET, "/api/chart/AAPL/1mo", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["history"].as_array().unwrap().len(), 1);

        let (status, _) = call(&state, Method::GET, "/api/chart/AAPL/10y", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = call(&state, Method::GET, "/api/opportunities", None).await;
        assert_eq!(body["opportunities"][0]["reason"], "oversold");

        let (status, _) = call(&state, Method::GET, "/api/analyze/NOPE", None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }
}
