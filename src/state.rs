//! # state
//!
//! The shared application state and the coordinator that runs dashboard
//! effects.
//!
//! * `Arc<AppState>` is cloned into every axum handler and every pipeline
//!   task.
//! * The [`Dashboard`] sits behind one `tokio::sync::RwLock`.  Every write to
//!   the Working Set and the Session Cache happens while holding its write
//!   guard, so there is at most one mutator at a time.
//! * Events produced by a transition are drained from the dashboard's outbox
//!   and broadcast as pre-serialised JSON, exactly once, by [`AppState::publish`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::{ApiClient, MarketApi};
use crate::cache::{CacheKey, SessionCache};
use crate::config::Config;
use crate::dashboard::{Dashboard, Effect, Intent, View};
use crate::engine::pipeline;
use crate::error::AppError;
use crate::events::DashboardEvent;
use crate::export::{self, ExportRequest, ExportStatus};
use crate::models::{Candle, ChartRange, Opportunity, Record};
use crate::portfolio::PortfolioStore;
use crate::storage::{KeyValueStore, LocalStore, SessionStore};

/// Capacity of the WebSocket broadcast channel.
const BROADCAST_CAPACITY: usize = 256;

// ─── AppState ─────────────────────────────────────────────────────────────────

pub struct AppState {
    // ── Session ───────────────────────────────────────────────────────────────
    pub dashboard:     RwLock<Dashboard>,
    pub cache:         SessionCache,
    pub session_id:    Uuid,

    // ── Upstream ──────────────────────────────────────────────────────────────
    pub api:           Arc<dyn MarketApi>,
    pub quick_timeout: Duration,

    // ── Monitor / WebSocket ───────────────────────────────────────────────────
    /// Pre-serialised [`DashboardEvent`] JSON.
    pub broadcast_tx:  broadcast::Sender<String>,

    // ── Export ────────────────────────────────────────────────────────────────
    pub download_dir:  PathBuf,
    pub export_reset:  Duration,
}

/// Convenience type alias
pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        api: Arc<dyn MarketApi>,
        session: SessionStore,
        local: Arc<dyn KeyValueStore>,
        config: &Config,
    ) -> Self {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let session_id = session.session_id();

        Self {
            dashboard: RwLock::new(Dashboard::new(PortfolioStore::load(local))),
            cache: SessionCache::new(Arc::new(session), config.cache_ttl),
            session_id,
            api,
            quick_timeout: config.quick_timeout,
            broadcast_tx,
            download_dir: config.download_dir.clone(),
            export_reset: config.export_reset,
        }
    }

    // ── Events ────────────────────────────────────────────────────────────────

    /// Broadcast to every WebSocket client.  No listener is not an error.
    pub fn broadcast(&self, event: &DashboardEvent) {
        let _ = self.broadcast_tx.send(event.to_json());
    }

    /// Drain the dashboard's outbox onto the broadcast channel.
    pub fn publish(&self, dashboard: &mut Dashboard) {
        for event in dashboard.take_events() {
            debug!(event = event.name(), "📡 Broadcast");
            self.broadcast(&event);
        }
    }

    pub async fn view(&self) -> View {
        self.dashboard.read().await.view()
    }

    // ── Intents ───────────────────────────────────────────────────────────────

    /// Apply `intent`, run whatever effect it asks for, return the new view.
    pub async fn dispatch(self: &Arc<Self>, intent: Intent) -> Result<View, AppError> {
        let effect = {
            let mut dashboard = self.dashboard.write().await;
            let effect = dashboard.update(intent);
            self.publish(&mut dashboard);
            effect?
        };

        if let Some(effect) = effect {
            self.execute(effect).await?;
        }

        Ok(self.view().await)
    }

    async fn execute(self: &Arc<Self>, effect: Effect) -> Result<(), AppError> {
        match effect {
            Effect::Reload { epoch } => {
                info!(epoch, "🔄 Reloading market data");
                pipeline::reload(self).await?;
            }

            Effect::Retry { epoch } => {
                info!(epoch, "🔁 Retrying market data load");
                pipeline::load(self).await;
            }

            Effect::Resolve { symbol } => {
                let record = match self.api.analyze(&symbol).await {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!(symbol = %symbol, error = %e, "Could not resolve symbol for portfolio");
                        None
                    }
                };

                let mut dashboard = self.dashboard.write().await;
                let outcome = dashboard.adopt_resolved(&symbol, record);
                self.publish(&mut dashboard);
                outcome?;
            }

            Effect::Export { request, ticket } => self.run_export(request, ticket).await,
        }
        Ok(())
    }

    /// Download one export and record its outcome.  A failure reverts to idle
    /// after `export_reset`.
    async fn run_export(self: &Arc<Self>, request: ExportRequest, ticket: u64) {
        let status = match export::download(self.api.as_ref(), &request, &self.download_dir).await {
            Ok(path) => ExportStatus::Succeeded { path },
            Err(e) => {
                warn!(file = %request.file_name(), error = %e, "❌ Export failed");
                ExportStatus::Failed { message: e.to_string() }
            }
        };
        let failed = matches!(status, ExportStatus::Failed { .. });

        {
            let mut dashboard = self.dashboard.write().await;
            dashboard.finish_export(ticket, status);
            self.publish(&mut dashboard);
        }

        if failed {
            let state = Arc::clone(self);
            tokio::spawn(async move {
                tokio::time::sleep(state.export_reset).await;
                let mut dashboard = state.dashboard.write().await;
                if dashboard.clear_failed_export(ticket) {
                    state.publish(&mut dashboard);
                }
            });
        }
    }

    // ── Market Extras ─────────────────────────────────────────────────────────

    pub async fn insight(&self) -> Result<String, AppError> {
        if let Some(text) = self.cache.read::<String>(CacheKey::Insight) {
            return Ok(text);
        }

        let text = self.api.insight().await?;
        if let Err(e) = self.cache.write(CacheKey::Insight, &text) {
            warn!(error = %e, "Could not cache insight");
        }
        Ok(text)
    }

    pub async fn opportunities(&self) -> Result<Vec<Opportunity>, AppError> {
        if let Some(list) = self.cache.read::<Vec<Opportunity>>(CacheKey::Opportunities) {
            return Ok(list);
        }

        let list = self.api.opportunities().await?;
        if let Err(e) = self.cache.write(CacheKey::Opportunities, &list) {
            warn!(error = %e, "Could not cache opportunities");
        }
        Ok(list)
    }

    pub async fn analyze(&self, symbol: &str) -> Result<Record, AppError> {
        Ok(self.api.analyze(symbol).await?)
    }

    pub async fn history(&self, symbol: &str, range: ChartRange) -> Result<Vec<Candle>, AppError> {
        Ok(self.api.history(symbol, range).await?)
    }
}

/// Build the production state: `reqwest` client, in-memory session store,
/// file-backed portfolio.
pub fn build_state(config: &Config) -> anyhow::Result<SharedState> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("wolfee-dashboard/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;

    let api = Arc::new(ApiClient::new(client, config));
    let local = LocalStore::open(&config.portfolio_path)
        .with_context(|| format!("cannot open {}", config.portfolio_path.display()))?;

    info!(path = %local.path().display(), "⭐ Portfolio store opened");

    let state = AppState::new(api, SessionStore::new(), Arc::new(local), config);
    info!(session = %state.session_id, "Session started");

    Ok(Arc::new(state))
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::fake::{record, FakeApi, Reply};
    use crate::dashboard::LoadStatus;
    use crate::error::FetchError;
    use crate::export::ExportPeriod;
    use crate::models::{Provenance, Snapshot};
    use std::sync::atomic::Ordering;

    /// State over `api` with an in-memory portfolio and a temp download dir.
    pub(crate) fn make_state(api: Arc<FakeApi>, download_dir: PathBuf) -> SharedState {
        let config = Config::from_lookup(|key| match key {
            "DOWNLOAD_DIR" => Some(download_dir.display().to_string()),
            _ => None,
        })
        .unwrap();
        Arc::new(AppState::new(api, SessionStore::new(), Arc::new(SessionStore::new()), &config))
    }

    #[tokio::test]
    async fn test_insight_is_session_cached() {
        let api = Arc::new(FakeApi::new());
        let state = make_state(api.clone(), PathBuf::from("."));

        assert_eq!(state.insight().await.unwrap(), "Markets are calm.");
        assert_eq!(state.insight().await.unwrap(), "Markets are calm.");
        assert_eq!(api.insight_calls.load(Ordering::SeqCst), 1);

        state.cache.clear().unwrap();
        state.insight().await.unwrap();
        assert_eq!(api.insight_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_toggle_resolves_unknown_symbol() {
        let api = Arc::new(FakeApi::new());
        api.with_analyzed(record("NVDA", 120.0));
        let state = make_state(api, PathBuf::from("."));

        let view = state.dispatch(Intent::TogglePortfolio { symbol: "NVDA".into() }).await.unwrap();
        assert_eq!(view.portfolio.len(), 1);

        // unknown to the working set and to the API: no-op
        let view = state.dispatch(Intent::TogglePortfolio { symbol: "ZZZZ".into() }).await.unwrap();
        assert_eq!(view.portfolio.len(), 1);
    }

    #[tokio::test]
    async fn test_export_success_saves_file() {
        let dir = tempfile::tempdir().unwrap();
        let state = make_state(Arc::new(FakeApi::new()), dir.path().to_path_buf());
        let mut rx = state.broadcast_tx.subscribe();

        let view = state.dispatch(Intent::Export { period: ExportPeriod::Monthly }).await.unwrap();

        let expected = dir.path().join("wolfee_market_analysis_monthly.xlsx");
        assert_eq!(view.export, ExportStatus::Succeeded { path: expected.clone() });
        assert!(expected.exists());

        let running: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(running["status"]["state"], "running");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_export_reverts_to_idle() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(FakeApi::new());
        api.set_export(Err(FetchError::Network("HTTP 500".into())));
        let state = make_state(api, dir.path().to_path_buf());

        let view = state.dispatch(Intent::Export { period: ExportPeriod::Daily }).await.unwrap();
        assert!(matches!(view.export, ExportStatus::Failed { .. }));

        tokio::time::sleep(state.export_reset + Duration::from_millis(10)).await;
        assert_eq!(state.view().await.export, ExportStatus::Idle);
    }

    #[tokio::test]
    async fn test_refresh_reloads_from_network() {
        let api = Arc::new(FakeApi::new());
        api.push_quick(Reply::ok(vec![record("AAA", 10.0)]));
        api.push_quick(Reply::ok(vec![record("CCC", 1.0)]));
        let state = make_state(api.clone(), PathBuf::from("."));

        pipeline::load(&state).await;
        let view = state.dispatch(Intent::Refresh).await.unwrap();

        assert_eq!(api.quick_calls.load(Ordering::SeqCst), 2);
        assert_eq!(view.epoch, 1);
        assert_eq!(view.total, 1);
        assert!(state.dashboard.read().await.working_set().contains("CCC"));
    }

    #[tokio::test]
    async fn test_retry_after_degraded_quick_refetches() {
        let api = Arc::new(FakeApi::new());
        api.push_quick(Reply::ok(vec![]));
        api.push_full(Reply::err(FetchError::Network("HTTP 503".into())));
        api.push_quick(Reply::ok(vec![record("AAA", 10.0)]));
        let state = make_state(api.clone(), PathBuf::from("."));

        pipeline::load(&state).await.unwrap().await.unwrap();
        assert!(matches!(state.view().await.status, LoadStatus::Degraded { .. }));

        let view = state.dispatch(Intent::Retry).await.unwrap();
        assert_eq!(api.quick_calls.load(Ordering::SeqCst), 2);
        assert_eq!(view.total, 1);

        // not degraded anymore: nothing to retry
        state.dispatch(Intent::Retry).await.unwrap();
        assert_eq!(api.quick_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_seeds_from_fresh_cache() {
        let api = Arc::new(FakeApi::new());
        api.push_quick(Reply::err(FetchError::Network("HTTP 502".into())));
        api.push_full(Reply::err(FetchError::Network("HTTP 503".into())));
        let state = make_state(api.clone(), PathBuf::from("."));

        pipeline::load(&state).await.unwrap().await.unwrap();
        let snapshot = Snapshot::new(vec![record("AAA", 10.0), record("BBB", 5.0)], Provenance::Full);
        state.cache.write(CacheKey::MarketData, &snapshot).unwrap();
        let mut rx = state.broadcast_tx.subscribe();

        let view = state.dispatch(Intent::Retry).await.unwrap();
        assert_eq!(view.total, 2);
        assert_eq!(api.quick_calls.load(Ordering::SeqCst), 1);
        assert_eq!(api.full_calls.load(Ordering::SeqCst), 1);

        let loaded: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(loaded["event"], "SNAPSHOT_LOADED");
        assert_eq!(loaded["from_cache"], true);
    }
}
