//! # engine::pipeline
//!
//! **Fetch Pipeline**: two sequential stages feeding the Working Set.
//!
//! ```text
//!  load()
//!    │
//!    ├─ cache fresh? ── yes ──▶ seed from cached snapshot, no network at all
//!    │
//!    ▼ no
//!  [1] quick stage  (bounded subset, QUICK_TIMEOUT budget, aborted on expiry)
//!    │   ok   → cache + seed Working Set
//!    │   err  → Degraded (empty grid), retried only on Intent::Retry
//!    ▼   (either way)
//!  [2] full stage   (spawned, no timeout, not cancellable)
//!        ok   → merge, emit delta, cache merged set as "full"
//!        err  → logged only; Working Set and cache untouched
//! ```
//!
//! Every stage result is applied under the dashboard write guard and only if
//! the session epoch it started in is still current; an explicit refresh in
//! between makes the result stale and it is dropped.

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::CacheKey;
use crate::error::{FetchError, StorageError};
use crate::models::{Provenance, Snapshot};
use crate::state::SharedState;

// ─── Load ─────────────────────────────────────────────────────────────────────

/// Run the pipeline for the current epoch.  Returns the handle of the
/// spawned full stage, or `None` when the cache was used.
pub async fn load(state: &SharedState) -> Option<JoinHandle<()>> {
    let epoch = state.dashboard.read().await.epoch();

    // ── Cache bypass ──────────────────────────────────────────────────────────
    if let Some(snapshot) = state.cache.read::<Snapshot>(CacheKey::MarketData) {
        let mut dashboard = state.dashboard.write().await;
        if dashboard.epoch() != epoch {
            return None;
        }

        info!(records = snapshot.len(), provenance = %snapshot.provenance, "⚡ Seeded from session cache");
        dashboard.seed(&snapshot, true);
        state.publish(&mut dashboard);
        return None;
    }

    // ── [1] Quick stage ───────────────────────────────────────────────────────
    let quick = quick_stage(state).await;

    {
        let mut dashboard = state.dashboard.write().await;
        if dashboard.epoch() != epoch {
            debug!(epoch, "Quick stage result is stale — dropped");
            return None;
        }

        match quick {
            Ok(snapshot) => {
                if let Err(e) = state.cache.write(CacheKey::MarketData, &snapshot) {
                    warn!(error = %e, "Could not cache quick snapshot");
                }
                dashboard.seed(&snapshot, false);
            }
            Err(e) => {
                warn!(error = %e, "⚠️ Quick stage failed — dashboard degraded");
                dashboard.degrade(Provenance::Quick, &e);
            }
        }
        state.publish(&mut dashboard);
    }

    // ── [2] Full stage ────────────────────────────────────────────────────────
    Some(spawn_full_stage(state.clone(), epoch))
}

/// Clear every session cache key, then [`load`] from the network.
pub async fn reload(state: &SharedState) -> Result<Option<JoinHandle<()>>, StorageError> {
    {
        // Stage results are cached under this guard; clear under it too.
        let _dashboard = state.dashboard.write().await;
        state.cache.clear()?;
    }
    Ok(load(state).await)
}

// ─── Stages ───────────────────────────────────────────────────────────────────

async fn quick_stage(state: &SharedState) -> Result<Snapshot, FetchError> {
    let budget = state.quick_timeout;
    debug!(budget_secs = budget.as_secs(), "Quick stage started");

    // Dropping the future on expiry aborts the in-flight request.
    let records = tokio::time::timeout(budget, state.api.quick_batch())
        .await
        .map_err(|_| FetchError::Timeout(budget))??;

    if records.is_empty() {
        return Err(FetchError::EmptyResult);
    }

    info!(records = records.len(), "✅ Quick stage done");
    Ok(Snapshot::new(records, Provenance::Quick))
}

fn spawn_full_stage(state: SharedState, epoch: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!(epoch, "Full stage started");

        let result = state.api.full_batch().await.and_then(|records| {
            if records.is_empty() {
                Err(FetchError::EmptyResult)
            } else {
                Ok(Snapshot::new(records, Provenance::Full))
            }
        });

        let mut dashboard = state.dashboard.write().await;
        if dashboard.epoch() != epoch {
            info!(epoch, current = dashboard.epoch(), "Full stage finished after refresh — discarded");
            return;
        }

        match result {
            Ok(snapshot) => {
                let delta = dashboard.merge(&snapshot);
                let merged = dashboard.to_snapshot(Provenance::Full, snapshot.captured_at);

                if let Err(e) = state.cache.write(CacheKey::MarketData, &merged) {
                    warn!(error = %e, "Could not cache full snapshot");
                }
                info!(received = snapshot.len(), new = delta.len(), total = merged.len(), "✅ Full stage merged");
            }
            Err(e) => {
                warn!(error = %e, "Full stage failed — keeping current data");
            }
        }
        state.publish(&mut dashboard);
    })
}

// ─── Tests ────────────────────────────────────────────────────────────────────
