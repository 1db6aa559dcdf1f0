//! # dashboard
//!
//! The explicit application state of one dashboard session, plus the single
//! transition function that every user action goes through.
//!
//! ```text
//!  user action ──▶ Intent ──▶ Dashboard::update ──▶ (next state, Option<Effect>)
//!                                   │
//!                                   └─▶ outbox: DashboardEvent … ──▶ broadcast
//!
//!  render      ◀── Dashboard::view()   (pure projection, never mutates)
//! ```
//!
//! Effects (network work) are carried out by the coordinator in
//! [`crate::state::AppState`], which feeds the results back through the
//! `seed` / `merge` / `adopt_resolved` / `finish_export` methods below.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::engine::filter::{filter, FilterRanges};
use crate::engine::merge::WorkingSet;
use crate::engine::search::{search, SearchOutcome};
use crate::error::{AppError, FetchError, StorageError};
use crate::events::DashboardEvent;
use crate::export::{ExportPeriod, ExportRequest, ExportStatus};
use crate::models::{Provenance, Record, Region, Snapshot};
use crate::portfolio::{PortfolioEntry, PortfolioStore, Toggled};

// ─── Intent / Effect ──────────────────────────────────────────────────────────

/// Everything a user can ask the dashboard to do.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    SelectRegion { region: Region },
    ApplyFilters { ranges: FilterRanges },
    ClearFilters,
    Search { query: String },
    /// Open (`Some`) or close (`None`) the detail view.
    Select { symbol: Option<String> },
    TogglePortfolio { symbol: String },
    RemoveFromPortfolio { symbol: String },
    Refresh,
    /// Re-run the pipeline after a failed quick stage, keeping the session.
    Retry,
    Export { period: ExportPeriod },
    ExportPortfolio { period: ExportPeriod },
}

/// Work `update` cannot do synchronously.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Clear session caches and re-run the pipeline for `epoch`.
    Reload { epoch: u64 },
    /// Re-run the pipeline for `epoch` without touching the cache.
    Retry { epoch: u64 },
    /// Fetch the record for a symbol not in the working set, then adopt it.
    Resolve { symbol: String },
    /// Download the workbook; `ticket` identifies this export attempt.
    Export { request: ExportRequest, ticket: u64 },
}

// ─── Status ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoadStatus {
    Loading,
    Ready {
        provenance:  Provenance,
        captured_at: DateTime<Utc>,
    },
    /// Quick stage failed: empty grid with a retry affordance.
    Degraded { error: String },
}

// ─── View ─────────────────────────────────────────────────────────────────────

/// What the browser renders.  Built fresh on every call.
#[derive(Debug, Clone, Serialize)]
pub struct View {
    pub epoch:     u64,
    pub status:    LoadStatus,
    pub region:    Region,
    pub ranges:    FilterRanges,
    pub filtered:  bool,
    /// Size of the whole working set, all regions.
    pub total:     usize,
    pub records:   Vec<Record>,
    /// `None` = search not active (empty query).
    pub search:    Option<SearchOutcome>,
    pub selected:  Option<Record>,
    pub portfolio: Vec<PortfolioEntry>,
    pub export:    ExportStatus,
}

// ─── Dashboard ────────────────────────────────────────────────────────────────

pub struct Dashboard {
    /// Bumped on every explicit refresh; pipeline results from an older
    /// epoch are discarded.
    epoch:         u64,
    working_set:   WorkingSet,
    status:        LoadStatus,
    region:        Region,
    ranges:        FilterRanges,
    query:         String,
    selected:      Option<String>,
    portfolio:     PortfolioStore,
    export:        ExportStatus,
    export_ticket: u64,
    outbox:        Vec<DashboardEvent>,
}

impl Dashboard {
    pub fn new(portfolio: PortfolioStore) -> Self {
        Self {
            epoch:         0,
            working_set:   WorkingSet::new(),
            status:        LoadStatus::Loading,
            region:        Region::default(),
            ranges:        FilterRanges::default(),
            query:         String::new(),
            selected:      None,
            portfolio,
            export:        ExportStatus::Idle,
            export_ticket: 0,
            outbox:        Vec::new(),
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn working_set(&self) -> &WorkingSet {
        &self.working_set
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn portfolio(&self) -> &PortfolioStore {
        &self.portfolio
    }

    pub fn export_status(&self) -> &ExportStatus {
        &self.export
    }

    /// Events produced since the last call, oldest first.
    pub fn take_events(&mut self) -> Vec<DashboardEvent> {
        std::mem::take(&mut self.outbox)
    }

    // ── Update ────────────────────────────────────────────────────────────────

    /// Apply one intent.  Returns the effect the coordinator must run, if any.
    pub fn update(&mut self, intent: Intent) -> Result<Option<Effect>, AppError> {
        debug!(?intent, "Dashboard intent");

        match intent {
            Intent::SelectRegion { region } => {
                self.region = region;
                Ok(None)
            }
            Intent::ApplyFilters { ranges } => {
                self.ranges = ranges;
                Ok(None)
            }
            Intent::ClearFilters => {
                self.ranges = FilterRanges::default();
                Ok(None)
            }
            Intent::Search { query } => {
                self.query = query;
                Ok(None)
            }
            Intent::Select { symbol } => {
                self.selected = symbol;
                Ok(None)
            }
            Intent::TogglePortfolio { symbol } => {
                let working_set = &self.working_set;
                let toggled = self.portfolio.toggle(&symbol, |s| working_set.get(s).cloned())?;

                match toggled {
                    Toggled::Unresolved => Ok(Some(Effect::Resolve { symbol })),
                    Toggled::Added | Toggled::Removed => {
                        let held = toggled == Toggled::Added;
                        self.outbox.push(DashboardEvent::PortfolioChanged { symbol, held });
                        Ok(None)
                    }
                }
            }
            Intent::RemoveFromPortfolio { symbol } => {
                if self.portfolio.remove(&symbol)? {
                    self.outbox.push(DashboardEvent::PortfolioChanged { symbol, held: false });
                }
                Ok(None)
            }
            Intent::Refresh => {
                let epoch = self.reset();
                Ok(Some(Effect::Reload { epoch }))
            }
            Intent::Retry => {
                if !matches!(self.status, LoadStatus::Degraded { .. }) {
                    return Ok(None);
                }
                self.status = LoadStatus::Loading;
                Ok(Some(Effect::Retry { epoch: self.epoch }))
            }
            Intent::Export { period } => {
                let request = ExportRequest::Market { period };
                Ok(Some(self.begin_export(request)))
            }
            Intent::ExportPortfolio { period } => {
                let request = ExportRequest::portfolio(self.portfolio.symbols(), period)?;
                Ok(Some(self.begin_export(request)))
            }
        }
    }

    // ── Pipeline Feedback ─────────────────────────────────────────────────────

    /// Drop the working set and start a new epoch.  Filters, region, search
    /// and portfolio survive; the detail selection does not.
    pub fn reset(&mut self) -> u64 {
        self.epoch += 1;
        self.working_set.clear();
        self.status = LoadStatus::Loading;
        self.selected = None;

        info!(epoch = self.epoch, "🔄 Session reset");
        self.outbox.push(DashboardEvent::SessionReset { epoch: self.epoch });
        self.epoch
    }

    /// Replace the working set with a baseline snapshot.
    pub fn seed(&mut self, snapshot: &Snapshot, from_cache: bool) {
        self.working_set = WorkingSet::from_snapshot(snapshot);
        self.status = LoadStatus::Ready {
            provenance:  snapshot.provenance,
            captured_at: snapshot.captured_at,
        };

        self.outbox.push(DashboardEvent::SnapshotLoaded {
            provenance: snapshot.provenance,
            count: self.working_set.len(),
            from_cache,
        });
    }

    /// Merge a later snapshot; returns the delta of newly seen records.
    pub fn merge(&mut self, snapshot: &Snapshot) -> Vec<Record> {
        let delta = self.working_set.merge(&snapshot.records);
        self.status = LoadStatus::Ready {
            provenance:  snapshot.provenance,
            captured_at: snapshot.captured_at,
        };

        if !delta.is_empty() {
            self.outbox.push(DashboardEvent::RecordsAppended { records: delta.clone() });
        }
        delta
    }

    /// The quick stage failed.  Only the status changes.
    pub fn degrade(&mut self, stage: Provenance, err: &FetchError) {
        self.status = LoadStatus::Degraded { error: err.to_string() };
        self.outbox.push(DashboardEvent::StageFailed { stage, error: err.to_string() });
    }

    /// Working set as a cacheable snapshot.
    pub fn to_snapshot(&self, provenance: Provenance, captured_at: DateTime<Utc>) -> Snapshot {
        Snapshot {
            records: self.working_set.records().to_vec(),
            captured_at,
            provenance,
        }
    }

    /// Finish a [`Effect::Resolve`].  `None` (resolution failed) is a no-op.
    pub fn adopt_resolved(&mut self, symbol: &str, record: Option<Record>) -> Result<Toggled, StorageError> {
        if self.portfolio.contains(symbol) {
            return Ok(Toggled::Added);
        }

        let toggled = self.portfolio.toggle(symbol, |_| record)?;
        if toggled == Toggled::Added {
            self.outbox.push(DashboardEvent::PortfolioChanged {
                symbol: symbol.to_string(),
                held:   true,
            });
        }
        Ok(toggled)
    }

    // ── Export Lifecycle ──────────────────────────────────────────────────────

    fn begin_export(&mut self, request: ExportRequest) -> Effect {
        self.export_ticket += 1;
        self.set_export(ExportStatus::Running { file_name: request.file_name() });
        Effect::Export { request, ticket: self.export_ticket }
    }

    /// Record the outcome of export `ticket`; stale tickets are ignored.
    pub fn finish_export(&mut self, ticket: u64, status: ExportStatus) {
        if ticket == self.export_ticket {
            self.set_export(status);
        }
    }

    /// Revert a failed export `ticket` to idle.  Returns whether it did.
    pub fn clear_failed_export(&mut self, ticket: u64) -> bool {
        if ticket == self.export_ticket && matches!(self.export, ExportStatus::Failed { .. }) {
            self.set_export(ExportStatus::Idle);
            true
        } else {
            false
        }
    }

    fn set_export(&mut self, status: ExportStatus) {
        self.export = status.clone();
        self.outbox.push(DashboardEvent::ExportChanged { status });
    }

    // ── View ──────────────────────────────────────────────────────────────────

    pub fn view(&self) -> View {
        let records = self.working_set.records();

        let search = (!self.query.trim().is_empty())
            .then(|| search(records, self.region, &self.query));

        let selected = self.selected.as_deref().and_then(|symbol| {
            self.working_set.get(symbol).cloned().or_else(|| {
                self.portfolio
                    .list()
                    .iter()
                    .find(|e| e.record.symbol == symbol)
                    .map(|e| e.record.clone())
            })
        });

        View {
            epoch:     self.epoch,
            status:    self.status.clone(),
            region:    self.region,
            ranges:    self.ranges,
            filtered:  !self.ranges.is_unbounded(),
            total:     self.working_set.len(),
            records:   filter(records, self.region, &self.ranges),
            search,
            selected,
            portfolio: self.portfolio.list().to_vec(),
            export:    self.export.clone(),
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
