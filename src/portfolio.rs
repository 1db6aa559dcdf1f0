//! # portfolio: Client-local Portfolio Store
//!
//! A small persisted list of record snapshots the user picked, keyed by
//! symbol.  Entries are copies taken at add-time, not live references into
//! the working set.  The list is user-owned: refresh never clears it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::StorageError;
use crate::models::Record;
use crate::storage::KeyValueStore;

/// Fixed key of the portfolio list in the local store.
pub const PORTFOLIO_KEY: &str = "wolfee.portfolio";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioEntry {
    pub record:   Record,
    pub added_at: DateTime<Utc>,
}

/// Result of [`PortfolioStore::toggle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Toggled {
    Added,
    Removed,
    /// Symbol could not be resolved to a record; nothing changed.
    Unresolved,
}

pub struct PortfolioStore {
    store:   Arc<dyn KeyValueStore>,
    entries: Vec<PortfolioEntry>,
}

impl PortfolioStore {
    /// Load the persisted list.  An unreadable list is logged and replaced by
    /// an empty one on the next write.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let entries: Vec<PortfolioEntry> = store
            .get(PORTFOLIO_KEY)
            .and_then(|raw| {
                serde_json::from_str(&raw)
                    .map_err(|e| warn!(error = %e, "Stored portfolio unreadable — starting empty"))
                    .ok()
            })
            .unwrap_or_default();

        Self { store, entries }
    }

    /// Append if absent.  Returns whether the list changed.
    pub fn add(&mut self, record: Record) -> Result<bool, StorageError> {
        if self.contains(&record.symbol) {
            return Ok(false);
        }

        let symbol = record.symbol.clone();
        let mut next = self.entries.clone();
        next.push(PortfolioEntry { record, added_at: Utc::now() });
        self.commit(next)?;

        info!(symbol = %symbol, "⭐ Added to portfolio");
        Ok(true)
    }

    /// Delete if present.  Returns whether the list changed.
    pub fn remove(&mut self, symbol: &str) -> Result<bool, StorageError> {
        if !self.contains(symbol) {
            return Ok(false);
        }

        let next: Vec<PortfolioEntry> = self
            .entries
            .iter()
            .filter(|e| e.record.symbol != symbol)
            .cloned()
            .collect();
        self.commit(next)?;

        info!(symbol, "Removed from portfolio");
        Ok(true)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.entries.iter().any(|e| e.record.symbol == symbol)
    }

    /// Entries in insertion order.
    pub fn list(&self) -> &[PortfolioEntry] {
        &self.entries
    }

    pub fn symbols(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.record.symbol.clone()).collect()
    }

    /// Remove if held, otherwise add the record `resolve` yields.  A failed
    /// resolution is a no-op.
    pub fn toggle(
        &mut self,
        symbol: &str,
        resolve: impl FnOnce(&str) -> Option<Record>,
    ) -> Result<Toggled, StorageError> {
        if self.remove(symbol)? {
            return Ok(Toggled::Removed);
        }

        match resolve(symbol) {
            Some(record) if record.symbol == symbol => {
                self.add(record)?;
                Ok(Toggled::Added)
            }
            Some(record) => {
                warn!(symbol, resolved = %record.symbol, "Resolver returned a different symbol — ignoring");
                Ok(Toggled::Unresolved)
            }
            None => Ok(Toggled::Unresolved),
        }
    }

    /// Persist `next`, then adopt it.  A failed write keeps the old list.
    fn commit(&mut self, next: Vec<PortfolioEntry>) -> Result<(), StorageError> {
        let raw = serde_json::to_string(&next)?;
        self.store.set(PORTFOLIO_KEY, raw)?;
        self.entries = next;
        Ok(())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
