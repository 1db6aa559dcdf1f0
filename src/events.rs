//! # events
//!
//! Defines [`DashboardEvent`]: every event the dashboard pushes to the
//! browser over `/ws/monitor`.
//!
//! Events are serialised to a JSON `String` before going into the
//! `tokio::sync::broadcast` channel, so the channel never needs `Clone` on
//! anything heavier than a string.

use serde::Serialize;

use crate::export::ExportStatus;
use crate::models::{Provenance, Record};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DashboardEvent {
    /// A baseline snapshot replaced the working set (quick stage or cache).
    SnapshotLoaded {
        provenance: Provenance,
        count:      usize,
        from_cache: bool,
    },

    /// Newly seen records from a later stage: render these incrementally.
    RecordsAppended {
        records: Vec<Record>,
    },

    /// The quick stage failed; the grid is empty and shows a retry button.
    StageFailed {
        stage: Provenance,
        error: String,
    },

    /// Explicit refresh: working set dropped, session caches cleared.
    SessionReset {
        epoch: u64,
    },

    PortfolioChanged {
        symbol: String,
        held:   bool,
    },

    ExportChanged {
        status: ExportStatus,
    },
}

impl DashboardEvent {
    /// JSON string for the WebSocket text frame.
    #[inline]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"event":"SERIALIZATION_ERROR"}"#.to_string())
    }

    pub fn name(&self) -> &'static str {
        match self {
            DashboardEvent::SnapshotLoaded { .. } => "SNAPSHOT_LOADED",
            DashboardEvent::RecordsAppended { .. } => "RECORDS_APPENDED",
            DashboardEvent::StageFailed { .. } => "STAGE_FAILED",
            DashboardEvent::SessionReset { .. } => "SESSION_RESET",
            DashboardEvent::PortfolioChanged { .. } => "PORTFOLIO_CHANGED",
            DashboardEvent::ExportChanged { .. } => "EXPORT_CHANGED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_tag_matches_name() {
        let event = DashboardEvent::SessionReset { epoch: 3 };
        let json: serde_json::Value = serde_json::from_str(&event.to_json()).unwrap();
        assert_eq!(json["event"], event.name());
        assert_eq!(json["epoch"], 3);
    }
}
