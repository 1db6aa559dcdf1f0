//! # models::snapshot
//!
//! A [`Snapshot`] is one fetch result: the ordered records of a pipeline
//! stage, stamped with when and by which stage it was captured.  Snapshots
//! are the unit written to the session cache.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::Record;

/// Which pipeline stage produced a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Bounded subset, hard time budget.
    Quick,
    /// Complete universe, best-effort.
    Full,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Quick => write!(f, "quick"),
            Provenance::Full => write!(f, "full"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub records:     Vec<Record>,
    pub captured_at: DateTime<Utc>,
    pub provenance:  Provenance,
}

impl Snapshot {
    pub fn new(records: Vec<Record>, provenance: Provenance) -> Self {
        Self {
            records,
            captured_at: Utc::now(),
            provenance,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
