//! # engine::filter
//!
//! **Region / Attribute Filter**: pure projection of the working set.
//!
//! ```text
//! records ──▶ [1] region partition   (.IS suffix ⇒ domestic)
//!         ──▶ [2] closed-interval checks on price / RSI / change % / volume
//!         ──▶ [3] sort policy
//!                 domestic: arrival order (server ranks by relevance)
//!                 global:   symbol ascending
//! ```
//!
//! A bound on an indicator the record does not carry fails; an unset bound
//! always passes.  The input slice is never touched.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{Record, Region};

// ─── Ranges ───────────────────────────────────────────────────────────────────

/// Optional closed bounds.  `None` = unbounded.
///
/// Bounds arrive from form fields, so each one deserializes leniently: a
/// number or a numeric string is taken, anything else leaves it unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterRanges {
    #[serde(default, alias = "price_min", deserialize_with = "lenient_bound")]
    pub price_min:  Option<f64>,
    #[serde(default, alias = "price_max", deserialize_with = "lenient_bound")]
    pub price_max:  Option<f64>,
    #[serde(default, alias = "rsi_min", deserialize_with = "lenient_bound")]
    pub rsi_min:    Option<f64>,
    #[serde(default, alias = "rsi_max", deserialize_with = "lenient_bound")]
    pub rsi_max:    Option<f64>,
    #[serde(default, alias = "change_min", deserialize_with = "lenient_bound")]
    pub change_min: Option<f64>,
    #[serde(default, alias = "change_max", deserialize_with = "lenient_bound")]
    pub change_max: Option<f64>,
    #[serde(default, alias = "volume_min", deserialize_with = "lenient_bound")]
    pub volume_min: Option<f64>,
}

/// Finite number from a loose text field; blank or garbage is `None`.
fn parse_bound(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn lenient_bound<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let bound = match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        serde_json::Value::String(s) => parse_bound(&s),
        _ => None,
    };
    Ok(bound)
}

impl FilterRanges {
    /// Build from loose string parameters (query string, form fields).
    /// Unknown keys are ignored; empty or unparsable values leave the bound
    /// unset.
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let bound = |camel: &str, snake: &str| {
            params
                .get(camel)
                .or_else(|| params.get(snake))
                .and_then(|v| parse_bound(v))
        };

        Self {
            price_min:  bound("priceMin", "price_min"),
            price_max:  bound("priceMax", "price_max"),
            rsi_min:    bound("rsiMin", "rsi_min"),
            rsi_max:    bound("rsiMax", "rsi_max"),
            change_min: bound("changeMin", "change_min"),
            change_max: bound("changeMax", "change_max"),
            volume_min: bound("volumeMin", "volume_min"),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        *self == Self::default()
    }

    /// Every set bound admits the record.
    pub fn admits(&self, record: &Record) -> bool {
        within(Some(record.price), self.price_min, self.price_max)
            && within(record.indicators.rsi, self.rsi_min, self.rsi_max)
            && within(Some(record.change_pct), self.change_min, self.change_max)
            && within(record.indicators.volume, self.volume_min, None)
    }
}

/// `min ≤ value ≤ max`; a missing value passes only when both are unset.
fn within(value: Option<f64>, min: Option<f64>, max: Option<f64>) -> bool {
    if min.is_none() && max.is_none() {
        return true;
    }
    let Some(v) = value else {
        return false;
    };
    min.map_or(true, |lo| v >= lo) && max.map_or(true, |hi| v <= hi)
}

// ─── Filter ───────────────────────────────────────────────────────────────────

/// Region partition of `records` with the partition's sort policy applied.
pub fn partition(records: &[Record], region: Region) -> Vec<Record> {
    let mut selected: Vec<Record> = records
        .iter()
        .filter(|r| region.contains(&r.symbol))
        .cloned()
        .collect();

    if region == Region::Global {
        selected.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    }

    selected
}

/// Records of `region` passing every bound in `ranges`.
pub fn filter(records: &[Record], region: Region, ranges: &FilterRanges) -> Vec<Record> {
    let mut selected = partition(records, region);
    selected.retain(|r| ranges.admits(r));
    selected
}

// ─── Tests ────────────────────────────────────────────────────────────────────
