//! # models::market
//!
//! Secondary payloads of the analytics API: opportunities, OHLC candles for
//! the detail chart, and the chart range selector.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::record::Record;

/// A pre-ranked record with the reason it was picked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub record: Record,
    /// Classification string from the API, e.g. `"oversold"`.
    pub reason: String,
}

/// One OHLC bar.  `time` is kept as the API formats it
/// (`%Y-%m-%d` or `%Y-%m-%d %H:%M` for intraday).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time:  String,
    pub open:  f64,
    pub high:  f64,
    pub low:   f64,
    pub close: f64,
}

/// Range buttons on the detail chart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartRange {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1mo")]
    OneMonth,
    #[default]
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "5y")]
    FiveYears,
}

impl ChartRange {
    pub fn as_str(self) -> &'static str {
        match self {
            ChartRange::OneDay => "1d",
            ChartRange::OneMonth => "1mo",
            ChartRange::OneYear => "1y",
            ChartRange::FiveYears => "5y",
        }
    }
}

impl fmt::Display for ChartRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1d" => Ok(ChartRange::OneDay),
            "1mo" => Ok(ChartRange::OneMonth),
            "1y" => Ok(ChartRange::OneYear),
            "5y" => Ok(ChartRange::FiveYears),
            other => Err(format!("unknown chart range '{other}'. Use 1d, 1mo, 1y or 5y")),
        }
    }
}
