//! # models::record
//!
//! Defines [`Record`], one tradable instrument's snapshot as published by the
//! analytics API, and the raw wire form it is parsed from.
//!
//! The API is loose about field names and number encodings.  All of that
//! slack is absorbed in [`RawRecord::into_record`], which applies a single
//! declared resolution order per attribute:
//!
//! | Attribute       | Resolution order                                   |
//! |-----------------|----------------------------------------------------|
//! | name            | `name` → `symbol`                                  |
//! | price           | `price` → `current_price` → *record dropped*       |
//! | change %        | `change_pct` → `change` → `0.0`                    |
//! | currency        | `currency` → region default (`TRY` / `USD`)        |
//! | RSI             | `rsi` → `rsi_14` → absent                          |
//! | moving average  | `ma_20` → `ma20` → `moving_average` → absent       |
//! | volume          | `volume` → absent                                  |
//! | volatility      | `volatility` (label or %) → absent                 |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Symbol suffix that marks a Borsa Istanbul listing.
pub const DOMESTIC_SUFFIX: &str = ".IS";

/// Rendered in place of an indicator the API did not provide.
pub const PLACEHOLDER: &str = "-";

// ─── Region ───────────────────────────────────────────────────────────────────

/// Market region, derived structurally from the symbol.  Never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    Domestic,
    Global,
}

impl Region {
    /// Total predicate: `.IS` suffix ⇒ domestic, anything else ⇒ global.
    #[inline]
    pub fn of(symbol: &str) -> Self {
        if symbol.ends_with(DOMESTIC_SUFFIX) {
            Region::Domestic
        } else {
            Region::Global
        }
    }

    #[inline]
    pub fn contains(self, symbol: &str) -> bool {
        Region::of(symbol) == self
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Domestic => write!(f, "domestic"),
            Region::Global => write!(f, "global"),
        }
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "domestic" | "bist" | "tr" => Ok(Region::Domestic),
            "global" | "us" | "world" => Ok(Region::Global),
            other => Err(format!("unknown region '{other}'. Use 'domestic' or 'global'")),
        }
    }
}

// ─── Currency ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Try,
    Usd,
}

impl Currency {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "TRY" | "TL" | "₺" => Some(Currency::Try),
            "USD" | "$" => Some(Currency::Usd),
            _ => None,
        }
    }

    fn default_for(region: Region) -> Self {
        match region {
            Region::Domestic => Currency::Try,
            Region::Global => Currency::Usd,
        }
    }

    pub fn sign(self) -> &'static str {
        match self {
            Currency::Try => "₺",
            Currency::Usd => "$",
        }
    }
}

// ─── Indicators ───────────────────────────────────────────────────────────────

/// Volatility bucket shown on the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Volatility {
    Low,
    Medium,
    High,
}

impl Volatility {
    /// Bucket a volatility percentage: `< 2` low, `< 4` medium, else high.
    pub fn from_pct(pct: f64) -> Self {
        if pct < 2.0 {
            Volatility::Low
        } else if pct < 4.0 {
            Volatility::Medium
        } else {
            Volatility::High
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        if let Some(label) = value.as_str() {
            match label.trim().to_ascii_lowercase().as_str() {
                "low" | "düşük" => return Some(Volatility::Low),
                "medium" | "orta" => return Some(Volatility::Medium),
                "high" | "yüksek" => return Some(Volatility::High),
                _ => {}
            }
        }
        number(value).map(Volatility::from_pct)
    }
}

impl fmt::Display for Volatility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Volatility::Low => write!(f, "low"),
            Volatility::Medium => write!(f, "medium"),
            Volatility::High => write!(f, "high"),
        }
    }
}

/// Technical indicators; any of them may be missing for a given record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    pub moving_average: Option<f64>,
    pub rsi:            Option<f64>,
    pub volatility:     Option<Volatility>,
    pub volume:         Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorKind {
    MovingAverage,
    Rsi,
    Volatility,
    Volume,
}

impl Indicators {
    /// Display text for one indicator, [`PLACEHOLDER`] when absent.
    pub fn label(&self, kind: IndicatorKind) -> String {
        let text = match kind {
            IndicatorKind::MovingAverage => self.moving_average.map(|v| format!("{v:.2}")),
            IndicatorKind::Rsi => self.rsi.map(|v| format!("{v:.1}")),
            IndicatorKind::Volatility => self.volatility.map(|v| v.to_string()),
            IndicatorKind::Volume => self.volume.map(|v| format!("{v:.0}")),
        };
        text.unwrap_or_else(|| PLACEHOLDER.to_string())
    }
}

// ─── Record ───────────────────────────────────────────────────────────────────

/// One instrument snapshot.  Immutable once received: a later snapshot with
/// the same symbol replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Identity key, case-sensitive, e.g. `"AKBNK.IS"`, `"AAPL"`, `"GC=F"`.
    pub symbol: String,

    pub name: String,

    pub price: f64,

    pub currency: Currency,

    /// Percent change since the prior close (signed).
    pub change_pct: f64,

    #[serde(default)]
    pub indicators: Indicators,

    /// Free-text model verdict, passed through for display and export.
    #[serde(default)]
    pub prediction: Option<String>,
}

impl Record {
    #[inline]
    pub fn region(&self) -> Region {
        Region::of(&self.symbol)
    }

    pub fn price_label(&self) -> String {
        format!("{}{:.2}", self.currency.sign(), self.price)
    }
}

// ─── Wire Form ────────────────────────────────────────────────────────────────

/// Lenient shape of a record element in any API response.
#[derive(Debug, Default, Deserialize)]
pub struct RawRecord {
    symbol: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    price: Option<Value>,
    #[serde(default)]
    current_price: Option<Value>,
    #[serde(default)]
    change_pct: Option<Value>,
    #[serde(default)]
    change: Option<Value>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    rsi: Option<Value>,
    #[serde(default)]
    rsi_14: Option<Value>,
    #[serde(default)]
    ma_20: Option<Value>,
    #[serde(default)]
    ma20: Option<Value>,
    #[serde(default)]
    moving_average: Option<Value>,
    #[serde(default)]
    volatility: Option<Value>,
    #[serde(default)]
    volume: Option<Value>,
    #[serde(default)]
    prediction: Option<String>,
}

impl RawRecord {
    /// Resolve the wire form into a [`Record`].  `None` means the element is
    /// unusable (no symbol or no price) and must be dropped.
    pub fn into_record(self) -> Option<Record> {
        let symbol = self.symbol.trim().to_string();
        if symbol.is_empty() {
            return None;
        }

        let price = first_number(&[&self.price, &self.current_price])?;
        let region = Region::of(&symbol);

        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| symbol.clone());

        let currency = self
            .currency
            .as_deref()
            .and_then(Currency::parse)
            .unwrap_or_else(|| Currency::default_for(region));

        let indicators = Indicators {
            moving_average: first_number(&[&self.ma_20, &self.ma20, &self.moving_average]),
            rsi:            first_number(&[&self.rsi, &self.rsi_14]),
            volatility:     self.volatility.as_ref().and_then(Volatility::from_value),
            volume:         first_number(&[&self.volume]),
        };

        Some(Record {
            symbol,
            name,
            price,
            currency,
            change_pct: first_number(&[&self.change_pct, &self.change]).unwrap_or(0.0),
            indicators,
            prediction: self.prediction.filter(|p| !p.trim().is_empty()),
        })
    }
}

/// Parse one JSON element into a [`Record`], `None` if it is unusable.
pub fn parse_record(value: Value) -> Option<Record> {
    serde_json::from_value::<RawRecord>(value)
        .ok()
        .and_then(RawRecord::into_record)
}

/// JSON number or numeric string; non-finite values count as absent.
pub(crate) fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn first_number(candidates: &[&Option<Value>]) -> Option<f64> {
    candidates
        .iter()
        .filter_map(|c| (*c).as_ref())
        .find_map(number)
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_region_from_suffix() {
        assert_eq!(Region::of("AKBNK.IS"), Region::Domestic);
        assert_eq!(Region::of("AAPL"), Region::Global);
        assert_eq!(Region::of("GC=F"), Region::Global);
        // suffix match is case-sensitive like the symbol itself
        assert_eq!(Region::of("akbnk.is"), Region::Global);
    }

    #[test]
    fn test_region_parse() {
        assert_eq!("BIST".parse::<Region>(), Ok(Region::Domestic));
        assert_eq!(" global ".parse::<Region>(), Ok(Region::Global));
        assert!("mars".parse::<Region>().is_err());
    }

    #[test]
    fn test_full_record_parses() {
        let record = parse_record(json!({
            "symbol": "THYAO.IS",
            "name": "Turk Hava Yollari",
            "price": 285.5,
            "change_pct": -1.25,
            "rsi": 61.2,
            "ma_20": 279.0,
            "volatility": "high",
            "volume": 18500000,
            "prediction": "YUKSELIS"
        }))
        .unwrap();

        assert_eq!(record.symbol, "THYAO.IS");
        assert_eq!(record.currency, Currency::Try);
        assert_eq!(record.change_pct, -1.25);
        assert_eq!(record.indicators.rsi, Some(61.2));
        assert_eq!(record.indicators.moving_average, Some(279.0));
        assert_eq!(record.indicators.volatility, Some(Volatility::High));
        assert_eq!(record.indicators.volume, Some(18_500_000.0));
        assert_eq!(record.prediction.as_deref(), Some("YUKSELIS"));
    }

    #[test]
    fn test_resolution_order_fallbacks() {
        let record = parse_record(json!({
            "symbol": "MSFT",
            "current_price": "412.30",
            "change": "0.8%",
            "rsi_14": 48.0,
            "moving_average": 405.1,
            "volatility": 3.1
        }))
        .unwrap();

        assert_eq!(record.name, "MSFT");
        assert_eq!(record.price, 412.30);
        assert_eq!(record.change_pct, 0.8);
        assert_eq!(record.currency, Currency::Usd);
        assert_eq!(record.indicators.rsi, Some(48.0));
        assert_eq!(record.indicators.moving_average, Some(405.1));
        assert_eq!(record.indicators.volatility, Some(Volatility::Medium));
        assert_eq!(record.indicators.volume, None);
    }

    #[test]
    fn test_missing_or_bad_price_drops_record() {
        assert!(parse_record(json!({ "symbol": "AAPL" })).is_none());
        assert!(parse_record(json!({ "symbol": "AAPL", "price": "n/a" })).is_none());
        assert!(parse_record(json!({ "symbol": "  ", "price": 1.0 })).is_none());
        assert!(parse_record(json!({ "price": 1.0 })).is_none());
    }

    #[test]
    fn test_null_indicators_stay_absent() {
        let record = parse_record(json!({
            "symbol": "GC=F", "price": 2350.0, "rsi": null, "volume": "NaN"
        }))
        .unwrap();
        assert_eq!(record.indicators, Indicators::default());
        assert_eq!(record.change_pct, 0.0);
    }

    #[test]
    fn test_absent_indicator_renders_placeholder() {
        let indicators = Indicators { rsi: Some(55.04), ..Default::default() };
        assert_eq!(indicators.label(IndicatorKind::Rsi), "55.0");
        assert_eq!(indicators.label(IndicatorKind::Volume), PLACEHOLDER);
        assert_eq!(indicators.label(IndicatorKind::Volatility), PLACEHOLDER);
    }

    #[test]
    fn test_volatility_buckets() {
        assert_eq!(Volatility::from_pct(1.99), Volatility::Low);
        assert_eq!(Volatility::from_pct(2.0), Volatility::Medium);
        assert_eq!(Volatility::from_pct(4.0), Volatility::High);
    }
}
