//! # api: Analytics API client
//!
//! [`MarketApi`] is the seam between the dashboard and the remote analytics
//! service.  [`ApiClient`] is the `reqwest` implementation; tests swap in
//! [`fake::FakeApi`].
//!
//! ## Endpoints consumed
//!
//! | Call              | Path                                              |
//! |-------------------|---------------------------------------------------|
//! | `quick_batch`     | `QUICK_PATH` (default `/api/market-data/quick`)   |
//! | `full_batch`      | `FULL_PATH` (default `/api/market-data/full`)     |
//! | `analyze`         | `/api/analyze/{symbol}`                           |
//! | `insight`         | `/insight`                                        |
//! | `opportunities`   | `/opportunities`                                  |
//! | `history`         | `/api/chart/{symbol}/{range}`                     |
//! | `export`          | `/api/export/{period}` · `/api/export/portfolio`  |
//!
//! No timeouts are set here: the quick-stage budget is enforced by the
//! pipeline, and the full stage is deliberately unbounded.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::FetchError;
use crate::export::ExportRequest;
use crate::models::{parse_record, Candle, ChartRange, Opportunity, Record};

// ─── Trait ────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait MarketApi: Send + Sync {
    /// Bounded subset for the first paint.
    async fn quick_batch(&self) -> Result<Vec<Record>, FetchError>;

    /// Complete instrument universe.
    async fn full_batch(&self) -> Result<Vec<Record>, FetchError>;

    /// Detailed record for one symbol.
    async fn analyze(&self, symbol: &str) -> Result<Record, FetchError>;

    /// Free-text AI market summary.
    async fn insight(&self) -> Result<String, FetchError>;

    async fn opportunities(&self) -> Result<Vec<Opportunity>, FetchError>;

    async fn history(&self, symbol: &str, range: ChartRange) -> Result<Vec<Candle>, FetchError>;

    /// Raw spreadsheet bytes.
    async fn export(&self, request: &ExportRequest) -> Result<Vec<u8>, FetchError>;
}

// ─── Wire Shapes ──────────────────────────────────────────────────────────────

/// `{ stocks: [...], commodities?: [...] }`
#[derive(Debug, Deserialize)]
struct MarketDataResponse {
    stocks:      Vec<Value>,
    #[serde(default)]
    commodities: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct InsightResponse {
    insight: String,
}

#[derive(Debug, Deserialize)]
struct OpportunitiesResponse {
    opportunities: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    history: Vec<Candle>,
}

/// Stocks first, then commodities.  Unusable elements are dropped one by one
/// rather than failing the whole batch.
fn records_from_body(body: &str) -> Result<Vec<Record>, FetchError> {
    let data: MarketDataResponse = serde_json::from_str(body)?;
    let total = data.stocks.len() + data.commodities.len();

    let records: Vec<Record> = data
        .stocks
        .into_iter()
        .chain(data.commodities)
        .filter_map(parse_record)
        .collect();

    if records.len() < total {
        warn!(dropped = total - records.len(), kept = records.len(), "Dropped unusable records");
    }

    Ok(records)
}

fn opportunities_from_body(body: &str) -> Result<Vec<Opportunity>, FetchError> {
    let data: OpportunitiesResponse = serde_json::from_str(body)?;

    Ok(data
        .opportunities
        .into_iter()
        .filter_map(|value| {
            let reason = value
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            parse_record(value).map(|record| Opportunity { record, reason })
        })
        .collect())
}

// ─── ApiClient ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ApiClient {
    client:     reqwest::Client,
    base_url:   String,
    quick_path: String,
    full_path:  String,
}

impl ApiClient {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            base_url:   config.api_base_url.trim_end_matches('/').to_string(),
            quick_path: config.quick_path.clone(),
            full_path:  config.full_path.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Base URL extended by `segments`, each percent-encoded as one path
    /// segment.  Symbols like `GC=F` or `BRK/B` stay a single segment.
    fn segment_url(&self, segments: &[&str]) -> Result<reqwest::Url, FetchError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| FetchError::Network(format!("invalid API base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| FetchError::Network(format!("API base URL cannot take a path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET and return the body text, mapping non-2xx to `Network`.
    async fn get_text(&self, request: reqwest::RequestBuilder) -> Result<String, FetchError> {
        let resp = request.send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Network(format!("HTTP {status}: {body}")));
        }

        Ok(resp.text().await?)
    }

    async fn get_records(&self, path: &str) -> Result<Vec<Record>, FetchError> {
        let url = self.url(path);
        debug!(url = %url, "Fetching market data");
        let body = self.get_text(self.client.get(&url)).await?;
        records_from_body(&body)
    }
}

#[async_trait]
impl MarketApi for ApiClient {
    async fn quick_batch(&self) -> Result<Vec<Record>, FetchError> {
        self.get_records(&self.quick_path).await
    }

    async fn full_batch(&self) -> Result<Vec<Record>, FetchError> {
        self.get_records(&self.full_path).await
    }

    async fn analyze(&self, symbol: &str) -> Result<Record, FetchError> {
        let url = self.segment_url(&["api", "analyze", symbol])?;
        let body = self.get_text(self.client.get(url)).await?;
        let value: Value = serde_json::from_str(&body)?;

        parse_record(value)
            .ok_or_else(|| FetchError::Parse(format!("no usable record for {symbol}")))
    }

    async fn insight(&self) -> Result<String, FetchError> {
        let body = self.get_text(self.client.get(self.url("/insight"))).await?;
        let data: InsightResponse = serde_json::from_str(&body)?;
        Ok(data.insight)
    }

    async fn opportunities(&self) -> Result<Vec<Opportunity>, FetchError> {
        let body = self.get_text(self.client.get(self.url("/opportunities"))).await?;
        opportunities_from_body(&body)
    }

    async fn history(&self, symbol: &str, range: ChartRange) -> Result<Vec<Candle>, FetchError> {
        let url = self.segment_url(&["api", "chart", symbol, range.as_str()])?;
        let body = self.get_text(self.client.get(url)).await?;
        let data: HistoryResponse = serde_json::from_str(&body)?;
        Ok(data.history)
    }

    async fn export(&self, request: &ExportRequest) -> Result<Vec<u8>, FetchError> {
        let builder = match request {
            ExportRequest::Market { period } => {
                self.client.get(self.url(&format!("/api/export/{period}")))
            }
            ExportRequest::Portfolio { symbols, period } => self
                .client
                .get(self.url("/api/export/portfolio"))
                .query(&[("symbols", symbols.join(",")), ("period", period.to_string())]),
        };

        let resp = builder.send().await?;
        if !resp.status().is_success() {
            return Err(FetchError::Network(format!("export rejected: HTTP {}", resp.status())));
        }

        Ok(resp.bytes().await?.to_vec())
    }
}

// ─── Fake (tests) ─────────────────────────────────────────────────────────────

#[cfg(test)]
pub mod fake {
    //! Scripted [`MarketApi`] for pipeline, dashboard and route tests.

    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;
    use tokio::sync::Notify;

    use super::*;
    use crate::models::{Currency, Indicators};

    pub fn record(symbol: &str, price: f64) -> Record {
        Record {
            symbol:     symbol.to_string(),
            name:       symbol.to_string(),
            price,
            currency:   if symbol.ends_with(".IS") { Currency::Try } else { Currency::Usd },
            change_pct: 0.0,
            indicators: Indicators::default(),
            prediction: None,
        }
    }

    /// One scripted reply: optional delay, optional gate to wait on, result.
    pub struct Reply {
        pub delay:  Option<Duration>,
        pub gate:   Option<Arc<Notify>>,
        pub result: Result<Vec<Record>, FetchError>,
    }

    impl Reply {
        pub fn ok(records: Vec<Record>) -> Self {
            Self { delay: None, gate: None, result: Ok(records) }
        }

        pub fn err(err: FetchError) -> Self {
            Self { delay: None, gate: None, result: Err(err) }
        }

        pub fn delayed(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn gated(mut self, gate: Arc<Notify>) -> Self {
            self.gate = Some(gate);
            self
        }

        async fn play(self) -> Result<Vec<Record>, FetchError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(gate) = self.gate {
                gate.notified().await;
            }
            self.result
        }
    }

    #[derive(Default)]
    pub struct FakeApi {
        pub quick:         Mutex<VecDeque<Reply>>,
        pub full:          Mutex<VecDeque<Reply>>,
        pub analyzed:      Mutex<HashMap<String, Record>>,
        pub export_result: Mutex<Option<Result<Vec<u8>, FetchError>>>,
        pub quick_calls:   AtomicUsize,
        pub full_calls:    AtomicUsize,
        pub insight_calls: AtomicUsize,
    }

    impl FakeApi {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_quick(&self, reply: Reply) -> &Self {
            self.quick.lock().push_back(reply);
            self
        }

        pub fn push_full(&self, reply: Reply) -> &Self {
            self.full.lock().push_back(reply);
            self
        }

        pub fn with_analyzed(&self, record: Record) -> &Self {
            self.analyzed.lock().insert(record.symbol.clone(), record);
            self
        }

        pub fn set_export(&self, result: Result<Vec<u8>, FetchError>) {
            *self.export_result.lock() = Some(result);
        }
    }

    #[async_trait]
    impl MarketApi for FakeApi {
        async fn quick_batch(&self) -> Result<Vec<Record>, FetchError> {
            self.quick_calls.fetch_add(1, Ordering::SeqCst);
            let reply = self.quick.lock().pop_front();
            match reply {
                Some(reply) => reply.play().await,
                None => Err(FetchError::Network("no scripted quick reply".into())),
            }
        }

        async fn full_batch(&self) -> Result<Vec<Record>, FetchError> {
            self.full_calls.fetch_add(1, Ordering::SeqCst);
            let reply = self.full.lock().pop_front();
            match reply {
                Some(reply) => reply.play().await,
                None => Err(FetchError::Network("no scripted full reply".into())),
            }
        }

        async fn analyze(&self, symbol: &str) -> Result<Record, FetchError> {
            self.analyzed
                .lock()
                .get(symbol)
                .cloned()
                .ok_or_else(|| FetchError::Network(format!("HTTP 404 Not Found: {symbol}")))
        }

        async fn insight(&self) -> Result<String, FetchError> {
            self.insight_calls.fetch_add(1, Ordering::SeqCst);
            Ok("Markets are calm.".to_string())
        }

        async fn opportunities(&self) -> Result<Vec<Opportunity>, FetchError> {
            Ok(vec![Opportunity { record: record("ASELS.IS", 60.0), reason: "oversold".into() }])
        }

        async fn history(&self, _symbol: &str, _range: ChartRange) -> Result<Vec<Candle>, FetchError> {
            Ok(vec![Candle {
                time:  "2026-10-16".into(),
                open:  10.0,
                high:  11.0,
                low:   9.5,
                close: 10.5,
            }])
        }

        async fn export(&self, _request: &ExportRequest) -> Result<Vec<u8>, FetchError> {
            self.export_result
                .lock()
                .clone()
                .unwrap_or_else(|| Ok(b"PK\x03\x04".to_vec()))
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
