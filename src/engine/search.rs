//! # engine::search
//!
//! Linear, case-insensitive substring search over symbol and display name,
//! scoped to one region.  Results follow the same per-region order as the
//! grid (see [`super::filter::partition`]).

use serde::Serialize;

use super::filter::partition;
use crate::models::{Record, Region};

/// Outcome of an active search.  "Search not active" is modelled by the
/// caller as `Option<SearchOutcome>::None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "records", rename_all = "snake_case")]
pub enum SearchOutcome {
    NoResults,
    Matches(Vec<Record>),
}

impl SearchOutcome {
    pub fn records(&self) -> &[Record] {
        match self {
            SearchOutcome::NoResults => &[],
            SearchOutcome::Matches(records) => records,
        }
    }
}

pub fn search(records: &[Record], region: Region, query: &str) -> SearchOutcome {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return SearchOutcome::NoResults;
    }

    let matches: Vec<Record> = partition(records, region)
        .into_iter()
        .filter(|r| {
            r.symbol.to_lowercase().contains(&needle) || r.name.to_lowercase().contains(&needle)
        })
        .collect();

    if matches.is_empty() {
        SearchOutcome::NoResults
    } else {
        SearchOutcome::Matches(matches)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::record;

    fn named(symbol: &str, name: &str) -> Record {
        let mut r = record(symbol, 1.0);
        r.name = name.to_string();
        r
    }

    fn symbols(outcome: &SearchOutcome) -> Vec<&str> {
        outcome.records().iter().map(|r| r.symbol.as_str()).collect()
    }

    #[test]
    fn test_search_is_region_scoped() {
        let records = vec![named("AKBNK.IS", "Akbank T.A.S."), named("BANKX", "Bank X Holdings")];
        let outcome = search(&records, Region::Domestic, "bank");
        assert_eq!(symbols(&outcome), ["AKBNK.IS"]);
    }

    #[test]
    fn test_case_insensitive_symbol_or_name() {
        let records = vec![named("AAPL", "Apple Inc."), named("MSFT", "Microsoft"), named("PEP", "PepsiCo")];

        assert_eq!(symbols(&search(&records, Region::Global, "aPp")), ["AAPL"]);
        assert_eq!(symbols(&search(&records, Region::Global, "MICRO")), ["MSFT"]);
        assert_eq!(symbols(&search(&records, Region::Global, "p")), ["AAPL", "PEP"]);
    }

    #[test]
    fn test_empty_query_is_no_results() {
        let records = vec![named("AAPL", "Apple Inc.")];
        assert_eq!(search(&records, Region::Global, ""), SearchOutcome::NoResults);
        assert_eq!(search(&records, Region::Global, "   "), SearchOutcome::NoResults);
    }

    #[test]
    fn test_no_match_is_no_results() {
        let records = vec![named("AAPL", "Apple Inc.")];
        assert_eq!(search(&records, Region::Global, "tesla"), SearchOutcome::NoResults);
    }
}
