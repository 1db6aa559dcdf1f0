//! Market-data engine: the fetch pipeline and the pure functions it feeds.

pub mod filter;
pub mod merge;
pub mod pipeline;
pub mod search;
