//! # export: Spreadsheet downloads
//!
//! The analytics API renders the workbook; this side only asks for it and
//! saves the bytes under the file name the dashboard has always used:
//!
//! * market export    → `wolfee_market_analysis_{period}.xlsx`
//! * portfolio export → `portfolio_{period}.xlsx`
//!
//! A failed export is shown to the user and reverts to idle after a fixed
//! delay.  Nothing is retried automatically.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::MarketApi;
use crate::error::{AppError, FetchError};

// ─── Period ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportPeriod {
    Daily,
    Weekly,
    Monthly,
}

impl fmt::Display for ExportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportPeriod::Daily => write!(f, "daily"),
            ExportPeriod::Weekly => write!(f, "weekly"),
            ExportPeriod::Monthly => write!(f, "monthly"),
        }
    }
}

impl FromStr for ExportPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(ExportPeriod::Daily),
            "weekly" => Ok(ExportPeriod::Weekly),
            "monthly" => Ok(ExportPeriod::Monthly),
            other => Err(format!("invalid period '{other}'. Use daily, weekly, or monthly")),
        }
    }
}

// ─── Request ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExportRequest {
    Market { period: ExportPeriod },
    Portfolio { symbols: Vec<String>, period: ExportPeriod },
}

impl ExportRequest {
    /// Portfolio export of `symbols`; refuses an empty list.
    pub fn portfolio(symbols: Vec<String>, period: ExportPeriod) -> Result<Self, AppError> {
        if symbols.is_empty() {
            return Err(AppError::BadRequest("portfolio is empty — nothing to export".into()));
        }
        Ok(ExportRequest::Portfolio { symbols, period })
    }

    pub fn file_name(&self) -> String {
        match self {
            ExportRequest::Market { period } => format!("wolfee_market_analysis_{period}.xlsx"),
            ExportRequest::Portfolio { period, .. } => format!("portfolio_{period}.xlsx"),
        }
    }
}

// ─── Status ───────────────────────────────────────────────────────────────────

/// What the export button currently shows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExportStatus {
    #[default]
    Idle,
    Running { file_name: String },
    Succeeded { path: PathBuf },
    Failed { message: String },
}

// ─── Download ─────────────────────────────────────────────────────────────────

/// Fetch the workbook and save it into `dir`.  Returns the written path.
pub async fn download(
    api: &dyn MarketApi,
    request: &ExportRequest,
    dir: &Path,
) -> Result<PathBuf, AppError> {
    let bytes = api.export(request).await?;
    if bytes.is_empty() {
        return Err(FetchError::EmptyResult.into());
    }

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    let path = dir.join(request.file_name());
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    info!(path = %path.display(), bytes = bytes.len(), "📥 Export saved");
    Ok(path)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
