//! Per-chart outcomes and the response manifest.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Why a chart was left out of the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// An optional column the chart needs is absent
    MissingColumn(String),
    /// Nothing left after dropping null keys and values
    NoData,
    /// Every aggregated value is zero
    AllZero,
    /// Drawing the image failed
    RenderFailed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingColumn(col) => write!(f, "column '{col}' is not present"),
            SkipReason::NoData => f.write_str("no data to aggregate"),
            SkipReason::AllZero => f.write_str("all aggregated values are zero"),
            SkipReason::RenderFailed(err) => write!(f, "rendering failed: {err}"),
        }
    }
}

/// Result of processing one chart spec
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChartOutcome {
    Rendered {
        id: String,
        title: String,
        url: String,
        path: PathBuf,
    },
    Skipped {
        id: String,
        title: String,
        reason: SkipReason,
    },
}

impl ChartOutcome {
    pub fn id(&self) -> &str {
        match self {
            ChartOutcome::Rendered { id, .. } | ChartOutcome::Skipped { id, .. } => id,
        }
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self, ChartOutcome::Rendered { .. })
    }
}

/// Entry of the manifest returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestEntry {
    pub title: String,
    pub url: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedChart {
    pub id: String,
    pub title: String,
    pub reason: SkipReason,
}

/// Ordered list of produced charts plus the ones left out
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    pub request_id: Uuid,
    pub charts: Vec<ManifestEntry>,
    pub skipped: Vec<SkippedChart>,
}

impl Manifest {
    /// Split outcomes into rendered and skipped, keeping catalog order
    pub fn from_outcomes(request_id: Uuid, outcomes: Vec<ChartOutcome>) -> Self {
        let mut charts = Vec::new();
        let mut skipped = Vec::new();
        for outcome in outcomes {
            match outcome {
                ChartOutcome::Rendered { title, url, path, .. } => {
                    charts.push(ManifestEntry { title, url, path })
                }
                ChartOutcome::Skipped { id, title, reason } => {
                    skipped.push(SkippedChart { id, title, reason })
                }
            }
        }
        Self {
            request_id,
            charts,
            skipped,
        }
    }

    pub fn titles(&self) -> Vec<&str> {
        self.charts.iter().map(|c| c.title.as_str()).collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
