//! Run identifiers and the terminal report handed to storage/reporting.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{AnalysisConfig, SegmentSummary, StitchedTrace, StrideMetrics};

/// Unique identifier for one analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new random run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Structured kinematic record of a full 100 m run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct KinematicReport {
    pub run_id: RunId,
    pub created_at: DateTime<Utc>,
    pub config: AnalysisConfig,
    pub trace: StitchedTrace,
    /// Per-segment summaries in course order.
    pub segments: Vec<SegmentSummary>,
    /// Stride statistics pooled over all four segments.
    pub stride_metrics: StrideMetrics,
    /// At least one segment produced no valid velocity.
    pub low_confidence: bool,
}

impl KinematicReport {
    pub fn new(
        run_id: RunId,
        config: AnalysisConfig,
        trace: StitchedTrace,
        stride_metrics: StrideMetrics,
    ) -> Self {
        let segments = trace.segments.iter().map(|s| s.summary().clone()).collect();
        let low_confidence = trace.is_low_confidence();
        Self {
            run_id,
            created_at: Utc::now(),
            config,
            trace,
            segments,
            stride_metrics,
            low_confidence,
        }
    }

    /// Serialize to pretty JSON for external persistence.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
