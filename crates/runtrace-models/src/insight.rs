//! Coaching insight types derived from a stitched trace.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Area a recommendation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationCategory {
    SpeedEndurance,
    Acceleration,
    MaximumVelocity,
    SpeedMaintenance,
}

impl RecommendationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationCategory::SpeedEndurance => "Speed Endurance",
            RecommendationCategory::Acceleration => "Acceleration",
            RecommendationCategory::MaximumVelocity => "Maximum Velocity",
            RecommendationCategory::SpeedMaintenance => "Speed Maintenance",
        }
    }
}

/// Training recommendation triggered by a pattern in the trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Recommendation {
    pub category: RecommendationCategory,
    pub issue: String,
    pub recommendation: String,
}

/// Difference between two runs (current minus previous).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct PerformanceComparison {
    pub max_velocity_change: f64,
    pub avg_velocity_change: f64,
    pub time_change: f64,
    pub improvements: Vec<String>,
    pub regressions: Vec<String>,
    /// Mean of the max-velocity gain and time gain, in percent.
    pub overall_improvement: f64,
}
