//! Course range definitions.
//!
//! The 100 m course is filmed as four 25 m ranges, one camera each:
//!
//! - `ZeroTo25`: start line to 25 m
//! - `TwentyFiveTo50`: 25 m to 50 m
//! - `FiftyTo75`: 50 m to 75 m
//! - `SeventyFiveTo100`: 75 m to the finish line

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of every filmed range in meters. Fixed by course geometry.
pub const SEGMENT_DISTANCE_M: f64 = 25.0;

/// Total course length in meters.
pub const COURSE_DISTANCE_M: f64 = 100.0;

/// One 25 m range of the course.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum CourseRange {
    #[serde(rename = "0-25")]
    ZeroTo25,
    #[serde(rename = "25-50")]
    TwentyFiveTo50,
    #[serde(rename = "50-75")]
    FiftyTo75,
    #[serde(rename = "75-100")]
    SeventyFiveTo100,
}

impl CourseRange {
    /// All ranges in canonical course order.
    pub const ALL: &'static [CourseRange] = &[
        CourseRange::ZeroTo25,
        CourseRange::TwentyFiveTo50,
        CourseRange::FiftyTo75,
        CourseRange::SeventyFiveTo100,
    ];

    /// Returns the range name as used by uploads ("0-25", ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseRange::ZeroTo25 => "0-25",
            CourseRange::TwentyFiveTo50 => "25-50",
            CourseRange::FiftyTo75 => "50-75",
            CourseRange::SeventyFiveTo100 => "75-100",
        }
    }

    /// Position of this range in canonical order (0..=3).
    pub fn index(&self) -> usize {
        match self {
            CourseRange::ZeroTo25 => 0,
            CourseRange::TwentyFiveTo50 => 1,
            CourseRange::FiftyTo75 => 2,
            CourseRange::SeventyFiveTo100 => 3,
        }
    }

    /// Distance from the start line to the beginning of this range.
    pub fn start_m(&self) -> f64 {
        self.index() as f64 * SEGMENT_DISTANCE_M
    }

    /// Distance from the start line to the end of this range.
    pub fn end_m(&self) -> f64 {
        self.start_m() + SEGMENT_DISTANCE_M
    }
}

impl fmt::Display for CourseRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a range name cannot be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown course range '{0}', expected one of: 0-25, 25-50, 50-75, 75-100")]
pub struct ParseCourseRangeError(pub String);

impl FromStr for CourseRange {
    type Err = ParseCourseRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let normalized = normalized.strip_suffix('m').unwrap_or(&normalized);
        match normalized {
            "0-25" => Ok(CourseRange::ZeroTo25),
            "25-50" => Ok(CourseRange::TwentyFiveTo50),
            "50-75" => Ok(CourseRange::FiftyTo75),
            "75-100" => Ok(CourseRange::SeventyFiveTo100),
            _ => Err(ParseCourseRangeError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_as_str() {
        assert_eq!(CourseRange::ZeroTo25.as_str(), "0-25");
        assert_eq!(CourseRange::SeventyFiveTo100.as_str(), "75-100");
    }

    #[test]
    fn test_range_from_str() {
        assert_eq!("0-25".parse::<CourseRange>().unwrap(), CourseRange::ZeroTo25);
        assert_eq!(
            "50-75m".parse::<CourseRange>().unwrap(),
            CourseRange::FiftyTo75
        );
        assert_eq!(
            " 75-100 ".parse::<CourseRange>().unwrap(),
            CourseRange::SeventyFiveTo100
        );
        assert!("100-125".parse::<CourseRange>().is_err());
    }

    #[test]
    fn test_canonical_order() {
        for (i, range) in CourseRange::ALL.iter().enumerate() {
            assert_eq!(range.index(), i);
            assert_eq!(range.start_m(), i as f64 * SEGMENT_DISTANCE_M);
        }
        let mut shuffled = vec![
            CourseRange::FiftyTo75,
            CourseRange::ZeroTo25,
            CourseRange::SeventyFiveTo100,
            CourseRange::TwentyFiveTo50,
        ];
        shuffled.sort();
        assert_eq!(shuffled, CourseRange::ALL);
    }

    #[test]
    fn test_serde_uses_range_names() {
        let json = serde_json::to_string(&CourseRange::TwentyFiveTo50).unwrap();
        assert_eq!(json, "\"25-50\"");
        let parsed: CourseRange = serde_json::from_str("\"75-100\"").unwrap();
        assert_eq!(parsed, CourseRange::SeventyFiveTo100);
    }
}
