//! Coaching insights derived from a stitched trace.
//!
//! Text and data only; charts and tables are left to the caller.

use std::fmt::Write;

use runtrace_models::{
    CourseRange, PerformanceComparison, Recommendation, RecommendationCategory, StitchedTrace,
};

/// Reference top speed for the percentage comparison (m/s).
pub const REFERENCE_TOP_SPEED_MPS: f64 = 12.27;

/// Below this top speed the max-velocity recommendation is raised (m/s).
const LOW_MAX_VELOCITY_MPS: f64 = 8.0;

/// Smallest change reported as an improvement or regression.
const COMPARISON_MARGIN: f64 = 0.1;

/// Human-readable performance summary.
pub fn performance_summary(trace: &StitchedTrace) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Maximum Velocity: {:.3} m/s", trace.max_velocity);
    let _ = writeln!(out, "Average Velocity: {:.3} m/s", trace.avg_velocity);
    let _ = writeln!(out, "Total Time: {:.3} seconds", trace.total_time);
    let _ = writeln!(out, "Total Distance: {:.1} meters", trace.total_distance);

    let percentage = trace.max_velocity / REFERENCE_TOP_SPEED_MPS * 100.0;
    let _ = writeln!(out, "\nSpeed compared to world record: {:.1}%", percentage);

    let _ = writeln!(out, "\nRange Performance:");
    for segment in &trace.segments {
        let _ = writeln!(
            out,
            "  {}m: {:.3} m/s avg, {:.3}s",
            segment.range(),
            segment.summary().avg_speed,
            segment.effective_duration()
        );
    }

    let speeds = trace.range_avg_speeds();
    if let Some(best) = best_range(trace) {
        let _ = writeln!(out, "\nBest performance in: {}m", best);
    }
    if speeds.len() >= 2 {
        if speeds[0] < speeds[1] {
            let _ = writeln!(out, "Good acceleration pattern observed");
        } else {
            let _ = writeln!(out, "Consider working on initial acceleration");
        }
    }

    for range in &trace.zero_confidence_ranges {
        let _ = writeln!(out, "Low confidence: no valid velocity in {}m", range);
    }

    out.trim_end().to_string()
}

/// Range with the highest average speed; the earliest wins a tie.
pub fn best_range(trace: &StitchedTrace) -> Option<CourseRange> {
    trace
        .segments
        .iter()
        .fold(None, |best: Option<(CourseRange, f64)>, segment| {
            let speed = segment.summary().avg_speed;
            match best {
                Some((_, top)) if top >= speed => best,
                _ => Some((segment.range(), speed)),
            }
        })
        .map(|(range, _)| range)
}

/// Training recommendations triggered by patterns in the trace.
pub fn training_recommendations(trace: &StitchedTrace) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();
    let speeds = trace.range_avg_speeds();

    if trace.max_velocity > 0.0 && trace.avg_velocity / trace.max_velocity * 100.0 < 80.0 {
        recommendations.push(recommendation(
            RecommendationCategory::SpeedEndurance,
            "Significant speed drop-off detected",
            "Focus on speed endurance training with repeated 60-80m sprints",
        ));
    }

    if speeds.len() >= 2 && speeds[0] < speeds[1] * 0.8 {
        recommendations.push(recommendation(
            RecommendationCategory::Acceleration,
            "Slow initial acceleration",
            "Include explosive starts and plyometric exercises",
        ));
    }

    if trace.max_velocity < LOW_MAX_VELOCITY_MPS {
        recommendations.push(recommendation(
            RecommendationCategory::MaximumVelocity,
            "Low maximum velocity",
            "Work on technique and strength training",
        ));
    }

    if speeds.len() >= 4 {
        let peak = speeds.iter().copied().fold(0.0, f64::max);
        if speeds[3] < peak * 0.85 {
            recommendations.push(recommendation(
                RecommendationCategory::SpeedMaintenance,
                "Significant deceleration in final phase",
                "Improve lactate threshold with tempo runs",
            ));
        }
    }

    recommendations
}

fn recommendation(category: RecommendationCategory, issue: &str, advice: &str) -> Recommendation {
    Recommendation {
        category,
        issue: issue.to_string(),
        recommendation: advice.to_string(),
    }
}

/// Compare a run against an earlier one.
pub fn compare_performances(
    current: &StitchedTrace,
    previous: &StitchedTrace,
) -> PerformanceComparison {
    let max_velocity_change = current.max_velocity - previous.max_velocity;
    let avg_velocity_change = current.avg_velocity - previous.avg_velocity;
    let time_change = current.total_time - previous.total_time;

    let mut improvements = Vec::new();
    let mut regressions = Vec::new();

    if max_velocity_change > COMPARISON_MARGIN {
        improvements.push(format!(
            "Max velocity improved by {:.3} m/s",
            max_velocity_change
        ));
    }
    if time_change < -COMPARISON_MARGIN {
        improvements.push(format!("Time improved by {:.3} seconds", time_change.abs()));
    }
    if max_velocity_change < -COMPARISON_MARGIN {
        regressions.push(format!(
            "Max velocity decreased by {:.3} m/s",
            max_velocity_change.abs()
        ));
    }
    if time_change > COMPARISON_MARGIN {
        regressions.push(format!("Time increased by {:.3} seconds", time_change));
    }

    let max_velocity_gain = if previous.max_velocity > 0.0 {
        max_velocity_change / previous.max_velocity * 100.0
    } else {
        0.0
    };
    let time_gain = if previous.total_time > 0.0 {
        -time_change / previous.total_time * 100.0
    } else {
        0.0
    };

    PerformanceComparison {
        max_velocity_change,
        avg_velocity_change,
        time_change,
        improvements,
        regressions,
        overall_improvement: (max_velocity_gain + time_gain) / 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runtrace_models::{SegmentRecord, SegmentSummary, StrideMetrics, COURSE_DISTANCE_M};

    fn trace(range_speeds: [f64; 4], max_velocity: f64, total_time: f64) -> StitchedTrace {
        let segments = CourseRange::ALL
            .iter()
            .zip(range_speeds)
            .map(|(range, speed)| {
                let mut summary = SegmentSummary::empty(*range, total_time / 4.0);
                summary.avg_speed = speed;
                summary.max_speed = speed;
                summary.zero_confidence = false;
                SegmentRecord::new(vec![], vec![], summary, StrideMetrics::default(), None)
            })
            .collect();
        StitchedTrace {
            segments,
            position_series: vec![],
            velocity_series: vec![],
            max_velocity,
            avg_velocity: range_speeds.iter().sum::<f64>() / 4.0,
            total_distance: COURSE_DISTANCE_M,
            total_time,
            zero_confidence_ranges: vec![],
        }
    }

    fn categories(trace: &StitchedTrace) -> Vec<RecommendationCategory> {
        training_recommendations(trace)
            .into_iter()
            .map(|r| r.category)
            .collect()
    }

    #[test]
    fn test_summary_mentions_ranges_and_best() {
        let t = trace([8.0, 10.0, 10.5, 10.0], 11.0, 10.5);
        let summary = performance_summary(&t);
        assert!(summary.contains("Maximum Velocity: 11.000 m/s"));
        assert!(summary.contains("  0-25m: 8.000 m/s avg"));
        assert!(summary.contains("Best performance in: 50-75m"));
        assert!(summary.contains("Good acceleration pattern observed"));
        assert!(summary.contains("89.6%"));
    }

    #[test]
    fn test_balanced_run_has_no_recommendations() {
        let t = trace([9.0, 10.0, 10.0, 9.5], 10.5, 10.5);
        assert!(categories(&t).is_empty());
    }

    #[test]
    fn test_recommendation_triggers() {
        let t = trace([4.0, 7.0, 7.5, 5.0], 7.9, 16.0);
        let found = categories(&t);
        assert!(found.contains(&RecommendationCategory::SpeedEndurance));
        assert!(found.contains(&RecommendationCategory::Acceleration));
        assert!(found.contains(&RecommendationCategory::MaximumVelocity));
        assert!(found.contains(&RecommendationCategory::SpeedMaintenance));
    }

    #[test]
    fn test_compare_performances() {
        let previous = trace([8.0, 9.0, 9.0, 8.5], 10.0, 12.0);
        let current = trace([8.5, 9.5, 9.5, 9.0], 10.5, 11.4);
        let comparison = compare_performances(&current, &previous);

        assert!((comparison.max_velocity_change - 0.5).abs() < 1e-9);
        assert!((comparison.time_change + 0.6).abs() < 1e-9);
        assert_eq!(comparison.improvements.len(), 2);
        assert!(comparison.regressions.is_empty());
        // (5% + 5%) / 2
        assert!((comparison.overall_improvement - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_compare_against_empty_previous() {
        let previous = trace([0.0; 4], 0.0, 0.0);
        let current = trace([8.0; 4], 9.0, 12.0);
        let comparison = compare_performances(&current, &previous);
        assert_eq!(comparison.overall_improvement, 0.0);
        assert_eq!(comparison.regressions.len(), 1);
    }
}
