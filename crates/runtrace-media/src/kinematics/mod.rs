//! Kinematic reconstruction from frame samples.
//!
//! - `mapper`: pixel anchor to meters along the range
//! - `smoother`: velocities, moving average, outlier screening
//! - `stride`: stride boundaries from velocity peaks
//! - `stitcher`: four segments into one 100 m trace

pub mod mapper;
pub mod smoother;
pub mod stats;
pub mod stitcher;
pub mod stride;

pub use mapper::{map_position, map_positions, pixels_per_meter};
pub use smoother::{acceleration_series, interpolate_invalid, KinematicSmoother, SmoothedSegment};
pub use stitcher::SegmentStitcher;
pub use stride::StrideSegmenter;
