//! Sprint course analysis runner.
//!
//! This crate provides:
//! - Environment-driven worker configuration
//! - Staging of uploaded segment videos
//! - Bounded, cancellable fork-join over the four course segments
//! - Structured run logging and tracing setup

pub mod config;
pub mod error;
pub mod logging;
pub mod runner;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::{init_tracing, RunLogger};
pub use runner::{CourseAnalyzer, CourseUpload};
