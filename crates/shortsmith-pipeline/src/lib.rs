//! Vertical short clip pipeline.
//!
//! This crate provides:
//! - Segment planning (explicit ranges, sliding windows, random sampling)
//! - Cut-point snapping to detected scene and pause boundaries
//! - Collision-free output naming
//! - Bounded-parallel render orchestration with cancellation
//! - Run logging and metrics

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod naming;
pub mod orchestrator;
pub mod planner;

pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use logging::{init_tracing, RunLogger};
pub use naming::{sanitize_label, OutputNamer};
pub use orchestrator::{Pipeline, RunState};
pub use planner::{plan_random, plan_windows, SegmentPlan, SegmentPlanner};
