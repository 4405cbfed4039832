//! Shared data models for the shortsmith pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Probed source video descriptors
//! - Segment plan requests and validated segments
//! - Aspect ratios, reframe configuration and computed reframe geometry
//! - Encoding configuration
//! - Per-segment render results and run summaries

pub mod encoding;
pub mod reframe;
pub mod result;
pub mod segment;
pub mod style;
pub mod timestamp;
pub mod video;

// Re-export common types
pub use encoding::EncodingConfig;
pub use reframe::{PixelRect, ReframeGeometry, ReframeSpec};
pub use result::{
    RejectionReason, RenderResult, RenderStatus, RunId, RunSummary, SegmentRejection,
};
pub use segment::{
    BoundaryPriority, RandomPolicy, Segment, SegmentPlanRequest, SegmentRequest, SnapConfig,
    WindowPolicy,
};
pub use style::{Anchor, AspectRatio, PadFill, ReframeConfig, ReframeMode};
pub use timestamp::{format_seconds, parse_timestamp, TimestampError};
pub use video::SourceVideo;
