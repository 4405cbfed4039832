//! Per-segment render results and run summaries.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::segment::Segment;
use crate::video::SourceVideo;

/// Unique identifier for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new random run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

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

/// Outcome of one planned segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RenderStatus {
    /// Clip written to its output path
    Success,
    /// Render attempted and failed
    Failed,
    /// Never started because the run was cancelled
    Skipped,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::Success => "success",
            RenderStatus::Failed => "failed",
            RenderStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for RenderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of rendering one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderResult {
    pub segment: Segment,
    /// Path the clip was (or would have been) written to
    pub output_path: PathBuf,
    pub status: RenderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    /// Wall-clock render time in milliseconds
    #[serde(default)]
    pub elapsed_ms: u64,
    /// Size of the written clip in bytes
    #[serde(default)]
    pub file_size_bytes: u64,
    /// Thumbnail written beside the clip, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_path: Option<PathBuf>,
}

impl RenderResult {
    pub fn success(segment: Segment, output_path: PathBuf, file_size_bytes: u64) -> Self {
        Self {
            segment,
            output_path,
            status: RenderStatus::Success,
            error_detail: None,
            elapsed_ms: 0,
            file_size_bytes,
            thumbnail_path: None,
        }
    }

    pub fn failed(segment: Segment, output_path: PathBuf, detail: impl Into<String>) -> Self {
        Self {
            segment,
            output_path,
            status: RenderStatus::Failed,
            error_detail: Some(detail.into()),
            elapsed_ms: 0,
            file_size_bytes: 0,
            thumbnail_path: None,
        }
    }

    pub fn skipped(segment: Segment, output_path: PathBuf) -> Self {
        Self {
            segment,
            output_path,
            status: RenderStatus::Skipped,
            error_detail: Some("Run cancelled before this segment started".to_string()),
            elapsed_ms: 0,
            file_size_bytes: 0,
            thumbnail_path: None,
        }
    }

    pub fn with_elapsed_ms(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    pub fn with_thumbnail(mut self, thumbnail_path: Option<PathBuf>) -> Self {
        self.thumbnail_path = thumbnail_path;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == RenderStatus::Success
    }
}

/// Why a requested range was left out of the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
    /// Malformed request (start >= end, negative or non-finite times)
    InvalidSegment { detail: String },
    /// Shorter than the minimum clip length after clamping to the source duration
    BelowMinimumLength { clamped_length: f64, min_length: f64 },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::InvalidSegment { detail } => write!(f, "invalid segment: {}", detail),
            RejectionReason::BelowMinimumLength {
                clamped_length,
                min_length,
            } => write!(
                f,
                "clamped length {:.3}s is below the minimum of {:.3}s",
                clamped_length, min_length
            ),
        }
    }
}

/// A requested range that was not planned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SegmentRejection {
    /// 1-based position in the request list
    pub request_index: u32,
    pub start: f64,
    pub end: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub reason: RejectionReason,
}

/// Aggregated outcome of one run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RunSummary {
    pub run_id: RunId,
    pub source: SourceVideo,
    /// One entry per planned segment, in plan order
    pub results: Vec<RenderResult>,
    /// Requested ranges excluded from the plan
    #[serde(default)]
    pub rejected: Vec<SegmentRejection>,
    pub total_requested: usize,
    pub total_succeeded: usize,
    pub total_failed: usize,
    #[serde(default)]
    pub total_skipped: usize,
    #[serde(default)]
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    /// Build a summary, deriving every count from the results.
    pub fn new(
        run_id: RunId,
        source: SourceVideo,
        results: Vec<RenderResult>,
        rejected: Vec<SegmentRejection>,
        cancelled: bool,
        started_at: DateTime<Utc>,
    ) -> Self {
        let count = |status: RenderStatus| results.iter().filter(|r| r.status == status).count();
        let total_succeeded = count(RenderStatus::Success);
        let total_failed = count(RenderStatus::Failed);
        let total_skipped = count(RenderStatus::Skipped);

        Self {
            run_id,
            source,
            total_requested: results.len() + rejected.len(),
            total_succeeded,
            total_failed,
            total_skipped,
            results,
            rejected,
            cancelled,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Whether every planned segment rendered and nothing was rejected.
    pub fn is_complete_success(&self) -> bool {
        self.total_succeeded == self.results.len() && self.rejected.is_empty()
    }

    /// Paths of successfully written clips, in plan order.
    pub fn output_paths(&self) -> Vec<&PathBuf> {
        self.results
            .iter()
            .filter(|r| r.is_success())
            .map(|r| &r.output_path)
            .collect()
    }
}
