//! Run metrics through the `metrics` facade.
//!
//! Nothing is exported unless the embedding application installs a recorder.

use metrics::{counter, histogram};

use shortsmith_models::RunSummary;

/// Metric names as constants for consistency.
pub mod names {
    pub const RUNS_TOTAL: &str = "shortsmith_runs_total";
    pub const CLIPS_RENDERED_TOTAL: &str = "shortsmith_clips_rendered_total";
    pub const CLIPS_FAILED_TOTAL: &str = "shortsmith_clips_failed_total";
    pub const CLIPS_SKIPPED_TOTAL: &str = "shortsmith_clips_skipped_total";
    pub const SEGMENTS_REJECTED_TOTAL: &str = "shortsmith_segments_rejected_total";
    pub const RENDER_DURATION_SECONDS: &str = "shortsmith_render_duration_seconds";
}

/// Record one finished render.
pub fn record_render(success: bool, duration_secs: f64) {
    if success {
        counter!(names::CLIPS_RENDERED_TOTAL).increment(1);
    } else {
        counter!(names::CLIPS_FAILED_TOTAL).increment(1);
    }
    histogram!(names::RENDER_DURATION_SECONDS).record(duration_secs);
}

/// Record a completed run.
pub fn record_run(summary: &RunSummary) {
    let outcome = if summary.cancelled {
        "cancelled"
    } else if summary.is_complete_success() {
        "success"
    } else {
        "partial"
    };
    counter!(names::RUNS_TOTAL, "outcome" => outcome).increment(1);
    counter!(names::CLIPS_SKIPPED_TOTAL).increment(summary.total_skipped as u64);
    counter!(names::SEGMENTS_REJECTED_TOTAL).increment(summary.rejected.len() as u64);
}

/// Record a run that ended before rendering.
pub fn record_aborted_run(kind: &'static str) {
    counter!(names::RUNS_TOTAL, "outcome" => "aborted", "error" => kind).increment(1);
}
