//! Segment planning: explicit ranges, sliding windows and random sampling.
//!
//! Planning is pure and synchronous. Every accepted segment satisfies
//! `0 <= start < end <= duration`; indices are assigned 1-based in plan order.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use shortsmith_media::{CutEdge, DetectedBoundaries};
use shortsmith_models::{
    RandomPolicy, RejectionReason, Segment, SegmentPlanRequest, SegmentRejection, SegmentRequest,
    SnapConfig, WindowPolicy,
};

use crate::error::{PipelineError, PipelineResult};

/// Slack for comparisons against the minimum length, in seconds.
pub const LENGTH_TOLERANCE: f64 = 0.001;

/// Draws per requested clip before random sampling gives up.
pub const RANDOM_ATTEMPTS_PER_CLIP: u32 = 20;

/// Upper bound on generated windows.
const MAX_WINDOWS: usize = 100_000;

/// Validated segments plus the requests that were left out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentPlan {
    pub segments: Vec<Segment>,
    pub rejected: Vec<SegmentRejection>,
}

impl SegmentPlan {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Turns plan requests into validated segments.
#[derive(Debug, Clone, Copy)]
pub struct SegmentPlanner {
    min_clip_length: f64,
}

impl SegmentPlanner {
    /// `min_clip_length` applies to explicit requests and snapped segments.
    pub fn new(min_clip_length: f64) -> Self {
        Self {
            min_clip_length: min_clip_length.max(0.0),
        }
    }

    /// Plan segments for a source of `duration` seconds.
    pub fn plan(&self, request: &SegmentPlanRequest, duration: f64) -> PipelineResult<SegmentPlan> {
        match request {
            SegmentPlanRequest::Explicit { segments } => Ok(self.plan_explicit(segments, duration)),
            SegmentPlanRequest::Windows(policy) => Ok(SegmentPlan {
                segments: plan_windows(policy, duration)?,
                rejected: Vec::new(),
            }),
            SegmentPlanRequest::Random(policy) => Ok(SegmentPlan {
                segments: plan_random(policy, duration)?,
                rejected: Vec::new(),
            }),
        }
    }

    /// Validate and clamp user ranges, keeping their order.
    pub fn plan_explicit(&self, requests: &[SegmentRequest], duration: f64) -> SegmentPlan {
        let mut plan = SegmentPlan::default();

        for (i, request) in requests.iter().enumerate() {
            let request_index = i as u32 + 1;
            match self.validate(request, duration) {
                Ok(end) => {
                    let index = plan.segments.len() as u32 + 1;
                    plan.segments.push(Segment::new(
                        index,
                        request.start,
                        end,
                        request.label.clone(),
                    ));
                }
                Err(reason) => {
                    debug!(request = request_index, "Request rejected: {}", reason);
                    plan.rejected.push(SegmentRejection {
                        request_index,
                        start: request.start,
                        end: request.end,
                        label: request.label.clone(),
                        reason,
                    });
                }
            }
        }

        plan
    }

    /// Returns the clamped end of an acceptable request.
    fn validate(&self, request: &SegmentRequest, duration: f64) -> Result<f64, RejectionReason> {
        let invalid = |detail: &str| RejectionReason::InvalidSegment {
            detail: detail.to_string(),
        };

        if !request.start.is_finite() || !request.end.is_finite() {
            return Err(invalid("start and end must be finite"));
        }
        if request.start < 0.0 {
            return Err(invalid("start must not be negative"));
        }
        if request.start >= request.end {
            return Err(invalid("start must be before end"));
        }

        let end = request.end.min(duration);
        let clamped_length = (end - request.start).max(0.0);
        if clamped_length <= 0.0 || !meets_minimum(clamped_length, self.min_clip_length) {
            return Err(RejectionReason::BelowMinimumLength {
                clamped_length,
                min_length: self.min_clip_length,
            });
        }

        Ok(end)
    }

    /// Move cut points to nearby detected boundaries.
    ///
    /// A snapped segment that would break the segment invariants keeps its
    /// original cut. With `keep_disjoint`, cuts never move into a neighbour.
    pub fn snap_segments(
        &self,
        segments: Vec<Segment>,
        boundaries: &DetectedBoundaries,
        config: &SnapConfig,
        duration: f64,
        keep_disjoint: bool,
    ) -> Vec<Segment> {
        if boundaries.is_empty() {
            return segments;
        }

        let next_starts: Vec<f64> = segments
            .iter()
            .skip(1)
            .map(|s| s.start)
            .chain(std::iter::once(f64::INFINITY))
            .collect();
        let mut prev_end = f64::NEG_INFINITY;
        let mut snapped_count = 0usize;

        let snapped: Vec<Segment> = segments
            .into_iter()
            .zip(next_starts)
            .map(|(segment, next_start)| {
                let mut start = boundaries.snap(
                    segment.start,
                    CutEdge::Start,
                    config.priority,
                    config.max_adjustment,
                );
                let mut end = boundaries.snap(
                    segment.end,
                    CutEdge::End,
                    config.priority,
                    config.max_adjustment,
                );

                if keep_disjoint {
                    if start < prev_end {
                        start = segment.start;
                    }
                    if end > next_start {
                        end = segment.end;
                    }
                }

                let valid = start >= 0.0
                    && end <= duration
                    && start < end
                    && meets_minimum(end - start, self.min_clip_length);

                let result = if valid {
                    if start != segment.start || end != segment.end {
                        snapped_count += 1;
                    }
                    Segment::new(segment.index, start, end, segment.label)
                } else {
                    segment
                };
                prev_end = result.end;
                result
            })
            .collect();

        debug!("Snapped {} of {} segments to boundaries", snapped_count, snapped.len());
        snapped
    }
}

impl Default for SegmentPlanner {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MIN_CLIP_SECS)
    }
}

/// Sliding windows of `window_length` every `window_length - overlap` seconds.
pub fn plan_windows(policy: &WindowPolicy, duration: f64) -> PipelineResult<Vec<Segment>> {
    let WindowPolicy {
        window_length,
        overlap,
        min_length,
    } = *policy;

    if !window_length.is_finite() || window_length <= 0.0 {
        return Err(PipelineError::invalid_policy("window length must be positive"));
    }
    if !overlap.is_finite() || overlap < 0.0 {
        return Err(PipelineError::invalid_policy("overlap must not be negative"));
    }
    if overlap >= window_length {
        return Err(PipelineError::invalid_policy(
            "overlap must be shorter than the window length",
        ));
    }
    if !min_length.is_finite() || min_length < 0.0 {
        return Err(PipelineError::invalid_policy("minimum length must not be negative"));
    }

    let stride = policy.stride();
    let mut segments = Vec::new();

    for k in 0u64.. {
        // Multiply rather than accumulate so long sources do not drift
        let start = k as f64 * stride;
        if start >= duration || !meets_minimum(duration - start, min_length) {
            break;
        }
        if segments.len() >= MAX_WINDOWS {
            return Err(PipelineError::invalid_policy(format!(
                "policy produces more than {} windows",
                MAX_WINDOWS
            )));
        }
        let end = (start + window_length).min(duration);
        let index = segments.len() as u32 + 1;
        segments.push(Segment::new(index, start, end, None));
    }

    Ok(segments)
}

/// `count` clips of `clip_length` placed uniformly at random, sorted by start.
pub fn plan_random(policy: &RandomPolicy, duration: f64) -> PipelineResult<Vec<Segment>> {
    let clip_length = policy.clip_length;
    if !clip_length.is_finite() || clip_length <= 0.0 {
        return Err(PipelineError::invalid_policy("clip length must be positive"));
    }
    if clip_length >= duration {
        return Err(PipelineError::invalid_policy(format!(
            "clip length {:.3}s must be shorter than the source ({:.3}s)",
            clip_length, duration
        )));
    }

    let mut rng = match policy.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let max_start = duration - clip_length;
    let mut draw = || {
        let start = rng.random_range(0.0..=max_start);
        // Millisecond precision keeps names and logs readable
        let start = ((start * 1000.0).round() / 1000.0).min(max_start);
        (start, start + clip_length)
    };

    let mut ranges: Vec<(f64, f64)> = Vec::with_capacity(policy.count as usize);
    if policy.allow_overlap {
        ranges.extend((0..policy.count).map(|_| draw()));
    } else {
        let max_attempts = policy.count.saturating_mul(RANDOM_ATTEMPTS_PER_CLIP);
        let mut attempts = 0;
        while (ranges.len() as u32) < policy.count && attempts < max_attempts {
            attempts += 1;
            let (start, end) = draw();
            if ranges.iter().all(|&(s, e)| end <= s || start >= e) {
                ranges.push((start, end));
            }
        }
        if (ranges.len() as u32) < policy.count {
            warn!(
                "Only placed {} of {} non-overlapping clips of {:.3}s after {} attempts",
                ranges.len(),
                policy.count,
                clip_length,
                attempts
            );
        }
    }

    ranges.sort_by(|a, b| a.0.total_cmp(&b.0));
    Ok(ranges
        .into_iter()
        .enumerate()
        .map(|(i, (start, end))| Segment::new(i as u32 + 1, start, end, None))
        .collect())
}

fn meets_minimum(length: f64, min_length: f64) -> bool {
    length + LENGTH_TOLERANCE >= min_length
}
