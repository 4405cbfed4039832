//! Run orchestration: probe once, plan once, render every segment.

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, Instrument};

use shortsmith_media::{
    BoundaryDetector, ClipRenderer, FfmpegBoundaryDetector, FfmpegClipRenderer, FfprobeProber,
    MediaProber, Reframer, RendererOptions, RenderJob, RoiStrategy, StaticAnchor,
};
use shortsmith_models::{
    ReframeConfig, RenderResult, RunId, RunSummary, Segment, SegmentPlanRequest, SourceVideo,
};

use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::logging::RunLogger;
use crate::metrics;
use crate::naming::OutputNamer;
use crate::planner::{SegmentPlan, SegmentPlanner};

/// Lifecycle of a run, published on a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Probing,
    Planning,
    /// `current` renders finished out of `total`
    Rendering { current: usize, total: usize },
    Done,
    /// Probing, planning or naming failed; nothing was rendered
    AbortedEarly,
}

/// The clip pipeline with its injectable collaborators.
pub struct Pipeline {
    config: PipelineConfig,
    prober: Arc<dyn MediaProber>,
    renderer: Arc<dyn ClipRenderer>,
    roi: Arc<dyn RoiStrategy>,
    boundaries: Arc<dyn BoundaryDetector>,
    state_tx: watch::Sender<RunState>,
}

impl Pipeline {
    /// Pipeline backed by `ffprobe` and `ffmpeg`.
    pub fn new(config: PipelineConfig) -> Self {
        let renderer = FfmpegClipRenderer::new(RendererOptions {
            encoding: config.encoding.clone(),
            timeout_secs: config.render_timeout_secs(),
            thumbnails: config.thumbnails,
        });
        let (state_tx, _) = watch::channel(RunState::Idle);

        Self {
            config,
            prober: Arc::new(FfprobeProber),
            renderer: Arc::new(renderer),
            roi: Arc::new(StaticAnchor),
            boundaries: Arc::new(FfmpegBoundaryDetector::default()),
            state_tx,
        }
    }

    pub fn with_prober(mut self, prober: Arc<dyn MediaProber>) -> Self {
        self.prober = prober;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ClipRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_roi_strategy(mut self, roi: Arc<dyn RoiStrategy>) -> Self {
        self.roi = roi;
        self
    }

    pub fn with_boundary_detector(mut self, detector: Arc<dyn BoundaryDetector>) -> Self {
        self.boundaries = detector;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Receive state changes of subsequent runs.
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state_tx.subscribe()
    }

    /// Current state.
    pub fn state(&self) -> RunState {
        *self.state_tx.borrow()
    }

    /// Run the pipeline to completion.
    pub async fn run(
        &self,
        source_path: impl AsRef<Path>,
        plan_request: &SegmentPlanRequest,
        output_dir: impl AsRef<Path>,
        reframe: &ReframeConfig,
    ) -> PipelineResult<RunSummary> {
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        self.run_with_cancel(source_path, plan_request, output_dir, reframe, cancel_rx)
            .await
    }

    /// Run the pipeline, stopping new renders once `cancel` turns `true`.
    pub async fn run_with_cancel(
        &self,
        source_path: impl AsRef<Path>,
        plan_request: &SegmentPlanRequest,
        output_dir: impl AsRef<Path>,
        reframe: &ReframeConfig,
        cancel: watch::Receiver<bool>,
    ) -> PipelineResult<RunSummary> {
        let source_path = source_path.as_ref();
        let output_dir = output_dir.as_ref();
        let run_id = RunId::new();
        let logger = RunLogger::new(&run_id, source_path.display().to_string());
        let span = logger.create_span();

        async {
            let started_at = Utc::now();
            logger.log_start(&format!(
                "{} plan into {}",
                plan_request.as_str(),
                output_dir.display()
            ));

            let prepared = self
                .prepare(source_path, plan_request, output_dir, &logger)
                .await;
            let (source, plan, outputs) = match prepared {
                Ok(prepared) => prepared,
                Err(e) => {
                    self.set_state(RunState::AbortedEarly);
                    metrics::record_aborted_run(e.kind());
                    logger.log_error(&e.to_string());
                    return Err(e);
                }
            };

            let results = self
                .render_all(Arc::new(source.clone()), outputs, reframe, &cancel, &logger)
                .await;

            let cancelled = *cancel.borrow();
            let summary =
                RunSummary::new(run_id, source, results, plan.rejected, cancelled, started_at);

            self.set_state(RunState::Done);
            metrics::record_run(&summary);
            logger.log_completion(&format!(
                "{} succeeded, {} failed, {} skipped, {} rejected{}",
                summary.total_succeeded,
                summary.total_failed,
                summary.total_skipped,
                summary.rejected.len(),
                if cancelled { " (cancelled)" } else { "" }
            ));
            Ok(summary)
        }
        .instrument(span)
        .await
    }

    /// Probe, plan and name. Any error here aborts the run.
    async fn prepare(
        &self,
        source_path: &Path,
        plan_request: &SegmentPlanRequest,
        output_dir: &Path,
        logger: &RunLogger,
    ) -> PipelineResult<(SourceVideo, SegmentPlan, Vec<(Segment, PathBuf)>)> {
        self.set_state(RunState::Probing);
        let source = self.prober.probe(source_path).await?;
        logger.log_progress(&format!(
            "probed {}x{}, {:.3}s, audio={}",
            source.width, source.height, source.duration, source.has_audio
        ));

        self.set_state(RunState::Planning);
        let planner = SegmentPlanner::new(self.config.min_clip_length);
        let mut plan = planner.plan(plan_request, source.duration)?;

        if let Some(snap) = &self.config.snap {
            let keep_disjoint = match plan_request {
                SegmentPlanRequest::Explicit { .. } => Some(false),
                SegmentPlanRequest::Random(policy) => Some(!policy.allow_overlap),
                SegmentPlanRequest::Windows(_) => None,
            };
            if let (Some(keep_disjoint), false) = (keep_disjoint, plan.is_empty()) {
                match self.boundaries.detect(&source, snap).await {
                    Ok(boundaries) => {
                        plan.segments = planner.snap_segments(
                            plan.segments,
                            &boundaries,
                            snap,
                            source.duration,
                            keep_disjoint,
                        );
                    }
                    Err(e) => logger.log_warning(&format!(
                        "boundary detection failed, keeping unsnapped cuts: {}",
                        e
                    )),
                }
            }
        }

        for rejection in &plan.rejected {
            logger.log_warning(&format!(
                "request {} rejected: {}",
                rejection.request_index, rejection.reason
            ));
        }
        logger.log_progress(&format!(
            "planned {} segments ({} rejected)",
            plan.segments.len(),
            plan.rejected.len()
        ));

        tokio::fs::create_dir_all(output_dir).await?;

        let namer = OutputNamer::new(
            output_dir,
            self.config.name_prefix.as_str(),
            self.config.encoding.extension(),
        )
        .with_max_attempts(self.config.max_name_attempts)
        .with_avoid_overwrite(self.config.avoid_overwrite);
        let mut outputs = Vec::with_capacity(plan.segments.len());
        for segment in &plan.segments {
            let path = namer.issue(segment).await?;
            debug!(segment = segment.index, output = %path.display(), "Output assigned");
            outputs.push((segment.clone(), path));
        }

        Ok((source, plan, outputs))
    }

    /// Render every segment with bounded parallelism, keeping plan order.
    async fn render_all(
        &self,
        source: Arc<SourceVideo>,
        outputs: Vec<(Segment, PathBuf)>,
        reframe: &ReframeConfig,
        cancel: &watch::Receiver<bool>,
        logger: &RunLogger,
    ) -> Vec<RenderResult> {
        let total = outputs.len();
        self.set_state(RunState::Rendering { current: 0, total });

        let semaphore = Semaphore::new(self.config.max_parallel_renders.max(1));
        let completed = AtomicUsize::new(0);
        let (semaphore, completed) = (&semaphore, &completed);
        let kill_on_cancel = self.config.kill_on_cancel;

        let futures = outputs.into_iter().map(|(segment, output_path)| {
            let source = source.clone();
            async move {
                let result = match semaphore.acquire().await {
                    Ok(_permit) if !*cancel.borrow() => {
                        let spec = Reframer::for_segment(
                            &source,
                            &segment,
                            reframe,
                            self.roi.as_ref(),
                        )
                        .await;
                        let job = RenderJob {
                            source,
                            segment: segment.clone(),
                            spec,
                            output_path: output_path.clone(),
                            cancel: kill_on_cancel.then(|| cancel.clone()),
                        };
                        self.render_one(job, segment, output_path, logger).await
                    }
                    _ => RenderResult::skipped(segment, output_path),
                };

                let current = completed.fetch_add(1, Ordering::SeqCst) + 1;
                self.set_state(RunState::Rendering { current, total });
                result
            }
        });

        join_all(futures).await
    }

    async fn render_one(
        &self,
        job: RenderJob,
        segment: Segment,
        output_path: PathBuf,
        logger: &RunLogger,
    ) -> RenderResult {
        let started = Instant::now();
        let result = match self.renderer.render(job).await {
            Ok(output) => RenderResult::success(segment, output.output_path, output.file_size_bytes)
                .with_elapsed_ms(output.elapsed_ms)
                .with_thumbnail(output.thumbnail_path),
            Err(e) => RenderResult::failed(segment, output_path, e.detail())
                .with_elapsed_ms(started.elapsed().as_millis() as u64),
        };

        metrics::record_render(result.is_success(), started.elapsed().as_secs_f64());
        let output = result.output_path.display().to_string();
        match &result.error_detail {
            None => logger.log_segment(result.segment.index, &output, Ok(result.elapsed_ms)),
            Some(detail) => {
                logger.log_segment(result.segment.index, &output, Err(detail.as_str()))
            }
        }
        result
    }

    fn set_state(&self, state: RunState) {
        self.state_tx.send_replace(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_pipeline_is_idle() {
        let pipeline = Pipeline::new(PipelineConfig::default());
        assert_eq!(pipeline.state(), RunState::Idle);
        assert_eq!(*pipeline.subscribe().borrow(), RunState::Idle);
    }

    #[test]
    fn test_run_state_json() {
        let json = serde_json::to_value(RunState::Rendering { current: 1, total: 3 }).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"state": "rendering", "current": 1, "total": 3})
        );
        let json = serde_json::to_value(RunState::AbortedEarly).unwrap();
        assert_eq!(json, serde_json::json!({"state": "aborted_early"}));
    }
}
