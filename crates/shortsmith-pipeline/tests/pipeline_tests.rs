//! Pipeline integration tests with in-process prober and renderer fakes.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::watch;

use shortsmith_media::{
    BoundaryDetector, ClipRenderer, DetectedBoundaries, MediaError, MediaProber, MediaResult,
    RenderJob, RenderOutput,
};
use shortsmith_models::{
    ReframeConfig, ReframeGeometry, ReframeSpec, RenderStatus, SegmentPlanRequest,
    SegmentRequest, SnapConfig, SourceVideo, WindowPolicy,
};
use shortsmith_pipeline::{Pipeline, PipelineConfig, PipelineError, RunState};

struct FakeProber {
    duration: f64,
    width: u32,
    height: u32,
}

impl FakeProber {
    fn landscape(duration: f64) -> Arc<Self> {
        Arc::new(Self {
            duration,
            width: 1920,
            height: 1080,
        })
    }
}

#[async_trait]
impl MediaProber for FakeProber {
    async fn probe(&self, path: &Path) -> MediaResult<SourceVideo> {
        Ok(SourceVideo::new(path, self.duration, self.width, self.height, 30.0, true))
    }
}

struct BrokenProber;

#[async_trait]
impl MediaProber for BrokenProber {
    async fn probe(&self, path: &Path) -> MediaResult<SourceVideo> {
        Err(MediaError::unreadable(path, "moov atom not found"))
    }
}

/// Writes a small file per job and records what it was asked to do.
#[derive(Default)]
struct FakeRenderer {
    fail_indices: HashSet<u32>,
    calls: Mutex<Vec<(u32, f64, f64, ReframeSpec)>>,
    cancel_after_first: Option<watch::Sender<bool>>,
}

impl FakeRenderer {
    fn failing(indices: &[u32]) -> Self {
        Self {
            fail_indices: indices.iter().copied().collect(),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<(u32, f64, f64, ReframeSpec)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClipRenderer for FakeRenderer {
    async fn render(&self, job: RenderJob) -> MediaResult<RenderOutput> {
        self.calls.lock().unwrap().push((
            job.segment.index,
            job.segment.start,
            job.segment.end,
            job.spec.clone(),
        ));
        if let Some(cancel) = &self.cancel_after_first {
            let _ = cancel.send(true);
        }

        if self.fail_indices.contains(&job.segment.index) {
            return Err(MediaError::render_failure("encoder exited with code 1"));
        }

        tokio::fs::write(&job.output_path, b"clip").await?;
        Ok(RenderOutput {
            output_path: job.output_path,
            file_size_bytes: 4,
            thumbnail_path: None,
            elapsed_ms: 5,
        })
    }
}

struct FixedBoundaries(DetectedBoundaries);

#[async_trait]
impl BoundaryDetector for FixedBoundaries {
    async fn detect(
        &self,
        _source: &SourceVideo,
        _config: &SnapConfig,
    ) -> MediaResult<DetectedBoundaries> {
        Ok(self.0.clone())
    }
}

fn pipeline(prober: Arc<dyn MediaProber>, renderer: Arc<FakeRenderer>) -> Pipeline {
    pipeline_with(PipelineConfig::default(), prober, renderer)
}

fn pipeline_with(
    config: PipelineConfig,
    prober: Arc<dyn MediaProber>,
    renderer: Arc<FakeRenderer>,
) -> Pipeline {
    Pipeline::new(config)
        .with_prober(prober)
        .with_renderer(renderer)
}

fn explicit(ranges: &[(f64, f64)]) -> SegmentPlanRequest {
    SegmentPlanRequest::explicit(
        ranges
            .iter()
            .map(|&(start, end)| SegmentRequest::new(start, end))
            .collect(),
    )
}

fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[tokio::test]
async fn test_windows_cover_120s_source() {
    let dir = TempDir::new().unwrap();
    let renderer = Arc::new(FakeRenderer::default());
    let pipeline = pipeline(FakeProber::landscape(120.0), renderer.clone());

    let request = SegmentPlanRequest::Windows(WindowPolicy::new(15.0, 0.0, 5.0));
    let summary = pipeline
        .run("talk.mp4", &request, dir.path(), &ReframeConfig::default())
        .await
        .unwrap();

    assert_eq!(summary.results.len(), 8);
    assert_eq!(summary.total_succeeded, 8);
    assert!(summary.is_complete_success());
    for (i, result) in summary.results.iter().enumerate() {
        assert_eq!(result.segment.index, i as u32 + 1);
        assert_eq!(result.segment.start, i as f64 * 15.0);
        assert_eq!(result.segment.duration(), 15.0);
        assert!(result.output_path.exists());
    }
    assert_eq!(renderer.calls().len(), 8);
    assert_eq!(pipeline.state(), RunState::Done);
}

#[tokio::test]
async fn test_windows_keep_short_tail_with_sequential_names() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(FakeProber::landscape(125.0), Arc::new(FakeRenderer::default()));

    let request = SegmentPlanRequest::Windows(WindowPolicy::new(15.0, 0.0, 5.0));
    let summary = pipeline
        .run("talk.mp4", &request, dir.path(), &ReframeConfig::default())
        .await
        .unwrap();

    assert_eq!(summary.results.len(), 9);
    let last = &summary.results[8].segment;
    assert_eq!((last.start, last.end), (120.0, 125.0));

    let paths: Vec<PathBuf> = summary.results.iter().map(|r| r.output_path.clone()).collect();
    let expected: Vec<String> = (1..=9).map(|i| format!("short_{:04}.mp4", i)).collect();
    assert_eq!(file_names(&paths), expected);
}

#[tokio::test]
async fn test_failed_segment_does_not_stop_the_run() {
    let dir = TempDir::new().unwrap();
    let renderer = Arc::new(FakeRenderer::failing(&[2]));
    let pipeline = pipeline(FakeProber::landscape(300.0), renderer.clone());

    let request = explicit(&[(0.0, 10.0), (20.0, 30.0), (40.0, 50.0), (60.0, 70.0), (80.0, 90.0)]);
    let summary = pipeline
        .run("talk.mp4", &request, dir.path(), &ReframeConfig::default())
        .await
        .unwrap();

    let statuses: Vec<_> = summary.results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            RenderStatus::Success,
            RenderStatus::Failed,
            RenderStatus::Success,
            RenderStatus::Success,
            RenderStatus::Success,
        ]
    );
    let indices: Vec<u32> = summary.results.iter().map(|r| r.segment.index).collect();
    assert_eq!(indices, vec![1, 2, 3, 4, 5]);

    let failed = &summary.results[1];
    assert!(failed.error_detail.as_deref().unwrap().contains("code 1"));
    assert!(!failed.output_path.exists());
    assert_eq!(summary.total_succeeded, 4);
    assert_eq!(summary.total_failed, 1);
    assert!(!summary.is_complete_success());
    assert_eq!(pipeline.state(), RunState::Done);
}

#[tokio::test]
async fn test_identical_labels_get_distinct_outputs() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(FakeProber::landscape(600.0), Arc::new(FakeRenderer::default()));

    let request = SegmentPlanRequest::explicit(
        (0..10)
            .map(|i| {
                let start = i as f64 * 30.0;
                SegmentRequest::new(start, start + 20.0).with_label("Hot Take")
            })
            .collect(),
    );
    let summary = pipeline
        .run("talk.mp4", &request, dir.path(), &ReframeConfig::default())
        .await
        .unwrap();

    let paths: HashSet<_> = summary.output_paths().into_iter().cloned().collect();
    assert_eq!(paths.len(), 10);
    assert_eq!(summary.results[0].output_path, dir.path().join("hot_take.mp4"));
    assert_eq!(summary.results[9].output_path, dir.path().join("hot_take_10.mp4"));
}

#[tokio::test]
async fn test_rejected_requests_are_reported() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(FakeProber::landscape(60.0), Arc::new(FakeRenderer::default()));

    // Second clamps to 0.5s, third is inverted, fourth clamps to 60.0
    let request = explicit(&[(0.0, 10.0), (59.5, 80.0), (30.0, 20.0), (50.0, 90.0)]);
    let summary = pipeline
        .run("talk.mp4", &request, dir.path(), &ReframeConfig::default())
        .await
        .unwrap();

    assert_eq!(summary.results.len(), 2);
    assert_eq!(summary.results[1].segment.end, 60.0);
    assert_eq!(summary.rejected.len(), 2);
    assert_eq!(summary.rejected[0].request_index, 2);
    assert_eq!(summary.rejected[1].request_index, 3);
    assert_eq!(summary.total_requested, 4);
}

#[tokio::test]
async fn test_landscape_source_is_center_cropped() {
    let dir = TempDir::new().unwrap();
    let renderer = Arc::new(FakeRenderer::default());
    let pipeline = pipeline(FakeProber::landscape(60.0), renderer.clone());

    pipeline
        .run("talk.mp4", &explicit(&[(0.0, 10.0)]), dir.path(), &ReframeConfig::default())
        .await
        .unwrap();

    let calls = renderer.calls();
    let spec = &calls[0].3;
    match spec.geometry {
        ReframeGeometry::Crop(rect) => {
            assert_eq!((rect.x, rect.y, rect.width, rect.height), (656, 0, 607, 1080));
        }
        ref other => panic!("expected crop, got {:?}", other),
    }
}

#[tokio::test]
async fn test_cancel_before_run_skips_everything() {
    let dir = TempDir::new().unwrap();
    let renderer = Arc::new(FakeRenderer::default());
    let pipeline = pipeline(FakeProber::landscape(60.0), renderer.clone());

    let (cancel_tx, cancel_rx) = watch::channel(true);
    let summary = pipeline
        .run_with_cancel(
            "talk.mp4",
            &explicit(&[(0.0, 10.0), (10.0, 20.0)]),
            dir.path(),
            &ReframeConfig::default(),
            cancel_rx,
        )
        .await
        .unwrap();
    drop(cancel_tx);

    assert!(summary.cancelled);
    assert_eq!(summary.total_skipped, 2);
    assert!(renderer.calls().is_empty());
    assert!(summary
        .results
        .iter()
        .all(|r| r.status == RenderStatus::Skipped));
}

#[tokio::test]
async fn test_cancel_mid_run_stops_new_renders() {
    let dir = TempDir::new().unwrap();
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let renderer = Arc::new(FakeRenderer {
        cancel_after_first: Some(cancel_tx),
        ..FakeRenderer::default()
    });
    let config = PipelineConfig {
        max_parallel_renders: 1,
        ..PipelineConfig::default()
    };
    let pipeline = pipeline_with(config, FakeProber::landscape(60.0), renderer.clone());

    let summary = pipeline
        .run_with_cancel(
            "talk.mp4",
            &explicit(&[(0.0, 10.0), (10.0, 20.0), (20.0, 30.0)]),
            dir.path(),
            &ReframeConfig::default(),
            cancel_rx,
        )
        .await
        .unwrap();

    let statuses: Vec<_> = summary.results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![RenderStatus::Success, RenderStatus::Skipped, RenderStatus::Skipped]
    );
    assert!(summary.cancelled);
    assert_eq!(renderer.calls().len(), 1);
}

#[tokio::test]
async fn test_unreadable_source_aborts_early() {
    let dir = TempDir::new().unwrap();
    let renderer = Arc::new(FakeRenderer::default());
    let pipeline = pipeline(Arc::new(BrokenProber), renderer.clone());

    let err = tokio_test::assert_err!(
        pipeline
            .run("broken.mp4", &explicit(&[(0.0, 10.0)]), dir.path(), &ReframeConfig::default())
            .await
    );

    assert!(matches!(
        err,
        PipelineError::Media(MediaError::UnreadableMedia { .. })
    ));
    assert_eq!(pipeline.state(), RunState::AbortedEarly);
    assert!(renderer.calls().is_empty());
}

#[tokio::test]
async fn test_invalid_window_policy_aborts_early() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(FakeProber::landscape(60.0), Arc::new(FakeRenderer::default()));

    let request = SegmentPlanRequest::Windows(WindowPolicy::new(10.0, 10.0, 5.0));
    let err = pipeline
        .run("talk.mp4", &request, dir.path(), &ReframeConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::InvalidPolicy(_)));
    assert_eq!(pipeline.state(), RunState::AbortedEarly);
}

#[tokio::test]
async fn test_naming_collision_aborts_before_rendering() {
    let dir = TempDir::new().unwrap();
    let renderer = Arc::new(FakeRenderer::default());
    let config = PipelineConfig {
        max_name_attempts: 1,
        ..PipelineConfig::default()
    };
    let pipeline = pipeline_with(config, FakeProber::landscape(60.0), renderer.clone());

    let request = SegmentPlanRequest::explicit(vec![
        SegmentRequest::new(0.0, 10.0).with_label("intro"),
        SegmentRequest::new(10.0, 20.0).with_label("intro"),
    ]);
    let err = pipeline
        .run("talk.mp4", &request, dir.path(), &ReframeConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::NamingCollisionUnresolved { attempts: 1, .. }
    ));
    assert_eq!(pipeline.state(), RunState::AbortedEarly);
    assert!(renderer.calls().is_empty());
}

#[tokio::test]
async fn test_output_directory_is_created() {
    let dir = TempDir::new().unwrap();
    let output_dir = dir.path().join("nested").join("shorts");
    let pipeline = pipeline(FakeProber::landscape(60.0), Arc::new(FakeRenderer::default()));

    let summary = pipeline
        .run("talk.mp4", &explicit(&[(5.0, 15.0)]), &output_dir, &ReframeConfig::default())
        .await
        .unwrap();

    assert!(output_dir.is_dir());
    assert_eq!(summary.results[0].output_path, output_dir.join("short_0001.mp4"));
}

#[tokio::test]
async fn test_explicit_cuts_snap_to_scene_changes() {
    let dir = TempDir::new().unwrap();
    let renderer = Arc::new(FakeRenderer::default());
    let config = PipelineConfig {
        snap: Some(SnapConfig {
            max_adjustment: 1.0,
            ..SnapConfig::default()
        }),
        ..PipelineConfig::default()
    };
    let boundaries = DetectedBoundaries {
        scene_cuts: vec![9.5, 20.4, 45.0],
        speech: Vec::new(),
        duration: 60.0,
    };
    let pipeline = pipeline_with(config, FakeProber::landscape(60.0), renderer.clone())
        .with_boundary_detector(Arc::new(FixedBoundaries(boundaries)));

    let summary = pipeline
        .run(
            "talk.mp4",
            &explicit(&[(10.0, 20.0), (30.0, 40.0)]),
            dir.path(),
            &ReframeConfig::default(),
        )
        .await
        .unwrap();

    let first = &summary.results[0].segment;
    assert_eq!((first.start, first.end), (9.5, 20.4));
    // Nothing within reach
    let second = &summary.results[1].segment;
    assert_eq!((second.start, second.end), (30.0, 40.0));
    assert_eq!(renderer.calls()[0].1, 9.5);
}

#[tokio::test]
async fn test_windows_are_never_snapped() {
    let dir = TempDir::new().unwrap();
    let config = PipelineConfig {
        snap: Some(SnapConfig::default()),
        ..PipelineConfig::default()
    };
    let boundaries = DetectedBoundaries {
        scene_cuts: vec![14.5],
        speech: Vec::new(),
        duration: 30.0,
    };
    let renderer = Arc::new(FakeRenderer::default());
    let pipeline = pipeline_with(config, FakeProber::landscape(30.0), renderer)
        .with_boundary_detector(Arc::new(FixedBoundaries(boundaries)));

    let request = SegmentPlanRequest::Windows(WindowPolicy::new(15.0, 0.0, 5.0));
    let summary = pipeline
        .run("talk.mp4", &request, dir.path(), &ReframeConfig::default())
        .await
        .unwrap();

    assert_eq!(summary.results[0].segment.end, 15.0);
    assert_eq!(summary.results[1].segment.start, 15.0);
}

#[tokio::test]
async fn test_state_updates_are_published() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(FakeProber::landscape(60.0), Arc::new(FakeRenderer::default()));
    let mut states = pipeline.subscribe();
    assert_eq!(*states.borrow_and_update(), RunState::Idle);

    pipeline
        .run("talk.mp4", &explicit(&[(0.0, 10.0)]), dir.path(), &ReframeConfig::default())
        .await
        .unwrap();

    assert!(states.has_changed().unwrap());
    assert_eq!(*states.borrow_and_update(), RunState::Done);
}

/// Renders real clips from a generated test pattern.
#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_ffmpeg_end_to_end() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("pattern.mp4");
    let status = std::process::Command::new("ffmpeg")
        .args(["-y", "-hide_banner", "-v", "error", "-f", "lavfi", "-i"])
        .arg("testsrc=size=1280x720:rate=30:duration=6")
        .args(["-f", "lavfi", "-i", "sine=frequency=440:duration=6", "-shortest"])
        .arg(&source)
        .status()
        .unwrap();
    assert!(status.success());

    let config = PipelineConfig {
        thumbnails: true,
        ..PipelineConfig::default()
    };
    let output_dir = dir.path().join("shorts");
    let summary = Pipeline::new(config)
        .run(
            &source,
            &explicit(&[(0.0, 2.0), (3.0, 5.0)]),
            &output_dir,
            &ReframeConfig::default(),
        )
        .await
        .unwrap();

    assert_eq!(summary.total_succeeded, 2);
    for result in &summary.results {
        assert!(result.file_size_bytes > 0);
        assert!(result.thumbnail_path.as_ref().unwrap().exists());
    }
}
