//! Clip rendering: trim, reframe and encode one segment.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use shortsmith_models::{EncodingConfig, ReframeSpec, Segment, SourceVideo};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::build_reframe_filter;
use crate::fs_utils::{file_size, remove_if_exists, write_atomically};
use crate::progress::FfmpegProgress;
use crate::thumbnail::{generate_thumbnail, thumbnail_path};

/// Everything needed to render one segment.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub source: Arc<SourceVideo>,
    pub segment: Segment,
    pub spec: ReframeSpec,
    /// Final path of the clip
    pub output_path: PathBuf,
    /// Kills the encoder when it turns `true`
    pub cancel: Option<watch::Receiver<bool>>,
}

/// A clip written to its final path.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutput {
    pub output_path: PathBuf,
    pub file_size_bytes: u64,
    pub thumbnail_path: Option<PathBuf>,
    pub elapsed_ms: u64,
}

/// Renders segments to files.
#[async_trait]
pub trait ClipRenderer: Send + Sync {
    async fn render(&self, job: RenderJob) -> MediaResult<RenderOutput>;
}

/// Settings shared by every render of a run.
#[derive(Debug, Clone, Default)]
pub struct RendererOptions {
    pub encoding: EncodingConfig,
    /// Kill a single render after this many seconds
    pub timeout_secs: Option<u64>,
    /// Write a JPEG thumbnail beside each clip
    pub thumbnails: bool,
}

/// Renderer driving the `ffmpeg` executable.
#[derive(Debug, Clone, Default)]
pub struct FfmpegClipRenderer {
    options: RendererOptions,
}

impl FfmpegClipRenderer {
    pub fn new(options: RendererOptions) -> Self {
        Self { options }
    }

    /// Build the encode command writing to `output`.
    pub fn build_command(&self, job: &RenderJob, output: &Path) -> FfmpegCommand {
        let segment = &job.segment;
        let cmd = FfmpegCommand::new(&job.source.path, output)
            .seek(segment.start)
            .duration(segment.duration());

        let cmd = build_reframe_filter(&job.spec).apply(cmd, job.source.has_audio);

        cmd.output_args(self.options.encoding.to_ffmpeg_args(job.source.has_audio))
    }

    fn runner(&self, job: &RenderJob) -> FfmpegRunner {
        let mut runner = FfmpegRunner::new();
        if let Some(secs) = self.options.timeout_secs {
            runner = runner.with_timeout(secs);
        }
        if let Some(cancel) = job.cancel.clone() {
            runner = runner.with_cancel(cancel);
        }
        runner
    }

    async fn write_thumbnail(&self, clip: &Path, clip_duration: f64) -> Option<PathBuf> {
        let thumb = thumbnail_path(clip);
        match generate_thumbnail(clip, &thumb, clip_duration).await {
            Ok(()) => Some(thumb),
            Err(e) => {
                warn!("Thumbnail failed for {}: {}", clip.display(), e);
                remove_if_exists(&thumb).await;
                None
            }
        }
    }
}

#[async_trait]
impl ClipRenderer for FfmpegClipRenderer {
    async fn render(&self, job: RenderJob) -> MediaResult<RenderOutput> {
        let started = Instant::now();
        let segment = job.segment.clone();

        if let Some(parent) = job.output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let clip_secs = segment.duration();
        let index = segment.index;

        info!(
            segment = index,
            output = %job.output_path.display(),
            "Rendering {}",
            segment
        );

        let runner = self.runner(&job);
        write_atomically(&job.output_path, |partial| {
            let cmd = self.build_command(&job, &partial);
            async move {
                runner
                    .run_with_progress(&cmd, move |progress: FfmpegProgress| {
                        debug!(
                            segment = index,
                            eta_secs = ?progress.eta_seconds(clip_secs),
                            "Encoding {:.0}% (speed {:.2}x)",
                            progress.fraction(clip_secs) * 100.0,
                            progress.speed
                        );
                    })
                    .await
            }
        })
        .await
        .map_err(into_render_error)?;

        let thumbnail_path = if self.options.thumbnails {
            self.write_thumbnail(&job.output_path, clip_secs).await
        } else {
            None
        };

        Ok(RenderOutput {
            file_size_bytes: file_size(&job.output_path).await,
            output_path: job.output_path,
            thumbnail_path,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }
}

/// Cancellation and timeouts keep their identity; everything else becomes a render failure.
fn into_render_error(err: MediaError) -> MediaError {
    match err {
        MediaError::Cancelled
        | MediaError::Timeout(_)
        | MediaError::FfmpegNotFound
        | MediaError::RenderFailure(_) => err,
        other => MediaError::render_failure(other.detail()),
    }
}
