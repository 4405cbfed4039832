//! Scene-change and speech-pause detection for snapping cut points.
//!
//! Both detectors are plain FFmpeg analysis passes: the `scene` score of the
//! `select` filter for cuts, `silencedetect` for pauses. Results are read from
//! the log output.

use async_trait::async_trait;
use tracing::{debug, info};

use shortsmith_models::{BoundaryPriority, SnapConfig, SourceVideo};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Speech boundaries closer than this to the previous one are dropped.
pub const MIN_BOUNDARY_SPACING_SECS: f64 = 1.0;

/// Which end of a segment is being snapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutEdge {
    Start,
    End,
}

/// Boundaries found in one source, in seconds, ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectedBoundaries {
    /// Times where a new scene begins
    pub scene_cuts: Vec<f64>,
    /// Midpoints of pauses in speech
    pub speech: Vec<f64>,
    /// Source duration, the implicit end of the last scene
    pub duration: f64,
}

impl DetectedBoundaries {
    pub fn is_empty(&self) -> bool {
        self.scene_cuts.is_empty() && self.speech.is_empty()
    }

    /// Move `time` to the preferred boundary within `max_adjustment`, or leave it.
    pub fn snap(
        &self,
        time: f64,
        edge: CutEdge,
        priority: BoundaryPriority,
        max_adjustment: f64,
    ) -> f64 {
        if self.is_empty() {
            return time;
        }

        // Scenes start at 0 and at each cut; they end at each cut and at the source end
        let mut scenes = self.scene_cuts.clone();
        if !scenes.is_empty() {
            match edge {
                CutEdge::Start => scenes.insert(0, 0.0),
                CutEdge::End => scenes.push(self.duration),
            }
        }

        let nearby_scene = nearest_within(&scenes, time, max_adjustment);
        let nearby_speech = nearest_within(&self.speech, time, max_adjustment);
        let nearest = || closest(time, nearby_scene, nearby_speech);

        let chosen = match priority {
            BoundaryPriority::SceneFirst => nearby_scene.or(nearby_speech),
            BoundaryPriority::SpeechFirst => nearby_speech.or(nearby_scene),
            BoundaryPriority::Nearest => nearest(),
            BoundaryPriority::SceneStartSpeechEnd => match edge {
                CutEdge::Start => nearby_scene.or_else(nearest),
                CutEdge::End => nearby_speech.or_else(nearest),
            },
        };

        chosen.unwrap_or(time)
    }
}

/// Finds boundaries in a source.
#[async_trait]
pub trait BoundaryDetector: Send + Sync {
    async fn detect(
        &self,
        source: &SourceVideo,
        config: &SnapConfig,
    ) -> MediaResult<DetectedBoundaries>;
}

/// Detector running FFmpeg analysis passes.
#[derive(Debug, Clone, Default)]
pub struct FfmpegBoundaryDetector {
    runner: FfmpegRunner,
}

impl FfmpegBoundaryDetector {
    pub fn new(runner: FfmpegRunner) -> Self {
        Self { runner }
    }

    async fn scene_cuts(&self, source: &SourceVideo, threshold: f64) -> MediaResult<Vec<f64>> {
        let cmd = FfmpegCommand::analysis(&source.path)
            .no_audio()
            .video_filter(format!("select='gt(scene,{})',showinfo", threshold));
        let log = self.runner.run_collecting_log(&cmd).await?;
        Ok(parse_scene_cuts(&log))
    }

    async fn speech_boundaries(
        &self,
        source: &SourceVideo,
        config: &SnapConfig,
    ) -> MediaResult<Vec<f64>> {
        let cmd = FfmpegCommand::analysis(&source.path)
            .no_video()
            .audio_filter(format!(
                "silencedetect=noise={}dB:d={}",
                config.silence_noise_db, config.min_silence
            ));
        let log = self.runner.run_collecting_log(&cmd).await?;
        Ok(collapse_close(
            parse_silence_midpoints(&log, source.duration),
            MIN_BOUNDARY_SPACING_SECS,
        ))
    }
}

#[async_trait]
impl BoundaryDetector for FfmpegBoundaryDetector {
    async fn detect(
        &self,
        source: &SourceVideo,
        config: &SnapConfig,
    ) -> MediaResult<DetectedBoundaries> {
        info!("Detecting scene changes in {}", source.path.display());
        let scene_cuts = self.scene_cuts(source, config.scene_threshold).await?;

        let speech = if source.has_audio {
            info!("Detecting pauses in speech in {}", source.path.display());
            self.speech_boundaries(source, config).await?
        } else {
            Vec::new()
        };

        debug!(
            "Found {} scene cuts and {} speech boundaries",
            scene_cuts.len(),
            speech.len()
        );

        Ok(DetectedBoundaries {
            scene_cuts,
            speech,
            duration: source.duration,
        })
    }
}

fn nearest_within(candidates: &[f64], time: f64, max_adjustment: f64) -> Option<f64> {
    candidates
        .iter()
        .copied()
        .filter(|c| (c - time).abs() <= max_adjustment)
        .min_by(|a, b| (a - time).abs().total_cmp(&(b - time).abs()))
}

fn closest(time: f64, a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if (b - time).abs() < (a - time).abs() { b } else { a }),
        (a, b) => a.or(b),
    }
}

/// Extract `pts_time` values from `showinfo` log lines.
fn parse_scene_cuts(log: &[String]) -> Vec<f64> {
    let mut cuts: Vec<f64> = log
        .iter()
        .filter(|line| line.contains("showinfo"))
        .filter_map(|line| field_value(line, "pts_time:"))
        .filter(|t| *t > 0.0)
        .collect();
    cuts.sort_by(f64::total_cmp);
    cuts.dedup();
    cuts
}

/// Midpoints of each `silence_start`/`silence_end` pair.
///
/// A silence still open at the end of the stream closes at `duration`.
fn parse_silence_midpoints(log: &[String], duration: f64) -> Vec<f64> {
    let mut midpoints = Vec::new();
    let mut open: Option<f64> = None;

    for line in log {
        if let Some(start) = field_value(line, "silence_start:") {
            open = Some(start.max(0.0));
        } else if let Some(end) = field_value(line, "silence_end:") {
            if let Some(start) = open.take() {
                midpoints.push((start + end) / 2.0);
            }
        }
    }
    if let Some(start) = open {
        if duration > start {
            midpoints.push((start + duration) / 2.0);
        }
    }

    midpoints
}

/// Keep boundaries strictly more than `spacing` after the last kept one.
fn collapse_close(boundaries: Vec<f64>, spacing: f64) -> Vec<f64> {
    let mut kept: Vec<f64> = Vec::with_capacity(boundaries.len());
    for boundary in boundaries {
        if kept.last().map_or(true, |last| boundary - last > spacing) {
            kept.push(boundary);
        }
    }
    kept
}

fn field_value(line: &str, key: &str) -> Option<f64> {
    let rest = &line[line.find(key)? + key.len()..];
    rest.split_whitespace().next()?.parse().ok()
}
