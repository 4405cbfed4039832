//! Command-line arguments for the `shortsmith` binary.

use anyhow::{bail, Context};
use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use shortsmith_models::{
    Anchor, AspectRatio, BoundaryPriority, PadFill, RandomPolicy, ReframeConfig, ReframeMode,
    SegmentPlanRequest, SegmentRequest, SnapConfig, WindowPolicy,
};
use shortsmith_pipeline::PipelineConfig;

const CLI_AFTER_HELP: &str = "Examples:\n  shortsmith run talk.mp4 -o shorts --segment 0:30-1:15=intro --segment 12:00-12:45\n  shortsmith run talk.mp4 -o shorts --window 15 --min-length 5\n  shortsmith run talk.mp4 -o shorts --random 5 --clip-length 30 --seed 7 --mode pad --pad-fill blur\n  shortsmith probe talk.mp4";

#[derive(Debug, Parser)]
#[command(
    name = "shortsmith",
    version,
    about = "Cut vertical short clips out of one long video",
    after_help = CLI_AFTER_HELP
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Plan, reframe and render clips from a source video.
    Run(RunArgs),

    /// Print probed source metadata as JSON.
    Probe {
        /// Source video path.
        source: PathBuf,
    },
}

#[derive(Debug, Args)]
#[command(group(
    ArgGroup::new("plan")
        .required(true)
        .args(["segments", "segments_file", "window", "random"])
))]
pub struct RunArgs {
    /// Source video path.
    pub source: PathBuf,

    /// Directory the clips are written to (created if missing).
    #[arg(short = 'o', long = "output-dir")]
    pub output_dir: PathBuf,

    /// Explicit range, repeatable. Times accept SS, MM:SS or HH:MM:SS[.mmm].
    #[arg(long = "segment", value_name = "START-END[=LABEL]")]
    pub segments: Vec<SegmentRequest>,

    /// JSON array of {"start", "end", "label"} objects.
    #[arg(long, value_name = "JSON")]
    pub segments_file: Option<PathBuf>,

    /// Cut the whole source into windows of this many seconds.
    #[arg(long, value_name = "SECS")]
    pub window: Option<f64>,

    /// Seconds shared by consecutive windows.
    #[arg(long, value_name = "SECS", default_value_t = 0.0, requires = "window")]
    pub overlap: f64,

    /// Shortest clip kept, in seconds.
    #[arg(long, value_name = "SECS")]
    pub min_length: Option<f64>,

    /// Draw this many randomly placed clips.
    #[arg(long, value_name = "N", requires = "clip_length")]
    pub random: Option<u32>,

    /// Length of each random clip, in seconds.
    #[arg(long, value_name = "SECS", requires = "random")]
    pub clip_length: Option<f64>,

    /// Seed for a reproducible random plan.
    #[arg(long, requires = "random")]
    pub seed: Option<u64>,

    /// Let random clips overlap each other.
    #[arg(long, requires = "random")]
    pub allow_overlap: bool,

    /// Target aspect ratio.
    #[arg(long, default_value = "9:16")]
    pub ratio: AspectRatio,

    /// How to reach the target ratio (crop, pad).
    #[arg(long, default_value = "crop")]
    pub mode: ReframeMode,

    /// Crop anchor (center, left, right, or a position in 0.0..=1.0).
    #[arg(long, default_value = "center")]
    pub anchor: Anchor,

    /// Fill for padded areas (black, blur).
    #[arg(long, default_value = "black")]
    pub pad_fill: PadFill,

    /// Maximum concurrent renders.
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    /// Kill a single render after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Move cut points onto nearby scene changes or pauses in speech.
    #[arg(long)]
    pub snap_boundaries: bool,

    /// Boundary preference when snapping.
    #[arg(long, default_value = "scene_first", requires = "snap_boundaries")]
    pub snap_priority: BoundaryPriority,

    /// Largest shift of a cut point when snapping, in seconds.
    #[arg(long, value_name = "SECS", requires = "snap_boundaries")]
    pub snap_max_adjust: Option<f64>,

    /// Encoder quality, 0-51 (lower is better).
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=51))]
    pub crf: Option<u8>,

    /// Encoder preset (e.g. fast, medium, slow).
    #[arg(long)]
    pub preset: Option<String>,

    /// Encode on the GPU with NVENC.
    #[arg(long)]
    pub nvenc: bool,

    /// Write a JPEG thumbnail beside each clip.
    #[arg(long)]
    pub thumbnails: bool,

    /// Never replace files already in the output directory.
    #[arg(long)]
    pub no_overwrite: bool,

    /// Kill running renders on Ctrl-C instead of letting them finish.
    #[arg(long)]
    pub kill_on_cancel: bool,

    /// Print the run summary as JSON.
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// Layer command-line overrides on top of the environment config.
    pub fn apply_to(&self, config: &mut PipelineConfig) {
        if let Some(jobs) = self.jobs.filter(|n| *n > 0) {
            config.max_parallel_renders = jobs;
        }
        if let Some(secs) = self.timeout.filter(|s| *s > 0) {
            config.render_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(min) = self.min_length {
            config.min_clip_length = min;
        }
        if self.snap_boundaries {
            let mut snap = SnapConfig {
                priority: self.snap_priority,
                ..SnapConfig::default()
            };
            if let Some(max) = self.snap_max_adjust {
                snap.max_adjustment = max;
            }
            config.snap = Some(snap);
        }
        if self.nvenc {
            config.encoding = config.encoding.clone().with_nvenc();
        }
        if let Some(crf) = self.crf {
            config.encoding = config.encoding.clone().with_crf(crf);
        }
        if let Some(preset) = self.preset.as_deref().filter(|p| !p.is_empty()) {
            config.encoding = config.encoding.clone().with_preset(preset);
        }
        config.thumbnails |= self.thumbnails;
        config.avoid_overwrite |= self.no_overwrite;
        config.kill_on_cancel |= self.kill_on_cancel;
    }

    pub fn reframe_config(&self) -> ReframeConfig {
        ReframeConfig::new(self.ratio)
            .with_mode(self.mode)
            .with_anchor(self.anchor)
            .with_pad_fill(self.pad_fill)
    }

    /// The plan request selected by the arguments.
    pub async fn plan_request(&self, min_clip_length: f64) -> anyhow::Result<SegmentPlanRequest> {
        if let Some(window) = self.window {
            let min_length = self.min_length.unwrap_or(min_clip_length);
            return Ok(SegmentPlanRequest::Windows(WindowPolicy::new(
                window,
                self.overlap,
                min_length,
            )));
        }

        if let Some(count) = self.random {
            let Some(clip_length) = self.clip_length else {
                bail!("--random needs --clip-length");
            };
            return Ok(SegmentPlanRequest::Random(RandomPolicy {
                count,
                clip_length,
                allow_overlap: self.allow_overlap,
                seed: self.seed,
            }));
        }

        if let Some(path) = &self.segments_file {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let segments: Vec<SegmentRequest> = serde_json::from_str(&raw)
                .with_context(|| format!("parsing {}", path.display()))?;
            return Ok(SegmentPlanRequest::explicit(segments));
        }

        Ok(SegmentPlanRequest::explicit(self.segments.clone()))
    }
}
