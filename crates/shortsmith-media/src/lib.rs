//! FFmpeg CLI wrapper for the shortsmith pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - Cancellation and timeout support via tokio
//! - Source probing with ffprobe
//! - Reframe geometry (crop/pad to a vertical ratio) and filter graphs
//! - Clip rendering with atomic output placement
//! - Scene-change and pause detection for cut-point snapping

pub mod boundaries;
pub mod command;
pub mod error;
pub mod filters;
pub mod fs_utils;
pub mod probe;
pub mod progress;
pub mod reframe;
pub mod render;
pub mod thumbnail;

pub use boundaries::{BoundaryDetector, CutEdge, DetectedBoundaries, FfmpegBoundaryDetector};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use filters::{build_reframe_filter, thumbnail_filter, ReframeFilter};
pub use probe::{probe_video, FfprobeProber, MediaProber};
pub use progress::FfmpegProgress;
pub use reframe::{Reframer, RoiHint, RoiStrategy, StaticAnchor};
pub use render::{ClipRenderer, FfmpegClipRenderer, RenderJob, RenderOutput, RendererOptions};
pub use thumbnail::{generate_thumbnail, thumbnail_path};
