//! Source video descriptor.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Immutable description of the probed source file.
///
/// Produced once per run by the prober and shared read-only by every render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SourceVideo {
    /// Path to the source file
    pub path: PathBuf,
    /// Duration in seconds
    pub duration: f64,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Frame rate (fps)
    pub frame_rate: f64,
    /// Whether the file has at least one audio stream
    pub has_audio: bool,
    /// Video codec name reported by the container
    #[serde(default)]
    pub video_codec: String,
    /// File size in bytes
    #[serde(default)]
    pub size_bytes: u64,
}

impl SourceVideo {
    /// Create a descriptor with the fields the pipeline relies on.
    pub fn new(
        path: impl Into<PathBuf>,
        duration: f64,
        width: u32,
        height: u32,
        frame_rate: f64,
        has_audio: bool,
    ) -> Self {
        Self {
            path: path.into(),
            duration,
            width,
            height,
            frame_rate,
            has_audio,
            video_codec: String::new(),
            size_bytes: 0,
        }
    }

    /// Width divided by height.
    pub fn aspect(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f64 / self.height as f64
    }

    /// Whether the frame is wider than it is tall.
    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}
