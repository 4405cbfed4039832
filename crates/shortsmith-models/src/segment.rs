//! Segment plan requests and validated segments.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::timestamp::{format_seconds, parse_timestamp, TimestampError};

/// A validated time range of the source selected for extraction.
///
/// Invariant: `0 <= start < end <= source duration`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Segment {
    /// 1-based position in the validated plan
    pub index: u32,
    /// Start time in seconds (inclusive)
    pub start: f64,
    /// End time in seconds (exclusive)
    pub end: f64,
    /// Optional user label, used for the output name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Segment {
    pub fn new(index: u32, start: f64, end: f64, label: Option<String>) -> Self {
        Self {
            index,
            start,
            end,
            label,
        }
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether two half-open ranges intersect.
    pub fn overlaps(&self, other: &Segment) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} [{} - {}]",
            self.index,
            format_seconds(self.start),
            format_seconds(self.end)
        )?;
        if let Some(label) = &self.label {
            write!(f, " '{}'", label)?;
        }
        Ok(())
    }
}

/// One user-requested range, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SegmentRequest {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl SegmentRequest {
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Parses `START-END` or `START-END=LABEL`, timestamps as `SS`, `MM:SS` or `HH:MM:SS[.mmm]`.
impl FromStr for SegmentRequest {
    type Err = TimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (range, label) = match s.split_once('=') {
            Some((range, label)) => (range, Some(label.trim().to_string())),
            None => (s, None),
        };
        let (start, end) = range
            .split_once('-')
            .ok_or_else(|| TimestampError::InvalidFormat(s.to_string()))?;

        Ok(Self {
            start: parse_timestamp(start)?,
            end: parse_timestamp(end)?,
            label: label.filter(|l| !l.is_empty()),
        })
    }
}

/// Fixed-length sliding windows over the whole source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WindowPolicy {
    /// Window length in seconds
    pub window_length: f64,
    /// Seconds shared by consecutive windows
    #[serde(default)]
    pub overlap: f64,
    /// Shortest window kept, in seconds
    pub min_length: f64,
}

impl WindowPolicy {
    pub fn new(window_length: f64, overlap: f64, min_length: f64) -> Self {
        Self {
            window_length,
            overlap,
            min_length,
        }
    }

    /// Distance between consecutive window starts.
    pub fn stride(&self) -> f64 {
        self.window_length - self.overlap
    }
}

/// Randomly placed clips of a fixed length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RandomPolicy {
    /// Number of clips to draw
    pub count: u32,
    /// Length of every clip in seconds
    pub clip_length: f64,
    /// Whether drawn clips may overlap each other
    #[serde(default)]
    pub allow_overlap: bool,
    /// Seed for a reproducible plan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// What the planner should produce segments from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SegmentPlanRequest {
    /// Ordered user-specified ranges
    Explicit { segments: Vec<SegmentRequest> },
    /// Sliding windows
    Windows(WindowPolicy),
    /// Random sampling
    Random(RandomPolicy),
}

impl SegmentPlanRequest {
    pub fn explicit(segments: Vec<SegmentRequest>) -> Self {
        Self::Explicit { segments }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentPlanRequest::Explicit { .. } => "explicit",
            SegmentPlanRequest::Windows(_) => "windows",
            SegmentPlanRequest::Random(_) => "random",
        }
    }
}

/// Order in which detected boundaries are preferred when snapping cut points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPriority {
    /// Scene changes, then pauses in speech
    #[default]
    SceneFirst,
    /// Pauses in speech, then scene changes
    SpeechFirst,
    /// Whichever is closest
    Nearest,
    /// Starts on scene changes, ends on pauses in speech
    SceneStartSpeechEnd,
}

impl BoundaryPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoundaryPriority::SceneFirst => "scene_first",
            BoundaryPriority::SpeechFirst => "speech_first",
            BoundaryPriority::Nearest => "nearest",
            BoundaryPriority::SceneStartSpeechEnd => "scene_start_speech_end",
        }
    }
}

impl fmt::Display for BoundaryPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BoundaryPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "scene_first" => Ok(BoundaryPriority::SceneFirst),
            "speech_first" => Ok(BoundaryPriority::SpeechFirst),
            "nearest" => Ok(BoundaryPriority::Nearest),
            "scene_start_speech_end" => Ok(BoundaryPriority::SceneStartSpeechEnd),
            _ => Err(format!("Unknown boundary priority: {}", s)),
        }
    }
}

/// Settings for snapping cut points to detected scene/speech boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SnapConfig {
    /// Largest distance a cut point may move, in seconds
    #[serde(default = "default_max_adjustment")]
    pub max_adjustment: f64,
    #[serde(default)]
    pub priority: BoundaryPriority,
    /// FFmpeg scene score above which a frame starts a new scene
    #[serde(default = "default_scene_threshold")]
    pub scene_threshold: f64,
    /// Audio level treated as silence, in dB
    #[serde(default = "default_silence_noise_db")]
    pub silence_noise_db: f64,
    /// Minimum silence length, in seconds
    #[serde(default = "default_min_silence")]
    pub min_silence: f64,
}

fn default_max_adjustment() -> f64 {
    2.0
}
fn default_scene_threshold() -> f64 {
    0.4
}
fn default_silence_noise_db() -> f64 {
    -35.0
}
fn default_min_silence() -> f64 {
    0.3
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            max_adjustment: default_max_adjustment(),
            priority: BoundaryPriority::default(),
            scene_threshold: default_scene_threshold(),
            silence_noise_db: default_silence_noise_db(),
            min_silence: default_min_silence(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_request_parse() {
        let req: SegmentRequest = "1:00-1:30=Best Moment".parse().unwrap();
        assert_eq!(req.start, 60.0);
        assert_eq!(req.end, 90.0);
        assert_eq!(req.label.as_deref(), Some("Best Moment"));

        let req: SegmentRequest = "00:00:05.5-12".parse().unwrap();
        assert!((req.start - 5.5).abs() < 1e-9);
        assert_eq!(req.end, 12.0);
        assert!(req.label.is_none());
    }

    #[test]
    fn test_segment_request_parse_errors() {
        assert!("90".parse::<SegmentRequest>().is_err());
        assert!("a-b".parse::<SegmentRequest>().is_err());
    }

    #[test]
    fn test_segment_overlap() {
        let a = Segment::new(1, 0.0, 15.0, None);
        let b = Segment::new(2, 15.0, 30.0, None);
        let c = Segment::new(3, 10.0, 20.0, None);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }

    #[test]
    fn test_plan_request_json() {
        let json = r#"{"policy": "windows", "window_length": 15, "min_length": 5}"#;
        let request: SegmentPlanRequest = serde_json::from_str(json).unwrap();
        assert_eq!(
            request,
            SegmentPlanRequest::Windows(WindowPolicy::new(15.0, 0.0, 5.0))
        );

        let json = r#"{"policy": "explicit", "segments": [{"start": 1, "end": 2, "label": "a"}]}"#;
        let request: SegmentPlanRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.as_str(), "explicit");
    }

    #[test]
    fn test_boundary_priority_parse() {
        assert_eq!(
            "scene-start-speech-end".parse::<BoundaryPriority>().unwrap(),
            BoundaryPriority::SceneStartSpeechEnd
        );
        assert!("random".parse::<BoundaryPriority>().is_err());
    }
}
