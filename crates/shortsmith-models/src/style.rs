//! Target aspect ratio and reframe configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default maximum output width for vertical clips.
pub const DEFAULT_MAX_OUTPUT_WIDTH: u32 = 1080;
/// Default maximum output height for vertical clips.
pub const DEFAULT_MAX_OUTPUT_HEIGHT: u32 = 1920;
/// Default relative tolerance under which two aspect ratios count as equal.
pub const DEFAULT_RATIO_TOLERANCE: f64 = 0.01;

/// Aspect ratio specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    /// Standard portrait (9:16) for Shorts/TikTok/Reels
    pub const PORTRAIT: AspectRatio = AspectRatio {
        width: 9,
        height: 16,
    };

    /// Square (1:1)
    pub const SQUARE: AspectRatio = AspectRatio {
        width: 1,
        height: 1,
    };

    /// Instagram portrait (4:5)
    pub const INSTAGRAM_PORTRAIT: AspectRatio = AspectRatio {
        width: 4,
        height: 5,
    };

    /// Create a new aspect ratio.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns the aspect ratio as a decimal.
    pub fn as_f64(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for AspectRatio {
    type Err = AspectRatioParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 2 {
            return Err(AspectRatioParseError::InvalidFormat(s.to_string()));
        }

        let width = parts[0]
            .trim()
            .parse()
            .map_err(|_| AspectRatioParseError::InvalidNumber(parts[0].to_string()))?;
        let height = parts[1]
            .trim()
            .parse()
            .map_err(|_| AspectRatioParseError::InvalidNumber(parts[1].to_string()))?;

        if width == 0 || height == 0 {
            return Err(AspectRatioParseError::ZeroValue);
        }

        Ok(AspectRatio { width, height })
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::PORTRAIT
    }
}

#[derive(Debug, Error)]
pub enum AspectRatioParseError {
    #[error("Invalid aspect ratio format: {0}, expected 'W:H'")]
    InvalidFormat(String),
    #[error("Invalid number in aspect ratio: {0}")]
    InvalidNumber(String),
    #[error("Aspect ratio cannot have zero values")]
    ZeroValue,
}

/// How a frame whose ratio differs from the target is fitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReframeMode {
    /// Crop the sides of wider sources; narrower sources are still padded
    #[default]
    Crop,
    /// Always letterbox/pillarbox, never discard pixels
    Pad,
}

impl ReframeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReframeMode::Crop => "crop",
            ReframeMode::Pad => "pad",
        }
    }
}

impl fmt::Display for ReframeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReframeMode {
    type Err = ReframeModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "crop" => Ok(ReframeMode::Crop),
            "pad" => Ok(ReframeMode::Pad),
            _ => Err(ReframeModeParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown reframe mode: {0}")]
pub struct ReframeModeParseError(String);

/// Fill used for the bars added when padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum PadFill {
    /// Solid black bars
    #[default]
    Black,
    /// Blurred, zoomed copy of the source behind the frame
    Blur,
}

impl PadFill {
    pub fn as_str(&self) -> &'static str {
        match self {
            PadFill::Black => "black",
            PadFill::Blur => "blur",
        }
    }
}

impl fmt::Display for PadFill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PadFill {
    type Err = PadFillParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "black" => Ok(PadFill::Black),
            "blur" => Ok(PadFill::Blur),
            _ => Err(PadFillParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown pad fill: {0}")]
pub struct PadFillParseError(String);

/// Horizontal placement hint for the crop window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// Window centered on the frame
    #[default]
    Center,
    /// Window flush with the left edge
    Left,
    /// Window flush with the right edge
    Right,
    /// Window centered on a normalized x position (0.0 = left, 1.0 = right)
    Position(f64),
}

impl Anchor {
    /// Normalized x coordinate the crop window should be centered on.
    pub fn center_x(&self) -> f64 {
        match self {
            Anchor::Center => 0.5,
            Anchor::Left => 0.0,
            Anchor::Right => 1.0,
            Anchor::Position(x) if x.is_finite() => x.clamp(0.0, 1.0),
            Anchor::Position(_) => 0.5,
        }
    }

    /// Whether this anchor is the plain center.
    pub fn is_center(&self) -> bool {
        matches!(self, Anchor::Center)
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anchor::Center => write!(f, "center"),
            Anchor::Left => write!(f, "left"),
            Anchor::Right => write!(f, "right"),
            Anchor::Position(x) => write!(f, "{:.3}", x),
        }
    }
}

impl FromStr for Anchor {
    type Err = AnchorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "center" => Ok(Anchor::Center),
            "left" => Ok(Anchor::Left),
            "right" => Ok(Anchor::Right),
            other => {
                let x: f64 = other
                    .parse()
                    .map_err(|_| AnchorParseError(s.to_string()))?;
                if !(0.0..=1.0).contains(&x) {
                    return Err(AnchorParseError(s.to_string()));
                }
                Ok(Anchor::Position(x))
            }
        }
    }
}

#[derive(Debug, Error)]
#[error("Invalid anchor '{0}', expected center, left, right or a number in [0, 1]")]
pub struct AnchorParseError(String);

/// Reframe settings shared by every segment of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReframeConfig {
    /// Target aspect ratio (default 9:16)
    #[serde(default)]
    pub target_ratio: AspectRatio,

    /// Crop or pad
    #[serde(default)]
    pub mode: ReframeMode,

    /// Static placement hint for crop windows
    #[serde(default)]
    pub anchor: Anchor,

    /// Fill for padded bars
    #[serde(default)]
    pub pad_fill: PadFill,

    /// Relative tolerance under which the source passes through unchanged
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Output frames are scaled down to fit this width
    #[serde(default = "default_max_output_width")]
    pub max_output_width: u32,

    /// Output frames are scaled down to fit this height
    #[serde(default = "default_max_output_height")]
    pub max_output_height: u32,
}

fn default_tolerance() -> f64 {
    DEFAULT_RATIO_TOLERANCE
}
fn default_max_output_width() -> u32 {
    DEFAULT_MAX_OUTPUT_WIDTH
}
fn default_max_output_height() -> u32 {
    DEFAULT_MAX_OUTPUT_HEIGHT
}

impl Default for ReframeConfig {
    fn default() -> Self {
        Self {
            target_ratio: AspectRatio::PORTRAIT,
            mode: ReframeMode::Crop,
            anchor: Anchor::Center,
            pad_fill: PadFill::Black,
            tolerance: DEFAULT_RATIO_TOLERANCE,
            max_output_width: DEFAULT_MAX_OUTPUT_WIDTH,
            max_output_height: DEFAULT_MAX_OUTPUT_HEIGHT,
        }
    }
}

impl ReframeConfig {
    /// Create a config targeting the given ratio with default settings.
    pub fn new(target_ratio: AspectRatio) -> Self {
        Self {
            target_ratio,
            ..Default::default()
        }
    }

    pub fn with_mode(mut self, mode: ReframeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn with_pad_fill(mut self, pad_fill: PadFill) -> Self {
        self.pad_fill = pad_fill;
        self
    }
}
