//! Computed reframe geometry.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::style::{Anchor, PadFill};

/// An axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the rectangle lies fully inside a `frame_width` x `frame_height` frame.
    pub fn fits_within(&self, frame_width: u32, frame_height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x as u64 + self.width as u64 <= frame_width as u64
            && self.y as u64 + self.height as u64 <= frame_height as u64
    }
}

/// How the source frame maps onto the reframed canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReframeGeometry {
    /// Source ratio already matches the target
    Identity,
    /// Keep only this region of the source frame
    Crop(PixelRect),
    /// Place the source frame on a larger canvas
    Pad {
        canvas_width: u32,
        canvas_height: u32,
        offset_x: u32,
        offset_y: u32,
        fill: PadFill,
    },
}

/// Reframe transform for one segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReframeSpec {
    /// Encoded output width
    pub target_width: u32,
    /// Encoded output height
    pub target_height: u32,
    /// Source frame width the geometry was computed for
    pub source_width: u32,
    /// Source frame height the geometry was computed for
    pub source_height: u32,
    pub geometry: ReframeGeometry,
    /// Anchor the crop window was placed with
    pub anchor: Anchor,
}

impl ReframeSpec {
    pub fn is_identity(&self) -> bool {
        matches!(self.geometry, ReframeGeometry::Identity)
    }

    /// Size of the frame after crop/pad and before output scaling.
    pub fn reframed_size(&self) -> (u32, u32) {
        match self.geometry {
            ReframeGeometry::Identity => (self.source_width, self.source_height),
            ReframeGeometry::Crop(rect) => (rect.width, rect.height),
            ReframeGeometry::Pad {
                canvas_width,
                canvas_height,
                ..
            } => (canvas_width, canvas_height),
        }
    }

    /// Check the crop/pad containment invariant against the source frame.
    pub fn is_consistent(&self) -> bool {
        match self.geometry {
            ReframeGeometry::Identity => true,
            ReframeGeometry::Crop(rect) => rect.fits_within(self.source_width, self.source_height),
            ReframeGeometry::Pad {
                canvas_width,
                canvas_height,
                offset_x,
                offset_y,
                ..
            } => {
                offset_x as u64 + self.source_width as u64 <= canvas_width as u64
                    && offset_y as u64 + self.source_height as u64 <= canvas_height as u64
            }
        }
    }
}
