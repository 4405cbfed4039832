//! Crop/pad geometry from a source frame to a vertical target ratio.
//!
//! All arithmetic is integer so the same inputs always produce the same
//! [`ReframeSpec`].

use async_trait::async_trait;

use shortsmith_models::{
    Anchor, PixelRect, ReframeConfig, ReframeGeometry, ReframeMode, ReframeSpec, Segment,
    SourceVideo,
};

/// Region-of-interest hint for one segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoiHint {
    /// Normalized x coordinate of the subject (0.0 = left edge, 1.0 = right edge)
    pub center_x: f64,
}

impl RoiHint {
    pub fn new(center_x: f64) -> Self {
        Self { center_x }
    }
}

/// Supplies a region-of-interest hint per segment.
///
/// Returning `None` leaves placement to the configured [`Anchor`].
#[async_trait]
pub trait RoiStrategy: Send + Sync {
    async fn hint(&self, source: &SourceVideo, segment: &Segment) -> Option<RoiHint>;
}

/// Uses the configured anchor for every segment without looking at frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticAnchor;

#[async_trait]
impl RoiStrategy for StaticAnchor {
    async fn hint(&self, _source: &SourceVideo, _segment: &Segment) -> Option<RoiHint> {
        None
    }
}

/// Computes [`ReframeSpec`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reframer;

impl Reframer {
    /// Geometry mapping a `width` x `height` frame into the configured ratio.
    pub fn compute(
        width: u32,
        height: u32,
        config: &ReframeConfig,
        roi: Option<RoiHint>,
    ) -> ReframeSpec {
        let tw = config.target_ratio.width.max(1) as u64;
        let th = config.target_ratio.height.max(1) as u64;
        let (w, h) = (width.max(1) as u64, height.max(1) as u64);

        let anchor = match roi {
            Some(hint) if hint.center_x.is_finite() => Anchor::Position(hint.center_x.clamp(0.0, 1.0)),
            _ => config.anchor,
        };

        let source_ratio = w as f64 / h as f64;
        let target_ratio = tw as f64 / th as f64;
        let relative_diff = (source_ratio - target_ratio).abs() / target_ratio;

        let geometry = if relative_diff <= config.tolerance {
            ReframeGeometry::Identity
        } else if source_ratio > target_ratio {
            match config.mode {
                ReframeMode::Crop => {
                    let crop_width = round_half_down(h * tw, th).clamp(1, w);
                    let x = crop_offset(w, crop_width, anchor);
                    ReframeGeometry::Crop(PixelRect::new(x as u32, 0, crop_width as u32, h as u32))
                }
                ReframeMode::Pad => {
                    let canvas_height = round_half_down(w * th, tw).max(h);
                    ReframeGeometry::Pad {
                        canvas_width: w as u32,
                        canvas_height: canvas_height as u32,
                        offset_x: 0,
                        offset_y: ((canvas_height - h) / 2) as u32,
                        fill: config.pad_fill,
                    }
                }
            }
        } else {
            // Narrower sources are always pillarboxed
            let canvas_width = round_half_down(h * tw, th).max(w);
            ReframeGeometry::Pad {
                canvas_width: canvas_width as u32,
                canvas_height: h as u32,
                offset_x: ((canvas_width - w) / 2) as u32,
                offset_y: 0,
                fill: config.pad_fill,
            }
        };

        let mut spec = ReframeSpec {
            target_width: 0,
            target_height: 0,
            source_width: w as u32,
            source_height: h as u32,
            geometry,
            anchor,
        };
        let (rw, rh) = spec.reframed_size();
        let (target_width, target_height) =
            fit_output(rw, rh, config.max_output_width, config.max_output_height);
        spec.target_width = target_width;
        spec.target_height = target_height;
        spec
    }

    /// Geometry for a probed source and segment, consulting the ROI strategy.
    pub async fn for_segment(
        source: &SourceVideo,
        segment: &Segment,
        config: &ReframeConfig,
        roi: &dyn RoiStrategy,
    ) -> ReframeSpec {
        let hint = match config.mode {
            // Hints only move crop windows
            ReframeMode::Crop => roi.hint(source, segment).await,
            ReframeMode::Pad => None,
        };
        Self::compute(source.width, source.height, config, hint)
    }
}

/// `num / den` rounded to nearest, with exact halves rounding down.
fn round_half_down(num: u64, den: u64) -> u64 {
    (2 * num + den - 1) / (2 * den)
}

/// Left edge of a crop window centered on the anchor, kept inside the frame.
fn crop_offset(frame_width: u64, crop_width: u64, anchor: Anchor) -> u64 {
    let max_x = frame_width - crop_width;
    if anchor.is_center() {
        return max_x / 2;
    }
    let center = anchor.center_x() * frame_width as f64;
    let x = (center - crop_width as f64 / 2.0).floor();
    if x <= 0.0 {
        0
    } else {
        (x as u64).min(max_x)
    }
}

/// Scale `(width, height)` down (never up) to fit the bounds, floored to even.
fn fit_output(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    let scale = 1.0_f64
        .min(max_width.max(2) as f64 / width.max(1) as f64)
        .min(max_height.max(2) as f64 / height.max(1) as f64);
    let even = |v: f64| ((v.floor() as u32) & !1).max(2);
    (even(width as f64 * scale), even(height as f64 * scale))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shortsmith_models::{AspectRatio, PadFill};

    fn portrait() -> ReframeConfig {
        ReframeConfig::new(AspectRatio::PORTRAIT)
    }

    #[test]
    fn test_landscape_center_crop() {
        let spec = Reframer::compute(1920, 1080, &portrait(), None);
        assert_eq!(
            spec.geometry,
            ReframeGeometry::Crop(PixelRect::new(656, 0, 607, 1080))
        );
        assert_eq!((spec.target_width, spec.target_height), (606, 1080));
        assert!(spec.is_consistent());
    }

    #[test]
    fn test_crop_is_deterministic() {
        let config = portrait().with_anchor(Anchor::Position(0.3));
        let a = Reframer::compute(3840, 2160, &config, None);
        let b = Reframer::compute(3840, 2160, &config, None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_anchor_edges_stay_inside() {
        let left = Reframer::compute(1920, 1080, &portrait().with_anchor(Anchor::Left), None);
        let right = Reframer::compute(1920, 1080, &portrait().with_anchor(Anchor::Right), None);
        assert_eq!(left.geometry, ReframeGeometry::Crop(PixelRect::new(0, 0, 607, 1080)));
        assert_eq!(
            right.geometry,
            ReframeGeometry::Crop(PixelRect::new(1313, 0, 607, 1080))
        );
        assert!(left.is_consistent() && right.is_consistent());
    }

    #[test]
    fn test_roi_hint_overrides_anchor() {
        let config = portrait().with_anchor(Anchor::Left);
        let spec = Reframer::compute(1920, 1080, &config, Some(RoiHint::new(0.75)));
        // 0.75 * 1920 - 303.5 = 1136.5
        assert_eq!(
            spec.geometry,
            ReframeGeometry::Crop(PixelRect::new(1136, 0, 607, 1080))
        );
        assert_eq!(spec.anchor, Anchor::Position(0.75));
    }

    #[test]
    fn test_matching_ratio_is_identity() {
        let spec = Reframer::compute(1080, 1920, &portrait(), None);
        assert!(spec.is_identity());
        assert_eq!((spec.target_width, spec.target_height), (1080, 1920));

        // 1.0% off still passes through
        let spec = Reframer::compute(1086, 1920, &portrait(), None);
        assert!(spec.is_identity());
    }

    #[test]
    fn test_tall_source_is_pillarboxed() {
        let spec = Reframer::compute(720, 1920, &portrait(), None);
        assert_eq!(
            spec.geometry,
            ReframeGeometry::Pad {
                canvas_width: 1080,
                canvas_height: 1920,
                offset_x: 180,
                offset_y: 0,
                fill: PadFill::Black,
            }
        );
        assert_eq!((spec.target_width, spec.target_height), (1080, 1920));
    }

    #[test]
    fn test_narrow_source_pillarbox_odd_pixel_goes_right() {
        let config = ReframeConfig::new(AspectRatio::SQUARE);
        let spec = Reframer::compute(607, 1080, &config, None);
        match spec.geometry {
            ReframeGeometry::Pad {
                canvas_width,
                canvas_height,
                offset_x,
                offset_y,
                ..
            } => {
                assert_eq!((canvas_width, canvas_height), (1080, 1080));
                // 473 spare pixels: 236 left, 237 right
                assert_eq!(offset_x, 236);
                assert_eq!(offset_y, 0);
            }
            other => panic!("expected pad, got {:?}", other),
        }
        assert!(spec.is_consistent());
    }

    #[test]
    fn test_pad_mode_letterboxes_wide_source() {
        let config = portrait().with_mode(ReframeMode::Pad).with_pad_fill(PadFill::Blur);
        let spec = Reframer::compute(1920, 1080, &config, None);
        match spec.geometry {
            ReframeGeometry::Pad {
                canvas_width,
                canvas_height,
                offset_x,
                offset_y,
                fill,
            } => {
                assert_eq!((canvas_width, canvas_height), (1920, 3413));
                assert_eq!(offset_x, 0);
                assert_eq!(offset_y, (3413 - 1080) / 2);
                assert_eq!(fill, PadFill::Blur);
            }
            other => panic!("expected pad, got {:?}", other),
        }
        assert_eq!((spec.target_width, spec.target_height), (1080, 1918));
    }

    #[test]
    fn test_output_never_upscales() {
        let spec = Reframer::compute(640, 360, &portrait(), None);
        assert_eq!(
            spec.geometry,
            ReframeGeometry::Crop(PixelRect::new(219, 0, 202, 360))
        );
        assert_eq!((spec.target_width, spec.target_height), (202, 360));
    }

    #[test]
    fn test_round_half_down() {
        assert_eq!(round_half_down(1080 * 9, 16), 607);
        assert_eq!(round_half_down(1081 * 9, 16), 608);
        assert_eq!(round_half_down(10, 4), 2);
    }

    #[tokio::test]
    async fn test_static_anchor_gives_no_hint() {
        let source = SourceVideo::new("in.mp4", 60.0, 1920, 1080, 30.0, true);
        let segment = Segment::new(1, 0.0, 10.0, None);
        assert!(StaticAnchor.hint(&source, &segment).await.is_none());

        let spec = Reframer::for_segment(&source, &segment, &portrait(), &StaticAnchor).await;
        assert_eq!(spec, Reframer::compute(1920, 1080, &portrait(), None));
    }
}
