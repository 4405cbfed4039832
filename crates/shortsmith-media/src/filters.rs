//! FFmpeg filter graphs for reframe specs.

use shortsmith_models::{PadFill, ReframeGeometry, ReframeSpec};

use crate::command::FfmpegCommand;

/// Gaussian blur strength of the padded background.
pub const BACKGROUND_BLUR_SIGMA: f64 = 20.0;

/// Output label of complex filter graphs.
const VIDEO_OUT: &str = "[vout]";

/// Filter arguments realising one [`ReframeSpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReframeFilter {
    /// Frames pass through untouched
    Passthrough,
    /// A linear chain for `-vf`
    Chain(String),
    /// A graph for `-filter_complex` ending in `[vout]`
    Graph(String),
}

impl ReframeFilter {
    /// Attach the filter to a command, mapping streams when a graph is used.
    pub fn apply(&self, cmd: FfmpegCommand, with_audio: bool) -> FfmpegCommand {
        match self {
            ReframeFilter::Passthrough => cmd,
            ReframeFilter::Chain(chain) => cmd.video_filter(chain.clone()),
            ReframeFilter::Graph(graph) => {
                let cmd = cmd.filter_complex(graph.clone()).map(VIDEO_OUT);
                if with_audio {
                    cmd.map("0:a:0?")
                } else {
                    cmd
                }
            }
        }
    }
}

/// Build the filter for a spec.
pub fn build_reframe_filter(spec: &ReframeSpec) -> ReframeFilter {
    let (tw, th) = (spec.target_width, spec.target_height);
    let scale = format!("scale={}:{}:flags=lanczos,setsar=1", tw, th);

    match spec.geometry {
        ReframeGeometry::Identity => {
            if (spec.source_width, spec.source_height) == (tw, th) {
                ReframeFilter::Passthrough
            } else {
                ReframeFilter::Chain(scale)
            }
        }
        ReframeGeometry::Crop(rect) => ReframeFilter::Chain(format!(
            "crop={}:{}:{}:{},{}",
            rect.width, rect.height, rect.x, rect.y, scale
        )),
        ReframeGeometry::Pad {
            canvas_width,
            canvas_height,
            offset_x,
            offset_y,
            fill: PadFill::Black,
        } => ReframeFilter::Chain(format!(
            "pad={}:{}:{}:{}:color=black,{}",
            canvas_width, canvas_height, offset_x, offset_y, scale
        )),
        ReframeGeometry::Pad {
            canvas_width,
            canvas_height,
            offset_x,
            offset_y,
            fill: PadFill::Blur,
        } => {
            // Foreground keeps the canvas-to-output scale factor
            let fg_width = even_floor(spec.source_width as u64 * tw as u64 / canvas_width.max(1) as u64);
            let fg_height =
                even_floor(spec.source_height as u64 * th as u64 / canvas_height.max(1) as u64);
            let x = (offset_x as u64 * tw as u64 / canvas_width.max(1) as u64)
                .min(tw.saturating_sub(fg_width) as u64);
            let y = (offset_y as u64 * th as u64 / canvas_height.max(1) as u64)
                .min(th.saturating_sub(fg_height) as u64);

            ReframeFilter::Graph(format!(
                "[0:v]split=2[bgsrc][fgsrc];\
                 [bgsrc]scale={tw}:{th}:force_original_aspect_ratio=increase,\
                 crop={tw}:{th},gblur=sigma={sigma},format=yuv420p[bg];\
                 [fgsrc]scale={fw}:{fh}:flags=lanczos,format=yuv420p[fg];\
                 [bg][fg]overlay={x}:{y}:format=auto,setsar=1{out}",
                tw = tw,
                th = th,
                sigma = BACKGROUND_BLUR_SIGMA,
                fw = fg_width,
                fh = fg_height,
                x = x,
                y = y,
                out = VIDEO_OUT,
            ))
        }
    }
}

/// Scale filter for thumbnails of the given width.
pub fn thumbnail_filter(width: u32) -> String {
    format!("scale={}:-2", width)
}

fn even_floor(v: u64) -> u32 {
    ((v as u32) & !1).max(2)
}
