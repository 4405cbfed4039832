//! Thumbnail generation.

use std::path::{Path, PathBuf};

use shortsmith_models::encoding::{THUMBNAIL_OFFSET_SECS, THUMBNAIL_SCALE_WIDTH};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;
use crate::filters::thumbnail_filter;

/// Thumbnail path beside a clip: `clip.mp4` -> `clip.jpg`.
pub fn thumbnail_path(clip_path: &Path) -> PathBuf {
    clip_path.with_extension("jpg")
}

/// Grab one frame of a rendered clip as a JPEG.
///
/// The frame is taken [`THUMBNAIL_OFFSET_SECS`] into the clip, or halfway
/// through clips shorter than twice that.
pub async fn generate_thumbnail(
    clip_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    clip_duration: f64,
) -> MediaResult<()> {
    let cmd = FfmpegCommand::new(clip_path.as_ref(), output_path.as_ref())
        .seek(thumbnail_offset(clip_duration))
        .single_frame()
        .video_filter(thumbnail_filter(THUMBNAIL_SCALE_WIDTH))
        .output_args(["-q:v", "3"]);

    FfmpegRunner::new().run(&cmd).await
}

fn thumbnail_offset(clip_duration: f64) -> f64 {
    if clip_duration >= THUMBNAIL_OFFSET_SECS * 2.0 {
        THUMBNAIL_OFFSET_SECS
    } else {
        (clip_duration / 2.0).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbnail_path() {
        assert_eq!(
            thumbnail_path(Path::new("/out/short_0001.mp4")),
            PathBuf::from("/out/short_0001.jpg")
        );
    }

    #[test]
    fn test_thumbnail_offset_stays_inside_short_clips() {
        assert_eq!(thumbnail_offset(30.0), THUMBNAIL_OFFSET_SECS);
        assert!((thumbnail_offset(1.0) - 0.5).abs() < 1e-9);
    }
}
