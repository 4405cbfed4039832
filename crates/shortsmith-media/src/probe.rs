//! Source inspection with ffprobe.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use shortsmith_models::SourceVideo;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// Extensions seen often enough that they are not worth a log line.
const FAMILIAR_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "webm", "avi", "m4v", "ts"];

/// Frame rate assumed when the stream reports none.
const FALLBACK_FRAME_RATE: f64 = 30.0;

/// Inspects a source file once per run.
#[async_trait]
pub trait MediaProber: Send + Sync {
    async fn probe(&self, path: &Path) -> MediaResult<SourceVideo>;
}

/// Prober backed by the `ffprobe` executable.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfprobeProber;

#[async_trait]
impl MediaProber for FfprobeProber {
    async fn probe(&self, path: &Path) -> MediaResult<SourceVideo> {
        probe_video(path).await
    }
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

/// Probe a video file.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<SourceVideo> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(MediaError::unreadable(path, "file does not exist"));
    }

    let familiar = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| FAMILIAR_EXTENSIONS.contains(&ext.as_str()));
    if !familiar {
        debug!("Probing file with unfamiliar extension: {}", path.display());
    }

    let ffprobe = check_ffprobe()?;

    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = match stderr.trim() {
            "" => format!("ffprobe exited with {}", output.status),
            msg => msg.to_string(),
        };
        return Err(MediaError::unreadable(path, reason));
    }

    let source = parse_probe_output(path, &output.stdout)?;
    debug!(
        "Probed {}: {}x{} @ {:.2} fps, {:.3}s, audio={}",
        path.display(),
        source.width,
        source.height,
        source.frame_rate,
        source.duration,
        source.has_audio
    );
    Ok(source)
}

/// Build a [`SourceVideo`] from ffprobe's JSON output.
fn parse_probe_output(path: &Path, json: &[u8]) -> MediaResult<SourceVideo> {
    let probe: FfprobeOutput = serde_json::from_slice(json)
        .map_err(|e| MediaError::unreadable(path, format!("unparseable ffprobe output: {}", e)))?;

    let is_type = |s: &FfprobeStream, kind: &str| s.codec_type.as_deref() == Some(kind);

    let video = probe
        .streams
        .iter()
        .find(|s| is_type(s, "video"))
        .ok_or_else(|| MediaError::unsupported("no video stream found"))?;

    let width = video.width.unwrap_or(0);
    let height = video.height.unwrap_or(0);
    if width == 0 || height == 0 {
        return Err(MediaError::unsupported(format!(
            "invalid frame size {}x{}",
            width, height
        )));
    }

    let format = probe.format.as_ref();
    let duration = format
        .and_then(|f| parse_positive(f.duration.as_deref()))
        .or_else(|| parse_positive(video.duration.as_deref()))
        .ok_or_else(|| MediaError::unsupported("source has no positive duration"))?;

    let frame_rate = video
        .avg_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| video.r_frame_rate.as_deref().and_then(parse_frame_rate))
        .unwrap_or(FALLBACK_FRAME_RATE);

    let mut source = SourceVideo::new(
        path,
        duration,
        width,
        height,
        frame_rate,
        probe.streams.iter().any(|s| is_type(s, "audio")),
    );
    source.video_codec = video.codec_name.clone().unwrap_or_default();
    source.size_bytes = format
        .and_then(|f| f.size.as_deref())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    Ok(source)
}

fn parse_positive(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    let rate = match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den <= 0.0 {
                return None;
            }
            num / den
        }
        None => s.trim().parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LANDSCAPE: &str = r#"{
        "streams": [
            {"codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080,
             "avg_frame_rate": "30000/1001", "r_frame_rate": "30/1", "duration": "119.9"},
            {"codec_type": "audio", "codec_name": "aac"}
        ],
        "format": {"duration": "120.000000", "size": "1048576"}
    }"#;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("0/0").is_none());
    }

    #[test]
    fn test_parse_landscape_source() {
        let source = parse_probe_output(Path::new("in.mp4"), LANDSCAPE.as_bytes()).unwrap();
        assert_eq!((source.width, source.height), (1920, 1080));
        assert!((source.duration - 120.0).abs() < 1e-9);
        assert!((source.frame_rate - 29.97).abs() < 0.01);
        assert!(source.has_audio);
        assert_eq!(source.video_codec, "h264");
        assert_eq!(source.size_bytes, 1_048_576);
    }

    #[test]
    fn test_duration_falls_back_to_stream() {
        let json = r#"{
            "streams": [{"codec_type": "video", "width": 1280, "height": 720,
                         "r_frame_rate": "25/1", "duration": "42.5"}],
            "format": {"duration": "N/A"}
        }"#;
        let source = parse_probe_output(Path::new("in.mkv"), json.as_bytes()).unwrap();
        assert!((source.duration - 42.5).abs() < 1e-9);
        assert!((source.frame_rate - 25.0).abs() < 1e-9);
        assert!(!source.has_audio);
    }

    #[test]
    fn test_audio_only_is_unsupported() {
        let json = r#"{"streams": [{"codec_type": "audio"}], "format": {"duration": "10"}}"#;
        let err = parse_probe_output(Path::new("a.m4a"), json.as_bytes()).unwrap_err();
        assert!(matches!(err, MediaError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_zero_duration_is_unsupported() {
        let json = r#"{"streams": [{"codec_type": "video", "width": 640, "height": 480}],
                       "format": {"duration": "0.0"}}"#;
        let err = parse_probe_output(Path::new("still.mp4"), json.as_bytes()).unwrap_err();
        assert!(matches!(err, MediaError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_garbage_is_unreadable() {
        let err = parse_probe_output(Path::new("x.mp4"), b"not json").unwrap_err();
        assert!(matches!(err, MediaError::UnreadableMedia { .. }));
    }

    #[tokio::test]
    async fn test_missing_file_is_unreadable() {
        let err = tokio_test::assert_err!(
            FfprobeProber
                .probe(Path::new("/definitely/not/here.mp4"))
                .await
        );
        assert!(matches!(err, MediaError::UnreadableMedia { .. }));
    }
}
