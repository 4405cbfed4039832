//! FFmpeg progress reports.

use serde::{Deserialize, Serialize};

/// Progress information from FFmpeg's `-progress` stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Current frame number
    pub frame: u64,
    /// Current FPS
    pub fps: f64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Output time as string (HH:MM:SS.microseconds)
    pub out_time: String,
    /// Encoding speed (1.5 = 1.5x realtime)
    pub speed: f64,
    /// Set by the final `progress=end` block
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Fraction of a clip of `clip_secs` seconds already encoded, in `[0, 1]`.
    pub fn fraction(&self, clip_secs: f64) -> f64 {
        if self.is_complete {
            return 1.0;
        }
        if clip_secs <= 0.0 {
            return 0.0;
        }
        (self.out_time_ms as f64 / 1000.0 / clip_secs).clamp(0.0, 1.0)
    }

    /// Estimated seconds until the clip finishes encoding.
    pub fn eta_seconds(&self, clip_secs: f64) -> Option<f64> {
        if self.speed <= 0.0 || self.out_time_ms <= 0 {
            return None;
        }
        let remaining = clip_secs - self.out_time_ms as f64 / 1000.0;
        Some((remaining / self.speed).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction() {
        let progress = FfmpegProgress {
            out_time_ms: 15_000,
            ..Default::default()
        };
        assert!((progress.fraction(60.0) - 0.25).abs() < 1e-9);
        assert_eq!(progress.fraction(10.0), 1.0);
        assert_eq!(progress.fraction(0.0), 0.0);
    }

    #[test]
    fn test_complete_is_full() {
        let progress = FfmpegProgress {
            is_complete: true,
            ..Default::default()
        };
        assert_eq!(progress.fraction(60.0), 1.0);
    }

    #[test]
    fn test_eta() {
        let progress = FfmpegProgress {
            out_time_ms: 20_000,
            speed: 4.0,
            ..Default::default()
        };
        assert!((progress.eta_seconds(60.0).unwrap() - 10.0).abs() < 1e-9);
        assert!(FfmpegProgress::default().eta_seconds(60.0).is_none());
    }
}
