//! Pipeline configuration.

use std::str::FromStr;
use std::time::Duration;

use shortsmith_models::encoding::MAX_CRF;
use shortsmith_models::{EncodingConfig, SnapConfig};

/// Default number of concurrent renders.
pub const DEFAULT_MAX_PARALLEL: usize = 2;
/// Default minimum clip length for explicit requests, in seconds.
pub const DEFAULT_MIN_CLIP_SECS: f64 = 1.0;
/// Default prefix for unlabelled clips.
pub const DEFAULT_NAME_PREFIX: &str = "short";
/// Default number of suffixes tried before naming gives up.
pub const DEFAULT_MAX_NAME_ATTEMPTS: u32 = 1000;

/// Settings for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum renders running at once
    pub max_parallel_renders: usize,
    /// Kill a single render after this long
    pub render_timeout: Option<Duration>,
    /// Explicit requests shorter than this after clamping are dropped
    pub min_clip_length: f64,
    /// Base name prefix for clips without a label
    pub name_prefix: String,
    /// Suffix attempts per name before giving up
    pub max_name_attempts: u32,
    /// Treat files already on disk as collisions
    pub avoid_overwrite: bool,
    /// Kill running renders when the run is cancelled
    pub kill_on_cancel: bool,
    /// Write a thumbnail beside each clip
    pub thumbnails: bool,
    /// Snap explicit and random cut points to detected boundaries
    pub snap: Option<SnapConfig>,
    /// Encoder settings
    pub encoding: EncodingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_parallel_renders: DEFAULT_MAX_PARALLEL,
            render_timeout: None,
            min_clip_length: DEFAULT_MIN_CLIP_SECS,
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            max_name_attempts: DEFAULT_MAX_NAME_ATTEMPTS,
            avoid_overwrite: false,
            kill_on_cancel: false,
            thumbnails: false,
            snap: None,
            encoding: EncodingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_parallel_renders: env_parse("SHORTSMITH_MAX_PARALLEL")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.max_parallel_renders),
            render_timeout: env_parse("SHORTSMITH_RENDER_TIMEOUT_SECS")
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs),
            min_clip_length: env_parse("SHORTSMITH_MIN_CLIP_SECS")
                .filter(|secs: &f64| secs.is_finite() && *secs >= 0.0)
                .unwrap_or(defaults.min_clip_length),
            name_prefix: std::env::var("SHORTSMITH_NAME_PREFIX")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or(defaults.name_prefix),
            max_name_attempts: env_parse("SHORTSMITH_MAX_NAME_ATTEMPTS")
                .filter(|n: &u32| *n > 0)
                .unwrap_or(defaults.max_name_attempts),
            avoid_overwrite: env_flag("SHORTSMITH_AVOID_OVERWRITE").unwrap_or(defaults.avoid_overwrite),
            kill_on_cancel: env_flag("SHORTSMITH_KILL_ON_CANCEL").unwrap_or(defaults.kill_on_cancel),
            thumbnails: env_flag("SHORTSMITH_THUMBNAILS").unwrap_or(defaults.thumbnails),
            snap: None,
            encoding: encoding_from_env(defaults.encoding),
        }
    }

    /// Render timeout in whole seconds, as the runner takes it.
    pub fn render_timeout_secs(&self) -> Option<u64> {
        self.render_timeout.map(|t| t.as_secs().max(1))
    }
}

/// Encoder overrides: `SHORTSMITH_NVENC`, `SHORTSMITH_CRF`, `SHORTSMITH_PRESET`.
fn encoding_from_env(mut encoding: EncodingConfig) -> EncodingConfig {
    if env_flag("SHORTSMITH_NVENC").unwrap_or(false) {
        encoding = encoding.with_nvenc();
    }
    if let Some(crf) = env_parse("SHORTSMITH_CRF").filter(|crf: &u8| *crf <= MAX_CRF) {
        encoding = encoding.with_crf(crf);
    }
    if let Some(preset) = std::env::var("SHORTSMITH_PRESET")
        .ok()
        .filter(|p| !p.trim().is_empty())
    {
        encoding = encoding.with_preset(preset.trim());
    }
    encoding
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    let value = std::env::var(key).ok()?;
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_parallel_renders, 2);
        assert_eq!(config.name_prefix, "short");
        assert_eq!(config.max_name_attempts, 1000);
        assert!(config.render_timeout_secs().is_none());
        assert!(config.snap.is_none());
    }

    #[test]
    fn test_from_env() {
        // Keys unique to this test so parallel tests do not interfere
        std::env::set_var("SHORTSMITH_MAX_PARALLEL", "6");
        std::env::set_var("SHORTSMITH_RENDER_TIMEOUT_SECS", "90");
        std::env::set_var("SHORTSMITH_AVOID_OVERWRITE", "yes");
        std::env::set_var("SHORTSMITH_NAME_PREFIX", "  ");
        std::env::set_var("SHORTSMITH_NVENC", "1");
        std::env::set_var("SHORTSMITH_CRF", "23");
        std::env::set_var("SHORTSMITH_PRESET", " p4 ");

        let config = PipelineConfig::from_env();
        assert_eq!(config.max_parallel_renders, 6);
        assert_eq!(config.render_timeout_secs(), Some(90));
        assert!(config.avoid_overwrite);
        assert_eq!(config.name_prefix, "short");
        assert!(config.encoding.use_nvenc);
        assert_eq!(config.encoding.codec, "h264_nvenc");
        assert_eq!(config.encoding.crf, 23);
        assert_eq!(config.encoding.preset, "p4");

        // Out of range CRF keeps the default
        std::env::set_var("SHORTSMITH_CRF", "70");
        assert_eq!(PipelineConfig::from_env().encoding.crf, 18);

        std::env::remove_var("SHORTSMITH_MAX_PARALLEL");
        std::env::remove_var("SHORTSMITH_RENDER_TIMEOUT_SECS");
        std::env::remove_var("SHORTSMITH_AVOID_OVERWRITE");
        std::env::remove_var("SHORTSMITH_NAME_PREFIX");
        std::env::remove_var("SHORTSMITH_NVENC");
        std::env::remove_var("SHORTSMITH_CRF");
        std::env::remove_var("SHORTSMITH_PRESET");
    }
}
