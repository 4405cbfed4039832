//! Pipeline error types.

use thiserror::Error;

use shortsmith_media::MediaError;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that end a run before rendering.
///
/// Per-segment failures never surface here; they are recorded in the
/// run summary.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Invalid plan policy: {0}")]
    InvalidPolicy(String),

    #[error("Could not find a free output name for '{base}' after {attempts} attempts")]
    NamingCollisionUnresolved { base: String, attempts: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn invalid_policy(msg: impl Into<String>) -> Self {
        Self::InvalidPolicy(msg.into())
    }

    /// Short machine-friendly kind, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Media(MediaError::UnreadableMedia { .. }) => "unreadable_media",
            PipelineError::Media(MediaError::UnsupportedFormat(_)) => "unsupported_format",
            PipelineError::Media(MediaError::FfmpegNotFound)
            | PipelineError::Media(MediaError::FfprobeNotFound) => "missing_tool",
            PipelineError::Media(_) => "media",
            PipelineError::InvalidPolicy(_) => "invalid_policy",
            PipelineError::NamingCollisionUnresolved { .. } => "naming_collision",
            PipelineError::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_errors_convert() {
        let err: PipelineError = MediaError::unreadable("in.mp4", "missing").into();
        assert_eq!(err.kind(), "unreadable_media");
        assert!(err.to_string().contains("in.mp4"));
    }

    #[test]
    fn test_naming_message() {
        let err = PipelineError::NamingCollisionUnresolved {
            base: "intro".to_string(),
            attempts: 1000,
        };
        assert_eq!(
            err.to_string(),
            "Could not find a free output name for 'intro' after 1000 attempts"
        );
    }
}
