//! Collision-free output paths for one run.

use std::collections::HashSet;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::debug;

use shortsmith_models::Segment;

use crate::error::{PipelineError, PipelineResult};

/// Longest sanitized label used as a base name.
pub const MAX_LABEL_CHARS: usize = 50;

/// Sanitize a label for use in filenames.
///
/// Keeps ASCII alphanumerics, hyphen and underscore; whitespace runs become a
/// single underscore. Everything is lowercased.
pub fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-' || *c == '_')
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
        .chars()
        .take(MAX_LABEL_CHARS)
        .collect()
}

/// Names issued so far in one run.
#[derive(Debug, Default)]
pub struct NamingState {
    issued: HashSet<String>,
}

/// Assigns output paths to segments.
#[derive(Debug)]
pub struct OutputNamer {
    output_dir: PathBuf,
    prefix: String,
    extension: String,
    max_attempts: u32,
    avoid_overwrite: bool,
    state: Mutex<NamingState>,
}

impl OutputNamer {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            prefix: prefix.into(),
            extension: extension.into().trim_start_matches('.').to_string(),
            max_attempts: crate::config::DEFAULT_MAX_NAME_ATTEMPTS,
            avoid_overwrite: false,
            state: Mutex::new(NamingState::default()),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Count files already on disk as collisions.
    pub fn with_avoid_overwrite(mut self, avoid_overwrite: bool) -> Self {
        self.avoid_overwrite = avoid_overwrite;
        self
    }

    /// Base name for a segment before collision handling.
    pub fn base_name(&self, segment: &Segment) -> String {
        segment
            .label
            .as_deref()
            .map(sanitize_label)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("{}_{:04}", self.prefix, segment.index))
    }

    /// Issue a unique path for `segment`.
    ///
    /// Tries `base`, then `base_2`, `base_3`, ... up to the attempt limit.
    pub async fn issue(&self, segment: &Segment) -> PipelineResult<PathBuf> {
        let base = self.base_name(segment);
        let mut state = self.state.lock().await;

        for attempt in 1..=self.max_attempts {
            let stem = if attempt == 1 {
                base.clone()
            } else {
                format!("{}_{}", base, attempt)
            };
            let file_name = format!("{}.{}", stem, self.extension);
            // Case-insensitive filesystems treat these as the same file
            let key = file_name.to_lowercase();
            if state.issued.contains(&key) {
                continue;
            }

            let path = self.output_dir.join(&file_name);
            // An unreadable directory entry is an error, never a free name
            if self.avoid_overwrite && tokio::fs::try_exists(&path).await? {
                debug!("{} already exists, trying next suffix", path.display());
                continue;
            }

            state.issued.insert(key);
            return Ok(path);
        }

        Err(PipelineError::NamingCollisionUnresolved {
            base,
            attempts: self.max_attempts,
        })
    }
}
