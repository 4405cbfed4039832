//! Tracing setup and structured run logging.

use tracing::{error, info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shortsmith_models::RunId;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_DIRECTIVE: &str = "shortsmith=info";

/// Install the global subscriber.
///
/// Human-readable ANSI output by default, JSON lines when `LOG_FORMAT=json`.
/// Calling it twice is harmless; the second call is ignored.
pub fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE));

    let result = if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .try_init()
    };

    if result.is_err() {
        warn!("Tracing subscriber already installed");
    }
}

/// Logs run lifecycle events with the run id attached.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
    source: String,
}

impl RunLogger {
    pub fn new(run_id: &RunId, source: impl Into<String>) -> Self {
        Self {
            run_id: run_id.to_string(),
            source: source.into(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(run_id = %self.run_id, source = %self.source, "Run started: {}", message);
    }

    pub fn log_progress(&self, message: &str) {
        info!(run_id = %self.run_id, "Run progress: {}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(run_id = %self.run_id, "Run warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(run_id = %self.run_id, "Run error: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(run_id = %self.run_id, source = %self.source, "Run completed: {}", message);
    }

    /// Log the outcome of one segment.
    pub fn log_segment(&self, index: u32, output: &str, outcome: Result<u64, &str>) {
        match outcome {
            Ok(elapsed_ms) => info!(
                run_id = %self.run_id,
                segment = index,
                output = %output,
                elapsed_ms,
                "Segment rendered"
            ),
            Err(detail) => warn!(
                run_id = %self.run_id,
                segment = index,
                output = %output,
                "Segment failed: {}", detail
            ),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Span wrapping the whole run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("run", run_id = %self.run_id, source = %self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_logger() {
        let run_id = RunId::new();
        let logger = RunLogger::new(&run_id, "talk.mp4");
        assert_eq!(logger.run_id(), run_id.as_str());
        logger.log_segment(1, "short_0001.mp4", Ok(1200));
        logger.log_segment(2, "short_0002.mp4", Err("exit code 1"));
    }

    #[test]
    fn test_init_tracing_twice() {
        init_tracing();
        init_tracing();
    }
}
