//! Structured logging configuration.

use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the `EnvFilter` directives.
pub const LOG_FILTER_ENV: &str = "APKG_BRIDGE_LOG";

/// Environment variable selecting `json` or `pretty` output.
pub const LOG_FORMAT_ENV: &str = "APKG_BRIDGE_LOG_FORMAT";

/// Environment variable naming a file to append logs to.
pub const LOG_FILE_ENV: &str = "APKG_BRIDGE_LOG_FILE";

/// Default filter when none is configured.
const DEFAULT_FILTER: &str = "apkg_bridge=info";

/// Output format of log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses `json` or `pretty` (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" | "text" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Event filter.
    pub filter: EnvFilter,
    /// Optional file to append to instead of stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: EnvFilter::new(DEFAULT_FILTER),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Reads configuration from `APKG_BRIDGE_LOG*` variables.
    ///
    /// Unset or invalid values fall back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_values(
            std::env::var(LOG_FILTER_ENV).ok().as_deref(),
            std::env::var(LOG_FORMAT_ENV).ok().as_deref(),
            std::env::var(LOG_FILE_ENV).ok().as_deref(),
        )
    }

    fn from_values(filter: Option<&str>, format: Option<&str>, file: Option<&str>) -> Self {
        let filter = filter
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER));
        let format = format.and_then(LogFormat::parse).unwrap_or_default();
        let file = file
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(PathBuf::from);
        Self {
            format,
            filter,
            file,
        }
    }

    /// Sets the output format.
    #[must_use]
    pub const fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the log file.
    #[must_use]
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }
}
