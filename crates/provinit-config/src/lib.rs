//! Shared configuration for the provinit toolchain.
//!
//! Configuration is layered by `ortho-config`: built-in defaults are
//! overridden by a configuration file, then by `PROVINIT_*` environment
//! variables and finally by command-line flags. The CLI resolves a single
//! [`Config`] per invocation and hands it to the plugin pipeline.

mod defaults;
mod logging;
mod paths;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_FETCH_CONCURRENCY, DEFAULT_LOG_FILTER, DEFAULT_PROTOCOL_VERSION, DATA_DIR_NAME,
    LOCK_FILE_NAME, default_fetch_concurrency, default_log_filter, default_log_filter_string,
    default_log_format, default_protocol_version,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use paths::{PluginPaths, PluginPathsError};

/// Resolved configuration shared by the CLI and the plugin pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "PROVINIT")]
pub struct Config {
    /// Tracing filter expression, for example `info` or `provinit=debug`.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format used by the tracing subscriber.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Plugin protocol version the host speaks.
    #[ortho_config(default = DEFAULT_PROTOCOL_VERSION)]
    pub protocol_version: u32,
    /// Upper bound on concurrent plugin fetches.
    #[ortho_config(default = DEFAULT_FETCH_CONCURRENCY)]
    pub fetch_concurrency: usize,
    /// Overrides the directory plugins are installed into.
    pub plugin_dir: Option<Utf8PathBuf>,
    /// Local mirror directory the fetcher installs plugins from.
    pub mirror_dir: Option<Utf8PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            protocol_version: default_protocol_version(),
            fetch_concurrency: default_fetch_concurrency(),
            plugin_dir: None,
            mirror_dir: None,
        }
    }
}

impl Config {
    /// Tracing filter expression.
    #[must_use]
    pub const fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Plugin protocol version expected by the host.
    #[must_use]
    pub const fn protocol_version(&self) -> u32 {
        self.protocol_version
    }

    /// Maximum number of plugin fetches in flight. Never below one.
    #[must_use]
    pub fn fetch_concurrency(&self) -> usize {
        self.fetch_concurrency.max(1)
    }

    /// Plugin directory override, when configured.
    #[must_use]
    pub fn plugin_dir(&self) -> Option<&Utf8Path> {
        self.plugin_dir.as_deref()
    }

    /// Mirror directory, when configured.
    #[must_use]
    pub fn mirror_dir(&self) -> Option<&Utf8Path> {
        self.mirror_dir.as_deref()
    }
}
