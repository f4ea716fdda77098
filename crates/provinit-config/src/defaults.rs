/// Default log filter; console output already covers routine progress.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Plugin protocol version spoken by the host.
pub const DEFAULT_PROTOCOL_VERSION: u32 = 4;

/// Default number of plugin fetches allowed in flight.
pub const DEFAULT_FETCH_CONCURRENCY: usize = 4;

/// Directory below the working directory that holds provinit data.
pub const DATA_DIR_NAME: &str = ".provinit";

/// File name of the plugin lock manifest inside the plugin directory.
pub const LOCK_FILE_NAME: &str = "lock.json";

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default log output format.
#[must_use]
pub const fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Compact
}

/// Default plugin protocol version.
#[must_use]
pub const fn default_protocol_version() -> u32 {
    DEFAULT_PROTOCOL_VERSION
}

/// Default fetch concurrency.
#[must_use]
pub const fn default_fetch_concurrency() -> usize {
    DEFAULT_FETCH_CONCURRENCY
}
