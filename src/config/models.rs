use crate::chapter::ResolveOptions;
use serde::Deserialize;

/// Flattened server configuration; deserializable from TOML.
#[derive(Debug, Clone, PartialEq, Deserialize, serde::Serialize)]
pub struct AppConfig {
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
    /// Fall back to substring / path-suffix href matching when exact matching fails.
    #[serde(default = "crate::config::defaults::default_loose_href_match")]
    pub loose_href_match: bool,
    #[serde(default = "crate::config::defaults::default_server_name")]
    pub server_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            log_level: crate::config::defaults::default_log_level(),
            loose_href_match: crate::config::defaults::default_loose_href_match(),
            server_name: crate::config::defaults::default_server_name(),
        }
    }
}

impl AppConfig {
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            loose_href_match: self.loose_href_match,
        }
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
