use super::defaults;
use super::models::{AppConfig, LogLevel};
use serde::Deserialize;

/// On-disk layout: one TOML table per concern.
#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    extraction: ExtractionConfig,
    #[serde(default)]
    server: ServerConfig,
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            log_level: tables.logging.log_level,
            loose_href_match: tables.extraction.loose_href_match,
            server_name: tables.server.name,
        }
    }
}

impl From<&AppConfig> for ConfigTables {
    fn from(config: &AppConfig) -> Self {
        ConfigTables {
            logging: LoggingConfig {
                log_level: config.log_level,
            },
            extraction: ExtractionConfig {
                loose_href_match: config.loose_href_match,
            },
            server: ServerConfig {
                name: config.server_name.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ExtractionConfig {
    #[serde(default = "defaults::default_loose_href_match")]
    loose_href_match: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        ExtractionConfig {
            loose_href_match: defaults::default_loose_href_match(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ServerConfig {
    #[serde(default = "defaults::default_server_name")]
    name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            name: defaults::default_server_name(),
        }
    }
}
