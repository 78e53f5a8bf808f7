use super::models::AppConfig;
use super::tables::ConfigTables;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load configuration from the given path, falling back to defaults on error.
pub fn load_config(path: &Path) -> AppConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded base config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return AppConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!("Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err}");
            AppConfig::default()
        }
    }
}

pub fn parse_config(contents: &str) -> Result<AppConfig, toml::de::Error> {
    toml::from_str::<ConfigTables>(contents).map(AppConfig::from)
}

pub fn serialize_config(config: &AppConfig) -> Result<String, toml::ser::Error> {
    toml::to_string(&ConfigTables::from(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn missing_tables_use_defaults() {
        let config = parse_config("").expect("empty config parses");
        assert_eq!(config, AppConfig::default());
        assert!(config.loose_href_match);
        assert_eq!(config.server_name, "ebook-mcp");
    }

    #[test]
    fn reads_sectioned_values() {
        let config = parse_config(
            r#"
            [logging]
            log_level = "debug"

            [extraction]
            loose_href_match = false
            "#,
        )
        .expect("valid config");
        assert_eq!(config.log_level, LogLevel::Debug);
        assert!(!config.loose_href_match);
        assert_eq!(config.server_name, "ebook-mcp");
    }

    #[test]
    fn serialized_config_reads_back() {
        let mut config = AppConfig::default();
        config.loose_href_match = false;
        config.server_name = "books".to_string();
        let text = serialize_config(&config).expect("serializes");
        assert_eq!(parse_config(&text).expect("parses"), config);
    }

    #[test]
    fn unreadable_file_falls_back_to_defaults() {
        let config = load_config(Path::new("/definitely/not/here/config.toml"));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn invalid_toml_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[logging\nlog_level = ").expect("write");
        assert_eq!(load_config(&path), AppConfig::default());
    }
}
