pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Info
}

pub(crate) fn default_loose_href_match() -> bool {
    true
}

pub(crate) fn default_server_name() -> String {
    "ebook-mcp".to_string()
}
