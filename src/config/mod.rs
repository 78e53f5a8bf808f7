//! Configuration loading for the ebook tool server.
//!
//! Settings are loaded from `conf/config.toml` (or the path given on the
//! command line). Missing or invalid entries fall back to defaults so the
//! server can always start.

mod defaults;
mod io;
mod models;
mod tables;

pub use io::{load_config, parse_config, serialize_config};
pub use models::{AppConfig, LogLevel};
