//! Hydro Core Library
//!
//! Shared utilities for the hydro station data service:
//! - Configuration loading (XDG-compliant)
//! - File system checks used at startup

mod config;
pub mod fs;

pub use config::{find_config_file, load_config, ConfigSource};
pub use fs::{is_directory, path_exists};

/// Application name used for XDG paths
pub const APP_NAME: &str = "hydro-api";

/// Default API port
pub const DEFAULT_API_PORT: u16 = 9810;

/// Default location of the station registry document
pub const DEFAULT_STATIONS_FILE: &str = "./stations.toml";
