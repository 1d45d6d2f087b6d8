//! Constants for app-launch.
//!
//! This module contains path, environment and default-value constants.

use std::path::PathBuf;
use std::sync::LazyLock;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Launcher prefix used by frameworks that run behind the native proxy.
pub const DEFAULT_LAUNCHER: &[&str] = &[
    "python",
    "-m",
    "jhsingle_native_proxy.main",
    "--authtype=none",
];

/// Default externally visible base URL.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Default host:port allowed as websocket/CORS origin.
pub const DEFAULT_ORIGIN_HOST: &str = "localhost:8000";

/// Settings key holding the conda environment list.
pub const CONDA_ENVS_KEY: &str = "conda_envs";

/// Settings key holding the spawner profile list.
pub const PROFILE_LIST_KEY: &str = "profile_list";

/// Environment variable overriding the settings file location.
pub const CONFIG_PATH_ENV: &str = "APP_LAUNCH_CONFIG";

/// Settings file name.
pub const CONFIG_FILE: &str = "config.toml";

/// Default home directory for app-launch configuration.
pub static DEFAULT_HOME_PATH: LazyLock<PathBuf> = LazyLock::new(|| {
    dirs::home_dir()
        .map(|h| h.join(".app-launch"))
        .unwrap_or_else(|| PathBuf::from(".app-launch"))
});

/// Default settings file path.
pub static DEFAULT_CONFIG_PATH: LazyLock<PathBuf> =
    LazyLock::new(|| DEFAULT_HOME_PATH.join(CONFIG_FILE));

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Get the settings path, checking APP_LAUNCH_CONFIG first.
pub fn get_config_path() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.clone())
}

/// Default launcher as owned tokens.
pub fn default_launcher() -> Vec<String> {
    DEFAULT_LAUNCHER.iter().map(|s| s.to_string()).collect()
}
