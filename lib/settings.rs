//! Operator settings file.
//!
//! A TOML file declaring the list-valued options (conda environments, spawner
//! profiles), default URLs for the resolution context, and framework
//! overrides. A missing file means defaults.
//!
//! ```toml
//! base_url = "https://hub.example.com"
//! origin_host = "hub.example.com"
//! conda_envs = ["base", "py311"]
//! profile_list = { provider = "auth-state-profiles" }
//!
//! [frameworks.gradio]
//! args = ["--destport=0", "python3", "{example_path}", "{--}port={port}"]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{
    CONDA_ENVS_KEY, DEFAULT_BASE_URL, DEFAULT_ORIGIN_HOST, PROFILE_LIST_KEY, get_config_path,
};
use crate::error::{LaunchError, LaunchResult};
use crate::frameworks::{FrameworkOverride, FrameworkRegistry};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Parsed operator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Default externally visible base URL.
    pub base_url: String,

    /// Default origin host.
    pub origin_host: String,

    /// Raw conda environment list; classified on every read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conda_envs: Option<Value>,

    /// Raw spawner profile list; classified on every read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_list: Option<Value>,

    /// Framework additions and patches.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub frameworks: BTreeMap<String, FrameworkOverride>,
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            origin_host: DEFAULT_ORIGIN_HOST.to_string(),
            conda_envs: None,
            profile_list: None,
            frameworks: BTreeMap::new(),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Settings {
    /// Parse settings from TOML text.
    pub fn parse(content: &str) -> LaunchResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(toml::from_str(content)?)
    }

    /// Load settings from a file. A missing file yields defaults.
    pub fn load(path: &Path) -> LaunchResult<Self> {
        if !path.exists() {
            tracing::debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            LaunchError::ConfigParseError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        tracing::info!("Loaded settings from {}", path.display());
        Self::parse(&content)
    }

    /// Load settings from `path`, or from the default location when `None`.
    pub fn load_or_default(path: Option<&Path>) -> LaunchResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Self::load(&get_config_path()),
        }
    }

    /// Build the framework registry: built-ins patched with these settings.
    pub fn registry(&self) -> LaunchResult<FrameworkRegistry> {
        FrameworkRegistry::builtin().with_overrides(&self.frameworks)
    }

    /// Raw value for a list-valued key.
    pub fn raw(&self, key: &str) -> Option<&Value> {
        match key {
            CONDA_ENVS_KEY => self.conda_envs.as_ref(),
            PROFILE_LIST_KEY => self.profile_list.as_ref(),
            _ => None,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(Settings::parse("  \n").unwrap(), Settings::default());
    }

    #[test]
    fn test_parse_shapes() {
        let settings = Settings::parse(
            r#"
            base_url = "https://hub.example.com"
            conda_envs = ["base", "py311"]
            profile_list = { provider = "auth-state-profiles" }
            "#,
        )
        .unwrap();

        assert_eq!(settings.base_url, "https://hub.example.com");
        assert_eq!(settings.origin_host, DEFAULT_ORIGIN_HOST);
        assert_eq!(settings.raw(CONDA_ENVS_KEY), Some(&json!(["base", "py311"])));
        assert_eq!(
            settings.raw(PROFILE_LIST_KEY),
            Some(&json!({"provider": "auth-state-profiles"}))
        );
        assert_eq!(settings.raw("unknown"), None);
    }

    #[test]
    fn test_integer_value_parses_as_raw() {
        // Shape checking happens at resolution time, not at load time.
        let settings = Settings::parse("conda_envs = 3").unwrap();
        assert_eq!(settings.conda_envs, Some(json!(3)));
    }

    #[test]
    fn test_framework_overrides() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            [frameworks.gradio]
            display_name = "Gradio"
            args = ["--destport=0", "python3", "{example_path}", "{--}port={port}"]

            [frameworks.gradio.env]
            GRADIO_ROOT_PATH = "{base_url}"

            [frameworks.streamlit]
            debug_args = []
            "#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        let registry = settings.registry().unwrap();

        let gradio = registry.get("gradio").unwrap();
        assert_eq!(gradio.display_name, "Gradio");
        assert_eq!(gradio.template.args().len(), 4);
        assert_eq!(
            gradio.template.env().get("GRADIO_ROOT_PATH").map(String::as_str),
            Some("{base_url}")
        );
        assert!(registry.lookup("streamlit").unwrap().debug_args().is_empty());
        assert_eq!(registry.len(), 7);
    }

    #[test]
    fn test_invalid_toml() {
        let err = Settings::parse("conda_envs = [").unwrap_err();
        assert!(matches!(err, LaunchError::TomlDe(_)));
    }
}
