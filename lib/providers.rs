//! Built-in configuration providers.
//!
//! Settings can reference these by name, e.g.
//! `conda_envs = { provider = "conda-env-list" }`. Embedders register their
//! own providers next to these on the same [`ProviderRegistry`].

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use anyhow::{Context, bail};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::context::CallerContext;
use crate::dynamic::{ContextListProvider, ListProvider, ProviderRegistry};
use crate::options::SpawnerProfile;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Name of the conda environment listing provider.
pub const CONDA_ENV_LIST_PROVIDER: &str = "conda-env-list";

/// Name of the auth-state profile provider.
pub const AUTH_STATE_PROFILES_PROVIDER: &str = "auth-state-profiles";

/// Environment variable conda sets to its own executable.
pub const CONDA_EXE_ENV: &str = "CONDA_EXE";

/// Auth-state key holding the caller's profiles.
pub const AUTH_STATE_PROFILES_KEY: &str = "profiles";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Lists environments with `conda env list --json`.
#[derive(Debug, Clone)]
pub struct CondaEnvList {
    conda: String,
}

/// Reads profiles from the caller's auth state under `profiles`.
#[derive(Debug, Clone, Default)]
pub struct AuthStateProfiles;

#[derive(Debug, Deserialize)]
struct CondaEnvListOutput {
    envs: Vec<String>,
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Default for CondaEnvList {
    fn default() -> Self {
        Self {
            conda: std::env::var(CONDA_EXE_ENV).unwrap_or_else(|_| "conda".to_string()),
        }
    }
}

impl ListProvider<String> for CondaEnvList {
    fn provide(&self) -> anyhow::Result<Vec<String>> {
        let output = Command::new(&self.conda)
            .args(["env", "list", "--json"])
            .output()
            .with_context(|| format!("Failed to run '{}'", self.conda))?;

        if !output.status.success() {
            bail!(
                "'{} env list' exited with {}: {}",
                self.conda,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        parse_conda_env_list(&String::from_utf8_lossy(&output.stdout))
    }
}

#[async_trait]
impl ContextListProvider<SpawnerProfile> for AuthStateProfiles {
    async fn provide(&self, caller: &CallerContext) -> anyhow::Result<Vec<SpawnerProfile>> {
        let who = caller.user.as_deref().unwrap_or("anonymous");
        let auth_state = caller
            .auth_state
            .as_ref()
            .with_context(|| format!("No auth state for {}", who))?;

        match auth_state.get(AUTH_STATE_PROFILES_KEY) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(profiles) => serde_json::from_value(profiles.clone())
                .with_context(|| format!("Invalid profiles in auth state for {}", who)),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl CondaEnvList {
    /// Use a specific conda executable.
    pub fn with_executable(conda: impl Into<String>) -> Self {
        Self {
            conda: conda.into(),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Providers available for the `conda_envs` setting.
pub fn builtin_env_providers() -> ProviderRegistry<String> {
    let mut providers = ProviderRegistry::new();
    providers.register(CONDA_ENV_LIST_PROVIDER, Arc::new(CondaEnvList::default()));
    providers
}

/// Providers available for the `profile_list` setting.
pub fn builtin_profile_providers() -> ProviderRegistry<SpawnerProfile> {
    let mut providers = ProviderRegistry::new();
    providers.register_context(AUTH_STATE_PROFILES_PROVIDER, Arc::new(AuthStateProfiles));
    providers
}

/// Environment names from `conda env list --json` output.
///
/// Prefixes under an `envs` directory are named after their last component;
/// anything else is the root prefix, reported as `base`.
pub fn parse_conda_env_list(json: &str) -> anyhow::Result<Vec<String>> {
    let output: CondaEnvListOutput =
        serde_json::from_str(json).context("Unexpected conda env list output")?;

    Ok(output
        .envs
        .iter()
        .map(|prefix| env_name(Path::new(prefix)))
        .collect())
}

fn env_name(prefix: &Path) -> String {
    let parent_is_envs = prefix
        .parent()
        .and_then(Path::file_name)
        .is_some_and(|n| n == "envs");

    match prefix.file_name() {
        Some(name) if parent_is_envs => name.to_string_lossy().to_string(),
        _ => "base".to_string(),
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic::{ListOutcome, resolve_outcome};
    use serde_json::json;

    #[test]
    fn test_parse_conda_env_list() {
        let json = r#"{"envs": ["/opt/conda", "/opt/conda/envs/py311", "/home/a/.conda/envs/ml"]}"#;
        assert_eq!(
            parse_conda_env_list(json).unwrap(),
            vec!["base".to_string(), "py311".to_string(), "ml".to_string()]
        );
    }

    #[test]
    fn test_parse_conda_env_list_rejects_garbage() {
        assert!(parse_conda_env_list("not json").is_err());
        assert!(parse_conda_env_list(r#"{"prefixes": []}"#).is_err());
    }

    #[tokio::test]
    async fn test_missing_conda_is_contained() {
        let providers = {
            let mut p = ProviderRegistry::new();
            p.register(
                CONDA_ENV_LIST_PROVIDER,
                Arc::new(CondaEnvList::with_executable("/nonexistent/bin/conda")),
            );
            p
        };
        let value = providers.get(CONDA_ENV_LIST_PROVIDER).unwrap();
        assert!(resolve_outcome(&value, None).await.is_failure());
    }

    #[tokio::test]
    async fn test_auth_state_profiles() {
        let caller = CallerContext::new(
            "alice",
            Some(json!({
                "profiles": [
                    {"display_name": "Small", "slug": "small", "default": true},
                    {"display_name": "GPU", "slug": "gpu", "kubespawner_override": {"gpu": 1}}
                ]
            })),
        );
        let profiles = AuthStateProfiles.provide(&caller).await.unwrap();
        assert_eq!(profiles.len(), 2);
        assert!(profiles[0].default);
        assert!(profiles[1].extra.contains_key("kubespawner_override"));
    }

    #[tokio::test]
    async fn test_auth_state_profiles_without_state() {
        assert!(
            AuthStateProfiles
                .provide(&CallerContext::anonymous())
                .await
                .is_err()
        );

        let no_profiles = CallerContext::new("bob", Some(json!({"groups": []})));
        assert!(AuthStateProfiles.provide(&no_profiles).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_builtin_profile_provider_registered() {
        let providers = builtin_profile_providers();
        let value = providers.get(AUTH_STATE_PROFILES_PROVIDER).unwrap();
        let caller = CallerContext::new(
            "alice",
            Some(json!({"profiles": [{"display_name": "Default"}]})),
        );
        match resolve_outcome(&value, Some(&caller)).await {
            ListOutcome::Resolved(profiles) => assert_eq!(profiles[0].display_name, "Default"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(builtin_env_providers().contains(CONDA_ENV_LIST_PROVIDER));
    }
}
