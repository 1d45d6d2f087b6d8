//! Launch options offered to a user: conda environments and spawner profiles.
//!
//! Both are list-valued settings resolved through [`crate::dynamic`] on every
//! request, so providers that depend on the caller always see live state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{CONDA_ENVS_KEY, PROFILE_LIST_KEY};
use crate::context::CallerContext;
use crate::dynamic::{DynamicConfigResolver, ListOutcome};
use crate::error::LaunchResult;
use crate::settings::Settings;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A spawner resource profile.
///
/// Known fields are typed; anything else (spawner overrides, profile
/// options) is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnerProfile {
    pub display_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub default: bool,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Conda environments available for launching apps.
pub async fn conda_envs(
    settings: &Settings,
    resolver: &DynamicConfigResolver<String>,
) -> LaunchResult<Vec<String>> {
    resolver
        .resolve_raw(CONDA_ENVS_KEY, settings.raw(CONDA_ENVS_KEY), None)
        .await
}

/// Spawner profiles available to `caller`.
pub async fn spawner_profiles(
    settings: &Settings,
    resolver: &DynamicConfigResolver<SpawnerProfile>,
    caller: Option<&CallerContext>,
) -> LaunchResult<Vec<SpawnerProfile>> {
    resolver
        .resolve_raw(PROFILE_LIST_KEY, settings.raw(PROFILE_LIST_KEY), caller)
        .await
}

/// Spawner profiles with the outcome kept, so a broken provider can be told
/// apart from an empty configuration.
pub async fn spawner_profiles_outcome(
    settings: &Settings,
    resolver: &DynamicConfigResolver<SpawnerProfile>,
    caller: Option<&CallerContext>,
) -> LaunchResult<ListOutcome<SpawnerProfile>> {
    resolver
        .resolve_raw_outcome(PROFILE_LIST_KEY, settings.raw(PROFILE_LIST_KEY), caller)
        .await
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
