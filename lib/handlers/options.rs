//! Conda environment and spawner profile handlers.

use std::path::{Path, PathBuf};

use colored::Colorize;
use serde_json::Value;

use crate::context::CallerContext;
use crate::dynamic::{DynamicConfigResolver, ListOutcome};
use crate::error::{LaunchError, LaunchResult};
use crate::options::{conda_envs, spawner_profiles_outcome};
use crate::providers::{builtin_env_providers, builtin_profile_providers};
use crate::settings::Settings;

use super::print_json;

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// List conda environments.
pub async fn list_envs(settings: &Settings, json_output: bool, concise: bool) -> LaunchResult<()> {
    let resolver = DynamicConfigResolver::new(builtin_env_providers());
    let envs = conda_envs(settings, &resolver).await?;

    if json_output {
        return print_json(&envs, concise);
    }

    if concise {
        for env in &envs {
            println!("{}", env);
        }
        return Ok(());
    }

    println!();
    if envs.is_empty() {
        println!("  {} No conda environments available", "✗".bright_red());
    } else {
        println!("  {} {} conda environments", "✓".bright_green(), envs.len());
        println!();
        for env in &envs {
            println!("    {}", env.bright_cyan());
        }
    }
    println!();
    Ok(())
}

/// List spawner profiles for a caller.
pub async fn list_profiles(
    settings: &Settings,
    user: Option<String>,
    auth_state: Option<PathBuf>,
    json_output: bool,
    concise: bool,
) -> LaunchResult<()> {
    let caller = load_caller(user, auth_state.as_deref()).await?;
    let resolver = DynamicConfigResolver::new(builtin_profile_providers());
    let outcome = spawner_profiles_outcome(settings, &resolver, Some(&caller)).await?;

    let failure = match &outcome {
        ListOutcome::ProviderFailed { message } => Some(message.clone()),
        _ => None,
    };
    let profiles = outcome.into_entries();

    if json_output {
        return print_json(&profiles, concise);
    }

    if concise {
        println!("#slug\tname\tdefault");
        for p in &profiles {
            println!(
                "{}\t{}\t{}",
                p.slug.as_deref().unwrap_or("-"),
                p.display_name,
                p.default
            );
        }
        return Ok(());
    }

    println!();
    if let Some(message) = failure {
        println!("  {} Profile provider failed", "✗".bright_red());
        println!("    {}", message.dimmed());
    } else if profiles.is_empty() {
        println!("  {} No profiles configured", "✗".bright_red());
    } else {
        println!("  {} {} profiles", "✓".bright_green(), profiles.len());
        println!();
        for p in &profiles {
            let marker = if p.default { " (default)" } else { "" };
            println!(
                "    {}{}",
                p.display_name.bright_cyan(),
                marker.dimmed()
            );
            if let Some(desc) = &p.description {
                println!("      {}", desc.dimmed());
            }
        }
    }
    println!();
    Ok(())
}

/// Build the caller context from CLI flags.
async fn load_caller(
    user: Option<String>,
    auth_state: Option<&Path>,
) -> LaunchResult<CallerContext> {
    let auth_state = match auth_state {
        Some(path) => {
            let content = tokio::fs::read_to_string(path).await.map_err(|e| {
                LaunchError::ConfigParseError(format!(
                    "Failed to read auth state {}: {}",
                    path.display(),
                    e
                ))
            })?;
            Some(serde_json::from_str::<Value>(&content)?)
        }
        None => None,
    };

    Ok(CallerContext { user, auth_state })
}
