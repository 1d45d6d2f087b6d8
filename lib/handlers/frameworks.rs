//! Framework listing and resolution handlers.

use std::path::PathBuf;

use colored::Colorize;
use serde_json::json;

use crate::context::ResolutionContext;
use crate::error::LaunchResult;
use crate::launch::plan_launch;
use crate::settings::Settings;

use super::print_json;

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// List registered frameworks.
pub async fn list_frameworks(
    settings: &Settings,
    json_output: bool,
    concise: bool,
) -> LaunchResult<()> {
    let registry = settings.registry()?;

    if json_output {
        let output: Vec<_> = registry
            .iter()
            .map(|spec| {
                json!({
                    "id": spec.id,
                    "display_name": spec.display_name,
                    "launcher": spec.launcher,
                    "args": spec.template.args(),
                    "debug_args": spec.template.debug_args(),
                    "env": spec.template.env(),
                })
            })
            .collect();
        return print_json(&output, concise);
    }

    if concise {
        println!("#id\tname");
        for spec in registry.iter() {
            println!("{}\t{}", spec.id, spec.display_name);
        }
        return Ok(());
    }

    println!();
    println!("  {} {} frameworks", "✓".bright_green(), registry.len());
    println!();
    for spec in registry.iter() {
        println!(
            "    {:<12} {}",
            spec.id.bright_cyan(),
            spec.display_name.dimmed()
        );
    }
    println!();
    Ok(())
}

/// Resolve and print the launch plan for a framework.
#[allow(clippy::too_many_arguments)]
pub async fn resolve_framework(
    settings: &Settings,
    framework: &str,
    port: u16,
    base_url: Option<String>,
    origin_host: Option<String>,
    example_path: PathBuf,
    debug: bool,
    json_output: bool,
    concise: bool,
) -> LaunchResult<()> {
    let registry = settings.registry()?;

    let mut builder = ResolutionContext::from_settings(settings)
        .port(port)
        .example_path(&example_path);
    if let Some(url) = base_url {
        builder = builder.base_url(url);
    }
    if let Some(host) = origin_host {
        builder = builder.origin_host(host);
    }
    let ctx = builder.build_validated()?;

    let plan = plan_launch(&registry, framework, &ctx, debug)?;

    if json_output {
        return print_json(&plan, concise);
    }

    if concise {
        for (key, value) in &plan.env {
            println!("{}={}", key, value);
        }
        println!("{}", plan.command.join(" "));
        return Ok(());
    }

    println!();
    println!(
        "  {} Resolved {}{}",
        "✓".bright_green(),
        framework.bright_white().bold(),
        if debug { " (debug)".dimmed().to_string() } else { String::new() }
    );
    println!();
    println!("    {}", "Command:".dimmed());
    for token in &plan.command {
        println!("      {}", token);
    }
    if !plan.env.is_empty() {
        println!();
        println!("    {}", "Environment:".dimmed());
        for (key, value) in &plan.env {
            println!("      {}={}", key.bright_cyan(), value);
        }
    }
    println!();
    Ok(())
}
