//! `app-launch` is the operator CLI binary.

use app_launch::handlers;
use app_launch::{Cli, Command, LaunchError, LaunchResult, Settings};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    // Only log when RUST_LOG is set.
    init_tracing();

    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print an error with appropriate formatting based on error type.
fn print_error(e: &LaunchError) {
    println!();
    match e {
        LaunchError::UnknownFramework { id, known } => {
            println!(
                "  {} Unknown framework: {}",
                "error".bright_red().bold(),
                id.bright_white()
            );
            println!();
            println!("    {}: {}", "Known".dimmed(), known);
        }
        LaunchError::Substitution { token, placeholder } => {
            println!("  {} Template substitution failed", "error".bright_red().bold());
            println!();
            println!("    {}: {}", "Token".dimmed(), token);
            println!("    {}: {{{}}}", "Missing".dimmed(), placeholder);
        }
        LaunchError::InvalidConfigurationShape { key, observed } => {
            println!(
                "  {} Invalid value for {}",
                "error".bright_red().bold(),
                key.bright_white()
            );
            println!();
            println!("    {}: {}", "Found".dimmed(), observed);
            println!();
            println!(
                "    {}: use a list, {} or leave it unset",
                "hint".bright_blue().bold(),
                "{ provider = \"name\" }".bright_white()
            );
        }
        LaunchError::UnknownProvider { key, name } => {
            println!(
                "  {} Unknown provider '{}' for {}",
                "error".bright_red().bold(),
                name.bright_white(),
                key
            );
        }
        LaunchError::IncompleteContext { field } => {
            println!(
                "  {} Missing launch parameter: {}",
                "error".bright_red().bold(),
                field.bright_white()
            );
        }
        _ => {
            let msg = e.to_string();
            if let Some((prefix, rest)) = msg.split_once(": ")
                && prefix.ends_with("error")
            {
                println!(
                    "  {} {}",
                    format!("error[{}]", prefix.to_lowercase().replace(" error", ""))
                        .bright_red()
                        .bold(),
                    rest.dimmed()
                );
            } else {
                println!("  {} {}", "error".bright_red().bold(), msg);
            }
        }
    }
    println!();
}

/// Initialize tracing. Only enables logging when RUST_LOG is set.
fn init_tracing() {
    let rust_log_set = std::env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.is_empty())
        .is_some();

    if !rust_log_set {
        return;
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> LaunchResult<()> {
    let cli = Cli::parse();
    let settings = Settings::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Command::Frameworks { json } => {
            handlers::list_frameworks(&settings, json, cli.concise).await
        }

        Command::Resolve {
            framework,
            port,
            base_url,
            origin_host,
            example_path,
            debug,
            json,
        } => {
            handlers::resolve_framework(
                &settings,
                &framework,
                port,
                base_url,
                origin_host,
                example_path,
                debug,
                json,
                cli.concise,
            )
            .await
        }

        Command::Envs { json } => handlers::list_envs(&settings, json, cli.concise).await,

        Command::Profiles {
            user,
            auth_state,
            json,
        } => handlers::list_profiles(&settings, user, auth_state, json, cli.concise).await,

        Command::Thumbnail { path } => handlers::print_thumbnail(&path).await,
    }
}
