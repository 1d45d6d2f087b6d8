//! CLI command definitions.

use crate::examples;
use crate::styles::styles;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

const FRAMEWORKS_EXAMPLES: &str = examples![
    "app-launch frameworks             " # "List registered frameworks",
    "app-launch frameworks --json      " # "Include templates as JSON",
    "app-launch frameworks -c          " # "Concise output for scripts",
];

const RESOLVE_EXAMPLES: &str = examples![
    "app-launch resolve streamlit -p 8765 -e app.py    " # "Resolve with default URLs",
    "app-launch resolve voila -e nb.ipynb --debug      " # "Include debug arguments",
    "app-launch resolve panel -e app.py --base-url http://hub/user/a/panel" # "Custom base URL",
    "app-launch resolve bokeh -e app.py --json         " # "JSON launch plan",
];

const ENVS_EXAMPLES: &str = examples![
    "app-launch envs                   " # "List configured conda environments",
    "app-launch envs --json            " # "JSON output",
];

const PROFILES_EXAMPLES: &str = examples![
    "app-launch profiles                              " # "Profiles for an anonymous caller",
    "app-launch profiles -u alice --auth-state a.json " # "Profiles for a specific user",
    "app-launch profiles --json                       " # "JSON output",
];

const THUMBNAIL_EXAMPLES: &str = examples![
    "app-launch thumbnail logo.png     " # "Print a data URL for an image",
];

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Resolve launch commands and configuration for proxied app frameworks.
#[derive(Debug, Parser)]
#[command(name = "app-launch", version, about, styles = styles())]
pub struct Cli {
    /// Concise output for scripts (tab-separated, no decoration).
    #[arg(short, long, global = true)]
    pub concise: bool,

    /// Settings file (defaults to $APP_LAUNCH_CONFIG or ~/.app-launch/config.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List registered frameworks.
    #[command(after_help = FRAMEWORKS_EXAMPLES)]
    Frameworks {
        /// Output as JSON, including templates.
        #[arg(long)]
        json: bool,
    },

    /// Resolve the launch command for a framework.
    #[command(after_help = RESOLVE_EXAMPLES)]
    Resolve {
        /// Framework identifier.
        framework: String,

        /// Port allocated to the instance (0 lets the framework choose).
        #[arg(short, long, default_value_t = 0)]
        port: u16,

        /// Externally visible base URL (defaults to settings).
        #[arg(long)]
        base_url: Option<String>,

        /// Allowed origin host (defaults to settings).
        #[arg(long)]
        origin_host: Option<String>,

        /// Entry-point script for the app.
        #[arg(short, long)]
        example_path: PathBuf,

        /// Append debug arguments.
        #[arg(long)]
        debug: bool,

        /// Output the launch plan as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List conda environments available to apps.
    #[command(after_help = ENVS_EXAMPLES)]
    Envs {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List spawner profiles available to a caller.
    #[command(after_help = PROFILES_EXAMPLES)]
    Profiles {
        /// Caller user name.
        #[arg(short, long)]
        user: Option<String>,

        /// JSON file with the caller's auth state.
        #[arg(long)]
        auth_state: Option<PathBuf>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Encode an image as a data URL.
    #[command(after_help = THUMBNAIL_EXAMPLES)]
    Thumbnail {
        /// Image file.
        path: PathBuf,
    },
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_resolve() {
        let cli = Cli::try_parse_from([
            "app-launch",
            "resolve",
            "streamlit",
            "-p",
            "8765",
            "-e",
            "app.py",
            "--debug",
        ])
        .unwrap();

        match cli.command {
            Command::Resolve {
                framework,
                port,
                example_path,
                debug,
                base_url,
                ..
            } => {
                assert_eq!(framework, "streamlit");
                assert_eq!(port, 8765);
                assert_eq!(example_path, PathBuf::from("app.py"));
                assert!(debug);
                assert!(base_url.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["app-launch", "envs", "-c", "--config", "x.toml"]).unwrap();
        assert!(cli.concise);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
    }
}
