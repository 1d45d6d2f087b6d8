//! Framework registry.
//!
//! Maps a framework identifier (`streamlit`, `voila`, ...) to the launcher
//! prefix and command template used to start it behind the native proxy.
//! The registry is assembled once at startup, optionally patched with
//! operator overrides, and read-only afterwards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::default_launcher;
use crate::error::{LaunchError, LaunchResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Argument and environment templates for one framework.
///
/// Tokens may contain placeholders such as `{port}` or the dash escapes
/// `{-}` / `{--}`; see [`crate::substitute`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandTemplate {
    args: Vec<String>,
    debug_args: Vec<String>,
    env: BTreeMap<String, String>,
}

/// Everything the registry knows about a framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameworkSpec {
    /// Registry key.
    pub id: String,
    /// Human-readable name.
    pub display_name: String,
    /// Command prefix placed in front of the resolved arguments.
    pub launcher: Vec<String>,
    /// Argument and environment templates.
    pub template: CommandTemplate,
}

/// Operator-supplied patch for a framework, read from the settings file.
///
/// Every field is optional when patching a built-in framework. A new
/// framework must at least provide `args`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launcher: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>,
}

/// Immutable lookup table of frameworks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkRegistry {
    frameworks: BTreeMap<String, FrameworkSpec>,
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Default for FrameworkRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl CommandTemplate {
    /// Create a template. Fails if `args` is empty.
    pub fn new(id: &str, args: Vec<String>) -> LaunchResult<Self> {
        if args.is_empty() {
            return Err(LaunchError::InvalidTemplate {
                id: id.to_string(),
                reason: "args must not be empty".to_string(),
            });
        }
        Ok(Self {
            args,
            debug_args: Vec::new(),
            env: BTreeMap::new(),
        })
    }

    /// Set the arguments appended in debug mode.
    pub fn with_debug_args(mut self, debug_args: Vec<String>) -> Self {
        self.debug_args = debug_args;
        self
    }

    /// Set the environment templates.
    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn debug_args(&self) -> &[String] {
        &self.debug_args
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }
}

impl FrameworkRegistry {
    /// Registry with no frameworks.
    pub fn empty() -> Self {
        Self {
            frameworks: BTreeMap::new(),
        }
    }

    /// Registry with the built-in frameworks.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for spec in builtin_frameworks() {
            registry.frameworks.insert(spec.id.clone(), spec);
        }
        registry
    }

    /// Apply operator overrides, adding new frameworks or patching existing ones.
    pub fn with_overrides(
        mut self,
        overrides: &BTreeMap<String, FrameworkOverride>,
    ) -> LaunchResult<Self> {
        for (id, patch) in overrides {
            let spec = match self.frameworks.remove(id) {
                Some(existing) => patch_framework(existing, patch)?,
                None => new_framework(id, patch)?,
            };
            tracing::debug!("Registered framework '{}' from settings", id);
            self.frameworks.insert(id.clone(), spec);
        }
        Ok(self)
    }

    /// Get the full spec for a framework.
    pub fn get(&self, id: &str) -> LaunchResult<&FrameworkSpec> {
        self.frameworks
            .get(id)
            .ok_or_else(|| LaunchError::UnknownFramework {
                id: id.to_string(),
                known: self.ids().collect::<Vec<_>>().join(", "),
            })
    }

    /// Get the command template for a framework.
    pub fn lookup(&self, id: &str) -> LaunchResult<&CommandTemplate> {
        self.get(id).map(|spec| &spec.template)
    }

    /// Get the launcher prefix for a framework.
    pub fn base_command(&self, id: &str) -> LaunchResult<&[String]> {
        self.get(id).map(|spec| spec.launcher.as_slice())
    }

    /// Check whether a framework is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.frameworks.contains_key(id)
    }

    /// Registered identifiers in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.frameworks.keys().map(String::as_str)
    }

    /// Registered frameworks in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &FrameworkSpec> {
        self.frameworks.values()
    }

    pub fn len(&self) -> usize {
        self.frameworks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frameworks.is_empty()
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

fn patch_framework(
    mut spec: FrameworkSpec,
    patch: &FrameworkOverride,
) -> LaunchResult<FrameworkSpec> {
    if let Some(name) = &patch.display_name {
        spec.display_name = name.clone();
    }
    if let Some(launcher) = &patch.launcher {
        spec.launcher = launcher.clone();
    }
    if let Some(args) = &patch.args {
        spec.template.args = CommandTemplate::new(&spec.id, args.clone())?.args;
    }
    if let Some(debug_args) = &patch.debug_args {
        spec.template.debug_args = debug_args.clone();
    }
    if let Some(env) = &patch.env {
        spec.template.env = env.clone();
    }
    Ok(spec)
}

fn new_framework(id: &str, patch: &FrameworkOverride) -> LaunchResult<FrameworkSpec> {
    let args = patch.args.clone().ok_or_else(|| LaunchError::InvalidTemplate {
        id: id.to_string(),
        reason: "new frameworks must define args".to_string(),
    })?;

    let template = CommandTemplate::new(id, args)?
        .with_debug_args(patch.debug_args.clone().unwrap_or_default())
        .with_env(patch.env.clone().unwrap_or_default());

    Ok(FrameworkSpec {
        id: id.to_string(),
        display_name: patch.display_name.clone().unwrap_or_else(|| id.to_string()),
        launcher: patch.launcher.clone().unwrap_or_else(default_launcher),
        template,
    })
}

fn tokens(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn builtin(id: &str, display_name: &str, args: &[&str], debug_args: &[&str]) -> FrameworkSpec {
    FrameworkSpec {
        id: id.to_string(),
        display_name: display_name.to_string(),
        launcher: default_launcher(),
        template: CommandTemplate {
            args: tokens(args),
            debug_args: tokens(debug_args),
            env: BTreeMap::new(),
        },
    }
}

/// The frameworks shipped with app-launch.
fn builtin_frameworks() -> Vec<FrameworkSpec> {
    let voila = builtin(
        "voila",
        "Voila",
        &[
            "--destport=0",
            "python3",
            "{-}m",
            "voila",
            "{example_path}",
            "{--}port={port}",
            "{--}no-browser",
            "{--}Voila.base_url={base_url}/",
            "{--}Voila.server_url=/",
            "{--}Voila.ip=0.0.0.0",
            "{--}Voila.tornado_settings",
            "allow_origin={origin_host}",
            "--progressive",
            "--ready-check-path=/voila/static/",
        ],
        &["{--}debug"],
    );

    let streamlit = builtin(
        "streamlit",
        "Streamlit",
        &[
            "--destport=0",
            "streamlit",
            "run",
            "{example_path}",
            "{--}server.port={port}",
            "{--}server.headless=True",
            "{--}browser.serverAddress={origin_host}",
            "{--}browser.gatherUsageStats=false",
        ],
        &["{--}logger.level=debug"],
    );

    let mut plotlydash = builtin(
        "plotlydash",
        "Plotly Dash",
        &[
            "--destport=0",
            "python3",
            "{-}m",
            "plotlydash_tornado_cmd.main",
            "{example_path}",
            "{--}port={port}",
        ],
        &[],
    );
    plotlydash.template.env.insert(
        "DASH_REQUESTS_PATHNAME_PREFIX".to_string(),
        "{base_url}/".to_string(),
    );

    let bokeh = builtin(
        "bokeh",
        "Bokeh",
        &[
            "--destport=0",
            "python3",
            "{-}m",
            "bokeh_root_cmd.main",
            "{example_path}",
            "{--}port={port}",
            "{--}allow-websocket-origin={origin_host}",
            "{--}prefix={base_url}",
            "--ready-check-path=/ready-check",
        ],
        &["{--}debug"],
    );

    let panel = builtin(
        "panel",
        "Panel",
        &[
            "--destport=0",
            "python",
            "{-}m",
            "bokeh_root_cmd.main",
            "{example_path}",
            "{--}port={port}",
            "{--}debug",
            "{--}allow-websocket-origin={origin_host}",
            "{--}server=panel",
            "{--}prefix={base_url}",
            "--ready-check-path=/ready-check",
        ],
        &[],
    );

    let rshiny = builtin(
        "rshiny",
        "R Shiny",
        &[
            "--destport=0",
            "python3",
            "{-}m",
            "rshiny_server_cmd.main",
            "{example_path}",
            "{--}port={port}",
        ],
        &[],
    );

    vec![voila, streamlit, plotlydash, bokeh, panel, rshiny]
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
