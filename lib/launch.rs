//! Launch plans handed to the process supervisor.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::context::ResolutionContext;
use crate::error::LaunchResult;
use crate::frameworks::FrameworkRegistry;
use crate::substitute::resolve;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The full command line and environment for one framework instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchPlan {
    /// Framework identifier.
    pub framework: String,
    /// Launcher prefix followed by the resolved arguments.
    pub command: Vec<String>,
    /// Environment variables to add for the process.
    pub env: BTreeMap<String, String>,
    /// Whether debug arguments were included.
    pub debug: bool,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl LaunchPlan {
    /// The executable, i.e. the first command token.
    pub fn program(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }

    /// Arguments after the executable.
    pub fn args(&self) -> &[String] {
        self.command.get(1..).unwrap_or_default()
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Build the launch plan for `framework`.
///
/// The context must satisfy [`ResolutionContext::validate`]; the template is
/// then resolved and prefixed with the framework's launcher.
pub fn plan_launch(
    registry: &FrameworkRegistry,
    framework: &str,
    ctx: &ResolutionContext,
    debug: bool,
) -> LaunchResult<LaunchPlan> {
    let spec = registry.get(framework)?;
    ctx.validate()?;

    let resolved = resolve(&spec.template, ctx, debug)?;

    let mut command = spec.launcher.clone();
    command.extend(resolved.argv);

    tracing::debug!("Planned launch of {} ({} tokens)", framework, command.len());

    Ok(LaunchPlan {
        framework: framework.to_string(),
        command,
        env: resolved.env,
        debug,
    })
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_LAUNCHER;
    use crate::error::LaunchError;
    use crate::frameworks::FrameworkOverride;

    fn make_context() -> ResolutionContext {
        ResolutionContext::builder()
            .port(9000)
            .base_url("http://host/user/alice/bokeh")
            .origin_host("host:8000")
            .example_path("/srv/apps/bokeh_app.py")
            .build()
    }

    #[test]
    fn test_plan_prefixes_launcher() {
        let registry = FrameworkRegistry::builtin();
        let plan = plan_launch(&registry, "bokeh", &make_context(), false).unwrap();

        assert_eq!(plan.program(), Some("python"));
        assert_eq!(&plan.command[..DEFAULT_LAUNCHER.len()], DEFAULT_LAUNCHER);
        assert_eq!(plan.command[DEFAULT_LAUNCHER.len()], "--destport=0");
        assert!(plan.args().iter().any(|a| a == "--prefix=http://host/user/alice/bokeh"));
        assert!(plan.args().iter().any(|a| a == "--allow-websocket-origin=host:8000"));
        assert!(plan.env.is_empty());
    }

    #[test]
    fn test_plan_uses_framework_launcher() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            "rshiny".to_string(),
            FrameworkOverride {
                launcher: Some(vec!["jhsingle-native-proxy".to_string()]),
                ..Default::default()
            },
        );
        let registry = FrameworkRegistry::builtin().with_overrides(&overrides).unwrap();
        let plan = plan_launch(&registry, "rshiny", &make_context(), false).unwrap();
        assert_eq!(plan.program(), Some("jhsingle-native-proxy"));
        assert_eq!(plan.args()[0], "--destport=0");
    }

    #[test]
    fn test_plan_unknown_framework() {
        let err = plan_launch(&FrameworkRegistry::builtin(), "shiny-py", &make_context(), false)
            .unwrap_err();
        assert!(matches!(err, LaunchError::UnknownFramework { .. }));
    }

    #[test]
    fn test_plan_requires_complete_context() {
        let ctx = ResolutionContext::builder()
            .port(9000)
            .base_url("http://host")
            .origin_host("host:8000")
            .build();
        let err = plan_launch(&FrameworkRegistry::builtin(), "streamlit", &ctx, false).unwrap_err();
        assert!(matches!(
            err,
            LaunchError::IncompleteContext {
                field: "example_path"
            }
        ));
    }

    #[test]
    fn test_plan_serializes() {
        let plan = plan_launch(&FrameworkRegistry::builtin(), "plotlydash", &make_context(), true)
            .unwrap();
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["framework"], "plotlydash");
        assert_eq!(json["debug"], true);
        assert_eq!(
            json["env"]["DASH_REQUESTS_PATHNAME_PREFIX"],
            "http://host/user/alice/bokeh/"
        );
    }
}
