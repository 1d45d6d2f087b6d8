//! Placeholder substitution for command templates.
//!
//! Handles `{port}`, `{base_url}`, `{origin_host}`, `{example_path}` and the
//! dash escapes `{-}` / `{--}` in template args, debug args and env values.
//! Escapes expand to a literal `-` / `--` and are never scanned again, so a
//! flag can be written without the proxy in front of the framework taking it
//! for one of its own options.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::context::ResolutionContext;
use crate::error::{LaunchError, LaunchResult};
use crate::frameworks::CommandTemplate;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Regex pattern for a placeholder: anything between a brace pair.
pub const PLACEHOLDER_PATTERN: &str = r"\{([^{}]*)\}";

/// Compiled placeholder regex.
static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PLACEHOLDER_PATTERN).expect("Invalid regex pattern"));

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A placeholder the engine knows how to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Port,
    BaseUrl,
    OriginHost,
    ExamplePath,
    /// `{-}`, a literal single dash.
    Dash,
    /// `{--}`, a literal double dash.
    DoubleDash,
}

/// Fully resolved arguments and environment for one framework launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedCommand {
    /// Resolved argument vector.
    pub argv: Vec<String>,
    /// Resolved environment variables.
    pub env: BTreeMap<String, String>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Placeholder {
    /// Parse a placeholder name (without braces).
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "port" => Some(Self::Port),
            "base_url" => Some(Self::BaseUrl),
            "origin_host" => Some(Self::OriginHost),
            "example_path" => Some(Self::ExamplePath),
            "-" => Some(Self::Dash),
            "--" => Some(Self::DoubleDash),
            _ => None,
        }
    }

    /// Name as written inside the braces.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Port => "port",
            Self::BaseUrl => "base_url",
            Self::OriginHost => "origin_host",
            Self::ExamplePath => "example_path",
            Self::Dash => "-",
            Self::DoubleDash => "--",
        }
    }

    /// Whether this is a dash escape rather than a context field.
    pub fn is_escape(&self) -> bool {
        matches!(self, Self::Dash | Self::DoubleDash)
    }

    /// Value for this placeholder, or `None` if the context lacks the field.
    fn value<'a>(&self, ctx: &'a ResolutionContext) -> Option<Cow<'a, str>> {
        match self {
            Self::Port => ctx.port_str().map(Cow::Owned),
            Self::BaseUrl => ctx.base_url.as_deref().map(Cow::Borrowed),
            Self::OriginHost => ctx.origin_host.as_deref().map(Cow::Borrowed),
            Self::ExamplePath => ctx.example_path_str().map(Cow::Owned),
            Self::Dash => Some(Cow::Borrowed("-")),
            Self::DoubleDash => Some(Cow::Borrowed("--")),
        }
    }
}

impl ResolvedCommand {
    /// Check whether any placeholder syntax survived resolution.
    pub fn has_unresolved(&self) -> bool {
        self.argv.iter().any(|a| PLACEHOLDER_REGEX.is_match(a))
            || self.env.values().any(|v| PLACEHOLDER_REGEX.is_match(v))
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Extract all placeholder names from a string, escapes included.
pub fn extract_placeholders(s: &str) -> Vec<String> {
    PLACEHOLDER_REGEX
        .captures_iter(s)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Context fields a template needs, in first-use order, without duplicates.
pub fn referenced_fields(template: &CommandTemplate, debug: bool) -> Vec<Placeholder> {
    let debug_args: &[String] = if debug { template.debug_args() } else { &[] };
    let mut fields = Vec::new();

    let all = template
        .args()
        .iter()
        .chain(debug_args)
        .chain(template.env().values());

    for s in all {
        for name in extract_placeholders(s) {
            if let Some(p) = Placeholder::parse(&name)
                && !p.is_escape()
                && !fields.contains(&p)
            {
                fields.push(p);
            }
        }
    }

    fields
}

/// Substitute every placeholder in a single token.
///
/// Fails on the first placeholder that is unknown or whose context field is
/// absent; no partially substituted token is ever returned. Escapes are
/// expanded once, and an expansion that leaves placeholder syntax behind
/// (`{{--}port}` gives `{--port}`) is rejected as well.
pub fn substitute_token(token: &str, ctx: &ResolutionContext) -> LaunchResult<String> {
    let mut result = String::with_capacity(token.len());
    let mut last = 0;

    for m in PLACEHOLDER_REGEX.find_iter(token) {
        let name = &token[m.start() + 1..m.end() - 1];
        let value = Placeholder::parse(name)
            .and_then(|p| p.value(ctx))
            .ok_or_else(|| LaunchError::Substitution {
                token: token.to_string(),
                placeholder: name.to_string(),
            })?;

        result.push_str(&token[last..m.start()]);
        result.push_str(&value);
        last = m.end();
    }

    result.push_str(&token[last..]);

    if let Some(cap) = PLACEHOLDER_REGEX.captures(&result) {
        return Err(LaunchError::Substitution {
            token: token.to_string(),
            placeholder: cap[1].to_string(),
        });
    }

    Ok(result)
}

/// Resolve a command template against a context.
///
/// Debug args are appended after the base args. Env keys pass through
/// unchanged; env values get the same substitution as args.
pub fn resolve(
    template: &CommandTemplate,
    ctx: &ResolutionContext,
    debug: bool,
) -> LaunchResult<ResolvedCommand> {
    let debug_args: &[String] = if debug { template.debug_args() } else { &[] };

    let argv = template
        .args()
        .iter()
        .chain(debug_args)
        .map(|token| substitute_token(token, ctx))
        .collect::<LaunchResult<Vec<_>>>()?;

    let env = template
        .env()
        .iter()
        .map(|(key, value)| substitute_token(value, ctx).map(|v| (key.clone(), v)))
        .collect::<LaunchResult<BTreeMap<_, _>>>()?;

    tracing::debug!(
        args = argv.len(),
        env = env.len(),
        debug_args = debug_args.len(),
        "Resolved command template"
    );

    Ok(ResolvedCommand { argv, env })
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frameworks::FrameworkRegistry;

    fn make_context() -> ResolutionContext {
        ResolutionContext::builder()
            .port(8765)
            .base_url("http://host/user/alice/streamlit")
            .origin_host("host:8000")
            .example_path("/srv/apps/streamlit_app.py")
            .build()
    }

    fn template(args: &[&str], env: &[(&str, &str)]) -> CommandTemplate {
        CommandTemplate::new("test", args.iter().map(|s| s.to_string()).collect())
            .unwrap()
            .with_env(
                env.iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            )
    }

    // -- substitute_token --

    #[test]
    fn token_without_placeholders() {
        let ctx = make_context();
        assert_eq!(substitute_token("--progressive", &ctx).unwrap(), "--progressive");
    }

    #[test]
    fn token_with_escapes_and_port() {
        let ctx = make_context();
        assert_eq!(substitute_token("{--}port={port}", &ctx).unwrap(), "--port=8765");
        assert_eq!(substitute_token("{-}m", &ctx).unwrap(), "-m");
    }

    #[test]
    fn token_with_multiple_placeholders() {
        let ctx = make_context();
        assert_eq!(
            substitute_token("{origin_host}|{port}|{base_url}/", &ctx).unwrap(),
            "host:8000|8765|http://host/user/alice/streamlit/"
        );
    }

    #[test]
    fn escapes_are_not_rescanned() {
        // `{--}` becomes `--`, which must not join with the following text into a new placeholder.
        let ctx = make_context();
        let err = substitute_token("{{--}port}", &ctx).unwrap_err();
        match err {
            LaunchError::Substitution { token, placeholder } => {
                assert_eq!(token, "{{--}port}");
                assert_eq!(placeholder, "--port");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn escape_closing_a_brace_pair_fails_resolution() {
        let ctx = make_context();
        let rejected = template(&["{{--}port}"], &[]);
        assert!(matches!(
            resolve(&rejected, &ctx, false),
            Err(LaunchError::Substitution { .. })
        ));

        let accepted = template(&["{-}{-}x", "{--}port={port}"], &[]);
        let resolved = resolve(&accepted, &ctx, false).unwrap();
        assert_eq!(resolved.argv, vec!["--x", "--port=8765"]);
        assert!(!resolved.has_unresolved());
    }

    #[test]
    fn debug_resolution_with_subscriber_installed() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        let template = FrameworkRegistry::builtin().lookup("voila").unwrap().clone();
        let resolved = tracing::subscriber::with_default(subscriber, || {
            resolve(&template, &make_context(), true)
        })
        .unwrap();
        assert_eq!(resolved.argv.last().map(String::as_str), Some("--debug"));
    }

    #[test]
    fn token_with_unknown_placeholder() {
        let ctx = make_context();
        let err = substitute_token("--user={username}", &ctx).unwrap_err();
        match err {
            LaunchError::Substitution { token, placeholder } => {
                assert_eq!(token, "--user={username}");
                assert_eq!(placeholder, "username");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn port_zero_substitutes() {
        let ctx = ResolutionContext::builder().port(0).build();
        assert_eq!(substitute_token("{--}port={port}", &ctx).unwrap(), "--port=0");
    }

    // -- resolve --

    #[test]
    fn resolve_streamlit_end_to_end() {
        let registry = FrameworkRegistry::builtin();
        let ctx = ResolutionContext::builder()
            .port(8765)
            .base_url("http://host/user/alice/streamlit")
            .origin_host("host:8000")
            .example_path("/srv/apps/streamlit_app.py")
            .build();

        let resolved = resolve(registry.lookup("streamlit").unwrap(), &ctx, false).unwrap();

        assert!(resolved.argv.iter().any(|a| a == "--server.port=8765"));
        assert!(resolved.argv.iter().any(|a| a == "--browser.serverAddress=host:8000"));
        assert!(resolved.argv.iter().any(|a| a == "/srv/apps/streamlit_app.py"));
        assert!(
            resolved
                .argv
                .iter()
                .all(|a| !a.contains("{port}") && !a.contains("{origin_host}"))
        );
    }

    #[test]
    fn resolve_every_builtin_fully() {
        let registry = FrameworkRegistry::builtin();
        let ctx = make_context();
        for spec in registry.iter() {
            for debug in [false, true] {
                let resolved = resolve(&spec.template, &ctx, debug).unwrap();
                assert!(!resolved.has_unresolved(), "{} left placeholders", spec.id);
            }
        }
    }

    #[test]
    fn resolve_is_idempotent() {
        let registry = FrameworkRegistry::builtin();
        let ctx = make_context();
        let template = registry.lookup("voila").unwrap();
        assert_eq!(
            resolve(template, &ctx, true).unwrap(),
            resolve(template, &ctx, true).unwrap()
        );
    }

    #[test]
    fn debug_args_are_appended() {
        let registry = FrameworkRegistry::builtin();
        let ctx = make_context();
        for spec in registry.iter() {
            let base = resolve(&spec.template, &ctx, false).unwrap();
            let debug = resolve(&spec.template, &ctx, true).unwrap();
            assert_eq!(&debug.argv[..base.argv.len()], base.argv.as_slice());
            assert_eq!(
                debug.argv.len(),
                base.argv.len() + spec.template.debug_args().len()
            );
            assert_eq!(debug.env, base.env);
        }

        let streamlit = resolve(registry.lookup("streamlit").unwrap(), &ctx, true).unwrap();
        assert_eq!(streamlit.argv.last().map(String::as_str), Some("--logger.level=debug"));
    }

    #[test]
    fn resolve_env_values() {
        let registry = FrameworkRegistry::builtin();
        let ctx = make_context();
        let resolved = resolve(registry.lookup("plotlydash").unwrap(), &ctx, false).unwrap();
        assert_eq!(
            resolved.env.get("DASH_REQUESTS_PATHNAME_PREFIX").map(String::as_str),
            Some("http://host/user/alice/streamlit/")
        );
    }

    #[test]
    fn env_keys_pass_through() {
        let ctx = make_context();
        let t = template(&["run"], &[("{port}", "{port}")]);
        let resolved = resolve(&t, &ctx, false).unwrap();
        assert_eq!(resolved.env.get("{port}").map(String::as_str), Some("8765"));
    }

    #[test]
    fn missing_base_url_fails_in_args_and_env() {
        let ctx = ResolutionContext::builder()
            .port(8765)
            .origin_host("host:8000")
            .example_path("/srv/app.py")
            .build();
        let registry = FrameworkRegistry::builtin();

        for id in ["voila", "bokeh", "panel", "plotlydash"] {
            let err = resolve(registry.lookup(id).unwrap(), &ctx, false).unwrap_err();
            assert!(
                matches!(&err, LaunchError::Substitution { placeholder, .. } if placeholder == "base_url"),
                "{id}: {err}"
            );
        }

        let env_only = template(&["run"], &[("PREFIX", "{base_url}/")]);
        let err = resolve(&env_only, &ctx, false).unwrap_err();
        assert!(matches!(err, LaunchError::Substitution { token, .. } if token == "{base_url}/"));

        // Templates that never mention base_url still resolve.
        assert!(resolve(registry.lookup("streamlit").unwrap(), &ctx, false).is_ok());
    }

    #[test]
    fn referenced_fields_in_order() {
        let registry = FrameworkRegistry::builtin();
        let fields = referenced_fields(registry.lookup("plotlydash").unwrap(), false);
        assert_eq!(
            fields,
            vec![Placeholder::ExamplePath, Placeholder::Port, Placeholder::BaseUrl]
        );
    }

    #[test]
    fn extract_includes_escapes() {
        assert_eq!(
            extract_placeholders("{--}prefix={base_url}"),
            vec!["--".to_string(), "base_url".to_string()]
        );
    }
}
