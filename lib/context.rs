//! Runtime values consumed by template resolution and context-aware providers.
//!
//! A [`ResolutionContext`] is built fresh for every launch request and thrown
//! away once the command has been resolved. A [`CallerContext`] is handed
//! opaquely to configuration providers that need the caller's identity.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LaunchError, LaunchResult};
use crate::settings::Settings;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Values substituted into a command template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionContext {
    /// Port allocated to the instance. `0` lets the framework pick one.
    pub port: Option<u16>,
    /// Externally visible URL prefix of the proxied instance.
    pub base_url: Option<String>,
    /// host:port allowed as CORS/websocket origin.
    pub origin_host: Option<String>,
    /// Entry-point script handed to the framework.
    pub example_path: Option<PathBuf>,
}

/// Builder for [`ResolutionContext`].
#[derive(Debug, Clone, Default)]
pub struct ResolutionContextBuilder {
    inner: ResolutionContext,
}

/// Identity of whoever asked for a configuration value.
///
/// Constructed by the orchestrator; providers read it, the resolver never
/// looks inside.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallerContext {
    /// Authenticated user name, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Auth state as stored by the authenticator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_state: Option<Value>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ResolutionContext {
    /// Start building a context.
    pub fn builder() -> ResolutionContextBuilder {
        ResolutionContextBuilder::default()
    }

    /// Builder pre-seeded with the operator's default base URL and origin host.
    pub fn from_settings(settings: &Settings) -> ResolutionContextBuilder {
        Self::builder()
            .base_url(settings.base_url.clone())
            .origin_host(settings.origin_host.clone())
    }

    /// Port rendered as a decimal string.
    pub fn port_str(&self) -> Option<String> {
        self.port.map(|p| p.to_string())
    }

    /// Entry-point script rendered as a string.
    pub fn example_path_str(&self) -> Option<String> {
        self.example_path
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
    }

    /// Check that every field is populated and non-empty.
    pub fn validate(&self) -> LaunchResult<()> {
        if self.port.is_none() {
            return Err(LaunchError::IncompleteContext { field: "port" });
        }
        if self.base_url.as_deref().is_none_or(str::is_empty) {
            return Err(LaunchError::IncompleteContext { field: "base_url" });
        }
        if self.origin_host.as_deref().is_none_or(str::is_empty) {
            return Err(LaunchError::IncompleteContext {
                field: "origin_host",
            });
        }
        if self
            .example_path
            .as_deref()
            .is_none_or(|p| p.as_os_str().is_empty())
        {
            return Err(LaunchError::IncompleteContext {
                field: "example_path",
            });
        }
        Ok(())
    }
}

impl ResolutionContextBuilder {
    /// Set the allocated port.
    pub fn port(mut self, port: u16) -> Self {
        self.inner.port = Some(port);
        self
    }

    /// Set the base URL. A trailing slash is dropped, templates add their own.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        let url: String = base_url.into();
        self.inner.base_url = Some(url.trim_end_matches('/').to_string());
        self
    }

    /// Set the origin host.
    pub fn origin_host(mut self, origin_host: impl Into<String>) -> Self {
        self.inner.origin_host = Some(origin_host.into());
        self
    }

    /// Set the entry-point script.
    pub fn example_path(mut self, path: impl AsRef<Path>) -> Self {
        self.inner.example_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Finish without checking completeness.
    pub fn build(self) -> ResolutionContext {
        self.inner
    }

    /// Finish and check the launch contract.
    pub fn build_validated(self) -> LaunchResult<ResolutionContext> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}

impl CallerContext {
    /// Context for a named user with the given auth state.
    pub fn new(user: impl Into<String>, auth_state: Option<Value>) -> Self {
        Self {
            user: Some(user.into()),
            auth_state,
        }
    }

    /// Context for a caller with no session.
    pub fn anonymous() -> Self {
        Self::default()
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> ResolutionContextBuilder {
        ResolutionContext::builder()
            .port(8765)
            .base_url("http://host/user/alice/streamlit")
            .origin_host("host:8000")
            .example_path("/srv/apps/app.py")
    }

    #[test]
    fn test_builder_populates_fields() {
        let ctx = full().build();
        assert_eq!(ctx.port, Some(8765));
        assert_eq!(ctx.port_str().as_deref(), Some("8765"));
        assert_eq!(ctx.example_path_str().as_deref(), Some("/srv/apps/app.py"));
        assert!(ctx.validate().is_ok());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let ctx = ResolutionContext::builder()
            .base_url("http://host/user/alice/")
            .build();
        assert_eq!(ctx.base_url.as_deref(), Some("http://host/user/alice"));
    }

    #[test]
    fn test_port_zero_is_valid() {
        assert!(full().port(0).build_validated().is_ok());
    }

    #[test]
    fn test_validate_reports_missing_field() {
        let ctx = ResolutionContext::builder()
            .port(1)
            .origin_host("h:1")
            .example_path("/a.py")
            .build();
        assert!(matches!(
            ctx.validate(),
            Err(LaunchError::IncompleteContext { field: "base_url" })
        ));

        let err = full().origin_host("").build_validated().unwrap_err();
        assert!(matches!(
            err,
            LaunchError::IncompleteContext {
                field: "origin_host"
            }
        ));
    }

    #[test]
    fn test_from_settings_seeds_defaults() {
        let settings = Settings::default();
        let ctx = ResolutionContext::from_settings(&settings).build();
        assert_eq!(ctx.base_url.as_deref(), Some("http://127.0.0.1:8000"));
        assert_eq!(ctx.origin_host.as_deref(), Some("localhost:8000"));
        assert!(ctx.port.is_none());
    }

    #[test]
    fn test_caller_context_serde() {
        let ctx = CallerContext::new("alice", Some(serde_json::json!({"groups": ["gpu"]})));
        let json = serde_json::to_string(&ctx).unwrap();
        let back: CallerContext = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ctx);
        assert_eq!(CallerContext::anonymous().user, None);
    }
}
