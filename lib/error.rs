//! Error types for app-launch.

use thiserror::Error;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Result type for app-launch operations.
pub type LaunchResult<T> = Result<T, LaunchError>;

/// Error type for app-launch operations.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Requested framework is not in the registry.
    #[error("Unknown framework: {id}")]
    UnknownFramework {
        /// The requested identifier.
        id: String,
        /// Identifiers the registry does know, comma separated.
        known: String,
    },

    /// A template token references a placeholder that cannot be filled.
    #[error("Cannot substitute '{{{placeholder}}}' in '{token}'")]
    Substitution {
        /// The raw template token.
        token: String,
        /// The placeholder name, without braces.
        placeholder: String,
    },

    /// A dynamic configuration value has none of the recognized shapes.
    #[error("Invalid value for {key}: expected a list, a provider reference or nothing, got {observed}")]
    InvalidConfigurationShape {
        /// The configuration key being resolved.
        key: String,
        /// The observed type of the value.
        observed: String,
    },

    /// A configuration value references a provider nobody registered.
    #[error("Unknown provider '{name}' for {key}")]
    UnknownProvider { key: String, name: String },

    /// A command template violates its invariants.
    #[error("Invalid template for {id}: {reason}")]
    InvalidTemplate { id: String, reason: String },

    /// The resolution context is missing a field the launch contract requires.
    #[error("Incomplete resolution context: {field} is not set")]
    IncompleteContext { field: &'static str },

    /// Configuration parse error.
    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// Deserialization error.
    #[error("Deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}
