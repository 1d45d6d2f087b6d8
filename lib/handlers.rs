//! Command handlers.

mod frameworks;
mod options;
mod thumbnail;

//--------------------------------------------------------------------------------------------------
// Re-Exports
//--------------------------------------------------------------------------------------------------

pub use frameworks::{list_frameworks, resolve_framework};
pub use options::{list_envs, list_profiles};
pub use thumbnail::print_thumbnail;

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Print a value as JSON, compact in concise mode.
pub(crate) fn print_json<T: serde::Serialize>(
    value: &T,
    concise: bool,
) -> crate::LaunchResult<()> {
    let out = if concise {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", out);
    Ok(())
}
