//! `app-launch` library.

pub mod commands;
pub mod constants;
pub mod context;
pub mod dynamic;
pub mod error;
pub mod frameworks;
pub mod handlers;
pub mod launch;
pub mod options;
pub mod providers;
pub mod settings;
pub mod styles;
pub mod substitute;
pub mod thumbnail;

//--------------------------------------------------------------------------------------------------
// Re-Exports
//--------------------------------------------------------------------------------------------------

pub use commands::*;
pub use constants::*;
pub use context::*;
pub use dynamic::*;
pub use error::*;
pub use frameworks::*;
pub use launch::*;
pub use options::*;
pub use providers::*;
pub use settings::*;
pub use substitute::*;
pub use thumbnail::*;
