//! Build environment: tool resolution and command execution

mod core;
mod execution;
mod types;

pub use core::BuildEnvironment;
pub use types::BuildCommandResult;
