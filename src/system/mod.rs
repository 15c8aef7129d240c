// Host interaction: bounded external commands and capability checks

pub mod runner;
pub mod tools;

#[cfg(test)]
pub(crate) mod fake;

pub use runner::{CommandOutput, CommandRunner, SystemRunner};
pub use tools::{is_root, ToolAvailability, ToolStatus};
