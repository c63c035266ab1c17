//! Command-line interface components
//!
//! Argument parsing for the binary, the interactive shell and command-file
//! runner, the per-command handlers, and spinner feedback during transfers.

pub mod args;
pub mod commands;
pub mod progress;
pub mod shell;

pub use args::{Cli, Commands, GlobalArgs, RunArgs};
pub use commands::{default_name, dispatch, Reporter};
pub use progress::Spinner;
pub use shell::{Connector, Shell, ShellOptions, HELP_TEXT};
