//! Command-line argument parsing for starcom
//!
//! The process command line only selects how commands are fed to the shell:
//! interactively from stdin, or from a file. The StarExec commands themselves
//! are typed at the prompt or listed in the file.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// starcom - command-line client for StarExec
#[derive(Parser, Debug)]
#[command(
    name = "starcom",
    version,
    about = "Command-line client for the StarExec job execution service",
    long_about = "An interactive shell for StarExec. Upload solvers and benchmarks, create and
control jobs, and download results, including incremental polling of running jobs.
Type 'help' at the prompt for the command reference."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands; the interactive shell when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// StarExec base address, overriding the configuration file
    #[arg(long, global = true, value_name = "URL")]
    pub addr: Option<String>,

    /// Accept invalid TLS certificates
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Log in on startup with STARCOM_USERNAME / STARCOM_PASSWORD
    #[arg(long, global = true)]
    pub login: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start the interactive shell
    Shell,

    /// Run the commands listed in a file, one per line
    Run(RunArgs),
}

/// Arguments for the run command
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct RunArgs {
    /// File of commands
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Print each command and its status as it runs
    #[arg(short, long)]
    pub echo: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the log level from the flags, falling back to `configured`
    pub fn log_level(&self, configured: tracing::Level) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.very_verbose {
            tracing::Level::DEBUG
        } else if self.global.verbose {
            tracing::Level::INFO
        } else {
            configured
        }
    }

    /// The command to run, defaulting to the interactive shell
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Shell)
    }
}
