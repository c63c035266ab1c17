//! Prelude module for the starcom library
//!
//! Re-exports the items needed to drive StarExec from code with a single
//! `use starcom::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use starcom::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let credentials = resolve_credentials()?;
//!     let base_url = Url::parse(DEFAULT_BASE_URL).expect("valid address");
//!     let mut client = StarexecClient::with_config(&ClientConfig::default(), base_url, credentials)?;
//!     client.login().await?;
//!
//!     if let Some(cmd) = parse_line("ls solver id=42")? {
//!         println!("{} with {} parameters", cmd.name(), cmd.params().len());
//!     }
//!     client.logout().await;
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

// Client, command language and outcomes
pub use crate::app::{
    parse_line, ArchiveKind, ClientConfig, CommandInvocation, DownloadOutcome, DownloadRequest,
    Outcome, Permissions, PrimitiveKind, StarexecClient, Status, WatermarkTable,
};

// Credentials
pub use crate::auth::{check_credentials, resolve_credentials, Credentials};

// Shell
pub use crate::cli::{Connector, Shell, ShellOptions};
pub use crate::config::AppConfig;

// Commonly used constants
pub use crate::constants::{DEFAULT_BASE_URL, ENV_PASSWORD, ENV_USERNAME, USER_AGENT};

pub use std::path::{Path, PathBuf};
pub use url::Url;
