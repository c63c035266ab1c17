//! Core application logic for starcom
//!
//! This module contains the pieces the shell is built from: the command
//! parser, parameter validation, response scraping, the status table and the
//! StarExec client with its session and download protocol.
//!
//! # Examples
//!
//! ```rust,no_run
//! use starcom::app::{parse_line, ClientConfig, StarexecClient};
//! use starcom::auth::Credentials;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let base = url::Url::parse("https://www.starexec.org/starexec/")?;
//! let mut client =
//!     StarexecClient::with_config(&ClientConfig::default(), base, Credentials::guest())?;
//! client.login().await?;
//!
//! if let Some(command) = parse_line("lssolvers id=4")? {
//!     println!("{} with {} parameters", command.name(), command.params().len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod models;
pub mod parser;
pub mod scraper;
pub mod status;
pub mod validator;
pub mod watermark;

// Re-export main public API
pub use client::{ClientConfig, DownloadOutcome, DownloadRequest, StarexecClient};
pub use models::{ArchiveKind, Permissions, Primitive, PrimitiveKind, Traversal};
pub use parser::{parse_line, split_list, CommandInvocation};
pub use status::{Outcome, Status};
pub use watermark::{ResultCategory, WatermarkTable};
