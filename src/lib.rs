//! starcom library
//!
//! A client for the StarExec job execution service. StarExec has no public
//! API; its web pages and form handlers are driven directly, with an
//! authenticated session kept alive across commands and refreshed when the
//! server drops it.
//!
//! The library provides:
//! - a line-oriented command language (`app::parser`, `app::validator`)
//! - the HTTP session and remote operations (`app::client`)
//! - incremental download of job output guided by watermarks (`app::watermark`)
//! - the interactive shell and command-file runner (`cli::shell`)

pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
