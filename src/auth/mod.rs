//! Login credentials
//!
//! # Examples
//!
//! ```rust
//! use starcom::auth::Credentials;
//!
//! let guest = Credentials::new("guest", "");
//! assert_eq!(guest.username(), "public");
//! ```

pub mod credentials;

pub use credentials::{check_credentials, resolve_credentials, Credentials};
