//! Credential handling for StarExec logins
//!
//! Credentials come from the `login` command, from the `STARCOM_USERNAME` /
//! `STARCOM_PASSWORD` environment variables (a `.env` file is loaded at
//! startup), or from an interactive prompt.

use std::env;
use std::fmt;
use std::io::{self, Write};

use crate::constants::{auth, env as env_constants};
use crate::errors::{AppError, Result};

/// Username and password pair used to open a session
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Build credentials, mapping the `guest` user onto the public account
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        let username = username.into();
        if username == auth::GUEST_USERNAME {
            return Self::guest();
        }
        Self {
            username,
            password: password.into(),
        }
    }

    /// The service's anonymous account
    pub fn guest() -> Self {
        Self {
            username: auth::PUBLIC_USERNAME.to_string(),
            password: auth::PUBLIC_PASSWORD.to_string(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn is_guest(&self) -> bool {
        self.username == auth::PUBLIC_USERNAME
    }

    /// Read credentials from the environment, if both variables are set
    pub fn from_env() -> Option<Self> {
        let username = env::var(env_constants::USERNAME).ok()?;
        let password = env::var(env_constants::PASSWORD).ok()?;
        Some(Self::new(username, password))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Check if a username is available in the environment
pub fn check_credentials() -> bool {
    env::var(env_constants::USERNAME).is_ok()
}

/// Resolve credentials for an unattended login.
///
/// The username comes from the environment or the terminal; a missing
/// password is prompted for without echo.
pub fn resolve_credentials() -> Result<Credentials> {
    if let Some(credentials) = Credentials::from_env() {
        return Ok(credentials);
    }

    let username = match env::var(env_constants::USERNAME) {
        Ok(username) => username,
        Err(_) => prompt_username()?,
    };
    if username == auth::GUEST_USERNAME {
        return Ok(Credentials::guest());
    }

    let password = rpassword::prompt_password(format!("Password for {username}: "))?;
    if password.is_empty() {
        return Err(AppError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "Password cannot be empty",
        )));
    }
    Ok(Credentials::new(username, password))
}

fn prompt_username() -> Result<String> {
    print!("StarExec username: ");
    io::stdout().flush()?;

    let mut username = String::new();
    io::stdin().read_line(&mut username)?;
    let username = username.trim().to_string();

    if username.is_empty() {
        return Err(AppError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "Username cannot be empty",
        )));
    }
    Ok(username)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_maps_to_public_account() {
        // Test that the guest user logs in as the public account
        let credentials = Credentials::new("guest", "ignored");
        assert_eq!(credentials.username(), "public");
        assert_eq!(credentials.password(), "public");
        assert!(credentials.is_guest());
    }

    #[test]
    fn test_regular_credentials() {
        let credentials = Credentials::new("alice", "secret");
        assert_eq!(credentials.username(), "alice");
        assert_eq!(credentials.password(), "secret");
        assert!(!credentials.is_guest());
    }

    #[test]
    fn test_debug_redacts_password() {
        let credentials = Credentials::new("alice", "hunter2");
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }
}
