//! HTTP client for a StarExec instance
//!
//! The module is organized into specialized components:
//! - `http`: request/response values, the [`Transport`] seam and its reqwest
//!   implementation with rate limiting and retries
//! - `config`: HTTP client configuration and building
//! - `session`: session token, header injection and session-loss detection
//! - `auth`: the form-based login flow
//! - `download`: archive downloads with incremental watermarks
//! - `operations`, `uploads`: the remaining remote commands

use std::sync::Arc;

use url::Url;

use crate::auth::Credentials;
use crate::errors::Result;

// Module declarations
pub mod auth;
pub mod config;
pub mod download;
pub mod http;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod operations;
pub mod session;
pub mod uploads;

pub use config::ClientConfig;
pub use download::{DownloadOutcome, DownloadRequest};
pub use http::{HttpTransport, OutgoingRequest, RawResponse, Transport};
pub use operations::{JobSpec, ListingOwner, SubspaceSpec, TransferRequest, UserSetting};
pub use session::Session;
pub use uploads::{
    BenchmarkUpload, ConfigurationUpload, DescriptionSource, ProcessorUpload, SolverUpload,
    UploadSource,
};

use auth::AuthHandler;

/// Client bound to one StarExec account
///
/// Owns the session; every exchange goes through [`StarexecClient::issue`],
/// which injects the session headers and absorbs token rotation.
#[derive(Debug, Clone)]
pub struct StarexecClient {
    transport: Arc<dyn Transport>,
    session: Session,
}

impl StarexecClient {
    /// Creates a client over any transport without logging in
    pub fn new(transport: Arc<dyn Transport>, base_url: Url, credentials: Credentials) -> Self {
        Self {
            transport,
            session: Session::new(base_url, credentials),
        }
    }

    /// Creates a client over HTTP without logging in
    ///
    /// # Errors
    ///
    /// Returns a transport error if the reqwest client or the rate limiter
    /// cannot be built
    pub fn with_config(config: &ClientConfig, base_url: Url, credentials: Credentials) -> Result<Self> {
        http::check_address(&base_url)?;
        let client = config.build_http_client()?;
        let transport = HttpTransport::new(client, config.rate_limit_rps)?;
        Ok(Self::new(Arc::new(transport), base_url, credentials))
    }

    /// Log in with the stored credentials
    pub async fn login(&mut self) -> Result<()> {
        AuthHandler::authenticate(self.transport.as_ref(), &mut self.session).await
    }

    /// Replace the session with a fresh login that keeps the watermarks.
    ///
    /// The previous session is kept if the new login fails.
    pub async fn relogin(&mut self) -> Result<()> {
        let mut fresh = self.session.renewed();
        AuthHandler::authenticate(self.transport.as_ref(), &mut fresh).await?;
        self.session = fresh;
        tracing::info!("Session restored for {}", self.session.credentials().username());
        Ok(())
    }

    /// Best-effort logout; the session is invalid afterwards either way
    pub async fn logout(&mut self) -> bool {
        AuthHandler::logout(self.transport.as_ref(), &mut self.session).await
    }

    pub fn is_valid(&self) -> bool {
        self.session.is_valid()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn base_url(&self) -> &Url {
        self.session.base_url()
    }

    /// One exchange on behalf of the session
    pub async fn issue(&mut self, request: OutgoingRequest) -> Result<RawResponse> {
        let request = self.session.decorate(request);
        let response = self.transport.execute(&request).await?;
        tracing::debug!(
            "{} {} -> {}",
            request.method(),
            request.url().path(),
            response.status
        );
        self.session.absorb(&response);
        Ok(response)
    }
}

#[cfg(test)]
mod tests;
