//! StarExec login flow
//!
//! The service uses container-managed form authentication: an anonymous
//! visit to the home page issues a session cookie, posting the credentials to
//! `j_security_check` binds it to the account, and a second visit to the home
//! page confirms the session.

use crate::app::client::http::{OutgoingRequest, RawResponse, Transport};
use crate::app::client::session::{token_preview, Session};
use crate::app::scraper;
use crate::constants::{auth, service};
use crate::errors::{Result, SessionError, TransportError};

/// Handles StarExec authentication operations
pub struct AuthHandler;

impl AuthHandler {
    /// Log the session in.
    ///
    /// On any failure the session token is left unset.
    ///
    /// # Errors
    ///
    /// - `SessionError::BadAddress` if the base address is unusable or does
    ///   not issue a session (for a non-default address)
    /// - `SessionError::NoSessionIssued` if the default service issues none
    /// - `SessionError::BadCredentials` if the service rejects the login
    /// - transport errors otherwise
    pub async fn authenticate(transport: &dyn Transport, session: &mut Session) -> Result<()> {
        session.invalidate();
        let result = Self::run_login(transport, session).await;
        if result.is_err() {
            session.invalidate();
        }
        result
    }

    async fn run_login(transport: &dyn Transport, session: &mut Session) -> Result<()> {
        let username = session.credentials().username().to_string();
        tracing::info!("Logging in to {} as {}", session.base_url(), username);

        // Step 1: anonymous visit to obtain a session cookie
        let home = session
            .endpoint(service::HOME)
            .map_err(|_| Self::bad_address(session))?;
        let response = match transport
            .execute(&session.decorate(OutgoingRequest::get(home.clone())))
            .await
        {
            Ok(response) => response,
            Err(TransportError::InvalidAddress { url, reason }) => {
                tracing::warn!("Unusable service address {}: {}", url, reason);
                return Err(Self::bad_address(session).into());
            }
            Err(e) => return Err(e.into()),
        };

        let Some(token) = Self::session_cookie(&response) else {
            if session.base_url().as_str() != service::DEFAULT_BASE_URL {
                tracing::warn!("{} did not issue a session cookie", session.base_url());
                return Err(Self::bad_address(session).into());
            }
            return Err(SessionError::NoSessionIssued.into());
        };
        tracing::debug!("Anonymous session {}", token_preview(&token));
        session.set_token(Some(token));

        // Step 2: submit the credentials
        let login = OutgoingRequest::post(session.endpoint(service::LOGIN)?).with_form([
            (auth::FORM_USERNAME, username.as_str()),
            (auth::FORM_PASSWORD, session.credentials().password()),
            (auth::FORM_COOKIE_EXISTS, "false"),
        ]);
        let response = transport.execute(&session.decorate(login)).await?;
        if let Some(token) = Self::session_cookie(&response) {
            session.set_token(Some(token));
        }

        // Step 3: the home page must now hand back an authenticated session
        let confirm = OutgoingRequest::get(home).without_redirects();
        let response = transport.execute(&session.decorate(confirm)).await?;
        match Self::session_cookie(&response) {
            Some(token) => {
                tracing::info!("Logged in as {} (session {})", username, token_preview(&token));
                session.set_token(Some(token));
                Ok(())
            }
            None => {
                tracing::warn!("Login rejected for {}", username);
                Err(SessionError::BadCredentials { username }.into())
            }
        }
    }

    fn session_cookie(response: &RawResponse) -> Option<String> {
        scraper::extract_cookie(&response.headers, auth::SESSION_COOKIE)
            .filter(|token| !token.is_empty())
    }

    fn bad_address(session: &Session) -> SessionError {
        SessionError::BadAddress {
            url: session.base_url().to_string(),
        }
    }

    /// Best-effort logout; never fails
    pub async fn logout(transport: &dyn Transport, session: &mut Session) -> bool {
        let request = match session.endpoint(service::LOGOUT) {
            Ok(url) => OutgoingRequest::post(url),
            Err(_) => return false,
        };
        let result = transport.execute(&session.decorate(request)).await;
        session.invalidate();
        match result {
            Ok(_) => {
                tracing::info!("Logged out");
                true
            }
            Err(e) => {
                tracing::warn!("Logout request failed: {}", e);
                false
            }
        }
    }
}
