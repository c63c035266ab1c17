//! Session state: base address, credentials, token and watermarks
//!
//! Header injection is a pure step over request values; token rotation and
//! invalidation happen in [`Session::absorb`] after every exchange.

use url::Url;

use crate::app::client::http::{OutgoingRequest, RawResponse};
use crate::app::scraper;
use crate::app::watermark::WatermarkTable;
use crate::auth::Credentials;
use crate::constants::{auth, http};
use crate::errors::{TransportError, TransportResult};

/// Authenticated session with one StarExec instance
#[derive(Debug, Clone)]
pub struct Session {
    base_url: Url,
    credentials: Credentials,
    token: Option<String>,
    watermarks: WatermarkTable,
}

impl Session {
    /// A session that has not logged in yet
    pub fn new(base_url: Url, credentials: Credentials) -> Self {
        Self {
            base_url,
            credentials,
            token: None,
            watermarks: WatermarkTable::new(),
        }
    }

    /// A fresh, unauthenticated session for the same account that keeps the
    /// download watermarks
    pub fn renewed(&self) -> Self {
        Self {
            base_url: self.base_url.clone(),
            credentials: self.credentials.clone(),
            token: None,
            watermarks: self.watermarks.clone(),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_valid(&self) -> bool {
        self.token.is_some()
    }

    pub fn watermarks(&self) -> &WatermarkTable {
        &self.watermarks
    }

    pub fn watermarks_mut(&mut self) -> &mut WatermarkTable {
        &mut self.watermarks
    }

    /// Resolve a service path against the base address
    pub fn endpoint(&self, path: &str) -> TransportResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| TransportError::InvalidAddress {
                url: format!("{}{}", self.base_url, path),
                reason: e.to_string(),
            })
    }

    /// Attach the session cookie and the fixed headers
    pub fn decorate(&self, request: OutgoingRequest) -> OutgoingRequest {
        let request = match &self.token {
            Some(token) => request.with_header(
                http::HEADER_COOKIE,
                format!("{}={}", auth::SESSION_COOKIE, token),
            ),
            None => request,
        };
        request
            .with_header(http::CONNECTION.0, http::CONNECTION.1)
            .with_header(http::ACCEPT_LANGUAGE.0, http::ACCEPT_LANGUAGE.1)
    }

    /// Update the session from a response.
    ///
    /// A rotated token replaces the current one. A login form in place of the
    /// expected content means the service no longer recognises the session.
    pub fn absorb(&mut self, response: &RawResponse) {
        if let Some(token) = scraper::extract_cookie(&response.headers, auth::SESSION_COOKIE) {
            if !token.is_empty() && self.token.as_deref() != Some(token.as_str()) {
                tracing::debug!("Session token rotated to {}", token_preview(&token));
                self.token = Some(token);
            }
        }
        if self.token.is_some() && is_html(response) && scraper::is_login_form(&response.text()) {
            tracing::warn!("Service answered with its login form; session is no longer valid");
            self.token = None;
        }
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn invalidate(&mut self) {
        self.token = None;
    }
}

fn is_html(response: &RawResponse) -> bool {
    response
        .header("Content-Type")
        .map_or(true, |content_type| content_type.contains("html"))
}

/// Leading characters of a token, safe to log
pub fn token_preview(token: &str) -> &str {
    match token.char_indices().nth(auth::TOKEN_LOG_PREFIX) {
        Some((index, _)) => &token[..index],
        None => token,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::watermark::ResultCategory;

    fn session() -> Session {
        Session::new(
            Url::parse("https://example.org/starexec/").unwrap(),
            Credentials::new("alice", "secret"),
        )
    }

    #[test]
    fn test_decorate_adds_cookie_and_fixed_headers() {
        // Test that header injection attaches exactly the session cookie and fixed headers
        let mut session = session();
        session.set_token(Some("tok123".to_string()));
        let request = OutgoingRequest::get(session.endpoint("secure/index.jsp").unwrap());
        let decorated = session.decorate(request.clone());

        assert_eq!(decorated.header("Cookie"), Some("JSESSIONID=tok123"));
        assert_eq!(decorated.header("Connection"), Some("keep-alive"));
        assert_eq!(decorated.header("Accept-Language"), Some("en-US,en;q=0.5"));
        assert!(request.headers().is_empty());
    }

    #[test]
    fn test_decorate_without_token_has_no_cookie() {
        let session = session();
        let decorated =
            session.decorate(OutgoingRequest::get(session.endpoint("secure/index.jsp").unwrap()));
        assert_eq!(decorated.header("Cookie"), None);
    }

    #[test]
    fn test_absorb_rotates_token() {
        // Test that any response carrying a fresh token replaces the old one
        let mut session = session();
        session.set_token(Some("old".to_string()));
        let response = RawResponse::new(200)
            .with_header("Content-Type", "application/json")
            .with_header("Set-Cookie", "JSESSIONID=new; Path=/starexec");
        session.absorb(&response);
        assert_eq!(session.token(), Some("new"));
    }

    #[test]
    fn test_absorb_ignores_similar_cookie_names() {
        let mut session = session();
        session.set_token(Some("keep".to_string()));
        let response = RawResponse::new(200)
            .with_header("Content-Type", "application/json")
            .with_header("Set-Cookie", "OLDJSESSIONID=other");
        session.absorb(&response);
        assert_eq!(session.token(), Some("keep"));
    }

    #[test]
    fn test_absorb_login_form_invalidates() {
        let mut session = session();
        session.set_token(Some("tok".to_string()));
        let response = RawResponse::new(200)
            .with_header("Content-Type", "text/html;charset=UTF-8")
            .with_body("<form method=\"POST\" action=\"j_security_check\"></form>");
        session.absorb(&response);
        assert!(!session.is_valid());
    }

    #[test]
    fn test_renewed_keeps_watermarks() {
        let mut session = session();
        session.set_token(Some("tok".to_string()));
        session.watermarks_mut().advance(9, ResultCategory::Info, 40);

        let fresh = session.renewed();
        assert!(!fresh.is_valid());
        assert_eq!(fresh.watermarks().get(9, ResultCategory::Info), 40);
        assert_eq!(fresh.credentials().username(), "alice");
    }

    #[test]
    fn test_token_preview() {
        assert_eq!(token_preview("ABCDEFGHIJKL"), "ABCDEFGH");
        assert_eq!(token_preview("ABC"), "ABC");
    }
}
