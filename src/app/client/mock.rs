//! Scripted transport for exercising the client without a network
//!
//! Responses are returned in the order they were queued and every request is
//! recorded for inspection.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::app::client::http::{OutgoingRequest, RawResponse, Transport};
use crate::constants::auth;
use crate::errors::{TransportError, TransportResult};

#[derive(Debug)]
enum Step {
    Respond(RawResponse),
    Fail(TransportError),
}

/// Transport that replays queued responses
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    steps: Arc<Mutex<VecDeque<Step>>>,
    requests: Arc<Mutex<Vec<OutgoingRequest>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, response: RawResponse) -> &Self {
        lock(&self.steps).push_back(Step::Respond(response));
        self
    }

    pub fn fail(&self, error: TransportError) -> &Self {
        lock(&self.steps).push_back(Step::Fail(error));
        self
    }

    /// Queue the three exchanges of a successful login ending on `token`
    pub fn script_login(&self, token: &str) -> &Self {
        self.respond(html().with_header("Set-Cookie", session_cookie("anonymous")))
            .respond(RawResponse::new(302).with_header("Location", "secure/index.jsp"))
            .respond(html().with_header("Set-Cookie", session_cookie(token)))
    }

    /// Requests seen so far, oldest first
    pub fn requests(&self) -> Vec<OutgoingRequest> {
        lock(&self.requests).clone()
    }

    pub fn last_request(&self) -> Option<OutgoingRequest> {
        lock(&self.requests).last().cloned()
    }

    /// Number of queued steps not yet consumed
    pub fn remaining(&self) -> usize {
        lock(&self.steps).len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: &OutgoingRequest) -> TransportResult<RawResponse> {
        lock(&self.requests).push(request.clone());
        match lock(&self.steps).pop_front() {
            Some(Step::Respond(response)) => Ok(response),
            Some(Step::Fail(error)) => Err(error),
            None => Ok(RawResponse::new(500).with_body("no scripted response")),
        }
    }
}

/// `Set-Cookie` value carrying a session token
pub fn session_cookie(token: &str) -> String {
    format!("{}={}; Path=/starexec; HttpOnly", auth::SESSION_COOKIE, token)
}

/// An empty HTML page
pub fn html() -> RawResponse {
    RawResponse::new(200).with_header("Content-Type", "text/html;charset=UTF-8")
}

/// A JSON reply
pub fn json(body: &str) -> RawResponse {
    RawResponse::new(200)
        .with_header("Content-Type", "application/json")
        .with_body(body)
}

/// The login form the service shows once a session has expired
pub fn login_form() -> RawResponse {
    html().with_body(format!(
        "<form method=\"POST\" action=\"{}\"><input name=\"j_username\"/></form>",
        auth::LOGIN_FORM_MARKER
    ))
}
