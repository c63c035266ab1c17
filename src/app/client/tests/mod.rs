//! Scenario tests for the StarExec client
//!
//! Every scenario runs against a [`ScriptedTransport`](crate::app::client::mock::ScriptedTransport)
//! replaying the exchanges a StarExec instance would produce.

pub mod downloads;
pub mod session_flow;

use std::sync::Arc;

use url::Url;

use crate::app::client::mock::ScriptedTransport;
use crate::app::client::StarexecClient;
use crate::auth::Credentials;

pub(crate) const BASE: &str = "https://example.org/starexec/";

/// A client over a fresh scripted transport, not yet logged in
pub(crate) fn scripted_client() -> (StarexecClient, ScriptedTransport) {
    let transport = ScriptedTransport::new();
    let client = StarexecClient::new(
        Arc::new(transport.clone()),
        Url::parse(BASE).unwrap(),
        Credentials::new("alice", "secret"),
    );
    (client, transport)
}

/// A client that has already logged in with token `tok-1`
pub(crate) async fn logged_in_client() -> (StarexecClient, ScriptedTransport) {
    let (mut client, transport) = scripted_client();
    transport.script_login("tok-1");
    client.login().await.unwrap();
    (client, transport)
}
