//! Login, header injection, token rotation and session loss

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use url::Url;

    use crate::app::client::http::{Method, OutgoingRequest};
    use crate::app::client::mock::{self, ScriptedTransport};
    use crate::app::client::tests::{logged_in_client, scripted_client};
    use crate::app::client::StarexecClient;
    use crate::app::status::Status;
    use crate::app::watermark::ResultCategory;
    use crate::auth::Credentials;
    use crate::constants::service;
    use crate::errors::{AppError, SessionError, TransportError};

    #[tokio::test]
    async fn test_login_success_sequence() {
        // Test that login runs home, credential post, confirming home in order
        let (mut client, transport) = scripted_client();
        transport.script_login("tok-1");

        client.login().await.unwrap();

        assert!(client.is_valid());
        assert_eq!(client.session().token(), Some("tok-1"));

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].method(), Method::Get);
        assert!(requests[0].url().as_str().ends_with(service::HOME));
        assert_eq!(requests[0].header("Cookie"), None);

        assert_eq!(requests[1].method(), Method::Post);
        assert!(requests[1].url().as_str().ends_with(service::LOGIN));
        assert_eq!(requests[1].field("j_username"), Some("alice"));
        assert_eq!(requests[1].field("j_password"), Some("secret"));
        assert_eq!(requests[1].field("cookieexists"), Some("false"));
        assert_eq!(requests[1].header("Cookie"), Some("JSESSIONID=anonymous"));

        assert!(!requests[2].follows_redirects());
    }

    #[tokio::test]
    async fn test_login_bad_credentials_leaves_no_token() {
        let (mut client, transport) = scripted_client();
        transport
            .respond(mock::html().with_header("Set-Cookie", mock::session_cookie("anon")))
            .respond(mock::login_form())
            .respond(mock::login_form());

        let err = client.login().await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Session(SessionError::BadCredentials { .. })
        ));
        assert_eq!(err.status(), Status::BadCredentials);
        assert!(!client.is_valid());
    }

    #[tokio::test]
    async fn test_login_without_session_cookie_on_custom_address() {
        // Test that a non-default address that issues no session is a bad address
        let (mut client, transport) = scripted_client();
        transport.respond(mock::html());

        let err = client.login().await.unwrap_err();
        assert_eq!(err.status(), Status::BadAddress);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_login_without_session_cookie_on_default_address() {
        let transport = ScriptedTransport::new();
        transport.respond(mock::html());
        let mut client = StarexecClient::new(
            Arc::new(transport.clone()),
            Url::parse(service::DEFAULT_BASE_URL).unwrap(),
            Credentials::new("alice", "secret"),
        );

        let err = client.login().await.unwrap_err();
        assert!(matches!(err, AppError::Session(SessionError::NoSessionIssued)));
        assert_eq!(err.status(), Status::ServerError);
    }

    #[tokio::test]
    async fn test_login_unreachable_address() {
        let (mut client, transport) = scripted_client();
        transport.fail(TransportError::InvalidAddress {
            url: "https://example.org/starexec/".to_string(),
            reason: "dns failure".to_string(),
        });

        let err = client.login().await.unwrap_err();
        assert_eq!(err.status(), Status::BadAddress);
        assert!(!client.is_valid());
    }

    #[tokio::test]
    async fn test_guest_login_uses_public_account() {
        let transport = ScriptedTransport::new();
        transport.script_login("guest-tok");
        let mut client = StarexecClient::new(
            Arc::new(transport.clone()),
            Url::parse(crate::app::client::tests::BASE).unwrap(),
            Credentials::new("guest", ""),
        );

        client.login().await.unwrap();
        let requests = transport.requests();
        assert_eq!(requests[1].field("j_username"), Some("public"));
        assert_eq!(requests[1].field("j_password"), Some("public"));
    }

    #[tokio::test]
    async fn test_any_response_rotates_token() {
        // Test that the last token seen wins and is sent on the next request
        let (mut client, transport) = logged_in_client().await;
        transport
            .respond(mock::json("0").with_header("Set-Cookie", mock::session_cookie("tok-2")))
            .respond(mock::json("0"));

        let url = client.session().endpoint("services/anything").unwrap();
        client.issue(OutgoingRequest::get(url.clone())).await.unwrap();
        assert_eq!(client.session().token(), Some("tok-2"));

        client.issue(OutgoingRequest::get(url)).await.unwrap();
        let last = transport.last_request().unwrap();
        assert_eq!(last.header("Cookie"), Some("JSESSIONID=tok-2"));
        assert_eq!(last.header("Connection"), Some("keep-alive"));
        assert_eq!(last.header("Accept-Language"), Some("en-US,en;q=0.5"));
    }

    #[tokio::test]
    async fn test_login_form_reply_invalidates_and_relogin_keeps_watermarks() {
        let (mut client, transport) = logged_in_client().await;
        client
            .session_mut()
            .watermarks_mut()
            .advance(12, ResultCategory::Output, 30);
        transport.respond(mock::login_form());

        let url = client.session().endpoint("services/anything").unwrap();
        client.issue(OutgoingRequest::get(url)).await.unwrap();
        assert!(!client.is_valid());

        transport.script_login("tok-9");
        client.relogin().await.unwrap();
        assert_eq!(client.session().token(), Some("tok-9"));
        assert_eq!(
            client.session().watermarks().get(12, ResultCategory::Output),
            30
        );
    }

    #[tokio::test]
    async fn test_logout_is_best_effort() {
        let (mut client, transport) = logged_in_client().await;
        transport.respond(mock::json("true"));
        assert!(client.logout().await);
        assert!(!client.is_valid());
        assert!(transport
            .last_request()
            .unwrap()
            .url()
            .as_str()
            .ends_with(service::LOGOUT));

        let (mut client, transport) = logged_in_client().await;
        transport.fail(TransportError::ServerOverloaded);
        assert!(!client.logout().await);
        assert!(!client.is_valid());
    }
}
