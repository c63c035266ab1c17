//! Archive downloads and watermark bookkeeping

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tempfile::TempDir;

    use crate::app::client::download::{DownloadOutcome, DownloadRequest};
    use crate::app::client::http::{OutgoingRequest, RawResponse};
    use crate::app::client::tests::logged_in_client;
    use crate::app::models::ArchiveKind;
    use crate::app::status::Status;
    use crate::app::watermark::ResultCategory;
    use crate::errors::{AppError, ProtocolError, ValidationError};

    fn query_value(request: &OutgoingRequest, key: &str) -> Option<String> {
        request
            .url()
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    fn archive_reply(max_completion: u64) -> RawResponse {
        RawResponse::new(200)
            .with_header("Content-Type", "application/zip")
            .with_header("Content-Disposition", "attachment; filename=Job7.zip")
            .with_header("Set-Cookie", format!("Max-Completion={max_completion}"))
            .with_body(b"PK\x03\x04archive".to_vec())
    }

    #[tokio::test]
    async fn test_incremental_download_writes_and_advances() {
        // Test that a fresh archive is written and the watermark moves to Max-Completion
        let (mut client, transport) = logged_in_client().await;
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("info.zip");
        transport.respond(archive_reply(15));

        let request = DownloadRequest::new(ArchiveKind::JobInfo, 7, &output).incremental();
        let outcome = client.download(&request).await.unwrap();

        assert_eq!(outcome, DownloadOutcome::FileReady { path: output.clone() });
        assert_eq!(std::fs::read(&output).unwrap(), b"PK\x03\x04archive");
        assert_eq!(client.session().watermarks().get(7, ResultCategory::Info), 15);

        let sent = transport.last_request().unwrap();
        assert_eq!(query_value(&sent, "type").as_deref(), Some("job"));
        assert_eq!(query_value(&sent, "id").as_deref(), Some("7"));
        assert_eq!(query_value(&sent, "since").as_deref(), Some("0"));
        assert!(!sent.follows_redirects());
    }

    #[tokio::test]
    async fn test_stored_watermark_is_sent_as_since() {
        let (mut client, transport) = logged_in_client().await;
        client
            .session_mut()
            .watermarks_mut()
            .advance(7, ResultCategory::Output, 40);
        let dir = TempDir::new().unwrap();
        transport.respond(archive_reply(52));

        let request =
            DownloadRequest::new(ArchiveKind::JobOutput, 7, dir.path().join("out.zip")).incremental();
        client.download(&request).await.unwrap();

        let sent = transport.last_request().unwrap();
        assert_eq!(query_value(&sent, "since").as_deref(), Some("40"));
        assert_eq!(client.session().watermarks().get(7, ResultCategory::Output), 52);
        // the other category is untouched
        assert_eq!(client.session().watermarks().get(7, ResultCategory::Info), 0);
    }

    #[tokio::test]
    async fn test_no_new_data_writes_nothing() {
        // Test that repeating a request at the same watermark never touches the disk
        let (mut client, transport) = logged_in_client().await;
        client
            .session_mut()
            .watermarks_mut()
            .advance(7, ResultCategory::Info, 40);
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("info.zip");
        let request = DownloadRequest::new(ArchiveKind::JobInfo, 7, &output).incremental();

        for _ in 0..2 {
            transport.respond(RawResponse::new(200).with_header("Set-Cookie", "Max-Completion=40"));
            let outcome = client.download(&request).await.unwrap();

            assert_eq!(outcome, DownloadOutcome::NoNewData);
            assert_eq!(outcome.status(), Status::NoNewResults);
            assert!(!output.exists());
            assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
            assert_eq!(client.session().watermarks().get(7, ResultCategory::Info), 40);

            let sent = transport.last_request().unwrap();
            assert!(sent.url().query_pairs().any(|(k, v)| k == "since" && v == "40"));
        }
    }

    #[tokio::test]
    async fn test_job_done_without_new_data() {
        let (mut client, transport) = logged_in_client().await;
        client
            .session_mut()
            .watermarks_mut()
            .advance(7, ResultCategory::Info, 90);
        let dir = TempDir::new().unwrap();
        transport.respond(
            RawResponse::new(200)
                .with_header("Set-Cookie", "Max-Completion=90")
                .with_header("Set-Cookie", "Job-Complete=true"),
        );

        let request =
            DownloadRequest::new(ArchiveKind::JobInfo, 7, dir.path().join("info.zip")).incremental();
        let outcome = client.download(&request).await.unwrap();
        assert_eq!(outcome, DownloadOutcome::JobDone { path: None });
        assert_eq!(outcome.status(), Status::JobDone);
    }

    #[tokio::test]
    async fn test_job_done_with_final_archive() {
        let (mut client, transport) = logged_in_client().await;
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.zip");
        transport.respond(archive_reply(100).with_header("Set-Cookie", "Job-Complete=true"));

        let request = DownloadRequest::new(ArchiveKind::JobOutput, 3, &output).incremental();
        let outcome = client.download(&request).await.unwrap();
        assert_eq!(outcome, DownloadOutcome::JobDone { path: Some(output.clone()) });
        assert!(outcome.wrote_file());
        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_redirect_is_followed_with_encoded_spaces() {
        // Test that a Location answer is fetched against the base address
        let (mut client, transport) = logged_in_client().await;
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("nested").join("space.zip");
        transport
            .respond(RawResponse::new(302).with_header("Location", "/starexec/secure/files/My Space.zip"))
            .respond(RawResponse::new(200).with_body("zipdata"));

        let request = DownloadRequest::new(ArchiveKind::Space { hierarchy: true }, 21, &output);
        let outcome = client.download(&request).await.unwrap();
        assert_eq!(outcome, DownloadOutcome::FileReady { path: output.clone() });
        assert_eq!(std::fs::read(&output).unwrap(), b"zipdata");

        let requests = transport.requests();
        let generate = &requests[requests.len() - 2];
        assert_eq!(query_value(generate, "hierarchy").as_deref(), Some("true"));
        assert_eq!(query_value(generate, "since"), None);
        assert_eq!(
            requests[requests.len() - 1].url().as_str(),
            "https://example.org/starexec/secure/files/My%20Space.zip"
        );
    }

    #[tokio::test]
    async fn test_missing_archive_is_reported() {
        let (mut client, transport) = logged_in_client().await;
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("solver.zip");
        transport.respond(
            RawResponse::new(200)
                .with_header("Content-Type", "application/json")
                .with_header("Set-Cookie", "STATUS_MESSAGE_STRING=\"no permission\""),
        );

        let request = DownloadRequest::new(ArchiveKind::Solver, 5, &output);
        let err = client.download(&request).await.unwrap_err();
        assert!(matches!(err, AppError::Protocol(ProtocolError::ArchiveNotFound)));
        assert_eq!(err.status(), Status::ArchiveNotFound);
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_missing_max_completion_is_server_error() {
        let (mut client, transport) = logged_in_client().await;
        let dir = TempDir::new().unwrap();
        transport.respond(
            RawResponse::new(200)
                .with_header("Content-Disposition", "attachment")
                .with_body("zip"),
        );

        let request =
            DownloadRequest::new(ArchiveKind::JobInfo, 7, dir.path().join("i.zip")).incremental();
        let err = client.download(&request).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Protocol(ProtocolError::MissingCookie { .. })
        ));
        assert_eq!(err.status(), Status::ServerError);
        assert_eq!(client.session().watermarks().get(7, ResultCategory::Info), 0);
    }

    #[tokio::test]
    async fn test_existing_output_refused_before_network() {
        let (mut client, transport) = logged_in_client().await;
        let sent_before = transport.requests().len();
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("exists.zip");
        std::fs::write(&output, b"keep").unwrap();

        let request = DownloadRequest::new(ArchiveKind::Benchmark, 2, &output);
        let err = client.download(&request).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::OutputExists { .. })
        ));
        assert_eq!(transport.requests().len(), sent_before);
        assert_eq!(std::fs::read(&output).unwrap(), b"keep");

        transport.respond(archive_reply(1));
        client.download(&request.overwrite(true)).await.unwrap();
        assert_ne!(std::fs::read(&output).unwrap(), b"keep");
    }

    #[tokio::test]
    async fn test_failed_write_leaves_watermark() {
        // Test that the watermark does not move when the archive cannot be stored
        let (mut client, transport) = logged_in_client().await;
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let output = Path::new(&blocker).join("info.zip");
        transport.respond(archive_reply(15));

        let request = DownloadRequest::new(ArchiveKind::JobInfo, 7, &output).incremental();
        let err = client.download(&request).await.unwrap_err();
        assert_eq!(err.category(), "storage");
        assert_eq!(client.session().watermarks().get(7, ResultCategory::Info), 0);
    }
}
