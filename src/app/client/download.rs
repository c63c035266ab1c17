//! Archive downloads with atomic writes and incremental watermarks
//!
//! The download endpoint first generates an archive, then either returns it
//! directly (with a `Content-Disposition` header) or redirects to it. For job
//! results the request can carry a `since` watermark; the response reports
//! the highest completion number it covers in the `Max-Completion` cookie.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::app::client::http::OutgoingRequest;
use crate::app::client::StarexecClient;
use crate::app::models::ArchiveKind;
use crate::app::scraper;
use crate::app::status::Status;
use crate::app::watermark::ResultCategory;
use crate::constants::{cookies, files, http, service};
use crate::errors::{ProtocolError, Result, StorageError, ValidationError};

/// One archive download, built per invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub kind: ArchiveKind,
    pub id: u64,
    pub output: PathBuf,
    pub overwrite: bool,
    /// Only results completed after this sequence number
    pub since: Option<u64>,
    /// Track and advance the stored watermark for this job
    pub incremental: bool,
}

impl DownloadRequest {
    pub fn new(kind: ArchiveKind, id: u64, output: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            id,
            output: output.into(),
            overwrite: false,
            since: None,
            incremental: false,
        }
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn since(mut self, since: Option<u64>) -> Self {
        self.since = since;
        self
    }

    pub fn incremental(mut self) -> Self {
        self.incremental = true;
        self
    }

    fn watermark_key(&self) -> Option<(u64, ResultCategory)> {
        if !self.incremental {
            return None;
        }
        self.kind.category().map(|category| (self.id, category))
    }
}

/// How a download ended when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Nothing completed since the watermark; no file written
    NoNewData,
    /// An archive was written
    FileReady { path: PathBuf },
    /// The job has finished; `path` is set if this call wrote a final archive
    JobDone { path: Option<PathBuf> },
}

impl DownloadOutcome {
    pub fn status(&self) -> Status {
        match self {
            DownloadOutcome::NoNewData => Status::NoNewResults,
            DownloadOutcome::FileReady { .. } => Status::Ok,
            DownloadOutcome::JobDone { .. } => Status::JobDone,
        }
    }

    pub fn wrote_file(&self) -> bool {
        matches!(
            self,
            DownloadOutcome::FileReady { .. } | DownloadOutcome::JobDone { path: Some(_) }
        )
    }
}

impl StarexecClient {
    /// Download an archive to `request.output`.
    ///
    /// The watermark for incremental requests moves only after the archive
    /// has been renamed into place.
    ///
    /// # Errors
    ///
    /// - `ValidationError::OutputExists` before any network traffic when the
    ///   output exists and overwrite was not requested
    /// - `ProtocolError::MissingCookie` when an incremental reply lacks
    ///   `Max-Completion`
    /// - `ProtocolError::ArchiveNotFound` when no archive was produced
    /// - storage errors when the archive cannot be written
    pub async fn download(&mut self, request: &DownloadRequest) -> Result<DownloadOutcome> {
        if request.output.exists() && !request.overwrite {
            return Err(ValidationError::OutputExists {
                path: request.output.clone(),
            }
            .into());
        }

        let key = request.watermark_key();
        let since = match (request.since, key) {
            (Some(since), _) => Some(since),
            (None, Some((job, category))) => Some(self.session().watermarks().get(job, category)),
            (None, None) => None,
        };

        let url = self.download_url(request, since)?;
        tracing::debug!("Requesting {} archive for id {}", request.kind.archive_type(), request.id);
        let response = self
            .issue(OutgoingRequest::get(url).without_redirects())
            .await?;

        let job_complete = scraper::has_cookie(&response.headers, cookies::JOB_COMPLETE);
        let max_completion = match since {
            Some(_) => Some(
                scraper::extract_cookie_number(&response.headers, cookies::MAX_COMPLETION)?
                    .ok_or_else(|| ProtocolError::MissingCookie {
                        name: cookies::MAX_COMPLETION.to_string(),
                    })?,
            ),
            None => None,
        };

        if let (Some(since), Some(max)) = (since, max_completion) {
            if max <= since {
                tracing::info!("No results for job {} newer than {}", request.id, since);
                return Ok(if job_complete {
                    DownloadOutcome::JobDone { path: None }
                } else {
                    DownloadOutcome::NoNewData
                });
            }
        }

        let archive = if response.header(http::HEADER_CONTENT_DISPOSITION).is_some() {
            if response.status != 200 {
                return Err(ProtocolError::UnexpectedStatus {
                    status: response.status,
                }
                .into());
            }
            response.body
        } else if let Some(location) = response.location() {
            let target = resolve_location(self.session().base_url(), location)?;
            let fetched = self.issue(OutgoingRequest::get(target)).await?;
            if !self.session().is_valid() {
                return Err(ProtocolError::ArchiveNotFound.into());
            }
            if fetched.status != 200 {
                return Err(ProtocolError::UnexpectedStatus {
                    status: fetched.status,
                }
                .into());
            }
            fetched.body
        } else {
            if let Some(message) = scraper::extract_cookie(&response.headers, cookies::STATUS_MESSAGE) {
                tracing::warn!("Service refused the download: {}", message);
            }
            return Err(ProtocolError::ArchiveNotFound.into());
        };

        write_atomically(&request.output, &archive).await?;

        if let (Some((job, category)), Some(max)) = (key, max_completion) {
            let stored = self.session_mut().watermarks_mut().advance(job, category, max);
            tracing::debug!("Watermark for job {} {} is now {}", job, category, stored);
        }

        let path = request.output.clone();
        Ok(if job_complete {
            DownloadOutcome::JobDone { path: Some(path) }
        } else {
            DownloadOutcome::FileReady { path }
        })
    }

    fn download_url(&self, request: &DownloadRequest, since: Option<u64>) -> Result<Url> {
        let mut url = self.session().endpoint(service::DOWNLOAD)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("type", request.kind.archive_type())
                .append_pair("id", &request.id.to_string());
            if let Some(since) = since {
                query.append_pair("since", &since.to_string());
            }
            for (key, value) in request.kind.extra_params() {
                query.append_pair(&key, &value);
            }
        }
        Ok(url)
    }
}

/// Resolve a redirect target against the service base address
pub fn resolve_location(base: &Url, location: &str) -> Result<Url> {
    let encoded = location.trim().replace(' ', "%20");
    base.join(&encoded).map_err(|_| {
        ProtocolError::MalformedValue {
            name: http::HEADER_LOCATION.to_string(),
            value: location.to_string(),
        }
        .into()
    })
}

/// Write bytes to `destination` through a temporary sibling file
pub async fn write_atomically(destination: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| StorageError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    let temp_path = temp_path_for(destination);
    if let Err(e) = write_file(&temp_path, bytes).await {
        if let Err(cleanup) = tokio::fs::remove_file(&temp_path).await {
            tracing::debug!("Could not remove {}: {}", temp_path.display(), cleanup);
        }
        return Err(e);
    }

    tokio::fs::rename(&temp_path, destination)
        .await
        .map_err(|_e| StorageError::AtomicOperationFailed {
            temp_path: temp_path.clone(),
            final_path: destination.to_path_buf(),
        })?;
    tracing::info!("Wrote {} ({} bytes)", destination.display(), bytes.len());
    Ok(())
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let write_error = |source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::create(path).await.map_err(write_error)?;
    file.write_all(bytes).await.map_err(write_error)?;
    file.flush().await.map_err(write_error)?;
    Ok(())
}

fn temp_path_for(destination: &Path) -> PathBuf {
    destination.with_extension(format!(
        "{}{}",
        destination
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or(""),
        files::TEMP_FILE_SUFFIX
    ))
}

/// Name of the `n`-th archive written while polling: `out.zip` becomes
/// `out-info1.zip`, `out-output1.zip` and so on
pub fn numbered_path(output: &Path, suffix: &str, n: u32) -> Option<PathBuf> {
    let name = output.file_name()?.to_str()?;
    let lower = name.to_lowercase();
    let ext = files::ARCHIVE_TYPES
        .iter()
        .filter(|ext| lower.ends_with(&format!(".{ext}")))
        .max_by_key(|ext| ext.len())?;
    let stem = &name[..name.len() - ext.len() - 1];
    let numbered = format!("{stem}{suffix}{n}.{}", &name[name.len() - ext.len()..]);
    Some(output.with_file_name(numbered))
}
