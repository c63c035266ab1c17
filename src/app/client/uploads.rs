//! Multipart uploads of solvers, benchmarks, processors, space XML and
//! solver configurations
//!
//! The service answers an accepted upload with a `New_ID` cookie, usually on
//! a redirect to the new primitive's page, so uploads never follow redirects.

use std::path::PathBuf;

use crate::app::client::http::{OutgoingRequest, Part, RawResponse};
use crate::app::client::operations::{new_id, new_ids, rejection};
use crate::app::client::StarexecClient;
use crate::app::models::{Permissions, PrimitiveKind};
use crate::constants::service;
use crate::errors::{ProtocolError, Result};

/// Where uploaded content comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSource {
    File(PathBuf),
    Url(String),
}

/// Where a solver's description comes from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DescriptionSource {
    Text(String),
    File(PathBuf),
    /// Read from the description file inside the archive
    #[default]
    Archive,
}

impl DescriptionSource {
    fn method(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::File(_) => "file",
            Self::Archive => "upload",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverUpload {
    pub space: u64,
    pub source: UploadSource,
    pub name: String,
    pub description: DescriptionSource,
    pub downloadable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkUpload {
    pub space: u64,
    pub source: UploadSource,
    /// Id of the benchmark processor that types the benchmarks
    pub bench_type: u64,
    /// Space whose benchmarks these depend on
    pub dependency: Option<u64>,
    pub downloadable: bool,
    /// Recreate the archive's directories as subspaces
    pub hierarchy: bool,
    pub linked: bool,
    pub permissions: Permissions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorUpload {
    /// `PostProcessor` or `BenchProcessor`
    pub kind: PrimitiveKind,
    pub community: u64,
    pub name: String,
    pub description: String,
    pub file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationUpload {
    pub solver: u64,
    pub name: String,
    pub description: String,
    pub file: PathBuf,
}

impl StarexecClient {
    pub async fn upload_solver(&mut self, upload: &SolverUpload) -> Result<u64> {
        let mut parts = match &upload.source {
            UploadSource::File(path) => vec![
                Part::file("f", path.clone()),
                Part::text("url", ""),
                Part::text("upMethod", "local"),
            ],
            UploadSource::Url(url) => {
                vec![Part::text("url", url.as_str()), Part::text("upMethod", "URL")]
            }
        };
        if let DescriptionSource::File(path) = &upload.description {
            parts.push(Part::file("d", path.clone()));
        }
        let description = match &upload.description {
            DescriptionSource::Text(text) => text.clone(),
            _ => String::new(),
        };
        parts.extend([
            Part::text("sn", upload.name.as_str()),
            Part::text("desc", description),
            Part::text("space", upload.space.to_string()),
            Part::text("descMethod", upload.description.method()),
            Part::text("dlable", upload.downloadable.to_string()),
            Part::text("runTestJob", "false"),
            Part::text("type", "1"),
        ]);

        let response = self.send_upload(service::UPLOAD_SOLVER, parts).await?;
        let id = new_id(&response)?;
        tracing::info!("Uploaded solver {} as {}", upload.name, id);
        Ok(id)
    }

    /// Returns the id of the upload status page the service tracks the
    /// benchmark extraction on
    pub async fn upload_benchmarks(&mut self, upload: &BenchmarkUpload) -> Result<u64> {
        let (method, url) = match &upload.source {
            UploadSource::File(_) => ("local", ""),
            UploadSource::Url(url) => ("URL", url.as_str()),
        };
        let mut parts = vec![
            Part::text("space", upload.space.to_string()),
            Part::text("localOrUrlOrGit", method),
            Part::text("url", url),
            Part::text("download", upload.downloadable.to_string()),
            Part::text("benchType", upload.bench_type.to_string()),
            Part::text("dependency", upload.dependency.is_some().to_string()),
            Part::text("linked", upload.linked.to_string()),
            Part::text(
                "depRoot",
                upload
                    .dependency
                    .map_or_else(|| "-1".to_string(), |id| id.to_string()),
            ),
            Part::text("upMethod", if upload.hierarchy { "convert" } else { "dump" }),
        ];
        parts.extend(
            upload
                .permissions
                .fields()
                .map(|(field, granted)| Part::text(field, granted.to_string())),
        );
        if let UploadSource::File(path) = &upload.source {
            parts.push(Part::file("benchFile", path.clone()));
        }

        let response = self.send_upload(service::UPLOAD_BENCHMARKS, parts).await?;
        if response.status != 302 {
            return Err(rejection(&response).into());
        }
        new_id(&response)
    }

    pub async fn upload_processor(&mut self, upload: &ProcessorUpload) -> Result<u64> {
        let class = upload
            .kind
            .processor_class()
            .ok_or_else(|| ProtocolError::UnexpectedPayload {
                reason: format!("{} are not processors", upload.kind),
            })?;
        let parts = vec![
            Part::text("action", "add"),
            Part::text("type", class),
            Part::text("name", upload.name.as_str()),
            Part::text("desc", upload.description.as_str()),
            Part::text("com", upload.community.to_string()),
            Part::text("uploadMethod", "local"),
            Part::file("file", upload.file.clone()),
        ];

        let response = self.send_upload(service::UPLOAD_PROCESSOR, parts).await?;
        if response.status != 302 {
            return Err(rejection(&response).into());
        }
        new_id(&response)
    }

    /// Upload a space XML archive; returns the ids of every created space
    pub async fn upload_space_xml(&mut self, space: u64, file: PathBuf) -> Result<Vec<u64>> {
        let parts = vec![Part::text("space", space.to_string()), Part::file("f", file)];
        let response = self.send_upload(service::UPLOAD_SPACE_XML, parts).await?;
        if !matches!(response.status, 200 | 302) {
            return Err(rejection(&response).into());
        }
        new_ids(&response)
    }

    pub async fn upload_configuration(&mut self, upload: &ConfigurationUpload) -> Result<u64> {
        let parts = vec![
            Part::text("solverId", upload.solver.to_string()),
            Part::text("uploadConfigDesc", upload.description.as_str()),
            Part::text("uploadConfigName", upload.name.as_str()),
            Part::file("file", upload.file.clone()),
        ];
        let response = self.send_upload(service::UPLOAD_CONFIGURATION, parts).await?;
        new_id(&response)
    }

    async fn send_upload(&mut self, path: &str, parts: Vec<Part>) -> Result<RawResponse> {
        let request = OutgoingRequest::post(self.session().endpoint(path)?)
            .with_multipart(parts)
            .without_redirects();
        self.issue(request).await
    }
}
