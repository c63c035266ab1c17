//! Command handlers for the starcom shell
//!
//! Each handler takes a parsed [`CommandInvocation`], runs the pure parameter
//! check for its family, turns the parameters into a typed request and hands
//! it to the [`StarexecClient`]. Nothing touches the network until the check
//! has passed.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use tracing::{debug, info};

use crate::app::client::download::numbered_path;
use crate::app::client::{
    BenchmarkUpload, ConfigurationUpload, DescriptionSource, DownloadOutcome, DownloadRequest,
    JobSpec, ListingOwner, ProcessorUpload, SolverUpload, SubspaceSpec, TransferRequest,
    UploadSource, UserSetting,
};
use crate::app::models::{ArchiveKind, Permissions, PrimitiveKind, Traversal};
use crate::app::validator::{self, parse_id, parse_id_list, parse_seconds, parse_timeout, UploadKind};
use crate::app::{CommandInvocation, Outcome, StarexecClient, Status};
use crate::cli::progress::Spinner;
use crate::constants::{commands, files, params, shell};
use crate::errors::{AppError, Result, SessionError, ValidationError};

/// Where handlers print progress lines, and whether spinners may be drawn
pub struct Reporter<'a> {
    out: &'a mut dyn Write,
    progress: bool,
}

impl<'a> Reporter<'a> {
    pub fn new(out: &'a mut dyn Write, progress: bool) -> Self {
        Self { out, progress }
    }

    pub fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}") {
            debug!("Could not write to output: {}", e);
        }
    }

    fn spinner(&self, message: &str) -> Spinner {
        Spinner::start(self.progress, message)
    }
}

/// Route a command that needs a session to its handler
pub async fn dispatch(
    client: &mut StarexecClient,
    cmd: &CommandInvocation,
    reporter: &mut Reporter<'_>,
) -> Result<Outcome> {
    let name = cmd.name();
    debug!("Dispatching {}", name);

    if name == commands::POLL_JOB {
        return handle_poll(client, cmd, reporter).await;
    }
    if name == commands::PAUSE_JOB || name == commands::RESUME_JOB {
        return handle_job_control(client, cmd).await;
    }
    if let Some(suffix) = name.strip_prefix(commands::PREFIX_GET) {
        return handle_get(client, suffix, cmd, reporter).await;
    }
    if let Some(suffix) = name.strip_prefix(commands::PREFIX_SET) {
        return handle_set(client, suffix, cmd).await;
    }
    if let Some(suffix) = name.strip_prefix(commands::PREFIX_PUSH) {
        return handle_push(client, suffix, cmd, reporter).await;
    }
    if let Some(suffix) = name.strip_prefix(commands::PREFIX_DELETE) {
        return handle_delete(client, suffix, cmd).await;
    }
    if let Some(suffix) = name.strip_prefix(commands::PREFIX_CREATE) {
        return handle_create(client, suffix, cmd).await;
    }
    if let Some(suffix) = name.strip_prefix(commands::PREFIX_LIST) {
        return handle_list(client, suffix, cmd).await;
    }
    if let Some(suffix) = name.strip_prefix(commands::PREFIX_COPY) {
        return handle_transfer(client, suffix, cmd, true).await;
    }
    if let Some(suffix) = name.strip_prefix(commands::PREFIX_LINK) {
        return handle_transfer(client, suffix, cmd, false).await;
    }
    if let Some(suffix) = name.strip_prefix(commands::PREFIX_REMOVE) {
        return handle_remove(client, suffix, cmd).await;
    }
    Err(unknown(cmd))
}

fn unknown(cmd: &CommandInvocation) -> AppError {
    ValidationError::UnknownCommand {
        name: cmd.name().to_string(),
    }
    .into()
}

/// Generated name for a primitive created without `n=`
pub fn default_name(prefix: &str) -> String {
    format!("{prefix}{}", Local::now().format(shell::DEFAULT_NAME_FORMAT))
}

fn file_name_prefix(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| format!("{name} "))
        .unwrap_or_default()
}

fn optional_id(cmd: &CommandInvocation, key: &str) -> Result<Option<u64>> {
    Ok(cmd.get(key).map(parse_id).transpose()?)
}

fn required_id(cmd: &CommandInvocation, key: &str) -> Result<u64> {
    Ok(parse_id(cmd.require(key)?)?)
}

fn text_param(cmd: &CommandInvocation, key: &str) -> String {
    cmd.get(key).unwrap_or_default().to_string()
}

async fn handle_get(
    client: &mut StarexecClient,
    suffix: &str,
    cmd: &CommandInvocation,
    reporter: &mut Reporter<'_>,
) -> Result<Outcome> {
    let (kind, incremental) = match suffix {
        "jobout" => (ArchiveKind::JobOutput, false),
        "jobinfo" => (ArchiveKind::JobInfo, false),
        "spacexml" => (ArchiveKind::SpaceXml, false),
        "space" => (ArchiveKind::Space { hierarchy: false }, false),
        "spacehierarchy" => (ArchiveKind::Space { hierarchy: true }, false),
        "postproc" => (ArchiveKind::Processor(PrimitiveKind::PostProcessor), false),
        "benchproc" => (ArchiveKind::Processor(PrimitiveKind::BenchProcessor), false),
        "bench" => (ArchiveKind::Benchmark, false),
        "solver" => (ArchiveKind::Solver, false),
        "jobpair" => (ArchiveKind::JobPair, false),
        "newjobinfo" => (ArchiveKind::JobInfo, true),
        "newjobout" => (ArchiveKind::JobOutput, true),
        _ => return Err(unknown(cmd)),
    };
    let ignored = validator::validate_download(cmd, incremental)?;

    let id = required_id(cmd, params::ID)?;
    let mut request = DownloadRequest::new(kind, id, cmd.require(params::OUTPUT_FILE)?)
        .overwrite(cmd.has(params::OVERWRITE));
    if incremental {
        request = request.since(optional_id(cmd, params::SINCE)?).incremental();
    }

    let spinner = reporter.spinner("Processing your download request");
    let result = client.download(&request).await;
    spinner.finish();
    let result = result?;

    if result.wrote_file() {
        reporter.line("Download complete");
    }
    Ok(Outcome::new(result.status()).with_ignored(ignored))
}

/// Download job info and output incrementally until the job is complete
async fn handle_poll(
    client: &mut StarexecClient,
    cmd: &CommandInvocation,
    reporter: &mut Reporter<'_>,
) -> Result<Outcome> {
    let ignored = validator::validate_poll(cmd)?;
    let id = required_id(cmd, params::ID)?;
    let output = PathBuf::from(cmd.require(params::OUTPUT_FILE)?);
    let seconds = cmd.require(params::INTERVAL)?;
    let interval = Duration::try_from_secs_f64(parse_seconds(seconds)?).map_err(|_| {
        ValidationError::InvalidTime {
            value: seconds.to_string(),
        }
    })?;
    let overwrite = cmd.has(params::OVERWRITE);

    let categories = [
        (ArchiveKind::JobInfo, files::INFO_SUFFIX),
        (ArchiveKind::JobOutput, files::OUTPUT_SUFFIX),
    ];
    let mut counters = [1u32; 2];
    let mut done = [false; 2];

    loop {
        for (index, (kind, suffix)) in categories.iter().enumerate() {
            if done[index] {
                continue;
            }
            let path = numbered_path(&output, suffix, counters[index]).ok_or_else(|| {
                ValidationError::BadArchiveType {
                    path: output.display().to_string(),
                }
            })?;
            let request = DownloadRequest::new(*kind, id, &path)
                .overwrite(overwrite)
                .incremental();
            let result = client.download(&request).await?;

            if result.wrote_file() {
                counters[index] += 1;
                reporter.line(&format!("Wrote {}", path.display()));
            }
            if matches!(result, DownloadOutcome::JobDone { .. }) {
                done[index] = true;
            }
        }

        if done.iter().all(|finished| *finished) {
            info!("Job {} complete", id);
            return Ok(Outcome::new(Status::JobDone).with_ignored(ignored));
        }

        if !client.is_valid() {
            client
                .relogin()
                .await
                .map_err(|_| AppError::from(SessionError::ConnectionLost))?;
        }
        debug!("Polling job {} again in {:?}", id, interval);
        tokio::time::sleep(interval).await;
    }
}

async fn handle_job_control(client: &mut StarexecClient, cmd: &CommandInvocation) -> Result<Outcome> {
    let ignored = validator::validate_job_control(cmd)?;
    let job = required_id(cmd, params::ID)?;
    client
        .pause_or_resume(job, cmd.name() == commands::PAUSE_JOB)
        .await?;
    Ok(Outcome::ok().with_ignored(ignored))
}

async fn handle_set(
    client: &mut StarexecClient,
    suffix: &str,
    cmd: &CommandInvocation,
) -> Result<Outcome> {
    let ignored = match suffix {
        "spacepublic" | "spaceprivate" => {
            let ignored = validator::validate_visibility(cmd)?;
            let space = required_id(cmd, params::ID)?;
            client
                .set_space_visibility(space, cmd.has(params::HIERARCHY), suffix == "spacepublic")
                .await?;
            ignored
        }
        _ => {
            let setting = UserSetting::from_command_suffix(suffix).ok_or_else(|| unknown(cmd))?;
            let ignored = validator::validate_user_setting(suffix, cmd)?;
            client
                .set_user_setting(setting, cmd.require(params::VALUE)?)
                .await?;
            ignored
        }
    };
    Ok(Outcome::ok().with_ignored(ignored))
}

fn upload_source(cmd: &CommandInvocation) -> Result<UploadSource> {
    match cmd.get(params::URL) {
        Some(url) => Ok(UploadSource::Url(url.to_string())),
        None => Ok(UploadSource::File(PathBuf::from(cmd.require(params::FILE)?))),
    }
}

fn upload_name(cmd: &CommandInvocation, source: &UploadSource) -> String {
    match (cmd.get(params::NAME), source) {
        (Some(name), _) => name.to_string(),
        (None, UploadSource::File(path)) => default_name(&file_name_prefix(path)),
        (None, UploadSource::Url(_)) => default_name(""),
    }
}

async fn handle_push(
    client: &mut StarexecClient,
    suffix: &str,
    cmd: &CommandInvocation,
    reporter: &mut Reporter<'_>,
) -> Result<Outcome> {
    let kind = match suffix {
        "solver" => UploadKind::Solver,
        "benchmarks" => UploadKind::Benchmarks,
        "postproc" | "benchproc" => UploadKind::Processor,
        "spacexml" => UploadKind::SpaceXml,
        "config" => UploadKind::Configuration,
        _ => return Err(unknown(cmd)),
    };
    let ignored = validator::validate_upload(kind, cmd)?;
    let target = required_id(cmd, params::ID)?;

    let spinner = reporter.spinner("Uploading, please wait");
    let created = match kind {
        UploadKind::Solver => {
            let source = upload_source(cmd)?;
            let description = match (cmd.get(params::DESCRIPTION), cmd.get(params::DESCRIPTION_FILE)) {
                (Some(text), _) => DescriptionSource::Text(text.to_string()),
                (None, Some(file)) => DescriptionSource::File(PathBuf::from(file)),
                (None, None) => DescriptionSource::Archive,
            };
            let upload = SolverUpload {
                space: target,
                name: upload_name(cmd, &source),
                source,
                description,
                downloadable: cmd.has(params::DOWNLOADABLE),
            };
            vec![client.upload_solver(&upload).await?]
        }
        UploadKind::Benchmarks => {
            let upload = BenchmarkUpload {
                space: target,
                source: upload_source(cmd)?,
                bench_type: required_id(cmd, params::BENCH_TYPE)?,
                dependency: optional_id(cmd, params::DEPENDENCY)?,
                downloadable: cmd.has(params::DOWNLOADABLE),
                hierarchy: cmd.has(params::HIERARCHY),
                linked: cmd.has(params::LINKED),
                permissions: Permissions::from_flags(cmd.keys()),
            };
            vec![client.upload_benchmarks(&upload).await?]
        }
        UploadKind::Processor => {
            let file = PathBuf::from(cmd.require(params::FILE)?);
            let upload = ProcessorUpload {
                kind: if suffix == "postproc" {
                    PrimitiveKind::PostProcessor
                } else {
                    PrimitiveKind::BenchProcessor
                },
                community: target,
                name: cmd
                    .get(params::NAME)
                    .map_or_else(|| default_name(&file_name_prefix(&file)), str::to_string),
                description: text_param(cmd, params::DESCRIPTION),
                file,
            };
            vec![client.upload_processor(&upload).await?]
        }
        UploadKind::SpaceXml => {
            let file = PathBuf::from(cmd.require(params::FILE)?);
            client.upload_space_xml(target, file).await?
        }
        UploadKind::Configuration => {
            let file = PathBuf::from(cmd.require(params::FILE)?);
            let upload = ConfigurationUpload {
                solver: target,
                name: cmd
                    .get(params::NAME)
                    .map_or_else(|| default_name(&file_name_prefix(&file)), str::to_string),
                description: text_param(cmd, params::DESCRIPTION),
                file,
            };
            vec![client.upload_configuration(&upload).await?]
        }
    };
    spinner.finish();

    info!("{} created {:?}", cmd.name(), created);
    Ok(Outcome::ok().with_ignored(ignored).with_created(created))
}

async fn handle_delete(
    client: &mut StarexecClient,
    suffix: &str,
    cmd: &CommandInvocation,
) -> Result<Outcome> {
    let kind = match suffix {
        "solver" => PrimitiveKind::Solver,
        "bench" => PrimitiveKind::Benchmark,
        "postproc" => PrimitiveKind::PostProcessor,
        "benchproc" => PrimitiveKind::BenchProcessor,
        "config" => PrimitiveKind::Configuration,
        "job" => PrimitiveKind::Job,
        _ => return Err(unknown(cmd)),
    };
    let ignored = validator::validate_delete(cmd)?;
    let ids = parse_id_list(cmd.require(params::ID)?)?;
    client.delete(kind, &ids).await?;
    Ok(Outcome::ok().with_ignored(ignored))
}

async fn handle_create(
    client: &mut StarexecClient,
    suffix: &str,
    cmd: &CommandInvocation,
) -> Result<Outcome> {
    match suffix {
        "job" => {
            let ignored = validator::validate_create_job(cmd)?;
            let spec = JobSpec {
                space: required_id(cmd, params::ID)?,
                queue: required_id(cmd, params::QUEUE_ID)?,
                name: cmd
                    .get(params::NAME)
                    .map_or_else(|| default_name(""), str::to_string),
                description: text_param(cmd, params::DESCRIPTION),
                post_processor: optional_id(cmd, params::PROCESSOR_ID)?,
                wallclock_timeout: cmd.get(params::WALLCLOCK).map(parse_timeout).transpose()?,
                cpu_timeout: cmd.get(params::CPU_TIMEOUT).map(parse_timeout).transpose()?,
                traversal: cmd
                    .get(params::TRAVERSAL)
                    .and_then(Traversal::from_param)
                    .unwrap_or_default(),
            };
            let job = client.create_job(&spec).await?;
            Ok(Outcome::ok().with_ignored(ignored).with_created(vec![job]))
        }
        "subspace" => {
            let ignored = validator::validate_create_subspace(cmd)?;
            let spec = SubspaceSpec {
                parent: required_id(cmd, params::ID)?,
                name: cmd
                    .get(params::NAME)
                    .map_or_else(|| default_name(""), str::to_string),
                description: text_param(cmd, params::DESCRIPTION),
                locked: cmd.has(params::LOCKED),
                permissions: Permissions::from_flags(cmd.keys()),
            };
            let space = client.create_subspace(&spec).await?;
            Ok(Outcome::ok().with_ignored(ignored).with_created(vec![space]))
        }
        _ => Err(unknown(cmd)),
    }
}

/// Kinds shown by a bare `ls`, in print order
const LIST_ALL_KINDS: [PrimitiveKind; 5] = [
    PrimitiveKind::Solver,
    PrimitiveKind::Benchmark,
    PrimitiveKind::Job,
    PrimitiveKind::User,
    PrimitiveKind::Space,
];

async fn handle_list(
    client: &mut StarexecClient,
    suffix: &str,
    cmd: &CommandInvocation,
) -> Result<Outcome> {
    let kind = match suffix {
        "solvers" => Some(PrimitiveKind::Solver),
        "benchmarks" => Some(PrimitiveKind::Benchmark),
        "jobs" => Some(PrimitiveKind::Job),
        "users" => Some(PrimitiveKind::User),
        "subspaces" => Some(PrimitiveKind::Space),
        "" => None,
        _ => return Err(unknown(cmd)),
    };
    // a bare `ls` covers spaces, which have no per-user listing
    let ignored = validator::validate_list(kind.unwrap_or(PrimitiveKind::Space), cmd)?;

    let owner = match optional_id(cmd, params::ID)? {
        Some(space) if !cmd.has(params::USER) => ListingOwner::Space(space),
        _ => ListingOwner::CurrentUser,
    };
    let limit = optional_id(cmd, params::LIMIT)?;

    let mut report = Vec::new();
    match kind {
        Some(kind) => {
            let primitives = client.list_primitives(kind, owner, limit).await?;
            report.extend(primitives.iter().map(ToString::to_string));
        }
        None => {
            for kind in LIST_ALL_KINDS {
                let primitives = client.list_primitives(kind, owner, limit).await?;
                report.push(kind.to_string().to_uppercase());
                report.extend(primitives.iter().map(ToString::to_string));
                report.push(String::new());
            }
        }
    }
    Ok(Outcome::ok().with_ignored(ignored).with_report(report))
}

async fn handle_transfer(
    client: &mut StarexecClient,
    suffix: &str,
    cmd: &CommandInvocation,
    copy: bool,
) -> Result<Outcome> {
    let kind = match (suffix, copy) {
        ("solver", _) => PrimitiveKind::Solver,
        ("bench", _) => PrimitiveKind::Benchmark,
        ("space", true) => PrimitiveKind::Space,
        ("job", false) => PrimitiveKind::Job,
        ("user", false) => PrimitiveKind::User,
        _ => return Err(unknown(cmd)),
    };
    let ignored = validator::validate_copy(kind, cmd)?;
    let transfer = TransferRequest {
        kind,
        ids: parse_id_list(cmd.require(params::ID)?)?,
        from: optional_id(cmd, params::FROM)?,
        to: required_id(cmd, params::TO)?,
        copy,
        hierarchy: cmd.has(params::HIERARCHY),
    };
    let created = client.transfer(&transfer).await?;
    Ok(Outcome::ok().with_ignored(ignored).with_created(created))
}

async fn handle_remove(
    client: &mut StarexecClient,
    suffix: &str,
    cmd: &CommandInvocation,
) -> Result<Outcome> {
    let kind = match suffix {
        "solver" => PrimitiveKind::Solver,
        "bench" => PrimitiveKind::Benchmark,
        "user" => PrimitiveKind::User,
        "job" => PrimitiveKind::Job,
        "subspace" => PrimitiveKind::Space,
        _ => return Err(unknown(cmd)),
    };
    let ignored = validator::validate_remove(kind, cmd)?;
    let ids = parse_id_list(cmd.require(params::ID)?)?;
    let space = match kind {
        PrimitiveKind::Space => None,
        _ => Some(required_id(cmd, params::FROM)?),
    };
    client
        .remove(kind, &ids, space, cmd.has(params::DELETE_PRIMS))
        .await?;
    Ok(Outcome::ok().with_ignored(ignored))
}
