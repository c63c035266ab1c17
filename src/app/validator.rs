//! Client-side parameter validation
//!
//! Each command family has a pure check that runs before any network call.
//! A check either fails with the first problem found, or succeeds with the
//! list of supplied parameters the command does not use.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::app::models::{PrimitiveKind, Traversal, PERMISSION_FIELDS};
use crate::app::parser::{split_list, CommandInvocation};
use crate::constants::{files, limits, params};
use crate::errors::{ValidationError, ValidationResult};

/// Names of solvers, benchmarks, spaces and jobs, and user first/last names
static PRIMITIVE_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\w\-\. \+\^=,!?:$%#@]{1,128}$").unwrap_or_else(|_| unreachable!())
});

static INSTITUTION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w\-\s']{2,64}$").unwrap_or_else(|_| unreachable!()));

const LOGIN_PARAMS: &[&str] = &[params::USER, params::PASSWORD, params::ADDRESS];
const DOWNLOAD_PARAMS: &[&str] = &[params::ID, params::OUTPUT_FILE, params::OVERWRITE];
const NEW_DOWNLOAD_PARAMS: &[&str] = &[
    params::ID,
    params::OUTPUT_FILE,
    params::OVERWRITE,
    params::SINCE,
];
const POLL_PARAMS: &[&str] = &[
    params::ID,
    params::OUTPUT_FILE,
    params::INTERVAL,
    params::OVERWRITE,
];
const SLEEP_PARAMS: &[&str] = &[params::INTERVAL];
const RUN_FILE_PARAMS: &[&str] = &[params::FILE, params::VERBOSE];
const ID_ONLY_PARAMS: &[&str] = &[params::ID];
const SETTING_PARAMS: &[&str] = &[params::VALUE];
const VISIBILITY_PARAMS: &[&str] = &[params::ID, params::HIERARCHY];
const LIST_PARAMS: &[&str] = &[params::ID, params::LIMIT, params::USER];
const REMOVE_PARAMS: &[&str] = &[params::ID, params::FROM];
const REMOVE_SUBSPACE_PARAMS: &[&str] = &[params::ID, params::DELETE_PRIMS];
const COPY_USER_PARAMS: &[&str] = &[params::TO, params::ID, params::HIERARCHY];
const COPY_SPACE_PARAMS: &[&str] = &[params::TO, params::ID, params::FROM, params::HIERARCHY];
const COPY_SOLVER_PARAMS: &[&str] = &[params::ID, params::FROM, params::TO, params::HIERARCHY];
const COPY_PARAMS: &[&str] = &[params::ID, params::FROM, params::TO];
const CREATE_JOB_PARAMS: &[&str] = &[
    params::ID,
    params::NAME,
    params::DESCRIPTION,
    params::WALLCLOCK,
    params::CPU_TIMEOUT,
    params::QUEUE_ID,
    params::PROCESSOR_ID,
    params::TRAVERSAL,
];
const CREATE_SUBSPACE_PARAMS: &[&str] = &[
    params::ID,
    params::NAME,
    params::DESCRIPTION,
    params::LOCKED,
    params::ALL_PERMISSIONS,
];
const UPLOAD_SOLVER_PARAMS: &[&str] = &[
    params::ID,
    params::FILE,
    params::URL,
    params::NAME,
    params::DESCRIPTION,
    params::DESCRIPTION_FILE,
    params::DOWNLOADABLE,
];
const UPLOAD_BENCHMARKS_PARAMS: &[&str] = &[
    params::ID,
    params::BENCH_TYPE,
    params::FILE,
    params::URL,
    params::DESCRIPTION,
    params::DESCRIPTION_FILE,
    params::DEPENDENCY,
    params::DOWNLOADABLE,
    params::HIERARCHY,
    params::LINKED,
    params::ALL_PERMISSIONS,
];
const UPLOAD_PROCESSOR_PARAMS: &[&str] = &[params::ID, params::NAME, params::DESCRIPTION, params::FILE];
const UPLOAD_CONFIG_PARAMS: &[&str] = &[params::ID, params::FILE, params::NAME, params::DESCRIPTION];
const UPLOAD_SPACE_XML_PARAMS: &[&str] = &[params::ID, params::FILE];

/// What an upload command accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Solver,
    Benchmarks,
    Processor,
    SpaceXml,
    Configuration,
}

impl UploadKind {
    fn allows_url(self) -> bool {
        matches!(self, Self::Solver | Self::Benchmarks)
    }

    fn requires_archive(self) -> bool {
        !matches!(self, Self::Configuration)
    }

    fn allowed_params(self) -> &'static [&'static str] {
        match self {
            Self::Solver => UPLOAD_SOLVER_PARAMS,
            Self::Benchmarks => UPLOAD_BENCHMARKS_PARAMS,
            Self::Processor => UPLOAD_PROCESSOR_PARAMS,
            Self::SpaceXml => UPLOAD_SPACE_XML_PARAMS,
            Self::Configuration => UPLOAD_CONFIG_PARAMS,
        }
    }

    fn accepts_permissions(self) -> bool {
        matches!(self, Self::Benchmarks)
    }
}

/// Parse an id: a non-negative integer
pub fn parse_id(value: &str) -> ValidationResult<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| ValidationError::InvalidId {
            value: value.to_string(),
        })
}

/// Parse a comma-separated list of ids; every element must be valid
pub fn parse_id_list(value: &str) -> ValidationResult<Vec<u64>> {
    let ids = split_list(value)
        .iter()
        .map(|id| parse_id(id))
        .collect::<ValidationResult<Vec<u64>>>()?;
    if ids.is_empty() {
        return Err(ValidationError::InvalidId {
            value: value.to_string(),
        });
    }
    Ok(ids)
}

/// Parse a timeout in whole seconds
pub fn parse_timeout(value: &str) -> ValidationResult<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| ValidationError::InvalidTimeout {
            value: value.to_string(),
        })
}

/// Parse a time interval in seconds; fractions are allowed
pub fn parse_seconds(value: &str) -> ValidationResult<f64> {
    match value.trim().parse::<f64>() {
        Ok(seconds) if seconds.is_finite() && seconds >= 0.0 => Ok(seconds),
        _ => Err(ValidationError::InvalidTime {
            value: value.to_string(),
        }),
    }
}

pub fn is_valid_name(name: &str) -> bool {
    PRIMITIVE_NAME_REGEX.is_match(name)
}

pub fn is_valid_description(description: &str) -> bool {
    description.chars().count() <= limits::MAX_DESCRIPTION_LEN
}

pub fn is_valid_institution(institution: &str) -> bool {
    INSTITUTION_REGEX.is_match(institution)
}

/// Whether a file name ends in an archive extension the service unpacks
pub fn has_archive_extension(path: &str) -> bool {
    let lower = path.to_lowercase();
    files::ARCHIVE_TYPES
        .iter()
        .any(|ext| lower.ends_with(&format!(".{ext}")))
}

/// Supplied keys that are not in `allowed`, in input order
fn unused_params(cmd: &CommandInvocation, allowed: &[&str]) -> Vec<String> {
    cmd.keys()
        .filter(|key| !allowed.contains(key))
        .map(str::to_string)
        .collect()
}

/// Like [`unused_params`] but also accepting the permission flags
fn unused_params_with_permissions(cmd: &CommandInvocation, allowed: &[&str]) -> Vec<String> {
    cmd.keys()
        .filter(|key| !allowed.contains(key) && !PERMISSION_FIELDS.iter().any(|(p, _)| p == key))
        .map(str::to_string)
        .collect()
}

fn check_name(cmd: &CommandInvocation) -> ValidationResult<()> {
    if let Some(name) = cmd.get(params::NAME) {
        if !is_valid_name(name) {
            return Err(ValidationError::BadName {
                value: name.to_string(),
            });
        }
    }
    Ok(())
}

fn check_description(cmd: &CommandInvocation) -> ValidationResult<()> {
    match cmd.get(params::DESCRIPTION) {
        Some(description) if !is_valid_description(description) => {
            Err(ValidationError::BadDescription)
        }
        _ => Ok(()),
    }
}

fn check_output(cmd: &CommandInvocation, output: &str) -> ValidationResult<()> {
    let path = Path::new(output);
    if path.is_dir() {
        return Err(ValidationError::InvalidFilePath {
            path: path.to_path_buf(),
        });
    }
    if path.exists() && !cmd.has(params::OVERWRITE) {
        return Err(ValidationError::OutputExists {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

fn check_optional_id(cmd: &CommandInvocation, key: &str) -> ValidationResult<()> {
    if let Some(value) = cmd.get(key) {
        parse_id(value)?;
    }
    Ok(())
}

pub fn validate_login(cmd: &CommandInvocation) -> ValidationResult<Vec<String>> {
    let user = cmd.require(params::USER)?;
    if user != crate::constants::auth::GUEST_USERNAME {
        cmd.require(params::PASSWORD)?;
    }
    Ok(unused_params(cmd, LOGIN_PARAMS))
}

/// Archive downloads; `incremental` also accepts `since`
pub fn validate_download(cmd: &CommandInvocation, incremental: bool) -> ValidationResult<Vec<String>> {
    let id = cmd.require(params::ID)?;
    let output = cmd.require(params::OUTPUT_FILE)?;
    parse_id(id)?;
    if incremental {
        check_optional_id(cmd, params::SINCE)?;
    }
    check_output(cmd, output)?;

    let allowed = if incremental {
        NEW_DOWNLOAD_PARAMS
    } else {
        DOWNLOAD_PARAMS
    };
    Ok(unused_params(cmd, allowed))
}

pub fn validate_poll(cmd: &CommandInvocation) -> ValidationResult<Vec<String>> {
    let id = cmd.require(params::ID)?;
    let output = cmd.require(params::OUTPUT_FILE)?;
    let interval = cmd.require(params::INTERVAL)?;
    parse_seconds(interval)?;
    parse_id(id)?;
    check_output(cmd, output)?;
    Ok(unused_params(cmd, POLL_PARAMS))
}

pub fn validate_sleep(cmd: &CommandInvocation) -> ValidationResult<Vec<String>> {
    parse_seconds(cmd.require(params::INTERVAL)?)?;
    Ok(unused_params(cmd, SLEEP_PARAMS))
}

pub fn validate_run_file(cmd: &CommandInvocation) -> ValidationResult<Vec<String>> {
    let file = cmd.require(params::FILE)?;
    if !Path::new(file).is_file() {
        return Err(ValidationError::FileNotFound { path: file.into() });
    }
    Ok(unused_params(cmd, RUN_FILE_PARAMS))
}

/// `pausejob`, `resumejob`
pub fn validate_job_control(cmd: &CommandInvocation) -> ValidationResult<Vec<String>> {
    parse_id(cmd.require(params::ID)?)?;
    Ok(unused_params(cmd, ID_ONLY_PARAMS))
}

pub fn validate_delete(cmd: &CommandInvocation) -> ValidationResult<Vec<String>> {
    parse_id_list(cmd.require(params::ID)?)?;
    Ok(unused_params(cmd, ID_ONLY_PARAMS))
}

/// `setfirstname`, `setlastname`, `setinstitution`, `setarchivetype`
pub fn validate_user_setting(setting: &str, cmd: &CommandInvocation) -> ValidationResult<Vec<String>> {
    let value = cmd.require(params::VALUE)?;
    match setting {
        "firstname" | "lastname" if !is_valid_name(value) => {
            return Err(ValidationError::BadName {
                value: value.to_string(),
            })
        }
        "institution" if !is_valid_institution(value) => {
            return Err(ValidationError::BadInstitution {
                value: value.to_string(),
            })
        }
        "archivetype" if !files::ARCHIVE_TYPES.contains(&value.trim_start_matches('.')) => {
            return Err(ValidationError::BadArchiveType {
                path: value.to_string(),
            })
        }
        _ => {}
    }
    Ok(unused_params(cmd, SETTING_PARAMS))
}

/// `setspacepublic`, `setspaceprivate`
pub fn validate_visibility(cmd: &CommandInvocation) -> ValidationResult<Vec<String>> {
    parse_id(cmd.require(params::ID)?)?;
    Ok(unused_params(cmd, VISIBILITY_PARAMS))
}

/// Listings take a space id, or `u` for the caller's own primitives
pub fn validate_list(kind: PrimitiveKind, cmd: &CommandInvocation) -> ValidationResult<Vec<String>> {
    let by_space = cmd.has(params::ID);
    let by_user = cmd.has(params::USER);

    match (by_space, by_user) {
        (false, false) => {
            return Err(ValidationError::MissingParam {
                name: params::ID.to_string(),
            })
        }
        (true, true) => return Err(ValidationError::IdAndUser),
        (true, false) => {
            parse_id(cmd.require(params::ID)?)?;
        }
        (false, true) => {
            if !kind.has_user_listing() {
                return Err(ValidationError::NoUserPrimitives {
                    kind: kind.to_string(),
                });
            }
        }
    }
    check_optional_id(cmd, params::LIMIT)?;
    Ok(unused_params(cmd, LIST_PARAMS))
}

/// `remove*`; subspaces are removed from their parent and need no `from`
pub fn validate_remove(kind: PrimitiveKind, cmd: &CommandInvocation) -> ValidationResult<Vec<String>> {
    let ids = cmd.require(params::ID)?;
    let allowed = if kind == PrimitiveKind::Space {
        REMOVE_SUBSPACE_PARAMS
    } else {
        parse_id(cmd.require(params::FROM)?)?;
        REMOVE_PARAMS
    };
    parse_id_list(ids)?;
    Ok(unused_params(cmd, allowed))
}

/// `copy*` and `link*`
pub fn validate_copy(kind: PrimitiveKind, cmd: &CommandInvocation) -> ValidationResult<Vec<String>> {
    let ids = cmd.require(params::ID)?;
    let to = cmd.require(params::TO)?;
    parse_id_list(ids)?;
    check_optional_id(cmd, params::FROM)?;
    parse_id(to)?;

    let allowed = match kind {
        PrimitiveKind::User => COPY_USER_PARAMS,
        PrimitiveKind::Space => COPY_SPACE_PARAMS,
        PrimitiveKind::Solver => COPY_SOLVER_PARAMS,
        _ => COPY_PARAMS,
    };
    Ok(unused_params(cmd, allowed))
}

pub fn validate_create_subspace(cmd: &CommandInvocation) -> ValidationResult<Vec<String>> {
    parse_id(cmd.require(params::ID)?)?;
    check_name(cmd)?;
    check_description(cmd)?;
    Ok(unused_params_with_permissions(cmd, CREATE_SUBSPACE_PARAMS))
}

pub fn validate_create_job(cmd: &CommandInvocation) -> ValidationResult<Vec<String>> {
    let space = cmd.require(params::ID)?;
    let queue = cmd.require(params::QUEUE_ID)?;

    if let Some(traversal) = cmd.get(params::TRAVERSAL) {
        if Traversal::from_param(traversal).is_none() {
            return Err(ValidationError::BadTraversal {
                value: traversal.to_string(),
            });
        }
    }
    parse_id(space)?;
    parse_id(queue)?;
    check_optional_id(cmd, params::PROCESSOR_ID)?;

    for key in [params::CPU_TIMEOUT, params::WALLCLOCK] {
        if let Some(timeout) = cmd.get(key) {
            parse_timeout(timeout)?;
        }
    }
    check_name(cmd)?;
    check_description(cmd)?;
    Ok(unused_params(cmd, CREATE_JOB_PARAMS))
}

/// All `push*` commands
pub fn validate_upload(kind: UploadKind, cmd: &CommandInvocation) -> ValidationResult<Vec<String>> {
    let space = cmd.require(params::ID)?;
    let file = cmd.get(params::FILE);
    let url = cmd.get(params::URL);

    if file.is_none() && url.is_none() {
        return Err(ValidationError::MissingParam {
            name: format!("{} or {}", params::FILE, params::URL),
        });
    }
    parse_id(space)?;
    if file.is_some() && url.is_some() {
        return Err(ValidationError::FileAndUrl);
    }

    if let Some(file) = file {
        if !Path::new(file).is_file() {
            return Err(ValidationError::FileNotFound { path: file.into() });
        }
        if kind.requires_archive() && !has_archive_extension(file) {
            return Err(ValidationError::BadArchiveType {
                path: file.to_string(),
            });
        }
    }
    if let Some(description_file) = cmd.get(params::DESCRIPTION_FILE) {
        if !Path::new(description_file).is_file() {
            return Err(ValidationError::FileNotFound {
                path: description_file.into(),
            });
        }
    }
    if !kind.allows_url() && file.is_none() {
        return Err(ValidationError::UrlNotAllowed);
    }

    if kind == UploadKind::Benchmarks {
        parse_id(cmd.require(params::BENCH_TYPE)?)?;
        check_optional_id(cmd, params::DEPENDENCY)?;
    }
    check_name(cmd)?;
    check_description(cmd)?;

    let allowed = kind.allowed_params();
    if kind.accepts_permissions() {
        Ok(unused_params_with_permissions(cmd, allowed))
    } else {
        Ok(unused_params(cmd, allowed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::parser::parse_line;
    use std::fs;
    use tempfile::TempDir;

    fn cmd(line: &str) -> CommandInvocation {
        parse_line(line).unwrap().unwrap()
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42"), Ok(42));
        assert_eq!(parse_id("0"), Ok(0));
        assert!(parse_id("-1").is_err());
        assert!(parse_id("abc").is_err());
        assert!(parse_id("").is_err());
    }

    #[test]
    fn test_parse_id_list() {
        // Test that every element of a list must be a valid id
        assert_eq!(parse_id_list("1,2, 3"), Ok(vec![1, 2, 3]));
        assert_eq!(
            parse_id_list("1,x"),
            Err(ValidationError::InvalidId {
                value: "x".to_string()
            })
        );
        assert!(parse_id_list(",").is_err());
    }

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds("0.5"), Ok(0.5));
        assert_eq!(parse_seconds("10"), Ok(10.0));
        assert!(parse_seconds("-1").is_err());
        assert!(parse_seconds("NaN").is_err());
        assert!(parse_seconds("soon").is_err());
    }

    #[test]
    fn test_name_rules() {
        assert!(is_valid_name("my solver v1.2"));
        assert!(is_valid_name("a+b=c, really?"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("semi;colon"));
        assert!(!is_valid_name(&"x".repeat(129)));
    }

    #[test]
    fn test_institution_rules() {
        assert!(is_valid_institution("University of Iowa"));
        assert!(is_valid_institution("O'Brien-Smith"));
        assert!(!is_valid_institution("x"));
        assert!(!is_valid_institution("Acme & Co"));
    }

    #[test]
    fn test_archive_extensions() {
        assert!(has_archive_extension("solver.zip"));
        assert!(has_archive_extension("bench.TAR.GZ"));
        assert!(has_archive_extension("x.tgz"));
        assert!(!has_archive_extension("notes.txt"));
        assert!(!has_archive_extension("zip"));
    }

    #[test]
    fn test_login_requires_password_except_guest() {
        assert_eq!(
            validate_login(&cmd("login u=alice")),
            Err(ValidationError::MissingParam {
                name: "p".to_string()
            })
        );
        assert_eq!(validate_login(&cmd("login u=guest")), Ok(vec![]));
        assert_eq!(
            validate_login(&cmd("login u=alice p=pw addr=http://h/ extra=1")),
            Ok(vec!["extra".to_string()])
        );
    }

    #[test]
    fn test_download_refuses_existing_output() {
        // Test that an existing output path needs the overwrite flag
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out.zip");
        fs::write(&out, b"old").unwrap();
        let line = format!("getjobout id=4 out={}", out.display());

        assert_eq!(
            validate_download(&cmd(&line), false),
            Err(ValidationError::OutputExists { path: out.clone() })
        );
        assert_eq!(validate_download(&cmd(&format!("{line} ow=")), false), Ok(vec![]));
    }

    #[test]
    fn test_download_since_only_for_incremental() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("new.zip");
        let line = format!("getnewjobinfo id=4 out={} since=12", out.display());

        assert_eq!(validate_download(&cmd(&line), true), Ok(vec![]));
        assert_eq!(
            validate_download(&cmd(&line), false),
            Ok(vec!["since".to_string()])
        );
        let bad = format!("getnewjobinfo id=4 out={} since=x", out.display());
        assert!(matches!(
            validate_download(&cmd(&bad), true),
            Err(ValidationError::InvalidId { .. })
        ));
    }

    #[test]
    fn test_download_missing_output() {
        assert_eq!(
            validate_download(&cmd("getsolver id=3"), false),
            Err(ValidationError::MissingParam {
                name: "out".to_string()
            })
        );
    }

    #[test]
    fn test_poll_checks_interval() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("poll.zip");
        let line = format!("polljob id=4 out={} t=abc", out.display());
        assert!(matches!(
            validate_poll(&cmd(&line)),
            Err(ValidationError::InvalidTime { .. })
        ));
        let line = format!("polljob id=4 out={} t=2.5", out.display());
        assert_eq!(validate_poll(&cmd(&line)), Ok(vec![]));
    }

    #[test]
    fn test_upload_file_or_url() {
        assert_eq!(
            validate_upload(UploadKind::Solver, &cmd("pushsolver id=3")),
            Err(ValidationError::MissingParam {
                name: "f or url".to_string()
            })
        );
        assert_eq!(
            validate_upload(UploadKind::Solver, &cmd("pushsolver id=3 f=a.zip url=http://x")),
            Err(ValidationError::FileAndUrl)
        );
        assert_eq!(
            validate_upload(UploadKind::Solver, &cmd("pushsolver id=3 url=http://x/s.zip")),
            Ok(vec![])
        );
    }

    #[test]
    fn test_upload_url_not_allowed() {
        // Test that processors, configurations and space XML need a local file
        for kind in [UploadKind::Processor, UploadKind::Configuration, UploadKind::SpaceXml] {
            assert_eq!(
                validate_upload(kind, &cmd("pushpostproc id=3 url=http://x/p.zip")),
                Err(ValidationError::UrlNotAllowed)
            );
        }
    }

    #[test]
    fn test_upload_file_checks() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("solver.zip");
        let text = dir.path().join("config.sh");
        fs::write(&archive, b"PK").unwrap();
        fs::write(&text, b"#!/bin/sh").unwrap();

        let missing = dir.path().join("missing.zip");
        assert!(matches!(
            validate_upload(
                UploadKind::Solver,
                &cmd(&format!("pushsolver id=3 f={}", missing.display()))
            ),
            Err(ValidationError::FileNotFound { .. })
        ));
        assert!(matches!(
            validate_upload(
                UploadKind::Solver,
                &cmd(&format!("pushsolver id=3 f={}", text.display()))
            ),
            Err(ValidationError::BadArchiveType { .. })
        ));
        // Configurations are plain scripts
        assert_eq!(
            validate_upload(
                UploadKind::Configuration,
                &cmd(&format!("pushconfig id=3 f={} n=fast", text.display()))
            ),
            Ok(vec![])
        );
    }

    #[test]
    fn test_benchmark_upload_accepts_permissions() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("bench.tgz");
        fs::write(&archive, b"data").unwrap();

        let line = format!(
            "pushbenchmarks id=3 bt=1 f={} addsolver= removejob= bogus=1",
            archive.display()
        );
        assert_eq!(
            validate_upload(UploadKind::Benchmarks, &cmd(&line)),
            Ok(vec!["bogus".to_string()])
        );

        let line = format!("pushbenchmarks id=3 f={}", archive.display());
        assert_eq!(
            validate_upload(UploadKind::Benchmarks, &cmd(&line)),
            Err(ValidationError::MissingParam {
                name: "bt".to_string()
            })
        );
    }

    #[test]
    fn test_list_id_or_user() {
        assert_eq!(
            validate_list(PrimitiveKind::Solver, &cmd("lssolvers id=3 u=")),
            Err(ValidationError::IdAndUser)
        );
        assert_eq!(
            validate_list(PrimitiveKind::Solver, &cmd("lssolvers u=")),
            Ok(vec![])
        );
        assert_eq!(
            validate_list(PrimitiveKind::Space, &cmd("lssubspaces u=")),
            Err(ValidationError::NoUserPrimitives {
                kind: "spaces".to_string()
            })
        );
        assert_eq!(
            validate_list(PrimitiveKind::Job, &cmd("lsjobs")),
            Err(ValidationError::MissingParam {
                name: "id".to_string()
            })
        );
    }

    #[test]
    fn test_remove_needs_from_except_subspace() {
        assert_eq!(
            validate_remove(PrimitiveKind::Solver, &cmd("removesolver id=1,2")),
            Err(ValidationError::MissingParam {
                name: "from".to_string()
            })
        );
        assert_eq!(
            validate_remove(PrimitiveKind::Space, &cmd("removesubspace id=1,2 deleteprims=")),
            Ok(vec![])
        );
        assert_eq!(
            validate_remove(PrimitiveKind::Solver, &cmd("removesolver id=1 from=4 hier=")),
            Ok(vec!["hier".to_string()])
        );
    }

    #[test]
    fn test_copy_allowed_params_by_kind() {
        assert_eq!(
            validate_copy(PrimitiveKind::Solver, &cmd("copysolver id=1 from=2 to=3 hier=")),
            Ok(vec![])
        );
        assert_eq!(
            validate_copy(PrimitiveKind::Benchmark, &cmd("copybench id=1 from=2 to=3 hier=")),
            Ok(vec!["hier".to_string()])
        );
        assert!(matches!(
            validate_copy(PrimitiveKind::Job, &cmd("linkjob id=1 to=x")),
            Err(ValidationError::InvalidId { .. })
        ));
    }

    #[test]
    fn test_create_job_rules() {
        assert_eq!(
            validate_create_job(&cmd("createjob id=1 qid=2 trav=x")),
            Err(ValidationError::BadTraversal {
                value: "x".to_string()
            })
        );
        assert!(matches!(
            validate_create_job(&cmd("createjob id=1 qid=2 cpu=-5")),
            Err(ValidationError::InvalidTimeout { .. })
        ));
        assert_eq!(
            validate_create_job(&cmd("createjob id=1 qid=2 pid=3 n=nightly run trav=r")),
            Ok(vec![])
        );
    }

    #[test]
    fn test_create_subspace_rules() {
        assert!(matches!(
            validate_create_subspace(&cmd("createsubspace id=1 n=bad;name")),
            Err(ValidationError::BadName { .. })
        ));
        let long = "d".repeat(1025);
        assert_eq!(
            validate_create_subspace(&cmd(&format!("createsubspace id=1 d={long}"))),
            Err(ValidationError::BadDescription)
        );
        assert_eq!(
            validate_create_subspace(&cmd("createsubspace id=1 lock= allperm= addjob=")),
            Ok(vec![])
        );
    }

    #[test]
    fn test_user_settings() {
        assert!(matches!(
            validate_user_setting("institution", &cmd("setinstitution val=x")),
            Err(ValidationError::BadInstitution { .. })
        ));
        assert_eq!(
            validate_user_setting("firstname", &cmd("setfirstname val=Ada")),
            Ok(vec![])
        );
        assert!(matches!(
            validate_user_setting("archivetype", &cmd("setarchivetype val=rar")),
            Err(ValidationError::BadArchiveType { .. })
        ));
    }

    #[test]
    fn test_validation_is_pure() {
        // Test that repeated validation of the same input gives the same result
        let invocation = cmd("deletesolver id=1,2 junk=");
        let first = validate_delete(&invocation);
        let second = validate_delete(&invocation);
        assert_eq!(first, second);
        assert_eq!(first, Ok(vec!["junk".to_string()]));
    }
}
