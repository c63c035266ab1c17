//! User-facing status table and per-command outcomes
//!
//! Every command the shell runs produces exactly one [`Outcome`]. The status
//! codes are stable: scripts driving the client compare against them.

use std::fmt;

use crate::errors::AppError;

/// Closed set of command results. Non-negative codes are success or
/// information, negative codes are failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Status {
    Ok = 0,
    Exit = 1,
    NoNewResults = 2,
    JobDone = 3,
    LogoutOk = 4,
    LoginOk = 5,

    BadCommand = -1,
    BadArgs = -2,
    ServerError = -4,
    BadArchiveType = -5,
    FileAndUrl = -6,
    MissingParam = -7,
    FileNotFound = -8,
    InvalidFilePath = -9,
    ArchiveNotFound = -10,
    FileExists = -11,
    BadParentSpace = -12,
    BadCredentials = -13,
    UrlNotAllowed = -15,
    InvalidId = -16,
    InvalidTimeout = -17,
    ConnectionLost = -18,
    BadName = -19,
    BadDescription = -20,
    BadTime = -21,
    NotLoggedIn = -22,
    ConnectionExists = -23,
    BadAddress = -24,
    BadInstitution = -25,
    PermissionDenied = -26,
    CommandFileTerminating = -27,
    InsufficientQuota = -28,
    NameNotUnique = -29,
    BadTraversal = -30,
    IdAndUser = -31,
    NoUserPrimitives = -32,
}

impl Status {
    /// Stable signed code of this status
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn is_error(self) -> bool {
        self.code() < 0
    }

    /// Human-readable message printed by the shell
    pub fn message(self) -> &'static str {
        match self {
            Status::Ok => "Execution was successful",
            Status::Exit => "Goodbye",
            Status::NoNewResults => "No new job results",
            Status::JobDone => "Job complete, all results retrieved",
            Status::LogoutOk => "Logout successful",
            Status::LoginOk => "Login successful",
            Status::BadCommand => "Unrecognized command",
            Status::BadArgs => "Parameters must be in the form {key}={value}",
            Status::ServerError => "Error communicating with server",
            Status::BadArchiveType => {
                "Bad archive type-- supported types are zip, tar, tar.gz and tgz"
            }
            Status::FileAndUrl => "An upload should contain either a url or a local file, not both",
            Status::MissingParam => {
                "Command is missing a required parameter-- please consult the command reference"
            }
            Status::FileNotFound => "The specified file could not be found",
            Status::InvalidFilePath => "The given filepath is invalid",
            Status::ArchiveNotFound => {
                "You do not have permission to download the requested archive, or the archive does not exist-- please ensure the given ID is correct"
            }
            Status::FileExists => {
                "The specified filepath already exists-- use the flag \"ow\" to overwrite."
            }
            Status::BadParentSpace => {
                "You do not have permission to add subspaces to the given parent space, or the parent space does not exist"
            }
            Status::BadCredentials => "Invalid username and/or password",
            Status::UrlNotAllowed => {
                "URL uploads are not allowed here-- please upload a local archive"
            }
            Status::InvalidId => "Invalid ID-- IDs must be non-negative integers",
            Status::InvalidTimeout => "Invalid timeout-- timeouts must be non-negative integers",
            Status::ConnectionLost => {
                "The connection to the server was lost. You must log in again to continue"
            }
            Status::BadName => "The specified name is invalid",
            Status::BadDescription => "The specified description is invalid",
            Status::BadTime => "The time should be a positive number, measured in seconds",
            Status::NotLoggedIn => "You must log in before issuing commands to the server",
            Status::ConnectionExists => {
                "You must log out of the existing session before you can start a new one"
            }
            Status::BadAddress => {
                "The given URL does not point to a valid Starexec instance. Ensure that you are using the correct protocol (http vs https) and that the address ends with a /"
            }
            Status::BadInstitution => "The institution given has invalid characters or is too long",
            Status::PermissionDenied => {
                "You do not have permission to view the contents of the given space, or the space does not exist"
            }
            Status::CommandFileTerminating => {
                "An error was encountered: the file of commands may not have been completed"
            }
            Status::InsufficientQuota => {
                "You do not have the required disk quota to copy the primitive"
            }
            Status::NameNotUnique => "All primitives in a given space must have unique names",
            Status::BadTraversal => {
                "The traversal must be either depth-first (d) or round-robin (r)"
            }
            Status::IdAndUser => "Only one of id and u is allowed",
            Status::NoUserPrimitives => {
                "User primitives can only be obtained for jobs, solvers, and benchmarks"
            }
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Result of running one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: Status,
    /// Parameter whose absence caused a `MissingParam` failure
    pub missing_param: Option<String>,
    /// Supplied parameters the command does not use
    pub ignored_params: Vec<String>,
    /// Ids of entities the command created
    pub created_ids: Vec<u64>,
    /// Extra lines printed before the status line (listings, server messages)
    pub report: Vec<String>,
}

impl Outcome {
    pub fn new(status: Status) -> Self {
        Self {
            status,
            missing_param: None,
            ignored_params: Vec::new(),
            created_ids: Vec::new(),
            report: Vec::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(Status::Ok)
    }

    pub fn with_ignored(mut self, ignored: Vec<String>) -> Self {
        self.ignored_params = ignored;
        self
    }

    pub fn with_created(mut self, ids: Vec<u64>) -> Self {
        self.created_ids = ids;
        self
    }

    pub fn with_report(mut self, lines: Vec<String>) -> Self {
        self.report = lines;
        self
    }

    pub fn is_error(&self) -> bool {
        self.status.is_error()
    }

    /// Build the outcome reported for a failed command
    pub fn from_error(error: &AppError) -> Self {
        let mut outcome = Self::new(error.status());
        outcome.missing_param = error.missing_param().map(str::to_string);
        if let Some(message) = error.server_message() {
            outcome.report.push(format!("Server message: {message}"));
        }
        outcome
    }

    /// Lines the shell prints for this outcome, in order
    pub fn render(&self) -> Vec<String> {
        let mut lines = self.report.clone();
        if !self.ignored_params.is_empty() {
            lines.push(format!(
                "WARNING: The following unnecessary parameters were ignored: {}",
                self.ignored_params.join(" ")
            ));
        }
        if self.status.is_error() {
            lines.push(format!("ERROR: {}", self.status.message()));
            if let Some(param) = &self.missing_param {
                lines.push(format!("Missing param = \"{param}\""));
            }
        } else if self.status != Status::Ok {
            lines.push(self.status.message().to_string());
        }
        lines
    }
}

impl From<Status> for Outcome {
    fn from(status: Status) -> Self {
        Self::new(status)
    }
}
