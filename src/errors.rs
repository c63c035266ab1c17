//! Error types for starcom
//!
//! Errors are tagged by where they arise: local validation of command
//! parameters, the HTTP transport, the shape of service responses, the session
//! lifecycle, and local storage. Every error maps onto exactly one entry of the
//! user-facing status table through [`AppError::status`].

use std::path::PathBuf;
use thiserror::Error;

use crate::app::status::Status;

/// Parameter validation errors, raised before any network call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The command line could not be split into key=value parameters
    #[error("Parameters must be in the form key=value")]
    MalformedArguments,

    /// A required parameter was not supplied
    #[error("Missing required parameter: {name}")]
    MissingParam { name: String },

    /// An id is not a non-negative integer
    #[error("Invalid id: {value}")]
    InvalidId { value: String },

    /// A timeout is not a non-negative integer
    #[error("Invalid timeout: {value}")]
    InvalidTimeout { value: String },

    /// A time interval is not a non-negative number
    #[error("Invalid time: {value}")]
    InvalidTime { value: String },

    /// A file name does not end in a supported archive extension
    #[error("Unsupported archive type: {path}")]
    BadArchiveType { path: String },

    /// Both a local file and a URL were given for an upload
    #[error("Only one of f= and url= may be given")]
    FileAndUrl,

    /// URL uploads are not accepted by this command
    #[error("URL uploads are not supported for this command")]
    UrlNotAllowed,

    /// A local file to upload does not exist
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// A local path cannot be used for output
    #[error("Invalid file path: {path}")]
    InvalidFilePath { path: PathBuf },

    /// Output exists and overwrite was not requested
    #[error("Output path already exists: {path}")]
    OutputExists { path: PathBuf },

    /// A primitive name fails the service's naming rules
    #[error("Invalid name: {value}")]
    BadName { value: String },

    /// A description is too long
    #[error("Description exceeds the allowed length")]
    BadDescription,

    /// An institution fails the service's naming rules
    #[error("Invalid institution: {value}")]
    BadInstitution { value: String },

    /// Unknown job traversal order
    #[error("Invalid traversal type: {value}")]
    BadTraversal { value: String },

    /// Both a space id and the user flag were given to a listing command
    #[error("Only one of id= and u= may be given")]
    IdAndUser,

    /// The user flag was given for a primitive type users do not own
    #[error("User listings are not available for {kind}")]
    NoUserPrimitives { kind: String },

    /// The command name is not known
    #[error("Unrecognized command: {name}")]
    UnknownCommand { name: String },
}

/// HTTP transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    /// HTTP request error
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// The address cannot be used to reach a service
    #[error("Invalid address: {url} - {reason}")]
    InvalidAddress { url: String, reason: String },

    /// A local file to send could not be read
    #[error("Failed to read request body from {path}")]
    Body {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Rate limit exceeded
    #[error("Rate limit exceeded. Server responded with HTTP 429")]
    RateLimitExceeded,

    /// Server overloaded
    #[error("Server overloaded. Server responded with HTTP 503")]
    ServerOverloaded,

    /// Too many redirects in one exchange
    #[error("Too many redirects (limit {limit})")]
    TooManyRedirects { limit: usize },

    /// Rate limiter configuration is invalid
    #[error("Rate limit must be non-zero")]
    InvalidRateLimit,
}

/// Errors about the shape or content of service responses
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// An expected cookie was not set
    #[error("Response did not set the {name} cookie")]
    MissingCookie { name: String },

    /// A header or cookie value could not be interpreted
    #[error("Malformed value for {name}: {value}")]
    MalformedValue { name: String, value: String },

    /// Neither a redirect nor an attachment followed an archive request
    #[error("No archive was produced for the request")]
    ArchiveNotFound,

    /// The service answered with an unexpected HTTP status
    #[error("Unexpected HTTP status {status}")]
    UnexpectedStatus { status: u16 },

    /// JSON payload could not be parsed
    #[error("JSON parsing error in response")]
    Json(#[from] serde_json::Error),

    /// The payload parsed but did not have the expected structure
    #[error("Unexpected response payload: {reason}")]
    UnexpectedPayload { reason: String },

    /// The service refused the operation
    #[error("Permission denied by the service")]
    PermissionDenied,

    /// The parent space does not exist or cannot be written
    #[error("Parent space is invalid")]
    BadParentSpace,

    /// The user's disk quota would be exceeded
    #[error("Insufficient disk quota")]
    InsufficientQuota,

    /// A primitive with the same name already exists
    #[error("Name is not unique in the target space")]
    NameNotUnique,

    /// The service rejected the request and explained why
    #[error("Request rejected by the service: {message}")]
    Rejected { message: String },
}

/// Session lifecycle errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No session exists
    #[error("Not logged in")]
    NotLoggedIn,

    /// A session exists and a second login was attempted
    #[error("A session already exists")]
    AlreadyLoggedIn,

    /// The service rejected the credentials
    #[error("Login rejected for user {username}")]
    BadCredentials { username: String },

    /// The base address does not reach a StarExec instance
    #[error("Address does not point to a StarExec instance: {url}")]
    BadAddress { url: String },

    /// The service did not issue a session token
    #[error("Service did not issue a session")]
    NoSessionIssued,

    /// The session expired and could not be restored
    #[error("Connection to the service was lost")]
    ConnectionLost,
}

/// Local file system errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Writing an archive failed
    #[error("Failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading a local file failed
    #[error("Failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Atomic file operation failed
    #[error("Atomic file operation failed: could not rename {temp_path} to {final_path}")]
    AtomicOperationFailed {
        temp_path: PathBuf,
        final_path: PathBuf,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Configuration file could not be read
    #[error("Failed to read configuration file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Parameter validation error
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Transport error
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Response shape error
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Session error
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Storage error
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Check if the error is recoverable (transient)
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Transport(TransportError::Http(_))
            | AppError::Transport(TransportError::RateLimitExceeded)
            | AppError::Transport(TransportError::ServerOverloaded)
            | AppError::Protocol(ProtocolError::UnexpectedStatus { .. }) => true,

            AppError::Session(SessionError::ConnectionLost)
            | AppError::Session(SessionError::BadCredentials { .. })
            | AppError::Config(_) => false,

            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::Transport(_) => "transport",
            AppError::Protocol(_) => "protocol",
            AppError::Session(_) => "session",
            AppError::Storage(_) => "storage",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
        }
    }

    /// Map the error onto the user-facing status table
    pub fn status(&self) -> Status {
        match self {
            AppError::Validation(e) => e.status(),
            AppError::Transport(TransportError::InvalidAddress { .. }) => Status::BadAddress,
            AppError::Transport(TransportError::Body { .. }) => Status::FileNotFound,
            AppError::Transport(_) => Status::ServerError,
            AppError::Protocol(e) => match e {
                ProtocolError::ArchiveNotFound => Status::ArchiveNotFound,
                ProtocolError::PermissionDenied => Status::PermissionDenied,
                ProtocolError::BadParentSpace => Status::BadParentSpace,
                ProtocolError::InsufficientQuota => Status::InsufficientQuota,
                ProtocolError::NameNotUnique => Status::NameNotUnique,
                _ => Status::ServerError,
            },
            AppError::Session(e) => match e {
                SessionError::NotLoggedIn => Status::NotLoggedIn,
                SessionError::AlreadyLoggedIn => Status::ConnectionExists,
                SessionError::BadCredentials { .. } => Status::BadCredentials,
                SessionError::BadAddress { .. } => Status::BadAddress,
                SessionError::NoSessionIssued => Status::ServerError,
                SessionError::ConnectionLost => Status::ConnectionLost,
            },
            AppError::Storage(StorageError::Read { .. }) => Status::FileNotFound,
            AppError::Storage(_) | AppError::Io(_) => Status::InvalidFilePath,
            AppError::Config(_) => Status::BadArgs,
        }
    }

    /// Explanation the service attached to a rejected request, if any
    pub fn server_message(&self) -> Option<&str> {
        match self {
            AppError::Protocol(ProtocolError::Rejected { message }) if !message.is_empty() => {
                Some(message)
            }
            AppError::Protocol(ProtocolError::UnexpectedPayload { reason }) => Some(reason),
            _ => None,
        }
    }

    /// Name of the parameter whose absence caused the error, if any
    pub fn missing_param(&self) -> Option<&str> {
        match self {
            AppError::Validation(ValidationError::MissingParam { name }) => Some(name),
            _ => None,
        }
    }
}

impl ValidationError {
    /// Map the validation failure onto the user-facing status table
    pub fn status(&self) -> Status {
        match self {
            ValidationError::MalformedArguments => Status::BadArgs,
            ValidationError::MissingParam { .. } => Status::MissingParam,
            ValidationError::InvalidId { .. } => Status::InvalidId,
            ValidationError::InvalidTimeout { .. } => Status::InvalidTimeout,
            ValidationError::InvalidTime { .. } => Status::BadTime,
            ValidationError::BadArchiveType { .. } => Status::BadArchiveType,
            ValidationError::FileAndUrl => Status::FileAndUrl,
            ValidationError::UrlNotAllowed => Status::UrlNotAllowed,
            ValidationError::FileNotFound { .. } => Status::FileNotFound,
            ValidationError::InvalidFilePath { .. } => Status::InvalidFilePath,
            ValidationError::OutputExists { .. } => Status::FileExists,
            ValidationError::BadName { .. } => Status::BadName,
            ValidationError::BadDescription => Status::BadDescription,
            ValidationError::BadInstitution { .. } => Status::BadInstitution,
            ValidationError::BadTraversal { .. } => Status::BadTraversal,
            ValidationError::IdAndUser => Status::IdAndUser,
            ValidationError::NoUserPrimitives { .. } => Status::NoUserPrimitives,
            ValidationError::UnknownCommand { .. } => Status::BadCommand,
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Validation result type alias
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Transport result type alias
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Protocol result type alias
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;

/// Session result type alias
pub type SessionResult<T> = std::result::Result<T, SessionError>;
