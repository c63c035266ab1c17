//! Application constants for starcom
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Environment variable names for unattended login
pub mod env {
    /// Environment variable name for the StarExec username
    pub const USERNAME: &str = "STARCOM_USERNAME";

    /// Environment variable name for the StarExec password
    pub const PASSWORD: &str = "STARCOM_PASSWORD";

    /// Environment variable overriding the service base address
    pub const BASE_URL: &str = "STARCOM_BASE_URL";
}

/// Authentication and session constants
pub mod auth {
    /// Name of the session cookie issued by the service
    pub const SESSION_COOKIE: &str = "JSESSIONID";

    /// Username typed by users wanting anonymous access
    pub const GUEST_USERNAME: &str = "guest";

    /// Account the service exposes for anonymous access
    pub const PUBLIC_USERNAME: &str = "public";

    /// Password of the anonymous account
    pub const PUBLIC_PASSWORD: &str = "public";

    /// Form field names of the container-managed login form
    pub const FORM_USERNAME: &str = "j_username";
    pub const FORM_PASSWORD: &str = "j_password";
    pub const FORM_COOKIE_EXISTS: &str = "cookieexists";

    /// Marker present in the body of the login form page
    pub const LOGIN_FORM_MARKER: &str = "j_security_check";

    /// Number of token characters shown in logs
    pub const TOKEN_LOG_PREFIX: usize = 8;
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = concat!("starcom/", env!("CARGO_PKG_VERSION"));

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum number of redirects to follow
    pub const MAX_REDIRECTS: usize = 10;

    /// Fixed headers attached to every authenticated request
    pub const CONNECTION: (&str, &str) = ("Connection", "keep-alive");
    pub const ACCEPT_LANGUAGE: (&str, &str) = ("Accept-Language", "en-US,en;q=0.5");

    pub const HEADER_COOKIE: &str = "Cookie";
    pub const HEADER_SET_COOKIE: &str = "Set-Cookie";
    pub const HEADER_LOCATION: &str = "Location";
    pub const HEADER_CONTENT_DISPOSITION: &str = "Content-Disposition";
}

/// Rate limiting and retry configuration
pub mod limits {
    /// Default rate limit for service requests (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 10;

    /// Maximum retry attempts for throttled requests
    pub const MAX_RETRIES: u32 = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const RETRY_BASE_DELAY_MS: u64 = 1000;

    /// Maximum length of a primitive description
    pub const MAX_DESCRIPTION_LEN: usize = 1024;
}

/// StarExec service addresses and endpoint paths, relative to the base address
pub mod service {
    /// Base address of the public StarExec instance
    pub const DEFAULT_BASE_URL: &str = "https://www.starexec.org/starexec/";

    pub const HOME: &str = "secure/index.jsp";
    pub const LOGIN: &str = "secure/j_security_check";
    pub const LOGOUT: &str = "services/session/logout";
    pub const DOWNLOAD: &str = "secure/download";

    pub const UPLOAD_SOLVER: &str = "secure/upload/solvers";
    pub const UPLOAD_BENCHMARKS: &str = "secure/upload/benchmarks";
    pub const UPLOAD_PROCESSOR: &str = "secure/processors/manager";
    pub const UPLOAD_SPACE_XML: &str = "secure/upload/space";
    pub const UPLOAD_CONFIGURATION: &str = "secure/upload/configurations";

    pub const ADD_SPACE: &str = "secure/add/space";
    pub const ADD_JOB_PAGE: &str = "secure/add/job.jsp";
    pub const ADD_JOB: &str = "secure/add/job";

    pub const USER_ID: &str = "services/users/getid";

    /// Prefixes completed with `<type>/...` segments by the operations
    pub const DELETE: &str = "services/delete/";
    pub const REMOVE: &str = "services/remove/";
    pub const SPACES: &str = "services/spaces/";
    pub const SPACE_LISTING: &str = "services/space/";
    pub const USER_LISTING: &str = "services/users/";
    pub const CHANGE_VISIBILITY: &str = "services/space/changePublic/";
    pub const EDIT_USER: &str = "services/edit/user/";
    pub const JOB_CONTROL: &str = "services/";
}

/// Cookie names the service uses to return values
pub mod cookies {
    /// Identifier of a newly created entity
    pub const NEW_ID: &str = "New_ID";

    /// Highest completion sequence number covered by a generated archive
    pub const MAX_COMPLETION: &str = "Max-Completion";

    /// Present once every pair of a job has completed
    pub const JOB_COMPLETE: &str = "Job-Complete";

    /// Error text the service attaches to rejected requests
    pub const STATUS_MESSAGE: &str = "STATUS_MESSAGE_STRING";
}

/// Command parameter keys
pub mod params {
    pub const ID: &str = "id";
    pub const OUTPUT_FILE: &str = "out";
    pub const OVERWRITE: &str = "ow";
    pub const SINCE: &str = "since";
    pub const INTERVAL: &str = "t";
    pub const USER: &str = "u";
    pub const PASSWORD: &str = "p";
    pub const ADDRESS: &str = "addr";
    pub const FILE: &str = "f";
    pub const URL: &str = "url";
    pub const NAME: &str = "n";
    pub const DESCRIPTION: &str = "d";
    pub const DESCRIPTION_FILE: &str = "df";
    pub const DOWNLOADABLE: &str = "downloadable";
    pub const BENCH_TYPE: &str = "bt";
    pub const DEPENDENCY: &str = "dep";
    pub const LINKED: &str = "link";
    pub const HIERARCHY: &str = "hier";
    pub const LIMIT: &str = "limit";
    pub const VALUE: &str = "val";
    pub const FROM: &str = "from";
    pub const TO: &str = "to";
    pub const DELETE_PRIMS: &str = "deleteprims";
    pub const VERBOSE: &str = "verbose";
    pub const LOCKED: &str = "lock";
    pub const ALL_PERMISSIONS: &str = "allperm";
    pub const WALLCLOCK: &str = "w";
    pub const CPU_TIMEOUT: &str = "cpu";
    pub const QUEUE_ID: &str = "qid";
    pub const PROCESSOR_ID: &str = "pid";
    pub const TRAVERSAL: &str = "trav";
}

/// Command names and prefixes understood by the shell
pub mod commands {
    pub const EXIT: &str = "exit";
    pub const HELP: &str = "help";
    pub const LOGIN: &str = "login";
    pub const LOGOUT: &str = "logout";
    pub const SLEEP: &str = "sleep";
    pub const RUN_FILE: &str = "runfile";
    pub const POLL_JOB: &str = "polljob";
    pub const PAUSE_JOB: &str = "pausejob";
    pub const RESUME_JOB: &str = "resumejob";
    pub const RETURN_IDS: &str = "returnids";
    pub const IGNORE_IDS: &str = "ignoreids";
    pub const LIST_ALL: &str = "ls";

    pub const PREFIX_GET: &str = "get";
    pub const PREFIX_SET: &str = "set";
    pub const PREFIX_PUSH: &str = "push";
    pub const PREFIX_DELETE: &str = "delete";
    pub const PREFIX_CREATE: &str = "create";
    pub const PREFIX_LIST: &str = "ls";
    pub const PREFIX_COPY: &str = "copy";
    pub const PREFIX_LINK: &str = "link";
    pub const PREFIX_REMOVE: &str = "remove";
}

/// File handling constants
pub mod files {
    /// Suffix appended to partially written archives
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";

    /// Archive formats the service can produce and accept
    pub const ARCHIVE_TYPES: [&str; 4] = ["zip", "tar", "tar.gz", "tgz"];

    /// Suffixes inserted into polled archive names
    pub const INFO_SUFFIX: &str = "-info";
    pub const OUTPUT_SUFFIX: &str = "-output";

    /// Local configuration file names
    pub const LOCAL_CONFIG_FILE: &str = "starcom.toml";
    pub const CONFIG_DIR_NAME: &str = "starcom";
    pub const CONFIG_FILE_NAME: &str = "config.toml";
}

/// Interactive shell constants
pub mod shell {
    /// Prompt printed before each interactive command
    pub const PROMPT: &str = "StarCom> ";

    /// Format used for generated names of new jobs and spaces
    pub const DEFAULT_NAME_FORMAT: &str = "%Y-%m-%d %H.%M.%S";
}

// Re-export commonly used constants at module level for convenience
pub use auth::SESSION_COOKIE;
pub use env::{PASSWORD as ENV_PASSWORD, USERNAME as ENV_USERNAME};
pub use http::USER_AGENT;
pub use limits::DEFAULT_RATE_LIMIT_RPS;
pub use service::DEFAULT_BASE_URL;
