//! Data models for starcom
//!
//! Kinds of primitives the service manages, the archives it can produce, and
//! the permission set attached to new spaces and benchmark uploads.

use std::fmt;

use crate::app::watermark::ResultCategory;

/// Kinds of primitives stored by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Solver,
    Benchmark,
    Job,
    User,
    Space,
    Configuration,
    PostProcessor,
    BenchProcessor,
}

impl PrimitiveKind {
    /// Name used in `services/delete/<name>` and `services/remove/<name>`
    pub fn service_name(self) -> &'static str {
        match self {
            Self::Solver => "solver",
            Self::Benchmark => "benchmark",
            Self::Job => "job",
            Self::User => "user",
            Self::Space => "subspace",
            Self::Configuration => "configuration",
            Self::PostProcessor | Self::BenchProcessor => "processor",
        }
    }

    /// Path segment used by the paginated listing endpoints
    pub fn listing_name(self) -> Option<&'static str> {
        match self {
            Self::Solver => Some("solvers"),
            Self::Benchmark => Some("benchmarks"),
            Self::Job => Some("jobs"),
            Self::User => Some("users"),
            Self::Space => Some("spaces"),
            _ => None,
        }
    }

    /// Number of table columns the listing endpoint renders
    pub fn listing_columns(self) -> u32 {
        match self {
            Self::User => 3,
            Self::Job => 6,
            _ => 2,
        }
    }

    /// Whether listings name entries through an `openSpace` link
    pub fn is_container(self) -> bool {
        matches!(self, Self::Space)
    }

    /// Whether the service keeps a per-user listing of this kind
    pub fn has_user_listing(self) -> bool {
        matches!(self, Self::Solver | Self::Benchmark | Self::Job)
    }

    /// Processor class sent with processor uploads and downloads
    pub fn processor_class(self) -> Option<&'static str> {
        match self {
            Self::PostProcessor => Some("post"),
            Self::BenchProcessor => Some("bench"),
            _ => None,
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Solver => "solvers",
            Self::Benchmark => "benchmarks",
            Self::Job => "jobs",
            Self::User => "users",
            Self::Space => "spaces",
            Self::Configuration => "configurations",
            Self::PostProcessor => "post-processors",
            Self::BenchProcessor => "bench-processors",
        };
        f.write_str(name)
    }
}

/// One entry of a listing: a primitive's id and display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Primitive {
    pub id: u64,
    pub name: String,
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id={} : name={}", self.id, self.name)
    }
}

/// Archives the download endpoint can generate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    JobInfo,
    JobOutput,
    SpaceXml,
    Space { hierarchy: bool },
    Processor(PrimitiveKind),
    Benchmark,
    Solver,
    JobPair,
}

impl ArchiveKind {
    /// Value of the `type` query parameter
    pub fn archive_type(self) -> &'static str {
        match self {
            Self::JobInfo => "job",
            Self::JobOutput => "j_outputs",
            Self::SpaceXml => "spaceXML",
            Self::Space { .. } => "space",
            Self::Processor(_) => "proc",
            Self::Benchmark => "bench",
            Self::Solver => "solver",
            Self::JobPair => "jp_output",
        }
    }

    /// Additional query parameters this archive needs
    pub fn extra_params(self) -> Vec<(String, String)> {
        match self {
            Self::Space { hierarchy } => vec![("hierarchy".to_string(), hierarchy.to_string())],
            Self::Processor(kind) => kind
                .processor_class()
                .map(|class| vec![("procClass".to_string(), class.to_string())])
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Watermark category if the archive can be fetched incrementally
    pub fn category(self) -> Option<ResultCategory> {
        ResultCategory::from_archive_type(self.archive_type())
    }
}

/// Names of the per-space permission flags, as typed by users and as the
/// service's forms spell them
pub const PERMISSION_FIELDS: [(&str, &str); 10] = [
    ("addsolver", "addSolver"),
    ("adduser", "addUser"),
    ("addspace", "addSpace"),
    ("addjob", "addJob"),
    ("addbench", "addBench"),
    ("removesolver", "removeSolver"),
    ("removeuser", "removeUser"),
    ("removespace", "removeSpace"),
    ("removejob", "removeJob"),
    ("removebench", "removeBench"),
];

/// Default permissions granted to members of a space
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Permissions {
    granted: [bool; PERMISSION_FIELDS.len()],
}

impl Permissions {
    /// Every permission granted
    pub fn all() -> Self {
        Self {
            granted: [true; PERMISSION_FIELDS.len()],
        }
    }

    /// Build from the flags present on a command line
    pub fn from_flags<'a>(flags: impl IntoIterator<Item = &'a str>) -> Self {
        let mut permissions = Self::default();
        for flag in flags {
            if flag == crate::constants::params::ALL_PERMISSIONS {
                return Self::all();
            }
            if let Some(index) = PERMISSION_FIELDS.iter().position(|(key, _)| *key == flag) {
                permissions.granted[index] = true;
            }
        }
        permissions
    }

    pub fn is_granted(&self, field: &str) -> bool {
        PERMISSION_FIELDS
            .iter()
            .position(|(key, form)| *key == field || *form == field)
            .map(|index| self.granted[index])
            .unwrap_or(false)
    }

    /// Form field name and granted flag for each permission
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, bool)> + '_ {
        PERMISSION_FIELDS
            .iter()
            .zip(self.granted.iter())
            .map(|((_, form), granted)| (*form, *granted))
    }
}

/// Order in which a job visits its benchmarks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Traversal {
    #[default]
    DepthFirst,
    RoundRobin,
}

impl Traversal {
    /// Parse the `trav` parameter: `d` or `r`
    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "d" => Some(Self::DepthFirst),
            "r" => Some(Self::RoundRobin),
            _ => None,
        }
    }

    pub fn form_value(self) -> &'static str {
        match self {
            Self::DepthFirst => "depth",
            Self::RoundRobin => "robin",
        }
    }
}
