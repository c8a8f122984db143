//! Error types.
//!
//! `MacError` is the only error a caller of the library ever sees. Platform
//! code converts every process or I/O failure into one of its variants at
//! the component boundary.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the crate.
pub type MacResult<T> = Result<T, MacError>;

/// A step of the apply sequence, used to say where a sequence stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyStep {
    /// Locating the adapter's registry key (Windows).
    Resolve,
    /// `netsh ... admin=disable`
    Disable,
    /// `reg add ... NetworkAddress`
    WriteAddress,
    /// `netsh ... admin=enable`
    Enable,
    /// Bringing the link down (Unix-like).
    LinkDown,
    /// Setting the hardware address (Unix-like).
    SetAddress,
    /// Bringing the link back up (Unix-like).
    LinkUp,
}

impl ApplyStep {
    /// Whether the interface may be left disabled if this step fails.
    pub fn follows_disable(&self) -> bool {
        matches!(
            self,
            ApplyStep::WriteAddress | ApplyStep::Enable | ApplyStep::SetAddress | ApplyStep::LinkUp
        )
    }
}

impl fmt::Display for ApplyStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyStep::Resolve => write!(f, "resolve adapter"),
            ApplyStep::Disable => write!(f, "disable interface"),
            ApplyStep::WriteAddress => write!(f, "write registry address"),
            ApplyStep::Enable => write!(f, "enable interface"),
            ApplyStep::LinkDown => write!(f, "link down"),
            ApplyStep::SetAddress => write!(f, "set hardware address"),
            ApplyStep::LinkUp => write!(f, "link up"),
        }
    }
}

/// Stable name of an error kind, for callers that branch on the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Format,
    InterfaceNotFound,
    AmbiguousOrUnsupported,
    Read,
    Permission,
    Apply,
    NoCandidate,
    Persistence,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Format => "FormatError",
            ErrorKind::InterfaceNotFound => "InterfaceNotFoundError",
            ErrorKind::AmbiguousOrUnsupported => "AmbiguousOrUnsupportedError",
            ErrorKind::Read => "ReadError",
            ErrorKind::Permission => "PermissionError",
            ErrorKind::Apply => "ApplyError",
            ErrorKind::NoCandidate => "NoCandidateError",
            ErrorKind::Persistence => "PersistenceError",
            ErrorKind::Config => "ConfigError",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum MacError {
    #[error("Invalid MAC address format: '{0}'")]
    Format(String),

    #[error("Interface '{0}' not found")]
    InterfaceNotFound(String),

    #[error("Cannot resolve interface '{label}': {reason}")]
    AmbiguousOrUnsupported { label: String, reason: String },

    #[error("Failed to read MAC address of '{label}': {reason}")]
    Read { label: String, reason: String },

    #[error("Insufficient privileges to {step}: {detail}")]
    Permission { step: ApplyStep, detail: String },

    #[error("{step} failed: `{command}` exited with {}{}", exit_label(.status), stderr_suffix(.stderr))]
    Apply {
        step: ApplyStep,
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("No candidate address staged; generate, inspect or set one first")]
    NoCandidate,

    #[error("Failed to persist MAC address at {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config error: {0}")]
    Config(String),
}

impl MacError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MacError::Format(_) => ErrorKind::Format,
            MacError::InterfaceNotFound(_) => ErrorKind::InterfaceNotFound,
            MacError::AmbiguousOrUnsupported { .. } => ErrorKind::AmbiguousOrUnsupported,
            MacError::Read { .. } => ErrorKind::Read,
            MacError::Permission { .. } => ErrorKind::Permission,
            MacError::Apply { .. } => ErrorKind::Apply,
            MacError::NoCandidate => ErrorKind::NoCandidate,
            MacError::Persistence { .. } => ErrorKind::Persistence,
            MacError::Config(_) => ErrorKind::Config,
        }
    }

    /// The apply step this error stopped at, if it came from an apply sequence.
    pub fn failed_step(&self) -> Option<ApplyStep> {
        match self {
            MacError::Apply { step, .. } | MacError::Permission { step, .. } => Some(*step),
            _ => None,
        }
    }
}

fn exit_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {}", code),
        None => "no status".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {}", stderr)
    }
}

/// Failure to run an external program at all.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' did not finish within {seconds}s")]
    TimedOut { program: String, seconds: u64 },

    #[error("I/O error while running '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}
