use crate::serializer::Format;
use crate::site::Stage;
use crate::validate::Violation;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the library
#[derive(Debug, Error)]
pub enum Error {
    /// Bad build or site options; nothing was attempted
    #[error("invalid configuration for `{option}`: {message}")]
    Configuration { option: String, message: String },

    /// A route descriptor whose template cannot produce a consistent parameter set
    #[error("invalid route `{pattern}`: {message}")]
    InvalidRoute { pattern: String, message: String },

    /// Malformed JSON or YAML on import
    #[error("failed to parse {format} document: {message}")]
    Parse { format: Format, message: String },

    /// Structural violations, raised only when strict validation was requested
    #[error("specification is invalid: {}", join_violations(.0))]
    Validation(Vec<Violation>),

    /// A static generation stage failed and the run was aborted
    #[error("static generation failed at {stage}{}: {message}", theme_suffix(.theme))]
    Generation {
        stage: Stage,
        theme: Option<String>,
        message: String,
    },

    /// The cache store could not be reached; callers degrade to building
    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    /// Caller-driven cancellation observed between units of work
    #[error("cancelled during {stage}")]
    Cancelled { stage: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    pub fn configuration(option: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Configuration {
            option: option.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error is warning-class (never fatal to the caller)
    pub fn is_warning(&self) -> bool {
        matches!(self, Error::CacheUnavailable(_))
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn theme_suffix(theme: &Option<String>) -> String {
    match theme {
        Some(theme) => format!(" (theme `{}`)", theme),
        None => String::new(),
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Serialization(format!("YAML: {}", err))
    }
}
