use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Where something happened: a source name plus a 1-based line and column.
///
/// A line or column of 0 means "unknown" and is left out of the rendered text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub source: String,
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(source: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            source: source.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (0, _) => write!(f, "{}", self.source),
            (line, 0) => write!(f, "line {line} of {}", self.source),
            (line, column) => write!(f, "line {line}, column {column} of {}", self.source),
        }
    }
}

/// A value could not be decoded or converted.
///
/// Carries no property context: whoever owns the value re-wraps it into a
/// [`ConfigError`] that says which property and where.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render_format_error(.value, .description))]
pub struct FormatError {
    /// The offending text, when it differs from the whole property value
    /// (e.g. one item of a list).
    pub value: Option<String>,
    pub description: String,
}

impl FormatError {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            value: None,
            description: description.into(),
        }
    }

    pub fn with_value(value: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            description: description.into(),
        }
    }
}

fn render_format_error(value: &Option<String>, description: &str) -> String {
    match value {
        Some(v) if !v.is_empty() => format!("{description} (parsing \"{v}\")"),
        _ => description.to_string(),
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Syntax error at {location}: {message}")]
    Syntax { location: Location, message: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot include a file from within a block at {location}")]
    IncludeInBlock { location: Location },

    #[error(
        "Including \"{target}\" at {location} would produce an include loop: {}",
        render_chain(.chain, .target)
    )]
    IncludeCycle {
        location: Location,
        target: String,
        /// Ancestor files, outermost first, ending with the including file.
        chain: Vec<String>,
    },

    #[error(
        "Maximum include depth exceeded at {location}: {}",
        render_chain(.chain, .target)
    )]
    IncludeDepthExceeded {
        location: Location,
        target: String,
        chain: Vec<String>,
    },

    #[error("Property \"{name}\" at {location} defined twice; original definition at {original}")]
    DuplicateProperty {
        location: Location,
        name: String,
        original: Location,
    },

    #[error("Invalid property value at {location}: {source}")]
    ValueFormat {
        location: Location,
        source: FormatError,
    },

    #[error(
        "Invalid value \"{value}\" for configuration property {name} at {location}: {reason}"
    )]
    InvalidPropertyValue {
        location: Location,
        name: String,
        value: String,
        reason: String,
    },

    #[error("Required property \"{name}\" missing in {source_name}")]
    RequiredPropertyMissing { source_name: String, name: String },

    #[error("Unknown configuration property \"{name}\" at {location}")]
    UnknownProperty { location: Location, name: String },

    #[error("Registration error: {0}")]
    Registration(String),

    #[error("Property not found: {0}")]
    PropertyNotFound(String),

    #[error("App name is required: call .app_name() on the builder")]
    AppNameRequired,
}

impl ConfigError {
    /// The location the error points at, when it has one.
    pub fn location(&self) -> Option<&Location> {
        match self {
            ConfigError::Syntax { location, .. }
            | ConfigError::IncludeInBlock { location }
            | ConfigError::IncludeCycle { location, .. }
            | ConfigError::IncludeDepthExceeded { location, .. }
            | ConfigError::DuplicateProperty { location, .. }
            | ConfigError::ValueFormat { location, .. }
            | ConfigError::InvalidPropertyValue { location, .. }
            | ConfigError::UnknownProperty { location, .. } => Some(location),
            _ => None,
        }
    }

    pub(crate) fn syntax(location: Location, message: impl Into<String>) -> Self {
        ConfigError::Syntax {
            location,
            message: message.into(),
        }
    }
}

fn render_chain(chain: &[String], target: &str) -> String {
    let mut out = chain.join(" -> ");
    if !out.is_empty() {
        out.push_str(" -> ");
    }
    out.push_str(target);
    out
}
