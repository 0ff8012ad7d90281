use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// What to do when a property name is defined a second time.
///
/// The parser applies two independent policies: one for duplicates within the
/// file being parsed, one for names that arrive from a different source (an
/// included file, or another layer found during discovery).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateMode {
    /// Fail, citing where the name was first defined.
    Error,
    /// Keep the existing definition.
    Ignore,
    /// Replace the existing definition with the new one.
    Overwrite,
}

/// Where to search for the top-level config file.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPath {
    /// Platform config directory (XDG on Linux, ~/Library/Application Support on macOS).
    Platform,
    /// A subdirectory under the user's home directory, e.g. `Home(".myapp")`.
    Home(&'static str),
    /// Current working directory.
    Cwd,
    /// An explicit directory.
    Path(PathBuf),
    /// The current working directory and its ancestors, shallowest first.
    Ancestors(Boundary),
}

/// How far an [`Ancestors`](SearchPath::Ancestors) walk goes.
#[derive(Debug, Clone, PartialEq)]
pub enum Boundary {
    /// Walk to the filesystem root.
    Root,
    /// Stop (inclusive) at the first directory containing an entry with this name.
    Marker(&'static str),
}

/// What to do when more than one top-level config file is found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchMode {
    /// Parse every file found; later files overwrite earlier ones property by property.
    #[default]
    Merge,
    /// Use only the highest-priority file found.
    FirstMatch,
}
