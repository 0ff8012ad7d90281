//! Finding the top-level config file.
//!
//! Every [`SearchPath`] names one directory except `Ancestors`, which stands
//! for the chain of directories from the start directory up to its
//! [`Boundary`], outermost first. The expanded list is priority-ascending:
//! the last directory wins.
//!
//! [`SearchMode::Merge`] reads `{dir}/{file_name}` from every directory that
//! has one. [`SearchMode::FirstMatch`] walks the list from the top priority
//! down and stops at the first hit. A missing file is never an error; any
//! other read failure is. Files pulled in by `include` are the parser's
//! business, not this module's.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ConfigError;
use crate::types::{Boundary, SearchMode, SearchPath};

/// The one directory `sp` stands for. `None` when it cannot be determined
/// (no home directory, unreadable CWD) and for `Ancestors`.
pub fn search_dir(sp: &SearchPath, app_name: &str) -> Option<PathBuf> {
    match sp {
        SearchPath::Platform => directories::ProjectDirs::from("", "", app_name)
            .map(|dirs| dirs.config_dir().to_path_buf()),
        SearchPath::Home(subdir) => {
            directories::UserDirs::new().map(|dirs| dirs.home_dir().join(subdir))
        }
        SearchPath::Cwd => std::env::current_dir().ok(),
        SearchPath::Path(dir) => Some(dir.clone()),
        SearchPath::Ancestors(_) => None,
    }
}

/// `start` and its parents up to `boundary`, outermost first.
///
/// A [`Boundary::Marker`] directory is included; when no directory has the
/// marker the walk reaches the filesystem root.
pub fn ancestor_dirs(start: &Path, boundary: &Boundary) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    for dir in start.ancestors() {
        dirs.push(dir.to_path_buf());
        if let Boundary::Marker(marker) = boundary
            && dir.join(marker).exists()
        {
            break;
        }
    }
    dirs.reverse();
    dirs
}

/// Expand `search_paths` into concrete directories, lowest priority first.
///
/// `Ancestors` walks up from `start`, or from the current directory when
/// `start` is `None`.
pub fn search_dirs(search_paths: &[SearchPath], app_name: &str, start: Option<&Path>) -> Vec<PathBuf> {
    let cwd = match start {
        Some(_) => None,
        None => std::env::current_dir().ok(),
    };
    let start = start.or(cwd.as_deref());

    let mut dirs = Vec::new();
    for sp in search_paths {
        match (sp, start) {
            (SearchPath::Ancestors(boundary), Some(start)) => {
                dirs.extend(ancestor_dirs(start, boundary));
            }
            (SearchPath::Ancestors(_), None) => {
                debug!("no working directory; skipping ancestor search");
            }
            (other, _) => dirs.extend(search_dir(other, app_name)),
        }
    }
    dirs
}

/// Read the config files `mode` selects from `dirs`, lowest priority first.
pub fn read_config_files(
    dirs: &[PathBuf],
    file_name: &str,
    mode: SearchMode,
) -> Result<Vec<(PathBuf, String)>, ConfigError> {
    let mut found = Vec::new();
    match mode {
        SearchMode::Merge => {
            for dir in dirs {
                found.extend(read_optional(dir.join(file_name))?);
            }
        }
        SearchMode::FirstMatch => {
            for dir in dirs.iter().rev() {
                if let Some(file) = read_optional(dir.join(file_name))? {
                    found.push(file);
                    break;
                }
            }
        }
    }
    Ok(found)
}

/// Discover and read the top-level config files.
pub fn load_config_files(
    search_paths: &[SearchPath],
    file_name: &str,
    app_name: &str,
    mode: SearchMode,
) -> Result<Vec<(PathBuf, String)>, ConfigError> {
    let dirs = search_dirs(search_paths, app_name, None);
    read_config_files(&dirs, file_name, mode)
}

fn read_optional(path: PathBuf) -> Result<Option<(PathBuf, String)>, ConfigError> {
    match std::fs::read_to_string(&path) {
        Ok(text) => {
            debug!(file = %path.display(), "found config file");
            Ok(Some((path, text)))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(file = %path.display(), "no config file");
            Ok(None)
        }
        Err(source) => Err(ConfigError::Io { path, source }),
    }
}
