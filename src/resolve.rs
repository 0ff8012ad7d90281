//! Core resolution pipeline: layer the top-level config files and bind them.
//!
//! Operates on pre-loaded data (`ResolveInput`) so the pipeline can be tested
//! with synthetic inputs. Only `include` directives inside the files touch
//! the filesystem. Steps:
//!
//! 1. Parse each file (includes are followed relative to that file)
//! 2. Layer the results, later files overwriting earlier ones by name
//! 3. Bind the layered properties through the registry

use std::path::PathBuf;

use tracing::debug;

use crate::error::ConfigError;
use crate::map::PropertyMap;
use crate::merge::merge_properties;
use crate::parser::Parser;
use crate::registry::Registry;
use crate::types::DuplicateMode;

/// All pre-loaded data needed to resolve a config.
pub struct ResolveInput {
    /// File contents in precedence order: first = lowest priority, last = highest.
    pub files: Vec<(PathBuf, String)>,
    /// Names the configuration in errors when no file was found.
    pub default_source: String,
}

/// Parse and layer `input.files`, then bind the result into `target`.
///
/// Returns the layered properties so callers can inspect what was bound.
pub fn resolve<T: 'static>(
    registry: &mut Registry<T>,
    target: &mut T,
    input: ResolveInput,
) -> Result<PropertyMap, ConfigError> {
    let parser = Parser::new(registry.options().clone());

    let mut merged = PropertyMap::new();
    for (path, content) in &input.files {
        let layer = parser.parse_text(&path.display().to_string(), content)?;
        debug!(file = %path.display(), properties = layer.len(), "layering config file");
        merge_properties(&mut merged, layer, DuplicateMode::Overwrite)?;
    }

    let source_name = match input.files.last() {
        Some((path, _)) => path.display().to_string(),
        None => input.default_source,
    };
    registry.bind(target, &source_name, &merged)?;
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{Mode, Settings, registry};
    use std::fs;
    use tempfile::TempDir;

    fn input(files: &[(&str, &str)]) -> ResolveInput {
        ResolveInput {
            files: files
                .iter()
                .map(|(p, c)| (PathBuf::from(p), c.to_string()))
                .collect(),
            default_source: "app.cfg".into(),
        }
    }

    #[test]
    fn single_file_binds() {
        let mut settings = Settings::default();
        let props = resolve(
            &mut registry(),
            &mut settings,
            input(&[("/etc/app.cfg", "server {\n  host = example.org\n  port = 8080\n}\n")]),
        )
        .unwrap();
        assert_eq!(settings.host, "example.org");
        assert_eq!(settings.port, 8080);
        assert_eq!(props.len(), 2);
    }

    #[test]
    fn later_file_overrides_earlier() {
        let mut settings = Settings::default();
        let props = resolve(
            &mut registry(),
            &mut settings,
            input(&[
                ("/etc/app.cfg", "server.host = base\nserver.port = 1000\nmode = slow\n"),
                ("/home/u/app.cfg", "server.port = 2000\n"),
            ]),
        )
        .unwrap();
        assert_eq!(settings.host, "base");
        assert_eq!(settings.port, 2000);
        assert_eq!(settings.mode, Mode::Slow);
        assert_eq!(props.get("server.port").unwrap().source, "/home/u/app.cfg");
    }

    #[test]
    fn no_files_still_reports_required() {
        let mut settings = Settings::default();
        let err = resolve(&mut registry(), &mut settings, input(&[])).unwrap_err();
        match err {
            ConfigError::RequiredPropertyMissing { source_name, name } => {
                assert_eq!(source_name, "app.cfg");
                assert_eq!(name, "server.host");
            }
            other => panic!("expected RequiredPropertyMissing, got {other:?}"),
        }
    }

    #[test]
    fn required_satisfied_by_lower_layer() {
        let mut settings = Settings::default();
        resolve(
            &mut registry(),
            &mut settings,
            input(&[("a.cfg", "server.host = a\n"), ("b.cfg", "tags = x, y\n")]),
        )
        .unwrap();
        assert_eq!(settings.host, "a");
        assert_eq!(settings.tags.len(), 2);
    }

    #[test]
    fn parse_error_stops_resolution() {
        let mut settings = Settings::default();
        let err = resolve(
            &mut registry(),
            &mut settings,
            input(&[("a.cfg", "server.host = a\n"), ("b.cfg", "server {\n")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Syntax { .. }));
        assert!(settings.host.is_empty());
    }

    #[test]
    fn unknown_property_rejected() {
        let mut settings = Settings::default();
        let err = resolve(
            &mut registry(),
            &mut settings,
            input(&[("a.cfg", "server.host = a\nserver.typo = 1\n")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProperty { ref name, .. } if name == "server.typo"));
    }

    #[test]
    fn includes_follow_the_top_level_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("limits.cfg"), "limits.cpu = 4\nlimits.mem = 512\n").unwrap();
        let top = dir.path().join("app.cfg");
        let content = "server.host = h\ninclude \"limits.cfg\"\n";

        let mut settings = Settings::default();
        resolve(
            &mut registry(),
            &mut settings,
            ResolveInput {
                files: vec![(top, content.to_string())],
                default_source: "app.cfg".into(),
            },
        )
        .unwrap();
        assert_eq!(settings.limits.get("limits.cpu"), Some(&4));
        assert_eq!(settings.limits.get("limits.mem"), Some(&512));
    }
}
