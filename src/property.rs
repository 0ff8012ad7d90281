use std::fmt;

use serde::{Deserialize, Serialize};

use crate::convert::Converter;
use crate::error::{ConfigError, FormatError, Location};

/// A resolved name/value pair and where it was defined.
///
/// The value has already been through escape and `${}` processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: String,
    pub source: String,
    pub line: usize,
}

impl Property {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        source: impl Into<String>,
        line: usize,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            source: source.into(),
            line,
        }
    }

    pub fn location(&self) -> Location {
        Location::new(self.source.clone(), self.line, 0)
    }

    /// Convert the value, reporting a failure against this property.
    pub fn value_as<T>(&self, converter: &impl Converter<T>) -> Result<T, ConfigError> {
        converter
            .convert(&self.value)
            .map_err(|e| self.invalid_value(e))
    }

    /// Wrap a converter failure with this property's name and location.
    ///
    /// The offending value is the one the error names (e.g. a single list
    /// item), falling back to the whole property value.
    pub fn invalid_value(&self, err: FormatError) -> ConfigError {
        let value = match err.value {
            Some(v) if !v.is_empty() => v,
            _ => self.value.clone(),
        };
        ConfigError::InvalidPropertyValue {
            location: self.location(),
            name: self.name.clone(),
            value,
            reason: err.description,
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.source.is_empty() {
            return write!(f, "{}={}", self.name, self.value);
        }
        write!(f, "[{}:{}]{}={}", self.source, self.line, self.name, self.value)
    }
}

/// True if `name` is a legal dotted property name:
/// `[A-Za-z][A-Za-z0-9_]*(\.[A-Za-z0-9_]+)*`.
pub fn is_legal_name(name: &str) -> bool {
    let mut segments = name.split('.');
    let Some(first) = segments.next() else {
        return false;
    };
    if !first.starts_with(|c: char| c.is_ascii_alphabetic()) || !is_segment(first) {
        return false;
    }
    segments.all(is_segment)
}

fn is_segment(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert;

    #[test]
    fn legal_names() {
        for name in ["a", "abc", "a1", "a_b", "a.b", "a.b.c", "a.1", "a._", "A9_.x_9"] {
            assert!(is_legal_name(name), "{name} should be legal");
        }
    }

    #[test]
    fn illegal_names() {
        for name in ["", "1a", "_a", ".a", "a.", "a..b", "a-b", "a b", "é", "a.b."] {
            assert!(!is_legal_name(name), "{name:?} should be illegal");
        }
    }

    #[test]
    fn display_shows_provenance() {
        let p = Property::new("server.port", "80", "app.cfg", 3);
        assert_eq!(p.to_string(), "[app.cfg:3]server.port=80");
        let bare = Property::new("x", "1", "", 0);
        assert_eq!(bare.to_string(), "x=1");
    }

    #[test]
    fn value_as_converts() {
        let p = Property::new("n", "42", "t", 1);
        assert_eq!(p.value_as(&convert::int()).unwrap(), 42);
    }

    #[test]
    fn value_as_reports_property_context() {
        let p = Property::new("n", "forty", "t.cfg", 7);
        let err = p.value_as(&convert::int()).unwrap_err();
        match err {
            ConfigError::InvalidPropertyValue {
                location,
                name,
                value,
                ..
            } => {
                assert_eq!(location, Location::new("t.cfg", 7, 0));
                assert_eq!(name, "n");
                assert_eq!(value, "forty");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_value_prefers_item_text() {
        let p = Property::new("ports", "1, x, 3", "t.cfg", 2);
        let err = p.invalid_value(FormatError::with_value("x", "Value is not a valid integer"));
        assert!(err.to_string().contains("\"x\""));
    }

    #[test]
    fn serializes_as_json_object() {
        let p = Property::new("a", "1", "s", 1);
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["name"], "a");
        assert_eq!(json["line"], 1);
    }
}
