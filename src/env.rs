use std::collections::HashMap;

/// Where `${name}` substitutions look once the property map has no entry.
///
/// A reference that resolves to neither a property nor (when enabled) an
/// environment variable is always an error; there is no silent empty-string
/// fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EnvSource {
    /// Only already-parsed properties resolve.
    Disabled,
    /// Read the process environment at lookup time.
    #[default]
    Process,
    /// A fixed snapshot of variables.
    Fixed(HashMap<String, String>),
}

impl EnvSource {
    /// Snapshot the given variables.
    ///
    /// Takes an iterator so tests can pass synthetic data instead of `std::env::vars()`.
    pub fn fixed(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        EnvSource::Fixed(vars.into_iter().collect())
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, EnvSource::Disabled)
    }

    /// Look up `name` by exact (case-sensitive) match.
    pub fn lookup(&self, name: &str) -> Option<String> {
        match self {
            EnvSource::Disabled => None,
            EnvSource::Process => std::env::var(name).ok(),
            EnvSource::Fixed(vars) => vars.get(name).cloned(),
        }
    }
}
