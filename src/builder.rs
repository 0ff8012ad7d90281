use crate::env::EnvSource;
use crate::error::ConfigError;
use crate::file;
use crate::map::PropertyMap;
use crate::registry::Registry;
use crate::resolve::{self, ResolveInput};
use crate::types::{DuplicateMode, SearchMode, SearchPath};

/// Entry point for loading a blockconf configuration.
pub struct Blockconf;

impl Blockconf {
    pub fn builder<T: 'static>(registry: Registry<T>) -> LoaderBuilder<T> {
        LoaderBuilder::new(registry)
    }
}

/// Builder for discovering, layering and binding configuration files.
///
/// Controls two orthogonal axes (see [`types`](crate::types)):
///
/// - **Discovery**: [`search_paths()`](Self::search_paths): where to look for the
///   top-level config file.
/// - **Resolution**: [`search_mode()`](Self::search_mode): merge all or pick one.
///
/// Settings left unset here keep whatever the registry was built with.
pub struct LoaderBuilder<T> {
    registry: Registry<T>,
    app_name: Option<String>,
    file_name: Option<String>,
    search_paths: Option<Vec<SearchPath>>,
    search_mode: SearchMode,
    env: Option<EnvSource>,
    strict: Option<bool>,
    duplicate_property_action: Option<DuplicateMode>,
    included_property_action: Option<DuplicateMode>,
}

impl<T: 'static> LoaderBuilder<T> {
    fn new(registry: Registry<T>) -> Self {
        Self {
            registry,
            app_name: None,
            file_name: None,
            search_paths: None,
            search_mode: SearchMode::default(),
            env: None,
            strict: None,
            duplicate_property_action: None,
            included_property_action: None,
        }
    }

    /// Set the application name. This derives sensible defaults:
    /// - `file_name` → `"{app_name}.cfg"`
    /// - `search_paths` → `[SearchPath::Platform]`
    pub fn app_name(mut self, name: &str) -> Self {
        self.app_name = Some(name.to_string());
        self
    }

    /// Override the config file name (default: `"{app_name}.cfg"`).
    pub fn file_name(mut self, name: &str) -> Self {
        self.file_name = Some(name.to_string());
        self
    }

    /// Replace the default search paths entirely.
    ///
    /// Paths are listed in **priority-ascending** order: the last entry has the
    /// highest priority. See [`SearchPath`] for the available variants.
    pub fn search_paths(mut self, paths: Vec<SearchPath>) -> Self {
        self.search_paths = Some(paths);
        self
    }

    /// Append a search path without replacing the defaults.
    /// If no paths have been set yet, starts from the default `[Platform]`.
    pub fn add_search_path(mut self, path: SearchPath) -> Self {
        self.search_paths
            .get_or_insert_with(|| vec![SearchPath::Platform])
            .push(path);
        self
    }

    /// Set the search mode (default: [`SearchMode::Merge`]).
    pub fn search_mode(mut self, mode: SearchMode) -> Self {
        self.search_mode = mode;
        self
    }

    /// Stop `${name}` references from falling back to environment variables.
    pub fn no_env(mut self) -> Self {
        self.env = Some(EnvSource::Disabled);
        self
    }

    /// Resolve `${name}` fallbacks against these pairs instead of the process
    /// environment.
    pub fn env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = Some(EnvSource::fixed(
            vars.into_iter().map(|(k, v)| (k.into(), v.into())),
        ));
        self
    }

    /// In strict mode, unknown properties are errors. Lenient mode logs and
    /// skips them.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    pub fn duplicate_property_action(mut self, mode: DuplicateMode) -> Self {
        self.duplicate_property_action = Some(mode);
        self
    }

    pub fn included_property_action(mut self, mode: DuplicateMode) -> Self {
        self.included_property_action = Some(mode);
        self
    }

    /// Resolve the effective app name, or error if not set.
    fn effective_app_name(&self) -> Result<&str, ConfigError> {
        self.app_name.as_deref().ok_or(ConfigError::AppNameRequired)
    }

    fn effective_file_name(&self) -> Result<String, ConfigError> {
        if let Some(name) = &self.file_name {
            return Ok(name.clone());
        }
        let app = self.effective_app_name()?;
        Ok(format!("{app}.cfg"))
    }

    fn effective_search_paths(&self) -> Vec<SearchPath> {
        if let Some(paths) = &self.search_paths {
            return paths.clone();
        }
        vec![SearchPath::Platform]
    }

    /// Fold the builder's overrides into the registry.
    fn effective_registry(self) -> Registry<T> {
        let mut options = self.registry.options().clone();
        if let Some(env) = self.env {
            options.env = env;
        }
        if let Some(mode) = self.duplicate_property_action {
            options.duplicate_property_action = mode;
        }
        if let Some(mode) = self.included_property_action {
            options.included_property_action = mode;
        }

        let mut registry = self.registry.parser_options(options);
        if let Some(strict) = self.strict {
            registry = registry.ignore_unknown_properties(!strict);
        }
        registry
    }

    fn build_input(&self) -> Result<ResolveInput, ConfigError> {
        let app_name = self.effective_app_name()?;
        let file_name = self.effective_file_name()?;
        let search_paths = self.effective_search_paths();

        let files = file::load_config_files(&search_paths, &file_name, app_name, self.search_mode)?;
        Ok(ResolveInput {
            files,
            default_source: file_name,
        })
    }

    /// Load, layer and bind the configuration into `target`.
    ///
    /// Returns the layered properties that were bound.
    pub fn load_into(self, target: &mut T) -> Result<PropertyMap, ConfigError> {
        let input = self.build_input()?;
        let mut registry = self.effective_registry();
        resolve::resolve(&mut registry, target, input)
    }

    /// Like [`load_into`](Self::load_into), starting from `T::default()`.
    pub fn load(self) -> Result<T, ConfigError>
    where
        T: Default,
    {
        let mut target = T::default();
        self.load_into(&mut target)?;
        Ok(target)
    }
}
