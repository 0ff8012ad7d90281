//! Binds parsed properties to an application settings value.
//!
//! A [`Registry<T>`] holds one handler per property name or name prefix.
//! Handlers are registered up front, and registration refuses any handler
//! that another one would shadow. [`bind`](Registry::bind) then walks the
//! sorted handler table and the sorted [`PropertyMap`] in a single pass,
//! dispatching each property to its handler, and fails on the first
//! required property that is missing or unknown property that is present.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::convert::Converter;
use crate::error::{ConfigError, FormatError};
use crate::map::PropertyMap;
use crate::parser::{Parser, ParserOptions};
use crate::property::{Property, is_legal_name};

type Handler<T> = Box<dyn Fn(&mut T, &Property) -> Result<(), FormatError>>;

/// Whether a registered property must be present, and whether it may be empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Binding {
    pub required: bool,
    pub allow_empty: bool,
}

impl Binding {
    pub fn optional() -> Self {
        Self::default()
    }

    pub fn required() -> Self {
        Self {
            required: true,
            allow_empty: false,
        }
    }

    pub fn allow_empty(self) -> Self {
        Self {
            allow_empty: true,
            ..self
        }
    }
}

struct PropertyHandler<T> {
    name: String,
    prefix: bool,
    binding: Binding,
    found: bool,
    handler: Handler<T>,
}

impl<T> PropertyHandler<T> {
    fn apply(&mut self, target: &mut T, property: &Property) -> Result<(), ConfigError> {
        self.found = true;
        if property.value.is_empty() && !self.binding.allow_empty {
            return Err(ConfigError::InvalidPropertyValue {
                location: property.location(),
                name: property.name.clone(),
                value: String::new(),
                reason: "Value is empty".into(),
            });
        }
        (self.handler)(target, property).map_err(|e| property.invalid_value(e))
    }

    fn is_missing(&self) -> bool {
        self.binding.required && !self.found
    }
}

pub struct Registry<T> {
    handlers: BTreeMap<String, PropertyHandler<T>>,
    ignore_unknown_properties: bool,
    parser_options: ParserOptions,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            handlers: BTreeMap::new(),
            ignore_unknown_properties: false,
            parser_options: ParserOptions::default(),
        }
    }
}

impl<T: 'static> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip properties that match no handler instead of failing.
    pub fn ignore_unknown_properties(mut self, ignore: bool) -> Self {
        self.ignore_unknown_properties = ignore;
        self
    }

    /// Options for the parser used by [`load_file`](Self::load_file) and
    /// [`load_text`](Self::load_text).
    pub fn parser_options(mut self, options: ParserOptions) -> Self {
        self.parser_options = options;
        self
    }

    pub fn ignores_unknown_properties(&self) -> bool {
        self.ignore_unknown_properties
    }

    pub fn options(&self) -> &ParserOptions {
        &self.parser_options
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Register `handler` for the property `name`, or for every property
    /// starting with `name` when `prefix` is set.
    ///
    /// Fails if the name is not legal (a prefix may end in one `.`), if it is
    /// already registered, or if it overlaps an existing registration: a new
    /// prefix may not cover an existing name, and no existing prefix may
    /// cover the new name.
    pub fn register(
        &mut self,
        name: &str,
        prefix: bool,
        binding: Binding,
        handler: impl Fn(&mut T, &Property) -> Result<(), FormatError> + 'static,
    ) -> Result<(), ConfigError> {
        if prefix {
            let stem = name.strip_suffix('.').unwrap_or(name);
            if !is_legal_name(stem) {
                return Err(ConfigError::Registration(format!(
                    "Cannot register property prefix for invalid prefix \"{name}\""
                )));
            }
        } else if !is_legal_name(name) {
            return Err(ConfigError::Registration(format!(
                "Cannot register property with invalid name \"{name}\""
            )));
        }

        if self.handlers.contains_key(name) {
            return Err(ConfigError::Registration(format!(
                "Property \"{name}\" has already been registered"
            )));
        }

        if prefix
            && let Some(existing) = self.handlers.keys().find(|k| k.starts_with(name))
        {
            return Err(ConfigError::Registration(format!(
                "Cannot register handler for prefix \"{name}\" because a \
                 previously-registered property (\"{existing}\") begins with that prefix"
            )));
        }

        if let Some(existing) = self
            .handlers
            .values()
            .find(|h| h.prefix && name.starts_with(&h.name))
        {
            return Err(ConfigError::Registration(format!(
                "Cannot register handler for property \"{name}\" because a handler \
                 for properties with prefix \"{}\" has already been registered",
                existing.name
            )));
        }

        self.handlers.insert(
            name.to_string(),
            PropertyHandler {
                name: name.to_string(),
                prefix,
                binding,
                found: false,
                handler: Box::new(handler),
            },
        );
        Ok(())
    }

    /// Register a raw handler for one property.
    pub fn handler(
        &mut self,
        name: &str,
        binding: Binding,
        handler: impl Fn(&mut T, &Property) -> Result<(), FormatError> + 'static,
    ) -> Result<(), ConfigError> {
        self.register(name, false, binding, handler)
    }

    /// Convert property `name` and store it with `setter`.
    ///
    /// ```ignore
    /// registry.property("server.port", Binding::required(), convert::int_in_range(1, 65535),
    ///     |s: &mut Settings, v| s.port = v as u16)?;
    /// ```
    pub fn property<V: 'static>(
        &mut self,
        name: &str,
        binding: Binding,
        converter: impl Converter<V> + 'static,
        setter: impl Fn(&mut T, V) + 'static,
    ) -> Result<(), ConfigError> {
        self.register(name, false, binding, move |target, p| {
            setter(target, converter.convert(&p.value)?);
            Ok(())
        })
    }

    /// Convert every property under `prefix` and hand it to `sink` along
    /// with the full property name.
    pub fn prefix<V: 'static>(
        &mut self,
        prefix: &str,
        binding: Binding,
        converter: impl Converter<V> + 'static,
        sink: impl Fn(&mut T, &str, V) + 'static,
    ) -> Result<(), ConfigError> {
        self.register(prefix, true, binding, move |target, p| {
            sink(target, &p.name, converter.convert(&p.value)?);
            Ok(())
        })
    }

    /// Dispatch every property in `properties` to its handler.
    ///
    /// `source_name` names the configuration in missing-property errors.
    /// Handlers run in property name order; on failure, values bound before
    /// the failing property stay bound.
    pub fn bind(
        &mut self,
        target: &mut T,
        source_name: &str,
        properties: &PropertyMap,
    ) -> Result<(), ConfigError> {
        debug!(source = source_name, properties = properties.len(), "binding properties");
        let ignore_unknown = self.ignore_unknown_properties;
        let props: Vec<&Property> = properties.iter().collect();
        let mut handlers: Vec<&mut PropertyHandler<T>> = self.handlers.values_mut().collect();
        for h in handlers.iter_mut() {
            h.found = false;
        }

        let missing = |h: &PropertyHandler<T>| ConfigError::RequiredPropertyMissing {
            source_name: source_name.to_string(),
            name: h.name.clone(),
        };
        let unknown = |p: &Property| ConfigError::UnknownProperty {
            location: p.location(),
            name: p.name.clone(),
        };

        let (mut i, mut j) = (0, 0);
        while i < props.len() && j < handlers.len() {
            let p = props[i];
            let h = &mut *handlers[j];
            if p.name == h.name {
                h.apply(target, p)?;
                i += 1;
                if !h.prefix {
                    j += 1;
                }
            } else if h.prefix && p.name.starts_with(&h.name) {
                h.apply(target, p)?;
                i += 1;
            } else if h.name < p.name {
                if h.is_missing() {
                    return Err(missing(h));
                }
                j += 1;
            } else if ignore_unknown {
                debug!(property = %p, "ignoring unknown property");
                i += 1;
            } else {
                return Err(unknown(p));
            }
        }

        if let Some(h) = handlers[j..].iter().find(|h| h.is_missing()) {
            return Err(missing(h));
        }
        for p in &props[i..] {
            if !ignore_unknown {
                return Err(unknown(p));
            }
            debug!(property = %p, "ignoring unknown property");
        }
        Ok(())
    }

    /// Parse `path` and bind the result.
    pub fn load_file(&mut self, target: &mut T, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let properties = Parser::new(self.parser_options.clone()).parse_file(path)?;
        self.bind(target, &path.display().to_string(), &properties)
    }

    /// Parse `text` (named `source`) and bind the result.
    pub fn load_text(&mut self, target: &mut T, source: &str, text: &str) -> Result<(), ConfigError> {
        let properties = Parser::new(self.parser_options.clone()).parse_text(source, text)?;
        self.bind(target, source, &properties)
    }
}
