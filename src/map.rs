use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;
use std::ops::Bound;

use serde::{Deserialize, Serialize};

use crate::convert::{self, Converter};
use crate::error::ConfigError;
use crate::property::Property;

/// Parsed properties keyed by name, iterated in lexicographic name order.
///
/// The ordering is what makes [`with_prefix`](Self::with_prefix) a range
/// scan and what the registry's merge-join relies on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyMap {
    props: BTreeMap<String, Property>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `property`, replacing any existing entry with the same name.
    pub fn add(&mut self, property: Property) -> Option<Property> {
        self.props.insert(property.name.clone(), property)
    }

    pub fn get(&self, name: &str) -> Result<&Property, ConfigError> {
        self.find(name)
            .ok_or_else(|| ConfigError::PropertyNotFound(name.to_string()))
    }

    pub fn find(&self, name: &str) -> Option<&Property> {
        self.props.get(name)
    }

    pub fn has_key(&self, name: &str) -> bool {
        self.props.contains_key(name)
    }

    pub fn erase(&mut self, name: &str) -> Option<Property> {
        self.props.remove(name)
    }

    pub fn clear(&mut self) {
        self.props.clear();
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.props.values(),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.props.keys().map(String::as_str)
    }

    /// Properties whose name starts with `prefix`, in name order.
    ///
    /// This is a plain string prefix: `with_prefix("a.b")` also yields `a.bc`.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a Property> {
        self.props
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(name, _)| name.starts_with(prefix))
            .map(|(_, p)| p)
    }

    pub fn matching<'a>(
        &'a self,
        mut predicate: impl FnMut(&Property) -> bool + 'a,
    ) -> impl Iterator<Item = &'a Property> {
        self.iter().filter(move |p| predicate(*p))
    }

    pub fn value_or(&self, name: &str, default: &str) -> String {
        self.find(name)
            .map_or_else(|| default.to_string(), |p| p.value.clone())
    }

    pub fn int_or(&self, name: &str, default: i64) -> Result<i64, ConfigError> {
        self.value_as_or(name, default, &convert::int())
    }

    pub fn double_or(&self, name: &str, default: f64) -> Result<f64, ConfigError> {
        self.value_as_or(name, default, &convert::double())
    }

    /// Convert the named property, or return `default` when it is absent.
    /// A present but unconvertible value is an error, not a default.
    pub fn value_as_or<T>(
        &self,
        name: &str,
        default: T,
        converter: &impl Converter<T>,
    ) -> Result<T, ConfigError> {
        match self.find(name) {
            Some(p) => p.value_as(converter),
            None => Ok(default),
        }
    }
}

impl fmt::Display for PropertyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for p in self.iter() {
            writeln!(f, "{p}")?;
        }
        Ok(())
    }
}

pub struct Iter<'a> {
    inner: btree_map::Values<'a, String, Property>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Property;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a PropertyMap {
    type Item = &'a Property;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for PropertyMap {
    type Item = Property;
    type IntoIter = btree_map::IntoValues<String, Property>;

    fn into_iter(self) -> Self::IntoIter {
        self.props.into_values()
    }
}

impl FromIterator<Property> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = Property>>(iter: I) -> Self {
        let mut map = PropertyMap::new();
        map.extend(iter);
        map
    }
}

impl Extend<Property> for PropertyMap {
    fn extend<I: IntoIterator<Item = Property>>(&mut self, iter: I) {
        for p in iter {
            self.add(p);
        }
    }
}
