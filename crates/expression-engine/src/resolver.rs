//! Name resolution for non-static operands.

use crate::{error::Result, operand::Path};
use model::core::value::Value;
use std::collections::BTreeMap;

/// Looks up the value behind a name. `Ok(None)` means the base name is not
/// known to this resolver.
pub trait Resolver {
    fn resolve(&self, path: &Path) -> Result<Option<Value>>;
}

/// Knows no names.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyResolver;

impl Resolver for EmptyResolver {
    fn resolve(&self, _path: &Path) -> Result<Option<Value>> {
        Ok(None)
    }
}

/// Named base values registered up front, e.g. `portal` or `request`.
#[derive(Debug, Clone, Default)]
pub struct MapResolver {
    bases: BTreeMap<String, Value>,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, base: &str, value: impl Into<Value>) -> Self {
        self.insert(base, value);
        self
    }

    pub fn insert(&mut self, base: &str, value: impl Into<Value>) {
        self.bases.insert(base.to_string(), value.into());
    }

    pub fn contains(&self, base: &str) -> bool {
        self.bases.contains_key(base)
    }
}

impl Resolver for MapResolver {
    fn resolve(&self, path: &Path) -> Result<Option<Value>> {
        Ok(self
            .bases
            .get(path.base())
            .map(|value| value.get_path(path.rest())))
    }
}

/// Binds one base name to a value and defers every other name to its parent.
pub struct ScopedResolver<'a> {
    name: String,
    value: Value,
    parent: &'a dyn Resolver,
}

impl<'a> ScopedResolver<'a> {
    pub fn new(name: &str, value: Value, parent: &'a dyn Resolver) -> Self {
        Self {
            name: name.to_string(),
            value,
            parent,
        }
    }
}

impl Resolver for ScopedResolver<'_> {
    fn resolve(&self, path: &Path) -> Result<Option<Value>> {
        if path.base() == self.name {
            return Ok(Some(self.value.get_path(path.rest())));
        }
        self.parent.resolve(path)
    }
}
