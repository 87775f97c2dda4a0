//! Invalidation targets declared by mutations.

use crate::keys::ResourceKey;

/// One invalidation target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Invalidation {
    /// Exactly this key.
    Exact(ResourceKey),
    /// Every cached key starting with this key, the key itself included.
    Prefix(ResourceKey),
}

impl Invalidation {
    pub fn matches(&self, key: &ResourceKey) -> bool {
        match self {
            Self::Exact(target) => target == key,
            Self::Prefix(prefix) => key.starts_with(prefix),
        }
    }

    pub fn key(&self) -> &ResourceKey {
        match self {
            Self::Exact(key) | Self::Prefix(key) => key,
        }
    }
}

/// Ordered, duplicate-free set of invalidation targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationSet {
    targets: Vec<Invalidation>,
}

impl InvalidationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exact(mut self, key: ResourceKey) -> Self {
        self.push(Invalidation::Exact(key));
        self
    }

    pub fn prefix(mut self, key: ResourceKey) -> Self {
        self.push(Invalidation::Prefix(key));
        self
    }

    pub fn push(&mut self, target: Invalidation) {
        if !self.targets.contains(&target) {
            self.targets.push(target);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Invalidation> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Whether applying this set would mark `key` stale.
    pub fn matches(&self, key: &ResourceKey) -> bool {
        self.targets.iter().any(|target| target.matches(key))
    }
}

impl<'a> IntoIterator for &'a InvalidationSet {
    type Item = &'a Invalidation;
    type IntoIter = std::slice::Iter<'a, Invalidation>;

    fn into_iter(self) -> Self::IntoIter {
        self.targets.iter()
    }
}
