//! Process-lifetime cache of database ids for lookup records.
//!
//! Partitioned by [`LookupKind`] so identically named records of different
//! kinds never collide. Each partition has its own lock.

use parking_lot::RwLock;
use std::collections::HashMap;

use crate::error::ResolveError;

/// Record kinds with their own id space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKind {
    User,
    Operation,
    Site,
    Web,
    FileName,
    FileExtension,
    ItemType,
    Meeting,
    PageTitle,
    Browser,
    OperatingSystem,
    Country,
    City,
}

impl LookupKind {
    pub const ALL: [LookupKind; 13] = [
        LookupKind::User,
        LookupKind::Operation,
        LookupKind::Site,
        LookupKind::Web,
        LookupKind::FileName,
        LookupKind::FileExtension,
        LookupKind::ItemType,
        LookupKind::Meeting,
        LookupKind::PageTitle,
        LookupKind::Browser,
        LookupKind::OperatingSystem,
        LookupKind::Country,
        LookupKind::City,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Thread-safe `(kind, name) -> id` map. Entries never expire.
pub struct TypedKeyCache {
    partitions: [RwLock<HashMap<String, i64>>; LookupKind::ALL.len()],
}

impl TypedKeyCache {
    pub fn new() -> Self {
        Self {
            partitions: std::array::from_fn(|_| RwLock::new(HashMap::new())),
        }
    }

    fn partition(&self, kind: LookupKind) -> &RwLock<HashMap<String, i64>> {
        &self.partitions[kind.index()]
    }

    /// Cached id for `name`, if one was stored.
    pub fn get(&self, kind: LookupKind, name: &str) -> Option<i64> {
        self.partition(kind).read().get(name).copied()
    }

    /// Store or overwrite the id for `name`. Last writer wins.
    ///
    /// # Errors
    /// Returns `ResolveError::InvalidArgument` for an empty name.
    pub fn put(&self, kind: LookupKind, name: &str, id: i64) -> Result<(), ResolveError> {
        if name.is_empty() {
            return Err(ResolveError::InvalidArgument(format!(
                "empty name for {:?} lookup",
                kind
            )));
        }

        self.partition(kind).write().insert(name.to_string(), id);
        Ok(())
    }

    /// Cached id, or the id produced by `create` which is then cached.
    ///
    /// `create` runs without any lock held; two racing callers may both run it
    /// and the later `put` wins. Nothing is cached when `create` fails.
    ///
    /// # Errors
    /// Propagates errors from `create`, and `InvalidArgument` for an empty name.
    pub fn get_or_insert_with<E, F>(&self, kind: LookupKind, name: &str, create: F) -> Result<i64, E>
    where
        F: FnOnce() -> Result<i64, E>,
        E: From<ResolveError>,
    {
        if let Some(id) = self.get(kind, name) {
            return Ok(id);
        }

        let id = create()?;
        self.put(kind, name, id)?;
        Ok(id)
    }

    /// Number of cached names for `kind`.
    pub fn len(&self, kind: LookupKind) -> usize {
        self.partition(kind).read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.iter().all(|p| p.read().is_empty())
    }
}

impl Default for TypedKeyCache {
    fn default() -> Self {
        Self::new()
    }
}
