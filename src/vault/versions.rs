//! Per-mount KV version cache shared by every worker of every search.
//!
//! The catalog's answer seeds the cache; a list or read that reveals a v2
//! mount is really v1 downgrades it with a compare-and-set, so concurrent
//! workers that hit the same 404 flip the entry once.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::mounts::{KvVersion, Mount};

#[derive(Debug, Default)]
pub struct KvVersionCache {
    versions: DashMap<String, KvVersion>,
}

impl KvVersionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a discovered mount. An earlier correction wins over the catalog.
    pub fn observe(&self, mount: &Mount) -> Mount {
        let version = *self.versions.entry(mount.path.clone()).or_insert(mount.version);
        mount.with_version(version)
    }

    /// The mount with its currently known version.
    pub fn resolve(&self, mount: &Mount) -> Mount {
        match self.versions.get(&mount.path) {
            Some(version) => mount.with_version(*version),
            None => mount.clone(),
        }
    }

    pub fn get(&self, mount_path: &str) -> Option<KvVersion> {
        self.versions.get(mount_path).map(|v| *v)
    }

    /// Compare-and-set V2 -> V1. Returns `true` only for the caller that
    /// performed the transition.
    pub fn downgrade_to_v1(&self, mount_path: &str) -> bool {
        match self.versions.entry(mount_path.to_string()) {
            Entry::Occupied(mut entry) => {
                if *entry.get() == KvVersion::V2 {
                    entry.insert(KvVersion::V1);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(KvVersion::V1);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
