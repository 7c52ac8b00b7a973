//! Collection catalog
//!
//! The registry of collections and their transient metadata. Whether a
//! collection is versioned is fixed at creation time; every versioning hook
//! consults that flag and short-circuits when it is off.
//!
//! Executors never hold references to collection metadata across suspension
//! points. They carry a `CollectionHandle` - an index into this registry
//! stamped with the slot's generation - and re-resolve it after every yield;
//! a dropped (or dropped-and-recreated) collection makes the handle stale.

mod collection;
mod errors;

pub use collection::{CollectionMeta, CollectionOptions};
pub use errors::{CatalogError, CatalogResult};

use std::collections::HashMap;

use crate::index::{modify_transaction_time_index, IndexSpec};
use crate::observability::{Event, Logger, Severity};

/// Stable reference to a catalog slot, valid for one collection lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionHandle {
    slot: usize,
    generation: u64,
}

struct Slot {
    generation: u64,
    meta: Option<CollectionMeta>,
}

/// Registry of collections.
#[derive(Default)]
pub struct CollectionCatalog {
    slots: Vec<Slot>,
    by_name: HashMap<String, usize>,
}

impl CollectionCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a collection. The versioned flag never changes afterwards.
    pub fn create_collection(
        &mut self,
        name: impl Into<String>,
        options: CollectionOptions,
    ) -> CatalogResult<CollectionHandle> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(CatalogError::CollectionExists(name));
        }

        let meta = CollectionMeta::new(name.clone(), options);
        let slot = self.slots.len();
        self.slots.push(Slot {
            generation: 1,
            meta: Some(meta),
        });
        self.by_name.insert(name.clone(), slot);

        Logger::log(
            Severity::Info,
            Event::CollectionCreate,
            &[
                ("ns", name.as_str()),
                ("versioned", if options.versioned { "true" } else { "false" }),
            ],
        );
        Ok(CollectionHandle {
            slot,
            generation: 1,
        })
    }

    /// Drops a collection; outstanding handles become stale.
    pub fn drop_collection(&mut self, name: &str) -> CatalogResult<()> {
        let slot = self
            .by_name
            .remove(name)
            .ok_or_else(|| CatalogError::CollectionNotFound(name.to_string()))?;
        let entry = &mut self.slots[slot];
        entry.generation += 1;
        entry.meta = None;
        Logger::log(Severity::Info, Event::CollectionDrop, &[("ns", name)]);
        Ok(())
    }

    /// Acquires a handle by name.
    pub fn handle(&self, name: &str) -> Option<CollectionHandle> {
        let slot = *self.by_name.get(name)?;
        Some(CollectionHandle {
            slot,
            generation: self.slots[slot].generation,
        })
    }

    /// Resolves a handle. Returns None when the collection was dropped (or
    /// replaced) since the handle was acquired.
    pub fn resolve(&self, handle: CollectionHandle) -> Option<&CollectionMeta> {
        let slot = self.slots.get(handle.slot)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.meta.as_ref()
    }

    /// Looks up collection metadata by name.
    pub fn get(&self, name: &str) -> Option<&CollectionMeta> {
        let slot = *self.by_name.get(name)?;
        self.slots[slot].meta.as_ref()
    }

    /// Returns true if the collection exists and is versioned.
    pub fn is_versioned(&self, name: &str) -> bool {
        self.get(name).map(CollectionMeta::versioned).unwrap_or(false)
    }

    /// Registers an index, rewriting the spec first on versioned
    /// collections.
    pub fn create_index(&mut self, name: &str, spec: IndexSpec) -> CatalogResult<IndexSpec> {
        let slot = *self
            .by_name
            .get(name)
            .ok_or_else(|| CatalogError::CollectionNotFound(name.to_string()))?;
        let meta = self.slots[slot]
            .meta
            .as_mut()
            .ok_or_else(|| CatalogError::CollectionNotFound(name.to_string()))?;

        let spec = if meta.versioned() {
            modify_transaction_time_index(&spec)
        } else {
            spec
        };
        if meta.indexes().iter().any(|existing| existing.name == spec.name) {
            return Err(CatalogError::IndexExists(spec.name));
        }
        meta.push_index(spec.clone());

        Logger::log(
            Severity::Info,
            Event::IndexCreate,
            &[("index", spec.name.as_str()), ("ns", name)],
        );
        Ok(spec)
    }

    /// Marks a background index build in progress; its keys count as
    /// indexed for modifier-coverage checks until the build finishes.
    pub fn begin_index_build(&mut self, name: &str, spec: IndexSpec) -> CatalogResult<()> {
        let meta = self.get_mut(name)?;
        let spec = if meta.versioned() {
            modify_transaction_time_index(&spec)
        } else {
            spec
        };
        meta.set_building(Some(spec));
        Logger::log(Severity::Info, Event::IndexBuildStart, &[("ns", name)]);
        Ok(())
    }

    /// Promotes the in-progress build to a registered index.
    pub fn finish_index_build(&mut self, name: &str) -> CatalogResult<()> {
        let meta = self.get_mut(name)?;
        if let Some(spec) = meta.take_building() {
            meta.push_index(spec);
        }
        Logger::log(Severity::Info, Event::IndexBuildFinish, &[("ns", name)]);
        Ok(())
    }

    fn get_mut(&mut self, name: &str) -> CatalogResult<&mut CollectionMeta> {
        let slot = *self
            .by_name
            .get(name)
            .ok_or_else(|| CatalogError::CollectionNotFound(name.to_string()))?;
        self.slots[slot]
            .meta
            .as_mut()
            .ok_or_else(|| CatalogError::CollectionNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexKey;

    #[test]
    fn test_create_and_resolve() {
        let mut catalog = CollectionCatalog::new();
        let handle = catalog
            .create_collection("db.c", CollectionOptions::versioned())
            .expect("create");
        let meta = catalog.resolve(handle).expect("resolve");
        assert!(meta.versioned());
        assert_eq!(meta.name(), "db.c");
    }

    #[test]
    fn test_duplicate_create_fails() {
        let mut catalog = CollectionCatalog::new();
        catalog
            .create_collection("db.c", CollectionOptions::default())
            .expect("create");
        assert!(matches!(
            catalog.create_collection("db.c", CollectionOptions::default()),
            Err(CatalogError::CollectionExists(_))
        ));
    }

    #[test]
    fn test_drop_makes_handles_stale() {
        let mut catalog = CollectionCatalog::new();
        let handle = catalog
            .create_collection("db.c", CollectionOptions::default())
            .expect("create");
        catalog.drop_collection("db.c").expect("drop");
        assert!(catalog.resolve(handle).is_none());
        assert!(catalog.handle("db.c").is_none());
    }

    #[test]
    fn test_versioned_index_is_rewritten_on_create() {
        let mut catalog = CollectionCatalog::new();
        catalog
            .create_collection("db.c", CollectionOptions::versioned())
            .expect("create");
        let spec = catalog
            .create_index("db.c", IndexSpec::new("a_1", vec![IndexKey::asc("a")]))
            .expect("index");
        assert_eq!(spec.keys[0], IndexKey::asc("transaction_end"));
    }

    #[test]
    fn test_unversioned_index_is_untouched() {
        let mut catalog = CollectionCatalog::new();
        catalog
            .create_collection("db.c", CollectionOptions::default())
            .expect("create");
        let spec = catalog
            .create_index("db.c", IndexSpec::new("a_1", vec![IndexKey::asc("a")]))
            .expect("index");
        assert_eq!(spec.keys, vec![IndexKey::asc("a")]);
    }

    #[test]
    fn test_build_keys_count_as_indexed_until_finished() {
        let mut catalog = CollectionCatalog::new();
        catalog
            .create_collection("db.c", CollectionOptions::default())
            .expect("create");
        catalog
            .begin_index_build("db.c", IndexSpec::new("b_1", vec![IndexKey::asc("b")]))
            .expect("begin");
        assert!(catalog.get("db.c").expect("meta").indexed_fields().contains("b"));

        catalog.finish_index_build("db.c").expect("finish");
        let meta = catalog.get("db.c").expect("meta");
        assert!(meta.indexed_fields().contains("b"));
        assert_eq!(meta.indexes().len(), 1);
    }
}
