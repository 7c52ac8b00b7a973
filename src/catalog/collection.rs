//! Per-collection metadata

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::index::IndexSpec;

/// Creation-time collection options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionOptions {
    /// When true, every write grows an append-only version chain and the
    /// query surface understands the `transaction` operator.
    #[serde(default)]
    pub versioned: bool,
}

impl CollectionOptions {
    /// Options for a versioned collection.
    pub fn versioned() -> Self {
        Self { versioned: true }
    }
}

/// Metadata of one collection.
///
/// The index set and the in-progress build marker are transient: they may
/// change while an executor is suspended, which is why executors re-read
/// this struct after every yield.
#[derive(Debug, Clone)]
pub struct CollectionMeta {
    name: String,
    options: CollectionOptions,
    indexes: Vec<IndexSpec>,
    building: Option<IndexSpec>,
}

impl CollectionMeta {
    pub(crate) fn new(name: String, options: CollectionOptions) -> Self {
        Self {
            name,
            options,
            indexes: Vec::new(),
            building: None,
        }
    }

    /// Collection namespace.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true when the collection keeps version chains.
    pub fn versioned(&self) -> bool {
        self.options.versioned
    }

    /// Registered indexes.
    pub fn indexes(&self) -> &[IndexSpec] {
        &self.indexes
    }

    /// The index build currently in progress, if any.
    pub fn building(&self) -> Option<&IndexSpec> {
        self.building.as_ref()
    }

    /// Every field covered by a registered index or by the build in
    /// progress. Modifier sets touching any of these cannot be applied as
    /// in-place fast-path writes.
    pub fn indexed_fields(&self) -> HashSet<String> {
        let mut fields: HashSet<String> = self
            .indexes
            .iter()
            .flat_map(|spec| spec.field_names().map(str::to_string))
            .collect();
        if let Some(building) = &self.building {
            fields.extend(building.field_names().map(str::to_string));
        }
        fields
    }

    pub(crate) fn push_index(&mut self, spec: IndexSpec) {
        self.indexes.push(spec);
    }

    pub(crate) fn set_building(&mut self, spec: Option<IndexSpec>) {
        self.building = spec;
    }

    pub(crate) fn take_building(&mut self) -> Option<IndexSpec> {
        self.building.take()
    }
}
