//! Update executor
//!
//! One logical update or delete over one collection. On versioned
//! collections mutations never touch a record's payload in place: the
//! current version is closed and a successor is inserted, so history only
//! ever grows. The close and the insert are indivisible with respect to
//! yielding; a crash (or a duplicate-key from a concurrent writer) between
//! them can leave a chain with no current version, which is surfaced to the
//! client rather than repaired.

use std::collections::HashSet;

use serde_json::{json, Map, Value};

use crate::catalog::CollectionCatalog;
use crate::clock::ClockSource;
use crate::document::{
    set_transaction_end, set_transaction_start, user_view, wrap_object_id, ID_FIELD,
    TRANSACTION_END,
};
use crate::observability::{Event, Logger, Severity};
use crate::oplog::{OplogEntry, OplogSink};
use crate::query::{add_current_version_criterion, Matcher};
use crate::storage::{RecordId, RecordStore};

use super::cursor::{CancellationToken, CollectionCursor, YieldPolicy};
use super::errors::{ExecutorError, ExecutorResult};
use super::modifier::{check_no_mods, ModSet};
use super::result::UpdateOutcome;

/// Per-document byte cap on encoded records.
pub const MAX_DOCUMENT_BYTES: usize = 16 * 1024 * 1024;

/// Options of one update operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    /// Insert a fresh document when nothing matches.
    pub upsert: bool,
    /// Modify every matching document instead of the first.
    pub multi: bool,
}

impl UpdateOptions {
    /// Single-document update, no upsert.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables upsert.
    pub fn upsert(mut self) -> Self {
        self.upsert = true;
        self
    }

    /// Enables multi-update.
    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }
}

/// Executes write operations against one record store.
///
/// The clock, the oplog sink and the catalog are explicit resources handed
/// in at construction; nothing here is ambient, so tests inject
/// deterministic clocks and in-memory sinks.
pub struct UpdateExecutor<'a, S: RecordStore> {
    pub(super) catalog: &'a CollectionCatalog,
    pub(super) store: &'a mut S,
    clock: &'a ClockSource,
    oplog: &'a mut dyn OplogSink,
    yield_policy: YieldPolicy,
    cancel: CancellationToken,
}

impl<'a, S: RecordStore> UpdateExecutor<'a, S> {
    /// Creates an executor over the given resources.
    pub fn new(
        catalog: &'a CollectionCatalog,
        store: &'a mut S,
        clock: &'a ClockSource,
        oplog: &'a mut dyn OplogSink,
    ) -> Self {
        Self {
            catalog,
            store,
            clock,
            oplog,
            yield_policy: YieldPolicy::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Overrides the yield pacing.
    pub fn with_yield_policy(mut self, policy: YieldPolicy) -> Self {
        self.yield_policy = policy;
        self
    }

    /// Attaches a cancellation token shared with the host.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Inserts a document. On versioned collections the document is wrapped
    /// into a current version record first; a live record with the same
    /// user id makes the insert fail with duplicate-key.
    pub fn insert(&mut self, ns: &str, doc: &Value) -> ExecutorResult<Value> {
        validate_namespace(ns)?;
        check_no_mods(doc)?;

        let record = if self.catalog.is_versioned(ns) {
            wrap_object_id(doc, self.clock.now())
        } else {
            ensure_id(doc)
        };
        check_too_large(&record)?;
        self.store.insert(ns, &record)?;
        self.oplog.append(OplogEntry::insert(ns, record.clone()));
        Ok(record)
    }

    /// Executes one logical update.
    pub fn update(
        &mut self,
        ns: &str,
        selector: &Value,
        update: &Value,
        options: UpdateOptions,
    ) -> ExecutorResult<UpdateOutcome> {
        validate_namespace(ns)?;
        let versioned = self.catalog.is_versioned(ns);
        let operator = ModSet::is_operator_update(update);
        if options.multi && !operator {
            return Err(ExecutorError::InvalidModifier(
                "multi update only works with $ operators".into(),
            ));
        }

        let normalized = if versioned {
            add_current_version_criterion(selector)?
        } else {
            selector.clone()
        };

        let mut mods = if operator {
            let mut set = ModSet::parse(update)?;
            if let Some(meta) = self.catalog.get(ns) {
                set.update_index_coverage(&meta.indexed_fields());
            }
            Some(set)
        } else {
            check_no_mods(update)?;
            None
        };

        // The direct id lookup never runs on a versioned collection: the
        // successor insert always moves the logical document to a new
        // location, so every versioned write goes through the cursor path.
        let mods_indexed = mods.as_ref().map(ModSet::is_indexed).unwrap_or(false);
        if !versioned && !options.multi && !mods_indexed {
            if let Some(id) = simple_id_selector(&normalized) {
                let id = id.clone();
                match self.update_by_id(ns, &id, update, mods.as_ref())? {
                    Some(outcome) => return Ok(outcome),
                    None if !options.upsert => return Ok(UpdateOutcome::none()),
                    None => return self.upsert(ns, selector, update, mods.as_ref(), versioned),
                }
            }
        }

        let mut cursor = CollectionCursor::new();
        let mut seen: HashSet<RecordId> = HashSet::new();
        let mut modified: u64 = 0;
        let mut since_yield: usize = 0;

        while let Some(loc) = cursor.advance(self.store, ns) {
            if options.multi
                && self.yield_policy.yield_every != 0
                && since_yield >= self.yield_policy.yield_every
            {
                since_yield = 0;
                if !self.yield_and_revalidate(ns, mods.as_mut(), modified)? {
                    break;
                }
            }

            let Some(record) = self.store.read(ns, loc)? else {
                continue;
            };
            if seen.contains(&loc) {
                continue;
            }
            if !Matcher::matches(&normalized, &record) {
                continue;
            }
            seen.insert(loc);

            if versioned {
                self.close_and_succeed(ns, loc, &record, update, mods.as_ref(), &mut seen)?;
            } else {
                self.overwrite_in_place(ns, loc, &record, update, mods.as_ref())?;
            }
            modified += 1;
            since_yield += 1;

            if !options.multi {
                return Ok(UpdateOutcome::matched(modified));
            }
        }

        if modified > 0 {
            return Ok(UpdateOutcome::matched(modified));
        }
        if options.upsert {
            return self.upsert(ns, selector, update, mods.as_ref(), versioned);
        }
        Ok(UpdateOutcome::none())
    }

    /// Executes one logical delete. On versioned collections the matching
    /// current versions are closed and kept; on plain collections the
    /// records are removed.
    pub fn remove(&mut self, ns: &str, selector: &Value, just_one: bool) -> ExecutorResult<u64> {
        validate_namespace(ns)?;
        let versioned = self.catalog.is_versioned(ns);
        let normalized = if versioned {
            add_current_version_criterion(selector)?
        } else {
            selector.clone()
        };

        let mut cursor = CollectionCursor::new();
        let mut seen: HashSet<RecordId> = HashSet::new();
        let mut removed: u64 = 0;
        let mut since_yield: usize = 0;

        while let Some(loc) = cursor.advance(self.store, ns) {
            if !just_one
                && self.yield_policy.yield_every != 0
                && since_yield >= self.yield_policy.yield_every
            {
                since_yield = 0;
                if !self.yield_and_revalidate(ns, None, removed)? {
                    break;
                }
            }

            let Some(record) = self.store.read(ns, loc)? else {
                continue;
            };
            if seen.contains(&loc) {
                continue;
            }
            if !Matcher::matches(&normalized, &record) {
                continue;
            }
            seen.insert(loc);

            if versioned {
                let closed = set_transaction_end(&record, self.clock.now())?;
                check_too_large(&closed)?;
                self.store.overwrite(ns, loc, &closed)?;
                self.oplog.append(close_entry(ns, &closed));
                Logger::log(Severity::Trace, Event::VersionClose, &[("ns", ns)]);
            } else {
                self.store.remove(ns, loc)?;
                self.oplog.append(OplogEntry::delete(ns, id_pattern(&record)));
            }
            removed += 1;
            since_yield += 1;

            if just_one {
                break;
            }
        }
        Ok(removed)
    }

    /// Close-then-insert for one matched record. The two store calls are
    /// never separated by a yield; both images are size-checked before the
    /// close is persisted.
    fn close_and_succeed(
        &mut self,
        ns: &str,
        loc: RecordId,
        record: &Value,
        update: &Value,
        mods: Option<&ModSet>,
        seen: &mut HashSet<RecordId>,
    ) -> ExecutorResult<()> {
        let before = user_view(record);
        let new_user = match mods {
            Some(mods) => mods.apply(&before)?,
            None => update.clone(),
        };

        let closed = set_transaction_end(record, self.clock.now())?;
        let successor = set_transaction_start(&new_user, &closed)?;
        check_too_large(&closed)?;
        check_too_large(&successor)?;

        self.store.overwrite(ns, loc, &closed)?;
        let new_loc = self.store.insert(ns, &successor)?;
        seen.insert(new_loc);

        // An empty effective rewrite would replicate as "clear this
        // record"; suppress both entries instead.
        let suppress = mods
            .map(|m| {
                m.oplog_rewrite(&before, &new_user)
                    .as_object()
                    .map(Map::is_empty)
                    .unwrap_or(true)
            })
            .unwrap_or(false);
        if !suppress {
            self.oplog.append(close_entry(ns, &closed));
            self.oplog.append(OplogEntry::insert(ns, successor.clone()));
        }

        Logger::log(Severity::Trace, Event::VersionClose, &[("ns", ns)]);
        Logger::log(Severity::Trace, Event::VersionInsert, &[("ns", ns)]);
        Ok(())
    }

    /// In-place mutation for plain collections.
    fn overwrite_in_place(
        &mut self,
        ns: &str,
        loc: RecordId,
        record: &Value,
        update: &Value,
        mods: Option<&ModSet>,
    ) -> ExecutorResult<()> {
        let new_doc = match mods {
            Some(mods) => mods.apply(record)?,
            None => replace_preserving_id(record, update),
        };
        check_too_large(&new_doc)?;
        self.store.overwrite(ns, loc, &new_doc)?;

        match mods {
            Some(mods) => {
                let delta = mods.oplog_rewrite(record, &new_doc);
                let empty = delta.as_object().map(Map::is_empty).unwrap_or(true);
                if !empty {
                    self.oplog
                        .append(OplogEntry::update(ns, delta, id_pattern(record)));
                }
            }
            None => {
                self.oplog
                    .append(OplogEntry::update(ns, new_doc.clone(), id_pattern(&new_doc)));
            }
        }
        Ok(())
    }

    /// Direct live-key lookup for plain single-document `_id` updates.
    fn update_by_id(
        &mut self,
        ns: &str,
        id: &Value,
        update: &Value,
        mods: Option<&ModSet>,
    ) -> ExecutorResult<Option<UpdateOutcome>> {
        let Some(loc) = self.store.lookup_live(ns, id) else {
            return Ok(None);
        };
        let Some(record) = self.store.read(ns, loc)? else {
            return Ok(None);
        };
        self.overwrite_in_place(ns, loc, &record, update, mods)?;
        Ok(Some(UpdateOutcome::matched(1)))
    }

    /// Inserts the document an unmatched upsert implies: the selector's
    /// plain equalities seeded through the modifier set, or the replacement
    /// document itself.
    fn upsert(
        &mut self,
        ns: &str,
        selector: &Value,
        update: &Value,
        mods: Option<&ModSet>,
        versioned: bool,
    ) -> ExecutorResult<UpdateOutcome> {
        let base = match mods {
            Some(mods) => {
                let seed = ModSet::create_from_query(selector);
                mods.apply(&seed)?
            }
            None => update.clone(),
        };
        check_no_mods(&base)?;

        let record = if versioned {
            wrap_object_id(&base, self.clock.now())
        } else {
            ensure_id(&base)
        };
        check_too_large(&record)?;
        self.store.insert(ns, &record)?;
        self.oplog.append(OplogEntry::insert(ns, record.clone()));

        Logger::log(Severity::Info, Event::Upsert, &[("ns", ns)]);
        Ok(UpdateOutcome::upserted(record))
    }

    /// One cooperative suspension point. Checks cancellation, re-resolves
    /// the collection through the catalog (the metadata may have changed
    /// while suspended) and refreshes modifier index coverage. Returns
    /// false when the collection is gone and the operation should stop.
    fn yield_and_revalidate(
        &mut self,
        ns: &str,
        mods: Option<&mut ModSet>,
        committed: u64,
    ) -> ExecutorResult<bool> {
        if self.cancel.is_cancelled() {
            let committed_field = committed.to_string();
            Logger::log(
                Severity::Warn,
                Event::UpdateCancelled,
                &[("committed", committed_field.as_str()), ("ns", ns)],
            );
            return Err(ExecutorError::Cancelled { committed });
        }

        let Some(handle) = self.catalog.handle(ns) else {
            return Ok(false);
        };
        let Some(meta) = self.catalog.resolve(handle) else {
            return Ok(false);
        };
        if let Some(mods) = mods {
            mods.update_index_coverage(&meta.indexed_fields());
        }
        Logger::log(Severity::Trace, Event::UpdateYield, &[("ns", ns)]);
        Ok(true)
    }
}

/// Oplog entry closing `record`: the `transaction_end` delta addressed by
/// the record's full composite id.
fn close_entry(ns: &str, closed: &Value) -> OplogEntry {
    let end = closed.get(TRANSACTION_END).cloned().unwrap_or(Value::Null);
    OplogEntry::update(
        ns,
        json!({ "$set": { TRANSACTION_END: end } }),
        id_pattern(closed),
    )
}

/// Addressing pattern for a record: its `_id` when present, otherwise the
/// whole record.
fn id_pattern(record: &Value) -> Value {
    match record.get(ID_FIELD) {
        Some(id) => json!({ ID_FIELD: id }),
        None => record.clone(),
    }
}

/// Extracts the id of a plain single-key `_id` equality selector.
fn simple_id_selector(selector: &Value) -> Option<&Value> {
    let map = selector.as_object()?;
    // The normalized form of a plain collection selector is untouched, so
    // a fast-path candidate has exactly the one user key.
    if map.len() != 1 {
        return None;
    }
    let id = map.get(ID_FIELD)?;
    let is_operator = id
        .as_object()
        .map(|m| m.keys().any(|k| k.starts_with('$')))
        .unwrap_or(false);
    if is_operator {
        None
    } else {
        Some(id)
    }
}

/// Replacement update on a plain collection: the stored identifier always
/// survives the replacement.
fn replace_preserving_id(record: &Value, update: &Value) -> Value {
    let mut map = update.as_object().cloned().unwrap_or_default();
    if let Some(id) = record.get(ID_FIELD) {
        map.insert(ID_FIELD.to_string(), id.clone());
    }
    Value::Object(map)
}

fn ensure_id(doc: &Value) -> Value {
    let mut map = doc.as_object().cloned().unwrap_or_default();
    if !map.contains_key(ID_FIELD) {
        map.insert(
            ID_FIELD.to_string(),
            Value::String(uuid::Uuid::new_v4().to_string()),
        );
    }
    Value::Object(map)
}

fn check_too_large(doc: &Value) -> ExecutorResult<()> {
    let size = serde_json::to_vec(doc)
        .map_err(|e| ExecutorError::InvalidModifier(e.to_string()))?
        .len();
    if size > MAX_DOCUMENT_BYTES {
        return Err(ExecutorError::DocumentTooLarge {
            size,
            max: MAX_DOCUMENT_BYTES,
        });
    }
    Ok(())
}

/// Refuses writes into reserved and system namespaces. The users catalog
/// is the one system collection clients may write.
fn validate_namespace(ns: &str) -> ExecutorResult<()> {
    if ns.contains('$') {
        return Err(ExecutorError::InvalidNamespace(ns.to_string()));
    }
    let system = ns.starts_with("system.") || ns.contains(".system.");
    if system && !(ns == "system.users" || ns.ends_with(".system.users")) {
        return Err(ExecutorError::InvalidNamespace(ns.to_string()));
    }
    Ok(())
}
