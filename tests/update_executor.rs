//! Update executor scenarios
//!
//! End-to-end coverage of the close-then-insert pipeline: single updates,
//! multi-updates with dedup, upserts, deletes, cancellation, oplog shapes
//! and the failure windows.

use chronodb::catalog::{CollectionCatalog, CollectionOptions};
use chronodb::clock::{ClockSource, OpTime};
use chronodb::document::get_path;
use chronodb::executor::{
    CancellationToken, ExecutorError, UpdateExecutor, UpdateOptions, YieldPolicy,
};
use chronodb::oplog::{MemoryOplog, OpKind};
use chronodb::storage::{MemoryRecordStore, RecordId, RecordStore, StorageError, StorageResult};
use serde_json::{json, Value};

const NS: &str = "unittests.ttime";

struct Fixture {
    catalog: CollectionCatalog,
    store: MemoryRecordStore,
    clock: ClockSource,
    oplog: MemoryOplog,
}

impl Fixture {
    fn versioned() -> Self {
        Self::with_options(CollectionOptions::versioned())
    }

    fn plain() -> Self {
        Self::with_options(CollectionOptions::default())
    }

    fn with_options(options: CollectionOptions) -> Self {
        let mut catalog = CollectionCatalog::new();
        catalog.create_collection(NS, options).expect("create collection");
        Self {
            catalog,
            store: MemoryRecordStore::new(),
            clock: ClockSource::fixed(OpTime::new(100, 0)),
            oplog: MemoryOplog::new(),
        }
    }

    fn exec(&mut self) -> UpdateExecutor<'_, MemoryRecordStore> {
        UpdateExecutor::new(&self.catalog, &mut self.store, &self.clock, &mut self.oplog)
    }

    fn count(&mut self, selector: Value) -> u64 {
        self.exec().count(NS, &selector).expect("count")
    }

    fn find(&mut self, selector: Value) -> Vec<Value> {
        self.exec().find(NS, &selector, None).expect("find")
    }
}

fn end_of(doc: &Value) -> &Value {
    doc.get("transaction_end").expect("interval end")
}

// =============================================================================
// Insert + update lifecycle
// =============================================================================

#[test]
fn test_update_closes_and_succeeds() {
    let mut fx = Fixture::versioned();
    fx.exec().insert(NS, &json!({"a": 0})).expect("insert");
    fx.exec()
        .update(NS, &json!({"a": 0}), &json!({"$inc": {"a": 1}}), UpdateOptions::new())
        .expect("update");

    // One current version, two versions of record.
    assert_eq!(fx.count(json!({})), 1);
    assert_eq!(fx.count(json!({"transaction": {"all": true}})), 2);

    let history = fx.find(json!({"transaction": {"all": true}}));
    let historical = history.iter().find(|d| !end_of(d).is_null()).expect("historical");
    let current = history.iter().find(|d| end_of(d).is_null()).expect("current");

    assert_eq!(historical.get("a"), Some(&json!(0)));
    assert_eq!(current.get("a"), Some(&json!(1)));
    // The chain is contiguous: the successor starts where the predecessor
    // ended.
    assert_eq!(
        get_path(current, "_id.transaction_start"),
        Some(end_of(historical))
    );
    // Both versions share the user id.
    assert_eq!(
        get_path(current, "_id._id"),
        get_path(historical, "_id._id")
    );
}

#[test]
fn test_second_current_version_is_refused() {
    let mut fx = Fixture::versioned();
    fx.exec().insert(NS, &json!({"_id": 7, "x": "a"})).expect("insert");
    let err = fx.exec().insert(NS, &json!({"_id": 7, "x": "b"})).unwrap_err();
    assert!(err.is_duplicate_key());
    assert_eq!(fx.count(json!({"transaction": {"all": true}})), 1);
}

#[test]
fn test_replacement_update_keeps_user_id() {
    let mut fx = Fixture::versioned();
    fx.exec().insert(NS, &json!({"_id": 7, "a": 0})).expect("insert");
    fx.exec()
        .update(NS, &json!({"_id": 7}), &json!({"b": 5}), UpdateOptions::new())
        .expect("update");

    let current = fx.find(json!({"_id": 7}));
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].get("b"), Some(&json!(5)));
    assert_eq!(current[0].get("a"), None);
    assert_eq!(get_path(&current[0], "_id._id"), Some(&json!(7)));
}

#[test]
fn test_point_in_time_query_returns_historical_version() {
    let mut fx = Fixture::versioned();
    fx.exec().insert(NS, &json!({"_id": 1, "a": 0})).expect("insert");
    fx.exec()
        .update(NS, &json!({"_id": 1}), &json!({"$set": {"a": 1}}), UpdateOptions::new())
        .expect("update");
    fx.exec()
        .update(NS, &json!({"_id": 1}), &json!({"$set": {"a": 2}}), UpdateOptions::new())
        .expect("update");

    // The first interval is [(100,1), (100,2)); query exactly at its start.
    let at = OpTime::new(100, 1).to_value();
    let versions = fx.find(json!({"transaction": {"at": at}}));
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].get("a"), Some(&json!(0)));
}

#[test]
fn test_history_is_ordered_by_interval_end() {
    let mut fx = Fixture::versioned();
    fx.exec().insert(NS, &json!({"_id": 1, "a": 0})).expect("insert");
    for i in 1..4 {
        fx.exec()
            .update(NS, &json!({"_id": 1}), &json!({"$set": {"a": i}}), UpdateOptions::new())
            .expect("update");
    }

    let sort = chronodb::query::SortSpec::new().asc("transaction");
    let history = fx
        .exec()
        .find(NS, &json!({"transaction": {"all": true}}), Some(&sort))
        .expect("find");
    // Nulls first, then closes in stamp order.
    assert!(end_of(&history[0]).is_null());
    let closes: Vec<&Value> = history[1..].iter().map(end_of).collect();
    let mut sorted = closes.clone();
    sorted.sort_by_key(|v| OpTime::from_value(v).expect("stamp"));
    assert_eq!(closes, sorted);
}

// =============================================================================
// Multi-update
// =============================================================================

#[test]
fn test_multi_update_modifies_each_document_once() {
    let mut fx = Fixture::versioned();
    for i in 0..3 {
        fx.exec().insert(NS, &json!({"_id": i, "g": 1, "n": 0})).expect("insert");
    }

    let outcome = fx
        .exec()
        .update(
            NS,
            &json!({"g": 1}),
            &json!({"$inc": {"n": 1}}),
            UpdateOptions::new().multi(),
        )
        .expect("multi update");
    assert_eq!(outcome.modified, 3);

    // The successors are themselves matched by {g: 1}; the seen set keeps
    // the operation from re-firing on its own output.
    for i in 0..3 {
        let history = fx.find(json!({"_id": i, "transaction": {"all": true}}));
        assert_eq!(history.len(), 2, "id {}", i);
        let current = fx.find(json!({"_id": i}));
        assert_eq!(current.len(), 1, "id {}", i);
        assert_eq!(current[0].get("n"), Some(&json!(1)), "id {}", i);
    }
}

#[test]
fn test_multi_update_requires_operators() {
    let mut fx = Fixture::versioned();
    let err = fx
        .exec()
        .update(NS, &json!({}), &json!({"a": 1}), UpdateOptions::new().multi())
        .unwrap_err();
    assert!(matches!(err, ExecutorError::InvalidModifier(_)));
}

#[test]
fn test_cancellation_preserves_partial_progress() {
    let mut fx = Fixture::versioned();
    for i in 0..6 {
        fx.exec().insert(NS, &json!({"_id": i, "g": 1, "n": 0})).expect("insert");
    }

    let token = CancellationToken::new();
    token.cancel();
    let err = {
        let mut exec = fx
            .exec()
            .with_yield_policy(YieldPolicy::every(2))
            .with_cancellation(token);
        exec.update(
            NS,
            &json!({"g": 1}),
            &json!({"$inc": {"n": 1}}),
            UpdateOptions::new().multi(),
        )
        .unwrap_err()
    };

    match err {
        ExecutorError::Cancelled { committed } => assert_eq!(committed, 2),
        other => panic!("expected cancellation, got {other}"),
    }
    // The two committed mutations stay.
    assert_eq!(fx.count(json!({"n": 1})), 2);
    assert_eq!(fx.count(json!({"n": 0})), 4);
}

// =============================================================================
// Upserts
// =============================================================================

#[test]
fn test_operator_upsert_builds_from_query_and_mods() {
    let mut fx = Fixture::versioned();
    let outcome = fx
        .exec()
        .update(
            NS,
            &json!({"_id": 9, "kind": "counter"}),
            &json!({"$inc": {"n": 1}}),
            UpdateOptions::new().upsert(),
        )
        .expect("upsert");

    assert!(outcome.upserted.is_some());
    let current = fx.find(json!({"_id": 9}));
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].get("kind"), Some(&json!("counter")));
    assert_eq!(current[0].get("n"), Some(&json!(1)));
    assert!(end_of(&current[0]).is_null());
}

#[test]
fn test_replacement_upsert_inserts_document() {
    let mut fx = Fixture::versioned();
    fx.exec()
        .update(NS, &json!({"missing": true}), &json!({"a": 1}), UpdateOptions::new().upsert())
        .expect("upsert");
    assert_eq!(fx.count(json!({"a": 1})), 1);
}

#[test]
fn test_upsert_after_delete_starts_a_new_chain() {
    let mut fx = Fixture::versioned();
    fx.exec().insert(NS, &json!({"_id": 4, "n": 0})).expect("insert");
    fx.exec().remove(NS, &json!({"_id": 4}), false).expect("remove");
    fx.exec()
        .update(NS, &json!({"_id": 4}), &json!({"$inc": {"n": 1}}), UpdateOptions::new().upsert())
        .expect("upsert");

    assert_eq!(fx.count(json!({"_id": 4})), 1);
    assert_eq!(fx.count(json!({"_id": 4, "transaction": {"all": true}})), 2);
}

// =============================================================================
// Deletes
// =============================================================================

#[test]
fn test_delete_closes_without_successor() {
    let mut fx = Fixture::versioned();
    fx.exec().insert(NS, &json!({"_id": 3, "a": 1})).expect("insert");
    let removed = fx.exec().remove(NS, &json!({"_id": 3}), false).expect("remove");
    assert_eq!(removed, 1);

    assert!(fx.find(json!({"_id": 3})).is_empty());
    let history = fx.find(json!({"_id": 3, "transaction": {"all": true}}));
    assert_eq!(history.len(), 1);
    assert!(!end_of(&history[0]).is_null());
}

#[test]
fn test_delete_keeps_other_documents() {
    let mut fx = Fixture::versioned();
    fx.exec().insert(NS, &json!({"_id": 1, "a": 1})).expect("insert");
    fx.exec().insert(NS, &json!({"_id": 2, "a": 3})).expect("insert");
    fx.exec().remove(NS, &json!({"a": 1}), false).expect("remove");

    assert_eq!(fx.count(json!({})), 1);
    assert_eq!(fx.count(json!({"transaction": {"all": true}})), 2);
}

// =============================================================================
// Invariant guards
// =============================================================================

#[test]
fn test_update_pinning_historical_version_is_refused() {
    let mut fx = Fixture::versioned();
    fx.exec().insert(NS, &json!({"_id": 1, "a": 0})).expect("insert");
    let pin = OpTime::new(100, 5).to_value();
    let err = fx
        .exec()
        .update(
            NS,
            &json!({"transaction_end": pin}),
            &json!({"$set": {"a": 1}}),
            UpdateOptions::new(),
        )
        .unwrap_err();
    assert_eq!(err.code(), 999162);
    // Nothing was mutated.
    assert_eq!(fx.count(json!({"transaction": {"all": true}})), 1);
}

#[test]
fn test_reserved_namespaces_are_refused() {
    let mut fx = Fixture::versioned();
    for ns in ["db.$cmd", "db.system.indexes"] {
        let err = fx
            .exec()
            .update(ns, &json!({}), &json!({"$set": {"a": 1}}), UpdateOptions::new())
            .unwrap_err();
        assert!(matches!(err, ExecutorError::InvalidNamespace(_)), "{}", ns);
    }
}

#[test]
fn test_temporal_fields_are_not_updatable() {
    let mut fx = Fixture::versioned();
    fx.exec().insert(NS, &json!({"_id": 1})).expect("insert");
    let err = fx
        .exec()
        .update(
            NS,
            &json!({"_id": 1}),
            &json!({"$set": {"transaction_end": null}}),
            UpdateOptions::new(),
        )
        .unwrap_err();
    assert!(matches!(err, ExecutorError::InvalidModifier(_)));
}

// =============================================================================
// Oplog emission
// =============================================================================

#[test]
fn test_versioned_update_emits_close_and_insert() {
    let mut fx = Fixture::versioned();
    let inserted = fx.exec().insert(NS, &json!({"_id": 1, "a": 0})).expect("insert");
    fx.exec()
        .update(NS, &json!({"_id": 1}), &json!({"$set": {"a": 1}}), UpdateOptions::new())
        .expect("update");

    let entries = fx.oplog.entries();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].op, OpKind::Insert);

    // The close addresses the exact predecessor by its composite id.
    let close = &entries[1];
    assert_eq!(close.op, OpKind::Update);
    assert_eq!(close.ns, NS);
    let pattern = close.o2.as_ref().expect("id pattern");
    assert_eq!(pattern.get("_id"), inserted.get("_id"));
    let delta_end = get_path(&close.o, "$set.transaction_end").expect("delta");
    assert!(OpTime::from_value(delta_end).is_some());

    // The successor replicates as a full insert.
    let insert = &entries[2];
    assert_eq!(insert.op, OpKind::Insert);
    assert_eq!(insert.o.get("a"), Some(&json!(1)));
    assert!(insert.o.get("transaction_end").expect("end").is_null());
}

#[test]
fn test_noop_modifier_suppresses_oplog_entries() {
    let mut fx = Fixture::versioned();
    fx.exec().insert(NS, &json!({"_id": 1, "a": 0})).expect("insert");
    let before = fx.oplog.len();

    fx.exec()
        .update(NS, &json!({"_id": 1}), &json!({"$set": {"a": 0}}), UpdateOptions::new())
        .expect("update");

    // The chain still grew (the records were rewritten), but nothing was
    // replicated for the no-op.
    assert_eq!(fx.oplog.len(), before);
    assert_eq!(fx.count(json!({"transaction": {"all": true}})), 2);
}

// =============================================================================
// Plain collections short-circuit the versioning hooks
// =============================================================================

#[test]
fn test_plain_collection_updates_in_place() {
    let mut fx = Fixture::plain();
    fx.exec().insert(NS, &json!({"_id": 1, "a": 0})).expect("insert");
    fx.exec()
        .update(NS, &json!({"_id": 1}), &json!({"$inc": {"a": 1}}), UpdateOptions::new())
        .expect("update");

    // One record, mutated in place.
    assert_eq!(fx.store.len(NS), 1);
    let docs = fx.find(json!({"_id": 1}));
    assert_eq!(docs[0].get("a"), Some(&json!(1)));
    assert_eq!(docs[0].get("transaction_end"), None);
}

#[test]
fn test_plain_collection_delete_removes_record() {
    let mut fx = Fixture::plain();
    fx.exec().insert(NS, &json!({"_id": 1})).expect("insert");
    fx.exec().remove(NS, &json!({"_id": 1}), false).expect("remove");
    assert!(fx.store.is_empty(NS));

    let delete = fx.oplog.entries().last().expect("entry");
    assert_eq!(delete.op, OpKind::Delete);
    assert_eq!(delete.o, json!({"_id": 1}));
}

// =============================================================================
// Duplicate-key window between close and insert
// =============================================================================

/// Store wrapper that fails the nth insert with duplicate-key, standing in
/// for a concurrent writer claiming the live key between the close and the
/// successor insert.
struct FailingStore {
    inner: MemoryRecordStore,
    fail_on_insert: Option<usize>,
    inserts: usize,
}

impl FailingStore {
    fn failing_on(n: usize) -> Self {
        Self {
            inner: MemoryRecordStore::new(),
            fail_on_insert: Some(n),
            inserts: 0,
        }
    }
}

impl RecordStore for FailingStore {
    fn insert(&mut self, ns: &str, doc: &Value) -> StorageResult<RecordId> {
        self.inserts += 1;
        if self.fail_on_insert == Some(self.inserts) {
            return Err(StorageError::DuplicateKey {
                key: "injected".into(),
            });
        }
        self.inner.insert(ns, doc)
    }

    fn overwrite(&mut self, ns: &str, id: RecordId, doc: &Value) -> StorageResult<()> {
        self.inner.overwrite(ns, id, doc)
    }

    fn read(&self, ns: &str, id: RecordId) -> StorageResult<Option<Value>> {
        self.inner.read(ns, id)
    }

    fn remove(&mut self, ns: &str, id: RecordId) -> StorageResult<()> {
        self.inner.remove(ns, id)
    }

    fn next_after(&self, ns: &str, after: Option<RecordId>) -> Option<RecordId> {
        self.inner.next_after(ns, after)
    }

    fn lookup_live(&self, ns: &str, user_id: &Value) -> Option<RecordId> {
        self.inner.lookup_live(ns, user_id)
    }

    fn scan(&self, ns: &str) -> Vec<RecordId> {
        self.inner.scan(ns)
    }
}

#[test]
fn test_duplicate_key_after_close_leaves_chain_without_current() {
    let mut catalog = CollectionCatalog::new();
    catalog
        .create_collection(NS, CollectionOptions::versioned())
        .expect("create");
    let clock = ClockSource::fixed(OpTime::new(100, 0));
    let mut oplog = MemoryOplog::new();
    // First insert (the seed document) succeeds; the successor insert fails.
    let mut store = FailingStore::failing_on(2);

    let mut exec = UpdateExecutor::new(&catalog, &mut store, &clock, &mut oplog);
    exec.insert(NS, &json!({"_id": 1, "a": 0})).expect("insert");
    let err = exec
        .update(NS, &json!({"_id": 1}), &json!({"$set": {"a": 1}}), UpdateOptions::new())
        .unwrap_err();
    assert!(err.is_duplicate_key());

    // The predecessor stays closed: no current version remains, history
    // still holds the closed record. A retrying client upserts.
    assert_eq!(exec.count(NS, &json!({"_id": 1})).expect("count"), 0);
    assert_eq!(
        exec.count(NS, &json!({"_id": 1, "transaction": {"all": true}}))
            .expect("count"),
        1
    );

    exec.update(
        NS,
        &json!({"_id": 1}),
        &json!({"$set": {"a": 1}}),
        UpdateOptions::new().upsert(),
    )
    .expect("retry upserts");
    assert_eq!(exec.count(NS, &json!({"_id": 1})).expect("count"), 1);
}
