//! Modifier sets
//!
//! Parses and applies `$`-operator update documents. Supported modifiers:
//! `$set`, `$unset`, `$inc`, `$push`. Modifiers and non-modifiers cannot be
//! mixed, and the identifier and interval fields are never legal targets -
//! version identity belongs to the transforms, not to user updates.
//!
//! Application is pure: the input document is untouched and an owned result
//! is produced. The oplog rewrite is the effective delta between the two,
//! so a modifier set that changed nothing rewrites to an empty document.

use std::collections::HashSet;

use serde_json::{Map, Number, Value};

use crate::document::{get_path, ID_FIELD, TRANSACTION_END};

use super::errors::{ExecutorError, ExecutorResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModOp {
    Set,
    Unset,
    Inc,
    Push,
}

impl ModOp {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "$set" => Some(ModOp::Set),
            "$unset" => Some(ModOp::Unset),
            "$inc" => Some(ModOp::Inc),
            "$push" => Some(ModOp::Push),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Mod {
    op: ModOp,
    path: String,
    value: Value,
}

/// A parsed `$`-operator update document.
#[derive(Debug, Clone)]
pub struct ModSet {
    mods: Vec<Mod>,
    indexed: usize,
}

impl ModSet {
    /// Returns true if the update document is operator-style (its first
    /// key is a `$` modifier).
    pub fn is_operator_update(update: &Value) -> bool {
        update
            .as_object()
            .and_then(|map| map.keys().next())
            .map(|key| key.starts_with('$'))
            .unwrap_or(false)
    }

    /// Parses an operator update document.
    pub fn parse(update: &Value) -> ExecutorResult<Self> {
        let map = update
            .as_object()
            .ok_or_else(|| ExecutorError::InvalidModifier("update is not a document".into()))?;

        let mut mods = Vec::new();
        for (name, targets) in map {
            if !name.starts_with('$') {
                return Err(ExecutorError::InvalidModifier(
                    "modifiers and non-modifiers cannot be mixed".into(),
                ));
            }
            let op = ModOp::parse(name).ok_or_else(|| {
                ExecutorError::InvalidModifier(format!("unknown modifier {}", name))
            })?;
            let targets = targets.as_object().ok_or_else(|| {
                ExecutorError::InvalidModifier(format!("{} requires a document", name))
            })?;
            for (path, value) in targets {
                if is_protected_path(path) {
                    return Err(ExecutorError::InvalidModifier(format!(
                        "field {} is not updatable",
                        path
                    )));
                }
                mods.push(Mod {
                    op,
                    path: path.clone(),
                    value: value.clone(),
                });
            }
        }
        if mods.is_empty() {
            return Err(ExecutorError::InvalidModifier("empty modifier set".into()));
        }
        Ok(Self { mods, indexed: 0 })
    }

    /// Number of modifiers in the set.
    pub fn size(&self) -> usize {
        self.mods.len()
    }

    /// Recomputes how many modifier targets are covered by the given index
    /// fields. Called after yields, when the index set may have changed.
    pub fn update_index_coverage(&mut self, indexed_fields: &HashSet<String>) {
        self.indexed = self
            .mods
            .iter()
            .filter(|m| {
                indexed_fields.contains(&m.path)
                    || m.path
                        .split('.')
                        .next()
                        .map(|root| indexed_fields.contains(root))
                        .unwrap_or(false)
            })
            .count();
    }

    /// Returns true if any modifier target is indexed.
    pub fn is_indexed(&self) -> bool {
        self.indexed > 0
    }

    /// Applies the set to a document, producing an owned result.
    pub fn apply(&self, doc: &Value) -> ExecutorResult<Value> {
        let mut root = doc.as_object().cloned().unwrap_or_default();
        for m in &self.mods {
            apply_one(&mut root, m)?;
        }
        Ok(Value::Object(root))
    }

    /// The effective delta between the document before and after
    /// application, in `{$set: {...}, $unset: {...}}` form. Empty when the
    /// set was a no-op over this document.
    pub fn oplog_rewrite(&self, before: &Value, after: &Value) -> Value {
        let mut sets = Map::new();
        let mut unsets = Map::new();
        for m in &self.mods {
            let was = get_path(before, &m.path);
            let now = get_path(after, &m.path);
            if was == now {
                continue;
            }
            match now {
                Some(value) => {
                    sets.insert(m.path.clone(), value.clone());
                }
                None => {
                    unsets.insert(m.path.clone(), Value::Bool(true));
                }
            }
        }

        let mut out = Map::new();
        if !sets.is_empty() {
            out.insert("$set".to_string(), Value::Object(sets));
        }
        if !unsets.is_empty() {
            out.insert("$unset".to_string(), Value::Object(unsets));
        }
        Value::Object(out)
    }

    /// Builds the seed document of an operator upsert from the selector's
    /// plain equality fields. Operator constraints, dotted paths and the
    /// injected interval criterion contribute nothing.
    pub fn create_from_query(selector: &Value) -> Value {
        let mut out = Map::new();
        if let Some(fields) = selector.as_object() {
            for (key, value) in fields {
                if key.starts_with('$') || key.contains('.') || key == TRANSACTION_END {
                    continue;
                }
                if key == crate::query::TRANSACTION_OPERATOR {
                    continue;
                }
                if is_operator_value(value) {
                    continue;
                }
                out.insert(key.clone(), value.clone());
            }
        }
        Value::Object(out)
    }
}

/// Rejects a non-operator document that smuggles in `$` keys.
pub fn check_no_mods(doc: &Value) -> ExecutorResult<()> {
    if let Some(map) = doc.as_object() {
        for key in map.keys() {
            if key.starts_with('$') {
                return Err(ExecutorError::InvalidModifier(
                    "modifiers and non-modifiers cannot be mixed".into(),
                ));
            }
        }
    }
    Ok(())
}

fn is_protected_path(path: &str) -> bool {
    path == ID_FIELD || path.starts_with("_id.") || path == TRANSACTION_END
}

fn is_operator_value(value: &Value) -> bool {
    match value.as_object() {
        Some(map) => {
            !map.is_empty()
                && map.keys().all(|key| key.starts_with('$'))
                && crate::clock::OpTime::from_value(value).is_none()
        }
        None => false,
    }
}

fn apply_one(root: &mut Map<String, Value>, m: &Mod) -> ExecutorResult<()> {
    let create = m.op != ModOp::Unset;
    let (parent, leaf) = match descend(root, &m.path, create) {
        Some(found) => found,
        // Unset of a missing subtree is a no-op; anything else found a
        // non-object in the way.
        None if m.op == ModOp::Unset => return Ok(()),
        None => {
            return Err(ExecutorError::InvalidModifier(format!(
                "cannot traverse {}",
                m.path
            )))
        }
    };

    match m.op {
        ModOp::Set => {
            parent.insert(leaf, m.value.clone());
        }
        ModOp::Unset => {
            parent.remove(&leaf);
        }
        ModOp::Inc => {
            let current = parent.get(&leaf).cloned().unwrap_or(Value::Number(0.into()));
            let next = add_numbers(&current, &m.value).ok_or_else(|| {
                ExecutorError::InvalidModifier(format!("cannot apply $inc to {}", m.path))
            })?;
            parent.insert(leaf, next);
        }
        ModOp::Push => {
            let entry = parent.entry(leaf).or_insert_with(|| Value::Array(Vec::new()));
            match entry.as_array_mut() {
                Some(items) => items.push(m.value.clone()),
                None => {
                    return Err(ExecutorError::InvalidModifier(format!(
                        "cannot apply $push to non-array {}",
                        m.path
                    )))
                }
            }
        }
    }
    Ok(())
}

/// Walks to the parent object of `path`, creating intermediate objects when
/// `create` is set. Returns the parent map and the leaf key.
fn descend<'a>(
    root: &'a mut Map<String, Value>,
    path: &str,
    create: bool,
) -> Option<(&'a mut Map<String, Value>, String)> {
    let mut segments: Vec<&str> = path.split('.').collect();
    let leaf = segments.pop()?;

    let mut current = root;
    for segment in segments {
        if create {
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            current = entry.as_object_mut()?;
        } else {
            current = current.get_mut(segment)?.as_object_mut()?;
        }
    }
    Some((current, leaf.to_string()))
}

fn add_numbers(current: &Value, delta: &Value) -> Option<Value> {
    let (a, b) = match (current, delta) {
        (Value::Number(a), Value::Number(b)) => (a, b),
        _ => return None,
    };
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return Some(Value::Number(Number::from(x.checked_add(y)?)));
    }
    let sum = a.as_f64()? + b.as_f64()?;
    Number::from_f64(sum).map(Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operator_update_detection() {
        assert!(ModSet::is_operator_update(&json!({"$set": {"a": 1}})));
        assert!(!ModSet::is_operator_update(&json!({"a": 1})));
        assert!(!ModSet::is_operator_update(&json!({})));
    }

    #[test]
    fn test_mixed_keys_are_rejected() {
        let err = ModSet::parse(&json!({"$set": {"a": 1}, "b": 2})).unwrap_err();
        assert!(matches!(err, ExecutorError::InvalidModifier(_)));
    }

    #[test]
    fn test_unknown_modifier_is_rejected() {
        let err = ModSet::parse(&json!({"$rename": {"a": "b"}})).unwrap_err();
        assert!(matches!(err, ExecutorError::InvalidModifier(_)));
    }

    #[test]
    fn test_protected_fields_are_rejected() {
        for path in ["_id", "_id.transaction_start", "transaction_end"] {
            let err = ModSet::parse(&json!({ "$set": { path: 1 } })).unwrap_err();
            assert!(matches!(err, ExecutorError::InvalidModifier(_)), "{}", path);
        }
    }

    #[test]
    fn test_set_and_unset() {
        let mods = ModSet::parse(&json!({"$set": {"a": 2, "b.c": 3}, "$unset": {"d": 1}}))
            .expect("parse");
        let result = mods.apply(&json!({"_id": 1, "a": 1, "d": 4})).expect("apply");
        assert_eq!(result, json!({"_id": 1, "a": 2, "b": {"c": 3}}));
    }

    #[test]
    fn test_inc_creates_and_adds() {
        let mods = ModSet::parse(&json!({"$inc": {"a": 1, "b": 5}})).expect("parse");
        let result = mods.apply(&json!({"a": 41})).expect("apply");
        assert_eq!(result, json!({"a": 42, "b": 5}));
    }

    #[test]
    fn test_inc_non_number_fails() {
        let mods = ModSet::parse(&json!({"$inc": {"a": 1}})).expect("parse");
        let err = mods.apply(&json!({"a": "x"})).unwrap_err();
        assert!(matches!(err, ExecutorError::InvalidModifier(_)));
    }

    #[test]
    fn test_push_appends() {
        let mods = ModSet::parse(&json!({"$push": {"tags": "new"}})).expect("parse");
        assert_eq!(
            mods.apply(&json!({"tags": ["old"]})).expect("apply"),
            json!({"tags": ["old", "new"]})
        );
        assert_eq!(mods.apply(&json!({})).expect("apply"), json!({"tags": ["new"]}));
    }

    #[test]
    fn test_unset_missing_is_noop() {
        let mods = ModSet::parse(&json!({"$unset": {"a.b.c": 1}})).expect("parse");
        assert_eq!(mods.apply(&json!({"x": 1})).expect("apply"), json!({"x": 1}));
    }

    #[test]
    fn test_rewrite_captures_effective_delta() {
        let mods =
            ModSet::parse(&json!({"$set": {"a": 1}, "$unset": {"b": 1}})).expect("parse");
        let before = json!({"a": 0, "b": 2});
        let after = mods.apply(&before).expect("apply");
        assert_eq!(
            mods.oplog_rewrite(&before, &after),
            json!({"$set": {"a": 1}, "$unset": {"b": true}})
        );
    }

    #[test]
    fn test_rewrite_of_noop_is_empty() {
        let mods = ModSet::parse(&json!({"$set": {"a": 1}})).expect("parse");
        let before = json!({"a": 1});
        let after = mods.apply(&before).expect("apply");
        assert_eq!(mods.oplog_rewrite(&before, &after), json!({}));
    }

    #[test]
    fn test_create_from_query_keeps_plain_equalities() {
        let seed = ModSet::create_from_query(&json!({
            "_id": 7,
            "a": 1,
            "b": {"$gt": 5},
            "c.d": 2,
            "transaction_end": null,
            "$or": [{"x": 1}],
        }));
        assert_eq!(seed, json!({"_id": 7, "a": 1}));
    }

    #[test]
    fn test_index_coverage() {
        let mut mods = ModSet::parse(&json!({"$set": {"a.b": 1, "c": 2}})).expect("parse");
        assert!(!mods.is_indexed());
        mods.update_index_coverage(&["a".to_string()].into_iter().collect());
        assert!(mods.is_indexed());
        mods.update_index_coverage(&["z".to_string()].into_iter().collect());
        assert!(!mods.is_indexed());
    }
}
