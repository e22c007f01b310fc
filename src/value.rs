//! Tagged JSON-like value tree used as the document model.
//!
//! Distinct numeric variants are kept instead of collapsing onto a single
//! `f64`/`serde_json::Number` representation so typed accessors can make a
//! deliberate truncate-or-zero decision per requested type, matching the
//! coercion rules callers rely on.

use serde_json::Value as JsonValue;

/// A node in a configuration tree.
///
/// Objects preserve insertion order (backed by a `Vec` of pairs rather than
/// a `HashMap`) so re-serializing an unmodified tree is deterministic and
/// diff-friendly.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    UInt(u32),
    Int64(i64),
    UInt64(u64),
    Double(f64),
    String(String),
    Array(Vec<Value>),
    Object(Vec<(String, Value)>),
}

impl Value {
    #[must_use]
    pub fn object() -> Self {
        Value::Object(Vec::new())
    }

    #[must_use]
    pub const fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Looks up a field by key if this node is an object.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Looks up a field by key if this node is an object, mutably.
    pub fn field_mut(&mut self, key: &str) -> Option<&mut Value> {
        match self {
            Value::Object(entries) => entries.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Inserts or replaces a field. Panics if called on a non-object,
    /// non-null node; callers are expected to check `is_object` first.
    pub fn set_field(&mut self, key: &str, value: Value) {
        if matches!(self, Value::Null) {
            *self = Value::object();
        }
        let Value::Object(entries) = self else {
            return;
        };
        if let Some(existing) = entries.iter_mut().find(|(k, _)| k == key) {
            existing.1 = value;
        } else {
            entries.push((key.to_string(), value));
        }
    }

    /// Walks a sequence of object keys, returning the node reached, or
    /// `None` if any intermediate segment is missing or not an object.
    #[must_use]
    pub fn lookup(&self, segments: &[&str]) -> Option<&Value> {
        let mut cur = self;
        for seg in segments {
            cur = cur.field(seg)?;
        }
        Some(cur)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric value as `f64`, if this node is any numeric variant.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(f64::from(*n)),
            Value::UInt(n) => Some(f64::from(*n)),
            #[allow(clippy::cast_precision_loss)]
            Value::Int64(n) => Some(*n as f64),
            #[allow(clippy::cast_precision_loss)]
            Value::UInt64(n) => Some(*n as f64),
            Value::Double(n) => Some(*n),
            _ => None,
        }
    }

    /// Parses a JSON document into a `Value` tree. An empty or
    /// whitespace-only input yields `Value::Null`.
    pub fn parse(text: &str) -> Result<Value, serde_json::Error> {
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        let json: JsonValue = serde_json::from_str(text)?;
        Ok(Value::from_json(&json))
    }

    /// Serializes this tree to compact JSON text.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }

    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(n) => JsonValue::from(*n),
            Value::UInt(n) => JsonValue::from(*n),
            Value::Int64(n) => JsonValue::from(*n),
            Value::UInt64(n) => JsonValue::from(*n),
            Value::Double(n) => serde_json::Number::from_f64(*n)
                .map_or(JsonValue::Null, JsonValue::Number),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Array(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(entries) => JsonValue::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    fn from_json(json: &JsonValue) -> Value {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    if let Ok(i32_val) = i32::try_from(i) {
                        Value::Int(i32_val)
                    } else {
                        Value::Int64(i)
                    }
                } else if let Some(u) = n.as_u64() {
                    if let Ok(u32_val) = u32::try_from(u) {
                        Value::UInt(u32_val)
                    } else {
                        Value::UInt64(u)
                    }
                } else {
                    Value::Double(n.as_f64().unwrap_or(0.0))
                }
            }
            JsonValue::String(s) => Value::String(s.clone()),
            JsonValue::Array(items) => Value::Array(items.iter().map(Value::from_json).collect()),
            JsonValue::Object(map) => {
                Value::Object(map.iter().map(|(k, v)| (k.clone(), Value::from_json(v))).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::UInt(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

/// Merges `overlay` onto `base`, recursing into matching object fields.
/// Non-object overlay values (including type changes) replace the base
/// value outright; keys present only in `base` are left untouched.
#[must_use]
pub fn merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_entries), Value::Object(overlay_entries)) => {
            let mut result = base_entries.clone();
            for (key, overlay_val) in overlay_entries {
                if let Some(existing) = result.iter_mut().find(|(k, _)| k == key) {
                    existing.1 = merge(&existing.1, overlay_val);
                } else {
                    result.push((key.clone(), overlay_val.clone()));
                }
            }
            Value::Object(result)
        }
        (_, overlay_val) => overlay_val.clone(),
    }
}

/// Structural diff: the subset of `document` that differs from
/// `defaults`, recursing into shared object fields. Keys present in
/// `defaults` but absent from `document` are not represented (this diff
/// is meant to reconstruct `document` by merging onto `defaults`, not to
/// express deletions).
#[must_use]
pub fn diff(document: &Value, defaults: &Value) -> Value {
    match (document, defaults) {
        (Value::Object(doc_entries), Value::Object(def_entries)) => {
            let mut result = Vec::new();
            for (key, doc_val) in doc_entries {
                match def_entries.iter().find(|(k, _)| k == key) {
                    Some((_, def_val)) if doc_val == def_val => {}
                    Some((_, def_val)) if doc_val.is_object() && def_val.is_object() => {
                        let sub = diff(doc_val, def_val);
                        if sub != Value::Object(Vec::new()) {
                            result.push((key.clone(), sub));
                        }
                    }
                    _ => result.push((key.clone(), doc_val.clone())),
                }
            }
            Value::Object(result)
        }
        _ if document == defaults => Value::Object(Vec::new()),
        _ => document.clone(),
    }
}

/// Collects every dotted path whose value differs between `old` and
/// `new`, plus every ancestor path along the way, so an observer
/// registered on a parent path is notified when a descendant changes.
///
/// When exactly one side of a key is an `Object` and the other isn't (a
/// type change, not merely a value change within a stable shape), the
/// object side is walked against an implicit empty object so every one of
/// its descendant leaf and ancestor paths is still emitted, rather than
/// stopping at the path where the types diverge.
#[must_use]
pub fn collect_changed_paths(old: &Value, new: &Value, prefix: &str, out: &mut Vec<String>) {
    if old == new {
        return;
    }

    if old.is_object() || new.is_object() {
        let empty: Vec<(String, Value)> = Vec::new();
        let old_entries = match old {
            Value::Object(entries) => entries,
            _ => &empty,
        };
        let new_entries = match new {
            Value::Object(entries) => entries,
            _ => &empty,
        };

        let mut keys: Vec<&String> = Vec::new();
        for (k, _) in old_entries {
            if !keys.contains(&k) {
                keys.push(k);
            }
        }
        for (k, _) in new_entries {
            if !keys.contains(&k) {
                keys.push(k);
            }
        }

        for key in keys {
            let old_child = old_entries.iter().find(|(k, _)| k == key).map(|(_, v)| v);
            let new_child = new_entries.iter().find(|(k, _)| k == key).map(|(_, v)| v);
            let child_path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            match (old_child, new_child) {
                (Some(o), Some(n)) => collect_changed_paths(o, n, &child_path, out),
                (Some(o), None) => collect_changed_paths(o, &Value::Null, &child_path, out),
                (None, Some(n)) => collect_changed_paths(&Value::Null, n, &child_path, out),
                (None, None) => {}
            }
        }

        // `old != new` was already established above, and at least one
        // side being an object means the two shapes genuinely differ
        // (a key set difference or a nested value difference), so the
        // path itself is always part of the changed set here.
        if !prefix.is_empty() {
            out.push(prefix.to_string());
        }
    } else if !prefix.is_empty() {
        out.push(prefix.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_is_null() {
        assert_eq!(Value::parse("").unwrap(), Value::Null);
        assert_eq!(Value::parse("   ").unwrap(), Value::Null);
    }

    #[test]
    fn parse_rejects_invalid_json() {
        assert!(Value::parse("not json").is_err());
    }

    #[test]
    fn roundtrip_preserves_object_order() {
        let text = r#"{"z": 1, "a": 2, "m": 3}"#;
        let v = Value::parse(text).unwrap();
        let back = v.to_json_string();
        assert_eq!(back, r#"{"z":1,"a":2,"m":3}"#);
    }

    #[test]
    fn lookup_walks_nested_objects() {
        let v = Value::parse(r#"{"a": {"b": {"c": 42}}}"#).unwrap();
        let found = v.lookup(&["a", "b", "c"]).unwrap();
        assert_eq!(found.as_number(), Some(42.0));
    }

    #[test]
    fn lookup_missing_returns_none() {
        let v = Value::parse(r#"{"a": 1}"#).unwrap();
        assert!(v.lookup(&["a", "b"]).is_none());
        assert!(v.lookup(&["missing"]).is_none());
    }

    #[test]
    fn merge_overlays_nested_and_introduces_keys() {
        let base = Value::parse(r#"{"a": {"b": 1, "c": 2}, "d": 5}"#).unwrap();
        let overlay = Value::parse(r#"{"a": {"b": 99, "e": 7}}"#).unwrap();
        let merged = merge(&base, &overlay);
        assert_eq!(merged.lookup(&["a", "b"]).unwrap().as_number(), Some(99.0));
        assert_eq!(merged.lookup(&["a", "c"]).unwrap().as_number(), Some(2.0));
        assert_eq!(merged.lookup(&["a", "e"]).unwrap().as_number(), Some(7.0));
        assert_eq!(merged.lookup(&["d"]).unwrap().as_number(), Some(5.0));
    }

    #[test]
    fn merge_allows_type_change() {
        let base = Value::parse(r#"{"a": 1}"#).unwrap();
        let overlay = Value::parse(r#"{"a": {"nested": true}}"#).unwrap();
        let merged = merge(&base, &overlay);
        assert!(merged.lookup(&["a"]).unwrap().is_object());
    }

    #[test]
    fn diff_is_empty_when_equal() {
        let defaults = Value::parse(r#"{"a": 1, "b": {"c": 2}}"#).unwrap();
        let document = defaults.clone();
        assert_eq!(diff(&document, &defaults), Value::Object(Vec::new()));
    }

    #[test]
    fn diff_captures_overridden_and_new_keys() {
        let defaults = Value::parse(r#"{"a": 1, "b": {"c": 2, "d": 3}}"#).unwrap();
        let document = Value::parse(r#"{"a": 1, "b": {"c": 99, "d": 3}, "e": "new"}"#).unwrap();
        let d = diff(&document, &defaults);
        assert_eq!(d.lookup(&["b", "c"]).unwrap().as_number(), Some(99.0));
        assert!(d.lookup(&["b", "d"]).is_none());
        assert!(d.lookup(&["a"]).is_none());
        assert_eq!(d.lookup(&["e"]).unwrap().as_str(), Some("new"));
    }

    #[test]
    fn collect_changed_paths_includes_ancestors() {
        let old = Value::parse(r#"{"abra": {"cadabra": {"alakazam": 1}}}"#).unwrap();
        let new = Value::parse(r#"{"abra": {"cadabra": {"alakazam": 2}}}"#).unwrap();
        let mut out = Vec::new();
        collect_changed_paths(&old, &new, "", &mut out);
        assert!(out.contains(&"abra".to_string()));
        assert!(out.contains(&"abra.cadabra".to_string()));
        assert!(out.contains(&"abra.cadabra.alakazam".to_string()));
    }

    #[test]
    fn collect_changed_paths_empty_when_equal() {
        let v = Value::parse(r#"{"a": 1}"#).unwrap();
        let mut out = Vec::new();
        collect_changed_paths(&v, &v, "", &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn collect_changed_paths_walks_object_side_on_type_change() {
        // `abra` flips from a nested object (old) to a scalar (new); every
        // descendant of the object side must still be reported, not just
        // the path where the types diverge.
        let old = Value::parse(r#"{"abra": {"cadabra": {"alakazam": 17}}}"#).unwrap();
        let new = Value::parse(r#"{"abra": 42}"#).unwrap();
        let mut out = Vec::new();
        collect_changed_paths(&old, &new, "", &mut out);
        assert!(out.contains(&"abra".to_string()));
        assert!(out.contains(&"abra.cadabra".to_string()));
        assert!(out.contains(&"abra.cadabra.alakazam".to_string()));

        // Symmetric case: scalar (old) to nested object (new).
        let mut out_rev = Vec::new();
        collect_changed_paths(&new, &old, "", &mut out_rev);
        assert!(out_rev.contains(&"abra".to_string()));
        assert!(out_rev.contains(&"abra.cadabra".to_string()));
        assert!(out_rev.contains(&"abra.cadabra.alakazam".to_string()));
    }
}
