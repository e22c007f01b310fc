//! The configuration engine: layered defaults/overwrites, dotted-path
//! access, typed accessors, and observer fan-out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::RwLock;

use crate::executor::{Executor, ImmediateExecutor};
use crate::observer::ObserverRegistry;
use crate::path;
use crate::storage::OverwritesStorage;
use crate::value::{self, Value};

use super::errors::ConfigError;

/// Move-only subscription handle; re-exported so callers can write
/// `config::Token` without reaching into the `observer` module directly.
pub use crate::observer::Token;

/// A hierarchical configuration store.
///
/// Always held behind an `Arc` (returned by [`Config::new`] /
/// [`Config::with_executors`]) because the store keeps a weak
/// self-reference so scheduled writes and reloads can run after the
/// originating call has returned.
pub struct Config {
    defaults: Value,
    document: RwLock<Value>,
    storage: Arc<dyn OverwritesStorage>,
    write_executor: Arc<dyn Executor>,
    reload_executor: Arc<dyn Executor>,
    registry: Arc<ObserverRegistry>,
    dirty: AtomicBool,
    read_scheduled: AtomicBool,
    self_ref: OnceLock<Weak<Config>>,
}

impl Config {
    /// Builds a store with immediate (synchronous) write and reload
    /// executors.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidDefaults`] if `default_document` is
    /// non-empty and fails to parse as JSON.
    pub fn new(
        default_document: &str,
        storage: Arc<dyn OverwritesStorage>,
    ) -> Result<Arc<Self>, ConfigError> {
        Self::with_executors(
            default_document,
            storage,
            Arc::new(ImmediateExecutor),
            Arc::new(ImmediateExecutor),
        )
    }

    /// Builds a store with explicit write/reload executors, e.g. to
    /// coalesce bursts of mutations with a
    /// [`DelayedAsyncExecutor`](crate::executor::DelayedAsyncExecutor).
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidDefaults`] if `default_document` is
    /// non-empty and fails to parse as JSON.
    pub fn with_executors(
        default_document: &str,
        storage: Arc<dyn OverwritesStorage>,
        write_executor: Arc<dyn Executor>,
        reload_executor: Arc<dyn Executor>,
    ) -> Result<Arc<Self>, ConfigError> {
        let defaults = Value::parse(default_document).map_err(|err| ConfigError::InvalidDefaults {
            details: err.to_string(),
        })?;

        let mut document = defaults.clone();
        if let Some(blob) = storage.read() {
            if !blob.trim().is_empty() {
                match Value::parse(&blob) {
                    Ok(overlay) => document = value::merge(&document, &overlay),
                    Err(err) => {
                        tracing::warn!(error = %err, "invalid overwrites at construction; falling back to defaults");
                    }
                }
            }
        }

        let config = Arc::new(Self {
            defaults,
            document: RwLock::new(document),
            storage: Arc::clone(&storage),
            write_executor,
            reload_executor,
            registry: Arc::new(ObserverRegistry::new()),
            dirty: AtomicBool::new(false),
            read_scheduled: AtomicBool::new(false),
            self_ref: OnceLock::new(),
        });
        let _ = config.self_ref.set(Arc::downgrade(&config));

        let weak = Arc::downgrade(&config);
        storage.set_external_change_callback(Box::new(move || {
            if let Some(config) = weak.upgrade() {
                config.schedule_reload();
            }
        }));

        Ok(config)
    }

    /// Whether `path` resolves to a node in the effective document.
    #[must_use]
    pub fn has(&self, path: &str) -> bool {
        let Some(segments) = path::split(path) else {
            return false;
        };
        self.document.read().lookup(&segments).is_some()
    }

    /// A deep copy of the node at `path`, or `Value::Null` if the path is
    /// invalid or does not resolve.
    #[must_use]
    pub fn get(&self, path: &str) -> Value {
        let Some(segments) = path::split(path) else {
            return Value::Null;
        };
        self.document
            .read()
            .lookup(&segments)
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Same as [`get`](Self::get) but reads from the immutable defaults
    /// tree rather than the effective document.
    #[must_use]
    pub fn get_default(&self, path: &str) -> Value {
        let Some(segments) = path::split(path) else {
            return Value::Null;
        };
        self.defaults.lookup(&segments).cloned().unwrap_or(Value::Null)
    }

    #[must_use]
    pub fn get_string(&self, path: &str) -> String {
        match self.get(path) {
            Value::String(s) => s,
            _ => String::new(),
        }
    }

    #[must_use]
    pub fn get_bool(&self, path: &str) -> bool {
        self.get(path).as_bool().unwrap_or(false)
    }

    #[must_use]
    pub fn get_int(&self, path: &str) -> i32 {
        coerce_i32(&self.get(path))
    }

    #[must_use]
    pub fn get_uint(&self, path: &str) -> u32 {
        coerce_u32(&self.get(path))
    }

    #[must_use]
    pub fn get_i64(&self, path: &str) -> i64 {
        coerce_i64(&self.get(path))
    }

    #[must_use]
    pub fn get_u64(&self, path: &str) -> u64 {
        coerce_u64(&self.get(path))
    }

    #[must_use]
    pub fn get_double(&self, path: &str) -> f64 {
        self.get(path).as_number().unwrap_or(0.0)
    }

    /// Sets the leaf at `path` to `new_value`.
    ///
    /// Only whole-path leaf writes are supported: every segment but the
    /// last must already resolve to an object in the document, and the
    /// last segment is inserted or replaced. A path whose intermediate
    /// segments don't already exist as objects is silently ignored — this
    /// store never invents schema on `set`. Setting a leaf to its current
    /// value is a no-op: no dirty flag, no observer fan-out.
    pub fn set(&self, path: &str, new_value: impl Into<Value>) {
        let Some(segments) = path::split(path) else {
            return;
        };
        let new_value = new_value.into();

        let changed = {
            let mut doc = self.document.write();
            set_leaf(&mut doc, &segments, new_value)
        };

        if changed {
            self.mark_dirty();
            self.registry.fire(path);
        }
    }

    /// Registers `callback` to run whenever the value at `path` may have
    /// changed. Returns a [`Token`] that unsubscribes on drop; safe to
    /// drop from inside the callback itself.
    pub fn observe(&self, path: &str, callback: impl Fn() + Send + Sync + 'static) -> Token {
        let (id, _) = self.registry.observe_raw(path, Box::new(callback));
        Token::new(&self.registry, path.to_string(), id)
    }

    /// Like [`observe`](Self::observe) but the subscription can never be
    /// removed.
    pub fn observe_forever(&self, path: &str, callback: impl Fn() + Send + Sync + 'static) {
        self.registry.observe_raw(path, Box::new(callback));
    }

    /// Discards all overwrites, restoring the document to the defaults
    /// tree, firing observers for every path that changed (leaves and
    /// their ancestors), and persisting an empty overlay.
    pub fn reset_to_defaults(&self) {
        let mut changed_paths = Vec::new();
        {
            let mut doc = self.document.write();
            value::collect_changed_paths(&doc, &self.defaults, "", &mut changed_paths);
            *doc = self.defaults.clone();
        }
        self.storage.write("");
        self.dirty.store(false, Ordering::SeqCst);
        for changed_path in &changed_paths {
            self.registry.fire(changed_path);
        }
    }

    /// Synchronously serializes and persists the overwrites overlay if a
    /// mutation is pending, bypassing the write executor. No-op if
    /// nothing is dirty.
    pub fn commit(&self) {
        if self.dirty.swap(false, Ordering::SeqCst) {
            let blob = {
                let doc = self.document.read();
                value::diff(&doc, &self.defaults).to_json_string()
            };
            self.storage.write(&blob);
        }
    }

    fn mark_dirty(&self) {
        if self.dirty.swap(true, Ordering::SeqCst) {
            return;
        }
        let Some(weak) = self.self_ref.get().cloned() else {
            return;
        };
        self.write_executor.execute(Box::new(move || {
            let Some(config) = weak.upgrade() else {
                return;
            };
            // Clear before serializing so a mutation that lands during
            // serialization re-arms scheduling rather than being missed.
            config.dirty.store(false, Ordering::SeqCst);
            let blob = {
                let doc = config.document.read();
                value::diff(&doc, &config.defaults).to_json_string()
            };
            config.storage.write(&blob);
        }));
    }

    fn schedule_reload(&self) {
        if self.read_scheduled.swap(true, Ordering::SeqCst) {
            return;
        }
        let Some(weak) = self.self_ref.get().cloned() else {
            return;
        };
        self.reload_executor.execute(Box::new(move || {
            if let Some(config) = weak.upgrade() {
                config.reload();
            }
        }));
    }

    fn reload(&self) {
        let blob = self.storage.read();
        self.read_scheduled.store(false, Ordering::SeqCst);
        let Some(blob) = blob else {
            return;
        };

        let overlay = if blob.trim().is_empty() {
            Value::Object(Vec::new())
        } else {
            match Value::parse(&blob) {
                Ok(v) => v,
                Err(err) => {
                    tracing::warn!(error = %err, "invalid overwrites on reload; keeping previous document");
                    return;
                }
            }
        };

        let new_document = value::merge(&self.defaults, &overlay);
        let mut changed_paths = Vec::new();
        {
            let mut doc = self.document.write();
            value::collect_changed_paths(&doc, &new_document, "", &mut changed_paths);
            *doc = new_document;
        }
        for changed_path in &changed_paths {
            self.registry.fire(changed_path);
        }
    }
}

fn set_leaf(doc: &mut Value, segments: &[&str], new_value: Value) -> bool {
    if segments.len() == 1 {
        if !doc.is_object() {
            return false;
        }
        let key = segments[0];
        if doc.field(key) == Some(&new_value) {
            return false;
        }
        doc.set_field(key, new_value);
        true
    } else {
        let Some(child) = doc.field_mut(segments[0]) else {
            return false;
        };
        if !child.is_object() {
            return false;
        }
        set_leaf(child, &segments[1..], new_value)
    }
}

fn coerce_i32(v: &Value) -> i32 {
    match v {
        Value::Int(n) => *n,
        Value::UInt(n) => i32::try_from(*n).unwrap_or(i32::MAX),
        #[allow(clippy::cast_possible_truncation)]
        Value::Int64(n) => *n as i32,
        #[allow(clippy::cast_possible_truncation)]
        Value::UInt64(n) => *n as i32,
        #[allow(clippy::cast_possible_truncation)]
        Value::Double(n) => *n as i32,
        _ => 0,
    }
}

fn coerce_u32(v: &Value) -> u32 {
    match v {
        #[allow(clippy::cast_sign_loss)]
        Value::Int(n) => *n as u32,
        Value::UInt(n) => *n,
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Value::Int64(n) => *n as u32,
        #[allow(clippy::cast_possible_truncation)]
        Value::UInt64(n) => *n as u32,
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Value::Double(n) => *n as u32,
        _ => 0,
    }
}

fn coerce_i64(v: &Value) -> i64 {
    match v {
        Value::Int(n) => i64::from(*n),
        Value::UInt(n) => i64::from(*n),
        Value::Int64(n) => *n,
        #[allow(clippy::cast_possible_wrap)]
        Value::UInt64(n) => *n as i64,
        #[allow(clippy::cast_possible_truncation)]
        Value::Double(n) => *n as i64,
        _ => 0,
    }
}

fn coerce_u64(v: &Value) -> u64 {
    match v {
        #[allow(clippy::cast_sign_loss)]
        Value::Int(n) => *n as u64,
        Value::UInt(n) => u64::from(*n),
        #[allow(clippy::cast_sign_loss)]
        Value::Int64(n) => *n as u64,
        Value::UInt64(n) => *n,
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Value::Double(n) => *n as u64,
        _ => 0,
    }
}
