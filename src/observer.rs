//! Path-keyed observer registry with copy-on-write fan-out lists and
//! lifetime-scoped subscription tokens.
//!
//! Each path maps to an immutable, shared vector of observer records.
//! Subscribing or unsubscribing replaces the vector wholesale (copy-on-write)
//! so a firing pass can take a private reference to the list and invoke
//! callbacks without holding the registry lock — a callback is free to
//! subscribe, unsubscribe, or mutate the store it belongs to.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{ReentrantMutex, RwLock};

/// Callback invoked when the value at an observed path may have changed.
/// Carries no arguments by design: observers re-read through the store.
pub type Callback = Box<dyn Fn() + Send + Sync>;

pub(crate) struct ObserverRecord {
    token: u64,
    callback: Callback,
    removed: std::sync::atomic::AtomicBool,
    /// Held during callback invocation and during removal, so a callback
    /// that drops its own token on the same thread doesn't deadlock, while
    /// a concurrent drop from another thread waits for the callback to
    /// finish.
    fire_lock: ReentrantMutex<()>,
}

impl ObserverRecord {
    fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }
}

/// Path-keyed table of observer lists plus the monotonic token counter.
pub struct ObserverRegistry {
    buckets: RwLock<HashMap<String, Arc<Vec<Arc<ObserverRecord>>>>>,
    next_token: AtomicU64,
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ObserverRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
            next_token: AtomicU64::new(1),
        }
    }

    fn alloc_token(&self) -> u64 {
        self.next_token.fetch_add(1, Ordering::Relaxed)
    }

    fn insert(&self, path: &str, record: Arc<ObserverRecord>) {
        let mut buckets = self.buckets.write();
        let entry = buckets.entry(path.to_string()).or_default();
        let mut updated = (**entry).clone();
        updated.push(record);
        *entry = Arc::new(updated);
    }

    /// Registers `callback` on `path`, returning the freshly allocated
    /// token id and the registered record.
    pub(crate) fn observe_raw(&self, path: &str, callback: Callback) -> (u64, Arc<ObserverRecord>) {
        let token = self.alloc_token();
        let record = Arc::new(ObserverRecord {
            token,
            callback,
            removed: std::sync::atomic::AtomicBool::new(false),
            fire_lock: ReentrantMutex::new(()),
        });
        self.insert(path, Arc::clone(&record));
        (token, record)
    }

    /// Removes the observer with `token` from `path`'s bucket and marks it
    /// removed. Safe to call from inside the observer's own callback.
    pub(crate) fn drop_token(&self, path: &str, token: u64) {
        let removed_record = {
            let mut buckets = self.buckets.write();
            let Some(entry) = buckets.get_mut(path) else {
                return;
            };
            if !entry.iter().any(|r| r.token == token) {
                return;
            }
            let updated: Vec<Arc<ObserverRecord>> =
                entry.iter().filter(|r| r.token != token).cloned().collect();
            let removed = entry.iter().find(|r| r.token == token).cloned();
            *entry = Arc::new(updated);
            removed
        };
        if let Some(record) = removed_record {
            let _guard = record.fire_lock.lock();
            record.removed.store(true, Ordering::Release);
        }
    }

    /// Invokes every live observer registered on `path`, taking a private
    /// snapshot of the bucket first so the registry lock is never held
    /// during a callback.
    pub(crate) fn fire(&self, path: &str) {
        let snapshot = {
            let buckets = self.buckets.read();
            buckets.get(path).cloned()
        };
        let Some(records) = snapshot else {
            return;
        };
        for record in records.iter() {
            let _guard = record.fire_lock.lock();
            if record.is_removed() {
                continue;
            }
            (record.callback)();
        }
    }
}

/// Move-only RAII handle for a subscription created by
/// [`Config::observe`](crate::core::config::Config::observe). Dropping it
/// unsubscribes the associated callback; it is safe to drop (or otherwise
/// destroy, e.g. `std::mem::drop`) a token from inside its own callback.
pub struct Token {
    registry: Weak<ObserverRegistry>,
    path: String,
    id: u64,
}

impl Token {
    pub(crate) fn new(registry: &Arc<ObserverRegistry>, path: String, id: u64) -> Self {
        Self {
            registry: Arc::downgrade(registry),
            path,
            id,
        }
    }
}

impl Drop for Token {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.drop_token(&self.path, self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn fires_all_registered_observers_once() {
        let registry = Arc::new(ObserverRegistry::new());
        let count = Arc::new(AtomicUsize::new(0));
        let c1 = Arc::clone(&count);
        let c2 = Arc::clone(&count);
        let (id1, _) = registry.observe_raw("abra", Box::new(move || {
            c1.fetch_add(1, Ordering::SeqCst);
        }));
        let (id2, _) = registry.observe_raw("abra", Box::new(move || {
            c2.fetch_add(1, Ordering::SeqCst);
        }));
        registry.fire("abra");
        assert_eq!(count.load(Ordering::SeqCst), 2);
        registry.drop_token("abra", id1);
        registry.drop_token("abra", id2);
    }

    #[test]
    fn dropped_token_stops_firing() {
        let registry = Arc::new(ObserverRegistry::new());
        let count = Arc::new(AtomicUsize::new(0));
        let c1 = Arc::clone(&count);
        let token = {
            let (id, _) = registry.observe_raw("abra", Box::new(move || {
                c1.fetch_add(1, Ordering::SeqCst);
            }));
            Token::new(&registry, "abra".to_string(), id)
        };
        registry.fire("abra");
        assert_eq!(count.load(Ordering::SeqCst), 1);
        drop(token);
        registry.fire("abra");
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn observer_can_remove_itself_from_within_callback() {
        let registry = Arc::new(ObserverRegistry::new());
        let token_slot: Arc<parking_lot::Mutex<Option<Token>>> =
            Arc::new(parking_lot::Mutex::new(None));
        let slot_clone = Arc::clone(&token_slot);
        let registry_clone = Arc::clone(&registry);
        let (id, _) = registry_clone.observe_raw(
            "abra",
            Box::new(move || {
                slot_clone.lock().take();
            }),
        );
        *token_slot.lock() = Some(Token::new(&registry, "abra".to_string(), id));
        registry.fire("abra");
        assert!(token_slot.lock().is_none());
        registry.fire("abra");
    }
}
