//! In-memory overwrites storage, primarily for tests and embedding
//! scenarios with no durable backing store.

use parking_lot::Mutex;

use super::{ExternalChangeCallback, OverwritesStorage};

/// Holds the overwrites blob in memory. [`external_write`](Self::external_write)
/// simulates a change made by something other than this `Config` instance,
/// mirroring how [`FileOverwritesStorage`](super::FileOverwritesStorage)
/// reacts to an edit made by another process.
pub struct MemoryOverwritesStorage {
    data: Mutex<String>,
    callback: Mutex<Option<ExternalChangeCallback>>,
}

impl MemoryOverwritesStorage {
    #[must_use]
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            data: Mutex::new(initial.into()),
            callback: Mutex::new(None),
        }
    }

    /// Simulates an external write, e.g. another process editing the
    /// backing file. The callback only fires if the content actually
    /// changed.
    pub fn external_write(&self, blob: impl Into<String>) {
        let blob = blob.into();
        let changed = {
            let mut data = self.data.lock();
            if *data == blob {
                false
            } else {
                *data = blob;
                true
            }
        };
        if changed {
            if let Some(cb) = self.callback.lock().as_ref() {
                cb();
            }
        }
    }
}

impl Default for MemoryOverwritesStorage {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl OverwritesStorage for MemoryOverwritesStorage {
    fn read(&self) -> Option<String> {
        Some(self.data.lock().clone())
    }

    fn write(&self, blob: &str) {
        *self.data.lock() = blob.to_string();
    }

    fn set_external_change_callback(&self, callback: ExternalChangeCallback) {
        *self.callback.lock() = Some(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_after_write_roundtrips() {
        let storage = MemoryOverwritesStorage::default();
        storage.write(r#"{"a":1}"#);
        assert_eq!(storage.read().as_deref(), Some(r#"{"a":1}"#));
    }

    #[test]
    fn external_write_fires_callback_only_on_change() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let storage = MemoryOverwritesStorage::default();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        storage.set_external_change_callback(Box::new(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        }));

        storage.external_write(r#"{"a":1}"#);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // Same content again: no callback.
        storage.external_write(r#"{"a":1}"#);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        storage.external_write(r#"{"a":2}"#);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
