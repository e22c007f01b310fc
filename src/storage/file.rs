//! File-backed overwrites storage: atomic write-then-rename persistence
//! plus a directory watcher that reports external edits while filtering
//! out the echo of this process's own writes.

use std::fs::{self, File};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::SystemTime;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;

use super::{ExternalChangeCallback, OverwritesStorage};

struct Inner {
    path: PathBuf,
    last_written_mtime: Mutex<Option<SystemTime>>,
    callback: Mutex<Option<ExternalChangeCallback>>,
    // Keeps the watcher thread alive for the lifetime of the storage.
    watcher: Mutex<Option<RecommendedWatcher>>,
}

/// Persists the overwrites blob to a single JSON file, atomically, and
/// watches its parent directory for edits made by anything other than
/// this instance's own [`write`](OverwritesStorage::write) calls.
pub struct FileOverwritesStorage {
    inner: Arc<Inner>,
}

impl FileOverwritesStorage {
    /// Opens storage backed by `path`. The parent directory is watched
    /// immediately; if it cannot be watched (e.g. it doesn't exist yet),
    /// external-change notification is silently disabled and only
    /// explicit reads/writes through this handle are observed.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let inner = Arc::new(Inner {
            path: path.clone(),
            last_written_mtime: Mutex::new(None),
            callback: Mutex::new(None),
            watcher: Mutex::new(None),
        });

        let weak: Weak<Inner> = Arc::downgrade(&inner);
        let watch_target = path.clone();
        let watch_result = notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
            let Ok(event) = event else { return };
            if !event.paths.iter().any(|p| p == &watch_target) {
                return;
            }
            let Some(inner) = weak.upgrade() else { return };
            Inner::handle_fs_event(&inner);
        });

        if let Ok(mut watcher) = watch_result {
            let parent = path.parent().unwrap_or_else(|| Path::new("."));
            if watcher.watch(parent, RecursiveMode::NonRecursive).is_ok() {
                *inner.watcher.lock() = Some(watcher);
            } else {
                tracing::warn!(path = %path.display(), "failed to watch overwrites directory");
            }
        } else {
            tracing::warn!(path = %path.display(), "failed to construct overwrites file watcher");
        }

        Self { inner }
    }
}

impl Inner {
    fn handle_fs_event(inner: &Arc<Inner>) {
        let Ok(metadata) = fs::metadata(&inner.path) else {
            return;
        };
        let Ok(observed_mtime) = metadata.modified() else {
            return;
        };
        let is_echo = inner
            .last_written_mtime
            .lock()
            .is_some_and(|recorded| recorded >= observed_mtime);
        if is_echo {
            return;
        }
        if let Some(cb) = inner.callback.lock().as_ref() {
            cb();
        }
    }
}

impl OverwritesStorage for FileOverwritesStorage {
    fn read(&self) -> Option<String> {
        fs::read_to_string(&self.inner.path).ok()
    }

    fn write(&self, blob: &str) {
        let tmp_path = self.inner.path.with_extension("json.tmp");
        let result = (|| -> std::io::Result<()> {
            let mut file = File::create(&tmp_path)?;
            file.write_all(blob.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp_path, &self.inner.path)?;
            Ok(())
        })();

        match result {
            Ok(()) => {
                if let Ok(metadata) = fs::metadata(&self.inner.path) {
                    if let Ok(mtime) = metadata.modified() {
                        *self.inner.last_written_mtime.lock() = Some(mtime);
                    }
                }
            }
            Err(err) => {
                let _ = fs::remove_file(&tmp_path);
                tracing::error!(path = %self.inner.path.display(), error = %err, "overwrites write failed");
            }
        }
    }

    fn set_external_change_callback(&self, callback: ExternalChangeCallback) {
        *self.inner.callback.lock() = Some(callback);
    }
}
