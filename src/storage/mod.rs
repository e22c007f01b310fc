//! Backing stores for the persisted overwrites blob.

mod file;
mod memory;

pub use file::FileOverwritesStorage;
pub use memory::MemoryOverwritesStorage;

/// A single-slot callback invoked when the overwrites blob changed outside
/// of a [`OverwritesStorage::write`] call.
pub type ExternalChangeCallback = Box<dyn Fn() + Send + Sync>;

/// Reads and writes the serialized overwrites blob, and reports changes
/// made by something other than this process's own `write` calls.
pub trait OverwritesStorage: Send + Sync {
    /// Returns the current blob, or `None` if it could not be read (in
    /// which case the core proceeds with an empty overlay).
    fn read(&self) -> Option<String>;

    /// Persists `blob`, replacing any previous content.
    fn write(&self, blob: &str);

    /// Registers the callback invoked on an externally observed change.
    /// Only one callback is held at a time; registering a new one replaces
    /// the previous.
    fn set_external_change_callback(&self, callback: ExternalChangeCallback);
}
