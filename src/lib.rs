#![forbid(unsafe_code)]

//! A hierarchical configuration store with layered defaults and persisted
//! overwrites, dotted-path access, typed accessors, and thread-safe change
//! observation.
//!
//! A [`Config`](core::config::Config) holds an immutable `defaults` tree and
//! a mutable effective `document` tree. Callers read and write through
//! dotted paths (`"window.width"`), subscribe to changes with
//! [`observe`](core::config::Config::observe), and the store transparently
//! persists the delta against defaults through a pluggable
//! [`OverwritesStorage`](storage::OverwritesStorage).

pub mod core;
pub mod executor;
pub mod observer;
pub mod path;
pub mod prelude;
pub mod storage;
pub mod value;
