//! Session-scoped persistence for rehydration maps.
//!
//! Convenience wrappers sanitize straight into a store and rehydrate by
//! session id; the sanitization pipeline itself never touches storage. The
//! contract is small: `put`/`get`/`delete`, atomic with respect to each
//! other on a given key, and a missing session is always surfaced, never
//! silently recovered.
//!
//! License: MIT OR Apache-2.0

pub mod disk;
pub mod memory;

pub use disk::DiskSessionStore;
pub use memory::MemorySessionStore;

use crate::errors::VeilError;
use crate::masker::RehydrationMap;
use crate::parsers::Document;
use crate::sanitizer::rehydrate_document;

/// A key/value persistence layer for rehydration maps.
///
/// Implementations must make `put`/`get`/`delete` atomic per key: a reader
/// never observes a partial write.
pub trait SessionStore: Send + Sync {
    /// Persists `map` under `session_id`, replacing any previous map.
    fn put(&self, session_id: &str, map: &RehydrationMap) -> Result<(), VeilError>;

    /// Fetches the map stored under `session_id`.
    fn get(&self, session_id: &str) -> Result<RehydrationMap, VeilError>;

    /// Removes the map stored under `session_id`.
    fn delete(&self, session_id: &str) -> Result<(), VeilError>;
}

/// Rehydrates a document with the map stored under `session_id`.
pub fn rehydrate_from_store(
    store: &dyn SessionStore,
    session_id: &str,
    doc: &Document,
) -> Result<Document, VeilError> {
    let map = store.get(session_id)?;
    Ok(rehydrate_document(doc, &map))
}
