//! In-memory session store.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::errors::VeilError;
use crate::masker::RehydrationMap;
use crate::store::SessionStore;

/// Process-local store backed by a read/write-locked map. Suited to tests
/// and single-process deployments; maps do not survive a restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, RehydrationMap>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemorySessionStore {
    fn put(&self, session_id: &str, map: &RehydrationMap) -> Result<(), VeilError> {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session_id.to_string(), map.clone());
        Ok(())
    }

    fn get(&self, session_id: &str) -> Result<RehydrationMap, VeilError> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
            .ok_or_else(|| VeilError::SessionNotFound(session_id.to_string()))
    }

    fn delete(&self, session_id: &str) -> Result<(), VeilError> {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id)
            .map(|_| ())
            .ok_or_else(|| VeilError::SessionNotFound(session_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::masker::RehydrationMap;

    #[test]
    fn put_get_delete_cycle() {
        let store = MemorySessionStore::new();
        let map = RehydrationMap::new();
        store.put("s1", &map).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.get("s1").is_ok());
        store.delete("s1").unwrap();
        assert!(matches!(
            store.get("s1"),
            Err(VeilError::SessionNotFound(_))
        ));
    }

    #[test]
    fn delete_missing_session_errors() {
        let store = MemorySessionStore::new();
        assert!(matches!(
            store.delete("ghost"),
            Err(VeilError::SessionNotFound(_))
        ));
    }
}
