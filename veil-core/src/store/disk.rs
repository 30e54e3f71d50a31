//! On-disk session store.
//!
//! One JSON document per session, named by the SHA-256 of the session id so
//! arbitrary ids never become path components. Writes go through a temp file
//! in the same directory and a rename, so `get` observes either the previous
//! document or the new one, never a partial write.
//!
//! License: MIT OR Apache-2.0

use anyhow::Context;
use log::debug;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tempfile::NamedTempFile;

use crate::errors::VeilError;
use crate::masker::RehydrationMap;
use crate::store::SessionStore;

#[derive(Debug)]
pub struct DiskSessionStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl DiskSessionStore {
    /// Opens (and creates if needed) the store directory.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, VeilError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create session store at {}", root.display()))?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn session_path(&self, session_id: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(session_id.as_bytes());
        self.root.join(format!("{}.json", hex::encode(hasher.finalize())))
    }
}

impl SessionStore for DiskSessionStore {
    fn put(&self, session_id: &str, map: &RehydrationMap) -> Result<(), VeilError> {
        let document = serde_json::to_vec_pretty(map)
            .context("Failed to serialize rehydration map")?;
        let path = self.session_path(session_id);

        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut tmp = NamedTempFile::new_in(&self.root)
            .context("Failed to create temp file for session write")?;
        tmp.write_all(&document)
            .context("Failed to write session document")?;
        tmp.persist(&path)
            .map_err(|e| VeilError::IoError(e.error))?;
        debug!("Persisted session '{}' to {}", session_id, path.display());
        Ok(())
    }

    fn get(&self, session_id: &str) -> Result<RehydrationMap, VeilError> {
        let path = self.session_path(session_id);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(VeilError::SessionNotFound(session_id.to_string()));
            }
            Err(e) => return Err(VeilError::IoError(e)),
        };
        let map: RehydrationMap = serde_json::from_slice(&bytes)
            .with_context(|| format!("Corrupt session document {}", path.display()))?;
        Ok(map)
    }

    fn delete(&self, session_id: &str) -> Result<(), VeilError> {
        let path = self.session_path(session_id);
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(VeilError::SessionNotFound(session_id.to_string()))
            }
            Err(e) => Err(VeilError::IoError(e)),
        }
    }
}
