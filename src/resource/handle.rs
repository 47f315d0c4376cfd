use crate::{Error, Result};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tempfile::TempPath;
use uuid::Uuid;

/// Where a handle's encoded bytes live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    TempFile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Active,
    Released,
}

enum Storage {
    Memory(Vec<u8>),
    TempFile(TempPath),
}

/// Opaque reference to encoded image bytes.
///
/// Clones share the same storage: releasing through any clone releases it
/// for all of them. The transition to [`HandleState::Released`] happens once
/// and later releases are no-ops.
#[derive(Clone)]
pub struct ResourceHandle {
    id: Uuid,
    kind: StorageKind,
    storage: Arc<Mutex<Option<Storage>>>,
}

impl ResourceHandle {
    pub fn in_memory(bytes: Vec<u8>) -> Self {
        Self::new(StorageKind::Memory, Storage::Memory(bytes))
    }

    /// Take ownership of a temporary file. The file is deleted on release,
    /// or when the last clone is dropped if it was never released.
    pub fn temp_file(path: TempPath) -> Self {
        Self::new(StorageKind::TempFile, Storage::TempFile(path))
    }

    fn new(kind: StorageKind, storage: Storage) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            storage: Arc::new(Mutex::new(Some(storage))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Storage>> {
        // A panic while holding this lock cannot leave the Option half-written
        self.storage.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> StorageKind {
        self.kind
    }

    pub fn state(&self) -> HandleState {
        if self.lock().is_some() {
            HandleState::Active
        } else {
            HandleState::Released
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == HandleState::Active
    }

    /// Path of the backing file for temp-file handles that are still active.
    pub fn path(&self) -> Option<PathBuf> {
        match self.lock().as_ref() {
            Some(Storage::TempFile(path)) => Some(path.to_path_buf()),
            _ => None,
        }
    }

    /// Copy out the encoded bytes. Fails once the handle is released.
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        let path = match self.lock().as_ref() {
            Some(Storage::Memory(bytes)) => return Ok(bytes.clone()),
            Some(Storage::TempFile(path)) => path.to_path_buf(),
            None => return Err(Error::ResourceReleased(self.id)),
        };
        Ok(std::fs::read(path)?)
    }

    /// Free the underlying bytes.
    ///
    /// Returns `Ok(true)` when this call released the handle and `Ok(false)`
    /// when it was already released. The handle counts as released even if
    /// deleting its file fails.
    pub fn release(&self) -> std::io::Result<bool> {
        let storage = self.lock().take();
        match storage {
            None => Ok(false),
            Some(Storage::Memory(_)) => Ok(true),
            Some(Storage::TempFile(path)) => path.close().map(|_| true),
        }
    }
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.state())
            .finish()
    }
}

impl PartialEq for ResourceHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ResourceHandle {}

impl Hash for ResourceHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
