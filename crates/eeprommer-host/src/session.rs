//! The single in-flight file session.

use std::fmt;
use std::path::{Path, PathBuf};

use eeprommer_protocol::AccessMode;

use crate::error::{HostError, HostResult};
use crate::storage::{Storage, StorageHandle};

/// The file the programmer is currently working on.
///
/// Created by FILEOPEN, given a storage handle by FILECONF, and dropped by
/// FILECLOS. The session owns its handle; dropping the session releases it.
pub struct FileSession {
    path: PathBuf,
    must_exist: bool,
    access: Option<AccessMode>,
    handle: Option<Box<dyn StorageHandle>>,
}

impl FileSession {
    /// Start a session for a resolved path.
    pub fn new(path: PathBuf, must_exist: bool) -> Self {
        FileSession {
            path,
            must_exist,
            access: None,
            handle: None,
        }
    }

    /// Path chosen at FILEOPEN time.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the programmer required the file to exist.
    pub fn must_exist(&self) -> bool {
        self.must_exist
    }

    /// Access mode from FILECONF, once configured.
    pub fn access(&self) -> Option<AccessMode> {
        self.access
    }

    /// Whether the storage handle is open.
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Record the access mode and open the storage handle.
    ///
    /// The access mode is kept even if opening fails.
    pub fn configure(&mut self, storage: &mut dyn Storage, access: AccessMode) -> HostResult<()> {
        self.access = Some(access);
        let handle = storage
            .open(&self.path, access)
            .map_err(HostError::storage("open"))?;
        self.handle = Some(handle);
        Ok(())
    }

    /// The open storage handle.
    pub fn handle(&mut self) -> HostResult<&mut dyn StorageHandle> {
        match self.handle.as_mut() {
            Some(handle) => Ok(handle.as_mut()),
            None => Err(HostError::NoOpenFile),
        }
    }

    /// Release the storage handle.
    ///
    /// Returns whether a handle was actually released.
    pub fn release(&mut self) -> bool {
        self.handle.take().is_some()
    }
}

impl fmt::Debug for FileSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSession")
            .field("path", &self.path)
            .field("must_exist", &self.must_exist)
            .field("access", &self.access)
            .field("open", &self.is_open())
            .finish()
    }
}
