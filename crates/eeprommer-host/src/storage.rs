//! Storage backend for file sessions.
//!
//! The dispatcher only sees [`Storage`] and [`StorageHandle`]; the default
//! [`FsStorage`] maps the programmer's access bits onto the host filesystem.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use eeprommer_protocol::AccessMode;

/// An open file owned by a session.
///
/// Dropping the handle releases it.
pub trait StorageHandle: Read + Write + Seek {
    /// Current size in bytes.
    fn size(&mut self) -> io::Result<u64>;

    /// Make all written data durable.
    fn sync(&mut self) -> io::Result<()>;
}

/// Opens storage handles for sessions.
pub trait Storage {
    /// Open `path` according to `access`.
    fn open(&mut self, path: &Path, access: AccessMode) -> io::Result<Box<dyn StorageHandle>>;
}

/// Host filesystem storage.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsStorage;

impl FsStorage {
    /// Translate device access bits into open options.
    ///
    /// Combinations the host cannot honor (no read or write bit, truncate
    /// without write) are rejected by `OpenOptions::open`.
    pub fn open_options(access: AccessMode) -> OpenOptions {
        let mut options = OpenOptions::new();
        options
            .read(access.contains(AccessMode::READ))
            .write(access.contains(AccessMode::WRITE))
            .append(access.contains(AccessMode::APPEND))
            .truncate(access.contains(AccessMode::TRUNC));

        if access.contains(AccessMode::CREAT | AccessMode::EXCL) {
            options.create_new(true);
        } else if access.contains(AccessMode::CREAT) {
            options.create(true);
        }
        options
    }
}

impl Storage for FsStorage {
    fn open(&mut self, path: &Path, access: AccessMode) -> io::Result<Box<dyn StorageHandle>> {
        let mut file = Self::open_options(access).open(path)?;
        if access.contains(AccessMode::AT_END) {
            file.seek(SeekFrom::End(0))?;
        }
        Ok(Box::new(FileHandle {
            file,
            sync_writes: access.contains(AccessMode::SYNC),
        }))
    }
}

/// A host file opened by [`FsStorage`].
#[derive(Debug)]
pub struct FileHandle {
    file: File,
    sync_writes: bool,
}

impl Read for FileHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for FileHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.file.write(buf)?;
        if self.sync_writes {
            self.file.sync_data()?;
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for FileHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl StorageHandle for FileHandle {
    fn size(&mut self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn sync(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.file.sync_all()
    }
}

/// Read until `buf` is full or the handle reports end of file.
///
/// Returns the number of bytes read.
pub fn read_up_to(handle: &mut dyn StorageHandle, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match handle.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_read_only_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.bin");
        fs::write(&path, [1u8, 2, 3, 4]).unwrap();

        let mut handle = FsStorage.open(&path, AccessMode::READ).unwrap();
        assert_eq!(handle.size().unwrap(), 4);

        let mut buf = [0u8; 8];
        assert_eq!(read_up_to(handle.as_mut(), &mut buf).unwrap(), 4);
        assert_eq!(&buf[..4], &[1, 2, 3, 4]);
        assert!(handle.write(&[9]).is_err());
    }

    #[test]
    fn test_create_truncate_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.bin");
        fs::write(&path, [0xFFu8; 32]).unwrap();

        let access = AccessMode::WRITE | AccessMode::CREAT | AccessMode::TRUNC;
        let mut handle = FsStorage.open(&path, access).unwrap();
        assert_eq!(handle.size().unwrap(), 0);
        handle.write_all(&[0xAA, 0xBB]).unwrap();
        handle.sync().unwrap();
        drop(handle);

        assert_eq!(fs::read(&path).unwrap(), vec![0xAA, 0xBB]);
    }

    #[test]
    fn test_missing_file_without_create() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.bin");
        let err = FsStorage.open(&path, AccessMode::READ).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(FsStorage.open(&path, AccessMode::WRITE).is_err());
    }

    #[test]
    fn test_exclusive_create() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.bin");
        let access = AccessMode::WRITE | AccessMode::CREAT | AccessMode::EXCL;

        assert!(FsStorage.open(&path, access).is_ok());
        let err = FsStorage.open(&path, access).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_at_end_positions_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.bin");
        fs::write(&path, [1u8, 2, 3]).unwrap();

        let mut handle = FsStorage
            .open(&path, AccessMode::READ_WRITE | AccessMode::AT_END)
            .unwrap();
        assert_eq!(handle.stream_position().unwrap(), 3);
    }

    #[test]
    fn test_no_access_bits_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.bin");
        fs::write(&path, [0u8]).unwrap();
        assert!(FsStorage.open(&path, AccessMode::empty()).is_err());
    }
}
