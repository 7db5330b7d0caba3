//! Shared helpers for host integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use eeprommer_host::{
    Dispatcher, EventLog, FrameLink, HostError, HostResult, PathResolver, Storage, StorageHandle,
};
use eeprommer_protocol::{encode_frame, encode_raw, AccessMode, Opcode};

// ============================================================================
// In-memory storage
// ============================================================================

type Files = Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>;

/// Storage backed by a shared map, counting opens and releases.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    files: Files,
    opens: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<PathBuf>, data: Vec<u8>) -> Self {
        self.files.lock().unwrap().insert(path.into(), data);
        self
    }

    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path.as_ref()).cloned()
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl Storage for MemoryStorage {
    fn open(&mut self, path: &Path, access: AccessMode) -> io::Result<Box<dyn StorageHandle>> {
        let mut files = self.files.lock().unwrap();
        let exists = files.contains_key(path);

        if !exists && !access.contains(AccessMode::CREAT) {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such file"));
        }
        if exists && access.contains(AccessMode::CREAT | AccessMode::EXCL) {
            return Err(io::Error::new(io::ErrorKind::AlreadyExists, "file exists"));
        }

        let data = files.entry(path.to_path_buf()).or_default();
        if access.contains(AccessMode::TRUNC) {
            data.clear();
        }
        let pos = if access.contains(AccessMode::AT_END) {
            data.len() as u64
        } else {
            0
        };

        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryHandle {
            files: self.files.clone(),
            path: path.to_path_buf(),
            pos,
            releases: self.releases.clone(),
        }))
    }
}

struct MemoryHandle {
    files: Files,
    path: PathBuf,
    pos: u64,
    releases: Arc<AtomicUsize>,
}

impl MemoryHandle {
    fn with_data<T>(&self, f: impl FnOnce(&mut Vec<u8>) -> T) -> T {
        let mut files = self.files.lock().unwrap();
        f(files.entry(self.path.clone()).or_default())
    }
}

impl Read for MemoryHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let pos = self.pos as usize;
        let n = self.with_data(|data| {
            let start = pos.min(data.len());
            let n = buf.len().min(data.len() - start);
            buf[..n].copy_from_slice(&data[start..start + n]);
            n
        });
        self.pos += n as u64;
        Ok(n)
    }
}

impl Write for MemoryHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let pos = self.pos as usize;
        self.with_data(|data| {
            if data.len() < pos + buf.len() {
                data.resize(pos + buf.len(), 0);
            }
            data[pos..pos + buf.len()].copy_from_slice(buf);
        });
        self.pos += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = self.with_data(|data| data.len()) as i64;
        let target = match pos {
            SeekFrom::Start(n) => n as i64,
            SeekFrom::End(n) => len + n,
            SeekFrom::Current(n) => self.pos as i64 + n,
        };
        if target < 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "negative seek"));
        }
        self.pos = target as u64;
        Ok(self.pos)
    }
}

impl StorageHandle for MemoryHandle {
    fn size(&mut self) -> io::Result<u64> {
        Ok(self.with_data(|data| data.len()) as u64)
    }

    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for MemoryHandle {
    fn drop(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Answers prompts from a fixed list of paths and records what was asked.
#[derive(Default)]
pub struct ScriptedResolver {
    answers: Vec<PathBuf>,
    pub prompts: Vec<(String, bool)>,
}

impl ScriptedResolver {
    pub fn new(answers: &[&str]) -> Self {
        ScriptedResolver {
            answers: answers.iter().rev().map(PathBuf::from).collect(),
            prompts: Vec::new(),
        }
    }
}

impl PathResolver for ScriptedResolver {
    fn resolve(&mut self, prompt: &str, must_exist: bool) -> HostResult<PathBuf> {
        self.prompts.push((prompt.to_string(), must_exist));
        self.answers
            .pop()
            .ok_or_else(|| HostError::Resolve("operator gave no answer".into()))
    }
}

// ============================================================================
// Scripted link
// ============================================================================

/// A byte stream that replays `input` and records everything written.
pub struct Script {
    input: Cursor<Vec<u8>>,
    pub output: Vec<u8>,
}

impl Script {
    pub fn new(input: Vec<u8>) -> Self {
        Script {
            input: Cursor::new(input),
            output: Vec::new(),
        }
    }
}

impl Read for Script {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for Script {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub type TestDispatcher = Dispatcher<MemoryStorage, ScriptedResolver, EventLog>;

pub fn dispatcher(storage: &MemoryStorage, answers: &[&str]) -> TestDispatcher {
    Dispatcher::new(storage.clone(), ScriptedResolver::new(answers), EventLog::new())
}

/// Feed `input` frame by frame until it runs out; returns the bytes sent back.
pub fn serve(d: &mut TestDispatcher, input: Vec<u8>) -> Vec<u8> {
    let mut link = FrameLink::new(Script::new(input));
    while let Ok(frame) = link.recv_frame() {
        let _ = d.dispatch(&mut link, &frame);
    }
    link.into_inner().output
}

pub fn frame(op: Opcode, payload: &[u8]) -> Vec<u8> {
    encode_frame(op.code(), payload).unwrap()
}

pub fn raw_frame(text: &str) -> Vec<u8> {
    encode_raw(text.as_bytes()).unwrap()
}

/// FILEOPEN with its prompt, then FILECONF.
pub fn open_and_configure(must_exist: bool, access: AccessMode) -> Vec<u8> {
    let mut input = frame(Opcode::FileOpen, &[u8::from(must_exist)]);
    input.extend(raw_frame("Load file"));
    input.extend(frame(Opcode::FileConf, &[access.to_byte()]));
    input
}

/// Bytes 0, 1, 2, ... wrapping at 256.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| i as u8).collect()
}
