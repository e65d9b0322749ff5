//! Test doubles shared across module tests.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::workspace::{DocumentText, WorkspaceFiles};

/// In-memory workspace with controllable sizes and failures.
///
/// Files are listed in insertion order so tests control enumeration order
/// directly.
#[derive(Default)]
pub(crate) struct MockWorkspace {
    files: Mutex<Vec<MockFile>>,
    failing_reads: Mutex<HashSet<PathBuf>>,
    failing_listing: AtomicBool,
    list_calls: AtomicUsize,
    read_calls: AtomicUsize,
}

struct MockFile {
    path: PathBuf,
    content: String,
    reported_size: u64,
}

impl MockWorkspace {
    pub fn new(files: Vec<(String, String)>) -> Self {
        let workspace = Self::default();
        for (path, content) in files {
            workspace.add_file(&path, &content);
        }
        workspace
    }

    pub fn with_files(files: &[(&str, &str)]) -> Self {
        Self::new(
            files
                .iter()
                .map(|(path, content)| (path.to_string(), content.to_string()))
                .collect(),
        )
    }

    pub fn add_file(&self, path: &str, content: &str) {
        let reported_size = content.len() as u64;
        self.add_file_with_size(path, content, reported_size);
    }

    pub fn add_file_with_size(&self, path: &str, content: &str, reported_size: u64) {
        self.files.lock().push(MockFile {
            path: PathBuf::from(path),
            content: content.to_string(),
            reported_size,
        });
    }

    pub fn fail_reads_for(&self, path: &str) {
        self.failing_reads.lock().insert(PathBuf::from(path));
    }

    pub fn fail_listing(&self) {
        self.failing_listing.store(true, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }
}

impl WorkspaceFiles for MockWorkspace {
    fn list_files(&self) -> io::Result<Vec<PathBuf>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_listing.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "listing failed"));
        }
        Ok(self.files.lock().iter().map(|f| f.path.clone()).collect())
    }

    fn file_size(&self, path: &Path) -> io::Result<u64> {
        self.files
            .lock()
            .iter()
            .find(|f| f.path == path)
            .map(|f| f.reported_size)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }

    fn read_file(&self, path: &Path) -> io::Result<String> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_reads.lock().contains(path) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read denied"));
        }
        self.files
            .lock()
            .iter()
            .find(|f| f.path == path)
            .map(|f| f.content.clone())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }
}

/// In-memory document for current-file-only searches.
pub(crate) struct MemoryDocument {
    path: PathBuf,
    text: String,
}

impl MemoryDocument {
    pub fn new(path: &str, text: &str) -> Self {
        Self {
            path: PathBuf::from(path),
            text: text.to_string(),
        }
    }
}

impl DocumentText for MemoryDocument {
    fn path(&self) -> &Path {
        &self.path
    }

    fn text(&self) -> io::Result<String> {
        Ok(self.text.clone())
    }
}

/// Document whose text can never be read.
pub(crate) struct UnreadableDocument {
    path: PathBuf,
}

impl UnreadableDocument {
    pub fn new(path: &str) -> Self {
        Self {
            path: PathBuf::from(path),
        }
    }
}

impl DocumentText for UnreadableDocument {
    fn path(&self) -> &Path {
        &self.path
    }

    fn text(&self) -> io::Result<String> {
        Err(io::Error::new(io::ErrorKind::Other, "document unavailable"))
    }
}
