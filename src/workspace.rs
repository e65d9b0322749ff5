//! Host collaborator interfaces: workspace enumeration and document access.
//!
//! The engine does not own file-system traversal; the host supplies it
//! through [`WorkspaceFiles`]. [`FsWorkspace`] is the production
//! implementation, walking a directory tree with gitignore awareness.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

/// Workspace file enumeration and read primitives supplied by the host.
pub trait WorkspaceFiles: Send + Sync {
    /// Lists candidate files under the workspace root. The engine fixes the
    /// candidate total at the start of an indexing pass; files appearing
    /// later are picked up by the next pass.
    fn list_files(&self) -> io::Result<Vec<PathBuf>>;

    /// Size in bytes, without reading content.
    fn file_size(&self, path: &Path) -> io::Result<u64>;

    /// Full text content. Invalid UTF-8 may be replaced lossily.
    fn read_file(&self, path: &Path) -> io::Result<String>;
}

/// Directory-tree workspace honoring gitignore rules and skipping hidden
/// files, the conventional traversal for code workspaces.
pub struct FsWorkspace {
    root: PathBuf,
}

impl FsWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl WorkspaceFiles for FsWorkspace {
    fn list_files(&self) -> io::Result<Vec<PathBuf>> {
        if !self.root.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("workspace root does not exist: {}", self.root.display()),
            ));
        }
        let mut files = Vec::new();
        // Gitignore rules apply whether or not the workspace is a git repo.
        let walker = WalkBuilder::new(&self.root).require_git(false).build();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    log::debug!("walk error under {}: {error}", self.root.display());
                    continue;
                }
            };
            if entry.file_type().is_some_and(|ft| ft.is_file()) {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }

    fn file_size(&self, path: &Path) -> io::Result<u64> {
        fs::metadata(path).map(|metadata| metadata.len())
    }

    fn read_file(&self, path: &Path) -> io::Result<String> {
        let bytes = fs::read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Accessor for one open document, used for current-file-only searches.
///
/// The document need not be indexed; the text is read at search time.
pub trait DocumentText: Send + Sync {
    fn path(&self) -> &Path;
    fn text(&self) -> io::Result<String>;
}

/// Document read from disk at search time.
pub struct FsDocument {
    path: PathBuf,
}

impl FsDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DocumentText for FsDocument {
    fn path(&self) -> &Path {
        &self.path
    }

    fn text(&self) -> io::Result<String> {
        fs::read_to_string(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn lists_only_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("sub/c.txt"), "c").unwrap();

        let workspace = FsWorkspace::new(dir.path());
        let files = workspace.list_files().unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            ["a.txt", "b.txt", "sub/c.txt"].map(PathBuf::from).to_vec()
        );
    }

    #[test]
    fn honors_gitignore_rules() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), "ignored.log\n").unwrap();
        fs::write(dir.path().join("kept.txt"), "kept").unwrap();
        fs::write(dir.path().join("ignored.log"), "noise").unwrap();

        let workspace = FsWorkspace::new(dir.path());
        let files = workspace.list_files().unwrap();
        assert!(files.iter().any(|p| p.ends_with("kept.txt")));
        assert!(!files.iter().any(|p| p.ends_with("ignored.log")));
    }

    #[test]
    fn missing_root_is_an_error() {
        let workspace = FsWorkspace::new("/nonexistent/workspace/root");
        assert!(workspace.list_files().is_err());
    }

    #[test]
    fn file_size_matches_content_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sized.txt");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"12345").unwrap();

        let workspace = FsWorkspace::new(dir.path());
        assert_eq!(workspace.file_size(&path).unwrap(), 5);
    }

    #[test]
    fn reads_invalid_utf8_lossily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.bin");
        fs::write(&path, b"ok \xff\xfe end").unwrap();

        let workspace = FsWorkspace::new(dir.path());
        let content = workspace.read_file(&path).unwrap();
        assert!(content.starts_with("ok "));
        assert!(content.ends_with(" end"));
    }

    #[test]
    fn fs_document_reads_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        fs::write(&path, "document body").unwrap();

        let document = FsDocument::new(&path);
        assert_eq!(document.path(), path);
        assert_eq!(document.text().unwrap(), "document body");
    }

    #[test]
    fn fs_document_missing_file_errors() {
        let document = FsDocument::new("/nonexistent/doc.txt");
        assert!(document.text().is_err());
    }
}
