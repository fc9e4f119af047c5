//! The workspace: where tracked files are read from.

use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;

use pit_store::StoreConfig;
use tracing::warn;
use walkdir::WalkDir;

/// Access to the files a staging area tracks.
///
/// Paths handed to `has_file` and `read_file` are workspace-relative and
/// `/`-separated, as produced by [`relpath`](Workspace::relpath).
pub trait Workspace: Send + Sync {
    /// Resolve a caller-supplied path to a workspace-relative one.
    ///
    /// Returns `None` if the path lies outside the workspace.
    fn relpath(&self, path: &str) -> Option<String>;

    fn has_file(&self, path: &str) -> bool;

    fn read_file(&self, path: &str) -> io::Result<Vec<u8>>;

    /// Every file in the workspace. Order is not significant.
    fn list_files(&self) -> io::Result<Vec<String>>;
}

/// Normalize a relative path: drop `.` components, refuse `..` and roots.
fn normalize_relative(path: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => parts.push(part.to_str()?.to_string()),
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// A workspace rooted at a directory on disk.
///
/// The repository marker directory and the lock file are never listed and
/// never resolve as workspace paths.
#[derive(Clone, Debug)]
pub struct DirWorkspace {
    root: PathBuf,
    marker: String,
    lock_file: String,
}

impl DirWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_config(root, &StoreConfig::default())
    }

    /// Use the marker and lock file names from `config`.
    pub fn with_config(root: impl Into<PathBuf>, config: &StoreConfig) -> Self {
        Self {
            root: root.into(),
            marker: config.marker.clone(),
            lock_file: config.lock_file.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_reserved(&self, rel: &str) -> bool {
        let first = rel.split('/').next().unwrap_or(rel);
        first == self.marker || rel == self.lock_file
    }
}

impl Workspace for DirWorkspace {
    fn relpath(&self, path: &str) -> Option<String> {
        let p = Path::new(path);
        let rel = if p.is_absolute() {
            let stripped = match p.strip_prefix(&self.root) {
                Ok(stripped) => stripped.to_path_buf(),
                Err(_) => {
                    let canonical = self.root.canonicalize().ok()?;
                    p.strip_prefix(canonical).ok()?.to_path_buf()
                }
            };
            normalize_relative(&stripped)?
        } else {
            normalize_relative(p)?
        };
        (!self.is_reserved(&rel)).then_some(rel)
    }

    fn has_file(&self, path: &str) -> bool {
        !self.is_reserved(path) && self.root.join(path).is_file()
    }

    fn read_file(&self, path: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.root.join(path))
    }

    fn list_files(&self) -> io::Result<Vec<String>> {
        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                let name = e.file_name().to_string_lossy();
                !(e.depth() == 1 && (name == self.marker.as_str() || name == self.lock_file.as_str()))
            });
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(&self.root)
                .ok()
                .and_then(normalize_relative);
            match rel {
                Some(rel) => files.push(rel),
                None => warn!(path = %entry.path().display(), "skipping non UTF-8 path"),
            }
        }
        Ok(files)
    }
}

/// A workspace held entirely in memory.
///
/// Contents can be changed through a shared reference, which lets tests keep
/// a handle while a staging area owns another.
#[derive(Debug, Default)]
pub struct MemoryWorkspace {
    files: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite a file.
    pub fn write(&self, path: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.files
            .write()
            .expect("lock poisoned")
            .insert(path.into(), content.into());
    }

    /// Delete a file. Returns `true` if it existed.
    pub fn remove(&self, path: &str) -> bool {
        self.files.write().expect("lock poisoned").remove(path).is_some()
    }
}

impl Workspace for MemoryWorkspace {
    fn relpath(&self, path: &str) -> Option<String> {
        normalize_relative(Path::new(path))
    }

    fn has_file(&self, path: &str) -> bool {
        self.files.read().expect("lock poisoned").contains_key(path)
    }

    fn read_file(&self, path: &str) -> io::Result<Vec<u8>> {
        self.files
            .read()
            .expect("lock poisoned")
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
    }

    fn list_files(&self) -> io::Result<Vec<String>> {
        Ok(self.files.read().expect("lock poisoned").keys().cloned().collect())
    }
}
