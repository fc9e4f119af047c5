//! The staging area: per-path histories of distinct content versions.
//!
//! Each tracked path maps to the versions of its content that have been
//! staged, in the order they were added. Adding a file whose current content
//! matches an existing version is a no-op returning that version; otherwise
//! the content is written to the object store and appended.

use std::collections::BTreeMap;
use std::sync::Arc;

use pit_store::{ContentObject, ObjectKind, ObjectStore};
use pit_types::ObjectId;
use tracing::{debug, warn};

use crate::error::{IndexError, IndexResult};
use crate::line::{is_representable, IndexLine};
use crate::workspace::Workspace;

/// Staged version histories for the files of one workspace.
///
/// Paths are kept in a `BTreeMap`, so [`serialize`](Self::serialize) lists
/// them in sorted order. Within a path, versions keep their insertion order
/// and no two versions share a key.
///
/// Removing a path only forgets its history; the stored objects stay in the
/// object store.
pub struct StagingArea {
    workspace: Arc<dyn Workspace>,
    store: Arc<dyn ObjectStore>,
    content: BTreeMap<String, Vec<ContentObject>>,
}

impl std::fmt::Debug for StagingArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingArea")
            .field("paths", &self.content.len())
            .field("versions", &self.content.values().map(Vec::len).sum::<usize>())
            .finish()
    }
}

impl StagingArea {
    /// Create an empty staging area.
    pub fn new(workspace: Arc<dyn Workspace>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            workspace,
            store,
            content: BTreeMap::new(),
        }
    }

    /// Number of tracked paths.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Returns `true` if no path has a recorded history.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Tracked paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.content.keys().map(String::as_str)
    }

    /// The version history of `path`, oldest first.
    pub fn versions(&self, path: &str) -> Option<&[ContentObject]> {
        self.content.get(path).map(Vec::as_slice)
    }

    /// Resolve `path` against the workspace, requiring that the file exists
    /// and that its name fits on one index line.
    fn resolve(&self, path: &str) -> IndexResult<String> {
        let rel = self
            .workspace
            .relpath(path)
            .ok_or_else(|| IndexError::FileNotTracked(path.to_string()))?;
        if !is_representable(&rel) {
            return Err(IndexError::UnrepresentablePath(rel));
        }
        if !self.workspace.has_file(&rel) {
            return Err(IndexError::FileNotTracked(rel));
        }
        Ok(rel)
    }

    fn read_current(&self, rel: &str) -> IndexResult<ContentObject> {
        let bytes = self.workspace.read_file(rel)?;
        Ok(ContentObject::blob(bytes)?)
    }

    fn find_version(&self, rel: &str, key: &ObjectId) -> Option<(usize, &ContentObject)> {
        self.content
            .get(rel)?
            .iter()
            .enumerate()
            .find(|(_, v)| v.key() == *key)
    }

    // ---------------------------------------------------------------
    // Stage operations
    // ---------------------------------------------------------------

    /// Stage the current content of `path`.
    ///
    /// Returns the zero-based version index and the object. If the content
    /// is already in the path's history, the existing version is returned
    /// and the store is not touched.
    pub fn add_file(&mut self, path: &str) -> IndexResult<(usize, ContentObject)> {
        let rel = self.resolve(path)?;
        let object = self.read_current(&rel)?;

        if let Some((index, existing)) = self.find_version(&rel, &object.key()) {
            debug!(path = %rel, version = index, "content already staged");
            return Ok((index, existing.clone()));
        }

        self.store.store(&object)?;
        let history = self.content.entry(rel).or_default();
        history.push(object.clone());
        let index = history.len() - 1;
        debug!(key = %object.key().short_hex(), version = index, "staged new version");
        Ok((index, object))
    }

    /// Stage every file the workspace lists.
    ///
    /// Returns `(path, version)` for each file, sorted by path. Files whose
    /// names contain a line break are skipped with a warning.
    pub fn add_all(&mut self) -> IndexResult<Vec<(String, usize)>> {
        let mut files = self.workspace.list_files()?;
        files.sort();
        let mut staged = Vec::with_capacity(files.len());
        for path in files {
            if !is_representable(&path) {
                warn!(path = ?path, "skipping file with a line break in its name");
                continue;
            }
            let (version, _) = self.add_file(&path)?;
            staged.push((path, version));
        }
        Ok(staged)
    }

    /// Find the staged version matching the current content of `path`.
    ///
    /// Fails with [`IndexError::NoMatchingVersion`] if that content was never
    /// staged for this path.
    pub fn get_version(&self, path: &str) -> IndexResult<(usize, &ContentObject)> {
        let rel = self.resolve(path)?;
        let current = self.read_current(&rel)?;
        self.find_version(&rel, &current.key())
            .ok_or(IndexError::NoMatchingVersion(rel))
    }

    /// Forget the whole history of `path`. Stored objects are kept.
    ///
    /// The file does not need to exist in the workspace any more.
    pub fn remove_file(&mut self, path: &str) -> IndexResult<Vec<ContentObject>> {
        let rel = self
            .workspace
            .relpath(path)
            .unwrap_or_else(|| path.to_string());
        let removed = self
            .content
            .remove(&rel)
            .ok_or(IndexError::PathNotFound(rel))?;
        debug!(versions = removed.len(), "removed path from staging");
        Ok(removed)
    }

    // ---------------------------------------------------------------
    // Serialization
    // ---------------------------------------------------------------

    /// Render every (path, version) pair as an index line.
    ///
    /// Each line ends with a newline; an empty staging area renders as the
    /// empty string.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for (path, versions) in &self.content {
            for (version, object) in versions.iter().enumerate() {
                out.push_str(&IndexLine::new(object, version, path.as_str()).to_string());
                out.push('\n');
            }
        }
        out
    }

    /// Rebuild a staging area from index text.
    ///
    /// Every referenced object must already be in `store`; nothing is
    /// written back. Lines for one path must list versions 0, 1, 2, ... in
    /// order, with no repeated key, and each mode must match the kind of the
    /// object it names.
    pub fn deserialize(
        text: &str,
        workspace: Arc<dyn Workspace>,
        store: Arc<dyn ObjectStore>,
    ) -> IndexResult<Self> {
        let mut area = Self::new(workspace, store);
        for (n, raw) in text.split_terminator('\n').enumerate() {
            let lineno = n + 1;
            let line = IndexLine::parse(raw, lineno)?;
            let history = area.content.entry(line.path).or_default();

            if line.version != history.len() {
                return Err(IndexError::MalformedIndex {
                    line: lineno,
                    reason: format!(
                        "expected version {}, found {}",
                        history.len(),
                        line.version
                    ),
                });
            }
            if history.iter().any(|v| v.key() == line.key) {
                return Err(IndexError::MalformedIndex {
                    line: lineno,
                    reason: format!("duplicate key {}", line.key),
                });
            }

            let object = area.store.get(&line.key)?;
            if object.kind().mode() != line.mode {
                return Err(IndexError::MalformedIndex {
                    line: lineno,
                    reason: format!(
                        "mode {} does not match {} object {}",
                        line.mode,
                        object.kind(),
                        line.key.short_hex()
                    ),
                });
            }
            history.push(object);
        }
        debug!(paths = area.content.len(), "loaded staging index");
        Ok(area)
    }

    /// Store the serialized index as a `staging` object and return its key.
    pub fn persist(&self) -> IndexResult<ObjectId> {
        let object = ContentObject::new(ObjectKind::Staging, self.serialize())?;
        Ok(self.store.store(&object)?)
    }

    /// [`persist`](Self::persist), then record the key as the store's index head.
    pub fn save(&self) -> IndexResult<ObjectId> {
        let key = self.persist()?;
        self.store.write_index_head(&key)?;
        Ok(key)
    }

    /// Load the staging area recorded as the store's index head.
    ///
    /// A store without an index head yields an empty staging area.
    pub fn load(workspace: Arc<dyn Workspace>, store: Arc<dyn ObjectStore>) -> IndexResult<Self> {
        let Some(key) = store.read_index_head()? else {
            return Ok(Self::new(workspace, store));
        };
        let object = store.get(&key)?;
        if object.kind() != ObjectKind::Staging {
            return Err(IndexError::MalformedIndex {
                line: 0,
                reason: format!("index head {key} is a {} object", object.kind()),
            });
        }
        let text = std::str::from_utf8(object.content()).map_err(|e| IndexError::MalformedIndex {
            line: 0,
            reason: format!("index is not valid UTF-8: {e}"),
        })?;
        Self::deserialize(text, workspace, store)
    }
}
