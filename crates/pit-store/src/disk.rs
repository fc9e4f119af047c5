//! Sharded on-disk object store.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use pit_types::ObjectId;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::lock::with_repo_lock;
use crate::object::ContentObject;
use crate::traits::ObjectStore;

/// Walk upward from `start` to the first directory that contains `marker`.
///
/// Returns the directory holding the marker, not the marker itself. A
/// `start` that does not exist is outside every repository.
pub fn locate_root(start: &Path, marker: &str) -> StoreResult<PathBuf> {
    let start = match start.canonicalize() {
        Ok(start) => start,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(StoreError::OutsideRepository {
                start: start.to_path_buf(),
            })
        }
        Err(e) => return Err(e.into()),
    };
    let mut current = Some(start.as_path());
    while let Some(dir) = current {
        if dir.join(marker).is_dir() {
            return Ok(dir.to_path_buf());
        }
        current = dir.parent();
    }
    Err(StoreError::OutsideRepository { start })
}

/// Object store backed by a directory tree.
///
/// Objects live at `<root>/<marker>/<objects_dir>/<key[..2]>/<key[2..]>`.
/// The repository root is discovered from the starting directory the first
/// time it is needed and memoized for the lifetime of this handle.
#[derive(Debug)]
pub struct FsObjectStore {
    config: StoreConfig,
    start: PathBuf,
    location: OnceCell<PathBuf>,
}

impl FsObjectStore {
    /// Create a fresh, empty repository at `root`, wiping any existing one.
    pub fn init(root: impl Into<PathBuf>, config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        let root = root.into();
        let store = Self {
            config,
            start: root.clone(),
            location: OnceCell::with_value(root),
        };
        store.reinit()?;
        Ok(store)
    }

    /// Attach to the repository enclosing `start`.
    ///
    /// Discovery is lazy: nothing touches the filesystem until the first
    /// operation that needs the root.
    pub fn open(start: impl Into<PathBuf>, config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            start: start.into(),
            location: OnceCell::new(),
        })
    }

    /// Attach to the repository enclosing `start`, failing immediately with
    /// [`StoreError::OutsideRepository`] if there is none.
    pub fn discover(start: impl Into<PathBuf>, config: StoreConfig) -> StoreResult<Self> {
        let store = Self::open(start, config)?;
        store.location()?;
        Ok(store)
    }

    /// Re-attach to a different starting directory, forgetting the memoized root.
    pub fn attach(&mut self, start: impl Into<PathBuf>) {
        self.start = start.into();
        self.location = OnceCell::new();
    }

    /// Find the repository root by walking upward from `start`.
    ///
    /// Once a root has been found it is returned for every later call,
    /// whatever `start` is passed.
    pub fn locate(&self, start: &Path) -> StoreResult<&Path> {
        self.location
            .get_or_try_init(|| {
                let root = locate_root(start, &self.config.marker)?;
                info!(root = %root.display(), "located repository");
                Ok::<_, StoreError>(root)
            })
            .map(PathBuf::as_path)
    }

    /// The repository root (the directory containing the marker).
    pub fn location(&self) -> StoreResult<&Path> {
        self.locate(&self.start)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The marker directory, `<root>/<marker>`.
    pub fn repo_dir(&self) -> StoreResult<PathBuf> {
        Ok(self.location()?.join(&self.config.marker))
    }

    pub fn objects_dir(&self) -> StoreResult<PathBuf> {
        Ok(self.repo_dir()?.join(&self.config.objects_dir))
    }

    pub fn index_path(&self) -> StoreResult<PathBuf> {
        Ok(self.repo_dir()?.join(&self.config.index_file))
    }

    pub fn lock_path(&self) -> StoreResult<PathBuf> {
        Ok(self.location()?.join(&self.config.lock_file))
    }

    /// Shard path of `id`: `<objects_dir>/<key[..2]>/<key[2..]>`.
    pub fn object_path(&self, id: &ObjectId) -> StoreResult<PathBuf> {
        let (dir, file) = id.shard();
        Ok(self.objects_dir()?.join(dir).join(file))
    }

    /// Count the object files in the pool.
    pub fn object_count(&self) -> StoreResult<usize> {
        let mut count = 0;
        for shard in fs::read_dir(self.objects_dir()?)? {
            let shard = shard?;
            if !shard.file_type()?.is_dir() {
                continue;
            }
            for entry in fs::read_dir(shard.path())? {
                let entry = entry?;
                let in_flight = entry.file_name().to_string_lossy().starts_with(".tmp");
                if entry.file_type()?.is_file() && !in_flight {
                    count += 1;
                }
            }
        }
        Ok(count)
    }
}

impl ObjectStore for FsObjectStore {
    fn store(&self, object: &ContentObject) -> StoreResult<ObjectId> {
        let id = object.key();
        let (shard, file) = id.shard();
        let dir = self.objects_dir()?.join(shard);
        let path = dir.join(file);
        if path.exists() {
            debug!(key = %id.short_hex(), "object already stored");
            return Ok(id);
        }

        fs::create_dir_all(&dir)?;

        // Same content always yields the same bytes, so racing writers
        // persist identical files.
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(object.to_binary())?;
        tmp.persist(&path).map_err(|e| e.error)?;

        debug!(
            key = %id.short_hex(),
            kind = %object.kind(),
            size = object.size(),
            "stored object"
        );
        Ok(id)
    }

    fn get(&self, id: &ObjectId) -> StoreResult<ContentObject> {
        let path = self.object_path(id)?;
        match fs::read(&path) {
            Ok(bytes) => ContentObject::from_binary(&bytes, id),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(*id)),
            Err(e) => Err(e.into()),
        }
    }

    fn contains(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.object_path(id)?.is_file())
    }

    fn reinit(&self) -> StoreResult<()> {
        let repo_dir = self.repo_dir()?;
        let objects_dir = self.objects_dir()?;
        let index_path = self.index_path()?;

        with_repo_lock(&self.lock_path()?, || {
            match fs::remove_dir_all(&repo_dir) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            fs::create_dir_all(&objects_dir)?;
            fs::File::create(&index_path)?;
            info!(repo = %repo_dir.display(), "reinitialized repository");
            Ok(())
        })
    }

    fn read_index_head(&self) -> StoreResult<Option<ObjectId>> {
        let text = match fs::read_to_string(self.index_path()?) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        ObjectId::from_hex(text)
            .map(Some)
            .map_err(|e| StoreError::CorruptIndexHead(e.to_string()))
    }

    fn write_index_head(&self, id: &ObjectId) -> StoreResult<()> {
        let repo_dir = self.repo_dir()?;
        let index_path = self.index_path()?;

        with_repo_lock(&self.lock_path()?, || {
            let mut tmp = NamedTempFile::new_in(&repo_dir)?;
            writeln!(tmp, "{id}")?;
            tmp.persist(&index_path).map_err(|e| e.error)?;
            info!(key = %id.short_hex(), "updated index head");
            Ok(())
        })
    }
}
