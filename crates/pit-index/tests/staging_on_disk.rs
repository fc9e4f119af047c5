//! End-to-end staging against a real directory and the sharded disk store.

use std::fs;
use std::sync::{Arc, Once};

use pit_index::{DirWorkspace, IndexError, StagingArea, Workspace};
use pit_store::{ContentObject, FsObjectStore, ObjectKind, ObjectStore, StoreConfig, StoreError};
use pit_types::ObjectId;

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

struct Repo {
    dir: tempfile::TempDir,
    ws: Arc<DirWorkspace>,
    store: Arc<FsObjectStore>,
}

impl Repo {
    fn new() -> Self {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsObjectStore::init(dir.path(), StoreConfig::default()).unwrap());
        let ws = Arc::new(DirWorkspace::new(dir.path()));
        Self { dir, ws, store }
    }

    fn write(&self, rel: &str, content: &str) {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn area(&self) -> StagingArea {
        StagingArea::new(self.ws.clone(), self.store.clone())
    }
}

fn history(area: &StagingArea) -> Vec<(String, Vec<ObjectId>)> {
    area.paths()
        .map(|p| {
            let keys: Vec<ObjectId> = area
                .versions(p)
                .unwrap()
                .iter()
                .map(ContentObject::key)
                .collect();
            (p.to_string(), keys)
        })
        .collect()
}

#[test]
fn versions_are_stored_once_per_distinct_content() {
    let repo = Repo::new();
    let mut area = repo.area();

    repo.write("notes.txt", "first");
    assert_eq!(area.add_file("notes.txt").unwrap().0, 0);
    assert_eq!(area.add_file("notes.txt").unwrap().0, 0);
    assert_eq!(repo.store.object_count().unwrap(), 1);

    repo.write("notes.txt", "second");
    assert_eq!(area.add_file("notes.txt").unwrap().0, 1);
    assert_eq!(repo.store.object_count().unwrap(), 2);
}

#[test]
fn add_by_absolute_path() {
    let repo = Repo::new();
    let mut area = repo.area();
    repo.write("src/main.rs", "fn main() {}");

    let abs = repo.dir.path().join("src/main.rs");
    area.add_file(abs.to_str().unwrap()).unwrap();
    assert_eq!(area.paths().collect::<Vec<_>>(), vec!["src/main.rs"]);
}

#[test]
fn untracked_and_internal_paths_are_rejected() {
    let repo = Repo::new();
    let mut area = repo.area();
    assert!(matches!(
        area.add_file("missing.txt"),
        Err(IndexError::FileNotTracked(_))
    ));
    assert!(matches!(
        area.add_file(".pit/INDEX"),
        Err(IndexError::FileNotTracked(_))
    ));
}

#[test]
fn save_and_reload_from_nested_directory() {
    let repo = Repo::new();
    let mut area = repo.area();
    repo.write("a.txt", "alpha");
    repo.write("docs/read me.md", "docs v1");
    area.add_all().unwrap();
    repo.write("docs/read me.md", "docs v2");
    area.add_file("docs/read me.md").unwrap();

    let key = area.save().unwrap();
    assert_eq!(repo.store.get(&key).unwrap().kind(), ObjectKind::Staging);

    // A fresh process: discover the repository from deep inside it.
    let nested = repo.dir.path().join("docs");
    let store = Arc::new(FsObjectStore::discover(&nested, StoreConfig::default()).unwrap());
    let root = store.location().unwrap().to_path_buf();
    let ws = Arc::new(DirWorkspace::new(root));
    let loaded = StagingArea::load(ws, store).unwrap();

    assert_eq!(history(&loaded), history(&area));
    assert_eq!(loaded.versions("docs/read me.md").unwrap().len(), 2);
}

#[test]
fn index_roundtrip_does_not_write_objects() {
    let repo = Repo::new();
    let mut area = repo.area();
    for (i, content) in ["1", "2", "3"].into_iter().enumerate() {
        repo.write("f", content);
        assert_eq!(area.add_file("f").unwrap().0, i);
    }
    let before = repo.store.object_count().unwrap();

    let text = area.serialize();
    let back = StagingArea::deserialize(&text, repo.ws.clone(), repo.store.clone()).unwrap();
    assert_eq!(history(&back), history(&area));
    assert_eq!(repo.store.object_count().unwrap(), before);
}

#[test]
fn reinit_invalidates_saved_index() {
    let repo = Repo::new();
    let mut area = repo.area();
    repo.write("f", "content");
    let (_, object) = area.add_file("f").unwrap();
    let text = area.serialize();
    area.save().unwrap();

    repo.store.reinit().unwrap();

    let loaded = StagingArea::load(repo.ws.clone(), repo.store.clone()).unwrap();
    assert!(loaded.is_empty());
    let err = StagingArea::deserialize(&text, repo.ws.clone(), repo.store.clone()).unwrap_err();
    assert!(matches!(
        err,
        IndexError::Store(StoreError::NotFound(id)) if id == object.key()
    ));
    // The workspace itself is untouched.
    assert!(repo.ws.has_file("f"));
}

#[test]
fn corrupted_object_fails_reload() {
    let repo = Repo::new();
    let mut area = repo.area();
    repo.write("f", "content");
    let (_, object) = area.add_file("f").unwrap();
    let text = area.serialize();

    let path = repo.store.object_path(&object.key()).unwrap();
    fs::write(&path, b"tampered").unwrap();

    let err = StagingArea::deserialize(&text, repo.ws.clone(), repo.store.clone()).unwrap_err();
    assert!(matches!(
        err,
        IndexError::Store(StoreError::IntegrityMismatch { .. })
    ));
}

#[test]
fn names_with_line_breaks_stay_out_of_the_index() {
    let repo = Repo::new();
    let mut area = repo.area();
    repo.write("name\r", "cr");
    repo.write("a\nb", "lf");
    repo.write("plain", "ok");

    let staged = area.add_all().unwrap();
    assert_eq!(staged, vec![("plain".to_string(), 0)]);
    assert!(matches!(
        area.add_file("name\r"),
        Err(IndexError::UnrepresentablePath(_))
    ));
    assert_eq!(repo.store.object_count().unwrap(), 1);

    area.save().unwrap();
    let loaded = StagingArea::load(repo.ws.clone(), repo.store.clone()).unwrap();
    assert_eq!(history(&loaded), history(&area));
}

#[test]
fn workspace_listing_skips_repository() {
    let repo = Repo::new();
    repo.write("one", "1");
    repo.write("sub/two", "2");
    let files = repo.ws.list_files().unwrap();
    assert_eq!(files, vec!["one", "sub/two"]);
    assert!(repo.dir.path().join(".pit/obj").is_dir());
}
