//! Content-addressed object storage for pit.
//!
//! Every piece of data pit keeps -- file contents, serialized staging
//! indexes -- is stored as an immutable [`ContentObject`]. An object's
//! canonical form `"<kind> <size>\0<content>"` is zstd compressed, and the
//! BLAKE3 hash of the compressed bytes is its key. Reads re-hash what comes
//! off disk, so corruption is always detected.
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`FsObjectStore`] -- sharded directory tree with repository discovery
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. `store` and `get` are lock-free: distinct content maps to distinct paths
//!    and identical content writes identical bytes.
//! 3. Repository-wide mutations (`reinit`, index head updates) run under an
//!    advisory file lock.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod config;
pub mod disk;
pub mod error;
pub mod lock;
pub mod memory;
pub mod object;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use config::StoreConfig;
pub use disk::{locate_root, FsObjectStore};
pub use error::{StoreError, StoreResult};
pub use lock::with_repo_lock;
pub use memory::InMemoryObjectStore;
pub use object::{ContentObject, ObjectKind, UnknownKind, COMPRESSION_LEVEL};
pub use pit_types::ObjectId;
pub use traits::ObjectStore;
