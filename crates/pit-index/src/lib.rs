//! Staging area for pit.
//!
//! Records, per workspace-relative path, the ordered history of distinct
//! content versions queued for the next snapshot. A version is only added
//! when a file's content differs from every version already recorded for it.
//! The whole history serializes to a line-oriented index that can be stored
//! as an object and replayed against the object store later.
//!
//! # Key Types
//!
//! - [`StagingArea`] -- per-path version histories (BTreeMap-backed)
//! - [`IndexLine`] -- one `"<mode> <key> <version>    <path>"` index record
//! - [`Workspace`] -- the filesystem-facing collaborator
//! - [`DirWorkspace`], [`MemoryWorkspace`] -- workspace implementations

pub mod error;
pub mod line;
pub mod staging;
pub mod workspace;

pub use error::{IndexError, IndexResult};
pub use line::IndexLine;
pub use staging::StagingArea;
pub use workspace::{DirWorkspace, MemoryWorkspace, Workspace};
