//! Foundation types for pit.
//!
//! Every stored object in pit is addressed by an [`ObjectId`]: the BLAKE3
//! digest of the object's compressed on-disk bytes. The hex form of the id is
//! the key that names the object in the sharded pool and in the staging index.

pub mod error;
pub mod object;

pub use error::TypeError;
pub use object::{ObjectId, HASH_LEN, HEX_LEN};
