use pit_types::ObjectId;

use crate::error::StoreResult;
use crate::object::ContentObject;

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written. Storing the same object twice writes
///   the same bytes under the same key, so duplicate writes are harmless.
/// - Every read re-hashes the stored bytes; corruption surfaces as
///   [`StoreError::IntegrityMismatch`](crate::StoreError::IntegrityMismatch),
///   never as silently wrong content.
/// - An absent key is [`StoreError::NotFound`](crate::StoreError::NotFound).
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync {
    /// Persist an object and return its key.
    fn store(&self, object: &ContentObject) -> StoreResult<ObjectId>;

    /// Fetch and verify the object stored under `id`.
    fn get(&self, id: &ObjectId) -> StoreResult<ContentObject>;

    /// Check whether an object exists in the store.
    fn contains(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Destroy every stored object and the index head, leaving an empty store.
    ///
    /// This is irreversible.
    fn reinit(&self) -> StoreResult<()>;

    /// Key of the most recently saved staging index, if any.
    fn read_index_head(&self) -> StoreResult<Option<ObjectId>>;

    /// Record `id` as the current staging index.
    fn write_index_head(&self, id: &ObjectId) -> StoreResult<()>;

    /// Store several objects and return their keys.
    fn store_batch(&self, objects: &[ContentObject]) -> StoreResult<Vec<ObjectId>> {
        objects.iter().map(|obj| self.store(obj)).collect()
    }
}
