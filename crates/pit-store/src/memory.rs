use std::collections::HashMap;
use std::sync::RwLock;

use pit_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::ContentObject;
use crate::traits::ObjectStore;

/// In-memory, HashMap-based object store.
///
/// Holds the compressed bytes of each object, exactly as the disk store
/// would, and decodes them through [`ContentObject::from_binary`] on every
/// read. Intended for tests and embedding.
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ObjectId, Vec<u8>>>,
    index_head: RwLock<Option<ObjectId>>,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            index_head: RwLock::new(None),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Return a sorted list of all object IDs in the store.
    pub fn all_ids(&self) -> Vec<ObjectId> {
        let map = self.objects.read().expect("lock poisoned");
        let mut ids: Vec<ObjectId> = map.keys().copied().collect();
        ids.sort();
        ids
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn store(&self, object: &ContentObject) -> StoreResult<ObjectId> {
        let id = object.key();
        let mut map = self.objects.write().expect("lock poisoned");
        map.entry(id).or_insert_with(|| object.to_binary().to_vec());
        Ok(id)
    }

    fn get(&self, id: &ObjectId) -> StoreResult<ContentObject> {
        let map = self.objects.read().expect("lock poisoned");
        let bytes = map.get(id).ok_or(StoreError::NotFound(*id))?;
        ContentObject::from_binary(bytes, id)
    }

    fn contains(&self, id: &ObjectId) -> StoreResult<bool> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.contains_key(id))
    }

    fn reinit(&self) -> StoreResult<()> {
        self.objects.write().expect("lock poisoned").clear();
        *self.index_head.write().expect("lock poisoned") = None;
        Ok(())
    }

    fn read_index_head(&self) -> StoreResult<Option<ObjectId>> {
        Ok(*self.index_head.read().expect("lock poisoned"))
    }

    fn write_index_head(&self, id: &ObjectId) -> StoreResult<()> {
        *self.index_head.write().expect("lock poisoned") = Some(*id);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &count)
            .finish()
    }
}
