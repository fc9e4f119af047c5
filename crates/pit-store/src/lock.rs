use std::fs::OpenOptions;
use std::path::Path;

use fs2::FileExt;
use tracing::{debug, warn};

use crate::error::StoreResult;

/// Acquire an exclusive advisory lock on `lock_path`, run `f`, then release.
///
/// Blocks until the lock is available. The lock file is created if missing
/// and left in place afterwards. The result of `f` is always returned: a
/// failed unlock is only logged, and the lock is released when the handle
/// drops. Serializes repository-wide mutations (`reinit`, index head
/// updates) across threads and processes.
pub fn with_repo_lock<F, T>(lock_path: &Path, f: F) -> StoreResult<T>
where
    F: FnOnce() -> StoreResult<T>,
{
    if let Some(parent) = lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)?;
    file.lock_exclusive()?;
    debug!(path = %lock_path.display(), "acquired repository lock");

    let result = f();

    if let Err(e) = FileExt::unlock(&file) {
        warn!(path = %lock_path.display(), error = %e, "failed to release repository lock");
    }
    result
}
