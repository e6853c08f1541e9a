//! File-based locking to prevent concurrent daemon instances
//!
//! Two instances racing the same config could list-then-delete the same
//! artifacts and evict past a policy's floor, so the whole daemon is guarded
//! by one exclusive advisory lock.

use anyhow::{Context, Result};
use fd_lock::RwLock;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Guard held for the lifetime of the daemon run.
pub struct InstanceLock {
    // Store the lock and file together
    _lock: Box<(RwLock<File>, Option<fd_lock::RwLockWriteGuard<'static, File>>)>,
    lock_path: PathBuf,
}

impl InstanceLock {
    /// Acquire the exclusive daemon lock for a given key (the config file
    /// stem, so distinct configs may run side by side).
    /// Returns an error if another instance already holds it.
    pub fn acquire(key: &str) -> Result<Self> {
        let lock_path = Self::lock_path(key);

        debug!("Attempting to acquire lock: {:?}", lock_path);

        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create lock directory")?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&lock_path)
            .context(format!("Failed to open lock file: {:?}", lock_path))?;

        // Create boxed lock
        let mut boxed_lock = Box::new((RwLock::new(file), None));

        // SAFETY: We're creating a self-referential structure here.
        // The lock guard references the RwLock, which is stored in the same Box.
        // This is safe because:
        // 1. The Box won't move once created
        // 2. The guard and RwLock will be dropped together
        // 3. The guard is dropped before the RwLock in the tuple drop order
        let lock_ptr = &mut boxed_lock.0 as *mut RwLock<File>;
        let mut guard = unsafe { (*lock_ptr).try_write() }.context(format!(
            "Another backup-warden instance is already running for '{}' (lock held)",
            key
        ))?;

        // Record the holder so operators can see who owns a stale lock.
        guard.set_len(0).ok();
        writeln!(&mut *guard, "{}", std::process::id()).ok();
        guard.flush().ok();

        // Store the guard - casting to 'static is safe because we control the lifetime
        let static_guard: fd_lock::RwLockWriteGuard<'static, File> =
            unsafe { std::mem::transmute(guard) };
        boxed_lock.1 = Some(static_guard);

        info!("Acquired instance lock for '{}'", key);

        Ok(Self {
            _lock: boxed_lock,
            lock_path,
        })
    }

    /// Get the lock file path for a key
    fn lock_path(key: &str) -> PathBuf {
        #[cfg(unix)]
        let base = Path::new("/tmp");

        #[cfg(windows)]
        let base = std::env::temp_dir();

        base.join(format!("backup-warden-{}.lock", key))
    }

    /// Get the lock file path (for cleanup or inspection)
    #[allow(dead_code)]
    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        info!("Released instance lock: {:?}", self.lock_path);

        // Try to remove the lock file (best effort)
        if let Err(e) = std::fs::remove_file(&self.lock_path) {
            debug!("Failed to remove lock file: {}", e);
        }
    }
}
