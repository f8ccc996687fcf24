//! Advisory file locks and atomic writes for `.plank/`.
//!
//! Every mutation of a log, snapshot or registry runs under a sibling
//! `<file>.lock` held with `fs2`. Whole-file rewrites go through a
//! `NamedTempFile` in the same directory that is persisted over the target.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// How long a writer waits for another plank process before giving up.
pub const LOCK_WAIT: Duration = Duration::from_secs(5);

const RETRY_EVERY: Duration = Duration::from_millis(25);

/// Held lock on a `.lock` file; released on drop.
pub struct LockGuard {
    file: File,
}

impl LockGuard {
    /// Take the lock, polling until `wait` elapses.
    pub fn acquire(lock_path: &Path, wait: Duration) -> Result<Self> {
        let started = Instant::now();
        loop {
            if let Some(guard) = Self::try_acquire(lock_path)? {
                let waited = started.elapsed();
                if waited >= RETRY_EVERY {
                    tracing::debug!(path = %lock_path.display(), ?waited, "lock acquired after wait");
                }
                return Ok(guard);
            }
            if started.elapsed() >= wait {
                tracing::warn!(path = %lock_path.display(), "lock wait timed out");
                return Err(Error::LockFailed(lock_path.to_path_buf()));
            }
            thread::sleep(RETRY_EVERY);
        }
    }

    /// One attempt. `Ok(None)` while another holder has it.
    pub fn try_acquire(lock_path: &Path) -> Result<Option<Self>> {
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { file })),
            Err(err) if contended(&err) => Ok(None),
            Err(err) => Err(Error::Io(err)),
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn contended(err: &io::Error) -> bool {
    // Windows reports sharing violations (32, 33) instead of WouldBlock.
    err.kind() == io::ErrorKind::WouldBlock
        || (cfg!(windows) && matches!(err.raw_os_error(), Some(32) | Some(33)))
}

/// `tasks.jsonl` is guarded by `tasks.jsonl.lock`.
pub fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Run `f` while holding the lock that guards `path`.
pub fn with_lock<T, F>(path: &Path, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let _guard = LockGuard::acquire(&lock_path_for(path), LOCK_WAIT)?;
    f()
}

/// Replace `path` with `data`. Callers hold the lock for `path`.
pub fn write_atomic(path: impl AsRef<Path>, data: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(data)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| Error::Io(err.error))?;
    Ok(())
}
