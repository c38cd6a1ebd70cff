//! Advisory per-workload locks for mutating operations.
//!
//! A lock is a file at `<root>/.locks/<kind>-<name>.lock` holding an
//! exclusive `flock`. The kernel releases the `flock` when its owner exits,
//! so a file left behind by a dead process is simply locked again. The
//! owner's pid is written into the file once the lock is held and is only
//! used for diagnostics.
//!
//! The holder unlinks the file before unlocking it on drop. An acquirer that
//! locked a file which has since been unlinked detects the mismatch between
//! its handle and the path and retries.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::{MetadataExt, OpenOptionsExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use thiserror::Error;
use tracing::{debug, warn};

use crate::identity::{WorkloadKind, WorkloadName};

const LOCK_TARGET: &str = "rig_core::lock";

/// Attempts made when the locked file is unlinked under us.
const ACQUIRE_ATTEMPTS: usize = 3;

/// Held lock on one workload. Released on drop.
pub struct WorkloadLock {
    path: PathBuf,
    _lock: Flock<File>,
}

impl fmt::Debug for WorkloadLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkloadLock")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl WorkloadLock {
    /// Path of the lock file guarding `name` of `kind` inside `locks_dir`.
    #[must_use]
    pub fn path_for(locks_dir: &Path, kind: WorkloadKind, name: &WorkloadName) -> PathBuf {
        locks_dir.join(format!("{kind}-{name}.lock"))
    }

    /// Acquires the lock for `name` of `kind` without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Busy`] when another handle holds the lock, even
    /// one that has not yet recorded its pid, and [`LockError::Io`] when the
    /// lock file cannot be managed.
    pub fn acquire(
        locks_dir: &Path,
        kind: WorkloadKind,
        name: &WorkloadName,
    ) -> Result<Self, LockError> {
        let path = Self::path_for(locks_dir, kind, name);
        for _ in 0..ACQUIRE_ATTEMPTS {
            let file = open_lock_file(&path)?;
            let lock = match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
                Ok(lock) => lock,
                Err((_, Errno::EAGAIN)) => return Err(busy(&path, kind, name)),
                Err((_, source)) => return Err(io_error(&path, io::Error::from(source))),
            };
            if !still_linked(&path, &lock)? {
                debug!(target: LOCK_TARGET, file = %path.display(), "lock file replaced; retrying");
                continue;
            }
            record_pid(&path, &lock)?;
            debug!(target: LOCK_TARGET, file = %path.display(), "acquired workload lock");
            return Ok(Self { path, _lock: lock });
        }
        Err(busy(&path, kind, name))
    }

    /// Acquires locks for several workloads of one kind in sorted order.
    ///
    /// Duplicate names are locked once.
    ///
    /// # Errors
    ///
    /// Returns the first acquisition failure; locks taken so far are
    /// released.
    pub fn acquire_many(
        locks_dir: &Path,
        kind: WorkloadKind,
        names: &[&WorkloadName],
    ) -> Result<Vec<Self>, LockError> {
        let mut ordered = names.to_vec();
        ordered.sort();
        ordered.dedup();
        ordered
            .into_iter()
            .map(|name| Self::acquire(locks_dir, kind, name))
            .collect()
    }

    /// Location of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }
}

impl Drop for WorkloadLock {
    fn drop(&mut self) {
        // Unlink while still locked; the flock is released when the field drops.
        match fs::remove_file(&self.path) {
            Err(error) if error.kind() != io::ErrorKind::NotFound => {
                warn!(
                    target: LOCK_TARGET,
                    file = %self.path.display(),
                    %error,
                    "failed to remove lock file"
                );
            }
            _ => debug!(target: LOCK_TARGET, file = %self.path.display(), "released workload lock"),
        }
    }
}

/// Errors raised while taking a workload lock.
#[derive(Debug, Clone, Error)]
pub enum LockError {
    /// Another handle already holds the lock.
    #[error("{kind} '{name}' is busy: another operation (pid {pid}) holds {}", path.display())]
    Busy {
        /// Workload kind.
        kind: WorkloadKind,
        /// Workload name.
        name: String,
        /// Pid recorded in the lock file, `0` when not yet written.
        pid: u32,
        /// Lock file path.
        path: PathBuf,
    },
    /// The lock file could not be created, locked, written or removed.
    #[error("failed to manage lock file {}: {source}", path.display())]
    Io {
        /// Lock file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
}

fn io_error(path: &Path, source: io::Error) -> LockError {
    LockError::Io {
        path: path.to_path_buf(),
        source: Arc::new(source),
    }
}

fn busy(path: &Path, kind: WorkloadKind, name: &WorkloadName) -> LockError {
    LockError::Busy {
        kind,
        name: name.to_string(),
        pid: read_pid(path).unwrap_or(0),
        path: path.to_path_buf(),
    }
}

fn open_lock_file(path: &Path) -> Result<File, LockError> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .mode(0o600)
        .open(path)
        .map_err(|error| io_error(path, error))
}

/// Whether `path` still names the file behind the locked handle.
fn still_linked(path: &Path, lock: &Flock<File>) -> Result<bool, LockError> {
    let held = lock.metadata().map_err(|error| io_error(path, error))?;
    match fs::metadata(path) {
        Ok(current) => Ok(current.dev() == held.dev() && current.ino() == held.ino()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(error) => Err(io_error(path, error)),
    }
}

fn record_pid(path: &Path, lock: &Flock<File>) -> Result<(), LockError> {
    let mut file: &File = lock;
    file.set_len(0).map_err(|error| io_error(path, error))?;
    writeln!(file, "{}", std::process::id()).map_err(|error| io_error(path, error))?;
    file.sync_all().map_err(|error| io_error(path, error))
}

fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}
