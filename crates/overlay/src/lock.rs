use std::fs::{File, OpenOptions, TryLockError};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("another overlay instance holds {}", .0.display())]
    AlreadyRunning(PathBuf),
    #[error("cannot open lock file {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// Exclusive ownership of the overlay lock file for the life of the process.
///
/// The file is opened without truncation, so an instance that loses the race
/// leaves the holder's record untouched. The holder writes its pid once the
/// lock is taken, and removes the file on drop.
pub struct InstanceLock {
    file: Option<File>,
    path: PathBuf,
}

impl InstanceLock {
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        let io_err = |source| LockError::Io { path: path.to_path_buf(), source };

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(io_err)?;

        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => {
                return Err(LockError::AlreadyRunning(path.to_path_buf()))
            }
            Err(TryLockError::Error(e)) => return Err(io_err(e)),
        }

        file.set_len(0).map_err(io_err)?;
        file.seek(SeekFrom::Start(0)).map_err(io_err)?;
        write!(file, "{}", std::process::id()).map_err(io_err)?;
        file.flush().map_err(io_err)?;

        Ok(Self { file: Some(file), path: path.to_path_buf() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        // Close first: Windows refuses to delete a file with an open handle.
        drop(self.file.take());
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!("Cannot remove lock file {}: {e}", self.path.display());
        }
    }
}
