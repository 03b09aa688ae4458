use std::{
    fs::{self, File, OpenOptions},
    io::{ErrorKind, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    process,
};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::infrastructure::directories::ResolvedPaths;

const LOCK_FILENAME: &str = ".bidpilot.lock";

/// Exclusive lock on the data directory. The bid state store assumes a
/// single writer; a second process rewriting the JSON maps would corrupt
/// them, so a held lock is a fatal startup error rather than a wait.
#[derive(Debug)]
pub struct InstanceGuard {
    file: File,
    path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    pid: u32,
    started_at: i64,
}

impl InstanceGuard {
    pub fn acquire(paths: &ResolvedPaths) -> Result<Self> {
        let lock_path = paths.data_dir.join(LOCK_FILENAME);
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&lock_path)
            .with_context(|| format!("failed to open lock file {}", lock_path.display()))?;

        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::WouldBlock => {
                let holder = read_lock_info(&lock_path)
                    .map(|info| format!(" (held by pid {})", info.pid))
                    .unwrap_or_default();
                return Err(anyhow!(
                    "another bidpilot instance owns the bid state{holder}; refusing to start"
                ));
            }
            Err(err) => return Err(err.into()),
        }

        write_lock_info(&mut file, process::id())?;
        tracing::info!(
            target: "lifecycle",
            pid = process::id(),
            path = %lock_path.display(),
            "acquired bid state lock"
        );
        Ok(Self {
            file,
            path: lock_path,
        })
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != ErrorKind::NotFound {
                tracing::warn!(
                    target: "lifecycle",
                    path = %self.path.display(),
                    error = %err,
                    "failed to remove lock file on shutdown"
                );
            }
        }
    }
}

fn write_lock_info(file: &mut File, pid: u32) -> Result<()> {
    let info = LockInfo {
        pid,
        started_at: Utc::now().timestamp_millis(),
    };
    let payload = serde_json::to_vec(&info)?;
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&payload)?;
    file.sync_all()?;
    Ok(())
}

fn read_lock_info(lock_path: &Path) -> Option<LockInfo> {
    let contents = fs::read_to_string(lock_path).ok()?;
    serde_json::from_str(&contents).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths_in(dir: &tempfile::TempDir) -> ResolvedPaths {
        ResolvedPaths {
            logs_dir: dir.path().join("logs"),
            data_dir: dir.path().to_path_buf(),
            submitted_path: dir.path().join("submitted_bids.json"),
            skipped_path: dir.path().join("skipped_bids.json"),
        }
    }

    #[test]
    fn second_acquire_in_process_fails() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(&dir);
        let _guard = InstanceGuard::acquire(&paths).unwrap();
        assert!(InstanceGuard::acquire(&paths).is_err());
    }

    #[test]
    fn lock_is_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(&dir);
        drop(InstanceGuard::acquire(&paths).unwrap());
        let _guard = InstanceGuard::acquire(&paths).unwrap();
    }
}
