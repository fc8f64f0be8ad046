//! Single-poller ownership.
//!
//! Only one polling loop may write archives and state for a store at a time.
//! Whoever holds a [`PollerLease`] is that loop; the lease is an exclusive
//! advisory lock on `<state>/poller.lock` and goes away when dropped, even if
//! the process dies.

use anyhow::{bail, Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub const LEASE_FILE: &str = "poller.lock";

#[derive(Debug)]
pub struct PollerLease {
    path: PathBuf,
    file: File,
}

impl PollerLease {
    /// Take the lease or fail right away if another poller holds it.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("Failed to open lease file {}", path.display()))?;

        if file.try_lock_exclusive().is_err() {
            let mut owner = String::new();
            let _ = file.read_to_string(&mut owner);
            let owner = owner.trim();
            if owner.is_empty() {
                bail!("Another poller holds {}", path.display());
            }
            bail!(
                "Another poller (pid {}) holds {}. Stop it before starting a new one.",
                owner,
                path.display()
            );
        }

        let write_owner = |file: &mut File| -> std::io::Result<()> {
            file.set_len(0)?;
            file.seek(SeekFrom::Start(0))?;
            writeln!(file, "{}", std::process::id())?;
            file.sync_data()
        };
        write_owner(&mut file)
            .with_context(|| format!("Failed to record owner in {}", path.display()))?;

        log::info!("Acquired poller lease {}", path.display());
        Ok(Self { path, file })
    }

    /// Lease file inside a state directory.
    pub fn acquire_in(state_dir: &Path) -> Result<Self> {
        Self::acquire(state_dir.join(LEASE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PollerLease {
    fn drop(&mut self) {
        let _ = self.file.set_len(0);
        let _ = FileExt::unlock(&self.file);
        log::debug!("Released poller lease {}", self.path.display());
    }
}
