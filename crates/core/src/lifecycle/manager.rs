//! Lifecycle manager implementation.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use super::error::LifecycleError;
use super::types::{DirectoryLayout, DisposalPolicy, RecordingKind};

/// Moves recordings through the `new → found → complete` directory
/// lifecycle and final images into the destination directory.
///
/// The claim rename is the only synchronization primitive between
/// concurrent pipeline instances: within one directory tree the rename is
/// atomic, so the first caller wins and a vanished source means another
/// instance got there first.
pub struct FileLifecycle {
    layout: DirectoryLayout,
    disposal: DisposalPolicy,
}

impl FileLifecycle {
    /// Creates a lifecycle manager over `layout` with the given disposal
    /// policy for finished recordings.
    pub fn new(layout: DirectoryLayout, disposal: DisposalPolicy) -> Self {
        Self { layout, disposal }
    }

    /// The directory layout this manager operates on.
    pub fn layout(&self) -> &DirectoryLayout {
        &self.layout
    }

    /// Creates every lifecycle directory plus the shared work directory.
    pub async fn ensure_layout(&self) -> Result<(), LifecycleError> {
        let mut dirs = vec![self.layout.work_dir()];
        for kind in [RecordingKind::SoftBit, RecordingKind::Iq] {
            dirs.push(self.layout.new_dir(kind));
            dirs.push(self.layout.found_dir(kind));
            dirs.push(self.layout.complete_dir(kind));
        }

        for dir in dirs {
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| LifecycleError::DirectoryCreationFailed {
                    path: dir.clone(),
                    source: e,
                })?;
        }

        Ok(())
    }

    /// Claims a discovered recording by renaming it into the found
    /// directory, keeping its basename.
    ///
    /// Returns `Ok(None)` when the source has vanished — another instance
    /// claimed it first, which is a skip, not an error. The move is a bare
    /// rename, never a copy, so a claim either fully happens or not at
    /// all.
    pub async fn claim(
        &self,
        path: &Path,
        kind: RecordingKind,
    ) -> Result<Option<PathBuf>, LifecycleError> {
        let Some(name) = path.file_name() else {
            return Ok(None);
        };
        let destination = self.layout.found_dir(kind).join(name);

        match fs::rename(path, &destination).await {
            Ok(()) => {
                info!(recording = %destination.display(), "claimed recording");
                Ok(Some(destination))
            }
            // NotFound with the source still present means the found dir
            // is missing, not a lost race.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !path.exists() => {
                debug!(recording = %path.display(), "claim lost to another instance");
                Ok(None)
            }
            Err(e) => Err(LifecycleError::move_failed(
                path.to_path_buf(),
                destination,
                e,
            )),
        }
    }

    /// Retires a claimed recording according to the disposal policy.
    ///
    /// Must be called exactly once per claimed recording, whatever the
    /// decode outcome, so the found directory never accumulates orphans.
    pub async fn retire(&self, path: &Path, kind: RecordingKind) -> Result<(), LifecycleError> {
        match self.disposal {
            DisposalPolicy::Archive => {
                let Some(name) = path.file_name() else {
                    return Ok(());
                };
                let destination = self.layout.complete_dir(kind).join(name);
                Self::move_file(path, &destination).await?;
                info!(recording = %destination.display(), "archived recording");
            }
            DisposalPolicy::Delete => {
                fs::remove_file(path)
                    .await
                    .map_err(|e| LifecycleError::RemoveFailed {
                        path: path.to_path_buf(),
                        source: e,
                    })?;
                info!(recording = %path.display(), "deleted recording");
            }
        }
        Ok(())
    }

    /// Moves a finished image into the destination directory, creating it
    /// if needed. Falls back to copy+delete when the destination is on a
    /// different filesystem.
    pub async fn publish(
        &self,
        source: &Path,
        destination_dir: &Path,
    ) -> Result<PathBuf, LifecycleError> {
        let Some(name) = source.file_name() else {
            return Err(LifecycleError::move_failed(
                source.to_path_buf(),
                destination_dir.to_path_buf(),
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "source has no file name"),
            ));
        };

        fs::create_dir_all(destination_dir).await.map_err(|e| {
            LifecycleError::DirectoryCreationFailed {
                path: destination_dir.to_path_buf(),
                source: e,
            }
        })?;

        let destination = destination_dir.join(name);
        Self::move_file(source, &destination).await?;
        info!(image = %destination.display(), "published image");
        Ok(destination)
    }

    /// Removes work-directory entries whose name starts with `prefix`.
    ///
    /// Intermediates share a fixed basename across stages, so a stale
    /// artifact from an earlier job would be indistinguishable from this
    /// job's output. Called before the first stage and after retirement.
    pub async fn purge_work_files(&self, prefix: &str) -> Result<usize, LifecycleError> {
        let work_dir = self.layout.work_dir();
        let mut entries = match fs::read_dir(&work_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(LifecycleError::Io(e)),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(prefix) {
                match fs::remove_file(entry.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) => {
                        warn!(path = %entry.path().display(), "failed to purge work file: {}", e)
                    }
                }
            }
        }

        if removed > 0 {
            debug!(prefix, removed, "purged work files");
        }
        Ok(removed)
    }

    /// Deletes a redundant recording that the selected profile does not
    /// consume.
    pub async fn discard(&self, path: &Path) -> Result<(), LifecycleError> {
        match fs::remove_file(path).await {
            Ok(()) => {
                info!(recording = %path.display(), "discarded unused recording");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LifecycleError::RemoveFailed {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Attempts a rename, detecting cross-filesystem failures.
    async fn try_atomic_move(source: &Path, destination: &Path) -> Result<bool, std::io::Error> {
        match fs::rename(source, destination).await {
            Ok(()) => Ok(true),
            Err(e) => {
                // Cross-filesystem moves fail with EXDEV (18 on Linux).
                if e.kind() == std::io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(18) {
                    Ok(false)
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Moves a file, falling back to copy+delete across filesystems.
    async fn move_file(source: &Path, destination: &Path) -> Result<(), LifecycleError> {
        let renamed = Self::try_atomic_move(source, destination)
            .await
            .map_err(|e| {
                LifecycleError::move_failed(source.to_path_buf(), destination.to_path_buf(), e)
            })?;

        if !renamed {
            fs::copy(source, destination).await.map_err(|e| {
                LifecycleError::move_failed(source.to_path_buf(), destination.to_path_buf(), e)
            })?;
            fs::remove_file(source)
                .await
                .map_err(|e| LifecycleError::RemoveFailed {
                    path: source.to_path_buf(),
                    source: e,
                })?;
        }

        Ok(())
    }
}
