//! Directory-backed artifact store.
//!
//! Artifacts live at `{dir}/{id}.mp3`. Writes go to a `.part` staging file in
//! the same directory and are renamed into place, so a reader either sees the
//! complete file or nothing. Staging names never parse as artifact names, which
//! keeps them unreachable from `/audio/{filename}`. Staging files orphaned by a
//! killed process are listed separately so the sweeper can reclaim them.

use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use voxgate_core::id::AudioId;

use crate::error::{GatewayError, Result};

/// One stored audio file.
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    pub id: AudioId,
    pub path: PathBuf,
    pub created_at: SystemTime,
}

impl AudioArtifact {
    pub fn filename(&self) -> String {
        self.id.filename()
    }
}

/// A staging file found on disk.
#[derive(Debug, Clone)]
pub struct StagingLeftover {
    pub id: AudioId,
    pub name: String,
    pub modified_at: SystemTime,
}

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open the store, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        debug!("file store at {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn artifact_path(&self, id: &AudioId) -> PathBuf {
        self.dir.join(id.filename())
    }

    /// Map a client-supplied filename to a path inside the store.
    fn resolve(&self, filename: &str) -> Result<PathBuf> {
        let id = AudioId::from_filename(filename).ok_or(GatewayError::NotFound)?;
        Ok(self.artifact_path(&id))
    }

    /// Reserve a staging path for `id`. The file is removed when the guard
    /// drops unless it was committed.
    pub fn stage(&self, id: &AudioId, label: &str) -> StagedFile {
        StagedFile {
            path: self.dir.join(id.staging_name(label)),
            armed: true,
        }
    }

    /// Write `bytes` as the artifact for `id`.
    pub async fn put(&self, id: AudioId, bytes: &[u8]) -> Result<AudioArtifact> {
        let staged = self.stage(&id, "upload");

        let mut file = tokio::fs::File::create(staged.path()).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        self.commit(id, staged).await
    }

    /// Move a fully written staging file into place as the artifact for `id`.
    pub async fn commit(&self, id: AudioId, mut staged: StagedFile) -> Result<AudioArtifact> {
        let dest = self.artifact_path(&id);
        tokio::fs::rename(staged.path(), &dest).await?;
        staged.armed = false;

        debug!("stored {}", dest.display());
        Ok(AudioArtifact {
            id,
            path: dest,
            created_at: SystemTime::now(),
        })
    }

    /// Open an artifact for streaming. Returns the handle and its length.
    ///
    /// The sweeper may delete the file at any time; a vanished file is
    /// reported as [`GatewayError::NotFound`].
    pub async fn open_file(&self, filename: &str) -> Result<(tokio::fs::File, u64)> {
        let path = self.resolve(filename)?;
        let file = tokio::fs::File::open(&path).await.map_err(not_found_or_storage)?;
        let meta = file.metadata().await.map_err(not_found_or_storage)?;
        if !meta.is_file() {
            return Err(GatewayError::NotFound);
        }
        Ok((file, meta.len()))
    }

    /// Read a whole artifact into memory.
    pub async fn get(&self, filename: &str) -> Result<Vec<u8>> {
        let path = self.resolve(filename)?;
        tokio::fs::read(&path).await.map_err(not_found_or_storage)
    }

    /// All artifacts currently on disk. Entries that vanish or cannot be
    /// inspected mid-scan are skipped.
    pub async fn list_all(&self) -> Result<Vec<AudioArtifact>> {
        let entries = self.scan(AudioId::from_filename).await?;
        Ok(entries
            .into_iter()
            .filter_map(|(id, _, path, meta)| {
                let created_at = match meta.created().or_else(|_| meta.modified()) {
                    Ok(t) => t,
                    Err(e) => {
                        warn!("list: no timestamp for {}: {e}", path.display());
                        return None;
                    }
                };
                Some(AudioArtifact {
                    id,
                    path,
                    created_at,
                })
            })
            .collect())
    }

    /// Staging files currently on disk, with their last write time.
    pub async fn list_staging(&self) -> Result<Vec<StagingLeftover>> {
        let entries = self.scan(AudioId::from_staging_name).await?;
        Ok(entries
            .into_iter()
            .filter_map(|(id, name, path, meta)| match meta.modified() {
                Ok(modified_at) => Some(StagingLeftover {
                    id,
                    name,
                    modified_at,
                }),
                Err(e) => {
                    warn!("list: no timestamp for {}: {e}", path.display());
                    None
                }
            })
            .collect())
    }

    /// Regular files whose names `parse` accepts.
    async fn scan(
        &self,
        parse: fn(&str) -> Option<AudioId>,
    ) -> Result<Vec<(AudioId, String, PathBuf, Metadata)>> {
        let mut out = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let Some(id) = parse(&name) else {
                continue;
            };

            let meta = match entry.metadata().await {
                Ok(m) => m,
                Err(e) => {
                    debug!("list: skipping {}: {e}", entry.path().display());
                    continue;
                }
            };
            if !meta.is_file() {
                continue;
            }

            out.push((id, name, entry.path(), meta));
        }

        Ok(out)
    }

    /// Delete an artifact by filename.
    pub async fn delete(&self, filename: &str) -> Result<()> {
        let path = self.resolve(filename)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(not_found_or_storage)
    }

    /// Delete a staging file by name. Only names of the form
    /// `{id}.{label}.part` are accepted.
    pub async fn delete_staging(&self, name: &str) -> Result<()> {
        AudioId::from_staging_name(name).ok_or(GatewayError::NotFound)?;
        tokio::fs::remove_file(self.dir.join(name))
            .await
            .map_err(not_found_or_storage)
    }
}

fn not_found_or_storage(e: std::io::Error) -> GatewayError {
    if e.kind() == ErrorKind::NotFound {
        GatewayError::NotFound
    } else {
        GatewayError::Storage(e)
    }
}

/// Staging file guard; deletes the file on drop unless committed.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    armed: bool,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("removed staging file {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("failed to remove staging file {}: {e}", self.path.display()),
        }
    }
}
