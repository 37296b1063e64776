//! Snapshot and restore of the local tiers.
//!
//! A backup directory holds pairs sharing one timestamp:
//!
//! ```text
//! <dir>/memory_cache_20250101_120000_123.snapshot   framed Vec<CacheEntry>, LRU → MRU
//! <dir>/file_cache_20250101_120000_123/             copy of the cache directory
//! ```
//!
//! The file copy is written first under a dot-prefixed name and renamed;
//! the snapshot is written last, so a `memory_cache_*` file marks a complete
//! backup. Redis only gets a best-effort `BGSAVE`; restoring Redis data is an
//! operator action outside this service.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::macros::format_description;
use uuid::Uuid;

use crate::codec;
use crate::entry::{CacheEntry, now_millis};
use crate::error::CacheError;
use crate::service::CacheService;

const SNAPSHOT_PREFIX: &str = "memory_cache_";
const SNAPSHOT_EXTENSION: &str = ".snapshot";
const FILE_DIR_PREFIX: &str = "file_cache_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupInfo {
    pub stamp: String,
    pub snapshot: PathBuf,
    pub file_dir: PathBuf,
    pub memory_entries: usize,
    pub files: usize,
    /// `BGSAVE` was accepted by Redis. Completion is not tracked.
    pub remote_persistence_requested: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreInfo {
    pub stamp: String,
    pub memory_entries: usize,
    /// Snapshot entries that had expired by restore time.
    pub skipped_expired: usize,
    pub files: usize,
}

fn io_context(context: String) -> impl FnOnce(io::Error) -> CacheError {
    move |e| CacheError::backup(format!("{context}: {e}"))
}

fn timestamp() -> Result<String, CacheError> {
    OffsetDateTime::now_utc()
        .format(format_description!(
            "[year][month][day]_[hour][minute][second]_[subsecond digits:3]"
        ))
        .map_err(|e| CacheError::backup(format!("cannot format timestamp: {e}")))
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Copy regular entry files from `src` into `dst` (created if missing).
/// Dot files (temporaries, sentinels) are skipped.
async fn copy_entries(src: &Path, dst: &Path) -> Result<usize, CacheError> {
    tokio::fs::create_dir_all(dst)
        .await
        .map_err(io_context(format!("cannot create {}", dst.display())))?;
    let mut dir = tokio::fs::read_dir(src)
        .await
        .map_err(io_context(format!("cannot read {}", src.display())))?;
    let mut copied = 0;
    while let Some(item) = dir
        .next_entry()
        .await
        .map_err(io_context(format!("cannot read {}", src.display())))?
    {
        if item.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let is_file = item
            .file_type()
            .await
            .map(|ty| ty.is_file())
            .unwrap_or(false);
        if !is_file {
            continue;
        }
        let from = item.path();
        match tokio::fs::copy(&from, dst.join(item.file_name())).await {
            Ok(_) => copied += 1,
            // Removed by a concurrent delete or cleanup
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_context(format!("cannot copy {}", from.display()))(e)),
        }
    }
    Ok(copied)
}

/// Stamp of the newest complete backup in `dir`.
async fn latest_stamp(dir: &Path) -> Result<Option<String>, CacheError> {
    let mut stamps = Vec::new();
    let mut listing = tokio::fs::read_dir(dir)
        .await
        .map_err(io_context(format!("cannot read backup directory {}", dir.display())))?;
    while let Some(item) = listing
        .next_entry()
        .await
        .map_err(io_context(format!("cannot read backup directory {}", dir.display())))?
    {
        let name = item.file_name().to_string_lossy().into_owned();
        if let Some(stamp) = name
            .strip_prefix(SNAPSHOT_PREFIX)
            .and_then(|rest| rest.strip_suffix(SNAPSHOT_EXTENSION))
        {
            stamps.push(stamp.to_string());
        }
    }
    stamps.sort_unstable_by(|a, b| b.cmp(a));
    for stamp in stamps {
        let files = dir.join(format!("{FILE_DIR_PREFIX}{stamp}"));
        if tokio::fs::metadata(&files).await.is_ok_and(|meta| meta.is_dir()) {
            return Ok(Some(stamp));
        }
        tracing::warn!(stamp = %stamp, "Skipping backup without file tier copy");
    }
    Ok(None)
}

impl CacheService {
    /// Write a timestamped backup of the memory and file tiers into `dir`.
    pub async fn backup(&self, dir: impl AsRef<Path>) -> Result<BackupInfo, CacheError> {
        let dir = dir.as_ref();
        let inner = &self.inner;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(io_context(format!("cannot create {}", dir.display())))?;

        let mut stamp = timestamp()?;
        while exists(&dir.join(format!("{SNAPSHOT_PREFIX}{stamp}{SNAPSHOT_EXTENSION}"))).await
            || exists(&dir.join(format!("{FILE_DIR_PREFIX}{stamp}"))).await
        {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            stamp = timestamp()?;
        }

        let file_dir = dir.join(format!("{FILE_DIR_PREFIX}{stamp}"));
        let partial = dir.join(format!(".{FILE_DIR_PREFIX}{stamp}.partial"));
        let files = match copy_entries(inner.file.dir(), &partial).await {
            Ok(files) => files,
            Err(e) => {
                let _ = tokio::fs::remove_dir_all(&partial).await;
                return Err(e);
            }
        };
        tokio::fs::rename(&partial, &file_dir)
            .await
            .map_err(io_context(format!("cannot finalize {}", file_dir.display())))?;

        let entries = inner.memory.snapshot();
        let bytes = codec::encode(&entries)?;
        let snapshot = dir.join(format!("{SNAPSHOT_PREFIX}{stamp}{SNAPSHOT_EXTENSION}"));
        let temp = dir.join(format!(".{SNAPSHOT_PREFIX}{stamp}.tmp"));
        tokio::fs::write(&temp, &bytes)
            .await
            .map_err(io_context(format!("cannot write {}", temp.display())))?;
        tokio::fs::rename(&temp, &snapshot)
            .await
            .map_err(io_context(format!("cannot finalize {}", snapshot.display())))?;

        let remote_persistence_requested = if inner.remote.is_configured() {
            match inner.remote.request_persistence().await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "Redis BGSAVE request failed");
                    false
                }
            }
        } else {
            false
        };

        tracing::info!(
            dir = %dir.display(),
            stamp = %stamp,
            memory_entries = entries.len(),
            files,
            "Cache backup written"
        );
        Ok(BackupInfo {
            stamp,
            snapshot,
            file_dir,
            memory_entries: entries.len(),
            files,
            remote_persistence_requested,
        })
    }

    /// Restore the newest complete backup found in `dir`.
    ///
    /// Everything is staged first; the live cache directory and memory tier
    /// are only replaced after staging succeeded, so a failure leaves the
    /// current state untouched.
    pub async fn restore(&self, dir: impl AsRef<Path>) -> Result<RestoreInfo, CacheError> {
        let dir = dir.as_ref();
        let inner = &self.inner;
        let stamp = latest_stamp(dir)
            .await?
            .ok_or_else(|| CacheError::backup(format!("no complete backup in {}", dir.display())))?;

        let snapshot = dir.join(format!("{SNAPSHOT_PREFIX}{stamp}{SNAPSHOT_EXTENSION}"));
        let bytes = tokio::fs::read(&snapshot)
            .await
            .map_err(io_context(format!("cannot read {}", snapshot.display())))?;
        let entries: Vec<CacheEntry> = codec::decode(&bytes).map_err(|e| {
            CacheError::backup(format!("unreadable snapshot {}: {e}", snapshot.display()))
        })?;
        let now = now_millis();
        let total = entries.len();
        let entries: Vec<CacheEntry> = entries
            .into_iter()
            .filter(|entry| !entry.is_expired_at(now))
            .collect();
        let skipped_expired = total - entries.len();

        let live = inner.file.dir().to_path_buf();
        let parent = live
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let name = live
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "cache".to_string());
        let staging = parent.join(format!(".{name}.staging-{}", Uuid::new_v4()));

        let files = match copy_entries(&dir.join(format!("{FILE_DIR_PREFIX}{stamp}")), &staging).await {
            Ok(files) => files,
            Err(e) => {
                let _ = tokio::fs::remove_dir_all(&staging).await;
                return Err(e);
            }
        };

        swap_dirs(&live, &staging, &parent.join(format!(".{name}.retired-{}", Uuid::new_v4()))).await?;
        inner.memory.replace_all(entries);
        let memory_entries = inner.memory.len();

        tracing::info!(
            dir = %dir.display(),
            stamp = %stamp,
            memory_entries,
            skipped_expired,
            files,
            "Cache restored from backup"
        );
        Ok(RestoreInfo {
            stamp,
            memory_entries,
            skipped_expired,
            files,
        })
    }
}

/// Put `staging` in place of `live`, keeping the old directory until the
/// new one is in place.
async fn swap_dirs(live: &Path, staging: &Path, retired: &Path) -> Result<(), CacheError> {
    let had_live = match tokio::fs::rename(live, retired).await {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            let _ = tokio::fs::remove_dir_all(staging).await;
            return Err(io_context(format!("cannot retire {}", live.display()))(e));
        }
    };

    if let Err(e) = tokio::fs::rename(staging, live).await {
        if had_live {
            if let Err(rollback) = tokio::fs::rename(retired, live).await {
                tracing::error!(
                    live = %live.display(),
                    retired = %retired.display(),
                    error = %rollback,
                    "Rollback of cache directory failed"
                );
            }
        }
        let _ = tokio::fs::remove_dir_all(staging).await;
        return Err(io_context(format!("cannot move restored files into {}", live.display()))(e));
    }

    if had_live {
        if let Err(e) = tokio::fs::remove_dir_all(retired).await {
            tracing::warn!(path = %retired.display(), error = %e, "Cannot remove retired cache directory");
        }
    }
    Ok(())
}
