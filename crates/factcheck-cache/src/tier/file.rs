//! Per-node persistent tier: one file per entry.
//!
//! Files are named `<sha256(canonical key)>.cache`. Each file holds a framed
//! [`CacheEntry`] so the canonical key can be recovered when enumerating.
//! Writes go to a `.tmp-<uuid>` file in the same directory and are renamed
//! into place, so readers never see a partial record.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use uuid::Uuid;

use crate::codec;
use crate::entry::{CacheEntry, now_millis};
use crate::error::{CacheError, Tier};
use crate::key::file_stem;

const ENTRY_EXTENSION: &str = "cache";
const TEMP_PREFIX: &str = ".tmp-";
const HEALTH_PREFIX: &str = ".health-";

pub struct FileTier {
    dir: PathBuf,
    timeout: Duration,
}

impl FileTier {
    /// Open (creating if needed) the tier directory and verify it is writable.
    ///
    /// Failure here is a configuration error: the directory is unusable.
    pub async fn open(dir: impl Into<PathBuf>, timeout: Duration) -> Result<Self, CacheError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            CacheError::configuration(format!(
                "cannot create cache directory {}: {e}",
                dir.display()
            ))
        })?;
        let tier = Self { dir, timeout };
        tier.probe().await.map_err(|e| {
            CacheError::configuration(format!(
                "cache directory {} is not writable: {e}",
                tier.dir.display()
            ))
        })?;
        Ok(tier)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{ENTRY_EXTENSION}", file_stem(key)))
    }

    async fn bounded<T>(
        &self,
        op: &str,
        fut: impl Future<Output = io::Result<T>>,
    ) -> Result<T, CacheError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(CacheError::tier(Tier::File, format!("{op}: {e}"))),
            Err(_) => Err(CacheError::tier(
                Tier::File,
                format!("{op}: timed out after {:?}", self.timeout),
            )),
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let path = self.path_for(key);
        let bytes = self
            .bounded("read", async {
                match tokio::fs::read(&path).await {
                    Ok(bytes) => Ok(Some(bytes)),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await?;
        let Some(bytes) = bytes else {
            return Ok(None);
        };

        let entry = match codec::decode::<CacheEntry>(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key = %key, path = %path.display(), error = %e, "Dropping unreadable cache file");
                self.remove_path(&path).await?;
                return Ok(None);
            }
        };
        if entry.key != key {
            tracing::warn!(key = %key, stored = %entry.key, "Cache file key mismatch");
            return Ok(None);
        }
        if entry.is_expired() {
            self.remove_path(&path).await?;
            return Ok(None);
        }
        Ok(Some(entry))
    }

    pub async fn put(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let bytes = codec::encode(entry)?;
        let path = self.path_for(&entry.key);
        let temp = self.dir.join(format!("{TEMP_PREFIX}{}", Uuid::new_v4()));
        let result = self
            .bounded("write", async {
                tokio::fs::write(&temp, &bytes).await?;
                tokio::fs::rename(&temp, &path).await
            })
            .await;
        if result.is_err() {
            let _ = tokio::fs::remove_file(&temp).await;
        }
        result
    }

    pub async fn remove(&self, key: &str) -> Result<bool, CacheError> {
        let path = self.path_for(key);
        self.remove_path(&path).await
    }

    async fn remove_path(&self, path: &Path) -> Result<bool, CacheError> {
        self.bounded("remove", async {
            match tokio::fs::remove_file(path).await {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(e),
            }
        })
        .await
    }

    /// Paths of all entry files (temporary and sentinel files excluded).
    async fn entry_paths(&self) -> Result<Vec<PathBuf>, CacheError> {
        self.bounded("scan", async {
            let mut paths = Vec::new();
            let mut dir = tokio::fs::read_dir(&self.dir).await?;
            while let Some(item) = dir.next_entry().await? {
                let path = item.path();
                let is_entry = path
                    .extension()
                    .is_some_and(|ext| ext == ENTRY_EXTENSION)
                    && !item.file_name().to_string_lossy().starts_with('.');
                if is_entry && item.file_type().await?.is_file() {
                    paths.push(path);
                }
            }
            Ok(paths)
        })
        .await
    }

    /// Every readable entry, expired ones included.
    async fn scan(&self) -> Result<Vec<(PathBuf, CacheEntry)>, CacheError> {
        let mut out = Vec::new();
        for path in self.entry_paths().await? {
            let bytes = match self
                .bounded("read", async {
                    match tokio::fs::read(&path).await {
                        Ok(bytes) => Ok(Some(bytes)),
                        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                        Err(e) => Err(e),
                    }
                })
                .await?
            {
                Some(bytes) => bytes,
                None => continue,
            };
            match codec::decode::<CacheEntry>(&bytes) {
                Ok(entry) => out.push((path, entry)),
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable cache file");
                }
            }
        }
        Ok(out)
    }

    /// Canonical keys of all live entries.
    pub async fn keys(&self) -> Result<Vec<String>, CacheError> {
        let now = now_millis();
        Ok(self
            .scan()
            .await?
            .into_iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(_, entry)| entry.key)
            .collect())
    }

    /// Sum of entry file sizes in bytes.
    pub async fn size_bytes(&self) -> Result<u64, CacheError> {
        let paths = self.entry_paths().await?;
        self.bounded("stat", async {
            let mut total = 0u64;
            for path in &paths {
                match tokio::fs::metadata(path).await {
                    Ok(meta) => total += meta.len(),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e),
                }
            }
            Ok(total)
        })
        .await
    }

    pub async fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = now_millis();
        let mut removed = 0;
        for (path, entry) in self.scan().await? {
            if entry.is_expired_at(now) && self.remove_path(&path).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Remove every entry, or only those of `namespace`. Returns removed keys.
    pub async fn clear(&self, namespace: Option<&str>) -> Result<Vec<String>, CacheError> {
        let prefix = namespace.map(|ns| format!("{ns}:"));
        let mut removed = Vec::new();
        for (path, entry) in self.scan().await? {
            let matches = prefix
                .as_deref()
                .is_none_or(|prefix| entry.key.starts_with(prefix));
            if matches && self.remove_path(&path).await? {
                removed.push(entry.key);
            }
        }
        Ok(removed)
    }

    /// Sentinel write + delete in the tier directory.
    pub async fn probe(&self) -> Result<(), CacheError> {
        let sentinel = self.dir.join(format!("{HEALTH_PREFIX}{}", Uuid::new_v4()));
        self.bounded("probe", async {
            tokio::fs::write(&sentinel, b"ok").await?;
            tokio::fs::remove_file(&sentinel).await
        })
        .await
    }
}
