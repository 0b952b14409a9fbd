//! Disk cache for raw OpenAPI documents.
//!
//! One file per source URL, named by a truncated SHA256 of the URL. The file's
//! modification time is the cache timestamp. Every failure here is treated as a
//! miss; the cache is advisory and never a hard error source.

use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Entries older than this are treated as absent.
pub const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Number of hash bytes kept in the cache filename.
const KEY_BYTES: usize = 8;

#[derive(Debug, Clone)]
pub struct SpecCache {
    dir: PathBuf,
    ttl: Duration,
}

impl SpecCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_ttl(dir, CACHE_TTL)
    }

    pub fn with_ttl(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        let dir = dir.into();
        if let Err(e) = fs::create_dir_all(&dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "Failed to create spec cache directory");
        }
        Self { dir, ttl }
    }

    /// `<cache_dir>/arr-navigator`, falling back to the temp directory.
    pub fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("arr-navigator")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stable filename for a URL: hex of the first 8 bytes of its SHA256.
    pub fn cache_key(url: &str) -> String {
        let digest = Sha256::digest(url.as_bytes());
        digest[..KEY_BYTES]
            .iter()
            .fold(String::with_capacity(KEY_BYTES * 2), |mut out, b| {
                let _ = write!(out, "{:02x}", b);
                out
            })
    }

    pub fn entry_path(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.json", Self::cache_key(url)))
    }

    /// Cached bytes for `url`, if present and younger than the TTL.
    pub fn get(&self, url: &str) -> Option<Vec<u8>> {
        let path = self.entry_path(url);
        let modified = fs::metadata(&path).and_then(|m| m.modified()).ok()?;

        // A timestamp in the future counts as brand new.
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        if age >= self.ttl {
            tracing::debug!(url, age_secs = age.as_secs(), "Cached spec is stale");
            return None;
        }

        match fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::debug!(url, error = %e, "Failed to read cached spec");
                None
            }
        }
    }

    /// Persist `bytes` for `url`, overwriting any previous entry. Callers may
    /// log and drop the error; a failed write never fails a fetch.
    pub fn try_put(&self, url: &str, bytes: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.entry_path(url), bytes)
    }

    /// Remove the entry for `url`. A missing entry is not an error.
    pub fn invalidate(&self, url: &str) {
        let path = self.entry_path(url);
        match fs::remove_file(&path) {
            Ok(()) => tracing::debug!(url, "Invalidated cached spec"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(url, error = %e, "Failed to invalidate cached spec"),
        }
    }
}
