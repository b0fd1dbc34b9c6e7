use std::fs::{self, File};
use std::io;
use std::path::PathBuf;

use crate::error::{Result, VaultError};
use crate::store::write_atomic;

/// Response caching for a transport. Chosen per transport instance.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CacheMode {
    #[default]
    None,
    /// Bodies are kept under `dir/<blake3(url) hex>`.
    Directory(PathBuf),
}

impl CacheMode {
    pub fn entry_path(&self, url: &str) -> Option<PathBuf> {
        match self {
            CacheMode::None => None,
            CacheMode::Directory(dir) => {
                let h = blake3::hash(url.as_bytes());
                Some(dir.join(hex::encode(h.as_bytes())))
            }
        }
    }

    pub fn lookup(&self, url: &str) -> Result<Option<File>> {
        let Some(path) = self.entry_path(url) else {
            return Ok(None);
        };
        match File::open(&path) {
            Ok(f) => Ok(Some(f)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(VaultError::path("open cache entry", path, e)),
        }
    }

    pub fn store(&self, url: &str, body: &[u8]) -> Result<()> {
        let (CacheMode::Directory(dir), Some(path)) = (self, self.entry_path(url)) else {
            return Ok(());
        };
        fs::create_dir_all(dir).map_err(|e| VaultError::path("create cache dir", dir, e))?;
        write_atomic(&path, &mut &body[..])
            .map_err(|e| VaultError::path("write cache entry", path, e))?;
        Ok(())
    }
}
