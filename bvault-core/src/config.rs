use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::catalog::filter::BuildFilter;
use crate::error::{Result, VaultError};
use crate::layout::is_plain_name;
use crate::source::ExpectedFile;
use crate::source::cache::CacheMode;

fn default_timeout_secs() -> u64 {
    60
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub dir: PathBuf,
}

/// Run configuration, read from a JSON file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub root: PathBuf,
    /// Optional subdirectory of `root` holding this archive.
    #[serde(default)]
    pub group: Option<String>,
    /// Location of the build catalog (URL or path).
    pub catalog: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_date: Option<OffsetDateTime>,
    #[serde(default)]
    pub build_types: Option<BTreeSet<String>>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub cache: Option<CacheConfig>,
    pub files: Vec<ExpectedFile>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| VaultError::path("read config", path, e))?;
        Self::from_slice(&bytes).map_err(|e| match e {
            VaultError::Json(source) => VaultError::Decode {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let cfg: Config = serde_json::from_slice(bytes)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.catalog.trim().is_empty() {
            return Err(VaultError::Config("catalog location is empty".into()));
        }
        if self.files.is_empty() {
            return Err(VaultError::Config("no expected files configured".into()));
        }
        let mut seen = HashSet::new();
        for f in &self.files {
            if !is_plain_name(&f.name) {
                return Err(VaultError::Config(format!(
                    "file name {:?} must be a plain file name",
                    f.name
                )));
            }
            if !seen.insert(f.name.as_str()) {
                return Err(VaultError::Config(format!("duplicate file {:?}", f.name)));
            }
            if f.locations.is_empty() {
                return Err(VaultError::Config(format!("file {:?} has no locations", f.name)));
            }
        }
        Ok(())
    }

    pub fn archive_root(&self) -> PathBuf {
        match &self.group {
            Some(g) if !g.is_empty() => self.root.join(g),
            _ => self.root.clone(),
        }
    }

    pub fn filter(&self) -> BuildFilter {
        BuildFilter {
            types: self.build_types.clone(),
            since: self.start_date,
        }
    }

    pub fn cache_mode(&self) -> CacheMode {
        match &self.cache {
            Some(c) => CacheMode::Directory(c.dir.clone()),
            None => CacheMode::None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
