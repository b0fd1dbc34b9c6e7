use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tempfile::NamedTempFile;

use crate::domain::Build;
use crate::error::{Result, VaultError};
use crate::layout::Layout;
use crate::metadata::ArchiveMetadata;

/// Loads and saves the archive's `metadata.json` and `latest.json`.
#[derive(Clone, Debug)]
pub struct MetadataStore {
    layout: Layout,
}

impl MetadataStore {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// A missing state file yields empty metadata; anything unreadable is an error.
    pub fn load(&self) -> Result<ArchiveMetadata> {
        let path = self.layout.metadata_path();
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ArchiveMetadata::default()),
            Err(e) => return Err(VaultError::path("read metadata", path, e)),
        };
        serde_json::from_slice(&bytes).map_err(|source| VaultError::Decode { path, source })
    }

    pub fn save(&self, meta: &ArchiveMetadata) -> Result<()> {
        let path = self.layout.metadata_path();
        let bytes = encode_pretty(meta)?;
        write_atomic(&path, &mut bytes.as_slice())
            .map_err(|e| VaultError::path("write metadata", path, e))?;
        Ok(())
    }

    /// Snapshot of the newest build; nothing is written for an empty archive.
    pub fn write_latest(&self, build: Option<&Build>) -> Result<bool> {
        let Some(build) = build else {
            return Ok(false);
        };
        let path = self.layout.latest_path();
        let bytes = encode_pretty(build)?;
        write_atomic(&path, &mut bytes.as_slice())
            .map_err(|e| VaultError::path("write latest", path, e))?;
        Ok(true)
    }
}

/// Tab-indented JSON with a trailing newline.
pub fn encode_pretty<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(4096);
    let mut ser = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"\t"));
    value.serialize(&mut ser)?;
    out.push(b'\n');
    Ok(out)
}

/// Stream `src` into a temp file next to `path`, sync it, then rename it into
/// place. Readers never observe a partially written file.
pub fn write_atomic(path: &Path, src: &mut dyn Read) -> io::Result<u64> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    let n = io::copy(src, tmp.as_file_mut())?;
    tmp.as_file_mut().flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(n)
}
