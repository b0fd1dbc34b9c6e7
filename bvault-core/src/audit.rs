use std::collections::HashSet;
use std::io;

use walkdir::WalkDir;

use crate::error::{Result, VaultError};
use crate::layout::Layout;
use crate::metadata::ArchiveMetadata;

/// Differences between the missing ledger and what is actually on disk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuditReport {
    pub builds: usize,
    pub complete_builds: usize,
    /// (guid, file) absent on disk and absent from the ledger.
    pub unrecorded: Vec<(String, String)>,
    /// (guid, file) listed as missing but present on disk.
    pub stale: Vec<(String, String)>,
    /// Directories under `builds/` that belong to no recorded build.
    pub orphans: Vec<String>,
    pub artifact_bytes: u64,
}

impl AuditReport {
    pub fn is_consistent(&self) -> bool {
        self.unrecorded.is_empty() && self.stale.is_empty()
    }
}

pub fn audit(layout: &Layout, meta: &ArchiveMetadata) -> Result<AuditReport> {
    let mut report = AuditReport {
        builds: meta.builds.len(),
        ..Default::default()
    };

    for build in &meta.builds {
        let guid = &build.guid;
        let listed = meta.missing_for(guid);
        let mut complete = true;
        for name in &meta.files {
            let present = layout.has_artifact(guid, name);
            let recorded = listed.contains(name);
            if !present {
                complete = false;
                if !recorded {
                    report.unrecorded.push((guid.clone(), name.clone()));
                }
            } else if recorded {
                report.stale.push((guid.clone(), name.clone()));
            }
        }
        if complete {
            report.complete_builds += 1;
        }
    }

    let builds_dir = layout.builds_dir();
    if !builds_dir.is_dir() {
        return Ok(report);
    }
    let recorded: HashSet<&str> = meta.builds.iter().map(|b| b.guid.as_str()).collect();
    for entry in WalkDir::new(&builds_dir)
        .min_depth(1)
        .max_depth(2)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| VaultError::path("scan", &builds_dir, io::Error::from(e)))?;
        match entry.depth() {
            1 if entry.file_type().is_dir() => {
                let name = entry.file_name().to_string_lossy();
                if !recorded.contains(&*name) {
                    report.orphans.push(name.into_owned());
                }
            }
            2 if entry.file_type().is_file() => {
                let md = entry
                    .metadata()
                    .map_err(|e| VaultError::path("stat", entry.path(), io::Error::from(e)))?;
                report.artifact_bytes += md.len();
            }
            _ => {}
        }
    }
    Ok(report)
}
