use std::fs;

use tracing::{debug, info, warn};

use crate::catalog::BuildCatalog;
use crate::catalog::filter::BuildFilter;
use crate::domain::{Build, BuildKey};
use crate::error::{Result, VaultError};
use crate::layout::{Layout, is_plain_name};
use crate::metadata::ArchiveMetadata;
use crate::source::{ArtifactSource, ExpectedFile};
use crate::store::{MetadataStore, write_atomic};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// New builds recorded this pass.
    pub discovered: usize,
    /// Catalog entries skipped because their key was already recorded.
    pub known: usize,
    pub fetched: usize,
    /// Files found on disk, not fetched.
    pub present: usize,
    pub failed: usize,
    /// Catalog entries whose GUID is not a plain path component; never recorded.
    pub rejected: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RetryReport {
    pub builds: usize,
    pub recovered: usize,
    pub still_missing: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub merge: MergeReport,
    pub retry: Option<RetryReport>,
    pub latest: Option<BuildKey>,
}

enum Outcome {
    Present,
    Fetched,
    Failed,
}

/// Mirrors a catalog into one archive root.
///
/// Metadata is persisted after every processed build and every retried GUID,
/// so an interrupted run resumes from the last completed unit.
pub struct SyncEngine<C, S> {
    store: MetadataStore,
    files: Vec<ExpectedFile>,
    catalog: C,
    source: S,
    filter: BuildFilter,
}

impl<C: BuildCatalog, S: ArtifactSource> SyncEngine<C, S> {
    pub fn new(layout: Layout, files: Vec<ExpectedFile>, catalog: C, source: S) -> Self {
        Self {
            store: MetadataStore::new(layout),
            files,
            catalog,
            source,
            filter: BuildFilter::default(),
        }
    }

    pub fn with_filter(mut self, filter: BuildFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn layout(&self) -> &Layout {
        self.store.layout()
    }

    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    /// Create the builds root and load the current state.
    pub fn prepare(&self) -> Result<ArchiveMetadata> {
        let dir = self.layout().builds_dir();
        fs::create_dir_all(&dir)
            .map_err(|e| VaultError::path("create builds directory", dir, e))?;
        self.store.load()
    }

    pub fn run(&self, retry: bool) -> Result<SyncReport> {
        let mut meta = self.prepare()?;
        let merge = self.merge(&mut meta)?;
        let retry = if retry {
            Some(self.retry(&mut meta)?)
        } else {
            None
        };
        Ok(SyncReport {
            merge,
            retry,
            latest: meta.latest().map(Build::key),
        })
    }

    /// Record and fetch every catalog build whose key is not yet known.
    pub fn merge(&self, meta: &mut ArchiveMetadata) -> Result<MergeReport> {
        meta.set_files(self.files.iter().map(|f| f.name.as_str()));
        let mut known = meta.known_keys();
        let remote = self.filter.apply(self.catalog.list()?);

        let mut report = MergeReport::default();
        for build in remote {
            if !is_plain_name(&build.guid) {
                warn!(guid = ?build.guid, "skipping build with unusable guid");
                report.rejected += 1;
                continue;
            }
            if !known.insert(build.key()) {
                report.known += 1;
                continue;
            }
            report.discovered += 1;
            self.ensure_build_dir(&build.guid)?;

            let mut missing = Vec::new();
            for name in &meta.files {
                let Some(file) = self.expected(name) else {
                    continue;
                };
                match self.fetch_one(&build.guid, file) {
                    Outcome::Present => report.present += 1,
                    Outcome::Fetched => report.fetched += 1,
                    Outcome::Failed => {
                        report.failed += 1;
                        missing.push(name.clone());
                    }
                }
            }

            let guid = build.guid.clone();
            meta.insert_build(build);
            meta.set_missing(&guid, missing);
            self.store.save(meta)?;
        }

        meta.sort_builds();
        self.store.save(meta)?;
        self.store.write_latest(meta.latest())?;
        info!(
            discovered = report.discovered,
            known = report.known,
            fetched = report.fetched,
            present = report.present,
            failed = report.failed,
            rejected = report.rejected,
            "merge complete"
        );
        Ok(report)
    }

    /// Re-attempt every file in the missing ledger, GUIDs in lexicographic order.
    pub fn retry(&self, meta: &mut ArchiveMetadata) -> Result<RetryReport> {
        let ledger: Vec<(String, Vec<String>)> = meta
            .missing
            .iter()
            .map(|(g, f)| (g.clone(), f.clone()))
            .collect();

        let mut report = RetryReport::default();
        for (guid, files) in ledger {
            if !is_plain_name(&guid) {
                warn!(guid = ?guid, "ledger entry has unusable guid; left as is");
                report.still_missing += files.len();
                continue;
            }
            self.ensure_build_dir(&guid)?;
            let mut still = Vec::new();
            for name in files {
                let recovered = match self.expected(&name) {
                    Some(file) => !matches!(self.fetch_one(&guid, file), Outcome::Failed),
                    None if self.layout().has_artifact(&guid, &name) => true,
                    None => {
                        warn!(guid = %guid, file = %name, "file is no longer configured");
                        false
                    }
                };
                if recovered {
                    report.recovered += 1;
                } else {
                    still.push(name);
                }
            }
            report.builds += 1;
            report.still_missing += still.len();
            meta.set_missing(&guid, still);
            self.store.save(meta)?;
        }

        info!(
            builds = report.builds,
            recovered = report.recovered,
            still_missing = report.still_missing,
            "retry complete"
        );
        Ok(report)
    }

    fn expected(&self, name: &str) -> Option<&ExpectedFile> {
        self.files.iter().find(|f| f.name == name)
    }

    fn ensure_build_dir(&self, guid: &str) -> Result<()> {
        let dir = self.layout().build_dir(guid);
        fs::create_dir_all(&dir).map_err(|e| VaultError::path("create build directory", dir, e))
    }

    fn fetch_one(&self, guid: &str, file: &ExpectedFile) -> Outcome {
        if self.layout().has_artifact(guid, &file.name) {
            debug!(guid, file = %file.name, "already on disk");
            return Outcome::Present;
        }
        let path = self.layout().artifact_path(guid, &file.name);
        let res = self
            .source
            .fetch(&file.name, guid, &file.locations)
            .and_then(|mut r| {
                write_atomic(&path, &mut r).map_err(|e| VaultError::path("write artifact", &path, e))
            });
        match res {
            Ok(bytes) => {
                info!(guid, file = %file.name, bytes, "found file");
                Outcome::Fetched
            }
            Err(e) => {
                warn!(guid, file = %file.name, error = %e, "file unavailable");
                Outcome::Failed
            }
        }
    }
}
