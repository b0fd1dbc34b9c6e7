use std::path::PathBuf;

use bvault_core::audit::audit;
use bvault_core::config::Config;
use bvault_core::error::Result;
use bvault_core::source::cache::CacheMode;
use bvault_core::source::transport::{HttpTransport, SchemeTransport};
use bvault_core::{FallbackSource, Layout, MetadataStore, RemoteCatalog, SyncEngine, SyncReport};

pub fn handle_sync(config: PathBuf, retry: bool) -> Result<()> {
    let report = sync_with(&Config::load(&config)?, retry)?;
    eprintln!(
        "sync: {} new, {} known, {} fetched, {} present, {} failed, {} rejected",
        report.merge.discovered,
        report.merge.known,
        report.merge.fetched,
        report.merge.present,
        report.merge.failed,
        report.merge.rejected
    );
    if let Some(r) = report.retry {
        eprintln!(
            "retry: {} builds, {} recovered, {} still missing",
            r.builds, r.recovered, r.still_missing
        );
    }
    if let Some(latest) = report.latest {
        eprintln!("latest: {latest}");
    }
    Ok(())
}

pub(crate) fn sync_with(cfg: &Config, retry: bool) -> Result<SyncReport> {
    // The catalog must always be fresh; only artifact bodies may be cached.
    let catalog_transport = SchemeTransport::new(HttpTransport::new(cfg.timeout(), CacheMode::None)?);
    let artifact_transport = SchemeTransport::new(HttpTransport::new(cfg.timeout(), cfg.cache_mode())?);

    let engine = SyncEngine::new(
        Layout::new(cfg.archive_root()),
        cfg.files.clone(),
        RemoteCatalog::new(catalog_transport, cfg.catalog.clone()),
        FallbackSource::new(artifact_transport),
    )
    .with_filter(cfg.filter());
    engine.run(retry)
}

pub fn handle_status(config: PathBuf, reconcile: bool) -> Result<()> {
    let cfg = Config::load(&config)?;
    let layout = Layout::new(cfg.archive_root());
    let store = MetadataStore::new(layout.clone());
    let mut meta = store.load()?;
    meta.set_files(cfg.files.iter().map(|f| f.name.as_str()));

    let report = audit(&layout, &meta)?;
    println!(
        "{} builds, {} complete, {} bytes",
        report.builds, report.complete_builds, report.artifact_bytes
    );
    for (guid, files) in &meta.missing {
        println!("missing  {guid}  {}", files.join(", "));
    }
    for (guid, file) in &report.unrecorded {
        println!("unrecorded  {guid}/{file}");
    }
    for (guid, file) in &report.stale {
        println!("stale  {guid}/{file}");
    }
    for dir in &report.orphans {
        println!("orphan  {dir}");
    }

    if reconcile {
        let changed = meta.reconcile(&layout);
        store.save(&meta)?;
        eprintln!("reconcile: {changed} ledger entries updated");
    } else if !report.is_consistent() {
        eprintln!("status: ledger differs from disk; rerun with --reconcile to repair");
    }
    Ok(())
}
