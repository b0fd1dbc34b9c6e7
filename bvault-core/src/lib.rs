#![forbid(unsafe_code)]

pub mod error;

pub mod audit;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod layout;
pub mod metadata;
pub mod source;
pub mod store;
pub mod sync;

// Re-exports: stable API surface
pub use catalog::filter::BuildFilter;
pub use catalog::{BuildCatalog, RemoteCatalog};
pub use domain::{Build, BuildKey, Version};
pub use layout::Layout;
pub use metadata::ArchiveMetadata;
pub use source::{ArtifactSource, ExpectedFile, FallbackSource, Location};
pub use store::MetadataStore;
pub use sync::{SyncEngine, SyncReport};
