use std::io::Read;

use crate::domain::Build;
use crate::error::{Result, VaultError};
use crate::source::transport::Transport;

pub mod filter;

/// The remote list of builds. Always returns the complete set; diffing
/// against what is already mirrored happens locally.
pub trait BuildCatalog {
    fn list(&self) -> Result<Vec<Build>>;
}

impl<C: BuildCatalog + ?Sized> BuildCatalog for &C {
    fn list(&self) -> Result<Vec<Build>> {
        (**self).list()
    }
}

/// A JSON array of builds served from one location.
pub struct RemoteCatalog<T> {
    transport: T,
    location: String,
}

impl<T: Transport> RemoteCatalog<T> {
    pub fn new(transport: T, location: impl Into<String>) -> Self {
        Self {
            transport,
            location: location.into(),
        }
    }
}

impl<T: Transport> BuildCatalog for RemoteCatalog<T> {
    fn list(&self) -> Result<Vec<Build>> {
        let loc = &self.location;
        let mut r = self
            .transport
            .open(loc)
            .map_err(|e| VaultError::Catalog(format!("fetch {loc}: {e}")))?;
        let mut body = Vec::new();
        r.read_to_end(&mut body)
            .map_err(|e| VaultError::Catalog(format!("read {loc}: {e}")))?;
        serde_json::from_slice(&body).map_err(|e| VaultError::Catalog(format!("decode {loc}: {e}")))
    }
}
