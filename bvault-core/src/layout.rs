use std::path::PathBuf;

pub const BUILDS_DIR: &str = "builds";
pub const METADATA_FILE: &str = "metadata.json";
pub const LATEST_FILE: &str = "latest.json";

/// A single path component: non-empty, not `.` or `..`, no separators.
/// Build GUIDs and artifact names must pass this before they touch the disk.
pub fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// On-disk layout of one archive root:
/// `builds/<guid>/<file>`, `metadata.json`, `latest.json`.
#[derive(Clone, Debug)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn builds_dir(&self) -> PathBuf {
        self.root.join(BUILDS_DIR)
    }

    pub fn build_dir(&self, guid: &str) -> PathBuf {
        self.builds_dir().join(guid)
    }

    pub fn artifact_path(&self, guid: &str, name: &str) -> PathBuf {
        self.build_dir(guid).join(name)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.root.join(METADATA_FILE)
    }

    pub fn latest_path(&self) -> PathBuf {
        self.root.join(LATEST_FILE)
    }

    /// Existence is the only completeness signal for an artifact.
    pub fn has_artifact(&self, guid: &str, name: &str) -> bool {
        self.artifact_path(guid, name).symlink_metadata().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names() {
        for ok in ["g1", "API-Dump.json", "a..b", ".hidden"] {
            assert!(is_plain_name(ok), "{ok:?}");
        }
        for bad in ["", ".", "..", "../..", "a/b", "a\\b", "/abs"] {
            assert!(!is_plain_name(bad), "{bad:?}");
        }
    }
}
