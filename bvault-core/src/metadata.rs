use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{Build, BuildKey};
use crate::layout::Layout;

/// Persisted synchronization state of one archive root.
///
/// `files` stays sorted, `builds` stays ordered by date, and `missing` only
/// holds GUIDs with at least one outstanding file.
///
/// Decoding is strict: `builds` must be present and unknown keys are rejected,
/// so a foreign document never loads as an empty archive. Capitalized keys
/// written by older tooling are accepted, as is `null` for an empty list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchiveMetadata {
    #[serde(default, alias = "Files", deserialize_with = "null_as_empty")]
    pub files: Vec<String>,
    #[serde(alias = "Builds", deserialize_with = "null_as_empty")]
    pub builds: Vec<Build>,
    #[serde(default, alias = "Missing", deserialize_with = "null_as_empty")]
    pub missing: BTreeMap<String, Vec<String>>,
}

fn null_as_empty<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

impl ArchiveMetadata {
    /// Replace the expected file list; derived from configuration, never accumulated.
    pub fn set_files<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut files: Vec<String> = names.into_iter().map(Into::into).collect();
        files.sort();
        files.dedup();
        self.files = files;
    }

    pub fn known_keys(&self) -> HashSet<BuildKey> {
        self.builds.iter().map(Build::key).collect()
    }

    /// Insert after every build with an equal or earlier date.
    pub fn insert_build(&mut self, build: Build) {
        let at = self.builds.partition_point(|b| b.date <= build.date);
        self.builds.insert(at, build);
    }

    pub fn sort_builds(&mut self) {
        self.builds.sort_by(|a, b| a.date.cmp(&b.date));
    }

    pub fn latest(&self) -> Option<&Build> {
        self.builds.last()
    }

    pub fn missing_for(&self, guid: &str) -> &[String] {
        self.missing.get(guid).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Set a GUID's outstanding files; an empty list removes the entry.
    pub fn set_missing(&mut self, guid: &str, files: Vec<String>) {
        if files.is_empty() {
            self.missing.remove(guid);
        } else {
            self.missing.insert(guid.to_string(), files);
        }
    }

    /// Expected files of `guid` that are not on disk.
    pub fn absent_files(&self, layout: &Layout, guid: &str) -> Vec<String> {
        self.files
            .iter()
            .filter(|name| !layout.has_artifact(guid, name))
            .cloned()
            .collect()
    }

    /// Rebuild `missing` from disk so each recorded GUID lists exactly its
    /// expected-but-absent files. Returns the number of GUID entries changed.
    pub fn reconcile(&mut self, layout: &Layout) -> usize {
        let mut next = BTreeMap::new();
        for build in &self.builds {
            let absent = self.absent_files(layout, &build.guid);
            if !absent.is_empty() {
                next.insert(build.guid.clone(), absent);
            }
        }
        let changed = self
            .missing
            .keys()
            .chain(next.keys())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .filter(|g| self.missing.get(*g) != next.get(*g))
            .count();
        self.missing = next;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Version;
    use std::fs;
    use time::OffsetDateTime;
    use time::macros::datetime;

    fn build(guid: &str, date: OffsetDateTime) -> Build {
        Build {
            guid: guid.to_string(),
            date,
            version: Version::new(0, 1, 0, 1),
            build_type: "Studio".to_string(),
        }
    }

    #[test]
    fn set_files_sorts_and_dedups() {
        let mut m = ArchiveMetadata::default();
        m.files = vec!["stale".into()];
        m.set_files(["b.xml", "a.json", "b.xml", "C.png"]);
        assert_eq!(m.files, vec!["C.png", "a.json", "b.xml"]);
    }

    #[test]
    fn insert_build_keeps_date_order() {
        let mut m = ArchiveMetadata::default();
        m.insert_build(build("late", datetime!(2021-01-03 0:00 UTC)));
        m.insert_build(build("early", datetime!(2021-01-01 0:00 UTC)));
        m.insert_build(build("mid", datetime!(2021-01-02 0:00 UTC)));
        m.insert_build(build("mid2", datetime!(2021-01-02 0:00 UTC)));

        let guids: Vec<_> = m.builds.iter().map(|b| b.guid.as_str()).collect();
        assert_eq!(guids, ["early", "mid", "mid2", "late"]);
        assert_eq!(m.latest().unwrap().guid, "late");
    }

    #[test]
    fn empty_missing_removes_entry() {
        let mut m = ArchiveMetadata::default();
        m.set_missing("g1", vec!["a".into()]);
        assert_eq!(m.missing_for("g1"), ["a"]);
        m.set_missing("g1", Vec::new());
        assert!(m.missing.is_empty());
        assert!(m.missing_for("g1").is_empty());
    }

    #[test]
    fn decodes_partial_document() {
        let m: ArchiveMetadata = serde_json::from_str(r#"{"files":["a"],"builds":null}"#).unwrap();
        assert_eq!(m.files, ["a"]);
        assert!(m.builds.is_empty());
        assert!(m.missing.is_empty());
    }

    #[test]
    fn rejects_documents_without_builds_or_with_foreign_keys() {
        for doc in [r#"{}"#, r#"{"files":["a"]}"#, r#"{"builds":[],"extra":1}"#] {
            assert!(serde_json::from_str::<ArchiveMetadata>(doc).is_err(), "{doc}");
        }
    }

    #[test]
    fn reconcile_matches_disk() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let mut m = ArchiveMetadata::default();
        m.set_files(["a", "b"]);
        m.insert_build(build("g1", datetime!(2021-01-01 0:00 UTC)));
        m.insert_build(build("g2", datetime!(2021-01-02 0:00 UTC)));

        fs::create_dir_all(layout.build_dir("g1")).unwrap();
        fs::write(layout.artifact_path("g1", "a"), b"x").unwrap();
        fs::write(layout.artifact_path("g1", "b"), b"x").unwrap();
        fs::create_dir_all(layout.build_dir("g2")).unwrap();
        fs::write(layout.artifact_path("g2", "a"), b"x").unwrap();

        // g1 is stale in the ledger, g2 is unrecorded.
        m.set_missing("g1", vec!["b".into()]);

        assert_eq!(m.reconcile(&layout), 2);
        assert_eq!(m.missing.len(), 1);
        assert_eq!(m.missing_for("g2"), ["b"]);
        assert_eq!(m.reconcile(&layout), 0);
    }
}
