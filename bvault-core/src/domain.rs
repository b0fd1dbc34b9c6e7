// bvault_core/src/domain.rs
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::OffsetDateTime;

use crate::error::VaultError;

/// Four-part build version, rendered as `major.minor.patch.build`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub build: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32, build: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            build,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.patch, self.build
        )
    }
}

impl FromStr for Version {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = [0u32; 4];
        let mut it = s.trim().split('.');
        for slot in parts.iter_mut() {
            *slot = it
                .next()
                .and_then(|p| p.parse().ok())
                .ok_or_else(|| VaultError::Version(s.to_string()))?;
        }
        if it.next().is_some() {
            return Err(VaultError::Version(s.to_string()));
        }
        let [major, minor, patch, build] = parts;
        Ok(Self::new(major, minor, patch, build))
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One remote build as advertised by the catalog and as recorded in metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    #[serde(alias = "GUID")]
    pub guid: String,
    #[serde(alias = "Date", with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    #[serde(alias = "Version")]
    pub version: Version,
    #[serde(rename = "type", alias = "Type", default)]
    pub build_type: String,
}

impl Build {
    pub fn key(&self) -> BuildKey {
        BuildKey {
            guid: self.guid.clone(),
            date: self.date.unix_timestamp(),
            version: self.version,
        }
    }
}

/// Identity used for dedup: guid, date to the second, version. The build type
/// is not part of it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BuildKey {
    pub guid: String,
    pub date: i64,
    pub version: Version,
}

impl fmt::Display for BuildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} ({})", self.guid, self.date, self.version)
    }
}
