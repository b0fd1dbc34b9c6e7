use std::collections::BTreeSet;

use time::OffsetDateTime;

use crate::domain::Build;

/// Optional narrowing of the catalog before dedup. Recorded builds are never
/// filtered.
#[derive(Clone, Debug, Default)]
pub struct BuildFilter {
    /// Accepted build types; `None` or empty accepts every type.
    pub types: Option<BTreeSet<String>>,
    /// Builds dated before this instant are dropped.
    pub since: Option<OffsetDateTime>,
}

impl BuildFilter {
    pub fn accepts(&self, build: &Build) -> bool {
        let type_ok = match &self.types {
            Some(types) if !types.is_empty() => types.contains(&build.build_type),
            _ => true,
        };
        let date_ok = self.since.is_none_or(|since| build.date >= since);
        type_ok && date_ok
    }

    pub fn apply(&self, builds: Vec<Build>) -> Vec<Build> {
        builds.into_iter().filter(|b| self.accepts(b)).collect()
    }
}
