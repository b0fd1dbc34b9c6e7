use std::io::Read;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, VaultError};

pub mod cache;
pub mod transport;

use transport::Transport;

/// URL or path template for one fallback source. `{guid}` and `{kind}` are
/// substituted at fetch time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Location(String);

impl Location {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn resolve(&self, kind: &str, guid: &str) -> String {
        self.0.replace("{guid}", guid).replace("{kind}", kind)
    }
}

/// An artifact every build is expected to carry, with its ordered fallbacks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedFile {
    pub name: String,
    pub locations: Vec<Location>,
}

impl ExpectedFile {
    pub fn new<I, L>(name: impl Into<String>, locations: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        Self {
            name: name.into(),
            locations: locations.into_iter().map(Location::new).collect(),
        }
    }
}

pub trait ArtifactSource {
    /// Open the first location that succeeds. When all fail, the error
    /// carries the last location's failure.
    fn fetch(&self, kind: &str, guid: &str, locations: &[Location])
    -> Result<Box<dyn Read + Send + '_>>;
}

impl<S: ArtifactSource + ?Sized> ArtifactSource for &S {
    fn fetch(
        &self,
        kind: &str,
        guid: &str,
        locations: &[Location],
    ) -> Result<Box<dyn Read + Send + '_>> {
        (**self).fetch(kind, guid, locations)
    }
}

/// Tries locations strictly in order over a single transport.
pub struct FallbackSource<T> {
    transport: T,
}

impl<T: Transport> FallbackSource<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }
}

impl<T: Transport> ArtifactSource for FallbackSource<T> {
    fn fetch(
        &self,
        kind: &str,
        guid: &str,
        locations: &[Location],
    ) -> Result<Box<dyn Read + Send + '_>> {
        let mut last = None;
        for loc in locations {
            let url = loc.resolve(kind, guid);
            match self.transport.open(&url) {
                Ok(r) => return Ok(r),
                Err(e) => {
                    debug!(%url, error = %e, "location failed");
                    last = Some(e);
                }
            }
        }
        match last {
            None => Err(VaultError::NoLocations {
                kind: kind.to_string(),
            }),
            Some(last) => Err(VaultError::Exhausted {
                kind: kind.to_string(),
                guid: guid.to_string(),
                attempts: locations.len(),
                last: Box::new(last),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::io::Cursor;

    /// Serves fixed bodies; any other URL fails with a 404 naming it.
    #[derive(Default)]
    struct MapTransport {
        bodies: HashMap<String, Vec<u8>>,
        opened: RefCell<Vec<String>>,
    }

    impl MapTransport {
        fn with(mut self, url: &str, body: &[u8]) -> Self {
            self.bodies.insert(url.to_string(), body.to_vec());
            self
        }
    }

    impl Transport for MapTransport {
        fn open(&self, url: &str) -> Result<Box<dyn Read + Send>> {
            self.opened.borrow_mut().push(url.to_string());
            match self.bodies.get(url) {
                Some(b) => Ok(Box::new(Cursor::new(b.clone()))),
                None => Err(VaultError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }

    fn read_all(mut r: Box<dyn Read + Send + '_>) -> Vec<u8> {
        let mut v = Vec::new();
        r.read_to_end(&mut v).unwrap();
        v
    }

    fn locs() -> Vec<Location> {
        vec![Location::new("a://{guid}/{kind}"), Location::new("b://{guid}/{kind}")]
    }

    #[test]
    fn resolve_substitutes_placeholders() {
        let l = Location::new("https://h/{guid}-{kind}?g={guid}");
        assert_eq!(l.resolve("API.json", "g1"), "https://h/g1-API.json?g=g1");
    }

    #[test]
    fn falls_back_to_second_location() {
        let t = MapTransport::default().with("b://g1/F", b"from-b");
        let src = FallbackSource::new(&t);
        let body = read_all(src.fetch("F", "g1", &locs()).unwrap());
        assert_eq!(body, b"from-b");
        assert_eq!(*t.opened.borrow(), ["a://g1/F", "b://g1/F"]);
    }

    #[test]
    fn first_success_wins() {
        let t = MapTransport::default()
            .with("a://g1/F", b"from-a")
            .with("b://g1/F", b"from-b");
        let src = FallbackSource::new(&t);
        assert_eq!(read_all(src.fetch("F", "g1", &locs()).unwrap()), b"from-a");
        assert_eq!(t.opened.borrow().len(), 1);
    }

    #[test]
    fn exhausted_reports_last_location() {
        let t = MapTransport::default();
        let src = FallbackSource::new(&t);
        let err = match src.fetch("F", "g1", &locs()) {
            Err(e) => e,
            Ok(_) => panic!("expected failure"),
        };
        match err {
            VaultError::Exhausted {
                attempts, last, ..
            } => {
                assert_eq!(attempts, 2);
                assert!(last.to_string().contains("b://g1/F"), "{last}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_locations_is_an_error() {
        let src = FallbackSource::new(MapTransport::default());
        assert!(matches!(
            src.fetch("F", "g1", &[]),
            Err(VaultError::NoLocations { .. })
        ));
    }
}
