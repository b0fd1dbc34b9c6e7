use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use super::cache::CacheMode;
use crate::error::{Result, VaultError};

/// Opens one resolved location as a byte stream.
pub trait Transport {
    fn open(&self, url: &str) -> Result<Box<dyn Read + Send>>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn open(&self, url: &str) -> Result<Box<dyn Read + Send>> {
        (**self).open(url)
    }
}

pub struct HttpTransport {
    client: reqwest::blocking::Client,
    cache: CacheMode,
}

impl HttpTransport {
    pub fn new(timeout: Duration, cache: CacheMode) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("bvault/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| VaultError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, cache })
    }
}

impl Transport for HttpTransport {
    fn open(&self, url: &str) -> Result<Box<dyn Read + Send>> {
        if let Some(hit) = self.cache.lookup(url)? {
            debug!(url, "cache hit");
            return Ok(Box::new(hit));
        }

        let res = self
            .client
            .get(url)
            .send()
            .map_err(|source| VaultError::Request {
                url: url.to_string(),
                source,
            })?;
        if !res.status().is_success() {
            return Err(VaultError::Status {
                url: url.to_string(),
                status: res.status().as_u16(),
            });
        }

        match self.cache {
            CacheMode::None => Ok(Box::new(res)),
            CacheMode::Directory(_) => {
                let body = res.bytes().map_err(|source| VaultError::Request {
                    url: url.to_string(),
                    source,
                })?;
                self.cache.store(url, &body)?;
                Ok(Box::new(Cursor::new(body)))
            }
        }
    }
}

/// Local paths, with or without a `file://` prefix.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsTransport;

impl Transport for FsTransport {
    fn open(&self, url: &str) -> Result<Box<dyn Read + Send>> {
        let path = Path::new(url.strip_prefix("file://").unwrap_or(url));
        let f = File::open(path).map_err(|e| VaultError::path("open", path, e))?;
        Ok(Box::new(f))
    }
}

/// Routes `http(s)://` to HTTP and everything else to the filesystem.
pub struct SchemeTransport {
    pub http: HttpTransport,
    pub fs: FsTransport,
}

impl SchemeTransport {
    pub fn new(http: HttpTransport) -> Self {
        Self {
            http,
            fs: FsTransport,
        }
    }
}

pub fn is_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

impl Transport for SchemeTransport {
    fn open(&self, url: &str) -> Result<Box<dyn Read + Send>> {
        if is_http(url) {
            self.http.open(url)
        } else {
            self.fs.open(url)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn fs_transport_reads_plain_and_file_urls() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("a.txt");
        fs::write(&p, b"hello").unwrap();

        let mut s = String::new();
        FsTransport
            .open(p.to_str().unwrap())
            .unwrap()
            .read_to_string(&mut s)
            .unwrap();
        assert_eq!(s, "hello");

        let url = format!("file://{}", p.display());
        let mut s = String::new();
        FsTransport.open(&url).unwrap().read_to_string(&mut s).unwrap();
        assert_eq!(s, "hello");
    }

    #[test]
    fn fs_transport_missing_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("nope");
        let err = match FsTransport.open(p.to_str().unwrap()) {
            Err(e) => e,
            Ok(_) => panic!("expected failure"),
        };
        assert!(err.to_string().contains("nope"), "{err}");
    }

    /// Serves `/ok` with a fixed body and everything else as 404, counting hits.
    fn serve(hits: Arc<AtomicUsize>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                hits.fetch_add(1, Ordering::SeqCst);
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                        break;
                    }
                }
                let resp: &[u8] = if request_line.starts_with("GET /ok ") {
                    b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello"
                } else {
                    b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                };
                stream.write_all(resp).unwrap();
            }
        });
        format!("http://{addr}")
    }

    #[test]
    fn http_status_and_directory_cache() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = serve(hits.clone());
        let cache_dir = tempfile::tempdir().unwrap();
        let cache = CacheMode::Directory(cache_dir.path().to_path_buf());
        let http = HttpTransport::new(Duration::from_secs(10), cache.clone()).unwrap();

        let url = format!("{base}/ok");
        let mut s = String::new();
        http.open(&url).unwrap().read_to_string(&mut s).unwrap();
        assert_eq!(s, "hello");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(cache.lookup(&url).unwrap().is_some());

        let mut s = String::new();
        http.open(&url).unwrap().read_to_string(&mut s).unwrap();
        assert_eq!(s, "hello");
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let missing = format!("{base}/missing");
        let err = match http.open(&missing) {
            Err(e) => e,
            Ok(_) => panic!("expected failure"),
        };
        assert!(matches!(err, VaultError::Status { status: 404, .. }), "{err}");
        assert!(cache.lookup(&missing).unwrap().is_none());
    }

    #[test]
    fn scheme_detection() {
        assert!(is_http("https://example.invalid/x"));
        assert!(is_http("http://example.invalid/x"));
        assert!(!is_http("file:///tmp/x"));
        assert!(!is_http("/tmp/x"));
    }
}
