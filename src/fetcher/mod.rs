pub mod buffer;
pub mod filename;
pub mod http_fetcher;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::app::Result;

pub use buffer::ResponseBuffer;
pub use http_fetcher::HttpFetcher;

/// A fully buffered HTTP response.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
    /// Filename announced via `Content-Disposition`, if any.
    pub filename_hint: Option<String>,
}

/// Result of streaming a response to disk.
#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    pub status: u16,
    /// Where the body was written. Nothing is written for non-200 responses.
    pub path: PathBuf,
    pub bytes_written: u64,
    pub elapsed: Duration,
    /// `path` existed before the transfer and was left untouched.
    pub already_present: bool,
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// Average transfer rate in bytes per second.
    pub fn bytes_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.bytes_written as f64 / secs
        } else {
            self.bytes_written as f64
        }
    }
}

#[async_trait]
pub trait Fetcher {
    /// Fetch `url` into memory, sending `cookies` when given.
    async fn fetch(&self, url: &str, cookies: Option<&str>) -> Result<HttpResponse>;

    /// Stream `url` to `destination`, or to a sibling of it when the server
    /// names the file. An existing file is never overwritten; the outcome
    /// is then marked `already_present`.
    async fn download(
        &self,
        url: &str,
        destination: &Path,
        user_agent: Option<&str>,
    ) -> Result<DownloadOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_rate() {
        let outcome = DownloadOutcome {
            status: 200,
            path: PathBuf::from("/tmp/a"),
            bytes_written: 2048,
            elapsed: Duration::from_secs(2),
            already_present: false,
        };
        assert!(outcome.is_success());
        assert_eq!(outcome.bytes_per_sec(), 1024.0);
    }

    #[test]
    fn test_instant_download_rate() {
        let outcome = DownloadOutcome {
            status: 404,
            path: PathBuf::from("/tmp/a"),
            bytes_written: 0,
            elapsed: Duration::ZERO,
            already_present: false,
        };
        assert!(!outcome.is_success());
        assert_eq!(outcome.bytes_per_sec(), 0.0);
    }
}
