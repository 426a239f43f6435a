use std::io;
use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{COOKIE, USER_AGENT};
use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder, StatusCode};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::app::Result;
use crate::fetcher::buffer::ResponseBuffer;
use crate::fetcher::filename::{encode_whitespace, header_filename, target_path};
use crate::fetcher::{DownloadOutcome, Fetcher, HttpResponse};

/// Generous upper bound for a single transfer; trailers can be large.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(1500);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(55);
pub const MAX_REDIRECTS: usize = 5;

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let client = Self::builder()
            .build()
            .expect("Failed to build HTTP client");

        Self { client }
    }

    fn builder() -> ClientBuilder {
        Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("reelwatch/", env!("CARGO_PKG_VERSION")))
    }

    /// A client with its own cookie jar, living for one feed fetch.
    fn session_client() -> Result<Client> {
        Ok(Self::builder().cookie_store(true).build()?)
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, cookies: Option<&str>) -> Result<HttpResponse> {
        let client = Self::session_client()?;
        let mut request = client.get(encode_whitespace(url));

        if let Some(cookies) = cookies.filter(|c| !c.is_empty()) {
            request = request.header(COOKIE, cookies);
        }

        let mut response = request.send().await?;
        let status = response.status().as_u16();
        let filename_hint = header_filename(response.headers());
        tracing::trace!("GET {} -> {}", url, status);

        let mut body = ResponseBuffer::with_size_hint(response.content_length())?;
        while let Some(chunk) = response.chunk().await? {
            body.extend(&chunk)?;
        }

        Ok(HttpResponse {
            status,
            body: body.into_inner(),
            filename_hint,
        })
    }

    async fn download(
        &self,
        url: &str,
        destination: &Path,
        user_agent: Option<&str>,
    ) -> Result<DownloadOutcome> {
        let started = Instant::now();
        let mut request = self.client.get(encode_whitespace(url));

        if let Some(agent) = user_agent {
            request = request.header(USER_AGENT, agent);
        }

        let mut response = request.send().await?;
        let status = response.status();

        let path = match (header_filename(response.headers()), destination.parent()) {
            (Some(name), Some(folder)) => {
                tracing::debug!("Server named the file: {}", name);
                target_path(folder, url, Some(&name))
            }
            _ => destination.to_path_buf(),
        };

        if status != StatusCode::OK {
            return Ok(DownloadOutcome {
                status: status.as_u16(),
                path,
                bytes_written: 0,
                elapsed: started.elapsed(),
                already_present: false,
            });
        }

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                tracing::debug!("{} exists, leaving it untouched", path.display());
                return Ok(DownloadOutcome {
                    status: status.as_u16(),
                    path,
                    bytes_written: 0,
                    elapsed: started.elapsed(),
                    already_present: true,
                });
            }
            Err(e) => return Err(e.into()),
        };
        let mut bytes_written = 0u64;

        let copied: Result<()> = async {
            while let Some(chunk) = response.chunk().await? {
                file.write_all(&chunk).await?;
                bytes_written += chunk.len() as u64;
            }
            file.flush().await?;
            Ok(())
        }
        .await;

        if let Err(e) = copied {
            drop(file);
            if let Err(rm) = fs::remove_file(&path).await {
                tracing::warn!("Could not remove partial file {}: {}", path.display(), rm);
            }
            return Err(e);
        }

        Ok(DownloadOutcome {
            status: status.as_u16(),
            path,
            bytes_written,
            elapsed: started.elapsed(),
            already_present: false,
        })
    }
}
