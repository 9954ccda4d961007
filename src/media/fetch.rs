use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Downloads audio files.
pub trait AudioFetcher {
    /// The file body, or `None` when the server refused to serve it.
    fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>>;
}

pub struct HttpAudioFetcher {
    client: Client,
}

impl HttpAudioFetcher {
    pub fn new(timeout_sec: u64) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

impl AudioFetcher for HttpAudioFetcher {
    fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>> {
        let start = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Failed to download {}", url))?;

        if !response.status().is_success() {
            warn!("Server returned status {} for {}", response.status(), url);
            return Ok(None);
        }
        let bytes = response
            .bytes()
            .with_context(|| format!("Failed to read body of {}", url))?;
        debug!("File downloading: {} bytes in {:?}", bytes.len(), start.elapsed());
        Ok(Some(bytes.to_vec()))
    }
}
