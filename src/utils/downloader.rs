use anyhow::{format_err, Context, Result};
use reqwest::Client;
use std::{path::Path, time::Duration};
use tokio::io::AsyncWriteExt;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared HTTP fetcher with a bounded per-request timeout. A timed-out fetch
/// surfaces as an ordinary fetch failure to the caller.
pub struct Downloader {
    client: Client,
    max_retry: usize,
}

impl Downloader {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .context("Failed to initialize HTTP client")?;
        Ok(Downloader {
            client,
            max_retry: 3,
        })
    }

    /// Fetch a small text document into memory
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let mut last_err = None;
        for _ in 0..self.max_retry {
            match self.try_fetch_text(url).await {
                Ok(text) => return Ok(text),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| format_err!("Failed to fetch {}", url)))
    }

    /// Download a remote file to a local path, creating parent directories
    pub async fn fetch_to(&self, url: &str, dest: &Path) -> Result<()> {
        let mut last_err = None;
        for _ in 0..self.max_retry {
            match self.try_fetch_to(url, dest).await {
                Ok(()) => return Ok(()),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| format_err!("Failed to fetch {}", url)))
    }

    async fn try_fetch_text(&self, url: &str) -> Result<String> {
        let resp = self.client.get(url).send().await?;
        resp.error_for_status_ref()?;
        Ok(resp.text().await?)
    }

    async fn try_fetch_to(&self, url: &str, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            if !parent.is_dir() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut resp = self.client.get(url).send().await?;
        resp.error_for_status_ref()?;

        let mut f = tokio::fs::File::create(dest).await?;
        while let Some(chunk) = resp.chunk().await? {
            f.write_all(&chunk).await?;
        }
        f.flush().await?;
        Ok(())
    }
}
