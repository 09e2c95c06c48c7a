use super::{RepoCache, RepoIndex};
use crate::{
    config::RepoConfig,
    types::{DistroFamily, MatchMode, PackageRecord},
    utils::downloader::Downloader,
};

use anyhow::{format_err, Context, Result};
use async_trait::async_trait;
use flate2::read::GzDecoder;
use std::{io::Read, path::Path, time::Duration};

const INDEX_ARTIFACT: &str = "Packages.gz";

/// Debian-family repository index. The cache holds a single compressed
/// `Packages` file; lookups decompress it and scan the control paragraphs.
pub struct DebIndex {
    name: String,
    packages_url: String,
    cache: RepoCache,
    broken: bool,
}

impl DebIndex {
    pub fn new(repo: &RepoConfig, cache_root: &Path, ttl: Duration) -> Self {
        // Flat repos carry a full index URL; otherwise the standard
        // dists/ layout applies. check_sanity guarantees the fields exist.
        let packages_url = match &repo.packages_url {
            Some(url) => url.clone(),
            None => format!(
                "{}/dists/{}/{}/binary-{}/Packages.gz",
                repo.url,
                repo.distribution.as_deref().unwrap_or_default(),
                repo.component.as_deref().unwrap_or_default(),
                repo.arch.as_deref().unwrap_or_default(),
            ),
        };
        DebIndex {
            cache: RepoCache::new(cache_root.join(&repo.name), ttl),
            name: repo.name.clone(),
            packages_url,
            broken: false,
        }
    }

    async fn refresh(&self, fetcher: &Downloader) -> Result<()> {
        self.cache
            .reset()
            .context("Failed to replace cache directory")?;
        fetcher
            .fetch_to(&self.packages_url, &self.cache.path(INDEX_ARTIFACT))
            .await
            .context(format!(
                "Failed to fetch package index from {}",
                self.packages_url
            ))
    }

    fn scan_index(&self, name: &str, mode: MatchMode) -> Result<Vec<PackageRecord>> {
        let f = std::fs::File::open(self.cache.path(INDEX_ARTIFACT))?;
        let mut contents = String::new();
        GzDecoder::new(f).read_to_string(&mut contents)?;

        let paragraphs = debcontrol::parse_str(&contents)
            .map_err(|err| format_err!("Malformed package index: {}", err))?;

        let mut res = Vec::new();
        for paragraph in paragraphs {
            let mut package = None;
            let mut version = None;
            for field in paragraph.fields {
                match field.name {
                    "Package" => package = Some(field.value),
                    "Version" => version = Some(field.value),
                    _ => (),
                }
            }
            if let (Some(package), Some(version)) = (package, version) {
                if mode.matches(&package, name) {
                    res.push(PackageRecord {
                        name: package,
                        version,
                    });
                }
            }
        }
        Ok(res)
    }
}

#[async_trait]
impl RepoIndex for DebIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn family(&self) -> DistroFamily {
        DistroFamily::Deb
    }

    fn is_broken(&self) -> bool {
        self.broken
    }

    async fn ensure_fresh(&mut self, fetcher: &Downloader) -> Result<()> {
        if !self.cache.is_stale(INDEX_ARTIFACT) {
            return Ok(());
        }
        if let Err(err) = self.refresh(fetcher).await {
            self.broken = true;
            return Err(err);
        }
        self.broken = false;
        Ok(())
    }

    fn find_by_name(&self, name: &str, mode: MatchMode) -> Vec<PackageRecord> {
        // Decompression or parse trouble degrades to "nothing found"
        self.scan_index(name, mode).unwrap_or_default()
    }
}
