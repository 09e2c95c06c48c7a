use super::{RepoCache, RepoIndex};
use crate::{
    config::RepoConfig,
    types::{DistroFamily, MatchMode, PackageRecord},
    utils::downloader::Downloader,
};

use anyhow::{bail, format_err, Context, Result};
use async_trait::async_trait;
use flate2::read::GzDecoder;
use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};
use std::{io::Read, path::Path, time::Duration};

const MANIFEST_ARTIFACT: &str = "repodata/repomd.xml";

/// RPM-family repository index. Refresh fetches the repomd manifest and
/// every data file it references, preserving the manifest's relative paths
/// inside the cache directory. Lookups scan the cached primary metadata.
pub struct RpmIndex {
    name: String,
    base_url: String,
    cache: RepoCache,
    broken: bool,
}

/// One `<data>` entry from repomd.xml
#[derive(Debug, PartialEq, Eq)]
struct DataLocation {
    data_type: String,
    href: String,
}

impl RpmIndex {
    pub fn new(repo: &RepoConfig, cache_root: &Path, ttl: Duration) -> Self {
        RpmIndex {
            cache: RepoCache::new(cache_root.join(&repo.name), ttl),
            name: repo.name.clone(),
            base_url: repo.url.clone(),
            broken: false,
        }
    }

    async fn refresh(&self, fetcher: &Downloader) -> Result<()> {
        self.cache
            .reset()
            .context("Failed to replace cache directory")?;

        let manifest_url = format!("{}/{}", self.base_url, MANIFEST_ARTIFACT);
        fetcher
            .fetch_to(&manifest_url, &self.cache.path(MANIFEST_ARTIFACT))
            .await
            .context(format!(
                "Failed to fetch repository manifest from {}",
                manifest_url
            ))?;

        let manifest = std::fs::read_to_string(self.cache.path(MANIFEST_ARTIFACT))?;
        let locations =
            parse_repomd(&manifest).context("Failed to parse repository manifest")?;
        if locations.is_empty() {
            bail!("Repository manifest lists no data files");
        }

        for location in &locations {
            let url = format!("{}/{}", self.base_url, location.href);
            fetcher
                .fetch_to(&url, &self.cache.path(&location.href))
                .await
                .context(format!("Failed to fetch repository data from {}", url))?;
        }
        Ok(())
    }

    fn scan_primary(&self, name: &str, mode: MatchMode) -> Result<Vec<PackageRecord>> {
        let manifest = std::fs::read_to_string(self.cache.path(MANIFEST_ARTIFACT))?;
        let primary = parse_repomd(&manifest)?
            .into_iter()
            .find(|l| l.data_type == "primary")
            .ok_or_else(|| format_err!("No primary metadata in repository manifest"))?;

        let mut contents = String::new();
        if primary.href.ends_with(".gz") {
            let f = std::fs::File::open(self.cache.path(&primary.href))?;
            GzDecoder::new(f).read_to_string(&mut contents)?;
        } else {
            contents = std::fs::read_to_string(self.cache.path(&primary.href))?;
        }

        parse_primary(&contents, name, mode)
    }
}

#[async_trait]
impl RepoIndex for RpmIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn family(&self) -> DistroFamily {
        DistroFamily::Rpm
    }

    fn is_broken(&self) -> bool {
        self.broken
    }

    async fn ensure_fresh(&mut self, fetcher: &Downloader) -> Result<()> {
        if !self.cache.is_stale(MANIFEST_ARTIFACT) {
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
        self.scan_primary(name, mode).unwrap_or_default()
    }
}

fn attr_value(e: &BytesStart, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Extract the data-file locations from a repomd.xml document. Elements are
/// matched by local name, so the manifest's default namespace (and the rpm:
/// prefix) need no special treatment.
fn parse_repomd(s: &str) -> Result<Vec<DataLocation>> {
    let mut reader = Reader::from_reader(s.as_bytes());
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut res = Vec::new();
    let mut current_type: Option<String> = None;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"data" => current_type = attr_value(&e, b"type")?,
                b"location" => {
                    if let (Some(data_type), Some(href)) =
                        (current_type.clone(), attr_value(&e, b"href")?)
                    {
                        res.push(DataLocation { data_type, href });
                    }
                }
                _ => (),
            },
            Event::End(e) => {
                if e.local_name().as_ref() == b"data" {
                    current_type = None;
                }
            }
            Event::Eof => break,
            _ => (),
        }
        buf.clear();
    }
    Ok(res)
}

/// Scan primary metadata for matching packages. Entries missing a name or
/// version are skipped so one bad record cannot spoil the whole lookup.
fn parse_primary(s: &str, name: &str, mode: MatchMode) -> Result<Vec<PackageRecord>> {
    let mut reader = Reader::from_reader(s.as_bytes());
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut res = Vec::new();
    let mut in_package = false;
    let mut capture_name = false;
    let mut pkg_name: Option<String> = None;
    let mut pkg_version: Option<String> = None;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"package" => {
                    in_package = true;
                    pkg_name = None;
                    pkg_version = None;
                }
                b"name" if in_package && pkg_name.is_none() => capture_name = true,
                b"version" if in_package => pkg_version = version_string(&e)?,
                _ => (),
            },
            Event::Empty(e) => {
                if in_package && e.local_name().as_ref() == b"version" {
                    pkg_version = version_string(&e)?;
                }
            }
            Event::Text(t) => {
                if capture_name {
                    pkg_name = Some(t.unescape()?.into_owned());
                    capture_name = false;
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"name" => capture_name = false,
                b"package" => {
                    in_package = false;
                    if let (Some(n), Some(v)) = (pkg_name.take(), pkg_version.take()) {
                        if mode.matches(&n, name) {
                            res.push(PackageRecord {
                                name: n,
                                version: v,
                            });
                        }
                    }
                }
                _ => (),
            },
            Event::Eof => break,
            _ => (),
        }
        buf.clear();
    }
    Ok(res)
}

/// Canonical `ver-rel` form from a `<version>` element's attributes
fn version_string(e: &BytesStart) -> Result<Option<String>> {
    let ver = match attr_value(e, b"ver")? {
        Some(ver) => ver,
        None => return Ok(None),
    };
    Ok(Some(match attr_value(e, b"rel")? {
        Some(rel) => format!("{}-{}", ver, rel),
        None => ver,
    }))
}
