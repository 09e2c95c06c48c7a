pub mod deb;
pub mod rpm;

use crate::{
    alias::AliasTable,
    config::RepoConfig,
    types::{DistroFamily, MatchMode, PackageRecord},
    utils::downloader::Downloader,
    warn,
};

use anyhow::Result;
use async_trait::async_trait;
use futures_util::future::join_all;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// Local cache of one repository's index artifacts. Every index exclusively
/// owns its own cache directory; refresh replaces the directory wholesale
/// instead of updating files in place.
#[derive(Debug)]
pub struct RepoCache {
    dir: PathBuf,
    ttl: Duration,
}

impl RepoCache {
    pub fn new(dir: PathBuf, ttl: Duration) -> Self {
        RepoCache { dir, ttl }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.join(rel)
    }

    /// Stale iff the artifact is missing or older than the threshold
    pub fn is_stale(&self, rel: &str) -> bool {
        let meta = match std::fs::metadata(self.path(rel)) {
            Ok(meta) => meta,
            Err(_) => return true,
        };
        let modified = match meta.modified() {
            Ok(t) => t,
            Err(_) => return true,
        };
        match modified.elapsed() {
            Ok(age) => age > self.ttl,
            // Clock went backwards; treat the artifact as fresh
            Err(_) => false,
        }
    }

    /// Drop the whole cache directory and recreate it empty
    pub fn reset(&self) -> Result<()> {
        if self.dir.is_dir() {
            std::fs::remove_dir_all(&self.dir)?;
        }
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }
}

/// One binary package repository with a time-bounded local index cache.
///
/// A fetch or decode failure during refresh marks the index broken; callers
/// must exclude broken indexes instead of querying them. Lookup failures
/// never propagate, they degrade to an empty result list.
#[async_trait]
pub trait RepoIndex {
    fn name(&self) -> &str;
    fn family(&self) -> DistroFamily;
    fn is_broken(&self) -> bool;
    /// Refresh the local cache if it is stale, otherwise a no-op
    async fn ensure_fresh(&mut self, fetcher: &Downloader) -> Result<()>;
    fn find_by_name(&self, name: &str, mode: MatchMode) -> Vec<PackageRecord>;
}

pub fn build_index(repo: &RepoConfig, cache_root: &Path, ttl: Duration) -> Box<dyn RepoIndex> {
    match repo.family {
        DistroFamily::Deb => Box::new(deb::DebIndex::new(repo, cache_root, ttl)),
        DistroFamily::Rpm => Box::new(rpm::RpmIndex::new(repo, cache_root, ttl)),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoMatch {
    pub repo: String,
    pub package: String,
    pub version: String,
}

/// All active repository indexes plus the alias table used to translate
/// ecosystem package names per distribution family
pub struct RepoSet {
    aliases: AliasTable,
    indexes: Vec<Box<dyn RepoIndex>>,
}

impl RepoSet {
    /// Refresh all candidate indexes concurrently (their caches are mutually
    /// independent) and keep the ones that came back healthy. Broken indexes
    /// are reported by name and excluded from the active set.
    pub async fn init(
        aliases: AliasTable,
        candidates: Vec<Box<dyn RepoIndex>>,
        fetcher: &Downloader,
    ) -> Self {
        let refreshed = join_all(candidates.into_iter().map(|mut index| async move {
            let res = index.ensure_fresh(fetcher).await;
            (index, res)
        }))
        .await;

        let mut indexes = Vec::new();
        for (index, res) in refreshed {
            if let Err(err) = res {
                warn!("Repository {} is broken: {}", index.name(), err);
                continue;
            }
            if index.is_broken() {
                warn!("Repository {} is broken.", index.name());
                continue;
            }
            indexes.push(index);
        }
        RepoSet { aliases, indexes }
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    pub fn active_names(&self) -> Vec<&str> {
        self.indexes.iter().map(|i| i.name()).collect()
    }

    /// Look an ecosystem package name up across all active indexes, in
    /// registration order. When an alias is registered for an index's family
    /// the resolved name is assumed distribution-correct and searched
    /// exactly; otherwise the raw name is searched with the boundary-aware
    /// default pattern.
    pub fn find_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = RepoMatch> + 'a {
        self.indexes.iter().flat_map(move |index| {
            let (search, mode) = match self.aliases.get(name, index.family()) {
                Some(resolved) => (resolved, MatchMode::Exact),
                None => (name, MatchMode::NameBoundary),
            };
            index
                .find_by_name(search, mode)
                .into_iter()
                .map(move |rec| RepoMatch {
                    repo: index.name().to_string(),
                    package: rec.name,
                    version: rec.version,
                })
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::alias::PackageAlias;
    use anyhow::bail;

    #[test]
    fn missing_artifact_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RepoCache::new(dir.path().join("repo"), Duration::from_secs(3600));
        assert!(cache.is_stale("Packages.gz"));
    }

    #[test]
    fn aged_artifact_is_stale_fresh_one_is_not() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RepoCache::new(dir.path().to_path_buf(), Duration::from_millis(10));
        std::fs::write(cache.path("Packages.gz"), b"x").unwrap();
        std::thread::sleep(Duration::from_millis(50));
        assert!(cache.is_stale("Packages.gz"));

        let cache = RepoCache::new(dir.path().to_path_buf(), Duration::from_secs(3600));
        assert!(!cache.is_stale("Packages.gz"));
    }

    #[test]
    fn reset_replaces_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RepoCache::new(dir.path().join("repo"), Duration::from_secs(1));
        cache.reset().unwrap();
        std::fs::write(cache.path("stale-artifact"), b"x").unwrap();
        cache.reset().unwrap();
        assert!(!cache.path("stale-artifact").exists());
    }

    struct StubIndex {
        name: String,
        family: DistroFamily,
        broken: bool,
        records: Vec<PackageRecord>,
    }

    impl StubIndex {
        fn new(name: &str, family: DistroFamily, records: Vec<PackageRecord>) -> Box<Self> {
            Box::new(StubIndex {
                name: name.to_string(),
                family,
                broken: false,
                records,
            })
        }
    }

    #[async_trait]
    impl RepoIndex for StubIndex {
        fn name(&self) -> &str {
            &self.name
        }
        fn family(&self) -> DistroFamily {
            self.family
        }
        fn is_broken(&self) -> bool {
            self.broken
        }
        async fn ensure_fresh(&mut self, _fetcher: &Downloader) -> Result<()> {
            if self.broken {
                bail!("refresh failed");
            }
            Ok(())
        }
        fn find_by_name(&self, name: &str, mode: MatchMode) -> Vec<PackageRecord> {
            self.records
                .iter()
                .filter(|r| mode.matches(&r.name, name))
                .cloned()
                .collect()
        }
    }

    fn record(name: &str, version: &str) -> PackageRecord {
        PackageRecord {
            name: name.to_string(),
            version: version.to_string(),
        }
    }

    #[tokio::test]
    async fn broken_index_is_excluded() {
        let healthy = StubIndex::new("good", DistroFamily::Deb, vec![]);
        let mut broken = StubIndex::new("bad", DistroFamily::Deb, vec![]);
        broken.broken = true;

        let fetcher = Downloader::new().unwrap();
        let set = RepoSet::init(AliasTable::new(), vec![healthy, broken], &fetcher).await;
        assert_eq!(set.active_names(), vec!["good"]);
    }

    #[tokio::test]
    async fn lookup_preserves_registration_order() {
        let first = StubIndex::new(
            "first",
            DistroFamily::Deb,
            vec![record("python-foo", "1.0-1")],
        );
        let second = StubIndex::new("second", DistroFamily::Rpm, vec![record("foo", "1.2-3")]);

        let fetcher = Downloader::new().unwrap();
        let set = RepoSet::init(AliasTable::new(), vec![first, second], &fetcher).await;
        let matches: Vec<RepoMatch> = set.find_by_name("foo").collect();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].repo, "first");
        assert_eq!(matches[0].package, "python-foo");
        assert_eq!(matches[1].repo, "second");
    }

    #[tokio::test]
    async fn alias_switches_to_exact_match() {
        let index = StubIndex::new(
            "deb",
            DistroFamily::Deb,
            vec![record("python-sqlalchemy", "0.9.8-1")],
        );
        let mut aliases = AliasTable::new();
        aliases.register(PackageAlias::new("SQLAlchemy").deb("python-sqlalchemy"));

        let fetcher = Downloader::new().unwrap();
        let set = RepoSet::init(aliases, vec![index], &fetcher).await;
        let matches: Vec<RepoMatch> = set.find_by_name("SQLAlchemy").collect();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].package, "python-sqlalchemy");
    }
}
