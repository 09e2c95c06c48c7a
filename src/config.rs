use crate::{
    alias::{AliasTable, PackageAlias},
    types::DistroFamily,
};

use anyhow::{bail, Result};
use clap::Parser;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::{collections::HashMap, path::PathBuf};

fn default_cache_ttl() -> u64 {
    // One hour, in seconds
    60 * 60
}

fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join("reqport-cache")
}

fn default_branch() -> String {
    "master".to_string()
}

#[derive(Deserialize)]
pub struct Config {
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// Repository index caches older than this many seconds are refreshed
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: u64,
    pub baseline: BaselineConfig,
    #[serde(default)]
    pub repo: Vec<RepoConfig>,
    #[serde(default)]
    pub alias: HashMap<String, AliasConfig>,
}

impl Config {
    pub fn check_sanity(&self) -> Result<()> {
        lazy_static! {
            static ref REPO_NAME: Regex = Regex::new("^[a-zA-Z0-9._-]+$").unwrap();
        }

        let mut seen = Vec::new();
        for repo in &self.repo {
            if !REPO_NAME.is_match(&repo.name) {
                bail!("Invalid character in repository name {}", repo.name);
            }
            if seen.contains(&&repo.name) {
                bail!("Duplicate repository name {}", repo.name);
            }
            seen.push(&repo.name);

            if repo.family == DistroFamily::Deb
                && repo.packages_url.is_none()
                && (repo.distribution.is_none() || repo.component.is_none() || repo.arch.is_none())
            {
                bail!(
                    "Repository {} needs either packages_url or distribution/component/arch",
                    repo.name
                );
            }
        }
        Ok(())
    }

    /// The alias table is built once here and read-only afterwards
    pub fn alias_table(&self) -> AliasTable {
        let mut table = AliasTable::new();
        for (name, alias) in &self.alias {
            let mut entry = PackageAlias::new(name);
            if let Some(deb) = &alias.deb {
                entry = entry.deb(deb);
            }
            if let Some(rpm) = &alias.rpm {
                entry = entry.rpm(rpm);
            }
            table.register(entry);
        }
        table
    }
}

#[derive(Deserialize)]
pub struct BaselineConfig {
    /// URL template for the baseline requirement list; `{branch}` is
    /// substituted before fetching
    pub url: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Shorthand branch names, e.g. icehouse = "stable/icehouse"
    #[serde(default)]
    pub branch_aliases: HashMap<String, String>,
}

impl BaselineConfig {
    pub fn url_for(&self, branch: &str) -> String {
        let branch = self
            .branch_aliases
            .get(branch)
            .map(|b| b.as_str())
            .unwrap_or(branch);
        self.url.replace("{branch}", branch)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct RepoConfig {
    pub name: String,
    pub family: DistroFamily,
    pub url: String,
    // deb repos following the dists/ layout
    pub distribution: Option<String>,
    pub component: Option<String>,
    pub arch: Option<String>,
    /// Full index URL for flat deb repos that don't follow the dists/ layout
    pub packages_url: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AliasConfig {
    pub deb: Option<String>,
    pub rpm: Option<String>,
}

#[derive(Parser)]
#[clap(about, version, author)]
pub struct Opts {
    #[clap(long, default_value = "reqport.toml", help = "Position of the config file")]
    pub config: PathBuf,
    #[clap(
        short = 'd',
        long,
        help = "Local source directory of the component to validate"
    )]
    pub source_dir: PathBuf,
    #[clap(long, help = "Baseline branch, overrides the configured one")]
    pub branch: Option<String>,
    #[clap(
        long,
        help = "Emit delimiter-separated records instead of styled blocks"
    )]
    pub parsable: bool,
    #[clap(long, help = "Validate against the baseline only, skip repository search")]
    pub skip_repos: bool,
}
