mod alias;
mod baseline;
mod cli;
mod config;
mod report;
mod repo;
mod resolver;
mod types;
mod utils;
mod validate;

use anyhow::{Context, Result};
use clap::Parser;
use config::{Config, Opts};
use std::time::Duration;

/// Exit codes:
/// 1 => program screwed up
#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(err) = try_main().await {
        error!("{}", err.to_string());
        err.chain().skip(1).for_each(|cause| {
            due_to!("{}", cause);
        });
        std::process::exit(1);
    }
}

async fn try_main() -> Result<()> {
    let opts = Opts::parse();
    let data = std::fs::read_to_string(&opts.config).context(format!(
        "Failed to open config file {}",
        opts.config.display()
    ))?;
    let config: Config = toml::from_str(&data).context("Failed to parse config file")?;
    config.check_sanity()?;

    let fetcher = utils::downloader::Downloader::new()?;

    // Step 1: Load the authoritative baseline
    let branch = opts.branch.as_deref().unwrap_or(&config.baseline.branch);
    let url = config.baseline.url_for(branch);
    info!("Loading baseline requirements ({})...", branch);
    let baseline = baseline::load(&fetcher, &url).await?;
    info!("Done. {} records loaded.", baseline.len());

    // Step 2: Resolve the component's dependency set
    let resolved = resolver::resolve_from_dir(&opts.source_dir)?;
    let component = resolved.component.clone().unwrap_or_default();
    info!("Done. {} records found.", resolved.len());

    // Step 3: Validate against the baseline
    let records = validate::validate_all(&resolved, &baseline);
    if opts.parsable {
        print!("{}", report::render_parsable(&records));
    } else {
        print!("{}", report::render_validation(&component, &records));
    }

    if opts.skip_repos {
        return Ok(());
    }

    // Step 4: Cross-reference distribution packages
    info!("Refreshing repository indexes...");
    let ttl = Duration::from_secs(config.cache_ttl);
    let candidates = config
        .repo
        .iter()
        .map(|repo| repo::build_index(repo, &config.cache_dir, ttl))
        .collect();
    let repo_set = repo::RepoSet::init(config.alias_table(), candidates, &fetcher).await;
    if repo_set.is_empty() {
        warn!("No repository index is available, skipping package search.");
        return Ok(());
    }

    print!("{}", report::render_matches(&records, &repo_set, opts.parsable));
    success!("Validation report for '{}' complete.", component);
    Ok(())
}
