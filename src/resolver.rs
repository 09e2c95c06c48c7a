use crate::{info, types::RequirementSet};

use anyhow::{bail, format_err, Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::{path::Path, process::Command};

/// Discover a component's resolved dependency set by running a pip dry run
/// in its source directory and scraping the verbose resolution output.
///
/// The returned set carries the component's own name, which later drives the
/// direct/indirect classification.
pub fn resolve_from_dir(path: &Path) -> Result<RequirementSet> {
    if !path.exists() {
        bail!("Path not found '{}'", path.display());
    }

    // pip reuses a per-user build directory; leftovers poison the dry run
    let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    let _ = std::fs::remove_dir_all(std::env::temp_dir().join(format!("pip_build_{}", user)));

    let component = component_name(path)?;
    info!("Calculating requirements for {}...", component);

    let output = Command::new("pip")
        .args(["install", "--no-install", "--verbose", "-e", "."])
        .current_dir(path)
        .output()
        .context("Failed to execute pip")?;
    if !output.status.success() {
        match output.status.code() {
            Some(code) => bail!("pip exited with non-zero return code: {}.", code),
            None => bail!("pip process was terminated by signal."),
        }
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(collect_resolved_lines(&component, stdout.lines()))
}

/// The component's own name, as reported by its build metadata
fn component_name(path: &Path) -> Result<String> {
    let output = Command::new("python")
        .args(["setup.py", "--name"])
        .current_dir(path)
        .output()
        .context("Failed to query component name")?;
    if !output.status.success() {
        bail!("setup.py --name failed in '{}'", path.display());
    }

    // Build systems sometimes print warnings first; the name is the last line
    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .map(str::to_string)
        .ok_or_else(|| format_err!("setup.py reported no component name"))
}

/// Extract requirement/provenance pairs from pip's verbose resolution lines.
/// Lines that match neither record form are ignored.
pub fn collect_resolved_lines<'a, I>(component: &str, lines: I) -> RequirementSet
where
    I: IntoIterator<Item = &'a str>,
{
    lazy_static! {
        static ref DOWNLOADING: Regex =
            Regex::new(r"Downloading/unpacking (.*?) \(from (.*?)\)").unwrap();
        static ref SATISFIED: Regex =
            Regex::new(r"Requirement already satisfied.*?: (.*?) in .*?\(from (.*?)\)").unwrap();
    }

    let mut set = RequirementSet::new(Some(component.to_string()));
    for line in lines {
        let captures = DOWNLOADING
            .captures(line)
            .or_else(|| SATISFIED.captures(line));
        if let Some(captures) = captures {
            let spec = captures.get(1).map(|m| m.as_str()).unwrap_or("");
            let from = captures.get(2).map(|m| m.as_str());
            set.add_line(spec, from);
        }
    }
    set
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn nonexistent_path_is_fatal() {
        let err = resolve_from_dir(Path::new("/definitely/not/a/real/path")).unwrap_err();
        assert!(err.to_string().contains("Path not found"));
    }

    #[test]
    fn collects_both_record_forms() {
        let lines = [
            "Obtaining file:///home/user/glance",
            "Downloading/unpacking glance-store>=0.1.8 (from glance)",
            "Requirement already satisfied (use --upgrade to upgrade): six>=1.7 in /usr/lib/python2.7 (from oslo.config->glance)",
            "Cleaning up...",
        ];
        let set = collect_resolved_lines("glance", lines);
        assert_eq!(set.len(), 2);

        assert_eq!(set.entries[0].name, "glance-store");
        assert_eq!(set.entries[0].provenance[0].name, "glance");
        assert!(set.is_direct(&set.entries[0]));

        assert_eq!(set.entries[1].name, "six");
        assert_eq!(set.entries[1].provenance[0].name, "oslo.config");
        assert_eq!(set.entries[1].provenance[1].name, "glance");
        assert!(!set.is_direct(&set.entries[1]));
    }

    #[test]
    fn unrelated_lines_are_ignored() {
        let set = collect_resolved_lines("glance", ["Running setup.py egg_info for package"]);
        assert!(set.is_empty());
    }
}
