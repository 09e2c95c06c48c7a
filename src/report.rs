use crate::{repo::RepoSet, validate::ValidationRecord};

use console::style;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Render the four validation blocks: direct/indirect crossed with
/// compatible/incompatible, each with a per-block total
pub fn render_validation(
    component: &str,
    records: &BTreeMap<String, ValidationRecord>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Report for component '{}':", style(component).bold());
    for (compatible, direct) in [(true, true), (true, false), (false, true), (false, false)] {
        render_block(&mut out, records, compatible, direct);
    }
    out
}

fn render_block(
    out: &mut String,
    records: &BTreeMap<String, ValidationRecord>,
    compatible: bool,
    direct: bool,
) {
    let header = format!(
        "{} dependencies {} with the baseline:",
        if direct { "Direct" } else { "Indirect" },
        if compatible {
            "compatible"
        } else {
            "incompatible"
        }
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", header);
    let _ = writeln!(out, "{}", "=".repeat(header.len()));

    let mut count = 0;
    for item in records.values() {
        if item.compliant != compatible || item.direct != direct {
            continue;
        }
        count += 1;

        let baseline_status = match &item.baseline {
            Some(entry) => format!("Baseline: {}", entry),
            None => "Not found in baseline".to_string(),
        };
        // Direct dependencies need no ancestry; indirect ones show the chain
        let parents = if direct {
            "  ".to_string()
        } else {
            format!(
                "(From: {})",
                item.requirement
                    .provenance
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" -> ")
            )
        };
        let _ = writeln!(out, "{} {} # {}", item.requirement, parents, baseline_status);
    }
    let _ = writeln!(out, "{}", "=".repeat(header.len()));
    let _ = writeln!(out, "Total: {}", count);
}

/// Machine-readable rendition: one `|`-delimited record per requirement
pub fn render_parsable(records: &BTreeMap<String, ValidationRecord>) -> String {
    let mut out = String::new();
    for (name, item) in records {
        let baseline = item
            .baseline
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        let provenance = item
            .requirement
            .provenance
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("->");
        let _ = writeln!(
            out,
            "requirement|{}|{}|{}|{}|{}|{}",
            name,
            item.requirement,
            if item.direct { "direct" } else { "indirect" },
            if item.compliant {
                "compliant"
            } else {
                "incompatible"
            },
            baseline,
            provenance,
        );
    }
    out
}

/// Cross-reference every requirement with the active repository indexes,
/// direct dependencies first
pub fn render_matches(
    records: &BTreeMap<String, ValidationRecord>,
    repo_set: &RepoSet,
    parsable: bool,
) -> String {
    let mut out = String::new();
    for direct in [true, false] {
        if !parsable {
            let header = format!(
                "Searching packages for {} dependencies:",
                if direct { "direct" } else { "indirect" }
            );
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", header);
            let _ = writeln!(out, "{}", "=".repeat(header.len()));
        }

        for item in records.values() {
            if item.direct != direct {
                continue;
            }
            if !parsable {
                let baseline_status = match &item.baseline {
                    Some(entry) => entry.to_string(),
                    None => "no baseline entry".to_string(),
                };
                let _ = writeln!(out);
                let _ = writeln!(
                    out,
                    "*** {} ({}):",
                    style(&item.requirement).bold(),
                    baseline_status
                );
            }
            for found in repo_set.find_by_name(&item.requirement.name) {
                if parsable {
                    let _ = writeln!(
                        out,
                        "match|{}|{}|{}|{}",
                        item.requirement.name, found.repo, found.package, found.version
                    );
                } else {
                    let _ = writeln!(
                        out,
                        "{}: '{} {}'",
                        found.repo, found.package, found.version
                    );
                }
            }
        }
    }
    out
}
