mod requirement;

pub use requirement::{Constraint, ConstraintOp, Requirement, RequirementSet};

use serde::Deserialize;
use std::fmt;

/// Distribution family of a binary package repository
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistroFamily {
    Deb,
    Rpm,
}

impl fmt::Display for DistroFamily {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DistroFamily::Deb => write!(f, "deb"),
            DistroFamily::Rpm => write!(f, "rpm"),
        }
    }
}

/// A (name, version) pair matched in a repository index
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
}

/// How a repository lookup matches candidate package names
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MatchMode {
    /// The package name must equal the search name exactly
    Exact,
    /// The search name must be the whole package name, or a `-`-delimited
    /// suffix of it (so `foo` matches `python-foo` but not `libfoo`)
    NameBoundary,
}

impl MatchMode {
    pub fn matches(&self, candidate: &str, name: &str) -> bool {
        match self {
            MatchMode::Exact => candidate == name,
            MatchMode::NameBoundary => {
                candidate == name
                    || (candidate.ends_with(name)
                        && candidate[..candidate.len() - name.len()].ends_with('-'))
            }
        }
    }
}
