use crate::{
    types::{Requirement, RequirementSet},
    warn,
};

use std::collections::BTreeMap;

/// Outcome of checking one resolved requirement against the baseline
#[derive(Clone, Debug)]
pub struct ValidationRecord {
    pub requirement: Requirement,
    /// The baseline entry with the same name, if one exists
    pub baseline: Option<Requirement>,
    /// True iff the baseline entry exists and the constraint sets are equal
    pub compliant: bool,
    pub direct: bool,
}

/// Validate every resolved requirement against the baseline. The result is
/// keyed by requirement name; when a name appears more than once the last
/// observation wins, and the displaced ones are counted so the collapse is
/// at least visible.
pub fn validate_all(
    resolved: &RequirementSet,
    baseline: &RequirementSet,
) -> BTreeMap<String, ValidationRecord> {
    let mut result = BTreeMap::new();
    let mut displaced = 0usize;
    for req in &resolved.entries {
        let (compliant, entry) = baseline.validate(req);
        let record = ValidationRecord {
            requirement: req.clone(),
            baseline: entry.cloned(),
            compliant,
            direct: resolved.is_direct(req),
        };
        if result.insert(req.name.clone(), record).is_some() {
            displaced += 1;
        }
    }
    if displaced > 0 {
        warn!(
            "{} requirement observation(s) had duplicate names; only the last one per name is kept.",
            displaced
        );
    }
    result
}
