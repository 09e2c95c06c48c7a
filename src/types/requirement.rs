use nom::{
    character::complete::{char, one_of},
    combinator::{opt, recognize},
    sequence::pair,
    IResult,
};
use std::fmt;

/// Comparison operator of a single version constraint.
///
/// Unrecognized operator text parses to `Unknown` instead of failing; the
/// version text is carried through untouched.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConstraintOp {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
    Unknown,
}

impl ConstraintOp {
    fn from_tag(tag: &str) -> Self {
        match tag {
            ">" => ConstraintOp::Gt,
            "<" => ConstraintOp::Lt,
            ">=" => ConstraintOp::Ge,
            "<=" => ConstraintOp::Le,
            "==" => ConstraintOp::Eq,
            "!=" => ConstraintOp::Ne,
            _ => ConstraintOp::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintOp::Gt => ">",
            ConstraintOp::Lt => "<",
            ConstraintOp::Ge => ">=",
            ConstraintOp::Le => "<=",
            ConstraintOp::Eq => "==",
            ConstraintOp::Ne => "!=",
            ConstraintOp::Unknown => "",
        }
    }
}

impl fmt::Display for ConstraintOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One operator/version pair from a requirement's constraint suffix.
/// Version strings are opaque tokens, never interpreted numerically.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Constraint {
    pub op: ConstraintOp,
    pub version: String,
}

impl Constraint {
    fn parse(token: &str) -> Self {
        match parse_op_tag(token) {
            Ok((version, tag)) => Constraint {
                op: ConstraintOp::from_tag(tag),
                version: version.to_string(),
            },
            // No leading operator characters at all; keep the token as the
            // version so nothing is lost
            Err(_) => Constraint {
                op: ConstraintOp::Unknown,
                version: token.to_string(),
            },
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.op, self.version)
    }
}

/// One or two characters from `< > ! =`, second one restricted to `=`
fn parse_op_tag(i: &str) -> IResult<&str, &str> {
    recognize(pair(one_of("<>!="), opt(char('='))))(i)
}

/// A parsed requirement line: package name, ordered constraints, and the
/// provenance chain describing why the dependency is present.
///
/// Lines that are empty (or comment-only) produce an invalid Requirement;
/// callers must check `is_valid` before using it.
#[derive(Clone, Debug, Default)]
pub struct Requirement {
    pub name: String,
    pub constraints: Vec<Constraint>,
    /// Ancestors from a "from" description, nearest parent first. Expansion
    /// is a single level deep: ancestors carry no provenance of their own.
    pub provenance: Vec<Requirement>,
    valid: bool,
}

impl Requirement {
    /// Parse one requirement line, optionally with a `parent -> grandparent`
    /// provenance description.
    pub fn parse(line: &str, from: Option<&str>) -> Self {
        // Strip trailing comment, then surrounding whitespace
        let spec = line.split('#').next().unwrap_or("").trim();
        if spec.is_empty() {
            return Requirement::default();
        }

        let (name, suffix) = match spec.find(|c| matches!(c, '<' | '>' | '!' | '=')) {
            Some(pos) => (&spec[..pos], Some(&spec[pos..])),
            None => (spec, None),
        };

        let constraints = match suffix {
            Some(s) => s.split(',').map(Constraint::parse).collect(),
            None => Vec::new(),
        };

        let provenance = match from {
            Some(desc) => desc
                .split("->")
                .map(|seg| Requirement::parse(seg, None))
                .filter(|r| r.is_valid())
                .collect(),
            None => Vec::new(),
        };

        Requirement {
            name: name.trim().to_string(),
            constraints,
            provenance,
            valid: true,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// Requirements are equal iff names match and the constraint lists are equal
/// as sets. This deliberately compares constraint structure, not range
/// semantics: `==1.0` does not equal `>=1.0,<=1.0`.
///
/// Containment is checked in both directions; duplicates are permitted, so a
/// matching length plus one-way containment is not enough.
impl PartialEq for Requirement {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.constraints.len() == other.constraints.len()
            && self
                .constraints
                .iter()
                .all(|c| other.constraints.contains(c))
            && other
                .constraints
                .iter()
                .all(|c| self.constraints.contains(c))
    }
}

impl Eq for Requirement {}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for (i, c) in self.constraints.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

/// An ordered collection of valid requirements from one textual source,
/// either a baseline document or one component's resolved dependencies.
#[derive(Debug, Default)]
pub struct RequirementSet {
    /// Name of the component that owns this set, for resolver output.
    /// Baselines have no owning component.
    pub component: Option<String>,
    pub entries: Vec<Requirement>,
}

impl RequirementSet {
    pub fn new(component: Option<String>) -> Self {
        RequirementSet {
            component,
            entries: Vec::new(),
        }
    }

    /// Parse one line and keep it if it turns out valid
    pub fn add_line(&mut self, line: &str, from: Option<&str>) {
        let req = Requirement::parse(line, from);
        if req.is_valid() {
            self.entries.push(req);
        }
    }

    pub fn from_lines<'a, I>(component: Option<String>, lines: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut set = RequirementSet::new(component);
        for line in lines {
            set.add_line(line, None);
        }
        set
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry with a matching name. Baseline names are unique by
    /// convention but not enforced; the first match is authoritative.
    pub fn find_by_name(&self, name: &str) -> Option<&Requirement> {
        self.entries.iter().find(|r| r.name == name)
    }

    /// Test a requirement against this set used as a baseline. Pure: returns
    /// whether the requirement complies, and the baseline entry it was
    /// compared against, if any.
    pub fn validate(&self, req: &Requirement) -> (bool, Option<&Requirement>) {
        match self.find_by_name(&req.name) {
            Some(entry) => (req == entry, Some(entry)),
            None => (false, None),
        }
    }

    /// A requirement is a direct dependency iff its nearest provenance
    /// ancestor is the component that owns this set
    pub fn is_direct(&self, req: &Requirement) -> bool {
        match (&self.component, req.provenance.first()) {
            (Some(component), Some(parent)) => &parent.name == component,
            _ => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_name_and_constraints() {
        let req = Requirement::parse("glance-store>=0.1.9,<2.0", None);
        assert!(req.is_valid());
        assert_eq!(req.name, "glance-store");
        assert_eq!(
            req.constraints,
            vec![
                Constraint {
                    op: ConstraintOp::Ge,
                    version: "0.1.9".to_string()
                },
                Constraint {
                    op: ConstraintOp::Lt,
                    version: "2.0".to_string()
                },
            ]
        );
    }

    #[test]
    fn parse_bare_name() {
        let req = Requirement::parse("pbr", None);
        assert!(req.is_valid());
        assert_eq!(req.name, "pbr");
        assert!(req.constraints.is_empty());
    }

    #[test]
    fn comment_and_empty_lines_are_invalid() {
        assert!(!Requirement::parse("", None).is_valid());
        assert!(!Requirement::parse("   ", None).is_valid());
        assert!(!Requirement::parse("# a comment", None).is_valid());
        // Trailing comments are stripped, the rest still parses
        let req = Requirement::parse("six>=1.7 # transition", None);
        assert!(req.is_valid());
        assert_eq!(req.name, "six");
        assert_eq!(req.constraints[0].version, "1.7");
    }

    #[test]
    fn unknown_operator_passes_through() {
        // "=1.0" is not a recognized operator; it must degrade, not fail
        let req = Requirement::parse("foo=1.0", None);
        assert!(req.is_valid());
        assert_eq!(req.name, "foo");
        assert_eq!(req.constraints[0].op, ConstraintOp::Unknown);
        assert_eq!(req.constraints[0].version, "1.0");
    }

    #[test]
    fn equality_ignores_constraint_order() {
        let a = Requirement::parse("foo>=1,<2", None);
        let b = Requirement::parse("foo<2,>=1", None);
        assert_eq!(a, b);
        assert_eq!(b, a);
    }

    #[test]
    fn equality_is_structural_not_semantic() {
        // Same version range, different constraint sets
        let a = Requirement::parse("foo==1.0", None);
        let b = Requirement::parse("foo>=1.0,<=1.0", None);
        assert_ne!(a, b);
    }

    #[test]
    fn duplicate_constraints_are_kept() {
        let a = Requirement::parse("foo>=1,>=1", None);
        assert_eq!(a.constraints.len(), 2);
        assert_ne!(a, Requirement::parse("foo>=1", None));
    }

    #[test]
    fn duplicate_constraints_do_not_mask_differences() {
        // Same length, one side all duplicates; must be unequal both ways
        let a = Requirement::parse("foo>=1,>=1", None);
        let b = Requirement::parse("foo>=1,<2", None);
        assert_ne!(a, b);
        assert_ne!(b, a);
    }

    #[test]
    fn provenance_is_single_level() {
        let req = Requirement::parse("oslo.config>=1.2.0", Some("glance->keystoneclient>=0.9"));
        assert_eq!(req.provenance.len(), 2);
        assert_eq!(req.provenance[0].name, "glance");
        assert_eq!(req.provenance[1].name, "keystoneclient");
        // Ancestors are not expanded further
        assert!(req.provenance.iter().all(|p| p.provenance.is_empty()));
    }

    #[test]
    fn display_round_trips() {
        for s in ["foo>=1.0,<2.0", "bar", "baz!=0.5"] {
            let req = Requirement::parse(s, None);
            let reparsed = Requirement::parse(&req.to_string(), None);
            assert_eq!(req, reparsed);
        }
    }

    #[test]
    fn baseline_validation() {
        let baseline = RequirementSet::from_lines(None, ["foo>=1.0"]);

        let (ok, entry) = baseline.validate(&Requirement::parse("foo>=1.0", Some("root->foo")));
        assert!(ok);
        assert_eq!(entry.unwrap().to_string(), "foo>=1.0");

        let (ok, entry) = baseline.validate(&Requirement::parse("foo>=2.0", None));
        assert!(!ok);
        assert_eq!(entry.unwrap().to_string(), "foo>=1.0");

        let (ok, entry) = baseline.validate(&Requirement::parse("bar==1.0", None));
        assert!(!ok);
        assert!(entry.is_none());
    }

    #[test]
    fn direct_dependency_classification() {
        let mut set = RequirementSet::new(Some("glance".to_string()));
        set.add_line("glance-store>=0.1.8", Some("glance"));
        set.add_line("six>=1.7", Some("oslo.config->glance"));
        assert!(set.is_direct(&set.entries[0]));
        assert!(!set.is_direct(&set.entries[1]));
        // No provenance at all classifies as indirect
        assert!(!set.is_direct(&Requirement::parse("foo", None)));
    }
}
