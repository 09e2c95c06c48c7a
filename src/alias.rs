use crate::types::DistroFamily;

use std::collections::HashMap;

/// Per-family distribution package names for one ecosystem package.
/// Families are independent; either side may be absent.
#[derive(Clone, Debug, Default)]
pub struct PackageAlias {
    pub name: String,
    pub deb: Option<String>,
    pub rpm: Option<String>,
}

impl PackageAlias {
    pub fn new(name: &str) -> Self {
        PackageAlias {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn deb(mut self, name: &str) -> Self {
        self.deb = Some(name.to_string());
        self
    }

    pub fn rpm(mut self, name: &str) -> Self {
        self.rpm = Some(name.to_string());
        self
    }

    fn for_family(&self, family: DistroFamily) -> Option<&str> {
        match family {
            DistroFamily::Deb => self.deb.as_deref(),
            DistroFamily::Rpm => self.rpm.as_deref(),
        }
    }
}

/// Ecosystem-name to distribution-name mapping, built once from config and
/// read-only afterwards
#[derive(Debug, Default)]
pub struct AliasTable {
    items: HashMap<String, PackageAlias>,
}

impl AliasTable {
    pub fn new() -> Self {
        AliasTable::default()
    }

    pub fn register(&mut self, alias: PackageAlias) {
        self.items.insert(alias.name.clone(), alias);
    }

    pub fn has_alias(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    /// The registered distribution name for this family, if any
    pub fn get(&self, name: &str, family: DistroFamily) -> Option<&str> {
        self.items.get(name).and_then(|a| a.for_family(family))
    }

    /// Resolve an ecosystem name for a family, falling back to the name
    /// itself when nothing is registered
    pub fn resolve<'a>(&'a self, name: &'a str, family: DistroFamily) -> &'a str {
        self.get(name, family).unwrap_or(name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn resolve_with_registered_alias() {
        let mut table = AliasTable::new();
        table.register(PackageAlias::new("SQLAlchemy").deb("python-sqlalchemy"));
        assert!(table.has_alias("SQLAlchemy"));
        assert_eq!(
            table.resolve("SQLAlchemy", DistroFamily::Deb),
            "python-sqlalchemy"
        );
        // No rpm side registered, identity fallback applies per family
        assert_eq!(table.resolve("SQLAlchemy", DistroFamily::Rpm), "SQLAlchemy");
    }

    #[test]
    fn resolve_unregistered_is_identity() {
        let table = AliasTable::new();
        assert!(!table.has_alias("SQLAlchemy"));
        assert_eq!(table.resolve("SQLAlchemy", DistroFamily::Deb), "SQLAlchemy");
    }
}
