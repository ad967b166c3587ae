//! Role → table → verb access policy. Compiled once at startup, immutable afterwards.

use crate::catalog::SchemaCatalog;
use crate::config::{PolicyConfig, VerbSpec};
use crate::error::ConfigError;
use std::collections::HashMap;
use std::fmt;

/// Role used when the request carries no authenticated role.
pub const DEFAULT_ROLE: &str = "visitor";

/// Dispatchable HTTP verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
}

impl Verb {
    pub const ALL: [Verb; 4] = [Verb::Get, Verb::Post, Verb::Put, Verb::Delete];

    /// Parses a method name case-insensitively. Anything outside get/post/put/delete is `None`.
    pub fn parse(s: &str) -> Option<Verb> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Some(Verb::Get),
            "post" => Some(Verb::Post),
            "put" => Some(Verb::Put),
            "delete" => Some(Verb::Delete),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "get",
            Verb::Post => "post",
            Verb::Put => "put",
            Verb::Delete => "delete",
        }
    }

    const fn bit(self) -> u8 {
        match self {
            Verb::Get => 1 << 0,
            Verb::Post => 1 << 1,
            Verb::Put => 1 << 2,
            Verb::Delete => 1 << 3,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bitmask of allowed verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VerbSet(u8);

impl VerbSet {
    pub const EMPTY: VerbSet = VerbSet(0);

    #[must_use]
    pub const fn with(self, verb: Verb) -> VerbSet {
        VerbSet(self.0 | verb.bit())
    }

    #[must_use]
    pub const fn contains(self, verb: Verb) -> bool {
        self.0 & verb.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl FromIterator<Verb> for VerbSet {
    fn from_iter<I: IntoIterator<Item = Verb>>(iter: I) -> Self {
        iter.into_iter().fold(VerbSet::EMPTY, VerbSet::with)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    rules: HashMap<String, HashMap<String, VerbSet>>,
}

impl AccessPolicy {
    /// Compiles the raw policy. Every table must exist in the catalog and every verb must parse.
    pub fn compile(config: &PolicyConfig, catalog: &SchemaCatalog) -> Result<Self, ConfigError> {
        let mut rules = HashMap::new();
        for (role, tables) in config {
            if role.trim().is_empty() {
                return Err(ConfigError::Validation("policy role name must not be empty".into()));
            }
            let mut per_table = HashMap::new();
            for (table, spec) in tables {
                if catalog.table(table).is_none() {
                    return Err(ConfigError::UnknownTable(table.clone()));
                }
                let verbs = parse_spec(role, table, spec)?;
                per_table.insert(table.clone(), verbs);
            }
            rules.insert(role.clone(), per_table);
        }
        Ok(AccessPolicy { rules })
    }

    /// Builds a policy without a catalog. Used by tests and by callers that validated tables elsewhere.
    pub fn from_rules<I, R, T>(rules: I) -> Self
    where
        I: IntoIterator<Item = (R, Vec<(T, VerbSet)>)>,
        R: Into<String>,
        T: Into<String>,
    {
        let rules = rules
            .into_iter()
            .map(|(role, tables)| {
                let per_table = tables.into_iter().map(|(t, v)| (t.into(), v)).collect();
                (role.into(), per_table)
            })
            .collect();
        AccessPolicy { rules }
    }

    /// Fail-closed lookup: a missing role or a missing table entry denies.
    pub fn permits(&self, role: &str, table: &str, verb: Verb) -> bool {
        self.rules
            .get(role)
            .and_then(|tables| tables.get(table))
            .map(|verbs| verbs.contains(verb))
            .unwrap_or(false)
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }
}

fn parse_spec(role: &str, table: &str, spec: &VerbSpec) -> Result<VerbSet, ConfigError> {
    spec.names()
        .into_iter()
        .map(|name| {
            Verb::parse(name).ok_or_else(|| ConfigError::UnknownVerb {
                role: role.to_string(),
                table: table.to_string(),
                verb: name.to_string(),
            })
        })
        .collect()
}
