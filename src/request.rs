//! Path analysis: maps `<prefix>/<table>[/<id>]` onto a CRUD request, or declines.

use crate::config::{with_trailing_slash, ResolvedConfig};
use crate::policy::Verb;

/// A request the CRUD engine will handle.
#[derive(Debug, Clone, PartialEq)]
pub struct CrudRequest {
    /// Bare table name as it appeared in the URL. Quoting happens in the SQL builder.
    pub table: String,
    pub id: Option<String>,
    pub verb: Verb,
    /// True when the versioned-table prefix matched.
    pub versioned: bool,
    /// Query-string pairs in the order they were sent.
    pub query: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct RequestRouter {
    plain_prefix: String,
    versioned_prefix: String,
}

impl RequestRouter {
    pub fn new(plain_prefix: &str, versioned_prefix: &str) -> Self {
        RequestRouter {
            plain_prefix: with_trailing_slash(plain_prefix),
            versioned_prefix: with_trailing_slash(versioned_prefix),
        }
    }

    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self::new(&config.base_url, &config.base_url_for_vid_tables)
    }

    /// Whether the path falls under either prefix, regardless of verb.
    pub fn matches(&self, path: &str) -> bool {
        self.select_prefix(path).is_some()
    }

    /// Returns `None` when the request is not for the CRUD engine: no prefix matches,
    /// the table segment is empty, or the method is not get/post/put/delete.
    pub fn route(&self, method: &str, path: &str, query: Vec<(String, String)>) -> Option<CrudRequest> {
        let verb = Verb::parse(method)?;
        let (prefix, versioned) = self.select_prefix(path)?;
        let rest = &path[prefix.len()..];
        let mut segments = rest.split('/');

        let raw_table = segments.next().unwrap_or("");
        let raw_table = raw_table.split(['?', ';']).next().unwrap_or("");
        let table = urlencoding::decode(raw_table).ok()?.into_owned();
        if table.is_empty() {
            return None;
        }

        let id = match segments.next() {
            Some(s) if !s.is_empty() => Some(urlencoding::decode(s).ok()?.into_owned()),
            _ => None,
        };

        Some(CrudRequest {
            table,
            id,
            verb,
            versioned,
            query,
        })
    }

    /// Longest matching prefix wins so nested prefixes (e.g. `/api/` and `/api/vid/`) stay unambiguous.
    fn select_prefix(&self, path: &str) -> Option<(&str, bool)> {
        let plain = path.starts_with(&self.plain_prefix);
        let versioned = path.starts_with(&self.versioned_prefix);
        match (plain, versioned) {
            (true, true) if self.versioned_prefix.len() > self.plain_prefix.len() => {
                Some((&self.versioned_prefix, true))
            }
            (true, _) => Some((&self.plain_prefix, false)),
            (false, true) => Some((&self.versioned_prefix, true)),
            (false, false) => None,
        }
    }
}
