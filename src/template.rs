//! Named SPARQL query templates.
//!
//! Templates are plain `.sparql` files under a templates directory, loaded the
//! first time a name is requested and reused verbatim afterwards. Parameters
//! are spliced in by literal token replacement ([`QueryTemplate::render`]),
//! not by a templating engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{ConnectorError, ConnectorResult};

/// File extension of template resources.
pub const TEMPLATE_EXTENSION: &str = "sparql";

/// Placeholder replaced by the escaped search text.
pub const VALUE_TOKEN: &str = "q0";
/// Placeholder replaced by the validated language tag.
pub const LANG_TOKEN: &str = "qLang";
/// Placeholder replaced by the validated label predicate.
pub const PREDICATE_TOKEN: &str = "qPred";

/// An immutable, loaded query template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplate {
    pub name: String,
    pub body: Arc<str>,
}

impl QueryTemplate {
    /// Replace every occurrence of each token with its value, in order.
    ///
    /// Replacement is plain substring substitution over the whole body, so an
    /// accidental occurrence of a token inside the template is replaced too.
    /// Values are inserted as-is: callers escape and validate them first.
    /// Later pairs see the output of earlier ones, so caller-supplied text
    /// must come last to keep it from being rescanned for tokens.
    pub fn render(&self, substitutions: &[(&str, &str)]) -> String {
        let mut query = self.body.to_string();
        for (token, value) in substitutions {
            query = query.replace(token, value);
        }
        query
    }
}

/// Lazily filled, concurrency-safe cache of query templates keyed by name.
pub struct TemplateStore {
    dir: PathBuf,
    cache: DashMap<String, Arc<str>>,
}

impl TemplateStore {
    /// Create a store that resolves `<dir>/<name>.sparql`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: DashMap::new(),
        }
    }

    /// Directory templates are read from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a template name resolves to.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{TEMPLATE_EXTENSION}"))
    }

    /// Fetch a template, reading it from disk on first use.
    ///
    /// The first caller for a name performs the read while holding the entry,
    /// so concurrent callers for the same name wait and then share the body.
    /// Failed loads are not cached.
    pub fn get(&self, name: &str) -> ConnectorResult<QueryTemplate> {
        validate_name(name)?;

        if let Some(body) = self.cache.get(name) {
            return Ok(QueryTemplate {
                name: name.to_string(),
                body: Arc::clone(body.value()),
            });
        }

        let entry = self
            .cache
            .entry(name.to_string())
            .or_try_insert_with(|| self.load(name))?;

        Ok(QueryTemplate {
            name: name.to_string(),
            body: Arc::clone(entry.value()),
        })
    }

    /// Whether a template has already been loaded.
    pub fn is_cached(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }

    /// Number of templates loaded so far.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether no template has been loaded yet.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    fn load(&self, name: &str) -> ConnectorResult<Arc<str>> {
        let path = self.path_for(name);
        if !path.is_file() {
            return Err(ConnectorError::MissingTemplate {
                name: name.to_string(),
                path: path.display().to_string(),
            });
        }

        let body = std::fs::read_to_string(&path).map_err(|e| ConnectorError::TemplateRead {
            path: path.display().to_string(),
            source: e,
        })?;

        tracing::debug!(template = name, path = %path.display(), bytes = body.len(), "loaded query template");
        Ok(Arc::from(body))
    }
}

impl std::fmt::Debug for TemplateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateStore")
            .field("dir", &self.dir)
            .field("cached", &self.cache.len())
            .finish()
    }
}

/// Template names are single path components: ASCII letters, digits, `_`, `-`.
fn validate_name(name: &str) -> ConnectorResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ConnectorError::InvalidArgument {
            parameter: "template name",
            value: name.to_string(),
            expected: "ASCII letters, digits, '_' or '-'",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(files: &[(&str, &str)]) -> (tempfile::TempDir, TemplateStore) {
        let dir = tempfile::TempDir::new().unwrap();
        for (name, body) in files {
            std::fs::write(dir.path().join(format!("{name}.sparql")), body).unwrap();
        }
        let store = TemplateStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn loads_template_by_name() {
        let (_dir, store) = store_with(&[("is_alive", "ASK {}")]);
        let template = store.get("is_alive").unwrap();
        assert_eq!(template.name, "is_alive");
        assert_eq!(&*template.body, "ASK {}");
        assert!(store.is_cached("is_alive"));
    }

    #[test]
    fn memoized_body_survives_file_removal() {
        let (dir, store) = store_with(&[("q", "SELECT * {}")]);
        let first = store.get("q").unwrap();
        std::fs::remove_file(dir.path().join("q.sparql")).unwrap();

        let second = store.get("q").unwrap();
        assert!(Arc::ptr_eq(&first.body, &second.body));
    }

    #[test]
    fn missing_template_is_reported_and_not_cached() {
        let (dir, store) = store_with(&[]);
        let err = store.get("search_by_label").unwrap_err();
        match err {
            ConnectorError::MissingTemplate { name, path } => {
                assert_eq!(name, "search_by_label");
                assert!(path.ends_with("search_by_label.sparql"));
            }
            other => panic!("expected MissingTemplate, got {other:?}"),
        }
        assert!(store.is_empty());

        // Appears later: next call picks it up.
        std::fs::write(dir.path().join("search_by_label.sparql"), "ASK {}").unwrap();
        assert!(store.get("search_by_label").is_ok());
    }

    #[test]
    fn path_like_names_are_rejected() {
        let (_dir, store) = store_with(&[]);
        for bad in ["../etc/passwd", "a/b", "", "x.sparql"] {
            assert!(matches!(
                store.get(bad),
                Err(ConnectorError::InvalidArgument { .. })
            ));
        }
    }

    #[test]
    fn concurrent_first_use_shares_one_body() {
        let (_dir, store) = store_with(&[("shared", "SELECT ?e {}")]);
        let bodies: Vec<Arc<str>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| store.get("shared").unwrap().body))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for body in &bodies[1..] {
            assert!(Arc::ptr_eq(&bodies[0], body));
        }
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn render_replaces_every_occurrence() {
        let template = QueryTemplate {
            name: "t".into(),
            body: Arc::from("\"q0\" qLang \"q0\" qPred"),
        };
        let query = template.render(&[
            (LANG_TOKEN, "en"),
            (PREDICATE_TOKEN, "rdfs:label"),
            (VALUE_TOKEN, "aspirin"),
        ]);
        assert_eq!(query, "\"aspirin\" en \"aspirin\" rdfs:label");
    }

    #[test]
    fn value_substituted_last_is_not_rescanned() {
        let template = QueryTemplate {
            name: "t".into(),
            body: Arc::from("\"q0\"@qLang"),
        };
        let query = template.render(&[(LANG_TOKEN, "nl"), (VALUE_TOKEN, "qLang qPred")]);
        assert_eq!(query, "\"qLang qPred\"@nl");
    }
}
