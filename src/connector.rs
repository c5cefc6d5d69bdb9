//! Connector facade: the public search API over a SPARQL endpoint.
//!
//! A [`GraphDbConnector`] owns the template store, the transport, and the
//! session registry. Each search is one blocking chain:
//! validate → escape → load template → substitute → execute → extract → record.

use crate::config::ConnectorConfig;
use crate::error::ConnectorResult;
use crate::executor::{HttpExecutor, SparqlTransport};
use crate::extract::{COMMENT_VAR, LABEL_VAR, SUBJECT_VAR, SearchOutcome, extract_labels};
use crate::results::SparqlResults;
use crate::sanitize::{LabelPredicate, escape_literal, validate_language};
use crate::session::SessionRegistry;
use crate::template::{LANG_TOKEN, PREDICATE_TOKEN, TemplateStore, VALUE_TOKEN};

/// Template used by the language-aware label searches.
pub const SEARCH_BY_LABEL: &str = "search_by_label";
/// Template used by the legacy comment search.
pub const SEARCH_ENTITIES_LEGACY: &str = "search_entities";
/// Template used by the liveness probe.
pub const IS_ALIVE: &str = "is_alive";

/// Client for free-text drug and adverse-event search in the DAKI graph.
///
/// Safe to share across threads; searches may run concurrently.
pub struct GraphDbConnector {
    config: ConnectorConfig,
    templates: TemplateStore,
    transport: Box<dyn SparqlTransport>,
    session: SessionRegistry,
}

impl GraphDbConnector {
    /// Connect over HTTP to `config.endpoint`.
    ///
    /// Nothing is sent until the first query.
    pub fn new(config: ConnectorConfig) -> Self {
        let executor = HttpExecutor::new(config.endpoint.clone(), config.timeout());
        Self::with_transport(config, Box::new(executor))
    }

    /// Use a custom transport (embedded store, test double, ...).
    pub fn with_transport(config: ConnectorConfig, transport: Box<dyn SparqlTransport>) -> Self {
        tracing::debug!(
            endpoint = transport.endpoint(),
            templates = %config.templates_dir.display(),
            "creating graph connector"
        );
        Self {
            templates: TemplateStore::new(config.templates_dir.clone()),
            config,
            transport,
            session: SessionRegistry::new(),
        }
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Where queries are sent.
    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    /// Identifiers surfaced by searches since the last clear.
    pub fn session(&self) -> &SessionRegistry {
        &self.session
    }

    /// Forget the identifiers recorded this session.
    pub fn clear_session(&self) {
        self.session.clear();
    }

    /// Run a fully substituted query as-is.
    pub fn execute(&self, query: &str) -> ConnectorResult<SparqlResults> {
        self.transport.execute(query)
    }

    /// Whether the endpoint answers the `is_alive` probe.
    ///
    /// Only connection failures become `false`; a missing template, a
    /// rejected query, or an HTTP error status still propagates.
    pub fn is_alive(&self) -> ConnectorResult<bool> {
        let template = self.templates.get(IS_ALIVE)?;
        match self.execute(&template.body) {
            Ok(_) => Ok(true),
            Err(e) if e.is_connection_failure() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Search drugs by `rdfs:label` in language `lang` (`en` or `nl`).
    pub fn search_entities(&self, text: &str, lang: &str) -> ConnectorResult<SearchOutcome> {
        self.search_by_label(text, LabelPredicate::RdfsLabel, lang)
    }

    /// Search adverse events by `skos:prefLabel` in language `lang`.
    pub fn search_adverse_events(&self, text: &str, lang: &str) -> ConnectorResult<SearchOutcome> {
        self.search_by_label(text, LabelPredicate::SkosPrefLabel, lang)
    }

    /// Legacy entity search matching descriptions (`rdfs:comment`) without
    /// language or predicate parameters.
    pub fn search_entities_legacy(&self, text: &str) -> ConnectorResult<SearchOutcome> {
        let value = escape_literal(text);
        let template = self.templates.get(SEARCH_ENTITIES_LEGACY)?;
        let query = template.render(&[(VALUE_TOKEN, value.as_str())]);
        self.run_search(&query, COMMENT_VAR)
    }

    fn search_by_label(
        &self,
        text: &str,
        predicate: LabelPredicate,
        lang: &str,
    ) -> ConnectorResult<SearchOutcome> {
        let lang = validate_language(lang)?;
        let value = escape_literal(text);
        let template = self.templates.get(SEARCH_BY_LABEL)?;

        // Search text goes last so it is never rescanned for tokens.
        let query = template.render(&[
            (LANG_TOKEN, lang.as_str()),
            (PREDICATE_TOKEN, predicate.as_str()),
            (VALUE_TOKEN, value.as_str()),
        ]);

        let _span = tracing::debug_span!("search", %predicate, %lang).entered();
        self.run_search(&query, LABEL_VAR)
    }

    fn run_search(&self, query: &str, text_var: &str) -> ConnectorResult<SearchOutcome> {
        let results = self.execute(query)?;
        let outcome = extract_labels(&results, SUBJECT_VAR, text_var)?;
        if let SearchOutcome::Found(labels) = &outcome {
            self.session.record_all(labels.ids());
        }
        tracing::debug!(
            hits = outcome.labels().map_or(0, |l| l.len()),
            session = self.session.len(),
            "search finished"
        );
        Ok(outcome)
    }
}

impl std::fmt::Debug for GraphDbConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphDbConnector")
            .field("endpoint", &self.transport.endpoint())
            .field("templates", &self.templates)
            .field("session", &self.session.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::error::ConnectorError;
    use crate::results::{Binding, RdfTerm};

    /// Records queries and answers with a canned response.
    struct Canned {
        queries: Arc<Mutex<Vec<String>>>,
        answer: fn(&str) -> ConnectorResult<SparqlResults>,
    }

    impl SparqlTransport for Canned {
        fn endpoint(&self) -> &str {
            "canned"
        }

        fn execute(&self, query: &str) -> ConnectorResult<SparqlResults> {
            self.queries.lock().unwrap().push(query.to_string());
            (self.answer)(query)
        }
    }

    type Sent = Arc<Mutex<Vec<String>>>;

    fn connector(
        answer: fn(&str) -> ConnectorResult<SparqlResults>,
    ) -> (tempfile::TempDir, GraphDbConnector, Sent) {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("search_by_label.sparql"),
            "SELECT ?e ?shortLabel { ?e qPred ?l FILTER(LANG(?l) = \"qLang\" && CONTAINS(?l, \"q0\")) }",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("search_entities.sparql"),
            "SELECT ?e ?shortComment { ?e rdfs:comment ?c FILTER(CONTAINS(?c, \"q0\")) }",
        )
        .unwrap();
        std::fs::write(dir.path().join("is_alive.sparql"), "ASK {}").unwrap();

        let config = ConnectorConfig {
            templates_dir: dir.path().to_path_buf(),
            ..ConnectorConfig::default()
        };
        let sent = Sent::default();
        let transport = Canned {
            queries: Arc::clone(&sent),
            answer,
        };
        (
            dir,
            GraphDbConnector::with_transport(config, Box::new(transport)),
            sent,
        )
    }

    fn one_row(var: &str) -> SparqlResults {
        let mut row = Binding::new();
        row.insert("e".into(), RdfTerm::uri("http://dakikg.org/drug/DB01050"));
        row.insert(var.into(), RdfTerm::literal("Ibuprofen"));
        SparqlResults::select(&["e", var], vec![row])
    }

    #[test]
    fn label_search_substitutes_all_tokens() {
        let (_dir, conn, sent) = connector(|_| Ok(one_row("shortLabel")));
        conn.search_adverse_events("hoofd\"pijn", " NL ").unwrap();

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("?e skos:prefLabel ?l"));
        assert!(sent[0].contains("= \"nl\""));
        assert!(sent[0].contains("\"hoofd\\\"pijn\""));
    }

    #[test]
    fn legacy_search_reads_comment_variable() {
        let (_dir, conn, _sent) = connector(|_| Ok(one_row("shortComment")));
        let outcome = conn.search_entities_legacy("anti-inflammatory").unwrap();
        assert_eq!(outcome.labels().unwrap().get("DB01050"), Some("Ibuprofen"));
        assert!(conn.session().contains("DB01050"));
    }

    #[test]
    fn is_alive_propagates_non_connectivity_errors() {
        let (_dir, conn, _sent) = connector(|q| {
            Err(ConnectorError::MalformedQuery {
                query: q.to_string(),
                diagnostic: "nope".into(),
            })
        });
        assert!(matches!(
            conn.is_alive(),
            Err(ConnectorError::MalformedQuery { .. })
        ));
    }

    #[test]
    fn is_alive_collapses_connection_failure() {
        let (_dir, conn, _sent) = connector(|_| {
            Err(ConnectorError::ConnectionFailed {
                endpoint: "canned".into(),
                message: "refused".into(),
            })
        });
        assert!(!conn.is_alive().unwrap());
    }
}
