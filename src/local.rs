//! In-process SPARQL store backed by oxigraph.
//!
//! Lets the connector run the same templates against a Turtle dump without a
//! GraphDB server, and gives the test suite real SPARQL evaluation.

use std::io::Read;
use std::path::Path;

use oxigraph::io::RdfFormat;
use oxigraph::model::Term;
use oxigraph::sparql::{QueryResults, SparqlEvaluator};
use oxigraph::store::Store;

use crate::error::{ConnectorError, ConnectorResult};
use crate::executor::SparqlTransport;
use crate::results::{Binding, RdfTerm, SparqlResults, TermKind};

/// Transport answering queries from an embedded in-memory store.
pub struct LocalStoreTransport {
    store: Store,
    label: String,
}

impl LocalStoreTransport {
    /// Create an empty in-memory store.
    pub fn in_memory() -> ConnectorResult<Self> {
        let store = Store::new().map_err(|e| ConnectorError::LocalStore {
            message: format!("failed to create oxigraph store: {e}"),
        })?;
        Ok(Self {
            store,
            label: "local:memory".into(),
        })
    }

    /// Create an in-memory store and load a Turtle file into it.
    pub fn from_turtle_file(path: &Path) -> ConnectorResult<Self> {
        let file = std::fs::File::open(path).map_err(|e| ConnectorError::LocalStore {
            message: format!("failed to open {}: {e}", path.display()),
        })?;
        let mut transport = Self::in_memory()?;
        transport.load_turtle(file)?;
        transport.label = format!("local:{}", path.display());
        Ok(transport)
    }

    /// Load Turtle data into the default graph.
    pub fn load_turtle(&self, reader: impl Read) -> ConnectorResult<()> {
        self.store
            .load_from_reader(RdfFormat::Turtle, reader)
            .map_err(|e| ConnectorError::LocalStore {
                message: format!("failed to load Turtle data: {e}"),
            })
    }

    /// Number of triples in the store.
    pub fn len(&self) -> ConnectorResult<usize> {
        self.store.len().map_err(|e| ConnectorError::LocalStore {
            message: format!("failed to count triples: {e}"),
        })
    }

    /// Whether the store holds no triples.
    pub fn is_empty(&self) -> ConnectorResult<bool> {
        self.len().map(|n| n == 0)
    }
}

impl SparqlTransport for LocalStoreTransport {
    fn endpoint(&self) -> &str {
        &self.label
    }

    fn execute(&self, query: &str) -> ConnectorResult<SparqlResults> {
        let prepared = SparqlEvaluator::new()
            .parse_query(query)
            .map_err(|e| ConnectorError::MalformedQuery {
                query: query.to_string(),
                diagnostic: e.to_string(),
            })?;

        let results = prepared
            .on_store(&self.store)
            .execute()
            .map_err(|e| ConnectorError::LocalStore {
                message: format!("SPARQL evaluation failed: {e}"),
            })?;

        match results {
            QueryResults::Solutions(solutions) => {
                let vars: Vec<String> = solutions
                    .variables()
                    .iter()
                    .map(|v| v.as_str().to_string())
                    .collect();
                let mut rows = Vec::new();
                for solution in solutions {
                    let solution = solution.map_err(|e| ConnectorError::LocalStore {
                        message: format!("solution error: {e}"),
                    })?;
                    let mut row = Binding::new();
                    for (var, term) in solution.iter() {
                        row.insert(var.as_str().to_string(), to_rdf_term(term));
                    }
                    rows.push(row);
                }
                let vars: Vec<&str> = vars.iter().map(String::as_str).collect();
                Ok(SparqlResults::select(&vars, rows))
            }
            QueryResults::Boolean(b) => Ok(SparqlResults::ask(b)),
            QueryResults::Graph(_) => Err(ConnectorError::InvalidResponse {
                message: "CONSTRUCT/DESCRIBE results are not supported".into(),
            }),
        }
    }
}

impl std::fmt::Debug for LocalStoreTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStoreTransport")
            .field("label", &self.label)
            .finish()
    }
}

fn to_rdf_term(term: &Term) -> RdfTerm {
    match term {
        Term::NamedNode(node) => RdfTerm::uri(node.as_str()),
        Term::BlankNode(node) => RdfTerm {
            kind: TermKind::Bnode,
            value: node.as_str().to_string(),
            lang: None,
            datatype: None,
        },
        Term::Literal(literal) => match literal.language() {
            Some(lang) => RdfTerm::lang_literal(literal.value(), lang),
            None => RdfTerm {
                datatype: Some(literal.datatype().as_str().to_string()),
                ..RdfTerm::literal(literal.value())
            },
        },
        #[allow(unreachable_patterns)]
        other => RdfTerm {
            kind: TermKind::Triple,
            value: other.to_string(),
            lang: None,
            datatype: None,
        },
    }
}
