// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # daki-kg
//!
//! Free-text search over the DAKI knowledge graph: drugs by `rdfs:label`,
//! adverse drug events by `skos:prefLabel`, against a SPARQL endpoint such
//! as a GraphDB repository.
//!
//! ## Architecture
//!
//! - **Templates** (`template`): named `.sparql` files, loaded once and reused
//! - **Sanitizing** (`sanitize`): literal escaping, language/predicate validation
//! - **Execution** (`executor`, `local`): SPARQL protocol over HTTP, or an
//!   embedded oxigraph store
//! - **Extraction** (`extract`): binding tables → identifier/label maps
//! - **Session** (`session`): identifiers surfaced during this session
//!
//! ## Library usage
//!
//! ```no_run
//! use daki_kg::config::ConnectorConfig;
//! use daki_kg::connector::GraphDbConnector;
//! use daki_kg::extract::SearchOutcome;
//!
//! let connector = GraphDbConnector::new(ConnectorConfig::new(
//!     "http://localhost:7200/repositories/dakikg",
//! ));
//! match connector.search_entities("Ibuprofen", "en").unwrap() {
//!     SearchOutcome::Found(hits) => {
//!         for (id, label) in hits.iter() {
//!             println!("{id}\t{label}");
//!         }
//!     }
//!     SearchOutcome::NoMatches => println!("No matches found."),
//! }
//! ```

pub mod config;
pub mod connector;
pub mod error;
pub mod executor;
pub mod extract;
pub mod local;
pub mod results;
pub mod sanitize;
pub mod session;
pub mod template;
