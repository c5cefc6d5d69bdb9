//! SPARQL 1.1 Query Results JSON model.
//!
//! Mirrors the W3C `application/sparql-results+json` document: a `head` with
//! the projected variables, then either a `results.bindings` table (SELECT)
//! or a single `boolean` (ASK).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A parsed query result document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparqlResults {
    #[serde(default)]
    pub head: Head,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Bindings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boolean: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Head {
    #[serde(default)]
    pub vars: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub link: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bindings {
    pub bindings: Vec<Binding>,
}

/// One result row: variable name → bound term. Unbound variables are absent.
pub type Binding = HashMap<String, RdfTerm>;

/// Kind of an RDF term in a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermKind {
    Uri,
    Literal,
    /// Some stores still emit the SPARQL 1.0 spelling for typed literals.
    #[serde(rename = "typed-literal")]
    TypedLiteral,
    Bnode,
    Triple,
}

/// A bound RDF term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RdfTerm {
    #[serde(rename = "type")]
    pub kind: TermKind,
    pub value: String,
    #[serde(rename = "xml:lang", default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
}

impl RdfTerm {
    pub fn uri(value: impl Into<String>) -> Self {
        Self {
            kind: TermKind::Uri,
            value: value.into(),
            lang: None,
            datatype: None,
        }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            kind: TermKind::Literal,
            value: value.into(),
            lang: None,
            datatype: None,
        }
    }

    pub fn lang_literal(value: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            lang: Some(lang.into()),
            ..Self::literal(value)
        }
    }
}

impl SparqlResults {
    /// Build a SELECT result from variable names and rows.
    pub fn select(vars: &[&str], rows: Vec<Binding>) -> Self {
        Self {
            head: Head {
                vars: vars.iter().map(|v| v.to_string()).collect(),
                link: Vec::new(),
            },
            results: Some(Bindings { bindings: rows }),
            boolean: None,
        }
    }

    /// Build an ASK result.
    pub fn ask(value: bool) -> Self {
        Self {
            boolean: Some(value),
            ..Self::default()
        }
    }

    /// Result rows of a SELECT query, or `None` for ASK results.
    pub fn bindings(&self) -> Option<&[Binding]> {
        self.results.as_ref().map(|r| r.bindings.as_slice())
    }
}
