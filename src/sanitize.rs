//! Input sanitizing and validation for query parameters.
//!
//! Free text is escaped before it is spliced into a SPARQL string literal.
//! Enumerated parameters (language tag, label predicate) are checked against
//! closed sets so nothing outside them ever reaches a template.

use std::fmt;
use std::str::FromStr;

use crate::error::{ConnectorError, ConnectorResult};

/// Escape a value for embedding inside a double-quoted SPARQL string literal.
///
/// Backslashes are doubled first, then double quotes are escaped. The reverse
/// order would double the backslashes just inserted in front of the quotes.
pub fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Language tags the knowledge graph carries labels in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[default]
    En,
    Nl,
}

impl Language {
    pub const ALLOWED: &'static str = "en, nl";

    /// The lowercase tag substituted for `qLang`.
    pub fn as_str(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Nl => "nl",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate_language(s)
    }
}

/// Trim and lowercase `lang`, rejecting anything outside `{en, nl}`.
pub fn validate_language(lang: &str) -> ConnectorResult<Language> {
    let normalized = lang.trim().to_lowercase();
    match normalized.as_str() {
        "en" => Ok(Language::En),
        "nl" => Ok(Language::Nl),
        _ => Err(ConnectorError::InvalidArgument {
            parameter: "language",
            value: normalized,
            expected: Language::ALLOWED,
        }),
    }
}

/// The relation a label search matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelPredicate {
    /// `rdfs:label`, used for drug entities.
    RdfsLabel,
    /// `skos:prefLabel`, used for adverse events.
    SkosPrefLabel,
}

impl LabelPredicate {
    pub const ALLOWED: &'static str = "rdfs:label, skos:prefLabel";

    /// The prefixed name substituted for `qPred`.
    pub fn as_str(self) -> &'static str {
        match self {
            LabelPredicate::RdfsLabel => "rdfs:label",
            LabelPredicate::SkosPrefLabel => "skos:prefLabel",
        }
    }
}

impl fmt::Display for LabelPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LabelPredicate {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate_predicate(s)
    }
}

/// Trim `predicate` and accept only `rdfs:label` or `skos:prefLabel`.
///
/// Prefixed names are case-sensitive, so no case folding happens here.
pub fn validate_predicate(predicate: &str) -> ConnectorResult<LabelPredicate> {
    let trimmed = predicate.trim();
    match trimmed {
        "rdfs:label" => Ok(LabelPredicate::RdfsLabel),
        "skos:prefLabel" => Ok(LabelPredicate::SkosPrefLabel),
        _ => Err(ConnectorError::InvalidArgument {
            parameter: "predicate",
            value: trimmed.to_string(),
            expected: LabelPredicate::ALLOWED,
        }),
    }
}
