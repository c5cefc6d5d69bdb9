//! Turning SPARQL binding tables into identifier → label maps.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ConnectorError, ConnectorResult};
use crate::results::SparqlResults;

/// Variable holding the subject URI in every search template.
pub const SUBJECT_VAR: &str = "e";
/// Variable holding the matched label in `search_by_label`.
pub const LABEL_VAR: &str = "shortLabel";
/// Variable holding the matched comment in the legacy `search_entities` query.
pub const COMMENT_VAR: &str = "shortComment";

/// Message shown in place of an empty result table.
pub const NO_MATCHES_MESSAGE: &str = "No matches found.";

/// Short identifier of a resource: everything after the final `/` of its URI.
///
/// A URI ending in `/` yields an empty identifier; that is a data problem in
/// the store and is passed through unchanged.
pub fn entity_id(uri: &str) -> &str {
    uri.rsplit('/').next().unwrap_or(uri)
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityLabel {
    pub id: String,
    pub label: String,
}

/// Ordered identifier → label map. Never empty when produced by a search.
///
/// Entries keep the order their identifier was first seen in; inserting an
/// identifier again replaces its label in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityLabels {
    entries: Vec<EntityLabel>,
    index: HashMap<String, usize>,
}

impl EntityLabels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the label for `id`. Returns the previous label.
    pub fn insert(&mut self, id: impl Into<String>, label: impl Into<String>) -> Option<String> {
        let id = id.into();
        let label = label.into();
        match self.index.get(&id) {
            Some(&pos) => Some(std::mem::replace(&mut self.entries[pos].label, label)),
            None => {
                self.index.insert(id.clone(), self.entries.len());
                self.entries.push(EntityLabel { id, label });
                None
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.index
            .get(id)
            .map(|&pos| self.entries[pos].label.as_str())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|e| (e.id.as_str(), e.label.as_str()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.id.as_str())
    }

    pub fn entries(&self) -> &[EntityLabel] {
        &self.entries
    }
}

impl Serialize for EntityLabels {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EntityLabels {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows = Vec::<EntityLabel>::deserialize(deserializer)?;
        if rows.is_empty() {
            return Err(serde::de::Error::custom(
                "a found outcome needs at least one hit; use no_matches instead",
            ));
        }
        Ok(rows.into_iter().collect())
    }
}

impl FromIterator<EntityLabel> for EntityLabels {
    fn from_iter<I: IntoIterator<Item = EntityLabel>>(iter: I) -> Self {
        let mut labels = EntityLabels::new();
        for row in iter {
            labels.insert(row.id, row.label);
        }
        labels
    }
}

/// Result of a search: hits, or the explicit no-match sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "hits", rename_all = "snake_case")]
pub enum SearchOutcome {
    Found(EntityLabels),
    NoMatches,
}

impl SearchOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, SearchOutcome::Found(_))
    }

    /// The hits, if any.
    pub fn labels(&self) -> Option<&EntityLabels> {
        match self {
            SearchOutcome::Found(labels) => Some(labels),
            SearchOutcome::NoMatches => None,
        }
    }

    pub fn into_labels(self) -> Option<EntityLabels> {
        match self {
            SearchOutcome::Found(labels) => Some(labels),
            SearchOutcome::NoMatches => None,
        }
    }
}

impl fmt::Display for SearchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchOutcome::Found(labels) => write!(f, "{} hit(s)", labels.len()),
            SearchOutcome::NoMatches => f.write_str(NO_MATCHES_MESSAGE),
        }
    }
}

/// Build the identifier → text map from a SELECT result.
///
/// Every row must bind both `subject_var` and `text_var`. Zero rows yield
/// [`SearchOutcome::NoMatches`], never an empty map.
pub fn extract_labels(
    results: &SparqlResults,
    subject_var: &str,
    text_var: &str,
) -> ConnectorResult<SearchOutcome> {
    let rows = results
        .bindings()
        .ok_or_else(|| ConnectorError::InvalidResponse {
            message: "expected a SELECT result table, got a boolean result".into(),
        })?;

    let mut labels = EntityLabels::new();
    for (n, row) in rows.iter().enumerate() {
        let term = |var: &str| {
            row.get(var).ok_or_else(|| ConnectorError::InvalidResponse {
                message: format!("row {n} does not bind ?{var}"),
            })
        };
        let uri = &term(subject_var)?.value;
        let text = &term(text_var)?.value;
        labels.insert(entity_id(uri), text.as_str());
    }

    if labels.is_empty() {
        Ok(SearchOutcome::NoMatches)
    } else {
        Ok(SearchOutcome::Found(labels))
    }
}
