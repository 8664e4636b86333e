//! Statement graph: the subject-predicate-object data model and its storage seam.
//!
//! - [`Statement`] / [`Object`]: immutable facts; the object is either a
//!   reference (IRI) or a text literal
//! - [`StatementStore`]: the narrow capability interface the provenance layer
//!   writes through (add, query, serialize, parse)
//! - [`OxigraphStore`]: the in-memory, file-backed implementation over `oxigraph`

pub mod store;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub use store::OxigraphStore;

/// Result type for statement store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Object position of a statement: a reference or a literal value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Object {
    /// An IRI reference to another node.
    Uri(String),
    /// An untyped text literal.
    Literal(String),
}

impl Object {
    /// The raw text of the object, IRI or literal.
    pub fn as_str(&self) -> &str {
        match self {
            Object::Uri(s) | Object::Literal(s) => s,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Object::Literal(_))
    }
}

impl std::fmt::Display for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Object::Uri(iri) => write!(f, "<{iri}>"),
            Object::Literal(value) => write!(f, "{value:?}"),
        }
    }
}

/// A subject-predicate-object fact. Never updated in place.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Statement {
    /// Subject IRI.
    pub subject: String,
    /// Predicate IRI.
    pub predicate: String,
    /// Object: IRI or literal.
    pub object: Object,
}

impl Statement {
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: Object) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object,
        }
    }

    /// Statement whose object is an IRI reference.
    pub fn uri(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self::new(subject, predicate, Object::Uri(object.into()))
    }

    /// Statement whose object is a text literal.
    pub fn literal(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::new(subject, predicate, Object::Literal(value.into()))
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}> <{}> {} .", self.subject, self.predicate, self.object)
    }
}

/// Serialization formats understood by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphFormat {
    Turtle,
    #[serde(rename = "xml")]
    RdfXml,
    NTriples,
}

impl GraphFormat {
    /// Canonical lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            GraphFormat::Turtle => "turtle",
            GraphFormat::RdfXml => "xml",
            GraphFormat::NTriples => "ntriples",
        }
    }

    /// Conventional file extension.
    pub fn extension(self) -> &'static str {
        match self {
            GraphFormat::Turtle => "ttl",
            GraphFormat::RdfXml => "rdf",
            GraphFormat::NTriples => "nt",
        }
    }

    /// Guess a format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "ttl" | "turtle" => Some(GraphFormat::Turtle),
            "rdf" | "xml" | "owl" => Some(GraphFormat::RdfXml),
            "nt" | "ntriples" => Some(GraphFormat::NTriples),
            _ => None,
        }
    }
}

impl std::fmt::Display for GraphFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for GraphFormat {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "turtle" | "ttl" => Ok(GraphFormat::Turtle),
            "xml" | "rdfxml" | "rdf/xml" => Ok(GraphFormat::RdfXml),
            "ntriples" | "n-triples" | "nt" => Ok(GraphFormat::NTriples),
            _ => Err(StoreError::UnsupportedFormat {
                format: s.to_string(),
            }),
        }
    }
}

/// Capability interface over a statement-store engine.
///
/// Implementations perform no domain validation. The provenance layer owns
/// exactly one store and writes every statement through [`add`](Self::add).
pub trait StatementStore {
    /// Insert a statement. Inserting an existing statement is a no-op.
    fn add(&mut self, statement: &Statement) -> StoreResult<()>;

    /// All statements matching the subject/predicate pattern (`None` = wildcard).
    fn query(&self, subject: Option<&str>, predicate: Option<&str>) -> StoreResult<Vec<Statement>>;

    /// Write the whole graph to `path`.
    fn serialize(&self, path: &Path, format: GraphFormat) -> StoreResult<()>;

    /// Merge the statements in `path` into the store, returning how many were new.
    ///
    /// On error the store is left unchanged.
    fn parse(&mut self, path: &Path, format: GraphFormat) -> StoreResult<usize>;

    /// Number of statements held.
    fn len(&self) -> StoreResult<usize>;

    /// Check that `iri` is acceptable as a subject, predicate or reference
    /// object, without writing anything.
    fn check_iri(&self, _iri: &str) -> StoreResult<()> {
        Ok(())
    }

    fn is_empty(&self) -> StoreResult<bool> {
        self.len().map(|n| n == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_names_parse() {
        assert_eq!("turtle".parse::<GraphFormat>().unwrap(), GraphFormat::Turtle);
        assert_eq!("XML".parse::<GraphFormat>().unwrap(), GraphFormat::RdfXml);
        assert_eq!("nt".parse::<GraphFormat>().unwrap(), GraphFormat::NTriples);
    }

    #[test]
    fn unknown_format_rejected() {
        let err = "json-ld".parse::<GraphFormat>().unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedFormat { ref format } if format == "json-ld"));
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(
            GraphFormat::from_path(Path::new("prov.ttl")),
            Some(GraphFormat::Turtle)
        );
        assert_eq!(
            GraphFormat::from_path(Path::new("prov.nt")),
            Some(GraphFormat::NTriples)
        );
        assert_eq!(GraphFormat::from_path(Path::new("prov.json")), None);
    }

    #[test]
    fn statement_display() {
        let st = Statement::literal("http://a/x", "http://a/hasValue", "0.01");
        assert_eq!(st.to_string(), "<http://a/x> <http://a/hasValue> \"0.01\" .");
        assert!(st.object.is_literal());
    }
}
