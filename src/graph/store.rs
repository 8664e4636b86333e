//! In-memory RDF statement store backed by oxigraph.
//!
//! Holds the graph in oxigraph's default graph and round-trips it through
//! Turtle, RDF/XML or N-Triples files.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use oxigraph::io::{RdfFormat, RdfParser, RdfSerializer};
use oxigraph::model::{GraphName, GraphNameRef, Literal, NamedNode, Quad, Term};
use oxigraph::store::Store;

use crate::error::StoreError;
use crate::vocab::{PROV_NS, RDF_NS};

use super::{GraphFormat, Object, Statement, StatementStore, StoreResult};

/// oxigraph-backed [`StatementStore`].
pub struct OxigraphStore {
    store: Store,
    /// Prefix bindings applied when serializing.
    prefixes: Vec<(String, String)>,
}

impl OxigraphStore {
    /// Create an empty in-memory store with the `rdf` and `prov` prefixes bound.
    pub fn in_memory() -> StoreResult<Self> {
        let store = Store::new().map_err(|e| StoreError::Storage {
            message: format!("failed to create oxigraph store: {e}"),
        })?;
        Ok(Self {
            store,
            prefixes: vec![
                ("rdf".to_string(), RDF_NS.to_string()),
                ("prov".to_string(), PROV_NS.to_string()),
            ],
        })
    }

    /// Bind a serialization prefix. A later binding for the same name replaces it.
    pub fn with_prefix(mut self, name: impl Into<String>, iri: impl Into<String>) -> Self {
        let name = name.into();
        self.prefixes.retain(|(existing, _)| *existing != name);
        self.prefixes.push((name, iri.into()));
        self
    }

    pub fn prefixes(&self) -> &[(String, String)] {
        &self.prefixes
    }

    fn named_node(iri: &str) -> StoreResult<NamedNode> {
        NamedNode::new(iri).map_err(|e| StoreError::InvalidIri {
            iri: iri.to_string(),
            message: e.to_string(),
        })
    }

    fn rdf_format(format: GraphFormat) -> RdfFormat {
        match format {
            GraphFormat::Turtle => RdfFormat::Turtle,
            GraphFormat::RdfXml => RdfFormat::RdfXml,
            GraphFormat::NTriples => RdfFormat::NTriples,
        }
    }

    fn object_of(term: Term) -> Object {
        match term {
            Term::NamedNode(node) => Object::Uri(node.into_string()),
            Term::Literal(literal) => Object::Literal(literal.value().to_string()),
            // Blank nodes only show up in foreign files; keep their label.
            other => Object::Uri(other.to_string()),
        }
    }

    fn statement_of(quad: Quad) -> Statement {
        let subject = Self::object_of(Term::from(quad.subject));
        Statement {
            subject: subject.as_str().to_string(),
            predicate: quad.predicate.into_string(),
            object: Self::object_of(quad.object),
        }
    }
}

impl StatementStore for OxigraphStore {
    fn add(&mut self, statement: &Statement) -> StoreResult<()> {
        let subject = Self::named_node(&statement.subject)?;
        let predicate = Self::named_node(&statement.predicate)?;
        let object: Term = match &statement.object {
            Object::Uri(iri) => Self::named_node(iri)?.into(),
            Object::Literal(value) => Literal::new_simple_literal(value.as_str()).into(),
        };

        let quad = Quad::new(subject, predicate, object, GraphName::DefaultGraph);
        self.store.insert(&quad).map_err(|e| StoreError::Storage {
            message: format!("insert failed: {e}"),
        })?;
        Ok(())
    }

    fn query(&self, subject: Option<&str>, predicate: Option<&str>) -> StoreResult<Vec<Statement>> {
        let subject = subject.map(Self::named_node).transpose()?;
        let predicate = predicate.map(Self::named_node).transpose()?;

        let quads = self.store.quads_for_pattern(
            subject.as_ref().map(|s| s.as_ref().into()),
            predicate.as_ref().map(|p| p.as_ref()),
            None,
            Some(GraphNameRef::DefaultGraph),
        );

        let mut statements = Vec::new();
        for quad in quads {
            let quad = quad.map_err(|e| StoreError::Storage {
                message: format!("pattern query failed: {e}"),
            })?;
            statements.push(Self::statement_of(quad));
        }
        Ok(statements)
    }

    fn serialize(&self, path: &Path, format: GraphFormat) -> StoreResult<()> {
        let serialization_error = |message: String| StoreError::Serialization {
            path: path.display().to_string(),
            message,
        };

        let mut serializer = RdfSerializer::from_format(Self::rdf_format(format));
        for (name, iri) in &self.prefixes {
            serializer = serializer
                .with_prefix(name.as_str(), iri.as_str())
                .map_err(|e| serialization_error(format!("bad prefix {name}: {e}")))?;
        }

        let file = File::create(path).map_err(|e| serialization_error(e.to_string()))?;
        let mut writer = self
            .store
            .dump_graph_to_writer(GraphNameRef::DefaultGraph, serializer, BufWriter::new(file))
            .map_err(|e| serialization_error(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| serialization_error(e.to_string()))?;

        tracing::debug!(path = %path.display(), %format, "serialized graph");
        Ok(())
    }

    fn parse(&mut self, path: &Path, format: GraphFormat) -> StoreResult<usize> {
        let parse_error = |message: String| StoreError::Parse {
            path: path.display().to_string(),
            message,
        };

        let file = File::open(path).map_err(|e| parse_error(e.to_string()))?;

        // A malformed file must not leave partial statements in the store.
        let scratch = Store::new().map_err(|e| parse_error(e.to_string()))?;
        scratch
            .load_from_reader(
                RdfParser::from_format(Self::rdf_format(format)),
                BufReader::new(file),
            )
            .map_err(|e| parse_error(e.to_string()))?;

        let mut quads = Vec::new();
        for quad in scratch.iter() {
            quads.push(quad.map_err(|e| parse_error(e.to_string()))?);
        }

        let before = self.len()?;
        self.store.extend(quads).map_err(|e| StoreError::Storage {
            message: format!("merging parsed statements failed: {e}"),
        })?;
        let added = self.len()?.saturating_sub(before);

        tracing::debug!(path = %path.display(), %format, added, "parsed graph");
        Ok(added)
    }

    fn check_iri(&self, iri: &str) -> StoreResult<()> {
        Self::named_node(iri).map(|_| ())
    }

    fn len(&self) -> StoreResult<usize> {
        self.store.len().map_err(|e| StoreError::Storage {
            message: format!("counting statements failed: {e}"),
        })
    }
}

impl std::fmt::Debug for OxigraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OxigraphStore")
            .field("prefixes", &self.prefixes)
            .finish()
    }
}
