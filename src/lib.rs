// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # provio
//!
//! Versioned provenance capture for experiment runs, stored as RDF statements.
//!
//! ## Architecture
//!
//! - **Type registry** (`registry`): field name → category, backed by JSON category files
//! - **Statement store** (`graph`): oxigraph-backed store behind the `StatementStore` seam
//! - **Provenance graph** (`provenance`): version markers, records, metrics, identifier scoping
//! - **Checkpointing** (`provenance::checkpoint`): periodic serialize-then-reparse to disk
//!
//! ## Library usage
//!
//! ```no_run
//! use provio::config::ProvenanceConfig;
//! use provio::provenance::ProvenanceGraph;
//!
//! let mut graph = ProvenanceGraph::new(ProvenanceConfig::default()).unwrap();
//! graph
//!     .new_record("learning_rate", Some("Hyperparameters"), Some(0.01.into()))
//!     .unwrap();
//! graph.add_metric_to_version("TrainingAccuracy", 0.98, None).unwrap();
//! graph.serialize_to(std::path::Path::new("provenance.ttl")).unwrap();
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod provenance;
pub mod registry;
pub mod vocab;
