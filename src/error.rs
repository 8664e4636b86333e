//! Rich diagnostic error types for the provenance store.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the provenance store.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, source spans) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum ProvError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum RegistryError {
    #[error("failed to load category file {path}: {message}")]
    #[diagnostic(
        code(provio::registry::config_load),
        help(
            "The file is not a flat JSON object mapping field names to category names. \
             It was skipped; fix its syntax and reload the registry."
        )
    )]
    ConfigLoad { path: String, message: String },

    #[error("failed to persist category file {path}")]
    #[diagnostic(
        code(provio::registry::persist),
        help(
            "The in-memory registry was updated but the category file could not be written. \
             Check that the registry directory exists and is writable."
        )
    )]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid category name: {category:?}")]
    #[diagnostic(
        code(provio::registry::invalid_category),
        help("Category names become file names; use a non-empty name without path separators.")
    )]
    InvalidCategory { category: String },

    #[error("cannot read registry directory {path}")]
    #[diagnostic(
        code(provio::registry::io),
        help("Ensure the registry directory exists and has read permissions.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Statement store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("unsupported graph format: {format}")]
    #[diagnostic(
        code(provio::store::unsupported_format),
        help("Supported formats are: turtle, xml, ntriples.")
    )]
    UnsupportedFormat { format: String },

    #[error("invalid IRI <{iri}>: {message}")]
    #[diagnostic(
        code(provio::store::invalid_iri),
        help(
            "Field, record and metric names become IRI path segments. \
             Avoid whitespace, angle brackets and quotes in names."
        )
    )]
    InvalidIri { iri: String, message: String },

    #[error("statement store error: {message}")]
    #[diagnostic(
        code(provio::store::storage),
        help("The underlying oxigraph store rejected the operation.")
    )]
    Storage { message: String },

    #[error("failed to serialize graph to {path}: {message}")]
    #[diagnostic(
        code(provio::store::serialization),
        help(
            "The output file may be partially written. \
             Check disk space and write permissions, then serialize again."
        )
    )]
    Serialization { path: String, message: String },

    #[error("failed to parse graph from {path}: {message}")]
    #[diagnostic(
        code(provio::store::parse),
        help(
            "The in-memory graph was left unchanged. \
             Check that the file exists and that the format matches its contents."
        )
    )]
    Parse { path: String, message: String },
}

// ---------------------------------------------------------------------------
// Provenance graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("unknown record: {record}")]
    #[diagnostic(
        code(provio::graph::unknown_record),
        help(
            "No type statement exists for this record in the current graph. \
             Create it with `new_record()` first; nothing was written."
        )
    )]
    UnknownRecord { record: String },

    #[error("failed to attach metric {metric} to {target}")]
    #[diagnostic(
        code(provio::graph::metric_attach),
        help(
            "Statements written before the failure remain in the graph. \
             Inspect the metric's statements and repair them manually if needed."
        )
    )]
    MetricAttach {
        metric: String,
        target: String,
        #[source]
        source: StoreError,
    },

    #[error("identifier scoping and periodic checkpointing cannot both be enabled")]
    #[diagnostic(
        code(provio::graph::config_conflict),
        help(
            "A checkpoint reload re-parses statements scoped to a different instance. \
             Disable `enable_id` or remove the `checkpoint` section."
        )
    )]
    ConfigConflict,

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(provio::graph::invalid_config), help("{message}"))]
    InvalidConfig { message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Coercion(#[from] CoercionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

/// A value could not be turned into a text literal.
#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum CoercionError {
    #[error("value for {field} has no textual representation")]
    #[diagnostic(
        code(provio::value::no_text),
        help("Null and non-finite numbers cannot be stored as literals.")
    )]
    NoText { field: String },

    #[error("value for {field} could not be converted: {message}")]
    #[diagnostic(
        code(provio::value::unconvertible),
        help("Provide a string, number, boolean or a JSON-serializable structure.")
    )]
    Unconvertible { field: String, message: String },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read provenance config: {path}")]
    #[diagnostic(
        code(provio::config::read),
        help("Ensure the config file exists and is valid TOML.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse provenance config {path}: {message}")]
    #[diagnostic(
        code(provio::config::parse),
        help("Check the TOML syntax in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write provenance config: {path}")]
    #[diagnostic(
        code(provio::config::write),
        help("Ensure you have write permissions to the target directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for functions returning provenance results.
pub type ProvResult<T> = std::result::Result<T, ProvError>;

/// Result type for registry operations.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Result type for configuration file operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_converts_to_prov_error() {
        let err = StoreError::UnsupportedFormat {
            format: "json-ld".into(),
        };
        let prov: ProvError = err.into();
        assert!(matches!(
            prov,
            ProvError::Store(StoreError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn registry_error_keeps_its_code_through_prov_error() {
        let prov: ProvError = RegistryError::InvalidCategory {
            category: "../x".into(),
        }
        .into();
        assert!(prov.to_string().contains("../x"));
        let code = Diagnostic::code(&prov).map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("provio::registry::invalid_category"));
    }

    #[test]
    fn graph_error_wraps_store_error() {
        let store_err = StoreError::Storage {
            message: "boom".into(),
        };
        let graph_err: GraphError = store_err.into();
        assert!(matches!(graph_err, GraphError::Store(StoreError::Storage { .. })));
    }

    #[test]
    fn metric_attach_keeps_context() {
        let err = GraphError::MetricAttach {
            metric: "accuracy".into(),
            target: "v1.0".into(),
            source: StoreError::Storage {
                message: "disk full".into(),
            },
        };
        let msg = format!("{err}");
        assert!(msg.contains("accuracy"));
        assert!(msg.contains("v1.0"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = RegistryError::ConfigLoad {
            path: "broken.json".into(),
            message: "expected value at line 1".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("broken.json"));
        assert!(msg.contains("line 1"));
    }
}
