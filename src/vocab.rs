//! Vocabulary: namespace IRIs, predicates and classes used by the provenance graph.

/// Default namespace for minted record, metric and version IRIs.
pub const PROVIO_NS: &str = "http://www.w3.org/ns/provio#";

/// Default prefix bound to [`PROVIO_NS`] when serializing.
pub const PROVIO_PREFIX: &str = "provio";

/// W3C PROV-O namespace.
pub const PROV_NS: &str = "http://www.w3.org/ns/prov#";

/// RDF namespace.
pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

// Predicates
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// Local names of the provio predicates, resolved against the configured base.
pub const BELONGS_TO: &str = "belongsTo";
pub const HAS_VALUE: &str = "hasValue";
pub const HAS_METRICS: &str = "hasMetrics";

// Classes
pub const VERSION_CLASS: &str = "Version";

/// Resolves local names and CURIEs against a base namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    base: String,
    prefix: String,
}

impl Namespace {
    pub fn new(base: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            prefix: prefix.into(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// IRI for a local name under the base namespace.
    pub fn iri(&self, local: &str) -> String {
        format!("{}{local}", self.base)
    }

    /// Strip the base namespace from an IRI, if it lives there.
    pub fn local<'a>(&self, iri: &'a str) -> Option<&'a str> {
        iri.strip_prefix(self.base.as_str())
    }

    /// Expand a term to a full IRI.
    ///
    /// Accepts absolute IRIs (anything with `://` or a `urn:` scheme), CURIEs
    /// using the configured prefix, `prov:` or `rdf:`, and bare local names.
    pub fn expand(&self, term: &str) -> String {
        if term.contains("://") || term.starts_with("urn:") {
            return term.to_string();
        }
        if let Some((prefix, local)) = term.split_once(':') {
            if prefix == self.prefix {
                return self.iri(local);
            }
            match prefix {
                "prov" => return format!("{PROV_NS}{local}"),
                "rdf" => return format!("{RDF_NS}{local}"),
                _ => {}
            }
        }
        self.iri(term)
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new(PROVIO_NS, PROVIO_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_known_prefixes() {
        let ns = Namespace::default();
        assert_eq!(ns.expand("provio:hasValue"), format!("{PROVIO_NS}hasValue"));
        assert_eq!(ns.expand("rdf:type"), RDF_TYPE);
        assert_eq!(ns.expand("prov:Entity"), format!("{PROV_NS}Entity"));
    }

    #[test]
    fn bare_names_live_under_base() {
        let ns = Namespace::new("https://example.org/run#", "run");
        assert_eq!(ns.expand("learning_rate"), "https://example.org/run#learning_rate");
        assert_eq!(ns.expand("run:epochs"), "https://example.org/run#epochs");
        assert_eq!(ns.local("https://example.org/run#epochs"), Some("epochs"));
    }

    #[test]
    fn absolute_iris_pass_through() {
        let ns = Namespace::default();
        assert_eq!(ns.expand("http://purl.org/dc/elements/1.1/creator"), "http://purl.org/dc/elements/1.1/creator");
        assert_eq!(ns.expand("urn:uuid:1234"), "urn:uuid:1234");
    }
}
