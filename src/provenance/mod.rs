//! Versioned provenance graph: records, metrics and version markers as statements.
//!
//! A [`ProvenanceGraph`] owns one [`StatementStore`] and, optionally, a
//! [`CheckpointManager`]. Every domain call decomposes into primitive writes:
//!
//! | call | statements |
//! |---|---|
//! | first domain write | `<v1.0> rdf:type provio:Version` (once per instance) |
//! | [`new_record`](ProvenanceGraph::new_record) | type, belongs-to-version, has-value |
//! | [`add_metric_to_version`](ProvenanceGraph::add_metric_to_version) | has-value, belongs-to, reciprocal has-metrics |
//! | [`add_metric_to_record`](ProvenanceGraph::add_metric_to_record) | same, owned by an existing record |
//!
//! With identifier scoping on, record and metric names are suffixed with the
//! instance identifier (`learning_rate_<id>`) so graphs sharing a store never
//! collide.

pub mod checkpoint;
pub mod stats;
pub mod value;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::config::ProvenanceConfig;
use crate::error::{CoercionError, GraphError, StoreError};
use crate::graph::{GraphFormat, Object, OxigraphStore, Statement, StatementStore, StoreResult};
use crate::registry::{DEFAULT_CATEGORY, TypeRegistry};
use crate::vocab::{BELONGS_TO, HAS_METRICS, HAS_VALUE, Namespace, RDF_TYPE, VERSION_CLASS};

pub use checkpoint::CheckpointManager;
pub use stats::OperationStats;

/// Result type for provenance graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Normalize a version label to its `v<label>` form.
pub fn normalize_version(label: &str) -> String {
    let label = label.trim();
    if label.starts_with('v') {
        label.to_string()
    } else {
        format!("v{label}")
    }
}

/// Random 128-bit hex token used for identifier scoping.
pub fn random_identifier() -> String {
    format!("{:032x}", rand::random::<u128>())
}

/// Whether the one-time version marker has been written yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VersionMarker {
    Pending,
    Written,
}

/// Outcome of [`ProvenanceGraph::new_record`].
#[derive(Debug, Clone)]
pub struct RecordReport {
    /// IRI of the record.
    pub subject: String,
    /// Category the record was typed with.
    pub category: String,
    /// Statements written for the record (marker excluded).
    pub statements: usize,
    /// Set when the value could not be coerced; the record exists without a value.
    pub coercion_error: Option<CoercionError>,
}

/// The versioned record/metric model over a statement store.
pub struct ProvenanceGraph<S: StatementStore = OxigraphStore> {
    store: S,
    namespace: Namespace,
    format: GraphFormat,
    versioning: bool,
    version: String,
    marker: VersionMarker,
    identifier: Option<String>,
    checkpoint: Option<CheckpointManager>,
    /// First checkpoint failure within the current operation.
    checkpoint_error: Option<StoreError>,
    registry: Option<Arc<TypeRegistry>>,
    /// Set by the first domain write; later label/identifier changes are not retroactive.
    written: bool,
    stats: OperationStats,
}

impl ProvenanceGraph<OxigraphStore> {
    /// Create a graph over a fresh in-memory oxigraph store.
    ///
    /// Fails without constructing anything if the configuration is invalid,
    /// including [`GraphError::ConfigConflict`] for identifier scoping
    /// combined with periodic checkpointing.
    pub fn new(config: ProvenanceConfig) -> GraphResult<Self> {
        config.validate()?;
        let store = OxigraphStore::in_memory()?.with_prefix(&config.prefix, &config.base_uri);
        Self::with_store(store, config)
    }
}

impl<S: StatementStore> ProvenanceGraph<S> {
    /// Create a graph over a caller-supplied store.
    pub fn with_store(mut store: S, config: ProvenanceConfig) -> GraphResult<Self> {
        let format = config.validate()?;

        let checkpoint = config
            .checkpoint
            .as_ref()
            .map(|cp| CheckpointManager::new(cp.period, &cp.path, format))
            .transpose()?;

        let identifier = config
            .enable_id
            .then(|| config.identifier.clone().unwrap_or_else(random_identifier));

        if let Some(legacy) = &config.load_from {
            if legacy.exists() {
                let merged = store.parse(legacy, format)?;
                tracing::info!(path = %legacy.display(), merged, "loaded existing provenance graph");
            } else {
                tracing::warn!(path = %legacy.display(), "existing provenance graph not found, starting empty");
            }
        }

        let version = normalize_version(&config.version);
        tracing::info!(
            version = version.as_str(),
            identifier = identifier.as_deref().unwrap_or("-"),
            %format,
            checkpoint_period = checkpoint.as_ref().map(|cp| cp.period()).unwrap_or(0),
            "initialized provenance graph"
        );

        Ok(Self {
            store,
            namespace: Namespace::new(config.base_uri, config.prefix),
            format,
            versioning: config.versioning,
            version,
            marker: VersionMarker::Pending,
            identifier,
            checkpoint,
            checkpoint_error: None,
            registry: None,
            written: false,
            stats: OperationStats::default(),
        })
    }

    /// Classify fields through a shared type registry.
    pub fn with_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    // -----------------------------------------------------------------------
    // Naming
    // -----------------------------------------------------------------------

    fn scoped(&self, name: &str) -> String {
        match &self.identifier {
            Some(id) => format!("{name}_{id}"),
            None => name.to_string(),
        }
    }

    fn predicate(&self, local: &str) -> String {
        self.namespace.iri(local)
    }

    /// IRI of the current version.
    pub fn version_iri(&self) -> String {
        self.namespace.iri(&self.version)
    }

    /// IRI a record named `field` gets in this instance.
    pub fn record_iri(&self, field: &str) -> String {
        self.namespace.iri(&self.scoped(field))
    }

    fn metric_iri(&self, owner_local: &str, metric: &str) -> String {
        self.namespace.iri(&format!("{owner_local}/{}", self.scoped(metric)))
    }

    fn classify(&self, field: &str) -> String {
        self.registry
            .as_ref()
            .map(|r| r.classify(field))
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Single write path: store, count, maybe checkpoint.
    ///
    /// A failed checkpoint cycle does not fail the write; the first such error
    /// is held until the enclosing operation [settles](Self::settle).
    fn write(&mut self, statement: Statement) -> StoreResult<()> {
        if let Err(e) = self.store.add(&statement) {
            self.stats.failed_writes += 1;
            return Err(e);
        }
        self.stats.triples_written += 1;

        if let Some(checkpoint) = self.checkpoint.as_mut() {
            match checkpoint.observe(&mut self.store) {
                Ok(true) => self.stats.checkpoints += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(error = %e, path = %checkpoint.path().display(), "checkpoint cycle failed");
                    if self.checkpoint_error.is_none() {
                        self.checkpoint_error = Some(e);
                    }
                }
            }
        }
        Ok(())
    }

    /// Finish a public operation: surface a checkpoint failure held during it.
    ///
    /// An operation error takes precedence; the held checkpoint error is dropped
    /// either way so it never leaks into the next call.
    fn settle<T>(&mut self, result: GraphResult<T>) -> GraphResult<T> {
        match (result, self.checkpoint_error.take()) {
            (Ok(_), Some(e)) => Err(e.into()),
            (result, _) => result,
        }
    }

    /// Write the version marker on the first domain write.
    fn begin_domain_write(&mut self) -> StoreResult<()> {
        self.written = true;
        if !self.versioning || self.marker == VersionMarker::Written {
            return Ok(());
        }
        let marker = Statement::uri(
            self.version_iri(),
            RDF_TYPE,
            self.namespace.iri(VERSION_CLASS),
        );
        self.write(marker)?;
        self.marker = VersionMarker::Written;
        tracing::debug!(version = self.version.as_str(), "wrote version marker");
        Ok(())
    }

    /// Write a raw statement. Terms may be IRIs, known CURIEs or local names.
    ///
    /// Raw writes count toward checkpointing but do not write the version marker.
    pub fn add_triple(&mut self, subject: &str, predicate: &str, object: Object) -> GraphResult<()> {
        let object = match object {
            Object::Uri(term) => Object::Uri(self.namespace.expand(&term)),
            literal => literal,
        };
        let statement = Statement::new(
            self.namespace.expand(subject),
            self.namespace.expand(predicate),
            object,
        );
        let result = self.write(statement).map_err(GraphError::from);
        self.settle(result)
    }

    /// Create a record: type statement, belongs-to-version (if versioning) and
    /// has-value (if a value is given and coercible).
    ///
    /// The category comes from the registry when not given. A value that
    /// cannot be coerced to text is reported in the returned
    /// [`RecordReport`]; the record is still created. Field and category
    /// names that do not form valid IRIs are rejected before any write.
    ///
    /// A checkpoint cycle failing part-way does not cut the record short: all
    /// of its statements are written and the checkpoint error is returned.
    pub fn new_record(
        &mut self,
        field: &str,
        category: Option<&str>,
        value: Option<Value>,
    ) -> GraphResult<RecordReport> {
        let started = Instant::now();
        let result = self.write_record(field, category, value);
        if result.is_ok() {
            self.stats.record_timing("new_record", started.elapsed());
        }
        self.settle(result)
    }

    fn write_record(
        &mut self,
        field: &str,
        category: Option<&str>,
        value: Option<Value>,
    ) -> GraphResult<RecordReport> {
        let (literal, coercion_error) = match value.as_ref().map(|v| value::literal_text(field, v)) {
            Some(Ok(text)) => (Some(text), None),
            Some(Err(e)) => {
                tracing::warn!(field, error = %e, "record value not stored");
                (None, Some(e))
            }
            None => (None, None),
        };

        let category = category
            .map(str::to_string)
            .unwrap_or_else(|| self.classify(field));
        let subject = self.record_iri(field);
        let category_iri = self.namespace.expand(&category);
        self.store.check_iri(&subject)?;
        self.store.check_iri(&category_iri)?;

        self.begin_domain_write()?;

        self.write(Statement::uri(&subject, RDF_TYPE, category_iri))?;
        let mut statements = 1;

        if self.versioning {
            self.write(Statement::uri(
                &subject,
                self.predicate(BELONGS_TO),
                self.version_iri(),
            ))?;
            statements += 1;
        }

        if let Some(text) = literal {
            self.write(Statement::literal(&subject, self.predicate(HAS_VALUE), text))?;
            statements += 1;
        }

        self.stats.records_created += 1;
        Ok(RecordReport {
            subject,
            category,
            statements,
            coercion_error,
        })
    }

    /// Attach a metric to a version (the current one by default).
    ///
    /// Returns the metric's IRI. Coercion failures and metric names that do
    /// not form valid IRIs are reported before any write; store failures
    /// mid-way surface as [`GraphError::MetricAttach`] and leave the
    /// statements already written in place.
    pub fn add_metric_to_version(
        &mut self,
        metric: &str,
        value: impl Into<Value>,
        version: Option<&str>,
    ) -> GraphResult<String> {
        let started = Instant::now();
        let result = self.write_version_metric(metric, value.into(), version);
        if result.is_ok() {
            self.stats.record_timing("add_metric_to_version", started.elapsed());
        }
        self.settle(result)
    }

    fn write_version_metric(&mut self, metric: &str, value: Value, version: Option<&str>) -> GraphResult<String> {
        if !self.versioning {
            return Err(GraphError::InvalidConfig {
                message: "versioning is disabled; attach the metric to a record instead".into(),
            });
        }
        let text = value::literal_text(metric, &value)?;

        let version_local = version
            .map(normalize_version)
            .unwrap_or_else(|| self.version.clone());
        let owner = self.namespace.iri(&version_local);
        let subject = self.metric_iri(&version_local, metric);
        self.store.check_iri(&owner)?;
        self.store.check_iri(&subject)?;

        self.begin_domain_write()?;
        self.attach_metric(metric, &subject, &owner, text)?;
        Ok(subject)
    }

    /// Attach a metric to a record created earlier with [`new_record`](Self::new_record).
    ///
    /// Fails with [`GraphError::UnknownRecord`], writing nothing, when the
    /// record has no type statement in the store (a name that cannot form an
    /// IRI can never have one).
    pub fn add_metric_to_record(
        &mut self,
        record: &str,
        metric: &str,
        value: impl Into<Value>,
    ) -> GraphResult<String> {
        let started = Instant::now();
        let result = self.write_record_metric(record, metric, value.into());
        if result.is_ok() {
            self.stats.record_timing("add_metric_to_record", started.elapsed());
        }
        self.settle(result)
    }

    fn write_record_metric(&mut self, record: &str, metric: &str, value: Value) -> GraphResult<String> {
        let text = value::literal_text(metric, &value)?;

        let unknown = || GraphError::UnknownRecord {
            record: record.to_string(),
        };
        let owner = self.record_iri(record);
        match self.store.query(Some(&owner), Some(RDF_TYPE)) {
            Ok(types) if !types.is_empty() => {}
            Ok(_) | Err(StoreError::InvalidIri { .. }) => return Err(unknown()),
            Err(e) => return Err(e.into()),
        }

        let subject = self.metric_iri(&self.scoped(record), metric);
        self.store.check_iri(&subject)?;

        self.begin_domain_write()?;
        self.attach_metric(metric, &subject, &owner, text)?;
        Ok(subject)
    }

    fn attach_metric(&mut self, metric: &str, subject: &str, owner: &str, text: String) -> GraphResult<()> {
        let writes = [
            Statement::literal(subject, self.predicate(HAS_VALUE), text),
            Statement::uri(subject, self.predicate(BELONGS_TO), owner),
            Statement::uri(owner, self.predicate(HAS_METRICS), subject),
        ];
        for statement in writes {
            self.write(statement).map_err(|source| GraphError::MetricAttach {
                metric: metric.to_string(),
                target: owner.to_string(),
                source,
            })?;
        }
        self.stats.metrics_attached += 1;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Overrides
    // -----------------------------------------------------------------------

    /// Change the version label. Statements already written keep the old label.
    pub fn set_version(&mut self, label: &str) {
        let label = normalize_version(label);
        if self.written {
            tracing::warn!(
                from = self.version.as_str(),
                to = label.as_str(),
                "version changed after the first write; earlier statements keep the old label"
            );
        }
        self.version = label;
    }

    /// Enable identifier scoping with a fixed identifier.
    ///
    /// Rejected with [`GraphError::ConfigConflict`] when periodic
    /// checkpointing is configured.
    pub fn set_identifier(&mut self, id: impl Into<String>) -> GraphResult<()> {
        if self.checkpoint.is_some() {
            return Err(GraphError::ConfigConflict);
        }
        let id = id.into();
        if self.written {
            tracing::warn!(identifier = id.as_str(), "identifier changed after the first write");
        }
        self.identifier = Some(id);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Explicit checkpoint / restore
    // -----------------------------------------------------------------------

    /// Serialize the graph to `path` in the configured format.
    pub fn serialize_to(&self, path: &Path) -> GraphResult<()> {
        self.serialize_as(path, self.format)
    }

    /// Serialize the graph to `path` in an explicit format.
    pub fn serialize_as(&self, path: &Path, format: GraphFormat) -> GraphResult<()> {
        self.store.serialize(path, format)?;
        tracing::info!(path = %path.display(), %format, "serialized provenance graph");
        Ok(())
    }

    /// Merge the statements in `path` into the graph. Returns how many were new.
    pub fn load_from(&mut self, path: &Path, format: GraphFormat) -> GraphResult<usize> {
        Ok(self.store.parse(path, format)?)
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    /// Local names of every version marked in the store.
    pub fn versions(&self) -> GraphResult<Vec<String>> {
        let class = Object::Uri(self.namespace.iri(VERSION_CLASS));
        let mut versions: Vec<String> = self
            .store
            .query(None, Some(RDF_TYPE))?
            .into_iter()
            .filter(|s| s.object == class)
            .map(|s| {
                self.namespace
                    .local(&s.subject)
                    .map(str::to_string)
                    .unwrap_or(s.subject)
            })
            .collect();
        versions.sort();
        Ok(versions)
    }

    /// `(record IRI, category IRI)` for every typed, non-version subject.
    pub fn records(&self) -> GraphResult<Vec<(String, String)>> {
        let class = Object::Uri(self.namespace.iri(VERSION_CLASS));
        let mut records: Vec<(String, String)> = self
            .store
            .query(None, Some(RDF_TYPE))?
            .into_iter()
            .filter(|s| s.object != class)
            .map(|s| (s.subject, s.object.as_str().to_string()))
            .collect();
        records.sort();
        Ok(records)
    }

    /// Literal value of a subject, if any.
    pub fn value_of(&self, subject: &str) -> GraphResult<Option<String>> {
        Ok(self
            .store
            .query(Some(subject), Some(&self.predicate(HAS_VALUE)))?
            .into_iter()
            .find(|s| s.object.is_literal())
            .map(|s| s.object.as_str().to_string()))
    }

    /// `(metric IRI, value)` for every metric attached to `owner`.
    pub fn metrics_of(&self, owner: &str) -> GraphResult<Vec<(String, Option<String>)>> {
        let mut metrics = Vec::new();
        for statement in self.store.query(Some(owner), Some(&self.predicate(HAS_METRICS)))? {
            let metric = statement.object.as_str().to_string();
            let value = self.value_of(&metric)?;
            metrics.push((metric, value));
        }
        metrics.sort();
        Ok(metrics)
    }

    /// Every statement in the store.
    pub fn statements(&self) -> GraphResult<Vec<Statement>> {
        Ok(self.store.query(None, None)?)
    }

    /// Number of statements in the store.
    pub fn len(&self) -> GraphResult<usize> {
        Ok(self.store.len()?)
    }

    pub fn is_empty(&self) -> GraphResult<bool> {
        Ok(self.store.is_empty()?)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Current version label (`v<label>`).
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn format(&self) -> GraphFormat {
        self.format
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn checkpoint(&self) -> Option<&CheckpointManager> {
        self.checkpoint.as_ref()
    }

    pub fn stats(&self) -> &OperationStats {
        &self.stats
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether the version marker has been written by this instance.
    pub fn marker_written(&self) -> bool {
        self.marker == VersionMarker::Written
    }
}

impl<S: StatementStore> std::fmt::Debug for ProvenanceGraph<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvenanceGraph")
            .field("version", &self.version)
            .field("identifier", &self.identifier)
            .field("format", &self.format)
            .field("checkpoint", &self.checkpoint)
            .field("stats", &self.stats)
            .finish()
    }
}
