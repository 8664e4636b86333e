//! Periodic checkpointing: serialize the store, then re-parse the same file.
//!
//! The cycle is a flush-and-reload, not a truncation: re-parsing merges the
//! file back into the store, which already holds every statement, so the
//! store content is unchanged and the file is a complete durable copy.

use std::path::{Path, PathBuf};

use crate::error::GraphError;
use crate::graph::{GraphFormat, StatementStore, StoreResult};

use super::GraphResult;

/// Counts writes and runs a checkpoint cycle every `period` writes.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    period: u64,
    path: PathBuf,
    format: GraphFormat,
    writes: u64,
    cycles: u64,
}

impl CheckpointManager {
    pub fn new(period: u64, path: impl Into<PathBuf>, format: GraphFormat) -> GraphResult<Self> {
        if period == 0 {
            return Err(GraphError::InvalidConfig {
                message: "checkpoint period must be at least 1".into(),
            });
        }
        Ok(Self {
            period,
            path: path.into(),
            format,
            writes: 0,
            cycles: 0,
        })
    }

    /// Count one successful write; run a cycle when the count reaches a
    /// multiple of the period. Returns whether a cycle ran.
    ///
    /// Takes the store mutably, so no other write can interleave with the cycle.
    pub fn observe<S: StatementStore + ?Sized>(&mut self, store: &mut S) -> StoreResult<bool> {
        self.writes += 1;
        if self.writes % self.period != 0 {
            return Ok(false);
        }
        self.run(store)?;
        Ok(true)
    }

    /// Serialize to the checkpoint path and parse it back.
    ///
    /// A serialization failure may leave a partially written file behind.
    pub fn run<S: StatementStore + ?Sized>(&mut self, store: &mut S) -> StoreResult<()> {
        store.serialize(&self.path, self.format)?;
        let reloaded = store.parse(&self.path, self.format)?;
        self.cycles += 1;

        tracing::info!(
            cycle = self.cycles,
            writes = self.writes,
            statements = store.len()?,
            reloaded,
            path = %self.path.display(),
            "checkpoint complete"
        );
        Ok(())
    }

    pub fn period(&self) -> u64 {
        self.period
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> GraphFormat {
        self.format
    }

    /// Writes observed so far.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    /// Completed cycles so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{OxigraphStore, Statement};
    use tempfile::TempDir;

    fn write_n(
        manager: &mut CheckpointManager,
        store: &mut OxigraphStore,
        n: u64,
    ) -> u64 {
        let mut fired = 0;
        for i in 0..n {
            store
                .add(&Statement::literal(
                    "http://example.org/x",
                    "http://example.org/hasValue",
                    i.to_string(),
                ))
                .unwrap();
            if manager.observe(&mut *store).unwrap() {
                fired += 1;
            }
        }
        fired
    }

    #[test]
    fn fires_floor_n_over_period() {
        let dir = TempDir::new().unwrap();
        for period in [1, 3, 10] {
            for n in [0, 1, 9, 10, 25] {
                let path = dir.path().join(format!("cp-{period}-{n}.ttl"));
                let mut manager = CheckpointManager::new(period, &path, GraphFormat::Turtle).unwrap();
                let mut store = OxigraphStore::in_memory().unwrap();

                let fired = write_n(&mut manager, &mut store, n);
                assert_eq!(fired, n / period, "period {period}, n {n}");
                assert_eq!(manager.cycles(), n / period);
                assert_eq!(manager.writes(), n);
            }
        }
    }

    #[test]
    fn cycle_keeps_store_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("periodic.nt");
        let mut manager = CheckpointManager::new(5, &path, GraphFormat::NTriples).unwrap();
        let mut store = OxigraphStore::in_memory().unwrap();

        write_n(&mut manager, &mut store, 12);
        assert_eq!(store.len().unwrap(), 12);

        // The file holds the state as of write 10.
        let mut reloaded = OxigraphStore::in_memory().unwrap();
        assert_eq!(reloaded.parse(&path, GraphFormat::NTriples).unwrap(), 10);
    }

    #[test]
    fn zero_period_rejected() {
        assert!(CheckpointManager::new(0, "x.ttl", GraphFormat::Turtle).is_err());
    }

    #[test]
    fn unwritable_path_surfaces_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing-dir").join("cp.ttl");
        let mut manager = CheckpointManager::new(1, &path, GraphFormat::Turtle).unwrap();
        let mut store = OxigraphStore::in_memory().unwrap();
        store
            .add(&Statement::literal("http://e/x", "http://e/p", "1"))
            .unwrap();

        assert!(manager.observe(&mut store).is_err());
        assert_eq!(manager.cycles(), 0);
        assert_eq!(store.len().unwrap(), 1);
    }
}
