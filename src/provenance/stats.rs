//! Per-graph operation counters and accumulated timings.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

/// Call count and total elapsed time for one operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OpTiming {
    pub calls: u64,
    pub total: Duration,
}

/// Counters kept by a provenance graph over its lifetime.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OperationStats {
    /// Statements successfully handed to the store.
    pub triples_written: u64,
    /// Statements the store rejected.
    pub failed_writes: u64,
    pub records_created: u64,
    pub metrics_attached: u64,
    /// Completed checkpoint cycles.
    pub checkpoints: u64,
    timings: BTreeMap<&'static str, OpTiming>,
}

impl OperationStats {
    pub(crate) fn record_timing(&mut self, op: &'static str, elapsed: Duration) {
        let timing = self.timings.entry(op).or_default();
        timing.calls += 1;
        timing.total += elapsed;
    }

    /// Timing for one operation name (`new_record`, `add_metric_to_version`, ...).
    pub fn timing(&self, op: &str) -> Option<OpTiming> {
        self.timings.get(op).copied()
    }

    pub fn timings(&self) -> impl Iterator<Item = (&'static str, OpTiming)> + '_ {
        self.timings.iter().map(|(op, t)| (*op, *t))
    }
}

impl std::fmt::Display for OperationStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "provenance operations")?;
        writeln!(f, "  triples:      {}", self.triples_written)?;
        writeln!(f, "  failed:       {}", self.failed_writes)?;
        writeln!(f, "  records:      {}", self.records_created)?;
        writeln!(f, "  metrics:      {}", self.metrics_attached)?;
        writeln!(f, "  checkpoints:  {}", self.checkpoints)?;
        for (op, timing) in &self.timings {
            writeln!(
                f,
                "  {op:<24} {:>6} calls {:>10.3} ms",
                timing.calls,
                timing.total.as_secs_f64() * 1000.0
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timings_accumulate() {
        let mut stats = OperationStats::default();
        stats.record_timing("new_record", Duration::from_millis(2));
        stats.record_timing("new_record", Duration::from_millis(3));

        let t = stats.timing("new_record").unwrap();
        assert_eq!(t.calls, 2);
        assert_eq!(t.total, Duration::from_millis(5));
        assert!(stats.timing("add_triple").is_none());
        assert!(stats.to_string().contains("new_record"));
    }
}
