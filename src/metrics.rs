use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing query and ingestion activity.
#[derive(Default)]
pub struct PipelineMetrics {
    answers: AtomicU64,
    no_context: AtomicU64,
    failures: AtomicU64,
    ingestion_runs: AtomicU64,
    documents_indexed: AtomicU64,
    chunks_indexed: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a query answered with a summary.
    pub fn record_answer(&self) {
        self.answers.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a query for which nothing relevant was retrieved.
    pub fn record_no_context(&self) {
        self.no_context.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a query that failed.
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed index rebuild. Document and chunk counts reflect the latest index.
    pub fn record_ingestion(&self, documents: u64, chunks: u64) {
        self.ingestion_runs.fetch_add(1, Ordering::Relaxed);
        self.documents_indexed.store(documents, Ordering::Relaxed);
        self.chunks_indexed.store(chunks, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            answers: self.answers.load(Ordering::Relaxed),
            no_context: self.no_context.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            ingestion_runs: self.ingestion_runs.load(Ordering::Relaxed),
            documents_indexed: self.documents_indexed.load(Ordering::Relaxed),
            chunks_indexed: self.chunks_indexed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of the counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Queries answered with a summary since startup.
    pub answers: u64,
    /// Queries that retrieved nothing relevant.
    pub no_context: u64,
    /// Queries that failed.
    pub failures: u64,
    /// Index rebuilds completed since startup.
    pub ingestion_runs: u64,
    /// Documents contributing to the current index.
    pub documents_indexed: u64,
    /// Chunks in the current index.
    pub chunks_indexed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_query_outcomes() {
        let metrics = PipelineMetrics::new();
        metrics.record_answer();
        metrics.record_answer();
        metrics.record_no_context();
        metrics.record_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.answers, 2);
        assert_eq!(snapshot.no_context, 1);
        assert_eq!(snapshot.failures, 1);
    }

    #[test]
    fn ingestion_overwrites_index_counts() {
        let metrics = PipelineMetrics::new();
        metrics.record_ingestion(2, 40);
        metrics.record_ingestion(1, 12);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.ingestion_runs, 2);
        assert_eq!(snapshot.documents_indexed, 1);
        assert_eq!(snapshot.chunks_indexed, 12);
    }

    #[test]
    fn snapshot_starts_empty() {
        assert_eq!(PipelineMetrics::new().snapshot(), MetricsSnapshot::default());
    }
}
