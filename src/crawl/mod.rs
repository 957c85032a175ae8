// src/crawl/mod.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::{collections::BTreeMap, sync::Arc};
use tokio::{sync::mpsc, time::Instant};
use tracing::{error, info, warn};

use crate::error::StoreError;
use crate::model::CanonicalRecord;
use crate::store::{Store, UpsertOutcome};

/// Write-only handle an adapter emits records through.
#[derive(Clone)]
pub struct Sink {
    tx: mpsc::Sender<CanonicalRecord>,
    observed_at: DateTime<Utc>,
}

impl Sink {
    /// Timestamp of the crawl cycle; stamp it on every emitted record.
    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    /// Send one record to the aggregation point. Returns `false` if the
    /// crawl has stopped collecting.
    pub async fn emit(&self, record: CanonicalRecord) -> bool {
        self.tx.send(record).await.is_ok()
    }
}

/// One data source. Decides what to fetch and how to read it.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Name used in logs and reports.
    fn source(&self) -> &str;

    /// Emit zero or more records. An `Err` means this source contributed
    /// nothing useful this cycle; it never affects other adapters.
    async fn run(&self, sink: Sink) -> anyhow::Result<()>;
}

/// Result of one crawl cycle.
#[derive(Debug, Default)]
pub struct CrawlReport {
    pub records: Vec<CanonicalRecord>,
    pub failed_sources: Vec<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpsertStats {
    pub inserted: usize,
    pub replaced: usize,
    pub unchanged: usize,
}

/// Runs every registered adapter concurrently and merges their output.
pub struct Crawler {
    adapters: Vec<Arc<dyn Adapter>>,
    sink_capacity: usize,
}

impl Crawler {
    pub fn new(sink_capacity: usize) -> Self {
        Self {
            adapters: Vec::new(),
            sink_capacity: sink_capacity.max(1),
        }
    }

    pub fn register(&mut self, adapter: Arc<dyn Adapter>) -> &mut Self {
        self.adapters.push(adapter);
        self
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Start all adapters at once and wait for every one of them.
    ///
    /// A failing or panicking adapter is logged and listed in
    /// `failed_sources`; records it emitted before failing are kept.
    pub async fn run(&self) -> CrawlReport {
        let observed_at = Utc::now();
        let start = Instant::now();
        info!(adapters = self.adapters.len(), "crawl started");

        // ─── 1) one producer task per adapter ────────────────────────────
        let (tx, mut rx) = mpsc::channel::<CanonicalRecord>(self.sink_capacity);
        let mut handles = Vec::with_capacity(self.adapters.len());
        for adapter in &self.adapters {
            let adapter = Arc::clone(adapter);
            let sink = Sink {
                tx: tx.clone(),
                observed_at,
            };
            let source = adapter.source().to_string();
            let handle = tokio::spawn(async move {
                let started = Instant::now();
                match adapter.run(sink).await {
                    Ok(()) => {
                        info!(source = %adapter.source(), elapsed = ?started.elapsed(), "adapter done");
                        true
                    }
                    Err(e) => {
                        error!(source = %adapter.source(), error = %format!("{e:#}"), "adapter failed");
                        false
                    }
                }
            });
            handles.push((source, handle));
        }
        // drop the original sender so `rx.recv()` ends once every adapter is done
        drop(tx);

        // ─── 2) drain the sink while producers run ───────────────────────
        let mut records = Vec::new();
        while let Some(record) = rx.recv().await {
            records.push(record);
        }

        // ─── 3) collect per-adapter outcomes ─────────────────────────────
        let (sources, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        let mut failed_sources = Vec::new();
        for (source, joined) in sources.into_iter().zip(join_all(handles).await) {
            match joined {
                Ok(true) => {}
                Ok(false) => failed_sources.push(source),
                Err(e) => {
                    error!(source = %source, error = %e, "adapter panicked");
                    failed_sources.push(source);
                }
            }
        }

        let mut per_source: BTreeMap<&str, usize> = BTreeMap::new();
        for r in &records {
            *per_source.entry(r.source()).or_default() += 1;
        }
        for (source, count) in &per_source {
            info!(source = %source, records = count, "collected");
        }
        if !failed_sources.is_empty() {
            warn!(failed = ?failed_sources, "some sources produced no complete result");
        }
        info!(records = records.len(), elapsed = ?start.elapsed(), "crawl finished");

        CrawlReport {
            records,
            failed_sources,
        }
    }

    /// Run one cycle and upsert every merged record into `store`.
    pub async fn run_into(&self, store: &dyn Store) -> Result<(CrawlReport, UpsertStats), StoreError> {
        let report = self.run().await;
        let mut stats = UpsertStats::default();
        for record in &report.records {
            match store.upsert(record.clone()).await? {
                UpsertOutcome::Inserted => stats.inserted += 1,
                UpsertOutcome::Replaced { .. } => stats.replaced += 1,
                UpsertOutcome::Unchanged => stats.unchanged += 1,
            }
        }
        info!(
            inserted = stats.inserted,
            replaced = stats.replaced,
            unchanged = stats.unchanged,
            "store updated"
        );
        Ok((report, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::init_tracing;
    use crate::model::{Kind, Term};
    use crate::store::MemoryStore;
    use std::time::Duration;

    /// Emits one list rate per term, pausing between emits.
    struct Emitting {
        name: String,
        terms: Vec<Term>,
    }

    #[async_trait]
    impl Adapter for Emitting {
        fn source(&self) -> &str {
            &self.name
        }

        async fn run(&self, sink: Sink) -> anyhow::Result<()> {
            for term in &self.terms {
                let record =
                    CanonicalRecord::builder(&self.name, Kind::ListRate, *term, 3.0, sink.observed_at())
                        .build()?;
                sink.emit(record).await;
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl Adapter for Failing {
        fn source(&self) -> &str {
            "failing"
        }

        async fn run(&self, _sink: Sink) -> anyhow::Result<()> {
            anyhow::bail!("anchor text not found")
        }
    }

    struct Panicking;

    #[async_trait]
    impl Adapter for Panicking {
        fn source(&self) -> &str {
            "panicking"
        }

        async fn run(&self, _sink: Sink) -> anyhow::Result<()> {
            panic!("adapter bug")
        }
    }

    fn emitting(name: &str, terms: &[Term]) -> Arc<dyn Adapter> {
        Arc::new(Emitting {
            name: name.to_string(),
            terms: terms.to_vec(),
        })
    }

    #[tokio::test]
    async fn failures_are_contained_per_adapter() {
        init_tracing();
        let mut crawler = Crawler::new(16);
        crawler
            .register(emitting("a", &[Term::OneYear, Term::TwoYears]))
            .register(Arc::new(Failing))
            .register(Arc::new(Panicking))
            .register(emitting("b", &[Term::ThreeMonths]));

        let report = crawler.run().await;
        assert_eq!(report.records.len(), 3);
        let mut failed = report.failed_sources.clone();
        failed.sort();
        assert_eq!(failed, vec!["failing", "panicking"]);
    }

    #[tokio::test]
    async fn per_adapter_order_is_preserved() {
        init_tracing();
        let mut crawler = Crawler::new(1);
        crawler.register(emitting("a", &Term::ALL));
        let report = crawler.run().await;
        let terms: Vec<Term> = report.records.iter().map(|r| r.term()).collect();
        assert_eq!(terms, Term::ALL.to_vec());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adapters_into_store() {
        init_tracing();
        const ADAPTERS: usize = 12;
        let mut crawler = Crawler::new(4);
        for i in 0..ADAPTERS {
            crawler.register(emitting(&format!("bank-{i}"), &Term::ALL));
        }

        let store = MemoryStore::new();
        let (report, stats) = crawler.run_into(&store).await.unwrap();
        let expected = ADAPTERS * Term::ALL.len();
        assert_eq!(report.records.len(), expected);
        assert_eq!(stats.inserted, expected);
        assert_eq!(store.get_all().await.unwrap().len(), expected);

        // a second cycle replaces nothing new
        let (_, stats) = crawler.run_into(&store).await.unwrap();
        assert_eq!(stats.inserted, 0);
        assert_eq!(stats.unchanged, expected);
        assert_eq!(store.len().unwrap(), expected);
    }

    #[tokio::test]
    async fn empty_crawler_completes() {
        init_tracing();
        let crawler = Crawler::new(8);
        assert!(crawler.is_empty());
        let report = crawler.run().await;
        assert!(report.records.is_empty());
        assert!(report.failed_sources.is_empty());
    }
}
