// tests/ingest_collect.rs
//
// Concurrent collection: per-source timeout, single retry on transient
// failures, per-source cap, isolation between sources.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use jobhunter::config::Settings;
use jobhunter::error::SourceFetchError;
use jobhunter::ingest::types::{SourceAdapter, SourceBatch};
use jobhunter::ingest::{collect, fetch_with_retry, FetchPolicy};
use jobhunter::model::{CriteriaSet, Posting};

fn posting(n: usize, source: &str) -> Posting {
    Posting {
        title: format!("Quant Analyst {n}"),
        company: "Acme".into(),
        location: "Paris".into(),
        description: String::new(),
        url: format!("https://{source}.test/job/{n}"),
        source: source.into(),
        posted_date: None,
        discovered_at: Utc::now(),
        salary: None,
    }
}

fn criteria() -> CriteriaSet {
    Settings::default().fallback_criteria()
}

fn policy(ms: u64, max: usize) -> FetchPolicy {
    FetchPolicy {
        timeout: Duration::from_millis(ms),
        max_postings: max,
    }
}

struct Fixed {
    name: &'static str,
    count: usize,
}

#[async_trait]
impl SourceAdapter for Fixed {
    async fn fetch(&self, _c: &CriteriaSet) -> Result<SourceBatch, SourceFetchError> {
        Ok(SourceBatch {
            postings: (0..self.count).map(|n| posting(n, self.name)).collect(),
            skipped: 1,
        })
    }
    fn name(&self) -> &str {
        self.name
    }
}

struct Hanging {
    calls: AtomicUsize,
}

#[async_trait]
impl SourceAdapter for Hanging {
    async fn fetch(&self, _c: &CriteriaSet) -> Result<SourceBatch, SourceFetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(SourceBatch::default())
    }
    fn name(&self) -> &str {
        "Hanging"
    }
    fn watch_company(&self) -> Option<&str> {
        Some("Slow Corp")
    }
}

/// Fails with a transport error on the first call only.
struct Flaky {
    calls: AtomicUsize,
}

#[async_trait]
impl SourceAdapter for Flaky {
    async fn fetch(&self, _c: &CriteriaSet) -> Result<SourceBatch, SourceFetchError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(SourceFetchError::Transport {
                source_name: "Flaky".into(),
                message: "connection reset".into(),
            });
        }
        Ok(SourceBatch {
            postings: vec![posting(1, "flaky")],
            skipped: 0,
        })
    }
    fn name(&self) -> &str {
        "Flaky"
    }
}

struct BadMarkup {
    calls: AtomicUsize,
}

#[async_trait]
impl SourceAdapter for BadMarkup {
    async fn fetch(&self, _c: &CriteriaSet) -> Result<SourceBatch, SourceFetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SourceFetchError::Parse {
            source_name: "BadMarkup".into(),
            message: "unexpected EOF".into(),
        })
    }
    fn name(&self) -> &str {
        "BadMarkup"
    }
}

#[tokio::test]
async fn timeout_is_retried_once_then_marked_failed() {
    let a = Hanging {
        calls: AtomicUsize::new(0),
    };
    let (attempt, postings) = fetch_with_retry(&a, &criteria(), policy(50, 100)).await;
    assert!(postings.is_empty());
    assert_eq!(attempt.tries, 2);
    assert_eq!(a.calls.load(Ordering::SeqCst), 2);
    assert!(attempt.error.as_deref().unwrap().contains("timed out"));
    assert_eq!(attempt.watch_company.as_deref(), Some("Slow Corp"));
}

#[tokio::test]
async fn transient_failure_recovers_on_retry() {
    let a = Flaky {
        calls: AtomicUsize::new(0),
    };
    let (attempt, postings) = fetch_with_retry(&a, &criteria(), policy(1_000, 100)).await;
    assert!(attempt.succeeded());
    assert_eq!(attempt.tries, 2);
    assert_eq!(postings.len(), 1);
}

#[tokio::test]
async fn parse_failure_is_not_retried() {
    let a = BadMarkup {
        calls: AtomicUsize::new(0),
    };
    let (attempt, _) = fetch_with_retry(&a, &criteria(), policy(1_000, 100)).await;
    assert!(!attempt.succeeded());
    assert_eq!(attempt.tries, 1);
    assert_eq!(a.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn one_source_hanging_does_not_block_the_others() {
    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
        Arc::new(Fixed {
            name: "board-a",
            count: 3,
        }),
        Arc::new(Hanging {
            calls: AtomicUsize::new(0),
        }),
        Arc::new(Fixed {
            name: "board-b",
            count: 2,
        }),
    ];
    let started = std::time::Instant::now();
    let out = collect(&adapters, &criteria(), policy(100, 100)).await;
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(out.postings.len(), 5);
    assert_eq!(out.attempts.len(), 3);
    let failed: Vec<_> = out.attempts.iter().filter(|a| !a.succeeded()).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].source, "Hanging");
}

#[tokio::test]
async fn per_source_cap_truncates() {
    let a = Fixed {
        name: "big",
        count: 10,
    };
    let (attempt, postings) = fetch_with_retry(&a, &criteria(), policy(1_000, 4)).await;
    assert_eq!(postings.len(), 4);
    assert_eq!(attempt.fetched, 4);
    assert_eq!(attempt.skipped, 1);
}
