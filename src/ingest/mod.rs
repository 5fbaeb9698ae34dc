// src/ingest/mod.rs
pub mod providers;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use tokio::task::JoinSet;

use crate::error::SourceFetchError;
use crate::ingest::types::{SourceAdapter, SourceBatch};
use crate::model::{CriteriaSet, Posting};

/// Maximum characters kept from any scraped text field.
pub const MAX_TEXT_CHARS: usize = 8000;

/// Normalize text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize curly quotes to ASCII
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace (includes NBSP)
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"[\s\u{00A0}]+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap
    if out.chars().count() > MAX_TEXT_CHARS {
        out = out.chars().take(MAX_TEXT_CHARS).collect();
    }
    out
}

/// Log and count a raw item that could not be turned into a posting.
pub(crate) fn skip_malformed(source: &str, reason: &str) {
    tracing::warn!(source, reason, "skipping malformed posting");
    counter!("source_malformed_total").increment(1);
}

/// Map a reqwest failure onto the source error taxonomy.
pub(crate) fn transport_error(source: &str, e: reqwest::Error) -> SourceFetchError {
    if e.is_timeout() {
        SourceFetchError::Timeout {
            source_name: source.to_string(),
            after: Duration::ZERO,
        }
    } else if let Some(status) = e.status() {
        SourceFetchError::Status {
            source_name: source.to_string(),
            status: status.as_u16(),
        }
    } else {
        SourceFetchError::Transport {
            source_name: source.to_string(),
            message: e.to_string(),
        }
    }
}

/// GET a page body as text.
pub(crate) async fn http_get_text(
    client: &reqwest::Client,
    url: reqwest::Url,
    source: &str,
) -> Result<String, SourceFetchError> {
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| transport_error(source, e))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(SourceFetchError::Status {
            source_name: source.to_string(),
            status: status.as_u16(),
        });
    }
    resp.text().await.map_err(|e| transport_error(source, e))
}

#[derive(Debug, Clone, Copy)]
pub struct FetchPolicy {
    pub timeout: Duration,
    pub max_postings: usize,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_postings: 100,
        }
    }
}

/// Outcome of fetching one source (including its single retry).
#[derive(Debug, Clone, Serialize)]
pub struct SourceAttempt {
    pub source: String,
    pub watch_company: Option<String>,
    pub tries: u8,
    pub fetched: usize,
    pub skipped: usize,
    pub error: Option<String>,
}

impl SourceAttempt {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Everything collected from all sources for one criteria set.
#[derive(Debug, Default)]
pub struct Collected {
    pub postings: Vec<Posting>,
    pub attempts: Vec<SourceAttempt>,
}

async fn fetch_bounded(
    adapter: &dyn SourceAdapter,
    criteria: &CriteriaSet,
    timeout: Duration,
) -> Result<SourceBatch, SourceFetchError> {
    match tokio::time::timeout(timeout, adapter.fetch(criteria)).await {
        Ok(res) => res,
        Err(_) => Err(SourceFetchError::Timeout {
            source_name: adapter.name().to_string(),
            after: timeout,
        }),
    }
}

/// Fetch one source under the time budget; a transient failure is retried once, immediately.
pub async fn fetch_with_retry(
    adapter: &dyn SourceAdapter,
    criteria: &CriteriaSet,
    policy: FetchPolicy,
) -> (SourceAttempt, Vec<Posting>) {
    let mut tries = 1u8;
    let mut res = fetch_bounded(adapter, criteria, policy.timeout).await;
    if let Err(e) = &res {
        if e.is_transient() {
            tracing::warn!(source = adapter.name(), error = %e, "transient source failure, retrying once");
            tries = 2;
            res = fetch_bounded(adapter, criteria, policy.timeout).await;
        }
    }

    let mut attempt = SourceAttempt {
        source: adapter.name().to_string(),
        watch_company: adapter.watch_company().map(str::to_string),
        tries,
        fetched: 0,
        skipped: 0,
        error: None,
    };

    match res {
        Ok(mut batch) => {
            batch.postings.truncate(policy.max_postings);
            attempt.fetched = batch.postings.len();
            attempt.skipped = batch.skipped;
            counter!("discover_postings_total").increment(batch.postings.len() as u64);
            tracing::info!(
                source = adapter.name(),
                fetched = attempt.fetched,
                skipped = attempt.skipped,
                criteria = %criteria.name,
                "source fetched"
            );
            (attempt, batch.postings)
        }
        Err(e) => {
            tracing::error!(source = adapter.name(), tries, error = %e, "source failed for this run");
            counter!("source_errors_total").increment(1);
            attempt.error = Some(e.to_string());
            (attempt, Vec::new())
        }
    }
}

/// Query all sources concurrently. One source failing never affects the others;
/// the order of the merged postings is unspecified.
pub async fn collect(
    adapters: &[Arc<dyn SourceAdapter>],
    criteria: &CriteriaSet,
    policy: FetchPolicy,
) -> Collected {
    let criteria = Arc::new(criteria.clone());
    let mut set = JoinSet::new();
    for adapter in adapters {
        let adapter = Arc::clone(adapter);
        let criteria = Arc::clone(&criteria);
        set.spawn(async move { fetch_with_retry(adapter.as_ref(), &criteria, policy).await });
    }

    let mut out = Collected::default();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((attempt, mut postings)) => {
                out.attempts.push(attempt);
                out.postings.append(&mut postings);
            }
            Err(e) => {
                // A panicking adapter is isolated like any other source failure.
                tracing::error!(error = %e, "source task aborted");
                counter!("source_errors_total").increment(1);
            }
        }
    }
    out
}
