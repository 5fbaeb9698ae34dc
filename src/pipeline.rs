// src/pipeline.rs
//! Daily discovery run: sources -> dedup -> scorer -> gate -> record store.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde::Serialize;

use crate::dedup::{DedupVerdict, Deduplicator, IdentityKey};
use crate::error::{PipelineError, SyncError};
use crate::gate::{gate, Admission};
use crate::ingest::types::SourceAdapter;
use crate::ingest::{collect, FetchPolicy, SourceAttempt};
use crate::model::{ApplicationRecord, CriteriaSet, Posting, Status, WatchlistEntry};
use crate::scoring::{Assessment, Scorer};
use crate::store::{RecordStore, UpsertOutcome};

/// Builds the source adapters once the watchlist is known.
pub type SourceFactory =
    Arc<dyn Fn(&[WatchlistEntry]) -> Vec<Arc<dyn SourceAdapter>> + Send + Sync>;

#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoveryReport {
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub criteria: Vec<String>,
    pub sources: Vec<SourceAttempt>,
    pub fetched: usize,
    pub excluded: usize,
    pub duplicates: usize,
    pub scoring_failures: usize,
    pub discarded: usize,
    pub admitted: usize,
    pub strong: usize,
    pub sync_failures: usize,
    pub watchlist_touched: usize,
}

pub struct Discovery {
    store: Arc<dyn RecordStore>,
    scorer: Arc<Scorer>,
    sources: SourceFactory,
    policy: FetchPolicy,
    strong_threshold: u8,
    fallback_criteria: CriteriaSet,
}

/// Connectivity loss is run-fatal; anything else is logged and counted.
fn fatal_or_log(e: SyncError, what: &str) -> Result<(), PipelineError> {
    if e.is_unavailable() {
        return Err(PipelineError::StoreUnavailable(e));
    }
    counter!("sync_errors_total").increment(1);
    tracing::warn!(error = %e, "{what} failed");
    Ok(())
}

fn build_record(
    key: &IdentityKey,
    posting: Posting,
    assessment: Assessment,
    admission: Admission,
    criteria: &CriteriaSet,
) -> ApplicationRecord {
    ApplicationRecord {
        id: key.record_id(),
        key: key.to_string(),
        posting,
        score: assessment.breakdown,
        rationale: assessment.rationale,
        key_requirements: assessment.key_requirements,
        potential_concerns: assessment.potential_concerns,
        strong_match: admission.is_strong(),
        criteria: criteria.name.clone(),
        status: Status::New,
        links: Default::default(),
        applied_at: None,
        notes: None,
    }
}

impl Discovery {
    pub fn new(
        store: Arc<dyn RecordStore>,
        scorer: Arc<Scorer>,
        sources: SourceFactory,
        policy: FetchPolicy,
        strong_threshold: u8,
        fallback_criteria: CriteriaSet,
    ) -> Self {
        Self {
            store,
            scorer,
            sources,
            policy,
            strong_threshold,
            fallback_criteria,
        }
    }

    async fn active_criteria(&self) -> Result<Vec<CriteriaSet>, PipelineError> {
        let sets = match self.store.list_criteria().await {
            Ok(v) => v,
            Err(e) => {
                fatal_or_log(e, "loading criteria")?;
                Vec::new()
            }
        };
        let active: Vec<CriteriaSet> = sets.into_iter().filter(|c| c.active).collect();
        if active.is_empty() {
            tracing::info!(criteria = %self.fallback_criteria.name, "no active criteria in store, using defaults");
            return Ok(vec![self.fallback_criteria.clone()]);
        }
        Ok(active)
    }

    async fn known_keys(&self) -> Result<Deduplicator, PipelineError> {
        let raw = self
            .store
            .known_keys()
            .await
            .map_err(PipelineError::StoreUnavailable)?;
        let keys = raw.iter().filter_map(|k| {
            let parsed = IdentityKey::parse(k);
            if parsed.is_none() {
                tracing::debug!(key = %k, "ignoring unparseable stored key");
            }
            parsed
        });
        Ok(Deduplicator::new(keys))
    }

    pub async fn run(&self) -> Result<DiscoveryReport, PipelineError> {
        let mut report = DiscoveryReport {
            started_at: Some(Utc::now()),
            ..Default::default()
        };

        self.store.ping().await.map_err(PipelineError::StoreUnavailable)?;
        let criteria_sets = self.active_criteria().await?;
        let dedup = self.known_keys().await?;
        let watchlist = match self.store.list_watchlist().await {
            Ok(w) => w,
            Err(e) => {
                fatal_or_log(e, "loading watchlist")?;
                Vec::new()
            }
        };
        let adapters = (self.sources)(&watchlist);
        tracing::info!(
            sources = adapters.len(),
            criteria = criteria_sets.len(),
            known = dedup.len(),
            "discovery run starting"
        );

        for criteria in &criteria_sets {
            report.criteria.push(criteria.name.clone());
            self.run_criteria(criteria, &adapters, &dedup, &mut report)
                .await?;
        }

        let finished = Utc::now();
        report.finished_at = Some(finished);
        gauge!("discover_last_run_ts").set(finished.timestamp() as f64);
        tracing::info!(
            fetched = report.fetched,
            duplicates = report.duplicates,
            excluded = report.excluded,
            scoring_failures = report.scoring_failures,
            discarded = report.discarded,
            admitted = report.admitted,
            strong = report.strong,
            sync_failures = report.sync_failures,
            "discovery run finished"
        );
        Ok(report)
    }

    async fn run_criteria(
        &self,
        criteria: &CriteriaSet,
        adapters: &[Arc<dyn SourceAdapter>],
        dedup: &Deduplicator,
        report: &mut DiscoveryReport,
    ) -> Result<(), PipelineError> {
        let collected = collect(adapters, criteria, self.policy).await;

        // Watchlist staleness is tracked per attempt, whatever the outcome.
        for attempt in &collected.attempts {
            if let Some(company) = &attempt.watch_company {
                match self.store.touch_watchlist(company, Utc::now()).await {
                    Ok(()) => report.watchlist_touched += 1,
                    Err(e) => fatal_or_log(e, "updating watchlist last-checked")?,
                }
            }
        }
        report.fetched += collected.postings.len();
        report.sources.extend(collected.attempts);

        let mut seen_here: HashSet<IdentityKey> = HashSet::new();
        for posting in collected.postings {
            if criteria.excludes(&posting.company) {
                report.excluded += 1;
                tracing::debug!(company = %posting.company, criteria = %criteria.name, "excluded company");
                continue;
            }

            let key = IdentityKey::of(&posting);
            if !seen_here.insert(key.clone()) || dedup.classify(&key) == DedupVerdict::Duplicate {
                report.duplicates += 1;
                counter!("discover_duplicates_total").increment(1);
                continue;
            }

            let assessment = match self.scorer.score(&posting, criteria).await {
                Ok(a) => a,
                Err(_) => {
                    report.scoring_failures += 1;
                    continue;
                }
            };

            let total = assessment.breakdown.total();
            let admission = gate(total, criteria.min_score, self.strong_threshold);
            if admission == Admission::Discard {
                report.discarded += 1;
                counter!("discover_discarded_total").increment(1);
                tracing::debug!(key = %key, total, min = criteria.min_score, "below threshold, discarded");
                continue;
            }

            // Another criteria set may have admitted the same key meanwhile.
            if !dedup.claim(key.clone()) {
                report.duplicates += 1;
                counter!("discover_duplicates_total").increment(1);
                continue;
            }

            let record = build_record(&key, posting, assessment, admission, criteria);
            match self.store.upsert_record(&record).await {
                Ok(UpsertOutcome::Created) => {
                    report.admitted += 1;
                    counter!("discover_admitted_total").increment(1);
                    if admission.is_strong() {
                        report.strong += 1;
                    }
                    tracing::info!(
                        key = %record.key,
                        id = %record.id,
                        total,
                        strong = admission.is_strong(),
                        title = %record.posting.title,
                        company = %record.posting.company,
                        "posting admitted"
                    );
                }
                Ok(UpsertOutcome::AlreadyPresent) => {
                    report.duplicates += 1;
                    counter!("discover_duplicates_total").increment(1);
                }
                Err(e) if e.is_unavailable() => return Err(PipelineError::StoreUnavailable(e)),
                Err(e) => {
                    report.sync_failures += 1;
                    counter!("sync_errors_total").increment(1);
                    tracing::error!(key = %record.key, id = %record.id, error = %e, "upsert failed");
                }
            }
        }
        Ok(())
    }
}
