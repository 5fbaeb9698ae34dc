// src/watcher.rs
//! Status watcher: a reconciliation loop diffing the store's current statuses
//! against the last observed ones (persisted as JSON between polls).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde::{Deserialize, Serialize};
use tokio::{fs, time};

use crate::error::{PipelineError, SyncError};
use crate::generate::ArtifactGenerator;
use crate::model::{ApplicationRecord, Status};
use crate::store::{RecordField, RecordFilter, RecordStore};

/// Last observed status per identity key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservedStatusCache {
    #[serde(default)]
    observed: BTreeMap<String, Status>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl ObservedStatusCache {
    /// A missing file is an empty cache. A corrupt one is an error: starting
    /// empty would re-trigger generation for every Apply/Interview record.
    pub async fn load(path: &Path) -> Result<Self, PipelineError> {
        match fs::read_to_string(path).await {
            Ok(s) => serde_json::from_str(&s)
                .map_err(|e| PipelineError::State(format!("{}: {e}", path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(PipelineError::State(format!("{}: {e}", path.display()))),
        }
    }

    /// Write to a temp file then rename, so a crash never leaves a half-written cache.
    pub async fn save(&mut self, path: &Path, now: DateTime<Utc>) -> Result<(), PipelineError> {
        self.updated_at = Some(now);
        let err = |e: std::io::Error| PipelineError::State(format!("{}: {e}", path.display()));
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).await.map_err(err)?;
        }
        let body = serde_json::to_vec_pretty(self)
            .map_err(|e| PipelineError::State(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, body).await.map_err(err)?;
        fs::rename(&tmp, path).await.map_err(err)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<Status> {
        self.observed.get(key).copied()
    }

    pub fn set(&mut self, key: &str, status: Status) {
        self.observed.insert(key.to_string(), status);
    }

    pub fn len(&self) -> usize {
        self.observed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observed.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PollReport {
    pub observed: usize,
    pub transitions: usize,
    pub generated: usize,
    pub prepared: usize,
    pub applied_stamped: usize,
    pub failures: usize,
    pub failed_keys: Vec<String>,
}

enum Outcome {
    Done,
    NoAction,
    Failed,
}

pub struct StatusWatcher {
    store: Arc<dyn RecordStore>,
    generator: Arc<dyn ArtifactGenerator>,
}

impl StatusWatcher {
    pub fn new(store: Arc<dyn RecordStore>, generator: Arc<dyn ArtifactGenerator>) -> Self {
        Self { store, generator }
    }

    /// One reconciliation pass. Only a status differing from the cached one is a
    /// transition; the cache entry is advanced only after the action succeeded, so a
    /// failed generation is retried on the next poll.
    pub async fn poll_once(
        &self,
        cache: &mut ObservedStatusCache,
        now: DateTime<Utc>,
    ) -> Result<PollReport, PipelineError> {
        self.store.ping().await.map_err(PipelineError::StoreUnavailable)?;
        let records = self
            .store
            .list_records(&RecordFilter::default())
            .await
            .map_err(PipelineError::StoreUnavailable)?;

        let mut report = PollReport {
            observed: records.len(),
            ..Default::default()
        };

        for record in &records {
            let previous = cache.get(&record.key);
            if previous == Some(record.status) {
                continue;
            }
            report.transitions += 1;
            tracing::info!(
                key = %record.key,
                id = %record.id,
                from = ?previous,
                to = %record.status,
                "status transition observed"
            );

            let outcome = match record.status {
                Status::Apply => self.on_apply(record, &mut report).await,
                Status::Interview => self.on_interview(record, &mut report).await,
                Status::Applied => self.on_applied(record, previous, now, &mut report).await,
                _ => Ok(Outcome::NoAction),
            };
            match outcome {
                Ok(Outcome::Done) => {
                    counter!("poll_actions_total", "status" => record.status.as_str()).increment(1);
                    cache.set(&record.key, record.status);
                }
                Ok(Outcome::NoAction) => cache.set(&record.key, record.status),
                Ok(Outcome::Failed) => {
                    report.failures += 1;
                    report.failed_keys.push(record.key.clone());
                }
                Err(e) => return Err(PipelineError::StoreUnavailable(e)),
            }
        }

        gauge!("poll_last_run_ts").set(now.timestamp() as f64);
        tracing::info!(
            observed = report.observed,
            transitions = report.transitions,
            generated = report.generated,
            prepared = report.prepared,
            failures = report.failures,
            "poll finished"
        );
        Ok(report)
    }

    /// A lost store connection aborts the poll; any other sync error fails this record only.
    fn sync_failure(record: &ApplicationRecord, e: SyncError) -> Result<Outcome, SyncError> {
        if e.is_unavailable() {
            return Err(e);
        }
        counter!("sync_errors_total").increment(1);
        tracing::error!(key = %record.key, id = %record.id, error = %e, "store write failed");
        Ok(Outcome::Failed)
    }

    async fn on_apply(&self, record: &ApplicationRecord, report: &mut PollReport) -> Result<Outcome, SyncError> {
        let links = match self.generator.application_materials(record).await {
            Ok(l) => l,
            Err(e) => {
                counter!("generation_failures_total").increment(1);
                tracing::error!(key = %record.key, id = %record.id, error = %e, "CV/cover letter generation failed");
                return Ok(Outcome::Failed);
            }
        };
        let mut fields = Vec::new();
        if let Some(u) = links.tailored_cv {
            fields.push(RecordField::TailoredCv(u));
        }
        if let Some(u) = links.cover_letter {
            fields.push(RecordField::CoverLetter(u));
        }
        match self.store.update_fields(&record.key, &fields).await {
            Ok(()) => {
                report.generated += 1;
                Ok(Outcome::Done)
            }
            Err(e) => Self::sync_failure(record, e),
        }
    }

    async fn on_interview(&self, record: &ApplicationRecord, report: &mut PollReport) -> Result<Outcome, SyncError> {
        let prep = match self.generator.interview_prep(record).await {
            Ok(p) => p,
            Err(e) => {
                counter!("generation_failures_total").increment(1);
                tracing::error!(key = %record.key, id = %record.id, error = %e, "interview prep generation failed");
                return Ok(Outcome::Failed);
            }
        };
        match self.store.upsert_interview_prep(&prep).await {
            Ok(()) => {
                report.prepared += 1;
                Ok(Outcome::Done)
            }
            Err(e) => Self::sync_failure(record, e),
        }
    }

    async fn on_applied(
        &self,
        record: &ApplicationRecord,
        previous: Option<Status>,
        now: DateTime<Utc>,
        report: &mut PollReport,
    ) -> Result<Outcome, SyncError> {
        // First sighting of a record already stamped: keep the original date.
        if previous.is_none() && record.applied_at.is_some() {
            return Ok(Outcome::NoAction);
        }
        match self
            .store
            .update_fields(&record.key, &[RecordField::AppliedAt(now)])
            .await
        {
            Ok(()) => {
                report.applied_stamped += 1;
                Ok(Outcome::Done)
            }
            Err(e) => Self::sync_failure(record, e),
        }
    }
}

/// Load the cache, poll once, save the cache (also after a failed poll, so
/// actions completed before the failure are not repeated).
pub async fn run_poll(watcher: &StatusWatcher, state_path: &Path) -> Result<PollReport, PipelineError> {
    let mut cache = ObservedStatusCache::load(state_path).await?;
    let now = Utc::now();
    let res = watcher.poll_once(&mut cache, now).await;
    cache.save(state_path, now).await?;
    res
}

/// Poll forever on a fixed interval. Tick failures are logged and the loop continues.
pub async fn watch(watcher: StatusWatcher, state_path: PathBuf, every: Duration) {
    let mut ticker = time::interval(every);
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if let Err(e) = run_poll(&watcher, &state_path).await {
            tracing::warn!(error = %e, "poll tick failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cache_roundtrips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state/observed.json");
        let mut c = ObservedStatusCache::load(&path).await.unwrap();
        assert!(c.is_empty());
        c.set("url:a", Status::Apply);
        c.save(&path, Utc::now()).await.unwrap();
        let back = ObservedStatusCache::load(&path).await.unwrap();
        assert_eq!(back.get("url:a"), Some(Status::Apply));
        assert_eq!(back.len(), 1);
    }

    #[tokio::test]
    async fn corrupt_cache_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("observed.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            ObservedStatusCache::load(&path).await,
            Err(PipelineError::State(_))
        ));
    }
}
