// src/store/mod.rs
//! Record store: the external system of record (Jobs, Watchlist, Criteria,
//! InterviewPrep tables) behind a narrow async interface.

pub mod notion;

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::SyncError;
use crate::model::{ApplicationRecord, CriteriaSet, InterviewPrep, Status, WatchlistEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UpsertOutcome {
    Created,
    /// A record with this key exists; it was left untouched.
    AlreadyPresent,
}

/// Read filter for the Jobs table. An empty status list means all statuses.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub statuses: Vec<Status>,
}

impl RecordFilter {
    pub fn matches(&self, r: &ApplicationRecord) -> bool {
        self.statuses.is_empty() || self.statuses.contains(&r.status)
    }
}

/// Fields the status watcher and generator may write. Posting and score fields
/// belong to discovery and are never updated.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordField {
    Status(Status),
    TailoredCv(String),
    CoverLetter(String),
    AppliedAt(DateTime<Utc>),
    Notes(String),
}

impl RecordField {
    pub fn apply(&self, r: &mut ApplicationRecord) {
        match self {
            RecordField::Status(s) => r.status = *s,
            RecordField::TailoredCv(u) => r.links.tailored_cv = Some(u.clone()),
            RecordField::CoverLetter(u) => r.links.cover_letter = Some(u.clone()),
            RecordField::AppliedAt(ts) => r.applied_at = Some(*ts),
            RecordField::Notes(n) => r.notes = Some(n.clone()),
        }
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Cheap connectivity probe; `SyncError::Unavailable` aborts a run.
    async fn ping(&self) -> Result<(), SyncError>;

    /// Identity keys (string form) of every record in the Jobs table.
    async fn known_keys(&self) -> Result<Vec<String>, SyncError>;

    /// Create the record unless its key is already present.
    async fn upsert_record(&self, record: &ApplicationRecord) -> Result<UpsertOutcome, SyncError>;

    async fn list_records(&self, filter: &RecordFilter) -> Result<Vec<ApplicationRecord>, SyncError>;

    async fn update_fields(&self, key: &str, fields: &[RecordField]) -> Result<(), SyncError>;

    async fn list_watchlist(&self) -> Result<Vec<WatchlistEntry>, SyncError>;

    async fn touch_watchlist(&self, company: &str, at: DateTime<Utc>) -> Result<(), SyncError>;

    async fn list_criteria(&self) -> Result<Vec<CriteriaSet>, SyncError>;

    /// One entry per job key, last write wins.
    async fn upsert_interview_prep(&self, prep: &InterviewPrep) -> Result<(), SyncError>;

    fn store_name(&self) -> &'static str;
}

#[derive(Debug, Default)]
struct Inner {
    records: BTreeMap<String, ApplicationRecord>,
    watchlist: Vec<WatchlistEntry>,
    criteria: Vec<CriteriaSet>,
    preps: BTreeMap<String, InterviewPrep>,
    rejected_keys: HashSet<String>,
}

/// In-process store used by `--dry-run` and tests.
#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    available: AtomicBool,
    upserts: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            available: AtomicBool::new(true),
            upserts: AtomicUsize::new(0),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_watchlist(self, entries: Vec<WatchlistEntry>) -> Self {
        self.inner.lock().expect("store mutex poisoned").watchlist = entries;
        self
    }

    pub fn with_criteria(self, sets: Vec<CriteriaSet>) -> Self {
        self.inner.lock().expect("store mutex poisoned").criteria = sets;
        self
    }

    pub fn with_records(self, records: Vec<ApplicationRecord>) -> Self {
        {
            let mut g = self.inner.lock().expect("store mutex poisoned");
            for r in records {
                g.records.insert(r.key.clone(), r);
            }
        }
        self
    }

    /// Simulate losing (or regaining) connectivity.
    pub fn set_available(&self, up: bool) {
        self.available.store(up, Ordering::SeqCst);
    }

    /// Make upserts of this key fail with `SyncError::Rejected`.
    pub fn reject_key(&self, key: &str) {
        self.inner
            .lock()
            .expect("store mutex poisoned")
            .rejected_keys
            .insert(key.to_string());
    }

    /// Simulate a user moving a card on the board.
    pub fn set_status(&self, key: &str, status: Status) -> bool {
        let mut g = self.inner.lock().expect("store mutex poisoned");
        match g.records.get_mut(key) {
            Some(r) => {
                r.status = status;
                true
            }
            None => false,
        }
    }

    pub fn record(&self, key: &str) -> Option<ApplicationRecord> {
        self.inner
            .lock()
            .expect("store mutex poisoned")
            .records
            .get(key)
            .cloned()
    }

    pub fn records(&self) -> Vec<ApplicationRecord> {
        self.inner
            .lock()
            .expect("store mutex poisoned")
            .records
            .values()
            .cloned()
            .collect()
    }

    pub fn watchlist(&self) -> Vec<WatchlistEntry> {
        self.inner.lock().expect("store mutex poisoned").watchlist.clone()
    }

    pub fn interview_prep(&self, key: &str) -> Option<InterviewPrep> {
        self.inner
            .lock()
            .expect("store mutex poisoned")
            .preps
            .get(key)
            .cloned()
    }

    /// Number of upsert calls that reached the store (created or not).
    pub fn upsert_calls(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), SyncError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SyncError::Unavailable("memory store switched off".to_string()))
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn ping(&self) -> Result<(), SyncError> {
        self.check()
    }

    async fn known_keys(&self) -> Result<Vec<String>, SyncError> {
        self.check()?;
        Ok(self
            .inner
            .lock()
            .expect("store mutex poisoned")
            .records
            .keys()
            .cloned()
            .collect())
    }

    async fn upsert_record(&self, record: &ApplicationRecord) -> Result<UpsertOutcome, SyncError> {
        self.check()?;
        self.upserts.fetch_add(1, Ordering::SeqCst);
        let mut g = self.inner.lock().expect("store mutex poisoned");
        if g.rejected_keys.contains(&record.key) {
            return Err(SyncError::Rejected {
                key: record.key.clone(),
                message: "rejected by test store".to_string(),
            });
        }
        if g.records.contains_key(&record.key) {
            return Ok(UpsertOutcome::AlreadyPresent);
        }
        g.records.insert(record.key.clone(), record.clone());
        Ok(UpsertOutcome::Created)
    }

    async fn list_records(&self, filter: &RecordFilter) -> Result<Vec<ApplicationRecord>, SyncError> {
        self.check()?;
        Ok(self
            .inner
            .lock()
            .expect("store mutex poisoned")
            .records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn update_fields(&self, key: &str, fields: &[RecordField]) -> Result<(), SyncError> {
        self.check()?;
        let mut g = self.inner.lock().expect("store mutex poisoned");
        let r = g
            .records
            .get_mut(key)
            .ok_or_else(|| SyncError::NotFound(key.to_string()))?;
        for f in fields {
            f.apply(r);
        }
        Ok(())
    }

    async fn list_watchlist(&self) -> Result<Vec<WatchlistEntry>, SyncError> {
        self.check()?;
        Ok(self.watchlist())
    }

    async fn touch_watchlist(&self, company: &str, at: DateTime<Utc>) -> Result<(), SyncError> {
        self.check()?;
        let mut g = self.inner.lock().expect("store mutex poisoned");
        let entry = g
            .watchlist
            .iter_mut()
            .find(|w| w.company.eq_ignore_ascii_case(company))
            .ok_or_else(|| SyncError::NotFound(company.to_string()))?;
        entry.last_checked = Some(at);
        Ok(())
    }

    async fn list_criteria(&self) -> Result<Vec<CriteriaSet>, SyncError> {
        self.check()?;
        Ok(self.inner.lock().expect("store mutex poisoned").criteria.clone())
    }

    async fn upsert_interview_prep(&self, prep: &InterviewPrep) -> Result<(), SyncError> {
        self.check()?;
        self.inner
            .lock()
            .expect("store mutex poisoned")
            .preps
            .insert(prep.job_key.clone(), prep.clone());
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArtifactLinks, Posting, ScoreBreakdown};

    fn record(key: &str) -> ApplicationRecord {
        ApplicationRecord {
            id: "abc".into(),
            key: key.into(),
            posting: Posting {
                title: "Quant".into(),
                company: "Acme".into(),
                location: "Paris".into(),
                description: String::new(),
                url: "https://a.test/1".into(),
                source: "test".into(),
                posted_date: None,
                discovered_at: Utc::now(),
                salary: None,
            },
            score: ScoreBreakdown::new(20.0, 20.0, 10.0, 5.0, 10.0, 5.0).unwrap(),
            rationale: String::new(),
            key_requirements: vec![],
            potential_concerns: vec![],
            strong_match: false,
            criteria: "default".into(),
            status: Status::New,
            links: ArtifactLinks::default(),
            applied_at: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn upsert_is_at_most_once_per_key() {
        let s = MemoryStore::new();
        assert_eq!(s.upsert_record(&record("k")).await.unwrap(), UpsertOutcome::Created);
        let mut changed = record("k");
        changed.rationale = "rescored".into();
        assert_eq!(s.upsert_record(&changed).await.unwrap(), UpsertOutcome::AlreadyPresent);
        assert_eq!(s.records().len(), 1);
        assert_eq!(s.record("k").unwrap().rationale, "");
    }

    #[tokio::test]
    async fn update_fields_overwrites_links() {
        let s = MemoryStore::new().with_records(vec![record("k")]);
        s.update_fields("k", &[RecordField::TailoredCv("u1".into())]).await.unwrap();
        s.update_fields("k", &[RecordField::TailoredCv("u2".into())]).await.unwrap();
        assert_eq!(s.record("k").unwrap().links.tailored_cv.as_deref(), Some("u2"));
        assert!(matches!(
            s.update_fields("missing", &[]).await,
            Err(SyncError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn unavailable_store_fails_everything() {
        let s = MemoryStore::new();
        s.set_available(false);
        assert!(s.ping().await.unwrap_err().is_unavailable());
        assert!(s.known_keys().await.is_err());
    }
}
