// src/dedup.rs
//! Exact-key deduplication of postings. No fuzzy matching: near-duplicates
//! from different boards stay distinct.

use std::collections::HashSet;
use std::fmt;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::model::Posting;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdentityKey {
    Url(String),
    TitleCompany { title: String, company: String },
}

static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

fn collapse(s: &str) -> String {
    RE_WS.replace_all(s.trim(), " ").to_lowercase()
}

/// Lowercase, drop query string and fragment, drop trailing slashes.
pub fn normalize_url(url: &str) -> Option<String> {
    let t = url.trim();
    let t = t.split('#').next().unwrap_or_default();
    let t = t.split('?').next().unwrap_or_default();
    let t = t.trim_end_matches('/');
    if t.is_empty() {
        None
    } else {
        Some(t.to_lowercase())
    }
}

impl IdentityKey {
    pub fn of(p: &Posting) -> Self {
        match normalize_url(&p.url) {
            Some(u) => IdentityKey::Url(u),
            None => IdentityKey::TitleCompany {
                title: collapse(&p.title),
                company: collapse(&p.company),
            },
        }
    }

    /// Parse the string form written by `Display` (as stored in the record store).
    pub fn parse(s: &str) -> Option<Self> {
        if let Some(u) = s.strip_prefix("url:") {
            return normalize_url(u).map(IdentityKey::Url);
        }
        let rest = s.strip_prefix("tc:")?;
        let (title, company) = rest.rsplit_once('|')?;
        Some(IdentityKey::TitleCompany {
            title: collapse(title),
            company: collapse(company),
        })
    }

    /// Short stable id (12 hex chars of SHA-256).
    pub fn record_id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.to_string().as_bytes());
        let digest = hasher.finalize();
        let mut out = String::with_capacity(12);
        for b in digest.iter().take(6) {
            use std::fmt::Write as _;
            let _ = write!(&mut out, "{:02x}", b);
        }
        out
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKey::Url(u) => write!(f, "url:{u}"),
            IdentityKey::TitleCompany { title, company } => write!(f, "tc:{title}|{company}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupVerdict {
    New,
    Duplicate,
}

/// Run-scoped set of known identity keys. `claim` is the single mutation point,
/// so concurrent callers agree on which of them admitted a key first.
#[derive(Debug, Default)]
pub struct Deduplicator {
    known: Mutex<HashSet<IdentityKey>>,
}

impl Deduplicator {
    pub fn new<I: IntoIterator<Item = IdentityKey>>(known: I) -> Self {
        Self {
            known: Mutex::new(known.into_iter().collect()),
        }
    }

    pub fn classify(&self, key: &IdentityKey) -> DedupVerdict {
        let g = self.known.lock().expect("dedup mutex poisoned");
        if g.contains(key) {
            DedupVerdict::Duplicate
        } else {
            DedupVerdict::New
        }
    }

    /// Mark a key as known. Returns false when it already was.
    pub fn claim(&self, key: IdentityKey) -> bool {
        self.known.lock().expect("dedup mutex poisoned").insert(key)
    }

    pub fn len(&self) -> usize {
        self.known.lock().expect("dedup mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
