// src/ingest/types.rs
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::SourceFetchError;
use crate::model::{CriteriaSet, Posting};

/// Postings returned by one fetch, plus how many raw items were malformed.
#[derive(Debug, Clone, Default)]
pub struct SourceBatch {
    pub postings: Vec<Posting>,
    pub skipped: usize,
}

/// One job source (a board feed or a watched careers page).
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch(&self, criteria: &CriteriaSet) -> Result<SourceBatch, SourceFetchError>;

    fn name(&self) -> &str;

    /// Company of the watchlist entry this adapter checks, if any.
    fn watch_company(&self) -> Option<&str> {
        None
    }
}

/// Longest accepted posting URL. Its identity key must fit one store text cell.
pub const MAX_URL_CHARS: usize = 1900;

/// Raw fields scraped from a source, before validation.
#[derive(Debug, Clone, Default)]
pub struct RawPosting {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub posted_date: Option<NaiveDate>,
    pub salary: Option<String>,
}

impl RawPosting {
    /// Normalize text fields; a posting without title or URL is malformed.
    pub fn into_posting(self, source: &str, now: DateTime<Utc>) -> Result<Posting, String> {
        let title = self
            .title
            .map(|t| super::normalize_text(&t))
            .filter(|t| !t.is_empty())
            .ok_or_else(|| "missing title".to_string())?;
        let url = self
            .url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| format!("missing url for '{title}'"))?;
        if url.chars().count() > MAX_URL_CHARS {
            return Err(format!("url over {MAX_URL_CHARS} chars for '{title}'"));
        }
        let company = self
            .company
            .map(|c| super::normalize_text(&c))
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "Unknown".to_string());

        Ok(Posting {
            title,
            company,
            location: self
                .location
                .map(|l| super::normalize_text(&l))
                .unwrap_or_default(),
            description: self
                .description
                .map(|d| super::normalize_text(&d))
                .unwrap_or_default(),
            url,
            source: source.to_string(),
            posted_date: self.posted_date,
            discovered_at: now,
            salary: self.salary.filter(|s| !s.trim().is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(url: &str) -> RawPosting {
        RawPosting {
            title: Some("Quant &amp; Risk Analyst".into()),
            company: Some("  ".into()),
            url: Some(url.into()),
            ..Default::default()
        }
    }

    #[test]
    fn normalizes_and_defaults_company() {
        let p = raw(" https://a.test/1 ").into_posting("Board", Utc::now()).unwrap();
        assert_eq!(p.title, "Quant & Risk Analyst");
        assert_eq!(p.company, "Unknown");
        assert_eq!(p.url, "https://a.test/1");
    }

    #[test]
    fn overlong_url_is_malformed() {
        let long = format!("https://a.test/{}", "x".repeat(MAX_URL_CHARS));
        let err = raw(&long).into_posting("Board", Utc::now()).unwrap_err();
        assert!(err.contains("url over"));
    }
}
