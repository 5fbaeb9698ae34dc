// src/ingest/providers/career_page.rs
//! Careers page of a watchlist company: job links scraped straight from the HTML,
//! then each posting's own page for its description.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use scraper::{Html, Selector};
use tokio::task::JoinSet;

use crate::error::SourceFetchError;
use crate::ingest::types::{RawPosting, SourceAdapter, SourceBatch};
use crate::ingest::{http_get_text, normalize_text, skip_malformed};
use crate::model::{CriteriaSet, Posting, WatchlistEntry};

/// Href fragments that mark a link as a job posting.
const JOB_HREF_HINTS: &[&str] = &[
    "/job",
    "/career",
    "/position",
    "/opening",
    "/vacanc",
    "/offre",
    "gh_jid=",
    "lever.co/",
    "greenhouse.io/",
    "workable.com/",
];

const MIN_TITLE_CHARS: usize = 4;
const MAX_TITLE_CHARS: usize = 150;

/// Containers holding the posting text on a detail page, most specific first.
const DETAIL_SELECTORS: &[&str] = &[
    "[itemprop=description]",
    "#jobDescriptionText",
    ".job-description",
    ".description",
    "article",
    "main",
];
/// Shorter container text is page chrome, not a description.
const MIN_DESCRIPTION_CHARS: usize = 40;
const MAX_DETAIL_FETCHES: usize = 20;
const DETAIL_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_DETAIL_BUDGET: Duration = Duration::from_secs(20);

/// Posting text from a detail page, if a known container holds enough of it.
pub fn detail_description(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    DETAIL_SELECTORS.iter().find_map(|css| {
        let sel = Selector::parse(css).ok()?;
        let el = doc.select(&sel).next()?;
        let text = normalize_text(&el.text().collect::<Vec<_>>().join(" "));
        (text.chars().count() >= MIN_DESCRIPTION_CHARS).then_some(text)
    })
}

/// Replace the listing description with the detail page text. Returns false
/// (posting untouched) when the page has none.
fn apply_detail(posting: &mut Posting, html: &str) -> bool {
    match detail_description(html) {
        Some(d) => {
            posting.description = d;
            true
        }
        None => false,
    }
}

pub struct CareerPageAdapter {
    name: String,
    entry: WatchlistEntry,
    /// Wall-clock limit for all detail fetches of one run; keeps the source
    /// inside its own fetch timeout.
    detail_budget: Duration,
    mode: Mode,
}

enum Mode {
    Fixture {
        listing: String,
        details: HashMap<String, String>,
    },
    Http(reqwest::Client),
}

impl CareerPageAdapter {
    pub fn new(entry: WatchlistEntry, client: reqwest::Client) -> Self {
        Self {
            name: format!("Careers: {}", entry.company),
            entry,
            detail_budget: DEFAULT_DETAIL_BUDGET,
            mode: Mode::Http(client),
        }
    }

    pub fn from_fixture(entry: WatchlistEntry, html: &str) -> Self {
        Self {
            name: format!("Careers: {}", entry.company),
            entry,
            detail_budget: DEFAULT_DETAIL_BUDGET,
            mode: Mode::Fixture {
                listing: html.to_string(),
                details: HashMap::new(),
            },
        }
    }

    /// Fixture mode: serve `html` as the detail page of `url`. Postings without
    /// one behave like a failed detail fetch.
    pub fn with_detail_page(mut self, url: &str, html: &str) -> Self {
        if let Mode::Fixture { details, .. } = &mut self.mode {
            details.insert(url.to_string(), html.to_string());
        }
        self
    }

    pub fn with_detail_budget(mut self, budget: Duration) -> Self {
        self.detail_budget = budget;
        self
    }

    /// Fetch detail pages concurrently. Whatever fails, times out or is still
    /// pending when the budget runs out keeps its listing fields.
    async fn fetch_details(&self, client: &reqwest::Client, postings: &mut [Posting]) {
        let deadline = tokio::time::Instant::now() + self.detail_budget;
        let mut set = JoinSet::new();
        for (i, p) in postings.iter().enumerate().take(MAX_DETAIL_FETCHES) {
            let Ok(url) = reqwest::Url::parse(&p.url) else {
                continue;
            };
            let client = client.clone();
            let name = self.name.clone();
            set.spawn(async move {
                let res = tokio::time::timeout(DETAIL_REQUEST_TIMEOUT, http_get_text(&client, url, &name)).await;
                (i, res)
            });
        }

        let mut enriched = 0usize;
        loop {
            match tokio::time::timeout_at(deadline, set.join_next()).await {
                Ok(Some(Ok((i, Ok(Ok(html)))))) => {
                    if apply_detail(&mut postings[i], &html) {
                        enriched += 1;
                    } else {
                        tracing::debug!(source = %self.name, url = %postings[i].url, "detail page without description");
                    }
                }
                Ok(Some(Ok((i, Ok(Err(e)))))) => {
                    tracing::warn!(source = %self.name, url = %postings[i].url, error = %e, "detail fetch failed; keeping listing fields");
                }
                Ok(Some(Ok((i, Err(_))))) => {
                    tracing::warn!(source = %self.name, url = %postings[i].url, "detail fetch timed out; keeping listing fields");
                }
                Ok(Some(Err(e))) => {
                    tracing::warn!(source = %self.name, error = %e, "detail task failed");
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(source = %self.name, pending = set.len(), "detail budget spent; keeping listing fields");
                    set.abort_all();
                    break;
                }
            }
        }
        tracing::debug!(source = %self.name, enriched, "detail pages applied");
    }

    /// Extract job links; titles not matching the criteria keywords are dropped.
    fn parse_page(&self, html: &str, criteria: &CriteriaSet) -> Result<SourceBatch, SourceFetchError> {
        let base = reqwest::Url::parse(&self.entry.url).map_err(|e| SourceFetchError::Parse {
            source_name: self.name.clone(),
            message: format!("invalid careers url {}: {e}", self.entry.url),
        })?;
        let doc = Html::parse_document(html);
        let anchors = Selector::parse("a[href]").expect("static selector");

        let now = Utc::now();
        let mut seen = HashSet::new();
        let mut batch = SourceBatch::default();
        for a in doc.select(&anchors) {
            let Some(href) = a.value().attr("href") else {
                continue;
            };
            let href_lc = href.to_ascii_lowercase();
            if !JOB_HREF_HINTS.iter().any(|h| href_lc.contains(h)) {
                continue;
            }

            let title = normalize_text(&a.text().collect::<Vec<_>>().join(" "));
            let n = title.chars().count();
            if !(MIN_TITLE_CHARS..=MAX_TITLE_CHARS).contains(&n) {
                skip_malformed(&self.name, "job link without usable title");
                batch.skipped += 1;
                continue;
            }
            let url = match base.join(href) {
                Ok(u) => u.to_string(),
                Err(e) => {
                    skip_malformed(&self.name, &format!("unresolvable href {href}: {e}"));
                    batch.skipped += 1;
                    continue;
                }
            };
            if !criteria.matches_title(&title) || !seen.insert(url.clone()) {
                continue;
            }

            let raw = RawPosting {
                title: Some(title),
                company: Some(self.entry.company.clone()),
                location: a.value().attr("data-location").map(str::to_string),
                description: a.value().attr("title").map(str::to_string),
                url: Some(url),
                posted_date: None,
                salary: None,
            };
            match raw.into_posting(&self.name, now) {
                Ok(p) => batch.postings.push(p),
                Err(reason) => {
                    skip_malformed(&self.name, &reason);
                    batch.skipped += 1;
                }
            }
        }
        Ok(batch)
    }
}

#[async_trait]
impl SourceAdapter for CareerPageAdapter {
    async fn fetch(&self, criteria: &CriteriaSet) -> Result<SourceBatch, SourceFetchError> {
        match &self.mode {
            Mode::Fixture { listing, details } => {
                let mut batch = self.parse_page(listing, criteria)?;
                for p in batch.postings.iter_mut().take(MAX_DETAIL_FETCHES) {
                    if let Some(html) = details.get(&p.url) {
                        apply_detail(p, html);
                    }
                }
                Ok(batch)
            }
            Mode::Http(client) => {
                let url = reqwest::Url::parse(&self.entry.url).map_err(|e| SourceFetchError::Parse {
                    source_name: self.name.clone(),
                    message: format!("invalid careers url {}: {e}", self.entry.url),
                })?;
                let body = http_get_text(client, url, &self.name).await?;
                let mut batch = self.parse_page(&body, criteria)?;
                self.fetch_details(client, &mut batch.postings).await;
                Ok(batch)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn watch_company(&self) -> Option<&str> {
        Some(&self.entry.company)
    }
}
