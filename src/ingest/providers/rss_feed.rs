// src/ingest/providers/rss_feed.rs
use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use metrics::histogram;
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::config::{SourceConfig, DEFAULT_ID_PARAM};
use crate::error::SourceFetchError;
use crate::ingest::skip_malformed;
use crate::ingest::types::{RawPosting, SourceAdapter, SourceBatch};
use crate::model::CriteriaSet;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

fn parse_rfc2822_date(ts: &str) -> Option<NaiveDate> {
    let dt = OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()?
        .to_offset(UtcOffset::UTC);
    NaiveDate::from_ymd_opt(dt.year(), u8::from(dt.month()) as u32, dt.day() as u32)
}

/// Board feeds title items as `Title - Company - Location`.
fn split_item_title(raw: &str) -> (String, Option<String>, Option<String>) {
    let parts: Vec<&str> = raw.split(" - ").map(str::trim).collect();
    match parts.len() {
        0 | 1 => (raw.trim().to_string(), None, None),
        2 => (parts[0].to_string(), Some(parts[1].to_string()), None),
        n => (
            parts[..n - 2].join(" - "),
            Some(parts[n - 2].to_string()),
            Some(parts[n - 1].to_string()),
        ),
    }
}

/// Boards put the job id in the query (`/viewjob?jk=1001`), which identity keys
/// drop. Rewrite such links to `/viewjob/1001`; other links pass through.
fn canonical_link(link: &str, id_param: &str) -> String {
    if id_param.is_empty() {
        return link.to_string();
    }
    let Ok(mut url) = reqwest::Url::parse(link.trim()) else {
        return link.to_string();
    };
    let Some(id) = url
        .query_pairs()
        .find(|(k, v)| k == id_param && !v.trim().is_empty())
        .map(|(_, v)| v.trim().to_string())
    else {
        return link.to_string();
    };
    match url.path_segments_mut() {
        Ok(mut segs) => {
            segs.pop_if_empty().push(&id);
        }
        Err(()) => return link.to_string(),
    }
    url.set_query(None);
    url.set_fragment(None);
    url.to_string()
}

/// Job board exposing search results as RSS.
pub struct RssFeedAdapter {
    name: String,
    id_param: String,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        client: reqwest::Client,
        config: SourceConfig,
    },
}

impl RssFeedAdapter {
    pub fn from_fixture(name: &str, xml: &str) -> Self {
        Self {
            name: name.to_string(),
            id_param: DEFAULT_ID_PARAM.to_string(),
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    pub fn from_config(config: SourceConfig, client: reqwest::Client) -> Self {
        Self {
            name: config.name.clone(),
            id_param: config.id_param.clone(),
            mode: Mode::Http { client, config },
        }
    }

    pub fn with_id_param(mut self, param: &str) -> Self {
        self.id_param = param.to_string();
        self
    }

    fn parse_items_from_str(&self, xml: &str) -> Result<SourceBatch, SourceFetchError> {
        let t0 = std::time::Instant::now();
        let rss: Rss = from_str(xml).map_err(|e| SourceFetchError::Parse {
            source_name: self.name.clone(),
            message: e.to_string(),
        })?;

        let now = Utc::now();
        let mut batch = SourceBatch::default();
        for it in rss.channel.item {
            let (title, company, location) = match it.title.as_deref() {
                Some(t) => {
                    let (t, c, l) = split_item_title(t);
                    (Some(t), c, l)
                }
                None => (None, None, None),
            };
            let raw = RawPosting {
                title,
                company,
                location,
                description: it.description,
                url: it.link.map(|l| canonical_link(&l, &self.id_param)),
                posted_date: it.pub_date.as_deref().and_then(parse_rfc2822_date),
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

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("source_parse_ms").record(ms);
        Ok(batch)
    }

    fn search_urls(config: &SourceConfig, criteria: &CriteriaSet) -> Vec<reqwest::Url> {
        let Ok(base) = reqwest::Url::parse(&config.url) else {
            return Vec::new();
        };
        let keywords = if criteria.keywords.is_empty() {
            vec![String::new()]
        } else {
            criteria.keywords.clone()
        };
        let locations = {
            let l = criteria.locations();
            if l.is_empty() {
                vec![String::new()]
            } else {
                l
            }
        };

        let mut urls = Vec::with_capacity(keywords.len() * locations.len());
        for kw in &keywords {
            for loc in &locations {
                let mut u = base.clone();
                {
                    let mut q = u.query_pairs_mut();
                    if !kw.is_empty() {
                        q.append_pair(&config.query_param, kw);
                    }
                    if !loc.is_empty() {
                        q.append_pair(&config.location_param, loc);
                    }
                }
                urls.push(u);
            }
        }
        urls
    }
}

#[async_trait]
impl SourceAdapter for RssFeedAdapter {
    async fn fetch(&self, criteria: &CriteriaSet) -> Result<SourceBatch, SourceFetchError> {
        match &self.mode {
            Mode::Fixture(xml) => self.parse_items_from_str(xml),
            Mode::Http { client, config } => {
                let urls = Self::search_urls(config, criteria);
                if urls.is_empty() {
                    return Err(SourceFetchError::Parse {
                        source_name: self.name.clone(),
                        message: format!("invalid feed url {}", config.url),
                    });
                }

                let mut seen = HashSet::new();
                let mut out = SourceBatch::default();
                let mut first_err = None;
                let mut any_ok = false;
                for url in urls {
                    let body = match crate::ingest::http_get_text(client, url.clone(), &self.name).await {
                        Ok(b) => b,
                        Err(e) => {
                            tracing::warn!(source = %self.name, %url, error = %e, "feed query failed");
                            first_err.get_or_insert(e);
                            continue;
                        }
                    };
                    match self.parse_items_from_str(&body) {
                        Ok(batch) => {
                            any_ok = true;
                            out.skipped += batch.skipped;
                            for p in batch.postings {
                                if seen.insert(p.url.clone()) {
                                    out.postings.push(p);
                                }
                            }
                        }
                        Err(e) => {
                            tracing::warn!(source = %self.name, %url, error = %e, "feed body unparseable");
                            first_err.get_or_insert(e);
                        }
                    }
                }
                match (any_ok, first_err) {
                    (false, Some(e)) => Err(e),
                    _ => Ok(out),
                }
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_split_variants() {
        assert_eq!(
            split_item_title("Quant Analyst - Acme Bank - Paris"),
            (
                "Quant Analyst".to_string(),
                Some("Acme Bank".to_string()),
                Some("Paris".to_string())
            )
        );
        assert_eq!(
            split_item_title("Risk - Credit Analyst - Foo SA - Lyon"),
            (
                "Risk - Credit Analyst".to_string(),
                Some("Foo SA".to_string()),
                Some("Lyon".to_string())
            )
        );
        assert_eq!(
            split_item_title("Data Engineer - Bar"),
            ("Data Engineer".to_string(), Some("Bar".to_string()), None)
        );
        assert_eq!(split_item_title("Solo"), ("Solo".to_string(), None, None));
    }

    #[test]
    fn job_id_moves_from_query_to_path() {
        assert_eq!(
            canonical_link("https://rss.board.test/viewjob?jk=1001&from=rss", "jk"),
            "https://rss.board.test/viewjob/1001"
        );
        assert_eq!(
            canonical_link("https://rss.board.test/jobs/7?utm=x", "jk"),
            "https://rss.board.test/jobs/7?utm=x"
        );
        assert_eq!(
            canonical_link("https://rss.board.test/viewjob?jk=1001", ""),
            "https://rss.board.test/viewjob?jk=1001"
        );
        assert_eq!(canonical_link("not a url", "jk"), "not a url");
    }

    #[test]
    fn rfc2822_dates_parse() {
        let d = parse_rfc2822_date("Tue, 14 Oct 2025 08:00:00 GMT").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2025, 10, 14).unwrap());
        assert!(parse_rfc2822_date("yesterday").is_none());
    }

    #[test]
    fn search_urls_cover_keyword_location_grid() {
        let cfg = SourceConfig {
            name: "Board".into(),
            kind: Default::default(),
            url: "https://rss.example.test/rss?sort=date".into(),
            query_param: "q".into(),
            location_param: "l".into(),
            id_param: "jk".into(),
            enabled: true,
        };
        let mut criteria = crate::config::Settings::default().default_criteria;
        criteria.keywords = vec!["quant analyst".into(), "risk".into()];
        criteria.location_weights = [("Paris".to_string(), 100u8)].into_iter().collect();
        let urls = RssFeedAdapter::search_urls(&cfg, &criteria);
        assert_eq!(urls.len(), 2);
        assert_eq!(
            urls[0].as_str(),
            "https://rss.example.test/rss?sort=date&q=quant+analyst&l=Paris"
        );
    }
}
