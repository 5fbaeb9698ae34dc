// src/store/notion.rs
//! Notion REST adapter for the four tables. The identity key lives in a
//! `Key` rich-text property; page ids are looked up by it.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{json, Map, Value};

use crate::config::NotionSettings;
use crate::error::SyncError;
use crate::model::{
    ApplicationRecord, ArtifactLinks, CriteriaSet, InterviewPrep, Posting, Priority,
    ScoreBreakdown, Status, WatchlistEntry,
};
use crate::store::{RecordField, RecordFilter, RecordStore, UpsertOutcome};

const NOTION_API: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";
/// Notion rejects rich-text segments longer than this.
const TEXT_LIMIT: usize = 2000;

// ---- property builders ----

fn clip(s: &str) -> String {
    s.chars().take(TEXT_LIMIT).collect()
}

fn p_title(s: &str) -> Value {
    json!({"title": [{"text": {"content": clip(s)}}]})
}

fn p_text(s: &str) -> Value {
    json!({"rich_text": [{"text": {"content": clip(s)}}]})
}

fn p_select(s: &str) -> Value {
    // Select options cannot contain commas.
    json!({"select": {"name": s.replace(',', " ").trim()}})
}

fn p_url(s: &str) -> Value {
    json!({"url": s})
}

fn p_date(s: String) -> Value {
    json!({"date": {"start": s}})
}

// ---- property readers ----

fn prop<'a>(props: &'a Value, name: &str) -> Option<&'a Value> {
    props.get(name)
}

fn read_plain(v: &Value, kind: &str) -> Option<String> {
    let parts = v.get(kind)?.as_array()?;
    let s: String = parts
        .iter()
        .filter_map(|p| p.get("plain_text").or_else(|| p.pointer("/text/content")))
        .filter_map(Value::as_str)
        .collect();
    Some(s)
}

fn read_title(props: &Value, name: &str) -> Option<String> {
    prop(props, name).and_then(|v| read_plain(v, "title"))
}

fn read_text(props: &Value, name: &str) -> Option<String> {
    prop(props, name)
        .and_then(|v| read_plain(v, "rich_text"))
        .filter(|s| !s.is_empty())
}

fn read_select(props: &Value, name: &str) -> Option<String> {
    prop(props, name)?
        .pointer("/select/name")?
        .as_str()
        .map(str::to_string)
}

fn read_multi(props: &Value, name: &str) -> Vec<String> {
    prop(props, name)
        .and_then(|v| v.get("multi_select"))
        .and_then(Value::as_array)
        .map(|a| {
            a.iter()
                .filter_map(|o| o.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn read_url(props: &Value, name: &str) -> Option<String> {
    prop(props, name)?
        .get("url")?
        .as_str()
        .map(str::to_string)
}

fn read_number(props: &Value, name: &str) -> Option<f64> {
    prop(props, name)?.get("number")?.as_f64()
}

fn read_checkbox(props: &Value, name: &str) -> Option<bool> {
    prop(props, name)?.get("checkbox")?.as_bool()
}

fn read_date(props: &Value, name: &str) -> Option<String> {
    prop(props, name)?
        .pointer("/date/start")?
        .as_str()
        .map(str::to_string)
}

fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|d| d.and_utc())
        })
}

fn lines(v: &[String]) -> String {
    v.join("\n")
}

fn split_lines(s: Option<String>) -> Vec<String> {
    s.map(|s| {
        s.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

// ---- record mapping ----

pub fn record_properties(r: &ApplicationRecord) -> Value {
    let mut m = Map::new();
    let p = &r.posting;
    m.insert("Title".into(), p_title(&p.title));
    m.insert("Key".into(), p_text(&r.key));
    m.insert("Record ID".into(), p_text(&r.id));
    m.insert("Company".into(), p_select(&p.company));
    if !p.location.is_empty() {
        m.insert("Location".into(), p_select(&p.location));
    }
    m.insert("Description".into(), p_text(&p.description));
    m.insert("URL".into(), p_url(&p.url));
    m.insert("Source".into(), p_select(&p.source));
    m.insert("Discovered Date".into(), p_date(p.discovered_at.to_rfc3339()));
    if let Some(d) = p.posted_date {
        m.insert("Posted Date".into(), p_date(d.format("%Y-%m-%d").to_string()));
    }
    if let Some(s) = &p.salary {
        m.insert("Salary".into(), p_text(s));
    }
    m.insert("Score".into(), json!({"number": r.score.total()}));
    m.insert(
        "Score Breakdown".into(),
        p_text(&serde_json::to_string(&r.score).unwrap_or_default()),
    );
    m.insert("AI Analysis".into(), p_text(&r.rationale));
    m.insert("Key Requirements".into(), p_text(&lines(&r.key_requirements)));
    m.insert("Potential Concerns".into(), p_text(&lines(&r.potential_concerns)));
    m.insert("Strong Match".into(), json!({"checkbox": r.strong_match}));
    m.insert("Criteria".into(), p_select(&r.criteria));
    m.insert("Status".into(), p_select(r.status.as_str()));
    if let Some(u) = &r.links.tailored_cv {
        m.insert("Tailored CV".into(), p_url(u));
    }
    if let Some(u) = &r.links.cover_letter {
        m.insert("Cover Letter".into(), p_url(u));
    }
    if let Some(ts) = r.applied_at {
        m.insert("Applied Date".into(), p_date(ts.to_rfc3339()));
    }
    if let Some(n) = &r.notes {
        m.insert("Notes".into(), p_text(n));
    }
    Value::Object(m)
}

pub fn field_properties(fields: &[RecordField]) -> Value {
    let mut m = Map::new();
    for f in fields {
        match f {
            RecordField::Status(s) => m.insert("Status".into(), p_select(s.as_str())),
            RecordField::TailoredCv(u) => m.insert("Tailored CV".into(), p_url(u)),
            RecordField::CoverLetter(u) => m.insert("Cover Letter".into(), p_url(u)),
            RecordField::AppliedAt(ts) => m.insert("Applied Date".into(), p_date(ts.to_rfc3339())),
            RecordField::Notes(n) => m.insert("Notes".into(), p_text(n)),
        };
    }
    Value::Object(m)
}

pub fn record_from_page(page: &Value) -> Result<ApplicationRecord, SyncError> {
    let props = page
        .get("properties")
        .ok_or_else(|| SyncError::Decode("page without properties".into()))?;
    let key = read_text(props, "Key").ok_or_else(|| SyncError::Decode("page without Key".into()))?;
    let score: ScoreBreakdown = read_text(props, "Score Breakdown")
        .ok_or_else(|| SyncError::Decode(format!("{key}: missing Score Breakdown")))
        .and_then(|s| {
            serde_json::from_str(&s).map_err(|e| SyncError::Decode(format!("{key}: {e}")))
        })?;
    let status = match read_select(props, "Status") {
        Some(s) => s
            .parse::<Status>()
            .map_err(|e| SyncError::Decode(format!("{key}: {e}")))?,
        None => Status::New,
    };

    let posting = Posting {
        title: read_title(props, "Title").unwrap_or_default(),
        company: read_select(props, "Company").unwrap_or_default(),
        location: read_select(props, "Location").unwrap_or_default(),
        description: read_text(props, "Description").unwrap_or_default(),
        url: read_url(props, "URL").unwrap_or_default(),
        source: read_select(props, "Source").unwrap_or_default(),
        posted_date: read_date(props, "Posted Date")
            .and_then(|d| NaiveDate::parse_from_str(&d[..d.len().min(10)], "%Y-%m-%d").ok()),
        discovered_at: read_date(props, "Discovered Date")
            .and_then(|d| parse_ts(&d))
            .unwrap_or_else(Utc::now),
        salary: read_text(props, "Salary"),
    };

    Ok(ApplicationRecord {
        id: read_text(props, "Record ID").unwrap_or_default(),
        key,
        posting,
        score,
        rationale: read_text(props, "AI Analysis").unwrap_or_default(),
        key_requirements: split_lines(read_text(props, "Key Requirements")),
        potential_concerns: split_lines(read_text(props, "Potential Concerns")),
        strong_match: read_checkbox(props, "Strong Match").unwrap_or(false),
        criteria: read_select(props, "Criteria").unwrap_or_default(),
        status,
        links: ArtifactLinks {
            tailored_cv: read_url(props, "Tailored CV"),
            cover_letter: read_url(props, "Cover Letter"),
        },
        applied_at: read_date(props, "Applied Date").and_then(|d| parse_ts(&d)),
        notes: read_text(props, "Notes"),
    })
}

fn watchlist_from_page(page: &Value) -> Option<WatchlistEntry> {
    let props = page.get("properties")?;
    let company = read_title(props, "Name").filter(|s| !s.trim().is_empty())?;
    Some(WatchlistEntry {
        company,
        url: read_url(props, "Careers URL").unwrap_or_default(),
        priority: read_select(props, "Priority")
            .and_then(|p| p.parse::<Priority>().ok())
            .unwrap_or_default(),
        check_daily: read_checkbox(props, "Check Daily").unwrap_or(true),
        last_checked: read_date(props, "Last Checked").and_then(|d| parse_ts(&d)),
    })
}

/// Location order in the table is the preference order: first gets 100, then 5 less each.
fn criteria_from_page(page: &Value, fallback_min_score: u8) -> Option<CriteriaSet> {
    let props = page.get("properties")?;
    let name = read_title(props, "Name").filter(|s| !s.trim().is_empty())?;
    let location_weights = read_multi(props, "Locations")
        .into_iter()
        .enumerate()
        .map(|(i, l)| (l, 100u8.saturating_sub(5 * i.min(18) as u8)))
        .collect();
    Some(CriteriaSet {
        name,
        active: read_checkbox(props, "Active").unwrap_or(true),
        keywords: read_multi(props, "Keywords"),
        location_weights,
        min_score: read_number(props, "Min Score")
            .map(|n| n.clamp(0.0, 100.0) as u8)
            .unwrap_or(fallback_min_score),
        excluded_companies: read_multi(props, "Excluded Companies").into_iter().collect(),
    })
}

fn prep_properties(p: &InterviewPrep) -> Value {
    let mut m = Map::new();
    m.insert("Name".into(), p_title(&p.job_key));
    m.insert("Job Key".into(), p_text(&p.job_key));
    m.insert("Company Research".into(), p_text(&p.company_research));
    m.insert("Likely Questions".into(), p_text(&lines(&p.likely_questions)));
    m.insert("My Talking Points".into(), p_text(&lines(&p.talking_points)));
    m.insert("Questions To Ask".into(), p_text(&lines(&p.questions_to_ask)));
    if let Some(u) = &p.document_url {
        m.insert("Document".into(), p_url(u));
    }
    Value::Object(m)
}

fn text_equals(property: &str, value: &str) -> Value {
    json!({"property": property, "rich_text": {"equals": value}})
}

fn status_filter(statuses: &[Status]) -> Option<Value> {
    let clauses: Vec<Value> = statuses
        .iter()
        .map(|s| json!({"property": "Status", "select": {"equals": s.as_str()}}))
        .collect();
    match clauses.len() {
        0 => None,
        1 => clauses.into_iter().next(),
        _ => Some(json!({"or": clauses})),
    }
}

// ---- client ----

pub struct NotionStore {
    http: reqwest::Client,
    settings: NotionSettings,
    fallback_min_score: u8,
    /// identity key -> page id, filled by every Jobs query.
    page_ids: Mutex<HashMap<String, String>>,
}

impl NotionStore {
    pub fn new(settings: NotionSettings, fallback_min_score: u8) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            settings,
            fallback_min_score,
            page_ids: Mutex::new(HashMap::new()),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{NOTION_API}{path}"))
            .bearer_auth(&self.settings.api_key)
            .header("Notion-Version", NOTION_VERSION)
    }

    /// Transport failures and 5xx mean the store is unreachable; 4xx rejects this item only.
    async fn send(&self, req: reqwest::RequestBuilder, context: &str) -> Result<Value, SyncError> {
        let resp = req
            .send()
            .await
            .map_err(|e| SyncError::Unavailable(format!("{context}: {e}")))?;
        let status = resp.status();
        if status.is_server_error() || status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(SyncError::Unavailable(format!("{context}: HTTP {status}")));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(body);
            return Err(SyncError::Rejected {
                key: context.to_string(),
                message: format!("HTTP {status}: {message}"),
            });
        }
        resp.json::<Value>()
            .await
            .map_err(|e| SyncError::Decode(format!("{context}: {e}")))
    }

    async fn query_all(&self, db: &str, filter: Option<Value>) -> Result<Vec<Value>, SyncError> {
        let mut out = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut body = json!({"page_size": 100});
            if let Some(f) = &filter {
                body["filter"] = f.clone();
            }
            if let Some(c) = &cursor {
                body["start_cursor"] = json!(c);
            }
            let resp = self
                .send(
                    self.request(reqwest::Method::POST, &format!("/databases/{db}/query"))
                        .json(&body),
                    &format!("query {db}"),
                )
                .await?;
            if let Some(results) = resp.get("results").and_then(Value::as_array) {
                out.extend(results.iter().cloned());
            }
            let more = resp.get("has_more").and_then(Value::as_bool).unwrap_or(false);
            cursor = resp
                .get("next_cursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            if !more || cursor.is_none() {
                break;
            }
        }
        Ok(out)
    }

    async fn create_page(&self, db: &str, properties: Value, context: &str) -> Result<Value, SyncError> {
        let body = json!({"parent": {"database_id": db}, "properties": properties});
        self.send(self.request(reqwest::Method::POST, "/pages").json(&body), context)
            .await
    }

    async fn patch_page(&self, page_id: &str, properties: Value, context: &str) -> Result<(), SyncError> {
        let body = json!({"properties": properties});
        self.send(
            self.request(reqwest::Method::PATCH, &format!("/pages/{page_id}"))
                .json(&body),
            context,
        )
        .await
        .map(|_| ())
    }

    fn remember(&self, page: &Value) {
        let key = page
            .get("properties")
            .and_then(|p| read_text(p, "Key"));
        let id = page.get("id").and_then(Value::as_str);
        if let (Some(k), Some(id)) = (key, id) {
            self.page_ids
                .lock()
                .expect("page id cache poisoned")
                .insert(k, id.to_string());
        }
    }

    async fn job_page_id(&self, key: &str) -> Result<Option<String>, SyncError> {
        let cached = self
            .page_ids
            .lock()
            .expect("page id cache poisoned")
            .get(key)
            .cloned();
        if cached.is_some() {
            return Ok(cached);
        }
        let pages = self
            .query_all(&self.settings.jobs_db, Some(text_equals("Key", key)))
            .await?;
        let Some(page) = pages.first() else {
            return Ok(None);
        };
        self.remember(page);
        Ok(page.get("id").and_then(Value::as_str).map(str::to_string))
    }

    /// An unconfigured optional table fails the item, not the run.
    fn require(db: &str, what: &str) -> Result<(), SyncError> {
        if db.trim().is_empty() {
            Err(SyncError::Rejected {
                key: what.to_string(),
                message: "database id not configured".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RecordStore for NotionStore {
    async fn ping(&self) -> Result<(), SyncError> {
        Self::require(&self.settings.jobs_db, "jobs")?;
        self.send(
            self.request(
                reqwest::Method::GET,
                &format!("/databases/{}", self.settings.jobs_db),
            ),
            "ping",
        )
        .await
        .map(|_| ())
    }

    async fn known_keys(&self) -> Result<Vec<String>, SyncError> {
        let pages = self.query_all(&self.settings.jobs_db, None).await?;
        let mut keys = Vec::with_capacity(pages.len());
        for page in &pages {
            self.remember(page);
            if let Some(k) = page.get("properties").and_then(|p| read_text(p, "Key")) {
                keys.push(k);
            }
        }
        tracing::info!(count = keys.len(), "loaded known identity keys");
        Ok(keys)
    }

    async fn upsert_record(&self, record: &ApplicationRecord) -> Result<UpsertOutcome, SyncError> {
        // A clipped Key would never match its lookup and be recreated every run.
        if record.key.chars().count() > TEXT_LIMIT {
            return Err(SyncError::Rejected {
                key: record.id.clone(),
                message: format!("identity key longer than {TEXT_LIMIT} chars"),
            });
        }
        if self.job_page_id(&record.key).await?.is_some() {
            return Ok(UpsertOutcome::AlreadyPresent);
        }
        let page = self
            .create_page(&self.settings.jobs_db, record_properties(record), &record.key)
            .await?;
        self.remember(&page);
        Ok(UpsertOutcome::Created)
    }

    async fn list_records(&self, filter: &RecordFilter) -> Result<Vec<ApplicationRecord>, SyncError> {
        let pages = self
            .query_all(&self.settings.jobs_db, status_filter(&filter.statuses))
            .await?;
        let mut out = Vec::with_capacity(pages.len());
        for page in &pages {
            self.remember(page);
            match record_from_page(page) {
                Ok(r) if filter.matches(&r) => out.push(r),
                Ok(_) => {}
                Err(e) => {
                    let page_id = page.get("id").and_then(Value::as_str).unwrap_or("?");
                    tracing::warn!(page_id, error = %e, "skipping undecodable job page");
                }
            }
        }
        Ok(out)
    }

    async fn update_fields(&self, key: &str, fields: &[RecordField]) -> Result<(), SyncError> {
        let page_id = self
            .job_page_id(key)
            .await?
            .ok_or_else(|| SyncError::NotFound(key.to_string()))?;
        self.patch_page(&page_id, field_properties(fields), key).await
    }

    async fn list_watchlist(&self) -> Result<Vec<WatchlistEntry>, SyncError> {
        if self.settings.watchlist_db.trim().is_empty() {
            return Ok(Vec::new());
        }
        let pages = self.query_all(&self.settings.watchlist_db, None).await?;
        Ok(pages.iter().filter_map(watchlist_from_page).collect())
    }

    async fn touch_watchlist(&self, company: &str, at: DateTime<Utc>) -> Result<(), SyncError> {
        Self::require(&self.settings.watchlist_db, "watchlist")?;
        let filter = json!({"property": "Name", "title": {"equals": company}});
        let pages = self
            .query_all(&self.settings.watchlist_db, Some(filter))
            .await?;
        let page_id = pages
            .first()
            .and_then(|p| p.get("id"))
            .and_then(Value::as_str)
            .ok_or_else(|| SyncError::NotFound(company.to_string()))?;
        let props = json!({"Last Checked": p_date(at.to_rfc3339())});
        self.patch_page(page_id, props, company).await
    }

    async fn list_criteria(&self) -> Result<Vec<CriteriaSet>, SyncError> {
        if self.settings.criteria_db.trim().is_empty() {
            return Ok(Vec::new());
        }
        let filter = json!({"property": "Active", "checkbox": {"equals": true}});
        let pages = self
            .query_all(&self.settings.criteria_db, Some(filter))
            .await?;
        Ok(pages
            .iter()
            .filter_map(|p| criteria_from_page(p, self.fallback_min_score))
            .collect())
    }

    async fn upsert_interview_prep(&self, prep: &InterviewPrep) -> Result<(), SyncError> {
        Self::require(&self.settings.interview_prep_db, "interview prep")?;
        let existing = self
            .query_all(
                &self.settings.interview_prep_db,
                Some(text_equals("Job Key", &prep.job_key)),
            )
            .await?;
        match existing.first().and_then(|p| p.get("id")).and_then(Value::as_str) {
            Some(page_id) => {
                self.patch_page(page_id, prep_properties(prep), &prep.job_key)
                    .await
            }
            None => self
                .create_page(
                    &self.settings.interview_prep_db,
                    prep_properties(prep),
                    &prep.job_key,
                )
                .await
                .map(|_| ()),
        }
    }

    fn store_name(&self) -> &'static str {
        "notion"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ApplicationRecord {
        ApplicationRecord {
            id: "0123456789ab".into(),
            key: "url:https://jobs.test/1".into(),
            posting: Posting {
                title: "Quant Analyst".into(),
                company: "Acme, Inc".into(),
                location: "Paris".into(),
                description: "Build models.".into(),
                url: "https://jobs.test/1".into(),
                source: "Indeed".into(),
                posted_date: NaiveDate::from_ymd_opt(2025, 10, 1),
                discovered_at: "2025-10-02T08:00:00Z".parse().unwrap(),
                salary: None,
            },
            score: ScoreBreakdown::new(25.0, 20.0, 10.0, 8.0, 12.0, 5.0).unwrap(),
            rationale: "Strong fit.".into(),
            key_requirements: vec!["Python".into(), "Risk".into()],
            potential_concerns: vec![],
            strong_match: true,
            criteria: "default".into(),
            status: Status::New,
            links: ArtifactLinks::default(),
            applied_at: None,
            notes: None,
        }
    }

    #[test]
    fn record_survives_property_mapping() {
        let r = sample();
        let page = json!({"id": "page-1", "properties": record_properties(&r)});
        let back = record_from_page(&page).unwrap();
        assert_eq!(back.key, r.key);
        assert_eq!(back.score, r.score);
        assert_eq!(back.posting.company, "Acme  Inc");
        assert_eq!(back.posting.posted_date, r.posting.posted_date);
        assert_eq!(back.posting.discovered_at, r.posting.discovered_at);
        assert_eq!(back.key_requirements, r.key_requirements);
        assert!(back.strong_match);
    }

    #[test]
    fn tampered_breakdown_is_a_decode_error() {
        let mut props = record_properties(&sample());
        props["Score Breakdown"] = p_text(
            r#"{"location":40,"role":0,"industry":0,"seniority":0,"skills":0,"impact":0}"#,
        );
        let page = json!({"id": "p", "properties": props});
        assert!(matches!(record_from_page(&page), Err(SyncError::Decode(_))));
    }

    #[test]
    fn field_updates_touch_only_named_properties() {
        let v = field_properties(&[
            RecordField::TailoredCv("https://drive.test/cv".into()),
            RecordField::Status(Status::Applied),
        ]);
        let obj = v.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(v["Tailored CV"]["url"], "https://drive.test/cv");
        assert_eq!(v["Status"]["select"]["name"], "Applied");
    }

    #[test]
    fn criteria_weights_follow_location_order() {
        let page = json!({"properties": {
            "Name": {"title": [{"plain_text": "Quant"}]},
            "Keywords": {"multi_select": [{"name": "quant"}]},
            "Locations": {"multi_select": [{"name": "Paris"}, {"name": "London"}]},
            "Active": {"checkbox": true},
            "Min Score": {"number": null}
        }});
        let c = criteria_from_page(&page, 65).unwrap();
        assert_eq!(c.location_weights.get("Paris"), Some(&100));
        assert_eq!(c.location_weights.get("London"), Some(&95));
        assert_eq!(c.min_score, 65);
    }

    #[tokio::test]
    async fn overlong_key_is_rejected_before_any_request() {
        let store = NotionStore::new(NotionSettings::default(), 60);
        let mut r = sample();
        r.key = format!("url:https://jobs.test/{}", "x".repeat(TEXT_LIMIT));
        let err = store.upsert_record(&r).await.unwrap_err();
        assert!(matches!(err, SyncError::Rejected { .. }));
    }

    #[test]
    fn multi_status_filter_is_an_or() {
        assert!(status_filter(&[]).is_none());
        let f = status_filter(&[Status::Apply, Status::Interview]).unwrap();
        assert_eq!(f["or"].as_array().unwrap().len(), 2);
    }
}
