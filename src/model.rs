// src/model.rs
//! Core records shared by discovery, sync and the status watcher.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ScoringError;

/// A normalized job posting as produced by a source adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub url: String,
    pub source: String, // e.g. "Indeed", "Careers: Acme"
    pub posted_date: Option<NaiveDate>,
    pub discovered_at: DateTime<Utc>,
    pub salary: Option<String>,
}

/// Upper bound for each sub-score.
pub const LOCATION_CAP: f32 = 25.0;
pub const ROLE_CAP: f32 = 25.0;
pub const INDUSTRY_CAP: f32 = 15.0;
pub const SENIORITY_CAP: f32 = 10.0;
pub const SKILLS_CAP: f32 = 15.0;
pub const IMPACT_CAP: f32 = 10.0;

/// Six bounded sub-scores. Only constructible through [`ScoreBreakdown::new`],
/// so `0 <= total() <= 100` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    location: f32,
    role: f32,
    industry: f32,
    seniority: f32,
    skills: f32,
    impact: f32,
}

impl ScoreBreakdown {
    pub fn new(
        location: f32,
        role: f32,
        industry: f32,
        seniority: f32,
        skills: f32,
        impact: f32,
    ) -> Result<Self, ScoringError> {
        check("location", location, LOCATION_CAP)?;
        check("role", role, ROLE_CAP)?;
        check("industry", industry, INDUSTRY_CAP)?;
        check("seniority", seniority, SENIORITY_CAP)?;
        check("skills", skills, SKILLS_CAP)?;
        check("impact", impact, IMPACT_CAP)?;
        Ok(Self {
            location,
            role,
            industry,
            seniority,
            skills,
            impact,
        })
    }

    pub fn location(&self) -> f32 {
        self.location
    }
    pub fn role(&self) -> f32 {
        self.role
    }
    pub fn industry(&self) -> f32 {
        self.industry
    }
    pub fn seniority(&self) -> f32 {
        self.seniority
    }
    pub fn skills(&self) -> f32 {
        self.skills
    }
    pub fn impact(&self) -> f32 {
        self.impact
    }

    pub fn total(&self) -> f32 {
        self.location + self.role + self.industry + self.seniority + self.skills + self.impact
    }
}

fn check(field: &'static str, value: f32, cap: f32) -> Result<(), ScoringError> {
    if !value.is_finite() || value < 0.0 || value > cap {
        return Err(ScoringError::OutOfRange { field, value, cap });
    }
    Ok(())
}

// Deserialization goes through validation as well (records read back from a store).
impl<'de> Deserialize<'de> for ScoreBreakdown {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            location: f32,
            role: f32,
            industry: f32,
            seniority: f32,
            skills: f32,
            impact: f32,
        }
        let r = Raw::deserialize(d)?;
        ScoreBreakdown::new(r.location, r.role, r.industry, r.seniority, r.skills, r.impact)
            .map_err(serde::de::Error::custom)
    }
}

/// Kanban status of an application record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    New,
    Reviewing,
    Apply,
    Applied,
    Interview,
    Offer,
    Rejected,
    Pass,
}

impl Status {
    pub const ALL: [Status; 8] = [
        Status::New,
        Status::Reviewing,
        Status::Apply,
        Status::Applied,
        Status::Interview,
        Status::Offer,
        Status::Rejected,
        Status::Pass,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::New => "New",
            Status::Reviewing => "Reviewing",
            Status::Apply => "Apply",
            Status::Applied => "Applied",
            Status::Interview => "Interview",
            Status::Offer => "Offer",
            Status::Rejected => "Rejected",
            Status::Pass => "Pass",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .iter()
            .copied()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown status: {s}"))
    }
}

/// Links to generated documents. Each generation overwrites, never appends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLinks {
    pub tailored_cv: Option<String>,
    pub cover_letter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    /// Short hex id derived from `key`.
    pub id: String,
    /// Identity key (see `dedup::IdentityKey`), stored in its string form.
    pub key: String,
    pub posting: Posting,
    pub score: ScoreBreakdown,
    pub rationale: String,
    #[serde(default)]
    pub key_requirements: Vec<String>,
    #[serde(default)]
    pub potential_concerns: Vec<String>,
    pub strong_match: bool,
    /// Name of the criteria set that admitted the posting.
    pub criteria: String,
    pub status: Status,
    #[serde(default)]
    pub links: ArtifactLinks,
    pub applied_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// A company whose careers page is checked directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub company: String,
    pub url: String,
    #[serde(default)]
    pub priority: Priority,
    pub check_daily: bool,
    pub last_checked: Option<DateTime<Utc>>,
}

fn default_min_score() -> u8 {
    60
}

/// Named search criteria. Several may be active at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriteriaSet {
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Location -> preference weight (0..=100).
    #[serde(default)]
    pub location_weights: BTreeMap<String, u8>,
    #[serde(default = "default_min_score")]
    pub min_score: u8,
    #[serde(default)]
    pub excluded_companies: BTreeSet<String>,
}

fn default_true() -> bool {
    true
}

impl CriteriaSet {
    /// Locations to search, highest weight first.
    pub fn locations(&self) -> Vec<String> {
        let mut v: Vec<(&String, &u8)> = self.location_weights.iter().collect();
        v.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        v.into_iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn excludes(&self, company: &str) -> bool {
        let c = company.trim();
        self.excluded_companies
            .iter()
            .any(|x| x.trim().eq_ignore_ascii_case(c))
    }

    /// Case-insensitive substring match of any keyword; empty keyword list matches all.
    pub fn matches_title(&self, title: &str) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let t = title.to_lowercase();
        self.keywords
            .iter()
            .any(|k| !k.trim().is_empty() && t.contains(&k.trim().to_lowercase()))
    }
}

/// Interview preparation material, one entry per job key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewPrep {
    pub job_key: String,
    pub company_research: String,
    pub likely_questions: Vec<String>,
    pub talking_points: Vec<String>,
    pub questions_to_ask: Vec<String>,
    pub document_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_is_sum_of_parts() {
        let s = ScoreBreakdown::new(25.0, 20.0, 10.0, 5.0, 12.5, 7.5).unwrap();
        assert_eq!(s.total(), 80.0);
    }

    #[test]
    fn caps_are_enforced_not_clamped() {
        let err = ScoreBreakdown::new(30.0, 0.0, 0.0, 0.0, 0.0, 0.0).unwrap_err();
        match err {
            ScoringError::OutOfRange { field, value, cap } => {
                assert_eq!(field, "location");
                assert_eq!(value, 30.0);
                assert_eq!(cap, 25.0);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(ScoreBreakdown::new(0.0, 0.0, 0.0, -1.0, 0.0, 0.0).is_err());
        assert!(ScoreBreakdown::new(0.0, 0.0, f32::NAN, 0.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn deserialize_validates() {
        let bad = r#"{"location":1,"role":26,"industry":0,"seniority":0,"skills":0,"impact":0}"#;
        assert!(serde_json::from_str::<ScoreBreakdown>(bad).is_err());
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("apply".parse::<Status>().unwrap(), Status::Apply);
        assert_eq!(" Interview ".parse::<Status>().unwrap(), Status::Interview);
        assert!("Archived".parse::<Status>().is_err());
    }

    #[test]
    fn criteria_locations_ordered_by_weight() {
        let mut c = CriteriaSet {
            name: "quant".into(),
            active: true,
            keywords: vec!["Quant".into()],
            location_weights: BTreeMap::new(),
            min_score: 60,
            excluded_companies: BTreeSet::from(["Crypto Corp".to_string()]),
        };
        c.location_weights.insert("Remote".into(), 75);
        c.location_weights.insert("Paris".into(), 100);
        assert_eq!(c.locations(), vec!["Paris".to_string(), "Remote".to_string()]);
        assert!(c.excludes("crypto corp"));
        assert!(c.matches_title("Senior Quant Developer"));
        assert!(!c.matches_title("Barista"));
    }
}
