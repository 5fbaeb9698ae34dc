// src/config/mod.rs
//! Runtime settings: TOML file + environment overrides for secrets.

pub mod profile;

use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::CriteriaSet;

pub const ENV_CONFIG_PATH: &str = "JOBHUNTER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/jobhunter.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotionSettings {
    pub api_key: String,
    pub jobs_db: String,
    pub watchlist_db: String,
    pub criteria_db: String,
    pub interview_prep_db: String,
}

impl NotionSettings {
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.jobs_db.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSettings {
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "claude-sonnet-4-20250514".to_string(),
            timeout_secs: 90,
            max_tokens: 3000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveSettings {
    pub access_token: String,
    pub root_folder_id: String,
}

impl DriveSettings {
    pub fn is_configured(&self) -> bool {
        !self.access_token.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    Rss,
}

/// A job board feed. The keyword and location are appended as query parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    #[serde(default)]
    pub kind: SourceKind,
    pub url: String,
    #[serde(default = "default_query_param")]
    pub query_param: String,
    #[serde(default = "default_location_param")]
    pub location_param: String,
    /// Query parameter carrying the job id in item links (`viewjob?jk=123`).
    /// The id is moved into the path so identity keys stay distinct. Empty disables.
    #[serde(default = "default_id_param")]
    pub id_param: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_query_param() -> String {
    "q".to_string()
}

fn default_location_param() -> String {
    "l".to_string()
}

pub const DEFAULT_ID_PARAM: &str = "jk";

fn default_id_param() -> String {
    DEFAULT_ID_PARAM.to_string()
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub min_score: u8,
    pub strong_match_threshold: u8,
    pub source_timeout_secs: u64,
    pub max_postings_per_source: usize,
    pub poll_interval_secs: u64,
    pub user_agent: String,
    pub state_path: PathBuf,
    pub profile_path: PathBuf,
    pub output_dir: PathBuf,
    pub notion: NotionSettings,
    pub oracle: OracleSettings,
    pub drive: DriveSettings,
    pub sources: Vec<SourceConfig>,
    pub default_criteria: CriteriaSet,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            min_score: 60,
            strong_match_threshold: 80,
            source_timeout_secs: 60,
            max_postings_per_source: 100,
            poll_interval_secs: 900,
            user_agent: "jobhunter/0.1".to_string(),
            state_path: PathBuf::from("state/observed_status.json"),
            profile_path: PathBuf::from("data/master_profile.json"),
            output_dir: PathBuf::from("output"),
            notion: NotionSettings::default(),
            oracle: OracleSettings::default(),
            drive: DriveSettings::default(),
            sources: Vec::new(),
            default_criteria: default_criteria(),
        }
    }
}

fn default_criteria() -> CriteriaSet {
    let location_weights: BTreeMap<String, u8> = [
        ("Paris", 100),
        ("Lyon", 95),
        ("France", 90),
        ("London", 80),
        ("Remote", 75),
        ("Switzerland", 70),
        ("Luxembourg", 70),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    CriteriaSet {
        name: "default".to_string(),
        active: true,
        keywords: vec![
            "quantitative analyst".into(),
            "portfolio analyst".into(),
            "solution architect".into(),
            "quantitative developer".into(),
            "automation engineer".into(),
        ],
        location_weights,
        min_score: 60,
        excluded_companies: BTreeSet::new(),
    }
}

impl Settings {
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs.max(1))
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle.timeout_secs.max(1))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    /// Criteria used when the store has no active set.
    pub fn fallback_criteria(&self) -> CriteriaSet {
        CriteriaSet {
            active: true,
            ..self.default_criteria.clone()
        }
    }

    /// Parse TOML content without touching the environment. Without its own
    /// `min_score`, `[default_criteria]` inherits the global one.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let raw: toml::Table = toml::from_str(s).context("parsing settings TOML")?;
        let mut cfg: Settings = toml::Value::Table(raw.clone())
            .try_into()
            .context("parsing settings TOML")?;
        let own_min_score = raw
            .get("default_criteria")
            .and_then(|c| c.get("min_score"))
            .is_some();
        if !own_min_score {
            cfg.default_criteria.min_score = cfg.min_score;
        }
        cfg.sanitize();
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Load settings using env var + fallbacks, then apply env overrides:
    /// 1) $JOBHUNTER_CONFIG (must exist)
    /// 2) config/jobhunter.toml
    /// 3) built-in defaults
    pub fn load() -> Result<Self> {
        let mut cfg = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let p = PathBuf::from(DEFAULT_CONFIG_PATH);
            if p.exists() {
                Self::load_from(&p)?
            } else {
                Settings::default()
            }
        };
        cfg.apply_env();
        cfg.sanitize();
        Ok(cfg)
    }

    /// Secrets and a few tunables always come from the environment when present.
    pub fn apply_env(&mut self) {
        fn set(target: &mut String, var: &str) {
            if let Ok(v) = env::var(var) {
                if !v.trim().is_empty() {
                    *target = v.trim().to_string();
                }
            }
        }
        set(&mut self.notion.api_key, "NOTION_API_KEY");
        set(&mut self.notion.jobs_db, "NOTION_JOBS_DB_ID");
        set(&mut self.notion.watchlist_db, "NOTION_WATCHLIST_DB_ID");
        set(&mut self.notion.criteria_db, "NOTION_CRITERIA_DB_ID");
        set(&mut self.notion.interview_prep_db, "NOTION_INTERVIEW_PREP_DB_ID");
        set(&mut self.oracle.api_key, "ANTHROPIC_API_KEY");
        set(&mut self.oracle.model, "CLAUDE_MODEL");
        set(&mut self.drive.access_token, "GOOGLE_DRIVE_ACCESS_TOKEN");
        set(&mut self.drive.root_folder_id, "GOOGLE_DRIVE_FOLDER_ID");

        if let Some(v) = env_u8("MIN_SCORE_THRESHOLD") {
            self.min_score = v;
            self.default_criteria.min_score = v;
        }
        if let Some(v) = env_u8("STRONG_MATCH_THRESHOLD") {
            self.strong_match_threshold = v;
        }
    }

    fn sanitize(&mut self) {
        self.min_score = self.min_score.min(100);
        self.default_criteria.min_score = self.default_criteria.min_score.min(100);
        self.strong_match_threshold = self.strong_match_threshold.min(100);
        self.sources.retain(|s| !s.url.trim().is_empty());
    }
}

fn env_u8(var: &str) -> Option<u8> {
    env::var(var).ok().and_then(|v| v.trim().parse::<u8>().ok())
}
