// src/scoring.rs
//! Scorer: one oracle call per posting, validated against the sub-score caps.
//! Fail-closed: anything but a fully valid breakdown is a `ScoringError`.

use std::sync::Arc;

use metrics::counter;
use serde::Deserialize;

use crate::config::profile::MasterProfile;
use crate::error::ScoringError;
use crate::llm::{extract_json, prompts, DynOracle, OracleRequest, OracleTask};
use crate::model::{CriteriaSet, Posting, ScoreBreakdown};

/// A sub-score may come back bare (`12`) or with a reason (`{"score": 12, "reason": "..."}`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SubScore {
    Plain(f32),
    Detailed { score: f32 },
}

impl SubScore {
    fn value(&self) -> f32 {
        match self {
            SubScore::Plain(v) | SubScore::Detailed { score: v } => *v,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawScores {
    #[serde(alias = "location_fit")]
    location: SubScore,
    #[serde(alias = "role_alignment")]
    role: SubScore,
    #[serde(alias = "industry_fit")]
    industry: SubScore,
    seniority: SubScore,
    skills: SubScore,
    impact: SubScore,
}

#[derive(Debug, Deserialize)]
struct RawAssessment {
    scores: RawScores,
    #[serde(default, alias = "summary")]
    rationale: String,
    #[serde(default)]
    key_requirements: Vec<String>,
    #[serde(default)]
    potential_concerns: Vec<String>,
}

/// A validated assessment of one posting.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub breakdown: ScoreBreakdown,
    pub rationale: String,
    pub key_requirements: Vec<String>,
    pub potential_concerns: Vec<String>,
}

/// Parse and validate raw oracle text. Values above a cap are rejected, never clamped.
pub fn parse_assessment(text: &str) -> Result<Assessment, ScoringError> {
    let raw: RawAssessment = extract_json(text).map_err(ScoringError::Malformed)?;
    let s = &raw.scores;
    let breakdown = ScoreBreakdown::new(
        s.location.value(),
        s.role.value(),
        s.industry.value(),
        s.seniority.value(),
        s.skills.value(),
        s.impact.value(),
    )?;
    Ok(Assessment {
        breakdown,
        rationale: raw.rationale.trim().to_string(),
        key_requirements: raw.key_requirements,
        potential_concerns: raw.potential_concerns,
    })
}

pub struct Scorer {
    oracle: DynOracle,
    profile: Arc<MasterProfile>,
    max_tokens: u32,
}

impl Scorer {
    pub fn new(oracle: DynOracle, profile: Arc<MasterProfile>, max_tokens: u32) -> Self {
        Self {
            oracle,
            profile,
            max_tokens,
        }
    }

    /// Exactly one oracle attempt. Failures are counted and logged with the posting URL.
    pub async fn score(
        &self,
        posting: &Posting,
        criteria: &CriteriaSet,
    ) -> Result<Assessment, ScoringError> {
        let candidate = prompts::candidate_summary(&self.profile, criteria);
        let req = OracleRequest {
            task: OracleTask::ScorePosting,
            system: prompts::SCORING_SYSTEM.to_string(),
            prompt: prompts::scoring(posting, &candidate),
            max_tokens: self.max_tokens,
        };

        let res = match self.oracle.complete(&req).await {
            Ok(text) => parse_assessment(&text),
            Err(e) => Err(ScoringError::from(e)),
        };
        match &res {
            Ok(a) => tracing::debug!(
                url = %posting.url,
                total = a.breakdown.total(),
                "posting scored"
            ),
            Err(e) => {
                counter!("scoring_failures_total").increment(1);
                tracing::warn!(
                    url = %posting.url,
                    title = %posting.title,
                    company = %posting.company,
                    error = %e,
                    "scoring failed, posting dropped for this run"
                );
            }
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detailed_and_aliased_scores_parse() {
        let a = parse_assessment(
            r#"```json
{"scores": {"location_fit": {"score": 20, "reason": "Paris"}, "role_alignment": 18,
 "industry": 10, "seniority": 7, "skills": 11, "impact": 5},
 "summary": "Good fit.", "key_requirements": ["Python"]}
```"#,
        )
        .unwrap();
        assert_eq!(a.breakdown.total(), 71.0);
        assert_eq!(a.rationale, "Good fit.");
        assert_eq!(a.key_requirements, vec!["Python".to_string()]);
        assert!(a.potential_concerns.is_empty());
    }

    #[test]
    fn missing_dimension_is_malformed() {
        let err = parse_assessment(
            r#"{"scores": {"location": 20, "role": 18, "industry": 10, "seniority": 7, "skills": 11}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ScoringError::Malformed(_)));
    }

    #[test]
    fn over_cap_is_rejected() {
        let err = parse_assessment(
            r#"{"scores": {"location": 30, "role": 18, "industry": 10, "seniority": 7, "skills": 11, "impact": 5}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ScoringError::OutOfRange { field: "location", .. }));
    }
}
