// tests/scoring_oracle.rs
//
// Scorer against a stub oracle: one call per posting, fail-closed parsing.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use jobhunter::config::profile::MasterProfile;
use jobhunter::config::Settings;
use jobhunter::error::{OracleError, ScoringError};
use jobhunter::llm::{OracleTask, StubOracle};
use jobhunter::model::{CriteriaSet, Posting};
use jobhunter::scoring::Scorer;

fn posting() -> Posting {
    Posting {
        title: "Quantitative Analyst".into(),
        company: "Acme Bank".into(),
        location: "Lyon".into(),
        description: "Derivatives pricing in Python.".into(),
        url: "https://acme.test/jobs/1".into(),
        source: "test".into(),
        posted_date: None,
        discovered_at: Utc::now(),
        salary: None,
    }
}

fn criteria() -> CriteriaSet {
    let mut c = Settings::default().fallback_criteria();
    c.location_weights = BTreeMap::from([("Lyon".to_string(), 95), ("Paris".to_string(), 100)]);
    c
}

fn scorer_with(answer: &str) -> (Arc<StubOracle>, Scorer) {
    let oracle = Arc::new(StubOracle::fixed(HashMap::from([(
        OracleTask::ScorePosting,
        answer.to_string(),
    )])));
    let scorer = Scorer::new(oracle.clone(), Arc::new(MasterProfile::default()), 1_000);
    (oracle, scorer)
}

#[tokio::test]
async fn fenced_answer_is_accepted_and_prompt_carries_preferences() {
    let answer = r#"Here is my assessment:
```json
{"scores": {"location": {"score": 22, "reason": "Lyon"}, "role": 24, "industry": 14,
            "seniority": 8, "skills": 13, "impact": 7},
 "summary": "Strong quant fit.",
 "key_requirements": ["Python", "Derivatives"]}
```"#;
    let (oracle, scorer) = scorer_with(answer);
    let a = scorer.score(&posting(), &criteria()).await.unwrap();

    assert_eq!(a.breakdown.total(), 88.0);
    assert_eq!(a.rationale, "Strong quant fit.");
    assert_eq!(a.key_requirements.len(), 2);

    let calls = oracle.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].prompt.contains("Paris (100), Lyon (95)"));
    assert!(calls[0].prompt.contains("Company: Acme Bank"));
}

#[tokio::test]
async fn over_cap_value_fails_the_posting() {
    let (oracle, scorer) = scorer_with(
        r#"{"scores": {"location": 30, "role": 20, "industry": 10,
                       "seniority": 5, "skills": 10, "impact": 5}}"#,
    );
    let err = scorer.score(&posting(), &criteria()).await.unwrap_err();
    assert!(matches!(err, ScoringError::OutOfRange { field: "location", .. }));
    assert_eq!(oracle.call_count(OracleTask::ScorePosting), 1, "no retry");
}

#[tokio::test]
async fn prose_without_json_is_malformed() {
    let (_, scorer) = scorer_with("I would rate this posting quite highly overall.");
    let err = scorer.score(&posting(), &criteria()).await.unwrap_err();
    assert!(matches!(err, ScoringError::Malformed(_)));
}

#[tokio::test]
async fn oracle_failure_is_a_scoring_failure_without_retry() {
    let oracle = Arc::new(StubOracle::new(|_| {
        Err(OracleError::Timeout(std::time::Duration::from_secs(90)))
    }));
    let scorer = Scorer::new(oracle.clone(), Arc::new(MasterProfile::default()), 1_000);
    let err = scorer.score(&posting(), &criteria()).await.unwrap_err();
    assert!(matches!(err, ScoringError::Oracle(OracleError::Timeout(_))));
    assert_eq!(oracle.calls().len(), 1);
}
