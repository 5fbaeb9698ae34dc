// src/llm/prompts.rs
//! Prompt templates. Every template asks for JSON only; answers are parsed
//! with [`super::extract_json`].

use crate::config::profile::MasterProfile;
use crate::model::{ApplicationRecord, CriteriaSet, Posting};

/// Longest job description passed to the oracle.
const MAX_DESCRIPTION_CHARS: usize = 4000;

pub const SCORING_SYSTEM: &str = "You are an expert career advisor evaluating job opportunities. \
Answer with a single JSON object and nothing else.";

pub const WRITER_SYSTEM: &str = "You are an expert CV and cover letter writer specialising in \
finance and technology roles. Answer with a single JSON object and nothing else.";

fn clip(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max).collect();
        out.push_str("...");
        out
    }
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "- (none)".to_string();
    }
    items
        .iter()
        .map(|i| format!("- {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Candidate summary given to the scorer: profile summary plus the criteria preferences.
pub fn candidate_summary(profile: &MasterProfile, criteria: &CriteriaSet) -> String {
    let mut out = profile.summary_text();
    if !criteria.keywords.is_empty() {
        out.push_str("\n\nTarget roles: ");
        out.push_str(&criteria.keywords.join(", "));
    }
    let locs: Vec<String> = criteria
        .locations()
        .into_iter()
        .map(|l| {
            let w = criteria.location_weights.get(&l).copied().unwrap_or(0);
            format!("{l} ({w})")
        })
        .collect();
    if !locs.is_empty() {
        out.push_str("\nPreferred locations (weight 0-100): ");
        out.push_str(&locs.join(", "));
    }
    out
}

pub fn scoring(posting: &Posting, candidate: &str) -> String {
    format!(
        r#"## Candidate Profile
{candidate}

## Job Posting
Title: {title}
Company: {company}
Location: {location}
Description:
{description}

## Scoring Task
Score the posting on each dimension. Every score must stay within its range.
1. location (0-25): fit with the preferred locations and their weights
2. role (0-25): alignment of the role with the target roles
3. industry (0-15): fit with finance, fintech, technology, AI/ML
4. seniority (0-10): match between the level of the role and the candidate
5. skills (0-15): overlap between required skills and the candidate's skills
6. impact (0-10): ownership, autonomy and scope of the role

## Output Format (JSON only, no markdown)
{{
  "scores": {{"location": 0, "role": 0, "industry": 0, "seniority": 0, "skills": 0, "impact": 0}},
  "rationale": "2-3 sentence assessment",
  "key_requirements": ["req1", "req2"],
  "potential_concerns": ["concern1"]
}}"#,
        title = posting.title,
        company = posting.company,
        location = if posting.location.is_empty() { "Not specified" } else { &posting.location },
        description = clip(&posting.description, MAX_DESCRIPTION_CHARS),
    )
}

pub fn tailor_cv(record: &ApplicationRecord, profile: &MasterProfile) -> String {
    let master = serde_json::to_string_pretty(profile).unwrap_or_default();
    format!(
        r#"## Task
Tailor the candidate's CV for the following job application.

## Master CV
{master}

## Target Job
Title: {title}
Company: {company}
Description:
{description}

Key Requirements Identified:
{requirements}

## Instructions
1. Select or adapt the most relevant profile summary
2. Choose the 3-4 most relevant roles, with 3-5 bullets each
3. Reframe bullets to emphasise skills matching the requirements
4. Let keywords from the description appear naturally

## Output Format (JSON only, no markdown)
{{
  "profile": "Tailored profile summary",
  "experience": [
    {{"company": "...", "title": "...", "dates": "...", "location": "...", "bullets": ["..."]}}
  ],
  "skills_to_highlight": ["skill1"],
  "keywords_incorporated": ["keyword1"]
}}"#,
        title = record.posting.title,
        company = record.posting.company,
        description = clip(&record.posting.description, MAX_DESCRIPTION_CHARS),
        requirements = bullet_list(&record.key_requirements),
    )
}

pub fn company_research(company: &str, role: &str) -> String {
    format!(
        r#"Provide a brief (2-3 sentences) summary of {company} that would be useful for a cover letter
for the role "{role}". Focus on mission, recent developments and what makes it distinctive.

## Output Format (JSON only, no markdown)
{{"summary": "..."}}"#
    )
}

pub fn cover_letter(record: &ApplicationRecord, candidate: &str, research: &str) -> String {
    format!(
        r#"## Task
Write a compelling cover letter for this job application.

## Candidate
{candidate}

## Target Job
Company: {company}
Title: {title}
Description: {description}

## Company Research
{research}

## Constraints
- 250-400 words, professional but personable
- Reference something specific about the company
- 2-3 achievements that address the job requirements
- No generic openings such as "I am writing to apply for"

## Output Format (JSON only, no markdown)
{{"cover_letter": "full letter text"}}"#,
        company = record.posting.company,
        title = record.posting.title,
        description = clip(&record.posting.description, MAX_DESCRIPTION_CHARS),
    )
}

pub fn interview_prep(record: &ApplicationRecord, candidate: &str) -> String {
    format!(
        r#"Prepare the candidate for an interview.

Job Title: {title}
Company: {company}
Job Description: {description}

Candidate Background:
{candidate}

Provide company research (overview, recent news, culture, competitors), likely interview
questions (technical and behavioural), personalised talking points and questions the
candidate should ask.

## Output Format (JSON only, no markdown)
{{
  "company_research": "...",
  "likely_questions": ["..."],
  "talking_points": ["..."],
  "questions_to_ask": ["..."]
}}"#,
        title = record.posting.title,
        company = record.posting.company,
        description = clip(&record.posting.description, MAX_DESCRIPTION_CHARS),
    )
}
