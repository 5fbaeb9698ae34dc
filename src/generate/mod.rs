// src/generate/mod.rs
//! Artifact generation: tailored CV, cover letter and interview prep, each
//! rendered to Markdown and uploaded to document storage.

pub mod render;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use crate::config::profile::{Experience, MasterProfile};
use crate::error::GenerationError;
use crate::llm::{extract_json, prompts, DynOracle, OracleRequest, OracleTask};
use crate::model::{ApplicationRecord, ArtifactLinks, InterviewPrep};
use crate::storage::{ArtifactKind, ArtifactPath, DocumentStorage, MARKDOWN_MIME};

/// Sections returned by the CV tailoring call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TailoredCv {
    pub profile: String,
    pub experience: Vec<Experience>,
    pub skills_to_highlight: Vec<String>,
    pub keywords_incorporated: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ResearchAnswer {
    summary: String,
}

#[derive(Debug, Deserialize)]
struct CoverLetterAnswer {
    cover_letter: String,
}

#[derive(Debug, Deserialize)]
struct PrepAnswer {
    #[serde(default)]
    company_research: String,
    #[serde(default)]
    likely_questions: Vec<String>,
    #[serde(default)]
    talking_points: Vec<String>,
    #[serde(default)]
    questions_to_ask: Vec<String>,
}

const NO_RESEARCH: &str = "No company research available.";

#[async_trait]
pub trait ArtifactGenerator: Send + Sync {
    /// CV + cover letter. Both must succeed; links are returned only then.
    async fn application_materials(&self, record: &ApplicationRecord) -> Result<ArtifactLinks, GenerationError>;

    /// Interview prep material with the uploaded document link.
    async fn interview_prep(&self, record: &ApplicationRecord) -> Result<InterviewPrep, GenerationError>;
}

pub struct Generator {
    oracle: DynOracle,
    storage: Arc<dyn DocumentStorage>,
    profile: Arc<MasterProfile>,
    max_tokens: u32,
}

impl Generator {
    pub fn new(
        oracle: DynOracle,
        storage: Arc<dyn DocumentStorage>,
        profile: Arc<MasterProfile>,
        max_tokens: u32,
    ) -> Self {
        Self {
            oracle,
            storage,
            profile,
            max_tokens,
        }
    }

    async fn ask(&self, task: OracleTask, prompt: String) -> Result<String, GenerationError> {
        let req = OracleRequest {
            task,
            system: prompts::WRITER_SYSTEM.to_string(),
            prompt,
            max_tokens: self.max_tokens,
        };
        Ok(self.oracle.complete(&req).await?)
    }

    async fn upload(
        &self,
        kind: ArtifactKind,
        record: &ApplicationRecord,
        markdown: String,
    ) -> Result<String, GenerationError> {
        let path = ArtifactPath::new(kind, &record.posting.company, &record.posting.title, Utc::now());
        let url = self
            .storage
            .upload(markdown.into_bytes(), &path, MARKDOWN_MIME)
            .await?;
        tracing::info!(key = %record.key, file = %path.display(), %url, "artifact uploaded");
        Ok(url)
    }

    pub async fn tailor_cv(&self, record: &ApplicationRecord) -> Result<TailoredCv, GenerationError> {
        let text = self
            .ask(OracleTask::TailorCv, prompts::tailor_cv(record, &self.profile))
            .await?;
        let cv: TailoredCv = extract_json(&text).map_err(GenerationError::Malformed)?;
        if cv.profile.trim().is_empty() && cv.experience.is_empty() {
            return Err(GenerationError::Malformed("tailored CV is empty".into()));
        }
        Ok(cv)
    }

    /// Short research summary for the letter. Optional context: failures fall back to a placeholder.
    async fn research(&self, record: &ApplicationRecord) -> String {
        let prompt = prompts::company_research(&record.posting.company, &record.posting.title);
        let answer = match self.ask(OracleTask::CompanyResearch, prompt).await {
            Ok(text) => extract_json::<ResearchAnswer>(&text).map_err(GenerationError::Malformed),
            Err(e) => Err(e),
        };
        match answer {
            Ok(a) if !a.summary.trim().is_empty() => a.summary,
            Ok(_) => NO_RESEARCH.to_string(),
            Err(e) => {
                tracing::warn!(company = %record.posting.company, error = %e, "company research failed");
                NO_RESEARCH.to_string()
            }
        }
    }

    pub async fn write_cover_letter(&self, record: &ApplicationRecord) -> Result<String, GenerationError> {
        let research = self.research(record).await;
        let candidate = self.profile.summary_text();
        let text = self
            .ask(
                OracleTask::CoverLetter,
                prompts::cover_letter(record, &candidate, &research),
            )
            .await?;
        let letter: CoverLetterAnswer = extract_json(&text).map_err(GenerationError::Malformed)?;
        if letter.cover_letter.trim().is_empty() {
            return Err(GenerationError::Malformed("empty cover letter".into()));
        }
        Ok(letter.cover_letter)
    }
}

#[async_trait]
impl ArtifactGenerator for Generator {
    async fn application_materials(&self, record: &ApplicationRecord) -> Result<ArtifactLinks, GenerationError> {
        let cv = self.tailor_cv(record).await?;
        let letter = self.write_cover_letter(record).await?;

        let cv_url = self
            .upload(ArtifactKind::Cv, record, render::cv_markdown(&cv, &self.profile, record))
            .await?;
        let today = Utc::now().date_naive();
        let cl_url = self
            .upload(
                ArtifactKind::CoverLetter,
                record,
                render::cover_letter_markdown(&letter, &self.profile, record, today),
            )
            .await?;
        Ok(ArtifactLinks {
            tailored_cv: Some(cv_url),
            cover_letter: Some(cl_url),
        })
    }

    async fn interview_prep(&self, record: &ApplicationRecord) -> Result<InterviewPrep, GenerationError> {
        let candidate = self.profile.summary_text();
        let text = self
            .ask(OracleTask::InterviewPrep, prompts::interview_prep(record, &candidate))
            .await?;
        let a: PrepAnswer = extract_json(&text).map_err(GenerationError::Malformed)?;
        if a.company_research.trim().is_empty() && a.likely_questions.is_empty() {
            return Err(GenerationError::Malformed("interview prep is empty".into()));
        }
        let mut prep = InterviewPrep {
            job_key: record.key.clone(),
            company_research: a.company_research,
            likely_questions: a.likely_questions,
            talking_points: a.talking_points,
            questions_to_ask: a.questions_to_ask,
            document_url: None,
        };
        let url = self
            .upload(ArtifactKind::InterviewPrep, record, render::prep_markdown(&prep, record))
            .await?;
        prep.document_url = Some(url);
        Ok(prep)
    }
}
