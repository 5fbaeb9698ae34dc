// src/config/profile.rs
//! Master profile (the candidate's full CV data) used by scoring and generation.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Personal {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub linkedin: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Experience {
    pub company: String,
    pub title: String,
    pub dates: String,
    pub location: String,
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Education {
    pub institution: String,
    pub degree: String,
    pub location: String,
    pub dates: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterProfile {
    pub personal: Personal,
    pub summary: String,
    pub experience: Vec<Experience>,
    pub education: Vec<Education>,
    pub skills: Vec<String>,
}

const FALLBACK_SUMMARY: &str =
    "Solution architect with finance background; Python, SQL and data analytics.";

impl MasterProfile {
    pub fn load(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("reading master profile {}", path.display()))?;
        serde_json::from_str(&s).with_context(|| format!("parsing {}", path.display()))
    }

    /// Load the profile, falling back to an empty one (with a warning) when absent.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "master profile unavailable, using fallback summary");
                Self::default()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.summary.is_empty() && self.experience.is_empty() && self.skills.is_empty()
    }

    /// Compact candidate summary for prompts: profile, two most recent roles, skills.
    pub fn summary_text(&self) -> String {
        if self.is_empty() {
            return FALLBACK_SUMMARY.to_string();
        }
        let mut out = Vec::new();
        if !self.personal.name.is_empty() {
            out.push(format!("Name: {}", self.personal.name));
        }
        if !self.summary.is_empty() {
            out.push(format!("Profile: {}", self.summary));
        }
        if !self.experience.is_empty() {
            out.push("Key experience:".to_string());
            for exp in self.experience.iter().take(2) {
                out.push(format!("- {} at {} ({})", exp.title, exp.company, exp.dates));
                for b in exp.bullets.iter().take(2) {
                    let short: String = b.chars().take(150).collect();
                    out.push(format!("  * {short}"));
                }
            }
        }
        if !self.skills.is_empty() {
            out.push(format!("Skills: {}", self.skills.join(", ")));
        }
        out.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_profile_uses_fallback() {
        assert_eq!(MasterProfile::default().summary_text(), FALLBACK_SUMMARY);
    }

    #[test]
    fn summary_takes_two_roles() {
        let p: MasterProfile = serde_json::from_str(
            r#"{
              "personal": {"name": "Alex Doe"},
              "summary": "Quant-minded engineer.",
              "experience": [
                {"company": "A", "title": "Engineer", "dates": "2023-", "bullets": ["x", "y", "z"]},
                {"company": "B", "title": "Analyst", "dates": "2020-2023"},
                {"company": "C", "title": "Intern", "dates": "2019"}
              ],
              "skills": ["python", "sql"]
            }"#,
        )
        .unwrap();
        let s = p.summary_text();
        assert!(s.contains("Name: Alex Doe"));
        assert!(s.contains("Engineer at A"));
        assert!(s.contains("Analyst at B"));
        assert!(!s.contains("Intern at C"));
        assert!(!s.contains("* z"));
        assert!(s.contains("Skills: python, sql"));
    }
}
