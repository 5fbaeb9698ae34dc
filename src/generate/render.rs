// src/generate/render.rs
//! Markdown renderers for generated artifacts.

use std::fmt::Write as _;

use chrono::NaiveDate;

use crate::config::profile::MasterProfile;
use crate::generate::TailoredCv;
use crate::model::{ApplicationRecord, InterviewPrep};

fn contact_line(profile: &MasterProfile) -> String {
    let p = &profile.personal;
    [p.email.as_str(), p.phone.as_str(), p.linkedin.as_str()]
        .iter()
        .filter(|s| !s.trim().is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" | ")
}

fn list(out: &mut String, items: &[String]) {
    for i in items {
        let _ = writeln!(out, "- {i}");
    }
}

pub fn cv_markdown(cv: &TailoredCv, profile: &MasterProfile, record: &ApplicationRecord) -> String {
    let mut out = String::new();
    let name = if profile.personal.name.is_empty() {
        "Curriculum Vitae"
    } else {
        profile.personal.name.as_str()
    };
    let _ = writeln!(out, "# {name}\n");
    let contact = contact_line(profile);
    if !contact.is_empty() {
        let _ = writeln!(out, "{contact}\n");
    }
    let _ = writeln!(
        out,
        "_Tailored for {} at {}_\n",
        record.posting.title, record.posting.company
    );

    if !cv.profile.trim().is_empty() {
        let _ = writeln!(out, "## Profile\n\n{}\n", cv.profile.trim());
    }

    if !cv.experience.is_empty() {
        out.push_str("## Experience\n\n");
        for e in &cv.experience {
            let _ = writeln!(out, "### {} | {}", e.title, e.company);
            let meta: Vec<&str> = [e.dates.as_str(), e.location.as_str()]
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect();
            if !meta.is_empty() {
                let _ = writeln!(out, "_{}_", meta.join(", "));
            }
            out.push('\n');
            list(&mut out, &e.bullets);
            out.push('\n');
        }
    }

    if !profile.education.is_empty() {
        out.push_str("## Education\n\n");
        for ed in &profile.education {
            let _ = writeln!(out, "- **{}**, {} ({})", ed.degree, ed.institution, ed.dates);
        }
        out.push('\n');
    }

    let skills = if cv.skills_to_highlight.is_empty() {
        &profile.skills
    } else {
        &cv.skills_to_highlight
    };
    if !skills.is_empty() {
        let _ = writeln!(out, "## Skills\n\n{}", skills.join(", "));
    }
    out
}

pub fn cover_letter_markdown(
    letter: &str,
    profile: &MasterProfile,
    record: &ApplicationRecord,
    date: NaiveDate,
) -> String {
    let mut out = String::new();
    if !profile.personal.name.is_empty() {
        let _ = writeln!(out, "**{}**  ", profile.personal.name);
    }
    let contact = contact_line(profile);
    if !contact.is_empty() {
        let _ = writeln!(out, "{contact}");
    }
    let _ = writeln!(out, "\n{}\n", date.format("%d %B %Y"));
    let _ = writeln!(out, "Hiring Manager  \n{}\n", record.posting.company);
    let _ = writeln!(out, "**Re: Application for {}**\n", record.posting.title);
    for para in letter.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let _ = writeln!(out, "{para}\n");
    }
    out
}

pub fn prep_markdown(prep: &InterviewPrep, record: &ApplicationRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "# Interview prep: {} at {}\n",
        record.posting.title, record.posting.company
    );
    if !record.posting.url.is_empty() {
        let _ = writeln!(out, "Posting: {}\n", record.posting.url);
    }
    let _ = writeln!(out, "## Company research\n\n{}\n", prep.company_research.trim());
    out.push_str("## Likely questions\n\n");
    list(&mut out, &prep.likely_questions);
    out.push_str("\n## Talking points\n\n");
    list(&mut out, &prep.talking_points);
    out.push_str("\n## Questions to ask\n\n");
    list(&mut out, &prep.questions_to_ask);
    out
}
