use itertools::Itertools;

use crate::database::sqlite::models::NewResume;

/// Build the text that represents a resume in vector space.
///
/// Parts are taken in a fixed order: summary, skills, experience, education,
/// contact values. Empty parts are skipped and the rest are joined with single
/// spaces. Query text is embedded as-is and never goes through this function.
#[inline]
pub fn resume_embedding_text(resume: &NewResume) -> String {
    let skills = resume.skills.iter().join(" ");
    let contact = resume.contact.values().join(" ");

    [
        resume.summary.as_deref().unwrap_or_default(),
        skills.as_str(),
        resume.experience.as_deref().unwrap_or_default(),
        resume.education.as_deref().unwrap_or_default(),
        contact.as_str(),
    ]
    .into_iter()
    .filter(|part| !part.is_empty())
    .join(" ")
}
