use thiserror::Error;
use tracing::{info, warn};

use crate::ai::{new_id, Generator};
use crate::catalog::Catalog;
use crate::models::{Bid, JobOpportunity, OpportunityType, Persona, TailoredResume, UserProfile};

#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub keywords: String,
    pub location: Option<String>,
    pub filter: Option<OpportunityType>,
}

/// Where a result list came from, so screens can flag offline results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Generated,
    Catalog,
}

#[derive(Debug, Error, PartialEq)]
pub enum ApplicationError {
    #[error("You have already applied to '{0}'")]
    AlreadyApplied(String),
}

fn search_location(profile: &UserProfile, query: &SearchQuery) -> String {
    query
        .location
        .clone()
        .filter(|l| !l.trim().is_empty())
        .or_else(|| Some(profile.location.clone()).filter(|l| !l.trim().is_empty()))
        .unwrap_or_else(|| "Remote".to_string())
}

/// Asks the generation service for listings; falls back to the local catalog
/// when the call fails or nothing generated survives the type filter.
pub fn search(
    generator: &dyn Generator,
    catalog: &Catalog,
    profile: &UserProfile,
    query: &SearchQuery,
) -> (Vec<JobOpportunity>, Source) {
    let industry = profile.industry.as_deref().unwrap_or("General");
    let location = search_location(profile, query);

    match generator.generate_marketplace_opportunities(
        industry,
        &location,
        &query.keywords,
        query.filter,
        profile.primary_focus,
    ) {
        Ok(jobs) => {
            let jobs: Vec<JobOpportunity> = match query.filter {
                Some(kind) => jobs.into_iter().filter(|j| j.kind == kind).collect(),
                None => jobs,
            };
            if jobs.is_empty() {
                warn!("no generated listings match, using catalog");
                return (catalog.search_jobs(&query.keywords, query.filter), Source::Catalog);
            }
            info!(count = jobs.len(), "generated marketplace listings");
            (jobs, Source::Generated)
        }
        Err(e) => {
            warn!(error = %e, "marketplace generation failed, using catalog");
            (catalog.search_jobs(&query.keywords, query.filter), Source::Catalog)
        }
    }
}

/// Open tenders for contractors, with the seed bids as fallback.
pub fn tenders(generator: &dyn Generator, catalog: &Catalog, profile: &UserProfile) -> (Vec<Bid>, Source) {
    let industry = profile.industry.as_deref().unwrap_or("General");
    let location = if profile.location.trim().is_empty() {
        "Remote"
    } else {
        profile.location.as_str()
    };
    match generator.generate_opportunities(industry, location) {
        Ok(bids) if !bids.is_empty() => (bids, Source::Generated),
        Ok(_) => (catalog.bids.clone(), Source::Catalog),
        Err(e) => {
            warn!(error = %e, "tender generation failed, using catalog");
            (catalog.bids.clone(), Source::Catalog)
        }
    }
}

pub fn fallback_resume(profile: &UserProfile, job: &JobOpportunity) -> String {
    let mut tailored = String::new();
    tailored.push_str(&format!("# {} - Tailored for: {}\n\n", profile.name, job.title));
    tailored.push_str(&format!("**Position**: {} at {}\n\n", job.title, job.company));
    if !job.skills.is_empty() {
        tailored.push_str(&format!("**Key skills for this role**: {}\n\n", job.skills.join(", ")));
    }
    tailored.push_str("---\n\n");
    tailored.push_str(&profile.resume_text);
    tailored.push('\n');
    tailored
}

pub fn fallback_cover_letter(profile: &UserProfile, job: &JobOpportunity) -> String {
    let focus = if job.kind == OpportunityType::Tender || profile.primary_focus == Some(Persona::Contractor) {
        "our capability to deliver this engagement"
    } else {
        "my fit for this role"
    };
    format!(
        "Dear {company} team,\n\n\
        I am writing to express interest in the {title} opportunity. My background in {industry} \
        and experience as {role} speak directly to {focus}.\n\n\
        I would welcome the chance to discuss how I can contribute.\n\n\
        Kind regards,\n{name}",
        company = job.company,
        title = job.title,
        industry = profile.industry.as_deref().unwrap_or("my field"),
        role = if profile.role.is_empty() { "a practitioner" } else { profile.role.as_str() },
        name = profile.name,
    )
}

/// Confirms an application: tailors the resume and cover letter (with local
/// templates if generation fails) and returns the next profile with the job
/// id and one history entry appended. A second confirmation for the same job
/// is rejected and changes nothing.
pub fn confirm_application(
    generator: &dyn Generator,
    profile: &UserProfile,
    job: &JobOpportunity,
) -> Result<UserProfile, ApplicationError> {
    if profile.has_applied(&job.id) {
        return Err(ApplicationError::AlreadyApplied(job.title.clone()));
    }
    let content = generator
        .tailor_resume_to_job(&profile.resume_text, &job.title, &job.description)
        .unwrap_or_else(|e| {
            warn!(error = %e, job = %job.id, "resume tailoring failed, using template");
            fallback_resume(profile, job)
        });
    let cover_letter = generator
        .generate_cover_letter(job, &profile.resume_text)
        .unwrap_or_else(|e| {
            warn!(error = %e, job = %job.id, "cover letter failed, using template");
            fallback_cover_letter(profile, job)
        });

    let mut next = profile.clone();
    next.applied_job_ids.push(job.id.clone());
    next.resume_history.push(TailoredResume {
        id: new_id("resume"),
        job_id: job.id.clone(),
        job_title: job.title.clone(),
        company: job.company.clone(),
        content,
        cover_letter,
        created_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    });
    info!(job = %job.id, "application confirmed");
    Ok(next)
}

/// Saves or unsaves a listing. Returns the next profile and whether the job
/// is now saved.
pub fn toggle_saved(profile: &UserProfile, job_id: &str) -> (UserProfile, bool) {
    let mut next = profile.clone();
    if let Some(pos) = next.saved_job_ids.iter().position(|id| id == job_id) {
        next.saved_job_ids.remove(pos);
        (next, false)
    } else {
        next.saved_job_ids.push(job_id.to_string());
        (next, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::FakeGenerator;
    use crate::session::Session;
    use crate::store::Database;

    fn applicant() -> UserProfile {
        UserProfile {
            name: "Ada".to_string(),
            industry: Some("Mining".to_string()),
            primary_focus: Some(Persona::Contractor),
            resume_text: "Surveyor with ten years on mine sites.".to_string(),
            ..Default::default()
        }
    }

    fn job() -> JobOpportunity {
        Catalog::default().jobs[0].clone()
    }

    #[test]
    fn test_search_uses_generated_results() {
        let generated = vec![JobOpportunity {
            id: "g1".to_string(),
            ..job()
        }];
        let generator = FakeGenerator {
            opportunities: Some(generated.clone()),
            ..Default::default()
        };
        let (jobs, source) = search(&generator, &Catalog::default(), &applicant(), &SearchQuery::default());
        assert_eq!(source, Source::Generated);
        assert_eq!(jobs, generated);
        assert_eq!(*generator.last_persona.borrow(), Some(Persona::Contractor));
    }

    #[test]
    fn test_search_falls_back_to_catalog() {
        let query = SearchQuery {
            keywords: "python".to_string(),
            ..Default::default()
        };
        let (jobs, source) = search(&FakeGenerator::default(), &Catalog::default(), &applicant(), &query);
        assert_eq!(source, Source::Catalog);
        assert_eq!(jobs.len(), 1);

        let empty = FakeGenerator {
            opportunities: Some(vec![]),
            ..Default::default()
        };
        let (_, source) = search(&empty, &Catalog::default(), &applicant(), &query);
        assert_eq!(source, Source::Catalog);
    }

    #[test]
    fn test_search_falls_back_when_filter_removes_everything() {
        let generator = FakeGenerator {
            opportunities: Some(vec![JobOpportunity {
                id: "g-contract".to_string(),
                kind: OpportunityType::Contract,
                ..job()
            }]),
            ..Default::default()
        };
        let query = SearchQuery {
            filter: Some(OpportunityType::Executive),
            ..Default::default()
        };
        let (jobs, source) = search(&generator, &Catalog::default(), &applicant(), &query);
        assert_eq!(source, Source::Catalog);
        assert!(!jobs.is_empty());
        assert!(jobs.iter().all(|j| j.kind == OpportunityType::Executive));
    }

    #[test]
    fn test_tenders_fallback() {
        let catalog = Catalog::default();
        let (bids, source) = tenders(&FakeGenerator::default(), &catalog, &applicant());
        assert_eq!(source, Source::Catalog);
        assert_eq!(bids, catalog.bids);
    }

    #[test]
    fn test_confirm_application_appends_once() {
        let generator = FakeGenerator {
            tailored: Some("tailored".to_string()),
            cover_letter: Some("letter".to_string()),
            ..Default::default()
        };
        let job = job();
        let first = confirm_application(&generator, &applicant(), &job).unwrap();
        assert_eq!(first.applied_job_ids, vec![job.id.clone()]);
        assert_eq!(first.resume_history.len(), 1);
        assert_eq!(first.resume_history[0].content, "tailored");
        assert_eq!(first.resume_history[0].cover_letter, "letter");

        let second = confirm_application(&generator, &first, &job);
        assert_eq!(second, Err(ApplicationError::AlreadyApplied(job.title.clone())));
        assert_eq!(first.applied_job_ids.len(), 1);
        assert_eq!(first.resume_history.len(), 1);
    }

    #[test]
    fn test_confirm_application_from_two_stale_renders() {
        // Two screens rendered from the same profile both confirm before
        // either sees the other's write.
        let mut session = Session::start(Database::open_in_memory().unwrap()).unwrap();
        session.login(applicant()).unwrap();
        let stale = session.profile().clone();
        let generator = FakeGenerator::default();
        let job = job();

        let first = confirm_application(&generator, &stale, &job).unwrap();
        let second = confirm_application(&generator, &stale, &job).unwrap();
        session.update_profile(first).unwrap();
        session.update_profile(second).unwrap();

        let stored = session.db().restore_session().unwrap().unwrap();
        assert_eq!(stored.applied_job_ids.iter().filter(|id| **id == job.id).count(), 1);
        assert_eq!(stored.resume_history.len(), 1);
        assert_eq!(stored, *session.profile());
    }

    #[test]
    fn test_confirm_application_uses_templates_on_failure() {
        let job = job();
        let next = confirm_application(&FakeGenerator::default(), &applicant(), &job).unwrap();
        let entry = &next.resume_history[0];
        assert!(entry.content.contains("Tailored for: Operations Manager"));
        assert!(entry.content.contains("Surveyor with ten years"));
        assert!(entry.cover_letter.starts_with("Dear Northwind Resources team"));
    }

    #[test]
    fn test_confirm_application_without_resume() {
        let mut profile = applicant();
        profile.resume_text.clear();
        let job = job();
        let next = confirm_application(&FakeGenerator::default(), &profile, &job).unwrap();
        assert_eq!(next.applied_job_ids, vec![job.id.clone()]);
        assert_eq!(next.resume_history.len(), 1);
        assert!(next.resume_history[0].content.contains("Tailored for: Operations Manager"));
        assert!(next.resume_history[0].cover_letter.contains("Ada"));
    }

    #[test]
    fn test_toggle_saved() {
        let (saved, is_saved) = toggle_saved(&applicant(), "job-cfo");
        assert!(is_saved);
        assert_eq!(saved.saved_job_ids, vec!["job-cfo".to_string()]);
        let (unsaved, is_saved) = toggle_saved(&saved, "job-cfo");
        assert!(!is_saved);
        assert!(unsaved.saved_job_ids.is_empty());
    }
}
