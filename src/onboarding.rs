use anyhow::{Context, Result};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::ai::{Generator, ParsedProfile};
use crate::models::{Persona, UserProfile, View};
use crate::session::Session;
use crate::settings::is_valid_email;

/// Minimum resume/bio length, in characters, before ingestion can run.
pub const MIN_RESUME_CHARS: usize = 20;

pub const SUGGESTED_INDUSTRIES: &[&str] = &[
    "Mining",
    "Construction",
    "Energy",
    "Finance",
    "Healthcare",
    "Technology",
    "Government",
    "Logistics",
    "Education",
    "Manufacturing",
    "Retail",
    "Agriculture",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Identity,
    Persona,
    Industry,
    Ingestion,
    Complete,
}

#[derive(Debug, Error, PartialEq)]
pub enum OnboardingError {
    #[error("Please enter your name")]
    MissingName,
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
    #[error("Please choose how you will use CareerOS")]
    MissingPersona,
    #[error("The Admin role cannot be chosen during onboarding")]
    ReservedPersona,
    #[error("Please choose or enter an industry")]
    MissingIndustry,
    #[error("Please provide at least {min} characters (got {got})")]
    ResumeTooShort { min: usize, got: usize },
    #[error("Cannot do that at the {actual:?} step (expected {expected:?})")]
    OutOfOrder { expected: Step, actual: Step },
}

/// Linear first-run wizard. Each `submit_*` validates its step and advances;
/// a validation error leaves the wizard where it was.
#[derive(Debug, Clone)]
pub struct Wizard {
    step: Step,
    name: String,
    email: Option<String>,
    persona: Option<Persona>,
    industry: String,
    resume_text: String,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

impl Wizard {
    pub fn new() -> Self {
        Self {
            step: Step::Identity,
            name: String::new(),
            email: None,
            persona: None,
            industry: String::new(),
            resume_text: String::new(),
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    /// Copy for the ingestion step, which depends on the chosen persona.
    pub fn resume_prompt(&self) -> &'static str {
        self.persona
            .map(|p| p.config().resume_prompt)
            .unwrap_or("Paste your resume or a short bio")
    }

    fn expect(&self, expected: Step) -> Result<(), OnboardingError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(OnboardingError::OutOfOrder {
                expected,
                actual: self.step,
            })
        }
    }

    pub fn submit_identity(&mut self, name: &str, email: Option<&str>) -> Result<(), OnboardingError> {
        self.expect(Step::Identity)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(OnboardingError::MissingName);
        }
        let email = email.map(str::trim).filter(|e| !e.is_empty());
        if let Some(e) = email {
            if !is_valid_email(e) {
                return Err(OnboardingError::InvalidEmail(e.to_string()));
            }
        }
        self.name = name.to_string();
        self.email = email.map(str::to_string);
        self.step = Step::Persona;
        Ok(())
    }

    pub fn submit_persona(&mut self, persona: Option<Persona>) -> Result<(), OnboardingError> {
        self.expect(Step::Persona)?;
        let persona = persona.ok_or(OnboardingError::MissingPersona)?;
        if persona == Persona::Admin {
            return Err(OnboardingError::ReservedPersona);
        }
        self.persona = Some(persona);
        self.step = Step::Industry;
        Ok(())
    }

    pub fn submit_industry(&mut self, industry: &str) -> Result<(), OnboardingError> {
        self.expect(Step::Industry)?;
        let industry = industry.trim();
        if industry.is_empty() {
            return Err(OnboardingError::MissingIndustry);
        }
        self.industry = industry.to_string();
        self.step = Step::Ingestion;
        Ok(())
    }

    /// Validates the free text, runs the profile parser, merges its answer
    /// over the manually entered fields and writes the result to the session.
    /// Parser failure is not fatal: the manual fields are saved on their own.
    pub fn submit_ingestion(
        &mut self,
        text: &str,
        generator: &dyn Generator,
        session: &mut Session,
    ) -> Result<()> {
        self.expect(Step::Ingestion)?;
        let text = text.trim();
        let got = text.chars().count();
        if got < MIN_RESUME_CHARS {
            return Err(OnboardingError::ResumeTooShort {
                min: MIN_RESUME_CHARS,
                got,
            }
            .into());
        }
        let persona = self.persona.ok_or(OnboardingError::MissingPersona)?;
        self.resume_text = text.to_string();

        let parsed = match generator.parse_profile_from_text(text, persona) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(error = %e, "profile parsing failed, keeping manual fields");
                None
            }
        };

        let profile = self.merged_profile(session.profile(), parsed.as_ref());
        session.update_profile(profile)?;
        self.step = Step::Complete;
        info!(persona = %persona, "onboarding complete");
        Ok(())
    }

    fn merged_profile(&self, base: &UserProfile, parsed: Option<&ParsedProfile>) -> UserProfile {
        let mut profile = base.clone();
        profile.name = self.name.clone();
        if let Some(email) = &self.email {
            profile.email = email.clone();
        }
        profile.primary_focus = self.persona;
        profile.industry = Some(self.industry.clone());
        profile.resume_text = self.resume_text.clone();

        let Some(parsed) = parsed else {
            return profile;
        };

        let present = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        if let Some(name) = present(&parsed.name) {
            profile.name = name;
        }
        if let Some(email) = present(&parsed.email).filter(|e| is_valid_email(e)) {
            profile.email = email;
        }
        if let Some(industry) = present(&parsed.industry) {
            profile.industry = Some(industry);
        }
        if let Some(role) = present(&parsed.role) {
            profile.role = role;
        }
        if let Some(location) = present(&parsed.location) {
            profile.location = location;
        }
        for skill in &parsed.skills {
            let skill = skill.trim();
            if !skill.is_empty() && !profile.skills.iter().any(|s| s.eq_ignore_ascii_case(skill)) {
                profile.skills.push(skill.to_string());
            }
        }
        if let Some(value) = parsed.market_value.filter(|v| *v > 0) {
            profile.market_value = value;
        }
        profile
    }

    /// Persona-specific next screen once the wizard is complete.
    pub fn continue_target(&self) -> Option<View> {
        match (self.step, self.persona) {
            (Step::Complete, Some(persona)) => Some(persona.config().continue_target),
            _ => None,
        }
    }

    /// Leaves the completed wizard, either to the persona's target or, when
    /// skipping, to the dashboard. Returns the view actually entered.
    pub fn finish(&self, session: &mut Session, skip: bool) -> Result<View, OnboardingError> {
        self.expect(Step::Complete)?;
        let target = if skip {
            View::Dashboard
        } else {
            self.continue_target().unwrap_or(View::Dashboard)
        };
        Ok(session.change_view(target, None))
    }
}

/// Ranks the suggested industries against free text, best match first.
pub fn suggest_industries(input: &str) -> Vec<&'static str> {
    let input = input.trim().to_lowercase();
    if input.is_empty() {
        return SUGGESTED_INDUSTRIES.to_vec();
    }
    let mut scored: Vec<(&'static str, f64)> = SUGGESTED_INDUSTRIES
        .iter()
        .map(|industry| {
            let lower = industry.to_lowercase();
            let score = if lower.starts_with(&input) {
                1.0
            } else {
                strsim::jaro_winkler(&input, &lower)
            };
            (*industry, score)
        })
        .filter(|(_, score)| *score >= 0.75)
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().take(5).map(|(industry, _)| industry).collect()
}

/// Pulls text out of an uploaded resume. Only plain-text formats are read.
pub fn read_resume_file(path: &Path) -> Result<String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "txt" | "md" | "markdown" | "text" | "" => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read resume file: {}", path.display())),
        other => Err(anyhow::anyhow!(
            "Unsupported resume format '.{}'; paste the text instead",
            other
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::FakeGenerator;
    use crate::store::Database;

    const RESUME_25: &str = "Mine site surveyor, 10 y.";

    fn fresh_session() -> Session {
        Session::start(Database::open_in_memory().unwrap()).unwrap()
    }

    fn wizard_at_ingestion(persona: Persona) -> Wizard {
        let mut wizard = Wizard::new();
        wizard.submit_identity("Ada", None).unwrap();
        wizard.submit_persona(Some(persona)).unwrap();
        wizard.submit_industry("Mining").unwrap();
        wizard
    }

    fn onboarding_error(err: &anyhow::Error) -> Option<&OnboardingError> {
        err.downcast_ref::<OnboardingError>()
    }

    #[test]
    fn test_identity_requires_name() {
        let mut wizard = Wizard::new();
        assert_eq!(wizard.submit_identity("   ", None), Err(OnboardingError::MissingName));
        assert_eq!(wizard.step(), Step::Identity);
        assert!(matches!(
            wizard.submit_identity("Ada", Some("not-an-email")),
            Err(OnboardingError::InvalidEmail(_))
        ));
        wizard.submit_identity("Ada", Some("")).unwrap();
        assert_eq!(wizard.step(), Step::Persona);
    }

    #[test]
    fn test_persona_requires_selection() {
        let mut wizard = Wizard::new();
        wizard.submit_identity("Ada", None).unwrap();
        assert_eq!(wizard.submit_persona(None), Err(OnboardingError::MissingPersona));
        assert_eq!(wizard.step(), Step::Persona);
        wizard.submit_persona(Some(Persona::Executive)).unwrap();
        assert_eq!(wizard.resume_prompt(), Persona::Executive.config().resume_prompt);
    }

    #[test]
    fn test_admin_cannot_be_self_selected() {
        let mut wizard = Wizard::new();
        wizard.submit_identity("Mallory", None).unwrap();
        assert_eq!(
            wizard.submit_persona(Some(Persona::Admin)),
            Err(OnboardingError::ReservedPersona)
        );
        assert_eq!(wizard.step(), Step::Persona);

        wizard.submit_persona(Some(Persona::Recruiter)).unwrap();
        wizard.submit_industry("Finance").unwrap();
        assert!(!wizard.merged_profile(&UserProfile::default(), None).is_admin());
    }

    #[test]
    fn test_industry_required() {
        let mut wizard = Wizard::new();
        wizard.submit_identity("Ada", None).unwrap();
        wizard.submit_persona(Some(Persona::Contractor)).unwrap();
        assert_eq!(wizard.submit_industry(""), Err(OnboardingError::MissingIndustry));
        wizard.submit_industry("Mining").unwrap();
        assert_eq!(wizard.step(), Step::Ingestion);
    }

    #[test]
    fn test_steps_cannot_be_skipped() {
        let mut wizard = Wizard::new();
        assert!(matches!(
            wizard.submit_industry("Mining"),
            Err(OnboardingError::OutOfOrder { expected: Step::Industry, actual: Step::Identity })
        ));
    }

    #[test]
    fn test_ingestion_requires_minimum_text() {
        let mut session = fresh_session();
        let mut wizard = wizard_at_ingestion(Persona::Contractor);
        let generator = FakeGenerator::default();

        let err = wizard.submit_ingestion("too short", &generator, &mut session).unwrap_err();
        assert_eq!(
            onboarding_error(&err),
            Some(&OnboardingError::ResumeTooShort { min: MIN_RESUME_CHARS, got: 9 })
        );
        assert_eq!(wizard.step(), Step::Ingestion);
        assert_eq!(generator.calls.get(), 0);
        assert_eq!(session.profile(), &UserProfile::default());
    }

    #[test]
    fn test_contractor_walkthrough_with_parser_failure() {
        let mut session = fresh_session();
        assert_eq!(session.view(), View::Welcome);

        let mut wizard = wizard_at_ingestion(Persona::Contractor);
        let generator = FakeGenerator::default();
        assert_eq!(RESUME_25.chars().count(), 25);
        wizard.submit_ingestion(RESUME_25, &generator, &mut session).unwrap();

        assert_eq!(wizard.step(), Step::Complete);
        assert_eq!(*generator.last_persona.borrow(), Some(Persona::Contractor));
        let profile = session.profile();
        assert_eq!(profile.primary_focus, Some(Persona::Contractor));
        assert_eq!(profile.industry.as_deref(), Some("Mining"));
        assert_eq!(profile.name, "Ada");

        assert_eq!(wizard.continue_target(), Some(View::Dashboard));
        assert_eq!(wizard.finish(&mut session, false).unwrap(), View::Dashboard);
        let stored = session.db().restore_session().unwrap().unwrap();
        assert_eq!(stored.primary_focus, Some(Persona::Contractor));
    }

    #[test]
    fn test_parsed_fields_win_when_present() {
        let mut session = fresh_session();
        let mut wizard = wizard_at_ingestion(Persona::Contractor);
        let generator = FakeGenerator {
            parsed: Some(ParsedProfile {
                name: Some("Ada Lovelace".to_string()),
                industry: Some("Mining Services".to_string()),
                role: Some("Surveyor".to_string()),
                email: Some("   ".to_string()),
                skills: vec!["GIS".to_string(), "gis".to_string()],
                market_value: Some(150_000),
                ..Default::default()
            }),
            ..Default::default()
        };
        wizard.submit_ingestion(RESUME_25, &generator, &mut session).unwrap();

        let profile = session.profile();
        assert_eq!(profile.name, "Ada Lovelace");
        assert_eq!(profile.industry.as_deref(), Some("Mining Services"));
        assert_eq!(profile.role, "Surveyor");
        assert_eq!(profile.email, "");
        assert_eq!(profile.skills, vec!["GIS".to_string()]);
        assert_eq!(profile.market_value, 150_000);
        assert_eq!(profile.primary_focus, Some(Persona::Contractor));
    }

    #[test]
    fn test_professional_continue_hits_subscription_gate() {
        let mut session = fresh_session();
        let mut wizard = wizard_at_ingestion(Persona::Professional);
        wizard
            .submit_ingestion(RESUME_25, &FakeGenerator::default(), &mut session)
            .unwrap();
        assert_eq!(wizard.continue_target(), Some(View::Toolkit));
        assert_eq!(wizard.finish(&mut session, false).unwrap(), View::Subscription);
        assert_eq!(wizard.finish(&mut session, true).unwrap(), View::Dashboard);
    }

    #[test]
    fn test_finish_before_complete_is_rejected() {
        let mut session = fresh_session();
        let wizard = wizard_at_ingestion(Persona::Student);
        assert!(wizard.finish(&mut session, true).is_err());
        assert_eq!(wizard.continue_target(), None);
    }

    #[test]
    fn test_suggest_industries() {
        assert_eq!(suggest_industries("").len(), SUGGESTED_INDUSTRIES.len());
        assert_eq!(suggest_industries("min")[0], "Mining");
        assert_eq!(suggest_industries("Helthcare")[0], "Healthcare");
        assert!(suggest_industries("zzzzzz").is_empty());
    }

    #[test]
    fn test_read_resume_file() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("resume.md");
        std::fs::write(&txt, "# Ada\nSurveyor").unwrap();
        assert_eq!(read_resume_file(&txt).unwrap(), "# Ada\nSurveyor");

        let pdf = dir.path().join("resume.pdf");
        std::fs::write(&pdf, "%PDF").unwrap();
        assert!(read_resume_file(&pdf).is_err());
    }
}
