use tracing::{debug, warn};

use crate::ai::{DiscoveryResult, Generator};
use crate::models::{Persona, UserProfile};

const FALLBACK_QUESTION: &str =
    "Tell me about a recent project you are proud of. What was your part in it?";

/// One turn of the skills-discovery conversation. Extracted skills are merged
/// without duplicates and any new context fact is remembered.
pub fn run_discovery(
    generator: &dyn Generator,
    profile: &UserProfile,
    message: &str,
) -> (UserProfile, DiscoveryResult) {
    let result = generator
        .run_profile_discovery(&profile.resume_text, &profile.discovery_context, message)
        .unwrap_or_else(|e| {
            warn!(error = %e, "discovery failed, asking a generic question");
            DiscoveryResult {
                ai_question: FALLBACK_QUESTION.to_string(),
                ..Default::default()
            }
        });

    let mut next = profile.clone();
    let added = merge_skills(&mut next.skills, &result.extracted_skills);
    debug!(added, "discovery merged skills");
    if let Some(param) = result.new_context_param.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        next.discovery_context.push(param.to_string());
    }
    if added > 0 {
        next.market_value = estimate_market_value(&next);
    }
    (next, result)
}

/// Appends skills not already present (case-insensitive). Returns how many
/// were added.
pub fn merge_skills(skills: &mut Vec<String>, incoming: &[String]) -> usize {
    let mut added = 0;
    for skill in incoming {
        let skill = skill.trim();
        if skill.is_empty() || skills.iter().any(|s| s.eq_ignore_ascii_case(skill)) {
            continue;
        }
        skills.push(skill.to_string());
        added += 1;
    }
    added
}

pub fn set_resume(profile: &UserProfile, text: &str) -> UserProfile {
    let mut next = profile.clone();
    next.resume_text = text.trim().to_string();
    next
}

/// Rough annual market value: a persona base plus a premium per skill, capped.
pub fn estimate_market_value(profile: &UserProfile) -> u32 {
    let base = match profile.primary_focus {
        Some(Persona::Executive) => 220_000,
        Some(Persona::Contractor) | Some(Persona::GrowthStartup) => 140_000,
        Some(Persona::Recruiter) | Some(Persona::Professional) | Some(Persona::AssetOwner) => 95_000,
        Some(Persona::Student) => 55_000,
        Some(Persona::Admin) | None => 80_000,
    };
    let premium = 4_000 * profile.skills.len().min(15) as u32;
    (base + premium).max(profile.market_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::FakeGenerator;

    #[test]
    fn test_discovery_merges_skills_and_context() {
        let profile = UserProfile {
            primary_focus: Some(Persona::Contractor),
            skills: vec!["GIS".to_string()],
            ..Default::default()
        };
        let generator = FakeGenerator {
            discovery: Some(DiscoveryResult {
                ai_question: "Which tools?".to_string(),
                extracted_skills: vec!["gis".to_string(), "Drone surveying".to_string()],
                new_context_param: Some("Holds a CASA licence".to_string()),
            }),
            ..Default::default()
        };
        let (next, result) = run_discovery(&generator, &profile, "I fly drones over pits");
        assert_eq!(result.ai_question, "Which tools?");
        assert_eq!(next.skills, vec!["GIS".to_string(), "Drone surveying".to_string()]);
        assert_eq!(next.discovery_context, vec!["Holds a CASA licence".to_string()]);
        assert_eq!(next.market_value, 148_000);
    }

    #[test]
    fn test_discovery_failure_asks_fallback_question() {
        let profile = UserProfile::default();
        let (next, result) = run_discovery(&FakeGenerator::default(), &profile, "hello");
        assert_eq!(result.ai_question, FALLBACK_QUESTION);
        assert_eq!(next, profile);
    }

    #[test]
    fn test_estimate_never_lowers_value() {
        let profile = UserProfile {
            market_value: 500_000,
            ..Default::default()
        };
        assert_eq!(estimate_market_value(&profile), 500_000);
    }

    #[test]
    fn test_set_resume_trims() {
        let next = set_resume(&UserProfile::default(), "  text \n");
        assert_eq!(next.resume_text, "text");
    }
}
