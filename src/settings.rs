use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

use crate::models::{Persona, UserProfile};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").expect("email regex is valid")
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Strength {
    VeryWeak,
    Weak,
    Fair,
    Good,
    Strong,
}

impl Strength {
    pub fn label(&self) -> &'static str {
        match self {
            Strength::VeryWeak => "Very weak",
            Strength::Weak => "Weak",
            Strength::Fair => "Fair",
            Strength::Good => "Good",
            Strength::Strong => "Strong",
        }
    }
}

/// Heuristic: one point for reaching 8 characters, one for 12, and one per
/// character class beyond the first (lower, upper, digit, symbol), capped at 4.
pub fn password_strength(password: &str) -> Strength {
    let len = password.chars().count();
    if len == 0 {
        return Strength::VeryWeak;
    }
    let classes = [
        password.chars().any(|c| c.is_lowercase()),
        password.chars().any(|c| c.is_uppercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| !c.is_alphanumeric()),
    ]
    .iter()
    .filter(|present| **present)
    .count();

    let mut score = classes.saturating_sub(1);
    if len >= 8 {
        score += 1;
    }
    if len >= 12 {
        score += 1;
    }
    if len < 6 {
        score = score.min(1);
    }

    match score.min(4) {
        0 => Strength::VeryWeak,
        1 => Strength::Weak,
        2 => Strength::Fair,
        3 => Strength::Good,
        _ => Strength::Strong,
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("Name cannot be empty")]
    EmptyName,
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
    #[error("Industry cannot be empty")]
    EmptyIndustry,
    #[error("The Admin role is assigned by an administrator")]
    ReservedPersona,
}

/// Field edits from the settings screen. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileEdit {
    pub name: Option<String>,
    pub email: Option<String>,
    pub industry: Option<String>,
    pub role: Option<String>,
    pub location: Option<String>,
    pub persona: Option<Persona>,
}

pub fn apply_edit(profile: &UserProfile, edit: &ProfileEdit) -> Result<UserProfile, SettingsError> {
    let mut next = profile.clone();
    if let Some(name) = &edit.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(SettingsError::EmptyName);
        }
        next.name = name.to_string();
    }
    if let Some(email) = &edit.email {
        let email = email.trim();
        if !email.is_empty() && !is_valid_email(email) {
            return Err(SettingsError::InvalidEmail(email.to_string()));
        }
        next.email = email.to_string();
    }
    if let Some(industry) = &edit.industry {
        let industry = industry.trim();
        if industry.is_empty() {
            return Err(SettingsError::EmptyIndustry);
        }
        next.industry = Some(industry.to_string());
    }
    if let Some(role) = &edit.role {
        next.role = role.trim().to_string();
    }
    if let Some(location) = &edit.location {
        next.location = location.trim().to_string();
    }
    if let Some(persona) = edit.persona {
        if persona == Persona::Admin && !profile.is_admin() {
            return Err(SettingsError::ReservedPersona);
        }
        next.primary_focus = Some(persona);
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email(" a.b+c@mail.example.co "));
        assert!(!is_valid_email("ada@"));
        assert!(!is_valid_email("ada example.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_password_strength_ordering() {
        assert_eq!(password_strength(""), Strength::VeryWeak);
        assert_eq!(password_strength("abc"), Strength::VeryWeak);
        assert_eq!(password_strength("Ab1!"), Strength::Weak);
        assert_eq!(password_strength("abcdefgh"), Strength::Weak);
        assert_eq!(password_strength("abcdefg1"), Strength::Fair);
        assert_eq!(password_strength("Abcdefg1"), Strength::Good);
        assert_eq!(password_strength("Abcdefgh12!x"), Strength::Strong);
        assert!(password_strength("correct horse battery") > password_strength("password"));
        assert_eq!(Strength::Good.label(), "Good");
    }

    #[test]
    fn test_apply_edit() {
        let profile = UserProfile {
            name: "Ada".to_string(),
            industry: Some("Mining".to_string()),
            ..Default::default()
        };
        let edit = ProfileEdit {
            email: Some("ada@example.com".to_string()),
            location: Some(" Perth ".to_string()),
            persona: Some(Persona::Executive),
            ..Default::default()
        };
        let next = apply_edit(&profile, &edit).unwrap();
        assert_eq!(next.email, "ada@example.com");
        assert_eq!(next.location, "Perth");
        assert_eq!(next.primary_focus, Some(Persona::Executive));
        assert_eq!(next.name, "Ada");
        assert_eq!(profile.email, "", "original is untouched");

        let bad = ProfileEdit {
            industry: Some(" ".to_string()),
            ..Default::default()
        };
        assert_eq!(apply_edit(&profile, &bad), Err(SettingsError::EmptyIndustry));
    }

    #[test]
    fn test_apply_edit_cannot_grant_admin() {
        let profile = UserProfile {
            name: "Mallory".to_string(),
            industry: Some("Retail".to_string()),
            primary_focus: Some(Persona::Professional),
            ..Default::default()
        };
        let edit = ProfileEdit {
            persona: Some(Persona::Admin),
            ..Default::default()
        };
        assert_eq!(apply_edit(&profile, &edit), Err(SettingsError::ReservedPersona));

        let admin = UserProfile {
            primary_focus: Some(Persona::Admin),
            ..profile
        };
        assert!(apply_edit(&admin, &edit).unwrap().is_admin());
    }
}
