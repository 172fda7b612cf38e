use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name carried by the anonymous session; a profile still holding it has not
/// been through onboarding.
pub const PLACEHOLDER_NAME: &str = "Guest";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Persona {
    Professional,
    Executive,
    Contractor,
    Recruiter,
    AssetOwner,
    GrowthStartup,
    Admin,
    Student,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Welcome,
    Onboarding,
    Dashboard,
    Marketplace,
    Strategy,
    Toolkit,
    Academy,
    Profile,
    Settings,
    Subscription,
    Admin,
}

/// Views that require an active subscription.
pub const LOCKED_VIEWS: &[View] = &[View::Strategy, View::Toolkit];

/// Per-persona navigation and copy.
#[derive(Debug, Clone, Copy)]
pub struct PersonaConfig {
    pub label: &'static str,
    pub nav: &'static [View],
    pub locked: &'static [View],
    pub continue_target: View,
    pub continue_label: &'static str,
    pub resume_prompt: &'static str,
    pub marketplace_label: &'static str,
}

const SEEKER_NAV: &[View] = &[
    View::Dashboard,
    View::Marketplace,
    View::Strategy,
    View::Toolkit,
    View::Academy,
    View::Profile,
    View::Settings,
];

const RECRUITER_NAV: &[View] = &[
    View::Dashboard,
    View::Marketplace,
    View::Academy,
    View::Profile,
    View::Settings,
];

const ADMIN_NAV: &[View] = &[View::Admin, View::Dashboard, View::Academy, View::Settings];

impl Persona {
    pub const ALL: [Persona; 8] = [
        Persona::Professional,
        Persona::Executive,
        Persona::Contractor,
        Persona::Recruiter,
        Persona::AssetOwner,
        Persona::GrowthStartup,
        Persona::Admin,
        Persona::Student,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::Professional => "Professional",
            Persona::Executive => "Executive",
            Persona::Contractor => "Contractor",
            Persona::Recruiter => "Recruiter",
            Persona::AssetOwner => "AssetOwner",
            Persona::GrowthStartup => "GrowthStartup",
            Persona::Admin => "Admin",
            Persona::Student => "Student",
        }
    }

    pub fn config(&self) -> PersonaConfig {
        match self {
            Persona::Professional => PersonaConfig {
                label: "Job Seeker",
                nav: SEEKER_NAV,
                locked: LOCKED_VIEWS,
                continue_target: View::Toolkit,
                continue_label: "Open the career toolkit",
                resume_prompt: "Paste your resume or a short career summary",
                marketplace_label: "Jobs",
            },
            Persona::Executive => PersonaConfig {
                label: "Executive",
                nav: SEEKER_NAV,
                locked: LOCKED_VIEWS,
                continue_target: View::Strategy,
                continue_label: "Build your leadership strategy",
                resume_prompt: "Paste your executive bio or board profile",
                marketplace_label: "Board & C-suite roles",
            },
            Persona::Contractor => PersonaConfig {
                label: "Contractor / SME",
                nav: SEEKER_NAV,
                locked: LOCKED_VIEWS,
                continue_target: View::Dashboard,
                continue_label: "See live tenders",
                resume_prompt: "Describe your capabilities, certifications and past contracts",
                marketplace_label: "Tenders",
            },
            Persona::Recruiter => PersonaConfig {
                label: "Recruiter",
                nav: RECRUITER_NAV,
                locked: LOCKED_VIEWS,
                continue_target: View::Marketplace,
                continue_label: "Browse the talent market",
                resume_prompt: "Describe your agency, desks and the roles you fill",
                marketplace_label: "Talent market",
            },
            Persona::AssetOwner => PersonaConfig {
                label: "Asset Owner",
                nav: SEEKER_NAV,
                locked: LOCKED_VIEWS,
                continue_target: View::Dashboard,
                continue_label: "Review your portfolio",
                resume_prompt: "Describe the assets you own or operate",
                marketplace_label: "Service providers",
            },
            Persona::GrowthStartup => PersonaConfig {
                label: "Growth Startup",
                nav: SEEKER_NAV,
                locked: LOCKED_VIEWS,
                continue_target: View::Strategy,
                continue_label: "Plan your next stage",
                resume_prompt: "Describe your company, stage and team",
                marketplace_label: "Contracts",
            },
            Persona::Admin => PersonaConfig {
                label: "Administrator",
                nav: ADMIN_NAV,
                locked: LOCKED_VIEWS,
                continue_target: View::Admin,
                continue_label: "Open the admin console",
                resume_prompt: "Describe your role",
                marketplace_label: "Listings",
            },
            Persona::Student => PersonaConfig {
                label: "Student",
                nav: SEEKER_NAV,
                locked: LOCKED_VIEWS,
                continue_target: View::Academy,
                continue_label: "Start learning",
                resume_prompt: "Tell us about your studies, projects and interests",
                marketplace_label: "Graduate roles",
            },
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Persona {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace(['-', '_', ' '], "");
        let alias = match wanted.as_str() {
            "jobseeker" | "seeker" => Some(Persona::Professional),
            "sme" => Some(Persona::Contractor),
            "startup" => Some(Persona::GrowthStartup),
            _ => None,
        };
        alias
            .or_else(|| {
                Persona::ALL
                    .into_iter()
                    .find(|p| p.as_str().to_lowercase() == wanted)
            })
            .ok_or_else(|| format!("Unknown persona '{}'", s))
    }
}

impl View {
    pub fn as_str(&self) -> &'static str {
        match self {
            View::Welcome => "welcome",
            View::Onboarding => "onboarding",
            View::Dashboard => "dashboard",
            View::Marketplace => "marketplace",
            View::Strategy => "strategy",
            View::Toolkit => "toolkit",
            View::Academy => "academy",
            View::Profile => "profile",
            View::Settings => "settings",
            View::Subscription => "subscription",
            View::Admin => "admin",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let all = [
            View::Welcome,
            View::Onboarding,
            View::Dashboard,
            View::Marketplace,
            View::Strategy,
            View::Toolkit,
            View::Academy,
            View::Profile,
            View::Settings,
            View::Subscription,
            View::Admin,
        ];
        let wanted = s.trim().to_lowercase();
        all.into_iter()
            .find(|v| v.as_str() == wanted)
            .ok_or_else(|| format!("Unknown view '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Plan {
    Starter,
    Pro,
    Executive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    pub industry: Option<String>,
    pub role: String,
    pub location: String,
    pub primary_focus: Option<Persona>,
    pub is_subscribed: bool,
    pub subscription_plan: Option<Plan>,
    pub market_value: u32,
    pub skill_score: u32,
    pub scale_score: u32,
    pub skills: Vec<String>,
    pub resume_text: String,
    pub applied_job_ids: Vec<String>,
    pub saved_job_ids: Vec<String>,
    pub resume_history: Vec<TailoredResume>,
    pub enrolled_courses: Vec<EnrolledCourse>,
    pub assessments: Vec<Assessment>,
    pub strategic_roadmap: Vec<StrategicGoal>,
    pub discovery_context: Vec<String>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: PLACEHOLDER_NAME.to_string(),
            email: String::new(),
            industry: None,
            role: String::new(),
            location: String::new(),
            primary_focus: None,
            is_subscribed: false,
            subscription_plan: None,
            market_value: 0,
            skill_score: 0,
            scale_score: 0,
            skills: Vec::new(),
            resume_text: String::new(),
            applied_job_ids: Vec::new(),
            saved_job_ids: Vec::new(),
            resume_history: Vec::new(),
            enrolled_courses: Vec::new(),
            assessments: Vec::new(),
            strategic_roadmap: Vec::new(),
            discovery_context: Vec::new(),
        }
    }
}

impl UserProfile {
    pub fn needs_onboarding(&self) -> bool {
        let name = self.name.trim();
        let industry_missing = self
            .industry
            .as_deref()
            .map(|i| i.trim().is_empty())
            .unwrap_or(true);
        industry_missing || name.is_empty() || name == PLACEHOLDER_NAME
    }

    pub fn is_admin(&self) -> bool {
        self.primary_focus == Some(Persona::Admin)
    }

    pub fn persona_label(&self) -> &'static str {
        self.primary_focus
            .map(|p| p.config().label)
            .unwrap_or("Member")
    }

    pub fn has_applied(&self, job_id: &str) -> bool {
        self.applied_job_ids.iter().any(|id| id == job_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpportunityType {
    #[serde(alias = "Full-time", alias = "full-time")]
    FullTime,
    Contract,
    Tender,
    Freelance,
    Executive,
}

impl OpportunityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpportunityType::FullTime => "Full-time",
            OpportunityType::Contract => "Contract",
            OpportunityType::Tender => "Tender",
            OpportunityType::Freelance => "Freelance",
            OpportunityType::Executive => "Executive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOpportunity {
    pub id: String,
    pub title: String,
    pub company: String,
    #[serde(rename = "type")]
    pub kind: OpportunityType,
    #[serde(default)]
    pub budget: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub match_score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub id: String,
    pub title: String,
    pub agency: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub deadline: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub win_probability: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseModule {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub modules: Vec<CourseModule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrolledCourse {
    pub course_id: String,
    #[serde(default)]
    pub completed_module_ids: Vec<String>,
    pub enrolled_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalCategory {
    Skill,
    Network,
    Visibility,
    Financial,
    Leadership,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategicGoal {
    pub id: String,
    pub title: String,
    pub category: GoalCategory,
    pub deadline: String,
    #[serde(default)]
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionScore {
    pub dimension: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub taken_at: String,
    pub scores: Vec<DimensionScore>,
    pub overall: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TailoredResume {
    pub id: String,
    pub job_id: String,
    pub job_title: String,
    pub company: String,
    pub content: String,
    pub cover_letter: String,
    pub created_at: String,
}
