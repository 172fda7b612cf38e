mod academy;
mod ai;
mod catalog;
mod config;
mod marketplace;
mod models;
mod onboarding;
mod profile;
mod session;
mod settings;
mod store;
mod strategy;
mod subscription;
mod tui;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use ai::{AiGenerator, Generator, OfflineGenerator};
use catalog::Catalog;
use config::Config;
use marketplace::{SearchQuery, Source};
use models::{Course, Persona, Plan, UserProfile, View};
use onboarding::Wizard;
use session::Session;
use settings::ProfileEdit;
use store::Database;

#[derive(Parser)]
#[command(name = "careeros")]
#[command(about = "Career management - profile, opportunities, strategy and learning")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the local data store
    Init,

    /// Show the current profile and landing view
    Status,

    /// Run the first-time setup wizard
    Onboard {
        /// Your name
        #[arg(short, long)]
        name: String,

        /// Email address
        #[arg(short, long)]
        email: Option<String>,

        /// Persona (professional, executive, contractor, recruiter, assetowner, growthstartup, admin, student)
        #[arg(short, long)]
        persona: Option<String>,

        /// Industry
        #[arg(short, long)]
        industry: String,

        /// Resume or bio text
        #[arg(short, long, conflicts_with = "resume_file")]
        resume: Option<String>,

        /// Read resume text from a file (.txt or .md)
        #[arg(long)]
        resume_file: Option<PathBuf>,

        /// Go straight to the dashboard when done
        #[arg(long)]
        skip: bool,
    },

    /// Replace the session with a profile from a JSON file
    Login {
        /// Path to profile JSON
        file: PathBuf,
    },

    /// Clear the stored session
    Logout,

    /// Navigate to a view
    Go {
        /// Target view (dashboard, marketplace, strategy, toolkit, academy, ...)
        view: String,

        /// Course to pre-select when opening the academy
        #[arg(short, long)]
        course: Option<String>,
    },

    /// Search the marketplace
    Search {
        /// Keywords
        #[arg(default_value = "")]
        keywords: String,

        /// Location (defaults to profile location)
        #[arg(short, long)]
        location: Option<String>,

        /// Listing type (full-time, contract, tender, freelance, executive)
        #[arg(short = 't', long = "type")]
        filter: Option<String>,
    },

    /// Show open tenders
    Tenders,

    /// Apply to a listing from the last search
    Apply {
        /// Listing ID
        job_id: String,
    },

    /// Save or unsave a listing
    Save {
        /// Listing ID
        job_id: String,
    },

    /// Run the strategy self-assessment
    Strategy {
        /// Slider answers as DIMENSION=VALUE (e.g. Skills=70 Network=40)
        answers: Vec<String>,
    },

    /// Courses
    Academy {
        #[command(subcommand)]
        command: AcademyCommands,
    },

    /// Skill discovery conversation (one turn)
    Discover {
        /// What you want to tell the coach
        message: String,
    },

    /// Edit account settings
    Settings {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        industry: Option<String>,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        persona: Option<String>,

        /// Check a password's strength
        #[arg(long)]
        password: Option<String>,
    },

    /// Subscribe to a plan (starter, pro, executive)
    Subscribe {
        plan: String,
    },

    /// Cancel the subscription
    Cancel,

    /// Interactive dashboard
    Browse,
}

#[derive(Subcommand)]
enum AcademyCommands {
    /// List courses and progress
    List,

    /// Enroll in a course
    Enroll {
        /// Course ID
        course: String,
    },

    /// Mark a module complete
    Complete {
        /// Course ID
        course: String,
        /// Module ID
        module: String,
    },

    /// Add or replace a course from a JSON file (admin only)
    Upsert {
        /// Path to course JSON
        file: PathBuf,
    },
}

fn make_generator(config: &Config) -> Box<dyn Generator> {
    let provider = ai::resolve_model(&config.model)
        .and_then(|spec| {
            debug!(model = %spec.short_name, "using generation model");
            ai::create_provider(&spec, config.timeout)
        });
    match provider {
        Ok(provider) => Box::new(AiGenerator::new(provider)),
        Err(e) => {
            warn!(error = %e, "generation service unavailable, using offline fallbacks");
            Box::new(OfflineGenerator)
        }
    }
}

fn require_view(session: &mut Session, target: View) -> Result<()> {
    let entered = session.change_view(target, None);
    if entered != target {
        bail!("'{}' is not available yet - you were sent to '{}'", target, entered);
    }
    Ok(())
}

fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db = Database::open(&config.db_path)?;

    if let Commands::Init = cli.command {
        println!("Data store ready at {}", db.path().display());
        return Ok(());
    }

    let mut catalog = Catalog::load(&db);
    let mut session = Session::start(db)?;

    match cli.command {
        Commands::Init => {}

        Commands::Status => print_status(&session),

        Commands::Onboard {
            name,
            email,
            persona,
            industry,
            resume,
            resume_file,
            skip,
        } => {
            let persona = persona
                .map(|p| p.parse::<Persona>())
                .transpose()
                .map_err(|e| anyhow!(e))?;
            let text = match (resume, resume_file) {
                (Some(text), _) => text,
                (None, Some(path)) => onboarding::read_resume_file(&path)?,
                (None, None) => String::new(),
            };

            let mut wizard = Wizard::new();
            wizard.submit_identity(&name, email.as_deref())?;
            wizard.submit_persona(persona)?;
            if let Err(e) = wizard.submit_industry(&industry) {
                let suggestions = onboarding::suggest_industries(&industry);
                bail!("{} (suggestions: {})", e, suggestions.join(", "));
            }
            if text.trim().is_empty() {
                bail!("{} (pass --resume or --resume-file)", wizard.resume_prompt());
            }
            let generator = make_generator(&config);
            println!("Reading your profile...");
            wizard.submit_ingestion(&text, generator.as_ref(), &mut session)?;
            let view = wizard.finish(&mut session, skip)?;
            println!("Welcome, {}! Next stop: {}", session.profile().name, view);
        }

        Commands::Login { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read profile file: {}", file.display()))?;
            let profile: UserProfile = serde_json::from_str(&raw)
                .with_context(|| format!("Invalid profile JSON in {}", file.display()))?;
            let view = session.login(profile)?;
            println!("Logged in as {} -> {}", session.profile().name, view);
            if view == View::Dashboard {
                println!("Tip: run `careeros browse` for a guided tour of your dashboard.");
            }
        }

        Commands::Logout => {
            session.logout()?;
            println!("Logged out.");
        }

        Commands::Go { view, course } => {
            let target: View = view.parse().map_err(|e: String| anyhow!(e))?;
            let entered = session.change_view(target, course.as_deref());
            if entered == target {
                println!("-> {}", entered);
            } else {
                println!("{} is locked for your account -> {}", target, entered);
            }
            if let Some(selected) = session.academy_selection() {
                println!("Pre-selected course: {}", selected);
            }
        }

        Commands::Search {
            keywords,
            location,
            filter,
        } => {
            require_view(&mut session, View::Marketplace)?;
            let filter = filter
                .map(|f| ai::parse_opportunity_type(&f).ok_or_else(|| anyhow!("Unknown listing type '{}'", f)))
                .transpose()?;
            let generator = make_generator(&config);
            let query = SearchQuery {
                keywords,
                location,
                filter,
            };
            let (jobs, source) = marketplace::search(generator.as_ref(), &catalog, session.profile(), &query);
            catalog.remember_jobs(session.db(), &jobs)?;
            if source == Source::Catalog {
                println!("(showing saved listings - live search unavailable)");
            }
            if jobs.is_empty() {
                println!("No listings found.");
            } else {
                println!("{:<22} {:>5} {:<30} {:<20} {:<10}", "ID", "MATCH", "TITLE", "COMPANY", "TYPE");
                println!("{}", "-".repeat(91));
                for job in jobs {
                    println!(
                        "{:<22} {:>4}% {:<30} {:<20} {:<10}",
                        truncate(&job.id, 22),
                        job.match_score,
                        truncate(&job.title, 28),
                        truncate(&job.company, 18),
                        job.kind.as_str()
                    );
                }
            }
        }

        Commands::Tenders => {
            require_view(&mut session, View::Marketplace)?;
            let generator = make_generator(&config);
            let (bids, source) = marketplace::tenders(generator.as_ref(), &catalog, session.profile());
            if source == Source::Catalog {
                println!("(showing saved tenders - live search unavailable)");
            }
            println!("{:<22} {:>4} {:<34} {:<24} {:>8}", "ID", "WIN", "TITLE", "AGENCY", "VALUE");
            println!("{}", "-".repeat(96));
            for bid in bids {
                println!(
                    "{:<22} {:>3}% {:<34} {:<24} {:>8}",
                    truncate(&bid.id, 22),
                    bid.win_probability,
                    truncate(&bid.title, 32),
                    truncate(&bid.agency, 22),
                    bid.value
                );
            }
        }

        Commands::Apply { job_id } => {
            let job = catalog
                .job(&job_id)
                .cloned()
                .ok_or_else(|| anyhow!("Listing '{}' not found - run `careeros search` first", job_id))?;
            let generator = make_generator(&config);
            println!("Tailoring your resume for {}...", job.title);
            let next = marketplace::confirm_application(generator.as_ref(), session.profile(), &job)?;
            session.update_profile(next)?;
            if let Some(entry) = session.profile().resume_history.last() {
                println!("Applied to {} at {}.", entry.job_title, entry.company);
                println!("\n--- Cover Letter ---\n{}", entry.cover_letter);
            }
        }

        Commands::Save { job_id } => {
            let (next, saved) = marketplace::toggle_saved(session.profile(), &job_id);
            session.update_profile(next)?;
            println!("{} {}", if saved { "Saved" } else { "Unsaved" }, job_id);
        }

        Commands::Strategy { answers } => {
            require_view(&mut session, View::Strategy)?;
            let mut survey = strategy::Survey::new();
            for answer in &answers {
                let (dimension, value) = answer
                    .split_once('=')
                    .ok_or_else(|| anyhow!("Expected DIMENSION=VALUE, got '{}'", answer))?;
                let value: u8 = value
                    .trim()
                    .parse()
                    .with_context(|| format!("'{}' is not a number between 0 and 100", value))?;
                let dimension = strategy::DIMENSIONS
                    .iter()
                    .map(|(d, _)| *d)
                    .find(|d| d.eq_ignore_ascii_case(dimension.trim()))
                    .ok_or_else(|| anyhow!("Unknown dimension '{}'", dimension))?;
                survey.answer(dimension, value);
            }
            let generator = make_generator(&config);
            let next = strategy::analyze(generator.as_ref(), session.profile(), &survey);
            session.update_profile(next)?;

            let profile = session.profile();
            if let Some(assessment) = profile.assessments.last() {
                for score in &assessment.scores {
                    println!("{:<12} {:>5.1}", score.dimension, score.score);
                }
                println!("Overall      {:>5.1}", assessment.overall);
            }
            println!("\nRoadmap:");
            for goal in &profile.strategic_roadmap {
                println!("  {} [{:?}, {}]", goal.title, goal.category, goal.deadline);
                for (n, step) in goal.steps.iter().enumerate() {
                    println!("    {}. {}", n + 1, step);
                }
            }
        }

        Commands::Academy { command } => match command {
            AcademyCommands::List => {
                println!("{:<16} {:<30} {:<14} {:>8}", "ID", "TITLE", "LEVEL", "PROGRESS");
                println!("{}", "-".repeat(71));
                for course in &catalog.courses {
                    let pct = academy::progress(&catalog, session.profile(), &course.id);
                    println!(
                        "{:<16} {:<30} {:<14} {:>7}%",
                        truncate(&course.id, 16),
                        truncate(&course.title, 28),
                        course.level,
                        pct
                    );
                }
            }
            AcademyCommands::Enroll { course } => {
                session.change_view(View::Academy, Some(&course));
                let next = academy::enroll(&catalog, session.profile(), &course)?;
                session.update_profile(next)?;
                println!("Enrolled in {}.", course);
            }
            AcademyCommands::Complete { course, module } => {
                let next = academy::complete_module(&catalog, session.profile(), &course, &module)?;
                session.update_profile(next)?;
                println!(
                    "Module {} done - {}% of {} complete.",
                    module,
                    academy::progress(&catalog, session.profile(), &course),
                    course
                );
            }
            AcademyCommands::Upsert { file } => {
                let raw = std::fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read course file: {}", file.display()))?;
                let course: Course = serde_json::from_str(&raw)
                    .with_context(|| format!("Invalid course JSON in {}", file.display()))?;
                let id = course.id.clone();
                academy::admin_upsert(&mut catalog, session.db(), session.profile(), course)?;
                println!("Saved course {}.", id);
            }
        },

        Commands::Discover { message } => {
            let generator = make_generator(&config);
            let (next, result) = profile::run_discovery(generator.as_ref(), session.profile(), &message);
            if !result.extracted_skills.is_empty() {
                println!("Skills noted: {}", result.extracted_skills.join(", "));
            }
            session.update_profile(next)?;
            println!("\n{}", result.ai_question);
        }

        Commands::Settings {
            name,
            email,
            industry,
            role,
            location,
            persona,
            password,
        } => {
            if let Some(password) = password {
                let strength = settings::password_strength(&password);
                println!("Password strength: {}", strength.label());
            }
            let persona = persona
                .map(|p| p.parse::<Persona>())
                .transpose()
                .map_err(|e| anyhow!(e))?;
            let edit = ProfileEdit {
                name,
                email,
                industry,
                role,
                location,
                persona,
            };
            let next = settings::apply_edit(session.profile(), &edit)?;
            if &next != session.profile() {
                session.update_profile(next)?;
                println!("Settings saved.");
            }
        }

        Commands::Subscribe { plan } => {
            let plan = Plan::parse(&plan).ok_or_else(|| anyhow!("Unknown plan '{}' (starter, pro, executive)", plan))?;
            let next = subscription::subscribe(session.profile(), plan);
            session.update_profile(next)?;
            println!("Subscribed to {:?} ({}).", plan, plan.price_label());
        }

        Commands::Cancel => {
            let next = subscription::cancel(session.profile());
            session.update_profile(next)?;
            println!("Subscription cancelled.");
        }

        Commands::Browse => {
            let generator = make_generator(&config);
            tui::run_browse(&mut session, &mut catalog, generator.as_ref())?;
        }
    }

    Ok(())
}

fn print_status(session: &Session) {
    let profile = session.profile();
    println!("Name:        {}", profile.name);
    if !profile.email.is_empty() {
        println!("Email:       {}", profile.email);
    }
    println!("Persona:     {}", profile.persona_label());
    println!("Industry:    {}", profile.industry.as_deref().unwrap_or("-"));
    println!(
        "Plan:        {}",
        profile
            .subscription_plan
            .map(|p| format!("{:?}", p))
            .unwrap_or_else(|| "none".to_string())
    );
    println!("Scores:      market ${}  skill {}  scale {}", profile.market_value, profile.skill_score, profile.scale_score);
    println!("Applied:     {}", profile.applied_job_ids.len());
    println!("Landing at:  {}", session.view());
    if let Some(persona) = profile.primary_focus {
        let nav: Vec<String> = persona
            .config()
            .nav
            .iter()
            .map(|v| {
                if session.is_locked(*v) {
                    format!("{} (locked)", v)
                } else {
                    v.to_string()
                }
            })
            .collect();
        println!("Menu:        {}", nav.join(", "));
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Ingénieur de données", 10), "Ingénie...");
    }
}
