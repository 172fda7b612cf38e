use anyhow::Result;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::models::{Bid, Course, CourseModule, JobOpportunity, OpportunityType};
use crate::store::Database;

const COURSES_KEY: &str = "catalog.courses";
const JOBS_KEY: &str = "catalog.jobs";
const BIDS_KEY: &str = "catalog.bids";

/// In-memory catalogs, seeded with defaults and optionally overwritten from
/// local storage.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub courses: Vec<Course>,
    pub jobs: Vec<JobOpportunity>,
    pub bids: Vec<Bid>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            courses: seed_courses(),
            jobs: seed_jobs(),
            bids: seed_bids(),
        }
    }
}

impl Catalog {
    pub fn load(db: &Database) -> Self {
        let mut catalog = Self::default();
        restore_into(db, COURSES_KEY, &mut catalog.courses);
        restore_into(db, JOBS_KEY, &mut catalog.jobs);
        restore_into(db, BIDS_KEY, &mut catalog.bids);
        catalog
    }

    pub fn course(&self, id: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.id == id)
    }

    pub fn job(&self, id: &str) -> Option<&JobOpportunity> {
        self.jobs.iter().find(|j| j.id == id)
    }

    /// Adds the course, or replaces the one with the same id, and persists the
    /// whole list.
    pub fn upsert_course(&mut self, db: &Database, course: Course) -> Result<()> {
        match self.courses.iter_mut().find(|c| c.id == course.id) {
            Some(existing) => {
                info!(course = %course.id, "replacing course");
                *existing = course;
            }
            None => {
                info!(course = %course.id, "adding course");
                self.courses.push(course);
            }
        }
        db.put_json(COURSES_KEY, &self.courses)
    }

    /// Remembers fetched listings so `apply` can find them by id later.
    pub fn remember_jobs(&mut self, db: &Database, jobs: &[JobOpportunity]) -> Result<()> {
        for job in jobs {
            match self.jobs.iter_mut().find(|j| j.id == job.id) {
                Some(existing) => *existing = job.clone(),
                None => self.jobs.push(job.clone()),
            }
        }
        db.put_json(JOBS_KEY, &self.jobs)
    }

    /// Local keyword search used when the generation service is unavailable.
    pub fn search_jobs(&self, keywords: &str, filter: Option<OpportunityType>) -> Vec<JobOpportunity> {
        let terms: Vec<String> = keywords
            .split(|c: char| c == ',' || c.is_whitespace())
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        self.jobs
            .iter()
            .filter(|job| filter.is_none_or(|kind| job.kind == kind))
            .filter(|job| {
                if terms.is_empty() {
                    return true;
                }
                let haystack = format!(
                    "{} {} {} {}",
                    job.title,
                    job.company,
                    job.description,
                    job.skills.join(" ")
                )
                .to_lowercase();
                terms.iter().any(|t| haystack.contains(t.as_str()))
            })
            .cloned()
            .collect()
    }
}

fn restore_into<T: DeserializeOwned>(db: &Database, key: &str, target: &mut Vec<T>) {
    match db.get_json::<Vec<T>>(key) {
        Ok(Some(stored)) => *target = stored,
        Ok(None) => {}
        Err(e) => warn!(key, error = %e, "ignoring corrupted catalog, keeping defaults"),
    }
}

fn module(id: &str, title: &str, duration_minutes: u32) -> CourseModule {
    CourseModule {
        id: id.to_string(),
        title: title.to_string(),
        duration_minutes,
    }
}

fn seed_courses() -> Vec<Course> {
    vec![
        Course {
            id: "c-negotiation".to_string(),
            title: "Salary & Rate Negotiation".to_string(),
            category: "Career".to_string(),
            level: "Intermediate".to_string(),
            modules: vec![
                module("m1", "Knowing your market value", 20),
                module("m2", "Anchoring and counter-offers", 25),
                module("m3", "Negotiating day rates", 30),
            ],
        },
        Course {
            id: "c-tendering".to_string(),
            title: "Winning Government Tenders".to_string(),
            category: "Business".to_string(),
            level: "Advanced".to_string(),
            modules: vec![
                module("m1", "Reading a tender pack", 20),
                module("m2", "Capability statements", 35),
                module("m3", "Pricing and compliance", 40),
            ],
        },
        Course {
            id: "c-leadership".to_string(),
            title: "Executive Presence".to_string(),
            category: "Leadership".to_string(),
            level: "Advanced".to_string(),
            modules: vec![
                module("m1", "Board communication", 30),
                module("m2", "Strategic narratives", 30),
            ],
        },
    ]
}

fn seed_jobs() -> Vec<JobOpportunity> {
    vec![
        JobOpportunity {
            id: "job-ops-manager".to_string(),
            title: "Operations Manager".to_string(),
            company: "Northwind Resources".to_string(),
            kind: OpportunityType::FullTime,
            budget: "$140k - $165k".to_string(),
            skills: vec!["Operations".to_string(), "Safety".to_string(), "Budgeting".to_string()],
            location: "Perth".to_string(),
            description: "Lead site operations across two processing plants.".to_string(),
            match_score: 78,
        },
        JobOpportunity {
            id: "job-data-contract".to_string(),
            title: "Data Engineer (6 month contract)".to_string(),
            company: "Contoso Analytics".to_string(),
            kind: OpportunityType::Contract,
            budget: "$900/day".to_string(),
            skills: vec!["SQL".to_string(), "Python".to_string(), "Airflow".to_string()],
            location: "Remote".to_string(),
            description: "Build ingestion pipelines for a reporting platform.".to_string(),
            match_score: 64,
        },
        JobOpportunity {
            id: "job-cfo".to_string(),
            title: "Chief Financial Officer".to_string(),
            company: "Fabrikam Energy".to_string(),
            kind: OpportunityType::Executive,
            budget: "$320k + equity".to_string(),
            skills: vec!["Capital markets".to_string(), "M&A".to_string(), "Governance".to_string()],
            location: "Sydney".to_string(),
            description: "Own finance strategy ahead of a listing.".to_string(),
            match_score: 55,
        },
    ]
}

fn seed_bids() -> Vec<Bid> {
    vec![
        Bid {
            id: "bid-road-maintenance".to_string(),
            title: "Regional road maintenance panel".to_string(),
            agency: "Department of Transport".to_string(),
            value: "$2.4M".to_string(),
            deadline: "30 days".to_string(),
            requirements: vec!["ISO 9001".to_string(), "Public liability $20M".to_string()],
            win_probability: 42,
        },
        Bid {
            id: "bid-it-support".to_string(),
            title: "Managed IT support services".to_string(),
            agency: "City Council".to_string(),
            value: "$650k".to_string(),
            deadline: "14 days".to_string(),
            requirements: vec!["ISO 27001".to_string(), "Local presence".to_string()],
            win_probability: 58,
        },
    ]
}
