use anyhow::Result;
use thiserror::Error;
use tracing::info;

use crate::catalog::Catalog;
use crate::models::{Course, EnrolledCourse, UserProfile};
use crate::store::Database;

/// Skill score awarded for finishing a course.
const COMPLETION_BONUS: u32 = 5;

#[derive(Debug, Error, PartialEq)]
pub enum AcademyError {
    #[error("Course '{0}' not found")]
    UnknownCourse(String),
    #[error("Module '{module}' is not part of course '{course}'")]
    UnknownModule { course: String, module: String },
    #[error("Enroll in '{0}' first")]
    NotEnrolled(String),
    #[error("Only administrators can edit the course catalog")]
    NotAdmin,
}

pub fn enrollment<'a>(profile: &'a UserProfile, course_id: &str) -> Option<&'a EnrolledCourse> {
    profile.enrolled_courses.iter().find(|e| e.course_id == course_id)
}

/// Enrolling twice is a no-op.
pub fn enroll(catalog: &Catalog, profile: &UserProfile, course_id: &str) -> Result<UserProfile, AcademyError> {
    if catalog.course(course_id).is_none() {
        return Err(AcademyError::UnknownCourse(course_id.to_string()));
    }
    let mut next = profile.clone();
    if enrollment(profile, course_id).is_none() {
        next.enrolled_courses.push(EnrolledCourse {
            course_id: course_id.to_string(),
            completed_module_ids: Vec::new(),
            enrolled_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        });
        info!(course = course_id, "enrolled");
    }
    Ok(next)
}

/// Marks a module complete. Finishing the last module of a course bumps the
/// skill score once.
pub fn complete_module(
    catalog: &Catalog,
    profile: &UserProfile,
    course_id: &str,
    module_id: &str,
) -> Result<UserProfile, AcademyError> {
    let course = catalog
        .course(course_id)
        .ok_or_else(|| AcademyError::UnknownCourse(course_id.to_string()))?;
    if !course.modules.iter().any(|m| m.id == module_id) {
        return Err(AcademyError::UnknownModule {
            course: course_id.to_string(),
            module: module_id.to_string(),
        });
    }

    let mut next = profile.clone();
    let entry = next
        .enrolled_courses
        .iter_mut()
        .find(|e| e.course_id == course_id)
        .ok_or_else(|| AcademyError::NotEnrolled(course_id.to_string()))?;

    if entry.completed_module_ids.iter().any(|m| m == module_id) {
        return Ok(next);
    }
    entry.completed_module_ids.push(module_id.to_string());
    let finished = is_finished(course, entry);

    if finished {
        next.skill_score = (next.skill_score + COMPLETION_BONUS).min(100);
        info!(course = course_id, "course completed");
    }
    Ok(next)
}

fn is_finished(course: &Course, entry: &EnrolledCourse) -> bool {
    course
        .modules
        .iter()
        .all(|m| entry.completed_module_ids.contains(&m.id))
}

/// Completion percentage, 0 when not enrolled or the course has no modules.
pub fn progress(catalog: &Catalog, profile: &UserProfile, course_id: &str) -> u8 {
    let (Some(course), Some(entry)) = (catalog.course(course_id), enrollment(profile, course_id)) else {
        return 0;
    };
    if course.modules.is_empty() {
        return 0;
    }
    let done = course
        .modules
        .iter()
        .filter(|m| entry.completed_module_ids.contains(&m.id))
        .count();
    (done * 100 / course.modules.len()) as u8
}

/// Admin-only add/replace of a catalog course.
pub fn admin_upsert(
    catalog: &mut Catalog,
    db: &Database,
    profile: &UserProfile,
    course: Course,
) -> Result<()> {
    if !profile.is_admin() {
        return Err(AcademyError::NotAdmin.into());
    }
    catalog.upsert_course(db, course)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Persona;

    #[test]
    fn test_enroll_is_idempotent() {
        let catalog = Catalog::default();
        let once = enroll(&catalog, &UserProfile::default(), "c-negotiation").unwrap();
        let twice = enroll(&catalog, &once, "c-negotiation").unwrap();
        assert_eq!(twice.enrolled_courses.len(), 1);
        assert_eq!(
            enroll(&catalog, &once, "c-missing"),
            Err(AcademyError::UnknownCourse("c-missing".to_string()))
        );
    }

    #[test]
    fn test_complete_modules_and_progress() {
        let catalog = Catalog::default();
        let mut profile = enroll(&catalog, &UserProfile::default(), "c-leadership").unwrap();
        assert_eq!(progress(&catalog, &profile, "c-leadership"), 0);

        profile = complete_module(&catalog, &profile, "c-leadership", "m1").unwrap();
        assert_eq!(progress(&catalog, &profile, "c-leadership"), 50);
        assert_eq!(profile.skill_score, 0);

        profile = complete_module(&catalog, &profile, "c-leadership", "m2").unwrap();
        assert_eq!(progress(&catalog, &profile, "c-leadership"), 100);
        assert_eq!(profile.skill_score, COMPLETION_BONUS);

        profile = complete_module(&catalog, &profile, "c-leadership", "m2").unwrap();
        assert_eq!(profile.skill_score, COMPLETION_BONUS, "repeat completion awards nothing");
    }

    #[test]
    fn test_complete_module_errors() {
        let catalog = Catalog::default();
        let profile = UserProfile::default();
        assert_eq!(
            complete_module(&catalog, &profile, "c-leadership", "m1"),
            Err(AcademyError::NotEnrolled("c-leadership".to_string()))
        );
        let profile = enroll(&catalog, &profile, "c-leadership").unwrap();
        assert!(matches!(
            complete_module(&catalog, &profile, "c-leadership", "m9"),
            Err(AcademyError::UnknownModule { .. })
        ));
        assert_eq!(progress(&catalog, &profile, "c-unknown"), 0);
    }

    #[test]
    fn test_admin_upsert_requires_admin() {
        let db = Database::open_in_memory().unwrap();
        let mut catalog = Catalog::load(&db);
        let course = Course {
            id: "c-safety".to_string(),
            title: "Site Safety".to_string(),
            category: "Compliance".to_string(),
            level: "Beginner".to_string(),
            modules: vec![],
        };

        let err = admin_upsert(&mut catalog, &db, &UserProfile::default(), course.clone()).unwrap_err();
        assert_eq!(err.downcast_ref::<AcademyError>(), Some(&AcademyError::NotAdmin));
        assert!(catalog.course("c-safety").is_none());

        let admin = UserProfile {
            primary_focus: Some(Persona::Admin),
            ..Default::default()
        };
        admin_upsert(&mut catalog, &db, &admin, course).unwrap();
        assert!(Catalog::load(&db).course("c-safety").is_some());
    }
}
