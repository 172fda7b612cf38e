use anyhow::Result;
use tracing::info;

use crate::models::{UserProfile, View, LOCKED_VIEWS};
use crate::store::Database;

/// Owns the current profile and the current view. `update_profile` is the
/// only write path for the profile; it persists on every call.
pub struct Session {
    db: Database,
    profile: UserProfile,
    view: View,
    academy_selection: Option<String>,
}

/// Picks the landing view for a profile: admins go to the console, anyone
/// missing identity or industry goes through onboarding, everyone else lands
/// on the dashboard. A completely blank profile starts at the welcome screen.
pub fn landing_view(profile: &UserProfile) -> View {
    if profile.is_admin() {
        View::Admin
    } else if is_blank(profile) {
        View::Welcome
    } else if profile.needs_onboarding() {
        View::Onboarding
    } else {
        View::Dashboard
    }
}

fn is_blank(profile: &UserProfile) -> bool {
    profile.name.trim().is_empty()
        && profile.primary_focus.is_none()
        && profile.industry.as_deref().is_none_or(|i| i.trim().is_empty())
}

impl Session {
    pub fn start(db: Database) -> Result<Self> {
        let restored = db.restore_session()?;
        let (profile, view) = match restored {
            Some(profile) => {
                let view = landing_view(&profile);
                info!(name = %profile.name, view = %view, "restored session");
                (profile, view)
            }
            None => (UserProfile::default(), View::Welcome),
        };
        Ok(Self {
            db,
            profile,
            view,
            academy_selection: None,
        })
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn academy_selection(&self) -> Option<&str> {
        self.academy_selection.as_deref()
    }

    pub fn is_locked(&self, target: View) -> bool {
        let locked = self
            .profile
            .primary_focus
            .map(|p| p.config().locked)
            .unwrap_or(LOCKED_VIEWS);
        locked.contains(&target) && !self.profile.is_subscribed
    }

    /// Navigates to `target`, returning the view actually entered. Locked
    /// views redirect to the subscription screen for unsubscribed users, the
    /// admin console is for admins only and the dashboard is held back until
    /// onboarding is done.
    pub fn change_view(&mut self, target: View, data: Option<&str>) -> View {
        let is_admin = self.profile.is_admin();
        let target = if target == View::Admin && !is_admin {
            info!("admin console requested by non-admin, redirecting");
            View::Dashboard
        } else {
            target
        };

        let entered = if self.is_locked(target) {
            info!(target = %target, "view locked, redirecting to subscription");
            View::Subscription
        } else if target == View::Dashboard
            && self.profile.needs_onboarding()
            && !is_admin
        {
            View::Onboarding
        } else {
            target
        };

        if entered == View::Academy {
            if let Some(course_id) = data {
                self.academy_selection = Some(course_id.to_string());
            }
        }

        self.view = entered;
        entered
    }

    pub fn login(&mut self, profile: UserProfile) -> Result<View> {
        self.update_profile(profile)?;
        self.view = landing_view(&self.profile);
        self.db.set_guide_pending(self.view == View::Dashboard)?;
        info!(name = %self.profile.name, view = %self.view, "logged in");
        Ok(self.view)
    }

    /// Returns true exactly once after a login that landed on the dashboard,
    /// even when the guide is shown by a later process.
    pub fn take_guide(&mut self) -> Result<bool> {
        let pending = self.db.guide_pending()?;
        if pending {
            self.db.set_guide_pending(false)?;
        }
        Ok(pending)
    }

    pub fn logout(&mut self) -> Result<()> {
        self.db.logout()?;
        self.profile = UserProfile::default();
        self.view = View::Welcome;
        self.academy_selection = None;
        info!("logged out");
        Ok(())
    }

    pub fn update_profile(&mut self, profile: UserProfile) -> Result<()> {
        self.profile = profile;
        self.db.update_user(&self.profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Persona;

    fn onboarded(persona: Persona) -> UserProfile {
        UserProfile {
            name: "Ada".to_string(),
            industry: Some("Mining".to_string()),
            primary_focus: Some(persona),
            ..Default::default()
        }
    }

    fn session_with(profile: Option<UserProfile>) -> Session {
        let db = Database::open_in_memory().unwrap();
        if let Some(p) = profile {
            db.update_user(&p).unwrap();
        }
        Session::start(db).unwrap()
    }

    #[test]
    fn test_startup_without_session_shows_welcome() {
        let session = session_with(None);
        assert_eq!(session.view(), View::Welcome);
        assert_eq!(session.profile(), &UserProfile::default());
    }

    #[test]
    fn test_startup_admin_goes_to_admin_view() {
        let mut admin = onboarded(Persona::Admin);
        admin.industry = None;
        let session = session_with(Some(admin));
        assert_eq!(session.view(), View::Admin);
    }

    #[test]
    fn test_startup_missing_industry_goes_to_onboarding() {
        for persona in [Persona::Contractor, Persona::Recruiter, Persona::Executive] {
            let mut profile = onboarded(persona);
            profile.industry = None;
            let session = session_with(Some(profile));
            assert_eq!(session.view(), View::Onboarding, "{persona}");
        }
    }

    #[test]
    fn test_startup_placeholder_name_goes_to_onboarding() {
        let mut profile = onboarded(Persona::Professional);
        profile.name = crate::models::PLACEHOLDER_NAME.to_string();
        let session = session_with(Some(profile));
        assert_eq!(session.view(), View::Onboarding);
    }

    #[test]
    fn test_startup_blank_profile_shows_welcome() {
        let profile = UserProfile {
            name: String::new(),
            industry: None,
            ..Default::default()
        };
        let session = session_with(Some(profile));
        assert_eq!(session.view(), View::Welcome);
    }

    #[test]
    fn test_startup_complete_profile_goes_to_dashboard() {
        let session = session_with(Some(onboarded(Persona::Contractor)));
        assert_eq!(session.view(), View::Dashboard);
    }

    #[test]
    fn test_locked_views_redirect_when_unsubscribed() {
        let mut session = session_with(Some(onboarded(Persona::Professional)));
        assert_eq!(session.change_view(View::Strategy, None), View::Subscription);
        assert_eq!(session.view(), View::Subscription);
        assert_eq!(session.change_view(View::Toolkit, None), View::Subscription);
        assert_eq!(session.change_view(View::Marketplace, None), View::Marketplace);
    }

    #[test]
    fn test_locked_views_open_when_subscribed() {
        let mut profile = onboarded(Persona::Professional);
        profile.is_subscribed = true;
        let mut session = session_with(Some(profile));
        assert_eq!(session.change_view(View::Strategy, None), View::Strategy);
        assert_eq!(session.view(), View::Strategy);
    }

    #[test]
    fn test_dashboard_requires_onboarding() {
        let mut session = session_with(None);
        assert_eq!(session.change_view(View::Dashboard, None), View::Onboarding);
    }

    #[test]
    fn test_academy_remembers_course_selection() {
        let mut session = session_with(Some(onboarded(Persona::Student)));
        session.change_view(View::Academy, Some("c-negotiation"));
        assert_eq!(session.academy_selection(), Some("c-negotiation"));

        session.change_view(View::Marketplace, Some("ignored"));
        assert_eq!(session.academy_selection(), Some("c-negotiation"));
    }

    #[test]
    fn test_login_routes_and_schedules_guide_once() {
        let mut session = session_with(None);
        let view = session.login(onboarded(Persona::Contractor)).unwrap();
        assert_eq!(view, View::Dashboard);
        assert!(session.take_guide().unwrap());
        assert!(!session.take_guide().unwrap());
        assert_eq!(session.db().restore_session().unwrap().unwrap().name, "Ada");
    }

    #[test]
    fn test_login_incomplete_profile_goes_to_onboarding_without_guide() {
        let mut session = session_with(None);
        let mut profile = onboarded(Persona::Recruiter);
        profile.industry = Some(String::new());
        assert_eq!(session.login(profile).unwrap(), View::Onboarding);
        assert!(!session.take_guide().unwrap());

        assert_eq!(session.login(onboarded(Persona::Admin)).unwrap(), View::Admin);
        assert!(!session.take_guide().unwrap());
    }

    #[test]
    fn test_guide_survives_restart_until_taken() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("careeros.db");
        {
            let mut session = Session::start(Database::open(&path).unwrap()).unwrap();
            assert_eq!(session.login(onboarded(Persona::Contractor)).unwrap(), View::Dashboard);
        }

        let mut session = Session::start(Database::open(&path).unwrap()).unwrap();
        assert_eq!(session.view(), View::Dashboard);
        assert!(session.take_guide().unwrap());
        drop(session);

        let mut session = Session::start(Database::open(&path).unwrap()).unwrap();
        assert!(!session.take_guide().unwrap());
    }

    #[test]
    fn test_admin_console_is_admin_only() {
        let mut session = session_with(Some(onboarded(Persona::Recruiter)));
        assert_eq!(session.change_view(View::Admin, None), View::Dashboard);

        let mut session = session_with(None);
        assert_eq!(session.change_view(View::Admin, None), View::Onboarding);

        let mut session = session_with(Some(onboarded(Persona::Admin)));
        assert_eq!(session.change_view(View::Admin, None), View::Admin);
    }

    #[test]
    fn test_logout_resets_everything() {
        let mut session = session_with(Some(onboarded(Persona::Contractor)));
        session.change_view(View::Academy, Some("c-tendering"));
        session.logout().unwrap();
        assert_eq!(session.view(), View::Welcome);
        assert_eq!(session.profile(), &UserProfile::default());
        assert!(session.academy_selection().is_none());
        assert!(session.db().restore_session().unwrap().is_none());
    }

    #[test]
    fn test_update_profile_persists() {
        let mut session = session_with(Some(onboarded(Persona::Contractor)));
        let mut next = session.profile().clone();
        next.skill_score = 42;
        session.update_profile(next).unwrap();
        assert_eq!(session.profile().skill_score, 42);
        assert_eq!(session.db().restore_session().unwrap().unwrap().skill_score, 42);
    }
}
