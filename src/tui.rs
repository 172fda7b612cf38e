use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::academy;
use crate::ai::Generator;
use crate::catalog::Catalog;
use crate::marketplace;
use crate::models::{View, LOCKED_VIEWS};
use crate::session::Session;

struct AppState<'a> {
    session: &'a mut Session,
    catalog: &'a mut Catalog,
    generator: &'a dyn Generator,
    nav: Vec<View>,
    nav_selected: usize,
    item_selected: usize,
    scroll_offset: u16,
    show_guide: bool,
    status: String,
}

impl<'a> AppState<'a> {
    fn new(
        session: &'a mut Session,
        catalog: &'a mut Catalog,
        generator: &'a dyn Generator,
        show_guide: bool,
    ) -> Self {
        let nav = nav_for(session);
        let nav_selected = nav.iter().position(|v| *v == session.view()).unwrap_or(0);
        Self {
            session,
            catalog,
            generator,
            nav,
            nav_selected,
            item_selected: 0,
            scroll_offset: 0,
            show_guide,
            status: String::new(),
        }
    }

    fn next_nav(&mut self) {
        if !self.nav.is_empty() && self.nav_selected < self.nav.len() - 1 {
            self.nav_selected += 1;
        }
    }

    fn prev_nav(&mut self) {
        self.nav_selected = self.nav_selected.saturating_sub(1);
    }

    fn open_selected(&mut self) {
        let Some(target) = self.nav.get(self.nav_selected).copied() else { return };
        let entered = self.session.change_view(target, None);
        self.item_selected = 0;
        self.scroll_offset = 0;
        self.status = redirect_notice(target, entered);
    }

    fn item_count(&self) -> usize {
        match self.session.view() {
            View::Marketplace => self.catalog.jobs.len(),
            View::Academy | View::Admin => self.catalog.courses.len(),
            _ => 0,
        }
    }

    fn next_item(&mut self) {
        if self.item_selected + 1 < self.item_count() {
            self.item_selected += 1;
        }
    }

    fn prev_item(&mut self) {
        self.item_selected = self.item_selected.saturating_sub(1);
    }

    fn save_selected(&mut self) {
        if self.session.view() != View::Marketplace {
            return;
        }
        let Some(job) = self.catalog.jobs.get(self.item_selected) else { return };
        let (next, saved) = marketplace::toggle_saved(self.session.profile(), &job.id);
        let title = job.title.clone();
        self.status = match self.session.update_profile(next) {
            Ok(()) if saved => format!("Saved '{}'", title),
            Ok(()) => format!("Removed '{}' from saved", title),
            Err(e) => format!("Could not save: {}", e),
        };
    }

    fn act_on_selected(&mut self) {
        match self.session.view() {
            View::Marketplace => {
                let Some(job) = self.catalog.jobs.get(self.item_selected).cloned() else { return };
                self.status = match marketplace::confirm_application(self.generator, self.session.profile(), &job) {
                    Ok(next) => match self.session.update_profile(next) {
                        Ok(()) => format!("Applied to '{}'", job.title),
                        Err(e) => format!("Could not save application: {}", e),
                    },
                    Err(e) => e.to_string(),
                };
            }
            View::Academy => {
                let Some(course) = self.catalog.courses.get(self.item_selected) else { return };
                let course_id = course.id.clone();
                self.status = match academy::enroll(&*self.catalog, self.session.profile(), &course_id) {
                    Ok(next) => match self.session.update_profile(next) {
                        Ok(()) => format!("Enrolled in '{}'", course_id),
                        Err(e) => format!("Could not enroll: {}", e),
                    },
                    Err(e) => e.to_string(),
                };
            }
            _ => {}
        }
    }
}

/// Status line explaining why navigation ended somewhere other than `target`.
fn redirect_notice(target: View, entered: View) -> String {
    if entered == target {
        return String::new();
    }
    match entered {
        View::Subscription => format!("{} is locked - subscribe to unlock", target),
        View::Onboarding => format!("Finish onboarding first (`careeros onboard`) to open {}", target),
        _ => format!("{} is not available - showing {}", target, entered),
    }
}

fn nav_for(session: &Session) -> Vec<View> {
    let mut nav: Vec<View> = session
        .profile()
        .primary_focus
        .map(|p| p.config().nav.to_vec())
        .unwrap_or_else(|| vec![View::Dashboard, View::Marketplace, View::Academy]);
    nav.push(View::Subscription);
    nav
}

pub fn run_browse(session: &mut Session, catalog: &mut Catalog, generator: &dyn Generator) -> Result<()> {
    let show_guide = session.take_guide()?;
    let mut state = AppState::new(session, catalog, generator, show_guide);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>, state: &mut AppState) -> Result<()> {
    let mut nav_state = ListState::default();
    nav_state.select(Some(state.nav_selected));

    loop {
        terminal.draw(|frame| draw(frame, state, &mut nav_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if state.show_guide {
                state.show_guide = false;
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Tab | KeyCode::Char('l') => state.next_nav(),
                KeyCode::BackTab | KeyCode::Char('h') => state.prev_nav(),
                KeyCode::Enter => state.open_selected(),
                KeyCode::Down | KeyCode::Char('j') => state.next_item(),
                KeyCode::Up | KeyCode::Char('k') => state.prev_item(),
                KeyCode::Char('J') | KeyCode::PageDown => {
                    state.scroll_offset = state.scroll_offset.saturating_add(3)
                }
                KeyCode::Char('K') | KeyCode::PageUp => {
                    state.scroll_offset = state.scroll_offset.saturating_sub(3)
                }
                KeyCode::Char('s') => state.save_selected(),
                KeyCode::Char('a') => state.act_on_selected(),
                _ => {}
            }
            nav_state.select(Some(state.nav_selected));
        }
    }
    Ok(())
}

fn draw(frame: &mut Frame, state: &AppState, nav_state: &mut ListState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1), Constraint::Length(1)])
        .split(frame.area());

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(25), Constraint::Percentage(75)])
        .split(rows[0]);

    // Left panel: persona navigation
    let locked = state
        .session
        .profile()
        .primary_focus
        .map(|p| p.config().locked)
        .unwrap_or(LOCKED_VIEWS);
    let items: Vec<ListItem> = state
        .nav
        .iter()
        .map(|view| {
            let marker = if *view == state.session.view() { "*" } else { " " };
            let lock = if locked.contains(view) && !state.session.profile().is_subscribed {
                " (locked)"
            } else {
                ""
            };
            ListItem::new(format!("{} {}{}", marker, view, lock))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", state.session.profile().persona_label())),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, chunks[0], nav_state);

    // Right panel: current view
    let detail = Paragraph::new(build_detail(state))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", state.session.view())),
        )
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));
    frame.render_widget(detail, chunks[1]);

    let status = Paragraph::new(state.status.as_str()).style(Style::default().fg(Color::Yellow));
    frame.render_widget(status, rows[1]);

    let help = Paragraph::new(
        " h/l:menu  enter:open  j/k:select  J/K:scroll  a:apply/enroll  s:save  q:quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, rows[2]);

    if state.show_guide {
        draw_guide(frame, state);
    }
}

fn draw_guide(frame: &mut Frame, state: &AppState) {
    let area = frame.area();
    let popup = Rect {
        x: area.width / 6,
        y: area.height / 4,
        width: area.width * 2 / 3,
        height: (area.height / 2).max(7),
    }
    .intersection(area);

    let persona = state.session.profile().primary_focus;
    let next_step = persona
        .map(|p| p.config().continue_label)
        .unwrap_or("Explore the dashboard");
    let text = format!(
        "Welcome to CareerOS, {}!\n\n\
        Use h/l to move through the menu on the left and Enter to open a screen.\n\
        Suggested next step: {}.\n\n\
        Press any key to close this guide.",
        state.session.profile().name,
        next_step
    );
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(text)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title(" Getting started ")),
        popup,
    );
}

fn heading(text: &str) -> Line<'static> {
    Line::from(Span::styled(
        text.to_string(),
        Style::default().add_modifier(Modifier::BOLD),
    ))
}

fn selected_style(selected: bool) -> Style {
    if selected {
        Style::default().bg(Color::DarkGray)
    } else {
        Style::default()
    }
}

fn build_detail(state: &AppState) -> Text<'static> {
    let profile = state.session.profile();
    let mut lines: Vec<Line> = Vec::new();

    match state.session.view() {
        View::Dashboard => {
            lines.push(heading(&format!("{} - {}", profile.name, profile.persona_label())));
            if let Some(industry) = &profile.industry {
                lines.push(Line::from(format!("Industry: {}", industry)));
            }
            lines.push(Line::from(""));
            lines.push(Line::from(format!("Market value:  ${}", profile.market_value)));
            lines.push(Line::from(format!("Skill score:   {}", profile.skill_score)));
            lines.push(Line::from(format!("Scale score:   {}", profile.scale_score)));
            lines.push(Line::from(format!(
                "Applications:  {}   Saved: {}   Courses: {}",
                profile.applied_job_ids.len(),
                profile.saved_job_ids.len(),
                profile.enrolled_courses.len()
            )));
            if !profile.strategic_roadmap.is_empty() {
                lines.push(Line::from(""));
                lines.push(heading("Roadmap"));
                for goal in &profile.strategic_roadmap {
                    lines.push(Line::from(format!("  [{:?}] {} ({})", goal.category, goal.title, goal.deadline)));
                }
            }
        }
        View::Marketplace => {
            let label = profile
                .primary_focus
                .map(|p| p.config().marketplace_label)
                .unwrap_or("Jobs");
            lines.push(heading(label));
            for (i, job) in state.catalog.jobs.iter().enumerate() {
                let mark = if profile.has_applied(&job.id) {
                    "+"
                } else if profile.saved_job_ids.contains(&job.id) {
                    "*"
                } else {
                    " "
                };
                lines.push(Line::from(Span::styled(
                    format!(
                        "{} {:>3}% {} | {} | {} | {}",
                        mark,
                        job.match_score,
                        job.title,
                        job.company,
                        job.kind.as_str(),
                        job.budget
                    ),
                    selected_style(i == state.item_selected),
                )));
            }
            if let Some(job) = state.catalog.jobs.get(state.item_selected) {
                lines.push(Line::from(""));
                for line in textwrap::fill(&job.description, 70).lines() {
                    lines.push(Line::from(format!("  {}", line)));
                }
                if !job.skills.is_empty() {
                    lines.push(Line::from(format!("  Skills: {}", job.skills.join(", "))));
                }
            }
        }
        View::Academy | View::Admin => {
            if state.session.view() == View::Admin {
                lines.push(heading("Course catalog (edit with `careeros academy upsert`)"));
            } else {
                lines.push(heading("Academy"));
            }
            let preselected = state.session.academy_selection();
            for (i, course) in state.catalog.courses.iter().enumerate() {
                let pct = academy::progress(&*state.catalog, profile, &course.id);
                let pin = if preselected == Some(course.id.as_str()) { ">" } else { " " };
                lines.push(Line::from(Span::styled(
                    format!("{} {:<28} {:<12} {:>3}%", pin, course.title, course.level, pct),
                    selected_style(i == state.item_selected),
                )));
            }
        }
        View::Strategy | View::Toolkit => {
            lines.push(heading("Strategic roadmap"));
            if profile.strategic_roadmap.is_empty() {
                lines.push(Line::from("Run `careeros strategy` to take the assessment."));
            }
            for goal in &profile.strategic_roadmap {
                lines.push(Line::from(format!("{} [{:?}, {}]", goal.title, goal.category, goal.deadline)));
                for (n, step) in goal.steps.iter().enumerate() {
                    lines.push(Line::from(format!("  {}. {}", n + 1, step)));
                }
            }
        }
        View::Profile => {
            lines.push(heading("Skills"));
            lines.push(Line::from(if profile.skills.is_empty() {
                "(none yet - try `careeros discover`)".to_string()
            } else {
                profile.skills.join(", ")
            }));
            lines.push(Line::from(""));
            lines.push(heading("Tailored resumes"));
            for entry in &profile.resume_history {
                lines.push(Line::from(format!("  {} - {} at {}", entry.created_at, entry.job_title, entry.company)));
            }
        }
        View::Settings => {
            lines.push(heading("Account"));
            lines.push(Line::from(format!("Name:     {}", profile.name)));
            lines.push(Line::from(format!("Email:    {}", profile.email)));
            lines.push(Line::from(format!("Role:     {}", profile.role)));
            lines.push(Line::from(format!("Location: {}", profile.location)));
        }
        View::Subscription => {
            lines.push(heading("Plans"));
            for plan in crate::models::Plan::ALL {
                let current = if profile.subscription_plan == Some(plan) { " (current)" } else { "" };
                lines.push(Line::from(format!("  {:?}: {}{}", plan, plan.price_label(), current)));
            }
            lines.push(Line::from(""));
            lines.push(Line::from("Subscribe with `careeros subscribe <plan>`."));
        }
        View::Welcome | View::Onboarding => {
            lines.push(heading("Welcome to CareerOS"));
            lines.push(Line::from("Run `careeros onboard` to set up your profile."));
        }
    }

    Text::from(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_notice_names_the_gate() {
        assert_eq!(redirect_notice(View::Marketplace, View::Marketplace), "");
        assert_eq!(
            redirect_notice(View::Strategy, View::Subscription),
            "strategy is locked - subscribe to unlock"
        );
        let onboarding = redirect_notice(View::Dashboard, View::Onboarding);
        assert!(onboarding.starts_with("Finish onboarding first"));
        assert!(!onboarding.contains("locked"));
        assert_eq!(
            redirect_notice(View::Admin, View::Dashboard),
            "admin is not available - showing dashboard"
        );
    }
}
