use std::f64::consts::PI;
use tracing::warn;

use crate::ai::{new_id, Generator};
use crate::models::{Assessment, DimensionScore, GoalCategory, StrategicGoal, UserProfile};

/// Survey dimensions, in radar-axis order.
pub const DIMENSIONS: &[(&str, GoalCategory)] = &[
    ("Skills", GoalCategory::Skill),
    ("Network", GoalCategory::Network),
    ("Visibility", GoalCategory::Visibility),
    ("Financial", GoalCategory::Financial),
    ("Leadership", GoalCategory::Leadership),
];

/// Slider answers (0-100) grouped by dimension.
#[derive(Debug, Clone, Default)]
pub struct Survey {
    answers: Vec<(String, Vec<u8>)>,
}

impl Survey {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(&mut self, dimension: &str, value: u8) {
        let value = value.min(100);
        match self.answers.iter_mut().find(|(d, _)| d == dimension) {
            Some((_, values)) => values.push(value),
            None => self.answers.push((dimension.to_string(), vec![value])),
        }
    }

    /// Average per dimension. Dimensions with no answers score 0.
    pub fn averages(&self) -> Vec<DimensionScore> {
        DIMENSIONS
            .iter()
            .map(|(dimension, _)| {
                let score = self
                    .answers
                    .iter()
                    .find(|(d, _)| d == dimension)
                    .map(|(_, values)| mean(values.iter().map(|v| f64::from(*v))))
                    .unwrap_or(0.0);
                DimensionScore {
                    dimension: dimension.to_string(),
                    score,
                }
            })
            .collect()
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

pub fn overall(scores: &[DimensionScore]) -> f64 {
    mean(scores.iter().map(|s| s.score))
}

/// Lays scores (0-100) out on a radar chart of the given radius centred on the
/// origin. The first axis points up (negative y, screen coordinates) and axes
/// proceed clockwise.
pub fn radar_points(values: &[f64], radius: f64) -> Vec<(f64, f64)> {
    let n = values.len();
    values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let angle = -PI / 2.0 + 2.0 * PI * i as f64 / n as f64;
            let r = radius * value.clamp(0.0, 100.0) / 100.0;
            (r * angle.cos(), r * angle.sin())
        })
        .collect()
}

/// Goals aimed at the two weakest dimensions; used when the roadmap service
/// is unavailable.
pub fn fallback_roadmap(scores: &[DimensionScore]) -> Vec<StrategicGoal> {
    let mut ranked: Vec<&DimensionScore> = scores.iter().collect();
    ranked.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));

    ranked
        .into_iter()
        .take(2)
        .map(|weak| {
            let category = DIMENSIONS
                .iter()
                .find(|(d, _)| *d == weak.dimension)
                .map(|(_, c)| *c)
                .unwrap_or(GoalCategory::Skill);
            StrategicGoal {
                id: new_id("goal"),
                title: format!("Lift your {} score", weak.dimension.to_lowercase()),
                category,
                deadline: "90 days".to_string(),
                steps: vec![
                    format!("Pick one concrete {} outcome for this quarter", weak.dimension.to_lowercase()),
                    "Block a weekly hour for it in your calendar".to_string(),
                    "Retake the assessment and compare".to_string(),
                ],
            }
        })
        .collect()
}

/// Records the assessment, updates the scale score and replaces the roadmap.
pub fn analyze(generator: &dyn Generator, profile: &UserProfile, survey: &Survey) -> UserProfile {
    let scores = survey.averages();
    let overall_score = overall(&scores);
    let role_label = if profile.role.trim().is_empty() {
        profile.persona_label().to_string()
    } else {
        profile.role.clone()
    };

    let roadmap = match generator.generate_career_roadmap(&scores, &role_label) {
        Ok(goals) if !goals.is_empty() => goals,
        Ok(_) => fallback_roadmap(&scores),
        Err(e) => {
            warn!(error = %e, "roadmap generation failed, using template");
            fallback_roadmap(&scores)
        }
    };

    let mut next = profile.clone();
    next.assessments.push(Assessment {
        taken_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        scores,
        overall: overall_score,
    });
    next.scale_score = overall_score.round() as u32;
    next.strategic_roadmap = roadmap;
    next
}
