//! Session report
//!
//! Everything here is derived from the stored session and its data points,
//! so a past report can be rebuilt at any time.

use crate::records::{MonitoringSession, SessionDataPoint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Blinks per minute below which a busy session counts as staring
const LOW_BLINK_RATE: f64 = 15.0;
/// Average EAR below which the eyes count as tired
const FATIGUE_EAR: f64 = 0.25;
/// Labels treated as stress when deciding on a break
const STRESS_EMOTIONS: [&str; 3] = ["Sad", "Angry", "Fearful"];

/// Keyboard and pointer intensity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityLevel {
    Low,
    Moderate,
    High,
}

impl ActivityLevel {
    pub fn classify(keys: i64, mouse: i64) -> Self {
        if keys > 200 || mouse > 20_000 {
            ActivityLevel::High
        } else if keys > 50 || mouse > 5_000 {
            ActivityLevel::Moderate
        } else {
            ActivityLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityLevel::Low => "Low (Passive/Reading)",
            ActivityLevel::Moderate => "Moderate",
            ActivityLevel::High => "High (Intense Focus)",
        }
    }
}

/// Wellbeing plant state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlantStatus {
    Radiant,
    Healthy,
    Thirsty,
    Withered,
}

/// Gamified wellbeing score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlantHealth {
    pub score: u8,
    pub status: PlantStatus,
}

impl PlantHealth {
    /// Score a session by its blink total
    pub fn from_blinks(total_blinks: i64) -> Self {
        let mut score: i64 = 100;
        if total_blinks < 15 {
            score -= 30;
        }
        if total_blinks > 50 {
            score -= 20;
        }
        let score = score.clamp(0, 100) as u8;

        let status = match score {
            s if s > 80 => PlantStatus::Radiant,
            s if s > 50 => PlantStatus::Healthy,
            s if s > 20 => PlantStatus::Thirsty,
            _ => PlantStatus::Withered,
        };
        Self { score, status }
    }
}

impl Default for PlantHealth {
    fn default() -> Self {
        Self {
            score: 100,
            status: PlantStatus::Radiant,
        }
    }
}

/// Rule-based observation about a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Insight {
    ScreenStrain,
    PassiveViewing,
    TakeABreak,
    Fatigue,
}

impl Insight {
    pub fn message(&self) -> &'static str {
        match self {
            Insight::ScreenStrain => {
                "High activity with few blinks: risk of computer vision syndrome. Blink consciously and follow the 20-20-20 rule."
            }
            Insight::PassiveViewing => "Low activity and a neutral mood: you were probably reading or watching.",
            Insight::TakeABreak => "High activity under stress: take a break now.",
            Insight::Fatigue => "Low average eye openness suggests fatigue.",
        }
    }
}

/// Blink curve for plotting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    /// HH:MM:SS of each data point
    pub timestamps: Vec<String>,
    pub blinks: Vec<i64>,
}

/// Full session report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: f64,
    pub total_blinks: i64,
    pub blink_rate: f64,
    pub avg_ear: f64,
    pub keyboard_activity: i64,
    pub mouse_activity: i64,
    pub activity_level: ActivityLevel,
    pub dominant_emotion: String,
    /// Label counts in first-seen order
    pub emotion_breakdown: Vec<(String, usize)>,
    pub chart: ChartData,
    pub plant: PlantHealth,
    pub insights: Vec<Insight>,
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

/// Label counts in first-seen order, skipping empty labels
fn emotion_counts(points: &[SessionDataPoint]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for label in points.iter().map(|p| p.detected_emotion.as_str()).filter(|l| !l.is_empty()) {
        match counts.iter_mut().find(|(seen, _)| seen == label) {
            Some((_, n)) => *n += 1,
            None => counts.push((label.to_string(), 1)),
        }
    }
    counts
}

/// Most common label; ties go to the label seen first
fn dominant_emotion(counts: &[(String, usize)]) -> String {
    let mut best: Option<&(String, usize)> = None;
    for entry in counts {
        if best.map_or(true, |b| entry.1 > b.1) {
            best = Some(entry);
        }
    }
    best.map(|(label, _)| label.clone())
        .unwrap_or_else(|| "Neutral".to_string())
}

/// Build the report of `session` as of `end`; data points must be in time order
pub fn build_report(
    session: &MonitoringSession,
    points: &[SessionDataPoint],
    end: DateTime<Utc>,
) -> SessionReport {
    let end_time = session.end_time.unwrap_or(end);
    let seconds = (end_time - session.start_time).num_seconds().max(0);
    let duration_minutes = round_to(seconds as f64 / 60.0, 2);

    let per_minute = if duration_minutes > 0.0 { duration_minutes } else { 1.0 };
    let blink_rate = round_to(session.total_blinks as f64 / per_minute, 1);

    let activity_level = ActivityLevel::classify(session.keyboard_activity, session.mouse_activity);
    let emotion_breakdown = emotion_counts(points);
    let dominant_emotion = dominant_emotion(&emotion_breakdown);

    let mut insights = Vec::new();
    if activity_level == ActivityLevel::High && blink_rate < LOW_BLINK_RATE {
        insights.push(Insight::ScreenStrain);
    }
    if activity_level == ActivityLevel::Low && dominant_emotion == "Neutral" {
        insights.push(Insight::PassiveViewing);
    }
    if activity_level == ActivityLevel::High && STRESS_EMOTIONS.contains(&dominant_emotion.as_str()) {
        insights.push(Insight::TakeABreak);
    }
    // an average of zero means no samples, not closed eyes
    if session.avg_ear > 0.0 && session.avg_ear < FATIGUE_EAR {
        insights.push(Insight::Fatigue);
    }

    let chart = ChartData {
        timestamps: points
            .iter()
            .map(|p| p.timestamp.format("%H:%M:%S").to_string())
            .collect(),
        blinks: points.iter().map(|p| p.blink_count_snapshot).collect(),
    };

    SessionReport {
        session_id: session.id,
        start_time: session.start_time,
        end_time,
        duration_minutes,
        total_blinks: session.total_blinks,
        blink_rate,
        avg_ear: session.avg_ear,
        keyboard_activity: session.keyboard_activity,
        mouse_activity: session.mouse_activity,
        activity_level,
        dominant_emotion,
        emotion_breakdown,
        chart,
        plant: PlantHealth::from_blinks(session.total_blinks),
        insights,
    }
}
