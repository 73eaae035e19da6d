//! Daily Neuro-Flow focus score and the consecutive-day streak.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::context::Context;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowLevel {
    #[serde(rename = "Deep Focus")]
    DeepFocus,
    #[serde(rename = "Good Flow")]
    GoodFlow,
    Moderate,
    Scattered,
    Distracted,
}

impl FlowLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 85.0 {
            FlowLevel::DeepFocus
        } else if score >= 70.0 {
            FlowLevel::GoodFlow
        } else if score >= 50.0 {
            FlowLevel::Moderate
        } else if score >= 30.0 {
            FlowLevel::Scattered
        } else {
            FlowLevel::Distracted
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FlowLevel::DeepFocus => "Deep Focus",
            FlowLevel::GoodFlow => "Good Flow",
            FlowLevel::Moderate => "Moderate",
            FlowLevel::Scattered => "Scattered",
            FlowLevel::Distracted => "Distracted",
        }
    }
}

impl fmt::Display for FlowLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Switch and breadth counts for one day of Contexts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayActivity {
    pub switch_count: usize,
    pub unique_urls: usize,
}

impl DayActivity {
    pub fn from_contexts(contexts: &[Context]) -> Self {
        let unique: HashSet<&str> = contexts.iter().map(Context::resource_key).collect();
        Self {
            switch_count: contexts.len(),
            unique_urls: unique.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.switch_count == 0
    }

    pub fn qualifies_for_streak(&self) -> bool {
        !self.is_empty()
            && self.switch_count <= STREAK_MAX_SWITCHES
            && self.unique_urls <= STREAK_MAX_URLS
    }
}

/// Consecutive qualifying days counted from the first entry (today) backward.
/// An empty day ends the streak just like a failing one.
pub fn focus_streak(days: &[DayActivity]) -> u32 {
    days.iter()
        .take(STREAK_WINDOW_DAYS as usize)
        .take_while(|d| d.qualifies_for_streak())
        .count() as u32
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowScore {
    pub score: u32,
    pub level: FlowLevel,
    pub distractions: usize,
    pub focus_streak: u32,
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub unique_workspaces: usize,
    #[serde(default)]
    pub total_switches: usize,
    #[serde(default)]
    pub recoveries: usize,
}

impl FlowScore {
    /// The neutral result reported before any activity has been captured.
    pub fn neutral() -> Self {
        Self {
            score: NEUTRAL_SCORE,
            level: FlowLevel::GoodFlow,
            distractions: 0,
            focus_streak: 0,
            suggestions: vec!["Start working to see your focus metrics".to_string()],
            unique_workspaces: 0,
            total_switches: 0,
            recoveries: 0,
        }
    }
}

/// Unrounded, unclamped score for the day's counts.
pub fn raw_score(day: DayActivity, recovered: usize) -> f64 {
    let excess_switches = day.switch_count.saturating_sub(SWITCH_ALLOWANCE) as f64;
    let excess_urls = day.unique_urls.saturating_sub(URL_ALLOWANCE) as f64;
    100.0 - excess_switches * SWITCH_PENALTY - excess_urls * URL_PENALTY
        + recovered as f64 * RECOVERY_BONUS
}

/// Score today's Contexts. `streak` comes from [`focus_streak`] over the
/// preceding days and is reported as-is; an empty day always reports zero.
pub fn score_day(contexts: &[Context], streak: u32) -> FlowScore {
    if contexts.is_empty() {
        return FlowScore::neutral();
    }

    let day = DayActivity::from_contexts(contexts);
    let recovered = contexts.iter().filter(|c| c.is_recovered()).count();
    let score = raw_score(day, recovered).clamp(0.0, 100.0);
    let distractions = day.switch_count.saturating_sub(DISTRACTION_ALLOWANCE);

    let mut suggestions = Vec::new();
    if distractions > 5 {
        suggestions.push("Try closing unnecessary tabs to reduce distractions".to_string());
    }
    if score < 50.0 {
        suggestions.push("Consider using focus mode for deep work sessions".to_string());
    }
    if day.unique_urls > 8 {
        suggestions.push("You have many active contexts. Consider archiving some.".to_string());
    }
    if suggestions.is_empty() {
        suggestions.push("Great focus today! Keep up the momentum.".to_string());
    }

    FlowScore {
        score: score.round() as u32,
        level: FlowLevel::from_score(score),
        distractions,
        focus_streak: streak,
        suggestions,
        unique_workspaces: day.unique_urls,
        total_switches: day.switch_count,
        recoveries: recovered,
    }
}
