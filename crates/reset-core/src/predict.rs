//! Distraction and context-loss heuristics over a live activity snapshot.
//!
//! Both consumers share [`evaluate_factors`]: the prediction reports a
//! continuous risk, the detection applies a fixed threshold to decide whether
//! a recovery prompt should be shown. Nothing here touches storage.

use serde::{Deserialize, Serialize};

use crate::constants::*;

/// Signals assembled by the caller for one moment of browsing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivitySnapshot {
    /// Tab switches inside the observation window.
    pub recent_tab_switches: usize,
    pub idle_duration_ms: u64,
    pub unique_domains: usize,
    pub domain_changed: bool,
    /// Successive scroll offsets, oldest first.
    pub scroll_positions: Vec<i64>,
    pub reread_count: u32,
    pub session_duration_ms: u64,
    pub time_since_last_interaction_ms: u64,
    /// Local hour of day (0..=23); the afternoon factor is skipped when absent.
    pub local_hour: Option<u32>,
}

impl ActivitySnapshot {
    /// Number of steps where the scroll offset moved back up the page.
    pub fn backward_scrolls(&self) -> usize {
        self.scroll_positions
            .windows(2)
            .filter(|w| w[1] < w[0])
            .count()
    }
}

/// One factor that contributed to the probability.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub name: String,
    /// Contribution after sensitivity scaling.
    pub impact: f64,
    pub description: String,
}

/// Idle weighting differs between the two consumers; every other factor is shared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FactorProfile {
    Prediction,
    Detection,
}

impl FactorProfile {
    fn idle_weights(self) -> (f64, f64) {
        match self {
            FactorProfile::Prediction => (0.08, 0.30),
            FactorProfile::Detection => (0.10, 0.40),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    fn from_probability(p: f64) -> Self {
        if p > HIGH_RISK {
            RiskLevel::High
        } else if p > MEDIUM_RISK {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    fn recommendation(self) -> &'static str {
        match self {
            RiskLevel::High => {
                "High distraction risk. Consider taking a short break or entering focus mode."
            }
            RiskLevel::Medium => "Moderate distraction risk. Stay aware of your focus.",
            RiskLevel::Low => "Focus looks good. Keep up the momentum!",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    fn from_probability(p: f64) -> Self {
        if p >= HIGH_RISK {
            Confidence::High
        } else if p >= MEDIUM_RISK {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistractionPrediction {
    pub probability: f64,
    pub risk_level: RiskLevel,
    pub triggers: Vec<Trigger>,
    pub recommendation: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextLossDetection {
    pub detected: bool,
    pub probability: f64,
    pub confidence: Confidence,
    pub factors: Vec<Trigger>,
    pub recommendation: String,
}

/// Map a 1..=10 sensitivity onto a 0.1..=1.0 multiplier. Zero means "unset".
pub fn sensitivity_scale(sensitivity: u8) -> f64 {
    let s = if sensitivity == 0 {
        DEFAULT_SENSITIVITY
    } else {
        sensitivity.min(MAX_SENSITIVITY)
    };
    f64::from(s) / 10.0
}

/// Evaluate every factor against the snapshot, returning the ones that fired
/// in a fixed order with their scaled contributions.
pub fn evaluate_factors(
    snapshot: &ActivitySnapshot,
    sensitivity: u8,
    profile: FactorProfile,
) -> Vec<Trigger> {
    let scale = sensitivity_scale(sensitivity);
    let mut fired = Vec::new();
    let mut push = |name: &str, raw: f64, description: String| {
        fired.push(Trigger {
            name: name.to_string(),
            impact: raw * scale,
            description,
        });
    };

    let switches = snapshot.recent_tab_switches;
    if switches > TAB_SWITCH_FREE {
        let raw = ((switches - TAB_SWITCH_FREE) as f64 * TAB_SWITCH_WEIGHT).min(TAB_SWITCH_CAP);
        push(
            "Rapid tab switching",
            raw,
            format!("{switches} tab switches in the last minute"),
        );
    }

    let idle_minutes = snapshot.idle_duration_ms as f64 / 60_000.0;
    if idle_minutes > IDLE_FREE_MINUTES {
        let (per_minute, cap) = profile.idle_weights();
        push(
            "Extended idle time",
            (idle_minutes * per_minute).min(cap),
            format!("{} minutes of inactivity", idle_minutes.round()),
        );
    }

    let domains = snapshot.unique_domains;
    if domains > DOMAIN_FREE {
        push(
            "Many different sites",
            ((domains - DOMAIN_FREE) as f64 * DOMAIN_WEIGHT).min(DOMAIN_CAP),
            format!("{domains} different sites visited"),
        );
    }

    if snapshot.domain_changed {
        push(
            "Domain switch",
            DOMAIN_CHANGE_IMPACT,
            "Switched to a different website".to_string(),
        );
    }

    let back_scrolls = snapshot.backward_scrolls();
    if back_scrolls > BACK_SCROLL_FREE {
        push(
            "Re-reading behavior",
            (back_scrolls as f64 * BACK_SCROLL_WEIGHT).min(BACK_SCROLL_CAP),
            "Scrolling back to re-read content".to_string(),
        );
    }

    if let Some(hour) = snapshot.local_hour
        && (DIP_START_HOUR..=DIP_END_HOUR).contains(&hour)
    {
        push(
            "Afternoon productivity dip",
            DIP_IMPACT,
            format!("{hour}:00 falls in the mid-afternoon slump"),
        );
    }

    if snapshot.session_duration_ms > LONG_SESSION_MS {
        let hours = snapshot.session_duration_ms as f64 / 3_600_000.0;
        push(
            "Long session without break",
            LONG_SESSION_IMPACT,
            format!("{hours:.1} hours without a break"),
        );
    }

    if snapshot.reread_count > REREAD_FREE {
        push(
            "Confusion detected",
            REREAD_IMPACT,
            format!("Re-read the same passage {} times", snapshot.reread_count),
        );
    }

    let hesitation_secs = snapshot.time_since_last_interaction_ms as f64 / 1000.0;
    if hesitation_secs > HESITATION_FREE_SECS {
        push(
            "Hesitation detected",
            ((hesitation_secs - HESITATION_FREE_SECS) * HESITATION_WEIGHT).min(HESITATION_CAP),
            format!("{} seconds without interaction", hesitation_secs.round()),
        );
    }

    fired
}

fn combined_probability(triggers: &[Trigger]) -> f64 {
    triggers.iter().map(|t| t.impact).sum::<f64>().clamp(0.0, 1.0)
}

fn round_2dp(p: f64) -> f64 {
    (p * 100.0).round() / 100.0
}

/// Continuous distraction risk for the snapshot.
pub fn predict_distraction(snapshot: &ActivitySnapshot, sensitivity: u8) -> DistractionPrediction {
    let triggers = evaluate_factors(snapshot, sensitivity, FactorProfile::Prediction);
    let probability = combined_probability(&triggers);
    let risk_level = RiskLevel::from_probability(probability);
    DistractionPrediction {
        probability: round_2dp(probability),
        risk_level,
        triggers,
        recommendation: risk_level.recommendation().to_string(),
    }
}

/// Threshold decision: should a context-recovery prompt be surfaced?
pub fn detect_context_loss(snapshot: &ActivitySnapshot, sensitivity: u8) -> ContextLossDetection {
    let factors = evaluate_factors(snapshot, sensitivity, FactorProfile::Detection);
    let probability = combined_probability(&factors);
    let detected = probability >= DETECTION_THRESHOLD;
    ContextLossDetection {
        detected,
        probability: round_2dp(probability),
        confidence: Confidence::from_probability(probability),
        factors,
        recommendation: if detected {
            "Consider showing context recovery prompt".to_string()
        } else {
            "No action needed".to_string()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn names(triggers: &[Trigger]) -> Vec<&str> {
        triggers.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn test_tab_switching_at_full_sensitivity() {
        let snap = ActivitySnapshot {
            recent_tab_switches: 8,
            ..Default::default()
        };
        let p = predict_distraction(&snap, 10);
        assert!((0.14..=0.16).contains(&p.probability), "{}", p.probability);
        assert_eq!(names(&p.triggers), vec!["Rapid tab switching"]);
        assert_eq!(p.risk_level, RiskLevel::Low);
        assert_eq!(p.recommendation, "Focus looks good. Keep up the momentum!");
    }

    #[test]
    fn test_quiet_snapshot_scores_zero() {
        let p = predict_distraction(&ActivitySnapshot::default(), 5);
        assert_eq!(p.probability, 0.0);
        assert!(p.triggers.is_empty());
        let d = detect_context_loss(&ActivitySnapshot::default(), 5);
        assert!(!d.detected);
        assert_eq!(d.confidence, Confidence::Low);
        assert_eq!(d.recommendation, "No action needed");
    }

    #[test]
    fn test_sensitivity_scales_linearly() {
        let snap = ActivitySnapshot {
            recent_tab_switches: 11,
            ..Default::default()
        };
        let full = evaluate_factors(&snap, 10, FactorProfile::Prediction);
        let half = evaluate_factors(&snap, 5, FactorProfile::Prediction);
        assert_relative_eq!(full[0].impact, 0.30, epsilon = 1e-9);
        assert_relative_eq!(half[0].impact, 0.15, epsilon = 1e-9);
        // zero means unset, and values above 10 are clamped
        assert_relative_eq!(sensitivity_scale(0), 0.5);
        assert_relative_eq!(sensitivity_scale(99), 1.0);
    }

    #[test]
    fn test_idle_profiles_differ_only_in_weighting() {
        let snap = ActivitySnapshot {
            idle_duration_ms: 3 * 60_000,
            ..Default::default()
        };
        let pred = evaluate_factors(&snap, 10, FactorProfile::Prediction);
        let det = evaluate_factors(&snap, 10, FactorProfile::Detection);
        assert_relative_eq!(pred[0].impact, 0.24, epsilon = 1e-9);
        assert_relative_eq!(det[0].impact, 0.30, epsilon = 1e-9);

        let long_idle = ActivitySnapshot {
            idle_duration_ms: 60 * 60_000,
            ..Default::default()
        };
        let pred = evaluate_factors(&long_idle, 10, FactorProfile::Prediction);
        let det = evaluate_factors(&long_idle, 10, FactorProfile::Detection);
        assert_relative_eq!(pred[0].impact, 0.30, epsilon = 1e-9);
        assert_relative_eq!(det[0].impact, 0.40, epsilon = 1e-9);
    }

    #[test]
    fn test_idle_under_two_minutes_ignored() {
        let snap = ActivitySnapshot {
            idle_duration_ms: 2 * 60_000,
            ..Default::default()
        };
        assert!(evaluate_factors(&snap, 10, FactorProfile::Prediction).is_empty());
    }

    #[test]
    fn test_backward_scrolls_need_three() {
        let two = ActivitySnapshot {
            scroll_positions: vec![300, 200, 400, 100],
            ..Default::default()
        };
        assert_eq!(two.backward_scrolls(), 2);
        assert!(evaluate_factors(&two, 10, FactorProfile::Prediction).is_empty());

        let three = ActivitySnapshot {
            scroll_positions: vec![900, 600, 300, 100],
            ..Default::default()
        };
        let fired = evaluate_factors(&three, 10, FactorProfile::Prediction);
        assert_eq!(names(&fired), vec!["Re-reading behavior"]);
        assert_relative_eq!(fired[0].impact, 0.15, epsilon = 1e-9);
    }

    #[test]
    fn test_afternoon_dip_window() {
        for (hour, fires) in [(13, false), (14, true), (16, true), (17, false)] {
            let snap = ActivitySnapshot {
                local_hour: Some(hour),
                ..Default::default()
            };
            let fired = evaluate_factors(&snap, 10, FactorProfile::Prediction);
            assert_eq!(!fired.is_empty(), fires, "hour {hour}");
        }
    }

    #[test]
    fn test_hesitation_capped() {
        let snap = ActivitySnapshot {
            time_since_last_interaction_ms: 40_000,
            ..Default::default()
        };
        let fired = evaluate_factors(&snap, 10, FactorProfile::Detection);
        assert_relative_eq!(fired[0].impact, 0.05, epsilon = 1e-9);

        let snap = ActivitySnapshot {
            time_since_last_interaction_ms: 600_000,
            ..Default::default()
        };
        let fired = evaluate_factors(&snap, 10, FactorProfile::Detection);
        assert_relative_eq!(fired[0].impact, 0.20, epsilon = 1e-9);
    }

    #[test]
    fn test_trigger_order_is_stable() {
        let snap = ActivitySnapshot {
            recent_tab_switches: 9,
            idle_duration_ms: 5 * 60_000,
            unique_domains: 8,
            domain_changed: true,
            scroll_positions: vec![5, 4, 3, 2, 1],
            reread_count: 4,
            session_duration_ms: LONG_SESSION_MS + 1,
            time_since_last_interaction_ms: 60_000,
            local_hour: Some(15),
        };
        let fired = evaluate_factors(&snap, 10, FactorProfile::Prediction);
        assert_eq!(
            names(&fired),
            vec![
                "Rapid tab switching",
                "Extended idle time",
                "Many different sites",
                "Domain switch",
                "Re-reading behavior",
                "Afternoon productivity dip",
                "Long session without break",
                "Confusion detected",
                "Hesitation detected",
            ]
        );
        let p = predict_distraction(&snap, 10);
        assert_eq!(p.probability, 1.0);
        assert_eq!(p.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_detection_threshold() {
        // idle 0.40 + domain switch 0.20 at full sensitivity
        let snap = ActivitySnapshot {
            idle_duration_ms: 10 * 60_000,
            domain_changed: true,
            ..Default::default()
        };
        let d = detect_context_loss(&snap, 10);
        assert!(d.detected);
        assert_relative_eq!(d.probability, 0.6, epsilon = 1e-9);
        assert_eq!(d.confidence, Confidence::Medium);

        let d = detect_context_loss(&snap, 5);
        assert!(!d.detected);
    }

    #[test]
    fn test_medium_band() {
        let snap = ActivitySnapshot {
            recent_tab_switches: 20,
            domain_changed: true,
            ..Default::default()
        };
        let p = predict_distraction(&snap, 10);
        assert_eq!(p.risk_level, RiskLevel::Medium);
        assert_eq!(p.recommendation, "Moderate distraction risk. Stay aware of your focus.");
    }

    proptest! {
        #[test]
        fn prop_probability_bounded(
            switches in 0usize..200,
            idle in 0u64..10_000_000,
            domains in 0usize..100,
            changed in any::<bool>(),
            scrolls in proptest::collection::vec(-1000i64..1000, 0..30),
            rereads in 0u32..50,
            session in 0u64..50_000_000,
            hesitation in 0u64..5_000_000,
            hour in proptest::option::of(0u32..24),
            sensitivity in any::<u8>(),
        ) {
            let snap = ActivitySnapshot {
                recent_tab_switches: switches,
                idle_duration_ms: idle,
                unique_domains: domains,
                domain_changed: changed,
                scroll_positions: scrolls,
                reread_count: rereads,
                session_duration_ms: session,
                time_since_last_interaction_ms: hesitation,
                local_hour: hour,
            };
            let p = predict_distraction(&snap, sensitivity);
            prop_assert!((0.0..=1.0).contains(&p.probability));
            let d = detect_context_loss(&snap, sensitivity);
            prop_assert!((0.0..=1.0).contains(&d.probability));
        }
    }
}
