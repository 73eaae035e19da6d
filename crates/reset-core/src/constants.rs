/// Maximum characters of selected text kept on a Context.
pub const SELECTED_TEXT_LIMIT: usize = 500;

/// Characters of selected text quoted back as a recovery key point.
pub const EXCERPT_LIMIT: usize = 100;

/// Title stored when a capture arrives without one.
pub const UNTITLED: &str = "Untitled";

/// Predictor sensitivity used when the caller gives none (scale 1..=10).
pub const DEFAULT_SENSITIVITY: u8 = 5;

/// Upper bound of the sensitivity scale.
pub const MAX_SENSITIVITY: u8 = 10;

/// Probability at or above which context loss counts as detected.
pub const DETECTION_THRESHOLD: f64 = 0.5;

/// Risk band boundaries for the continuous prediction (strictly greater than).
pub const HIGH_RISK: f64 = 0.7;
pub const MEDIUM_RISK: f64 = 0.4;

// --- Factor thresholds ---

pub const TAB_SWITCH_FREE: usize = 5;
pub const TAB_SWITCH_WEIGHT: f64 = 0.05;
pub const TAB_SWITCH_CAP: f64 = 0.30;

pub const IDLE_FREE_MINUTES: f64 = 2.0;

pub const DOMAIN_FREE: usize = 5;
pub const DOMAIN_WEIGHT: f64 = 0.04;
pub const DOMAIN_CAP: f64 = 0.20;

pub const DOMAIN_CHANGE_IMPACT: f64 = 0.20;

/// Backward scroll steps needed before re-reading fires (more than this).
pub const BACK_SCROLL_FREE: usize = 2;
pub const BACK_SCROLL_WEIGHT: f64 = 0.05;
pub const BACK_SCROLL_CAP: f64 = 0.25;

/// Local hours (inclusive) of the afternoon dip.
pub const DIP_START_HOUR: u32 = 14;
pub const DIP_END_HOUR: u32 = 16;
pub const DIP_IMPACT: f64 = 0.10;

/// Two hours.
pub const LONG_SESSION_MS: u64 = 7_200_000;
pub const LONG_SESSION_IMPACT: f64 = 0.15;

pub const REREAD_FREE: u32 = 3;
pub const REREAD_IMPACT: f64 = 0.10;

pub const HESITATION_FREE_SECS: f64 = 30.0;
pub const HESITATION_WEIGHT: f64 = 0.005;
pub const HESITATION_CAP: f64 = 0.20;

// --- Neuro-Flow ---

/// Score reported for a day with no captured activity.
pub const NEUTRAL_SCORE: u32 = 75;

pub const SWITCH_ALLOWANCE: usize = 20;
pub const SWITCH_PENALTY: f64 = 1.5;
pub const URL_ALLOWANCE: usize = 10;
pub const URL_PENALTY: f64 = 2.0;
pub const RECOVERY_BONUS: f64 = 3.0;

/// Contexts per day beyond which each one counts as a distraction.
pub const DISTRACTION_ALLOWANCE: usize = 10;

/// Streak qualification limits for a single day.
pub const STREAK_MAX_SWITCHES: usize = 30;
pub const STREAK_MAX_URLS: usize = 15;

/// Days walked backward (today included) when computing the streak.
pub const STREAK_WINDOW_DAYS: u32 = 7;

// --- Sessions ---

/// Number of most recent sessions aggregated into session stats.
pub const SESSION_STATS_WINDOW: usize = 30;

/// Shortest dwell sample worth accumulating, in milliseconds.
pub const MIN_DWELL_MS: u64 = 3_000;
