//! Activity deduplication keys and focus heuristics.
//!
//! Canonicalizes visited URLs into dedup keys, templates recovery summaries
//! per activity type, scores distraction risk from live activity snapshots,
//! and rolls a day's Contexts up into the Neuro-Flow score and streak.
//!
//! Zero I/O: every function takes fully materialized inputs and returns
//! synchronously. Persistence lives in `reset-store`.

pub mod constants;
pub mod context;
pub mod neuroflow;
pub mod normalize;
pub mod predict;
pub mod recovery;
pub mod resume;
pub mod session;
pub mod time;

pub use constants::{DEFAULT_SENSITIVITY, MIN_DWELL_MS, SELECTED_TEXT_LIMIT, SESSION_STATS_WINDOW};
pub use context::{
    ActivitySample, ActivityType, CaptureOutcome, Context, ContextStatus, PageMetadata,
};
pub use neuroflow::{DayActivity, FlowLevel, FlowScore, focus_streak, score_day};
pub use normalize::{detect_type, domain_of, is_trackable, normalize_url};
pub use predict::{
    ActivitySnapshot, Confidence, ContextLossDetection, DistractionPrediction, RiskLevel, Trigger,
    detect_context_loss, predict_distraction,
};
pub use recovery::{RecoverySummary, generate_recovery};
pub use resume::{CognitiveResume, ResumeInsights, WorkspaceRef, deep_cognitive_resume};
pub use session::{Session, SessionStats, SessionStatus};
