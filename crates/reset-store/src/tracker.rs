use std::fs;
use std::path::Path;

use uuid::Uuid;

use reset_core::constants::{SESSION_STATS_WINDOW, STREAK_WINDOW_DAYS};
use reset_core::recovery::RecoverySummary;
use reset_core::time::{day_bounds, days_before, local_day, local_hour, now_millis};
use reset_core::{
    ActivitySample, ActivitySnapshot, CaptureOutcome, CognitiveResume, Context,
    ContextLossDetection, DayActivity, DistractionPrediction, FlowScore, Session, SessionStats,
    deep_cognitive_resume, detect_context_loss, focus_streak, generate_recovery,
    predict_distraction, score_day,
};

use crate::config::{Config, resolve_base_dir};
use crate::error::{Result, StoreError};
use crate::sessions::SessionCounter;
use crate::store::Store;
use crate::users::UserStats;

/// Operation-level facade over a [`Store`]: validation, best-effort
/// enrichment, scoring and prediction wired to the configured defaults.
///
/// Holds no state between calls beyond the database handle; every decision
/// reads the store at call time.
pub struct Tracker {
    store: Store,
    config: Config,
}

impl Tracker {
    /// Open the tracker under `base_dir` (or `$RESET_DATA_DIR`, or `~/.reset-ai`),
    /// creating the directory as needed.
    pub fn open(base_dir: Option<&Path>) -> Result<Self> {
        let base = resolve_base_dir(base_dir);
        fs::create_dir_all(&base).map_err(|e| {
            StoreError::Config(format!("failed to create {}: {e}", base.display()))
        })?;
        let config = Config::load(&base)?;
        let store = Store::open(&config.database_path(&base))?;
        Ok(Self { store, config })
    }

    /// In-memory store with default config (for testing).
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::with_config(Store::open_in_memory()?, Config::default()))
    }

    pub fn with_config(store: Store, config: Config) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // --- Contexts ---

    /// Deduplicating capture. A newly created Context is enriched right after
    /// the primary write commits; enrichment failure leaves it queued for
    /// [`Tracker::enrich_pending`] and never fails the capture.
    pub fn capture_activity(
        &self,
        user_id: &str,
        session_id: Option<&str>,
        sample: &ActivitySample,
    ) -> Result<CaptureOutcome> {
        let outcome = self
            .store
            .capture(user_id, session_id, sample, now_millis())?;
        if !outcome.was_update
            && let Err(e) = self.enrich(outcome.context_id)
        {
            tracing::warn!(id = %outcome.context_id, "enrichment deferred: {e}");
        }
        Ok(outcome)
    }

    /// Generate and store the recovery summary for one Context. A Context
    /// whose stored fields cannot be decoded gets the minimal summary.
    pub fn enrich(&self, id: Uuid) -> Result<()> {
        let recovery = match self.store.get_context(id) {
            Ok(ctx) => generate_recovery(&ctx),
            Err(StoreError::InvalidData(msg)) => {
                tracing::warn!(%id, "falling back to minimal summary: {msg}");
                let title = self.store.context_title(id)?;
                RecoverySummary::minimal(title.as_deref())
            }
            Err(e) => return Err(e),
        };
        self.store.set_recovery_summary(id, &recovery)
    }

    /// Retry enrichment for up to `limit` queued Contexts. Returns how many succeeded.
    pub fn enrich_pending(&self, limit: usize) -> Result<usize> {
        let mut enriched = 0;
        for id in self.store.pending_enrichment(limit)? {
            match self.enrich(id) {
                Ok(()) => enriched += 1,
                Err(e) => tracing::warn!(%id, "enrichment failed: {e}"),
            }
        }
        Ok(enriched)
    }

    pub fn update_activity(
        &self,
        user_id: &str,
        normalized_url: &str,
        scroll_position: Option<u64>,
    ) -> Result<Uuid> {
        self.store
            .update_activity(user_id, normalized_url, scroll_position, now_millis())
    }

    /// Accumulate dwell time. Samples under the configured minimum are ignored.
    pub fn record_duration(&self, user_id: &str, url: &str, duration_ms: u64) -> Result<bool> {
        self.store
            .record_duration(user_id, url, duration_ms, self.config.min_duration_ms)
    }

    pub fn get_context(&self, id: Uuid) -> Result<Context> {
        self.store.get_context(id)
    }

    pub fn list_active_contexts(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<Context>> {
        require_user(user_id)?;
        self.store
            .list_active(user_id, limit.unwrap_or(self.config.list_limit))
    }

    pub fn list_contexts(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<Context>> {
        require_user(user_id)?;
        self.store
            .list_all(user_id, limit.unwrap_or(self.config.list_limit))
    }

    pub fn mark_recovered(&self, id: Uuid, user_id: Option<&str>) -> Result<bool> {
        self.store.mark_recovered(id, user_id, now_millis())
    }

    pub fn archive_context(&self, id: Uuid) -> Result<()> {
        self.store.archive(id, now_millis())
    }

    // --- Sessions ---

    pub fn start_session(&self, user_id: &str) -> Result<Session> {
        self.store.start_session(user_id, now_millis())
    }

    pub fn end_session(&self, id: Uuid) -> Result<Session> {
        self.store.end_session(id, now_millis())
    }

    pub fn record_interruption(&self, id: Uuid) -> Result<()> {
        self.store
            .bump_session_counter(id, SessionCounter::Interruptions, 1)
    }

    pub fn record_context_loss(&self, id: Uuid) -> Result<()> {
        self.store
            .bump_session_counter(id, SessionCounter::ContextLossEvents, 1)
    }

    pub fn record_time_recovered(&self, id: Uuid, seconds: u64) -> Result<()> {
        self.store
            .bump_session_counter(id, SessionCounter::TimeRecovered, seconds)
    }

    pub fn session_stats(&self, user_id: &str) -> Result<SessionStats> {
        require_user(user_id)?;
        let sessions = self.store.recent_sessions(user_id, SESSION_STATS_WINDOW)?;
        Ok(SessionStats::from_sessions(sessions))
    }

    pub fn user_stats(&self, user_id: &str) -> Result<UserStats> {
        require_user(user_id)?;
        self.store.user_stats(user_id)
    }

    // --- Scoring ---

    /// Score today's Contexts, attach the streak, and persist the score on
    /// the user's aggregate.
    pub fn neuro_flow_score(&self, user_id: &str) -> Result<FlowScore> {
        require_user(user_id)?;
        let today = local_day(now_millis());
        let (start, end) = day_bounds(today);
        let contexts = self.store.contexts_captured_between(user_id, start, end)?;

        let streak = if contexts.is_empty() {
            0
        } else {
            self.focus_streak(user_id, today)
        };
        let score = score_day(&contexts, streak);
        self.store.set_focus_score(user_id, score.score)?;
        tracing::debug!(user = %user_id, score = score.score, streak, "neuro-flow scored");
        Ok(score)
    }

    /// Walk back from `today` until a day fails or has no activity. A store
    /// failure degrades the streak to zero instead of failing the score.
    fn focus_streak(&self, user_id: &str, today: chrono::NaiveDate) -> u32 {
        let mut days: Vec<DayActivity> = Vec::new();
        for offset in 0..STREAK_WINDOW_DAYS {
            let (start, end) = day_bounds(days_before(today, offset));
            let day = match self.store.day_activity(user_id, start, end) {
                Ok(day) => day,
                Err(e) => {
                    tracing::warn!(user = %user_id, "streak unavailable: {e}");
                    return 0;
                }
            };
            let qualifies = day.qualifies_for_streak();
            days.push(day);
            if !qualifies {
                break;
            }
        }
        focus_streak(&days)
    }

    pub fn deep_cognitive_resume(&self, user_id: &str, absence_ms: u64) -> Result<CognitiveResume> {
        require_user(user_id)?;
        let contexts = self.store.list_active(user_id, self.config.resume_limit)?;
        Ok(deep_cognitive_resume(&contexts, absence_ms))
    }

    // --- Prediction ---

    pub fn predict_distraction(
        &self,
        snapshot: &ActivitySnapshot,
        sensitivity: Option<u8>,
    ) -> DistractionPrediction {
        predict_distraction(
            &self.with_clock(snapshot),
            sensitivity.unwrap_or(self.config.sensitivity),
        )
    }

    pub fn detect_context_loss(
        &self,
        snapshot: &ActivitySnapshot,
        sensitivity: Option<u8>,
    ) -> ContextLossDetection {
        detect_context_loss(
            &self.with_clock(snapshot),
            sensitivity.unwrap_or(self.config.sensitivity),
        )
    }

    /// Fill in the local hour when the caller left it out.
    fn with_clock(&self, snapshot: &ActivitySnapshot) -> ActivitySnapshot {
        let mut snapshot = snapshot.clone();
        snapshot
            .local_hour
            .get_or_insert_with(|| local_hour(now_millis()));
        snapshot
    }
}

fn require_user(user_id: &str) -> Result<()> {
    if user_id.trim().is_empty() {
        return Err(StoreError::InvalidInput("userId is required".into()));
    }
    Ok(())
}
