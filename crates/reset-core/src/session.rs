use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session lifecycle: `Active ──complete──▶ Completed` (terminal).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Active,
    Completed,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "active" => Some(SessionStatus::Active),
            "completed" => Some(SessionStatus::Completed),
            _ => None,
        }
    }

    pub fn complete(self) -> Option<Self> {
        match self {
            SessionStatus::Active => Some(SessionStatus::Completed),
            SessionStatus::Completed => None,
        }
    }

    pub fn is_active(self) -> bool {
        self == SessionStatus::Active
    }
}

/// A bounded span of work with monotonically increasing counters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub user_id: String,
    pub status: SessionStatus,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub interruptions: u32,
    pub context_loss_events: u32,
    /// Seconds of work recovered through resume prompts.
    pub time_recovered: u64,
}

impl Session {
    pub fn start(user_id: &str, now: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            status: SessionStatus::Active,
            start_time: now,
            end_time: None,
            interruptions: 0,
            context_loss_events: 0,
            time_recovered: 0,
        }
    }

    /// Wall-clock length in milliseconds, once the session has ended.
    pub fn duration_ms(&self) -> Option<i64> {
        self.end_time.map(|end| (end - self.start_time).max(0))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub total_sessions: usize,
    pub total_interruptions: u64,
    pub total_time_recovered: u64,
    pub total_context_loss_events: u64,
    /// Mean length in whole minutes over sessions that have ended.
    pub average_session_duration: u64,
    pub sessions: Vec<Session>,
}

impl SessionStats {
    /// Aggregate an already-windowed list of sessions. Counters sum over all
    /// of them; the average only covers sessions with an end time.
    pub fn from_sessions(sessions: Vec<Session>) -> Self {
        let total_interruptions = sessions.iter().map(|s| u64::from(s.interruptions)).sum();
        let total_context_loss_events = sessions
            .iter()
            .map(|s| u64::from(s.context_loss_events))
            .sum();
        let total_time_recovered = sessions.iter().map(|s| s.time_recovered).sum();

        let durations: Vec<i64> = sessions.iter().filter_map(Session::duration_ms).collect();
        let average_session_duration = if durations.is_empty() {
            0
        } else {
            let mean = durations.iter().sum::<i64>() as f64 / durations.len() as f64;
            (mean / 60_000.0).round() as u64
        };

        Self {
            total_sessions: sessions.len(),
            total_interruptions,
            total_time_recovered,
            total_context_loss_events,
            average_session_duration,
            sessions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(start: i64, end: Option<i64>, interruptions: u32) -> Session {
        let mut s = Session::start("u1", start);
        s.end_time = end;
        if end.is_some() {
            s.status = SessionStatus::Completed;
        }
        s.interruptions = interruptions;
        s
    }

    #[test]
    fn test_complete_is_one_way() {
        let done = SessionStatus::Active.complete().unwrap();
        assert_eq!(done, SessionStatus::Completed);
        assert_eq!(done.complete(), None);
        assert!(!done.is_active());
    }

    #[test]
    fn test_status_tags() {
        assert_eq!(SessionStatus::parse("active"), Some(SessionStatus::Active));
        assert_eq!(SessionStatus::parse("completed"), Some(SessionStatus::Completed));
        assert_eq!(SessionStatus::parse("paused"), None);
    }

    #[test]
    fn test_empty_stats_are_zero() {
        let stats = SessionStats::from_sessions(Vec::new());
        assert_eq!(stats, SessionStats::default());
    }

    #[test]
    fn test_open_sessions_count_in_totals_not_average() {
        let stats = SessionStats::from_sessions(vec![
            session(0, Some(30 * 60_000), 2),
            session(0, Some(60 * 60_000), 1),
            session(0, None, 4),
        ]);
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.total_interruptions, 7);
        assert_eq!(stats.average_session_duration, 45);
    }

    #[test]
    fn test_average_rounds_to_minutes() {
        let stats = SessionStats::from_sessions(vec![session(0, Some(90_000), 0)]);
        // 1.5 minutes
        assert_eq!(stats.average_session_duration, 2);
    }

    #[test]
    fn test_stats_report_average_session_duration() {
        let stats = SessionStats::from_sessions(vec![session(0, Some(10 * 60_000), 0)]);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["averageSessionDuration"], 10);
        assert!(json.get("averageSessionMinutes").is_none());
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(Session::start("u1", 5)).unwrap();
        assert_eq!(json["startTime"], 5);
        assert_eq!(json["status"], "active");
        assert!(json["endTime"].is_null());
    }
}
