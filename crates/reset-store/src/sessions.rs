use rusqlite::{OptionalExtension, Row, params};
use uuid::Uuid;

use reset_core::{Session, SessionStatus};

use crate::error::{Result, StoreError};
use crate::store::{Store, from_json, parse_uuid, to_json};

const SESSION_COLUMNS: &str = "id, user_id, status, start_time, end_time, interruptions, context_loss_events, time_recovered";

/// Counters that events increment on an active Session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionCounter {
    Interruptions,
    ContextLossEvents,
    TimeRecovered,
}

impl SessionCounter {
    fn column(self) -> &'static str {
        match self {
            SessionCounter::Interruptions => "interruptions",
            SessionCounter::ContextLossEvents => "context_loss_events",
            SessionCounter::TimeRecovered => "time_recovered",
        }
    }
}

impl Store {
    pub fn start_session(&self, user_id: &str, now: i64) -> Result<Session> {
        if user_id.trim().is_empty() {
            return Err(StoreError::InvalidInput("userId is required".into()));
        }
        let session = Session::start(user_id, now);
        self.conn().execute(
            &format!("INSERT INTO sessions ({SESSION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, NULL, 0, 0, 0)"),
            params![
                session.id.to_string(),
                session.user_id,
                session.status.as_str(),
                session.start_time
            ],
        )?;
        tracing::info!(id = %session.id, user = %user_id, "session started");
        Ok(session)
    }

    /// Complete a Session and append its immutable snapshot to the owner's history.
    pub fn end_session(&self, id: Uuid, now: i64) -> Result<Session> {
        let tx = self.begin_immediate()?;
        let mut session = load_session(&tx, id)?;
        session.status = session.status.complete().ok_or_else(|| {
            StoreError::InvalidTransition(format!("session {id} already completed"))
        })?;
        session.end_time = Some(now.max(session.start_time));

        tx.execute(
            "UPDATE sessions SET status = ?1, end_time = ?2 WHERE id = ?3",
            params![session.status.as_str(), session.end_time, id.to_string()],
        )?;
        tx.execute(
            "INSERT INTO session_history (session_id, user_id, snapshot, archived_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![id.to_string(), session.user_id, to_json(&session)?, now],
        )?;
        tx.commit()?;
        tracing::info!(%id, user = %session.user_id, "session completed");
        Ok(session)
    }

    /// Increment one counter on an active Session.
    pub fn bump_session_counter(
        &self,
        id: Uuid,
        counter: SessionCounter,
        amount: u64,
    ) -> Result<()> {
        let column = counter.column();
        let rows = self.conn().execute(
            &format!(
                "UPDATE sessions SET {column} = {column} + ?1 WHERE id = ?2 AND status = 'active'"
            ),
            params![amount, id.to_string()],
        )?;
        if rows == 0 {
            // Distinguish a missing session from a completed one.
            let session = self.get_session(id)?;
            return Err(StoreError::InvalidTransition(format!(
                "session {id} is {}",
                session.status.as_str()
            )));
        }
        Ok(())
    }

    pub fn get_session(&self, id: Uuid) -> Result<Session> {
        load_session(self.conn(), id)
    }

    /// Most recently started Sessions for a user.
    pub fn recent_sessions(&self, user_id: &str, limit: usize) -> Result<Vec<Session>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions
             WHERE user_id = ?1 ORDER BY start_time DESC LIMIT ?2"
        ))?;
        let rows: Vec<SessionRow> = stmt
            .query_map(params![user_id, limit as i64], SessionRow::read)?
            .collect::<std::result::Result<_, _>>()?;
        rows.into_iter().map(SessionRow::into_session).collect()
    }

    /// Completed-session snapshots, newest first.
    pub fn session_history(&self, user_id: &str) -> Result<Vec<Session>> {
        let mut stmt = self.conn().prepare(
            "SELECT snapshot FROM session_history WHERE user_id = ?1 ORDER BY archived_at DESC, id DESC",
        )?;
        stmt.query_map([user_id], |row| row.get::<_, String>(0))?
            .map(|r| from_json(&r?, "snapshot"))
            .collect()
    }
}

fn load_session(conn: &rusqlite::Connection, id: Uuid) -> Result<Session> {
    conn.query_row(
        &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
        [id.to_string()],
        SessionRow::read,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(format!("session {id}")))?
    .into_session()
}

struct SessionRow {
    id: String,
    user_id: String,
    status: String,
    start_time: i64,
    end_time: Option<i64>,
    interruptions: i64,
    context_loss_events: i64,
    time_recovered: i64,
}

impl SessionRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            status: row.get(2)?,
            start_time: row.get(3)?,
            end_time: row.get(4)?,
            interruptions: row.get(5)?,
            context_loss_events: row.get(6)?,
            time_recovered: row.get(7)?,
        })
    }

    fn into_session(self) -> Result<Session> {
        let status = SessionStatus::parse(&self.status).ok_or_else(|| {
            StoreError::InvalidData(format!("unknown session status '{}'", self.status))
        })?;
        Ok(Session {
            id: parse_uuid(&self.id)?,
            user_id: self.user_id,
            status,
            start_time: self.start_time,
            end_time: self.end_time,
            interruptions: self.interruptions.clamp(0, i64::from(u32::MAX)) as u32,
            context_loss_events: self.context_loss_events.clamp(0, i64::from(u32::MAX)) as u32,
            time_recovered: self.time_recovered.max(0) as u64,
        })
    }
}
