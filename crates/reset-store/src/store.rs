use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row, Transaction, TransactionBehavior, params};
use uuid::Uuid;

use reset_core::{
    ActivitySample, ActivityType, CaptureOutcome, Context, ContextStatus, DayActivity,
    PageMetadata, is_trackable, normalize_url,
};
use reset_core::recovery::RecoverySummary;

use crate::error::{Result, StoreError};
use crate::schema;

const CONTEXT_COLUMNS: &str = "id, user_id, session_id, activity_type, raw_url, normalized_url, title,
     scroll_position, selected_text, page_metadata, summary, key_points, next_steps,
     status, enriched, visit_count, total_duration, captured_at, last_visited";

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin a write transaction that takes the database write lock up front,
    /// so a lookup and the write that depends on it cannot interleave with
    /// another writer.
    pub(crate) fn begin_immediate(&self) -> Result<Transaction<'_>> {
        Ok(Transaction::new_unchecked(
            &self.conn,
            TransactionBehavior::Immediate,
        )?)
    }

    // --- Capture ---

    /// Create-or-update the live Context for the sample's resource.
    ///
    /// The lookup and the write share one IMMEDIATE transaction, so concurrent
    /// captures of a brand-new resource serialize: the first creates it and
    /// every later one sees it and bumps `visit_count`.
    pub fn capture(
        &self,
        user_id: &str,
        session_id: Option<&str>,
        sample: &ActivitySample,
        now: i64,
    ) -> Result<CaptureOutcome> {
        if user_id.trim().is_empty() {
            return Err(StoreError::InvalidInput("userId is required".into()));
        }
        if !is_trackable(&sample.url) {
            return Err(StoreError::InvalidInput(format!(
                "untracked url: {}",
                sample.url
            )));
        }

        let key = sample.normalized_url();
        let tx = self.begin_immediate()?;

        if !key.is_empty()
            && let Some((id, status)) = find_live(&tx, user_id, &key)?
        {
            let next = status.revisit().ok_or_else(|| {
                StoreError::InvalidData(format!("live context {id} is archived"))
            })?;
            // Scroll and selection describe this visit only; omitted values reset them.
            tx.execute(
                "UPDATE contexts SET
                    visit_count = visit_count + 1,
                    last_visited = ?1,
                    scroll_position = ?2,
                    selected_text = ?3,
                    status = ?4
                 WHERE id = ?5",
                params![
                    now,
                    sample.scroll_position.unwrap_or(0),
                    sample.clipped_selection(),
                    next.as_str(),
                    id.to_string()
                ],
            )?;
            tx.commit()?;
            tracing::debug!(%id, url = %key, "revisit merged into live context");
            return Ok(CaptureOutcome {
                context_id: id,
                was_update: true,
            });
        }

        let ctx = Context::from_sample(user_id, session_id, sample, now);
        insert_context(&tx, &ctx)?;
        tx.commit()?;
        tracing::info!(id = %ctx.id, url = %ctx.normalized_url, "context created");
        Ok(CaptureOutcome {
            context_id: ctx.id,
            was_update: false,
        })
    }

    /// Touch the live Context for `normalized_url`: bump the visit and,
    /// when given, the scroll offset. Recovery status is left alone.
    pub fn update_activity(
        &self,
        user_id: &str,
        normalized_url: &str,
        scroll_position: Option<u64>,
        now: i64,
    ) -> Result<Uuid> {
        let key = normalize_url(normalized_url);
        if user_id.trim().is_empty() || key.is_empty() {
            return Err(StoreError::InvalidInput(
                "userId and normalizedUrl are required".into(),
            ));
        }

        let tx = self.begin_immediate()?;
        let Some((id, _)) = find_live(&tx, user_id, &key)? else {
            return Err(StoreError::NotFound(format!("no active context for {key}")));
        };
        tx.execute(
            "UPDATE contexts SET
                visit_count = visit_count + 1,
                last_visited = ?1,
                scroll_position = COALESCE(?2, scroll_position)
             WHERE id = ?3",
            params![now, scroll_position, id.to_string()],
        )?;
        tx.commit()?;
        tracing::debug!(%id, url = %key, "activity updated");
        Ok(id)
    }

    /// Add a dwell sample to the live Context for `url`. Returns `false` when
    /// the sample is shorter than `min_duration_ms` and was ignored.
    pub fn record_duration(
        &self,
        user_id: &str,
        url: &str,
        duration_ms: u64,
        min_duration_ms: u64,
    ) -> Result<bool> {
        let key = normalize_url(url);
        if user_id.trim().is_empty() || key.is_empty() {
            return Err(StoreError::InvalidInput("userId and url are required".into()));
        }
        if duration_ms < min_duration_ms {
            return Ok(false);
        }

        let rows = self.conn.execute(
            "UPDATE contexts SET total_duration = total_duration + ?1
             WHERE user_id = ?2 AND normalized_url = ?3 AND status != 'archived'",
            params![duration_ms, user_id, key],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("no active context for {key}")));
        }
        Ok(true)
    }

    // --- Reads ---

    pub fn get_context(&self, id: Uuid) -> Result<Context> {
        let sql = format!("SELECT {CONTEXT_COLUMNS} FROM contexts WHERE id = ?1");
        self.conn
            .query_row(&sql, [id.to_string()], ContextRow::read)
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("context {id}")))?
            .into_context()
    }

    /// Title of a Context without decoding the rest of the row.
    pub fn context_title(&self, id: Uuid) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT title FROM contexts WHERE id = ?1",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Non-archived Contexts, most recently visited first.
    pub fn list_active(&self, user_id: &str, limit: usize) -> Result<Vec<Context>> {
        self.query_contexts(
            &format!(
                "SELECT {CONTEXT_COLUMNS} FROM contexts
                 WHERE user_id = ?1 AND status != 'archived'
                 ORDER BY last_visited DESC LIMIT ?2"
            ),
            params![user_id, limit as i64],
        )
    }

    /// Every Context including archived ones, newest capture first.
    pub fn list_all(&self, user_id: &str, limit: usize) -> Result<Vec<Context>> {
        self.query_contexts(
            &format!(
                "SELECT {CONTEXT_COLUMNS} FROM contexts
                 WHERE user_id = ?1
                 ORDER BY captured_at DESC LIMIT ?2"
            ),
            params![user_id, limit as i64],
        )
    }

    /// Contexts captured inside the inclusive `[start, end]` window.
    pub fn contexts_captured_between(
        &self,
        user_id: &str,
        start: i64,
        end: i64,
    ) -> Result<Vec<Context>> {
        self.query_contexts(
            &format!(
                "SELECT {CONTEXT_COLUMNS} FROM contexts
                 WHERE user_id = ?1 AND captured_at BETWEEN ?2 AND ?3
                 ORDER BY captured_at"
            ),
            params![user_id, start, end],
        )
    }

    /// Switch and distinct-resource counts for a window, computed in SQL.
    pub fn day_activity(&self, user_id: &str, start: i64, end: i64) -> Result<DayActivity> {
        let (switches, unique): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*),
                    COUNT(DISTINCT CASE WHEN normalized_url != '' THEN normalized_url ELSE raw_url END)
             FROM contexts WHERE user_id = ?1 AND captured_at BETWEEN ?2 AND ?3",
            params![user_id, start, end],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(DayActivity {
            switch_count: switches.max(0) as usize,
            unique_urls: unique.max(0) as usize,
        })
    }

    fn query_contexts(&self, sql: &str, args: impl rusqlite::Params) -> Result<Vec<Context>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows: Vec<ContextRow> = stmt
            .query_map(args, ContextRow::read)?
            .collect::<std::result::Result<_, _>>()?;
        rows.into_iter().map(ContextRow::into_context).collect()
    }

    // --- Enrichment ---

    /// Write the derived summary fields and mark the Context enriched.
    pub fn set_recovery_summary(&self, id: Uuid, recovery: &RecoverySummary) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE contexts SET summary = ?1, key_points = ?2, next_steps = ?3, enriched = 1
             WHERE id = ?4",
            params![
                recovery.summary,
                to_json(&recovery.key_points)?,
                to_json(&recovery.next_steps)?,
                id.to_string()
            ],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("context {id}")));
        }
        Ok(())
    }

    /// Ids of Contexts still waiting for their summary, oldest first.
    pub fn pending_enrichment(&self, limit: usize) -> Result<Vec<Uuid>> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM contexts WHERE enriched = 0 ORDER BY captured_at LIMIT ?1",
        )?;
        stmt.query_map([limit as i64], |row| row.get::<_, String>(0))?
            .map(|r| parse_uuid(&r?))
            .collect()
    }

    // --- Lifecycle ---

    /// Mark a Context recovered. Returns `true` when this call made the
    /// transition; the owner's recovery stats are bumped in the same
    /// transaction. Recovering an already-recovered Context is a no-op.
    pub fn mark_recovered(&self, id: Uuid, user_id: Option<&str>, now: i64) -> Result<bool> {
        let tx = self.begin_immediate()?;
        let (owner, status) = load_status(&tx, id)?;
        if let Some(expected) = user_id
            && expected != owner
        {
            return Err(StoreError::NotFound(format!("context {id}")));
        }

        let next = status.recover().ok_or_else(|| {
            StoreError::InvalidTransition(format!("context {id} is {status}"))
        })?;
        if next == status {
            return Ok(false);
        }

        tx.execute(
            "UPDATE contexts SET status = ?1, recovered_at = ?2 WHERE id = ?3",
            params![next.as_str(), now, id.to_string()],
        )?;
        tx.execute(
            "INSERT INTO users (user_id, total_recoveries, last_recovery) VALUES (?1, 1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET
                total_recoveries = total_recoveries + 1,
                last_recovery = excluded.last_recovery",
            params![owner, now],
        )?;
        tx.commit()?;
        tracing::info!(%id, user = %owner, "context recovered");
        Ok(true)
    }

    /// Archive a Context. One-way: archiving twice is an invalid transition.
    pub fn archive(&self, id: Uuid, now: i64) -> Result<()> {
        let tx = self.begin_immediate()?;
        let (_, status) = load_status(&tx, id)?;
        let next = status.archive().ok_or_else(|| {
            StoreError::InvalidTransition(format!("context {id} is already archived"))
        })?;
        tx.execute(
            "UPDATE contexts SET status = ?1, archived_at = ?2 WHERE id = ?3",
            params![next.as_str(), now, id.to_string()],
        )?;
        tx.commit()?;
        tracing::info!(%id, "context archived");
        Ok(())
    }
}

/// The live (non-archived) Context for a key, if any.
fn find_live(
    conn: &Connection,
    user_id: &str,
    key: &str,
) -> Result<Option<(Uuid, ContextStatus)>> {
    let found: Option<(String, String)> = conn
        .query_row(
            "SELECT id, status FROM contexts
             WHERE user_id = ?1 AND normalized_url = ?2 AND status != 'archived'
             LIMIT 1",
            params![user_id, key],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    found
        .map(|(id, status)| Ok((parse_uuid(&id)?, parse_status(&status)?)))
        .transpose()
}

fn load_status(conn: &Connection, id: Uuid) -> Result<(String, ContextStatus)> {
    let (owner, status): (String, String) = conn
        .query_row(
            "SELECT user_id, status FROM contexts WHERE id = ?1",
            [id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound(format!("context {id}")))?;
    Ok((owner, parse_status(&status)?))
}

fn insert_context(conn: &Connection, ctx: &Context) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO contexts ({CONTEXT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)"
        ),
        params![
            ctx.id.to_string(),
            ctx.user_id,
            ctx.session_id,
            ctx.activity_type.as_str(),
            ctx.raw_url,
            ctx.normalized_url,
            ctx.title,
            ctx.scroll_position,
            ctx.selected_text,
            to_json(&ctx.page_metadata)?,
            ctx.summary,
            to_json(&ctx.key_points)?,
            to_json(&ctx.next_steps)?,
            ctx.status.as_str(),
            ctx.enriched,
            ctx.visit_count,
            ctx.total_duration,
            ctx.captured_at,
            ctx.last_visited,
        ],
    )?;
    Ok(())
}

/// Raw column values; decoding JSON and enums happens outside the row callback
/// so failures surface as `InvalidData` rather than SQLite errors.
struct ContextRow {
    id: String,
    user_id: String,
    session_id: Option<String>,
    activity_type: String,
    raw_url: String,
    normalized_url: String,
    title: String,
    scroll_position: i64,
    selected_text: String,
    page_metadata: String,
    summary: String,
    key_points: String,
    next_steps: String,
    status: String,
    enriched: bool,
    visit_count: i64,
    total_duration: i64,
    captured_at: i64,
    last_visited: i64,
}

impl ContextRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            session_id: row.get(2)?,
            activity_type: row.get(3)?,
            raw_url: row.get(4)?,
            normalized_url: row.get(5)?,
            title: row.get(6)?,
            scroll_position: row.get(7)?,
            selected_text: row.get(8)?,
            page_metadata: row.get(9)?,
            summary: row.get(10)?,
            key_points: row.get(11)?,
            next_steps: row.get(12)?,
            status: row.get(13)?,
            enriched: row.get(14)?,
            visit_count: row.get(15)?,
            total_duration: row.get(16)?,
            captured_at: row.get(17)?,
            last_visited: row.get(18)?,
        })
    }

    fn into_context(self) -> Result<Context> {
        let page_metadata: PageMetadata = from_json(&self.page_metadata, "page_metadata")?;
        Ok(Context {
            id: parse_uuid(&self.id)?,
            user_id: self.user_id,
            session_id: self.session_id,
            activity_type: ActivityType::parse(&self.activity_type),
            raw_url: self.raw_url,
            normalized_url: self.normalized_url,
            title: self.title,
            scroll_position: self.scroll_position.max(0) as u64,
            selected_text: self.selected_text,
            page_metadata,
            summary: self.summary,
            key_points: from_json(&self.key_points, "key_points")?,
            next_steps: from_json(&self.next_steps, "next_steps")?,
            status: parse_status(&self.status)?,
            enriched: self.enriched,
            visit_count: self.visit_count.clamp(1, i64::from(u32::MAX)) as u32,
            total_duration: self.total_duration.max(0) as u64,
            captured_at: self.captured_at,
            last_visited: self.last_visited,
        })
    }
}

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| StoreError::InvalidData(format!("invalid UUID '{s}': {e}")))
}

fn parse_status(s: &str) -> Result<ContextStatus> {
    ContextStatus::parse(s)
        .ok_or_else(|| StoreError::InvalidData(format!("unknown context status '{s}'")))
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| StoreError::InvalidData(e.to_string()))
}

pub(crate) fn from_json<T: serde::de::DeserializeOwned>(raw: &str, column: &str) -> Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| StoreError::InvalidData(format!("corrupt {column}: {e}")))
}
