use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 1;

pub fn initialize(conn: &Connection) -> Result<()> {
    // Set before switching to WAL: concurrent openers may contend on the switch.
    conn.pragma_update(None, "busy_timeout", 5000)?;
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.pragma_update(None, "wal_autocheckpoint", 100)?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS contexts (
            id              TEXT PRIMARY KEY,
            user_id         TEXT NOT NULL,
            session_id      TEXT,
            activity_type   TEXT NOT NULL DEFAULT 'tab',
            raw_url         TEXT NOT NULL DEFAULT '',
            normalized_url  TEXT NOT NULL DEFAULT '',
            title           TEXT NOT NULL DEFAULT '',
            scroll_position INTEGER NOT NULL DEFAULT 0,
            selected_text   TEXT NOT NULL DEFAULT '',
            page_metadata   TEXT NOT NULL DEFAULT '{}',
            summary         TEXT NOT NULL DEFAULT '',
            key_points      TEXT NOT NULL DEFAULT '[]',
            next_steps      TEXT NOT NULL DEFAULT '[]',
            status          TEXT NOT NULL DEFAULT 'active',
            enriched        INTEGER NOT NULL DEFAULT 0,
            visit_count     INTEGER NOT NULL DEFAULT 1,
            total_duration  INTEGER NOT NULL DEFAULT 0,
            captured_at     INTEGER NOT NULL,
            last_visited    INTEGER NOT NULL,
            recovered_at    INTEGER,
            archived_at     INTEGER
        );

        CREATE TABLE IF NOT EXISTS sessions (
            id                  TEXT PRIMARY KEY,
            user_id             TEXT NOT NULL,
            status              TEXT NOT NULL DEFAULT 'active',
            start_time          INTEGER NOT NULL,
            end_time            INTEGER,
            interruptions       INTEGER NOT NULL DEFAULT 0,
            context_loss_events INTEGER NOT NULL DEFAULT 0,
            time_recovered      INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS session_history (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id  TEXT NOT NULL REFERENCES sessions(id),
            user_id     TEXT NOT NULL,
            snapshot    TEXT NOT NULL,
            archived_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS users (
            user_id         TEXT PRIMARY KEY,
            total_recoveries INTEGER NOT NULL DEFAULT 0,
            last_recovery   INTEGER,
            focus_score     INTEGER
        );

        -- At most one non-archived Context per (user, resource).
        CREATE UNIQUE INDEX IF NOT EXISTS idx_ctx_live_key
            ON contexts(user_id, normalized_url)
            WHERE status != 'archived' AND normalized_url != '';

        CREATE INDEX IF NOT EXISTS idx_ctx_user_visited ON contexts(user_id, last_visited);
        CREATE INDEX IF NOT EXISTS idx_ctx_user_captured ON contexts(user_id, captured_at);
        CREATE INDEX IF NOT EXISTS idx_ctx_enriched ON contexts(enriched);
        CREATE INDEX IF NOT EXISTS idx_sess_user_start ON sessions(user_id, start_time);
        CREATE INDEX IF NOT EXISTS idx_hist_user ON session_history(user_id);
        ",
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let mut stmt = conn.prepare("SELECT value FROM metadata WHERE key = 'schema_version'")?;
    let version = stmt
        .query_row([], |row| {
            let v: String = row.get(0)?;
            Ok(v.parse::<i64>().unwrap_or(0))
        })
        .ok();
    Ok(version)
}
