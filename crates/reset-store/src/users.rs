use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::Store;

/// The per-user aggregate touched by recoveries and scoring.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub user_id: String,
    pub total_recoveries: u64,
    pub last_recovery: Option<i64>,
    pub focus_score: Option<u32>,
}

impl Store {
    /// Aggregate for `user_id`; a never-seen user reads as all zeros.
    pub fn user_stats(&self, user_id: &str) -> Result<UserStats> {
        let row: Option<(i64, Option<i64>, Option<i64>)> = self
            .conn()
            .query_row(
                "SELECT total_recoveries, last_recovery, focus_score FROM users WHERE user_id = ?1",
                [user_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        Ok(match row {
            Some((total, last, score)) => UserStats {
                user_id: user_id.to_string(),
                total_recoveries: total.max(0) as u64,
                last_recovery: last,
                focus_score: score.map(|s| s.clamp(0, 100) as u32),
            },
            None => UserStats {
                user_id: user_id.to_string(),
                ..Default::default()
            },
        })
    }

    pub fn set_focus_score(&self, user_id: &str, score: u32) -> Result<()> {
        self.conn().execute(
            "INSERT INTO users (user_id, focus_score) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET focus_score = excluded.focus_score",
            params![user_id, score],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_user_reads_zero() {
        let store = Store::open_in_memory().unwrap();
        let stats = store.user_stats("ghost").unwrap();
        assert_eq!(stats.user_id, "ghost");
        assert_eq!(stats.total_recoveries, 0);
        assert_eq!(stats.focus_score, None);
    }

    #[test]
    fn test_focus_score_upsert_keeps_recoveries() {
        let store = Store::open_in_memory().unwrap();
        let out = store
            .capture("u1", None, &reset_core::ActivitySample::new("https://a.com"), 0)
            .unwrap();
        store.mark_recovered(out.context_id, None, 9).unwrap();
        store.set_focus_score("u1", 80).unwrap();
        store.set_focus_score("u1", 64).unwrap();

        let stats = store.user_stats("u1").unwrap();
        assert_eq!(stats.total_recoveries, 1);
        assert_eq!(stats.last_recovery, Some(9));
        assert_eq!(stats.focus_score, Some(64));
    }
}
