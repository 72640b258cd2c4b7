// src/modules/daily_quests/database.rs
// Database operations for the daily quests module (one document per user)

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension};

use crate::error::{QuestError, Result};
use crate::modules::wallet::database::credit_balance;
use crate::util::database::Database;
use super::{DailyQuestSet, QuestStats, UserDailyQuests};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Row as stored. The quest array stays raw until [`DailyQuestsRecord::document`] validates it.
#[derive(Debug, Clone)]
pub struct DailyQuestsRecord {
    pub owner_id: String,
    pub quest_date: String,
    pub quests_json: String,
    pub all_completed: bool,
    pub bonus_claimed: bool,
    pub stats: QuestStats,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl DailyQuestsRecord {
    pub fn current_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.quest_date, DATE_FORMAT).ok()
    }

    pub fn document(&self) -> Result<UserDailyQuests> {
        let current_date = self.current_date().ok_or_else(|| {
            QuestError::InvalidDocument(format!(
                "bad quest date {:?} for {}",
                self.quest_date, self.owner_id
            ))
        })?;

        let quests: DailyQuestSet = serde_json::from_str(&self.quests_json).map_err(|e| {
            QuestError::InvalidDocument(format!("bad quest set for {}: {e}", self.owner_id))
        })?;

        Ok(UserDailyQuests {
            owner_id: self.owner_id.clone(),
            current_date,
            quests,
            all_completed: self.all_completed,
            bonus_claimed: self.bonus_claimed,
            stats: self.stats,
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
        })
    }
}

/// Trait to add daily-quest-specific database operations to Database
pub trait DailyQuestDatabase {
    fn init_daily_quest_schema(&self) -> Result<()>;

    fn load_daily_quests(&self, owner_id: &str) -> Result<Option<DailyQuestsRecord>>;

    /// Store `daily` if its `version` still matches the stored row (version 0 means "not stored
    /// yet"), crediting `credit` Koins to the owner's wallet in the same transaction.
    ///
    /// Returns the new version, or `None` when another writer got there first.
    fn save_daily_quests(&self, daily: &UserDailyQuests, credit: u32) -> Result<Option<i64>>;

    /// Number of documents whose date is not `today`.
    fn count_stale_daily_quests(&self, today: NaiveDate) -> Result<u64>;
}

impl DailyQuestDatabase for Database {
    fn init_daily_quest_schema(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS daily_quests (
                owner_id TEXT PRIMARY KEY,
                quest_date TEXT NOT NULL,
                quests TEXT NOT NULL,
                all_completed INTEGER NOT NULL DEFAULT 0,
                bonus_claimed INTEGER NOT NULL DEFAULT 0,
                total_quests_completed INTEGER NOT NULL DEFAULT 0,
                total_koins_earned INTEGER NOT NULL DEFAULT 0,
                current_streak INTEGER NOT NULL DEFAULT 0,
                longest_streak INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                version INTEGER NOT NULL DEFAULT 1
            )",
            [],
        )?;

        // The cron probe scans by date
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_daily_quests_date
             ON daily_quests(quest_date)",
            [],
        )?;

        Ok(())
    }

    fn load_daily_quests(&self, owner_id: &str) -> Result<Option<DailyQuestsRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT owner_id, quest_date, quests, all_completed, bonus_claimed,
                    total_quests_completed, total_koins_earned, current_streak, longest_streak,
                    created_at, updated_at, version
             FROM daily_quests
             WHERE owner_id = ?1",
        )?;

        let record = stmt
            .query_row(params![owner_id], parse_daily_quests_row)
            .optional()?;

        Ok(record)
    }

    fn save_daily_quests(&self, daily: &UserDailyQuests, credit: u32) -> Result<Option<i64>> {
        let quests_json = serde_json::to_string(&daily.quests)?;
        let quest_date = daily.current_date.format(DATE_FORMAT).to_string();
        let total_koins_earned = i64::try_from(daily.stats.total_koins_earned).unwrap_or(i64::MAX);
        let next_version = daily.version + 1;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let changed = if daily.version == 0 {
            tx.execute(
                "INSERT OR IGNORE INTO daily_quests (
                    owner_id, quest_date, quests, all_completed, bonus_claimed,
                    total_quests_completed, total_koins_earned, current_streak, longest_streak,
                    created_at, updated_at, version
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    daily.owner_id,
                    quest_date,
                    quests_json,
                    daily.all_completed,
                    daily.bonus_claimed,
                    daily.stats.total_quests_completed,
                    total_koins_earned,
                    daily.stats.current_streak,
                    daily.stats.longest_streak,
                    daily.created_at.to_rfc3339(),
                    daily.updated_at.to_rfc3339(),
                    next_version,
                ],
            )?
        } else {
            tx.execute(
                "UPDATE daily_quests
                 SET quest_date = ?2, quests = ?3, all_completed = ?4, bonus_claimed = ?5,
                     total_quests_completed = ?6, total_koins_earned = ?7,
                     current_streak = ?8, longest_streak = ?9,
                     updated_at = ?10, version = ?11
                 WHERE owner_id = ?1 AND version = ?12",
                params![
                    daily.owner_id,
                    quest_date,
                    quests_json,
                    daily.all_completed,
                    daily.bonus_claimed,
                    daily.stats.total_quests_completed,
                    total_koins_earned,
                    daily.stats.current_streak,
                    daily.stats.longest_streak,
                    daily.updated_at.to_rfc3339(),
                    next_version,
                    daily.version,
                ],
            )?
        };

        if changed == 0 {
            // Dropping the transaction rolls it back; nothing was written anyway.
            return Ok(None);
        }

        if credit > 0 {
            credit_balance(&tx, &daily.owner_id, i64::from(credit))?;
        }

        tx.commit()?;
        Ok(Some(next_version))
    }

    fn count_stale_daily_quests(&self, today: NaiveDate) -> Result<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM daily_quests WHERE quest_date != ?1",
            params![today.format(DATE_FORMAT).to_string()],
            |row| row.get(0),
        )?;

        Ok(u64::try_from(count).unwrap_or_default())
    }
}

// Helper function to parse a daily quests row
fn parse_daily_quests_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DailyQuestsRecord> {
    let created_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;
    let total_koins_earned: i64 = row.get(6)?;

    Ok(DailyQuestsRecord {
        owner_id: row.get(0)?,
        quest_date: row.get(1)?,
        quests_json: row.get(2)?,
        all_completed: row.get(3)?,
        bonus_claimed: row.get(4)?,
        stats: QuestStats {
            total_quests_completed: row.get(5)?,
            total_koins_earned: u64::try_from(total_koins_earned).unwrap_or_default(),
            current_streak: row.get(7)?,
            longest_streak: row.get(8)?,
        },
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
        version: row.get(11)?,
    })
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::daily_quests::generation::generate_daily_quests;
    use crate::modules::wallet::database::WalletDatabase;
    use chrono::TimeZone;

    fn daily(owner: &str, date: NaiveDate) -> UserDailyQuests {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap();
        UserDailyQuests::new(owner, date, generate_daily_quests(&mut rand::thread_rng()), now)
    }

    fn jan(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_insert_then_load_round_trips_document() {
        let db = Database::in_memory().unwrap();
        let mut doc = daily("u1", jan(1));

        doc.version = db.save_daily_quests(&doc, 0).unwrap().expect("inserted");
        assert_eq!(doc.version, 1);

        let loaded = db.load_daily_quests("u1").unwrap().expect("stored");
        assert_eq!(loaded.document().unwrap(), doc);
        assert!(db.load_daily_quests("nobody").unwrap().is_none());
    }

    #[test]
    fn test_stale_version_is_rejected() {
        let db = Database::in_memory().unwrap();
        let mut doc = daily("u1", jan(1));
        doc.version = db.save_daily_quests(&doc, 0).unwrap().unwrap();

        // A second "first insert" loses.
        assert_eq!(db.save_daily_quests(&daily("u1", jan(1)), 0).unwrap(), None);

        let mut winner = doc.clone();
        winner.bonus_claimed = true;
        assert_eq!(db.save_daily_quests(&winner, 0).unwrap(), Some(2));

        let mut loser = doc.clone();
        loser.all_completed = true;
        assert_eq!(db.save_daily_quests(&loser, 25).unwrap(), None);

        let stored = db.load_daily_quests("u1").unwrap().unwrap().document().unwrap();
        assert!(stored.bonus_claimed);
        assert!(!stored.all_completed);
        // The losing write's credit must not leak through.
        assert_eq!(db.wallet_balance("u1").unwrap(), 0);
    }

    #[test]
    fn test_credit_is_committed_with_the_document() {
        let db = Database::in_memory().unwrap();
        let doc = daily("u1", jan(1));

        db.save_daily_quests(&doc, 40).unwrap().unwrap();
        assert_eq!(db.wallet_balance("u1").unwrap(), 40);
    }

    #[test]
    fn test_corrupt_quest_array_is_reported() {
        let db = Database::in_memory().unwrap();
        db.save_daily_quests(&daily("u1", jan(1)), 0).unwrap().unwrap();

        db.conn()
            .unwrap()
            .execute("UPDATE daily_quests SET quests = '[]' WHERE owner_id = 'u1'", [])
            .unwrap();

        let record = db.load_daily_quests("u1").unwrap().unwrap();
        assert!(matches!(record.document(), Err(QuestError::InvalidDocument(_))));
        assert_eq!(record.current_date(), Some(jan(1)));
    }

    #[test]
    fn test_count_stale_documents() {
        let db = Database::in_memory().unwrap();
        db.save_daily_quests(&daily("u1", jan(1)), 0).unwrap();
        db.save_daily_quests(&daily("u2", jan(2)), 0).unwrap();
        db.save_daily_quests(&daily("u3", jan(3)), 0).unwrap();

        assert_eq!(db.count_stale_daily_quests(jan(3)).unwrap(), 2);
        assert_eq!(db.count_stale_daily_quests(jan(9)).unwrap(), 3);
    }
}
