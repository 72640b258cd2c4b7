// src/modules/sessions/database.rs
// Session token lookup for request authentication

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::error::Result;
use crate::util::database::Database;

/// Trait to add session operations to Database
pub trait SessionDatabase {
    fn init_session_schema(&self) -> Result<()>;

    fn insert_session(&self, token: &str, user_id: &str, expires_at: DateTime<Utc>) -> Result<()>;

    /// User owning `token`, if the session exists and has not expired at `now`.
    fn find_session_user(&self, token: &str, now: DateTime<Utc>) -> Result<Option<String>>;
}

impl SessionDatabase for Database {
    fn init_session_schema(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    fn insert_session(&self, token: &str, user_id: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO sessions (token, user_id, expires_at)
             VALUES (?1, ?2, ?3)",
            params![token, user_id, expires_at.timestamp()],
        )?;

        Ok(())
    }

    fn find_session_user(&self, token: &str, now: DateTime<Utc>) -> Result<Option<String>> {
        let conn = self.conn()?;
        let user_id = conn
            .query_row(
                "SELECT user_id FROM sessions WHERE token = ?1 AND expires_at > ?2",
                params![token, now.timestamp()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(user_id)
    }
}
