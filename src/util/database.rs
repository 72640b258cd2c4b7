// src/util/database.rs
// Core database struct with connection management only

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{QuestError, Result};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Process-wide database handle, opened once and cloned into every service.
#[derive(Clone)]
pub struct Database {
    pub(crate) app_conn: Arc<Mutex<Connection>>,
}

// Manual Debug implementation since Mutex<Connection> doesn't implement Debug
impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("app_conn", &"Arc<Mutex<Connection>>")
            .finish()
    }
}

impl Database {
    pub fn open(app_db_path: &Path) -> Result<Self> {
        if let Some(db_dir) = app_db_path.parent() {
            if !db_dir.as_os_str().is_empty() && !db_dir.exists() {
                std::fs::create_dir_all(db_dir)?;
            }
        }

        Self::from_connection(Connection::open(app_db_path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;

        let db = Database {
            app_conn: Arc::new(Mutex::new(conn)),
        };

        // Initialize all module schemas
        db.init_all_schemas()?;

        Ok(db)
    }

    fn init_all_schemas(&self) -> Result<()> {
        use crate::modules::daily_quests::database::DailyQuestDatabase;
        use crate::modules::sessions::database::SessionDatabase;
        use crate::modules::wallet::database::WalletDatabase;

        self.init_daily_quest_schema()?;
        self.init_wallet_schema()?;
        self.init_session_schema()?;

        Ok(())
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.app_conn
            .lock()
            .map_err(|_| QuestError::Internal("database connection lock poisoned".into()))
    }

    /// Cheap liveness probe used by the health endpoint.
    pub fn ping(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}
