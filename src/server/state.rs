use std::sync::Arc;

use crate::modules::{daily_quests::DailyQuestService, wallet::WalletLedger};
use crate::util::{
    clock::{Clock, SystemClock},
    database::Database,
};

use super::config::Config;

/// Shared by every handler. Services hold clones of the one database handle.
pub struct AppState {
    pub config: Config,
    pub database: Database,
    pub clock: Arc<dyn Clock>,
    pub quests: DailyQuestService,
    pub wallet: WalletLedger,
}

impl AppState {
    pub fn new(config: Config, database: Database) -> Arc<Self> {
        Self::with_clock(config, database, Arc::new(SystemClock))
    }

    pub fn with_clock(config: Config, database: Database, clock: Arc<dyn Clock>) -> Arc<Self> {
        let quests = DailyQuestService::with_clock(database.clone(), clock.clone());
        let wallet = WalletLedger::new(database.clone());

        Arc::new(Self {
            config,
            database,
            clock,
            quests,
            wallet,
        })
    }
}
