//! Daily quest and Koin wallet engine for the virtual-pet app.
//!
//! Each user gets three quests per UTC day, drawn from a static catalog. Completing one pays its
//! reward into the user's wallet, and completing all three unlocks a one-time bonus. Finishing
//! every quest on consecutive days builds a streak.
//!
//! Quest documents are renewed lazily: the first read on a new day regenerates the set. The cron
//! route only reports how many documents are stale.
pub mod error;
pub mod modules;
pub mod server;
pub mod util;

pub use error::{QuestError, Result};
pub use modules::daily_quests::{
    catalog::{AVAILABLE_QUESTS, COMPLETE_ALL_BONUS, DAILY_QUESTS_COUNT},
    BonusClaim, DailyQuestService, ProgressOutcome, QuestType, UserDailyQuests,
};
pub use modules::wallet::WalletLedger;
pub use server::{build_router, config::Config, state::AppState};
pub use util::{clock, database::Database};
