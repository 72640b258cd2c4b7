// src/modules/daily_quests/handler.rs

use serde::Serialize;
use std::sync::Arc;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, error, info, warn};

use crate::error::{QuestError, Result};
use crate::util::{
    clock::{Clock, SystemClock},
    database::Database,
};
use super::{
    catalog::COMPLETE_ALL_BONUS,
    database::{DailyQuestDatabase, DailyQuestsRecord},
    generation::{generate_daily_quests, next_streak},
    BonusClaim, DailyQuestSet, ProgressOutcome, QuestProgress, QuestType, UserDailyQuests,
};

/// Compare-and-swap retries before a write gives up with [`QuestError::Conflict`].
const MAX_WRITE_ATTEMPTS: usize = 3;

/// Result of the cron probe. Renewal itself happens lazily on the next read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResetSummary {
    pub processed: u64,
    pub renewed: u64,
}

#[derive(Clone)]
pub struct DailyQuestService {
    database: Database,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for DailyQuestService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DailyQuestService")
            .field("database", &self.database)
            .field("today", &self.clock.today())
            .finish()
    }
}

impl DailyQuestService {
    pub fn new(database: Database) -> Self {
        Self::with_clock(database, Arc::new(SystemClock))
    }

    pub fn with_clock(database: Database, clock: Arc<dyn Clock>) -> Self {
        Self { database, clock }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Today's quests for `owner_id`, creating or renewing the document first if needed.
    pub fn get_user_daily_quests(&self, owner_id: &str) -> Result<UserDailyQuests> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let today = self.clock.today();
            let now = self.clock.now();

            let mut daily = match self.database.load_daily_quests(owner_id)? {
                None => {
                    info!("Creating daily quests for {owner_id} on {today}");
                    UserDailyQuests::new(owner_id, today, draw_quests(), now)
                }
                Some(record) => match record.document() {
                    Ok(daily) if daily.current_date == today => return Ok(daily),
                    Ok(mut daily) => {
                        info!(
                            "Renewing daily quests for {owner_id}: {} -> {today}",
                            daily.current_date
                        );
                        daily.renew(today, draw_quests(), now);
                        daily
                    }
                    Err(e) => {
                        warn!("Repairing daily quests for {owner_id}: {e}");
                        repair(&record, today, draw_quests(), now)
                    }
                },
            };

            if let Some(version) = self.database.save_daily_quests(&daily, 0)? {
                daily.version = version;
                return Ok(daily);
            }

            debug!("Quest renewal for {owner_id} lost a race (attempt {attempt})");
        }

        Err(QuestError::Conflict(owner_id.to_string()))
    }

    /// Add `increment` to one of today's quests, paying its reward on completion.
    pub fn update_quest_progress(
        &self,
        owner_id: &str,
        quest_type: QuestType,
        increment: u32,
    ) -> Result<ProgressOutcome> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut daily = self.get_user_daily_quests(owner_id)?;
            let progress = daily.apply_progress(quest_type, increment, self.clock.now());
            let outcome = progress.outcome(daily.all_completed);

            if !progress.needs_save() {
                debug!("Quest {quest_type} for {owner_id}: {progress:?}, nothing to store");
                return Ok(outcome);
            }

            if self.database.save_daily_quests(&daily, progress.credit())?.is_some() {
                if let QuestProgress::Completed { reward } = progress {
                    info!(
                        "{owner_id} completed {quest_type} (+{reward} Koins, all completed: {})",
                        daily.all_completed
                    );
                }
                return Ok(outcome);
            }

            debug!("Progress on {quest_type} for {owner_id} lost a race (attempt {attempt})");
        }

        Err(QuestError::Conflict(owner_id.to_string()))
    }

    /// Pay the complete-all bonus once per day. Not being eligible is a normal outcome.
    pub fn claim_all_quests_bonus(&self, owner_id: &str) -> Result<BonusClaim> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut daily = self.get_user_daily_quests(owner_id)?;

            let Some(bonus) = daily.claim_bonus(COMPLETE_ALL_BONUS, self.clock.now()) else {
                debug!(
                    "Bonus not claimable for {owner_id} (all completed: {}, claimed: {})",
                    daily.all_completed, daily.bonus_claimed
                );
                return Ok(BonusClaim::default());
            };

            if self.database.save_daily_quests(&daily, bonus)?.is_some() {
                info!("{owner_id} claimed the daily bonus (+{bonus} Koins)");
                return Ok(BonusClaim { success: true, bonus });
            }

            debug!("Bonus claim for {owner_id} lost a race (attempt {attempt})");
        }

        Err(QuestError::Conflict(owner_id.to_string()))
    }

    /// Best-effort progress update for use after a primary action has already succeeded.
    /// Failures are logged and never returned.
    pub fn track_quest(&self, owner_id: &str, quest_type: QuestType, increment: u32) {
        match self.update_quest_progress(owner_id, quest_type, increment) {
            Ok(outcome) => {
                debug!("Tracked {quest_type} for {owner_id}: {outcome:?}");
            }
            Err(e) => {
                error!("Error updating quest {quest_type} for user {owner_id}: {e}");
            }
        }
    }

    /// Count documents that are not on today's date. Does not modify anything.
    pub fn count_expired_quests(&self) -> Result<ResetSummary> {
        let today = self.clock.today();
        info!("Checking quests to renew for {today}");

        let processed = self.database.count_stale_daily_quests(today)?;
        info!("{processed} user(s) with expired quests");

        Ok(ResetSummary { processed, renewed: 0 })
    }
}

fn draw_quests() -> DailyQuestSet {
    generate_daily_quests(&mut rand::thread_rng())
}

/// Rebuild a document whose quest array could not be read. Stats survive; a same-day repair
/// keeps the current streak and a bonus already claimed today.
fn repair(
    record: &DailyQuestsRecord,
    today: NaiveDate,
    quests: DailyQuestSet,
    now: DateTime<Utc>,
) -> UserDailyQuests {
    let previous_date = record.current_date();
    let same_day = previous_date == Some(today);
    let streak = if same_day {
        record.stats.current_streak
    } else {
        next_streak(previous_date, record.all_completed, record.stats.current_streak, today)
    };

    let mut daily = UserDailyQuests::new(&record.owner_id, today, quests, now);
    daily.bonus_claimed = same_day && record.bonus_claimed;
    daily.created_at = record.created_at;
    daily.version = record.version;
    daily.stats = record.stats;
    daily.stats.current_streak = streak;
    daily.stats.longest_streak = daily.stats.longest_streak.max(streak);
    daily
}
