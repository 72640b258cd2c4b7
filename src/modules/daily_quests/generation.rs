// src/modules/daily_quests/generation.rs
// Drawing a day's quest set and carrying streaks between days

use chrono::NaiveDate;
use rand::Rng;

use super::catalog::AVAILABLE_QUESTS;
use super::{DailyQuestSet, QuestInstance};

/// Draw [`DAILY_QUESTS_COUNT`](super::catalog::DAILY_QUESTS_COUNT) distinct quests uniformly from the catalog, without replacement.
pub fn generate_daily_quests<R: Rng + ?Sized>(rng: &mut R) -> DailyQuestSet {
    let mut available = AVAILABLE_QUESTS.to_vec();

    DailyQuestSet(std::array::from_fn(|_| {
        let definition = available.remove(rng.gen_range(0..available.len()));
        QuestInstance::pending(definition.id, definition.target_count, definition.reward)
    }))
}

/// Streak for `today`: previous streak + 1 if the previous set was yesterday's and fully
/// completed, otherwise 0.
pub fn next_streak(
    previous_date: Option<NaiveDate>,
    previous_all_completed: bool,
    previous_streak: u32,
    today: NaiveDate,
) -> u32 {
    match (previous_date, today.pred_opt()) {
        (Some(previous), Some(yesterday)) if previous == yesterday && previous_all_completed => {
            previous_streak.saturating_add(1)
        }
        _ => 0,
    }
}
