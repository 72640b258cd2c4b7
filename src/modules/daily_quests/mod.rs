// src/modules/daily_quests/mod.rs

pub mod catalog;
pub mod database;
pub mod generation;
pub mod handler;
pub use database::DailyQuestDatabase;
pub use handler::DailyQuestService;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use catalog::{find_definition, DAILY_QUESTS_COUNT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestType {
    FeedMonster,
    EvolveMonster,
    InteractWithMonsters,
    BuyAccessory,
    MakeMonsterPublic,
    ReachMonsterLevel,
    CollectKoins,
    EquipAccessory,
    ChangeBackground,
}

impl QuestType {
    pub fn as_str(&self) -> &str {
        match self {
            QuestType::FeedMonster => "feed_monster",
            QuestType::EvolveMonster => "evolve_monster",
            QuestType::InteractWithMonsters => "interact_with_monsters",
            QuestType::BuyAccessory => "buy_accessory",
            QuestType::MakeMonsterPublic => "make_monster_public",
            QuestType::ReachMonsterLevel => "reach_monster_level",
            QuestType::CollectKoins => "collect_koins",
            QuestType::EquipAccessory => "equip_accessory",
            QuestType::ChangeBackground => "change_background",
        }
    }

    pub fn all() -> Vec<QuestType> {
        vec![
            QuestType::FeedMonster,
            QuestType::EvolveMonster,
            QuestType::InteractWithMonsters,
            QuestType::BuyAccessory,
            QuestType::MakeMonsterPublic,
            QuestType::ReachMonsterLevel,
            QuestType::CollectKoins,
            QuestType::EquipAccessory,
            QuestType::ChangeBackground,
        ]
    }
}

impl fmt::Display for QuestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One quest of a user's daily set, with its progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestInstance {
    pub quest_type: QuestType,
    pub current_progress: u32,
    pub target_count: u32,
    pub reward: u32,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl QuestInstance {
    pub fn pending(quest_type: QuestType, target_count: u32, reward: u32) -> Self {
        Self {
            quest_type,
            current_progress: 0,
            target_count,
            reward,
            completed: false,
            completed_at: None,
        }
    }
}

/// Exactly [`DAILY_QUESTS_COUNT`] quests of distinct types.
///
/// Deserialization goes through the same validation as [`DailyQuestSet::try_from`], so a stored
/// set with the wrong length, duplicated types or out-of-range progress is rejected on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<QuestInstance>")]
pub struct DailyQuestSet([QuestInstance; DAILY_QUESTS_COUNT]);

impl DailyQuestSet {
    pub fn iter(&self) -> impl Iterator<Item = &QuestInstance> {
        self.0.iter()
    }

    pub fn get(&self, quest_type: QuestType) -> Option<&QuestInstance> {
        self.0.iter().find(|q| q.quest_type == quest_type)
    }

    pub fn get_mut(&mut self, quest_type: QuestType) -> Option<&mut QuestInstance> {
        self.0.iter_mut().find(|q| q.quest_type == quest_type)
    }

    pub fn all_completed(&self) -> bool {
        self.0.iter().all(|q| q.completed)
    }

    pub fn quest_types(&self) -> Vec<QuestType> {
        self.0.iter().map(|q| q.quest_type).collect()
    }
}

impl TryFrom<Vec<QuestInstance>> for DailyQuestSet {
    type Error = String;

    fn try_from(quests: Vec<QuestInstance>) -> Result<Self, Self::Error> {
        let distinct: HashSet<QuestType> = quests.iter().map(|q| q.quest_type).collect();
        if distinct.len() != quests.len() {
            return Err("daily quests must have distinct types".to_string());
        }

        if let Some(quest) = quests.iter().find(|q| q.current_progress > q.target_count) {
            return Err(format!(
                "progress {} of {} exceeds target {}",
                quest.current_progress, quest.quest_type, quest.target_count
            ));
        }

        let len = quests.len();
        let quests: [QuestInstance; DAILY_QUESTS_COUNT] = quests.try_into().map_err(|_| {
            format!("a user must have exactly {DAILY_QUESTS_COUNT} daily quests, found {len}")
        })?;

        Ok(Self(quests))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestStats {
    pub total_quests_completed: u32,
    pub total_koins_earned: u64,
    pub current_streak: u32,
    pub longest_streak: u32,
}

/// A user's daily quest document. Renewed in place whenever `current_date` is no longer today.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDailyQuests {
    pub owner_id: String,
    pub current_date: NaiveDate,
    pub quests: DailyQuestSet,
    pub all_completed: bool,
    pub bonus_claimed: bool,
    pub stats: QuestStats,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Compare-and-swap token; 0 until the document is first stored.
    #[serde(skip)]
    pub version: i64,
}

impl UserDailyQuests {
    pub fn new(owner_id: &str, today: NaiveDate, quests: DailyQuestSet, now: DateTime<Utc>) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            current_date: today,
            quests,
            all_completed: false,
            bonus_claimed: false,
            stats: QuestStats::default(),
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Replace the quest set for `today`, carrying the streak forward if yesterday was finished.
    pub fn renew(&mut self, today: NaiveDate, quests: DailyQuestSet, now: DateTime<Utc>) {
        let streak = generation::next_streak(
            Some(self.current_date),
            self.all_completed,
            self.stats.current_streak,
            today,
        );
        self.reset_for(today, quests, streak, now);
    }

    fn reset_for(
        &mut self,
        today: NaiveDate,
        quests: DailyQuestSet,
        streak: u32,
        now: DateTime<Utc>,
    ) {
        self.current_date = today;
        self.quests = quests;
        self.all_completed = false;
        self.bonus_claimed = false;
        self.stats.current_streak = streak;
        self.stats.longest_streak = self.stats.longest_streak.max(streak);
        self.updated_at = now;
    }

    /// Advance one quest. Crediting the wallet is left to the caller.
    pub fn apply_progress(
        &mut self,
        quest_type: QuestType,
        increment: u32,
        now: DateTime<Utc>,
    ) -> QuestProgress {
        let Some(quest) = self.quests.get_mut(quest_type) else {
            return QuestProgress::Untracked;
        };

        if quest.completed {
            return QuestProgress::AlreadyCompleted;
        }

        quest.current_progress = quest
            .current_progress
            .saturating_add(increment)
            .min(quest.target_count);
        self.updated_at = now;

        if quest.current_progress < quest.target_count {
            return QuestProgress::Advanced;
        }

        quest.completed = true;
        quest.completed_at = Some(now);
        let reward = quest.reward;

        self.stats.total_quests_completed += 1;
        self.stats.total_koins_earned += u64::from(reward);
        self.all_completed = self.quests.all_completed();

        QuestProgress::Completed { reward }
    }

    /// Mark the complete-all bonus as claimed. Returns `None` if it is not claimable.
    pub fn claim_bonus(&mut self, bonus: u32, now: DateTime<Utc>) -> Option<u32> {
        if !self.all_completed || self.bonus_claimed {
            return None;
        }

        self.bonus_claimed = true;
        self.stats.total_koins_earned += u64::from(bonus);
        self.updated_at = now;
        Some(bonus)
    }
}

/// What a single progress update did to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestProgress {
    /// The quest type is not part of today's set.
    Untracked,
    AlreadyCompleted,
    Advanced,
    Completed { reward: u32 },
}

impl QuestProgress {
    pub fn needs_save(&self) -> bool {
        matches!(self, QuestProgress::Advanced | QuestProgress::Completed { .. })
    }

    pub fn credit(&self) -> u32 {
        match self {
            QuestProgress::Completed { reward } => *reward,
            _ => 0,
        }
    }

    pub fn outcome(&self, all_completed: bool) -> ProgressOutcome {
        match *self {
            QuestProgress::Untracked | QuestProgress::Advanced => ProgressOutcome::default(),
            QuestProgress::AlreadyCompleted => ProgressOutcome {
                completed: true,
                reward: 0,
                all_quests_completed: all_completed,
            },
            QuestProgress::Completed { reward } => ProgressOutcome {
                completed: true,
                reward,
                all_quests_completed: all_completed,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressOutcome {
    pub completed: bool,
    pub reward: u32,
    pub all_quests_completed: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusClaim {
    pub success: bool,
    pub bonus: u32,
}

/// Quest instance plus the catalog's display fields, as sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedQuest {
    #[serde(flatten)]
    pub quest: QuestInstance,
    pub title: String,
    pub description: String,
    pub icon: String,
}

impl From<&QuestInstance> for EnrichedQuest {
    fn from(quest: &QuestInstance) -> Self {
        let definition = find_definition(quest.quest_type);
        Self {
            quest: quest.clone(),
            title: definition.map(|d| d.title).unwrap_or_default().to_string(),
            description: definition.map(|d| d.description).unwrap_or_default().to_string(),
            icon: definition.map(|d| d.icon).unwrap_or("❓").to_string(),
        }
    }
}
