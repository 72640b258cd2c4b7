// src/modules/daily_quests/catalog.rs
// Static catalog of quest definitions the daily sets are drawn from

use super::QuestType;

/// Number of quests handed out per user per day.
pub const DAILY_QUESTS_COUNT: usize = 3;

/// Koins granted once all of the day's quests are completed and the bonus is claimed.
pub const COMPLETE_ALL_BONUS: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestDefinition {
    pub id: QuestType,
    pub title: &'static str,
    pub description: &'static str,
    pub reward: u32,
    pub target_count: u32,
    pub icon: &'static str,
}

pub const AVAILABLE_QUESTS: [QuestDefinition; 9] = [
    QuestDefinition {
        id: QuestType::FeedMonster,
        title: "Feed your monsters",
        description: "Feed your monster 5 times today",
        reward: 20,
        target_count: 5,
        icon: "🍖",
    },
    QuestDefinition {
        id: QuestType::EvolveMonster,
        title: "Evolve",
        description: "Level a monster up once",
        reward: 50,
        target_count: 1,
        icon: "⬆️",
    },
    QuestDefinition {
        id: QuestType::InteractWithMonsters,
        title: "Play with your monsters",
        description: "Interact with 3 different monsters",
        reward: 30,
        target_count: 3,
        icon: "🎮",
    },
    QuestDefinition {
        id: QuestType::BuyAccessory,
        title: "Buy an accessory",
        description: "Buy an accessory in the shop",
        reward: 40,
        target_count: 1,
        icon: "🛍️",
    },
    QuestDefinition {
        id: QuestType::MakeMonsterPublic,
        title: "Share a monster",
        description: "Make one of your monsters public",
        reward: 15,
        target_count: 1,
        icon: "🌍",
    },
    QuestDefinition {
        id: QuestType::ReachMonsterLevel,
        title: "Reach a level",
        description: "Bring a monster up to level 3",
        reward: 35,
        target_count: 3,
        icon: "🎯",
    },
    QuestDefinition {
        id: QuestType::CollectKoins,
        title: "Koin collector",
        description: "Earn 50 Koins today",
        reward: 25,
        target_count: 50,
        icon: "💰",
    },
    QuestDefinition {
        id: QuestType::EquipAccessory,
        title: "Dress up",
        description: "Equip 2 accessories on your monsters",
        reward: 20,
        target_count: 2,
        icon: "👔",
    },
    QuestDefinition {
        id: QuestType::ChangeBackground,
        title: "Redecorate",
        description: "Change a monster's background",
        reward: 15,
        target_count: 1,
        icon: "🖼️",
    },
];

pub fn find_definition(quest_type: QuestType) -> Option<&'static QuestDefinition> {
    AVAILABLE_QUESTS.iter().find(|definition| definition.id == quest_type)
}
