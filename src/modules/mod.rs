pub mod daily_quests;
pub mod sessions;
pub mod wallet;
