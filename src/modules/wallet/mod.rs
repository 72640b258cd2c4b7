// src/modules/wallet/mod.rs

pub mod database;
pub mod handler;
pub use database::WalletDatabase;
pub use handler::WalletLedger;

use serde::{Deserialize, Serialize};

use crate::modules::daily_quests::QuestType;

/// Running Koin balance of one user. No history is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub owner_id: String,
    pub balance: i64,
}

/// Things the shop sells for Koins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShopItem {
    Accessory,
    Background,
}

impl ShopItem {
    /// Daily quest a successful purchase counts towards, if any.
    pub fn quest(&self) -> Option<QuestType> {
        match self {
            ShopItem::Accessory => Some(QuestType::BuyAccessory),
            // Backgrounds count once equipped, not when bought
            ShopItem::Background => None,
        }
    }
}
