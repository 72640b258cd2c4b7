// src/modules/wallet/handler.rs

use tracing::{debug, info, warn};

use crate::error::{QuestError, Result};
use crate::util::database::Database;
use super::database::WalletDatabase;

/// Credit/debit front for the wallets table.
#[derive(Debug, Clone)]
pub struct WalletLedger {
    database: Database,
}

impl WalletLedger {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Current balance; 0 for users without a wallet.
    pub fn balance(&self, owner_id: &str) -> Result<i64> {
        self.database.wallet_balance(owner_id)
    }

    pub fn debit(&self, owner_id: &str, amount: u32) -> Result<i64> {
        let balance = self.database.debit_wallet(owner_id, amount)?;
        info!("Debited {amount} Koins from {owner_id}, balance {balance}");
        Ok(balance)
    }

    /// Debit after checking the balance covers `amount`, as purchases do.
    ///
    /// The check and the debit are separate statements; two concurrent purchases can both pass
    /// the check.
    pub fn spend(&self, owner_id: &str, amount: u32) -> Result<i64> {
        let balance = self.balance(owner_id)?;
        debug!("{owner_id} wants to spend {amount} Koins with {balance} available");

        if balance < i64::from(amount) {
            warn!("Refusing purchase of {amount} Koins for {owner_id}: balance {balance}");
            return Err(QuestError::InsufficientFunds { balance, required: amount });
        }

        self.debit(owner_id, amount)
    }
}
