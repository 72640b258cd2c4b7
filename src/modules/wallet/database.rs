// src/modules/wallet/database.rs
// Database operations for the wallet ledger (one running balance per user)

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::util::database::Database;
use super::Wallet;

/// Trait to add wallet-specific database operations to Database
pub trait WalletDatabase {
    fn init_wallet_schema(&self) -> Result<()>;

    fn get_wallet(&self, owner_id: &str) -> Result<Option<Wallet>>;
    fn wallet_balance(&self, owner_id: &str) -> Result<i64>;

    // Atomic upsert-decrement; the ledger does not check for overdraft
    fn debit_wallet(&self, owner_id: &str, amount: u32) -> Result<i64>;
}

impl WalletDatabase for Database {
    fn init_wallet_schema(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS wallets (
                owner_id TEXT PRIMARY KEY,
                balance INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;

        Ok(())
    }

    fn get_wallet(&self, owner_id: &str) -> Result<Option<Wallet>> {
        let conn = self.conn()?;
        let wallet = conn
            .query_row(
                "SELECT owner_id, balance FROM wallets WHERE owner_id = ?1",
                params![owner_id],
                |row| {
                    Ok(Wallet {
                        owner_id: row.get(0)?,
                        balance: row.get(1)?,
                    })
                },
            )
            .optional()?;

        Ok(wallet)
    }

    fn wallet_balance(&self, owner_id: &str) -> Result<i64> {
        Ok(self.get_wallet(owner_id)?.map(|w| w.balance).unwrap_or(0))
    }

    fn debit_wallet(&self, owner_id: &str, amount: u32) -> Result<i64> {
        let conn = self.conn()?;
        Ok(credit_balance(&conn, owner_id, -i64::from(amount))?)
    }
}

/// Add `delta` to the owner's balance, creating the wallet if needed. Returns the new balance.
///
/// Takes a bare connection so it can run inside another module's transaction.
pub(crate) fn credit_balance(conn: &Connection, owner_id: &str, delta: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "INSERT INTO wallets (owner_id, balance) VALUES (?1, ?2)
         ON CONFLICT(owner_id) DO UPDATE SET balance = balance + excluded.balance
         RETURNING balance",
        params![owner_id, delta],
        |row| row.get(0),
    )
}
