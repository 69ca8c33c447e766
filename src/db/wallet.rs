//! Wallet repository: per-user balance with guarded atomic deltas.

use serde::Serialize;
use sqlx::SqliteConnection;

use super::money::{from_cents, to_cents, MAX_BALANCE_CENTS};
use super::Database;
use crate::{GamehubError, Result};

/// A user's wallet. The balance is stored in cents and reported in units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Wallet {
    pub user_id: i64,
    pub balance: f64,
}

impl Wallet {
    fn from_cents(user_id: i64, cents: i64) -> Self {
        Self {
            user_id,
            balance: from_cents(cents),
        }
    }
}

/// Add `delta` cents (negative for a debit) to the balance in a single statement.
///
/// The statement only matches while the result stays within
/// `0..=MAX_BALANCE_CENTS`, so two racing debits can never overdraw the wallet.
pub(crate) async fn apply_delta_on(
    conn: &mut SqliteConnection,
    user_id: i64,
    delta: i64,
) -> Result<Wallet> {
    let balance: Option<i64> = sqlx::query_scalar(
        "UPDATE wallets SET balance = balance + $1
         WHERE user_id = $2 AND balance + $1 BETWEEN 0 AND $3
         RETURNING balance",
    )
    .bind(delta)
    .bind(user_id)
    .bind(MAX_BALANCE_CENTS)
    .fetch_optional(&mut *conn)
    .await?;

    match balance {
        Some(balance) => Ok(Wallet::from_cents(user_id, balance)),
        None => {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM wallets WHERE user_id = $1)")
                    .bind(user_id)
                    .fetch_one(&mut *conn)
                    .await?;
            if !exists {
                Err(GamehubError::NotFound("wallet".into()))
            } else if delta > 0 {
                Err(GamehubError::BalanceLimitExceeded)
            } else {
                Err(GamehubError::InsufficientFunds)
            }
        }
    }
}

/// Repository for wallet operations.
pub struct WalletRepository<'a> {
    db: &'a Database,
}

impl<'a> WalletRepository<'a> {
    /// Create a new repository instance.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Get the wallet of `user_id`.
    pub async fn get_for_user(&self, user_id: i64) -> Result<Wallet> {
        let balance: Option<i64> = self
            .db
            .timed(
                sqlx::query_scalar("SELECT balance FROM wallets WHERE user_id = $1")
                    .bind(user_id)
                    .fetch_optional(self.db.pool()),
            )
            .await?;

        balance
            .map(|cents| Wallet::from_cents(user_id, cents))
            .ok_or_else(|| GamehubError::NotFound("wallet".into()))
    }

    /// Apply a signed delta, in currency units, atomically.
    ///
    /// Returns `InsufficientFunds` when a debit would overdraw the wallet and
    /// `BalanceLimitExceeded` when a credit would pass the cap; the balance
    /// is left untouched in both cases.
    pub async fn apply_delta(&self, user_id: i64, delta: f64) -> Result<Wallet> {
        self.db
            .timed(async {
                let mut conn = self.db.pool().acquire().await?;
                apply_delta_on(&mut conn, user_id, to_cents(delta)).await
            })
            .await
    }
}
