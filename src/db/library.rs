//! Library repository: which games each user owns.

use super::money::to_cents;
use super::wallet::apply_delta_on;
use super::{is_unique_violation, Database, Game, GameRepository, Wallet, WalletRepository};
use crate::{GamehubError, Result};

/// Repository for library membership and purchases.
pub struct LibraryRepository<'a> {
    db: &'a Database,
}

impl<'a> LibraryRepository<'a> {
    /// Create a new repository instance.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Games owned by `user_id`.
    pub async fn list(&self, user_id: i64) -> Result<Vec<Game>> {
        GameRepository::new(self.db).list_for_user(user_id).await
    }

    /// Whether `user_id` owns `game_id`.
    pub async fn contains(&self, user_id: i64, game_id: i64) -> Result<bool> {
        self.db
            .timed(
                sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM library WHERE user_id = $1 AND game_id = $2)",
                )
                .bind(user_id)
                .bind(game_id)
                .fetch_one(self.db.pool()),
            )
            .await
    }

    /// Buy `game_id` for `user_id`.
    ///
    /// Ownership and balance are checked up front for an early error; the
    /// membership insert and the guarded debit then run in one transaction.
    /// A racing duplicate purchase trips the `(user_id, game_id)` constraint
    /// and a racing drain of the wallet trips the guarded debit; either way
    /// the transaction rolls back.
    pub async fn purchase(&self, user_id: i64, game_id: i64) -> Result<(Game, Wallet)> {
        let game = GameRepository::new(self.db)
            .get_by_id(game_id)
            .await?
            .ok_or_else(|| GamehubError::NotFound("game".into()))?;

        if self.contains(user_id, game_id).await? {
            return Err(GamehubError::AlreadyInLibrary);
        }

        let wallet = WalletRepository::new(self.db).get_for_user(user_id).await?;
        if wallet.balance < game.price {
            return Err(GamehubError::InsufficientFunds);
        }

        let wallet = self
            .db
            .timed(async {
                let mut tx = self.db.pool().begin().await?;

                sqlx::query("INSERT INTO library (user_id, game_id) VALUES ($1, $2)")
                    .bind(user_id)
                    .bind(game_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        if is_unique_violation(&e) {
                            GamehubError::AlreadyInLibrary
                        } else {
                            GamehubError::from(e)
                        }
                    })?;

                let wallet = apply_delta_on(&mut tx, user_id, -to_cents(game.price)).await?;

                tx.commit().await?;
                Ok::<_, GamehubError>(wallet)
            })
            .await?;

        Ok((game, wallet))
    }

    /// Remove `game_id` from the library. No refund is made.
    pub async fn remove(&self, user_id: i64, game_id: i64) -> Result<()> {
        let result = self
            .db
            .timed(
                sqlx::query("DELETE FROM library WHERE user_id = $1 AND game_id = $2")
                    .bind(user_id)
                    .bind(game_id)
                    .execute(self.db.pool()),
            )
            .await?;

        if result.rows_affected() == 0 {
            return Err(GamehubError::NotFound("game".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewGame, NewUser, UserRepository};
    use chrono::NaiveDate;

    async fn setup(funds: f64) -> (Database, i64, Game) {
        let db = Database::open_in_memory().await.unwrap();
        let (user_id, game) = seed(&db, funds).await;
        (db, user_id, game)
    }

    async fn seed(db: &Database, funds: f64) -> (i64, Game) {
        let user = UserRepository::new(db)
            .create(&NewUser::new("Buyer", "buyer@example.com", "hash"))
            .await
            .unwrap();
        if funds > 0.0 {
            WalletRepository::new(db)
                .apply_delta(user.id, funds)
                .await
                .unwrap();
        }
        let game = GameRepository::new(db)
            .create(&NewGame {
                title: "Hollow Knight".into(),
                genres: vec!["metroidvania".into()],
                release_date: NaiveDate::from_ymd_opt(2017, 2, 24).unwrap(),
                price: 15.0,
                publisher_id: 5,
            })
            .await
            .unwrap();
        (user.id, game)
    }

    async fn membership_count(db: &Database, user_id: i64, game_id: i64) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM library WHERE user_id = $1 AND game_id = $2")
            .bind(user_id)
            .bind(game_id)
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_purchase_debits_wallet() {
        let (db, user_id, game) = setup(20.0).await;
        let repo = LibraryRepository::new(&db);

        let (bought, wallet) = repo.purchase(user_id, game.id).await.unwrap();
        assert_eq!(bought.id, game.id);
        assert_eq!(wallet.balance, 5.0);
        assert!(repo.contains(user_id, game.id).await.unwrap());
        assert_eq!(repo.list(user_id).await.unwrap(), vec![game]);
    }

    #[tokio::test]
    async fn test_second_purchase_is_rejected() {
        let (db, user_id, game) = setup(100.0).await;
        let repo = LibraryRepository::new(&db);

        repo.purchase(user_id, game.id).await.unwrap();
        let result = repo.purchase(user_id, game.id).await;
        assert!(matches!(result, Err(GamehubError::AlreadyInLibrary)));

        assert_eq!(membership_count(&db, user_id, game.id).await, 1);
        let wallet = WalletRepository::new(&db).get_for_user(user_id).await.unwrap();
        assert_eq!(wallet.balance, 85.0);
    }

    #[tokio::test]
    async fn test_purchase_without_funds() {
        let (db, user_id, game) = setup(10.0).await;
        let result = LibraryRepository::new(&db).purchase(user_id, game.id).await;

        assert!(matches!(result, Err(GamehubError::InsufficientFunds)));
        assert_eq!(membership_count(&db, user_id, game.id).await, 0);
    }

    #[tokio::test]
    async fn test_purchase_unknown_game() {
        let (db, user_id, _) = setup(10.0).await;
        let err = LibraryRepository::new(&db)
            .purchase(user_id, 999)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_purchases_of_same_game() {
        let (_dir, db) = crate::db::open_temp(8).await;
        let (user_id, game) = seed(&db, 100.0).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let db = db.clone();
            let game_id = game.id;
            handles.push(tokio::spawn(async move {
                LibraryRepository::new(&db).purchase(user_id, game_id).await
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(GamehubError::AlreadyInLibrary) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(succeeded, 1);
        assert_eq!(membership_count(&db, user_id, game.id).await, 1);
        let wallet = WalletRepository::new(&db).get_for_user(user_id).await.unwrap();
        assert_eq!(wallet.balance, 85.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_purchases_never_overdraw() {
        let (_dir, db) = crate::db::open_temp(8).await;
        let (user_id, _) = seed(&db, 50.0).await;

        let mut handles = Vec::new();
        for i in 0..6 {
            let game = GameRepository::new(&db)
                .create(&NewGame {
                    title: format!("Bundle {i}"),
                    genres: vec!["puzzle".into()],
                    release_date: NaiveDate::from_ymd_opt(2019, 6, 1).unwrap(),
                    price: 20.0,
                    publisher_id: 2,
                })
                .await
                .unwrap();
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                LibraryRepository::new(&db).purchase(user_id, game.id).await
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(GamehubError::InsufficientFunds) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(succeeded, 2);
        assert_eq!(LibraryRepository::new(&db).list(user_id).await.unwrap().len(), 2);
        let wallet = WalletRepository::new(&db).get_for_user(user_id).await.unwrap();
        assert_eq!(wallet.balance, 10.0);
    }

    #[tokio::test]
    async fn test_remove() {
        let (db, user_id, game) = setup(20.0).await;
        let repo = LibraryRepository::new(&db);
        repo.purchase(user_id, game.id).await.unwrap();

        repo.remove(user_id, game.id).await.unwrap();
        assert!(!repo.contains(user_id, game.id).await.unwrap());
        assert!(repo.remove(user_id, game.id).await.unwrap_err().is_not_found());

        // No refund
        let wallet = WalletRepository::new(&db).get_for_user(user_id).await.unwrap();
        assert_eq!(wallet.balance, 5.0);
    }
}
