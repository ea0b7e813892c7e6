// src/store/postgres.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::warn;

use super::{attach_choices, AccountStore, PollStore, UidGenerator, UID_ATTEMPTS};
use crate::error::StoreError;
use crate::models::{Choice, NewPoll, Poll, PollWithChoices, PopularPoll, Token, User};
use crate::poll::generate_uid;

pub struct PgStore {
    pool: PgPool,
    uid_generator: UidGenerator,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self::with_uid_generator(pool, generate_uid)
    }

    pub fn with_uid_generator(pool: PgPool, generator: impl Fn() -> String + Send + Sync + 'static) -> Self {
        Self {
            pool,
            uid_generator: Box::new(generator),
        }
    }
}

async fn insert_poll(
    tx: &mut Transaction<'_, Postgres>,
    uid_generator: &UidGenerator,
    text: &str,
) -> Result<Poll, StoreError> {
    for attempt in 1..=UID_ATTEMPTS {
        let uid = uid_generator();
        let inserted = sqlx::query_as::<_, Poll>(
            r#"
            INSERT INTO polls (uid, text)
            VALUES ($1, $2)
            ON CONFLICT (uid) DO NOTHING
            RETURNING id, uid, text, pub_date
            "#,
        )
        .bind(&uid)
        .bind(text)
        .fetch_optional(&mut **tx)
        .await?;

        match inserted {
            Some(poll) => return Ok(poll),
            None => warn!(attempt, %uid, "Poll uid already taken, retrying"),
        }
    }

    Err(StoreError::UidExhausted(UID_ATTEMPTS))
}

#[async_trait]
impl PollStore for PgStore {
    async fn create_poll(&self, new_poll: &NewPoll) -> Result<PollWithChoices, StoreError> {
        let mut tx = self.pool.begin().await?;
        let poll = insert_poll(&mut tx, &self.uid_generator, &new_poll.text).await?;

        let mut choices = Vec::with_capacity(new_poll.choices.len());
        for text in &new_poll.choices {
            let choice = sqlx::query_as::<_, Choice>(
                "INSERT INTO choices (poll_id, text) VALUES ($1, $2) RETURNING id, poll_id, text, votes",
            )
            .bind(poll.id)
            .bind(text)
            .fetch_one(&mut *tx)
            .await?;
            choices.push(choice);
        }

        tx.commit().await?;
        Ok(PollWithChoices { poll, choices })
    }

    async fn list_polls(&self) -> Result<Vec<PollWithChoices>, StoreError> {
        let polls = sqlx::query_as::<_, Poll>("SELECT id, uid, text, pub_date FROM polls ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        let choices =
            sqlx::query_as::<_, Choice>("SELECT id, poll_id, text, votes FROM choices ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        Ok(attach_choices(polls, choices))
    }

    async fn find_poll(&self, uid: &str) -> Result<Option<PollWithChoices>, StoreError> {
        let Some(poll) =
            sqlx::query_as::<_, Poll>("SELECT id, uid, text, pub_date FROM polls WHERE uid = $1")
                .bind(uid)
                .fetch_optional(&self.pool)
                .await?
        else {
            return Ok(None);
        };

        let choices = sqlx::query_as::<_, Choice>(
            "SELECT id, poll_id, text, votes FROM choices WHERE poll_id = $1 ORDER BY id",
        )
        .bind(poll.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(PollWithChoices { poll, choices }))
    }

    async fn popular_polls(&self, limit: i64) -> Result<Vec<PopularPoll>, StoreError> {
        let polls = sqlx::query_as::<_, PopularPoll>(
            r#"
            SELECT p.id, p.uid, p.text, p.pub_date,
                   COALESCE(SUM(c.votes), 0)::BIGINT AS total_votes
            FROM polls p
            LEFT JOIN choices c ON c.poll_id = p.id
            GROUP BY p.id
            ORDER BY total_votes DESC, p.id ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(polls)
    }

    async fn increment_vote(&self, poll_id: i64, choice_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE choices SET votes = votes + 1 WHERE id = $1 AND poll_id = $2")
            .bind(choice_id)
            .bind(poll_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn get_or_create_user(&self, email: &str) -> Result<User, StoreError> {
        sqlx::query("INSERT INTO users (email) VALUES ($1) ON CONFLICT (email) DO NOTHING")
            .bind(email)
            .execute(&self.pool)
            .await?;

        Ok(User {
            email: email.to_string(),
        })
    }

    async fn create_token(&self, email: &str, uid: &str) -> Result<Token, StoreError> {
        let token = sqlx::query_as::<_, Token>(
            "INSERT INTO tokens (email, uid) VALUES ($1, $2) RETURNING id, email, uid, created_at",
        )
        .bind(email)
        .bind(uid)
        .fetch_one(&self.pool)
        .await?;

        Ok(token)
    }

    async fn consume_token(&self, uid: &str) -> Result<Option<Token>, StoreError> {
        let token = sqlx::query_as::<_, Token>(
            "DELETE FROM tokens WHERE uid = $1 RETURNING id, email, uid, created_at",
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    async fn purge_tokens_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM tokens WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

// `sqlx::test` creates a scratch database per test from `DATABASE_URL` and applies `migrations/`.
#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn new_poll(text: &str, choices: &[&str]) -> NewPoll {
        NewPoll {
            text: text.to_string(),
            choices: choices.iter().map(|c| c.to_string()).collect(),
        }
    }

    async fn row_count(pool: &PgPool, table: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .expect("count rows")
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL and a local PostgreSQL"]
    async fn concurrent_votes_are_all_counted(pool: PgPool) {
        let store = Arc::new(PgStore::new(pool));
        let created = store.create_poll(&new_poll("Q", &["A", "B"])).await.unwrap();
        let (poll_id, choice_id) = (created.poll.id, created.choices[0].id);

        let joins: Vec<_> = (0..50)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.increment_vote(poll_id, choice_id).await })
            })
            .collect();
        for j in joins {
            assert!(j.await.expect("join handle").expect("increment"));
        }

        let found = store.find_poll(&created.poll.uid).await.unwrap().unwrap();
        assert_eq!(found.choices[0].votes, 50);
        assert_eq!(found.choices[1].votes, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL and a local PostgreSQL"]
    async fn votes_only_land_on_choices_of_the_poll(pool: PgPool) {
        let store = PgStore::new(pool);
        let first = store.create_poll(&new_poll("One", &["A", "B"])).await.unwrap();
        let second = store.create_poll(&new_poll("Two", &["C", "D"])).await.unwrap();

        assert!(!store.increment_vote(first.poll.id, second.choices[0].id).await.unwrap());
        assert!(!store.increment_vote(first.poll.id, i64::MAX).await.unwrap());
        assert!(store.increment_vote(second.poll.id, second.choices[0].id).await.unwrap());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL and a local PostgreSQL"]
    async fn uid_collision_is_retried(pool: PgPool) {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = calls.clone();
        let store = PgStore::with_uid_generator(pool, move || {
            let n = counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if n < 3 {
                "SAMEUID000".to_string()
            } else {
                format!("UNIQUE{n:04}")
            }
        });

        let first = store.create_poll(&new_poll("One", &["A", "B"])).await.unwrap();
        let second = store.create_poll(&new_poll("Two", &["A", "B"])).await.unwrap();
        assert_eq!(first.poll.uid, "SAMEUID000");
        assert_eq!(second.poll.uid, "UNIQUE0003");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL and a local PostgreSQL"]
    async fn uid_exhaustion_rolls_back(pool: PgPool) {
        let store = PgStore::with_uid_generator(pool.clone(), || "SAMEUID000".to_string());
        store.create_poll(&new_poll("One", &["A", "B"])).await.unwrap();

        let err = store.create_poll(&new_poll("Two", &["C", "D"])).await.unwrap_err();
        assert!(matches!(err, StoreError::UidExhausted(UID_ATTEMPTS)));
        assert_eq!(row_count(&pool, "polls").await, 1);
        assert_eq!(row_count(&pool, "choices").await, 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL and a local PostgreSQL"]
    async fn list_and_find_keep_creation_order(pool: PgPool) {
        let store = PgStore::new(pool);
        let first = store.create_poll(&new_poll("One", &["A", "B", "C"])).await.unwrap();
        let second = store.create_poll(&new_poll("Two", &["D", "E"])).await.unwrap();

        let listed = store.list_polls().await.unwrap();
        assert_eq!(listed, [first.clone(), second]);
        assert_eq!(store.find_poll(&first.poll.uid).await.unwrap(), Some(first));
        assert_eq!(store.find_poll("missing").await.unwrap(), None);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL and a local PostgreSQL"]
    async fn popular_polls_sum_votes(pool: PgPool) {
        let store = PgStore::new(pool);
        let empty = store.create_poll(&new_poll("Empty", &[])).await.unwrap();
        let five = store.create_poll(&new_poll("Five", &["A", "B"])).await.unwrap();
        let ten = store.create_poll(&new_poll("Ten", &["A", "B"])).await.unwrap();
        for i in 0..5 {
            store.increment_vote(five.poll.id, five.choices[i % 2].id).await.unwrap();
        }
        for i in 0..10 {
            store.increment_vote(ten.poll.id, ten.choices[i % 2].id).await.unwrap();
        }

        let popular = store.popular_polls(10).await.unwrap();
        let order: Vec<_> = popular.iter().map(|p| (p.poll.id, p.total_votes)).collect();
        assert_eq!(order, [(ten.poll.id, 10), (five.poll.id, 5), (empty.poll.id, 0)]);
        assert_eq!(store.popular_polls(2).await.unwrap().len(), 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL and a local PostgreSQL"]
    async fn tokens_are_consumed_once(pool: PgPool) {
        let store = PgStore::new(pool);
        store.get_or_create_user("a@b.com").await.unwrap();
        store.get_or_create_user("a@b.com").await.unwrap();
        store.create_token("a@b.com", "tok").await.unwrap();

        let token = store.consume_token("tok").await.unwrap().expect("first exchange");
        assert_eq!(token.email, "a@b.com");
        assert!(store.consume_token("tok").await.unwrap().is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL and a local PostgreSQL"]
    async fn purge_drops_only_older_tokens(pool: PgPool) {
        let store = PgStore::new(pool);
        store.get_or_create_user("a@b.com").await.unwrap();
        let token = store.create_token("a@b.com", "old").await.unwrap();

        let before = token.created_at - chrono::Duration::seconds(1);
        assert_eq!(store.purge_tokens_before(before).await.unwrap(), 0);
        let after = token.created_at + chrono::Duration::seconds(1);
        assert_eq!(store.purge_tokens_before(after).await.unwrap(), 1);
        assert!(store.consume_token("old").await.unwrap().is_none());
    }
}
