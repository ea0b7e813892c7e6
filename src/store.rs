// src/store.rs
//! Data access for polls and accounts.
//!
//! Every mutation goes through a named operation on one of the two traits.
//! `PgStore` backs them with PostgreSQL, `MemoryStore` keeps everything in
//! process and is used when no database is configured.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::models::{Choice, NewPoll, Poll, PollWithChoices, PopularPoll, Token, User};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// How many fresh uids are tried before poll creation gives up.
pub const UID_ATTEMPTS: usize = 5;

type UidGenerator = Box<dyn Fn() -> String + Send + Sync>;

#[async_trait]
pub trait PollStore: Send + Sync {
    /// Persists the poll and all of its choices atomically, with `votes = 0`.
    async fn create_poll(&self, new_poll: &NewPoll) -> Result<PollWithChoices, StoreError>;

    async fn list_polls(&self) -> Result<Vec<PollWithChoices>, StoreError>;

    async fn find_poll(&self, uid: &str) -> Result<Option<PollWithChoices>, StoreError>;

    /// Polls ordered by total votes descending, ties by id.
    async fn popular_polls(&self, limit: i64) -> Result<Vec<PopularPoll>, StoreError>;

    /// Adds one vote to `choice_id` if it belongs to `poll_id`. Returns false when no choice matched.
    async fn increment_vote(&self, poll_id: i64, choice_id: i64) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get_or_create_user(&self, email: &str) -> Result<User, StoreError>;

    async fn create_token(&self, email: &str, uid: &str) -> Result<Token, StoreError>;

    /// Removes and returns the token, so a second call with the same uid yields `None`.
    async fn consume_token(&self, uid: &str) -> Result<Option<Token>, StoreError>;

    async fn purge_tokens_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// Attaches choices (already in creation order) to their polls.
fn attach_choices(polls: Vec<Poll>, choices: Vec<Choice>) -> Vec<PollWithChoices> {
    let mut by_poll: HashMap<i64, Vec<Choice>> = HashMap::new();
    for choice in choices {
        by_poll.entry(choice.poll_id).or_default().push(choice);
    }

    polls
        .into_iter()
        .map(|poll| PollWithChoices {
            choices: by_poll.remove(&poll.id).unwrap_or_default(),
            poll,
        })
        .collect()
}
