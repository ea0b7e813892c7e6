// src/store/memory.rs
use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::warn;

use super::{attach_choices, AccountStore, PollStore, UidGenerator, UID_ATTEMPTS};
use crate::error::StoreError;
use crate::models::{Choice, NewPoll, Poll, PollWithChoices, PopularPoll, Token, User};
use crate::poll::generate_uid;

#[derive(Default)]
struct Tables {
    polls: Vec<Poll>,
    choices: Vec<Choice>,
    users: BTreeSet<String>,
    tokens: Vec<Token>,
    last_poll_id: i64,
    last_choice_id: i64,
    last_token_id: i64,
}

/// Process-local store. A single lock guards all tables, so each operation is atomic.
pub struct MemoryStore {
    tables: Mutex<Tables>,
    uid_generator: UidGenerator,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_uid_generator(generate_uid)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_uid_generator(generator: impl Fn() -> String + Send + Sync + 'static) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            uid_generator: Box::new(generator),
        }
    }

    fn fresh_uid(&self, tables: &Tables) -> Result<String, StoreError> {
        for attempt in 1..=UID_ATTEMPTS {
            let uid = (self.uid_generator)();
            if tables.polls.iter().all(|poll| poll.uid != uid) {
                return Ok(uid);
            }
            warn!(attempt, %uid, "Poll uid already taken, retrying");
        }

        Err(StoreError::UidExhausted(UID_ATTEMPTS))
    }
}

#[async_trait]
impl PollStore for MemoryStore {
    async fn create_poll(&self, new_poll: &NewPoll) -> Result<PollWithChoices, StoreError> {
        let mut tables = self.tables.lock().await;
        let uid = self.fresh_uid(&tables)?;

        tables.last_poll_id += 1;
        let poll = Poll {
            id: tables.last_poll_id,
            uid,
            text: new_poll.text.clone(),
            pub_date: Utc::now(),
        };

        let mut choices = Vec::with_capacity(new_poll.choices.len());
        for text in &new_poll.choices {
            tables.last_choice_id += 1;
            choices.push(Choice {
                id: tables.last_choice_id,
                poll_id: poll.id,
                text: text.clone(),
                votes: 0,
            });
        }

        tables.polls.push(poll.clone());
        tables.choices.extend(choices.iter().cloned());
        Ok(PollWithChoices { poll, choices })
    }

    async fn list_polls(&self) -> Result<Vec<PollWithChoices>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(attach_choices(tables.polls.clone(), tables.choices.clone()))
    }

    async fn find_poll(&self, uid: &str) -> Result<Option<PollWithChoices>, StoreError> {
        let tables = self.tables.lock().await;
        let found = tables.polls.iter().find(|poll| poll.uid == uid).map(|poll| {
            let choices = tables
                .choices
                .iter()
                .filter(|choice| choice.poll_id == poll.id)
                .cloned()
                .collect();
            PollWithChoices {
                poll: poll.clone(),
                choices,
            }
        });

        Ok(found)
    }

    async fn popular_polls(&self, limit: i64) -> Result<Vec<PopularPoll>, StoreError> {
        let tables = self.tables.lock().await;
        let mut ranked: Vec<PopularPoll> = tables
            .polls
            .iter()
            .map(|poll| PopularPoll {
                total_votes: tables
                    .choices
                    .iter()
                    .filter(|choice| choice.poll_id == poll.id)
                    .map(|choice| choice.votes)
                    .sum(),
                poll: poll.clone(),
            })
            .collect();

        ranked.sort_by(|a, b| b.total_votes.cmp(&a.total_votes).then(a.poll.id.cmp(&b.poll.id)));
        ranked.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(ranked)
    }

    async fn increment_vote(&self, poll_id: i64, choice_id: i64) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        match tables
            .choices
            .iter_mut()
            .find(|choice| choice.id == choice_id && choice.poll_id == poll_id)
        {
            Some(choice) => {
                choice.votes += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn get_or_create_user(&self, email: &str) -> Result<User, StoreError> {
        let mut tables = self.tables.lock().await;
        tables.users.insert(email.to_string());
        Ok(User {
            email: email.to_string(),
        })
    }

    async fn create_token(&self, email: &str, uid: &str) -> Result<Token, StoreError> {
        let mut tables = self.tables.lock().await;
        tables.last_token_id += 1;
        let token = Token {
            id: tables.last_token_id,
            email: email.to_string(),
            uid: uid.to_string(),
            created_at: Utc::now(),
        };
        tables.tokens.push(token.clone());
        Ok(token)
    }

    async fn consume_token(&self, uid: &str) -> Result<Option<Token>, StoreError> {
        let mut tables = self.tables.lock().await;
        let position = tables.tokens.iter().position(|token| token.uid == uid);
        Ok(position.map(|index| tables.tokens.remove(index)))
    }

    async fn purge_tokens_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock().await;
        let before = tables.tokens.len();
        tables.tokens.retain(|token| token.created_at >= cutoff);
        Ok((before - tables.tokens.len()) as u64)
    }
}
