// src/state.rs
use std::sync::Arc;

use sqlx::PgPool;

use crate::accounts::SessionStore;
use crate::config::Config;
use crate::services::{LogMailer, Mailer};
use crate::store::{AccountStore, MemoryStore, PgStore, PollStore};

#[derive(Clone)]
pub struct AppState {
    pub polls: Arc<dyn PollStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub mailer: Arc<dyn Mailer>,
    pub sessions: Arc<SessionStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn postgres(pool: PgPool, config: Config) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Self::with_stores(store.clone(), store, Arc::new(LogMailer), config)
    }

    pub fn in_memory(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::with_stores(store.clone(), store, Arc::new(LogMailer), config)
    }

    pub fn with_stores(
        polls: Arc<dyn PollStore>,
        accounts: Arc<dyn AccountStore>,
        mailer: Arc<dyn Mailer>,
        config: Config,
    ) -> Self {
        Self {
            polls,
            accounts,
            mailer,
            sessions: Arc::new(SessionStore::new(config.session_ttl())),
            config: Arc::new(config),
        }
    }
}
