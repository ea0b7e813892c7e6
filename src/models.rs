// models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Poll {
    pub id: i64,
    pub uid: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Choice {
    pub id: i64,
    #[serde(skip)]
    pub poll_id: i64,
    pub text: String,
    pub votes: i64,
}

/// A poll together with its choices in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollWithChoices {
    #[serde(flatten)]
    pub poll: Poll,
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct PopularPoll {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub poll: Poll,
    pub total_votes: i64,
}

/// Validated input for poll creation. Construct through `poll::validate_*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPoll {
    pub text: String,
    pub choices: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct User {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Token {
    pub id: i64,
    pub email: String,
    pub uid: String,
    pub created_at: DateTime<Utc>,
}

impl Token {
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now - self.created_at >= ttl
    }
}

/// JSON body of `POST /api/v1/polls`. Every field is optional so that a
/// missing key surfaces as a field error instead of a body rejection.
#[derive(Debug, Default, Deserialize)]
pub struct PollPayload {
    pub text: Option<String>,
    pub choices: Option<Vec<ChoicePayload>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChoicePayload {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub token: Option<String>,
}
