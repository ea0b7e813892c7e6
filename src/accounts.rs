// src/accounts.rs
//! Passwordless login: a single-use token is mailed to the user and traded for a session.

use std::collections::HashMap;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{AppError, FieldErrors};
use crate::models::Token;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "sessionid";
const MAX_EMAIL_LENGTH: usize = 254;

struct Session {
    email: String,
    created_at: DateTime<Utc>,
}

/// Session id to the email it is logged in as. Sessions expire `ttl` after they start.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Opens a session and drops every expired one.
    pub async fn start(&self, email: &str) -> String {
        let id = Uuid::new_v4().simple().to_string();
        let now = Utc::now();

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, session| now - session.created_at < self.ttl);
        sessions.insert(
            id.clone(),
            Session {
                email: email.to_string(),
                created_at: now,
            },
        );
        id
    }

    pub async fn email(&self, id: &str) -> Option<String> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(id) {
                None => return None,
                Some(session) if now - session.created_at < self.ttl => {
                    return Some(session.email.clone())
                }
                Some(_) => {}
            }
        }

        self.sessions.write().await.remove(id);
        None
    }

    pub async fn end(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }
}

pub fn generate_token_uid() -> String {
    Uuid::new_v4().to_string()
}

pub fn login_url(site_url: &str, token_uid: &str) -> String {
    format!("{site_url}/accounts/login?token={token_uid}")
}

pub fn validate_email(raw: Option<&str>) -> Result<String, FieldErrors> {
    let email = raw.map(str::trim).unwrap_or_default();
    if email.is_empty() {
        return Err(FieldErrors::single("email", "This field is required."));
    }

    let valid = email.len() <= MAX_EMAIL_LENGTH
        && !email.chars().any(char::is_whitespace)
        && matches!(
            email.split_once('@'),
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@')
        );
    if !valid {
        return Err(FieldErrors::single("email", "Enter a valid email address."));
    }

    Ok(email.to_string())
}

/// Creates the user if needed, issues a fresh token and mails the login link.
/// A mail failure is logged; the token stays valid.
pub async fn request_login(state: &AppState, email: &str) -> Result<Token, AppError> {
    let user = state.accounts.get_or_create_user(email).await?;

    let cutoff = Utc::now() - state.config.token_ttl();
    let purged = state.accounts.purge_tokens_before(cutoff).await?;
    if purged > 0 {
        info!(purged, "Removed expired login tokens");
    }

    let token = state
        .accounts
        .create_token(&user.email, &generate_token_uid())
        .await?;
    info!(email = %user.email, "Issued login token");

    let url = login_url(&state.config.site_url, &token.uid);
    if let Err(e) = state.mailer.send_login_link(&user.email, &url).await {
        error!("{e}");
    }

    Ok(token)
}

/// Consumes the token and opens a session for its user. Returns the session id.
pub async fn exchange_token(state: &AppState, token_uid: &str) -> Result<String, AppError> {
    let token = state
        .accounts
        .consume_token(token_uid)
        .await?
        .ok_or(AppError::InvalidToken)?;

    if token.is_expired(Utc::now(), state.config.token_ttl()) {
        warn!(email = %token.email, "Expired login token presented");
        return Err(AppError::InvalidToken);
    }

    let session = state.sessions.start(&token.email).await;
    info!(email = %token.email, "Login token exchanged for a session");
    Ok(session)
}

pub fn session_id(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value_trimmed().to_string())
}

pub fn session_cookie(session: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, session);
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_path("/");
    cookie
}

/// Removal cookie for logout; path must match the one set at login.
pub fn session_removal() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}
