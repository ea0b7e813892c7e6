#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use minivote::services::{MailError, Mailer};
use minivote::store::MemoryStore;
use minivote::{create_routes, AppState, Config};
use reqwest::{redirect::Policy, Client, Response};
use serde_json::{json, Value};

/// Remembers every login link instead of sending it. Optionally reports failure afterwards.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail: bool,
}

impl RecordingMailer {
    pub fn last_link(&self) -> Option<(String, String)> {
        self.sent.lock().expect("mailer lock").last().cloned()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_login_link(&self, recipient: &str, login_url: &str) -> Result<(), MailError> {
        self.sent
            .lock()
            .expect("mailer lock")
            .push((recipient.to_string(), login_url.to_string()));
        if self.fail {
            return Err(MailError {
                recipient: recipient.to_string(),
                reason: "smtp unavailable".to_string(),
            });
        }
        Ok(())
    }
}

pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(Config::default(), RecordingMailer::default()).await
    }

    pub async fn spawn_with(config: Config, mailer: RecordingMailer) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind listener");
        let addr = listener.local_addr().expect("local addr");

        let config = Config {
            site_url: format!("http://{addr}"),
            ..config
        };
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(mailer);
        let state = AppState::with_stores(store.clone(), store, mailer.clone(), config);
        let app = create_routes(state);
        tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });

        let client = Client::builder()
            .redirect(Policy::none())
            .build()
            .expect("http client");

        Self { addr, client, mailer }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client.get(self.url(path)).send().await.expect("GET request")
    }

    pub async fn get_json(&self, path: &str) -> Value {
        let response = self.get(path).await;
        assert_eq!(response.status(), 200, "GET {path}");
        response.json().await.expect("json body")
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST form")
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("POST json")
    }

    /// Creates a poll through the API and returns its JSON representation.
    pub async fn create_poll(&self, text: &str, choices: &[&str]) -> Value {
        let choices: Vec<Value> = choices.iter().map(|c| json!({ "text": c })).collect();
        let response = self
            .post_json("/api/v1/polls", &json!({ "text": text, "choices": choices }))
            .await;
        assert_eq!(response.status(), 201);
        response.json().await.expect("created poll json")
    }

    pub async fn vote(&self, uid: &str, choice_id: i64) -> Response {
        self.post_form(&format!("/poll/{uid}"), &[("choice_id", &choice_id.to_string())])
            .await
    }
}

pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string()
}

pub fn choice_id(poll: &Value, index: usize) -> i64 {
    poll["choices"][index]["id"].as_i64().expect("choice id")
}

pub fn uid(poll: &Value) -> String {
    poll["uid"].as_str().expect("poll uid").to_string()
}
