// routes.rs
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use http::{header::CONTENT_TYPE, Method};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{api, handlers};

pub fn create_routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let api_routes = Router::new()
        .route("/polls", get(api::list_polls).post(api::create_poll))
        .route("/poll/{uid}", get(api::get_poll))
        .layer(cors);

    let account_routes = Router::new()
        .route("/send_login_email", post(handlers::send_login_email))
        .route("/login", get(handlers::login))
        .route("/me", get(handlers::me))
        .route("/logout", post(handlers::logout));

    Router::new()
        .route("/", get(handlers::home).post(handlers::create_poll))
        .route("/poll/{uid}", get(handlers::get_poll).post(handlers::vote))
        .route("/poll/{uid}/results", get(handlers::results))
        .nest("/api/v1", api_routes)
        .nest("/accounts", account_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
