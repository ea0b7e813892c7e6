// src/lib.rs
pub mod accounts;
pub mod api;
pub mod chart;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod poll;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

pub use config::Config;
pub use routes::create_routes;
pub use state::AppState;
