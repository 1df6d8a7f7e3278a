// Public API for integration tests and potential library usage

pub mod api;
pub mod auth;
pub mod config;
pub mod dedup;
pub mod error;
pub mod gateway;
pub mod pool;
pub mod prompts;
pub mod session;
pub mod spice;
pub mod store;
pub mod turn;
pub mod types;
