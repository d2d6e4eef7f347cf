// server/src/lib.rs

//! bazaar-server: accounts, a product catalog and order workflows over HTTP.

pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod web;

pub use errors::{AppError, Result};
pub use state::AppState;
