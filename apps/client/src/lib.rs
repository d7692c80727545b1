//! Client layer for the job-application tracker backends: typed API clients
//! behind a shared token-refresh gateway, plus observable session, objectives
//! and toast stores.

pub mod api;
pub mod config;
pub mod credentials;
pub mod errors;
pub mod gateway;
pub mod models;
pub mod state;
pub mod stores;

pub use config::Config;
pub use errors::{ApiError, RefreshError};
pub use gateway::Gateway;
pub use state::Services;
